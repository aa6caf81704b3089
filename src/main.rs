use chrono::Utc;
use genstudio::{
    logger::{self, LogLevel, LoggerConfig},
    preparation::format_file_size,
    GenerationOutcome, RawImage, Style, StudioClient, StudioConfig, Workspace, WorkspaceStatus,
};
use std::env;

const USAGE: &str = "usage:
  genstudio <image-path> <prompt> [style]   generate a variation of an image
  genstudio history                          list recent generations
  genstudio clear                            clear the history
  genstudio styles                           list the available styles";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_loaded = dotenv::dotenv().is_ok();

    let log_config = match env::var("STUDIO_LOG_LEVEL").ok().as_deref() {
        Some("debug") => LoggerConfig::development().with_level(LogLevel::Debug),
        Some("quiet") => LoggerConfig::quiet(),
        _ => LoggerConfig::development(),
    };
    logger::init_with_config(log_config)?;

    if env_loaded {
        log::info!("✅ .env file loaded successfully");
    } else {
        log::debug!("No .env file found, using system environment variables");
    }

    let config = StudioConfig::from_env();
    logger::log_config_info(&config);

    let args: Vec<String> = env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("styles") => {
            for style in Style::ALL {
                log::info!("🎨 {:<11} {}", style.as_str(), style.artifact_url());
            }
            Ok(())
        }
        Some("history") => {
            let client = StudioClient::new(config).await?;
            print_history(&client.workspace().await);
            Ok(())
        }
        Some("clear") => {
            let client = StudioClient::new(config).await?;
            let mut workspace = client.workspace().await;
            let removed = workspace.history().len();
            workspace.clear_history().await;
            log::info!("🧹 Cleared {} history entries", removed);
            Ok(())
        }
        Some(path) if args.len() >= 2 => {
            let client = StudioClient::new(config).await?;
            let style = args.get(2).map(|s| Style::from(s.as_str())).unwrap_or_default();
            generate(&client, path, &args[1], style).await
        }
        _ => {
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    }
}

async fn generate(
    client: &StudioClient,
    path: &str,
    prompt: &str,
    style: Style,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut workspace = client.workspace().await;

    let raw = RawImage::from_path(path).await?;
    log::info!("🖼️  Loading {} ({})", raw.file_name, format_file_size(raw.size()));
    let selected = workspace.select_image(raw).await?;
    log::debug!("Prepared image is {} bytes as a data URL", selected.data_url.len());

    workspace.set_prompt(prompt);
    if !style.is_known() {
        log::warn!("⚠️  Unknown style '{}', the editorial look will be used", style);
    }
    workspace.set_style(style);

    log::info!("🔄 Generating (Ctrl-C to cancel)...");
    let controller = workspace.controller().clone();
    let outcome = {
        let generation = workspace.generate();
        tokio::pin!(generation);

        tokio::select! {
            outcome = &mut generation => outcome?,
            _ = tokio::signal::ctrl_c() => {
                log::warn!("⏹️  Cancelling generation");
                controller.cancel();
                generation.await?
            }
        }
    };

    match outcome {
        GenerationOutcome::Success(result) => {
            log::info!("✅ Generation complete: {}", result.id);
            log::info!("🔗 {}", result.image_url);
        }
        GenerationOutcome::Failure(failure) => {
            log::error!("❌ Generation failed: {}", failure);
            if failure.retries_exhausted {
                log::info!("💡 The model is busy, try again in a moment");
            }
        }
        GenerationOutcome::Cancelled => log::info!("Generation cancelled"),
    }

    if let WorkspaceStatus::Completed = workspace.status() {
        print_history(&workspace);
    }
    Ok(())
}

fn print_history(workspace: &Workspace) {
    let entries = workspace.history();
    if entries.is_empty() {
        log::info!("📭 No generations yet");
        return;
    }

    let now = Utc::now();
    log::info!("📚 Recent generations:");
    for entry in entries {
        log::info!(
            "  {} [{}] \"{}\" ({})",
            entry.id,
            entry.style,
            entry.prompt,
            entry.age_label(now)
        );
    }
}

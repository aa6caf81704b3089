use crate::config::StudioConfig;
use crate::error::{Result, StudioError};
use chrono::{DateTime, Utc};
use colored::*;
use log::{Level, LevelFilter, Metadata, Record};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use uuid::Uuid;

static STUDIO_LOGGER: Lazy<StudioLogger> = Lazy::new(StudioLogger::new);

pub fn init() -> Result<()> {
    init_with_config(LoggerConfig::default())
}

/// Installs the studio logger. A second call only swaps the configuration.
pub fn init_with_config(config: LoggerConfig) -> Result<()> {
    STUDIO_LOGGER.update_config(config.clone())?;

    if log::set_logger(&*STUDIO_LOGGER).is_err() {
        log::debug!("Logger already installed, configuration updated");
    }

    log::set_max_level(config.min_level.to_level_filter());
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn color(&self) -> Color {
        match self {
            LogLevel::Trace => Color::Cyan,
            LogLevel::Debug => Color::Blue,
            LogLevel::Info => Color::Green,
            LogLevel::Warn => Color::Yellow,
            LogLevel::Error => Color::Red,
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            LogLevel::Trace => "🔍",
            LogLevel::Debug => "🐛",
            LogLevel::Info => "🎨",
            LogLevel::Warn => "⚠️",
            LogLevel::Error => "❌",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    pub fn to_level(&self) -> Level {
        match self {
            LogLevel::Trace => Level::Trace,
            LogLevel::Debug => Level::Debug,
            LogLevel::Info => Level::Info,
            LogLevel::Warn => Level::Warn,
            LogLevel::Error => Level::Error,
        }
    }

    pub fn to_level_filter(&self) -> LevelFilter {
        self.to_level().to_level_filter()
    }

    pub fn from_level(level: Level) -> Self {
        match level {
            Level::Trace => LogLevel::Trace,
            Level::Debug => LogLevel::Debug,
            Level::Info => LogLevel::Info,
            Level::Warn => LogLevel::Warn,
            Level::Error => LogLevel::Error,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    pub module: String,
    pub line: u32,
}

impl LogEntry {
    fn from_record(record: &Record) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            level: LogLevel::from_level(record.level()),
            message: record.args().to_string(),
            module: record.module_path().unwrap_or("unknown").to_string(),
            line: record.line().unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub min_level: LogLevel,
    pub show_colors: bool,
    pub show_emojis: bool,
    pub show_module: bool,
    pub timestamp_format: String,
    pub output_json: bool,
    pub silent: bool,
    pub log_file_path: Option<String>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            show_colors: true,
            show_emojis: true,
            show_module: true,
            timestamp_format: "%H:%M:%S%.3f".to_string(),
            output_json: false,
            silent: false,
            log_file_path: None,
        }
    }
}

impl LoggerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    pub fn with_colors(mut self, enabled: bool) -> Self {
        self.show_colors = enabled;
        self
    }

    pub fn with_file_output(mut self, path: &str) -> Self {
        self.log_file_path = Some(path.to_string());
        self
    }

    pub fn with_json_output(mut self, enabled: bool) -> Self {
        self.output_json = enabled;
        self
    }

    pub fn production() -> Self {
        Self {
            min_level: LogLevel::Info,
            show_colors: false,
            show_emojis: false,
            output_json: true,
            ..Default::default()
        }
    }

    pub fn development() -> Self {
        Self {
            min_level: LogLevel::Debug,
            ..Default::default()
        }
    }

    /// Warnings and errors only, nothing on stdout.
    pub fn quiet() -> Self {
        Self {
            min_level: LogLevel::Warn,
            silent: true,
            ..Default::default()
        }
    }
}

pub struct StudioLogger {
    config: Mutex<LoggerConfig>,
    log_file: Mutex<Option<File>>,
}

fn recover<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    lock.lock().unwrap_or_else(PoisonError::into_inner)
}

impl StudioLogger {
    fn new() -> Self {
        Self {
            config: Mutex::new(LoggerConfig::default()),
            log_file: Mutex::new(None),
        }
    }

    fn update_config(&self, new_config: LoggerConfig) -> Result<()> {
        let file = match &new_config.log_file_path {
            Some(path) => Some(
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|e| {
                        StudioError::ConfigError(format!("cannot open log file {}: {}", path, e))
                    })?,
            ),
            None => None,
        };
        *recover(&self.log_file) = file;
        *recover(&self.config) = new_config;
        Ok(())
    }

    fn format_line(entry: &LogEntry, config: &LoggerConfig) -> String {
        if config.output_json {
            return serde_json::to_string(entry).unwrap_or_default();
        }

        let timestamp = entry.timestamp.format(&config.timestamp_format).to_string();
        let level = if config.show_emojis {
            format!("{} {}", entry.level.emoji(), entry.level.as_str())
        } else {
            entry.level.as_str().to_string()
        };
        let module = if config.show_module {
            format!("{}:{} ", entry.module, entry.line)
        } else {
            String::new()
        };

        if config.show_colors {
            format!(
                "{} [{}] {}{}",
                timestamp.bright_black(),
                level.color(entry.level.color()).bold(),
                module.bright_blue(),
                entry.message
            )
        } else {
            format!("{} [{}] {}{}", timestamp, level, module, entry.message)
        }
    }
}

impl log::Log for StudioLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= recover(&self.config).min_level.to_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let entry = LogEntry::from_record(record);
        let config = recover(&self.config).clone();

        if !config.silent {
            println!("{}", Self::format_line(&entry, &config));
        }

        if let Some(file) = recover(&self.log_file).as_mut() {
            let plain = LoggerConfig {
                show_colors: false,
                ..config
            };
            let _ = writeln!(file, "{}", Self::format_line(&entry, &plain));
        }
    }

    fn flush(&self) {
        let _ = io::stdout().flush();
        if let Some(file) = recover(&self.log_file).as_mut() {
            let _ = file.flush();
        }
    }
}

/// Logs how long a named operation took when dropped.
pub struct Timer {
    start: Instant,
    name: String,
}

impl Timer {
    pub fn new(name: &str) -> Self {
        log::debug!("⏱️  Starting timer: {}", name);
        Self {
            start: Instant::now(),
            name: name.to_string(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        log::debug!(
            "⏱️  Timer '{}' completed in {}ms",
            self.name,
            self.elapsed().as_millis()
        );
    }
}

pub fn timer(name: &str) -> Timer {
    Timer::new(name)
}

pub fn log_config_info(config: &StudioConfig) {
    let generation = &config.generation;
    log::info!("⚙️  Configuration loaded:");
    match &generation.endpoint {
        Some(endpoint) => log::info!("   Endpoint: {}", endpoint),
        None => log::info!(
            "   Simulated latency: {}-{}ms, failure rate {:.0}%",
            generation.min_latency_ms,
            generation.max_latency_ms,
            generation.failure_rate * 100.0
        ),
    }
    log::info!(
        "   Retries: {} (backoff base {}ms)",
        generation.max_retries,
        generation.backoff_base_ms
    );
    log::info!(
        "   History: {} entries in '{}' ({})",
        config.history.capacity,
        config.history.namespace,
        config
            .history
            .storage_dir
            .as_ref()
            .map(|dir| dir.display().to_string())
            .unwrap_or_else(|| "memory".to_string())
    );
    log::info!(
        "   Uploads: max {} bytes, max side {}px",
        config.preparation.max_file_size,
        config.preparation.max_dimension
    );
}

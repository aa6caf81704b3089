use crate::{
    error::{Result, StudioError},
    models::{GenerationRequest, GenerationResult},
    studio::executor::{AttemptError, AttemptExecutor},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;

/// Talks to a real generation service behind the same retry/cancel contract.
#[derive(Clone)]
pub struct HttpExecutor {
    client: Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    id: String,
    image_url: String,
    created_at: Option<DateTime<Utc>>,
}

impl HttpExecutor {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let endpoint = endpoint.into();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(StudioError::ConfigError(format!(
                "generation endpoint must be an http(s) URL, got '{}'",
                endpoint
            )));
        }
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    fn generate_url(&self) -> String {
        format!("{}/generate", self.endpoint)
    }
}

/// 429 and 503 mean the model is busy; everything else is final.
pub fn classify_status(status: StatusCode) -> AttemptError {
    match status {
        StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE => AttemptError::Overloaded,
        other => AttemptError::Fatal(format!("generation service returned {}", other)),
    }
}

fn parse_response(
    request: &GenerationRequest,
    body: &str,
) -> std::result::Result<GenerationResult, AttemptError> {
    let response: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| AttemptError::Fatal(format!("malformed response: {}", e)))?;
    if response.id.is_empty() || response.image_url.is_empty() {
        return Err(AttemptError::Fatal(
            "malformed response: missing id or imageUrl".into(),
        ));
    }
    Ok(GenerationResult::from_parts(
        request,
        response.id,
        response.image_url,
        response.created_at.unwrap_or_else(Utc::now),
    ))
}

#[async_trait]
impl AttemptExecutor for HttpExecutor {
    async fn execute(
        &self,
        request: &GenerationRequest,
        attempt: u32,
    ) -> std::result::Result<GenerationResult, AttemptError> {
        let payload = json!({
            "imageDataUrl": request.image.data_url,
            "prompt": request.prompt,
            "style": request.style,
        });

        log::info!("Requesting generation (attempt {})", attempt + 1);

        let response = self
            .client
            .post(self.generate_url())
            .json(&payload)
            .send()
            .await
            .map_err(|e| AttemptError::Fatal(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AttemptError::Fatal(format!("failed to read response: {}", e)))?;
        parse_response(request, &body)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

use crate::error::{Result, StudioError};
use crate::models::{SourceImage, Style};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub image: SourceImage,
    pub prompt: String,
    pub style: Style,
}

impl GenerationRequest {
    pub fn new(image: SourceImage, prompt: impl Into<String>, style: impl Into<Style>) -> Self {
        Self {
            image,
            prompt: prompt.into().trim().to_string(),
            style: style.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.prompt.trim().is_empty() {
            return Err(StudioError::ValidationError(
                "Prompt must not be empty".into(),
            ));
        }
        if self.image.is_empty() {
            return Err(StudioError::ValidationError(
                "An image is required before generating".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    pub id: String,
    pub image_url: String,
    pub prompt: String,
    pub style: Style,
    pub created_at: DateTime<Utc>,
    pub source_image: SourceImage,
}

impl GenerationResult {
    /// Builds a result for `request` using the fixed style artifact.
    pub fn synthesize(request: &GenerationRequest) -> Self {
        Self::from_parts(
            request,
            new_result_id(),
            request.style.artifact_url().to_string(),
            Utc::now(),
        )
    }

    pub fn from_parts(
        request: &GenerationRequest,
        id: String,
        image_url: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            image_url,
            prompt: request.prompt.clone(),
            style: request.style.clone(),
            created_at,
            source_image: request.image.clone(),
        }
    }

    pub fn age_label(&self, now: DateTime<Utc>) -> String {
        let hours = (now - self.created_at).num_hours();
        if hours < 1 {
            "Just now".to_string()
        } else if hours < 24 {
            format!("{}h ago", hours)
        } else {
            self.created_at.format("%Y-%m-%d").to_string()
        }
    }
}

/// `gen_<unix millis>_<9 lowercase alphanumerics>`
pub fn new_result_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("gen_{}_{}", Utc::now().timestamp_millis(), &suffix[..9])
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationFailure {
    pub reason: String,
    pub attempts: u32,
    pub retries_exhausted: bool,
}

impl fmt::Display for GenerationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.retries_exhausted {
            write!(f, "{} after {} attempts", self.reason, self.attempts)
        } else {
            f.write_str(&self.reason)
        }
    }
}

/// Terminal state of one `submit` call.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    Success(GenerationResult),
    Failure(GenerationFailure),
    Cancelled,
}

impl GenerationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, GenerationOutcome::Success(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, GenerationOutcome::Cancelled)
    }

    pub fn result(&self) -> Option<&GenerationResult> {
        match self {
            GenerationOutcome::Success(result) => Some(result),
            _ => None,
        }
    }

    pub fn into_result(self) -> Option<GenerationResult> {
        match self {
            GenerationOutcome::Success(result) => Some(result),
            _ => None,
        }
    }
}

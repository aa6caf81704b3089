use crate::{
    error::{Result, StudioError},
    models::{GenerationOutcome, GenerationRequest, GenerationResult, RawImage, SourceImage, Style},
    preparation::ImagePreparer,
    storage::HistoryStore,
    studio::GenerationController,
};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceStatus {
    Idle,
    Generating,
    Completed,
    /// Shown with a retry affordance.
    Failed { message: String, attempts: u32 },
    /// Neutral state, not an error.
    Cancelled,
}

/// UI-level state: current selections, the latest result and the history list.
///
/// History mutations return the updated list and the workspace keeps that as
/// its view; nothing is reloaded behind the caller's back.
pub struct Workspace {
    controller: Arc<GenerationController>,
    history_store: HistoryStore,
    preparer: ImagePreparer,
    selected_image: Option<SourceImage>,
    prompt: String,
    style: Style,
    current: Option<GenerationResult>,
    history: Vec<GenerationResult>,
    status: WorkspaceStatus,
}

impl Workspace {
    pub async fn load(
        controller: Arc<GenerationController>,
        history_store: HistoryStore,
        preparer: ImagePreparer,
    ) -> Self {
        let history = history_store.list().await;
        Self {
            controller,
            history_store,
            preparer,
            selected_image: None,
            prompt: String::new(),
            style: Style::default(),
            current: None,
            history,
            status: WorkspaceStatus::Idle,
        }
    }

    pub fn controller(&self) -> &Arc<GenerationController> {
        &self.controller
    }

    pub fn selected_image(&self) -> Option<&SourceImage> {
        self.selected_image.as_ref()
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn style(&self) -> &Style {
        &self.style
    }

    pub fn current(&self) -> Option<&GenerationResult> {
        self.current.as_ref()
    }

    pub fn history(&self) -> &[GenerationResult] {
        &self.history
    }

    pub fn status(&self) -> &WorkspaceStatus {
        &self.status
    }

    /// Validates and prepares an upload, then selects it. A rejected upload
    /// leaves the previous selection in place.
    pub async fn select_image(&mut self, raw: RawImage) -> Result<&SourceImage> {
        let prepared = self.preparer.prepare_async(raw).await?;
        self.status = WorkspaceStatus::Idle;
        Ok(self.selected_image.insert(prepared.into()))
    }

    pub fn clear_image(&mut self) {
        self.selected_image = None;
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
        self.status = WorkspaceStatus::Idle;
    }

    pub fn set_style(&mut self, style: impl Into<Style>) {
        self.style = style.into();
        self.status = WorkspaceStatus::Idle;
    }

    pub fn can_generate(&self) -> bool {
        self.selected_image.is_some() && !self.prompt.trim().is_empty()
    }

    pub fn request(&self) -> Result<GenerationRequest> {
        let image = self.selected_image.clone().ok_or_else(|| {
            StudioError::ValidationError("An image is required before generating".into())
        })?;
        let request = GenerationRequest::new(image, self.prompt.as_str(), self.style.clone());
        request.validate()?;
        Ok(request)
    }

    /// Submits the current selections. Only a successful outcome is recorded.
    pub async fn generate(&mut self) -> Result<GenerationOutcome> {
        let request = self.request()?;
        self.status = WorkspaceStatus::Generating;

        let outcome = match self.controller.submit(request).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.status = WorkspaceStatus::Idle;
                return Err(e);
            }
        };

        match &outcome {
            GenerationOutcome::Success(result) => {
                self.history = self.history_store.append(result.clone()).await;
                self.current = Some(result.clone());
                self.status = WorkspaceStatus::Completed;
            }
            GenerationOutcome::Failure(failure) => {
                self.status = WorkspaceStatus::Failed {
                    message: failure.to_string(),
                    attempts: failure.attempts,
                };
            }
            GenerationOutcome::Cancelled => {
                self.status = WorkspaceStatus::Cancelled;
            }
        }
        Ok(outcome)
    }

    pub fn cancel(&self) -> bool {
        self.controller.cancel()
    }

    /// Brings back the image, prompt and style of a past generation.
    pub fn restore(&mut self, id: &str) -> Result<&GenerationResult> {
        let entry = self
            .history
            .iter()
            .find(|entry| entry.id == id)
            .cloned()
            .ok_or_else(|| {
                StudioError::ValidationError(format!("no generation '{}' in history", id))
            })?;

        self.selected_image = (!entry.source_image.is_empty()).then(|| entry.source_image.clone());
        self.prompt = entry.prompt.clone();
        self.style = entry.style.clone();
        self.status = WorkspaceStatus::Idle;
        Ok(self.current.insert(entry))
    }

    pub async fn remove_from_history(&mut self, id: &str) -> &[GenerationResult] {
        self.history = self.history_store.remove(id).await;
        if self.current.as_ref().map_or(false, |current| current.id == id) {
            self.current = None;
        }
        &self.history
    }

    pub async fn clear_history(&mut self) -> &[GenerationResult] {
        self.history = self.history_store.clear().await;
        &self.history
    }

    /// Back to a blank workspace. History is kept.
    pub fn reset(&mut self) {
        self.selected_image = None;
        self.prompt.clear();
        self.style = Style::default();
        self.current = None;
        self.status = WorkspaceStatus::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GenerationConfig, HistoryConfig, PreparationConfig};
    use image::{DynamicImage, ImageOutputFormat, RgbImage};
    use std::io::Cursor;

    fn controller(failure_rate: f64) -> Arc<GenerationController> {
        let config = GenerationConfig::default()
            .with_failure_rate(failure_rate)
            .with_seed(3);
        Arc::new(GenerationController::simulated(&config))
    }

    async fn workspace(failure_rate: f64) -> Workspace {
        Workspace::load(
            controller(failure_rate),
            HistoryStore::in_memory(&HistoryConfig::default()),
            ImagePreparer::new(PreparationConfig::default()),
        )
        .await
    }

    fn png_upload() -> RawImage {
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::new(32, 32))
            .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
            .unwrap();
        RawImage::new("look.png", "image/png", bytes)
    }

    #[tokio::test(start_paused = true)]
    async fn test_generate_requires_image_and_prompt() {
        let mut ws = workspace(0.0).await;
        assert!(!ws.can_generate());
        assert!(ws.generate().await.unwrap_err().is_validation());

        ws.select_image(png_upload()).await.unwrap();
        ws.set_prompt("   ");
        assert!(!ws.can_generate());
        assert!(ws.generate().await.unwrap_err().is_validation());
        assert_eq!(ws.status(), &WorkspaceStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_is_recorded_and_restorable() {
        let mut ws = workspace(0.0).await;
        ws.select_image(png_upload()).await.unwrap();
        ws.set_prompt("  neon city ");
        ws.set_style("Streetwear");

        let outcome = ws.generate().await.unwrap();
        let result = outcome.into_result().unwrap();
        assert_eq!(ws.status(), &WorkspaceStatus::Completed);
        assert_eq!(ws.history().len(), 1);
        assert_eq!(ws.current(), Some(&result));
        assert_eq!(result.prompt, "neon city");
        assert_eq!(result.source_image.file_name, "look.png");

        ws.reset();
        assert!(ws.selected_image().is_none());
        assert_eq!(ws.style(), &Style::Editorial);
        assert_eq!(ws.history().len(), 1);

        let restored = ws.restore(&result.id).unwrap().clone();
        assert_eq!(restored, result);
        assert_eq!(ws.prompt(), "neon city");
        assert_eq!(ws.style(), &Style::Streetwear);
        assert_eq!(ws.selected_image(), Some(&result.source_image));
        assert!(ws.can_generate());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_is_not_recorded() {
        let mut ws = workspace(1.0).await;
        ws.select_image(png_upload()).await.unwrap();
        ws.set_prompt("storm");

        let outcome = ws.generate().await.unwrap();
        assert!(matches!(outcome, GenerationOutcome::Failure(_)));
        assert_eq!(
            ws.status(),
            &WorkspaceStatus::Failed {
                message: "model overloaded after 3 attempts".into(),
                attempts: 3,
            }
        );
        assert!(ws.history().is_empty());
        assert!(ws.current().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_generation_is_not_recorded() {
        let mut ws = workspace(0.0).await;
        ws.select_image(png_upload()).await.unwrap();
        ws.set_prompt("storm");

        let controller = ws.controller().clone();
        tokio::spawn(async move {
            while !controller.is_in_flight() {
                tokio::task::yield_now().await;
            }
            controller.cancel();
        });

        let outcome = ws.generate().await.unwrap();
        assert!(outcome.is_cancelled());
        assert_eq!(ws.status(), &WorkspaceStatus::Cancelled);
        assert!(ws.history().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_history_mutations_return_updated_view() {
        let mut ws = workspace(0.0).await;
        ws.select_image(png_upload()).await.unwrap();
        ws.set_prompt("one");
        let first = ws.generate().await.unwrap().into_result().unwrap();
        ws.set_prompt("two");
        ws.generate().await.unwrap();

        let remaining = ws.remove_from_history(&first.id).await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].prompt, "two");
        assert!(ws.restore(&first.id).is_err());

        assert!(ws.clear_history().await.is_empty());
        assert!(ws.clear_history().await.is_empty());
        assert!(ws.current().is_some());
    }

    #[tokio::test]
    async fn test_rejected_upload_keeps_previous_selection() {
        let mut ws = workspace(0.0).await;
        ws.select_image(png_upload()).await.unwrap();
        let err = ws
            .select_image(RawImage::new("doc.pdf", "application/pdf", vec![1, 2, 3]))
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(ws.selected_image().unwrap().file_name, "look.png");
    }
}

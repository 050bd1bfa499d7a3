//! Data models and structures
//!
//! Defines the core data structures for chat automation: locales, tools,
//! modes, generation state, parsed responses, and the option types taken
//! by the long-running operations.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Default deadline for [`WaitOptions::timeout`].
pub const DEFAULT_TIMEOUT_MS: u64 = 120_000;

/// Default delay between DOM state samples.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;

/// UI language of the page, detected from the send button label.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    Ko,
    En,
}

impl Locale {
    pub const ALL: [Locale; 2] = [Locale::Ko, Locale::En];

    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::Ko => "ko",
            Locale::En => "en",
        }
    }
}

/// Tools offered in the composer tools menu.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GeminiTool {
    ImageGeneration,
    DeepResearch,
    VideoGeneration,
    Canvas,
    CodeImport,
    GuidedLearning,
    NotebookLm,
}

impl GeminiTool {
    pub const ALL: [GeminiTool; 7] = [
        GeminiTool::ImageGeneration,
        GeminiTool::DeepResearch,
        GeminiTool::VideoGeneration,
        GeminiTool::Canvas,
        GeminiTool::CodeImport,
        GeminiTool::GuidedLearning,
        GeminiTool::NotebookLm,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GeminiTool::ImageGeneration => "image_generation",
            GeminiTool::DeepResearch => "deep_research",
            GeminiTool::VideoGeneration => "video_generation",
            GeminiTool::Canvas => "canvas",
            GeminiTool::CodeImport => "code_import",
            GeminiTool::GuidedLearning => "guided_learning",
            GeminiTool::NotebookLm => "notebook_lm",
        }
    }
}

/// Response speed/quality mode shown on the mode switch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChatMode {
    Fast,
    Thinking,
    Pro,
}

impl ChatMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatMode::Fast => "fast",
            ChatMode::Thinking => "thinking",
            ChatMode::Pro => "pro",
        }
    }
}

/// Lifecycle of the current chat turn, inferred from transient DOM
/// signals on every read. Never cached.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GenerationState {
    Idle,
    Generating,
    Completed,
    ImageCompleted,
    Error,
}

impl GenerationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationState::Idle => "idle",
            GenerationState::Generating => "generating",
            GenerationState::Completed => "completed",
            GenerationState::ImageCompleted => "image_completed",
            GenerationState::Error => "error",
        }
    }

    /// A turn is settled once the page stops generating and has feedback
    /// controls attached to the last response.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, GenerationState::Idle | GenerationState::Generating)
    }
}

/// File handed to the upload flow. Carries raw bytes; the conversion to
/// and from data urls lives in [`crate::dataurl`].
#[derive(Debug, Clone, PartialEq)]
pub struct FileUpload {
    pub name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl FileUpload {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data,
        }
    }
}

/// Echo of a file accepted by the upload flow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub filename: String,
    pub mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub preview_url: Option<String>,
}

/// One image found in a model response.
///
/// `index` is global across the whole conversation in document order;
/// `response_index` points back at the containing response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedImage {
    pub index: usize,
    pub response_index: usize,
    pub preview_url: String,
    pub original_url: String,
}

/// One model turn parsed out of the conversation transcript.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModelResponse {
    pub index: usize,
    pub text: String,
    pub images: Vec<GeneratedImage>,
    pub is_error: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error_message: Option<String>,
}

/// Knobs for the response polling loop. All fields optional; defaults
/// are [`DEFAULT_TIMEOUT_MS`] and [`DEFAULT_POLL_INTERVAL_MS`].
#[derive(Debug, Clone, Default)]
pub struct WaitOptions {
    pub timeout_ms: Option<u64>,
    pub poll_interval_ms: Option<u64>,
    pub cancel: Option<CancellationToken>,
}

impl WaitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_poll_interval_ms(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = Some(poll_interval_ms);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS))
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|token| token.is_cancelled())
    }
}

/// How the browser download layer resolves filename collisions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConflictAction {
    #[default]
    Uniquify,
    Overwrite,
    Prompt,
}

/// Options for a single image download request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DownloadOptions {
    pub filename: Option<String>,
    pub conflict_action: ConflictAction,
}

impl DownloadOptions {
    pub fn with_filename(filename: impl Into<String>) -> Self {
        Self {
            filename: Some(filename.into()),
            conflict_action: ConflictAction::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_serialization() {
        let json = serde_json::to_string(&GeminiTool::ImageGeneration).unwrap();
        assert_eq!(json, "\"image_generation\"");

        let tool: GeminiTool = serde_json::from_str("\"deep_research\"").unwrap();
        assert_eq!(tool, GeminiTool::DeepResearch);
        assert_eq!(tool.as_str(), "deep_research");
    }

    #[test]
    fn test_generation_state_serialization() {
        let json = serde_json::to_string(&GenerationState::ImageCompleted).unwrap();
        assert_eq!(json, "\"image_completed\"");
        assert!(GenerationState::ImageCompleted.is_terminal());
        assert!(!GenerationState::Generating.is_terminal());
        assert!(!GenerationState::Idle.is_terminal());
    }

    #[test]
    fn test_conflict_action_default_and_wire_name() {
        assert_eq!(ConflictAction::default(), ConflictAction::Uniquify);

        let json = serde_json::to_string(&ConflictAction::Uniquify).unwrap();
        assert_eq!(json, "\"uniquify\"");
    }

    #[test]
    fn test_generated_image_wire_names() {
        let image = GeneratedImage {
            index: 2,
            response_index: 1,
            preview_url: "https://lh3.googleusercontent.com/x=s1024-rj".to_string(),
            original_url: "https://lh3.googleusercontent.com/x=s0".to_string(),
        };

        let json = serde_json::to_string(&image).unwrap();
        assert!(json.contains("\"responseIndex\":1"));
        assert!(json.contains("\"previewUrl\""));
        assert!(json.contains("\"originalUrl\""));
    }

    #[test]
    fn test_wait_options_defaults() {
        let options = WaitOptions::new();
        assert_eq!(options.timeout_ms(), 120_000);
        assert_eq!(options.poll_interval(), Duration::from_millis(1_000));
        assert!(!options.is_cancelled());

        let options = WaitOptions::new()
            .with_timeout_ms(500)
            .with_poll_interval_ms(100);
        assert_eq!(options.timeout(), Duration::from_millis(500));
        assert_eq!(options.poll_interval(), Duration::from_millis(100));
    }

    #[test]
    fn test_wait_options_cancellation() {
        let token = CancellationToken::new();
        let options = WaitOptions::new().with_cancel(token.clone());

        assert!(!options.is_cancelled());
        token.cancel();
        assert!(options.is_cancelled());
    }
}

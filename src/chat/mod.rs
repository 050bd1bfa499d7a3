//! Chat automation service for the Gemini web UI
//!
//! Exposes every interaction a batch caller needs: sending prompts,
//! uploading files, driving the tools and mode menus, watching the
//! generation state machine, and downloading generated images.

pub mod dom;
pub mod mock;

pub use dom::DomChatClient;
pub use mock::MockChatClient;

use async_trait::async_trait;

use crate::models::{
    ChatMode, DownloadOptions, FileUpload, GeminiTool, GeneratedImage, GenerationState, Locale,
    ModelResponse, UploadedFile, WaitOptions,
};
use crate::Result;

/// Automation surface over one Gemini chat page.
///
/// DOM reads and single interactions are synchronous; only the
/// operations that wait on the page (or on the download channel) are
/// async. Nothing is cached between calls, so every method reports the
/// page as it is right now.
#[async_trait]
pub trait ChatService: Send + Sync {
    /// Clicks the new chat link, resetting the conversation.
    fn start_new_chat(&self) -> Result<()>;

    /// Types `text` into the prompt box and clicks send. Returns as
    /// soon as the click lands; pair with [`ChatService::wait_for_response`]
    /// or use [`ChatService::generate`].
    fn send_prompt(&self, text: &str) -> Result<()>;

    /// Attaches files through the hidden file input and echoes back
    /// what was accepted, in order.
    fn upload_files(&self, files: &[FileUpload]) -> Result<Vec<UploadedFile>>;

    /// Activates a tool from the tools menu. No-op if already active.
    fn select_tool(&self, tool: GeminiTool) -> Result<()>;

    /// Deactivates a tool via its composer chip. No-op if not active.
    fn deselect_tool(&self, tool: GeminiTool) -> Result<()>;

    /// Tool currently active in the composer, if any.
    fn active_tool(&self) -> Option<GeminiTool>;

    /// Switches the response mode. No-op if already selected.
    fn switch_mode(&self, mode: ChatMode) -> Result<()>;

    /// Mode shown on the mode switch; Fast when undeterminable.
    fn current_mode(&self) -> ChatMode;

    /// Current turn lifecycle, inferred from transient DOM signals.
    fn generation_state(&self) -> GenerationState;

    fn is_generating(&self) -> bool {
        self.generation_state() == GenerationState::Generating
    }

    /// Clicks the stop button if a turn is generating.
    fn stop_generation(&self) -> Result<()>;

    /// Polls the generation state until the turn settles, the timeout
    /// expires, or the caller cancels.
    async fn wait_for_response(&self, options: &WaitOptions) -> Result<ModelResponse>;

    /// [`ChatService::send_prompt`] followed by [`ChatService::wait_for_response`].
    async fn generate(&self, prompt: &str, options: &WaitOptions) -> Result<ModelResponse>;

    /// Every model turn in the conversation, in document order.
    fn responses(&self) -> Vec<ModelResponse>;

    fn last_response(&self) -> Option<ModelResponse> {
        self.responses().pop()
    }

    fn response_count(&self) -> usize {
        self.responses().len()
    }

    /// All generated images across the conversation; indices are global
    /// in document order.
    fn generated_images(&self) -> Vec<GeneratedImage> {
        self.responses()
            .into_iter()
            .flat_map(|response| response.images)
            .collect()
    }

    fn generated_image_count(&self) -> usize {
        self.generated_images().len()
    }

    /// Delegates an image download to the configured message channel.
    async fn download_image(&self, image: &GeneratedImage, options: &DownloadOptions)
        -> Result<()>;

    /// Permalink of the current conversation, or `None` on the app root.
    fn conversation_url(&self) -> Option<String>;

    /// Page language, detected from the send button label.
    fn locale(&self) -> Locale;
}

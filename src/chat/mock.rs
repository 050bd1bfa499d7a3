//! Mock [`ChatService`] for exercising orchestration code without a page.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::chat::ChatService;
use crate::error::Result;
use crate::models::{
    ChatMode, DownloadOptions, FileUpload, GeminiTool, GeneratedImage, GenerationState, Locale,
    ModelResponse, UploadedFile, WaitOptions,
};

/// Scriptable in-memory chat service.
///
/// Records every interaction and plays back queued turn results. With
/// an empty queue each turn fabricates a plain text response, so simple
/// tests need no setup at all.
#[derive(Clone)]
pub struct MockChatClient {
    locale: Locale,
    sent_prompts: Arc<Mutex<Vec<String>>>,
    uploaded_batches: Arc<Mutex<Vec<Vec<FileUpload>>>>,
    selected_tools: Arc<Mutex<Vec<GeminiTool>>>,
    deselected_tools: Arc<Mutex<Vec<GeminiTool>>>,
    download_requests: Arc<Mutex<Vec<(GeneratedImage, DownloadOptions)>>>,
    new_chat_count: Arc<Mutex<usize>>,
    stop_count: Arc<Mutex<usize>>,
    active_tool: Arc<Mutex<Option<GeminiTool>>>,
    mode: Arc<Mutex<ChatMode>>,
    state: Arc<Mutex<GenerationState>>,
    responses: Arc<Mutex<Vec<ModelResponse>>>,
    conversation_url: Arc<Mutex<Option<String>>>,
    scripted_conversation_url: Arc<Mutex<Option<String>>>,
    turn_results: Arc<Mutex<VecDeque<Result<ModelResponse>>>>,
    download_results: Arc<Mutex<VecDeque<Result<()>>>>,
}

impl MockChatClient {
    pub fn new() -> Self {
        Self {
            locale: Locale::Ko,
            sent_prompts: Arc::new(Mutex::new(Vec::new())),
            uploaded_batches: Arc::new(Mutex::new(Vec::new())),
            selected_tools: Arc::new(Mutex::new(Vec::new())),
            deselected_tools: Arc::new(Mutex::new(Vec::new())),
            download_requests: Arc::new(Mutex::new(Vec::new())),
            new_chat_count: Arc::new(Mutex::new(0)),
            stop_count: Arc::new(Mutex::new(0)),
            active_tool: Arc::new(Mutex::new(None)),
            mode: Arc::new(Mutex::new(ChatMode::Fast)),
            state: Arc::new(Mutex::new(GenerationState::Idle)),
            responses: Arc::new(Mutex::new(Vec::new())),
            conversation_url: Arc::new(Mutex::new(None)),
            scripted_conversation_url: Arc::new(Mutex::new(None)),
            turn_results: Arc::new(Mutex::new(VecDeque::new())),
            download_results: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    /// Seeds the conversation URL. A chat reset clears the live value;
    /// the next completed turn claims the seed again.
    pub fn with_conversation_url(self, url: &str) -> Self {
        *self.scripted_conversation_url.lock().unwrap() = Some(url.to_string());
        *self.conversation_url.lock().unwrap() = Some(url.to_string());
        self
    }

    pub fn with_state(self, state: GenerationState) -> Self {
        *self.state.lock().unwrap() = state;
        self
    }

    pub fn with_mode(self, mode: ChatMode) -> Self {
        *self.mode.lock().unwrap() = mode;
        self
    }

    pub fn with_active_tool(self, tool: GeminiTool) -> Self {
        *self.active_tool.lock().unwrap() = Some(tool);
        self
    }

    /// Queues a successful turn result for the next `generate` or
    /// `wait_for_response` call.
    pub fn with_turn(self, response: ModelResponse) -> Self {
        self.turn_results.lock().unwrap().push_back(Ok(response));
        self
    }

    /// Queues a failed turn result.
    pub fn with_turn_error(self, error: crate::error::Error) -> Self {
        self.turn_results.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn with_download_error(self, error: crate::error::Error) -> Self {
        self.download_results.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn get_sent_prompts(&self) -> Vec<String> {
        self.sent_prompts.lock().unwrap().clone()
    }

    pub fn get_prompt_count(&self) -> usize {
        self.sent_prompts.lock().unwrap().len()
    }

    pub fn get_uploaded_batches(&self) -> Vec<Vec<FileUpload>> {
        self.uploaded_batches.lock().unwrap().clone()
    }

    pub fn get_selected_tools(&self) -> Vec<GeminiTool> {
        self.selected_tools.lock().unwrap().clone()
    }

    pub fn get_deselected_tools(&self) -> Vec<GeminiTool> {
        self.deselected_tools.lock().unwrap().clone()
    }

    pub fn get_download_requests(&self) -> Vec<(GeneratedImage, DownloadOptions)> {
        self.download_requests.lock().unwrap().clone()
    }

    pub fn get_download_count(&self) -> usize {
        self.download_requests.lock().unwrap().len()
    }

    pub fn get_new_chat_count(&self) -> usize {
        *self.new_chat_count.lock().unwrap()
    }

    pub fn get_stop_count(&self) -> usize {
        *self.stop_count.lock().unwrap()
    }

    /// Plays back the next queued turn, fabricating a plain completed
    /// response when the queue is empty.
    fn next_turn(&self, prompt: Option<&str>) -> Result<ModelResponse> {
        let queued = self.turn_results.lock().unwrap().pop_front();
        match queued {
            Some(Ok(response)) => {
                let mut state = self.state.lock().unwrap();
                *state = if response.images.is_empty() {
                    GenerationState::Completed
                } else {
                    GenerationState::ImageCompleted
                };
                drop(state);
                self.responses.lock().unwrap().push(response.clone());
                self.claim_conversation_url();
                Ok(response)
            }
            Some(Err(error)) => {
                *self.state.lock().unwrap() = GenerationState::Error;
                Err(error)
            }
            None => {
                let mut responses = self.responses.lock().unwrap();
                let response = ModelResponse {
                    index: responses.len(),
                    text: match prompt {
                        Some(prompt) => format!("mock response to: {prompt}"),
                        None => "mock response".to_string(),
                    },
                    images: Vec::new(),
                    is_error: false,
                    error_message: None,
                };
                responses.push(response.clone());
                drop(responses);
                *self.state.lock().unwrap() = GenerationState::Completed;
                self.claim_conversation_url();
                Ok(response)
            }
        }
    }

    /// A completed turn claims a conversation URL when none is set, the
    /// way the live page leaves the app root on the first send. The
    /// seeded URL wins; otherwise one is made up from the turn number.
    fn claim_conversation_url(&self) {
        let mut url = self.conversation_url.lock().unwrap();
        if url.is_none() {
            *url = Some(
                match self.scripted_conversation_url.lock().unwrap().clone() {
                    Some(scripted) => scripted,
                    None => {
                        let turn = self.responses.lock().unwrap().len();
                        format!("https://gemini.google.com/app/mock{turn:04}")
                    }
                },
            );
        }
    }
}

impl Default for MockChatClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatService for MockChatClient {
    fn start_new_chat(&self) -> Result<()> {
        *self.new_chat_count.lock().unwrap() += 1;
        self.responses.lock().unwrap().clear();
        *self.state.lock().unwrap() = GenerationState::Idle;
        *self.conversation_url.lock().unwrap() = None;
        Ok(())
    }

    fn send_prompt(&self, text: &str) -> Result<()> {
        self.sent_prompts.lock().unwrap().push(text.to_string());
        *self.state.lock().unwrap() = GenerationState::Generating;
        Ok(())
    }

    fn upload_files(&self, files: &[FileUpload]) -> Result<Vec<UploadedFile>> {
        self.uploaded_batches.lock().unwrap().push(files.to_vec());
        Ok(files
            .iter()
            .map(|file| UploadedFile {
                filename: file.name.clone(),
                mime_type: file.mime_type.clone(),
                preview_url: None,
            })
            .collect())
    }

    fn select_tool(&self, tool: GeminiTool) -> Result<()> {
        self.selected_tools.lock().unwrap().push(tool);
        *self.active_tool.lock().unwrap() = Some(tool);
        Ok(())
    }

    fn deselect_tool(&self, tool: GeminiTool) -> Result<()> {
        self.deselected_tools.lock().unwrap().push(tool);
        let mut active = self.active_tool.lock().unwrap();
        if *active == Some(tool) {
            *active = None;
        }
        Ok(())
    }

    fn active_tool(&self) -> Option<GeminiTool> {
        *self.active_tool.lock().unwrap()
    }

    fn switch_mode(&self, mode: ChatMode) -> Result<()> {
        *self.mode.lock().unwrap() = mode;
        Ok(())
    }

    fn current_mode(&self) -> ChatMode {
        *self.mode.lock().unwrap()
    }

    fn generation_state(&self) -> GenerationState {
        *self.state.lock().unwrap()
    }

    fn stop_generation(&self) -> Result<()> {
        *self.stop_count.lock().unwrap() += 1;
        *self.state.lock().unwrap() = GenerationState::Idle;
        Ok(())
    }

    async fn wait_for_response(&self, _options: &WaitOptions) -> Result<ModelResponse> {
        self.next_turn(None)
    }

    async fn generate(&self, prompt: &str, options: &WaitOptions) -> Result<ModelResponse> {
        self.send_prompt(prompt)?;
        if options.is_cancelled() {
            return Err(crate::error::Error::invalid_state("generation aborted"));
        }
        self.next_turn(Some(prompt))
    }

    fn responses(&self) -> Vec<ModelResponse> {
        self.responses.lock().unwrap().clone()
    }

    async fn download_image(
        &self,
        image: &GeneratedImage,
        options: &DownloadOptions,
    ) -> Result<()> {
        self.download_requests
            .lock()
            .unwrap()
            .push((image.clone(), options.clone()));
        self.download_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()))
    }

    fn conversation_url(&self) -> Option<String> {
        self.conversation_url.lock().unwrap().clone()
    }

    fn locale(&self) -> Locale {
        self.locale
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[tokio::test]
    async fn test_mock_records_interactions() {
        let mock = MockChatClient::new();

        mock.start_new_chat().unwrap();
        mock.select_tool(GeminiTool::ImageGeneration).unwrap();
        let response = mock.generate("a red balloon", &WaitOptions::default()).await.unwrap();

        assert_eq!(mock.get_new_chat_count(), 1);
        assert_eq!(mock.get_selected_tools(), vec![GeminiTool::ImageGeneration]);
        assert_eq!(mock.get_sent_prompts(), vec!["a red balloon"]);
        assert_eq!(mock.active_tool(), Some(GeminiTool::ImageGeneration));
        assert!(response.text.contains("a red balloon"));
        assert_eq!(mock.generation_state(), GenerationState::Completed);
        assert_eq!(mock.response_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_plays_back_queued_turns() {
        let image = GeneratedImage {
            index: 0,
            response_index: 0,
            preview_url: "https://example.com/preview=s1024".to_string(),
            original_url: "https://example.com/preview=s0".to_string(),
        };
        let scripted = ModelResponse {
            index: 0,
            text: "scripted".to_string(),
            images: vec![image],
            is_error: false,
            error_message: None,
        };
        let mock = MockChatClient::new()
            .with_turn(scripted.clone())
            .with_turn_error(Error::generation_failed("boom"));

        let first = mock.generate("one", &WaitOptions::default()).await.unwrap();
        assert_eq!(first, scripted);
        assert_eq!(mock.generation_state(), GenerationState::ImageCompleted);

        let second = mock.generate("two", &WaitOptions::default()).await;
        assert_eq!(second, Err(Error::generation_failed("boom")));
        assert_eq!(mock.generation_state(), GenerationState::Error);
    }

    #[tokio::test]
    async fn test_mock_download_queue() {
        let image = GeneratedImage {
            index: 0,
            response_index: 0,
            preview_url: String::new(),
            original_url: "https://example.com/img=s0".to_string(),
        };
        let mock = MockChatClient::new()
            .with_download_error(Error::download_failed("offline"));

        let err = mock
            .download_image(&image, &DownloadOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err, Error::download_failed("offline"));

        // Queue drained; subsequent downloads succeed.
        mock.download_image(&image, &DownloadOptions::default())
            .await
            .unwrap();
        assert_eq!(mock.get_download_count(), 2);
    }

    #[test]
    fn test_mock_new_chat_resets() {
        let mock = MockChatClient::new()
            .with_conversation_url("https://gemini.google.com/app/abc123")
            .with_state(GenerationState::Completed);

        mock.start_new_chat().unwrap();
        assert_eq!(mock.conversation_url(), None);
        assert_eq!(mock.generation_state(), GenerationState::Idle);
    }

    #[tokio::test]
    async fn test_mock_turns_reclaim_conversation_url() {
        let mock = MockChatClient::new()
            .with_conversation_url("https://gemini.google.com/app/run01");

        // The seed survives a chat reset and comes back with the next
        // completed turn.
        mock.start_new_chat().unwrap();
        assert_eq!(mock.conversation_url(), None);
        mock.generate("one", &WaitOptions::default()).await.unwrap();
        assert_eq!(
            mock.conversation_url().as_deref(),
            Some("https://gemini.google.com/app/run01")
        );

        // Without a seed the first turn makes a URL up.
        let bare = MockChatClient::new();
        bare.generate("two", &WaitOptions::default()).await.unwrap();
        assert_eq!(
            bare.conversation_url().as_deref(),
            Some("https://gemini.google.com/app/mock0001")
        );
    }
}

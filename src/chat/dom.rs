//! DOM-driven [`ChatService`] implementation
//!
//! Drives the Gemini web UI through injected [`Document`] and [`Window`]
//! capabilities. Structural lookups use the selector registry; anything
//! locale-dependent (button labels, menu item text, refusal phrases)
//! goes through the label tables, detecting the page locale first and
//! falling back to every locale so mixed-language pages still resolve.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::chat::ChatService;
use crate::dom::{Document, DomEvent, ElementHandle, Window};
use crate::error::{Error, Result};
use crate::messaging::{self, DownloadImageMessage, MessageSender};
use crate::models::{
    ChatMode, DownloadOptions, FileUpload, GeminiTool, GeneratedImage, GenerationState, Locale,
    ModelResponse, UploadedFile, WaitOptions,
};
use crate::selectors;

/// Automates one Gemini chat page through its DOM.
///
/// Holds no state of its own besides the injected capabilities, so a
/// single instance stays correct across navigations within the app.
pub struct DomChatClient {
    document: Arc<dyn Document>,
    window: Arc<dyn Window>,
    message_sender: Option<Arc<dyn MessageSender>>,
}

impl DomChatClient {
    pub fn new(document: Arc<dyn Document>, window: Arc<dyn Window>) -> Self {
        Self {
            document,
            window,
            message_sender: None,
        }
    }

    /// Attaches the channel used to delegate image downloads. Without
    /// one, [`ChatService::download_image`] fails.
    pub fn with_message_sender(mut self, sender: Arc<dyn MessageSender>) -> Self {
        self.message_sender = Some(sender);
        self
    }

    fn send_button_label(&self) -> String {
        self.document
            .query_selector(selectors::SEND_BUTTON)
            .and_then(|button| button.attribute("aria-label"))
            .unwrap_or_default()
    }

    fn all_buttons(&self) -> Vec<ElementHandle> {
        self.document.query_selector_all("button")
    }

    fn parse_responses(&self) -> Vec<ModelResponse> {
        let elements = self.document.query_selector_all(selectors::MODEL_RESPONSE);
        let mut global_image_index = 0;

        elements
            .iter()
            .enumerate()
            .map(|(response_index, element)| {
                let text = element.text_content().trim().to_string();
                let images = element
                    .query_selector_all(selectors::GENERATED_IMAGE_IMG)
                    .iter()
                    .map(|img| {
                        let preview_url = img.attribute("src").unwrap_or_default();
                        let image = GeneratedImage {
                            index: global_image_index,
                            response_index,
                            original_url: selectors::to_original_image_url(&preview_url),
                            preview_url,
                        };
                        global_image_index += 1;
                        image
                    })
                    .collect();

                let is_error = is_blocked_text(&text);
                ModelResponse {
                    index: response_index,
                    error_message: is_error.then(|| text.clone()),
                    text,
                    images,
                    is_error,
                }
            })
            .collect()
    }
}

/// True when the text matches a safety-refusal phrase in any locale.
fn is_blocked_text(text: &str) -> bool {
    Locale::ALL.iter().any(|&locale| {
        selectors::error_patterns(locale)
            .iter()
            .any(|pattern| text.contains(pattern))
    })
}

#[async_trait]
impl ChatService for DomChatClient {
    fn start_new_chat(&self) -> Result<()> {
        let link = self
            .document
            .query_selector(selectors::NEW_CHAT_LINK)
            .ok_or_else(|| Error::element_not_found(selectors::NEW_CHAT_LINK))?;

        link.click();
        debug!("Started new chat");
        Ok(())
    }

    fn send_prompt(&self, text: &str) -> Result<()> {
        let textbox = self
            .document
            .query_selector(selectors::PROMPT_INPUT)
            .ok_or_else(|| Error::element_not_found(selectors::PROMPT_INPUT))?;

        let send_button = self
            .document
            .query_selector(selectors::SEND_BUTTON)
            .ok_or_else(|| Error::element_not_found(selectors::SEND_BUTTON))?;

        textbox.set_text_content(text);
        textbox.dispatch(DomEvent::Input);
        send_button.click();
        debug!("Sent prompt ({} chars)", text.chars().count());
        Ok(())
    }

    fn upload_files(&self, files: &[FileUpload]) -> Result<Vec<UploadedFile>> {
        let upload_button = self
            .document
            .query_selector(selectors::UPLOAD_BUTTON)
            .ok_or_else(|| Error::element_not_found(selectors::UPLOAD_BUTTON))?;

        upload_button.click();

        let file_input = self
            .document
            .query_selector(selectors::FILE_INPUT)
            .ok_or_else(|| Error::upload_failed("file input not found"))?;

        file_input.set_files(files);
        file_input.dispatch(DomEvent::Change);
        debug!("Attached {} files to the composer", files.len());

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
        if self.active_tool() == Some(tool) {
            debug!("Tool {} already active", tool.as_str());
            return Ok(());
        }

        let locale = self.locale();
        let button_labels = selectors::label_candidates(locale, |l| {
            selectors::aria_labels(l).tools_button
        });
        let tools_button = self
            .all_buttons()
            .into_iter()
            .find(|button| {
                let aria_label = button.attribute("aria-label").unwrap_or_default();
                let text = button.text_content().trim().to_string();
                button_labels
                    .iter()
                    .any(|label| aria_label.contains(label) || text.contains(label))
            })
            .ok_or_else(|| Error::element_not_found(selectors::aria_labels(locale).tools_button))?;

        tools_button.click();

        let item_labels = selectors::label_candidates(locale, |l| selectors::tool_label(l, tool));
        let menu_item = self
            .document
            .query_selector_all(r#"[role="menuitemcheckbox"]"#)
            .into_iter()
            .find(|item| {
                let text = item.text_content().trim().to_string();
                item_labels.iter().any(|label| text.contains(label))
            })
            .ok_or_else(|| Error::element_not_found(item_labels[0]))?;

        menu_item.click();
        debug!("Selected {} tool", tool.as_str());
        Ok(())
    }

    fn deselect_tool(&self, tool: GeminiTool) -> Result<()> {
        if self.active_tool() != Some(tool) {
            return Ok(());
        }

        let labels: Vec<String> = Locale::ALL
            .iter()
            .map(|&l| selectors::tool_label(l, tool).to_lowercase())
            .collect();
        let keywords: Vec<String> = Locale::ALL
            .iter()
            .map(|&l| selectors::deselect_keyword(l).to_lowercase())
            .collect();

        let chip = self
            .all_buttons()
            .into_iter()
            .find(|button| {
                let text = button.text_content().trim().to_lowercase();
                labels.iter().any(|label| text.contains(label))
                    && keywords.iter().any(|keyword| text.contains(keyword))
            })
            .ok_or_else(|| Error::element_not_found(tool.as_str()))?;

        chip.click();
        debug!("Deselected {} tool", tool.as_str());
        Ok(())
    }

    fn active_tool(&self) -> Option<GeminiTool> {
        let button_texts: Vec<String> = self
            .all_buttons()
            .iter()
            .map(|button| button.text_content().trim().to_string())
            .filter(|text| !text.is_empty())
            .collect();

        for locale in Locale::ALL {
            let keyword = selectors::deselect_keyword(locale);
            for tool in GeminiTool::ALL {
                let label = selectors::tool_label(locale, tool);
                let selected = button_texts.iter().any(|text| match locale {
                    // English chips vary in capitalization.
                    Locale::En => {
                        let text = text.to_lowercase();
                        text.contains(&label.to_lowercase()) && text.contains(keyword)
                    }
                    Locale::Ko => text.contains(label) && text.contains(keyword),
                });
                if selected {
                    return Some(tool);
                }
            }
        }
        None
    }

    fn switch_mode(&self, mode: ChatMode) -> Result<()> {
        if self.current_mode() == mode {
            return Ok(());
        }

        let mode_switch = self
            .document
            .query_selector(selectors::MODE_SWITCH)
            .ok_or_else(|| Error::element_not_found(selectors::MODE_SWITCH))?;

        mode_switch.click();

        let locale = self.locale();
        let item_labels = selectors::label_candidates(locale, |l| selectors::mode_label(l, mode));
        let menu_item = self
            .document
            .query_selector_all(r#"[role="menuitemradio"]"#)
            .into_iter()
            .find(|item| {
                let text = item.text_content().trim().to_string();
                item_labels.iter().any(|label| text.contains(label))
            })
            .ok_or_else(|| Error::element_not_found(item_labels[0]))?;

        menu_item.click();
        debug!("Switched to {} mode", mode.as_str());
        Ok(())
    }

    fn current_mode(&self) -> ChatMode {
        let mode_text = self
            .document
            .query_selector(selectors::MODE_SWITCH)
            .map(|element| element.text_content())
            .unwrap_or_default();

        // Thinking and Pro are checked before Fast: the switch text can
        // embed more than one label and the specific ones win.
        for locale in Locale::ALL {
            if mode_text.contains(selectors::mode_label(locale, ChatMode::Thinking)) {
                return ChatMode::Thinking;
            }
            if mode_text.contains(selectors::mode_label(locale, ChatMode::Pro)) {
                return ChatMode::Pro;
            }
            if mode_text.contains(selectors::mode_label(locale, ChatMode::Fast)) {
                return ChatMode::Fast;
            }
        }
        ChatMode::Fast
    }

    fn generation_state(&self) -> GenerationState {
        // The stop label wins over everything else: while it shows, the
        // model is producing output no matter what the transcript holds.
        let send_label = self.send_button_label();
        let stopping = Locale::ALL
            .iter()
            .any(|&l| send_label.contains(selectors::aria_labels(l).stop_button));
        if stopping {
            return GenerationState::Generating;
        }

        let responses = self.document.query_selector_all(selectors::MODEL_RESPONSE);
        let Some(last) = responses.last() else {
            return GenerationState::Idle;
        };

        // Feedback controls appear only once a turn has settled.
        let has_feedback = Locale::ALL.iter().any(|&l| {
            let selector = format!(
                r#"button[aria-label="{}"]"#,
                selectors::aria_labels(l).thumbs_up
            );
            last.query_selector(&selector).is_some()
        });
        if !has_feedback {
            return GenerationState::Idle;
        }

        let text = last.text_content().trim().to_string();
        if is_blocked_text(&text) {
            return GenerationState::Error;
        }

        if last.query_selector(selectors::GENERATED_IMAGE).is_some() {
            GenerationState::ImageCompleted
        } else {
            GenerationState::Completed
        }
    }

    fn stop_generation(&self) -> Result<()> {
        if !self.is_generating() {
            return Ok(());
        }

        let send_button = self
            .document
            .query_selector(selectors::SEND_BUTTON)
            .ok_or_else(|| Error::element_not_found(selectors::SEND_BUTTON))?;

        send_button.click();
        debug!("Stopped generation");
        Ok(())
    }

    async fn wait_for_response(&self, options: &WaitOptions) -> Result<ModelResponse> {
        let timeout_ms = options.timeout_ms();
        let poll_interval = options.poll_interval();
        let deadline = tokio::time::Instant::now() + options.timeout();

        while tokio::time::Instant::now() < deadline {
            if options.is_cancelled() {
                if let Err(error) = self.stop_generation() {
                    warn!("Failed to stop generation after cancel: {}", error);
                }
                return Err(Error::invalid_state("generation aborted"));
            }

            let state = self.generation_state();
            if state.is_terminal() {
                if let Some(last) = self.last_response() {
                    if state == GenerationState::Error {
                        return Err(Error::policy_blocked(
                            last.error_message.unwrap_or_default(),
                        ));
                    }
                    debug!("Turn settled with state {}", state.as_str());
                    return Ok(last);
                }
            }

            tokio::time::sleep(poll_interval).await;
        }

        Err(Error::timeout("wait_for_response", timeout_ms))
    }

    async fn generate(&self, prompt: &str, options: &WaitOptions) -> Result<ModelResponse> {
        self.send_prompt(prompt)?;

        if options.is_cancelled() {
            return Err(Error::invalid_state("generation aborted"));
        }

        self.wait_for_response(options).await
    }

    fn responses(&self) -> Vec<ModelResponse> {
        self.parse_responses()
    }

    async fn download_image(
        &self,
        image: &GeneratedImage,
        options: &DownloadOptions,
    ) -> Result<()> {
        let Some(sender) = &self.message_sender else {
            return Err(Error::download_failed("message sender not configured"));
        };

        let message = DownloadImageMessage::new(
            &image.original_url,
            options.filename.clone(),
            options.conflict_action,
        );
        let payload = serde_json::to_value(&message)
            .map_err(|error| Error::unknown(format!("serialize download request: {error}")))?;

        debug!("Requesting download of {}", image.original_url);
        let reply = sender
            .send(payload)
            .await
            .map_err(|error| Error::download_failed(error.to_string()))?;

        messaging::interpret_download_reply(&reply).map_err(Error::download_failed)
    }

    fn conversation_url(&self) -> Option<String> {
        let href = self.window.location_href();
        selectors::CONVERSATION_URL_PATTERN
            .is_match(&href)
            .then_some(href)
    }

    fn locale(&self) -> Locale {
        let label = self.send_button_label();
        if label == selectors::aria_labels(Locale::En).send_button {
            Locale::En
        } else {
            Locale::Ko
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{FakePage, GenerationScript, ResponseFixture, ScriptedReply};
    use crate::error::ErrorKind;
    use crate::models::ConflictAction;
    use crate::messaging::MockMessageSender;
    use serde_json::json;
    use tokio_util::sync::CancellationToken;

    fn client(page: &FakePage) -> DomChatClient {
        DomChatClient::new(page.document(), page.window())
    }

    #[test]
    fn test_locale_detection() {
        let page = FakePage::builder().send_button("메시지 보내기").build();
        assert_eq!(client(&page).locale(), Locale::Ko);

        let page = FakePage::builder().send_button("Send message").build();
        assert_eq!(client(&page).locale(), Locale::En);

        // Missing send button defaults to Korean.
        let page = FakePage::builder().build();
        assert_eq!(client(&page).locale(), Locale::Ko);
    }

    #[test]
    fn test_send_prompt_sets_text_and_clicks() {
        let page = FakePage::builder()
            .prompt_input()
            .send_button("메시지 보내기")
            .build();

        client(&page).send_prompt("테스트 프롬프트").unwrap();

        assert_eq!(page.prompt_text(), "테스트 프롬프트");
        assert_eq!(
            page.events(selectors::PROMPT_INPUT),
            vec![DomEvent::Input]
        );
        assert_eq!(page.click_count(selectors::SEND_BUTTON), 1);
    }

    #[test]
    fn test_send_prompt_missing_elements() {
        let page = FakePage::builder().send_button("메시지 보내기").build();
        let err = client(&page).send_prompt("테스트").unwrap_err();
        assert_eq!(err, Error::element_not_found(selectors::PROMPT_INPUT));

        let page = FakePage::builder().prompt_input().build();
        let err = client(&page).send_prompt("테스트").unwrap_err();
        assert_eq!(err, Error::element_not_found(selectors::SEND_BUTTON));
    }

    #[test]
    fn test_start_new_chat() {
        let page = FakePage::builder().new_chat_link().build();
        client(&page).start_new_chat().unwrap();
        assert_eq!(page.click_count(selectors::NEW_CHAT_LINK), 1);

        let page = FakePage::builder().build();
        let err = client(&page).start_new_chat().unwrap_err();
        assert_eq!(err, Error::element_not_found(selectors::NEW_CHAT_LINK));
    }

    #[test]
    fn test_conversation_url() {
        let page = FakePage::builder()
            .href("https://gemini.google.com/app/abcdef1234")
            .build();
        assert_eq!(
            client(&page).conversation_url(),
            Some("https://gemini.google.com/app/abcdef1234".to_string())
        );

        let page = FakePage::builder().href("https://gemini.google.com/app").build();
        assert_eq!(client(&page).conversation_url(), None);

        let page = FakePage::builder().href("https://example.com/not-gemini").build();
        assert_eq!(client(&page).conversation_url(), None);
    }

    #[test]
    fn test_generation_state_stop_label_wins() {
        // With responses present.
        let page = FakePage::builder()
            .send_button("대답 생성 중지")
            .response(ResponseFixture::text("생성 중 응답"))
            .build();
        assert_eq!(client(&page).generation_state(), GenerationState::Generating);
        assert!(client(&page).is_generating());

        // Even with no responses at all.
        let page = FakePage::builder().send_button("대답 생성 중지").build();
        assert_eq!(client(&page).generation_state(), GenerationState::Generating);

        // English stop label too.
        let page = FakePage::builder().send_button("Stop generating").build();
        assert_eq!(client(&page).generation_state(), GenerationState::Generating);
    }

    #[test]
    fn test_generation_state_idle_cases() {
        // Empty conversation.
        let page = FakePage::builder().send_button("메시지 보내기").build();
        assert_eq!(client(&page).generation_state(), GenerationState::Idle);

        // Last response has no feedback controls yet.
        let page = FakePage::builder()
            .send_button("메시지 보내기")
            .response(ResponseFixture::text("아직 진행 중"))
            .build();
        assert_eq!(client(&page).generation_state(), GenerationState::Idle);
    }

    #[test]
    fn test_generation_state_terminal_cases() {
        let page = FakePage::builder()
            .send_button("메시지 보내기")
            .response(ResponseFixture::text("완료된 텍스트").with_thumbs_up())
            .build();
        assert_eq!(client(&page).generation_state(), GenerationState::Completed);

        let page = FakePage::builder()
            .send_button("메시지 보내기")
            .response(
                ResponseFixture::text("완료된 이미지 응답")
                    .with_images(1)
                    .with_thumbs_up(),
            )
            .build();
        assert_eq!(
            client(&page).generation_state(),
            GenerationState::ImageCompleted
        );

        let page = FakePage::builder()
            .send_button("메시지 보내기")
            .response(ResponseFixture::text("안전 장치로 인해 생성할 수 없습니다").with_thumbs_up())
            .build();
        assert_eq!(client(&page).generation_state(), GenerationState::Error);

        // English refusal phrasing is recognized on a Korean page.
        let page = FakePage::builder()
            .send_button("메시지 보내기")
            .response(
                ResponseFixture::text("I am unable to generate that image").with_thumbs_up(),
            )
            .build();
        assert_eq!(client(&page).generation_state(), GenerationState::Error);
    }

    #[test]
    fn test_stop_generation() {
        let page = FakePage::builder()
            .send_button("대답 생성 중지")
            .response(ResponseFixture::text("생성 중 응답"))
            .build();
        client(&page).stop_generation().unwrap();
        assert_eq!(page.click_count(selectors::SEND_BUTTON), 1);

        // No-op when idle.
        let page = FakePage::builder()
            .send_button("메시지 보내기")
            .response(ResponseFixture::text("완료 응답").with_thumbs_up())
            .build();
        client(&page).stop_generation().unwrap();
        assert_eq!(page.click_count(selectors::SEND_BUTTON), 0);
    }

    #[test]
    fn test_current_mode() {
        let page = FakePage::builder().mode_switch("빠른 모드").build();
        assert_eq!(client(&page).current_mode(), ChatMode::Fast);

        let page = FakePage::builder().mode_switch("사고 모드").build();
        assert_eq!(client(&page).current_mode(), ChatMode::Thinking);

        let page = FakePage::builder().mode_switch("Pro").build();
        assert_eq!(client(&page).current_mode(), ChatMode::Pro);

        let page = FakePage::builder().mode_switch("Thinking").build();
        assert_eq!(client(&page).current_mode(), ChatMode::Thinking);

        // Missing switch defaults to fast.
        let page = FakePage::builder().build();
        assert_eq!(client(&page).current_mode(), ChatMode::Fast);
    }

    #[test]
    fn test_switch_mode() {
        let page = FakePage::builder()
            .mode_switch("빠른 모드")
            .menu_item("menuitemradio", "사고 모드")
            .build();

        client(&page).switch_mode(ChatMode::Thinking).unwrap();
        assert_eq!(page.click_count(selectors::MODE_SWITCH), 1);
        assert_eq!(page.click_count(r#"[role="menuitemradio"]"#), 1);
    }

    #[test]
    fn test_switch_mode_noop_when_current() {
        let page = FakePage::builder().mode_switch("빠른 모드").build();
        client(&page).switch_mode(ChatMode::Fast).unwrap();
        assert_eq!(page.click_count(selectors::MODE_SWITCH), 0);
    }

    #[test]
    fn test_switch_mode_missing_elements() {
        let page = FakePage::builder().build();
        let err = client(&page).switch_mode(ChatMode::Thinking).unwrap_err();
        assert_eq!(err, Error::element_not_found(selectors::MODE_SWITCH));

        // Menu item missing: the switch was already clicked, no rollback.
        let page = FakePage::builder().mode_switch("빠른 모드").build();
        let err = client(&page).switch_mode(ChatMode::Thinking).unwrap_err();
        assert_eq!(err, Error::element_not_found("사고 모드"));
        assert_eq!(page.click_count(selectors::MODE_SWITCH), 1);
    }

    #[test]
    fn test_select_tool_clicks_button_then_menu_item() {
        let page = FakePage::builder()
            .tools_button("도구")
            .menu_item("menuitemcheckbox", "이미지 생성하기")
            .build();

        client(&page).select_tool(GeminiTool::ImageGeneration).unwrap();
        assert_eq!(page.click_count(r#"button[aria-label="도구"]"#), 1);
        assert_eq!(page.click_count(r#"[role="menuitemcheckbox"]"#), 1);
    }

    #[test]
    fn test_select_tool_noop_when_already_active() {
        let page = FakePage::builder()
            .tools_button("도구")
            .deselect_chip("이미지 생성하기 선택 해제")
            .build();

        client(&page).select_tool(GeminiTool::ImageGeneration).unwrap();
        assert_eq!(page.click_count(r#"button[aria-label="도구"]"#), 0);
    }

    #[test]
    fn test_select_tool_missing_elements() {
        let page = FakePage::builder().build();
        let err = client(&page)
            .select_tool(GeminiTool::ImageGeneration)
            .unwrap_err();
        assert_eq!(err, Error::element_not_found("도구"));

        // Menu never renders the tool: menu stays open, error names the
        // label that was searched for.
        let page = FakePage::builder().tools_button("도구").build();
        let err = client(&page)
            .select_tool(GeminiTool::ImageGeneration)
            .unwrap_err();
        assert_eq!(err, Error::element_not_found("이미지 생성하기"));
        assert_eq!(page.click_count(r#"button[aria-label="도구"]"#), 1);
    }

    #[test]
    fn test_active_tool() {
        let page = FakePage::builder().build();
        assert_eq!(client(&page).active_tool(), None);

        let page = FakePage::builder()
            .deselect_chip("이미지 생성하기 선택 해제")
            .build();
        assert_eq!(
            client(&page).active_tool(),
            Some(GeminiTool::ImageGeneration)
        );

        // English chips match case-insensitively.
        let page = FakePage::builder()
            .deselect_chip("Create Image, Deselect")
            .build();
        assert_eq!(
            client(&page).active_tool(),
            Some(GeminiTool::ImageGeneration)
        );
    }

    #[test]
    fn test_deselect_tool() {
        let page = FakePage::builder()
            .deselect_chip("이미지 생성하기 선택 해제")
            .build();

        client(&page)
            .deselect_tool(GeminiTool::ImageGeneration)
            .unwrap();
        assert_eq!(page.click_count("button"), 1);

        // Not active: nothing to do.
        let page = FakePage::builder().build();
        client(&page)
            .deselect_tool(GeminiTool::ImageGeneration)
            .unwrap();
    }

    #[test]
    fn test_upload_files() {
        let page = FakePage::builder().upload_button().file_input().build();
        let files = vec![
            FileUpload::new("image-a.png", "image/png", vec![1, 2, 3]),
            FileUpload::new("image-b.jpg", "image/jpeg", vec![4]),
        ];

        let uploaded = client(&page).upload_files(&files).unwrap();

        assert_eq!(page.click_count(selectors::UPLOAD_BUTTON), 1);
        assert_eq!(page.events(selectors::FILE_INPUT), vec![DomEvent::Change]);
        assert_eq!(page.uploaded_files(), files);
        assert_eq!(
            uploaded,
            vec![
                UploadedFile {
                    filename: "image-a.png".to_string(),
                    mime_type: "image/png".to_string(),
                    preview_url: None,
                },
                UploadedFile {
                    filename: "image-b.jpg".to_string(),
                    mime_type: "image/jpeg".to_string(),
                    preview_url: None,
                },
            ]
        );
    }

    #[test]
    fn test_upload_files_missing_elements() {
        let files = vec![FileUpload::new("a.png", "image/png", vec![])];

        let page = FakePage::builder().file_input().build();
        let err = client(&page).upload_files(&files).unwrap_err();
        assert_eq!(err, Error::element_not_found(selectors::UPLOAD_BUTTON));

        // Upload button present but the input never appears.
        let page = FakePage::builder().upload_button().build();
        let err = client(&page).upload_files(&files).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UploadFailed);
        assert_eq!(page.click_count(selectors::UPLOAD_BUTTON), 1);
    }

    #[test]
    fn test_responses_parsing() {
        let page = FakePage::builder()
            .response(ResponseFixture::text("첫 번째 응답").with_images(1))
            .response(ResponseFixture::text("두 번째 응답"))
            .build();
        let service = client(&page);

        let responses = service.responses();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0].index, 0);
        assert_eq!(responses[0].text, "첫 번째 응답");
        assert!(!responses[0].is_error);
        assert_eq!(responses[0].images.len(), 1);
        assert_eq!(
            responses[0].images[0],
            GeneratedImage {
                index: 0,
                response_index: 0,
                preview_url: "https://lh3.googleusercontent.com/image-0=s1024-rj".to_string(),
                original_url: "https://lh3.googleusercontent.com/image-0=s0".to_string(),
            }
        );
        assert_eq!(responses[1].index, 1);
        assert!(responses[1].images.is_empty());

        assert_eq!(service.response_count(), 2);
        assert_eq!(
            service.last_response().map(|r| r.text),
            Some("두 번째 응답".to_string())
        );
    }

    #[test]
    fn test_responses_error_detection() {
        let page = FakePage::builder()
            .response(ResponseFixture::text("안전 장치로 인해 생성할 수 없습니다").with_thumbs_up())
            .build();

        let response = client(&page).responses().remove(0);
        assert!(response.is_error);
        assert_eq!(
            response.error_message.as_deref(),
            Some("안전 장치로 인해 생성할 수 없습니다")
        );
    }

    #[test]
    fn test_generated_images_global_indices() {
        let page = FakePage::builder()
            .response(ResponseFixture::text("첫 응답").with_images(1))
            .response(ResponseFixture::text("둘째 응답").with_images(2))
            .build();
        let service = client(&page);

        let images = service.generated_images();
        assert_eq!(images.len(), 3);
        assert_eq!(
            images.iter().map(|i| (i.index, i.response_index)).collect::<Vec<_>>(),
            vec![(0, 0), (1, 1), (2, 1)]
        );
        assert_eq!(service.generated_image_count(), 3);
    }

    #[tokio::test]
    async fn test_wait_for_response_returns_settled_turn() {
        let page = FakePage::builder()
            .send_button("메시지 보내기")
            .response(ResponseFixture::text("완료된 응답").with_thumbs_up())
            .build();

        let options = WaitOptions::new().with_timeout_ms(500).with_poll_interval_ms(10);
        let response = client(&page).wait_for_response(&options).await.unwrap();
        assert_eq!(response.text, "완료된 응답");
    }

    #[tokio::test]
    async fn test_wait_for_response_times_out_while_generating() {
        let page = FakePage::builder()
            .send_button("대답 생성 중지")
            .response(ResponseFixture::text("계속 생성 중"))
            .build();

        let options = WaitOptions::new().with_timeout_ms(100).with_poll_interval_ms(10);
        let err = client(&page).wait_for_response(&options).await.unwrap_err();
        assert_eq!(err, Error::timeout("wait_for_response", 100));
    }

    #[tokio::test]
    async fn test_wait_for_response_policy_block() {
        let page = FakePage::builder()
            .send_button("메시지 보내기")
            .response(ResponseFixture::text("안전 장치로 인해 생성할 수 없습니다").with_thumbs_up())
            .build();

        let options = WaitOptions::new().with_timeout_ms(500).with_poll_interval_ms(10);
        let err = client(&page).wait_for_response(&options).await.unwrap_err();
        assert_eq!(
            err,
            Error::policy_blocked("안전 장치로 인해 생성할 수 없습니다")
        );
    }

    #[tokio::test]
    async fn test_wait_for_response_cancelled_stops_generation() {
        let page = FakePage::builder()
            .send_button("대답 생성 중지")
            .response(ResponseFixture::text("생성 중"))
            .build();

        let token = CancellationToken::new();
        token.cancel();
        let options = WaitOptions::new()
            .with_timeout_ms(500)
            .with_poll_interval_ms(10)
            .with_cancel(token);

        let err = client(&page).wait_for_response(&options).await.unwrap_err();
        assert_eq!(err, Error::invalid_state("generation aborted"));
        // The stop button was pressed on the way out.
        assert_eq!(page.click_count(selectors::SEND_BUTTON), 1);
    }

    #[tokio::test]
    async fn test_generate_round_trip_with_scripted_page() {
        let page = FakePage::builder()
            .send_button("메시지 보내기")
            .prompt_input()
            .script(
                GenerationScript::new(3)
                    .reply(ScriptedReply::text("생성된 이미지 응답").with_images(2)),
            )
            .build();

        let options = WaitOptions::new().with_timeout_ms(2_000).with_poll_interval_ms(5);
        let response = client(&page)
            .generate("바닷가 풍경", &options)
            .await
            .unwrap();

        assert!(response.text.contains("생성된 이미지 응답"));
        assert_eq!(response.images.len(), 2);
        assert_eq!(page.prompt_text(), "바닷가 풍경");
        // One click to send; the turn settled back to the send label.
        assert_eq!(page.click_count(selectors::SEND_BUTTON), 1);
    }

    #[tokio::test]
    async fn test_generate_cancelled_after_send() {
        let page = FakePage::builder()
            .send_button("메시지 보내기")
            .prompt_input()
            .build();

        let token = CancellationToken::new();
        token.cancel();
        let options = WaitOptions::new().with_cancel(token);

        let err = client(&page).generate("프롬프트", &options).await.unwrap_err();
        assert_eq!(err, Error::invalid_state("generation aborted"));
        // The prompt went out before the cancel check.
        assert_eq!(page.click_count(selectors::SEND_BUTTON), 1);
    }

    #[tokio::test]
    async fn test_download_image_requires_sender() {
        let page = FakePage::builder().build();
        let image = GeneratedImage {
            index: 0,
            response_index: 0,
            preview_url: "https://lh3.googleusercontent.com/image-0=s1024-rj".to_string(),
            original_url: "https://lh3.googleusercontent.com/image-0=s0".to_string(),
        };

        let err = client(&page)
            .download_image(&image, &DownloadOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DownloadFailed);
    }

    #[tokio::test]
    async fn test_download_image_message_payload() {
        let page = FakePage::builder().build();
        let sender = MockMessageSender::new();
        let service = DomChatClient::new(page.document(), page.window())
            .with_message_sender(Arc::new(sender.clone()));

        let image = GeneratedImage {
            index: 0,
            response_index: 0,
            preview_url: "https://lh3.googleusercontent.com/image-0=s1024-rj".to_string(),
            original_url: "https://lh3.googleusercontent.com/image-0=s0".to_string(),
        };
        let options = DownloadOptions {
            filename: Some("test.png".to_string()),
            conflict_action: ConflictAction::Overwrite,
        };

        service.download_image(&image, &options).await.unwrap();

        assert_eq!(
            sender.get_sent_messages(),
            vec![json!({
                "type": "DOWNLOAD_IMAGE",
                "url": "https://lh3.googleusercontent.com/image-0=s0",
                "filename": "test.png",
                "conflictAction": "overwrite",
            })]
        );
    }

    #[tokio::test]
    async fn test_download_image_failure_replies() {
        let page = FakePage::builder().build();
        let image = GeneratedImage {
            index: 0,
            response_index: 0,
            preview_url: String::new(),
            original_url: "https://lh3.googleusercontent.com/x=s0".to_string(),
        };

        // Channel replies with an explicit failure.
        let sender = MockMessageSender::new()
            .with_reply(json!({ "success": false, "error": "quota exceeded" }));
        let service = DomChatClient::new(page.document(), page.window())
            .with_message_sender(Arc::new(sender));
        let err = service
            .download_image(&image, &DownloadOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err, Error::download_failed("quota exceeded"));

        // Transport itself fails; the reason is preserved.
        let sender = MockMessageSender::new().with_send_error("port closed");
        let service = DomChatClient::new(page.document(), page.window())
            .with_message_sender(Arc::new(sender));
        let err = service
            .download_image(&image, &DownloadOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err, Error::download_failed("port closed"));

        // A null reply counts as fire-and-forget success.
        let sender = MockMessageSender::new().with_reply(serde_json::Value::Null);
        let service = DomChatClient::new(page.document(), page.window())
            .with_message_sender(Arc::new(sender));
        service
            .download_image(&image, &DownloadOptions::default())
            .await
            .unwrap();
    }
}

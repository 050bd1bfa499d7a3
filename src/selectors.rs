//! Gemini web UI selectors and locale label registry
//!
//! The page at gemini.google.com/app is Angular-generated, so dynamic
//! class names and ids are useless as anchors. Structural selectors stick
//! to semantic attributes and custom elements; everything text-based goes
//! through the per-locale label tables below.
//!
//! Labels verified against the live UI as of 2026-02.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{ChatMode, GeminiTool, Locale};

/// Prompt input area (`contenteditable` div).
pub const PROMPT_INPUT: &str = r#"div[contenteditable="true"][role="textbox"]"#;

/// Send button. Turns into the stop button while a turn is generating;
/// only its aria-label changes.
pub const SEND_BUTTON: &str = "button.send-button";

/// File upload button (`+` icon in the composer).
pub const UPLOAD_BUTTON: &str = "button.upload-card-button";

/// Hidden file input behind the upload button.
pub const FILE_INPUT: &str = r#"input[type="file"]"#;

/// Mode switch control in the composer.
pub const MODE_SWITCH: &str = ".input-area-switch";

/// Custom element wrapping one model turn.
pub const MODEL_RESPONSE: &str = "model-response";

/// Custom element wrapping one generated image.
pub const GENERATED_IMAGE: &str = "generated-image";

/// The actual `img` tag inside a generated image.
pub const GENERATED_IMAGE_IMG: &str = r#"generated-image img[src*="googleusercontent"]"#;

/// Per-image download button.
pub const DOWNLOAD_BUTTON: &str = r#"button[data-test-id="download-generated-image-button"]"#;

/// New chat link in the sidebar.
pub const NEW_CHAT_LINK: &str = r#"a[href="/app"]"#;

/// Accessible labels for one locale. The UI translates every aria-label,
/// so text-based lookups must go through this table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AriaLabels {
    pub prompt_placeholder: &'static str,
    pub send_button: &'static str,
    pub stop_button: &'static str,
    pub upload_menu_open: &'static str,
    pub upload_menu_item: &'static str,
    pub tools_button: &'static str,
    pub download_button: &'static str,
    pub thumbs_up: &'static str,
    pub thumbs_down: &'static str,
}

const ARIA_LABELS_KO: AriaLabels = AriaLabels {
    prompt_placeholder: "여기에 프롬프트 입력",
    send_button: "메시지 보내기",
    stop_button: "대답 생성 중지",
    upload_menu_open: "파일 업로드 메뉴 열기",
    upload_menu_item: "파일 업로드",
    tools_button: "도구",
    download_button: "원본 크기 이미지 다운로드",
    thumbs_up: "마음에 들어요",
    thumbs_down: "마음에 들지 않아요",
};

const ARIA_LABELS_EN: AriaLabels = AriaLabels {
    prompt_placeholder: "Enter a prompt for Gemini",
    send_button: "Send message",
    stop_button: "Stop generating",
    upload_menu_open: "Open upload file menu",
    upload_menu_item: "Upload files",
    tools_button: "Tools",
    download_button: "Download full size image",
    thumbs_up: "Good response",
    thumbs_down: "Bad response",
};

pub fn aria_labels(locale: Locale) -> &'static AriaLabels {
    match locale {
        Locale::Ko => &ARIA_LABELS_KO,
        Locale::En => &ARIA_LABELS_EN,
    }
}

/// Text shown for a tool in the tools menu (`menuitemcheckbox`) and on
/// the active-tool chip.
pub fn tool_label(locale: Locale, tool: GeminiTool) -> &'static str {
    match (locale, tool) {
        (Locale::Ko, GeminiTool::ImageGeneration) => "이미지 생성하기",
        (Locale::Ko, GeminiTool::DeepResearch) => "Deep Research",
        (Locale::Ko, GeminiTool::VideoGeneration) => "동영상 만들기",
        (Locale::Ko, GeminiTool::Canvas) => "Canvas",
        (Locale::Ko, GeminiTool::CodeImport) => "코드 가져오기",
        (Locale::Ko, GeminiTool::GuidedLearning) => "가이드 학습",
        (Locale::Ko, GeminiTool::NotebookLm) => "NotebookLM",
        (Locale::En, GeminiTool::ImageGeneration) => "Create image",
        (Locale::En, GeminiTool::DeepResearch) => "Deep Research",
        (Locale::En, GeminiTool::VideoGeneration) => "Create video",
        (Locale::En, GeminiTool::Canvas) => "Canvas",
        (Locale::En, GeminiTool::CodeImport) => "Import code",
        (Locale::En, GeminiTool::GuidedLearning) => "Guided learning",
        (Locale::En, GeminiTool::NotebookLm) => "NotebookLM",
    }
}

/// Text shown for a mode in the mode menu (`menuitemradio`) and on the
/// mode switch control.
pub fn mode_label(locale: Locale, mode: ChatMode) -> &'static str {
    match (locale, mode) {
        (Locale::Ko, ChatMode::Fast) => "빠른 모드",
        (Locale::Ko, ChatMode::Thinking) => "사고 모드",
        (Locale::Ko, ChatMode::Pro) => "Pro",
        (Locale::En, ChatMode::Fast) => "Fast",
        (Locale::En, ChatMode::Thinking) => "Thinking",
        (Locale::En, ChatMode::Pro) => "Pro",
    }
}

/// Suffix on the active-tool chip that offers to deselect the tool.
/// English chips are matched case-insensitively.
pub fn deselect_keyword(locale: Locale) -> &'static str {
    match locale {
        Locale::Ko => "선택 해제",
        Locale::En => "deselect",
    }
}

/// Phrases that mark a response as a safety-policy refusal.
pub fn error_patterns(locale: Locale) -> &'static [&'static str] {
    match locale {
        Locale::Ko => &["안전 장치", "생성할 수 없습니다"],
        Locale::En => &["safety settings", "unable to generate"],
    }
}

/// Candidate labels for a text search: the detected locale first, then
/// every locale as a fallback. Mixed-locale pages do happen when the
/// account language and browser language disagree.
pub fn label_candidates<F>(detected: Locale, label_of: F) -> Vec<&'static str>
where
    F: Fn(Locale) -> &'static str,
{
    let mut candidates = vec![label_of(detected)];
    for locale in Locale::ALL {
        let label = label_of(locale);
        if !candidates.contains(&label) {
            candidates.push(label);
        }
    }
    candidates
}

/// Matches a conversation permalink (`/app/<id>`), not the app root.
pub static CONVERSATION_URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https://gemini\.google\.com/app/[^/?#]+").expect("valid conversation url regex")
});

static IMAGE_SIZE_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"=s\d+(-rj)?$").expect("valid image size suffix regex"));

/// Rewrites a googleusercontent preview url to its full-resolution
/// original by replacing the trailing size suffix with `=s0`.
/// Urls without a size suffix are returned unchanged.
pub fn to_original_image_url(preview_url: &str) -> String {
    IMAGE_SIZE_SUFFIX.replace(preview_url, "=s0").into_owned()
}

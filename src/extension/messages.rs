//! Wire shapes for extension messages.
//!
//! Every message is a JSON object tagged by an upper-snake `type`
//! field, with camelCase payload keys. Requests flow from the popup or
//! a page into the background router; responses flow back; commands go
//! from the background into a tab's content script.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Messages the background router accepts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ExtensionRequest {
    /// Liveness check from anywhere.
    #[serde(rename = "PING")]
    Ping,

    /// Popup opened and wants the current connection status.
    #[serde(rename = "POPUP_READY")]
    PopupReady,

    /// Explicit connection check, optionally for a specific tab.
    #[serde(rename = "CHECK_GEMINI_CONNECTION", rename_all = "camelCase")]
    CheckGeminiConnection {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tab_id: Option<u32>,
    },

    /// Asks the router to trigger a generation run in the requesting
    /// tab, or the focused one for popup requests.
    #[serde(rename = "GENERATE_IMAGE")]
    GenerateImage { prompt: String },

    /// Asks the browser to save a file under the given name.
    #[serde(rename = "DOWNLOAD_IMAGE")]
    DownloadImage { url: String, filename: String },
}

/// Replies from the background router.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ExtensionResponse {
    #[serde(rename = "PONG", rename_all = "camelCase")]
    Pong { is_gemini_tab: bool },

    #[serde(rename = "GEMINI_CONNECTION_STATUS", rename_all = "camelCase")]
    GeminiConnectionStatus {
        connected: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tab_id: Option<u32>,
    },

    #[serde(rename = "IMAGE_GENERATION_TRIGGERED")]
    ImageGenerationTriggered { accepted: bool },

    #[serde(rename = "DOWNLOAD_COMPLETE", rename_all = "camelCase")]
    DownloadComplete { download_id: u32 },

    #[serde(rename = "ERROR")]
    Error { message: String },
}

/// Commands delivered into a tab's content script.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ContentCommand {
    #[serde(rename = "RUN_IMAGE_GENERATION")]
    RunImageGeneration {
        prompt: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        options: Option<GenerationCommandOptions>,
    },
}

/// Extras carried alongside a generation command.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerationCommandOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Reference images as data urls.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reference_images: Vec<String>,
}

static GEMINI_APP_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https://gemini\.google\.com/app(/|$)").expect("valid app url regex")
});

/// True for the Gemini app root and anything under it.
pub fn is_gemini_app_url(url: &str) -> bool {
    GEMINI_APP_URL.is_match(url)
}

/// Decodes an incoming message, treating unknown or malformed shapes
/// as no message at all so routers can ignore them.
pub fn parse_request(value: &Value) -> Option<ExtensionRequest> {
    serde_json::from_value(value.clone()).ok()
}

//! Download delegation channel
//!
//! The page context cannot write to disk, so image downloads are
//! serialized into a message and handed to whatever channel the host
//! provides (in the extension, `chrome.runtime.sendMessage`). The
//! channel is transport-agnostic here: anything that can ship a JSON
//! value and return a JSON reply.

pub mod mock;

pub use mock::MockMessageSender;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::ConflictAction;

/// Wire name of the download request.
pub const DOWNLOAD_IMAGE_TYPE: &str = "DOWNLOAD_IMAGE";

/// Transport failure raised by a [`MessageSender`]. The reason text is
/// preserved verbatim in the resulting download error.
pub type SendError = Box<dyn std::error::Error + Send + Sync>;

/// One-shot message channel to the extension host.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, message: Value) -> std::result::Result<Value, SendError>;
}

/// Download request handed to the channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DownloadImageMessage {
    #[serde(rename = "type")]
    pub message_type: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub filename: Option<String>,
    pub conflict_action: ConflictAction,
}

impl DownloadImageMessage {
    pub fn new(url: impl Into<String>, filename: Option<String>, conflict_action: ConflictAction) -> Self {
        Self {
            message_type: DOWNLOAD_IMAGE_TYPE.to_string(),
            url: url.into(),
            filename,
            conflict_action,
        }
    }
}

/// Reads a channel reply as download success or failure.
///
/// A missing reply (JSON null) counts as success: fire-and-forget
/// channels reply with nothing. An object is a failure unless it says
/// `success: true`, with the `error` field as the reason.
pub fn interpret_download_reply(reply: &Value) -> std::result::Result<(), String> {
    let Value::Object(fields) = reply else {
        return Ok(());
    };

    if fields.get("success").and_then(Value::as_bool) == Some(true) {
        return Ok(());
    }

    let reason = fields
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("download failed");
    Err(reason.to_string())
}

//! Extension message plumbing.
//!
//! The popup, the background router and the page-driving side speak
//! tagged JSON messages to each other. [`messages`] defines the wire
//! shapes, [`relay`] routes requests the way the background process
//! does, and the bridge traits below abstract the browser surfaces the
//! relay touches (tab lookup, command delivery, downloads).

pub mod messages;
pub mod mock;
pub mod relay;

pub use messages::{
    is_gemini_app_url, parse_request, ContentCommand, ExtensionRequest, ExtensionResponse,
    GenerationCommandOptions,
};
pub use mock::{MockDownloadBridge, MockTabBridge};
pub use relay::{MessageRelay, TabInfo};

use async_trait::async_trait;

use crate::messaging::SendError;
use crate::models::ConflictAction;

/// Browser tab surface: lookup plus command delivery into a tab's
/// content script.
#[async_trait]
pub trait TabBridge: Send + Sync {
    /// The currently focused tab, if any.
    async fn active_tab(&self) -> Option<TabInfo>;

    /// Lookup by tab id.
    async fn tab_by_id(&self, tab_id: u32) -> Option<TabInfo>;

    /// Delivers a command to the content script in the given tab.
    async fn send_command(&self, tab_id: u32, command: ContentCommand)
        -> Result<(), SendError>;
}

/// Browser download surface.
#[async_trait]
pub trait DownloadBridge: Send + Sync {
    /// Starts a download and resolves to the browser's download id.
    async fn download(
        &self,
        url: &str,
        filename: Option<&str>,
        conflict_action: ConflictAction,
    ) -> Result<u32, SendError>;
}

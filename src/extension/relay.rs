//! Background message router.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::extension::messages::{
    is_gemini_app_url, ContentCommand, ExtensionRequest, ExtensionResponse,
};
use crate::extension::{DownloadBridge, TabBridge};
use crate::models::ConflictAction;

/// What the router knows about a browser tab.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabInfo {
    pub id: Option<u32>,
    pub url: Option<String>,
}

impl TabInfo {
    pub fn new(id: u32, url: &str) -> Self {
        Self {
            id: Some(id),
            url: Some(url.to_string()),
        }
    }

    pub fn is_gemini_app(&self) -> bool {
        self.url.as_deref().is_some_and(is_gemini_app_url)
    }
}

/// Routes [`ExtensionRequest`]s the way the background process does:
/// connection checks resolve against tab state, generation requests
/// are forwarded into the requesting tab (or the active one when the
/// request carries no tab, as from the popup), downloads go to the
/// browser download layer. Every failure becomes an
/// [`ExtensionResponse::Error`] rather than a transport fault.
pub struct MessageRelay {
    tabs: Arc<dyn TabBridge>,
    downloads: Arc<dyn DownloadBridge>,
}

impl MessageRelay {
    pub fn new(tabs: Arc<dyn TabBridge>, downloads: Arc<dyn DownloadBridge>) -> Self {
        Self { tabs, downloads }
    }

    pub async fn handle(
        &self,
        request: ExtensionRequest,
        sender_tab: Option<&TabInfo>,
    ) -> ExtensionResponse {
        match request {
            ExtensionRequest::Ping => ExtensionResponse::Pong {
                is_gemini_tab: sender_tab.is_some_and(TabInfo::is_gemini_app),
            },
            ExtensionRequest::PopupReady => self.connection_status(None).await,
            ExtensionRequest::CheckGeminiConnection { tab_id } => {
                self.connection_status(tab_id).await
            }
            ExtensionRequest::GenerateImage { prompt } => {
                self.trigger_generation(sender_tab, prompt).await
            }
            ExtensionRequest::DownloadImage { url, filename } => {
                debug!("Forwarding download request for {}", url);
                // The envelope names the file; conflict policy is fixed
                // here rather than carried on the wire.
                match self
                    .downloads
                    .download(&url, Some(filename.as_str()), ConflictAction::Uniquify)
                    .await
                {
                    Ok(download_id) => ExtensionResponse::DownloadComplete { download_id },
                    Err(error) => {
                        warn!("Download failed: {}", error);
                        ExtensionResponse::Error {
                            message: error.to_string(),
                        }
                    }
                }
            }
        }
    }

    async fn connection_status(&self, tab_id: Option<u32>) -> ExtensionResponse {
        let tab = match tab_id {
            Some(id) => self.tabs.tab_by_id(id).await,
            None => self.tabs.active_tab().await,
        };
        match tab {
            Some(tab) => ExtensionResponse::GeminiConnectionStatus {
                connected: tab.is_gemini_app(),
                tab_id: tab.id,
            },
            None => ExtensionResponse::GeminiConnectionStatus {
                connected: false,
                tab_id: None,
            },
        }
    }

    async fn trigger_generation(
        &self,
        sender_tab: Option<&TabInfo>,
        prompt: String,
    ) -> ExtensionResponse {
        // A page request names its own tab and runs there even when
        // another window has focus. A popup request carries no tab: it
        // targets the focused one, which must actually be the app.
        let (tab, from_sender) = match sender_tab {
            Some(tab) => (tab.clone(), true),
            None => match self.tabs.active_tab().await {
                Some(tab) => (tab, false),
                None => {
                    return ExtensionResponse::Error {
                        message: "no active tab available".to_string(),
                    }
                }
            },
        };
        let Some(tab_id) = tab.id else {
            return ExtensionResponse::Error {
                message: "no active tab available".to_string(),
            };
        };
        if !from_sender && !tab.is_gemini_app() {
            return ExtensionResponse::Error {
                message: "active tab is not the gemini app".to_string(),
            };
        }

        debug!("Triggering generation in tab {}", tab_id);
        let command = ContentCommand::RunImageGeneration {
            prompt,
            options: None,
        };
        match self.tabs.send_command(tab_id, command).await {
            Ok(()) => ExtensionResponse::ImageGenerationTriggered { accepted: true },
            Err(error) => {
                warn!("Failed to reach content script in tab {}: {}", tab_id, error);
                ExtensionResponse::Error {
                    message: error.to_string(),
                }
            }
        }
    }
}

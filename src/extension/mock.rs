//! Mock browser bridges for router tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::extension::messages::ContentCommand;
use crate::extension::relay::TabInfo;
use crate::extension::{DownloadBridge, TabBridge};
use crate::messaging::SendError;
use crate::models::ConflictAction;

/// In-memory tab table with a scriptable command channel.
#[derive(Clone)]
pub struct MockTabBridge {
    active: Arc<Mutex<Option<TabInfo>>>,
    tabs: Arc<Mutex<HashMap<u32, TabInfo>>>,
    sent_commands: Arc<Mutex<Vec<(u32, ContentCommand)>>>,
    send_error: Arc<Mutex<Option<String>>>,
}

impl MockTabBridge {
    pub fn new() -> Self {
        Self {
            active: Arc::new(Mutex::new(None)),
            tabs: Arc::new(Mutex::new(HashMap::new())),
            sent_commands: Arc::new(Mutex::new(Vec::new())),
            send_error: Arc::new(Mutex::new(None)),
        }
    }

    /// Sets the focused tab and registers it in the tab table.
    pub fn with_active_tab(self, tab: TabInfo) -> Self {
        if let Some(id) = tab.id {
            self.tabs.lock().unwrap().insert(id, tab.clone());
        }
        *self.active.lock().unwrap() = Some(tab);
        self
    }

    pub fn with_tab(self, tab: TabInfo) -> Self {
        if let Some(id) = tab.id {
            self.tabs.lock().unwrap().insert(id, tab);
        }
        self
    }

    /// Makes every subsequent command delivery fail with this reason.
    pub fn with_send_error(self, reason: &str) -> Self {
        *self.send_error.lock().unwrap() = Some(reason.to_string());
        self
    }

    pub fn get_sent_commands(&self) -> Vec<(u32, ContentCommand)> {
        self.sent_commands.lock().unwrap().clone()
    }

    pub fn get_command_count(&self) -> usize {
        self.sent_commands.lock().unwrap().len()
    }
}

impl Default for MockTabBridge {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TabBridge for MockTabBridge {
    async fn active_tab(&self) -> Option<TabInfo> {
        self.active.lock().unwrap().clone()
    }

    async fn tab_by_id(&self, tab_id: u32) -> Option<TabInfo> {
        self.tabs.lock().unwrap().get(&tab_id).cloned()
    }

    async fn send_command(
        &self,
        tab_id: u32,
        command: ContentCommand,
    ) -> Result<(), SendError> {
        if let Some(reason) = self.send_error.lock().unwrap().clone() {
            return Err(reason.into());
        }
        self.sent_commands.lock().unwrap().push((tab_id, command));
        Ok(())
    }
}

/// Download layer that hands out scripted download ids.
#[derive(Clone)]
pub struct MockDownloadBridge {
    requests: Arc<Mutex<Vec<(String, Option<String>, ConflictAction)>>>,
    replies: Arc<Mutex<VecDeque<Result<u32, String>>>>,
}

impl MockDownloadBridge {
    pub fn new() -> Self {
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
            replies: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    pub fn with_download_id(self, download_id: u32) -> Self {
        self.replies.lock().unwrap().push_back(Ok(download_id));
        self
    }

    pub fn with_error(self, reason: &str) -> Self {
        self.replies.lock().unwrap().push_back(Err(reason.to_string()));
        self
    }

    pub fn get_requests(&self) -> Vec<(String, Option<String>, ConflictAction)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn get_request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Default for MockDownloadBridge {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DownloadBridge for MockDownloadBridge {
    async fn download(
        &self,
        url: &str,
        filename: Option<&str>,
        conflict_action: ConflictAction,
    ) -> Result<u32, SendError> {
        self.requests.lock().unwrap().push((
            url.to_string(),
            filename.map(str::to_string),
            conflict_action,
        ));
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(download_id)) => Ok(download_id),
            Some(Err(reason)) => Err(reason.into()),
            // Unscripted downloads succeed with a sequential id.
            None => Ok(self.requests.lock().unwrap().len() as u32),
        }
    }
}

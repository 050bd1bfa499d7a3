use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{MessageSender, SendError};

/// Records every message and replies from a scripted queue. Once the
/// queue is empty it keeps answering `{ "success": true }`.
#[derive(Clone)]
pub struct MockMessageSender {
    sent: Arc<Mutex<Vec<Value>>>,
    replies: Arc<Mutex<VecDeque<std::result::Result<Value, String>>>>,
}

impl MockMessageSender {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            replies: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Queues one reply value for the next send.
    pub fn with_reply(self, reply: Value) -> Self {
        self.replies.lock().unwrap().push_back(Ok(reply));
        self
    }

    /// Queues one transport failure for the next send.
    pub fn with_send_error(self, reason: &str) -> Self {
        self.replies.lock().unwrap().push_back(Err(reason.to_string()));
        self
    }

    pub fn get_send_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn get_sent_messages(&self) -> Vec<Value> {
        self.sent.lock().unwrap().clone()
    }
}

impl Default for MockMessageSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageSender for MockMessageSender {
    async fn send(&self, message: Value) -> std::result::Result<Value, SendError> {
        self.sent.lock().unwrap().push(message);

        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(reason)) => Err(reason.into()),
            None => Ok(json!({ "success": true })),
        }
    }
}

//! Browsing-context capabilities required by the automation service
//!
//! The service never owns a browser. Callers inject something that can
//! answer selector queries and accept simple interactions; inside the
//! extension the live page plays this role, while tests and the CLI
//! harness use the scripted in-memory page from [`fake`].
//!
//! All operations here are synchronous. Handles reflect the page as it
//! is at call time; nothing is cached across calls.

mod matcher;

pub mod fake;

pub use fake::{FakePage, GenerationScript, PageBuilder, ResponseFixture, ScriptedReply};

use std::sync::Arc;

use crate::models::FileUpload;

/// Events the page's own reactive bindings listen for. Dispatching them
/// is what makes programmatic edits visible to the framework behind the
/// page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomEvent {
    Input,
    Change,
}

impl DomEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            DomEvent::Input => "input",
            DomEvent::Change => "change",
        }
    }
}

/// Shared handle to one element in the page.
pub type ElementHandle = Arc<dyn Element>;

/// One element in the page.
pub trait Element: Send + Sync {
    fn tag_name(&self) -> String;

    /// Concatenated text of the element and its descendants, untrimmed.
    fn text_content(&self) -> String;

    fn attribute(&self, name: &str) -> Option<String>;

    /// Replaces the element's children with a single text node.
    fn set_text_content(&self, text: &str);

    fn click(&self);

    fn dispatch(&self, event: DomEvent);

    /// Attaches files to a file input.
    fn set_files(&self, files: &[FileUpload]);

    fn query_selector(&self, selector: &str) -> Option<ElementHandle>;

    fn query_selector_all(&self, selector: &str) -> Vec<ElementHandle>;
}

/// Document-level selector queries.
pub trait Document: Send + Sync {
    fn query_selector(&self, selector: &str) -> Option<ElementHandle>;

    fn query_selector_all(&self, selector: &str) -> Vec<ElementHandle>;
}

/// The window half of the browsing context. Only the location is needed.
pub trait Window: Send + Sync {
    fn location_href(&self) -> String;
}

//! Automation for the Gemini web chat UI
//!
//! Drives gemini.google.com/app through injected DOM capabilities: sending
//! prompts, selecting tools and modes, watching generation state, parsing
//! responses and downloading generated images, plus batch orchestration and
//! the extension message plumbing around it.

pub mod batch;
pub mod chat;
pub mod dataurl;
pub mod dom;
pub mod error;
pub mod extension;
pub mod filename;
pub mod messaging;
pub mod models;
pub mod selectors;

pub use error::{Error, ErrorKind, Result};

//! Error handling and custom error types
//!
//! Every fallible automation operation returns [`Result`]. Failures fall
//! into a closed set of categories so callers can branch on [`ErrorKind`]
//! without parsing messages.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("element not found: {selector}")]
    ElementNotFound { selector: String },

    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("upload failed: {reason}")]
    UploadFailed { reason: String },

    #[error("generation failed: {reason}")]
    GenerationFailed { reason: String },

    #[error("download failed: {reason}")]
    DownloadFailed { reason: String },

    #[error("generation blocked by safety policy: {response_text}")]
    PolicyBlocked { response_text: String },

    #[error("invalid state: {reason}")]
    InvalidState { reason: String },

    #[error("unknown error: {reason}")]
    Unknown { reason: String },
}

/// Failure category, one per [`Error`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ElementNotFound,
    Timeout,
    UploadFailed,
    GenerationFailed,
    DownloadFailed,
    PolicyBlocked,
    InvalidState,
    Unknown,
}

impl Error {
    /// A required control was missing from the page. The selector (or the
    /// label used to search for it) is kept so the message says what was
    /// being looked for.
    pub fn element_not_found(selector: impl Into<String>) -> Self {
        Error::ElementNotFound {
            selector: selector.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Error::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    pub fn upload_failed(reason: impl Into<String>) -> Self {
        Error::UploadFailed {
            reason: reason.into(),
        }
    }

    pub fn generation_failed(reason: impl Into<String>) -> Self {
        Error::GenerationFailed {
            reason: reason.into(),
        }
    }

    pub fn download_failed(reason: impl Into<String>) -> Self {
        Error::DownloadFailed {
            reason: reason.into(),
        }
    }

    pub fn policy_blocked(response_text: impl Into<String>) -> Self {
        Error::PolicyBlocked {
            response_text: response_text.into(),
        }
    }

    pub fn invalid_state(reason: impl Into<String>) -> Self {
        Error::InvalidState {
            reason: reason.into(),
        }
    }

    pub fn unknown(reason: impl Into<String>) -> Self {
        Error::Unknown {
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ElementNotFound { .. } => ErrorKind::ElementNotFound,
            Error::Timeout { .. } => ErrorKind::Timeout,
            Error::UploadFailed { .. } => ErrorKind::UploadFailed,
            Error::GenerationFailed { .. } => ErrorKind::GenerationFailed,
            Error::DownloadFailed { .. } => ErrorKind::DownloadFailed,
            Error::PolicyBlocked { .. } => ErrorKind::PolicyBlocked,
            Error::InvalidState { .. } => ErrorKind::InvalidState,
            Error::Unknown { .. } => ErrorKind::Unknown,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

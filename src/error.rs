//! Error taxonomy for the upload client
//!
//! Nothing here is fatal to the process: every variant hands control back to
//! the user for another attempt.

use crate::validate::Rejection;
use thiserror::Error;

/// Fallback shown when the backend gives no usable message.
pub const GENERIC_SERVER_ERROR: &str = "Server error. Please try again later.";

#[derive(Debug, Error)]
pub enum LotviewError {
    /// Wrong media type or oversize file; the user may pick another file.
    #[error("{0}")]
    InputRejected(#[from] Rejection),

    #[error("Please select a video file first")]
    NoFileSelected,

    /// Another upload is still in flight.
    #[error("An upload is already in progress. Please wait for it to finish.")]
    SessionBusy,

    #[error("{0}")]
    TransportFailure(#[from] TransportError),

    /// The report view was requested before any result was published.
    #[error("No analysis data found. Please upload a video first.")]
    NoResult,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure of the network submission or of decoding its reply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Connection refused, timeout, body stream failure...
    #[error("{}", .message.as_deref().unwrap_or(GENERIC_SERVER_ERROR))]
    Network { message: Option<String> },

    /// Non-2xx reply; `message` is the server's `message` field when present.
    #[error("{}", .message.as_deref().unwrap_or(GENERIC_SERVER_ERROR))]
    Status { code: u16, message: Option<String> },

    /// 2xx reply whose body lacks `json_report` or `video_download_url`.
    #[error("Server error. Please try again later.")]
    MalformedResponse(String),
}

impl TransportError {
    /// Text to surface to the user: the server message, or the generic one.
    pub fn reason(&self) -> String {
        self.to_string()
    }
}

pub type Result<T> = std::result::Result<T, LotviewError>;

//! Error types for image generation runs.

use std::path::PathBuf;
use std::time::Duration;

/// Maximum number of characters kept from a response body in errors and logs.
const MAX_ERROR_MESSAGE_CHARS: usize = 500;

/// Errors that can occur while generating and saving images.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Config file does not exist.
    #[error("config file not found: {}", path.display())]
    ConfigNotFound { path: PathBuf },

    /// Config file is not valid JSON (or a field has the wrong type).
    #[error("config file {} is malformed: {source}", path.display())]
    ConfigMalformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Config file lacks a required field.
    #[error("config file {} is missing required field: {field}", path.display())]
    ConfigMissingField { path: PathBuf, field: &'static str },

    /// Prompt file does not exist.
    #[error("prompt file not found: {}", path.display())]
    PromptFileNotFound { path: PathBuf },

    /// Prompt file contains no usable prompt text.
    #[error("no prompt text found in {}", path.display())]
    PromptEmpty { path: PathBuf },

    /// API answered with a non-200 status.
    #[error("API request failed: {status} - {message}")]
    ApiRequestFailed {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// API answered 200 but neither known response shape carried an image.
    #[error("no image data found in API response")]
    NoImagesInResponse,

    /// Generation request exceeded its timeout.
    #[error("request timed out after {0:?}")]
    RequestTimeout(Duration),

    /// Network or HTTP error other than a timeout.
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    /// A single image could not be downloaded or written.
    #[error("download failed: {0}")]
    DownloadFailed(String),

    /// I/O error (e.g., creating the output directory).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns true if this error aborts the whole run.
    ///
    /// Only per-image download failures are local; everything else
    /// stops the pipeline.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::DownloadFailed(_))
    }

    /// Maps a reqwest error to `RequestTimeout` or `Network`.
    pub(crate) fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::RequestTimeout(timeout)
        } else {
            Self::Network(err)
        }
    }
}

/// Result type alias for image generation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Collapses whitespace and truncates a response body for display.
pub(crate) fn sanitize_error_message(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() > MAX_ERROR_MESSAGE_CHARS {
        let truncated: String = collapsed.chars().take(MAX_ERROR_MESSAGE_CHARS).collect();
        format!("{truncated}...")
    } else {
        collapsed
    }
}

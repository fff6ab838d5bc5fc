//! Result envelope and end-to-end conversion output.

use crate::error::{ErrorKind, Pdf2PngError};
use crate::pipeline::input::Workspace;
use crate::source::Payload;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Uniform success/failure envelope returned to callers that prefer a
/// serialisable shape over a Rust `Result`.
///
/// Exactly one of `data` and `message` is populated. The fields are private
/// so that invariant cannot be broken after construction.
///
/// ```rust
/// use pdf2png::{ConversionResult, Pdf2PngError};
///
/// let ok: ConversionResult<u32> = Ok::<_, Pdf2PngError>(14).into();
/// assert!(ok.success());
/// assert_eq!(ok.data(), Some(&14));
/// assert!(ok.message().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionResult<T> {
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    kind: Option<ErrorKind>,
}

impl<T> ConversionResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            kind: None,
        }
    }

    pub fn failed(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
            kind: Some(kind),
        }
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        self.kind
    }

    /// Convert back into a `Result`, with the failure message as the error.
    pub fn into_result(self) -> Result<T, String> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            _ => Err(self.message.unwrap_or_default()),
        }
    }
}

impl<T> From<Result<T, Pdf2PngError>> for ConversionResult<T> {
    fn from(result: Result<T, Pdf2PngError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::failed(e.kind(), e.to_string()),
        }
    }
}

/// Everything produced by one end-to-end [`crate::convert`] call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// Page count reported by the engine, if counting was enabled.
    pub page_count: Option<u32>,
    /// Rendered page images, in page order.
    pub pages: Vec<PathBuf>,
    /// Pages in the requested output mode, same order as `pages`.
    pub payloads: Vec<Payload>,
    /// Scratch space holding the source and the pages. Not removed
    /// automatically; call [`Workspace::cleanup`] when done.
    pub workspace: Workspace,
    pub stats: ConversionStats,
}

/// Timing and size information for one conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionStats {
    pub page_count: Option<u32>,
    pub rendered_pages: usize,
    pub write_duration_ms: u64,
    pub count_duration_ms: u64,
    pub render_duration_ms: u64,
    pub collect_duration_ms: u64,
    pub total_duration_ms: u64,
}

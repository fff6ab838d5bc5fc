//! Error types for the pdf2png library.
//!
//! Every public operation returns `Result<T, Pdf2PngError>`. Errors are
//! values, never panics: a failed call leaves the process untouched and
//! hands back a message the caller can show or log.
//!
//! The variants group into six [`ErrorKind`]s:
//!
//! * **Input**: the source could not be turned into bytes (unknown mode,
//!   undecodable base64, a path with no file name).
//! * **Filesystem**: creating, writing, copying, listing or reading a file
//!   failed.
//! * **EngineInvocation**: Ghostscript could not be started, exited with a
//!   failure status, or printed diagnostics where silence was expected.
//! * **Validation**: Ghostscript answered, but not with what we asked for
//!   (a non-numeric page count, a page total that disagrees with the render).
//! * **Config**: the converter itself is misconfigured.
//! * **Internal**: a worker task panicked or an invariant broke.
//!
//! Engine and validation errors keep the engine's raw output verbatim; that
//! text is usually the only useful diagnostic.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the pdf2png library.
#[derive(Debug, Error)]
pub enum Pdf2PngError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The mode name or tag does not name a known representation.
    #[error("Unknown mode '{0}': expected raw-bytes, base64, buffer or file")]
    UnknownMode(String),

    /// The payload could not be turned into PDF bytes for its mode.
    #[error("Buffer does not contain data, unable to write file: {detail}")]
    NoPayload { detail: String },

    /// Base64 text failed to decode.
    #[error("Invalid base64 input: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    // ── Filesystem errors ─────────────────────────────────────────────────
    /// Could not create the per-call workspace directory.
    #[error("Failed to create workspace '{path}': {source}")]
    WorkspaceCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not write the normalised source file.
    #[error("Failed to write '{path}': {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not copy a caller-supplied file into the workspace.
    #[error("Failed to copy '{from}' to '{to}': {source}")]
    CopyFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not list the directory holding rendered pages.
    #[error("Failed to read directory '{path}': {source}")]
    ListFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not read a rendered page back.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not remove a workspace.
    #[error("Failed to remove workspace '{path}': {source}")]
    CleanupFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Engine errors ─────────────────────────────────────────────────────
    /// The engine process could not be spawned at all.
    #[error("Failed to start Ghostscript '{engine}': {source}")]
    EngineSpawn {
        engine: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The engine reported an error. `output` is its raw text.
    #[error("{output}")]
    EngineFailed { output: String, status: Option<i32> },

    // ── Validation errors ─────────────────────────────────────────────────
    /// The page-count query printed something other than an integer.
    #[error("{output}")]
    PageCountUnparsable { output: String },

    /// Rendering recovered a different number of pages than was counted.
    #[error("Ghostscript rendered {rendered} pages but the document has {expected}")]
    PageCountMismatch { expected: u32, rendered: usize },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// No engine was configured and none could be found.
    #[error("Ghostscript is not available: {0}")]
    EngineNotFound(#[from] gs_locate::LocateError),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of a [`Pdf2PngError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Input,
    Filesystem,
    EngineInvocation,
    Validation,
    Config,
    /// A bug or a panicked worker, not something the caller can fix.
    Internal,
}

impl Pdf2PngError {
    /// Which part of the taxonomy this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Pdf2PngError::UnknownMode(_)
            | Pdf2PngError::NoPayload { .. }
            | Pdf2PngError::InvalidBase64(_) => ErrorKind::Input,

            Pdf2PngError::WorkspaceCreate { .. }
            | Pdf2PngError::WriteFailed { .. }
            | Pdf2PngError::CopyFailed { .. }
            | Pdf2PngError::ListFailed { .. }
            | Pdf2PngError::ReadFailed { .. }
            | Pdf2PngError::CleanupFailed { .. } => ErrorKind::Filesystem,

            Pdf2PngError::EngineSpawn { .. } | Pdf2PngError::EngineFailed { .. } => {
                ErrorKind::EngineInvocation
            }

            Pdf2PngError::PageCountUnparsable { .. } | Pdf2PngError::PageCountMismatch { .. } => {
                ErrorKind::Validation
            }

            Pdf2PngError::InvalidConfig(_) | Pdf2PngError::EngineNotFound(_) => ErrorKind::Config,

            Pdf2PngError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Raw engine output, when the error carries one.
    pub fn engine_output(&self) -> Option<&str> {
        match self {
            Pdf2PngError::EngineFailed { output, .. }
            | Pdf2PngError::PageCountUnparsable { output } => Some(output),
            _ => None,
        }
    }
}

//! Output collection: read rendered pages back in the caller's [`Mode`].
//!
//! File mode hands the paths straight back without touching the disk. The
//! other modes read every file in full; the first failed read aborts the
//! whole collection so a caller never mistakes a short list for a complete
//! document.

use crate::error::Pdf2PngError;
use crate::source::{Mode, Payload};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Read `paths` into payloads of the requested `mode`, preserving order.
pub fn get_data(paths: &[PathBuf], mode: Mode) -> Result<Vec<Payload>, Pdf2PngError> {
    if mode == Mode::FilePath {
        return Ok(paths.iter().cloned().map(Payload::FilePath).collect());
    }

    let payloads = paths
        .iter()
        .map(|path| read_payload(path, mode))
        .collect::<Result<Vec<_>, _>>()?;

    debug!("Collected {} pages as {}", payloads.len(), mode);
    Ok(payloads)
}

fn read_payload(path: &Path, mode: Mode) -> Result<Payload, Pdf2PngError> {
    let bytes = std::fs::read(path).map_err(|source| Pdf2PngError::ReadFailed {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(match mode {
        Mode::RawBytes => Payload::RawBytes(bytes),
        Mode::BinaryBuffer => Payload::BinaryBuffer(bytes),
        Mode::Base64Text => Payload::Base64Text(STANDARD.encode(&bytes)),
        Mode::FilePath => Payload::FilePath(path.to_path_buf()),
    })
}

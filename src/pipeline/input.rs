//! Input normalisation: turn any [`SourceDescriptor`] into a PDF on disk.
//!
//! Ghostscript needs a file-system path, and the renderer writes its pages
//! next to the source. Every call therefore gets its own workspace,
//! `<scratch_root>/<uuid-v4>/`, holding `<uuid-v4>.pdf` (or the caller's
//! original basename in file mode). Unique names are the only isolation
//! between concurrent calls; nothing here takes a lock.
//!
//! Workspaces are never removed by the pipeline once the PDF is in place.
//! Callers own them and call [`Workspace::cleanup`] when the pages are no
//! longer needed. A workspace whose PDF could not be written is removed
//! before the error is returned.

use crate::error::Pdf2PngError;
use crate::source::SourceDescriptor;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// A uniquely named scratch directory owned by a single call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    dir: PathBuf,
}

impl Workspace {
    /// Create `<root>/<uuid>` (and `root` itself if missing).
    pub fn create(root: &Path) -> Result<Self, Pdf2PngError> {
        let dir = root.join(Uuid::new_v4().to_string());
        std::fs::create_dir_all(&dir).map_err(|source| Pdf2PngError::WorkspaceCreate {
            path: dir.clone(),
            source,
        })?;
        debug!("Created workspace {}", dir.display());
        Ok(Self { dir })
    }

    /// The workspace holding `file`, i.e. its parent directory.
    pub fn containing(file: &Path) -> Option<Self> {
        file.parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| Self { dir: p.to_path_buf() })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Remove the workspace and everything in it.
    pub fn cleanup(self) -> Result<(), Pdf2PngError> {
        match std::fs::remove_dir_all(&self.dir) {
            Ok(()) => {
                debug!("Removed workspace {}", self.dir.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(Pdf2PngError::CleanupFailed {
                path: self.dir,
                source,
            }),
        }
    }
}

/// Write `source` into a fresh workspace and return the PDF's path.
pub fn write_file(source: &SourceDescriptor, scratch_root: &Path) -> Result<PathBuf, Pdf2PngError> {
    materialize(source, scratch_root).map(|(_, path)| path)
}

/// Like [`write_file`], also handing back the workspace.
///
/// A failure after the workspace was created removes it again.
pub fn materialize(
    source: &SourceDescriptor,
    scratch_root: &Path,
) -> Result<(Workspace, PathBuf), Pdf2PngError> {
    let workspace = Workspace::create(scratch_root)?;

    match fill(source, &workspace) {
        Ok(path) => Ok((workspace, path)),
        Err(e) => {
            let dir = workspace.path().to_path_buf();
            if let Err(cleanup) = workspace.cleanup() {
                warn!("Could not remove workspace {}: {}", dir.display(), cleanup);
            }
            Err(e)
        }
    }
}

/// Put the source PDF into `workspace`.
fn fill(source: &SourceDescriptor, workspace: &Workspace) -> Result<PathBuf, Pdf2PngError> {
    let bytes = match source {
        SourceDescriptor::FilePath(from) => return copy_into(from, workspace),
        other => other.to_bytes()?,
    };

    let bytes = bytes.ok_or_else(|| Pdf2PngError::NoPayload {
        detail: format!("mode '{}' produced no bytes", source.mode()),
    })?;

    let path = workspace.path().join(format!("{}.pdf", Uuid::new_v4()));
    write_exclusive(&path, &bytes)?;

    info!(
        "Wrote {} bytes ({} input) to {}",
        bytes.len(),
        source.mode(),
        path.display()
    );
    Ok(path)
}

/// Copy a caller-supplied file into the workspace, keeping its basename.
fn copy_into(from: &Path, workspace: &Workspace) -> Result<PathBuf, Pdf2PngError> {
    let name = from.file_name().ok_or_else(|| Pdf2PngError::NoPayload {
        detail: format!("'{}' has no file name", from.display()),
    })?;
    let to = workspace.path().join(name);

    std::fs::copy(from, &to).map_err(|source| Pdf2PngError::CopyFailed {
        from: from.to_path_buf(),
        to: to.clone(),
        source,
    })?;

    info!("Copied {} to {}", from.display(), to.display());
    Ok(to)
}

/// Write `bytes` to `path`, failing if the file already exists.
fn write_exclusive(path: &Path, bytes: &[u8]) -> Result<(), Pdf2PngError> {
    let wrap = |source: std::io::Error| Pdf2PngError::WriteFailed {
        path: path.to_path_buf(),
        source,
    };
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(wrap)?;
    file.write_all(bytes).map_err(wrap)?;
    file.flush().map_err(wrap)
}

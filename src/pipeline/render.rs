//! PDF rasterisation: run Ghostscript in batch mode and recover the pages.
//!
//! Ghostscript writes `file-1.png`, `file-2.png`, … into the directory that
//! holds the source PDF. The renderer then lists that directory and returns
//! the page files ordered by their numeric suffix. Directory enumeration
//! order is unspecified on every platform, and a plain name sort would put
//! `file-10.png` before `file-2.png`.

use super::engine::{Engine, RenderSettings};
use crate::config::RenderPolicy;
use crate::error::Pdf2PngError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

static PAGE_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^file-(\d+)\.png$").expect("page file regex is valid"));

/// One rendered page on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    pub path: PathBuf,
    /// 1-based page number parsed from the file name; `None` for files that
    /// look like page output but carry no number.
    pub number: Option<u32>,
}

impl PageImage {
    fn from_file_name(dir: &Path, name: &str) -> Option<Self> {
        if !(name.starts_with("file") && name.ends_with("png")) {
            return None;
        }
        let number = PAGE_FILE
            .captures(name)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok());
        Some(Self {
            path: dir.join(name),
            number,
        })
    }
}

/// Numbered pages first, ascending; unnumbered stragglers after, by name.
fn page_order(a: &PageImage, b: &PageImage) -> Ordering {
    match (a.number, b.number) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.path.cmp(&b.path),
    }
}

/// Rasterise every page of `pdf` and return the page images in order.
pub fn convert_pages(
    engine: &Engine,
    pdf: &Path,
    settings: &RenderSettings,
    policy: RenderPolicy,
) -> Result<Vec<PathBuf>, Pdf2PngError> {
    let dir = source_dir(pdf);
    let output = engine.run(&Engine::render_args(pdf, &dir, settings))?;

    let diagnostic = output.combined();
    let engine_error = if !output.success || !diagnostic.trim().is_empty() {
        Some(Pdf2PngError::EngineFailed {
            output: diagnostic,
            status: output.status,
        })
    } else {
        None
    };

    match (engine_error, policy) {
        (Some(e), RenderPolicy::Strict) => Err(e),
        (Some(e), RenderPolicy::Lenient) => {
            warn!("Ghostscript reported problems rendering {}: {}", pdf.display(), e);
            let pages = recover_pages(&dir)?;
            if pages.is_empty() {
                return Err(e);
            }
            info!("Recovered {} pages despite engine errors", pages.len());
            Ok(pages.into_iter().map(|p| p.path).collect())
        }
        (None, _) => {
            let pages = recover_pages(&dir)?;
            info!("Rendered {} pages from {}", pages.len(), pdf.display());
            Ok(pages.into_iter().map(|p| p.path).collect())
        }
    }
}

/// [`convert_pages`], then require exactly `expected` pages.
pub fn convert_pages_checked(
    engine: &Engine,
    pdf: &Path,
    settings: &RenderSettings,
    policy: RenderPolicy,
    expected: u32,
) -> Result<Vec<PathBuf>, Pdf2PngError> {
    let pages = convert_pages(engine, pdf, settings, policy)?;
    verify_count(&pages, expected)?;
    Ok(pages)
}

pub(crate) fn verify_count(pages: &[PathBuf], expected: u32) -> Result<(), Pdf2PngError> {
    if pages.len() == expected as usize {
        Ok(())
    } else {
        Err(Pdf2PngError::PageCountMismatch {
            expected,
            rendered: pages.len(),
        })
    }
}

/// List page files in `dir`, ordered by page number.
pub fn recover_pages(dir: &Path) -> Result<Vec<PageImage>, Pdf2PngError> {
    let entries = std::fs::read_dir(dir).map_err(|source| Pdf2PngError::ListFailed {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut pages = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| Pdf2PngError::ListFailed {
            path: dir.to_path_buf(),
            source,
        })?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if let Some(page) = PageImage::from_file_name(dir, name) {
            if page.number.is_none() {
                warn!("Page-like file without a page number: {}", name);
            }
            pages.push(page);
        }
    }

    pages.sort_by(page_order);
    debug!("Recovered {} page files from {}", pages.len(), dir.display());
    Ok(pages)
}

/// Directory Ghostscript writes pages into: the one holding the source.
fn source_dir(pdf: &Path) -> PathBuf {
    match pdf.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

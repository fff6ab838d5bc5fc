//! Page counting via Ghostscript's PostScript PDF procedures.
//!
//! The query opens the file read-only, prints `pdfpagecount` and quits
//! without creating a display device. On success standard output is exactly
//! the decimal page count. Anything else (usually a Ghostscript error banner)
//! is returned verbatim so the caller sees the engine's own diagnosis.

use super::engine::{Engine, EngineOutput};
use crate::error::Pdf2PngError;
use std::path::Path;
use tracing::{debug, info};

/// Ask the engine how many pages `pdf` has.
pub fn get_page_count(engine: &Engine, pdf: &Path) -> Result<u32, Pdf2PngError> {
    let output = engine.run(&Engine::page_count_args(pdf))?;
    let pages = parse_page_count(&output)?;
    info!("{} has {} pages", pdf.display(), pages);
    Ok(pages)
}

/// Interpret the output of a page-count query.
pub fn parse_page_count(output: &EngineOutput) -> Result<u32, Pdf2PngError> {
    output.check_status()?;

    match output.stdout.trim().parse::<u32>() {
        Ok(pages) => Ok(pages),
        Err(e) => {
            debug!("Page count output not numeric ({e}): {:?}", output.stdout);
            Err(Pdf2PngError::PageCountUnparsable {
                output: output.combined(),
            })
        }
    }
}

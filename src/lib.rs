//! # pdf2png
//!
//! Rasterise PDF documents into one PNG per page by driving
//! [Ghostscript](https://www.ghostscript.com/) as a subprocess.
//!
//! The crate never parses PDF itself. It moves the caller's document to a
//! place Ghostscript can read, runs the engine, finds what it wrote and hands
//! the pages back in the representation the caller asked for.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF (bytes | base64 | buffer | path)
//!  │
//!  ├─ 1. Input    write into a fresh <uuid> workspace
//!  ├─ 2. Count    gs -dNODISPLAY … pdfpagecount          (optional)
//!  ├─ 3. Render   gs -sDEVICE=png16m -o file-%d.png -r144
//!  └─ 4. Collect  pages as bytes | base64 | buffer | paths
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2png::{Converter, Mode, SourceDescriptor};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let converter = Converter::locate()?;
//!     let pdf = converter.write_file(&SourceDescriptor::FilePath("report.pdf".into()))?;
//!     let count = converter.get_page_count(&pdf)?;
//!     let pages = converter.convert_pages_checked(&pdf, count)?;
//!     let pngs = converter.get_data(&pages, Mode::Base64Text)?;
//!     eprintln!("{count} pages, {} images", pngs.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Workspaces
//!
//! Each call creates `<scratch_root>/<uuid>/` and never deletes it. Pages are
//! written next to the source PDF, so the workspace is what keeps concurrent
//! calls apart. Remove it with [`Workspace::cleanup`] once the pages have
//! been consumed.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2png` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod source;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConverterConfig, ConverterConfigBuilder, RenderPolicy};
pub use convert::{convert, convert_batch, convert_sync, inspect, Converter};
pub use error::{ErrorKind, Pdf2PngError};
pub use output::{ConversionOutput, ConversionResult, ConversionStats};
pub use pipeline::input::Workspace;
pub use pipeline::render::PageImage;
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback, Stage};
pub use source::{Mode, Payload, SourceDescriptor};

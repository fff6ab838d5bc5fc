//! Pipeline stages for PDF-to-PNG conversion.
//!
//! Each submodule implements exactly one step and talks to the others only
//! through filesystem paths, so every stage is independently testable.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ count ──▶ render ──▶ collect
//! (bytes)   (gs -c)   (gs png)   (bytes / base64 / paths)
//! ```
//!
//! 1. [`input`]  : materialise the caller's source as a PDF inside a fresh
//!    `<uuid>` workspace
//! 2. [`count`]  : ask Ghostscript for the page count without rendering
//! 3. [`render`] : rasterise every page into `file-<n>.png` next to the
//!    source and recover them in page order
//! 4. [`collect`]: read the pages back in the requested [`crate::Mode`]
//!
//! [`engine`] owns the subprocess contract shared by `count` and `render`.

pub mod collect;
pub mod count;
pub mod engine;
pub mod input;
pub mod render;

//! Conversion entry points.
//!
//! [`Converter`] exposes the four pipeline operations one by one, for callers
//! that want to drive the stages themselves (count now, render later, collect
//! in a different mode). [`convert`] and [`convert_sync`] run the whole
//! pipeline, and [`convert_batch`] runs several documents at once.
//!
//! Every stage blocks on the filesystem or on Ghostscript. The async entry
//! points move the work onto Tokio's blocking pool; stages still execute
//! strictly one after another.

use crate::config::ConverterConfig;
use crate::error::Pdf2PngError;
use crate::output::{ConversionOutput, ConversionResult, ConversionStats};
use crate::pipeline::engine::{Engine, RenderSettings};
use crate::pipeline::input::{self, Workspace};
use crate::pipeline::{collect, count, render};
use crate::progress::{ProgressCallback, Stage};
use crate::source::{Mode, Payload, SourceDescriptor};
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// The four pipeline operations bound to one configuration.
#[derive(Debug, Clone)]
pub struct Converter {
    config: ConverterConfig,
    engine: Engine,
}

impl Converter {
    pub fn new(config: ConverterConfig) -> Self {
        let engine = Engine::new(config.engine.clone());
        Self { config, engine }
    }

    /// A converter with default settings, failing early when Ghostscript
    /// cannot be located.
    pub fn locate() -> Result<Self, Pdf2PngError> {
        let engine = gs_locate::locate_engine()?;
        let config = ConverterConfig::builder().engine(engine).build()?;
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Materialise `source` as a PDF in a fresh workspace.
    pub fn write_file(&self, source: &SourceDescriptor) -> Result<PathBuf, Pdf2PngError> {
        input::write_file(source, &self.config.scratch_root)
    }

    /// Ask Ghostscript for the page count of `pdf`.
    pub fn get_page_count(&self, pdf: impl AsRef<Path>) -> Result<u32, Pdf2PngError> {
        count::get_page_count(&self.engine, pdf.as_ref())
    }

    /// Render every page of `pdf` next to it and return the images in order.
    pub fn convert_pages(&self, pdf: impl AsRef<Path>) -> Result<Vec<PathBuf>, Pdf2PngError> {
        render::convert_pages(
            &self.engine,
            pdf.as_ref(),
            &RenderSettings::from(&self.config),
            self.config.render_policy,
        )
    }

    /// [`Converter::convert_pages`], failing unless exactly `expected` pages
    /// were produced.
    pub fn convert_pages_checked(
        &self,
        pdf: impl AsRef<Path>,
        expected: u32,
    ) -> Result<Vec<PathBuf>, Pdf2PngError> {
        render::convert_pages_checked(
            &self.engine,
            pdf.as_ref(),
            &RenderSettings::from(&self.config),
            self.config.render_policy,
            expected,
        )
    }

    /// Read `paths` back in `mode`.
    pub fn get_data(&self, paths: &[PathBuf], mode: Mode) -> Result<Vec<Payload>, Pdf2PngError> {
        collect::get_data(paths, mode)
    }

    /// Run the whole pipeline for one source, blocking the current thread.
    pub fn run(&self, source: &SourceDescriptor) -> Result<ConversionOutput, Pdf2PngError> {
        let total_start = Instant::now();
        let mut tracker = StageTracker::new(self.config.progress_callback.as_ref());
        let mut stats = ConversionStats::default();

        // ── Step 1: Normalise input ──────────────────────────────────────
        tracker.advance(Stage::Normalizing);
        let start = Instant::now();
        let (workspace, pdf) =
            tracker.guard(input::materialize(source, &self.config.scratch_root))?;
        stats.write_duration_ms = elapsed_ms(start);

        // ── Step 2: Count pages ──────────────────────────────────────────
        if self.config.count_pages {
            tracker.advance(Stage::Counting);
            let start = Instant::now();
            let pages = tracker.guard(self.get_page_count(&pdf))?;
            stats.count_duration_ms = elapsed_ms(start);
            stats.page_count = Some(pages);
            if let Some(cb) = tracker.callback {
                cb.on_page_count(pages);
            }
        }

        // ── Step 3: Rasterise ────────────────────────────────────────────
        tracker.advance(Stage::Rendering);
        let start = Instant::now();
        let pages = tracker.guard(self.convert_pages(&pdf))?;
        if let (Some(expected), true) = (stats.page_count, self.config.verify_page_count) {
            tracker.guard(render::verify_count(&pages, expected))?;
        }
        stats.render_duration_ms = elapsed_ms(start);
        stats.rendered_pages = pages.len();
        if let Some(cb) = tracker.callback {
            cb.on_pages_rendered(pages.len());
        }

        // ── Step 4: Collect ──────────────────────────────────────────────
        tracker.advance(Stage::Collecting);
        let start = Instant::now();
        let payloads = tracker.guard(self.get_data(&pages, self.config.output_mode))?;
        stats.collect_duration_ms = elapsed_ms(start);

        stats.total_duration_ms = elapsed_ms(total_start);
        tracker.advance(Stage::Done);
        if let Some(cb) = tracker.callback {
            cb.on_complete(&stats);
        }

        info!(
            "Conversion complete: {} pages in {}ms ({})",
            stats.rendered_pages,
            stats.total_duration_ms,
            workspace.path().display()
        );

        Ok(ConversionOutput {
            page_count: stats.page_count,
            pages,
            payloads,
            workspace,
            stats,
        })
    }
}

/// Convert one PDF to page images.
///
/// # Example
/// ```rust,no_run
/// use pdf2png::{convert, ConverterConfig, Mode, SourceDescriptor};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = ConverterConfig::builder().output_mode(Mode::Base64Text).build()?;
///     let source = SourceDescriptor::FilePath("document.pdf".into());
///     let output = convert(source, &config).await?;
///     println!("{} pages", output.pages.len());
///     output.workspace.cleanup()?;
///     Ok(())
/// }
/// ```
///
/// # Errors
/// The first failing stage ends the conversion; files already written stay
/// in the workspace.
pub async fn convert(
    source: SourceDescriptor,
    config: &ConverterConfig,
) -> Result<ConversionOutput, Pdf2PngError> {
    let converter = Converter::new(config.clone());
    tokio::task::spawn_blocking(move || converter.run(&source))
        .await
        .map_err(|e| Pdf2PngError::Internal(format!("Conversion task panicked: {}", e)))?
}

/// Blocking counterpart of [`convert`]; needs no async runtime.
pub fn convert_sync(
    source: &SourceDescriptor,
    config: &ConverterConfig,
) -> Result<ConversionOutput, Pdf2PngError> {
    Converter::new(config.clone()).run(source)
}

/// Convert several PDFs, at most `concurrency` at a time.
///
/// Each document gets its own workspace, so they never share files.
/// Results come back in input order, one envelope per source.
pub async fn convert_batch(
    sources: Vec<SourceDescriptor>,
    config: &ConverterConfig,
    concurrency: usize,
) -> Vec<ConversionResult<ConversionOutput>> {
    let concurrency = concurrency.max(1);
    debug!(
        "Batch conversion of {} sources, concurrency {}",
        sources.len(),
        concurrency
    );
    stream::iter(sources.into_iter().map(|source| {
        let config = config.clone();
        async move { ConversionResult::from(convert(source, &config).await) }
    }))
    .buffered(concurrency)
    .collect()
    .await
}

/// Page count of a PDF without rendering it.
///
/// The temporary workspace is removed before returning.
pub async fn inspect(source: SourceDescriptor, config: &ConverterConfig) -> Result<u32, Pdf2PngError> {
    let converter = Converter::new(config.clone());
    tokio::task::spawn_blocking(move || {
        let (workspace, pdf) = input::materialize(&source, &converter.config.scratch_root)?;
        let pages = converter.get_page_count(&pdf);
        if let Err(e) = Workspace::cleanup(workspace) {
            warn!("Could not remove inspection workspace: {}", e);
        }
        pages
    })
    .await
    .map_err(|e| Pdf2PngError::Internal(format!("Inspect task panicked: {}", e)))?
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Tracks the current [`Stage`] and forwards transitions to the callback.
struct StageTracker<'a> {
    stage: Stage,
    callback: Option<&'a ProgressCallback>,
}

impl<'a> StageTracker<'a> {
    fn new(callback: Option<&'a ProgressCallback>) -> Self {
        Self {
            stage: Stage::Idle,
            callback,
        }
    }

    fn advance(&mut self, next: Stage) {
        debug_assert!(
            self.stage.can_advance_to(next),
            "illegal stage transition {} -> {}",
            self.stage,
            next
        );
        debug!("Stage {} -> {}", self.stage, next);
        self.stage = next;
        if let Some(cb) = self.callback {
            cb.on_stage(next);
        }
    }

    /// Pass `result` through, moving to `Failed` on error.
    fn guard<T>(&mut self, result: Result<T, Pdf2PngError>) -> Result<T, Pdf2PngError> {
        if let Err(ref e) = result {
            warn!("Stage {} failed: {}", self.stage, e);
            if let Some(cb) = self.callback {
                cb.on_failed(self.stage, &e.to_string());
            }
            self.advance(Stage::Failed);
        }
        result
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

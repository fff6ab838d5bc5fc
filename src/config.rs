//! Configuration types for PDF-to-PNG conversion.
//!
//! All behaviour is controlled through [`ConverterConfig`], built via its
//! [`ConverterConfigBuilder`]. The engine path is a plain value injected
//! here rather than discovered deep inside the pipeline, so tests can point
//! the converter at a stub script and hosts can pin a specific Ghostscript.

use crate::error::Pdf2PngError;
use crate::progress::ProgressCallback;
use crate::source::Mode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Engine name used when nothing better can be located; resolved through
/// `PATH` when the process is spawned.
pub const FALLBACK_ENGINE: &str = if cfg!(windows) { "gswin64c.exe" } else { "gs" };

/// Output file pattern handed to Ghostscript; `%d` is the 1-based page number.
pub const PAGE_FILE_PATTERN: &str = "file-%d.png";

/// Configuration for a [`crate::Converter`].
///
/// # Example
/// ```rust
/// use pdf2png::{ConverterConfig, RenderPolicy};
///
/// let config = ConverterConfig::builder()
///     .engine("/usr/bin/gs")
///     .scratch_root("/tmp/pdf2png")
///     .dpi(200)
///     .render_policy(RenderPolicy::Lenient)
///     .build()
///     .unwrap();
/// assert_eq!(config.dpi, 200);
/// ```
#[derive(Clone)]
pub struct ConverterConfig {
    /// Ghostscript executable. Default: [`gs_locate::locate_engine`], else
    /// [`FALLBACK_ENGINE`].
    pub engine: PathBuf,

    /// Directory under which each call creates its own `<uuid>` workspace.
    /// Default: [`gs_locate::scratch_dir`].
    pub scratch_root: PathBuf,

    /// Rendering resolution in dots per inch. Range: 36–1200. Default: 144.
    pub dpi: u32,

    /// Ghostscript output device. Default: `png16m` (24-bit RGB).
    pub device: String,

    /// Anti-aliasing bits for text (1, 2 or 4). Default: 4.
    pub text_alpha_bits: u8,

    /// Anti-aliasing bits for graphics (1, 2 or 4). Default: 4.
    pub graphics_alpha_bits: u8,

    /// What to do when the renderer prints diagnostics. Default: [`RenderPolicy::Strict`].
    pub render_policy: RenderPolicy,

    /// Run the page-count query before rendering. Default: true.
    pub count_pages: bool,

    /// Fail when the number of rendered pages differs from the counted one.
    /// Only meaningful with `count_pages`. Default: true.
    pub verify_page_count: bool,

    /// Representation for collected pages. Default: [`Mode::FilePath`].
    pub output_mode: Mode,

    /// Stage-level progress events. Default: none.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            engine: gs_locate::locate_engine().unwrap_or_else(|_| PathBuf::from(FALLBACK_ENGINE)),
            scratch_root: gs_locate::scratch_dir(),
            dpi: 144,
            device: "png16m".to_string(),
            text_alpha_bits: 4,
            graphics_alpha_bits: 4,
            render_policy: RenderPolicy::default(),
            count_pages: true,
            verify_page_count: true,
            output_mode: Mode::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConverterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterConfig")
            .field("engine", &self.engine)
            .field("scratch_root", &self.scratch_root)
            .field("dpi", &self.dpi)
            .field("device", &self.device)
            .field("text_alpha_bits", &self.text_alpha_bits)
            .field("graphics_alpha_bits", &self.graphics_alpha_bits)
            .field("render_policy", &self.render_policy)
            .field("count_pages", &self.count_pages)
            .field("verify_page_count", &self.verify_page_count)
            .field("output_mode", &self.output_mode)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConverterConfig {
    /// Create a new builder for `ConverterConfig`.
    pub fn builder() -> ConverterConfigBuilder {
        ConverterConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConverterConfig`].
#[derive(Debug)]
pub struct ConverterConfigBuilder {
    config: ConverterConfig,
}

impl ConverterConfigBuilder {
    pub fn engine(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.engine = path.into();
        self
    }

    pub fn scratch_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.scratch_root = path.into();
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(36, 1200);
        self
    }

    pub fn device(mut self, device: impl Into<String>) -> Self {
        self.config.device = device.into();
        self
    }

    pub fn text_alpha_bits(mut self, bits: u8) -> Self {
        self.config.text_alpha_bits = bits;
        self
    }

    pub fn graphics_alpha_bits(mut self, bits: u8) -> Self {
        self.config.graphics_alpha_bits = bits;
        self
    }

    pub fn render_policy(mut self, policy: RenderPolicy) -> Self {
        self.config.render_policy = policy;
        self
    }

    pub fn count_pages(mut self, v: bool) -> Self {
        self.config.count_pages = v;
        self
    }

    pub fn verify_page_count(mut self, v: bool) -> Self {
        self.config.verify_page_count = v;
        self
    }

    pub fn output_mode(mut self, mode: Mode) -> Self {
        self.config.output_mode = mode;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConverterConfig, Pdf2PngError> {
        let c = &self.config;
        if c.engine.as_os_str().is_empty() {
            return Err(Pdf2PngError::InvalidConfig(
                "engine path must not be empty".into(),
            ));
        }
        if c.scratch_root.as_os_str().is_empty() {
            return Err(Pdf2PngError::InvalidConfig(
                "scratch root must not be empty".into(),
            ));
        }
        if c.dpi < 36 || c.dpi > 1200 {
            return Err(Pdf2PngError::InvalidConfig(format!(
                "DPI must be 36–1200, got {}",
                c.dpi
            )));
        }
        if c.device.is_empty() || c.device.chars().any(|ch| ch.is_whitespace()) {
            return Err(Pdf2PngError::InvalidConfig(format!(
                "invalid Ghostscript device '{}'",
                c.device
            )));
        }
        for (name, bits) in [
            ("text alpha bits", c.text_alpha_bits),
            ("graphics alpha bits", c.graphics_alpha_bits),
        ] {
            if !matches!(bits, 1 | 2 | 4) {
                return Err(Pdf2PngError::InvalidConfig(format!(
                    "{name} must be 1, 2 or 4, got {bits}"
                )));
            }
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How the renderer treats diagnostics printed by Ghostscript.
///
/// In batch mode with `-dQUIET` a healthy run prints nothing, so any output
/// is treated as an engine error. The question is whether pages that were
/// nevertheless written should be returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RenderPolicy {
    /// Fail immediately; do not look for page files. (default)
    #[default]
    Strict,
    /// Log the diagnostic and return whatever pages were written. Fails
    /// with the engine error only when no page was written at all.
    Lenient,
}

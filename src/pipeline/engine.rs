//! Ghostscript subprocess contract.
//!
//! The engine is driven through two command shapes:
//!
//! ```text
//! gs -q -dNODISPLAY --permit-file-read=<pdf> -c "(<pdf>) (r) file runpdfbegin pdfpagecount = quit"
//! gs -dQUIET -dPARANOIDSAFER -dBATCH -dNOPAUSE -dNOPROMPT -sDEVICE=png16m
//!    -dTextAlphaBits=4 -dGraphicsAlphaBits=4 -o <dir>/file-%d.png -r144 <pdf>
//! ```
//!
//! Both run synchronously with no shell in between, so paths are passed as
//! single arguments and need no shell quoting. Paths reach the engine as the
//! raw OS string, so file names that are not valid UTF-8 still resolve. On
//! Windows backslashes become forward slashes. The page-count query also
//! embeds the path in a PostScript string literal, where `(`, `)` and `\`
//! are escaped and every byte outside printable ASCII is written as a
//! `\ddd` octal escape.
//!
//! Both shapes are silent on success apart from the page count itself, so
//! anything else the engine prints is kept verbatim as the diagnostic.

use crate::config::{ConverterConfig, PAGE_FILE_PATTERN};
use crate::error::Pdf2PngError;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

/// Rendering parameters for the rasterisation command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderSettings {
    pub dpi: u32,
    pub device: String,
    pub text_alpha_bits: u8,
    pub graphics_alpha_bits: u8,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            dpi: 144,
            device: "png16m".to_string(),
            text_alpha_bits: 4,
            graphics_alpha_bits: 4,
        }
    }
}

impl From<&ConverterConfig> for RenderSettings {
    fn from(c: &ConverterConfig) -> Self {
        Self {
            dpi: c.dpi,
            device: c.device.clone(),
            text_alpha_bits: c.text_alpha_bits,
            graphics_alpha_bits: c.graphics_alpha_bits,
        }
    }
}

/// Captured result of one engine run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code; `None` when the process was killed by a signal.
    pub status: Option<i32>,
    pub success: bool,
}

impl EngineOutput {
    /// Standard output followed by standard error.
    pub fn combined(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (_, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => format!("{}{}", self.stdout, self.stderr),
        }
    }

    /// Fail unless the process exited successfully.
    pub fn check_status(&self) -> Result<(), Pdf2PngError> {
        if self.success {
            Ok(())
        } else {
            Err(Pdf2PngError::EngineFailed {
                output: self.combined(),
                status: self.status,
            })
        }
    }
}

/// A Ghostscript executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Engine {
    executable: PathBuf,
}

impl Engine {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Arguments for the read-only page-count query.
    pub fn page_count_args(pdf: &Path) -> Vec<OsString> {
        let path = to_engine_path(pdf);
        let mut permit = OsString::from("--permit-file-read=");
        permit.push(&path);
        vec![
            "-q".into(),
            "-dNODISPLAY".into(),
            permit,
            "-c".into(),
            format!(
                "({}) (r) file runpdfbegin pdfpagecount = quit",
                escape_ps_string(&path_bytes(&path))
            )
            .into(),
        ]
    }

    /// Arguments for batch rasterisation into `out_dir/file-%d.png`.
    pub fn render_args(pdf: &Path, out_dir: &Path, settings: &RenderSettings) -> Vec<OsString> {
        vec![
            "-dQUIET".into(),
            "-dPARANOIDSAFER".into(),
            "-dBATCH".into(),
            "-dNOPAUSE".into(),
            "-dNOPROMPT".into(),
            format!("-sDEVICE={}", settings.device).into(),
            format!("-dTextAlphaBits={}", settings.text_alpha_bits).into(),
            format!("-dGraphicsAlphaBits={}", settings.graphics_alpha_bits).into(),
            "-o".into(),
            out_dir.join(PAGE_FILE_PATTERN).into_os_string(),
            format!("-r{}", settings.dpi).into(),
            to_engine_path(pdf),
        ]
    }

    /// Run the engine to completion, capturing both output streams.
    ///
    /// Only a failure to start the process is an error here; callers decide
    /// what a non-zero status or unexpected output means.
    pub fn run(&self, args: &[OsString]) -> Result<EngineOutput, Pdf2PngError> {
        debug!("Running {} {:?}", self.executable.display(), args);

        let output = Command::new(&self.executable)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| Pdf2PngError::EngineSpawn {
                engine: self.executable.clone(),
                source,
            })?;

        let result = EngineOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            status: output.status.code(),
            success: output.status.success(),
        };
        debug!(
            "Engine exited with {:?} ({} bytes stdout, {} bytes stderr)",
            result.status,
            result.stdout.len(),
            result.stderr.len()
        );
        Ok(result)
    }
}

/// Path as handed to Ghostscript: the OS string unchanged, with
/// backslashes replaced by forward slashes on Windows.
#[cfg(windows)]
pub fn to_engine_path(path: &Path) -> OsString {
    use std::os::windows::ffi::{OsStrExt, OsStringExt};
    let wide: Vec<u16> = path
        .as_os_str()
        .encode_wide()
        .map(|u| if u == u16::from(b'\\') { u16::from(b'/') } else { u })
        .collect();
    OsString::from_wide(&wide)
}

#[cfg(not(windows))]
pub fn to_engine_path(path: &Path) -> OsString {
    path.as_os_str().to_os_string()
}

#[cfg(unix)]
fn path_bytes(path: &OsStr) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    path.as_bytes().to_vec()
}

// Ghostscript on Windows takes UTF-8 file names.
#[cfg(not(unix))]
fn path_bytes(path: &OsStr) -> Vec<u8> {
    path.to_string_lossy().into_owned().into_bytes()
}

/// Escape bytes for use inside a PostScript `( … )` literal.
fn escape_ps_string(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        match b {
            b'(' | b')' | b'\\' => {
                out.push('\\');
                out.push(char::from(b));
            }
            0x20..=0x7e => out.push(char::from(b)),
            _ => out.push_str(&format!("\\{b:03o}")),
        }
    }
    out
}

//! # gs-locate
//!
//! Find a [Ghostscript](https://www.ghostscript.com/) executable and a scratch
//! directory for `pdf2png`, so that library users never have to hard-code an
//! engine path.
//!
//! ## Resolution order
//!
//! [`locate_engine`] returns the first match of:
//!
//! 1. `GS_PATH`: an explicit path to the engine executable.
//! 2. A copy shipped next to the running binary, in `gs/<name>`.
//! 3. The first platform executable name found on `PATH`
//!    (`gs` on Unix, `gswin64c.exe` / `gswin32c.exe` on Windows).
//!
//! The result is cached for the lifetime of the process.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use gs_locate::{locate_engine, scratch_dir};
//!
//! let gs = locate_engine().expect("Ghostscript unavailable");
//! let scratch = scratch_dir();
//! println!("engine: {}, scratch: {}", gs.display(), scratch.display());
//! ```
//!
//! ## Environment variable overrides
//!
//! - `GS_PATH`: path to an existing Ghostscript executable.
//! - `PDF2PNG_SCRATCH_DIR`: override the default scratch directory.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use thiserror::Error;

// ── Public constants ─────────────────────────────────────────────────────────

/// Environment variable holding an explicit engine path.
pub const ENGINE_ENV: &str = "GS_PATH";

/// Environment variable overriding the scratch directory.
pub const SCRATCH_ENV: &str = "PDF2PNG_SCRATCH_DIR";

/// Directory (relative to the running binary) searched for a shipped engine.
const BUNDLED_DIR: &str = "gs";

// ── Error type ───────────────────────────────────────────────────────────────

/// Errors returned by gs-locate operations.
#[derive(Error, Debug)]
pub enum LocateError {
    /// The current OS has no known Ghostscript executable name.
    #[error("Unsupported platform: {os}/{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    /// `GS_PATH` (or an explicit path) does not point at a file.
    #[error("Ghostscript executable not found at '{path}'")]
    NotAFile { path: PathBuf },

    /// Nothing was found on any of the searched locations.
    #[error("Ghostscript not found (looked for {names:?} in GS_PATH, next to the binary and on PATH)")]
    NotFound { names: Vec<&'static str> },
}

// ── Internal: platform metadata ──────────────────────────────────────────────

struct PlatformInfo {
    /// Executable names in preference order.
    executable_names: &'static [&'static str],
}

fn detect_platform() -> Result<PlatformInfo, LocateError> {
    match std::env::consts::OS {
        "windows" => Ok(PlatformInfo {
            executable_names: &["gswin64c.exe", "gswin32c.exe", "gs.exe"],
        }),
        "macos" | "linux" | "freebsd" | "netbsd" | "openbsd" | "dragonfly" => Ok(PlatformInfo {
            executable_names: &["gs"],
        }),
        os => Err(LocateError::UnsupportedPlatform {
            os: os.to_string(),
            arch: std::env::consts::ARCH.to_string(),
        }),
    }
}

// ── Scratch directory resolution ─────────────────────────────────────────────

/// Returns the root under which per-call workspaces are created.
///
/// Default locations:
/// - **macOS**: `~/Library/Caches/pdf2png/scratch/`
/// - **Linux**: `~/.cache/pdf2png/scratch/`
/// - **Windows**: `%LOCALAPPDATA%\pdf2png\scratch\`
///
/// Override by setting `PDF2PNG_SCRATCH_DIR`.
pub fn scratch_dir() -> PathBuf {
    if let Ok(override_dir) = std::env::var(SCRATCH_ENV) {
        if !override_dir.is_empty() {
            return PathBuf::from(override_dir);
        }
    }

    let base = dirs::cache_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".cache")))
        .unwrap_or_else(std::env::temp_dir);

    base.join("pdf2png").join("scratch")
}

// ── Thread-safe singleton path cache ─────────────────────────────────────────

static RESOLVED_ENGINE: OnceLock<PathBuf> = OnceLock::new();

// ── Public API ───────────────────────────────────────────────────────────────

/// Returns `true` if [`locate_engine`] would succeed.
pub fn is_engine_available() -> bool {
    RESOLVED_ENGINE.get().is_some() || resolve_engine().is_ok()
}

/// Locates the Ghostscript executable, caching the first successful answer.
///
/// # Thread safety
///
/// Safe to call from multiple threads simultaneously; concurrent first calls
/// may each search, but all of them store the same answer.
pub fn locate_engine() -> Result<PathBuf, LocateError> {
    if let Some(path) = RESOLVED_ENGINE.get() {
        return Ok(path.clone());
    }

    let path = resolve_engine()?;
    let _ = RESOLVED_ENGINE.set(path.clone());

    Ok(path)
}

/// Validates an explicit engine path without touching the cache.
pub fn engine_from_path(path: &Path) -> Result<PathBuf, LocateError> {
    if path.is_file() {
        Ok(path.to_path_buf())
    } else {
        Err(LocateError::NotAFile {
            path: path.to_path_buf(),
        })
    }
}

/// Searches every directory in `path_var` for the first of `names`.
pub fn find_in_path_var(path_var: &std::ffi::OsStr, names: &[&str]) -> Option<PathBuf> {
    for dir in std::env::split_paths(path_var) {
        for name in names {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }
    None
}

// ── Internal helpers ─────────────────────────────────────────────────────────

fn resolve_engine() -> Result<PathBuf, LocateError> {
    // 1. Environment variable override. A dangling override is an error
    //    rather than a silent fallback to some other Ghostscript.
    if let Ok(env_path) = std::env::var(ENGINE_ENV) {
        if !env_path.is_empty() {
            return engine_from_path(Path::new(&env_path));
        }
    }

    let info = detect_platform()?;

    // 2. Shipped next to the running binary.
    if let Some(dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        for name in info.executable_names {
            let candidate = dir.join(BUNDLED_DIR).join(name);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
    }

    // 3. PATH lookup.
    if let Some(path_var) = std::env::var_os("PATH") {
        if let Some(found) = find_in_path_var(&path_var, info.executable_names) {
            return Ok(found);
        }
    }

    Err(LocateError::NotFound {
        names: info.executable_names.to_vec(),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

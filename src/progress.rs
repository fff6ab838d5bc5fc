//! Progress-callback trait for stage-level conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConverterConfigBuilder::progress_callback`] to observe a
//! [`crate::convert`] call as it moves through its stages.
//!
//! # Example
//!
//! ```rust
//! use pdf2png::{ConversionProgressCallback, ConverterConfig, Stage};
//! use std::sync::{Arc, Mutex};
//!
//! struct StageLog(Mutex<Vec<Stage>>);
//!
//! impl ConversionProgressCallback for StageLog {
//!     fn on_stage(&self, stage: Stage) {
//!         self.0.lock().unwrap().push(stage);
//!     }
//! }
//!
//! let log = Arc::new(StageLog(Mutex::new(Vec::new())));
//! let config = ConverterConfig::builder()
//!     .progress_callback(log.clone() as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::output::ConversionStats;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Position of a conversion in its state machine.
///
/// ```text
/// Idle → Normalizing → Counting (optional) → Rendering → Collecting → Done
///            └──────────────┴──────────────────┴─────────────┴──▶ Failed
/// ```
///
/// `Failed` is terminal: there is no retry and no rollback of files already
/// written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Idle,
    Normalizing,
    Counting,
    Rendering,
    Collecting,
    Done,
    Failed,
}

impl Stage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Done | Stage::Failed)
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_advance_to(&self, next: Stage) -> bool {
        use Stage::*;
        match (self, next) {
            (Done | Failed, _) => false,
            (Idle, Normalizing) => true,
            (Idle, _) => false,
            (_, Failed) => true,
            (Normalizing, Counting | Rendering) => true,
            (Counting, Rendering) => true,
            (Rendering, Collecting) => true,
            (Collecting, Done) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Idle => "idle",
            Stage::Normalizing => "normalizing",
            Stage::Counting => "counting",
            Stage::Rendering => "rendering",
            Stage::Collecting => "collecting",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Called by the conversion pipeline at stage boundaries.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Implementations must be `Send + Sync`: stages run
/// on the blocking thread pool and batch conversions run several documents
/// at once.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called on entering each stage, including `Done`.
    fn on_stage(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called once the engine has reported the page count.
    fn on_page_count(&self, pages: u32) {
        let _ = pages;
    }

    /// Called once page images have been recovered from the workspace.
    fn on_pages_rendered(&self, pages: usize) {
        let _ = pages;
    }

    /// Called when `stage` fails; the conversion stops afterwards.
    fn on_failed(&self, stage: Stage, error: &str) {
        let _ = (stage, error);
    }

    /// Called after `Done` with the final stats.
    fn on_complete(&self, stats: &ConversionStats) {
        let _ = stats;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConverterConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

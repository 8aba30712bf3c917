//! Observer trait for pipeline events.
//!
//! Attach an [`Arc<dyn PipelineObserver>`] with
//! [`crate::pipeline::Pipeline::with_observer`] to receive stage transitions
//! and per-slide image events as they happen. The CLI forwards them to a
//! terminal spinner; a UI could forward them to a channel or a websocket.
//!
//! # Example
//!
//! ```rust
//! use caselens::{PipelineObserver, Stage};
//! use std::sync::{Arc, Mutex};
//!
//! #[derive(Default)]
//! struct StageLog(Mutex<Vec<Stage>>);
//!
//! impl PipelineObserver for StageLog {
//!     fn on_stage_change(&self, _from: Stage, to: Stage) {
//!         self.0.lock().unwrap().push(to);
//!     }
//! }
//!
//! let log: Arc<dyn PipelineObserver> = Arc::new(StageLog::default());
//! # let _ = log;
//! ```

use crate::pipeline::Stage;
use std::sync::Arc;

/// Called by the pipeline as it moves between stages.
///
/// All methods have default no-op implementations so observers only
/// override what they care about.
pub trait PipelineObserver: Send + Sync {
    /// Called after every stage transition, including resets.
    fn on_stage_change(&self, from: Stage, to: Stage) {
        let _ = (from, to);
    }

    /// Called when the pipeline stores a failure message.
    fn on_error(&self, stage: Stage, message: &str) {
        let _ = (stage, message);
    }

    /// Called before image synthesis is requested for a slide.
    fn on_image_start(&self, slide_index: usize) {
        let _ = slide_index;
    }

    /// Called when a slide received its image.
    fn on_image_complete(&self, slide_index: usize) {
        let _ = slide_index;
    }

    /// Called when image synthesis failed for a slide.
    fn on_image_error(&self, slide_index: usize, error: &str) {
        let _ = (slide_index, error);
    }
}

/// An observer that ignores every event.
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}

/// Shared observer handle as stored by the pipeline.
pub type Observer = Arc<dyn PipelineObserver>;

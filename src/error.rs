//! Error types for the caselens library.
//!
//! Three error types mirror three failure scopes:
//!
//! * [`PipelineError`] — returned by [`crate::pipeline::Pipeline`]
//!   operations. Stage-level gateway failures are **fatal**: the pipeline
//!   moves to [`crate::pipeline::Stage::Error`] and only `reset` is allowed
//!   afterwards. Slide-level failures ([`SlideError`]) are wrapped here too
//!   but leave the pipeline untouched; use [`PipelineError::is_fatal`] to
//!   tell them apart.
//!
//! * [`GatewayError`] — anything the external AI service (or the plumbing
//!   around it: downloads, PDF rendering, JSON schema checks) can fail with.
//!
//! * [`ExportError`] — writing the dossier or the deck to disk failed. Export
//!   never alters pipeline state, so the artifacts stay intact for a retry.

use crate::pipeline::Stage;
use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by pipeline operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The operation is not allowed in the current stage.
    #[error("Cannot {operation} while the pipeline is in stage {stage}")]
    InvalidStage {
        operation: &'static str,
        stage: Stage,
    },

    /// Analysis was requested without any source.
    #[error("At least one source is required")]
    NoSources,

    /// `remove_source` was given an id that is not registered.
    #[error("No source with id '{id}'")]
    UnknownSource { id: String },

    /// A section or slide index is past the end of the sequence.
    #[error("{what} index {index} is out of range (have {len})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    /// A stage-level gateway call failed. The pipeline is now in `ERROR`.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// A per-slide operation failed. The pipeline stage is unchanged.
    #[error(transparent)]
    Slide(#[from] SlideError),
}

impl PipelineError {
    /// `false` for errors that leave the pipeline usable (slide-level
    /// failures, wrong-stage calls, bad indices).
    pub fn is_fatal(&self) -> bool {
        matches!(self, PipelineError::Gateway(_))
    }
}

/// Failures of the external analysis gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The provider returned an error.
    #[error("LLM API error: {message}")]
    Api { message: String },

    /// A provider call exceeded the configured timeout.
    #[error("{operation} timed out after {secs}s")]
    Timeout { operation: &'static str, secs: u64 },

    /// The response did not match the expected schema.
    #[error("Malformed {what} response: {detail}")]
    Schema { what: &'static str, detail: String },

    /// A URL source could not be fetched.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// A source payload could not be interpreted.
    #[error("Unreadable source '{name}': {detail}")]
    UnreadableSource { name: String, detail: String },

    /// A PDF source could not be loaded or rasterised.
    #[error("PDF source '{name}' could not be rendered: {detail}")]
    PdfRender { name: String, detail: String },

    /// The image endpoint answered without image data.
    #[error("Image generation returned no image data")]
    NoImage,

    /// A configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error scoped to one slide.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum SlideError {
    /// Image synthesis failed; the slide keeps no image.
    #[error("Slide {slide}: image synthesis failed: {detail}")]
    ImageFailed { slide: usize, detail: String },
}

/// Errors raised while writing an export file.
#[derive(Debug, Error)]
pub enum ExportError {
    /// There is nothing to export.
    #[error("Nothing to export: {0}")]
    Empty(&'static str),

    /// Could not create or write the output file.
    #[error("Failed to write '{path}': {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The presentation package could not be assembled.
    #[error("Failed to build presentation package: {0}")]
    Package(String),
}

impl From<zip::result::ZipError> for ExportError {
    fn from(e: zip::result::ZipError) -> Self {
        ExportError::Package(e.to_string())
    }
}

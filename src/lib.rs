//! # caselens
//!
//! Turn legal and regulatory case material into a structured analysis
//! dossier and an executive slide deck, using an LLM provider as the
//! analysis engine.
//!
//! ## Pipeline Overview
//!
//! ```text
//! URLs / files
//!  │
//!  ├─ 1. Validate  does the material describe a case decision?
//!  ├─ 2. Extract   download, rasterise PDFs, transcribe → one text
//!  ├─ 3. Review    the caller may edit the text
//!  ├─ 4. Dossier   five sections: summary, timeline, struggle, PM, DPO
//!  ├─ 5. Deck      8–12 slides with default styles
//!  ├─ 6. Images    optional, per slide, failures stay local to the slide
//!  └─ 7. Export    Word-compatible .doc and widescreen .pptx
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use caselens::{export_deck, export_word, GatewayConfig, LlmGateway, Pipeline, Source, Stage};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / ...
//!     let gateway = LlmGateway::new(GatewayConfig::default())?;
//!     let mut pipeline = Pipeline::new(gateway);
//!
//!     pipeline.submit_sources([Source::url("https://www.dataprotection.ie/en/news-media")])?;
//!     if pipeline.start_analysis().await? == Stage::ValidationFailed {
//!         return Ok(());
//!     }
//!     pipeline.proceed_to_analysis().await?;
//!     let deck = pipeline.generate_deck().await?.clone();
//!
//!     export_word(pipeline.sections(), &deck.presentation_title, Path::new("out"))?;
//!     export_deck(&deck, Path::new("out"))?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `caselens` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! ```toml
//! caselens = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod demo;
pub mod error;
pub mod export;
pub mod gateway;
pub mod model;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod sizing;
pub mod sources;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{GatewayConfig, GatewayConfigBuilder};
pub use error::{ExportError, GatewayError, PipelineError, SlideError};
pub use export::{export_deck, export_word, render_pptx, render_word_document};
pub use gateway::{Gateway, LlmGateway};
pub use model::{
    Deck, DeckDraft, DocumentSection, Slide, SlideDraft, SlideKind, SlideStyle, SlideStylePatch,
    StyledPoint,
};
pub use pipeline::{Pipeline, Stage};
pub use progress::{NoopObserver, PipelineObserver};
pub use sizing::{compute_render_sizes, RenderSizes};
pub use sources::{Source, SourceKind, SourceRegistry};

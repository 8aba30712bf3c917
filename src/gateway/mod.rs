//! The external analysis gateway: the contract the pipeline depends on and
//! the LLM-backed implementation of it.
//!
//! ## Data Flow inside [`LlmGateway`]
//!
//! ```text
//! sources ──▶ input ──▶ render ──▶ encode ──▶ llm (vision)  ─┐
//! (URL/file)  (fetch,   (pdfium)  (base64)                   ├──▶ extracted text
//!             decode)  ─────────── text/html ──▶ llm (text) ─┘
//!
//! text ──▶ llm ──▶ schema ──▶ DocumentSection[]
//! sections ──▶ llm ──▶ schema ──▶ DeckDraft
//! slide ──▶ image endpoint ──▶ data:image/png;base64,…
//! ```
//!
//! 1. [`input`]  — turn a [`Source`] into text, HTML, or PDF bytes
//! 2. [`render`] — rasterise PDF pages; runs in `spawn_blocking` because
//!    pdfium is not async-safe
//! 3. [`encode`] — PNG-encode and base64-wrap each page for the vision call
//! 4. [`llm`]    — the [`Gateway`] implementation; the only place provider
//!    calls are made
//! 5. [`schema`] — parse and validate JSON responses
//! 6. [`image`]  — OpenAI-compatible image generation client

pub mod encode;
pub mod image;
pub mod input;
pub mod llm;
pub mod render;
pub mod schema;

use crate::error::GatewayError;
use crate::model::{DeckDraft, DocumentSection, StyledPoint};
use crate::sources::Source;
use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

pub use llm::LlmGateway;

/// Operations the pipeline delegates to the generative AI service.
///
/// Every method may fail with a [`GatewayError`]. Implementations must
/// reject responses that do not match the expected shape instead of
/// returning partial objects.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Whether the sources plausibly relate to a legal/regulatory case decision.
    async fn validate(&self, sources: &[Source]) -> Result<bool, GatewayError>;

    /// Best-effort verbatim text of all sources.
    async fn extract_text(&self, sources: &[Source]) -> Result<String, GatewayError>;

    /// The dossier: summary, timeline, process/dialogue, PM takeaways,
    /// technical/DPO deep dive, in that order.
    async fn generate_document(&self, text: &str) -> Result<Vec<DocumentSection>, GatewayError>;

    /// A narrative slide deck derived from the dossier.
    async fn generate_deck(&self, sections: &[DocumentSection]) -> Result<DeckDraft, GatewayError>;

    /// An illustrative, text-free image for one slide. Returns an image
    /// reference (data URI or URL).
    async fn synthesize_image(
        &self,
        title: &str,
        points: &[StyledPoint],
    ) -> Result<String, GatewayError>;
}

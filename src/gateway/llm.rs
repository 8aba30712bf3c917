//! [`LlmGateway`]: the [`Gateway`] implementation backed by an
//! edgequake-llm provider.
//!
//! Every provider call goes through [`LlmGateway::chat`], which applies the
//! configured timeout. There is no retry loop: a failed call surfaces
//! immediately as a [`GatewayError`] and the pipeline decides what to do.

use super::encode::{encode_bytes, encode_page};
use super::image::ImageClient;
use super::input::{self, Material};
use super::render::render_pdf;
use super::schema;
use super::Gateway;
use crate::config::{GatewayConfig, DEFAULT_MODEL};
use crate::error::GatewayError;
use crate::model::{DeckDraft, DocumentSection, StyledPoint};
use crate::prompts;
use crate::sources::Source;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Expected dossier length.
const EXPECTED_SECTIONS: usize = 5;
/// Expected deck length range.
const MIN_SLIDES: usize = 8;
const MAX_SLIDES: usize = 12;

/// Gateway that talks to a chat/vision provider and an image endpoint.
pub struct LlmGateway {
    provider: Arc<dyn LLMProvider>,
    images: ImageClient,
    config: GatewayConfig,
}

impl std::fmt::Debug for LlmGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmGateway")
            .field("provider", &"<dyn LLMProvider>")
            .field("config", &self.config)
            .finish()
    }
}

impl LlmGateway {
    /// Resolve the provider and build the gateway.
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let provider = resolve_provider(&config)?;
        info!(
            "LLM gateway ready (provider={}, model={})",
            config.provider_name.as_deref().unwrap_or("auto"),
            config.model.as_deref().unwrap_or("default")
        );
        let images = ImageClient::new(&config)?;
        Ok(Self {
            provider,
            images,
            config,
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// One provider call, bounded by `api_timeout_secs`.
    async fn chat(
        &self,
        operation: &'static str,
        messages: Vec<ChatMessage>,
    ) -> Result<String, GatewayError> {
        let options = CompletionOptions {
            temperature: Some(self.config.temperature),
            max_tokens: Some(self.config.max_tokens),
            ..Default::default()
        };
        let secs = self.config.api_timeout_secs;
        let start = Instant::now();

        let response = tokio::time::timeout(
            Duration::from_secs(secs),
            self.provider.chat(&messages, Some(&options)),
        )
        .await
        .map_err(|_| GatewayError::Timeout { operation, secs })?
        .map_err(|e| GatewayError::Api {
            message: e.to_string(),
        })?;

        debug!(
            "{}: {} input tokens, {} output tokens, {:?}",
            operation,
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );
        Ok(response.content)
    }

    async fn transcribe(&self, label: String, image: ImageData) -> Result<String, GatewayError> {
        let messages = vec![
            ChatMessage::system(prompts::PAGE_TRANSCRIPTION_PROMPT),
            ChatMessage::user_with_images(label, vec![image]),
        ];
        let raw = self.chat("transcribe_page", messages).await?;
        Ok(schema::clean_text(&raw))
    }

    /// Turn one resolved source into text.
    async fn material_text(&self, material: Material) -> Result<String, GatewayError> {
        match material {
            Material::Text { text, .. } => Ok(text.trim().to_string()),
            Material::Html { name, html } => {
                let stripped = input::strip_html(&html);
                if stripped.is_empty() {
                    return Err(GatewayError::UnreadableSource {
                        name,
                        detail: "page has no readable text".into(),
                    });
                }
                let messages = vec![
                    ChatMessage::system(prompts::EXTRACTION_PROMPT),
                    ChatMessage::user(prompts::truncate_chars(
                        &stripped,
                        self.config.max_input_chars,
                    )),
                ];
                let raw = self.chat("extract_text", messages).await?;
                Ok(schema::clean_text(&raw))
            }
            Material::Pdf { name, bytes } => {
                let rendered = render_pdf(
                    &name,
                    bytes,
                    self.config.max_pdf_pages,
                    self.config.dpi,
                    self.config.max_rendered_pixels,
                    self.config.pdf_password.clone(),
                )
                .await?;
                let total = rendered.total_pages;
                let mut pages = Vec::with_capacity(rendered.pages.len());
                for (i, page) in rendered.pages.iter().enumerate() {
                    let image = encode_page(page).map_err(|e| GatewayError::PdfRender {
                        name: name.clone(),
                        detail: format!("page {}: {e}", i + 1),
                    })?;
                    let text = self
                        .transcribe(format!("Page {} of {}", i + 1, total), image)
                        .await?;
                    debug!("'{}' page {}: {} chars", name, i + 1, text.len());
                    pages.push(text);
                }
                // Tell the analysis that the tail of the document is missing.
                if let Some(note) = rendered.truncation_note() {
                    pages.push(note);
                }
                Ok(pages.join("\n\n"))
            }
            Material::Image { mime, bytes, .. } => {
                self.transcribe(String::new(), encode_bytes(&bytes, &mime))
                    .await
            }
        }
    }
}

#[async_trait]
impl Gateway for LlmGateway {
    async fn validate(&self, sources: &[Source]) -> Result<bool, GatewayError> {
        let messages = vec![
            ChatMessage::system(prompts::VALIDATION_PROMPT),
            ChatMessage::user(prompts::validation_request(
                sources,
                self.config.validation_excerpt_chars,
            )),
        ];
        let raw = self.chat("validate", messages).await?;
        let verdict = schema::parse_validation(&raw)?;
        info!("Validation: related={} ({})", verdict.related, verdict.reason);
        Ok(verdict.related)
    }

    async fn extract_text(&self, sources: &[Source]) -> Result<String, GatewayError> {
        let mut parts = Vec::with_capacity(sources.len());
        for source in sources {
            let material = input::resolve(source, self.config.download_timeout_secs).await?;
            let text = self.material_text(material).await?;
            if text.is_empty() {
                warn!("Source '{}' yielded no text", source.display_name);
                continue;
            }
            parts.push((source.display_name.as_str(), text));
        }
        if parts.is_empty() {
            return Err(GatewayError::Schema {
                what: "extraction",
                detail: "no text could be extracted from the sources".into(),
            });
        }
        Ok(join_sources(&parts))
    }

    async fn generate_document(&self, text: &str) -> Result<Vec<DocumentSection>, GatewayError> {
        let system = self
            .config
            .document_prompt
            .as_deref()
            .unwrap_or(prompts::DOCUMENT_PROMPT);
        let messages = vec![
            ChatMessage::system(system),
            ChatMessage::user(prompts::document_request(text, self.config.max_input_chars)),
        ];
        let raw = self.chat("generate_document", messages).await?;
        let sections = schema::parse_document(&raw)?;
        if sections.len() != EXPECTED_SECTIONS {
            warn!(
                "Dossier has {} sections, expected {}",
                sections.len(),
                EXPECTED_SECTIONS
            );
        }
        Ok(sections)
    }

    async fn generate_deck(&self, sections: &[DocumentSection]) -> Result<DeckDraft, GatewayError> {
        let system = self
            .config
            .deck_prompt
            .as_deref()
            .unwrap_or(prompts::DECK_PROMPT);
        let messages = vec![
            ChatMessage::system(system),
            ChatMessage::user(prompts::deck_request(sections, self.config.max_input_chars)),
        ];
        let raw = self.chat("generate_deck", messages).await?;
        let deck = schema::parse_deck(&raw)?;
        if !(MIN_SLIDES..=MAX_SLIDES).contains(&deck.slides.len()) {
            warn!(
                "Deck has {} slides, expected {}-{}",
                deck.slides.len(),
                MIN_SLIDES,
                MAX_SLIDES
            );
        }
        Ok(deck)
    }

    async fn synthesize_image(
        &self,
        title: &str,
        points: &[StyledPoint],
    ) -> Result<String, GatewayError> {
        self.images.generate(&prompts::image_prompt(title, points)).await
    }
}

/// Join per-source text under `## Source: <name>` headers.
fn join_sources(parts: &[(&str, String)]) -> String {
    parts
        .iter()
        .map(|(name, text)| format!("## Source: {name}\n\n{text}"))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, GatewayError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        GatewayError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the chat provider, most specific first:
///
/// 1. a pre-built provider in the config;
/// 2. a named provider plus the configured model;
/// 3. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL` when both are set;
/// 4. OpenAI when `OPENAI_API_KEY` is present;
/// 5. whatever `ProviderFactory::from_env` detects.
fn resolve_provider(config: &GatewayConfig) -> Result<Arc<dyn LLMProvider>, GatewayError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
    if let Some(ref name) = config.provider_name {
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(env_model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !env_model.is_empty() {
            return create_provider(&prov, &env_model);
        }
    }

    if std::env::var("OPENAI_API_KEY").is_ok_and(|k| !k.is_empty()) {
        return create_provider("openai", model);
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| GatewayError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                 Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or pass --provider.\n\
                 Error: {e}"
            ),
        })?;
    Ok(llm_provider)
}

//! Configuration for the LLM-backed gateway.
//!
//! Every knob [`crate::gateway::LlmGateway`] reads lives in
//! [`GatewayConfig`], built through [`GatewayConfigBuilder`]. Setters clamp
//! their input to a sane range; [`GatewayConfigBuilder::build`] rejects the
//! combinations that cannot work.

use crate::error::GatewayError;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::sync::Arc;

/// Default chat model when neither the caller nor the environment picks one.
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// Default image model for slide illustrations.
pub const DEFAULT_IMAGE_MODEL: &str = "gpt-image-1";

/// Default OpenAI-compatible image generation endpoint.
pub const DEFAULT_IMAGE_ENDPOINT: &str = "https://api.openai.com/v1/images/generations";

/// Configuration for [`crate::gateway::LlmGateway`].
///
/// # Example
/// ```rust
/// use caselens::GatewayConfig;
///
/// let config = GatewayConfig::builder()
///     .model("gpt-4.1-mini")
///     .max_input_chars(20_000)
///     .api_timeout_secs(90)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_input_chars, 20_000);
/// ```
#[derive(Clone)]
pub struct GatewayConfig {
    /// LLM model identifier, e.g. "gpt-4.1-mini". `None` uses the
    /// environment or [`DEFAULT_MODEL`].
    pub model: Option<String>,

    /// LLM provider name ("openai", "anthropic", "ollama", ...).
    pub provider_name: Option<String>,

    /// Pre-constructed provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.2.
    pub temperature: f32,

    /// Maximum completion tokens per call. Default: 8192.
    ///
    /// The deck response is the largest: twelve slides with styled points
    /// regularly pass 4 000 tokens.
    pub max_tokens: usize,

    /// Per-call timeout in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Download timeout for URL sources in seconds. Default: 60.
    pub download_timeout_secs: u64,

    /// Case text is truncated to this many characters before document and
    /// deck generation. Default: 30 000.
    pub max_input_chars: usize,

    /// Characters of each text source sent along for validation. Default: 2 000.
    pub validation_excerpt_chars: usize,

    /// Pages of a PDF source transcribed during extraction. Default: 30.
    pub max_pdf_pages: usize,

    /// Rendering DPI for PDF pages. Range 72–400. Default: 150.
    pub dpi: u32,

    /// Cap on either dimension of a rendered page, in pixels. Default: 2000.
    pub max_rendered_pixels: u32,

    /// Password for encrypted PDF sources.
    pub pdf_password: Option<String>,

    /// Image generation endpoint (OpenAI-compatible).
    pub image_endpoint: String,

    /// Image generation model.
    pub image_model: String,

    /// API key for the image endpoint. `None` falls back to `OPENAI_API_KEY`.
    pub image_api_key: Option<String>,

    /// Replaces the built-in instruction used for document analysis.
    pub document_prompt: Option<String>,

    /// Replaces the built-in instruction used for deck generation.
    pub deck_prompt: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.2,
            max_tokens: 8192,
            api_timeout_secs: 120,
            download_timeout_secs: 60,
            max_input_chars: 30_000,
            validation_excerpt_chars: 2_000,
            max_pdf_pages: 30,
            dpi: 150,
            max_rendered_pixels: 2000,
            pdf_password: None,
            image_endpoint: DEFAULT_IMAGE_ENDPOINT.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            image_api_key: None,
            document_prompt: None,
            deck_prompt: None,
        }
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("max_input_chars", &self.max_input_chars)
            .field("max_pdf_pages", &self.max_pdf_pages)
            .field("dpi", &self.dpi)
            .field("image_endpoint", &self.image_endpoint)
            .field("image_model", &self.image_model)
            .field("image_api_key", &self.image_api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl GatewayConfig {
    pub fn builder() -> GatewayConfigBuilder {
        GatewayConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`GatewayConfig`].
#[derive(Debug)]
pub struct GatewayConfigBuilder {
    config: GatewayConfig,
}

impl GatewayConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn max_input_chars(mut self, n: usize) -> Self {
        self.config.max_input_chars = n.max(1_000);
        self
    }

    pub fn validation_excerpt_chars(mut self, n: usize) -> Self {
        self.config.validation_excerpt_chars = n;
        self
    }

    pub fn max_pdf_pages(mut self, n: usize) -> Self {
        self.config.max_pdf_pages = n.max(1);
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn pdf_password(mut self, pwd: impl Into<String>) -> Self {
        self.config.pdf_password = Some(pwd.into());
        self
    }

    pub fn image_endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.image_endpoint = url.into();
        self
    }

    pub fn image_model(mut self, model: impl Into<String>) -> Self {
        self.config.image_model = model.into();
        self
    }

    pub fn image_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.image_api_key = Some(key.into());
        self
    }

    pub fn document_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.document_prompt = Some(prompt.into());
        self
    }

    pub fn deck_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.deck_prompt = Some(prompt.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<GatewayConfig, GatewayError> {
        let c = &self.config;
        if c.api_timeout_secs == 0 {
            return Err(GatewayError::InvalidConfig(
                "API timeout must be at least 1 second".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(GatewayError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        if !(c.image_endpoint.starts_with("http://") || c.image_endpoint.starts_with("https://")) {
            return Err(GatewayError::InvalidConfig(format!(
                "image endpoint must be an http(s) URL, got '{}'",
                c.image_endpoint
            )));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = GatewayConfig::default();
        assert_eq!(c.max_input_chars, 30_000);
        assert_eq!(c.max_pdf_pages, 30);
        assert_eq!(c.validation_excerpt_chars, 2_000);
        assert_eq!(c.image_model, DEFAULT_IMAGE_MODEL);
        assert!(c.model.is_none());
    }

    #[test]
    fn setters_clamp() {
        let c = GatewayConfig::builder()
            .temperature(5.0)
            .dpi(10)
            .max_pdf_pages(0)
            .max_input_chars(5)
            .build()
            .unwrap();
        assert_eq!(c.temperature, 2.0);
        assert_eq!(c.dpi, 72);
        assert_eq!(c.max_pdf_pages, 1);
        assert_eq!(c.max_input_chars, 1_000);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = GatewayConfig::builder().api_timeout_secs(0).build().unwrap_err();
        assert!(matches!(err, GatewayError::InvalidConfig(_)));
    }

    #[test]
    fn non_http_image_endpoint_is_rejected() {
        assert!(GatewayConfig::builder()
            .image_endpoint("ftp://images")
            .build()
            .is_err());
    }

    #[test]
    fn debug_redacts_image_key() {
        let c = GatewayConfig::builder()
            .image_api_key("sk-secret")
            .build()
            .unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("sk-secret"));
        assert!(dbg.contains("<redacted>"));
    }
}

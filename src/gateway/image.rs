//! Slide illustrations from an OpenAI-compatible image generation endpoint.
//!
//! The edgequake-llm provider trait covers chat and embeddings only, so the
//! image call is a plain `reqwest` POST. The response is turned into an
//! image reference the rest of the crate understands: a base64 PNG data URI,
//! or the URL the endpoint returned.

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Landscape output, closest supported size to the 16:9 image box.
const IMAGE_SIZE: &str = "1536x1024";

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u32,
    size: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ImageResponse {
    #[serde(default)]
    data: Vec<ImageDatum>,
}

#[derive(Debug, Deserialize)]
struct ImageDatum {
    #[serde(default)]
    b64_json: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

/// Client for the image endpoint configured in [`GatewayConfig`].
#[derive(Debug, Clone)]
pub struct ImageClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    timeout_secs: u64,
}

impl ImageClient {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()
            .map_err(|e| GatewayError::Internal(format!("HTTP client: {e}")))?;
        let api_key = config
            .image_api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|k| !k.is_empty());
        Ok(Self {
            http,
            endpoint: config.image_endpoint.clone(),
            model: config.image_model.clone(),
            api_key,
            timeout_secs: config.api_timeout_secs,
        })
    }

    /// Generate one image for `prompt` and return its reference.
    pub async fn generate(&self, prompt: &str) -> Result<String, GatewayError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| GatewayError::ProviderNotConfigured {
                provider: "image".into(),
                hint: "Set OPENAI_API_KEY or CASELENS_IMAGE_API_KEY to enable slide images.".into(),
            })?;

        debug!("Requesting image from {} ({})", self.endpoint, self.model);
        let request = ImageRequest {
            model: &self.model,
            prompt,
            n: 1,
            size: IMAGE_SIZE,
        };
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(key)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Api {
                message: format!("image endpoint returned HTTP {status}: {}", body.trim()),
            });
        }

        let parsed: ImageResponse = response.json().await.map_err(|e| GatewayError::Schema {
            what: "image",
            detail: e.to_string(),
        })?;
        image_reference(parsed)
    }

    fn transport_error(&self, e: reqwest::Error) -> GatewayError {
        if e.is_timeout() {
            GatewayError::Timeout {
                operation: "synthesize_image",
                secs: self.timeout_secs,
            }
        } else {
            GatewayError::Api {
                message: e.to_string(),
            }
        }
    }
}

/// Pick the first usable image out of a response.
pub(crate) fn image_reference(response: ImageResponse) -> Result<String, GatewayError> {
    for datum in response.data {
        if let Some(b64) = datum.b64_json.filter(|b| !b.is_empty()) {
            return Ok(format!("data:image/png;base64,{b64}"));
        }
        if let Some(url) = datum.url.filter(|u| u.starts_with("http")) {
            return Ok(url);
        }
    }
    Err(GatewayError::NoImage)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> ImageResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn base64_becomes_data_uri() {
        let r = parse(r#"{"data": [{"b64_json": "iVBORw0KGgo="}]}"#);
        assert_eq!(image_reference(r).unwrap(), "data:image/png;base64,iVBORw0KGgo=");
    }

    #[test]
    fn url_is_passed_through() {
        let r = parse(r#"{"data": [{"url": "https://cdn.example/img.png"}]}"#);
        assert_eq!(image_reference(r).unwrap(), "https://cdn.example/img.png");
    }

    #[test]
    fn empty_response_is_no_image() {
        assert!(matches!(image_reference(parse(r#"{"data": []}"#)), Err(GatewayError::NoImage)));
        assert!(matches!(image_reference(parse("{}")), Err(GatewayError::NoImage)));
    }

    #[tokio::test]
    async fn missing_key_is_reported_before_any_request() {
        let client = ImageClient {
            http: reqwest::Client::new(),
            endpoint: "https://images.invalid/v1/images/generations".into(),
            model: "gpt-image-1".into(),
            api_key: None,
            timeout_secs: 1,
        };
        let err = client.generate("a diagram").await.unwrap_err();
        assert!(matches!(err, GatewayError::ProviderNotConfigured { .. }));
    }
}

//! Source resolution: turn a [`Source`] into material the model can read.
//!
//! URL sources are downloaded; file sources are either plain text or a
//! `data:` URI that is decoded here. The bytes are then classified by magic
//! number and content type so PDFs go to the vision path and HTML is
//! stripped to text before the cleanup call.

use crate::error::GatewayError;
use crate::sources::{Source, SourceKind};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;
use tracing::{debug, info};

/// A source resolved to readable content.
#[derive(Debug, Clone, PartialEq)]
pub enum Material {
    /// Plain text, used as is.
    Text { name: String, text: String },
    /// An HTML page; stripped with [`strip_html`] before use.
    Html { name: String, html: String },
    /// A PDF document, rasterised and transcribed page by page.
    Pdf { name: String, bytes: Vec<u8> },
    /// A raster image (a scanned page, a screenshot), transcribed directly.
    Image {
        name: String,
        mime: String,
        bytes: Vec<u8>,
    },
}

impl Material {
    pub fn name(&self) -> &str {
        match self {
            Material::Text { name, .. }
            | Material::Html { name, .. }
            | Material::Pdf { name, .. }
            | Material::Image { name, .. } => name,
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve one source to [`Material`], downloading URLs with the given timeout.
pub async fn resolve(source: &Source, timeout_secs: u64) -> Result<Material, GatewayError> {
    let name = source.display_name.clone();
    match source.kind {
        SourceKind::Url => {
            let (content_type, bytes) = download(&source.payload, timeout_secs).await?;
            classify(name, content_type.as_deref(), bytes)
        }
        SourceKind::File if source.is_binary() => {
            let (mime, bytes) =
                decode_data_uri(&source.payload).map_err(|detail| GatewayError::UnreadableSource {
                    name: name.clone(),
                    detail,
                })?;
            classify(name, Some(&mime), bytes)
        }
        SourceKind::File => {
            let text = source.payload.clone();
            if looks_like_html(&text) {
                Ok(Material::Html { name, html: text })
            } else {
                Ok(Material::Text { name, text })
            }
        }
    }
}

/// Split a `data:<mime>;base64,<payload>` URI into its MIME type and bytes.
pub fn decode_data_uri(uri: &str) -> Result<(String, Vec<u8>), String> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| "not a data URI".to_string())?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| "data URI has no payload".to_string())?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or_else(|| "only base64 data URIs are supported".to_string())?;
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| format!("invalid base64: {e}"))?;
    let mime = if mime.is_empty() {
        "application/octet-stream".to_string()
    } else {
        mime.to_ascii_lowercase()
    };
    Ok((mime, bytes))
}

/// Decide what a byte payload is. Magic numbers win over declared types.
pub fn classify(
    name: String,
    content_type: Option<&str>,
    bytes: Vec<u8>,
) -> Result<Material, GatewayError> {
    if bytes.starts_with(b"%PDF") {
        return Ok(Material::Pdf { name, bytes });
    }
    if let Some(mime) = sniff_image(&bytes) {
        return Ok(Material::Image {
            name,
            mime: mime.to_string(),
            bytes,
        });
    }

    let declared = content_type.unwrap_or_default().to_ascii_lowercase();
    if declared.starts_with("application/pdf") {
        return Err(GatewayError::UnreadableSource {
            name,
            detail: "declared as PDF but missing the %PDF header".into(),
        });
    }

    let text = match String::from_utf8(bytes) {
        Ok(t) => t,
        Err(_) => {
            return Err(GatewayError::UnreadableSource {
                name,
                detail: format!(
                    "unsupported binary content ({})",
                    if declared.is_empty() { "unknown type" } else { &declared }
                ),
            })
        }
    };
    let text = text.trim_start_matches('\u{FEFF}').to_string();
    if declared.contains("html") || looks_like_html(&text) {
        Ok(Material::Html { name, html: text })
    } else {
        Ok(Material::Text { name, text })
    }
}

fn sniff_image(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some("image/png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("image/gif")
    } else {
        None
    }
}

fn looks_like_html(text: &str) -> bool {
    let head: String = text.chars().take(512).collect::<String>().to_ascii_lowercase();
    head.contains("<!doctype html") || head.contains("<html") || head.contains("<body")
}

/// Download a URL and return its declared content type and body.
async fn download(url: &str, timeout_secs: u64) -> Result<(Option<String>, Vec<u8>), GatewayError> {
    info!("Downloading source: {}", url);
    let failed = |reason: String| GatewayError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            failed(format!("timed out after {timeout_secs}s"))
        } else {
            failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;
    debug!("Downloaded {} bytes ({:?})", bytes.len(), content_type);
    Ok((content_type, bytes.to_vec()))
}

// ── HTML stripping ───────────────────────────────────────────────────────

static RE_HIDDEN_BLOCKS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(?:script|style|noscript|template)\b[^>]*>.*?</(?:script|style|noscript|template)\s*>")
        .unwrap()
});
static RE_COMMENTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
/// A run of adjacent block tags (`</li><li>`, `</p><ul>`) is one break.
static RE_BLOCK_TAGS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:\s*</?(?:p|div|br|li|ul|ol|tr|table|section|article|h[1-6]|blockquote|header|footer)\b[^>]*>\s*)+")
        .unwrap()
});
static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]+>").unwrap());
static RE_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\u{a0}]+").unwrap());
static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Reduce an HTML page to readable text: drop scripts, styles, and comments,
/// turn block elements into line breaks, decode entities, and collapse
/// whitespace.
pub fn strip_html(html: &str) -> String {
    let s = RE_HIDDEN_BLOCKS.replace_all(html, "");
    let s = RE_COMMENTS.replace_all(&s, "");
    let s = RE_BLOCK_TAGS.replace_all(&s, "\n");
    let s = RE_TAGS.replace_all(&s, "");
    let s = html_escape::decode_html_entities(&s);
    let s = RE_SPACES.replace_all(&s, " ");
    let lines: Vec<&str> = s.lines().map(str::trim).collect();
    RE_BLANK_LINES
        .replace_all(&lines.join("\n"), "\n\n")
        .trim()
        .to_string()
}

//! User-submitted case material and the registry that holds it.
//!
//! A [`Source`] is immutable once created. The registry only supports
//! adding and removing whole entries; the pipeline guarantees that neither
//! happens after analysis has started.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What a source's payload contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// `payload` is an HTTP/HTTPS URL.
    Url,
    /// `payload` is raw UTF-8 text or a `data:<mime>;base64,` URI.
    File,
}

/// One piece of case material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub id: String,
    pub kind: SourceKind,
    pub payload: String,
    pub display_name: String,
}

impl Source {
    /// A URL source. The display name is the URL itself.
    pub fn url(url: impl Into<String>) -> Self {
        let url = url.into().trim().to_string();
        Self {
            id: new_id(),
            kind: SourceKind::Url,
            display_name: url.clone(),
            payload: url,
        }
    }

    /// A file whose content is already text.
    pub fn text_file(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            kind: SourceKind::File,
            payload: text.into(),
            display_name: name.into(),
        }
    }

    /// A binary file, stored as a base64 data URI.
    pub fn binary_file(name: impl Into<String>, mime: &str, bytes: &[u8]) -> Self {
        Self {
            id: new_id(),
            kind: SourceKind::File,
            payload: format!("data:{};base64,{}", mime, STANDARD.encode(bytes)),
            display_name: name.into(),
        }
    }

    /// Build a file source from raw bytes, keeping UTF-8 text as text and
    /// wrapping everything else (PDFs in particular) as base64.
    pub fn from_file_bytes(name: impl Into<String>, bytes: &[u8]) -> Self {
        if bytes.starts_with(b"%PDF") {
            return Self::binary_file(name, "application/pdf", bytes);
        }
        match std::str::from_utf8(bytes) {
            Ok(text) => Self::text_file(name, text.trim_start_matches('\u{FEFF}')),
            Err(_) => Self::binary_file(name, "application/octet-stream", bytes),
        }
    }

    /// `true` when the payload is a `data:` URI rather than plain text.
    pub fn is_binary(&self) -> bool {
        self.kind == SourceKind::File && self.payload.starts_with("data:")
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Ordered collection of sources with unique ids.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceRegistry {
    sources: Vec<Source>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a source. Returns its id.
    pub fn add(&mut self, source: Source) -> String {
        let id = source.id.clone();
        self.sources.push(source);
        id
    }

    /// Remove the source with `id`, returning it if present.
    pub fn remove(&mut self, id: &str) -> Option<Source> {
        let pos = self.sources.iter().position(|s| s.id == id)?;
        Some(self.sources.remove(pos))
    }

    pub fn get(&self, id: &str) -> Option<&Source> {
        self.sources.iter().find(|s| s.id == id)
    }

    pub fn as_slice(&self) -> &[Source] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn clear(&mut self) {
        self.sources.clear();
    }
}

//! Boundary checks for model responses.
//!
//! Models are asked for bare JSON, but they still wrap it in fences, prepend
//! a sentence, or return a point as a plain string. This module normalises
//! those quirks, then parses into the crate's types. Anything that still
//! does not match becomes [`GatewayError::Schema`]; partial objects never
//! leave this module.

use crate::error::GatewayError;
use crate::model::{DeckDraft, DocumentSection};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

/// Verdict of the validation call.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ValidationVerdict {
    pub related: bool,
    #[serde(default)]
    pub reason: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DocumentResponse {
    Wrapped { sections: Vec<DocumentSection> },
    Bare(Vec<DocumentSection>),
}

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*[ \t]*\n(.*?)\n?```\s*$").unwrap());
static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{4,}").unwrap());

fn strip_fences(input: &str) -> &str {
    let trimmed = input.trim();
    match RE_OUTER_FENCES.captures(trimmed) {
        Some(caps) => caps.get(1).map_or(trimmed, |m| m.as_str()),
        None => trimmed,
    }
}

/// Cut the outermost JSON object or array out of a response.
fn json_payload(raw: &str) -> &str {
    let s = strip_fences(raw);
    let start = s.find(['{', '[']);
    let end = s.rfind(['}', ']']);
    match (start, end) {
        (Some(a), Some(b)) if a < b => &s[a..=b],
        _ => s,
    }
}

fn schema_error(what: &'static str, detail: impl ToString) -> GatewayError {
    GatewayError::Schema {
        what,
        detail: detail.to_string(),
    }
}

/// Clean a free-text response (extraction, page transcription): strip
/// fences, normalise line endings, drop invisible characters, and collapse
/// long runs of blank lines.
pub fn clean_text(raw: &str) -> String {
    let normalised = raw.replace("\r\n", "\n").replace('\r', "\n");
    let s = strip_fences(&normalised)
        .replace(['\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}'], "");
    let s: Vec<&str> = s.lines().map(str::trim_end).collect();
    RE_BLANK_LINES
        .replace_all(&s.join("\n"), "\n\n\n")
        .trim()
        .to_string()
}

pub fn parse_validation(raw: &str) -> Result<ValidationVerdict, GatewayError> {
    serde_json::from_str(json_payload(raw)).map_err(|e| schema_error("validation", e))
}

/// Parse the dossier. Accepts `{"sections": [...]}` or a bare array;
/// rejects an empty list and sections without a title.
pub fn parse_document(raw: &str) -> Result<Vec<DocumentSection>, GatewayError> {
    let sections = match serde_json::from_str(json_payload(raw)) {
        Ok(DocumentResponse::Wrapped { sections }) | Ok(DocumentResponse::Bare(sections)) => sections,
        Err(e) => return Err(schema_error("document", e)),
    };
    if sections.is_empty() {
        return Err(schema_error("document", "no sections"));
    }
    if let Some(i) = sections.iter().position(|s| s.title.trim().is_empty()) {
        return Err(schema_error("document", format!("section {} has no title", i + 1)));
    }
    Ok(sections)
}

/// Parse the deck. String points are promoted to `{"text": ...}` before
/// typed parsing; an unknown slide type or an empty deck is rejected.
pub fn parse_deck(raw: &str) -> Result<DeckDraft, GatewayError> {
    let mut value: Value =
        serde_json::from_str(json_payload(raw)).map_err(|e| schema_error("deck", e))?;

    if let Some(slides) = value.get_mut("slides").and_then(Value::as_array_mut) {
        for slide in slides {
            if let Some(points) = slide.get_mut("points").and_then(Value::as_array_mut) {
                for p in points.iter_mut() {
                    if let Value::String(s) = p {
                        let text = std::mem::take(s);
                        *p = serde_json::json!({ "text": text });
                    }
                }
            }
        }
    }

    let deck: DeckDraft = serde_json::from_value(value).map_err(|e| schema_error("deck", e))?;
    if deck.slides.is_empty() {
        return Err(schema_error("deck", "no slides"));
    }
    Ok(deck)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SlideKind;

    #[test]
    fn fences_and_prose_are_tolerated() {
        let raw = "Here you go:\n```json\n{\"related\": true, \"reason\": \"DPC decision\"}\n```";
        let v = parse_validation(raw).unwrap();
        assert!(v.related);
        assert_eq!(v.reason, "DPC decision");
    }

    #[test]
    fn validation_requires_related() {
        let err = parse_validation(r#"{"reason": "?"}"#).unwrap_err();
        assert!(matches!(err, GatewayError::Schema { what: "validation", .. }));
    }

    #[test]
    fn document_accepts_wrapped_and_bare() {
        let wrapped = r#"{"sections": [{"title": "1. Summary", "body": "Fine"}]}"#;
        let bare = r#"[{"title": "1. Summary", "content": "Fine"}]"#;
        assert_eq!(parse_document(wrapped).unwrap(), parse_document(bare).unwrap());
    }

    #[test]
    fn document_rejects_empty_and_untitled() {
        assert!(parse_document(r#"{"sections": []}"#).is_err());
        assert!(parse_document(r#"[{"title": " ", "body": "x"}]"#).is_err());
        assert!(parse_document("not json at all").is_err());
    }

    #[test]
    fn deck_promotes_string_points() {
        let raw = r#"{"presentationTitle": "Meta vs DPC", "subtitle": "2023",
            "slides": [{"title": "Facts", "type": "content", "points": ["Fine", {"text": "Art. 25", "bold": true}]}]}"#;
        let deck = parse_deck(raw).unwrap();
        assert_eq!(deck.slides[0].kind, SlideKind::Content);
        assert_eq!(deck.slides[0].points[0].text, "Fine");
        assert!(deck.slides[0].points[1].is_bold());
    }

    #[test]
    fn deck_rejects_unknown_kind() {
        let raw = r#"{"presentationTitle": "T", "subtitle": "S",
            "slides": [{"title": "X", "type": "appendix", "points": []}]}"#;
        let err = parse_deck(raw).unwrap_err();
        assert!(err.to_string().contains("deck"));
    }

    #[test]
    fn deck_rejects_missing_fields_and_empty_slides() {
        assert!(parse_deck(r#"{"subtitle": "S", "slides": []}"#).is_err());
        assert!(parse_deck(r#"{"presentationTitle": "T", "subtitle": "S", "slides": []}"#).is_err());
    }

    #[test]
    fn clean_text_strips_fences_and_noise() {
        let raw = "```\r\nLine one  \r\n\u{200B}\r\n\r\n\r\n\r\n\r\nLine two\r\n```";
        assert_eq!(clean_text(raw), "Line one\n\n\nLine two");
    }
}

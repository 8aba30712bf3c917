//! Prompts for every gateway call.
//!
//! All instruction text lives here so a prompt change is a one-file edit and
//! tests can inspect prompts without a provider. The document and deck
//! instructions can be replaced through
//! [`crate::config::GatewayConfig::document_prompt`] and
//! [`crate::config::GatewayConfig::deck_prompt`].

use crate::model::{DocumentSection, StyledPoint};
use crate::sources::{Source, SourceKind};

/// Headings of the five dossier sections, in order.
pub const DOSSIER_SECTIONS: [&str; 5] = [
    "Executive Summary",
    "Legal Timeline & Procedural Milestones",
    "The Legal Struggle: Process & Dialogue",
    "PM Strategy & Design Constraints",
    "DPO Technical Deep Dive",
];

/// Keywords that open the narrative points of a strategic-summary slide.
pub const SUMMARY_KEYWORDS: [&str; 3] = [
    "What happened?",
    "Why did it happen?",
    "How do we avoid this?",
];

pub const VALIDATION_PROMPT: &str = r#"You screen material for a legal case analysis tool.
Decide whether the material below relates to a legal or regulatory case decision: a court judgment, a data protection authority decision, an enforcement notice, a fine, or reporting about one.

Respond with JSON only, no fences, exactly this shape:
{"related": true|false, "reason": "<one sentence>"}"#;

pub const EXTRACTION_PROMPT: &str = r#"You receive raw text taken from a web page or document about a legal case.
Return the case content verbatim as clean plain text.

Rules:
- Do NOT summarise, paraphrase, or reorder.
- Remove navigation, cookie banners, menus, footers, and advertising.
- Keep headings, numbered paragraphs, dates, amounts, and article references exactly.
- Output ONLY the cleaned text, no commentary."#;

pub const PAGE_TRANSCRIPTION_PROMPT: &str = r#"You transcribe one page of a legal decision from an image.

Rules:
- Preserve ALL text in reading order, verbatim.
- Keep paragraph numbers, footnote markers, dates, and amounts exactly.
- Render tables as GFM pipe tables.
- Ignore page numbers, running headers, and redaction bars.
- Output ONLY the page text. Do NOT wrap it in fences or add commentary."#;

pub const DOCUMENT_PROMPT: &str = r#"You are a senior privacy counsel writing an internal case dossier for product managers and data protection officers.

Produce exactly five sections, in this order:
1. Executive Summary: what happened, the decision, the sanction.
2. Legal Timeline & Procedural Milestones: dated events as a table or list.
3. The Legal Struggle: Process & Dialogue: the organisation's defence against the authority's findings.
4. PM Strategy & Design Constraints: concrete product constraints that prevent a repeat.
5. DPO Technical Deep Dive: legal bases, articles breached, technical and organisational measures.

Write bodies in Markdown: short paragraphs, "- " bullet lists, **bold** for key figures, dates, and articles.

Respond with JSON only, no fences:
{"sections": [{"title": "1. ...", "body": "..."}]}"#;

pub const DECK_PROMPT: &str = r##"You are a world-class strategic presentation designer.
Your goal: synthesise the case dossier into a polished, narrative-driven deck for stakeholders.

STRICT CONTENT RULES:
1. NO BLANK POINTS: never emit empty or whitespace-only points, and no "\n" inside a point.
2. SELECTIVE HIGHLIGHTING: set "bold" and "color" (hex) ONLY on critical keywords, dates, or figures.
3. CONCISENESS: at most 40-50 words per slide; the layout uses 1.5 line spacing.
4. NARRATIVE: what happened, why it happened, and strategic mitigation.

SLIDE SEQUENCE (8 to 12 slides):
1. "title": companyName vs authorityName; give companyLogoUrl/authorityLogoUrl only if you know a PNG or JPG URL.
2. "toc": table of contents.
3. "strategic_summary": three points starting with "What happened?", "Why did it happen?", "How do we avoid this?", plus authorityOpinions.
4. "content": analysis slides with selective highlighting.
5. "dpo_technical" and "pm_takeaway": technical compliance and product takeaways.

Respond with JSON only, no fences:
{"presentationTitle": "...", "subtitle": "...", "slides": [{"title": "...", "type": "title|toc|strategic_summary|content|dpo_technical|pm_takeaway", "points": [{"text": "...", "bold": false, "color": "#RRGGBB", "fontSize": 18, "isHeading": false}], "companyName": "...", "authorityName": "...", "companyLogoUrl": "...", "authorityLogoUrl": "...", "authorityOpinions": ["..."]}]}"##;

/// Truncate `s` to at most `max` characters on a char boundary.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// User message for validation: URLs, file names, and an excerpt of each
/// text payload. Binary payloads are described, not sent.
pub fn validation_request(sources: &[Source], excerpt_chars: usize) -> String {
    let mut out = String::from("Material submitted for analysis:\n");
    for (i, s) in sources.iter().enumerate() {
        out.push_str(&format!("\n[{}] ", i + 1));
        match s.kind {
            SourceKind::Url => out.push_str(&format!("URL: {}\n", s.payload)),
            SourceKind::File if s.is_binary() => {
                let mime = s
                    .payload
                    .strip_prefix("data:")
                    .and_then(|rest| rest.split(';').next())
                    .unwrap_or("application/octet-stream");
                out.push_str(&format!("File: {} ({})\n", s.display_name, mime));
            }
            SourceKind::File => {
                out.push_str(&format!("File: {}\n", s.display_name));
                out.push_str(truncate_chars(&s.payload, excerpt_chars));
                out.push('\n');
            }
        }
    }
    out
}

/// User message for document analysis.
pub fn document_request(text: &str, max_chars: usize) -> String {
    format!(
        "Analyse this case material and write the dossier.\n\n\"\"\"\n{}\n\"\"\"",
        truncate_chars(text, max_chars)
    )
}

/// User message for deck generation. The dossier is serialised back to
/// Markdown headings so the model sees the same structure a reader would.
pub fn deck_request(sections: &[DocumentSection], max_chars: usize) -> String {
    let dossier: String = sections
        .iter()
        .map(|s| format!("# {}\n{}\n\n", s.title, s.body))
        .collect();
    format!(
        "Build the deck from this dossier.\n\n\"\"\"\n{}\n\"\"\"",
        truncate_chars(dossier.trim_end(), max_chars)
    )
}

/// Prompt for a text-free illustration of one slide.
pub fn image_prompt(title: &str, points: &[StyledPoint]) -> String {
    let context: Vec<&str> = points
        .iter()
        .map(|p| p.text.trim())
        .filter(|t| !t.is_empty())
        .collect();
    format!(
        "A professional strategic diagram or technical flowchart for the topic: {}. \
         Content context: {}. \
         Style: minimalist high-end corporate vector illustration, professional palette, \
         clear logic flow, 16:9, NO TEXT.",
        title.trim(),
        context.join(". ")
    )
}

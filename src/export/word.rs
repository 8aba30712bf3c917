//! Word-compatible dossier export.
//!
//! Word opens HTML that declares the Office namespaces and is served as
//! `application/msword`, so the dossier is written as a single HTML file
//! with a `.doc` extension and a UTF-8 byte-order mark.

use super::{file_stem, write_output};
use crate::error::ExportError;
use crate::model::DocumentSection;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

pub const WORD_MIME: &str = "application/msword";

const HEADER: &str = r#"<html xmlns:o='urn:schemas-microsoft-com:office:office' xmlns:w='urn:schemas-microsoft-com:office:word' xmlns='http://www.w3.org/TR/REC-html40'>
<head><meta charset='utf-8'><title>Export</title>
<style>
  body { font-family: 'Arial', sans-serif; line-height: 1.5; padding: 1in; }
  h1 { font-size: 16pt; font-weight: bold; margin-top: 20pt; color: #1E293B; border-bottom: 1px solid #E2E8F0; padding-bottom: 5pt; }
  p { font-size: 11pt; margin-bottom: 12pt; text-align: justify; line-height: 1.5; }
  ul { margin-bottom: 12pt; }
  li { margin-bottom: 6pt; list-style-type: disc; margin-left: 20pt; }
</style>
</head><body>
"#;
const FOOTER: &str = "</body></html>";

/// How one body line is rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Paragraph(String),
    /// List item with its marker removed.
    ListItem(String),
}

static RE_NUMBERED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.").unwrap());
static RE_NUMBER_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.(\s+|$)").unwrap());
static RE_BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.+?)\*\*").unwrap());

/// Classify one line. Blank lines yield `None`.
///
/// Lines starting with `-`, `*`, or `N.` are list items. A leading `**`
/// still counts, but the text is kept whole so the bold span survives, and
/// `N.` is only stripped when whitespace follows it (`2.5 million` stays).
pub fn classify_line(line: &str) -> Option<Block> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.starts_with("**") {
        return Some(Block::ListItem(trimmed.to_string()));
    }
    if trimmed.starts_with('-') || trimmed.starts_with('*') {
        return Some(Block::ListItem(trimmed[1..].trim().to_string()));
    }
    if RE_NUMBERED.is_match(trimmed) {
        let text = RE_NUMBER_MARKER.replace(trimmed, "");
        return Some(Block::ListItem(text.trim().to_string()));
    }
    Some(Block::Paragraph(trimmed.to_string()))
}

/// Classify every line of a section body.
pub fn classify_body(body: &str) -> Vec<Block> {
    body.lines().filter_map(classify_line).collect()
}

/// Escape text for HTML and turn `**bold**` spans into `<strong>`.
fn inline(text: &str) -> String {
    let escaped = html_escape::encode_text(text);
    RE_BOLD
        .replace_all(&escaped, "<strong>$1</strong>")
        .into_owned()
}

/// Render the dossier as Word-flavoured HTML (without the byte-order mark).
pub fn render_word_html(sections: &[DocumentSection]) -> String {
    let mut out = String::from(HEADER);
    for section in sections {
        out.push_str("<h1>");
        out.push_str(&html_escape::encode_text(section.title.trim()));
        out.push_str("</h1>\n");

        let mut in_list = false;
        for block in classify_body(&section.body) {
            match block {
                Block::ListItem(text) => {
                    if !in_list {
                        out.push_str("<ul>\n");
                        in_list = true;
                    }
                    out.push_str(&format!("<li>{}</li>\n", inline(&text)));
                }
                Block::Paragraph(text) => {
                    if in_list {
                        out.push_str("</ul>\n");
                        in_list = false;
                    }
                    out.push_str(&format!("<p>{}</p>\n", inline(&text)));
                }
            }
        }
        if in_list {
            out.push_str("</ul>\n");
        }
    }
    out.push_str(FOOTER);
    out
}

/// The complete file contents: UTF-8 BOM followed by the HTML.
pub fn render_word_document(sections: &[DocumentSection]) -> Vec<u8> {
    let html = render_word_html(sections);
    let mut bytes = Vec::with_capacity(html.len() + 3);
    bytes.extend_from_slice("\u{FEFF}".as_bytes());
    bytes.extend_from_slice(html.as_bytes());
    bytes
}

/// Write the dossier to `dir/<stem>.doc` and return the path.
pub fn export_word(
    sections: &[DocumentSection],
    title: &str,
    dir: &Path,
) -> Result<PathBuf, ExportError> {
    if sections.is_empty() {
        return Err(ExportError::Empty("the dossier has no sections"));
    }
    let file_name = format!("{}.doc", file_stem(title));
    write_output(dir, &file_name, &render_word_document(sections))
}

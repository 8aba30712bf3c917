//! Local exporters: the dossier as a Word-compatible document and the deck
//! as a PowerPoint package.
//!
//! Exporters only read pipeline artifacts. A failed export leaves the
//! sections and the deck untouched so the caller can retry.

pub mod layout;
pub mod pptx;
pub mod word;

pub use pptx::{export_deck, render_pptx, PPTX_MIME};
pub use word::{export_word, render_word_document, render_word_html, WORD_MIME};

use crate::error::ExportError;
use std::path::{Path, PathBuf};

/// Stem used when a title has no usable characters.
pub const FALLBACK_STEM: &str = "case_analysis";

/// File-name stem for a user-facing title: every non-alphanumeric character
/// becomes `_` and the result is lowercased.
pub fn file_stem(title: &str) -> String {
    let stem: String = title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    if stem.trim_matches('_').is_empty() {
        FALLBACK_STEM.to_string()
    } else {
        stem
    }
}

/// Write `bytes` to `dir/file_name`, creating `dir` if needed.
pub(crate) fn write_output(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf, ExportError> {
    let path = dir.join(file_name);
    std::fs::create_dir_all(dir).map_err(|source| ExportError::WriteFailed {
        path: dir.to_path_buf(),
        source,
    })?;
    std::fs::write(&path, bytes).map_err(|source| ExportError::WriteFailed {
        path: path.clone(),
        source,
    })?;
    tracing::info!("Wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(path)
}

//! Pipeline stages and the transition table between them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a [`super::Pipeline`] currently is.
///
/// Forward transitions follow the analysis order. Any stage may move to
/// [`Stage::Error`], and any stage may return to [`Stage::Idle`] via reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    #[default]
    Idle,
    Validating,
    /// The gateway judged the sources unrelated to a case decision.
    ValidationFailed,
    ExtractingText,
    TextReady,
    AnalyzingDocument,
    DocumentReady,
    GeneratingDeck,
    DeckReady,
    Error,
}

impl Stage {
    /// Returns true if moving from `self` to `target` is allowed.
    pub fn can_transition_to(&self, target: &Stage) -> bool {
        use Stage::*;
        if *target == Idle || *target == Error {
            return true;
        }
        matches!(
            (self, target),
            (Idle, Validating)
                | (Validating, ValidationFailed)
                | (Validating, ExtractingText)
                | (ExtractingText, TextReady)
                | (TextReady, AnalyzingDocument)
                | (AnalyzingDocument, DocumentReady)
                | (DocumentReady, GeneratingDeck)
                | (GeneratingDeck, DeckReady)
        )
    }

    /// `true` while a gateway call for this stage is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            Stage::Validating
                | Stage::ExtractingText
                | Stage::AnalyzingDocument
                | Stage::GeneratingDeck
        )
    }

    /// `true` for stages that only allow a reset.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::ValidationFailed | Stage::Error)
    }

    /// `true` once document sections exist and may be edited.
    pub fn has_document(&self) -> bool {
        matches!(
            self,
            Stage::DocumentReady | Stage::GeneratingDeck | Stage::DeckReady
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Idle => "IDLE",
            Stage::Validating => "VALIDATING",
            Stage::ValidationFailed => "VALIDATION_FAILED",
            Stage::ExtractingText => "EXTRACTING_TEXT",
            Stage::TextReady => "TEXT_READY",
            Stage::AnalyzingDocument => "ANALYZING_DOCUMENT",
            Stage::DocumentReady => "DOCUMENT_READY",
            Stage::GeneratingDeck => "GENERATING_DECK",
            Stage::DeckReady => "DECK_READY",
            Stage::Error => "ERROR",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

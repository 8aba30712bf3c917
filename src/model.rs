//! In-memory artifacts produced by the pipeline: the dossier sections and
//! the slide deck.
//!
//! Field names serialise in camelCase so the same types double as the
//! gateway's JSON schema and as the on-disk JSON format.

use serde::{Deserialize, Serialize};

/// Upper clamp for a slide's base title size.
pub const MAX_TITLE_FONT_SIZE: f64 = 32.0;
/// Upper clamp for a slide's base body size.
pub const MAX_BODY_FONT_SIZE: f64 = 20.0;
/// Lower clamp for a slide's base title size.
pub const MIN_TITLE_FONT_SIZE: f64 = 24.0;
/// Lower clamp for a slide's base body size.
pub const MIN_BODY_FONT_SIZE: f64 = 14.0;

/// One titled section of the dossier. `body` is markdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSection {
    pub title: String,
    #[serde(alias = "content")]
    pub body: String,
}

impl DocumentSection {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

/// Role of a slide in the deck narrative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlideKind {
    Title,
    Toc,
    StrategicSummary,
    Content,
    DpoTechnical,
    PmTakeaway,
}

/// One bullet or paragraph of slide content.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyledPoint {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    /// Hex colour such as `#DC2626`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_heading: Option<bool>,
}

impl StyledPoint {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn is_heading(&self) -> bool {
        self.is_heading.unwrap_or(false)
    }

    pub fn is_bold(&self) -> bool {
        self.bold.unwrap_or(false)
    }
}

/// Placement and sizing parameters of a slide.
///
/// Positions are percentages of the canvas (0–100). Font sizes are points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideStyle {
    pub background_color: String,
    pub text_color: String,
    pub accent_color: String,
    pub title_font_size: f64,
    pub body_font_size: f64,
    pub title_x_pos: f64,
    pub title_y_pos: f64,
    pub body_x_pos: f64,
    pub body_y_pos: f64,
    pub image_x_pos: f64,
    pub image_y_pos: f64,
    pub image_scale: f64,
    pub line_spacing: f64,
}

impl Default for SlideStyle {
    fn default() -> Self {
        Self {
            background_color: "#FFFFFF".into(),
            text_color: "#1E293B".into(),
            accent_color: "#4F46E5".into(),
            title_font_size: 32.0,
            body_font_size: 18.0,
            title_x_pos: 5.0,
            title_y_pos: 10.0,
            body_x_pos: 5.0,
            body_y_pos: 25.0,
            image_x_pos: 65.0,
            image_y_pos: 25.0,
            image_scale: 1.0,
            line_spacing: 1.5,
        }
    }
}

impl SlideStyle {
    /// Merge `patch` into this style and re-apply every clamp.
    pub fn apply(&mut self, patch: &SlideStylePatch) {
        macro_rules! merge {
            ($($field:ident),*) => {
                $(if let Some(v) = &patch.$field {
                    self.$field = v.clone();
                })*
            };
        }
        merge!(
            background_color,
            text_color,
            accent_color,
            title_font_size,
            body_font_size,
            title_x_pos,
            title_y_pos,
            body_x_pos,
            body_y_pos,
            image_x_pos,
            image_y_pos,
            image_scale,
            line_spacing
        );
        self.clamp();
    }

    /// Enforce the style invariants in place.
    ///
    /// Font sizes are held to `[24, 32]` (title) and `[14, 20]` (body),
    /// positions to `[0, 100]`, scale and spacing to small positive ranges.
    /// Non-finite values fall back to the defaults.
    pub fn clamp(&mut self) {
        let d = SlideStyle::default();
        let finite = |v: f64, fallback: f64| if v.is_finite() { v } else { fallback };

        self.title_font_size = finite(self.title_font_size, d.title_font_size)
            .clamp(MIN_TITLE_FONT_SIZE, MAX_TITLE_FONT_SIZE);
        self.body_font_size = finite(self.body_font_size, d.body_font_size)
            .clamp(MIN_BODY_FONT_SIZE, MAX_BODY_FONT_SIZE);

        for (pos, fallback) in [
            (&mut self.title_x_pos, d.title_x_pos),
            (&mut self.title_y_pos, d.title_y_pos),
            (&mut self.body_x_pos, d.body_x_pos),
            (&mut self.body_y_pos, d.body_y_pos),
            (&mut self.image_x_pos, d.image_x_pos),
            (&mut self.image_y_pos, d.image_y_pos),
        ] {
            *pos = finite(*pos, fallback).clamp(0.0, 100.0);
        }

        self.image_scale = finite(self.image_scale, d.image_scale).clamp(0.1, 3.0);
        self.line_spacing = finite(self.line_spacing, d.line_spacing).clamp(0.5, 3.0);
    }
}

/// Partial style update. Unset fields leave the current value alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SlideStylePatch {
    pub background_color: Option<String>,
    pub text_color: Option<String>,
    pub accent_color: Option<String>,
    pub title_font_size: Option<f64>,
    pub body_font_size: Option<f64>,
    pub title_x_pos: Option<f64>,
    pub title_y_pos: Option<f64>,
    pub body_x_pos: Option<f64>,
    pub body_y_pos: Option<f64>,
    pub image_x_pos: Option<f64>,
    pub image_y_pos: Option<f64>,
    pub image_scale: Option<f64>,
    pub line_spacing: Option<f64>,
}

/// A finished slide owned by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slide {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: SlideKind,
    pub points: Vec<StyledPoint>,
    pub style: SlideStyle,
    /// Image reference: a `data:` URI or an http(s) URL.
    #[serde(default, rename = "imageUrl", skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub image_loading: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authority_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_logo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authority_logo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authority_opinions: Vec<String>,
}

impl Slide {
    /// Finalise a gateway draft: assign `id`, a fresh default style, and
    /// drop points and opinions that are blank after trimming.
    pub fn from_draft(draft: SlideDraft, id: String) -> Self {
        let non_blank = |s: &Option<String>| s.as_ref().filter(|v| !v.trim().is_empty()).cloned();
        Self {
            id,
            title: draft.title,
            kind: draft.kind,
            points: draft.points.into_iter().filter(|p| !p.is_blank()).collect(),
            style: SlideStyle::default(),
            image: None,
            image_loading: false,
            company_name: non_blank(&draft.company_name),
            authority_name: non_blank(&draft.authority_name),
            company_logo_url: non_blank(&draft.company_logo_url),
            authority_logo_url: non_blank(&draft.authority_logo_url),
            authority_opinions: draft
                .authority_opinions
                .into_iter()
                .filter(|o| !o.trim().is_empty())
                .collect(),
        }
    }
}

/// The generated presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deck {
    pub presentation_title: String,
    pub subtitle: String,
    pub slides: Vec<Slide>,
}

/// Slide as returned by the gateway, before ids and styles are assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideDraft {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: SlideKind,
    pub points: Vec<StyledPoint>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub authority_name: Option<String>,
    #[serde(default)]
    pub company_logo_url: Option<String>,
    #[serde(default)]
    pub authority_logo_url: Option<String>,
    #[serde(default)]
    pub authority_opinions: Vec<String>,
}

impl SlideDraft {
    pub fn new(kind: SlideKind, title: impl Into<String>, points: Vec<StyledPoint>) -> Self {
        Self {
            title: title.into(),
            kind,
            points,
            company_name: None,
            authority_name: None,
            company_logo_url: None,
            authority_logo_url: None,
            authority_opinions: Vec::new(),
        }
    }
}

/// Deck as returned by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckDraft {
    pub presentation_title: String,
    pub subtitle: String,
    pub slides: Vec<SlideDraft>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_style_matches_designer_defaults() {
        let s = SlideStyle::default();
        assert_eq!(s.title_font_size, 32.0);
        assert_eq!(s.body_font_size, 18.0);
        assert_eq!(s.image_x_pos, 65.0);
        assert_eq!(s.line_spacing, 1.5);
    }

    #[test]
    fn apply_clamps_font_sizes() {
        let mut s = SlideStyle::default();
        s.apply(&SlideStylePatch {
            title_font_size: Some(48.0),
            body_font_size: Some(26.0),
            ..Default::default()
        });
        assert_eq!(s.title_font_size, 32.0);
        assert_eq!(s.body_font_size, 20.0);
    }

    #[test]
    fn apply_only_touches_set_fields() {
        let mut s = SlideStyle::default();
        s.apply(&SlideStylePatch {
            accent_color: Some("#DC2626".into()),
            image_x_pos: Some(120.0),
            ..Default::default()
        });
        assert_eq!(s.accent_color, "#DC2626");
        assert_eq!(s.image_x_pos, 100.0);
        assert_eq!(s.text_color, SlideStyle::default().text_color);
    }

    #[test]
    fn non_finite_values_fall_back_to_defaults() {
        let mut s = SlideStyle::default();
        s.apply(&SlideStylePatch {
            body_y_pos: Some(f64::NAN),
            ..Default::default()
        });
        assert_eq!(s.body_y_pos, 25.0);
    }

    #[test]
    fn from_draft_filters_blank_points() {
        let draft = SlideDraft::new(
            SlideKind::Content,
            "Violations",
            vec![
                StyledPoint::plain("Art. 5(1)(c)"),
                StyledPoint::plain("   "),
                StyledPoint::plain(""),
                StyledPoint::plain("Art. 25"),
            ],
        );
        let slide = Slide::from_draft(draft, "slide-1".into());
        assert_eq!(slide.points.len(), 2);
        assert_eq!(slide.style, SlideStyle::default());
        assert!(!slide.image_loading);
    }

    #[test]
    fn slide_draft_parses_gateway_schema() {
        let json = r##"{
            "title": "Meta vs DPC",
            "type": "title",
            "points": [{"text": "€405M fine", "bold": true, "color": "#DC2626"}],
            "companyName": "Meta",
            "authorityName": "Irish DPC"
        }"##;
        let draft: SlideDraft = serde_json::from_str(json).unwrap();
        assert_eq!(draft.kind, SlideKind::Title);
        assert_eq!(draft.points[0].bold, Some(true));
        assert_eq!(draft.company_name.as_deref(), Some("Meta"));
    }

    #[test]
    fn unknown_slide_kind_is_rejected() {
        let json = r#"{"title": "x", "type": "appendix", "points": []}"#;
        assert!(serde_json::from_str::<SlideDraft>(json).is_err());
    }

    #[test]
    fn section_accepts_content_alias() {
        let s: DocumentSection =
            serde_json::from_str(r#"{"title": "1. Summary", "content": "text"}"#).unwrap();
        assert_eq!(s.body, "text");
    }
}

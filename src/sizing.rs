//! Slide font sizing from content volume.
//!
//! [`compute_render_sizes`] is the only place font sizes are derived. The
//! preview path (library callers rendering a [`Slide`]) and the PPTX
//! exporter both call it, so the exported deck matches what was previewed.

use crate::model::{
    Slide, SlideKind, MAX_BODY_FONT_SIZE, MAX_TITLE_FONT_SIZE, MIN_BODY_FONT_SIZE,
    MIN_TITLE_FONT_SIZE,
};
use serde::{Deserialize, Serialize};

/// Strategic-summary slides never exceed these sizes.
const SUMMARY_MAX_TITLE: f64 = 28.0;
const SUMMARY_MAX_BODY: f64 = 18.0;

/// Heavy slides: more than this many characters or points.
const HEAVY_CHARS: usize = 600;
const HEAVY_POINTS: usize = 7;
/// Dense slides: more than this many characters or points.
const DENSE_CHARS: usize = 400;
const DENSE_POINTS: usize = 5;

/// Font sizes (points) a slide should be rendered with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderSizes {
    pub title_size: f64,
    pub body_size: f64,
}

/// Compute the title and body font sizes for `slide`.
///
/// Base sizes come from the slide style, held within 24–32 / 14–20 even for
/// slides built or deserialized without going through
/// [`SlideStyle::apply`](crate::model::SlideStyle::apply). Strategic
/// summaries are capped further at 28/18 and never shrink with volume.
/// Other slides shrink when their trimmed text exceeds 400/600 characters
/// or they carry more than 5/7 points.
pub fn compute_render_sizes(slide: &Slide) -> RenderSizes {
    let mut title_size = slide
        .style
        .title_font_size
        .clamp(MIN_TITLE_FONT_SIZE, MAX_TITLE_FONT_SIZE);
    let mut body_size = slide
        .style
        .body_font_size
        .clamp(MIN_BODY_FONT_SIZE, MAX_BODY_FONT_SIZE);

    if slide.kind == SlideKind::StrategicSummary {
        return RenderSizes {
            title_size: title_size.min(SUMMARY_MAX_TITLE),
            body_size: body_size.min(SUMMARY_MAX_BODY),
        };
    }

    let total_chars: usize = slide
        .points
        .iter()
        .map(|p| p.text.trim().chars().count())
        .sum();
    let point_count = slide.points.len();

    if total_chars > HEAVY_CHARS || point_count > HEAVY_POINTS {
        body_size = (body_size * 0.85).max(MIN_BODY_FONT_SIZE);
        title_size = (title_size * 0.9).max(MIN_TITLE_FONT_SIZE);
    } else if total_chars > DENSE_CHARS || point_count > DENSE_POINTS {
        body_size = (body_size * 0.9).max(16.0);
    }

    RenderSizes {
        title_size,
        body_size,
    }
}

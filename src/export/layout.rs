//! Slide layout: where every text box, panel, and picture of a slide goes.
//!
//! Layout works in inches on the 13.33 × 7.5 wide canvas and knows nothing
//! about the package format. Style positions are percentages of the canvas;
//! font sizes come from [`compute_render_sizes`], the same function the
//! preview uses.

use crate::model::{Slide, SlideKind, StyledPoint};
use crate::prompts::SUMMARY_KEYWORDS;
use crate::sizing::compute_render_sizes;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{ImageFormat, ImageReader};
use std::io::Cursor;
use tracing::warn;

pub const CANVAS_WIDTH: f64 = 13.33;
pub const CANVAS_HEIGHT: f64 = 7.5;

pub const FOOTER_TEXT: &str = "CaseLens Pro | AI Strategic Synthesis";

const FOOTER_COLOR: &str = "94A3B8";
const KEYWORD_COLOR: &str = "2563EB";
const PANEL_FILL: &str = "EFF6FF";
const PANEL_LINE: &str = "DBEAFE";
const PANEL_TITLE_COLOR: &str = "1E40AF";
const OPINION_COLOR: &str = "1E3A8A";

/// A rectangle in inches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Frame {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// The largest frame with the given aspect ratio that fits inside
    /// `self`, centred.
    pub fn contain(&self, width_px: u32, height_px: u32) -> Frame {
        if width_px == 0 || height_px == 0 {
            return *self;
        }
        let aspect = width_px as f64 / height_px as f64;
        let (w, h) = if self.w / self.h > aspect {
            (self.h * aspect, self.h)
        } else {
            (self.w, self.w / aspect)
        };
        Frame::new(self.x + (self.w - w) / 2.0, self.y + (self.h - h) / 2.0, w, h)
    }
}

/// A run of uniformly formatted text.
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    /// `RRGGBB`, no leading `#`.
    pub color: String,
    /// Points.
    pub size: f64,
}

impl Run {
    fn new(text: impl Into<String>, color: &str, size: f64) -> Self {
        Self {
            text: text.into(),
            bold: false,
            italic: false,
            color: color.to_string(),
            size,
        }
    }

    fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    fn italic(mut self) -> Self {
        self.italic = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Paragraph {
    pub runs: Vec<Run>,
    pub bullet: bool,
    /// Line spacing multiple; `None` is single spacing.
    pub line_spacing: Option<f64>,
}

impl Paragraph {
    fn plain(runs: Vec<Run>) -> Self {
        Self {
            runs,
            bullet: false,
            line_spacing: None,
        }
    }
}

/// Raster data a picture element can be built from.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    /// Decoded and verified image bytes.
    Embedded {
        format: ImageFormat,
        bytes: Vec<u8>,
        width: u32,
        height: u32,
    },
    /// An http(s) URL linked from the package.
    External(String),
}

impl ImageSource {
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            ImageSource::Embedded { format, .. } => match format {
                ImageFormat::Png => Some("png"),
                ImageFormat::Jpeg => Some("jpeg"),
                ImageFormat::Gif => Some("gif"),
                _ => None,
            },
            ImageSource::External(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Text {
        frame: Frame,
        paragraphs: Vec<Paragraph>,
    },
    Panel {
        frame: Frame,
        fill: String,
        line: String,
    },
    Picture {
        frame: Frame,
        source: ImageSource,
        name: String,
    },
}

/// Everything needed to draw one slide.
#[derive(Debug, Clone, PartialEq)]
pub struct SlideLayout {
    /// `RRGGBB`.
    pub background: String,
    pub elements: Vec<Element>,
}

/// Normalise `#rrggbb` / `rrggbb` to `RRGGBB`, or use `fallback`.
pub fn hex_color(value: &str, fallback: &str) -> String {
    let v = value.trim().trim_start_matches('#');
    if v.len() == 6 && v.chars().all(|c| c.is_ascii_hexdigit()) {
        v.to_ascii_uppercase()
    } else {
        fallback.to_string()
    }
}

/// Resolve an image reference to raster data the package can carry.
///
/// `data:image/png|jpeg|gif;base64,` URIs are decoded and must really be
/// that format. http(s) URLs are linked unless they point at an SVG.
/// Anything else yields `None` and the picture is left out.
pub fn resolve_image(reference: &str) -> Option<ImageSource> {
    let reference = reference.trim();
    if let Some(rest) = reference.strip_prefix("data:") {
        let (header, payload) = rest.split_once(',')?;
        let declared = match header.strip_suffix(";base64")?.to_ascii_lowercase().as_str() {
            "image/png" => ImageFormat::Png,
            "image/jpeg" | "image/jpg" => ImageFormat::Jpeg,
            "image/gif" => ImageFormat::Gif,
            _ => return None,
        };
        let bytes = STANDARD.decode(payload.trim()).ok()?;
        let reader = ImageReader::new(Cursor::new(&bytes)).with_guessed_format().ok()?;
        if reader.format() != Some(declared) {
            warn!("Image data does not match its declared type; skipping");
            return None;
        }
        let (width, height) = reader.into_dimensions().ok()?;
        return Some(ImageSource::Embedded {
            format: declared,
            bytes,
            width,
            height,
        });
    }
    if (reference.starts_with("http://") || reference.starts_with("https://"))
        && !reference.to_ascii_lowercase().contains(".svg")
    {
        return Some(ImageSource::External(reference.to_string()));
    }
    None
}

fn pct_x(p: f64) -> f64 {
    p / 100.0 * CANVAS_WIDTH
}

fn pct_y(p: f64) -> f64 {
    p / 100.0 * CANVAS_HEIGHT
}

fn picture(frame: Frame, source: ImageSource, name: &str) -> Element {
    let frame = match &source {
        ImageSource::Embedded { width, height, .. } => frame.contain(*width, *height),
        ImageSource::External(_) => frame,
    };
    Element::Picture {
        frame,
        source,
        name: name.to_string(),
    }
}

/// Lay out one slide. `subtitle` is the deck subtitle shown on title slides.
pub fn layout_slide(slide: &Slide, subtitle: &str) -> SlideLayout {
    let sizes = compute_render_sizes(slide);
    let style = &slide.style;
    let text_color = hex_color(&style.text_color, "1E293B");
    let accent = hex_color(&style.accent_color, "4F46E5");
    let title_x = pct_x(style.title_x_pos);
    let title_y = pct_y(style.title_y_pos);

    let mut elements = Vec::new();
    match slide.kind {
        SlideKind::Title => {
            let logo_y = pct_y(style.title_y_pos - 12.0).max(0.0);
            let logos = [
                (slide.company_logo_url.as_deref(), title_x, "Company logo"),
                (
                    slide.authority_logo_url.as_deref(),
                    pct_x(style.title_x_pos + 22.0),
                    "Authority logo",
                ),
            ];
            for (url, x, name) in logos {
                if let Some(source) = url.and_then(resolve_image) {
                    elements.push(picture(Frame::new(x, logo_y, 1.0, 1.0), source, name));
                }
            }

            let size = sizes.title_size + 10.0;
            let company = slide.company_name.as_deref().unwrap_or("Organization");
            let authority = slide.authority_name.as_deref().unwrap_or("Regulator");
            elements.push(Element::Text {
                frame: Frame::new(title_x, title_y, 12.0, 1.4),
                paragraphs: vec![Paragraph::plain(vec![
                    Run::new(company, &text_color, size).bold(),
                    Run::new(" vs ", &accent, size).italic(),
                    Run::new(authority, &text_color, size).bold(),
                ])],
            });
            elements.push(Element::Text {
                frame: Frame::new(title_x, pct_y(style.title_y_pos + 18.0), 10.0, 0.8),
                paragraphs: vec![Paragraph::plain(vec![Run::new(subtitle, &accent, 24.0)])],
            });
        }
        SlideKind::StrategicSummary => {
            elements.push(title_box(slide, title_x, title_y, &text_color, sizes.title_size));

            let mut narrative = Vec::new();
            for point in &slide.points {
                let text = point.text.trim();
                match SUMMARY_KEYWORDS.iter().find(|k| text.starts_with(**k)) {
                    Some(keyword) => {
                        narrative.push(Paragraph {
                            runs: vec![Run::new(*keyword, KEYWORD_COLOR, sizes.body_size + 4.0).bold()],
                            bullet: false,
                            line_spacing: Some(style.line_spacing),
                        });
                        narrative.push(Paragraph {
                            runs: vec![Run::new(
                                text[keyword.len()..].trim(),
                                &text_color,
                                sizes.body_size,
                            )],
                            bullet: false,
                            line_spacing: Some(style.line_spacing),
                        });
                    }
                    None => narrative.push(Paragraph {
                        runs: vec![Run::new(text, &text_color, sizes.body_size)],
                        bullet: false,
                        line_spacing: Some(style.line_spacing),
                    }),
                }
            }
            elements.push(Element::Text {
                frame: Frame::new(0.5, 1.8, 7.0, 5.2),
                paragraphs: narrative,
            });

            elements.push(Element::Panel {
                frame: Frame::new(7.8, 1.4, 5.2, 5.7),
                fill: PANEL_FILL.into(),
                line: PANEL_LINE.into(),
            });
            elements.push(Element::Text {
                frame: Frame::new(8.0, 1.6, 4.8, 0.45),
                paragraphs: vec![Paragraph::plain(vec![
                    Run::new("AUTHORITY OPINIONS", PANEL_TITLE_COLOR, 16.0).bold(),
                ])],
            });
            let opinions = slide
                .authority_opinions
                .iter()
                .map(|o| Paragraph {
                    runs: vec![Run::new(o.trim(), OPINION_COLOR, sizes.body_size - 4.0)],
                    bullet: true,
                    line_spacing: Some(1.2),
                })
                .collect();
            elements.push(Element::Text {
                frame: Frame::new(8.0, 2.1, 4.8, 4.7),
                paragraphs: opinions,
            });
        }
        _ => {
            elements.push(title_box(slide, title_x, title_y, &text_color, sizes.title_size));

            let image = slide.image.as_deref().and_then(resolve_image);
            let body_x = pct_x(style.body_x_pos);
            let body_w = if image.is_some() {
                (pct_x(style.image_x_pos) - body_x - 0.5).max(1.0)
            } else {
                12.0
            };
            let paragraphs = slide
                .points
                .iter()
                .map(|p| point_paragraph(p, &text_color, sizes.body_size, style.line_spacing))
                .collect();
            elements.push(Element::Text {
                frame: Frame::new(body_x, pct_y(style.body_y_pos), body_w, 5.5),
                paragraphs,
            });

            if let Some(source) = image {
                let frame = Frame::new(
                    pct_x(style.image_x_pos),
                    pct_y(style.image_y_pos),
                    5.0 * style.image_scale,
                    4.0 * style.image_scale,
                );
                elements.push(picture(frame, source, "Slide visual"));
            }
        }
    }

    elements.push(Element::Text {
        frame: Frame::new(0.5, 7.1, 4.0, 0.3),
        paragraphs: vec![Paragraph::plain(vec![Run::new(FOOTER_TEXT, FOOTER_COLOR, 9.0)])],
    });

    SlideLayout {
        background: hex_color(&style.background_color, "FFFFFF"),
        elements,
    }
}

fn title_box(slide: &Slide, x: f64, y: f64, color: &str, size: f64) -> Element {
    Element::Text {
        frame: Frame::new(x, y, 12.0, 1.0),
        paragraphs: vec![Paragraph::plain(vec![Run::new(slide.title.trim(), color, size).bold()])],
    }
}

fn point_paragraph(point: &StyledPoint, text_color: &str, body_size: f64, spacing: f64) -> Paragraph {
    let heading = point.is_heading();
    let color = point
        .color
        .as_deref()
        .map(|c| hex_color(c, text_color))
        .unwrap_or_else(|| text_color.to_string());
    let size = point
        .font_size
        .filter(|s| s.is_finite() && *s > 0.0)
        .unwrap_or(if heading { body_size + 4.0 } else { body_size });
    let mut run = Run::new(point.text.trim(), &color, size);
    run.bold = point.is_bold() || heading;
    Paragraph {
        runs: vec![run],
        bullet: !heading,
        line_spacing: Some(spacing),
    }
}

//! PDF rasterisation for the vision transcription path.
//!
//! pdfium is not async-safe and rendering is CPU-bound, so all pdfium work
//! runs inside `tokio::task::spawn_blocking`. Pages render at `dpi`, with
//! both edges capped by `max_rendered_pixels`.

use crate::error::GatewayError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use tracing::{debug, info, warn};

/// Rendered pages of one PDF source.
#[derive(Debug)]
pub struct RenderedPdf {
    /// Total pages in the document, including the ones not rendered.
    pub total_pages: usize,
    /// The first `max_pages` pages, in order.
    pub pages: Vec<DynamicImage>,
}

impl RenderedPdf {
    pub fn truncated(&self) -> bool {
        self.pages.len() < self.total_pages
    }

    /// Marker appended to a transcription that stops before the last page.
    pub fn truncation_note(&self) -> Option<String> {
        self.truncated().then(|| {
            format!(
                "[Pages {} to {} were not transcribed.]",
                self.pages.len() + 1,
                self.total_pages
            )
        })
    }
}

/// Rasterise up to `max_pages` pages of an in-memory PDF.
pub async fn render_pdf(
    name: &str,
    bytes: Vec<u8>,
    max_pages: usize,
    dpi: u32,
    max_pixels: u32,
    password: Option<String>,
) -> Result<RenderedPdf, GatewayError> {
    let owned_name = name.to_string();
    tokio::task::spawn_blocking(move || {
        render_blocking(&owned_name, &bytes, max_pages, dpi, max_pixels, password.as_deref())
    })
    .await
    .map_err(|e| GatewayError::PdfRender {
        name: name.to_string(),
        detail: format!("render task panicked: {e}"),
    })?
}

fn render_blocking(
    name: &str,
    bytes: &[u8],
    max_pages: usize,
    dpi: u32,
    max_pixels: u32,
    password: Option<&str>,
) -> Result<RenderedPdf, GatewayError> {
    let failed = |detail: String| GatewayError::PdfRender {
        name: name.to_string(),
        detail,
    };

    let pdfium = Pdfium::default();
    let document = pdfium
        .load_pdf_from_byte_slice(bytes, password)
        .map_err(|e| {
            let detail = format!("{:?}", e);
            if detail.to_ascii_lowercase().contains("password") {
                failed(if password.is_some() {
                    "wrong password".to_string()
                } else {
                    "document is password-protected".to_string()
                })
            } else {
                failed(detail)
            }
        })?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    let wanted = total_pages.min(max_pages);
    info!("PDF '{}' loaded: {} pages, rendering {}", name, total_pages, wanted);
    if wanted < total_pages {
        warn!(
            "PDF '{}': only the first {} of {} pages will be transcribed",
            name, wanted, total_pages
        );
    }

    let mut rendered = Vec::with_capacity(wanted);
    for idx in 0..wanted {
        let page = pages
            .get(idx as u16)
            .map_err(|e| failed(format!("page {}: {:?}", idx + 1, e)))?;
        let render_config = PdfRenderConfig::new()
            .set_target_width(target_width(page.width().value, dpi, max_pixels))
            .set_maximum_height(max_pixels as i32);
        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| failed(format!("page {}: {:?}", idx + 1, e)))?;
        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            idx + 1,
            image.width(),
            image.height()
        );
        rendered.push(image);
    }

    Ok(RenderedPdf {
        total_pages,
        pages: rendered,
    })
}

/// Pixel width of a page `width_pts` points wide at `dpi`, capped at `max_pixels`.
fn target_width(width_pts: f32, dpi: u32, max_pixels: u32) -> i32 {
    let px = (width_pts / 72.0 * dpi as f32).round() as i32;
    px.clamp(1, max_pixels as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn width_follows_dpi_up_to_the_cap() {
        // A4 is 595 pt wide.
        assert_eq!(target_width(595.0, 72, 2000), 595);
        assert_eq!(target_width(595.0, 150, 2000), 1240);
        assert_eq!(target_width(595.0, 400, 2000), 2000);
    }

    #[test]
    fn truncated_reports_skipped_pages() {
        let page = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255])));
        let r = RenderedPdf {
            total_pages: 40,
            pages: vec![page.clone(); 30],
        };
        assert!(r.truncated());
        assert_eq!(
            r.truncation_note().as_deref(),
            Some("[Pages 31 to 40 were not transcribed.]")
        );
        let r = RenderedPdf {
            total_pages: 1,
            pages: vec![page],
        };
        assert!(!r.truncated());
        assert_eq!(r.truncation_note(), None);
    }
}

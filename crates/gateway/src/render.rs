use crate::config::RenderConfig;
use ab_glyph::{FontVec, PxScale};
use base64::{Engine, engine::general_purpose::STANDARD};
use image::{Rgb, RgbImage, codecs::jpeg::JpegEncoder};
use imageproc::{
    drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size},
    rect::Rect,
};
use inference::{ClassLabels, Detection};
use std::path::PathBuf;
use thiserror::Error;

const BOX_THICKNESS: i32 = 2;
const LABEL_SCALE: f32 = 16.0;
const LABEL_PADDING: i32 = 10;
const TEXT_COLOR: Rgb<u8> = Rgb([0, 0, 0]);

/// Searched in order when no font is configured.
const SYSTEM_FONT_PATHS: [&str; 5] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to read font {}: {source}", path.display())]
    FontRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not a usable TrueType font", .0.display())]
    InvalidFont(PathBuf),

    #[error("JPEG encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// Draws detections onto a copy of the input and encodes it for transport.
pub struct Renderer {
    font: Option<FontVec>,
    jpeg_quality: u8,
}

impl Renderer {
    pub fn new(config: &RenderConfig) -> Result<Self, RenderError> {
        let font = match &config.font_path {
            Some(path) => {
                let bytes = std::fs::read(path).map_err(|source| RenderError::FontRead {
                    path: path.clone(),
                    source,
                })?;
                let font = FontVec::try_from_vec(bytes)
                    .map_err(|_| RenderError::InvalidFont(path.clone()))?;
                tracing::info!(path = %path.display(), "Loaded label font");
                Some(font)
            }
            None => system_font(),
        };

        Ok(Self {
            font,
            jpeg_quality: config.jpeg_quality,
        })
    }

    /// Boxes and label bars, no label text.
    pub fn without_font(jpeg_quality: u8) -> Self {
        Self {
            font: None,
            jpeg_quality,
        }
    }

    pub fn annotate(
        &self,
        image: &RgbImage,
        detections: &[Detection],
        labels: &ClassLabels,
    ) -> RgbImage {
        let mut canvas = image.clone();
        for detection in detections {
            let color = Rgb(labels.color(detection.class_id));
            self.draw_detection(&mut canvas, detection, color);
        }
        canvas
    }

    fn draw_detection(&self, canvas: &mut RgbImage, detection: &Detection, color: Rgb<u8>) {
        let (width, height) = (canvas.width() as i32, canvas.height() as i32);
        let bbox = &detection.bbox;

        for inset in 0..BOX_THICKNESS {
            let Some(rect) = clipped_rect(
                bbox.x1.saturating_add(inset),
                bbox.y1.saturating_add(inset),
                bbox.x2.saturating_sub(inset),
                bbox.y2.saturating_sub(inset),
                width,
                height,
            ) else {
                continue;
            };
            draw_hollow_rect_mut(canvas, rect, color);
        }

        let label = format!("{}: {:.2}", detection.class_name, detection.confidence);
        let scale = PxScale::from(LABEL_SCALE);
        let (text_w, text_h) = self.label_size(scale, &label);
        let bar_top = bbox.y1.saturating_sub(text_h).saturating_sub(LABEL_PADDING);

        if let Some(bar) = clipped_rect(
            bbox.x1,
            bar_top,
            bbox.x1.saturating_add(text_w),
            bbox.y1,
            width,
            height,
        ) {
            draw_filled_rect_mut(canvas, bar, color);
        }

        if let Some(font) = &self.font {
            let text_x = bbox.x1.clamp(0, width - 1);
            let text_y = bar_top.saturating_add(LABEL_PADDING / 2).clamp(0, height - 1);
            draw_text_mut(canvas, TEXT_COLOR, text_x, text_y, scale, font, &label);
        }
    }

    /// Rendered label extent; estimated from the glyph scale without a font.
    fn label_size(&self, scale: PxScale, label: &str) -> (i32, i32) {
        match &self.font {
            Some(font) => {
                let (w, h) = text_size(scale, font, label);
                (w as i32, h as i32)
            }
            None => {
                let glyph_w = (LABEL_SCALE / 2.0) as i32;
                (glyph_w * label.chars().count() as i32, LABEL_SCALE as i32)
            }
        }
    }

    pub fn encode_jpeg(&self, image: &RgbImage) -> Result<Vec<u8>, RenderError> {
        let mut jpeg_bytes = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg_bytes, self.jpeg_quality).encode_image(image)?;
        Ok(jpeg_bytes)
    }

    /// Annotate, encode as JPEG, then base64 with the standard alphabet.
    pub fn render_base64(
        &self,
        image: &RgbImage,
        detections: &[Detection],
        labels: &ClassLabels,
    ) -> Result<String, RenderError> {
        let _span = common::span!("render");
        let annotated = self.annotate(image, detections, labels);
        let jpeg = self.encode_jpeg(&annotated)?;
        Ok(STANDARD.encode(jpeg))
    }
}

fn system_font() -> Option<FontVec> {
    for path in SYSTEM_FONT_PATHS {
        if let Ok(bytes) = std::fs::read(path)
            && let Ok(font) = FontVec::try_from_vec(bytes)
        {
            tracing::info!(path, "Loaded system label font");
            return Some(font);
        }
    }
    tracing::warn!("No label font configured or found, label text will be skipped");
    None
}

/// Clamp corners to the canvas; `None` when nothing is left to draw.
fn clipped_rect(x1: i32, y1: i32, x2: i32, y2: i32, width: i32, height: i32) -> Option<Rect> {
    if width <= 0 || height <= 0 {
        return None;
    }
    let (x1, x2) = (x1.clamp(0, width - 1), x2.clamp(0, width - 1));
    let (y1, y2) = (y1.clamp(0, height - 1), y2.clamp(0, height - 1));
    if x2 < x1 || y2 < y1 {
        return None;
    }
    Some(Rect::at(x1, y1).of_size((x2 - x1 + 1) as u32, (y2 - y1 + 1) as u32))
}

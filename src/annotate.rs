// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Drawing detections onto images.

#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]

use std::fs;
use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use image::{DynamicImage, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;

use crate::error::{DetectError, Result};
use crate::labels::ClassNames;
use crate::results::{Detection, Results};
use crate::visualizer::Color;

/// Fonts tried when no font is given explicitly.
const SYSTEM_FONTS: [&str; 4] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Draws boxes and `name score` labels.
pub struct Annotator {
    font: Option<FontVec>,
    thickness: i32,
    font_size: f32,
}

impl std::fmt::Debug for Annotator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Annotator")
            .field("has_font", &self.font.is_some())
            .field("thickness", &self.thickness)
            .field("font_size", &self.font_size)
            .finish()
    }
}

impl Default for Annotator {
    fn default() -> Self {
        Self {
            font: SYSTEM_FONTS.iter().find_map(|path| load_font(Path::new(path)).ok()),
            thickness: 2,
            font_size: 16.0,
        }
    }
}

impl Annotator {
    /// Annotator using the first system font found; labels are skipped if none is.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Annotator that renders labels with the given TTF/OTF font.
    ///
    /// # Errors
    ///
    /// Returns [`DetectError::VisualizerError`] if the font cannot be read or parsed.
    pub fn with_font_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            font: Some(load_font(path.as_ref())?),
            ..Self::without_font()
        })
    }

    /// Annotator that only draws boxes and label backgrounds.
    #[must_use]
    pub const fn without_font() -> Self {
        Self {
            font: None,
            thickness: 2,
            font_size: 16.0,
        }
    }

    /// Whether labels will include text.
    #[must_use]
    pub const fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Draw every detection of `results` on a copy of `image`.
    #[must_use]
    pub fn annotate(&self, image: &DynamicImage, results: &Results, names: &ClassNames) -> RgbImage {
        let mut img = image.to_rgb8();
        for det in &results.detections {
            self.draw_detection(&mut img, det, names);
        }
        img
    }

    fn draw_detection(&self, img: &mut RgbImage, det: &Detection, names: &ClassNames) {
        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return;
        }
        let max_x = width as i32 - 1;
        let max_y = height as i32 - 1;

        let [bx1, by1, bx2, by2] = det.bbox.xyxy();
        let x1 = (bx1.round() as i32).clamp(0, max_x);
        let y1 = (by1.round() as i32).clamp(0, max_y);
        let x2 = (bx2.round() as i32).clamp(0, max_x);
        let y2 = (by2.round() as i32).clamp(0, max_y);
        if x2 <= x1 || y2 <= y1 {
            return;
        }

        let color = Color::from_index(det.class_id);
        for t in 0..self.thickness {
            let (tx1, ty1, tx2, ty2) = (x1 + t, y1 + t, x2 - t, y2 - t);
            if tx2 > tx1 && ty2 > ty1 {
                let rect = Rect::at(tx1, ty1).of_size((tx2 - tx1) as u32, (ty2 - ty1) as u32);
                draw_hollow_rect_mut(img, rect, color.into());
            }
        }

        let label = format!("{} {:.2}", names.name(det.class_id), det.confidence);
        let scale = PxScale::from(self.font_size);
        let (text_w, text_h) = self
            .font
            .as_ref()
            .map_or((label.len() as u32 * 8, self.font_size as u32), |font| {
                text_size(scale, font, &label)
            });
        let (tab_w, tab_h) = (text_w + 4, text_h + 4);

        // Above the box when it fits, otherwise inside its top edge
        let tab_y = if y1 >= tab_h as i32 { y1 - tab_h as i32 } else { y1 };
        let tab_w = tab_w.min((width as i32 - x1) as u32);
        let tab_h = tab_h.min((height as i32 - tab_y) as u32);
        if tab_w == 0 || tab_h == 0 {
            return;
        }
        draw_filled_rect_mut(img, Rect::at(x1, tab_y).of_size(tab_w, tab_h), color.into());

        if let Some(font) = &self.font {
            draw_text_mut(img, color.contrast_text().into(), x1 + 2, tab_y + 2, scale, font, &label);
        }
    }
}

fn load_font(path: &Path) -> Result<FontVec> {
    let data = fs::read(path)
        .map_err(|e| DetectError::VisualizerError(format!("Failed to read font {}: {e}", path.display())))?;
    FontVec::try_from_vec(data)
        .map_err(|e| DetectError::VisualizerError(format!("Invalid font {}: {e}", path.display())))
}

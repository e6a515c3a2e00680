// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Letterbox geometry.
//!
//! A letterbox fits a source image into a fixed canvas with one uniform scale
//! factor and centered constant padding. [`LetterboxContext`] records the
//! geometry of one such fit so that decoded boxes can be mapped back from model
//! space to source-image pixels.

#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]

use fast_image_resize::images::{Image, ImageRef};
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::{ImageBuffer, Rgb, RgbImage};

use crate::error::{DetectError, Result};

/// Default letterbox padding color (gray).
pub const LETTERBOX_COLOR: [u8; 3] = [114, 114, 114];

/// Geometry of a single letterbox fit.
///
/// Created once per inference call and consumed by the decode step of that
/// same call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LetterboxContext {
    /// Uniform scale factor, `min(dest_w / src_w, dest_h / src_h)`.
    pub scale: f32,
    /// Left padding in pixels.
    pub pad_left: u32,
    /// Top padding in pixels.
    pub pad_top: u32,
    /// Right padding in pixels.
    pub pad_right: u32,
    /// Bottom padding in pixels.
    pub pad_bottom: u32,
    /// Width of the resized image inside the canvas.
    pub resized_width: u32,
    /// Height of the resized image inside the canvas.
    pub resized_height: u32,
    /// Source image width.
    pub src_width: u32,
    /// Source image height.
    pub src_height: u32,
    /// Canvas width.
    pub dest_width: u32,
    /// Canvas height.
    pub dest_height: u32,
}

impl LetterboxContext {
    /// Compute the letterbox geometry for fitting `src` into `dest`.
    ///
    /// The resized dimensions are `round(src * scale)`. The leftover is split
    /// with the smaller half on the left/top, so
    /// `pad_left + resized_width + pad_right == dest_width` holds exactly.
    ///
    /// # Errors
    ///
    /// Returns [`DetectError::ShapeError`] if any dimension is zero.
    pub fn compute(src_width: u32, src_height: u32, dest_width: u32, dest_height: u32) -> Result<Self> {
        if src_width == 0 || src_height == 0 || dest_width == 0 || dest_height == 0 {
            return Err(DetectError::ShapeError(format!(
                "letterbox dimensions must be positive, got {src_width}x{src_height} -> {dest_width}x{dest_height}"
            )));
        }

        let scale =
            (dest_width as f32 / src_width as f32).min(dest_height as f32 / src_height as f32);

        let resized_width = ((src_width as f32 * scale).round() as u32).clamp(1, dest_width);
        let resized_height = ((src_height as f32 * scale).round() as u32).clamp(1, dest_height);

        let pad_w = dest_width - resized_width;
        let pad_h = dest_height - resized_height;
        let pad_left = pad_w / 2;
        let pad_top = pad_h / 2;

        Ok(Self {
            scale,
            pad_left,
            pad_top,
            pad_right: pad_w - pad_left,
            pad_bottom: pad_h - pad_top,
            resized_width,
            resized_height,
            src_width,
            src_height,
            dest_width,
            dest_height,
        })
    }

    /// Whether the resize step is the identity.
    #[must_use]
    pub const fn is_exact_fit(&self) -> bool {
        self.resized_width == self.src_width && self.resized_height == self.src_height
    }

    /// Map a box from model space back to source-image space.
    ///
    /// Positions are unpadded then unscaled, sizes are only unscaled.
    #[must_use]
    pub fn invert(&self, model_x: f32, model_y: f32, model_w: f32, model_h: f32) -> (f32, f32, f32, f32) {
        (
            (model_x - self.pad_left as f32) / self.scale,
            (model_y - self.pad_top as f32) / self.scale,
            model_w / self.scale,
            model_h / self.scale,
        )
    }

    /// Map a box from source-image space into model space. Inverse of [`Self::invert`].
    #[must_use]
    pub fn forward(&self, x: f32, y: f32, w: f32, h: f32) -> (f32, f32, f32, f32) {
        (
            x.mul_add(self.scale, self.pad_left as f32),
            y.mul_add(self.scale, self.pad_top as f32),
            w * self.scale,
            h * self.scale,
        )
    }
}

/// Reusable storage for [`apply_into`].
///
/// The canvas is reallocated only when the model input size changes and the
/// resize buffer only grows, so steady-state letterboxing does not allocate.
pub struct LetterboxBuffers {
    canvas: RgbImage,
    resized: Vec<u8>,
    resizer: Resizer,
}

impl Default for LetterboxBuffers {
    fn default() -> Self {
        Self {
            canvas: RgbImage::new(0, 0),
            resized: Vec::new(),
            resizer: Resizer::new(),
        }
    }
}

impl std::fmt::Debug for LetterboxBuffers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LetterboxBuffers")
            .field("canvas", &self.canvas.dimensions())
            .field("resized_capacity", &self.resized.capacity())
            .finish_non_exhaustive()
    }
}

impl LetterboxBuffers {
    /// Create empty buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Canvas written by the last [`apply_into`] call.
    #[must_use]
    pub const fn canvas(&self) -> &RgbImage {
        &self.canvas
    }
}

/// Resize `image` and pad it to the canvas described by `ctx`.
///
/// Allocating wrapper around [`apply_into`].
///
/// # Errors
///
/// See [`apply_into`].
pub fn apply(image: &RgbImage, ctx: &LetterboxContext, fill: [u8; 3]) -> Result<RgbImage> {
    let mut buffers = LetterboxBuffers::new();
    apply_into(image, ctx, fill, &mut buffers)?;
    Ok(buffers.canvas)
}

/// Resize `image` and pad it onto the canvas held by `buffers`.
///
/// The resize is skipped when it would be the identity; padding is always
/// applied so the canvas is exactly `dest_width x dest_height`.
///
/// # Errors
///
/// Returns [`DetectError::ShapeError`] if the image does not match the source
/// dimensions recorded in `ctx`, or if resizing fails.
pub fn apply_into(
    image: &RgbImage,
    ctx: &LetterboxContext,
    fill: [u8; 3],
    buffers: &mut LetterboxBuffers,
) -> Result<()> {
    if image.dimensions() != (ctx.src_width, ctx.src_height) {
        return Err(DetectError::ShapeError(format!(
            "image is {}x{}, letterbox was computed for {}x{}",
            image.width(),
            image.height(),
            ctx.src_width,
            ctx.src_height
        )));
    }

    if buffers.canvas.dimensions() != (ctx.dest_width, ctx.dest_height) {
        buffers.canvas = RgbImage::new(ctx.dest_width, ctx.dest_height);
    }
    for px in buffers.canvas.pixels_mut() {
        *px = Rgb(fill);
    }

    let (x, y) = (i64::from(ctx.pad_left), i64::from(ctx.pad_top));
    if ctx.is_exact_fit() {
        image::imageops::replace(&mut buffers.canvas, image, x, y);
    } else {
        resize_bilinear_into(
            &mut buffers.resizer,
            image,
            ctx.resized_width,
            ctx.resized_height,
            &mut buffers.resized,
        )?;
        let resized: ImageBuffer<Rgb<u8>, &[u8]> =
            ImageBuffer::from_raw(ctx.resized_width, ctx.resized_height, buffers.resized.as_slice())
                .ok_or_else(|| DetectError::ShapeError("Resized buffer is too small".to_string()))?;
        image::imageops::replace(&mut buffers.canvas, &resized, x, y);
    }

    Ok(())
}

/// Bilinear resize of an RGB image into `dst`, which is resized to fit.
fn resize_bilinear_into(
    resizer: &mut Resizer,
    image: &RgbImage,
    width: u32,
    height: u32,
    dst: &mut Vec<u8>,
) -> Result<()> {
    let src = ImageRef::new(image.width(), image.height(), image.as_raw(), PixelType::U8x3)
        .map_err(|e| DetectError::ShapeError(format!("Failed to borrow source image: {e}")))?;

    dst.resize(width as usize * height as usize * 3, 0);
    let mut dst_image = Image::from_slice_u8(width, height, dst.as_mut_slice(), PixelType::U8x3)
        .map_err(|e| DetectError::ShapeError(format!("Failed to wrap resize buffer: {e}")))?;

    let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear));
    resizer
        .resize(&src, &mut dst_image, Some(&options))
        .map_err(|e| DetectError::ShapeError(format!("Failed to resize image: {e}")))
}

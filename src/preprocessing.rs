// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Image preprocessing for YOLOv8 inference.
//!
//! This module turns a decoded image into the float tensor the model consumes:
//! conversion to 3-channel RGB, letterboxing (see [`crate::letterbox`]) and
//! CHW normalization to `[0, 1]`.

use std::borrow::Cow;

use image::{DynamicImage, RgbImage};
use ndarray::{Array4, ArrayView3};

use crate::error::{DetectError, Result};
use crate::letterbox::{self, LetterboxBuffers, LetterboxContext};

/// Reciprocal of 255 for normalization.
const INV_255: f32 = 1.0 / 255.0;

/// Number of channels the model expects.
pub const INPUT_CHANNELS: usize = 3;

/// Converts HWC byte images into CHW float buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TensorEncoder {
    width: usize,
    height: usize,
}

impl TensorEncoder {
    /// Create an encoder for a `width x height` model input.
    #[must_use]
    pub const fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Number of floats produced per image (`C * H * W`).
    #[must_use]
    pub const fn len(&self) -> usize {
        INPUT_CHANNELS * self.width * self.height
    }

    /// Whether the encoder produces an empty tensor.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tensor shape presented to the session, `[1, C, H, W]`.
    #[must_use]
    pub const fn shape(&self) -> [usize; 4] {
        [1, INPUT_CHANNELS, self.height, self.width]
    }

    /// Encode an HWC image into `out`, replacing its contents.
    ///
    /// `out` keeps its allocation between calls, so a long-lived buffer avoids
    /// per-image heap traffic.
    ///
    /// # Errors
    ///
    /// Returns [`DetectError::ShapeError`] if the image is not
    /// `height x width x 3`.
    pub fn encode_into(&self, image: ArrayView3<'_, u8>, out: &mut Vec<f32>) -> Result<()> {
        let &[h, w, c] = image.shape() else {
            return Err(DetectError::ShapeError("expected an HWC image".to_string()));
        };
        if c != INPUT_CHANNELS {
            return Err(DetectError::ShapeError(format!(
                "expected {INPUT_CHANNELS} channels, got {c}"
            )));
        }
        if (h, w) != (self.height, self.width) {
            return Err(DetectError::ShapeError(format!(
                "expected a {}x{} image, got {w}x{h}",
                self.width, self.height
            )));
        }

        let plane = h * w;
        out.clear();
        out.resize(self.len(), 0.0);
        let (r_plane, rest) = out.split_at_mut(plane);
        let (g_plane, b_plane) = rest.split_at_mut(plane);

        match image.as_slice() {
            Some(pixels) => {
                for (i, px) in pixels.chunks_exact(INPUT_CHANNELS).enumerate() {
                    r_plane[i] = f32::from(px[0]) * INV_255;
                    g_plane[i] = f32::from(px[1]) * INV_255;
                    b_plane[i] = f32::from(px[2]) * INV_255;
                }
            }
            // Non-standard layout (e.g. a sliced view)
            None => {
                for ((y, x, ch), &v) in image.indexed_iter() {
                    let dst = match ch {
                        0 => &mut *r_plane,
                        1 => &mut *g_plane,
                        _ => &mut *b_plane,
                    };
                    dst[y * w + x] = f32::from(v) * INV_255;
                }
            }
        }

        Ok(())
    }

    /// Encode an HWC image into a freshly allocated `[1, C, H, W]` array.
    ///
    /// # Errors
    ///
    /// See [`Self::encode_into`].
    pub fn encode(&self, image: ArrayView3<'_, u8>) -> Result<Array4<f32>> {
        let mut data = Vec::with_capacity(self.len());
        self.encode_into(image, &mut data)?;
        Ok(Array4::from_shape_vec(
            (1, INPUT_CHANNELS, self.height, self.width),
            data,
        )?)
    }
}

/// Borrow an RGB image as an HWC array view.
///
/// # Errors
///
/// Returns [`DetectError::ShapeError`] if the buffer length does not match the
/// image dimensions.
pub fn rgb_view(image: &RgbImage) -> Result<ArrayView3<'_, u8>> {
    let (w, h) = image.dimensions();
    Ok(ArrayView3::from_shape(
        (h as usize, w as usize, INPUT_CHANNELS),
        image.as_raw().as_slice(),
    )?)
}

/// Convert any decoded image to 3-channel RGB.
///
/// RGB8 input is borrowed. Grayscale is replicated across channels; alpha and
/// 16-bit layouts are reduced to 8-bit RGB.
#[must_use]
pub fn to_rgb(image: &DynamicImage) -> Cow<'_, RgbImage> {
    match image {
        DynamicImage::ImageRgb8(rgb) => Cow::Borrowed(rgb),
        other => Cow::Owned(other.to_rgb8()),
    }
}

/// Letterbox an image and encode it into `out`.
///
/// The letterbox canvas lives in `buffers`; both it and `out` keep their
/// allocations across calls. Returns the letterbox geometry needed to decode this image's detections.
///
/// # Errors
///
/// Returns [`DetectError::ImageDecodeError`] for an empty image and
/// [`DetectError::ShapeError`] if letterboxing or encoding fails.
pub fn preprocess_into(
    image: &DynamicImage,
    encoder: &TensorEncoder,
    fill: [u8; 3],
    buffers: &mut LetterboxBuffers,
    out: &mut Vec<f32>,
) -> Result<LetterboxContext> {
    if image.width() == 0 || image.height() == 0 {
        return Err(DetectError::ImageDecodeError("image is empty".to_string()));
    }

    let rgb = to_rgb(image);
    #[allow(clippy::cast_possible_truncation)]
    let ctx = LetterboxContext::compute(
        rgb.width(),
        rgb.height(),
        encoder.width as u32,
        encoder.height as u32,
    )?;
    letterbox::apply_into(&rgb, &ctx, fill, buffers)?;
    encoder.encode_into(rgb_view(buffers.canvas())?, out)?;

    Ok(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb};
    use ndarray::Array3;

    #[test]
    fn test_encode_layout_is_chw() {
        let mut image = Array3::<u8>::zeros((2, 3, 3));
        image[[0, 1, 0]] = 255; // R at (y=0, x=1)
        image[[1, 2, 2]] = 51; // B at (y=1, x=2)

        let tensor = TensorEncoder::new(3, 2).encode(image.view()).unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 2, 3]);
        assert!((tensor[[0, 0, 0, 1]] - 1.0).abs() < 1e-6);
        assert!((tensor[[0, 2, 1, 2]] - 0.2).abs() < 1e-6);
        assert!(tensor[[0, 1, 0, 1]].abs() < 1e-6);
    }

    #[test]
    fn test_encode_range() {
        let image = Array3::from_shape_fn((4, 4, 3), |(y, x, c)| ((y * 64 + x * 16 + c * 7) % 256) as u8);
        let mut out = Vec::new();
        TensorEncoder::new(4, 4).encode_into(image.view(), &mut out).unwrap();
        assert_eq!(out.len(), 48);
        assert!(out.iter().all(|v| (0.0..=1.0).contains(v)));

        let white = Array3::from_elem((4, 4, 3), 255u8);
        TensorEncoder::new(4, 4).encode_into(white.view(), &mut out).unwrap();
        assert!(out.iter().all(|&v| (v - 1.0).abs() < 1e-6));
    }

    #[test]
    fn test_encode_rejects_wrong_channels() {
        let gray = Array3::<u8>::zeros((4, 4, 1));
        let err = TensorEncoder::new(4, 4).encode(gray.view()).unwrap_err();
        assert!(matches!(err, DetectError::ShapeError(_)));
    }

    #[test]
    fn test_encode_rejects_wrong_size() {
        let image = Array3::<u8>::zeros((5, 4, 3));
        assert!(TensorEncoder::new(4, 4).encode(image.view()).is_err());
    }

    #[test]
    fn test_encode_non_contiguous_view() {
        let image = Array3::from_shape_fn((4, 4, 3), |(y, x, c)| (y * 12 + x * 3 + c) as u8);
        let view = image.slice(ndarray::s![.., ..;2, ..]);
        let tensor = TensorEncoder::new(2, 4).encode(view).unwrap();
        // (y=1, x=1) in the view is (y=1, x=2) in the source
        assert!((tensor[[0, 1, 1, 1]] - f32::from(image[[1, 2, 1]]) / 255.0).abs() < 1e-6);
    }

    #[test]
    fn test_encode_into_reuses_buffer() {
        let encoder = TensorEncoder::new(2, 2);
        let mut out = Vec::with_capacity(64);
        let ptr = out.as_ptr();
        encoder
            .encode_into(Array3::<u8>::zeros((2, 2, 3)).view(), &mut out)
            .unwrap();
        assert_eq!(out.len(), 12);
        assert_eq!(out.as_ptr(), ptr);
    }

    #[test]
    fn test_grayscale_converted_to_rgb() {
        let gray = DynamicImage::ImageLuma8(GrayImage::from_pixel(2, 2, Luma([77])));
        let rgb = to_rgb(&gray);
        assert!(matches!(rgb, Cow::Owned(_)));
        assert_eq!(rgb.get_pixel(1, 1), &Rgb([77, 77, 77]));
    }

    #[test]
    fn test_rgb_input_is_borrowed() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, Rgb([1, 2, 3])));
        let rgb = to_rgb(&image);
        assert!(matches!(rgb, Cow::Borrowed(_)));
        assert_eq!(rgb.as_raw().as_ptr(), image.as_bytes().as_ptr());
    }

    #[test]
    fn test_preprocess_into_reuses_canvas() {
        let encoder = TensorEncoder::new(16, 16);
        let mut buffers = LetterboxBuffers::new();
        let mut out = Vec::new();
        let first = DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 16, Rgb([255, 255, 255])));
        preprocess_into(&first, &encoder, [0, 0, 0], &mut buffers, &mut out).unwrap();
        let canvas_ptr = buffers.canvas().as_raw().as_ptr();
        let out_ptr = out.as_ptr();

        let second = DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 32, Rgb([255, 255, 255])));
        preprocess_into(&second, &encoder, [0, 0, 0], &mut buffers, &mut out).unwrap();
        assert_eq!(buffers.canvas().as_raw().as_ptr(), canvas_ptr);
        assert_eq!(out.as_ptr(), out_ptr);
        // Left padding column is black now, top row center is white
        assert!(out[8 * 16].abs() < 1e-6);
        assert!((out[8] - 1.0).abs() < 1e-2);
    }

    #[test]
    fn test_preprocess_into_letterboxes() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 16, Rgb([255, 255, 255])));
        let encoder = TensorEncoder::new(16, 16);
        let mut out = Vec::new();
        let ctx = preprocess_into(&image, &encoder, [0, 0, 0], &mut LetterboxBuffers::new(), &mut out).unwrap();

        assert!((ctx.scale - 0.5).abs() < f32::EPSILON);
        assert_eq!((ctx.pad_top, ctx.pad_bottom), (4, 4));
        assert_eq!(out.len(), encoder.len());
        // Top padding row is black, middle row is white
        assert!(out[0].abs() < 1e-6);
        assert!((out[8 * 16 + 8] - 1.0).abs() < 1e-2);
    }

    #[test]
    fn test_preprocess_empty_image() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(0, 0));
        let mut out = Vec::new();
        let mut buffers = LetterboxBuffers::new();
        let err = preprocess_into(&image, &TensorEncoder::new(4, 4), [0, 0, 0], &mut buffers, &mut out).unwrap_err();
        assert!(matches!(err, DetectError::ImageDecodeError(_)));
    }
}

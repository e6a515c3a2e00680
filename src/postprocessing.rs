// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Post-processing for YOLOv8 detection outputs.
//!
//! The raw output is a `[1, 4 + num_classes, N]` tensor, attribute-major: row
//! `0..4` holds `cx, cy, w, h` in model-input pixels and row `4 + c` holds the
//! score of class `c` for every candidate. Decoding filters candidates by
//! confidence, maps them back to the source image and runs greedy NMS.

use crate::error::{DetectError, Result};
use crate::letterbox::LetterboxContext;
use crate::results::{BoundingBox, Detection};
use crate::session::OutputView;
use crate::utils::{NmsMode, nms};

/// Number of box attributes preceding the class scores.
pub const BOX_ATTRIBUTES: usize = 4;

/// Parameters controlling detection decoding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodeParams {
    /// Minimum best-class score for a candidate to be kept.
    pub conf_threshold: f32,
    /// Candidates overlapping an accepted box at or above this `IoU` are suppressed.
    pub iou_threshold: f32,
    /// Number of classes the model predicts.
    pub num_classes: usize,
    /// Maximum detections returned per image.
    pub max_detections: usize,
    /// Class-agnostic or per-class suppression.
    pub nms_mode: NmsMode,
}

impl DecodeParams {
    /// Parameters with default thresholds (0.5 / 0.5), 300 detections and
    /// class-agnostic NMS.
    #[must_use]
    pub const fn new(num_classes: usize) -> Self {
        Self {
            conf_threshold: 0.5,
            iou_threshold: 0.5,
            num_classes,
            max_detections: 300,
            nms_mode: NmsMode::ClassAgnostic,
        }
    }

    /// Expected size of the attribute axis.
    #[must_use]
    pub const fn expected_attributes(&self) -> usize {
        BOX_ATTRIBUTES + self.num_classes
    }
}

/// Candidate buffer reused across decode calls.
pub type CandidateBuffer = Vec<(BoundingBox, f32, usize)>;

/// Validate the output layout and return the number of candidates.
fn check_shape(output: &OutputView<'_>, params: &DecodeParams) -> Result<usize> {
    let expected_attributes = params.expected_attributes();
    let mismatch = || DetectError::ShapeMismatch {
        expected_attributes,
        shape: output.shape.to_vec(),
        len: output.data.len(),
    };

    let &[batch, attributes, candidates] = output.shape else {
        return Err(mismatch());
    };
    if batch != 1 || attributes != expected_attributes {
        return Err(mismatch());
    }
    if attributes.checked_mul(candidates) != Some(output.data.len()) {
        return Err(mismatch());
    }

    Ok(candidates)
}

/// Decode a raw output tensor into detections in source-image pixels.
///
/// # Errors
///
/// Returns [`DetectError::ShapeMismatch`] if the output does not have shape
/// `[1, 4 + num_classes, N]` with exactly `(4 + num_classes) * N` values.
pub fn decode(output: &OutputView<'_>, ctx: &LetterboxContext, params: &DecodeParams) -> Result<Vec<Detection>> {
    let mut candidates = Vec::new();
    decode_with_scratch(output, ctx, params, &mut candidates)
}

/// Same as [`decode`], collecting candidates into a caller-owned buffer.
///
/// The buffer is cleared on entry and keeps its capacity.
///
/// # Errors
///
/// See [`decode`].
pub fn decode_with_scratch(
    output: &OutputView<'_>,
    ctx: &LetterboxContext,
    params: &DecodeParams,
    candidates: &mut CandidateBuffer,
) -> Result<Vec<Detection>> {
    candidates.clear();
    let n = check_shape(output, params)?;
    let data = output.data;

    for i in 0..n {
        let mut best_class = 0;
        let mut best_score = f32::NEG_INFINITY;
        for c in 0..params.num_classes {
            let score = data[(BOX_ATTRIBUTES + c) * n + i];
            // Strict comparison: NaN never wins and ties keep the lower index
            if score > best_score {
                best_score = score;
                best_class = c;
            }
        }

        if best_score < params.conf_threshold {
            continue;
        }

        let (cx, cy, w, h) = ctx.invert(data[i], data[n + i], data[2 * n + i], data[3 * n + i]);
        if !(cx.is_finite() && cy.is_finite() && w.is_finite() && h.is_finite()) {
            continue;
        }

        let x = w.mul_add(-0.5, cx).max(0.0);
        let y = h.mul_add(-0.5, cy).max(0.0);
        candidates.push((BoundingBox::new(x, y, w, h), best_score, best_class));
    }

    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let keep = nms(candidates, params.iou_threshold, params.nms_mode);

    Ok(keep
        .into_iter()
        .take(params.max_detections)
        .map(|k| {
            let (bbox, score, class_id) = candidates[k];
            Detection::new(class_id, score, bbox)
        })
        .collect())
}

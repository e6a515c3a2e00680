// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Utility functions for the detection pipeline

use crate::results::BoundingBox;

/// Calculate `IoU` (Intersection over Union) between two bounding boxes
///
/// Boxes are in left-top form; the result is `0.0` when the union is empty.
#[must_use]
pub fn calculate_iou(a: &BoundingBox, b: &BoundingBox) -> f32 {
    let [ax1, ay1, ax2, ay2] = a.xyxy();
    let [bx1, by1, bx2, by2] = b.xyxy();

    let x1 = ax1.max(bx1);
    let y1 = ay1.max(by1);
    let x2 = ax2.min(bx2);
    let y2 = ay2.min(by2);

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let union = a.area() + b.area() - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

/// How NMS treats boxes of different classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NmsMode {
    /// Any accepted box suppresses overlapping boxes of every class.
    #[default]
    ClassAgnostic,
    /// A box only suppresses overlapping boxes of its own class.
    PerClass,
}

/// Greedy Non-Maximum Suppression (NMS)
///
/// `boxes` are `(bbox, score, class_id)`. Candidates are visited by score
/// descending (ties keep input order) and accepted when their `IoU` with every
/// previously accepted box is strictly below `iou_threshold`.
///
/// # Returns
///
/// Indices of accepted boxes, in acceptance order
#[must_use]
pub fn nms(boxes: &[(BoundingBox, f32, usize)], iou_threshold: f32, mode: NmsMode) -> Vec<usize> {
    let score = |i: usize| {
        let s = boxes[i].1;
        if s.is_nan() { f32::NEG_INFINITY } else { s }
    };
    let mut order: Vec<usize> = (0..boxes.len()).collect();
    // Stable sort, NaN scores last
    order.sort_by(|&a, &b| score(b).total_cmp(&score(a)));

    let mut keep: Vec<usize> = Vec::new();
    for i in order {
        let (bbox, _, class_id) = &boxes[i];
        let suppressed = keep.iter().any(|&k| {
            let (kept_box, _, kept_class) = &boxes[k];
            let same_group = mode == NmsMode::ClassAgnostic || kept_class == class_id;
            same_group && calculate_iou(kept_box, bbox) >= iou_threshold
        });
        if !suppressed {
            keep.push(i);
        }
    }

    keep
}

/// Simple pluralization for common COCO class names.
#[must_use]
pub fn pluralize(word: &str) -> String {
    match word {
        "person" => "persons".to_string(),
        "bus" => "buses".to_string(),
        "knife" => "knives".to_string(),
        "mouse" => "mice".to_string(),
        "sheep" => "sheep".to_string(),
        "skis" => "skis".to_string(),
        _ => {
            if word.ends_with('s') || word.ends_with("ch") || word.ends_with("sh") {
                format!("{word}es")
            } else if word.ends_with('y') && !word.ends_with("ey") && !word.ends_with("ay") {
                format!("{}ies", &word[..word.len() - 1])
            } else {
                format!("{word}s")
            }
        }
    }
}

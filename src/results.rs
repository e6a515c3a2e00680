// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Result types produced by the detection pipeline.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::labels::ClassNames;
use crate::utils::pluralize;

/// Timing information for inference operations (in milliseconds).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Speed {
    /// Time spent on preprocessing.
    pub preprocess: Option<f64>,
    /// Time spent on model inference.
    pub inference: Option<f64>,
    /// Time spent on postprocessing.
    pub postprocess: Option<f64>,
}

impl Speed {
    /// Create a new Speed instance with all timings.
    #[must_use]
    pub const fn new(preprocess: f64, inference: f64, postprocess: f64) -> Self {
        Self {
            preprocess: Some(preprocess),
            inference: Some(inference),
            postprocess: Some(postprocess),
        }
    }

    /// Get total time in milliseconds.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.preprocess.unwrap_or(0.0)
            + self.inference.unwrap_or(0.0)
            + self.postprocess.unwrap_or(0.0)
    }
}

/// Axis-aligned box in left-top form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Width.
    pub width: f32,
    /// Height.
    pub height: f32,
}

impl BoundingBox {
    /// Create a box from its left-top corner and size.
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Corners as `[x1, y1, x2, y2]`.
    #[must_use]
    pub fn xyxy(&self) -> [f32; 4] {
        [self.x, self.y, self.x + self.width, self.y + self.height]
    }

    /// Box center.
    #[must_use]
    pub fn center(&self) -> (f32, f32) {
        (self.width.mul_add(0.5, self.x), self.height.mul_add(0.5, self.y))
    }

    /// Box area; degenerate boxes have zero area.
    #[must_use]
    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }
}

/// A single detected object in source-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Detection {
    /// Class index into the model's class list.
    pub class_id: usize,
    /// Best class score.
    pub confidence: f32,
    /// Box in source-image pixels.
    pub bbox: BoundingBox,
}

impl Detection {
    /// Create a detection.
    #[must_use]
    pub const fn new(class_id: usize, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            class_id,
            confidence,
            bbox,
        }
    }
}

/// Detections for one image, with the timings of the call that produced them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Results {
    /// Detections in NMS acceptance order (score descending).
    pub detections: Vec<Detection>,
    /// Original image shape (height, width).
    pub orig_shape: (u32, u32),
    /// Inference tensor shape (height, width) after letterboxing.
    pub inference_shape: (u32, u32),
    /// Inference timing information.
    pub speed: Speed,
}

impl Results {
    /// Get the number of detections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.detections.len()
    }

    /// Check if there are no detections.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    /// Summary of detections per class (e.g., "2 persons, 1 car").
    #[must_use]
    pub fn verbose(&self, names: &ClassNames) -> String {
        if self.is_empty() {
            return "(no detections)".to_string();
        }

        let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
        for det in &self.detections {
            *counts.entry(det.class_id).or_insert(0) += 1;
        }

        counts
            .iter()
            .map(|(&class_id, &count)| {
                let name = names.name(class_id);
                if count > 1 {
                    format!("{count} {}", pluralize(name))
                } else {
                    format!("{count} {name}")
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Serialize to pretty JSON, with class names resolved.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self, names: &ClassNames) -> serde_json::Result<String> {
        #[derive(Serialize)]
        struct Entry<'a> {
            name: &'a str,
            #[serde(flatten)]
            detection: &'a Detection,
        }

        #[derive(Serialize)]
        struct Document<'a> {
            orig_shape: (u32, u32),
            speed: &'a Speed,
            detections: Vec<Entry<'a>>,
        }

        let detections = self
            .detections
            .iter()
            .map(|detection| Entry {
                name: names.name(detection.class_id),
                detection,
            })
            .collect();

        serde_json::to_string_pretty(&Document {
            orig_shape: self.orig_shape,
            speed: &self.speed,
            detections,
        })
    }
}

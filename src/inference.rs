// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Inference configuration.
//!
//! This module defines the [`InferenceConfig`] struct, which controls the
//! detection thresholds, model input size, class list and execution backend.

use crate::device::Device;
use crate::error::{DetectError, Result};
use crate::labels::ClassNames;
use crate::letterbox::LETTERBOX_COLOR;
use crate::postprocessing::DecodeParams;
use crate::utils::NmsMode;

/// Input size (height, width) used when neither the config nor the model
/// fixes one.
pub const DEFAULT_IMGSZ: (usize, usize) = (640, 640);

/// Default intra-op thread count: `min(4, available cores)`.
#[must_use]
pub fn default_num_threads() -> usize {
    std::thread::available_parallelism().map_or(1, |n| n.get().min(4))
}

/// Configuration for YOLOv8 detection.
///
/// The class count has no default: set it with [`Self::with_num_classes`],
/// [`Self::with_class_names`], or both.
///
/// # Example
///
/// ```rust
/// use yolov8_detect::{ClassNames, InferenceConfig};
///
/// let config = InferenceConfig::new()
///     .with_confidence(0.5)
///     .with_iou(0.45)
///     .with_class_names(ClassNames::coco())
///     .with_imgsz(640, 640);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct InferenceConfig {
    /// Minimum best-class score for a detection (0.0 to 1.0).
    pub confidence_threshold: f32,
    /// `IoU` at or above which NMS suppresses a box (0.0 to 1.0).
    pub iou_threshold: f32,
    /// Maximum number of detections to return per image.
    pub max_detections: usize,
    /// Model input size (height, width). `None` uses the model's declared size.
    pub imgsz: Option<(usize, usize)>,
    /// Number of intra-op threads for ONNX Runtime.
    pub num_threads: usize,
    /// Execution backend.
    pub device: Device,
    /// Number of classes the model predicts.
    pub num_classes: Option<usize>,
    /// Class names, index-aligned with class ids.
    pub class_names: Option<ClassNames>,
    /// Letterbox padding color.
    pub pad_color: [u8; 3],
    /// NMS policy.
    pub nms_mode: NmsMode,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.5,
            iou_threshold: 0.5,
            max_detections: 300,
            imgsz: None,
            num_threads: default_num_threads(),
            device: Device::Cpu,
            num_classes: None,
            class_names: None,
            pad_color: LETTERBOX_COLOR,
            nms_mode: NmsMode::ClassAgnostic,
        }
    }
}

impl InferenceConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the confidence threshold.
    #[must_use]
    pub const fn with_confidence(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// Set the `IoU` threshold for Non-Maximum Suppression (NMS).
    #[must_use]
    pub const fn with_iou(mut self, threshold: f32) -> Self {
        self.iou_threshold = threshold;
        self
    }

    /// Set the maximum number of detections to return.
    #[must_use]
    pub const fn with_max_detections(mut self, max: usize) -> Self {
        self.max_detections = max;
        self
    }

    /// Set the model input size.
    ///
    /// # Arguments
    ///
    /// * `height` - The target image height.
    /// * `width` - The target image width.
    #[must_use]
    pub const fn with_imgsz(mut self, height: usize, width: usize) -> Self {
        self.imgsz = Some((height, width));
        self
    }

    /// Set the number of intra-op threads. `0` lets ONNX Runtime decide.
    #[must_use]
    pub const fn with_threads(mut self, threads: usize) -> Self {
        self.num_threads = threads;
        self
    }

    /// Set the execution backend.
    #[must_use]
    pub const fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    /// Set the number of classes the model predicts.
    #[must_use]
    pub const fn with_num_classes(mut self, num_classes: usize) -> Self {
        self.num_classes = Some(num_classes);
        self
    }

    /// Set the class names.
    #[must_use]
    pub fn with_class_names(mut self, names: ClassNames) -> Self {
        self.class_names = Some(names);
        self
    }

    /// Set the letterbox padding color.
    #[must_use]
    pub const fn with_pad_color(mut self, color: [u8; 3]) -> Self {
        self.pad_color = color;
        self
    }

    /// Set the NMS policy.
    #[must_use]
    pub const fn with_nms_mode(mut self, mode: NmsMode) -> Self {
        self.nms_mode = mode;
        self
    }

    /// Resolve the class list from the configured count and names.
    ///
    /// A count without names yields generic names; names without a count
    /// define the count.
    ///
    /// # Errors
    ///
    /// Returns [`DetectError::ConfigError`] if neither is set, the count is
    /// zero, or the two disagree.
    pub fn resolve_classes(&self) -> Result<ClassNames> {
        match (self.num_classes, &self.class_names) {
            (Some(0), _) => Err(DetectError::ConfigError("num_classes must be at least 1".to_string())),
            (_, Some(names)) if names.is_empty() => {
                Err(DetectError::ConfigError("class name list is empty".to_string()))
            }
            (Some(n), Some(names)) if names.len() != n => Err(DetectError::ConfigError(format!(
                "num_classes is {n} but {} class names were given",
                names.len()
            ))),
            (_, Some(names)) => Ok(names.clone()),
            (Some(n), None) => Ok(ClassNames::generic(n)),
            (None, None) => Err(DetectError::ConfigError(
                "the class count must be set (num_classes or class names)".to_string(),
            )),
        }
    }

    /// Resolve the input size against the model's declared `(height, width)`.
    ///
    /// An explicit size wins when the model has a dynamic input; a static
    /// model size is adopted when none was set.
    ///
    /// # Errors
    ///
    /// Returns [`DetectError::ConfigError`] if an explicit size contradicts a
    /// static model input size.
    pub fn resolve_imgsz(&self, model: Option<(usize, usize)>) -> Result<(usize, usize)> {
        match (self.imgsz, model) {
            (Some(requested), Some(declared)) if requested != declared => Err(DetectError::ConfigError(format!(
                "image size {}x{} does not match the model input {}x{}",
                requested.1, requested.0, declared.1, declared.0
            ))),
            (Some(size), _) | (None, Some(size)) => Ok(size),
            (None, None) => Ok(DEFAULT_IMGSZ),
        }
    }

    /// Check thresholds and sizes, and that the class list resolves.
    ///
    /// # Errors
    ///
    /// Returns [`DetectError::ConfigError`] describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        check_unit("confidence threshold", self.confidence_threshold)?;
        check_unit("NMS threshold", self.iou_threshold)?;
        if let Some((height, width)) = self.imgsz
            && (height == 0 || width == 0)
        {
            return Err(DetectError::ConfigError(format!(
                "image size must be positive, got {width}x{height}"
            )));
        }
        if self.max_detections == 0 {
            return Err(DetectError::ConfigError("max_detections must be at least 1".to_string()));
        }
        self.resolve_classes().map(|_| ())
    }

    /// Decoder parameters for `num_classes` classes.
    #[must_use]
    pub const fn decode_params(&self, num_classes: usize) -> DecodeParams {
        DecodeParams {
            conf_threshold: self.confidence_threshold,
            iou_threshold: self.iou_threshold,
            num_classes,
            max_detections: self.max_detections,
            nms_mode: self.nms_mode,
        }
    }
}

fn check_unit(name: &str, value: f32) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(DetectError::ConfigError(format!(
            "{name} must be in [0, 1], got {value}"
        )))
    }
}

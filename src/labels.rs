// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Class name lists.

use std::fs;
use std::path::Path;

use crate::error::{DetectError, Result};

/// The 80 COCO class names, in model output order.
pub const COCO_CLASSES: [&str; 80] = [
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat", "dog",
    "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack", "umbrella",
    "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball", "kite",
    "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket", "bottle",
    "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich", "orange",
    "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch", "potted plant",
    "bed", "dining table", "toilet", "tv", "laptop", "mouse", "remote", "keyboard", "cell phone",
    "microwave", "oven", "toaster", "sink", "refrigerator", "book", "clock", "vase", "scissors",
    "teddy bear", "hair drier", "toothbrush",
];

/// Ordered class names; index `i` names class id `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassNames {
    names: Vec<String>,
}

impl ClassNames {
    /// Build from an explicit list.
    #[must_use]
    pub const fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// The COCO-80 list.
    #[must_use]
    pub fn coco() -> Self {
        Self::new(COCO_CLASSES.iter().map(ToString::to_string).collect())
    }

    /// Placeholder names `class0 .. class{n-1}`.
    #[must_use]
    pub fn generic(n: usize) -> Self {
        Self::new((0..n).map(|i| format!("class{i}")).collect())
    }

    /// Read one class name per line, ignoring blank lines.
    ///
    /// # Errors
    ///
    /// Returns [`DetectError::ConfigError`] if the file cannot be read or
    /// contains no names.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| DetectError::ConfigError(format!("Failed to read class names {}: {e}", path.display())))?;
        let names: Vec<String> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(ToString::to_string)
            .collect();
        if names.is_empty() {
            return Err(DetectError::ConfigError(format!(
                "Class names file {} is empty",
                path.display()
            )));
        }
        Ok(Self::new(names))
    }

    /// Resolve a `--classes` value: `coco` or a path to a names file.
    ///
    /// # Errors
    ///
    /// See [`Self::from_file`].
    pub fn from_spec(spec: &str) -> Result<Self> {
        if spec.eq_ignore_ascii_case("coco") {
            Ok(Self::coco())
        } else {
            Self::from_file(spec)
        }
    }

    /// Name for `class_id`, or `"unknown"` when out of range.
    #[must_use]
    pub fn name(&self, class_id: usize) -> &str {
        self.names.get(class_id).map_or("unknown", String::as_str)
    }

    /// Number of classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coco() {
        let names = ClassNames::coco();
        assert_eq!(names.len(), 80);
        assert_eq!(names.name(0), "person");
        assert_eq!(names.name(79), "toothbrush");
        assert_eq!(names.name(80), "unknown");
    }

    #[test]
    fn test_generic() {
        let names = ClassNames::generic(2);
        assert_eq!(names.name(1), "class1");
        assert_eq!(names.len(), 2);
    }

    #[test]
    fn test_from_file() {
        let path = std::env::temp_dir().join(format!("yolov8_detect_names_{}.txt", std::process::id()));
        fs::write(&path, "helmet\n\n  vest  \n").unwrap();
        let names = ClassNames::from_spec(path.to_str().unwrap()).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(names.len(), 2);
        assert_eq!(names.name(1), "vest");
    }

    #[test]
    fn test_from_file_errors() {
        assert!(matches!(
            ClassNames::from_file("/nonexistent/names.txt"),
            Err(DetectError::ConfigError(_))
        ));

        let path = std::env::temp_dir().join(format!("yolov8_detect_empty_{}.txt", std::process::id()));
        fs::write(&path, "\n \n").unwrap();
        let result = ClassNames::from_file(&path);
        fs::remove_file(&path).unwrap();
        assert!(result.is_err());
    }

    #[test]
    fn test_from_spec_coco_case_insensitive() {
        assert_eq!(ClassNames::from_spec("COCO").unwrap(), ClassNames::coco());
    }
}

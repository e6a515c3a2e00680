// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Error types for the detection pipeline.

use std::fmt;

/// Result type alias for detection operations.
pub type Result<T> = std::result::Result<T, DetectError>;

/// Main error type for the detection pipeline.
#[derive(Debug)]
pub enum DetectError {
    /// Invalid configuration or command-line argument.
    ConfigError(String),
    /// Model file missing, corrupt, or incompatible with the execution provider.
    ModelLoadError(String),
    /// The inference session failed to run.
    InferenceError(String),
    /// An input image or buffer does not have the expected shape.
    ShapeError(String),
    /// The raw output tensor violates the `4 + num_classes` attribute contract.
    ShapeMismatch {
        /// Number of attributes the decoder expected (`4 + num_classes`).
        expected_attributes: usize,
        /// Shape reported by the session.
        shape: Vec<usize>,
        /// Flat length of the output buffer.
        len: usize,
    },
    /// Image file could not be read or decoded.
    ImageDecodeError(String),
    /// Visualizer error.
    VisualizerError(String),
    /// Wrapped `std::io::Error`.
    Io(std::io::Error),
}

impl fmt::Display for DetectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigError(msg) => write!(f, "Config error: {msg}"),
            Self::ModelLoadError(msg) => write!(f, "Model load error: {msg}"),
            Self::InferenceError(msg) => write!(f, "Inference error: {msg}"),
            Self::ShapeError(msg) => write!(f, "Shape error: {msg}"),
            Self::ShapeMismatch {
                expected_attributes,
                shape,
                len,
            } => write!(
                f,
                "Shape mismatch: expected output [1, {expected_attributes}, N], got {shape:?} ({len} values)"
            ),
            Self::ImageDecodeError(msg) => write!(f, "Image decode error: {msg}"),
            Self::VisualizerError(msg) => write!(f, "Visualizer error: {msg}"),
            Self::Io(err) => write!(f, "IO error: {err}"),
        }
    }
}

impl std::error::Error for DetectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DetectError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<image::ImageError> for DetectError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageDecodeError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for DetectError {
    fn from(err: ndarray::ShapeError) -> Self {
        Self::ShapeError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DetectError::ModelLoadError("test".to_string());
        assert_eq!(err.to_string(), "Model load error: test");

        let err = DetectError::ConfigError("test".to_string());
        assert_eq!(err.to_string(), "Config error: test");
    }

    #[test]
    fn test_shape_mismatch_display() {
        let err = DetectError::ShapeMismatch {
            expected_attributes: 84,
            shape: vec![1, 5, 8400],
            len: 42_000,
        };
        assert_eq!(
            err.to_string(),
            "Shape mismatch: expected output [1, 84, N], got [1, 5, 8400] (42000 values)"
        );
    }

    #[test]
    fn test_io_error_has_source() {
        use std::error::Error;

        let err = DetectError::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert!(err.source().is_some());
        assert!(DetectError::ShapeError("x".into()).source().is_none());
    }
}

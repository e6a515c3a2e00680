// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

#![allow(clippy::multiple_crate_versions)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! # YOLOv8 Detect
//!
//! YOLOv8 object detection over ONNX Runtime, with CPU, CUDA and `TensorRT`
//! execution providers.
//!
//! One call runs the whole pipeline for an image:
//!
//! 1. **Letterbox** - uniform scale and centered padding into the model input
//!    size ([`letterbox`]).
//! 2. **Encode** - HWC bytes to a `[1, 3, H, W]` float tensor in `[0, 1]`
//!    ([`preprocessing`]).
//! 3. **Infer** - any [`InferenceSession`]; [`OrtSession`] wraps ONNX Runtime.
//! 4. **Decode** - confidence filter, inverse letterbox and greedy NMS on the
//!    `[1, 4 + num_classes, N]` output ([`postprocessing`]).
//!
//! ## Features
//!
//! - `cuda` - CUDA execution provider
//! - `tensorrt` - `TensorRT` execution provider (engines cached on disk)
//! - `visualize` - result window for the CLI `--visual` flag
//!
//! ## Quick Start (Library)
//!
//! ```no_run
//! use yolov8_detect::{ClassNames, InferenceConfig, Runner};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = InferenceConfig::new()
//!         .with_confidence(0.5)
//!         .with_iou(0.5)
//!         .with_class_names(ClassNames::coco());
//!
//!     let mut runner = Runner::from_model("models/yolov8-detect.onnx", config)?;
//!     let image = image::open("street.jpg")?;
//!     let results = runner.infer_single_image(&image)?;
//!
//!     for det in &results.detections {
//!         let b = det.bbox;
//!         println!(
//!             "{} {:.2} at ({:.0}, {:.0}) {:.0}x{:.0}",
//!             runner.names().name(det.class_id),
//!             det.confidence,
//!             b.x,
//!             b.y,
//!             b.width,
//!             b.height
//!         );
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Custom Backends
//!
//! Implement [`InferenceSession`] to drive another engine, or a mock in tests,
//! and build the pipeline with [`Runner::new`].
//!
//! ## CLI Usage
//!
//! ```bash
//! # COCO model over a directory of images
//! yolov8-detect -img images/ --classes coco
//!
//! # Single-class model on TensorRT, annotated output in runs/trt
//! yolov8-detect -m models/helmet.onnx -img images/ --num-classes 1 --device tensorrt:0 -save runs/trt
//! ```
//!
//! Annotated images and a `<name>.json` file per image are written to the save
//! path (default `output`).

// Modules
pub mod annotate;
pub mod cli;
pub mod device;
pub mod error;
pub mod inference;
pub mod labels;
pub mod letterbox;
pub mod postprocessing;
pub mod preprocessing;
pub mod results;
pub mod runner;
pub mod session;
pub mod utils;
pub mod visualizer;

// Re-export main types for convenience
pub use device::Device;
pub use error::{DetectError, Result};
pub use inference::{DEFAULT_IMGSZ, InferenceConfig};
pub use labels::{COCO_CLASSES, ClassNames};
pub use letterbox::{LETTERBOX_COLOR, LetterboxBuffers, LetterboxContext};
pub use postprocessing::{DecodeParams, decode, decode_with_scratch};
pub use preprocessing::TensorEncoder;
pub use results::{BoundingBox, Detection, Results, Speed};
pub use runner::Runner;
pub use session::{InferenceSession, OrtSession, OutputView};
pub use utils::NmsMode;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(VERSION.contains('.'));
    }

    #[test]
    fn test_name() {
        assert_eq!(NAME, "yolov8-detect");
    }
}

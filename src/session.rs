// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Inference session abstraction and its ONNX Runtime realization.
//!
//! The pipeline treats the network as a black box: a `[1, 3, H, W]` float
//! tensor goes in, a single float tensor comes out. [`InferenceSession`] is the
//! seam, [`OrtSession`] drives ONNX Runtime on the CPU, CUDA or `TensorRT`
//! execution provider.

use std::path::Path;

use ndarray::{ArrayView4, CowArray};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{TensorRef, ValueType};

use crate::device::Device;
use crate::error::{DetectError, Result};

/// Borrowed view of a raw output tensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputView<'a> {
    /// Flat row-major data.
    pub data: &'a [f32],
    /// Tensor shape.
    pub shape: &'a [usize],
}

impl<'a> OutputView<'a> {
    /// Wrap a data buffer and its shape.
    #[must_use]
    pub const fn new(data: &'a [f32], shape: &'a [usize]) -> Self {
        Self { data, shape }
    }
}

/// A loaded network that maps one input tensor to one output tensor.
pub trait InferenceSession {
    /// Run the network on a flat CHW tensor of the given `[1, C, H, W]` shape.
    ///
    /// The returned view borrows session-owned storage and is valid until the
    /// next call.
    ///
    /// # Errors
    ///
    /// Returns [`DetectError::InferenceError`] if the backend fails, or
    /// [`DetectError::ShapeError`] if `input` does not match `shape`.
    fn run(&mut self, input: &[f32], shape: [usize; 4]) -> Result<OutputView<'_>>;

    /// Static spatial input size `(height, width)` the network was exported
    /// with, or `None` when it accepts any size.
    fn input_size(&self) -> Option<(usize, usize)> {
        None
    }

    /// Human-readable backend name for logs.
    fn name(&self) -> String;
}

/// ONNX Runtime session.
///
/// Owns the underlying `ort` session exclusively; it is released once, when
/// this value is dropped.
pub struct OrtSession {
    session: Session,
    input_name: String,
    output_name: String,
    device: Device,
    input_size: Option<(usize, usize)>,
    output: Vec<f32>,
    output_shape: Vec<usize>,
}

impl std::fmt::Debug for OrtSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrtSession")
            .field("input_name", &self.input_name)
            .field("output_name", &self.output_name)
            .field("device", &self.device)
            .field("input_size", &self.input_size)
            .finish_non_exhaustive()
    }
}

impl OrtSession {
    /// Load an ONNX model onto `device`.
    ///
    /// A requested GPU provider that fails to register aborts the load instead
    /// of silently falling back to the CPU.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the `.onnx` file.
    /// * `device` - Execution backend.
    /// * `num_threads` - Intra-op thread count, `0` lets ONNX Runtime decide.
    ///
    /// # Errors
    ///
    /// Returns [`DetectError::ModelLoadError`] if the file is missing, cannot be
    /// parsed, or the execution provider is unavailable.
    pub fn load<P: AsRef<Path>>(path: P, device: Device, num_threads: usize) -> Result<Self> {
        let path = path.as_ref();

        if !path.is_file() {
            return Err(DetectError::ModelLoadError(format!(
                "Model file not found: {}",
                path.display()
            )));
        }

        if !device.is_available() {
            return Err(DetectError::ModelLoadError(format!(
                "Device {device} requires building with --features {}",
                device.feature().unwrap_or_default()
            )));
        }

        let builder = Session::builder()
            .map_err(|e| DetectError::ModelLoadError(format!("Failed to create session builder: {e}")))?;
        let builder = register_execution_provider(builder, device)?;

        let session = builder
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| DetectError::ModelLoadError(format!("Failed to set optimization level: {e}")))?
            .with_intra_threads(num_threads)
            .map_err(|e| DetectError::ModelLoadError(format!("Failed to set intra-thread count: {e}")))?
            .commit_from_file(path)
            .map_err(|e| DetectError::ModelLoadError(format!("Failed to load model: {e}")))?;

        let input = session
            .inputs
            .first()
            .ok_or_else(|| DetectError::ModelLoadError("Model has no inputs".to_string()))?;
        let input_name = input.name.clone();
        let input_size = match &input.input_type {
            ValueType::Tensor { shape, .. } => {
                let dims: Vec<i64> = shape.iter().copied().collect();
                static_input_size(&dims)?
            }
            other => {
                return Err(DetectError::ModelLoadError(format!(
                    "Model input '{input_name}' is not a tensor: {other:?}"
                )));
            }
        };
        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| DetectError::ModelLoadError("Model has no outputs".to_string()))?;

        Ok(Self {
            session,
            input_name,
            output_name,
            device,
            input_size,
            output: Vec::new(),
            output_shape: Vec::new(),
        })
    }

    /// Execution backend this session runs on.
    #[must_use]
    pub const fn device(&self) -> Device {
        self.device
    }
}

/// Spatial size of an NCHW input shape, `None` if height or width is dynamic.
///
/// # Errors
///
/// Returns [`DetectError::ModelLoadError`] if the input is not a 3-channel
/// rank-4 tensor with batch 1 (or a dynamic batch).
fn static_input_size(dims: &[i64]) -> Result<Option<(usize, usize)>> {
    // Negative dimensions are dynamic
    let &[1 | ..=-1, 3 | ..=-1, height, width] = dims else {
        return Err(DetectError::ModelLoadError(format!(
            "Expected a [1, 3, H, W] model input, got {dims:?}"
        )));
    };
    match (usize::try_from(height), usize::try_from(width)) {
        (Ok(h), Ok(w)) if h > 0 && w > 0 => Ok(Some((h, w))),
        _ => Ok(None),
    }
}

/// Attach the execution provider for `device` to the builder.
#[allow(clippy::unnecessary_wraps)]
fn register_execution_provider(
    builder: ort::session::builder::SessionBuilder,
    device: Device,
) -> Result<ort::session::builder::SessionBuilder> {
    match device {
        Device::Cpu => Ok(builder),
        #[cfg(feature = "cuda")]
        Device::Cuda(index) => {
            use ort::execution_providers::CUDAExecutionProvider;

            builder
                .with_execution_providers([CUDAExecutionProvider::default()
                    .with_device_id(device_id(index)?)
                    .build()
                    .error_on_failure()])
                .map_err(|e| DetectError::ModelLoadError(format!("Failed to register CUDA EP: {e}")))
        }
        #[cfg(feature = "tensorrt")]
        Device::TensorRt(index) => {
            use ort::execution_providers::TensorRTExecutionProvider;

            builder
                .with_execution_providers([TensorRTExecutionProvider::default()
                    .with_device_id(device_id(index)?)
                    .with_engine_cache(true)
                    .with_engine_cache_path(std::env::temp_dir().join("yolov8-detect-trt").to_string_lossy())
                    .build()
                    .error_on_failure()])
                .map_err(|e| DetectError::ModelLoadError(format!("Failed to register TensorRT EP: {e}")))
        }
        #[allow(unreachable_patterns)]
        other => Err(DetectError::ModelLoadError(format!(
            "Device {other} is not compiled into this build"
        ))),
    }
}

#[cfg(any(feature = "cuda", feature = "tensorrt"))]
fn device_id(index: usize) -> Result<i32> {
    i32::try_from(index).map_err(|_| DetectError::ModelLoadError(format!("Invalid device index: {index}")))
}

impl InferenceSession for OrtSession {
    fn run(&mut self, input: &[f32], shape: [usize; 4]) -> Result<OutputView<'_>> {
        let view = ArrayView4::from_shape(shape, input)?;
        let input_contiguous = CowArray::from(view);

        let input_tensor = TensorRef::from_array_view(&input_contiguous)
            .map_err(|e| DetectError::InferenceError(format!("Failed to create input tensor: {e}")))?;
        let inputs = ort::inputs![&self.input_name => input_tensor];

        let outputs = self
            .session
            .run(inputs)
            .map_err(|e| DetectError::InferenceError(format!("Inference failed: {e}")))?;

        let output = outputs
            .get(self.output_name.as_str())
            .ok_or_else(|| DetectError::InferenceError(format!("Output '{}' not found", self.output_name)))?;

        let (out_shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| DetectError::InferenceError(format!("Failed to extract output: {e}")))?;

        self.output_shape.clear();
        for &dim in out_shape.iter() {
            let dim = usize::try_from(dim)
                .map_err(|_| DetectError::InferenceError(format!("Dynamic output dimension: {dim}")))?;
            self.output_shape.push(dim);
        }
        self.output.clear();
        self.output.extend_from_slice(data);

        Ok(OutputView::new(&self.output, &self.output_shape))
    }

    fn input_size(&self) -> Option<(usize, usize)> {
        self.input_size
    }

    fn name(&self) -> String {
        format!("onnxruntime:{}", self.device)
    }
}

// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Execution backends for the ONNX Runtime session.
use std::fmt;
use std::str::FromStr;

/// Hardware backend used to run the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Device {
    /// ONNX Runtime default CPU provider.
    #[default]
    Cpu,
    /// CUDA execution provider on the given GPU index.
    Cuda(usize),
    /// `TensorRT` execution provider on the given GPU index.
    TensorRt(usize),
}

impl Device {
    /// Whether this device runs on a GPU.
    #[must_use]
    pub const fn is_gpu(&self) -> bool {
        matches!(self, Self::Cuda(_) | Self::TensorRt(_))
    }

    /// Whether support for this device was compiled in.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        match self {
            Self::Cpu => true,
            Self::Cuda(_) => cfg!(feature = "cuda"),
            Self::TensorRt(_) => cfg!(feature = "tensorrt"),
        }
    }

    /// Cargo feature that enables this device, if any.
    #[must_use]
    pub const fn feature(&self) -> Option<&'static str> {
        match self {
            Self::Cpu => None,
            Self::Cuda(_) => Some("cuda"),
            Self::TensorRt(_) => Some("tensorrt"),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            Self::Cuda(i) => write!(f, "cuda:{i}"),
            Self::TensorRt(i) => write!(f, "tensorrt:{i}"),
        }
    }
}

impl FromStr for Device {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        if s == "cpu" {
            return Ok(Self::Cpu);
        }
        if let Some(rest) = s.strip_prefix("cuda") {
            return parse_device_index(rest).map(Self::Cuda).ok_or_else(|| format!("Invalid device index: {s}"));
        }
        if let Some(rest) = s.strip_prefix("tensorrt").or_else(|| s.strip_prefix("trt")) {
            return parse_device_index(rest)
                .map(Self::TensorRt)
                .ok_or_else(|| format!("Invalid device index: {s}"));
        }
        Err(format!("Unknown device: {s} (expected cpu, cuda[:N] or tensorrt[:N])"))
    }
}

/// Parse the `":N"` suffix of a device string; an empty suffix means index 0.
fn parse_device_index(s: &str) -> Option<usize> {
    if s.is_empty() {
        return Some(0);
    }
    s.strip_prefix(':').and_then(|index| index.parse::<usize>().ok())
}

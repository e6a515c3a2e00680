// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::path::PathBuf;

use clap::Parser;

use crate::device::Device;

/// Default model location.
pub const DEFAULT_MODEL: &str = "models/yolov8-detect.onnx";

/// Single-dash spellings accepted for compatibility, with their long form.
const LEGACY_FLAGS: [(&str, &str); 4] = [
    ("-conf", "--conf-threshold"),
    ("-nms", "--nms-threshold"),
    ("-img", "--image-dir"),
    ("-save", "--save-path"),
];

/// CLI arguments parser.
#[derive(Parser, Debug)]
#[command(name = "yolov8-detect", version, about, long_about = None)]
#[command(after_help = r"Examples:
    yolov8-detect -img images/ --classes coco
    yolov8-detect -m models/yolov8n.onnx -img street.jpg --classes coco -conf 0.25 -nms 0.45
    yolov8-detect -img images/ --num-classes 1 --device tensorrt:0 -save runs/trt
    yolov8-detect -img images/ --classes names.txt -v")]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Path to the ONNX model file
    #[arg(short = 'm', long = "model-path", default_value = DEFAULT_MODEL)]
    pub model_path: PathBuf,

    /// Confidence threshold (also -conf)
    #[arg(long = "conf-threshold", default_value_t = 0.5)]
    pub conf_threshold: f32,

    /// `IoU` threshold for NMS (also -nms)
    #[arg(long = "nms-threshold", default_value_t = 0.5)]
    pub nms_threshold: f32,

    /// Image file or directory of .jpg/.jpeg/.png images (also -img)
    #[arg(long = "image-dir", visible_alias = "image-path")]
    pub image_dir: PathBuf,

    /// Directory for annotated images and JSON detections (also -save)
    #[arg(long = "save-path", default_value = "output")]
    pub save_path: PathBuf,

    /// Show each result in a window until a key is pressed
    #[arg(short = 'v', long = "visual")]
    pub visual: bool,

    /// Use the CUDA execution provider (same as --device cuda:0)
    #[arg(long, conflicts_with = "device")]
    pub cuda: bool,

    /// Execution backend: cpu, cuda[:N] or tensorrt[:N]
    #[arg(long)]
    pub device: Option<Device>,

    /// Number of classes the model predicts
    #[arg(long = "num-classes")]
    pub num_classes: Option<usize>,

    /// Class names: `coco` or a file with one name per line
    #[arg(long)]
    pub classes: Option<String>,

    /// Model input size (square) [default: the model's input size, else 640]
    #[arg(long)]
    pub imgsz: Option<usize>,

    /// Intra-op threads [default: min(4, cores)]
    #[arg(long)]
    pub threads: Option<usize>,

    /// Maximum detections per image
    #[arg(long = "max-det", default_value_t = 300)]
    pub max_det: usize,

    /// Letterbox padding color as R,G,B
    #[arg(long = "pad-color", value_parser = parse_color, default_value = "114,114,114")]
    pub pad_color: [u8; 3],

    /// Only suppress overlapping boxes of the same class
    #[arg(long = "per-class-nms")]
    pub per_class_nms: bool,

    /// TTF/OTF font for labels
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// Only print warnings and errors
    #[arg(short = 'q', long)]
    pub quiet: bool,
}

impl Cli {
    /// Device selected by `--device` or `--cuda`.
    #[must_use]
    pub fn selected_device(&self) -> Device {
        match (self.device, self.cuda) {
            (Some(device), _) => device,
            (None, true) => Device::Cuda(0),
            (None, false) => Device::Cpu,
        }
    }
}

/// Rewrite legacy single-dash flags (`-conf 0.6`, `-img=dir`) to their long form.
pub fn normalize_args<I, T>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = T>,
    T: Into<String>,
{
    args.into_iter()
        .map(Into::into)
        .map(|arg| {
            let (flag, value) = match arg.split_once('=') {
                Some((flag, value)) => (flag.to_string(), Some(value.to_string())),
                None => (arg.clone(), None),
            };
            LEGACY_FLAGS
                .iter()
                .find(|(legacy, _)| *legacy == flag)
                .map_or(arg, |(_, long)| match value {
                    Some(value) => format!("{long}={value}"),
                    None => (*long).to_string(),
                })
        })
        .collect()
}

fn parse_color(s: &str) -> Result<[u8; 3], String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    let [r, g, b] = parts.as_slice() else {
        return Err(format!("expected R,G,B, got '{s}'"));
    };
    let channel = |v: &str| v.parse::<u8>().map_err(|e| format!("invalid color channel '{v}': {e}"));
    Ok([channel(*r)?, channel(*g)?, channel(*b)?])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(normalize_args(args.iter().copied()))
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&["app", "--image-dir", "images"]).unwrap();
        assert_eq!(cli.model_path, PathBuf::from(DEFAULT_MODEL));
        assert!((cli.conf_threshold - 0.5).abs() < f32::EPSILON);
        assert!((cli.nms_threshold - 0.5).abs() < f32::EPSILON);
        assert_eq!(cli.save_path, PathBuf::from("output"));
        assert_eq!(cli.imgsz, None);
        assert_eq!(cli.max_det, 300);
        assert_eq!(cli.pad_color, [114, 114, 114]);
        assert!(!cli.visual);
        assert_eq!(cli.selected_device(), Device::Cpu);
    }

    #[test]
    fn test_legacy_flags() {
        let cli = parse(&[
            "app", "-m", "m.onnx", "-conf", "0.6", "-nms=0.45", "-img", "pics", "-save", "out", "-v", "--cuda",
        ])
        .unwrap();
        assert_eq!(cli.model_path, PathBuf::from("m.onnx"));
        assert!((cli.conf_threshold - 0.6).abs() < f32::EPSILON);
        assert!((cli.nms_threshold - 0.45).abs() < f32::EPSILON);
        assert_eq!(cli.image_dir, PathBuf::from("pics"));
        assert_eq!(cli.save_path, PathBuf::from("out"));
        assert!(cli.visual);
        assert_eq!(cli.selected_device(), Device::Cuda(0));
    }

    #[test]
    fn test_image_path_alias_and_device() {
        let cli = parse(&["app", "--image-path", "a.jpg", "--device", "tensorrt:1", "--pad-color", "0, 0, 0"]).unwrap();
        assert_eq!(cli.image_dir, PathBuf::from("a.jpg"));
        assert_eq!(cli.selected_device(), Device::TensorRt(1));
        assert_eq!(cli.pad_color, [0, 0, 0]);
    }

    #[test]
    fn test_errors() {
        assert!(parse(&["app"]).is_err());
        assert!(parse(&["app", "-img", "x", "--bogus"]).is_err());
        assert!(parse(&["app", "-img", "x", "--device", "mps"]).is_err());
        assert!(parse(&["app", "-img", "x", "--pad-color", "1,2"]).is_err());
        assert!(parse(&["app", "-img", "x", "--cuda", "--device", "cpu"]).is_err());
    }

    #[test]
    fn test_normalize_args() {
        let args = normalize_args(["app", "-img", "-conf"]);
        assert_eq!(args, vec!["app", "--image-dir", "--conf-threshold"]);
        let args = normalize_args(["app", "--classes", "coco", "-v"]);
        assert_eq!(args, vec!["app", "--classes", "coco", "-v"]);
    }
}

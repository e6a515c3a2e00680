// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

#![allow(clippy::cast_precision_loss)]

use std::fs;
use std::path::{Path, PathBuf};

use crate::annotate::Annotator;
use crate::cli::args::Cli;
use crate::cli::logging::set_verbose;
use crate::device::Device;
use crate::error::{DetectError, Result};
use crate::inference::InferenceConfig;
use crate::labels::ClassNames;
use crate::results::Results;
use crate::runner::Runner;
use crate::session::OrtSession;
use crate::utils::NmsMode;
use crate::{VERSION, error, info, success, verbose, warn};

/// Image extensions picked up from a directory.
const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Whether `path` has a supported image extension (case-insensitive).
#[must_use]
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
}

/// Expand the `--image-dir` argument into image paths.
///
/// A file is returned as-is; a directory yields its supported images, sorted.
///
/// # Errors
///
/// Returns [`DetectError::ConfigError`] if the path does not exist or holds no
/// images, and [`DetectError::Io`] if the directory cannot be listed.
pub fn collect_images(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        return Err(DetectError::ConfigError(format!(
            "Image path does not exist: {}",
            path.display()
        )));
    }

    let mut images = Vec::new();
    for entry in fs::read_dir(path)? {
        let entry_path = entry?.path();
        if entry_path.is_file() && is_image_file(&entry_path) {
            images.push(entry_path);
        }
    }
    images.sort();

    if images.is_empty() {
        return Err(DetectError::ConfigError(format!(
            "No .jpg, .jpeg or .png images found in {}",
            path.display()
        )));
    }
    Ok(images)
}

/// Build the inference configuration from parsed arguments.
///
/// # Errors
///
/// Returns [`DetectError::ConfigError`] if the class list cannot be loaded.
pub fn build_config(args: &Cli) -> Result<InferenceConfig> {
    let mut device = args.selected_device();
    if !device.is_available() {
        warn!(
            "{device} support is not compiled in (build with --features {}). Falling back to CPU.",
            device.feature().unwrap_or_default()
        );
        device = Device::Cpu;
    }

    let mut config = InferenceConfig::new()
        .with_confidence(args.conf_threshold)
        .with_iou(args.nms_threshold)
        .with_max_detections(args.max_det)
        .with_pad_color(args.pad_color)
        .with_device(device)
        .with_nms_mode(if args.per_class_nms {
            NmsMode::PerClass
        } else {
            NmsMode::ClassAgnostic
        });

    if let Some(size) = args.imgsz {
        config = config.with_imgsz(size, size);
    }
    if let Some(threads) = args.threads {
        config = config.with_threads(threads);
    }
    if let Some(n) = args.num_classes {
        config = config.with_num_classes(n);
    }
    if let Some(spec) = &args.classes {
        config = config.with_class_names(ClassNames::from_spec(spec)?);
    }
    if config.num_classes.is_none() && config.class_names.is_none() {
        return Err(DetectError::ConfigError(
            "the model's class count is required: pass --num-classes <N> or --classes <coco|FILE>".to_string(),
        ));
    }

    config.validate()?;
    Ok(config)
}

/// Per-run accumulated timings.
#[derive(Debug, Default)]
struct Totals {
    images: usize,
    failures: usize,
    preprocess: f64,
    inference: f64,
    postprocess: f64,
}

impl Totals {
    fn add(&mut self, results: &Results) {
        self.images += 1;
        self.preprocess += results.speed.preprocess.unwrap_or(0.0);
        self.inference += results.speed.inference.unwrap_or(0.0);
        self.postprocess += results.speed.postprocess.unwrap_or(0.0);
    }
}

/// Run detection over every input image.
///
/// Per-image failures are logged and skipped.
///
/// # Errors
///
/// Returns an error for invalid arguments, missing inputs, a model that cannot
/// be loaded, or an output directory that cannot be created.
pub fn run_prediction(args: &Cli) -> Result<()> {
    if args.quiet {
        set_verbose(false);
    }

    let config = build_config(args)?;
    let images = collect_images(&args.image_dir)?;

    info!("yolov8-detect {VERSION} on {}", config.device);
    let mut runner = Runner::from_model(&args.model_path, config)?;
    if let Err(e) = runner.warmup() {
        warn!("Warmup failed: {e}");
    }

    let annotator = match &args.font {
        Some(font) => Annotator::with_font_file(font)?,
        None => Annotator::new(),
    };
    if !annotator.has_font() {
        warn!("No font found, labels are drawn without text. Use --font <FILE> to set one.");
    }

    fs::create_dir_all(&args.save_path)?;

    let mut window = ResultWindow::new(args.visual);
    let mut totals = Totals::default();
    let count = images.len();

    for (i, path) in images.iter().enumerate() {
        match process_image(&mut runner, &annotator, path, &args.save_path, &mut window) {
            Ok(results) => {
                info!(
                    "image {}/{count} {}: {}x{} {}, {:.1}ms",
                    i + 1,
                    path.display(),
                    results.inference_shape.0,
                    results.inference_shape.1,
                    results.verbose(runner.names()),
                    results.speed.inference.unwrap_or(0.0)
                );
                for det in &results.detections {
                    verbose!(
                        "    {} {:.2} [{:.1}, {:.1}, {:.1}, {:.1}]",
                        runner.names().name(det.class_id),
                        det.confidence,
                        det.bbox.x,
                        det.bbox.y,
                        det.bbox.width,
                        det.bbox.height
                    );
                }
                totals.add(&results);
            }
            Err(e) => {
                error!("{}: {e}", path.display());
                totals.failures += 1;
            }
        }
    }

    let n = totals.images.max(1) as f64;
    let (height, width) = runner.input_size();
    info!(
        "Speed: {:.1}ms preprocess, {:.1}ms inference, {:.1}ms postprocess per image at shape (1, 3, {height}, {width})",
        totals.preprocess / n,
        totals.inference / n,
        totals.postprocess / n,
    );
    if totals.failures > 0 {
        warn!("{} of {count} images failed", totals.failures);
    }
    success!("Results saved to {}", args.save_path.display());

    Ok(())
}

/// Detect, annotate, save and optionally display one image.
fn process_image(
    runner: &mut Runner<OrtSession>,
    annotator: &Annotator,
    path: &Path,
    save_dir: &Path,
    window: &mut ResultWindow,
) -> Result<Results> {
    let image = image::open(path)
        .map_err(|e| DetectError::ImageDecodeError(format!("Failed to load image {}: {e}", path.display())))?;
    let results = runner.infer_single_image(&image)?;
    let annotated = annotator.annotate(&image, &results, runner.names());

    let file_name = path.file_name().map_or_else(|| "image.jpg".into(), |n| n.to_os_string());
    annotated
        .save(save_dir.join(&file_name))
        .map_err(|e| DetectError::Io(std::io::Error::other(e)))?;

    let mut json_name = path.file_stem().map_or_else(|| "image".into(), |s| s.to_os_string());
    json_name.push(".json");
    let json = results
        .to_json(runner.names())
        .map_err(|e| DetectError::Io(std::io::Error::other(e)))?;
    fs::write(save_dir.join(json_name), json)?;

    window.show(&annotated);
    Ok(results)
}

/// Optional result window.
struct ResultWindow {
    #[cfg(feature = "visualize")]
    viewer: Option<crate::visualizer::Viewer>,
    #[cfg_attr(not(feature = "visualize"), allow(dead_code))]
    enabled: bool,
}

impl ResultWindow {
    fn new(enabled: bool) -> Self {
        #[cfg(not(feature = "visualize"))]
        if enabled {
            warn!("--visual requires the 'visualize' feature. Compile with --features visualize to enable it.");
        }
        Self {
            #[cfg(feature = "visualize")]
            viewer: None,
            enabled: enabled && cfg!(feature = "visualize"),
        }
    }

    /// Show `image` and wait for a key; `Esc`, `Q` or closing the window turns the display off.
    #[cfg(feature = "visualize")]
    fn show(&mut self, image: &image::RgbImage) {
        if !self.enabled {
            return;
        }
        if self.viewer.is_none() {
            match crate::visualizer::Viewer::new("yolov8-detect", image.width() as usize, image.height() as usize) {
                Ok(viewer) => self.viewer = Some(viewer),
                Err(e) => {
                    warn!("{e}");
                    self.enabled = false;
                    return;
                }
            }
        }
        if let Some(viewer) = &mut self.viewer {
            let keep_going = viewer.show(image).and_then(|()| viewer.wait_for_key());
            match keep_going {
                Ok(true) => {}
                Ok(false) => {
                    self.enabled = false;
                    self.viewer = None;
                }
                Err(e) => {
                    warn!("{e}");
                    self.enabled = false;
                    self.viewer = None;
                }
            }
        }
    }

    #[cfg(not(feature = "visualize"))]
    fn show(&mut self, _image: &image::RgbImage) {
        self.enabled = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("yolov8_detect_{name}_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_is_image_file() {
        assert!(is_image_file(Path::new("a.jpg")));
        assert!(is_image_file(Path::new("a.JPEG")));
        assert!(is_image_file(Path::new("dir/a.png")));
        assert!(!is_image_file(Path::new("a.bmp")));
        assert!(!is_image_file(Path::new("jpg")));
    }

    #[test]
    fn test_collect_images_sorted_and_filtered() {
        let dir = temp_dir("collect");
        for name in ["b.png", "a.jpg", "c.txt", "d.JPEG"] {
            fs::write(dir.join(name), b"x").unwrap();
        }
        fs::create_dir(dir.join("sub.jpg")).unwrap();

        let images = collect_images(&dir).unwrap();
        let names: Vec<_> = images
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        fs::remove_dir_all(&dir).unwrap();

        assert_eq!(names, vec!["a.jpg", "b.png", "d.JPEG"]);
    }

    #[test]
    fn test_collect_images_errors() {
        assert!(matches!(
            collect_images(Path::new("/nonexistent/images")),
            Err(DetectError::ConfigError(_))
        ));

        let dir = temp_dir("empty");
        let result = collect_images(&dir);
        fs::remove_dir_all(&dir).unwrap();
        assert!(matches!(result, Err(DetectError::ConfigError(_))));
    }

    #[test]
    fn test_build_config() {
        let cli = Cli::parse_from(["app", "--image-dir", "x", "--classes", "coco", "--per-class-nms", "--imgsz", "320"]);
        let config = build_config(&cli).unwrap();
        assert_eq!(config.resolve_classes().unwrap().len(), 80);
        assert_eq!(config.nms_mode, NmsMode::PerClass);
        assert_eq!(config.imgsz, Some((320, 320)));
        assert_eq!(config.device, Device::Cpu);
    }

    #[test]
    fn test_build_config_requires_classes() {
        let cli = Cli::parse_from(["app", "--image-dir", "x"]);
        assert!(matches!(build_config(&cli), Err(DetectError::ConfigError(_))));

        let cli = Cli::parse_from(["app", "--image-dir", "x", "--num-classes", "1", "--classes", "coco"]);
        assert!(build_config(&cli).is_err());

        let cli = Cli::parse_from(["app", "--image-dir", "x", "--num-classes", "1", "--conf-threshold", "2"]);
        assert!(build_config(&cli).is_err());
    }
}

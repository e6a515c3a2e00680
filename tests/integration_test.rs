// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Integration tests for the detection pipeline

use image::{DynamicImage, Rgb, RgbImage};
use yolov8_detect::{
    ClassNames, DetectError, InferenceConfig, InferenceSession, LetterboxContext, NmsMode, OutputView, Result,
    Runner, TensorEncoder,
};

/// A session that replays scripted outputs, one per call, and records inputs.
#[derive(Debug, Default)]
struct ScriptedSession {
    outputs: Vec<(Vec<f32>, Vec<usize>)>,
    calls: usize,
    input_ptrs: Vec<usize>,
    last_input: Vec<f32>,
}

impl ScriptedSession {
    fn new(outputs: Vec<(Vec<f32>, Vec<usize>)>) -> Self {
        Self {
            outputs,
            ..Self::default()
        }
    }
}

impl InferenceSession for ScriptedSession {
    fn run(&mut self, input: &[f32], shape: [usize; 4]) -> Result<OutputView<'_>> {
        assert_eq!(input.len(), shape.iter().product::<usize>());
        self.input_ptrs.push(input.as_ptr() as usize);
        self.last_input = input.to_vec();

        let index = self.calls.min(self.outputs.len() - 1);
        self.calls += 1;
        let (data, shape) = &self.outputs[index];
        Ok(OutputView::new(data, shape))
    }

    fn name(&self) -> String {
        "scripted".to_string()
    }
}

/// Attribute-major output for `(cx, cy, w, h, scores)` candidates.
fn output<const NC: usize>(candidates: &[(f32, f32, f32, f32, [f32; NC])]) -> (Vec<f32>, Vec<usize>) {
    let n = candidates.len();
    let nc = NC;
    let mut data = vec![0.0; (4 + nc) * n];
    for (i, (cx, cy, w, h, scores)) in candidates.iter().enumerate() {
        for (a, v) in [cx, cy, w, h].into_iter().enumerate() {
            data[a * n + i] = *v;
        }
        for (c, s) in scores.iter().enumerate() {
            data[(4 + c) * n + i] = *s;
        }
    }
    (data, vec![1, 4 + nc, n])
}

fn image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([200, 100, 50])))
}

#[test]
fn test_letterboxed_detection_end_to_end() {
    let session = ScriptedSession::new(vec![output(&[(320.0, 320.0, 100.0, 80.0, [0.9])])]);
    let config = InferenceConfig::new().with_num_classes(1);
    let mut runner = Runner::new(session, config).unwrap();

    let results = runner.infer_single_image(&image(1280, 720)).unwrap();
    assert_eq!(results.len(), 1);
    let det = results.detections[0];
    assert_eq!(det.class_id, 0);
    assert!((det.bbox.x - 540.0).abs() < 1e-3);
    assert!((det.bbox.y - 280.0).abs() < 1e-3);
    assert!((det.bbox.width - 200.0).abs() < 1e-3);
    assert!((det.bbox.height - 160.0).abs() < 1e-3);
}

#[test]
fn test_multi_class_letterboxed_detection() {
    let session = ScriptedSession::new(vec![output(&[
        (320.0, 320.0, 100.0, 80.0, [0.05, 0.1, 0.95]),
        (100.0, 500.0, 20.0, 20.0, [0.2, 0.1, 0.3]),
    ])]);
    let mut runner = Runner::new(session, InferenceConfig::new().with_num_classes(3)).unwrap();

    let results = runner.infer_single_image(&image(1280, 720)).unwrap();
    assert_eq!(results.len(), 1);
    let det = results.detections[0];
    assert_eq!(det.class_id, 2);
    assert!((det.confidence - 0.95).abs() < 1e-6);
    assert!((det.bbox.x - 540.0).abs() < 1e-3);
    assert!((det.bbox.y - 280.0).abs() < 1e-3);
    assert!((det.bbox.width - 200.0).abs() < 1e-3);
    assert!((det.bbox.height - 160.0).abs() < 1e-3);
}

#[test]
fn test_same_class_overlap_suppressed() {
    // IoU 0.7 between the two boxes
    let session = ScriptedSession::new(vec![output(&[
        (100.0, 100.0, 170.0, 100.0, [0.9]),
        (130.0, 100.0, 170.0, 100.0, [0.85]),
    ])]);
    let config = InferenceConfig::new().with_num_classes(1).with_iou(0.5);
    let mut runner = Runner::new(session, config).unwrap();

    let results = runner.infer_single_image(&image(640, 640)).unwrap();
    assert_eq!(results.len(), 1);
    assert!((results.detections[0].confidence - 0.9).abs() < 1e-6);
}

#[test]
fn test_padding_rows_use_fill_color() {
    let session = ScriptedSession::new(vec![output(&[(0.0, 0.0, 1.0, 1.0, [0.0])])]);
    let config = InferenceConfig::new()
        .with_num_classes(1)
        .with_imgsz(64, 64)
        .with_pad_color([51, 51, 51]);
    let mut runner = Runner::new(session, config).unwrap();
    runner.infer_single_image(&image(128, 64)).unwrap();

    let input = &runner.session().last_input;
    // 128x64 -> 64x32, 16 rows of padding on top: first R value is padding
    assert!((input[0] - 0.2).abs() < 1e-6);
    // Row 32 is inside the image
    assert!((input[32 * 64 + 10] - 200.0 / 255.0).abs() < 0.01);
}

#[test]
fn test_scratch_buffer_reused_across_calls() {
    let session = ScriptedSession::new(vec![output(&[(10.0, 10.0, 5.0, 5.0, [0.9])])]);
    let mut runner = Runner::new(session, InferenceConfig::new().with_num_classes(1)).unwrap();

    for (w, h) in [(640, 480), (100, 900), (640, 640)] {
        runner.infer_single_image(&image(w, h)).unwrap();
    }
    let ptrs = &runner.session().input_ptrs;
    assert_eq!(ptrs.len(), 3);
    assert!(ptrs.iter().all(|&p| p == ptrs[0]));
}

#[test]
fn test_recovers_after_shape_mismatch() {
    let bad = (vec![0.0; 84 * 3], vec![1, 84, 3]);
    let good = output(&[(100.0, 100.0, 20.0, 20.0, [0.8])]);
    let session = ScriptedSession::new(vec![bad, good]);
    let mut runner = Runner::new(session, InferenceConfig::new().with_num_classes(1)).unwrap();

    let err = runner.infer_single_image(&image(640, 640)).unwrap_err();
    assert!(matches!(
        err,
        DetectError::ShapeMismatch {
            expected_attributes: 5,
            ..
        }
    ));

    let results = runner.infer_single_image(&image(640, 640)).unwrap();
    assert_eq!(results.len(), 1);
}

#[test]
fn test_class_agnostic_and_per_class_nms() {
    let candidates = output(&[
        (100.0, 100.0, 100.0, 100.0, [0.9, 0.0]),
        (110.0, 100.0, 100.0, 100.0, [0.0, 0.85]),
    ]);
    let classes = ClassNames::new(vec!["helmet".into(), "head".into()]);

    let global = Runner::new(
        ScriptedSession::new(vec![candidates.clone()]),
        InferenceConfig::new().with_class_names(classes.clone()),
    )
    .unwrap()
    .infer_single_image(&image(640, 640))
    .unwrap();
    assert_eq!(global.len(), 1);

    let mut per_class_runner = Runner::new(
        ScriptedSession::new(vec![candidates]),
        InferenceConfig::new()
            .with_class_names(classes)
            .with_nms_mode(NmsMode::PerClass),
    )
    .unwrap();
    let per_class = per_class_runner.infer_single_image(&image(640, 640)).unwrap();
    assert_eq!(per_class.len(), 2);
    assert_eq!(per_class.verbose(per_class_runner.names()), "1 helmet, 1 head");
}

#[test]
fn test_grayscale_input_accepted() {
    let session = ScriptedSession::new(vec![output(&[(10.0, 10.0, 5.0, 5.0, [0.1])])]);
    let mut runner = Runner::new(session, InferenceConfig::new().with_num_classes(1)).unwrap();
    let gray = DynamicImage::ImageLuma8(image::GrayImage::new(320, 240));
    assert!(runner.infer_single_image(&gray).unwrap().is_empty());
}

#[test]
fn test_encoder_matches_letterbox_canvas() {
    let ctx = LetterboxContext::compute(1920, 1080, 640, 640).unwrap();
    assert_eq!(ctx.pad_top + ctx.resized_height + ctx.pad_bottom, 640);
    assert_eq!(TensorEncoder::new(640, 640).shape(), [1, 3, 640, 640]);
}

#[test]
fn test_missing_class_count_is_a_config_error() {
    let session = ScriptedSession::new(vec![output(&[(0.0, 0.0, 1.0, 1.0, [0.0])])]);
    let err = Runner::new(session, InferenceConfig::new()).unwrap_err();
    assert!(matches!(err, DetectError::ConfigError(_)));
}

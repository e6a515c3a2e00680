// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Single-image detection driver.
//!
//! A [`Runner`] owns one inference session and the scratch buffers of the
//! pipeline. Each call to [`Runner::infer_single_image`] letterboxes, encodes,
//! runs and decodes one image.

use std::path::Path;
use std::time::Instant;

use image::DynamicImage;

use crate::error::{DetectError, Result};
use crate::info;
use crate::inference::InferenceConfig;
use crate::labels::ClassNames;
use crate::letterbox::LetterboxBuffers;
use crate::postprocessing::{CandidateBuffer, DecodeParams, decode_with_scratch};
use crate::preprocessing::{TensorEncoder, preprocess_into};
use crate::results::{Results, Speed};
use crate::session::{InferenceSession, OrtSession};

/// Buffers reused across calls.
#[derive(Debug, Default)]
struct Scratch {
    letterbox: LetterboxBuffers,
    input: Vec<f32>,
    candidates: CandidateBuffer,
}

impl Scratch {
    fn reset(&mut self) {
        self.input.clear();
        self.candidates.clear();
    }
}

/// Detection pipeline bound to one session.
///
/// Calls take `&mut self`, so one runner serves one caller at a time. Wrap it
/// in a `Mutex` or create one per worker for shared use.
#[derive(Debug)]
pub struct Runner<S: InferenceSession> {
    session: S,
    config: InferenceConfig,
    names: ClassNames,
    encoder: TensorEncoder,
    params: DecodeParams,
    scratch: Scratch,
}

impl Runner<OrtSession> {
    /// Load an ONNX model and build a runner for it.
    ///
    /// The input size is taken from the model when it declares a static one
    /// and the config leaves it unset.
    ///
    /// # Errors
    ///
    /// Returns [`DetectError::ConfigError`] for an invalid configuration or an
    /// image size the model does not accept, and
    /// [`DetectError::ModelLoadError`] if the session cannot be created.
    pub fn from_model<P: AsRef<Path>>(path: P, config: InferenceConfig) -> Result<Self> {
        config.validate()?;
        let path = path.as_ref();
        let session = OrtSession::load(path, config.device, config.num_threads)?;
        let runner = Self::new(session, config)?;
        let (height, width) = runner.input_size();
        info!(
            "Loaded model {} on {} ({width}x{height} input)",
            path.display(),
            runner.config.device
        );
        Ok(runner)
    }
}

impl<S: InferenceSession> Runner<S> {
    /// Build a runner around an already loaded session.
    ///
    /// The config's image size is resolved against
    /// [`InferenceSession::input_size`] and stored back as explicit.
    ///
    /// # Errors
    ///
    /// Returns [`DetectError::ConfigError`] for an invalid configuration or an
    /// image size that contradicts the session's static input size.
    pub fn new(session: S, mut config: InferenceConfig) -> Result<Self> {
        config.validate()?;
        let names = config.resolve_classes()?;
        let (height, width) = config.resolve_imgsz(session.input_size())?;
        config.imgsz = Some((height, width));
        let encoder = TensorEncoder::new(width, height);
        let params = config.decode_params(names.len());

        Ok(Self {
            session,
            config,
            names,
            encoder,
            params,
            scratch: Scratch {
                letterbox: LetterboxBuffers::new(),
                input: Vec::with_capacity(encoder.len()),
                candidates: Vec::new(),
            },
        })
    }

    /// Run the session once on a zero tensor.
    ///
    /// # Errors
    ///
    /// Returns the session error if the warmup run fails.
    pub fn warmup(&mut self) -> Result<()> {
        self.scratch.reset();
        self.scratch.input.resize(self.encoder.len(), 0.0);
        let start = Instant::now();
        self.session.run(&self.scratch.input, self.encoder.shape())?;
        info!(
            "Warmup on {} took {:.1}ms",
            self.session.name(),
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(())
    }

    /// Detect objects in one image.
    ///
    /// Failures affect only this call; the runner stays usable.
    ///
    /// # Errors
    ///
    /// * [`DetectError::ImageDecodeError`] for an empty image.
    /// * [`DetectError::InferenceError`] if the session fails.
    /// * [`DetectError::ShapeMismatch`] if the output does not fit the class count.
    pub fn infer_single_image(&mut self, image: &DynamicImage) -> Result<Results> {
        self.scratch.reset();

        let start_preprocess = Instant::now();
        let ctx = preprocess_into(
            image,
            &self.encoder,
            self.config.pad_color,
            &mut self.scratch.letterbox,
            &mut self.scratch.input,
        )?;
        let preprocess_time = elapsed_ms(start_preprocess);

        let start_inference = Instant::now();
        let output = self.session.run(&self.scratch.input, self.encoder.shape())?;
        let inference_time = elapsed_ms(start_inference);

        let start_postprocess = Instant::now();
        let detections = decode_with_scratch(&output, &ctx, &self.params, &mut self.scratch.candidates)?;
        let postprocess_time = elapsed_ms(start_postprocess);

        Ok(Results {
            detections,
            orig_shape: (image.height(), image.width()),
            inference_shape: (ctx.dest_height, ctx.dest_width),
            speed: Speed::new(preprocess_time, inference_time, postprocess_time),
        })
    }

    /// Open, decode and detect one image file.
    ///
    /// # Errors
    ///
    /// Returns [`DetectError::ImageDecodeError`] if the file cannot be read,
    /// otherwise see [`Self::infer_single_image`].
    pub fn infer_path<P: AsRef<Path>>(&mut self, path: P) -> Result<Results> {
        let path = path.as_ref();
        let image = image::open(path)
            .map_err(|e| DetectError::ImageDecodeError(format!("Failed to load image {}: {e}", path.display())))?;
        self.infer_single_image(&image)
    }

    /// Class names, index-aligned with detection class ids.
    #[must_use]
    pub const fn names(&self) -> &ClassNames {
        &self.names
    }

    /// Model input size `(height, width)`.
    #[must_use]
    pub const fn input_size(&self) -> (usize, usize) {
        let [_, _, height, width] = self.encoder.shape();
        (height, width)
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &InferenceConfig {
        &self.config
    }

    /// Underlying session.
    #[must_use]
    pub const fn session(&self) -> &S {
        &self.session
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

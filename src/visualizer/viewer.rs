// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Window for displaying annotated results.

use std::time::Duration;

use image::RgbImage;
use minifb::{Key, KeyRepeat, Window, WindowOptions};

use crate::error::{DetectError, Result};
use crate::visualizer::Color;

/// A simple image viewer using minifb.
pub struct Viewer {
    window: Window,
    width: usize,
    height: usize,
    buffer: Vec<u32>,
}

impl Viewer {
    /// Create a new viewer window.
    ///
    /// # Errors
    ///
    /// Returns [`DetectError::VisualizerError`] if the window cannot be opened.
    pub fn new(title: &str, width: usize, height: usize) -> Result<Self> {
        let mut window = Window::new(
            title,
            width,
            height,
            WindowOptions {
                resize: true,
                ..WindowOptions::default()
            },
        )
        .map_err(|e| DetectError::VisualizerError(format!("Failed to create window: {e}")))?;

        window.set_target_fps(60);

        Ok(Self {
            window,
            width,
            height,
            buffer: Vec::new(),
        })
    }

    /// Replace the displayed image.
    ///
    /// # Errors
    ///
    /// Returns [`DetectError::VisualizerError`] if the window update fails.
    pub fn show(&mut self, image: &RgbImage) -> Result<()> {
        self.width = image.width() as usize;
        self.height = image.height() as usize;

        self.buffer.clear();
        self.buffer
            .extend(image.pixels().map(|p| Color::new(p[0], p[1], p[2]).to_u32()));

        self.window
            .update_with_buffer(&self.buffer, self.width, self.height)
            .map_err(|e| DetectError::VisualizerError(format!("Failed to update window: {e}")))
    }

    /// Block until a key is pressed or the window is closed.
    ///
    /// Returns `false` when the user asked to stop (window closed, `Esc` or `Q`).
    ///
    /// # Errors
    ///
    /// Returns [`DetectError::VisualizerError`] if the window update fails.
    pub fn wait_for_key(&mut self) -> Result<bool> {
        loop {
            if !self.window.is_open() {
                return Ok(false);
            }
            let keys = self.window.get_keys_pressed(KeyRepeat::No);
            if keys.iter().any(|k| matches!(k, Key::Escape | Key::Q)) {
                return Ok(false);
            }
            if !keys.is_empty() {
                return Ok(true);
            }
            if self.buffer.is_empty() {
                self.window.update();
                std::thread::sleep(Duration::from_millis(16));
            } else {
                self.window
                    .update_with_buffer(&self.buffer, self.width, self.height)
                    .map_err(|e| DetectError::VisualizerError(format!("Failed to update window: {e}")))?;
            }
        }
    }
}

//! Frame preprocessing for the video classifier.
//!
//! The trained model expects each frame resized to 171x128, center-cropped
//! to 112x112, and normalized per channel with the Kinetics constants. The
//! resize/crop/normalize chain and its constants are load-bearing: changing
//! any of them silently breaks compatibility with the trained weights.

use anyhow::{anyhow, Result};
use image::imageops::{self, FilterType};
use image::RgbImage;

use crate::frame::Frame;

/// Intermediate resize width before the center crop.
pub const RESIZE_WIDTH: u32 = 171;
/// Intermediate resize height before the center crop.
pub const RESIZE_HEIGHT: u32 = 128;
/// Side length of the square model input.
pub const CROP_SIZE: u32 = 112;

/// Per-channel normalization mean (RGB order).
pub const CHANNEL_MEAN: [f32; 3] = [0.43216, 0.394666, 0.37645];
/// Per-channel normalization standard deviation (RGB order).
pub const CHANNEL_STD: [f32; 3] = [0.22803, 0.22145, 0.216989];

/// A normalized model-input frame: 3 x 112 x 112 f32 values in CHW layout.
#[derive(Clone, Debug)]
pub struct PreprocessedFrame {
    data: Vec<f32>,
}

impl PreprocessedFrame {
    /// Number of f32 values per preprocessed frame.
    pub const LEN: usize = 3 * (CROP_SIZE as usize) * (CROP_SIZE as usize);

    /// Normalized values in CHW layout.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Value at (channel, y, x).
    pub fn at(&self, channel: usize, y: usize, x: usize) -> f32 {
        let side = CROP_SIZE as usize;
        self.data[channel * side * side + y * side + x]
    }
}

/// Resize + center-crop + normalize, a deterministic pure function of the
/// input frame.
#[derive(Clone, Copy, Debug, Default)]
pub struct Preprocessor;

impl Preprocessor {
    pub fn new() -> Self {
        Self
    }

    pub fn apply(&self, frame: &Frame) -> Result<PreprocessedFrame> {
        let image = RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
            .ok_or_else(|| anyhow!("frame buffer does not match its dimensions"))?;

        let resized = imageops::resize(&image, RESIZE_WIDTH, RESIZE_HEIGHT, FilterType::Triangle);
        let crop_x = (RESIZE_WIDTH - CROP_SIZE) / 2;
        let crop_y = (RESIZE_HEIGHT - CROP_SIZE) / 2;
        let cropped = imageops::crop_imm(&resized, crop_x, crop_y, CROP_SIZE, CROP_SIZE).to_image();

        let side = CROP_SIZE as usize;
        let mut data = vec![0.0f32; PreprocessedFrame::LEN];
        for (x, y, pixel) in cropped.enumerate_pixels() {
            for channel in 0..3 {
                let value = pixel[channel] as f32 / 255.0;
                data[channel * side * side + y as usize * side + x as usize] =
                    (value - CHANNEL_MEAN[channel]) / CHANNEL_STD[channel];
            }
        }

        Ok(PreprocessedFrame { data })
    }
}

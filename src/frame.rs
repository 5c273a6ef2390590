//! Raw frame container.
//!
//! A `Frame` is a decoded RGB24 picture: row-major bytes, three bytes per
//! pixel, no padding between rows. Sources (`crate::video`) produce frames
//! in this layout regardless of the decoder's native pixel format, so every
//! downstream consumer (preprocessor, alert sink, video writer) can assume
//! it.

use anyhow::{anyhow, Result};

/// Bytes per pixel for RGB24.
pub const BYTES_PER_PIXEL: usize = 3;

/// A decoded video frame in RGB24 layout.
///
/// Frames are immutable once read and cheap to clone relative to a decode;
/// the live pipeline clones sampled frames into the pending clip so capture
/// can keep running while inference works on the copies.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl Frame {
    /// Wrap decoded pixel data. Fails when the buffer length does not match
    /// the dimensions.
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = expected_len(width, height)?;
        if data.len() != expected {
            return Err(anyhow!(
                "frame buffer holds {} bytes, {}x{} RGB24 needs {}",
                data.len(),
                width,
                height,
                expected
            ));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGB24 bytes, row-major.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// One pixel as (r, g, b). Out-of-bounds coordinates are a caller bug.
    pub fn pixel(&self, x: u32, y: u32) -> (u8, u8, u8) {
        let idx = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        (self.data[idx], self.data[idx + 1], self.data[idx + 2])
    }
}

fn expected_len(width: u32, height: u32) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(BYTES_PER_PIXEL))
        .ok_or_else(|| anyhow!("frame dimensions {}x{} overflow", width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_matching_buffer() {
        let frame = Frame::new(vec![0u8; 4 * 2 * 3], 4, 2).unwrap();
        assert_eq!(frame.width(), 4);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.data().len(), 24);
    }

    #[test]
    fn rejects_mismatched_buffer() {
        assert!(Frame::new(vec![0u8; 10], 4, 2).is_err());
    }

    #[test]
    fn pixel_indexing_is_row_major() {
        let mut data = vec![0u8; 2 * 2 * 3];
        // pixel (1, 1) = (7, 8, 9)
        data[(1 * 2 + 1) * 3] = 7;
        data[(1 * 2 + 1) * 3 + 1] = 8;
        data[(1 * 2 + 1) * 3 + 2] = 9;
        let frame = Frame::new(data, 2, 2).unwrap();
        assert_eq!(frame.pixel(1, 1), (7, 8, 9));
        assert_eq!(frame.pixel(0, 0), (0, 0, 0));
    }
}

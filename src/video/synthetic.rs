//! Synthetic video backend (`stub://` URLs) for tests and demos.
//!
//! URL shape: `stub://<pattern>?frames=64&width=640&height=480&fps=25`.
//! Patterns:
//!
//! - `black`: every frame all-zero (static, never triggers motion);
//! - `gradient`: a fixed spatial gradient, identical across frames;
//! - `moving`: a bright bar sweeping across the frame, strong
//!   frame-to-frame change.

use anyhow::{anyhow, Context, Result};

use super::VideoMeta;
use crate::frame::Frame;

const DEFAULT_FRAMES: u64 = 64;
const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;
const DEFAULT_FPS: f64 = 25.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Pattern {
    Black,
    Gradient,
    Moving,
}

/// Deterministic frame generator behind `stub://` URLs.
pub struct SyntheticInput {
    pattern: Pattern,
    meta: VideoMeta,
    total: u64,
    emitted: u64,
}

impl SyntheticInput {
    pub(crate) fn parse(url: &str) -> Result<Self> {
        let rest = url
            .strip_prefix("stub://")
            .ok_or_else(|| anyhow!("synthetic inputs must use a stub:// URL, got '{}'", url))?;
        let (name, query) = match rest.split_once('?') {
            Some((name, query)) => (name, Some(query)),
            None => (rest, None),
        };

        let pattern = match name {
            "black" | "" => Pattern::Black,
            "gradient" => Pattern::Gradient,
            "moving" => Pattern::Moving,
            other => return Err(anyhow!("unknown stub pattern '{}'", other)),
        };

        let mut total = DEFAULT_FRAMES;
        let mut width = DEFAULT_WIDTH;
        let mut height = DEFAULT_HEIGHT;
        let mut fps = DEFAULT_FPS;
        if let Some(query) = query {
            for pair in query.split('&').filter(|p| !p.is_empty()) {
                let (key, value) = pair
                    .split_once('=')
                    .ok_or_else(|| anyhow!("malformed stub parameter '{}'", pair))?;
                match key {
                    "frames" => {
                        total = value
                            .parse()
                            .with_context(|| format!("invalid frames value '{}'", value))?
                    }
                    "width" => {
                        width = value
                            .parse()
                            .with_context(|| format!("invalid width value '{}'", value))?
                    }
                    "height" => {
                        height = value
                            .parse()
                            .with_context(|| format!("invalid height value '{}'", value))?
                    }
                    "fps" => {
                        fps = value
                            .parse()
                            .with_context(|| format!("invalid fps value '{}'", value))?
                    }
                    other => return Err(anyhow!("unknown stub parameter '{}'", other)),
                }
            }
        }
        if width == 0 || height == 0 {
            return Err(anyhow!("stub dimensions must be non-zero"));
        }

        log::info!(
            "VideoInput: synthetic source '{}' ({}x{}, {} frames)",
            name,
            width,
            height,
            total
        );

        Ok(Self {
            pattern,
            meta: VideoMeta {
                width,
                height,
                fps,
                frame_count: Some(total),
            },
            total,
            emitted: 0,
        })
    }

    pub(crate) fn metadata(&self) -> VideoMeta {
        self.meta
    }

    pub(crate) fn frames_read(&self) -> u64 {
        self.emitted
    }

    pub(crate) fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.emitted >= self.total {
            return Ok(None);
        }

        let width = self.meta.width;
        let height = self.meta.height;
        let index = self.emitted;
        let mut data = vec![0u8; (width * height * 3) as usize];

        match self.pattern {
            Pattern::Black => {}
            Pattern::Gradient => {
                for y in 0..height {
                    for x in 0..width {
                        let base = ((y * width + x) * 3) as usize;
                        data[base] = (x % 256) as u8;
                        data[base + 1] = (y % 256) as u8;
                        data[base + 2] = ((x + y) % 256) as u8;
                    }
                }
            }
            Pattern::Moving => {
                // A full-height bar, one eighth of the width, sweeping one
                // position per frame.
                let bar_width = (width / 8).max(1);
                let bar_start = (index as u32 * bar_width) % width;
                for y in 0..height {
                    for dx in 0..bar_width {
                        let x = (bar_start + dx) % width;
                        let base = ((y * width + x) * 3) as usize;
                        data[base] = 255;
                        data[base + 1] = 255;
                        data[base + 2] = 255;
                    }
                }
            }
        }

        self.emitted += 1;
        Ok(Some(Frame::new(data, width, height)?))
    }
}

/// One frame as recorded by the collecting sink.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WrittenFrame {
    pub width: u32,
    pub height: u32,
    pub label: Option<String>,
}

/// In-memory sink recording what would have been written to disk.
pub struct CollectingOutput {
    frames: Vec<WrittenFrame>,
}

impl CollectingOutput {
    pub(crate) fn new() -> Self {
        Self { frames: Vec::new() }
    }

    pub(crate) fn write(&mut self, frame: &Frame, label: Option<&str>) -> Result<()> {
        self.frames.push(WrittenFrame {
            width: frame.width(),
            height: frame.height(),
            label: label.map(str::to_string),
        });
        Ok(())
    }

    pub(crate) fn frames_written(&self) -> u64 {
        self.frames.len() as u64
    }

    pub(crate) fn frames(&self) -> &[WrittenFrame] {
        &self.frames
    }
}

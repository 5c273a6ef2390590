#![cfg(feature = "video-opencv")]

//! OpenCV-backed video capture, writing, and display.
//!
//! OpenCV works in BGR; everything else in this crate works in RGB24. The
//! conversion happens here, at the boundary, in both directions.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use opencv::{
    core::{self, Mat},
    highgui, imgproc,
    prelude::*,
    videoio::{self, VideoCapture, VideoWriter},
};

use super::VideoMeta;
use crate::classify::Prediction;
use crate::frame::Frame;
use crate::pipeline::LiveDisplay;
use crate::FIGHT_LABEL;

pub(crate) struct OpenCvInput {
    cap: VideoCapture,
    meta: VideoMeta,
    frames_read: u64,
    path: String,
}

impl OpenCvInput {
    pub(crate) fn open(path_or_url: &str) -> Result<Self> {
        let cap = VideoCapture::from_file(path_or_url, videoio::CAP_ANY)
            .with_context(|| format!("open video input '{}'", path_or_url))?;
        if !cap.is_opened()? {
            return Err(anyhow!("failed to open video input '{}'", path_or_url));
        }

        let fps = cap.get(videoio::CAP_PROP_FPS)?;
        let width = cap.get(videoio::CAP_PROP_FRAME_WIDTH)? as u32;
        let height = cap.get(videoio::CAP_PROP_FRAME_HEIGHT)? as u32;
        // Live streams report zero or negative frame counts.
        let raw_count = cap.get(videoio::CAP_PROP_FRAME_COUNT)?;
        let frame_count = if raw_count > 0.0 {
            Some(raw_count as u64)
        } else {
            None
        };

        log::info!(
            "VideoInput: opened {} ({}x{} @ {:.1} fps, {} frames)",
            path_or_url,
            width,
            height,
            fps,
            frame_count.map_or("unbounded".to_string(), |n| n.to_string())
        );

        Ok(Self {
            cap,
            meta: VideoMeta {
                width,
                height,
                fps,
                frame_count,
            },
            frames_read: 0,
            path: path_or_url.to_string(),
        })
    }

    pub(crate) fn metadata(&self) -> VideoMeta {
        self.meta
    }

    pub(crate) fn frames_read(&self) -> u64 {
        self.frames_read
    }

    pub(crate) fn next_frame(&mut self) -> Result<Option<Frame>> {
        let mut mat = Mat::default();
        let ok = match self.cap.read(&mut mat) {
            Ok(ok) => ok,
            Err(e) => {
                // An unreadable frame ends the stream, it does not kill the
                // pipeline.
                log::warn!("frame read failed on {}: {}, ending stream", self.path, e);
                return Ok(None);
            }
        };
        if !ok || mat.empty() {
            return Ok(None);
        }

        let mut rgb = Mat::default();
        imgproc::cvt_color(&mat, &mut rgb, imgproc::COLOR_BGR2RGB, 0)?;

        let width = rgb.cols() as u32;
        let height = rgb.rows() as u32;
        let data = rgb.data_bytes()?.to_vec();

        self.frames_read += 1;
        Ok(Some(Frame::new(data, width, height)?))
    }
}

pub(crate) struct OpenCvOutput {
    writer: VideoWriter,
    frames_written: u64,
}

impl OpenCvOutput {
    pub(crate) fn create(path: &Path, meta: &VideoMeta) -> Result<Self> {
        let path_str = path
            .to_str()
            .ok_or_else(|| anyhow!("output path {} is not valid UTF-8", path.display()))?;
        let fourcc = VideoWriter::fourcc(b'm' as _, b'p' as _, b'4' as _, b'v' as _)?;
        let writer = VideoWriter::new(
            path_str,
            fourcc,
            meta.fps,
            core::Size::new(meta.width as i32, meta.height as i32),
            true,
        )
        .with_context(|| format!("create video writer {}", path.display()))?;
        if !writer.is_opened()? {
            return Err(anyhow!("failed to open video writer {}", path.display()));
        }

        Ok(Self {
            writer,
            frames_written: 0,
        })
    }

    pub(crate) fn write(&mut self, frame: &Frame, label: Option<&str>) -> Result<()> {
        let mut bgr = frame_to_bgr(frame)?;
        if let Some(label) = label {
            draw_label(&mut bgr, label, label == FIGHT_LABEL)?;
        }
        self.writer.write(&bgr)?;
        self.frames_written += 1;
        Ok(())
    }

    pub(crate) fn finish(&mut self) -> Result<()> {
        self.writer.release()?;
        Ok(())
    }

    pub(crate) fn frames_written(&self) -> u64 {
        self.frames_written
    }
}

/// Live annotated window. `show` returns false once 'q' is pressed.
pub struct WindowDisplay {
    window: String,
}

impl WindowDisplay {
    pub fn new(window: &str) -> Result<Self> {
        highgui::named_window(window, highgui::WINDOW_AUTOSIZE)?;
        Ok(Self {
            window: window.to_string(),
        })
    }
}

impl LiveDisplay for WindowDisplay {
    fn show(&mut self, frame: &Frame, prediction: Option<&Prediction>) -> Result<bool> {
        let mut bgr = frame_to_bgr(frame)?;
        if let Some(prediction) = prediction {
            draw_label(&mut bgr, prediction.label(), prediction.is(FIGHT_LABEL))?;
        }
        highgui::imshow(&self.window, &bgr)?;
        let key = highgui::wait_key(1)?;
        Ok(key != 'q' as i32)
    }
}

fn frame_to_bgr(frame: &Frame) -> Result<Mat> {
    let mat = Mat::from_slice(frame.data())?;
    let mat = mat.reshape(3, frame.height() as i32)?;
    let mut bgr = Mat::default();
    imgproc::cvt_color(&mat, &mut bgr, imgproc::COLOR_RGB2BGR, 0)?;
    Ok(bgr)
}

fn draw_label(mat: &mut Mat, label: &str, positive: bool) -> Result<()> {
    let (color, thickness) = if positive {
        (core::Scalar::new(0.0, 0.0, 255.0, 0.0), 3)
    } else {
        (core::Scalar::new(0.0, 255.0, 0.0, 0.0), 2)
    };
    imgproc::put_text(
        mat,
        label,
        core::Point::new(10, 30),
        imgproc::FONT_HERSHEY_SIMPLEX,
        1.0,
        color,
        thickness,
        imgproc::LINE_8,
        false,
    )?;
    Ok(())
}

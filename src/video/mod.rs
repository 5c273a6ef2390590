//! Video sources and sinks.
//!
//! `VideoInput` reads frames from a file or live stream; `VideoOutput`
//! writes the annotated result video. Both dispatch over a backend enum:
//!
//! - `stub://` URLs select the synthetic backend (tests, demos) - always
//!   compiled in;
//! - everything else needs the real backend behind the `video-opencv`
//!   feature (OpenCV capture/writer).
//!
//! All frames cross this boundary in RGB24; the OpenCV backend converts
//! from/to BGR at the edges.

mod synthetic;

#[cfg(feature = "video-opencv")]
pub(crate) mod opencv_io;

pub use synthetic::{CollectingOutput, SyntheticInput, WrittenFrame};

#[cfg(feature = "video-opencv")]
pub use opencv_io::WindowDisplay;

use std::path::Path;

use anyhow::Result;

use crate::frame::Frame;

/// Properties of an opened video.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VideoMeta {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// Total frames for bounded inputs; `None` for live streams.
    pub frame_count: Option<u64>,
}

/// A frame source: video file, live stream, or synthetic stub.
pub struct VideoInput {
    backend: InputBackend,
}

enum InputBackend {
    Synthetic(SyntheticInput),
    #[cfg(feature = "video-opencv")]
    OpenCv(opencv_io::OpenCvInput),
}

impl VideoInput {
    /// Open a video by path or URL. `stub://...` selects the synthetic
    /// backend; anything else needs the `video-opencv` feature.
    pub fn open(path_or_url: &str) -> Result<Self> {
        if path_or_url.starts_with("stub://") {
            return Ok(Self {
                backend: InputBackend::Synthetic(SyntheticInput::parse(path_or_url)?),
            });
        }

        #[cfg(feature = "video-opencv")]
        {
            Ok(Self {
                backend: InputBackend::OpenCv(opencv_io::OpenCvInput::open(path_or_url)?),
            })
        }
        #[cfg(not(feature = "video-opencv"))]
        {
            anyhow::bail!(
                "opening '{}' requires the video-opencv feature (only stub:// inputs are built in)",
                path_or_url
            )
        }
    }

    pub fn metadata(&self) -> VideoMeta {
        match &self.backend {
            InputBackend::Synthetic(source) => source.metadata(),
            #[cfg(feature = "video-opencv")]
            InputBackend::OpenCv(source) => source.metadata(),
        }
    }

    /// Read the next frame. `Ok(None)` is the graceful end of stream - a
    /// failed or missing frame terminates the read loop rather than the
    /// pipeline.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        match &mut self.backend {
            InputBackend::Synthetic(source) => source.next_frame(),
            #[cfg(feature = "video-opencv")]
            InputBackend::OpenCv(source) => source.next_frame(),
        }
    }

    /// Frames successfully read so far.
    pub fn frames_read(&self) -> u64 {
        match &self.backend {
            InputBackend::Synthetic(source) => source.frames_read(),
            #[cfg(feature = "video-opencv")]
            InputBackend::OpenCv(source) => source.frames_read(),
        }
    }
}

/// A frame sink writing the annotated output video.
pub struct VideoOutput {
    backend: OutputBackend,
}

enum OutputBackend {
    Collecting(CollectingOutput),
    #[cfg(feature = "video-opencv")]
    OpenCv(opencv_io::OpenCvOutput),
}

impl VideoOutput {
    /// In-memory sink recording dimensions and overlay labels (tests and
    /// stub pipelines).
    pub fn collecting() -> Self {
        Self {
            backend: OutputBackend::Collecting(CollectingOutput::new()),
        }
    }

    /// Real video file preserving the input's resolution and fps. Needs the
    /// `video-opencv` feature.
    #[allow(unused_variables)]
    pub fn create(path: &Path, meta: &VideoMeta) -> Result<Self> {
        #[cfg(feature = "video-opencv")]
        {
            Ok(Self {
                backend: OutputBackend::OpenCv(opencv_io::OpenCvOutput::create(path, meta)?),
            })
        }
        #[cfg(not(feature = "video-opencv"))]
        {
            anyhow::bail!(
                "writing '{}' requires the video-opencv feature",
                path.display()
            )
        }
    }

    /// Write one frame, burning in the overlay label when present.
    pub fn write(&mut self, frame: &Frame, label: Option<&str>) -> Result<()> {
        match &mut self.backend {
            OutputBackend::Collecting(sink) => sink.write(frame, label),
            #[cfg(feature = "video-opencv")]
            OutputBackend::OpenCv(sink) => sink.write(frame, label),
        }
    }

    /// Flush and release the underlying writer.
    pub fn finish(&mut self) -> Result<()> {
        match &mut self.backend {
            OutputBackend::Collecting(_) => Ok(()),
            #[cfg(feature = "video-opencv")]
            OutputBackend::OpenCv(sink) => sink.finish(),
        }
    }

    pub fn frames_written(&self) -> u64 {
        match &self.backend {
            OutputBackend::Collecting(sink) => sink.frames_written(),
            #[cfg(feature = "video-opencv")]
            OutputBackend::OpenCv(sink) => sink.frames_written(),
        }
    }

    /// Recorded frames for the collecting sink; `None` for real writers.
    pub fn collected(&self) -> Option<&[WrittenFrame]> {
        match &self.backend {
            OutputBackend::Collecting(sink) => Some(sink.frames()),
            #[cfg(feature = "video-opencv")]
            OutputBackend::OpenCv(_) => None,
        }
    }
}

//! Clip construction and frame sampling policies.
//!
//! Two sampling policies feed the classifier:
//!
//! - **Uniform sampling** over a bounded video: pick N frames spaced by
//!   `max(total / N, 1)`, starting at index 0. Used to classify a whole
//!   file with a single inference.
//! - **Skip batching** over a long or live stream: enqueue every K-th frame
//!   into a bounded buffer; when the buffer holds N frames, hand the full
//!   clip off and reset. Windows never overlap.
//!
//! In both policies a partial clip (stream ended before N frames) is
//! dropped without inference, never padded.

use anyhow::{anyhow, Context, Result};

use crate::preprocess::{PreprocessedFrame, Preprocessor};
use crate::video::VideoInput;

/// An ordered sequence of exactly N preprocessed frames, consumed once by
/// the classifier.
#[derive(Clone, Debug)]
pub struct Clip {
    frames: Vec<PreprocessedFrame>,
}

impl Clip {
    /// Build a clip from a full window of frames.
    pub fn new(frames: Vec<PreprocessedFrame>) -> Result<Self> {
        if frames.is_empty() {
            return Err(anyhow!("clip must contain at least one frame"));
        }
        Ok(Self { frames })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[PreprocessedFrame] {
        &self.frames
    }
}

/// Bounded accumulate-and-reset buffer implementing the skip batching
/// policy.
///
/// `push` returns `Some(Clip)` exactly when the window fills; the buffer is
/// empty again when it returns. Frames left in a partially filled buffer at
/// end of stream are discarded with it.
pub struct ClipBuffer {
    frames: Vec<PreprocessedFrame>,
    capacity: usize,
    skip: usize,
    seen: u64,
}

impl ClipBuffer {
    /// `capacity` is the clip length N; `skip` keeps every K-th frame
    /// (skip = 1 keeps all).
    pub fn new(capacity: usize, skip: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(anyhow!("clip capacity must be greater than zero"));
        }
        if skip == 0 {
            return Err(anyhow!("skip factor must be greater than zero"));
        }
        Ok(Self {
            frames: Vec::with_capacity(capacity),
            capacity,
            skip,
            seen: 0,
        })
    }

    /// Offer the next incoming frame. Returns the full clip when the window
    /// completes.
    pub fn push(&mut self, frame: PreprocessedFrame) -> Option<Clip> {
        let keep = self.seen % self.skip as u64 == 0;
        self.seen += 1;
        if !keep {
            return None;
        }

        self.frames.push(frame);
        if self.frames.len() < self.capacity {
            return None;
        }

        let frames = std::mem::replace(&mut self.frames, Vec::with_capacity(self.capacity));
        Some(Clip { frames })
    }

    /// Frames currently buffered (always < capacity between pushes).
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Frame indices selected by uniform sampling: exactly `target` indices
/// spaced by `max(total / target, 1)`, strictly increasing, starting at 0.
pub fn uniform_indices(total: u64, target: usize) -> Vec<u64> {
    let stride = (total / target as u64).max(1);
    (0..target as u64).map(|i| i * stride).collect()
}

/// Read a video start to end and collect one uniformly sampled clip.
///
/// Returns `Ok(None)` when the video yields fewer than `target` sampled
/// frames; the partial clip is discarded and no inference should happen.
pub fn sample_uniform(
    input: &mut VideoInput,
    target: usize,
    pre: &Preprocessor,
) -> Result<Option<Clip>> {
    if target == 0 {
        return Err(anyhow!("sample target must be greater than zero"));
    }
    let meta = input.metadata();
    let total = meta
        .frame_count
        .ok_or_else(|| anyhow!("uniform sampling needs a bounded input, not a live stream"))?;

    let wanted = uniform_indices(total, target);
    let mut frames = Vec::with_capacity(target);
    let mut cursor = 0u64;
    let mut next = 0usize;

    while next < wanted.len() {
        let Some(frame) = input.next_frame()? else {
            break;
        };
        if cursor == wanted[next] {
            frames.push(
                pre.apply(&frame)
                    .with_context(|| format!("preprocess frame {}", cursor))?,
            );
            next += 1;
        }
        cursor += 1;
    }

    if frames.len() < target {
        log::debug!(
            "uniform sampling collected {} of {} frames, dropping clip",
            frames.len(),
            target
        );
        return Ok(None);
    }

    Ok(Some(Clip { frames }))
}

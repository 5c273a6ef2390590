//! Batch file pipeline.
//!
//! `run_on_file` drives one video through the skip-batching clip buffer,
//! classifies every full window, raises an alert per positive window, and
//! writes every frame (labeled or not) to the output sink. The overlay
//! stays on the frames until the next window completes with a different
//! top class.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::alert::AlertSink;
use crate::classify::{ClassifierBackend, Prediction};
use crate::clip::{sample_uniform, ClipBuffer};
use crate::preprocess::Preprocessor;
use crate::video::{VideoInput, VideoOutput};
use crate::{DEFAULT_SEQUENCE_LENGTH, FIGHT_LABEL};

/// Output video file name inside the output folder.
pub const OUTPUT_VIDEO_FILE: &str = "Output_video.mp4";

#[derive(Clone, Copy, Debug)]
pub struct ScanOptions {
    /// Frames per inference clip.
    pub sequence_length: usize,
    /// Keep every K-th frame when filling a clip.
    pub skip: usize,
    /// Log every window's prediction.
    pub verbose: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            sequence_length: DEFAULT_SEQUENCE_LENGTH,
            skip: 2,
            verbose: false,
        }
    }
}

/// Counters from one batch run.
#[derive(Clone, Copy, Debug, Default)]
pub struct ScanReport {
    pub frames_read: u64,
    pub frames_written: u64,
    pub windows_classified: u64,
    pub alerts_raised: u64,
}

/// Run the batch pipeline over an already-opened input/output pair.
pub fn run_on_file(
    backend: &mut dyn ClassifierBackend,
    input: &mut VideoInput,
    output: &mut VideoOutput,
    alerts: &mut AlertSink,
    opts: &ScanOptions,
) -> Result<ScanReport> {
    let pre = Preprocessor::new();
    let mut buffer = ClipBuffer::new(opts.sequence_length, opts.skip)?;
    let mut current: Option<Prediction> = None;
    let mut report = ScanReport::default();

    while let Some(frame) = input.next_frame()? {
        let processed = pre.apply(&frame).context("preprocess frame")?;
        if let Some(clip) = buffer.push(processed) {
            let prediction = backend.classify(&clip)?;
            report.windows_classified += 1;
            if opts.verbose {
                log::info!(
                    "window #{}: {} ({:.3})",
                    report.windows_classified,
                    prediction.label(),
                    prediction.probability()
                );
            }
            if prediction.is(FIGHT_LABEL) {
                alerts.record(&frame)?;
                report.alerts_raised += 1;
            }
            current = Some(prediction);
        }

        // Only the positive class is burned into the output.
        let overlay = current
            .as_ref()
            .filter(|p| p.is(FIGHT_LABEL))
            .map(|p| p.label());
        output.write(&frame, overlay)?;
        report.frames_written += 1;
    }
    // A partially filled buffer at end of video is dropped with it.

    output.finish()?;
    report.frames_read = input.frames_read();

    log::info!(
        "scan complete: {} frames, {} windows, {} alerts",
        report.frames_read,
        report.windows_classified,
        report.alerts_raised
    );
    Ok(report)
}

/// Open `input_path`, scan it, and write `Output_video.mp4` plus alert
/// artifacts into `output_dir`. Returns the output video path.
///
/// `stub://` inputs run against the in-memory sink (nothing to encode), so
/// the stub pipeline works in every build.
pub fn scan_video(
    backend: &mut dyn ClassifierBackend,
    input_path: &str,
    output_dir: impl AsRef<Path>,
    opts: &ScanOptions,
) -> Result<PathBuf> {
    let output_dir = output_dir.as_ref();
    let mut input =
        VideoInput::open(input_path).with_context(|| format!("open input {}", input_path))?;
    let meta = input.metadata();

    // The sink creates the output folder, so it goes first.
    let mut alerts = AlertSink::new(output_dir)?;
    let output_path = output_dir.join(OUTPUT_VIDEO_FILE);
    let mut output = if input_path.starts_with("stub://") {
        VideoOutput::collecting()
    } else {
        VideoOutput::create(&output_path, &meta)?
    };

    let report = run_on_file(backend, &mut input, &mut output, &mut alerts, opts)?;
    log::info!(
        "wrote {} ({} frames, {} alerts)",
        output_path.display(),
        report.frames_written,
        report.alerts_raised
    );
    Ok(output_path)
}

/// Classify a whole bounded video with one uniformly sampled clip.
///
/// Returns `Ok(None)` when the video is too short for the backend's clip
/// length - the partial clip is dropped and no inference runs.
pub fn classify_file(
    backend: &mut dyn ClassifierBackend,
    input_path: &str,
) -> Result<Option<Prediction>> {
    let mut input =
        VideoInput::open(input_path).with_context(|| format!("open input {}", input_path))?;
    let pre = Preprocessor::new();
    let Some(clip) = sample_uniform(&mut input, backend.sequence_length(), &pre)? else {
        log::warn!(
            "{} yields fewer than {} sampled frames, skipping inference",
            input_path,
            backend.sequence_length()
        );
        return Ok(None);
    };
    backend.classify(&clip).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::StubBackend;

    #[test]
    fn static_video_produces_no_alerts_and_preserves_shape() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = StubBackend::new(16);
        let mut input =
            VideoInput::open("stub://black?frames=64&width=320&height=240").unwrap();
        let mut output = VideoOutput::collecting();
        let mut alerts = AlertSink::new(dir.path()).unwrap();
        let opts = ScanOptions {
            sequence_length: 16,
            skip: 2,
            verbose: false,
        };

        let report =
            run_on_file(&mut backend, &mut input, &mut output, &mut alerts, &opts).unwrap();

        assert_eq!(report.frames_read, 64);
        assert_eq!(report.frames_written, 64);
        // 64 frames, every 2nd kept = 32 = two windows of 16.
        assert_eq!(report.windows_classified, 2);
        assert_eq!(report.alerts_raised, 0);

        let written = output.collected().unwrap();
        assert!(written
            .iter()
            .all(|f| f.width == 320 && f.height == 240 && f.label.is_none()));
        // No alert was raised, so no report file was created.
        assert!(!alerts.report_path().exists());
    }

    #[test]
    fn moving_video_raises_alerts_and_labels_frames() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = StubBackend::new(8);
        let mut input =
            VideoInput::open("stub://moving?frames=32&width=160&height=120").unwrap();
        let mut output = VideoOutput::collecting();
        let mut alerts = AlertSink::new(dir.path()).unwrap();
        let opts = ScanOptions {
            sequence_length: 8,
            skip: 1,
            verbose: false,
        };

        let report =
            run_on_file(&mut backend, &mut input, &mut output, &mut alerts, &opts).unwrap();

        assert_eq!(report.windows_classified, 4);
        assert_eq!(report.alerts_raised, 4);
        let written = output.collected().unwrap();
        // Frames after the first completed window carry the overlay.
        assert!(written[8..]
            .iter()
            .all(|f| f.label.as_deref() == Some("fight")));
        // Frames before the first window completes have no label yet.
        assert!(written[..7].iter().all(|f| f.label.is_none()));
    }

    #[test]
    fn short_video_never_reaches_the_classifier() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = StubBackend::new(16);
        let mut input = VideoInput::open("stub://black?frames=10&width=64&height=48").unwrap();
        let mut output = VideoOutput::collecting();
        let mut alerts = AlertSink::new(dir.path()).unwrap();
        let opts = ScanOptions {
            sequence_length: 16,
            skip: 1,
            verbose: false,
        };

        let report =
            run_on_file(&mut backend, &mut input, &mut output, &mut alerts, &opts).unwrap();
        assert_eq!(report.windows_classified, 0);
        assert_eq!(report.frames_written, 10);
    }

    #[test]
    fn classify_file_samples_uniformly() {
        let mut backend = StubBackend::new(16);
        let prediction = classify_file(&mut backend, "stub://black?frames=100&width=64&height=48")
            .unwrap()
            .expect("long enough for a clip");
        assert_eq!(prediction.label(), "noFight");
    }

    #[test]
    fn classify_file_drops_short_input() {
        let mut backend = StubBackend::new(16);
        let prediction =
            classify_file(&mut backend, "stub://black?frames=5&width=64&height=48").unwrap();
        assert!(prediction.is_none());
    }
}

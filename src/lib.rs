//! Fightwatch - fight detection kernel for surveillance video
//!
//! This crate runs a pretrained 3D-convolutional video classifier over video
//! files and live streams and raises alerts when the "fight" class wins.
//!
//! # Architecture
//!
//! Frames flow through a fixed pipeline:
//!
//! 1. **Video input** (`video`): decodes a file or stream into RGB frames.
//! 2. **Preprocessor** (`preprocess`): resize, center-crop, normalize into
//!    model input format.
//! 3. **Clip sampling** (`clip`): batches preprocessed frames into
//!    fixed-length clips (uniform whole-file sampling or skip batching).
//! 4. **Classifier** (`classify`): runs the clip through the model and
//!    returns a ranked class/probability list.
//! 5. **Alert sink** (`alert`): persists a flagged frame as a jpeg and
//!    appends a row to the report CSV.
//! 6. **Pipelines** (`pipeline`): wire the above into the batch file scan
//!    and the live streaming loop.
//!
//! # Pipeline guarantees
//!
//! - Inference windows never overlap: a full clip is classified exactly once
//!   and the buffer resets.
//! - A partial clip at end of stream is dropped, never padded.
//! - Live capture never blocks on inference: clips are handed to a bounded
//!   worker queue, and the displayed label is the latest completed
//!   prediction (which may lag one window).
//! - A stale inference result can never overwrite a newer one: publishes
//!   into the shared prediction slot carry a generation number.

use anyhow::{anyhow, Result};

pub mod alert;
pub mod classify;
pub mod clip;
pub mod config;
pub mod frame;
pub mod mailbox;
pub mod pipeline;
pub mod preprocess;
pub mod video;

pub use alert::{AlertRecord, AlertSink};
#[cfg(feature = "backend-tract")]
pub use classify::TractBackend;
pub use classify::{ClassScore, ClassifierBackend, Prediction, StubBackend};
pub use clip::{uniform_indices, Clip, ClipBuffer};
pub use config::FightwatchConfig;
pub use frame::Frame;
pub use mailbox::PredictionCell;
pub use pipeline::{
    classify_file, run_on_file, run_on_stream, scan_video, CadenceSampler, InferenceWorker,
    LiveDisplay, NullDisplay, ScanOptions, ScanReport, StreamOptions, StreamStats,
    OUTPUT_VIDEO_FILE,
};
pub use preprocess::{PreprocessedFrame, Preprocessor};
pub use video::{VideoInput, VideoMeta, VideoOutput};

/// Class labels of the trained 2-class head, in model output order.
pub const CLASS_LABELS: [&str; 2] = ["fight", "noFight"];

/// Label of the positive (alert-raising) class.
pub const FIGHT_LABEL: &str = "fight";

/// Default number of frames per inference clip.
pub const DEFAULT_SEQUENCE_LENGTH: usize = 16;

/// Resolve a class index from the model output to its label.
///
/// Out-of-range indices are a model/config mismatch and are fatal.
pub fn class_label(index: usize) -> Result<&'static str> {
    CLASS_LABELS.get(index).copied().ok_or_else(|| {
        anyhow!(
            "class index {} out of range for {} classes",
            index,
            CLASS_LABELS.len()
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_labels_cover_both_classes() {
        assert_eq!(class_label(0).unwrap(), "fight");
        assert_eq!(class_label(1).unwrap(), "noFight");
        assert!(class_label(2).is_err());
    }
}

//! Pipelines wiring sources, sampling, inference, and sinks together.
//!
//! - `batch`: whole-file scan writing an annotated output video and alert
//!   artifacts, plus single-shot whole-file classification.
//! - `live`: capture/display loop with background inference over a bounded
//!   worker queue.

mod batch;
mod live;

pub use batch::{classify_file, run_on_file, scan_video, ScanOptions, ScanReport, OUTPUT_VIDEO_FILE};
pub use live::{
    run_on_stream, CadenceSampler, InferenceWorker, LiveDisplay, NullDisplay, StreamOptions,
    StreamStats,
};

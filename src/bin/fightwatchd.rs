//! fightwatchd - live fight detection daemon
//!
//! This daemon:
//! 1. Opens the configured stream (file URL, camera stream, or stub://)
//! 2. Samples one frame per configured interval into a bounded clip
//! 3. Runs inference on a background worker behind a bounded queue
//! 4. Overlays the latest completed prediction on the live display
//! 5. Shuts down on ctrl-c, stream end, or 'q' in the display window

use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use fightwatch::{
    classify::backend_from_config, run_on_stream, FightwatchConfig, InferenceWorker,
    PredictionCell, StreamOptions, VideoInput,
};

#[cfg(not(feature = "video-opencv"))]
use fightwatch::NullDisplay;

fn main() -> Result<()> {
    // Initialize logging (simple stderr).
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = FightwatchConfig::load()?;
    log::info!(
        "fightwatchd starting: stream={} backend={} clip={}x{}ms",
        cfg.stream.url,
        cfg.backend,
        cfg.clip.sequence_length,
        cfg.stream.sample_interval.as_millis()
    );

    let backend = backend_from_config(&cfg)?;
    log::info!("classifier backend: {}", backend.name());

    let cell = Arc::new(PredictionCell::new());
    let worker = InferenceWorker::spawn(backend, Arc::clone(&cell), cfg.stream.queue_depth)?;

    let mut source = VideoInput::open(&cfg.stream.url)?;

    let stop = Arc::new(AtomicBool::new(false));
    let stop_handle = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        stop_handle.store(true, Ordering::Relaxed);
    })?;

    #[cfg(feature = "video-opencv")]
    let mut display = fightwatch::video::WindowDisplay::new("fightwatch")?;
    #[cfg(not(feature = "video-opencv"))]
    let mut display = NullDisplay::default();

    let opts = StreamOptions {
        sequence_length: cfg.clip.sequence_length,
        sample_interval: cfg.stream.sample_interval,
        queue_depth: cfg.stream.queue_depth,
    };
    let stats = run_on_stream(&mut source, &worker, &mut display, &opts, &stop)?;
    worker.finish()?;

    log::info!(
        "fightwatchd stopped: {} frames shown, {} clips classified, {} dropped",
        stats.frames_shown,
        stats.clips_dispatched,
        stats.clips_dropped
    );
    if let Some(prediction) = cell.latest() {
        log::info!(
            "last prediction: {} ({:.3})",
            prediction.label(),
            prediction.probability()
        );
    }
    Ok(())
}

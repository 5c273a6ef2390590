//! Live streaming pipeline.
//!
//! The capture/display loop stays single-threaded; inference runs on one
//! long-lived worker thread behind a bounded queue, so capture never blocks
//! on a forward pass. The displayed label is whatever the worker published
//! last - it may lag the picture by one window.
//!
//! When inference falls behind the sampling cadence the queue fills and new
//! clips are dropped (with a warning) instead of piling up threads; when a
//! slow clip finishes after a newer one, the generation check in
//! `PredictionCell` discards the stale result.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};

use crate::classify::{ClassifierBackend, Prediction};
use crate::clip::Clip;
use crate::frame::Frame;
use crate::mailbox::PredictionCell;
use crate::preprocess::Preprocessor;
use crate::video::VideoInput;
use crate::DEFAULT_SEQUENCE_LENGTH;

/// Presents live frames with the latest overlay.
pub trait LiveDisplay {
    /// Show one frame. Return false to end the loop (window closed, 'q'
    /// pressed).
    fn show(&mut self, frame: &Frame, prediction: Option<&Prediction>) -> Result<bool>;
}

/// Headless display: logs label changes, never ends the loop.
#[derive(Default)]
pub struct NullDisplay {
    last_label: Option<&'static str>,
}

impl LiveDisplay for NullDisplay {
    fn show(&mut self, _frame: &Frame, prediction: Option<&Prediction>) -> Result<bool> {
        let label = prediction.map(|p| p.label());
        if label != self.last_label {
            if let Some(label) = label {
                log::info!("prediction is now {}", label);
            }
            self.last_label = label;
        }
        Ok(true)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct StreamOptions {
    /// Frames per inference clip.
    pub sequence_length: usize,
    /// Wall-clock spacing between sampled frames.
    pub sample_interval: Duration,
    /// Bounded inference queue depth; a full queue drops new clips.
    pub queue_depth: usize,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            sequence_length: DEFAULT_SEQUENCE_LENGTH,
            sample_interval: Duration::from_millis(2500),
            queue_depth: 2,
        }
    }
}

/// Counters from one streaming run.
#[derive(Clone, Copy, Debug, Default)]
pub struct StreamStats {
    pub frames_shown: u64,
    pub clips_dispatched: u64,
    pub clips_dropped: u64,
}

/// Samples one frame per interval into a bounded batch.
///
/// `offer` clones the frame into the pending batch when the interval has
/// elapsed (the first frame is always sampled) and returns the full batch
/// the moment it reaches capacity, leaving the sampler empty. A partial
/// batch at stream end is dropped with the sampler.
pub struct CadenceSampler {
    pending: Vec<Frame>,
    capacity: usize,
    interval: Duration,
    last_enqueue: Option<Instant>,
}

impl CadenceSampler {
    pub fn new(capacity: usize, interval: Duration) -> Result<Self> {
        if capacity == 0 {
            return Err(anyhow!("sampler capacity must be greater than zero"));
        }
        Ok(Self {
            pending: Vec::with_capacity(capacity),
            capacity,
            interval,
            last_enqueue: None,
        })
    }

    pub fn offer(&mut self, frame: &Frame, now: Instant) -> Option<Vec<Frame>> {
        let due = match self.last_enqueue {
            None => true,
            Some(prev) => now.duration_since(prev) >= self.interval,
        };
        if due {
            self.pending.push(frame.clone());
            self.last_enqueue = Some(now);
        }

        if self.pending.len() < self.capacity {
            return None;
        }
        Some(std::mem::take(&mut self.pending))
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

struct ClipJob {
    generation: u64,
    frames: Vec<Frame>,
}

/// Background inference worker: one thread, one bounded queue.
///
/// The worker owns the classifier backend, preprocesses each raw batch,
/// classifies it, and publishes the result (tagged with the clip
/// generation) into the shared `PredictionCell`.
pub struct InferenceWorker {
    sender: SyncSender<ClipJob>,
    handle: JoinHandle<()>,
    cell: Arc<PredictionCell>,
}

impl InferenceWorker {
    pub fn spawn(
        mut backend: Box<dyn ClassifierBackend>,
        cell: Arc<PredictionCell>,
        queue_depth: usize,
    ) -> Result<Self> {
        if queue_depth == 0 {
            return Err(anyhow!("queue depth must be greater than zero"));
        }
        let (sender, receiver) = sync_channel::<ClipJob>(queue_depth);
        let worker_cell = Arc::clone(&cell);
        let handle = thread::Builder::new()
            .name("fightwatch-infer".to_string())
            .spawn(move || {
                let pre = Preprocessor::new();
                let expected = backend.sequence_length();
                while let Ok(job) = receiver.recv() {
                    match classify_batch(backend.as_mut(), &pre, expected, &job) {
                        Ok(prediction) => {
                            if !worker_cell.publish(job.generation, prediction) {
                                log::debug!(
                                    "clip #{} finished late, result discarded",
                                    job.generation
                                );
                            }
                        }
                        Err(e) => log::warn!("clip #{} inference failed: {}", job.generation, e),
                    }
                }
            })
            .context("spawn inference worker")?;

        Ok(Self {
            sender,
            handle,
            cell,
        })
    }

    /// Shared handle to the prediction slot the worker publishes into.
    pub fn cell(&self) -> Arc<PredictionCell> {
        Arc::clone(&self.cell)
    }

    /// Hand one raw batch to the worker without blocking. Returns false
    /// when the queue is full and the batch was dropped.
    pub fn dispatch(&self, generation: u64, frames: Vec<Frame>) -> Result<bool> {
        match self.sender.try_send(ClipJob { generation, frames }) {
            Ok(()) => Ok(true),
            Err(TrySendError::Full(_)) => Ok(false),
            Err(TrySendError::Disconnected(_)) => Err(anyhow!("inference worker exited")),
        }
    }

    /// Drain queued jobs and join the worker thread.
    pub fn finish(self) -> Result<()> {
        drop(self.sender);
        self.handle
            .join()
            .map_err(|_| anyhow!("inference worker panicked"))
    }
}

fn classify_batch(
    backend: &mut dyn ClassifierBackend,
    pre: &Preprocessor,
    expected: usize,
    job: &ClipJob,
) -> Result<Prediction> {
    if job.frames.len() != expected {
        return Err(anyhow!(
            "batch holds {} frames, backend expects {}",
            job.frames.len(),
            expected
        ));
    }
    let mut processed = Vec::with_capacity(job.frames.len());
    for frame in &job.frames {
        processed.push(pre.apply(frame)?);
    }
    backend.classify(&Clip::new(processed)?)
}

/// Capture/display loop over a live stream.
///
/// Ends when the source runs out of frames, the display asks to stop, or
/// `stop` is set (ctrl-c). The caller keeps ownership of the worker so it
/// can `finish()` it after the loop.
pub fn run_on_stream(
    source: &mut VideoInput,
    worker: &InferenceWorker,
    display: &mut dyn LiveDisplay,
    opts: &StreamOptions,
    stop: &AtomicBool,
) -> Result<StreamStats> {
    let cell = worker.cell();
    let mut sampler = CadenceSampler::new(opts.sequence_length, opts.sample_interval)?;
    let mut generation = 0u64;
    let mut stats = StreamStats::default();

    loop {
        if stop.load(Ordering::Relaxed) {
            log::info!("stop requested, ending stream");
            break;
        }
        let Some(frame) = source.next_frame()? else {
            log::info!("stream ended after {} frames", stats.frames_shown);
            break;
        };

        if let Some(batch) = sampler.offer(&frame, Instant::now()) {
            generation += 1;
            if worker.dispatch(generation, batch)? {
                stats.clips_dispatched += 1;
            } else {
                stats.clips_dropped += 1;
                log::warn!("inference queue full, dropping clip #{}", generation);
            }
        }

        stats.frames_shown += 1;
        let latest = cell.latest();
        if !display.show(&frame, latest.as_ref())? {
            log::info!("display closed, ending stream");
            break;
        }
    }
    // Whatever is left in the sampler is a partial window; it never infers.

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::StubBackend;

    fn black_frame() -> Frame {
        Frame::new(vec![0u8; 64 * 48 * 3], 64, 48).unwrap()
    }

    #[test]
    fn sampler_dispatches_exactly_at_capacity() {
        let mut sampler = CadenceSampler::new(16, Duration::ZERO).unwrap();
        let frame = black_frame();
        let mut batches = 0;
        for i in 0..16 {
            match sampler.offer(&frame, Instant::now()) {
                Some(batch) => {
                    assert_eq!(i, 15, "batch must complete on the 16th frame");
                    assert_eq!(batch.len(), 16);
                    batches += 1;
                }
                None => assert!(i < 15),
            }
        }
        assert_eq!(batches, 1);
        // Buffer is empty immediately after dispatch.
        assert_eq!(sampler.pending(), 0);
    }

    #[test]
    fn sampler_respects_the_interval() {
        let mut sampler = CadenceSampler::new(4, Duration::from_secs(10)).unwrap();
        let frame = black_frame();
        let base = Instant::now();

        // First frame is always sampled; same-instant offers are not due.
        assert!(sampler.offer(&frame, base).is_none());
        assert_eq!(sampler.pending(), 1);
        assert!(sampler.offer(&frame, base).is_none());
        assert_eq!(sampler.pending(), 1);

        // Once the interval elapses the next offer is sampled.
        assert!(sampler.offer(&frame, base + Duration::from_secs(11)).is_none());
        assert_eq!(sampler.pending(), 2);
    }

    #[test]
    fn worker_publishes_into_the_cell() {
        let cell = Arc::new(PredictionCell::new());
        let worker = InferenceWorker::spawn(
            Box::new(StubBackend::new(4)),
            Arc::clone(&cell),
            2,
        )
        .unwrap();

        let batch = vec![black_frame(), black_frame(), black_frame(), black_frame()];
        assert!(worker.dispatch(1, batch).unwrap());
        worker.finish().unwrap();

        let latest = cell.latest().expect("worker published a prediction");
        assert_eq!(latest.label(), "noFight");
        assert_eq!(cell.generation(), 1);
    }

    #[test]
    fn full_queue_drops_new_clips() {
        struct SlowBackend;
        impl ClassifierBackend for SlowBackend {
            fn name(&self) -> &'static str {
                "slow"
            }
            fn sequence_length(&self) -> usize {
                1
            }
            fn classify(&mut self, _clip: &Clip) -> Result<Prediction> {
                thread::sleep(Duration::from_millis(200));
                Prediction::from_logits(&[0.0, 0.0])
            }
        }

        let cell = Arc::new(PredictionCell::new());
        let worker = InferenceWorker::spawn(Box::new(SlowBackend), cell, 1).unwrap();

        // With a one-slot queue and a 200ms backend, at most two of five
        // immediate dispatches can be accepted.
        let mut dropped = false;
        for generation in 1..=5 {
            if !worker.dispatch(generation, vec![black_frame()]).unwrap() {
                dropped = true;
                break;
            }
        }
        assert!(dropped);
        worker.finish().unwrap();
    }

    #[test]
    fn stream_loop_covers_the_whole_source() {
        let cell = Arc::new(PredictionCell::new());
        let worker =
            InferenceWorker::spawn(Box::new(StubBackend::new(16)), Arc::clone(&cell), 4).unwrap();
        let mut source = VideoInput::open("stub://black?frames=64&width=64&height=48").unwrap();
        let mut display = NullDisplay::default();
        let opts = StreamOptions {
            sequence_length: 16,
            sample_interval: Duration::ZERO,
            queue_depth: 4,
        };
        let stop = AtomicBool::new(false);

        let stats =
            run_on_stream(&mut source, &worker, &mut display, &opts, &stop).unwrap();
        worker.finish().unwrap();

        assert_eq!(stats.frames_shown, 64);
        assert_eq!(stats.clips_dispatched + stats.clips_dropped, 4);
        assert!(stats.clips_dispatched >= 1);
        assert!(cell.latest().is_some());
    }

    #[test]
    fn stop_flag_ends_the_loop() {
        let cell = Arc::new(PredictionCell::new());
        let worker = InferenceWorker::spawn(Box::new(StubBackend::new(16)), cell, 2).unwrap();
        let mut source = VideoInput::open("stub://black?frames=64&width=64&height=48").unwrap();
        let mut display = NullDisplay::default();
        let stop = AtomicBool::new(true);

        let stats = run_on_stream(
            &mut source,
            &worker,
            &mut display,
            &StreamOptions::default(),
            &stop,
        )
        .unwrap();
        worker.finish().unwrap();
        assert_eq!(stats.frames_shown, 0);
    }
}

//! Shared latest-prediction slot for the live pipeline.
//!
//! The capture/display loop reads the newest completed prediction without
//! waiting on inference; the worker publishes results whenever they finish.
//! Each publish carries the generation number of the clip it came from, and
//! the slot rejects publishes older than what it already holds, so a slow
//! inference that finishes out of order can never overwrite a newer result.
//!
//! Readers may observe a stale value for the duration of one inference
//! call. That is the contract, not a bug.

use std::sync::Mutex;

use crate::classify::Prediction;

#[derive(Default)]
struct Slot {
    generation: u64,
    prediction: Option<Prediction>,
}

/// Thread-safe single-slot mailbox holding the latest prediction.
#[derive(Default)]
pub struct PredictionCell {
    slot: Mutex<Slot>,
}

impl PredictionCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a result for clip `generation`. Returns false (and keeps the
    /// current value) when a newer generation has already been published.
    pub fn publish(&self, generation: u64, prediction: Prediction) -> bool {
        let mut slot = match self.slot.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        if generation < slot.generation {
            return false;
        }
        slot.generation = generation;
        slot.prediction = Some(prediction);
        true
    }

    /// Latest published prediction, if any inference has completed yet.
    pub fn latest(&self) -> Option<Prediction> {
        let slot = match self.slot.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        slot.prediction.clone()
    }

    /// Generation of the latest published prediction.
    pub fn generation(&self) -> u64 {
        let slot = match self.slot.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        slot.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prediction(fight_logit: f32) -> Prediction {
        Prediction::from_logits(&[fight_logit, -fight_logit]).unwrap()
    }

    #[test]
    fn starts_empty() {
        let cell = PredictionCell::new();
        assert!(cell.latest().is_none());
    }

    #[test]
    fn publish_then_read() {
        let cell = PredictionCell::new();
        assert!(cell.publish(1, prediction(3.0)));
        assert_eq!(cell.latest().unwrap().label(), "fight");
    }

    #[test]
    fn stale_generation_is_rejected() {
        let cell = PredictionCell::new();
        assert!(cell.publish(2, prediction(-3.0)));
        // A slower clip from generation 1 finishes late.
        assert!(!cell.publish(1, prediction(3.0)));
        assert_eq!(cell.latest().unwrap().label(), "noFight");
        assert_eq!(cell.generation(), 2);
    }

    #[test]
    fn equal_generation_overwrites() {
        let cell = PredictionCell::new();
        assert!(cell.publish(1, prediction(-1.0)));
        assert!(cell.publish(1, prediction(1.0)));
        assert_eq!(cell.latest().unwrap().label(), "fight");
    }
}

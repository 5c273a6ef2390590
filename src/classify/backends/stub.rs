use anyhow::Result;

use crate::classify::backend::{ensure_clip_length, ClassifierBackend};
use crate::classify::result::Prediction;
use crate::clip::Clip;

/// Stub backend for testing. Scores a clip by temporal motion energy.
///
/// The heuristic is deterministic: the mean absolute difference between
/// consecutive normalized frames is turned into a pair of logits, so a
/// static clip (all-black test videos, frozen cameras) always ranks
/// "noFight" first and a clip with heavy frame-to-frame change ranks
/// "fight" first.
pub struct StubBackend {
    sequence_length: usize,
    threshold: f32,
    sharpness: f32,
}

impl StubBackend {
    pub fn new(sequence_length: usize) -> Self {
        Self {
            sequence_length,
            threshold: 0.1,
            sharpness: 40.0,
        }
    }

    /// Override the motion-energy threshold separating the classes.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    fn motion_energy(clip: &Clip) -> f32 {
        let frames = clip.frames();
        if frames.len() < 2 {
            return 0.0;
        }

        let mut total = 0.0f64;
        let mut count = 0u64;
        for pair in frames.windows(2) {
            for (a, b) in pair[0].data().iter().zip(pair[1].data()) {
                total += (a - b).abs() as f64;
                count += 1;
            }
        }
        (total / count as f64) as f32
    }
}

impl ClassifierBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn sequence_length(&self) -> usize {
        self.sequence_length
    }

    fn classify(&mut self, clip: &Clip) -> Result<Prediction> {
        ensure_clip_length(clip, self.sequence_length)?;

        let energy = Self::motion_energy(clip);
        let fight_logit = (energy - self.threshold) * self.sharpness;
        Prediction::from_logits(&[fight_logit, -fight_logit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;
    use crate::preprocess::Preprocessor;

    fn clip_of(frames: Vec<Frame>) -> Clip {
        let pre = Preprocessor::new();
        let processed = frames.iter().map(|f| pre.apply(f).unwrap()).collect();
        Clip::new(processed).unwrap()
    }

    fn solid(value: u8) -> Frame {
        Frame::new(vec![value; 64 * 48 * 3], 64, 48).unwrap()
    }

    #[test]
    fn static_clip_scores_no_fight() {
        let mut backend = StubBackend::new(4);
        let clip = clip_of(vec![solid(0), solid(0), solid(0), solid(0)]);
        let pred = backend.classify(&clip).unwrap();
        assert_eq!(pred.label(), "noFight");
    }

    #[test]
    fn flickering_clip_scores_fight() {
        let mut backend = StubBackend::new(4);
        let clip = clip_of(vec![solid(0), solid(255), solid(0), solid(255)]);
        let pred = backend.classify(&clip).unwrap();
        assert_eq!(pred.label(), "fight");
        assert!(pred.probability() > 0.5);
    }

    #[test]
    fn wrong_clip_length_fails_fast() {
        let mut backend = StubBackend::new(8);
        let clip = clip_of(vec![solid(0), solid(0)]);
        assert!(backend.classify(&clip).is_err());
    }

    #[test]
    fn deterministic_across_calls() {
        let mut backend = StubBackend::new(2);
        let clip = clip_of(vec![solid(10), solid(200)]);
        let a = backend.classify(&clip).unwrap();
        let b = backend.classify(&clip).unwrap();
        assert_eq!(a.probability(), b.probability());
    }
}

//! Ranked classification results.

use anyhow::{anyhow, Result};

use crate::CLASS_LABELS;

/// One (label, probability) pair from the softmaxed model output.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClassScore {
    pub label: &'static str,
    pub probability: f32,
}

/// Full ranked prediction for one clip: every class with its probability,
/// sorted descending. Probabilities come from a softmax over the raw model
/// outputs, so they are non-negative and sum to 1.
#[derive(Clone, Debug)]
pub struct Prediction {
    scores: Vec<ClassScore>,
}

impl Prediction {
    /// Rank the raw logits. Fails when the model head size does not match
    /// the class list.
    pub fn from_logits(logits: &[f32]) -> Result<Self> {
        if logits.len() != CLASS_LABELS.len() {
            return Err(anyhow!(
                "model produced {} outputs, class list has {}",
                logits.len(),
                CLASS_LABELS.len()
            ));
        }

        let probabilities = softmax(logits);
        let mut scores: Vec<ClassScore> = CLASS_LABELS
            .iter()
            .copied()
            .zip(probabilities)
            .map(|(label, probability)| ClassScore { label, probability })
            .collect();
        scores.sort_by(|a, b| b.probability.total_cmp(&a.probability));

        Ok(Self { scores })
    }

    /// Highest-probability class.
    pub fn top(&self) -> &ClassScore {
        // from_logits guarantees at least one score.
        &self.scores[0]
    }

    /// Label of the highest-probability class.
    pub fn label(&self) -> &'static str {
        self.top().label
    }

    /// Probability of the highest-probability class.
    pub fn probability(&self) -> f32 {
        self.top().probability
    }

    /// Whether the top class matches `label`.
    pub fn is(&self, label: &str) -> bool {
        self.label() == label
    }

    /// All classes, sorted descending by probability.
    pub fn scores(&self) -> &[ClassScore] {
        &self.scores
    }

    /// The top `k` classes (clamped to the class count).
    pub fn top_k(&self, k: usize) -> &[ClassScore] {
        &self.scores[..k.min(self.scores.len())]
    }
}

/// Numerically stable softmax over raw logits.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|v| v / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn softmax_sums_to_one_and_stays_non_negative() {
        let probs = softmax(&[2.5, -1.0]);
        assert!(probs.iter().all(|p| *p >= 0.0));
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn softmax_is_stable_for_large_logits() {
        let probs = softmax(&[1000.0, 999.0]);
        assert!(probs.iter().all(|p| p.is_finite()));
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn prediction_ranks_descending() {
        let pred = Prediction::from_logits(&[-3.0, 4.0]).unwrap();
        assert_eq!(pred.label(), "noFight");
        assert_eq!(pred.scores().len(), 2);
        assert!(pred.scores()[0].probability >= pred.scores()[1].probability);
        let total: f32 = pred.scores().iter().map(|s| s.probability).sum();
        assert!((total - 1.0).abs() < 1e-6);
    }

    #[test]
    fn prediction_rejects_wrong_head_size() {
        assert!(Prediction::from_logits(&[0.1, 0.2, 0.3]).is_err());
        assert!(Prediction::from_logits(&[0.1]).is_err());
    }

    #[test]
    fn top_k_clamps_to_class_count() {
        let pred = Prediction::from_logits(&[1.0, 0.0]).unwrap();
        assert_eq!(pred.top_k(1).len(), 1);
        assert_eq!(pred.top_k(10).len(), 2);
    }
}

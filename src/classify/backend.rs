use anyhow::{anyhow, Result};

use crate::classify::result::Prediction;
use crate::clip::Clip;

/// Classifier backend trait.
///
/// A backend owns a loaded model (or heuristic) and maps one clip to a
/// ranked prediction. Backends are inference-only and deterministic for
/// fixed weights.
///
/// Implementations must fail fast with a shape-mismatch error when the clip
/// length differs from `sequence_length` - padding a short clip would feed
/// the model input it was never trained on.
pub trait ClassifierBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Clip length the backend was configured for.
    fn sequence_length(&self) -> usize;

    /// Classify one clip.
    fn classify(&mut self, clip: &Clip) -> Result<Prediction>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Shared fail-fast check for clip length mismatches.
pub(crate) fn ensure_clip_length(clip: &Clip, expected: usize) -> Result<()> {
    if clip.len() != expected {
        return Err(anyhow!(
            "clip holds {} frames, backend expects {}",
            clip.len(),
            expected
        ));
    }
    Ok(())
}

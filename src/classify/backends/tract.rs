#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::classify::backend::{ensure_clip_length, ClassifierBackend};
use crate::classify::result::Prediction;
use crate::clip::Clip;
use crate::preprocess::CROP_SIZE;

/// Tract-based backend for the ONNX video classifier.
///
/// Loads the exported 3D-ResNet-style model and pins its input to
/// `[1, 3, N, 112, 112]` (batch, channel, time, height, width). The plan is
/// frozen at load time, so inference is deterministic and gradient-free.
pub struct TractBackend {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>, TypedModel>,
    sequence_length: usize,
}

impl TractBackend {
    /// Load the ONNX model from disk and prepare it for inference. Load
    /// failures are fatal and propagate to the caller.
    pub fn new<P: AsRef<Path>>(model_path: P, sequence_length: usize) -> Result<Self> {
        if sequence_length == 0 {
            return Err(anyhow!("sequence length must be greater than zero"));
        }
        let model_path = model_path.as_ref();
        let side = CROP_SIZE as usize;
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, 3, sequence_length, side, side),
                ),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            sequence_length,
        })
    }

    fn build_input(&self, clip: &Clip) -> Tensor {
        let side = CROP_SIZE as usize;
        let frames = clip.frames();
        let input = tract_ndarray::Array5::from_shape_fn(
            (1, 3, frames.len(), side, side),
            |(_, channel, t, y, x)| frames[t].at(channel, y, x),
        );
        input.into_tensor()
    }

    fn extract_logits(&self, outputs: TVec<TValue>) -> Result<Vec<f32>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        Ok(view.iter().copied().collect())
    }
}

impl ClassifierBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn sequence_length(&self) -> usize {
        self.sequence_length
    }

    fn classify(&mut self, clip: &Clip) -> Result<Prediction> {
        ensure_clip_length(clip, self.sequence_length)?;

        let input = self.build_input(clip);
        let outputs = self
            .model
            .run(tvec!(input.into_tvalue()))
            .context("ONNX inference failed")?;
        let logits = self.extract_logits(outputs)?;
        Prediction::from_logits(&logits)
    }
}

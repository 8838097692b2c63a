#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::detect::backend::HandDetector;
use crate::detect::landmarks::{HandLandmarks, Landmark, HAND_LANDMARK_COUNT};

/// Square input edge of the hand landmark model.
pub const MODEL_INPUT_SIZE: u32 = 224;

/// Tract-based backend for an ONNX hand landmark model.
///
/// Expects the common 21-keypoint layout: input `1x224x224x3` RGB in `0..1`,
/// output 0 holding `21 * (x, y, z)` in input pixels and output 1 holding the
/// hand presence score. The whole frame is fed to the model; there is no
/// separate palm-detection crop.
pub struct TractBackend {
    model: TypedRunnableModel<TypedModel>,
    confidence_threshold: f32,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let model_path = model_path.as_ref();
        let size = MODEL_INPUT_SIZE as usize;
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, size, size, 3)),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            confidence_threshold: 0.7,
        })
    }

    /// Override the default presence threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    fn build_input(&self, pixels: &[u8], width: u32, height: u32) -> Result<Tensor> {
        let expected_len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;

        if pixels.len() != expected_len || width == 0 || height == 0 {
            return Err(anyhow!(
                "expected {} RGB bytes for {}x{}, received {}",
                expected_len,
                width,
                height,
                pixels.len()
            ));
        }

        // Nearest-neighbour resample into the model's square input.
        let size = MODEL_INPUT_SIZE as usize;
        let (w, h) = (width as usize, height as usize);
        let input = tract_ndarray::Array4::from_shape_fn((1, size, size, 3), |(_, y, x, channel)| {
            let sx = x * w / size;
            let sy = y * h / size;
            pixels[(sy * w + sx) * 3 + channel] as f32 / 255.0
        });

        Ok(input.into_tensor())
    }

    fn extract_hand(&self, outputs: TVec<TValue>) -> Result<Option<HandLandmarks>> {
        let coords = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?
            .to_array_view::<f32>()
            .context("landmark tensor was not f32")?;
        let score = outputs
            .get(1)
            .ok_or_else(|| anyhow!("model produced no presence score"))?
            .to_array_view::<f32>()
            .context("presence tensor was not f32")?
            .iter()
            .copied()
            .next()
            .ok_or_else(|| anyhow!("presence tensor is empty"))?;

        let confidence = presence_probability(score);
        if confidence < self.confidence_threshold {
            return Ok(None);
        }

        let values: Vec<f32> = coords.iter().copied().collect();
        if values.len() < HAND_LANDMARK_COUNT * 3 {
            return Err(anyhow!(
                "expected {} landmark values, got {}",
                HAND_LANDMARK_COUNT * 3,
                values.len()
            ));
        }

        let scale = MODEL_INPUT_SIZE as f32;
        let points = values
            .chunks_exact(3)
            .take(HAND_LANDMARK_COUNT)
            .map(|xyz| Landmark::new(xyz[0] / scale, xyz[1] / scale, xyz[2] / scale))
            .collect();
        HandLandmarks::new(points, confidence).map(Some)
    }
}

/// Some exports emit a raw logit for presence; squash those into `0..1`.
fn presence_probability(score: f32) -> f32 {
    if (0.0..=1.0).contains(&score) {
        score
    } else {
        1.0 / (1.0 + (-score).exp())
    }
}

impl HandDetector for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Option<HandLandmarks>> {
        let input = self.build_input(pixels, width, height)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        self.extract_hand(outputs)
    }

    fn warm_up(&mut self) -> Result<()> {
        let size = MODEL_INPUT_SIZE;
        let blank = vec![0u8; (size * size * 3) as usize];
        self.detect(&blank, size, size).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presence_scores_map_into_unit_range() {
        assert_eq!(presence_probability(0.8), 0.8);
        assert!(presence_probability(6.0) > 0.99);
        assert!(presence_probability(-6.0) < 0.01);
    }
}

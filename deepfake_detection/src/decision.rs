use crate::errors::DetectionError;
use serde::Serialize;

/// Per-frame fake-likelihood scores, index-aligned with the frames that produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreVector(Vec<f32>);

impl ScoreVector {
    pub fn new(scores: Vec<f32>) -> Result<Self, DetectionError> {
        if scores.is_empty() {
            return Err(DetectionError::EmptyBatch);
        }
        Ok(Self(scores))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn max(&self) -> f32 {
        self.0.iter().copied().fold(f32::NEG_INFINITY, f32::max)
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Label {
    Real,
    Fake,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Real => "Real",
            Label::Fake => "Fake",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub predictions: Vec<f32>,
    pub best_prediction: f32,
    pub classification: Label,
}

/// Reduces scores to a verdict. The strongest frame decides; the threshold is
/// inclusive on the `Fake` side.
pub fn decide(scores: ScoreVector, threshold: f32) -> ClassificationResult {
    let best_prediction = scores.max();
    let classification = if best_prediction >= threshold {
        Label::Fake
    } else {
        Label::Real
    };

    ClassificationResult {
        predictions: scores.into_inner(),
        best_prediction,
        classification,
    }
}

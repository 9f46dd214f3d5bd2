//! Embedding vector model and similarity math.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A dense embedding vector in the shared image/text space.
///
/// Vectors are compared with cosine similarity, so callers never need to
/// know whether the encoder L2-normalizes its outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Embedding(Vec<f32>);

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn dim(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Cosine similarity in [-1.0, 1.0]. Returns 0.0 when either vector
    /// has (near-)zero norm, so degenerate embeddings never match.
    pub fn cosine_similarity(&self, other: &Self) -> f32 {
        debug_assert_eq!(self.dim(), other.dim(), "embedding dimension mismatch");

        let mut dot = 0.0f32;
        let mut norm_a = 0.0f32;
        let mut norm_b = 0.0f32;
        for (a, b) in self.0.iter().zip(other.0.iter()) {
            dot += a * b;
            norm_a += a * a;
            norm_b += b * b;
        }

        let denom = norm_a.sqrt() * norm_b.sqrt();
        if denom <= f32::EPSILON {
            return 0.0;
        }
        dot / denom
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}

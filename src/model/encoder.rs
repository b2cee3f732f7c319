//! Forward inference for the bi-encoder.
//!
//! Queries take a single linear projection (cheap, computed per request). Keys take a
//! two-layer perceptron with ReLU, computed once per corpus entry or emotion label and cached.

use ndarray::ArrayView1;

use super::{check_input_dim, ModelWeights, ProjectedVector};
use crate::error::DimensionError;

/// Owns the model weights for the process lifetime and runs both encoding paths.
#[derive(Debug)]
pub struct BiEncoder {
    weights: ModelWeights,
}

impl BiEncoder {
    pub fn new(weights: ModelWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ModelWeights {
        &self.weights
    }

    /// `query_proj · x`. No bias, no activation.
    pub fn encode_query(&self, x: &[f32]) -> Result<ProjectedVector, DimensionError> {
        check_input_dim(x)?;
        let x = ArrayView1::from(x);
        Ok(ProjectedVector::from_array(self.weights.query_proj.dot(&x)))
    }

    /// `fc2 · ReLU(fc1 · x + b1) + b2`.
    pub fn encode_key(&self, x: &[f32]) -> Result<ProjectedVector, DimensionError> {
        check_input_dim(x)?;
        let x = ArrayView1::from(x);

        let mut hidden = self.weights.key_fc1_weight.dot(&x) + &self.weights.key_fc1_bias;
        hidden.mapv_inplace(|v| v.max(0.0));

        let out = self.weights.key_fc2_weight.dot(&hidden) + &self.weights.key_fc2_bias;
        Ok(ProjectedVector::from_array(out))
    }

    /// Bilinear relevance score. Not a cosine; self-similarity is not guaranteed maximal.
    pub fn score(&self, query: &ProjectedVector, key: &ProjectedVector) -> f32 {
        query.dot(key)
    }
}

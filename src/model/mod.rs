//! Bi-encoder model: binary weight format and forward inference.
//!
//! The model maps 1536-dim provider embeddings into a 256-dim comparison space through two
//! independent paths: a linear query projection and a two-layer key perceptron. See
//! [`weights`] for the on-disk layout and [`encoder`] for the forward passes.

pub mod encoder;
pub mod weights;

use ndarray::Array1;

use crate::error::DimensionError;

pub use encoder::BiEncoder;
pub use weights::{load_weights, read_weights, write_weights, ModelWeights};

/// Width of raw provider embeddings (text-embedding-3-small).
pub const INPUT_DIM: usize = 1536;

/// Width of the key perceptron's hidden layer.
pub const HIDDEN_DIM: usize = 32;

/// Width of the shared comparison space.
pub const PROJ_DIM: usize = 256;

/// A vector in the shared comparison space. Always exactly [`PROJ_DIM`] long.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedVector(Array1<f32>);

impl ProjectedVector {
    /// Wrap a precomputed projection, rejecting any length other than [`PROJ_DIM`].
    pub fn from_vec(values: Vec<f32>) -> Result<Self, DimensionError> {
        if values.len() != PROJ_DIM {
            return Err(DimensionError {
                expected: PROJ_DIM,
                actual: values.len(),
            });
        }
        Ok(Self(Array1::from(values)))
    }

    /// All-zeros projection.
    pub fn zeros() -> Self {
        Self(Array1::zeros(PROJ_DIM))
    }

    pub(crate) fn from_array(values: Array1<f32>) -> Self {
        debug_assert_eq!(values.len(), PROJ_DIM);
        Self(values)
    }

    pub fn as_slice(&self) -> &[f32] {
        self.0.as_slice().unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Dot product against another projection. Higher is more relevant.
    pub fn dot(&self, other: &ProjectedVector) -> f32 {
        self.0.dot(&other.0)
    }
}

/// Reject raw embeddings whose width is not [`INPUT_DIM`].
pub fn check_input_dim(x: &[f32]) -> Result<(), DimensionError> {
    if x.len() == INPUT_DIM {
        Ok(())
    } else {
        Err(DimensionError {
            expected: INPUT_DIM,
            actual: x.len(),
        })
    }
}

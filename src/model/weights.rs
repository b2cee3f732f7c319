//! Binary weight format.
//!
//! Layout (all integers and floats big-endian):
//!
//! | Field | Encoding |
//! |-------|----------|
//! | magic | 8 bytes, ASCII `GITA_MDL` |
//! | version | u32, must be 1 |
//! | `query_proj` | rows u32, cols u32, rows×cols f32 (256×1536) |
//! | `key_fc1.weight` | rows u32, cols u32, rows×cols f32 (32×1536) |
//! | `key_fc1.bias` | n u32, n f32 (32) |
//! | `key_fc2.weight` | rows u32, cols u32, rows×cols f32 (256×32) |
//! | `key_fc2.bias` | n u32, n f32 (256) |
//!
//! Matrices are row-major.

use std::io::{self, Read, Write};
use std::path::Path;

use ndarray::{Array1, Array2};

use super::{HIDDEN_DIM, INPUT_DIM, PROJ_DIM};
use crate::error::FormatError;

pub const MODEL_MAGIC: &[u8; 8] = b"GITA_MDL";
pub const MODEL_VERSION: u32 = 1;

/// The four trained tensors of the bi-encoder. Shapes are validated on construction.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelWeights {
    /// P×D query projection.
    pub query_proj: Array2<f32>,
    /// H×D first key layer.
    pub key_fc1_weight: Array2<f32>,
    /// H first key layer bias.
    pub key_fc1_bias: Array1<f32>,
    /// P×H second key layer.
    pub key_fc2_weight: Array2<f32>,
    /// P second key layer bias.
    pub key_fc2_bias: Array1<f32>,
}

impl ModelWeights {
    pub fn new(
        query_proj: Array2<f32>,
        key_fc1_weight: Array2<f32>,
        key_fc1_bias: Array1<f32>,
        key_fc2_weight: Array2<f32>,
        key_fc2_bias: Array1<f32>,
    ) -> Result<Self, FormatError> {
        check_shape("query_proj", &[PROJ_DIM, INPUT_DIM], query_proj.shape())?;
        check_shape("key_fc1.weight", &[HIDDEN_DIM, INPUT_DIM], key_fc1_weight.shape())?;
        check_shape("key_fc1.bias", &[HIDDEN_DIM], key_fc1_bias.shape())?;
        check_shape("key_fc2.weight", &[PROJ_DIM, HIDDEN_DIM], key_fc2_weight.shape())?;
        check_shape("key_fc2.bias", &[PROJ_DIM], key_fc2_bias.shape())?;
        Ok(Self {
            query_proj,
            key_fc1_weight,
            key_fc1_bias,
            key_fc2_weight,
            key_fc2_bias,
        })
    }

    /// All-zero weights of the correct shape.
    pub fn zeros() -> Self {
        Self {
            query_proj: Array2::zeros((PROJ_DIM, INPUT_DIM)),
            key_fc1_weight: Array2::zeros((HIDDEN_DIM, INPUT_DIM)),
            key_fc1_bias: Array1::zeros(HIDDEN_DIM),
            key_fc2_weight: Array2::zeros((PROJ_DIM, HIDDEN_DIM)),
            key_fc2_bias: Array1::zeros(PROJ_DIM),
        }
    }

    /// Total number of f32 parameters.
    pub fn parameter_count(&self) -> usize {
        self.query_proj.len()
            + self.key_fc1_weight.len()
            + self.key_fc1_bias.len()
            + self.key_fc2_weight.len()
            + self.key_fc2_bias.len()
    }
}

/// Read a weight file from disk.
pub fn load_weights(path: impl AsRef<Path>) -> Result<ModelWeights, FormatError> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    let weights = read_weights(io::BufReader::new(file))?;
    tracing::info!(
        path = %path.display(),
        parameters = weights.parameter_count(),
        "model weights loaded"
    );
    Ok(weights)
}

/// Deserialize weights from a byte stream.
pub fn read_weights<R: Read>(mut input: R) -> Result<ModelWeights, FormatError> {
    let mut magic = [0u8; 8];
    read_exact(&mut input, &mut magic, "magic")?;
    if &magic != MODEL_MAGIC {
        return Err(FormatError::InvalidMagic(
            String::from_utf8_lossy(&magic).into_owned(),
        ));
    }

    let version = read_u32(&mut input, "version")?;
    if version != MODEL_VERSION {
        return Err(FormatError::UnsupportedVersion(version));
    }

    let query_proj = read_matrix(&mut input, "query_proj", (PROJ_DIM, INPUT_DIM))?;
    let key_fc1_weight = read_matrix(&mut input, "key_fc1.weight", (HIDDEN_DIM, INPUT_DIM))?;
    let key_fc1_bias = read_vector(&mut input, "key_fc1.bias", HIDDEN_DIM)?;
    let key_fc2_weight = read_matrix(&mut input, "key_fc2.weight", (PROJ_DIM, HIDDEN_DIM))?;
    let key_fc2_bias = read_vector(&mut input, "key_fc2.bias", PROJ_DIM)?;

    ModelWeights::new(
        query_proj,
        key_fc1_weight,
        key_fc1_bias,
        key_fc2_weight,
        key_fc2_bias,
    )
}

/// Serialize weights in the layout [`read_weights`] expects.
pub fn write_weights<W: Write>(mut out: W, weights: &ModelWeights) -> io::Result<()> {
    out.write_all(MODEL_MAGIC)?;
    out.write_all(&MODEL_VERSION.to_be_bytes())?;
    write_matrix(&mut out, &weights.query_proj)?;
    write_matrix(&mut out, &weights.key_fc1_weight)?;
    write_vector(&mut out, &weights.key_fc1_bias)?;
    write_matrix(&mut out, &weights.key_fc2_weight)?;
    write_vector(&mut out, &weights.key_fc2_bias)?;
    out.flush()
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn check_shape(
    tensor: &'static str,
    expected: &[usize],
    actual: &[usize],
) -> Result<(), FormatError> {
    if expected == actual {
        Ok(())
    } else {
        Err(FormatError::ShapeMismatch {
            tensor,
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        })
    }
}

fn read_exact<R: Read>(
    input: &mut R,
    buf: &mut [u8],
    what: &'static str,
) -> Result<(), FormatError> {
    input.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => FormatError::Truncated(what),
        _ => FormatError::Io(e),
    })
}

fn read_u32<R: Read>(input: &mut R, what: &'static str) -> Result<u32, FormatError> {
    let mut buf = [0u8; 4];
    read_exact(input, &mut buf, what)?;
    Ok(u32::from_be_bytes(buf))
}

fn read_f32s<R: Read>(
    input: &mut R,
    count: usize,
    what: &'static str,
) -> Result<Vec<f32>, FormatError> {
    let mut buf = vec![0u8; count * 4];
    read_exact(input, &mut buf, what)?;
    Ok(buf
        .chunks_exact(4)
        .map(|b| f32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

/// Shape is checked before the payload is read so a corrupt header can't force a huge allocation.
fn read_matrix<R: Read>(
    input: &mut R,
    tensor: &'static str,
    expected: (usize, usize),
) -> Result<Array2<f32>, FormatError> {
    let rows = read_u32(input, tensor)? as usize;
    let cols = read_u32(input, tensor)? as usize;
    check_shape(tensor, &[expected.0, expected.1], &[rows, cols])?;

    let data = read_f32s(input, rows * cols, tensor)?;
    Array2::from_shape_vec((rows, cols), data).map_err(|_| FormatError::ShapeMismatch {
        tensor,
        expected: vec![expected.0, expected.1],
        actual: vec![rows, cols],
    })
}

fn read_vector<R: Read>(
    input: &mut R,
    tensor: &'static str,
    expected: usize,
) -> Result<Array1<f32>, FormatError> {
    let n = read_u32(input, tensor)? as usize;
    check_shape(tensor, &[expected], &[n])?;
    Ok(Array1::from(read_f32s(input, n, tensor)?))
}

fn write_matrix<W: Write>(out: &mut W, m: &Array2<f32>) -> io::Result<()> {
    let (rows, cols) = m.dim();
    out.write_all(&(rows as u32).to_be_bytes())?;
    out.write_all(&(cols as u32).to_be_bytes())?;
    // `iter` walks in logical (row-major) order regardless of memory layout.
    for v in m.iter() {
        out.write_all(&v.to_be_bytes())?;
    }
    Ok(())
}

fn write_vector<W: Write>(out: &mut W, v: &Array1<f32>) -> io::Result<()> {
    out.write_all(&(v.len() as u32).to_be_bytes())?;
    for x in v.iter() {
        out.write_all(&x.to_be_bytes())?;
    }
    Ok(())
}

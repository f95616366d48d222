//! The ephemeral tensor record passed from the archive to the model.

use anyhow::{anyhow, Result};
use ndarray::{Array1, Array2};

/// A named, shaped, flat f32 buffer read out of a weight archive.
///
/// Produced by [`crate::archive::WeightArchive::get`], adapted by
/// [`crate::remap::adapt_tensor`], consumed by the model's assign call,
/// then dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorData {
    pub name: String,
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl TensorData {
    /// Creates a tensor, checking that the buffer matches the shape.
    pub fn new(name: impl Into<String>, shape: Vec<usize>, data: Vec<f32>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(anyhow!(
                "tensor buffer has {} elements but shape {:?} needs {}",
                data.len(),
                shape,
                expected
            ));
        }
        Ok(Self {
            name: name.into(),
            shape,
            data,
        })
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of axes.
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Views the buffer as a 1-D array.
    pub fn to_array1(&self) -> Result<Array1<f32>> {
        if self.rank() != 1 {
            return Err(anyhow!(
                "tensor '{}' has shape {:?}, expected rank 1",
                self.name,
                self.shape
            ));
        }
        Ok(Array1::from_vec(self.data.clone()))
    }

    /// Views the buffer as a 2-D array in row-major order.
    pub fn to_array2(&self) -> Result<Array2<f32>> {
        if self.rank() != 2 {
            return Err(anyhow!(
                "tensor '{}' has shape {:?}, expected rank 2",
                self.name,
                self.shape
            ));
        }
        Array2::from_shape_vec((self.shape[0], self.shape[1]), self.data.clone())
            .map_err(|e| anyhow!("tensor '{}': {}", self.name, e))
    }
}

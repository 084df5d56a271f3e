//! Fixed-length real vector

use super::DenseError;
use ndarray::{Array1, ArrayView1, ArrayViewMut1};
use std::ops::{Index, IndexMut};

/// A dense vector of `f64` with a length fixed at construction
///
/// `get`/`set`/`add` are bounds-checked and return [`DenseError`]; the
/// `Index`/`IndexMut` impls panic instead, like slice indexing.
#[derive(Debug, Clone, PartialEq)]
pub struct Vector {
    data: Array1<f64>,
}

impl Vector {
    /// Zero-filled vector of length `len`
    pub fn new(len: usize) -> Self {
        Self {
            data: Array1::zeros(len),
        }
    }

    pub fn from_vec(values: Vec<f64>) -> Self {
        Self {
            data: Array1::from_vec(values),
        }
    }

    /// The `j`-th unit basis vector of length `len`
    ///
    /// # Panics
    /// Panics if `j >= len`.
    pub fn unit(len: usize, j: usize) -> Self {
        let mut v = Self::new(len);
        v.data[j] = 1.0;
        v
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Read element `i`
    pub fn get(&self, i: usize) -> Result<f64, DenseError> {
        self.data.get(i).copied().ok_or(self.out_of_bounds(i))
    }

    /// Overwrite element `i` with `value`
    pub fn set(&mut self, i: usize, value: f64) -> Result<(), DenseError> {
        let err = self.out_of_bounds(i);
        let slot = self.data.get_mut(i).ok_or(err)?;
        *slot = value;
        Ok(())
    }

    /// Accumulate `value` into element `i`
    pub fn add(&mut self, i: usize, value: f64) -> Result<(), DenseError> {
        let err = self.out_of_bounds(i);
        let slot = self.data.get_mut(i).ok_or(err)?;
        *slot += value;
        Ok(())
    }

    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }

    /// Contiguous slice over the elements
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        self.data
            .as_slice()
            .expect("owned vector storage should be contiguous")
    }

    #[inline]
    pub fn as_slice_mut(&mut self) -> &mut [f64] {
        self.data
            .as_slice_mut()
            .expect("owned vector storage should be contiguous")
    }

    pub fn as_array(&self) -> ArrayView1<'_, f64> {
        self.data.view()
    }

    pub fn as_array_mut(&mut self) -> ArrayViewMut1<'_, f64> {
        self.data.view_mut()
    }

    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        self.data.iter()
    }

    fn out_of_bounds(&self, index: usize) -> DenseError {
        DenseError::VectorIndexOutOfBounds {
            index,
            len: self.len(),
        }
    }
}

impl From<Vec<f64>> for Vector {
    fn from(values: Vec<f64>) -> Self {
        Self::from_vec(values)
    }
}

impl From<&[f64]> for Vector {
    fn from(values: &[f64]) -> Self {
        Self::from_vec(values.to_vec())
    }
}

impl Index<usize> for Vector {
    type Output = f64;

    #[inline]
    fn index(&self, i: usize) -> &f64 {
        &self.data[i]
    }
}

impl IndexMut<usize> for Vector {
    #[inline]
    fn index_mut(&mut self, i: usize) -> &mut f64 {
        &mut self.data[i]
    }
}

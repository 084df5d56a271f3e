//! Core traits for the numerical engine
//!
//! This module defines the two seams the rest of the simulator talks through:
//! - [`DenseMatrix`]: uniform element access, affine products and LU operations
//!   over both owning matrices and windows into them
//! - [`OdeSystem`]: the derivative callback supplied to the ODE integrator

use crate::dense::{DenseError, Vector};
use crate::direct::{self, LuConfig, LuError, LuPivots};
use ndarray::linalg::{general_mat_mul, general_mat_vec_mul};
use ndarray::{ArrayView2, ArrayViewMut2};

/// Trait for dense 2D storage of reals.
///
/// Implementors only expose their storage as ndarray views; every operation is
/// provided on top of that, so owning matrices and windows into another
/// matrix's storage behave identically. Only the indexing path differs.
///
/// # Product convention
///
/// Products follow the row-major mathematical convention: for an `m × k`
/// matrix `A`, [`gemv_affine`](DenseMatrix::gemv_affine) contracts over the
/// `k` columns and writes `m` results.
pub trait DenseMatrix {
    /// Read-only view of the storage
    fn array(&self) -> ArrayView2<'_, f64>;

    /// Mutable view of the storage
    fn array_mut(&mut self) -> ArrayViewMut2<'_, f64>;

    /// Number of rows
    fn nrows(&self) -> usize {
        self.array().nrows()
    }

    /// Number of columns
    fn ncols(&self) -> usize {
        self.array().ncols()
    }

    /// Check if the matrix is square
    fn is_square(&self) -> bool {
        self.nrows() == self.ncols()
    }

    /// Read element `(row, col)`
    fn get(&self, row: usize, col: usize) -> Result<f64, DenseError> {
        let a = self.array();
        let (rows, cols) = a.dim();
        a.get((row, col))
            .copied()
            .ok_or(DenseError::IndexOutOfBounds {
                row,
                col,
                rows,
                cols,
            })
    }

    /// Overwrite element `(row, col)`
    fn set(&mut self, row: usize, col: usize, value: f64) -> Result<(), DenseError> {
        let mut a = self.array_mut();
        let (rows, cols) = a.dim();
        let slot = a.get_mut((row, col)).ok_or(DenseError::IndexOutOfBounds {
            row,
            col,
            rows,
            cols,
        })?;
        *slot = value;
        Ok(())
    }

    /// Accumulate `value` into element `(row, col)`
    fn add(&mut self, row: usize, col: usize, value: f64) -> Result<(), DenseError> {
        let mut a = self.array_mut();
        let (rows, cols) = a.dim();
        let slot = a.get_mut((row, col)).ok_or(DenseError::IndexOutOfBounds {
            row,
            col,
            rows,
            cols,
        })?;
        *slot += value;
        Ok(())
    }

    /// Set every element to `value`
    fn fill(&mut self, value: f64) {
        self.array_mut().fill(value);
    }

    /// Overwrite with the identity pattern (ones on the main diagonal)
    ///
    /// Non-square storage gets ones on its leading diagonal.
    fn make_identity(&mut self) {
        let mut a = self.array_mut();
        a.fill(0.0);
        a.diag_mut().fill(1.0);
    }

    /// Affine matrix-vector product: y = α·A·x + β·y
    ///
    /// `x` must have `ncols` entries and `y` must have `nrows` entries.
    /// With `beta == 0` the old contents of `y` are not read, so NaN or
    /// infinite values there are overwritten rather than propagated.
    fn gemv_affine(
        &self,
        x: &Vector,
        y: &mut Vector,
        alpha: f64,
        beta: f64,
    ) -> Result<(), DenseError> {
        let a = self.array();
        if x.len() != a.ncols() {
            return Err(DenseError::DimensionMismatch {
                context: "gemv x",
                expected: a.ncols(),
                got: x.len(),
            });
        }
        if y.len() != a.nrows() {
            return Err(DenseError::DimensionMismatch {
                context: "gemv y",
                expected: a.nrows(),
                got: y.len(),
            });
        }

        general_mat_vec_mul(alpha, &a, &x.as_array(), beta, &mut y.as_array_mut());
        Ok(())
    }

    /// Affine matrix-matrix product: Y = α·A·X + β·Y
    ///
    /// For `A` of shape `m × k`, `x` must be `k × n` and `y` must be `m × n`.
    /// As for [`gemv_affine`](DenseMatrix::gemv_affine), `beta == 0` ignores
    /// the old contents of `y`.
    fn gemm_affine<X, Y>(&self, x: &X, y: &mut Y, alpha: f64, beta: f64) -> Result<(), DenseError>
    where
        X: DenseMatrix + ?Sized,
        Y: DenseMatrix + ?Sized,
    {
        let a = self.array();
        let b = x.array();
        if b.nrows() != a.ncols() {
            return Err(DenseError::DimensionMismatch {
                context: "gemm X rows",
                expected: a.ncols(),
                got: b.nrows(),
            });
        }

        let mut c = y.array_mut();
        if c.nrows() != a.nrows() {
            return Err(DenseError::DimensionMismatch {
                context: "gemm Y rows",
                expected: a.nrows(),
                got: c.nrows(),
            });
        }
        if c.ncols() != b.ncols() {
            return Err(DenseError::DimensionMismatch {
                context: "gemm Y columns",
                expected: b.ncols(),
                got: c.ncols(),
            });
        }

        general_mat_mul(alpha, &a, &b, beta, &mut c);
        Ok(())
    }

    /// In-place LU decomposition (Crout, implicit scaling, partial pivoting)
    ///
    /// On success the storage holds the combined L and U factors and the
    /// returned [`LuPivots`] records the row interchanges.
    fn lu_decompose(&mut self, config: &LuConfig) -> Result<LuPivots, LuError> {
        direct::lu_decompose_in_place(self.array_mut(), config)
    }

    /// Solve A·x = b using factors produced by [`lu_decompose`](DenseMatrix::lu_decompose)
    ///
    /// `b` is overwritten with the solution.
    fn lu_solve(&self, pivots: &LuPivots, b: &mut Vector) -> Result<(), LuError> {
        direct::lu_solve_factored(self.array(), pivots, b)
    }

    /// Determinant of the original matrix from its LU factors
    fn lu_determinant(&self, pivots: &LuPivots) -> Result<f64, LuError> {
        direct::lu_determinant(self.array(), pivots)
    }

    /// Invert into `result`, destroying `self` (which is left holding its LU factors)
    fn invert_into<R>(&mut self, config: &LuConfig, result: &mut R) -> Result<LuPivots, LuError>
    where
        R: DenseMatrix + ?Sized,
    {
        direct::invert_in_place(self.array_mut(), config, result.array_mut())
    }
}

/// System of ordinary differential equations: dy/dx = f(x, y)
///
/// The integrator evaluates the system several times per attempted step, so
/// implementations should be pure functions of `(x, y)`.
pub trait OdeSystem {
    /// Evaluate the right-hand side
    ///
    /// # Arguments
    /// * `x` - Independent variable (time)
    /// * `y` - Current state
    /// * `dydx` - Output: derivative, same length as `y`
    fn derivatives(&mut self, x: f64, y: &[f64], dydx: &mut [f64]);
}

impl<F> OdeSystem for F
where
    F: FnMut(f64, &[f64], &mut [f64]),
{
    fn derivatives(&mut self, x: f64, y: &[f64], dydx: &mut [f64]) {
        self(x, y, dydx)
    }
}

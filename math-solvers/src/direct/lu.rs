//! LU decomposition solver
//!
//! Crout's method with implicit row scaling and partial pivoting, operating in
//! place on any dense storage (owning matrix or window). The factors share the
//! input storage: U on and above the diagonal, L (unit diagonal implied)
//! strictly below it.

use crate::dense::{DenseError, Matrix, Vector};
use crate::traits::DenseMatrix;
use ndarray::{ArrayView2, ArrayViewMut2, Axis};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sentinel written in place of an exactly-zero pivot
pub const TINY: f64 = 1.0e-20;

/// Errors that can occur during LU factorization
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LuError {
    #[error("Matrix must be square, got {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },
    #[error("Matrix is singular: row {row} is entirely zero")]
    Singular { row: usize },
    #[error("Zero pivot in column {column}")]
    ZeroPivot { column: usize },
    #[error("Invalid pivot row {row} recorded for column {column}")]
    InvalidPivot { column: usize, row: usize },
    #[error(transparent)]
    Dimension(#[from] DenseError),
}

/// What to do when a pivot is exactly zero after pivoting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PivotPolicy {
    /// Replace the pivot with [`LuConfig::tiny`] and carry on
    #[default]
    Substitute,
    /// Substitute as above and emit a warning
    Warn,
    /// Fail with [`LuError::ZeroPivot`]
    Strict,
}

/// LU decomposition configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LuConfig {
    /// Zero-pivot handling
    #[serde(default)]
    pub pivot_policy: PivotPolicy,
    /// Value substituted for a zero pivot
    #[serde(default = "default_tiny")]
    pub tiny: f64,
}

fn default_tiny() -> f64 {
    TINY
}

impl Default for LuConfig {
    fn default() -> Self {
        Self {
            pivot_policy: PivotPolicy::Substitute,
            tiny: TINY,
        }
    }
}

impl LuConfig {
    /// Configuration that rejects zero pivots
    pub fn strict() -> Self {
        Self {
            pivot_policy: PivotPolicy::Strict,
            ..Self::default()
        }
    }
}

/// Row interchanges recorded by [`lu_decompose_in_place`]
///
/// `indices[j]` is the row that was swapped into position `j` while
/// processing column `j` (it equals `j` when no swap happened). This is a
/// replay log, not a permutation map.
#[derive(Debug, Clone, PartialEq)]
pub struct LuPivots {
    /// Pivot row chosen for each column
    pub indices: Vec<usize>,
    /// +1.0 for an even number of row interchanges, -1.0 for odd
    pub parity: f64,
    /// Columns whose zero pivot was replaced by the sentinel
    pub substituted: Vec<usize>,
}

impl LuPivots {
    /// Matrix dimension
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Decompose `a` in place into its LU factors
///
/// A row made only of zeros fails with [`LuError::Singular`] before the
/// storage is touched. Pivots that are exactly zero after pivoting are
/// handled according to [`LuConfig::pivot_policy`]; nearly-singular pivots
/// are not detected.
pub fn lu_decompose_in_place(
    mut a: ArrayViewMut2<'_, f64>,
    config: &LuConfig,
) -> Result<LuPivots, LuError> {
    let (n, cols) = a.dim();
    if n != cols {
        return Err(LuError::NotSquare { rows: n, cols });
    }

    // Implicit scaling: 1 / largest magnitude of each row
    let mut scale = Vec::with_capacity(n);
    for (i, row) in a.axis_iter(Axis(0)).enumerate() {
        let big = row.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        if big == 0.0 {
            return Err(LuError::Singular { row: i });
        }
        scale.push(1.0 / big);
    }

    let mut indices = vec![0; n];
    let mut parity = 1.0;
    let mut substituted = Vec::new();

    for j in 0..n {
        // Upper triangle of column j
        for i in 0..j {
            let mut sum = a[[i, j]];
            for k in 0..i {
                sum -= a[[i, k]] * a[[k, j]];
            }
            a[[i, j]] = sum;
        }

        // Diagonal and below, tracking the scaled-largest candidate
        let mut big = 0.0;
        let mut imax = j;
        for i in j..n {
            let mut sum = a[[i, j]];
            for k in 0..j {
                sum -= a[[i, k]] * a[[k, j]];
            }
            a[[i, j]] = sum;

            let figure = scale[i] * sum.abs();
            if figure >= big {
                big = figure;
                imax = i;
            }
        }

        if imax != j {
            for k in 0..n {
                a.swap([imax, k], [j, k]);
            }
            parity = -parity;
            scale.swap(imax, j);
        }
        indices[j] = imax;

        if a[[j, j]] == 0.0 {
            match config.pivot_policy {
                PivotPolicy::Strict => return Err(LuError::ZeroPivot { column: j }),
                PivotPolicy::Warn => {
                    log::warn!("LU: zero pivot in column {}, substituting {:e}", j, config.tiny)
                }
                PivotPolicy::Substitute => {
                    log::debug!("LU: zero pivot in column {}, substituting {:e}", j, config.tiny)
                }
            }
            a[[j, j]] = config.tiny;
            substituted.push(j);
        }

        if j + 1 < n {
            let inv_pivot = 1.0 / a[[j, j]];
            for i in (j + 1)..n {
                a[[i, j]] *= inv_pivot;
            }
        }
    }

    Ok(LuPivots {
        indices,
        parity,
        substituted,
    })
}

/// Solve L·U·x = P·b against factors from [`lu_decompose_in_place`]
///
/// `b` is overwritten with `x`. The forward pass replays the recorded row
/// interchanges into `b` and skips the leading zero entries of the permuted
/// right-hand side: accumulation starts at the first nonzero entry.
///
/// # Panics
/// Panics if `lu` is not `n × n` or `b` is shorter than `n`, where
/// `n = indices.len()`.
pub fn lu_back_substitute(lu: ArrayView2<'_, f64>, indices: &[usize], b: &mut [f64]) {
    let n = indices.len();

    // Forward substitution with unit-diagonal L
    let mut first_nonzero: Option<usize> = None;
    for i in 0..n {
        let ip = indices[i];
        let mut sum = b[ip];
        b[ip] = b[i];
        if let Some(start) = first_nonzero {
            for j in start..i {
                sum -= lu[[i, j]] * b[j];
            }
        } else if sum != 0.0 {
            first_nonzero = Some(i);
        }
        b[i] = sum;
    }

    // Back substitution with U
    for i in (0..n).rev() {
        let mut sum = b[i];
        for j in (i + 1)..n {
            sum -= lu[[i, j]] * b[j];
        }
        b[i] = sum / lu[[i, i]];
    }
}

/// Checked wrapper around [`lu_back_substitute`] for a [`Vector`] right-hand side
///
/// The factor shape, the right-hand side length and every recorded pivot row
/// are validated before `b` is touched.
pub fn lu_solve_factored(
    lu: ArrayView2<'_, f64>,
    pivots: &LuPivots,
    b: &mut Vector,
) -> Result<(), LuError> {
    check_factors(lu, pivots)?;
    if b.len() != pivots.len() {
        return Err(DenseError::DimensionMismatch {
            context: "LU right-hand side",
            expected: pivots.len(),
            got: b.len(),
        }
        .into());
    }

    lu_back_substitute(lu, &pivots.indices, b.as_slice_mut());
    Ok(())
}

/// Determinant of the factored matrix: parity times the product of U's diagonal
pub fn lu_determinant(lu: ArrayView2<'_, f64>, pivots: &LuPivots) -> Result<f64, LuError> {
    check_factors(lu, pivots)?;
    Ok(lu.diag().iter().fold(pivots.parity, |acc, &d| acc * d))
}

/// Invert `a` into `result`
///
/// One decomposition followed by `n` solves against the unit basis vectors;
/// the `j`-th solution becomes column `j` of `result`. `a` is left holding
/// its LU factors. The shape of `result` is checked before `a` is modified.
pub fn invert_in_place(
    mut a: ArrayViewMut2<'_, f64>,
    config: &LuConfig,
    mut result: ArrayViewMut2<'_, f64>,
) -> Result<LuPivots, LuError> {
    let (n, cols) = a.dim();
    if n != cols {
        return Err(LuError::NotSquare { rows: n, cols });
    }
    if result.dim() != (n, n) {
        let (rows, got) = result.dim();
        return Err(DenseError::DimensionMismatch {
            context: "inverse result",
            expected: n,
            got: if rows != n { rows } else { got },
        }
        .into());
    }

    let pivots = lu_decompose_in_place(a.view_mut(), config)?;

    let mut col = vec![0.0; n];
    for j in 0..n {
        col.fill(0.0);
        col[j] = 1.0;
        lu_back_substitute(a.view(), &pivots.indices, &mut col);
        for (i, &v) in col.iter().enumerate() {
            result[[i, j]] = v;
        }
    }

    Ok(pivots)
}

/// Solve A·x = b, leaving both `a` and `b` untouched
///
/// This is a convenience function that factors a copy of `a`.
pub fn solve_dense(a: &Matrix, b: &Vector) -> Result<Vector, LuError> {
    let mut lu = a.clone();
    let pivots = lu.lu_decompose(&LuConfig::default())?;
    let mut x = b.clone();
    lu.lu_solve(&pivots, &mut x)?;
    Ok(x)
}

fn check_factors(lu: ArrayView2<'_, f64>, pivots: &LuPivots) -> Result<(), LuError> {
    let (rows, cols) = lu.dim();
    if rows != cols {
        return Err(LuError::NotSquare { rows, cols });
    }
    if rows != pivots.len() {
        return Err(DenseError::DimensionMismatch {
            context: "LU pivots",
            expected: rows,
            got: pivots.len(),
        }
        .into());
    }
    // Column j can only swap with a row at or below it
    if let Some((column, &row)) = pivots
        .indices
        .iter()
        .enumerate()
        .find(|&(j, &row)| row < j || row >= rows)
    {
        return Err(LuError::InvalidPivot { column, row });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dense::Window;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_lu_solve_real() {
        let a = Matrix::from_rows(&[&[4.0, 1.0], &[1.0, 3.0]]).unwrap();
        let b = Vector::from_vec(vec![1.0, 2.0]);

        let x = solve_dense(&a, &b).expect("LU solve should succeed");

        // Verify: Ax = b
        let mut ax = Vector::new(2);
        a.gemv_affine(&x, &mut ax, 1.0, 0.0).unwrap();
        for i in 0..2 {
            assert_relative_eq!(ax[i], b[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_back_substitute_replays_interchanges() {
        // Factors of A = [[0, 1], [2, 4]]: rows swapped at column 0, then
        // L = [[1, 0], [0, 1]], U = [[2, 4], [0, 1]].
        let lu = array![[2.0, 4.0], [0.0, 1.0]];
        let indices = [1, 1];

        // A·[1, 1] = [1, 6]
        let mut b = [1.0, 6.0];
        lu_back_substitute(lu.view(), &indices, &mut b);
        assert_relative_eq!(b[0], 1.0, epsilon = 1e-14);
        assert_relative_eq!(b[1], 1.0, epsilon = 1e-14);
    }

    #[test]
    fn test_back_substitute_skips_leading_zeros() {
        // Lower factor with a nonzero multiplier below the first zero entry:
        // L = [[1, 0, 0], [5, 1, 0], [7, 11, 1]], U = I.
        // A zero leading entry must not start accumulation, so the 5 and 7
        // multipliers are never applied to b[0] = 0.
        let lu = array![[1.0, 0.0, 0.0], [5.0, 1.0, 0.0], [7.0, 11.0, 1.0]];
        let indices = [0, 1, 2];

        let mut b = [0.0, 2.0, 3.0];
        lu_back_substitute(lu.view(), &indices, &mut b);

        // y1 = 2, y2 = 3 - 11·2
        assert_eq!(b, [0.0, 2.0, -19.0]);
    }

    #[test]
    fn test_back_substitute_matches_unpivoted_forward_pass() {
        let lu = array![[2.0, 1.0, 1.0], [0.5, 1.5, 0.5], [1.5, -1.0, 3.0]];
        let indices = [0, 1, 2];
        let mut b = [1.0, 2.0, 3.0];

        lu_back_substitute(lu.view(), &indices, &mut b);

        // Forward: y = [1, 1.5, 3 - 1.5 + 1.5] = [1, 1.5, 3]
        // Back: x2 = 1, x1 = (1.5 - 0.5) / 1.5, x0 = (1 - x1 - x2) / 2
        let x1 = 1.0 / 1.5;
        assert_relative_eq!(b[2], 1.0, epsilon = 1e-14);
        assert_relative_eq!(b[1], x1, epsilon = 1e-14);
        assert_relative_eq!(b[0], (1.0 - x1 - 1.0) / 2.0, epsilon = 1e-14);
    }

    #[test]
    fn test_decompose_records_pivots() {
        let mut a = Matrix::from_rows(&[&[1.0, 2.0], &[3.0, 4.0]]).unwrap();
        let pivots = a.lu_decompose(&LuConfig::default()).unwrap();

        // Scaled candidates: |1|/2 = 0.5 vs |3|/4 = 0.75, so row 1 is the pivot
        assert_eq!(pivots.indices, vec![1, 1]);
        assert_eq!(pivots.parity, -1.0);
        assert!(pivots.substituted.is_empty());
        assert_relative_eq!(a.get(0, 0).unwrap(), 3.0);
        assert_relative_eq!(a.get(1, 0).unwrap(), 1.0 / 3.0);
        assert_relative_eq!(a.get(1, 1).unwrap(), 2.0 - 4.0 / 3.0);
    }

    #[test]
    fn test_zero_row_is_singular() {
        let mut a = Matrix::from_rows(&[&[1.0, 2.0, 3.0], &[0.0, 0.0, 0.0], &[4.0, 5.0, 6.0]])
            .unwrap();
        let before = a.clone();

        let err = a.lu_decompose(&LuConfig::default()).unwrap_err();
        assert_eq!(err, LuError::Singular { row: 1 });
        // Storage untouched on failure
        assert_eq!(a, before);
    }

    #[test]
    fn test_zero_pivot_substituted_by_default() {
        // Rank-deficient but without a zero row
        let mut a = Matrix::from_rows(&[&[1.0, 2.0], &[2.0, 4.0]]).unwrap();
        let pivots = a.lu_decompose(&LuConfig::default()).unwrap();

        assert_eq!(pivots.substituted, vec![1]);
        assert_eq!(a.get(1, 1).unwrap(), TINY);
    }

    #[test]
    fn test_zero_pivot_warn_policy_substitutes() {
        let mut a = Matrix::from_rows(&[&[1.0, 2.0], &[2.0, 4.0]]).unwrap();
        let config = LuConfig {
            pivot_policy: PivotPolicy::Warn,
            tiny: 1e-12,
        };
        let pivots = a.lu_decompose(&config).unwrap();
        assert_eq!(pivots.substituted, vec![1]);
        assert_eq!(a.get(1, 1).unwrap(), 1e-12);
    }

    #[test]
    fn test_zero_pivot_strict_policy_fails() {
        let mut a = Matrix::from_rows(&[&[1.0, 2.0], &[2.0, 4.0]]).unwrap();
        let err = a.lu_decompose(&LuConfig::strict()).unwrap_err();
        assert_eq!(err, LuError::ZeroPivot { column: 1 });
    }

    #[test]
    fn test_not_square() {
        let mut a = Matrix::zeros(2, 3);
        assert_eq!(
            a.lu_decompose(&LuConfig::default()).unwrap_err(),
            LuError::NotSquare { rows: 2, cols: 3 }
        );
    }

    #[test]
    fn test_solve_length_mismatch() {
        let mut a = Matrix::identity(3);
        let pivots = a.lu_decompose(&LuConfig::default()).unwrap();
        let mut b = Vector::new(2);
        assert!(matches!(
            a.lu_solve(&pivots, &mut b),
            Err(LuError::Dimension(DenseError::DimensionMismatch { .. }))
        ));
    }

    #[test]
    fn test_lu_factorize_and_solve_multiple_rhs() {
        let original = Matrix::from_rows(&[&[4.0, 1.0, 0.0], &[1.0, 3.0, 1.0], &[0.0, 1.0, 2.0]])
            .unwrap();
        let mut a = original.clone();
        let pivots = a.lu_decompose(&LuConfig::default()).unwrap();

        for rhs in [[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]] {
            let b = Vector::from(&rhs[..]);
            let mut x = b.clone();
            a.lu_solve(&pivots, &mut x).unwrap();

            let mut ax = Vector::new(3);
            original.gemv_affine(&x, &mut ax, 1.0, 0.0).unwrap();
            for i in 0..3 {
                assert_relative_eq!(ax[i], b[i], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_solve_rejects_corrupt_pivots() {
        let mut a = Matrix::from_rows(&[&[1.0, 2.0], &[3.0, 4.0]]).unwrap();
        let good = a.lu_decompose(&LuConfig::default()).unwrap();

        let beyond = LuPivots {
            indices: vec![5, 1],
            ..good.clone()
        };
        let mut b = Vector::from_vec(vec![1.0, 1.0]);
        assert_eq!(
            a.lu_solve(&beyond, &mut b).unwrap_err(),
            LuError::InvalidPivot { column: 0, row: 5 }
        );
        assert_eq!(b.as_slice(), &[1.0, 1.0]);
        assert!(a.lu_determinant(&beyond).is_err());

        // Rows above the current column are never pivot candidates
        let above = LuPivots {
            indices: vec![1, 0],
            ..good
        };
        assert_eq!(
            a.lu_solve(&above, &mut b).unwrap_err(),
            LuError::InvalidPivot { column: 1, row: 0 }
        );
    }

    #[test]
    fn test_pivoting_decomposition_through_view() {
        let rows: [&[f64]; 3] = [&[1.0, 2.0, 0.5], &[3.0, 4.0, 1.0], &[0.0, 5.0, 6.0]];
        let rhs = [1.0, -2.0, 4.0];

        let mut owned = Matrix::from_rows(&rows).unwrap();
        let owned_pivots = owned.lu_decompose(&LuConfig::default()).unwrap();
        let mut owned_x = Vector::from(&rhs[..]);
        owned.lu_solve(&owned_pivots, &mut owned_x).unwrap();
        assert_ne!(owned_pivots.indices, vec![0, 1, 2]);

        let mut host = Matrix::zeros(5, 5);
        host.fill(9.0);
        let window = Window::new(3, 3, 1, 2);
        let (view_pivots, view_x) = {
            let mut block = host.view_mut(window).unwrap();
            for (i, row) in rows.iter().enumerate() {
                for (j, &v) in row.iter().enumerate() {
                    block.set(i, j, v).unwrap();
                }
            }
            let pivots = block.lu_decompose(&LuConfig::default()).unwrap();
            let mut x = Vector::from(&rhs[..]);
            block.lu_solve(&pivots, &mut x).unwrap();
            (pivots, x)
        };

        assert_eq!(view_pivots, owned_pivots);
        for i in 0..3 {
            assert_relative_eq!(view_x[i], owned_x[i], epsilon = 1e-14);
            for j in 0..3 {
                assert_eq!(host.get(i + 1, j + 2).unwrap(), owned.get(i, j).unwrap());
            }
        }

        // Cells outside the window keep their fill value
        for i in 0..5 {
            for j in 0..5 {
                let inside = (1..4).contains(&i) && (2..5).contains(&j);
                if !inside {
                    assert_eq!(host.get(i, j).unwrap(), 9.0);
                }
            }
        }

        // Solution satisfies the original system
        let original = Matrix::from_rows(&rows).unwrap();
        let mut residual = Vector::from(&rhs[..]);
        original.gemv_affine(&view_x, &mut residual, 1.0, -1.0).unwrap();
        assert!(residual.iter().all(|r| r.abs() < 1e-12));
    }

    #[test]
    fn test_determinant() {
        let mut a = Matrix::from_rows(&[&[4.0, 3.0], &[6.0, 3.0]]).unwrap();
        let pivots = a.lu_decompose(&LuConfig::default()).unwrap();
        assert_relative_eq!(a.lu_determinant(&pivots).unwrap(), -6.0, epsilon = 1e-12);

        let mut b = Matrix::from_rows(&[&[2.0, 0.0, 1.0], &[1.0, 3.0, 2.0], &[1.0, 1.0, 1.0]])
            .unwrap();
        let pivots = b.lu_decompose(&LuConfig::default()).unwrap();
        // 2(3-2) - 0 + 1(1-3) = 0
        assert_relative_eq!(b.lu_determinant(&pivots).unwrap(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_inverse_small() {
        let a = Matrix::from_rows(&[&[4.0, 7.0], &[2.0, 6.0]]).unwrap();
        let inv = a.inverse(&LuConfig::default()).unwrap();

        assert_relative_eq!(inv.get(0, 0).unwrap(), 0.6, epsilon = 1e-12);
        assert_relative_eq!(inv.get(0, 1).unwrap(), -0.7, epsilon = 1e-12);
        assert_relative_eq!(inv.get(1, 0).unwrap(), -0.2, epsilon = 1e-12);
        assert_relative_eq!(inv.get(1, 1).unwrap(), 0.4, epsilon = 1e-12);
    }

    #[test]
    fn test_invert_view_into_view() {
        // Invert the 2x2 block at (1, 1) of a 4x4 matrix into the block at (0, 2)
        // of a second matrix, without touching anything else.
        let mut source = Matrix::zeros(4, 4);
        source.fill(9.0);
        {
            let mut block = source.view_mut(Window::new(2, 2, 1, 1)).unwrap();
            block.set(0, 0, 4.0).unwrap();
            block.set(0, 1, 7.0).unwrap();
            block.set(1, 0, 2.0).unwrap();
            block.set(1, 1, 6.0).unwrap();
        }

        let mut target = Matrix::zeros(3, 4);
        {
            let mut block = source.view_mut(Window::new(2, 2, 1, 1)).unwrap();
            let mut out = target.view_mut(Window::new(2, 2, 0, 2)).unwrap();
            block.invert_into(&LuConfig::default(), &mut out).unwrap();
        }

        assert_relative_eq!(target.get(0, 2).unwrap(), 0.6, epsilon = 1e-12);
        assert_relative_eq!(target.get(0, 3).unwrap(), -0.7, epsilon = 1e-12);
        assert_relative_eq!(target.get(1, 2).unwrap(), -0.2, epsilon = 1e-12);
        assert_relative_eq!(target.get(1, 3).unwrap(), 0.4, epsilon = 1e-12);
        assert_eq!(target.get(2, 0).unwrap(), 0.0);
        assert_eq!(target.get(0, 0).unwrap(), 0.0);
        // Outside the decomposed block the source is unchanged
        assert_eq!(source.get(0, 0).unwrap(), 9.0);
        assert_eq!(source.get(3, 3).unwrap(), 9.0);
    }

    #[test]
    fn test_invert_rejects_wrong_result_shape() {
        let mut a = Matrix::identity(3);
        let mut result = Matrix::zeros(3, 2);
        let err = a
            .invert_into(&LuConfig::default(), &mut result)
            .unwrap_err();
        assert!(matches!(err, LuError::Dimension(_)));
        // Input not decomposed
        assert_eq!(a, Matrix::identity(3));
    }

    #[test]
    fn test_lu_identity() {
        let n = 5;
        let a = Matrix::identity(n);
        let b = Vector::from_vec((1..=n).map(|i| i as f64).collect());

        let x = solve_dense(&a, &b).expect("LU solve should succeed");

        for i in 0..n {
            assert_relative_eq!(x[i], b[i], epsilon = 1e-12);
        }
    }
}

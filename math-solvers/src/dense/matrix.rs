//! Dense matrices and windows into them
//!
//! A [`Matrix`] owns a row-major buffer. A [`MatrixView`] is a rectangular
//! window into another matrix's buffer: reads and writes through the view are
//! offset and land in the parent's storage, so they are visible through the
//! parent once the view is dropped.
//!
//! Views borrow their parent mutably. Two simultaneous views over one parent
//! are available through [`Matrix::split_views`], which requires the windows
//! to be disjoint.

use super::DenseError;
use crate::direct::{LuConfig, LuError};
use crate::traits::DenseMatrix;
use ndarray::{Array2, ArrayView2, ArrayViewMut2, s};
use std::fmt;
use std::ops::Range;

/// Rectangular region of a matrix: `rows × cols` starting at `(row_offset, col_offset)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub rows: usize,
    pub cols: usize,
    pub row_offset: usize,
    pub col_offset: usize,
}

impl Window {
    pub fn new(rows: usize, cols: usize, row_offset: usize, col_offset: usize) -> Self {
        Self {
            rows,
            cols,
            row_offset,
            col_offset,
        }
    }

    /// Whether the window lies inside a `rows × cols` matrix
    pub fn fits(&self, rows: usize, cols: usize) -> bool {
        let row_end = self.row_offset.checked_add(self.rows);
        let col_end = self.col_offset.checked_add(self.cols);
        matches!((row_end, col_end), (Some(r), Some(c)) if r <= rows && c <= cols)
    }

    /// Whether the two windows share at least one position
    ///
    /// Conservative for empty windows: an empty window whose offset lies
    /// strictly inside the other window is reported as overlapping.
    pub fn overlaps(&self, other: &Window) -> bool {
        fn intersect(a: &Range<usize>, b: &Range<usize>) -> bool {
            a.start < b.end && b.start < a.end
        }
        intersect(&self.row_range(), &other.row_range())
            && intersect(&self.col_range(), &other.col_range())
    }

    fn row_range(&self) -> Range<usize> {
        self.row_offset..self.row_offset.saturating_add(self.rows)
    }

    fn col_range(&self) -> Range<usize> {
        self.col_offset..self.col_offset.saturating_add(self.cols)
    }

    fn check(&self, rows: usize, cols: usize) -> Result<(), DenseError> {
        if self.fits(rows, cols) {
            Ok(())
        } else {
            Err(DenseError::WindowOutOfBounds {
                window: *self,
                rows,
                cols,
            })
        }
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} at ({}, {})",
            self.rows, self.cols, self.row_offset, self.col_offset
        )
    }
}

/// A dense, zero-initialised matrix owning its storage
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    data: Array2<f64>,
}

impl Matrix {
    /// Zero matrix of shape `rows × cols`
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            data: Array2::zeros((rows, cols)),
        }
    }

    /// `n × n` identity matrix
    pub fn identity(n: usize) -> Self {
        Self {
            data: Array2::eye(n),
        }
    }

    /// Build a matrix from row slices of equal length
    pub fn from_rows(rows: &[&[f64]]) -> Result<Self, DenseError> {
        let ncols = rows.first().map_or(0, |r| r.len());
        let mut m = Self::zeros(rows.len(), ncols);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != ncols {
                return Err(DenseError::DimensionMismatch {
                    context: "matrix row length",
                    expected: ncols,
                    got: row.len(),
                });
            }
            for (j, &v) in row.iter().enumerate() {
                m.data[[i, j]] = v;
            }
        }
        Ok(m)
    }

    pub fn from_array(data: Array2<f64>) -> Self {
        Self { data }
    }

    pub fn into_array(self) -> Array2<f64> {
        self.data
    }

    /// Window into this matrix sharing its storage
    pub fn view_mut(&mut self, window: Window) -> Result<MatrixView<'_>, DenseError> {
        window.check(self.data.nrows(), self.data.ncols())?;
        Ok(MatrixView {
            data: self
                .data
                .slice_mut(s![window.row_range(), window.col_range()]),
            origin: (window.row_offset, window.col_offset),
        })
    }

    /// Two simultaneous windows into this matrix
    ///
    /// The windows must both fit and must not overlap.
    pub fn split_views(
        &mut self,
        first: Window,
        second: Window,
    ) -> Result<(MatrixView<'_>, MatrixView<'_>), DenseError> {
        let (rows, cols) = self.data.dim();
        first.check(rows, cols)?;
        second.check(rows, cols)?;
        if first.overlaps(&second) {
            return Err(DenseError::OverlappingWindows { first, second });
        }

        let (a, b) = self.data.multi_slice_mut((
            s![first.row_range(), first.col_range()],
            s![second.row_range(), second.col_range()],
        ));
        Ok((
            MatrixView {
                data: a,
                origin: (first.row_offset, first.col_offset),
            },
            MatrixView {
                data: b,
                origin: (second.row_offset, second.col_offset),
            },
        ))
    }

    /// Inverse of this matrix, leaving `self` untouched
    pub fn inverse(&self, config: &LuConfig) -> Result<Matrix, LuError> {
        let mut work = self.clone();
        let mut result = Matrix::zeros(self.nrows(), self.ncols());
        work.invert_into(config, &mut result)?;
        Ok(result)
    }
}

impl DenseMatrix for Matrix {
    fn array(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }

    fn array_mut(&mut self) -> ArrayViewMut2<'_, f64> {
        self.data.view_mut()
    }
}

/// Mutable window into another matrix's storage
#[derive(Debug)]
pub struct MatrixView<'a> {
    data: ArrayViewMut2<'a, f64>,
    /// Offset of the window in the root matrix
    origin: (usize, usize),
}

impl MatrixView<'_> {
    /// Position and extent of this view in the root matrix
    pub fn window(&self) -> Window {
        let (rows, cols) = self.data.dim();
        Window::new(rows, cols, self.origin.0, self.origin.1)
    }

    /// Window into this view; offsets are relative to the view
    pub fn view_mut(&mut self, window: Window) -> Result<MatrixView<'_>, DenseError> {
        window.check(self.data.nrows(), self.data.ncols())?;
        Ok(MatrixView {
            data: self
                .data
                .slice_mut(s![window.row_range(), window.col_range()]),
            origin: (
                self.origin.0 + window.row_offset,
                self.origin.1 + window.col_offset,
            ),
        })
    }
}

impl DenseMatrix for MatrixView<'_> {
    fn array(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }

    fn array_mut(&mut self) -> ArrayViewMut2<'_, f64> {
        self.data.view_mut()
    }
}

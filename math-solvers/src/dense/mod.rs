//! Dense storage for small thermal systems
//!
//! This module provides the two containers the solvers operate on:
//! - [`Vector`]: a fixed-length buffer of reals
//! - [`Matrix`]: an owning row-major matrix, with [`MatrixView`] windows
//!   that share the parent's storage
//!
//! Element access is bounds-checked and reported through [`DenseError`].

mod matrix;
mod vector;

pub use matrix::{Matrix, MatrixView, Window};
pub use vector::Vector;

use thiserror::Error;

/// Errors raised by dense containers and their products
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DenseError {
    #[error("Index ({row}, {col}) out of bounds for {rows}x{cols} storage")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },
    #[error("Index {index} out of bounds for vector of length {len}")]
    VectorIndexOutOfBounds { index: usize, len: usize },
    #[error("Dimension mismatch in {context}: expected {expected}, got {got}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("Window {window} does not fit in {rows}x{cols} matrix")]
    WindowOutOfBounds {
        window: Window,
        rows: usize,
        cols: usize,
    },
    #[error("Windows {first} and {second} overlap")]
    OverlappingWindows { first: Window, second: Window },
}

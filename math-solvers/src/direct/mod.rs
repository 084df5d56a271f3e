//! Direct solvers for dense linear systems
//!
//! This module provides the in-place LU machinery behind [`DenseMatrix`](crate::DenseMatrix):
//! - [`lu_decompose_in_place`]: Crout decomposition with implicit scaling and partial pivoting
//! - [`lu_back_substitute`]: forward/back substitution against stored factors
//! - [`invert_in_place`]: inversion by `n` solves against unit basis vectors
//! - [`solve_dense`]: one-shot convenience solve that leaves its inputs untouched

mod lu;

pub use lu::{
    LuConfig, LuError, LuPivots, PivotPolicy, TINY, invert_in_place, lu_back_substitute,
    lu_decompose_in_place, lu_determinant, lu_solve_factored, solve_dense,
};

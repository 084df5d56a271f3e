//! Numerical core for building thermal simulation
//!
//! This crate provides the dense linear algebra and time integration that the
//! thermal network solvers build on. Callers fill matrices and vectors with
//! conductances, capacitances and flow coefficients; the crate knows nothing
//! about what the numbers represent.
//!
//! # Features
//!
//! - **Dense storage**: [`Vector`] and [`Matrix`], plus [`MatrixView`] windows
//!   sharing a parent's storage
//! - **Affine products**: `y = αAx + βy` and `Y = αAX + βY` on any [`DenseMatrix`]
//! - **Direct solver**: in-place Crout LU with implicit scaling and partial
//!   pivoting, linear solve, determinant and inversion
//! - **ODE integration**: adaptive RK4 with step doubling and Richardson
//!   extrapolation, and a fixed-step RK4 driver
//!
//! # Example
//!
//! ```
//! use math_thermal_solvers::{DenseMatrix, LuConfig, Matrix, Vector};
//!
//! // Two-node conductance network
//! let mut a = Matrix::from_rows(&[&[3.0, -1.0], &[-1.0, 2.0]]).unwrap();
//! let mut b = Vector::from_vec(vec![5.0, 0.0]);
//!
//! let pivots = a.lu_decompose(&LuConfig::default()).unwrap();
//! a.lu_solve(&pivots, &mut b).unwrap();
//!
//! assert!((b[0] - 2.0).abs() < 1e-12);
//! assert!((b[1] - 1.0).abs() < 1e-12);
//! ```

pub mod dense;
pub mod direct;
pub mod ode;
pub mod traits;

// Re-export main types
pub use dense::{DenseError, Matrix, MatrixView, Vector, Window};
pub use traits::{DenseMatrix, OdeSystem};

// Re-export direct solvers
pub use direct::{LuConfig, LuError, LuPivots, PivotPolicy, solve_dense};

// Re-export integrators
pub use ode::{OdeConfig, OdeError, OdeIntegrator, OdeSample, OdeSolution, Rk4};

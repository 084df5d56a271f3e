//! Explicit ODE integration
//!
//! - [`OdeIntegrator::solve`]: adaptive RK4 with step-doubling error control
//! - [`OdeIntegrator::integrate_fixed`]: equal RK4 steps, no error control
//! - [`Rk4`]: the underlying single step, reusable on its own

mod integrator;
mod rk4;

pub use integrator::{MAX_STEPS, OdeConfig, OdeError, OdeIntegrator, OdeSample, OdeSolution};
pub use rk4::Rk4;

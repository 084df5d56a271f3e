//! Adaptive RK4 integrator with step-doubling error control
//!
//! Every step is taken twice: once as a full step and once as two half steps.
//! The difference estimates the local truncation error, drives the step size,
//! and is folded back into the result (Richardson extrapolation) for a
//! fifth-order accurate update.

use super::rk4::Rk4;
use crate::dense::Vector;
use crate::traits::OdeSystem;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default cap on driver iterations
pub const MAX_STEPS: usize = 10_000;

const SAFETY: f64 = 0.9;
const PGROW: f64 = -0.2;
const PSHRINK: f64 = -0.2;
/// Below this error ratio the step grows by the full factor of 4: (4 / SAFETY)^(1 / PGROW)
const ERRCON: f64 = 6.0e-4;
/// Richardson correction for a fourth-order method: 1 / (2^4 - 1)
const FCOR: f64 = 1.0 / 15.0;
/// Keeps the error scale positive for components that vanish
const SCALE_FLOOR: f64 = 1.0e-30;

/// Errors that can occur during ODE integration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OdeError {
    #[error("State dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Invalid parameter '{parameter}': {message}")]
    InvalidParameter {
        parameter: &'static str,
        message: String,
    },

    #[error("Step size {h:.2e} too small at x = {x:.6}")]
    StepTooSmall { x: f64, h: f64 },

    #[error("Exceeded maximum {steps} steps at x = {x:.6}")]
    TooManySteps { steps: usize, x: f64 },

    #[error("Non-finite state encountered at x = {x:.6}")]
    NonFinite { x: f64 },
}

/// Adaptive integration configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OdeConfig {
    /// Relative accuracy target for each step
    pub eps: f64,
    /// First step size to try; only its magnitude is used
    pub h_try: f64,
    /// Smallest acceptable next step (may be zero)
    pub h_min: f64,
    /// Maximum number of accepted steps
    pub max_steps: usize,
    /// Record the state whenever x has moved more than this since the last sample
    pub save_interval: Option<f64>,
    /// Log progress every N steps (0 = no output)
    pub print_interval: usize,
}

impl Default for OdeConfig {
    fn default() -> Self {
        Self {
            eps: 1e-6,
            h_try: 1e-2,
            h_min: 0.0,
            max_steps: MAX_STEPS,
            save_interval: None,
            print_interval: 0,
        }
    }
}

impl OdeConfig {
    fn validate(&self) -> Result<(), OdeError> {
        if !(self.eps.is_finite() && self.eps > 0.0) {
            return Err(OdeError::InvalidParameter {
                parameter: "eps",
                message: format!("must be positive and finite, got {}", self.eps),
            });
        }
        if !self.h_try.is_finite() || self.h_try == 0.0 {
            return Err(OdeError::InvalidParameter {
                parameter: "h_try",
                message: format!("must be nonzero and finite, got {}", self.h_try),
            });
        }
        if self.h_min.is_nan() || self.h_min < 0.0 {
            return Err(OdeError::InvalidParameter {
                parameter: "h_min",
                message: format!("must be non-negative, got {}", self.h_min),
            });
        }
        Ok(())
    }
}

/// State recorded along the trajectory
#[derive(Debug, Clone, PartialEq)]
pub struct OdeSample {
    pub x: f64,
    pub y: Vec<f64>,
}

/// Statistics of a completed integration
#[derive(Debug, Clone, PartialEq)]
pub struct OdeSolution {
    /// Final value of the independent variable
    pub x: f64,
    /// Steps taken with the step size that was tried first
    pub good_steps: usize,
    /// Steps that had to be shrunk before being accepted
    pub bad_steps: usize,
    /// Number of derivative evaluations
    pub evaluations: usize,
    /// Step size proposed for a continuation
    pub h_next: f64,
    /// Trajectory samples (empty unless `save_interval` was set)
    pub samples: Vec<OdeSample>,
}

impl OdeSolution {
    fn start(x: f64) -> Self {
        Self {
            x,
            good_steps: 0,
            bad_steps: 0,
            evaluations: 0,
            h_next: 0.0,
            samples: Vec::new(),
        }
    }

    /// Total number of accepted steps
    pub fn steps(&self) -> usize {
        self.good_steps + self.bad_steps
    }
}

/// Outcome of one accepted quality-controlled step
struct StepOutcome {
    h_did: f64,
    h_next: f64,
}

/// Adaptive-step RK4 integrator for a fixed number of variables
///
/// All scratch space is allocated once in [`new`](OdeIntegrator::new) and
/// reused by every call. One instance serves one caller at a time; use one
/// integrator per thread.
///
/// # Example
/// ```
/// use math_thermal_solvers::{OdeConfig, OdeIntegrator};
///
/// let mut integrator = OdeIntegrator::new(1);
/// let mut growth = |_x: f64, y: &[f64], dydx: &mut [f64]| dydx[0] = y[0];
/// let mut y = [1.0];
///
/// integrator.solve(&mut growth, &mut y, 0.0, 1.0, &OdeConfig::default()).unwrap();
/// assert!((y[0] - std::f64::consts::E).abs() < 1e-4);
/// ```
#[derive(Debug, Clone)]
pub struct OdeIntegrator {
    rk4: Rk4,
    dysav: Vector,
    ysav: Vector,
    ytemp: Vector,
    y: Vector,
    dydx: Vector,
    yscal: Vector,
    evaluations: usize,
}

impl OdeIntegrator {
    pub fn new(variable_count: usize) -> Self {
        Self {
            rk4: Rk4::new(variable_count),
            dysav: Vector::new(variable_count),
            ysav: Vector::new(variable_count),
            ytemp: Vector::new(variable_count),
            y: Vector::new(variable_count),
            dydx: Vector::new(variable_count),
            yscal: Vector::new(variable_count),
            evaluations: 0,
        }
    }

    pub fn variable_count(&self) -> usize {
        self.y.len()
    }

    /// Integrate `y` from `x1` to `x2` with adaptive step size
    ///
    /// On success `y` holds the state at `x2`. On failure `y` is left as it
    /// was passed in. `x2 < x1` integrates backwards.
    pub fn solve<S: OdeSystem + ?Sized>(
        &mut self,
        system: &mut S,
        y: &mut [f64],
        x1: f64,
        x2: f64,
        config: &OdeConfig,
    ) -> Result<OdeSolution, OdeError> {
        self.check_state(y)?;
        config.validate()?;
        check_interval(x1, x2)?;

        let mut solution = OdeSolution::start(x1);
        if x1 == x2 {
            return Ok(solution);
        }

        let n = self.variable_count();
        self.evaluations = 0;
        self.y.as_slice_mut().copy_from_slice(y);

        let mut x = x1;
        let mut h = config.h_try.abs().copysign(x2 - x1);
        let mut last_sample: Option<f64> = None;

        for step in 0..config.max_steps {
            system.derivatives(x, self.y.as_slice(), self.dydx.as_slice_mut());
            self.evaluations += 1;

            for i in 0..n {
                self.yscal[i] = self.y[i].abs() + (self.dydx[i] * h).abs() + SCALE_FLOOR;
            }

            if let Some(interval) = config.save_interval {
                if last_sample.is_none_or(|xs| (x - xs).abs() > interval.abs()) {
                    solution.samples.push(self.sample(x));
                    last_sample = Some(x);
                }
            }

            // Don't step past the end of the interval
            if (x + h - x2) * (x + h - x1) > 0.0 {
                h = x2 - x;
            }

            let outcome = self.quality_step(system, &mut x, h, config.eps)?;
            if outcome.h_did == h {
                solution.good_steps += 1;
            } else {
                solution.bad_steps += 1;
            }

            if (x - x2) * (x2 - x1) >= 0.0 {
                y.copy_from_slice(self.y.as_slice());
                if config.save_interval.is_some() {
                    solution.samples.push(self.sample(x));
                }
                solution.x = x;
                solution.h_next = outcome.h_next;
                solution.evaluations = self.evaluations;
                log::debug!(
                    "ODE: reached x = {:.6} in {} steps ({} shrunk), {} evaluations",
                    x,
                    solution.steps(),
                    solution.bad_steps,
                    solution.evaluations
                );
                return Ok(solution);
            }

            if outcome.h_next.abs() <= config.h_min {
                return Err(OdeError::StepTooSmall {
                    x,
                    h: outcome.h_next,
                });
            }
            h = outcome.h_next;

            if config.print_interval > 0 && (step + 1) % config.print_interval == 0 {
                log::info!(
                    "ODE step {}: x = {:.6}, next step = {:.3e}",
                    step + 1,
                    x,
                    h
                );
            }
        }

        Err(OdeError::TooManySteps {
            steps: config.max_steps,
            x,
        })
    }

    /// Integrate `y` from `x1` to `x2` in `steps` equal RK4 steps, without error control
    pub fn integrate_fixed<S: OdeSystem + ?Sized>(
        &mut self,
        system: &mut S,
        y: &mut [f64],
        x1: f64,
        x2: f64,
        steps: usize,
    ) -> Result<OdeSolution, OdeError> {
        self.check_state(y)?;
        check_interval(x1, x2)?;
        if steps == 0 {
            return Err(OdeError::InvalidParameter {
                parameter: "steps",
                message: "must be at least 1".to_string(),
            });
        }

        self.evaluations = 0;
        self.y.as_slice_mut().copy_from_slice(y);

        let h = (x2 - x1) / steps as f64;
        let mut x = x1;
        for _ in 0..steps {
            system.derivatives(x, self.y.as_slice(), self.dydx.as_slice_mut());
            self.rk4.step(
                system,
                self.y.as_slice(),
                self.dydx.as_slice(),
                x,
                h,
                self.ytemp.as_slice_mut(),
            );
            self.evaluations += 4;
            std::mem::swap(&mut self.y, &mut self.ytemp);
            x += h;
        }

        if self.y.iter().any(|v| !v.is_finite()) {
            return Err(OdeError::NonFinite { x });
        }
        y.copy_from_slice(self.y.as_slice());

        Ok(OdeSolution {
            x,
            good_steps: steps,
            bad_steps: 0,
            evaluations: self.evaluations,
            h_next: h,
            samples: Vec::new(),
        })
    }

    /// Quality-controlled RK4 step on the working state
    ///
    /// Expects `y`, `dydx` and `yscal` to be set for the current `x`. Shrinks
    /// and retries from the saved state until the estimated error is within
    /// `eps`, then advances `x` and `y`.
    fn quality_step<S: OdeSystem + ?Sized>(
        &mut self,
        system: &mut S,
        x: &mut f64,
        h_try: f64,
        eps: f64,
    ) -> Result<StepOutcome, OdeError> {
        let n = self.variable_count();
        let x_start = *x;
        self.ysav.as_slice_mut().copy_from_slice(self.y.as_slice());
        self.dysav
            .as_slice_mut()
            .copy_from_slice(self.dydx.as_slice());

        let mut h = h_try;
        loop {
            // Two half steps
            let hh = 0.5 * h;
            self.rk4.step(
                system,
                self.ysav.as_slice(),
                self.dysav.as_slice(),
                x_start,
                hh,
                self.ytemp.as_slice_mut(),
            );
            let x_mid = x_start + hh;
            system.derivatives(x_mid, self.ytemp.as_slice(), self.dydx.as_slice_mut());
            self.rk4.step(
                system,
                self.ytemp.as_slice(),
                self.dydx.as_slice(),
                x_mid,
                hh,
                self.y.as_slice_mut(),
            );

            *x = x_start + h;
            if *x == x_start {
                return Err(OdeError::StepTooSmall { x: x_start, h });
            }

            // One full step
            self.rk4.step(
                system,
                self.ysav.as_slice(),
                self.dysav.as_slice(),
                x_start,
                h,
                self.ytemp.as_slice_mut(),
            );
            self.evaluations += 10;

            let mut errmax = 0.0_f64;
            for i in 0..n {
                self.ytemp[i] = self.y[i] - self.ytemp[i];
                let ratio = (self.ytemp[i] / self.yscal[i]).abs();
                if ratio.is_nan() {
                    *x = x_start;
                    return Err(OdeError::NonFinite { x: x_start });
                }
                errmax = errmax.max(ratio);
            }
            errmax /= eps;

            if errmax <= 1.0 {
                let h_next = if errmax > ERRCON {
                    SAFETY * h * errmax.powf(PGROW)
                } else {
                    4.0 * h
                };
                for i in 0..n {
                    self.y[i] += self.ytemp[i] * FCOR;
                }
                return Ok(StepOutcome { h_did: h, h_next });
            }

            log::debug!(
                "ODE: rejected step {:.3e} at x = {:.6} (error ratio {:.3})",
                h,
                x_start,
                errmax
            );
            h = SAFETY * h * errmax.powf(PSHRINK);
        }
    }

    fn sample(&self, x: f64) -> OdeSample {
        OdeSample {
            x,
            y: self.y.as_slice().to_vec(),
        }
    }

    fn check_state(&self, y: &[f64]) -> Result<(), OdeError> {
        if y.len() != self.variable_count() {
            return Err(OdeError::DimensionMismatch {
                expected: self.variable_count(),
                got: y.len(),
            });
        }
        Ok(())
    }
}

fn check_interval(x1: f64, x2: f64) -> Result<(), OdeError> {
    if !(x1.is_finite() && x2.is_finite()) {
        return Err(OdeError::InvalidParameter {
            parameter: "interval",
            message: format!("bounds must be finite, got [{}, {}]", x1, x2),
        });
    }
    Ok(())
}

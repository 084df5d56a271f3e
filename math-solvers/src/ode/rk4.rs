//! Classical 4th-order Runge-Kutta step

use crate::dense::Vector;
use crate::traits::OdeSystem;

/// Single-step RK4 with preallocated stage buffers
///
/// The caller supplies the derivative at the start of the step, so each
/// [`step`](Rk4::step) costs three evaluations of the system.
#[derive(Debug, Clone)]
pub struct Rk4 {
    dym: Vector,
    dyt: Vector,
    yt: Vector,
}

impl Rk4 {
    pub fn new(variable_count: usize) -> Self {
        Self {
            dym: Vector::new(variable_count),
            dyt: Vector::new(variable_count),
            yt: Vector::new(variable_count),
        }
    }

    pub fn variable_count(&self) -> usize {
        self.yt.len()
    }

    /// Advance `y` from `x` to `x + h`, writing the result into `yout`
    ///
    /// `dydx` is the derivative at `(x, y)`. `y`, `dydx` and `yout` must all
    /// have [`variable_count`](Rk4::variable_count) entries.
    pub fn step<S: OdeSystem + ?Sized>(
        &mut self,
        system: &mut S,
        y: &[f64],
        dydx: &[f64],
        x: f64,
        h: f64,
        yout: &mut [f64],
    ) {
        let n = self.variable_count();
        debug_assert!(y.len() == n && dydx.len() == n && yout.len() == n);

        let hh = 0.5 * h;
        let h6 = h / 6.0;
        let xh = x + hh;

        let yt = self.yt.as_slice_mut();
        let dyt = self.dyt.as_slice_mut();
        let dym = self.dym.as_slice_mut();

        for i in 0..n {
            yt[i] = y[i] + hh * dydx[i];
        }
        system.derivatives(xh, yt, dyt);

        for i in 0..n {
            yt[i] = y[i] + hh * dyt[i];
        }
        system.derivatives(xh, yt, dym);

        for i in 0..n {
            yt[i] = y[i] + h * dym[i];
            dym[i] += dyt[i];
        }
        system.derivatives(x + h, yt, dyt);

        for i in 0..n {
            yout[i] = y[i] + h6 * (dydx[i] + dyt[i] + 2.0 * dym[i]);
        }
    }
}

use crate::minimize::bracket::LIM_FIB;
use crate::minimize::{MinimizerError, ScalarFn};
use log::debug;
use std::fmt;

/// Result of a parabolic interpolation search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParabolicResult {
    pub xmin: f64,
    pub fmin: f64,
    pub iters: usize,
    pub fn_evals: usize,
    pub converged: bool,
}

/// Line search by successive parabolic interpolation, for functions that are
/// close to convex on the searched interval.
pub struct Parabolic<F>
where
    F: ScalarFn,
{
    xmin: f64,
    fmin: f64,
    f: F,
    iters: usize,
    fn_evals: usize,
    converged: bool,
}

fn not_nan(v: f64) -> f64 {
    if v.is_nan() { f64::INFINITY } else { v }
}

impl<F> Parabolic<F>
where
    F: ScalarFn,
{
    pub const MAX_ITERS: usize = 500;

    pub fn new(f: F) -> Self {
        Parabolic {
            xmin: 0.0,
            fmin: 0.0,
            f,
            iters: 0,
            fn_evals: 0,
            converged: false,
        }
    }

    /// Parabolic interpolation on `lower <= p1 <= upper` with known values.
    ///
    /// Each step evaluates the vertex of the parabola through the three
    /// points and replaces one end of the interval. A vertex within `eps` of
    /// `p1` is moved `eps` away from it, or to the middle of the neighbouring
    /// sub-interval once that is no wider than `2·eps`. A vertex that is not
    /// strictly inside the interval is replaced by a golden section step.
    ///
    /// Returns the best point, `p1`, without further evaluations as soon as
    /// the three points are colinear.
    pub fn parabolic_interpolation(
        &mut self,
        lower: f64,
        f_lower: f64,
        p1: f64,
        f_p1: f64,
        upper: f64,
        f_upper: f64,
        eps: f64,
    ) -> Result<ParabolicResult, MinimizerError> {
        self.converged = false;
        self.iters = 0;
        self.fn_evals = 0;

        if !(eps > 0.0) || !eps.is_finite() {
            return Err(MinimizerError::configuration(format!(
                "parabolic interpolation tolerance has to be positive and finite, got {}",
                eps
            )));
        }
        if !(lower <= p1 && p1 <= upper) {
            return Err(MinimizerError::configuration(format!(
                "points are not ordered: {} <= {} <= {}",
                lower, p1, upper
            )));
        }

        let (mut lower, mut f_lower) = (lower, not_nan(f_lower));
        let (mut p1, mut f_p1) = (p1, not_nan(f_p1));
        let (mut upper, mut f_upper) = (upper, not_nan(f_upper));
        let eps2 = 2.0 * eps;
        let mut colinear = false;

        while upper - lower > eps {
            if self.iters >= Self::MAX_ITERS {
                debug!(
                    "parabolic interpolation stopped after {} iterations in [{}, {}]",
                    self.iters, lower, upper
                );
                break;
            }

            let left = p1 - lower;
            let right = p1 - upper;
            let denom = left * (f_p1 - f_upper) - right * (f_p1 - f_lower);
            if denom == 0.0 {
                debug!("parabolic interpolation points are colinear around {}", p1);
                colinear = true;
                break;
            }
            self.iters += 1;

            let num = left * left * (f_p1 - f_upper) - right * right * (f_p1 - f_lower);
            let mut x = p1 - 0.5 * num / denom;

            if !(x > lower && x < upper) {
                // vertex outside or undefined
                x = if upper - p1 > p1 - lower {
                    p1 + (1.0 - LIM_FIB) * (upper - p1)
                } else {
                    p1 - (1.0 - LIM_FIB) * (p1 - lower)
                };
            }

            if (x - p1).abs() <= eps {
                let left_tight = p1 - lower <= eps2;
                let right_tight = upper - p1 <= eps2;
                let go_left = match (left_tight, right_tight) {
                    (false, false) => x < p1,
                    (true, false) => false,
                    (false, true) => true,
                    (true, true) => p1 - lower > upper - p1,
                };
                x = match (go_left, left_tight, right_tight) {
                    (true, true, _) => lower + (p1 - lower) / 2.0,
                    (true, false, _) => p1 - eps,
                    (false, _, true) => p1 + (upper - p1) / 2.0,
                    (false, _, false) => p1 + eps,
                };
            }

            self.fn_evals += 1;
            let fx = not_nan(self.f.call_scalar(x)?);

            if x < p1 {
                if fx < f_p1 {
                    // lower doesn't change
                    upper = p1;
                    f_upper = f_p1;
                    p1 = x;
                    f_p1 = fx;
                } else {
                    // upper doesn't change
                    lower = x;
                    f_lower = fx;
                }
            } else if fx < f_p1 {
                // upper doesn't change
                lower = p1;
                f_lower = f_p1;
                p1 = x;
                f_p1 = fx;
            } else {
                // lower doesn't change
                upper = x;
                f_upper = fx;
            }
        }

        self.xmin = p1;
        self.fmin = f_p1;
        self.converged = !colinear && upper - lower <= eps;

        Ok(ParabolicResult {
            xmin: self.xmin,
            fmin: self.fmin,
            iters: self.iters,
            fn_evals: self.fn_evals,
            converged: self.converged,
        })
    }

    /// Same as [`Parabolic::parabolic_interpolation`] but evaluates the three
    /// starting points first.
    pub fn minimize(
        &mut self,
        lower: f64,
        p1: f64,
        upper: f64,
        eps: f64,
    ) -> Result<ParabolicResult, MinimizerError> {
        let f_lower = self.f.call_scalar(lower)?;
        let f_p1 = self.f.call_scalar(p1)?;
        let f_upper = self.f.call_scalar(upper)?;
        let mut res = self.parabolic_interpolation(lower, f_lower, p1, f_p1, upper, f_upper, eps)?;
        res.fn_evals += 3;
        self.fn_evals = res.fn_evals;
        Ok(res)
    }

    pub fn xmin(&self) -> f64 {
        self.xmin
    }

    pub fn fmin(&self) -> f64 {
        self.fmin
    }

    pub fn iters(&self) -> usize {
        self.iters
    }

    pub fn converged(&self) -> bool {
        self.converged
    }
}

impl<F> fmt::Debug for Parabolic<F>
where
    F: ScalarFn,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Parabolic( xmin: {}, fmin: {}, iters: {}, converged: {})",
            self.xmin, self.fmin, self.iters, self.converged
        )
    }
}

use crate::minimize::bracket::LIM_FIB;
use crate::minimize::{MinimizerError, ScalarFn};
use log::debug;
use std::fmt;

/// Result of golden section search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoldenResult {
    pub xmin: f64,
    pub fmin: f64,
    pub iters: usize,
    pub fn_evals: usize,
    pub converged: bool,
}

pub struct Golden<F>
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

impl<F> Golden<F>
where
    F: ScalarFn,
{
    /// Upper bound on the number of interval reductions in one search.
    pub const MAX_ITERS: usize = 2000;

    pub fn new(f: F) -> Self {
        Golden {
            xmin: 0.0,
            fmin: 0.0,
            f,
            iters: 0,
            fn_evals: 0,
            converged: false,
        }
    }

    // NaN reads as "worse than anything"
    fn eval(&mut self, x: f64) -> Result<f64, MinimizerError> {
        self.fn_evals += 1;
        let fx = self.f.call_scalar(x)?;
        Ok(if fx.is_nan() { f64::INFINITY } else { fx })
    }

    /// Golden section search on `[lower, upper]` with the interior point `p1`
    /// whose value `f_p1` is already known.
    ///
    /// Two interior points are kept at the golden positions; each reduction
    /// evaluates only the one that has just been placed, the retained point
    /// reuses its earlier value. Stops when `upper - lower <= eps` and
    /// returns the best evaluated point.
    ///
    /// # Errors
    /// * `IllegalConfiguration` if `eps` is not positive and finite or `p1`
    ///   lies outside the interval.
    pub fn golden_ratio(
        &mut self,
        lower: f64,
        p1: f64,
        f_p1: f64,
        upper: f64,
        eps: f64,
    ) -> Result<GoldenResult, MinimizerError> {
        self.converged = false;
        self.iters = 0;
        self.fn_evals = 0;

        if !(eps > 0.0) || !eps.is_finite() {
            return Err(MinimizerError::configuration(format!(
                "golden section tolerance has to be positive and finite, got {}",
                eps
            )));
        }
        let (mut lower, mut upper) = if lower <= upper {
            (lower, upper)
        } else {
            (upper, lower)
        };
        if !(lower <= p1 && p1 <= upper) {
            return Err(MinimizerError::configuration(format!(
                "interior point {} is outside of [{}, {}]",
                p1, lower, upper
            )));
        }
        let f_p1 = if f_p1.is_nan() { f64::INFINITY } else { f_p1 };

        // (x1, f1) left and (x2, f2) right interior point, `None` while pending
        let (mut x1, mut f1, mut x2, mut f2) = if p1 - lower <= upper - p1 {
            (p1, Some(f_p1), lower + LIM_FIB * (upper - lower), None)
        } else {
            (lower + (1.0 - LIM_FIB) * (upper - lower), None, p1, Some(f_p1))
        };

        while upper - lower > eps {
            if self.iters >= Self::MAX_ITERS {
                debug!(
                    "golden section stopped after {} iterations with width {}",
                    self.iters,
                    upper - lower
                );
                break;
            }
            self.iters += 1;

            let v1 = match f1 {
                Some(v) => v,
                None => self.eval(x1)?,
            };
            let v2 = match f2 {
                Some(v) => v,
                None => self.eval(x2)?,
            };

            if v1 < v2 {
                // lower doesn't change
                upper = x2;
                x2 = x1;
                f2 = Some(v1);
                x1 = lower + (1.0 - LIM_FIB) * (upper - lower);
                f1 = None;
            } else {
                // upper doesn't change
                lower = x1;
                x1 = x2;
                f1 = Some(v2);
                x2 = lower + LIM_FIB * (upper - lower);
                f2 = None;
            }
            // only possible when p1 did not start at a golden position
            if x1 > x2 {
                std::mem::swap(&mut x1, &mut x2);
                std::mem::swap(&mut f1, &mut f2);
            }
        }

        let (xmin, fmin) = match (f1, f2) {
            (Some(v1), Some(v2)) if v2 < v1 => (x2, v2),
            (Some(v1), _) => (x1, v1),
            (None, Some(v2)) => (x2, v2),
            (None, None) => (p1, f_p1),
        };

        self.xmin = xmin;
        self.fmin = fmin;
        self.converged = upper - lower <= eps;

        Ok(GoldenResult {
            xmin: self.xmin,
            fmin: self.fmin,
            iters: self.iters,
            fn_evals: self.fn_evals,
            converged: self.converged,
        })
    }

    /// Golden section search on `[lower, upper]` from scratch.
    pub fn minimize(
        &mut self,
        lower: f64,
        upper: f64,
        eps: f64,
    ) -> Result<GoldenResult, MinimizerError> {
        let p1 = lower + (1.0 - LIM_FIB) * (upper - lower);
        let f_p1 = self.f.call_scalar(p1)?;
        let mut res = self.golden_ratio(lower, p1, f_p1, upper, eps)?;
        res.fn_evals += 1;
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

impl<F> fmt::Debug for Golden<F>
where
    F: ScalarFn,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Golden( xmin: {}, fmin: {}, iters: {}, converged: {})",
            self.xmin, self.fmin, self.iters, self.converged
        )
    }
}

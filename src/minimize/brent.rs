use crate::minimize::bracket::LIM_FIB;
use crate::minimize::{BracketResult, MinimizerError, ScalarFn};
use log::debug;
use std::fmt;

/// Result of Brent's method
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrentResult {
    pub xmin: f64,
    pub fmin: f64,
    pub iters: usize,
    pub fn_evals: usize,
    pub converged: bool,
}

pub struct Brent<F>
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

impl<F> Brent<F>
where
    F: ScalarFn,
{
    /// Relative machine precision of the classical `fmin` routine. Kept as a
    /// literal instead of `f64::EPSILON` (2.2e-16) so step sizes match it.
    pub const EPS: f64 = 1.2e-16;
    pub const MAX_ITERS: usize = 1000;

    pub fn new(f: F) -> Self {
        Brent {
            xmin: 0.0,
            fmin: 0.0,
            f,
            iters: 0,
            fn_evals: 0,
            converged: false,
        }
    }

    fn eval(&mut self, x: f64) -> Result<f64, MinimizerError> {
        self.fn_evals += 1;
        let fx = self.f.call_scalar(x)?;
        Ok(if fx.is_nan() { f64::INFINITY } else { fx })
    }

    /// Brent's method on `[a, b]` starting from the interior point `x` with
    /// known value `fx`.
    ///
    /// Parabolic steps through the three best points are taken while they
    /// are reliable, golden section steps otherwise. No two evaluations are
    /// closer than `tol1 = sqrt(EPS)·|x| + tol/3`. Stops once the bracket
    /// half-width is within `2·tol1` of the midpoint.
    pub fn brents_method(
        &mut self,
        a: f64,
        x: f64,
        fx: f64,
        b: f64,
        tol: f64,
    ) -> Result<BrentResult, MinimizerError> {
        self.converged = false;
        self.iters = 0;
        self.fn_evals = 0;

        if !(tol > 0.0) || !tol.is_finite() {
            return Err(MinimizerError::configuration(format!(
                "Brent tolerance has to be positive and finite, got {}",
                tol
            )));
        }
        let (mut a, mut b) = if a <= b { (a, b) } else { (b, a) };

        let c = 1.0 - LIM_FIB;
        let eps = Self::EPS.sqrt();
        let tol3 = tol / 3.0;

        let mut x = x;
        let mut fx = if fx.is_nan() { f64::INFINITY } else { fx };
        let (mut v, mut w) = (x, x);
        let (mut fv, mut fw) = (fx, fx);
        let mut d: f64 = 0.0;
        let mut e: f64 = 0.0;

        let mut xm = 0.5 * (a + b);
        let mut tol1 = eps * x.abs() + tol3;
        let mut t2 = 2.0 * tol1;

        // main loop
        while (x - xm).abs() > t2 - 0.5 * (b - a) {
            if self.iters >= Self::MAX_ITERS {
                debug!(
                    "Brent's method stopped after {} iterations in [{}, {}]",
                    self.iters, a, b
                );
                break;
            }
            self.iters += 1;

            let mut p = 0.0;
            let mut q = 0.0;
            let mut r = 0.0;
            if e.abs() > tol1 {
                // fit the parabola
                r = (x - w) * (fx - fv);
                q = (x - v) * (fx - fw);
                p = (x - v) * q - (x - w) * r;
                q = 2.0 * (q - r);
                if q > 0.0 {
                    p = -p;
                } else {
                    q = -q;
                }
                r = e;
                e = d;
            }

            if p.abs() < (0.5 * q * r).abs() && p > q * (a - x) && p < q * (b - x) {
                // parabolic step
                d = p / q;
                let u = x + d;
                // f must not be evaluated too close to a or b
                if u - a < t2 || b - u < t2 {
                    d = if x < xm { tol1 } else { -tol1 };
                }
            } else {
                // golden section step
                e = if x < xm { b - x } else { a - x };
                d = c * e;
            }

            // f must not be evaluated too close to x
            let u = if d.abs() >= tol1 {
                x + d
            } else if d > 0.0 {
                x + tol1
            } else {
                x - tol1
            };
            let fu = self.eval(u)?;

            // update a, b, v, w and x
            if fx <= fu {
                if u < x {
                    a = u;
                } else {
                    b = u;
                }
            }
            if fu <= fx {
                if u < x {
                    b = x;
                } else {
                    a = x;
                }
                v = w;
                fv = fw;
                w = x;
                fw = fx;
                x = u;
                fx = fu;
            } else if fu <= fw || w == x {
                v = w;
                fv = fw;
                w = u;
                fw = fu;
            } else if !(fu > fv && v != x && v != w) {
                v = u;
                fv = fu;
            }

            xm = 0.5 * (a + b);
            tol1 = eps * x.abs() + tol3;
            t2 = 2.0 * tol1;
        }

        self.xmin = x;
        self.fmin = fx;
        self.converged = (x - xm).abs() <= t2 - 0.5 * (b - a);

        Ok(BrentResult {
            xmin: self.xmin,
            fmin: self.fmin,
            iters: self.iters,
            fn_evals: self.fn_evals,
            converged: self.converged,
        })
    }

    /// Brent's method on `[a, b]` from the interior point `x`.
    pub fn minimize(&mut self, a: f64, x: f64, b: f64, tol: f64) -> Result<BrentResult, MinimizerError> {
        let fx = self.f.call_scalar(x)?;
        let mut res = self.brents_method(a, x, fx, b, tol)?;
        res.fn_evals += 1;
        self.fn_evals = res.fn_evals;
        Ok(res)
    }

    /// Brent's method on a bracket, reusing its middle point and value.
    pub fn minimize_bracket(
        &mut self,
        bracket: &BracketResult,
        tol: f64,
    ) -> Result<BrentResult, MinimizerError> {
        self.brents_method(bracket.a, bracket.b, bracket.fb, bracket.c, tol)
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

impl<F> fmt::Debug for Brent<F>
where
    F: ScalarFn,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Brent( xmin: {}, fmin: {}, iters: {}, converged: {})",
            self.xmin, self.fmin, self.iters, self.converged
        )
    }
}

use crate::minimize::{MinimizerError, ScalarFn};
use log::debug;
use std::fmt;

/// (√5 − 1) / 2, the inverse of the golden ratio.
pub(crate) const LIM_FIB: f64 = 0.618_033_988_749_894_9;
pub(crate) const LIM_FIB_PLUS_1: f64 = LIM_FIB + 1.0;
pub(crate) const LIM_FIB_PLUS_2: f64 = LIM_FIB + 2.0;

/// Result of minimum bracketing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BracketResult {
    pub a: f64,  // Left bracket point
    pub b: f64,  // Middle point (lowest function value)
    pub c: f64,  // Right bracket point
    pub fa: f64, // f(a)
    pub fb: f64, // f(b)
    pub fc: f64, // f(c)
    pub fn_evals: usize,
}

impl BracketResult {
    /// Check if the bracket is valid (fb <= fa and fb <= fc)
    pub fn is_valid(&self) -> bool {
        self.fb <= self.fa && self.fb <= self.fc
    }

    /// Get the width of the bracket
    pub fn width(&self) -> f64 {
        (self.c - self.a).abs()
    }

    /// Get the best point in the bracket
    pub fn best_point(&self) -> f64 {
        self.b
    }

    /// Get the best function value
    pub fn best_value(&self) -> f64 {
        self.fb
    }
}

impl fmt::Display for BracketResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "[{} ({}), {} ({}), {} ({})]",
            self.a, self.fa, self.b, self.fb, self.c, self.fc
        )
    }
}

/// Bracket discovery on a one-dimensional function.
pub struct Bracket<F>
where
    F: ScalarFn,
{
    f: F,
    fn_evals: usize,
}

impl<F> Bracket<F>
where
    F: ScalarFn,
{
    pub fn new(f: F) -> Self {
        Bracket { f, fn_evals: 0 }
    }

    fn eval(&mut self, t: f64) -> Result<f64, MinimizerError> {
        self.fn_evals += 1;
        self.f.call_scalar(t)
    }

    /// Finds `a <= b <= c` with `f(b) <= f(a)` and `f(b) <= f(c)`, starting at
    /// `lower` with the known value `f_lower` and looking `start_distance`
    /// to the right.
    ///
    /// If the first step does not improve on `f_lower` the far point is
    /// pulled back towards `lower`; otherwise it is pushed outwards
    /// geometrically while the function keeps decreasing. A `NaN` value is
    /// read as "no improvement", and a `NaN` at the far end is refined
    /// inwards until a finite value turns up or the interval collapses.
    ///
    /// # Errors
    /// * `IllegalConfiguration` if `start_distance` is not positive and finite.
    /// * `EvaluationFailure` if the expansion overflows, which happens when the
    ///   function is unbounded below along the line.
    pub fn find_bracket(
        &mut self,
        lower: f64,
        f_lower: f64,
        start_distance: f64,
    ) -> Result<BracketResult, MinimizerError> {
        if !(start_distance > 0.0) || !start_distance.is_finite() {
            return Err(MinimizerError::configuration(format!(
                "start distance has to be positive and finite, got {}",
                start_distance
            )));
        }
        self.fn_evals = 0;

        let (mut a, mut fa) = (lower, f_lower);
        let mut b = lower + start_distance;
        let mut fb = self.eval(b)?;
        let mut c: f64;
        let mut fc: f64;

        if fb.is_nan() || fa <= fb {
            // shrink towards the start
            loop {
                c = b;
                fc = fb;
                b = a + (1.0 - LIM_FIB) * (b - a);
                if b == a {
                    debug!("bracket collapsed onto its start point {}", a);
                    fb = fa;
                    break;
                }
                fb = self.eval(b)?;
                if !fb.is_nan() && fa >= fb {
                    break;
                }
            }
        } else {
            // expand away from the start
            loop {
                c = LIM_FIB_PLUS_2 * b - LIM_FIB_PLUS_1 * a;
                if !c.is_finite() {
                    return Err(MinimizerError::evaluation(format!(
                        "bracket expansion overflowed after {} evaluations, the function seems unbounded below",
                        self.fn_evals
                    )));
                }
                fc = self.eval(c)?;
                if fc.is_nan() || fb <= fc {
                    break;
                }
                a = b;
                fa = fb;
                b = c;
                fb = fc;
            }
        }

        if fc.is_nan() {
            debug!("bracket end point {} is NaN, refining inwards", c);
            while fc.is_nan() {
                let x = b + (1.0 - LIM_FIB) * (c - b);
                if x == b {
                    break;
                }
                let fx = self.eval(x)?;
                if fx.is_nan() || fx > fb {
                    c = x;
                    fc = fx;
                } else {
                    if fx != fb {
                        a = b;
                        fa = fb;
                    }
                    b = x;
                    fb = fx;
                }
            }
            if fc.is_nan() {
                debug!("bracket end point could not be refined, using {} as upper bound", b);
                c = b;
                fc = f64::INFINITY;
            }
        }

        Ok(BracketResult {
            a,
            b,
            c,
            fa,
            fb,
            fc,
            fn_evals: self.fn_evals,
        })
    }

    /// Same as [`Bracket::find_bracket`] but evaluates `f(lower)` first.
    pub fn find_bracket_from(
        &mut self,
        lower: f64,
        start_distance: f64,
    ) -> Result<BracketResult, MinimizerError> {
        let f_lower = self.f.call_scalar(lower)?;
        let mut res = self.find_bracket(lower, f_lower, start_distance)?;
        res.fn_evals += 1;
        Ok(res)
    }
}

impl<F> fmt::Debug for Bracket<F>
where
    F: ScalarFn,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Bracket")
            .field("fn_evals", &self.fn_evals)
            .finish()
    }
}

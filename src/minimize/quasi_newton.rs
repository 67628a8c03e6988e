use crate::minimize::optimizer::gradient_at;
use crate::minimize::{Minimizer, MinimizerError, ObjGradFn, Run};
use log::debug;
use ndarray::prelude::*;
use std::fmt;

/// Quasi-Newton method variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuasiNewtonMethod {
    DFP,  // Davidon-Fletcher-Powell
    BFGS, // Broyden-Fletcher-Goldfarb-Shanno
}

impl fmt::Display for QuasiNewtonMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            QuasiNewtonMethod::DFP => write!(f, "DFP"),
            QuasiNewtonMethod::BFGS => write!(f, "BFGS"),
        }
    }
}

/// Rank two update of the inverse Hessian approximation `h` from the step
/// `s` and the gradient change `v`. Returns false and leaves `h` untouched
/// when the curvature information is unusable.
fn update_inverse_hessian(
    method: QuasiNewtonMethod,
    h: &mut Array2<f64>,
    s: &Array1<f64>,
    v: &Array1<f64>,
) -> bool {
    let sv = s.dot(v);
    let hv = h.dot(v);
    let vhv = v.dot(&hv);
    if !(sv > 0.0) || !(vhv > 0.0) {
        debug!("{}: skipping update, s·v = {}, v·Hv = {}", method, sv, vhv);
        return false;
    }

    match method {
        QuasiNewtonMethod::DFP => {
            for ((i, j), h_ij) in h.indexed_iter_mut() {
                *h_ij += s[i] * s[j] / sv - hv[i] * hv[j] / vhv;
            }
        }
        QuasiNewtonMethod::BFGS => {
            let u = s / sv - &hv / vhv;
            for ((i, j), h_ij) in h.indexed_iter_mut() {
                *h_ij += s[i] * s[j] / sv - hv[i] * hv[j] / vhv + vhv * u[i] * u[j];
            }
        }
    }
    true
}

/// Quasi-Newton minimization with a dense inverse Hessian approximation,
/// starting from the identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuasiNewton {
    method: QuasiNewtonMethod,
}

impl QuasiNewton {
    pub fn new(method: QuasiNewtonMethod) -> Self {
        QuasiNewton { method }
    }

    pub fn method(&self) -> QuasiNewtonMethod {
        self.method
    }
}

impl Minimizer for QuasiNewton {
    fn minimize(
        &self,
        f: &dyn ObjGradFn,
        x: &mut Array1<f64>,
        run: &mut Run<'_>,
    ) -> Result<usize, MinimizerError> {
        let (mut value, mut g_new) = run.begin(&self.to_string(), f, x)?;
        let n = x.len();
        let mut h: Array2<f64> = Array2::eye(n);
        let mut g_old = g_new.clone();
        let mut direction = -&g_new;
        let mut f_last = f64::INFINITY;
        let mut step = 0.0;
        let mut i = 0;

        while run.proceed(i, f_last, value, &g_new, &direction, step) {
            if i > 0 {
                let s = &direction * step;
                let v = &g_new - &g_old;
                update_inverse_hessian(self.method, &mut h, &s, &v);

                direction = -h.dot(&g_new);
                if direction.dot(&g_new) >= 0.0 {
                    debug!("{}: no descent direction in iteration {}, resetting H", self.method, i + 1);
                    h = Array2::eye(n);
                    direction = -&g_new;
                }
            }
            f_last = value;

            i += 1;
            let res = run.line_search(f, x, &direction, value, i)?;
            value = res.f_new;
            step = res.alpha;

            std::mem::swap(&mut g_old, &mut g_new);
            g_new = gradient_at(f, x)?;
        }
        Ok(i)
    }
}

impl fmt::Display for QuasiNewton {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.method)
    }
}

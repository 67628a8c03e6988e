use crate::minimize::optimizer::gradient_at;
use crate::minimize::{Minimizer, MinimizerError, ObjGradFn, Run};
use log::debug;
use ndarray::prelude::*;
use std::fmt;

/// Conjugate gradient update formulas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConjGradMethod {
    FletcherReeves,       // β = ||g_new||² / ||g_old||²
    PolakRibiere,         // β = g_new·(g_new - g_old) / ||g_old||²
    PolakRibierePositive, // β = max(0, Polak-Ribiere)
}

impl ConjGradMethod {
    fn beta(&self, g_new: &Array1<f64>, g_old: &Array1<f64>) -> f64 {
        let old_sq = g_old.dot(g_old);
        if old_sq == 0.0 {
            return 0.0;
        }
        match self {
            ConjGradMethod::FletcherReeves => g_new.dot(g_new) / old_sq,
            ConjGradMethod::PolakRibiere => pr_numerator(g_new, g_old) / old_sq,
            ConjGradMethod::PolakRibierePositive => (pr_numerator(g_new, g_old) / old_sq).max(0.0),
        }
    }
}

// g_new·(g_new - g_old) without allocating the difference
fn pr_numerator(g_new: &Array1<f64>, g_old: &Array1<f64>) -> f64 {
    g_new
        .iter()
        .zip(g_old.iter())
        .map(|(&gn, &go)| gn * (gn - go))
        .sum()
}

impl fmt::Display for ConjGradMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConjGradMethod::FletcherReeves => write!(f, "Fletcher-Reeves"),
            ConjGradMethod::PolakRibiere => write!(f, "Polak-Ribiere"),
            ConjGradMethod::PolakRibierePositive => write!(f, "Polak-Ribiere-Positive"),
        }
    }
}

/// Nonlinear conjugate gradients, `d = -g_new + β·d_prev`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConjGrad {
    method: ConjGradMethod,
}

impl ConjGrad {
    pub fn new(method: ConjGradMethod) -> Self {
        ConjGrad { method }
    }

    pub fn method(&self) -> ConjGradMethod {
        self.method
    }
}

impl Minimizer for ConjGrad {
    fn minimize(
        &self,
        f: &dyn ObjGradFn,
        x: &mut Array1<f64>,
        run: &mut Run<'_>,
    ) -> Result<usize, MinimizerError> {
        let (mut value, mut g_new) = run.begin(&self.to_string(), f, x)?;
        let mut g_old = g_new.clone();
        let mut direction = Array1::zeros(x.len());
        let mut f_last = f64::INFINITY;
        let mut step = 0.0;
        let mut i = 0;

        while run.proceed(i, f_last, value, &g_new, &direction, step) {
            f_last = value;

            let beta = if i == 0 {
                0.0
            } else {
                self.method.beta(&g_new, &g_old)
            };
            direction.zip_mut_with(&g_new, |d, &g| *d = -g + beta * *d);
            if direction.dot(&g_new) >= 0.0 {
                debug!("{}: no descent direction in iteration {}, restarting", self.method, i + 1);
                direction.zip_mut_with(&g_new, |d, &g| *d = -g);
            }

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

impl fmt::Display for ConjGrad {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.method)
    }
}

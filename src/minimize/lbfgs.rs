use crate::minimize::optimizer::gradient_at;
use crate::minimize::{Minimizer, MinimizerError, ObjGradFn, Run};
use log::debug;
use ndarray::prelude::*;
use std::collections::VecDeque;
use std::fmt;

/// One stored step: `s = x_new - x_old`, `v = g_new - g_old`, `rho = 1 / s·v`.
#[derive(Debug, Clone)]
struct VectorPair {
    s: Array1<f64>,
    v: Array1<f64>,
    rho: f64,
    alpha: f64,
}

/// The most recent steps, newest first.
#[derive(Debug, Clone)]
struct History {
    pairs: VecDeque<VectorPair>,
    memory: usize,
}

impl History {
    fn new(memory: usize) -> Self {
        History {
            pairs: VecDeque::with_capacity(memory),
            memory,
        }
    }

    /// Stores the step `step·direction` with gradient change `g_new - g_old`,
    /// evicting the oldest pair when full. Steps without positive curvature
    /// are dropped.
    fn push(
        &mut self,
        direction: &Array1<f64>,
        step: f64,
        g_new: &Array1<f64>,
        g_old: &Array1<f64>,
    ) -> bool {
        let sv: f64 = direction
            .iter()
            .zip(g_new.iter().zip(g_old.iter()))
            .map(|(&d, (&gn, &go))| step * d * (gn - go))
            .sum();
        if !(sv > 0.0) {
            debug!("L-BFGS: dropping step with s·v = {}", sv);
            return false;
        }

        // reuse the buffers of the evicted pair
        let evicted = if self.pairs.len() >= self.memory {
            self.pairs.pop_back()
        } else {
            None
        };
        let mut pair = evicted.unwrap_or_else(|| VectorPair {
            s: Array1::zeros(direction.len()),
            v: Array1::zeros(direction.len()),
            rho: 0.0,
            alpha: 0.0,
        });
        pair.s.zip_mut_with(direction, |s, &d| *s = step * d);
        pair.v.assign(g_new);
        pair.v -= g_old;
        pair.rho = 1.0 / sv;
        self.pairs.push_front(pair);
        true
    }

    fn clear(&mut self) {
        self.pairs.clear();
    }

    fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Two-loop recursion, writes `-H·g` into `direction`.
    fn direction(&mut self, g: &Array1<f64>, direction: &mut Array1<f64>) {
        direction.zip_mut_with(g, |d, &gi| *d = -gi);
        if self.pairs.is_empty() {
            return;
        }

        for pair in self.pairs.iter_mut() {
            pair.alpha = pair.rho * pair.s.dot(direction);
            direction.scaled_add(-pair.alpha, &pair.v);
        }

        if let Some(newest) = self.pairs.front() {
            let vv = newest.v.dot(&newest.v);
            if vv > 0.0 {
                *direction *= newest.v.dot(&newest.s) / vv;
            }
        }

        for pair in self.pairs.iter().rev() {
            let beta = pair.rho * pair.v.dot(direction);
            direction.scaled_add(pair.alpha - beta, &pair.s);
        }
    }
}

/// Limited memory BFGS keeping the last `memory` steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lbfgs {
    memory: usize,
}

impl Lbfgs {
    pub const MIN_MEMORY: usize = 3;
    pub const MAX_MEMORY: usize = 10;

    pub fn new(memory: usize) -> Result<Self, MinimizerError> {
        if !(Self::MIN_MEMORY..=Self::MAX_MEMORY).contains(&memory) {
            return Err(MinimizerError::configuration(format!(
                "L-BFGS memory has to be in {}..={}, got {}",
                Self::MIN_MEMORY,
                Self::MAX_MEMORY,
                memory
            )));
        }
        Ok(Lbfgs { memory })
    }

    pub fn memory(&self) -> usize {
        self.memory
    }
}

impl Minimizer for Lbfgs {
    fn minimize(
        &self,
        f: &dyn ObjGradFn,
        x: &mut Array1<f64>,
        run: &mut Run<'_>,
    ) -> Result<usize, MinimizerError> {
        let (mut value, mut g_new) = run.begin(&self.to_string(), f, x)?;
        let mut history = History::new(self.memory);
        let mut g_old = g_new.clone();
        let mut direction = -&g_new;
        let mut f_last = f64::INFINITY;
        let mut step = 0.0;
        let mut i = 0;

        while run.proceed(i, f_last, value, &g_new, &direction, step) {
            if i > 0 {
                history.push(&direction, step, &g_new, &g_old);
                history.direction(&g_new, &mut direction);
                if direction.dot(&g_new) >= 0.0 {
                    debug!(
                        "{}: no descent direction in iteration {}, dropping {} stored steps",
                        self,
                        i + 1,
                        history.len()
                    );
                    history.clear();
                    direction.zip_mut_with(&g_new, |d, &g| *d = -g);
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

impl fmt::Display for Lbfgs {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "L-BFGS({})", self.memory)
    }
}

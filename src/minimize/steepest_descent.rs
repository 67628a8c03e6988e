use crate::minimize::optimizer::gradient_at;
use crate::minimize::{Minimizer, MinimizerError, ObjGradFn, Run};
use ndarray::prelude::*;
use std::fmt;

/// Line search along the negative gradient.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SteepestDescent;

impl Minimizer for SteepestDescent {
    fn minimize(
        &self,
        f: &dyn ObjGradFn,
        x: &mut Array1<f64>,
        run: &mut Run<'_>,
    ) -> Result<usize, MinimizerError> {
        let (mut value, mut gradient) = run.begin(&self.to_string(), f, x)?;
        let mut direction = -&gradient;
        let mut f_last = f64::INFINITY;
        let mut step = 0.0;
        let mut i = 0;

        while run.proceed(i, f_last, value, &gradient, &direction, step) {
            f_last = value;
            direction.zip_mut_with(&gradient, |d, &g| *d = -g);

            i += 1;
            let res = run.line_search(f, x, &direction, value, i)?;
            value = res.f_new;
            step = res.alpha;
            gradient = gradient_at(f, x)?;
        }
        Ok(i)
    }
}

impl fmt::Display for SteepestDescent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "steepest descent")
    }
}

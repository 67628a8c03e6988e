use crate::minimize::{
    Clock, ConjGrad, ConjGradMethod, IterationInfo, IterationRecord, Lbfgs, LineSearchResult,
    Minimizer, MinimizerError, NoProgress, ObjGradFn, Progress, QuasiNewton, QuasiNewtonMethod,
    StartDistanceForecaster, SteepestDescent, Stopwatch, TerminationCondition,
};
use log::debug;
use ndarray::prelude::*;
use regex::Regex;
use simple_error::{SimpleError, bail};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// The minimizers the dispatcher can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    SteepestDescent,
    ConjugateGradientsFR,
    ConjugateGradientsPR,
    ConjugateGradientsPRP,
    QuasiNewtonDFP,
    QuasiNewtonBFGS,
    /// Limited memory BFGS keeping the last `m` steps, `3 <= m <= 10`.
    LimitedMemoryBFGS(usize),
}

impl Algorithm {
    pub const STEEPEST_DESCENT: u8 = 16;
    pub const CONJUGATE_GRADIENTS_FR: u8 = 17;
    pub const CONJUGATE_GRADIENTS_PRP: u8 = 18;
    pub const QUASI_NEWTON_DFP: u8 = 19;
    pub const QUASI_NEWTON_BFGS: u8 = 20;
    pub const CONJUGATE_GRADIENTS_PR: u8 = 21;

    /// Decodes the numeric selector: 16 to 21 name a method, 3 to 10 select
    /// L-BFGS with that many stored steps.
    pub fn from_code(code: u8) -> Result<Self, MinimizerError> {
        match code {
            Self::STEEPEST_DESCENT => Ok(Algorithm::SteepestDescent),
            Self::CONJUGATE_GRADIENTS_FR => Ok(Algorithm::ConjugateGradientsFR),
            Self::CONJUGATE_GRADIENTS_PRP => Ok(Algorithm::ConjugateGradientsPRP),
            Self::QUASI_NEWTON_DFP => Ok(Algorithm::QuasiNewtonDFP),
            Self::QUASI_NEWTON_BFGS => Ok(Algorithm::QuasiNewtonBFGS),
            Self::CONJUGATE_GRADIENTS_PR => Ok(Algorithm::ConjugateGradientsPR),
            m @ 3..=10 => Ok(Algorithm::LimitedMemoryBFGS(m as usize)),
            _ => Err(MinimizerError::configuration(format!(
                "unknown algorithm code {}",
                code
            ))),
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            Algorithm::SteepestDescent => Self::STEEPEST_DESCENT,
            Algorithm::ConjugateGradientsFR => Self::CONJUGATE_GRADIENTS_FR,
            Algorithm::ConjugateGradientsPR => Self::CONJUGATE_GRADIENTS_PR,
            Algorithm::ConjugateGradientsPRP => Self::CONJUGATE_GRADIENTS_PRP,
            Algorithm::QuasiNewtonDFP => Self::QUASI_NEWTON_DFP,
            Algorithm::QuasiNewtonBFGS => Self::QUASI_NEWTON_BFGS,
            // out of range values never survive `optimize`, saturate here
            Algorithm::LimitedMemoryBFGS(m) => (*m).min(u8::MAX as usize) as u8,
        }
    }
}

impl FromStr for Algorithm {
    type Err = SimpleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect();
        match name.as_str() {
            "steepestdescent" | "sd" => return Ok(Algorithm::SteepestDescent),
            "cgfr" | "fletcherreeves" => return Ok(Algorithm::ConjugateGradientsFR),
            "cgpr" | "polakribiere" => return Ok(Algorithm::ConjugateGradientsPR),
            "cgprp" | "polakribierepositive" => return Ok(Algorithm::ConjugateGradientsPRP),
            "dfp" => return Ok(Algorithm::QuasiNewtonDFP),
            "bfgs" => return Ok(Algorithm::QuasiNewtonBFGS),
            _ => {}
        }

        let re_lbfgs = Regex::new(r"^lbfgs\(?(\d+)\)?$")
            .map_err(|e| SimpleError::with("invalid L-BFGS pattern", e))?;
        if let Some(caps) = re_lbfgs.captures(&name) {
            let m: usize = caps[1]
                .parse()
                .map_err(|e| SimpleError::with("L-BFGS memory is not a number", e))?;
            if !(Lbfgs::MIN_MEMORY..=Lbfgs::MAX_MEMORY).contains(&m) {
                bail!(
                    "L-BFGS memory has to be in {}..={}, got {}",
                    Lbfgs::MIN_MEMORY,
                    Lbfgs::MAX_MEMORY,
                    m
                );
            }
            return Ok(Algorithm::LimitedMemoryBFGS(m));
        }

        if let Ok(code) = name.parse::<u8>() {
            return Algorithm::from_code(code).map_err(|e| SimpleError::new(e.to_string()));
        }

        bail!("string not a valid algorithm: {}", s)
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Algorithm::SteepestDescent => write!(f, "{}", SteepestDescent),
            Algorithm::ConjugateGradientsFR => write!(f, "{}", ConjGradMethod::FletcherReeves),
            Algorithm::ConjugateGradientsPR => write!(f, "{}", ConjGradMethod::PolakRibiere),
            Algorithm::ConjugateGradientsPRP => {
                write!(f, "{}", ConjGradMethod::PolakRibierePositive)
            }
            Algorithm::QuasiNewtonDFP => write!(f, "{}", QuasiNewtonMethod::DFP),
            Algorithm::QuasiNewtonBFGS => write!(f, "{}", QuasiNewtonMethod::BFGS),
            Algorithm::LimitedMemoryBFGS(m) => write!(f, "L-BFGS({})", m),
        }
    }
}

/// The collaborators of one minimization run.
///
/// The termination condition and forecaster are borrowed so the caller can
/// inspect them afterwards; both are reset when a run begins.
pub struct Run<'r> {
    termination: &'r mut dyn TerminationCondition,
    forecaster: &'r mut dyn StartDistanceForecaster,
    line_tolerance: f64,
    progress: Box<dyn Progress + 'r>,
    clock: Box<dyn Clock + 'r>,
}

impl<'r> Run<'r> {
    pub fn new(
        termination: &'r mut dyn TerminationCondition,
        forecaster: &'r mut dyn StartDistanceForecaster,
        line_tolerance: f64,
    ) -> Self {
        Run {
            termination,
            forecaster,
            line_tolerance,
            progress: Box::new(NoProgress),
            clock: Box::new(Stopwatch::new()),
        }
    }

    pub fn with_progress<P>(mut self, progress: P) -> Self
    where
        P: Progress + 'r,
    {
        self.progress = Box::new(progress);
        self
    }

    pub fn with_clock<C>(mut self, clock: C) -> Self
    where
        C: Clock + 'r,
    {
        self.clock = Box::new(clock);
        self
    }

    pub fn line_tolerance(&self) -> f64 {
        self.line_tolerance
    }

    pub fn elapsed(&self) -> Duration {
        self.clock.elapsed()
    }

    /// Validates the setup, resets the collaborators and evaluates the
    /// starting point. Returns `f(x)` and `∇f(x)`.
    pub(crate) fn begin(
        &mut self,
        name: &str,
        f: &dyn ObjGradFn,
        x: &Array1<f64>,
    ) -> Result<(f64, Array1<f64>), MinimizerError> {
        if !(self.line_tolerance > 0.0) || !self.line_tolerance.is_finite() {
            return Err(MinimizerError::configuration(format!(
                "line search tolerance has to be positive and finite, got {}",
                self.line_tolerance
            )));
        }
        f.check_dimension(x)?;

        self.termination.reset();
        if !self.termination.is_simple() {
            debug!("{}: termination depends on elapsed time, iterations are not reproducible", name);
        }
        self.forecaster.reset();
        self.clock.start();

        let value = f.call(x)?;
        if !value.is_finite() {
            return Err(MinimizerError::evaluation(format!(
                "function value at the starting point is {}",
                value
            )));
        }
        let gradient = gradient_at(f, x)?;
        self.progress.start(name, value);
        Ok((value, gradient))
    }

    /// Asks the termination condition whether to run another iteration.
    pub(crate) fn proceed(
        &mut self,
        iteration: usize,
        f_last: f64,
        f_current: f64,
        gradient: &Array1<f64>,
        direction: &Array1<f64>,
        step: f64,
    ) -> bool {
        let info = IterationInfo {
            iteration,
            f_last,
            f_current,
            gradient,
            direction,
            step,
            elapsed: self.clock.elapsed(),
        };
        self.termination.do_next_iteration(&info)
    }

    /// Minimizes along `direction` from `x` (with value `value`), records the
    /// iteration and moves `x` to the new point.
    ///
    /// The gradient held by the caller is stale afterwards.
    pub(crate) fn line_search(
        &mut self,
        f: &dyn ObjGradFn,
        x: &mut Array1<f64>,
        direction: &Array1<f64>,
        value: f64,
        iteration: usize,
    ) -> Result<LineSearchResult, MinimizerError> {
        let start_distance = self.forecaster.next_start_distance();
        if !(start_distance > 0.0) {
            return Err(MinimizerError::configuration(format!(
                "The start distance has to be greater than 0, got {}",
                start_distance
            )));
        }

        let res =
            f.minimize_along_direction(x, direction, value, self.line_tolerance, start_distance)?;

        self.progress.iteration(&IterationRecord {
            iteration,
            elapsed: self.clock.elapsed(),
            value: res.f_new,
            delta: value - res.f_new,
            start_distance,
            step: res.alpha,
        });
        self.forecaster.record_last_distance(res.alpha);
        x.scaled_add(res.alpha, direction);
        Ok(res)
    }
}

impl fmt::Debug for Run<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Run( line_tolerance: {})", self.line_tolerance)
    }
}

/// Evaluates the gradient and insists on the declared dimension.
pub(crate) fn gradient_at(
    f: &dyn ObjGradFn,
    x: &Array1<f64>,
) -> Result<Array1<f64>, MinimizerError> {
    let g = f.grad(x)?;
    if g.len() != f.dimension() {
        return Err(MinimizerError::evaluation(format!(
            "gradient has length {}, expected {}",
            g.len(),
            f.dimension()
        )));
    }
    if let Some((i, v)) = g.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(MinimizerError::evaluation(format!(
            "gradient component {} is {}",
            i, v
        )));
    }
    Ok(g)
}

/// Runs any of the minimizers on one function.
#[derive(Clone)]
pub struct Optimizer {
    f: Box<dyn ObjGradFn>,
}

impl Optimizer {
    pub fn new<F>(f: F) -> Self
    where
        F: ObjGradFn + Clone + 'static,
    {
        Optimizer { f: Box::new(f) }
    }

    pub fn new_boxed(f: Box<dyn ObjGradFn>) -> Self {
        Optimizer { f }
    }

    pub fn function(&self) -> &dyn ObjGradFn {
        self.f.as_ref()
    }

    /// Minimizes the function with `algorithm`, starting from and writing
    /// the result into `x`. Returns the number of iterations.
    pub fn optimize(
        &self,
        algorithm: Algorithm,
        x: &mut Array1<f64>,
        run: &mut Run,
    ) -> Result<usize, MinimizerError> {
        let f = self.f.as_ref();
        match algorithm {
            Algorithm::SteepestDescent => SteepestDescent.minimize(f, x, run),
            Algorithm::ConjugateGradientsFR => {
                ConjGrad::new(ConjGradMethod::FletcherReeves).minimize(f, x, run)
            }
            Algorithm::ConjugateGradientsPR => {
                ConjGrad::new(ConjGradMethod::PolakRibiere).minimize(f, x, run)
            }
            Algorithm::ConjugateGradientsPRP => {
                ConjGrad::new(ConjGradMethod::PolakRibierePositive).minimize(f, x, run)
            }
            Algorithm::QuasiNewtonDFP => QuasiNewton::new(QuasiNewtonMethod::DFP).minimize(f, x, run),
            Algorithm::QuasiNewtonBFGS => {
                QuasiNewton::new(QuasiNewtonMethod::BFGS).minimize(f, x, run)
            }
            Algorithm::LimitedMemoryBFGS(m) => Lbfgs::new(m)?.minimize(f, x, run),
        }
    }

    /// Same as [`Optimizer::optimize`] with a numeric selector.
    pub fn optimize_code(
        &self,
        code: u8,
        x: &mut Array1<f64>,
        run: &mut Run,
    ) -> Result<usize, MinimizerError> {
        self.optimize(Algorithm::from_code(code)?, x, run)
    }
}

impl fmt::Debug for Optimizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Optimizer( dimension: {})", self.f.dimension())
    }
}

use crate::minimize::MinimizerError;
use ndarray::prelude::*;
use std::fmt;
use std::time::Duration;

/// Snapshot of a run handed to a [`TerminationCondition`] after every
/// iteration.
#[derive(Debug, Clone, Copy)]
pub struct IterationInfo<'a> {
    /// Number of completed iterations.
    pub iteration: usize,
    /// Function value before the last iteration, `+∞` before the first one.
    pub f_last: f64,
    pub f_current: f64,
    pub gradient: &'a Array1<f64>,
    /// Direction of the last line search.
    pub direction: &'a Array1<f64>,
    /// Step length along `direction`, `0` before the first iteration.
    pub step: f64,
    pub elapsed: Duration,
}

/// Decides whether a minimizer runs another iteration.
pub trait TerminationCondition {
    fn do_next_iteration(&mut self, info: &IterationInfo) -> bool;

    /// Clears any state gathered during an earlier run.
    fn reset(&mut self) {}

    /// `false` for conditions whose vote depends on wall-clock time.
    fn is_simple(&self) -> bool {
        true
    }
}

fn l2_norm(v: &Array1<f64>) -> f64 {
    v.dot(v).sqrt()
}

fn positive(name: &str, eps: f64) -> Result<f64, MinimizerError> {
    if !(eps > 0.0) || !eps.is_finite() {
        return Err(MinimizerError::configuration(format!(
            "{} has to be positive and finite, got {}",
            name, eps
        )));
    }
    Ok(eps)
}

/// Continues while fewer than `max` iterations have been done.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationCondition {
    max: usize,
}

impl IterationCondition {
    pub fn new(max: usize) -> Self {
        IterationCondition { max }
    }
}

impl TerminationCondition for IterationCondition {
    fn do_next_iteration(&mut self, info: &IterationInfo) -> bool {
        info.iteration < self.max
    }
}

/// Continues while consecutive function values differ by more than `eps`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmallDifferenceCondition {
    eps: f64,
}

impl SmallDifferenceCondition {
    pub fn new(eps: f64) -> Result<Self, MinimizerError> {
        Ok(SmallDifferenceCondition {
            eps: positive("function value difference", eps)?,
        })
    }
}

impl TerminationCondition for SmallDifferenceCondition {
    fn do_next_iteration(&mut self, info: &IterationInfo) -> bool {
        if info.f_last.is_infinite() && info.f_last > 0.0 {
            return true;
        }
        (info.f_last - info.f_current).abs() > self.eps
    }
}

/// Continues while the euclidean norm of the gradient exceeds `eps`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientNormCondition {
    eps: f64,
}

impl GradientNormCondition {
    pub fn new(eps: f64) -> Result<Self, MinimizerError> {
        Ok(GradientNormCondition {
            eps: positive("gradient norm threshold", eps)?,
        })
    }
}

impl TerminationCondition for GradientNormCondition {
    fn do_next_iteration(&mut self, info: &IterationInfo) -> bool {
        l2_norm(info.gradient) > self.eps
    }
}

/// Continues while the last move `|step|·‖d‖` exceeds `eps`. The first
/// check, before any step was taken, always continues.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmallStepCondition {
    eps: f64,
}

impl SmallStepCondition {
    pub fn new(eps: f64) -> Result<Self, MinimizerError> {
        Ok(SmallStepCondition {
            eps: positive("step threshold", eps)?,
        })
    }
}

impl TerminationCondition for SmallStepCondition {
    fn do_next_iteration(&mut self, info: &IterationInfo) -> bool {
        info.iteration == 0 || info.step.abs() * l2_norm(info.direction) > self.eps
    }
}

/// Continues while less than `limit` has elapsed since the run started.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeCondition {
    limit: Duration,
}

impl TimeCondition {
    pub fn new(limit: Duration) -> Result<Self, MinimizerError> {
        if limit.is_zero() {
            return Err(MinimizerError::configuration("time limit has to be positive"));
        }
        Ok(TimeCondition { limit })
    }

    pub fn from_secs_f64(secs: f64) -> Result<Self, MinimizerError> {
        let secs = positive("time limit", secs)?;
        Self::new(Duration::from_secs_f64(secs))
    }
}

impl TerminationCondition for TimeCondition {
    fn do_next_iteration(&mut self, info: &IterationInfo) -> bool {
        info.elapsed < self.limit
    }

    fn is_simple(&self) -> bool {
        false
    }
}

/// Stops only after the inner condition voted "stop" on `count` consecutive
/// checks.
pub struct MultipleIterationsCondition {
    count: usize,
    inner: Box<dyn TerminationCondition>,
    stops: usize,
}

impl MultipleIterationsCondition {
    pub fn new<C>(count: usize, inner: C) -> Result<Self, MinimizerError>
    where
        C: TerminationCondition + 'static,
    {
        Self::new_boxed(count, Box::new(inner))
    }

    pub fn new_boxed(
        count: usize,
        inner: Box<dyn TerminationCondition>,
    ) -> Result<Self, MinimizerError> {
        if count == 0 {
            return Err(MinimizerError::configuration(
                "number of consecutive stop votes has to be at least 1",
            ));
        }
        Ok(MultipleIterationsCondition {
            count,
            inner,
            stops: 0,
        })
    }
}

impl TerminationCondition for MultipleIterationsCondition {
    fn do_next_iteration(&mut self, info: &IterationInfo) -> bool {
        if self.inner.do_next_iteration(info) {
            self.stops = 0;
        } else {
            self.stops += 1;
        }
        self.stops < self.count
    }

    fn reset(&mut self) {
        self.stops = 0;
        self.inner.reset();
    }

    fn is_simple(&self) -> bool {
        self.inner.is_simple()
    }
}

impl fmt::Debug for MultipleIterationsCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MultipleIterationsCondition( count: {}, stops: {})",
            self.count, self.stops
        )
    }
}

/// Continues while at least `threshold` of the conditions vote to continue.
///
/// With `threshold` equal to the number of conditions the run stops as soon
/// as any of them says stop; with `threshold = 1` it stops once all do.
pub struct CombinedCondition {
    threshold: usize,
    conditions: Vec<Box<dyn TerminationCondition>>,
}

impl CombinedCondition {
    pub fn new(
        threshold: usize,
        conditions: Vec<Box<dyn TerminationCondition>>,
    ) -> Result<Self, MinimizerError> {
        if conditions.is_empty() {
            return Err(MinimizerError::configuration(
                "combined condition needs at least one condition",
            ));
        }
        if threshold == 0 || threshold > conditions.len() {
            return Err(MinimizerError::configuration(format!(
                "threshold {} is outside of 1..={}",
                threshold,
                conditions.len()
            )));
        }
        Ok(CombinedCondition {
            threshold,
            conditions,
        })
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

impl TerminationCondition for CombinedCondition {
    fn do_next_iteration(&mut self, info: &IterationInfo) -> bool {
        // every condition votes so stateful ones see each check
        let positive = self
            .conditions
            .iter_mut()
            .map(|c| c.do_next_iteration(info))
            .filter(|&vote| vote)
            .count();
        positive >= self.threshold
    }

    fn reset(&mut self) {
        self.conditions.iter_mut().for_each(|c| c.reset());
    }

    fn is_simple(&self) -> bool {
        self.conditions.iter().all(|c| c.is_simple())
    }
}

impl fmt::Debug for CombinedCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CombinedCondition( threshold: {}, conditions: {})",
            self.threshold,
            self.conditions.len()
        )
    }
}

use crate::minimize::MinimizerError;
use log::debug;
use std::collections::VecDeque;
use std::fmt;

/// Predicts the initial step of the next line search from earlier ones.
///
/// The minimizers ask for a forecast once per iteration and record the step
/// that was actually taken afterwards. A forecast that is not strictly
/// positive aborts the run with `IllegalConfiguration`.
pub trait StartDistanceForecaster {
    fn next_start_distance(&mut self) -> f64;

    fn record_last_distance(&mut self, distance: f64);

    /// Forgets everything recorded so far.
    fn reset(&mut self);
}

/// Always forecasts the same distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantStartDistance {
    distance: f64,
}

impl ConstantStartDistance {
    pub fn new(distance: f64) -> Result<Self, MinimizerError> {
        if !(distance > 0.0) || !distance.is_finite() {
            return Err(MinimizerError::configuration(format!(
                "constant start distance has to be positive and finite, got {}",
                distance
            )));
        }
        Ok(ConstantStartDistance { distance })
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }
}

impl StartDistanceForecaster for ConstantStartDistance {
    fn next_start_distance(&mut self) -> f64 {
        self.distance
    }

    fn record_last_distance(&mut self, _distance: f64) {}

    fn reset(&mut self) {}
}

/// Forecasts the median of the last `k` recorded step lengths, or a default
/// distance while nothing usable has been recorded.
#[derive(Clone)]
pub struct LimitedMedianStartDistance {
    history: VecDeque<f64>,
    capacity: usize,
    default: f64,
    scratch: Vec<f64>,
}

impl LimitedMedianStartDistance {
    pub fn new(capacity: usize, default: f64) -> Result<Self, MinimizerError> {
        if capacity == 0 {
            return Err(MinimizerError::configuration(
                "median start distance needs room for at least one value",
            ));
        }
        if !(default > 0.0) || !default.is_finite() {
            return Err(MinimizerError::configuration(format!(
                "default start distance has to be positive and finite, got {}",
                default
            )));
        }
        Ok(LimitedMedianStartDistance {
            history: VecDeque::with_capacity(capacity),
            capacity,
            default,
            scratch: Vec::with_capacity(capacity),
        })
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

impl StartDistanceForecaster for LimitedMedianStartDistance {
    fn next_start_distance(&mut self) -> f64 {
        if self.history.is_empty() {
            return self.default;
        }
        self.scratch.clear();
        self.scratch.extend(self.history.iter().copied());
        self.scratch.sort_by(|a, b| a.total_cmp(b));
        let n = self.scratch.len();
        if n % 2 == 1 {
            self.scratch[n / 2]
        } else {
            0.5 * (self.scratch[n / 2 - 1] + self.scratch[n / 2])
        }
    }

    fn record_last_distance(&mut self, distance: f64) {
        if !(distance > 0.0) || !distance.is_finite() {
            debug!("ignoring step length {} for the start distance median", distance);
            return;
        }
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(distance);
    }

    fn reset(&mut self) {
        self.history.clear();
    }
}

impl fmt::Debug for LimitedMedianStartDistance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LimitedMedianStartDistance( capacity: {}, default: {}, history: {:?})",
            self.capacity, self.default, self.history
        )
    }
}

use log::{info, warn};
use std::fmt;
use std::io;
use std::time::{Duration, Instant};

/// One row of the iteration table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationRecord {
    pub iteration: usize,
    pub elapsed: Duration,
    /// Function value after the iteration.
    pub value: f64,
    /// Improvement over the value before the iteration.
    pub delta: f64,
    pub start_distance: f64,
    /// Step length chosen by the line search.
    pub step: f64,
}

/// Receives one record per iteration. Implementations must not influence
/// the run, so they cannot fail.
pub trait Progress {
    /// Called once before the first iteration with the starting value.
    fn start(&mut self, _algorithm: &str, _value: f64) {}

    fn iteration(&mut self, record: &IterationRecord);
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn iteration(&mut self, _record: &IterationRecord) {}
}

/// Reports every iteration through the `log` facade at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl Progress for LogProgress {
    fn start(&mut self, algorithm: &str, value: f64) {
        info!("{}: starting at f(x) = {}", algorithm, value);
    }

    fn iteration(&mut self, r: &IterationRecord) {
        info!(
            "iteration {}: f(x) = {}, delta = {}, start distance = {}, step = {} ({:.3}s)",
            r.iteration,
            r.value,
            r.delta,
            r.start_distance,
            r.step,
            r.elapsed.as_secs_f64()
        );
    }
}

/// Writes the iteration table as tab separated text.
///
/// Write errors are logged once per failing line and otherwise dropped.
pub struct TextProgress<W>
where
    W: io::Write,
{
    out: W,
}

impl<W> TextProgress<W>
where
    W: io::Write,
{
    pub const HEADER: &'static str = "iteration\ttime\tf(x)\tdelta\tstart distance\tlinesearch";

    pub fn new(out: W) -> Self {
        TextProgress { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_line(&mut self, line: fmt::Arguments) {
        if let Err(e) = self.out.write_fmt(line).and_then(|_| self.out.write_all(b"\n")) {
            warn!("could not write progress: {}", e);
        }
    }
}

impl<W> Progress for TextProgress<W>
where
    W: io::Write,
{
    fn start(&mut self, algorithm: &str, value: f64) {
        self.write_line(format_args!("{}", algorithm));
        self.write_line(format_args!("{}", Self::HEADER));
        self.write_line(format_args!("0\t0\t{}\t0", value));
    }

    fn iteration(&mut self, r: &IterationRecord) {
        self.write_line(format_args!(
            "{}\t{}\t{}\t{}\t{}\t{}",
            r.iteration,
            r.elapsed.as_secs_f64(),
            r.value,
            r.delta,
            r.start_distance,
            r.step
        ));
        if let Err(e) = self.out.flush() {
            warn!("could not flush progress: {}", e);
        }
    }
}

impl<W> fmt::Debug for TextProgress<W>
where
    W: io::Write,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TextProgress")
    }
}

/// Measures the time since the start of a run.
pub trait Clock {
    fn start(&mut self);

    fn elapsed(&self) -> Duration;
}

/// Wall-clock time from [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    started: Instant,
}

impl Stopwatch {
    pub fn new() -> Self {
        Stopwatch {
            started: Instant::now(),
        }
    }
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for Stopwatch {
    fn start(&mut self) {
        self.started = Instant::now();
    }

    fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

use ndarray::prelude::*;

pub use crate::error::MinimizerError;

pub mod bracket;
pub mod brent;
pub mod conjugate_gradient;
pub mod forecast;
pub mod golden;
pub mod lbfgs;
pub mod objective;
pub mod optimizer;
pub mod parabolic;
pub mod progress;
pub mod quasi_newton;
pub mod steepest_descent;
pub mod termination;

pub use self::bracket::{Bracket, BracketResult};
pub use self::brent::{Brent, BrentResult};
pub use self::conjugate_gradient::{ConjGrad, ConjGradMethod};
pub use self::forecast::{
    ConstantStartDistance, LimitedMedianStartDistance, StartDistanceForecaster,
};
pub use self::golden::{Golden, GoldenResult};
pub use self::lbfgs::Lbfgs;
pub use self::objective::{
    F1dim, LineSearchResult, MultiDimFn, MultiDimGradFn, MultiDimNumGradFn, Negated, ObjFn,
    ObjGradFn, ScalarFn, SingleDimFn,
};
pub use self::optimizer::{Algorithm, Optimizer, Run};
pub use self::parabolic::{Parabolic, ParabolicResult};
pub use self::progress::{
    Clock, IterationRecord, LogProgress, NoProgress, Progress, Stopwatch, TextProgress,
};
pub use self::quasi_newton::{QuasiNewton, QuasiNewtonMethod};
pub use self::steepest_descent::SteepestDescent;
pub use self::termination::{
    CombinedCondition, GradientNormCondition, IterationCondition, IterationInfo,
    MultipleIterationsCondition, SmallDifferenceCondition, SmallStepCondition,
    TerminationCondition, TimeCondition,
};

/// A multidimensional minimizer driven by line searches.
///
/// `x` holds the starting point and is overwritten with the best point found,
/// also when an error interrupts the run after some iterations. Returns the
/// number of iterations performed.
pub trait Minimizer {
    fn minimize(
        &self,
        f: &dyn ObjGradFn,
        x: &mut Array1<f64>,
        run: &mut Run<'_>,
    ) -> Result<usize, MinimizerError>;
}

//! minkit prelude.
//!
//! This module contains the most used types, traits and functions, that you
//! can import easily as a group.
//!
//! ```
//! use minkit::prelude::*;
//!
//! ```

#[doc(no_inline)]
pub use crate::error::MinimizerError;

#[doc(no_inline)]
pub use crate::minimize::{Algorithm, Minimizer, Optimizer, Run};

#[doc(no_inline)]
pub use crate::minimize::{
    MultiDimFn, MultiDimGradFn, MultiDimNumGradFn, Negated, ObjFn, ObjGradFn, SingleDimFn,
};

#[doc(no_inline)]
pub use crate::minimize::{Bracket, Brent, Golden, Parabolic};

#[doc(no_inline)]
pub use crate::minimize::{
    ConjGrad, ConjGradMethod, Lbfgs, QuasiNewton, QuasiNewtonMethod, SteepestDescent,
};

#[doc(no_inline)]
pub use crate::minimize::{
    CombinedCondition, GradientNormCondition, IterationCondition, MultipleIterationsCondition,
    SmallDifferenceCondition, SmallStepCondition, TerminationCondition, TimeCondition,
};

#[doc(no_inline)]
pub use crate::minimize::{
    ConstantStartDistance, LimitedMedianStartDistance, StartDistanceForecaster,
};

#[doc(no_inline)]
pub use crate::minimize::{LogProgress, NoProgress, Progress, TextProgress};

use std::fmt;

/// Error types for the minimizers and line searches
#[derive(Debug, Clone, PartialEq)]
pub enum MinimizerError {
    /// A vector's length disagrees with the declared dimension of the function.
    DimensionMismatch { expected: usize, found: usize },
    /// The objective could not produce a value or gradient at some point.
    EvaluationFailure(String),
    /// A parameter handed to the engine can never work.
    IllegalConfiguration(String),
}

impl MinimizerError {
    pub fn evaluation<S: Into<String>>(msg: S) -> Self {
        MinimizerError::EvaluationFailure(msg.into())
    }

    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        MinimizerError::IllegalConfiguration(msg.into())
    }

    /// Re-labels a dimension mismatch as an evaluation failure.
    ///
    /// Used where a mismatch can only come from a programming error inside
    /// the engine, never from the caller.
    pub(crate) fn into_evaluation(self) -> Self {
        match self {
            MinimizerError::DimensionMismatch { expected, found } => {
                MinimizerError::EvaluationFailure(format!(
                    "internal dimension mismatch: expected {}, found {}",
                    expected, found
                ))
            }
            other => other,
        }
    }
}

impl fmt::Display for MinimizerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MinimizerError::DimensionMismatch { expected, found } => {
                write!(
                    f,
                    "Dimension mismatch: expected a vector of length {}, found {}",
                    expected, found
                )
            }
            MinimizerError::EvaluationFailure(msg) => {
                write!(f, "Function evaluation failed: {}", msg)
            }
            MinimizerError::IllegalConfiguration(msg) => {
                write!(f, "Illegal configuration: {}", msg)
            }
        }
    }
}

impl std::error::Error for MinimizerError {}

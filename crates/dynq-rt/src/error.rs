//! Evaluation failures.

use dynq_typeck::HostError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("attempted to divide by zero")]
    DivideByZero,
    #[error("lambda expects {expected} arguments, got {actual}")]
    ArgumentCount { expected: usize, actual: usize },
    #[error("parameter '{0}' is not bound to a value")]
    UnboundParameter(String),
    #[error("operator '{op}' cannot be applied to values of type '{left}' and '{right}'")]
    InvalidOperands {
        op: &'static str,
        left: String,
        right: String,
    },
    #[error("operator '{op}' cannot be applied to a value of type '{operand}'")]
    InvalidOperand { op: &'static str, operand: String },
    #[error(transparent)]
    Host(#[from] HostError),
}

pub type EvalResult<T> = Result<T, EvalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        assert_eq!(EvalError::DivideByZero.to_string(), "attempted to divide by zero");
        assert_eq!(
            EvalError::ArgumentCount {
                expected: 2,
                actual: 1
            }
            .to_string(),
            "lambda expects 2 arguments, got 1"
        );
        let host: EvalError = HostError::EmptySequence.into();
        assert_eq!(host.to_string(), "sequence contains no elements");
    }
}

//! Errors raised by the symbolic layer (parsing, evaluation, integration).
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SymbolicError {
    #[error("cannot parse `{input}`: {reason}")]
    Parse { input: String, reason: String },
    #[error("unknown variable `{0}`")]
    UnknownVariable(String),
    #[error("unknown function `{0}`")]
    UnknownFunction(String),
    #[error("no closed form found for ∫({expr}) d{var}")]
    Integration { expr: String, var: String },
    #[error("evaluation failed: {0}")]
    Evaluation(String),
}

pub type SymbolicResult<T> = Result<T, SymbolicError>;

//! Error taxonomy of the exact-equation engine.
//!
//! Internals return `EngineResult`; the public operations in `engine` turn every error into a
//! sentinel result value, so none of these reach a caller of those operations.
use crate::symbolic::symbolic_error::SymbolicError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// empty input or a rewriting rule that could not be applied
    #[error("cannot normalize `{input}`: {reason}")]
    Normalize { input: String, reason: String },
    #[error(transparent)]
    Symbolic(#[from] SymbolicError),
    #[error("invalid settings: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("search deadline of {0} ms exceeded")]
    DeadlineExceeded(u64),
}

pub type EngineResult<T> = Result<T, EngineError>;

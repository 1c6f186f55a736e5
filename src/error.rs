//! Error handling for the diagnosis engine.
//!
//! A single crate-wide error enum keeps the failure surface small: grammar
//! construction problems, parse rejections, and configuration mistakes are
//! the only ways the engine itself can fail. Oracle trouble (timeouts,
//! crashes) is deliberately *not* an error: it degrades to an
//! [`Undefined`](crate::oracle::Verdict::Undefined) verdict so a flaky
//! subject program cannot abort a diagnosis run.

use thiserror::Error;

/// Result type used throughout the crate.
pub type DiagnosisResult<T> = Result<T, DiagnosisError>;

/// Errors raised by grammar handling and engine configuration.
#[derive(Debug, Error)]
pub enum DiagnosisError {
    /// The grammar itself is malformed (unreachable or undefined
    /// nonterminals, empty alternative lists, missing start symbol).
    #[error("invalid grammar: {0}")]
    Grammar(String),

    /// A raw string is not in the grammar's language. Recoverable: the
    /// engine skips the input and continues with the rest.
    #[error("cannot parse {input:?}: no derivation covers position {position}")]
    Parse {
        /// The rejected raw input.
        input: String,
        /// Byte offset of the furthest position any derivation reached.
        position: usize,
    },

    /// The engine was configured in a way that cannot produce a diagnosis.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Reading a grammar or seed file from disk failed.
    #[error("io error on {path}: {message}")]
    Io {
        /// Path that was being read.
        path: String,
        /// Underlying error text.
        message: String,
    },
}

impl DiagnosisError {
    /// True for errors the engine may skip past (bad single inputs),
    /// false for errors that must abort the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, DiagnosisError::Parse { .. })
    }
}

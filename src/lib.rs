//! Grammar-based diagnosis of program failures.
//!
//! Given a context-free grammar for a program's input language, a
//! black-box oracle that labels inputs as failing or passing, and a few
//! seed inputs, the engine searches for a human-readable formula over
//! grammar elements that predicts failure: which nonterminals must be
//! present, which alternatives taken, which derived values or lengths
//! exceeded.
//!
//! # Architecture
//!
//! - [`grammar`] - grammar model, derivation trees, and the parser
//! - [`oracle`] - verdicts and the oracle abstraction (incl. subprocess)
//! - [`input`] - labeled inputs and the deduplicated evidence pool
//! - [`features`] - feature extraction and discrimination statistics
//! - [`patterns`] - the pattern catalog and selection strategies
//! - [`formula`] - candidate formulas, scoring, and ranking
//! - [`generate`] - grammar-directed refinement-input generation
//! - [`engine`] - the bounded diagnosis state machine
//! - [`error`] - error types shared across the crate
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use failcause::{ExplainerBuilder, Verdict};
//!
//! let mut rules = BTreeMap::new();
//! rules.insert("<start>".into(), vec!["<amp>".into(), "<char>".into()]);
//! rules.insert("<amp>".into(), vec!["&".into()]);
//! rules.insert("<char>".into(), failcause::grammar::char_range('a', 'z'));
//! let grammar = failcause::Grammar::from_rules("<start>", rules)?;
//!
//! let oracle = |input: &str| {
//!     if input.contains('&') { Verdict::Failing } else { Verdict::Passing }
//! };
//! let diagnosis = ExplainerBuilder::new()
//!     .grammar(grammar)
//!     .oracle(&oracle)
//!     .seed("&")
//!     .seed("q")
//!     .build()?
//!     .explain()?;
//! assert!(diagnosis.converged);
//! # Ok::<(), failcause::DiagnosisError>(())
//! ```

// Library code propagates errors; panics are reserved for tests.
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(missing_docs)]

pub mod engine;
pub mod error;
pub mod features;
pub mod formula;
pub mod generate;
pub mod grammar;
pub mod input;
pub mod oracle;
pub mod patterns;

// Re-export the types most callers touch
pub use engine::{Diagnosis, Explainer, ExplainerBuilder};
pub use error::{DiagnosisError, DiagnosisResult};
pub use formula::{Formula, ScoredCandidate};
pub use grammar::{DerivationTree, Grammar};
pub use oracle::{Oracle, SubprocessOracle, Verdict};

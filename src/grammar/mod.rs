//! Context-free grammar model.
//!
//! The grammar subsystem is organized into focused modules:
//!
//! - [`types`] - Symbols, alternatives, grammar construction and validation
//! - [`parser`] - Derivation-tree parsing of raw strings
//! - [`tree`] - Derivation trees and subtree queries
//!
//! All operations are pure functions over an immutable [`Grammar`];
//! rendering a tree and re-parsing the result yields the same tree for
//! every tree the parser produces.

pub mod parser;
pub mod tree;
pub mod types;

pub use tree::DerivationTree;
pub use types::{char_range, Alternative, Grammar, Symbol};

//! Candidate formulas.
//!
//! A [`Formula`] is a pattern instantiated against concrete grammar
//! symbols: a recursive, closed constraint language over nonterminals.
//! Evaluation is structural: it asks the derivation tree, never the raw
//! string, so a literal `&` and an `&` inside an already-parsed entity
//! are distinguished for free.
//!
//! The variants form a small closed set; every consumer matches
//! exhaustively so a new constraint kind cannot silently fall through.

pub mod score;

pub use score::{rank, score, ScoredCandidate};

use serde::Serialize;

use crate::grammar::DerivationTree;

/// A constraint over derivation trees.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Formula {
    /// The nonterminal occurs somewhere in the derivation.
    Exists(String),
    /// Some occurrence of the nonterminal uses the given alternative.
    DerivesAlternative(String, usize),
    /// The maximum numeric value derived by the nonterminal exceeds `k`.
    /// False when the nonterminal is absent or derives no number.
    NumberGreater(String, f64),
    /// The maximum derived-substring length of the nonterminal exceeds
    /// `k` characters. False when the nonterminal is absent.
    LengthGreater(String, usize),
    /// Negation.
    Not(Box<Formula>),
    /// Conjunction.
    And(Box<Formula>, Box<Formula>),
}

impl Formula {
    /// Evaluate the formula against one derivation tree.
    pub fn eval(&self, tree: &DerivationTree) -> bool {
        match self {
            Formula::Exists(nonterminal) => tree.contains(nonterminal),
            Formula::DerivesAlternative(nonterminal, index) => tree
                .find_all(nonterminal)
                .iter()
                .any(|node| node.alternative() == Some(*index)),
            Formula::NumberGreater(nonterminal, threshold) => tree
                .find_all(nonterminal)
                .iter()
                .filter_map(|node| node.render().trim().parse::<f64>().ok())
                .filter(|x| x.is_finite())
                .any(|x| x > *threshold),
            Formula::LengthGreater(nonterminal, threshold) => tree
                .find_all(nonterminal)
                .iter()
                .any(|node| node.render().chars().count() > *threshold),
            Formula::Not(inner) => !inner.eval(tree),
            Formula::And(left, right) => left.eval(tree) && right.eval(tree),
        }
    }

    /// Number of atomic constraints; the tie-break key for ranking
    /// (simpler, equally predictive explanations win).
    pub fn complexity(&self) -> usize {
        match self {
            Formula::Exists(_)
            | Formula::DerivesAlternative(_, _)
            | Formula::NumberGreater(_, _)
            | Formula::LengthGreater(_, _) => 1,
            Formula::Not(inner) => inner.complexity(),
            Formula::And(left, right) => left.complexity() + right.complexity(),
        }
    }

    /// The nonterminals this formula constrains, outermost first,
    /// without duplicates. The refinement loop probes these.
    pub fn nonterminals(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_nonterminals(&mut out);
        out
    }

    fn collect_nonterminals<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Formula::Exists(nonterminal)
            | Formula::DerivesAlternative(nonterminal, _)
            | Formula::NumberGreater(nonterminal, _)
            | Formula::LengthGreater(nonterminal, _) => {
                if !out.contains(&nonterminal.as_str()) {
                    out.push(nonterminal);
                }
            }
            Formula::Not(inner) => inner.collect_nonterminals(out),
            Formula::And(left, right) => {
                left.collect_nonterminals(out);
                right.collect_nonterminals(out);
            }
        }
    }

    /// Negation helper.
    pub fn negated(self) -> Formula {
        Formula::Not(Box::new(self))
    }

    /// Conjunction helper.
    pub fn and(self, other: Formula) -> Formula {
        Formula::And(Box::new(self), Box::new(other))
    }

    fn fmt_child(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if matches!(self, Formula::And(_, _)) {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }
}

impl std::fmt::Display for Formula {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Formula::Exists(nonterminal) => write!(f, "exists({nonterminal})"),
            Formula::DerivesAlternative(nonterminal, index) => {
                write!(f, "uses({nonterminal}, alt {index})")
            }
            Formula::NumberGreater(nonterminal, threshold) => {
                write!(f, "num({nonterminal}) > {threshold}")
            }
            Formula::LengthGreater(nonterminal, threshold) => {
                write!(f, "len({nonterminal}) > {threshold}")
            }
            Formula::Not(inner) => {
                write!(f, "not(")?;
                write!(f, "{inner}")?;
                write!(f, ")")
            }
            Formula::And(left, right) => {
                left.fmt_child(f)?;
                write!(f, " and ")?;
                right.fmt_child(f)
            }
        }
    }
}

//! Symbolic input features.
//!
//! A feature is a typed, named measurement keyed by a nonterminal and a
//! feature kind. The taxonomy is a closed set of four kinds; the
//! evaluator and selector match on it exhaustively:
//!
//! - *existence*: was the nonterminal derived at all,
//! - *derivation*: which alternative was chosen (one-hot per alternative),
//! - *numeric*: numeric value of a derived subtree, when it denotes a number,
//! - *length*: character length of the derived substring.
//!
//! A [`FeatureVector`] maps every applicable feature to its value for one
//! input. Vectors are computed once per input at pool admission and never
//! invalidated (inputs are immutable once labeled).

pub mod extractor;
pub mod stats;

use std::collections::BTreeMap;

pub use extractor::extract;
pub use stats::{observe, FeatureObservation};

/// The closed set of feature kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FeatureKind {
    /// Whether the nonterminal occurs in the derivation.
    Existence,
    /// Whether a specific alternative of the nonterminal was chosen.
    Derivation,
    /// Numeric value of the derived substring.
    Numeric,
    /// Character length of the derived substring.
    Length,
}

impl std::fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureKind::Existence => write!(f, "existence"),
            FeatureKind::Derivation => write!(f, "derivation"),
            FeatureKind::Numeric => write!(f, "numeric"),
            FeatureKind::Length => write!(f, "length"),
        }
    }
}

/// A measurement key: nonterminal, kind, and for derivation features the
/// alternative index the one-hot refers to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Feature {
    /// The nonterminal this feature measures.
    pub nonterminal: String,
    /// Which measurement is taken.
    pub kind: FeatureKind,
    /// Alternative index; `Some` exactly for derivation features.
    pub alternative: Option<usize>,
}

impl Feature {
    /// Existence feature for a nonterminal.
    pub fn existence(nonterminal: &str) -> Self {
        Self {
            nonterminal: nonterminal.to_string(),
            kind: FeatureKind::Existence,
            alternative: None,
        }
    }

    /// One-hot derivation feature for one alternative of a nonterminal.
    pub fn derivation(nonterminal: &str, alternative: usize) -> Self {
        Self {
            nonterminal: nonterminal.to_string(),
            kind: FeatureKind::Derivation,
            alternative: Some(alternative),
        }
    }

    /// Numeric feature for a nonterminal.
    pub fn numeric(nonterminal: &str) -> Self {
        Self {
            nonterminal: nonterminal.to_string(),
            kind: FeatureKind::Numeric,
            alternative: None,
        }
    }

    /// Length feature for a nonterminal.
    pub fn length(nonterminal: &str) -> Self {
        Self {
            nonterminal: nonterminal.to_string(),
            kind: FeatureKind::Length,
            alternative: None,
        }
    }
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.alternative {
            Some(index) => write!(f, "{}({}, alt {})", self.kind, self.nonterminal, index),
            None => write!(f, "{}({})", self.kind, self.nonterminal),
        }
    }
}

/// The measured value of one feature for one input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeatureValue {
    /// Existence: the nonterminal occurs (or not) in the derivation.
    Present(bool),
    /// Derivation: this alternative was (or was not) used somewhere.
    Chosen(bool),
    /// Numeric value of the derived substring (maximum over occurrences).
    Number(f64),
    /// Character length of the derived substring (maximum over occurrences).
    Size(usize),
    /// Not measurable for this input: the nonterminal is absent, or no
    /// derived substring denotes a number. Deliberately distinct from
    /// zero so statistics are not biased toward non-numeric inputs.
    Absent,
}

impl FeatureValue {
    /// Numeric view used by the statistics layer; `None` for [`Absent`].
    ///
    /// [`Absent`]: FeatureValue::Absent
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FeatureValue::Present(b) | FeatureValue::Chosen(b) => {
                Some(if *b { 1.0 } else { 0.0 })
            }
            FeatureValue::Number(x) => Some(*x),
            FeatureValue::Size(n) => Some(*n as f64),
            FeatureValue::Absent => None,
        }
    }
}

/// Mapping from every applicable feature to its value for one input.
pub type FeatureVector = BTreeMap<Feature, FeatureValue>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn features_order_deterministically() {
        let mut vector = FeatureVector::new();
        vector.insert(Feature::length("<b>"), FeatureValue::Size(2));
        vector.insert(Feature::existence("<a>"), FeatureValue::Present(true));
        let keys: Vec<_> = vector.keys().map(|f| f.nonterminal.clone()).collect();
        assert_eq!(keys, vec!["<a>", "<b>"]);
    }

    #[test]
    fn absent_has_no_numeric_view() {
        assert_eq!(FeatureValue::Absent.as_number(), None);
        assert_eq!(FeatureValue::Present(true).as_number(), Some(1.0));
        assert_eq!(FeatureValue::Size(3).as_number(), Some(3.0));
    }

    #[test]
    fn derivation_features_carry_alternative() {
        let feature = Feature::derivation("<entity>", 1);
        assert_eq!(feature.kind, FeatureKind::Derivation);
        assert_eq!(feature.alternative, Some(1));
        assert!(feature.to_string().contains("alt 1"));
    }
}

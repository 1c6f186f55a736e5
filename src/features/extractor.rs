//! Feature extraction from derivation trees.
//!
//! [`extract`] computes the fixed-shape feature vector of one input: for
//! every nonterminal reachable in the grammar there is an existence
//! feature, one derivation feature per alternative, a numeric feature and
//! a length feature. The shape depends only on the grammar, so vectors of
//! different inputs are directly comparable column by column.
//!
//! When a nonterminal occurs several times in one tree, numeric and
//! length features aggregate with `max`, keeping "some occurrence is
//! large" expressible as a constraint.

use super::{Feature, FeatureValue, FeatureVector};
use crate::grammar::{DerivationTree, Grammar};

/// Compute the feature vector of a derivation tree.
///
/// Deterministic: identical trees yield identical vectors regardless of
/// extraction order (the vector is keyed by [`Feature`]'s total order).
pub fn extract(tree: &DerivationTree, grammar: &Grammar) -> FeatureVector {
    let mut vector = FeatureVector::new();

    for nonterminal in grammar.reachable() {
        let occurrences = tree.find_all(nonterminal);
        let present = !occurrences.is_empty();

        vector.insert(
            Feature::existence(nonterminal),
            FeatureValue::Present(present),
        );

        let alternative_count = grammar
            .alternatives(nonterminal)
            .map(|a| a.len())
            .unwrap_or(0);
        for index in 0..alternative_count {
            let value = if present {
                let chosen = occurrences
                    .iter()
                    .any(|node| node.alternative() == Some(index));
                FeatureValue::Chosen(chosen)
            } else {
                FeatureValue::Absent
            };
            vector.insert(Feature::derivation(nonterminal, index), value);
        }

        vector.insert(
            Feature::numeric(nonterminal),
            numeric_value(&occurrences)
                .map(FeatureValue::Number)
                .unwrap_or(FeatureValue::Absent),
        );

        let length = if present {
            let max_len = occurrences
                .iter()
                .map(|node| node.render().chars().count())
                .max()
                .unwrap_or(0);
            FeatureValue::Size(max_len)
        } else {
            FeatureValue::Absent
        };
        vector.insert(Feature::length(nonterminal), length);
    }

    vector
}

/// Maximum numeric interpretation over the occurrences, if any derived
/// substring parses as a finite number.
fn numeric_value(occurrences: &[&DerivationTree]) -> Option<f64> {
    occurrences
        .iter()
        .filter_map(|node| node.render().trim().parse::<f64>().ok())
        .filter(|x| x.is_finite())
        .fold(None, |best, x| match best {
            Some(b) if b >= x => Some(b),
            _ => Some(x),
        })
}

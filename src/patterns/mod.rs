//! The pattern catalog.
//!
//! Patterns are abstract constraint templates with placeholder symbols;
//! instantiating one against concrete nonterminals yields a candidate
//! [`Formula`]. The catalog is a fixed, closed set: it is never extended
//! at runtime, and each template declares which [`FeatureKind`] must look
//! informative for the template to be worth instantiating.

pub mod selector;

pub use selector::{AllPatterns, ByFeatureKind, PatternSelection};

use crate::features::{Feature, FeatureKind, FeatureObservation};
use crate::formula::Formula;
use crate::grammar::Grammar;

/// An abstract constraint template over one or two placeholder symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternTemplate {
    /// The placeholder nonterminal occurs.
    Exists,
    /// The placeholder nonterminal never occurs.
    Absent,
    /// A specific alternative of the placeholder is used.
    ChoosesAlternative,
    /// A specific alternative of the placeholder is never used.
    AvoidsAlternative,
    /// The numeric value derived by the placeholder exceeds a threshold.
    NumberExceeds,
    /// The derived-string length of the placeholder exceeds a threshold.
    LengthExceeds,
    /// Two related nonterminals both occur.
    ExistsTogether,
    /// One nonterminal occurs while the other does not.
    ExistsWithout,
}

impl PatternTemplate {
    /// The feature kind that must be informative for this template.
    pub fn required_kind(&self) -> FeatureKind {
        match self {
            PatternTemplate::Exists
            | PatternTemplate::Absent
            | PatternTemplate::ExistsTogether
            | PatternTemplate::ExistsWithout => FeatureKind::Existence,
            PatternTemplate::ChoosesAlternative | PatternTemplate::AvoidsAlternative => {
                FeatureKind::Derivation
            }
            PatternTemplate::NumberExceeds => FeatureKind::Numeric,
            PatternTemplate::LengthExceeds => FeatureKind::Length,
        }
    }

    /// Number of placeholder symbols.
    pub fn arity(&self) -> usize {
        match self {
            PatternTemplate::ExistsTogether | PatternTemplate::ExistsWithout => 2,
            _ => 1,
        }
    }
}

/// The fixed pattern library.
pub fn catalog() -> &'static [PatternTemplate] {
    &[
        PatternTemplate::Exists,
        PatternTemplate::Absent,
        PatternTemplate::ChoosesAlternative,
        PatternTemplate::AvoidsAlternative,
        PatternTemplate::NumberExceeds,
        PatternTemplate::LengthExceeds,
        PatternTemplate::ExistsTogether,
        PatternTemplate::ExistsWithout,
    ]
}

/// Instantiate a unary template against one nonterminal.
///
/// Threshold templates read the observed failing/passing value ranges;
/// with no observation for the nonterminal they instantiate nothing.
pub(crate) fn instantiate(
    template: PatternTemplate,
    nonterminal: &str,
    grammar: &Grammar,
    observations: &[&FeatureObservation],
) -> Vec<Formula> {
    match template {
        PatternTemplate::Exists => vec![Formula::Exists(nonterminal.to_string())],
        PatternTemplate::Absent => vec![Formula::Exists(nonterminal.to_string()).negated()],
        PatternTemplate::ChoosesAlternative => alternative_indices(grammar, nonterminal)
            .map(|i| Formula::DerivesAlternative(nonterminal.to_string(), i))
            .collect(),
        PatternTemplate::AvoidsAlternative => alternative_indices(grammar, nonterminal)
            .map(|i| Formula::DerivesAlternative(nonterminal.to_string(), i).negated())
            .collect(),
        PatternTemplate::NumberExceeds => {
            numeric_thresholds(nonterminal, FeatureKind::Numeric, observations)
                .into_iter()
                .map(|k| Formula::NumberGreater(nonterminal.to_string(), k))
                .collect()
        }
        PatternTemplate::LengthExceeds => {
            numeric_thresholds(nonterminal, FeatureKind::Length, observations)
                .into_iter()
                .map(|k| Formula::LengthGreater(nonterminal.to_string(), k.max(0.0) as usize))
                .collect()
        }
        PatternTemplate::ExistsTogether | PatternTemplate::ExistsWithout => Vec::new(),
    }
}

/// Instantiate a binary template against an ordered nonterminal pair.
pub(crate) fn instantiate_pair(
    template: PatternTemplate,
    nonterminal: &str,
    partner: &str,
) -> Option<Formula> {
    match template {
        PatternTemplate::ExistsTogether => Some(
            Formula::Exists(nonterminal.to_string()).and(Formula::Exists(partner.to_string())),
        ),
        PatternTemplate::ExistsWithout => Some(
            Formula::Exists(nonterminal.to_string())
                .and(Formula::Exists(partner.to_string()).negated()),
        ),
        _ => None,
    }
}

fn alternative_indices<'g>(
    grammar: &'g Grammar,
    nonterminal: &str,
) -> impl Iterator<Item = usize> + 'g {
    let count = grammar
        .alternatives(nonterminal)
        .map(|a| a.len())
        .unwrap_or(0);
    0..count
}

/// Threshold policy: midpoint when the observed passing and failing
/// ranges separate cleanly, otherwise one candidate per boundary value;
/// with failing evidence only, a threshold just below the failing
/// minimum.
fn numeric_thresholds(
    nonterminal: &str,
    kind: FeatureKind,
    observations: &[&FeatureObservation],
) -> Vec<f64> {
    let wanted = match kind {
        FeatureKind::Numeric => Feature::numeric(nonterminal),
        FeatureKind::Length => Feature::length(nonterminal),
        _ => return Vec::new(),
    };
    let Some(observation) = observations.iter().find(|o| o.feature == wanted) else {
        return Vec::new();
    };
    match (observation.failing_range, observation.passing_range) {
        (Some((f_min, _)), Some((_, p_max))) => {
            if p_max < f_min {
                vec![(p_max + f_min) / 2.0]
            } else {
                vec![p_max, f_min - 1.0]
            }
        }
        (Some((f_min, _)), None) => vec![f_min - 1.0],
        _ => Vec::new(),
    }
}

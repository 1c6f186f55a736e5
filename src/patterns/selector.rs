//! Pattern selection strategies.
//!
//! Selection decides, per diagnosis cycle, which catalog templates are
//! instantiated against which nonterminals. The choice between the two
//! strategies is a closed polymorphic decision behind the
//! [`PatternSelection`] trait; both implementations are pure functions of
//! their arguments and the catalog, so successive cycles are reproducible
//! given the same inputs.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::{catalog, instantiate, instantiate_pair};
use crate::features::{FeatureKind, FeatureObservation};
use crate::formula::Formula;
use crate::grammar::Grammar;

/// Strategy interface for per-cycle pattern instantiation.
pub trait PatternSelection: Send + Sync {
    /// Instantiate candidate formulas for this cycle.
    ///
    /// `relevant` are the most discriminative feature observations,
    /// `correlated` the next tier; `excluded` names nonterminals that
    /// must not appear in any candidate. An empty result is a valid
    /// answer meaning "no informative pattern this cycle".
    fn select(
        &self,
        grammar: &Grammar,
        relevant: &[FeatureObservation],
        correlated: &[FeatureObservation],
        excluded: &BTreeSet<String>,
    ) -> Vec<Formula>;

    /// Strategy name for logging.
    fn name(&self) -> &'static str;
}

/// Exhaustive strategy: every template against every reachable
/// nonterminal not excluded.
///
/// Cost grows multiplicatively with grammar size and catalog size, so
/// the engine uses it for the first cycle only by default.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllPatterns;

impl PatternSelection for AllPatterns {
    fn select(
        &self,
        grammar: &Grammar,
        relevant: &[FeatureObservation],
        correlated: &[FeatureObservation],
        excluded: &BTreeSet<String>,
    ) -> Vec<Formula> {
        let observations: Vec<&FeatureObservation> =
            relevant.iter().chain(correlated.iter()).collect();
        let targets: Vec<&str> = grammar
            .reachable()
            .iter()
            .map(|s| s.as_str())
            .filter(|nt| !excluded.contains(*nt))
            .collect();
        // Pair placeholders only range over nonterminals with relevant
        // observations; full pairing over the grammar would be quadratic
        // noise.
        let partners = observed_nonterminals(relevant, excluded);

        let mut formulas = Vec::new();
        for template in catalog() {
            if template.arity() == 1 {
                for target in &targets {
                    formulas.extend(instantiate(*template, target, grammar, &observations));
                }
            } else {
                for target in &partners {
                    for partner in &partners {
                        if target != partner {
                            formulas.extend(instantiate_pair(*template, target, partner));
                        }
                    }
                }
            }
        }
        debug!(strategy = self.name(), count = formulas.len(), "selected candidates");
        formulas
    }

    fn name(&self) -> &'static str {
        "all"
    }
}

/// Feature-guided strategy: instantiate only templates whose required
/// feature kind currently separates failing from passing inputs best.
///
/// Degrades gracefully to an empty selection when no feature kind stands
/// out, signaling "nothing informative this cycle" rather than failing.
#[derive(Debug, Clone, Copy)]
pub struct ByFeatureKind {
    /// Observations below this discrimination score carry no signal.
    pub discrimination_floor: f64,
    /// Kinds scoring within this fraction of the best kind also fire.
    pub kind_margin: f64,
}

impl Default for ByFeatureKind {
    fn default() -> Self {
        Self {
            discrimination_floor: 0.1,
            kind_margin: 0.25,
        }
    }
}

impl PatternSelection for ByFeatureKind {
    fn select(
        &self,
        grammar: &Grammar,
        relevant: &[FeatureObservation],
        correlated: &[FeatureObservation],
        excluded: &BTreeSet<String>,
    ) -> Vec<Formula> {
        let informative: Vec<&FeatureObservation> = relevant
            .iter()
            .chain(correlated.iter())
            .filter(|o| o.discrimination >= self.discrimination_floor)
            .collect();
        if informative.is_empty() {
            debug!(strategy = self.name(), "no informative features");
            return Vec::new();
        }

        // Tally discrimination mass per feature kind.
        let mut weights: BTreeMap<FeatureKind, f64> = BTreeMap::new();
        for observation in &informative {
            *weights.entry(observation.feature.kind).or_insert(0.0) +=
                observation.discrimination;
        }
        let best = weights.values().fold(0.0f64, |a, b| a.max(*b));
        let chosen: BTreeSet<FeatureKind> = weights
            .iter()
            .filter(|(_, w)| **w >= best * (1.0 - self.kind_margin))
            .map(|(kind, _)| *kind)
            .collect();

        // Restrict targets to nonterminals actually observed as
        // informative for a chosen kind.
        let mut targets: BTreeSet<&str> = BTreeSet::new();
        for observation in &informative {
            if chosen.contains(&observation.feature.kind)
                && !excluded.contains(&observation.feature.nonterminal)
            {
                targets.insert(observation.feature.nonterminal.as_str());
            }
        }
        let partners = observed_nonterminals(relevant, excluded);

        let mut formulas = Vec::new();
        for template in catalog() {
            if !chosen.contains(&template.required_kind()) {
                continue;
            }
            if template.arity() == 1 {
                for target in &targets {
                    formulas.extend(instantiate(*template, target, grammar, &informative));
                }
            } else {
                for target in &partners {
                    for partner in &partners {
                        if target != partner {
                            formulas.extend(instantiate_pair(*template, target, partner));
                        }
                    }
                }
            }
        }
        debug!(
            strategy = self.name(),
            kinds = ?chosen,
            count = formulas.len(),
            "selected candidates"
        );
        formulas
    }

    fn name(&self) -> &'static str {
        "by-feature"
    }
}

fn observed_nonterminals<'a>(
    relevant: &'a [FeatureObservation],
    excluded: &BTreeSet<String>,
) -> Vec<&'a str> {
    let mut out: Vec<&str> = Vec::new();
    for observation in relevant {
        let name = observation.feature.nonterminal.as_str();
        if !excluded.contains(name) && !out.contains(&name) {
            out.push(name);
        }
    }
    out
}

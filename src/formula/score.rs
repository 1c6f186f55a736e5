//! Candidate scoring against the labeled pool.
//!
//! Each candidate formula is evaluated structurally on every
//! defined-verdict input, producing a 2x2 contingency table from which
//! precision, recall, and specificity are derived. Undefined inputs are
//! excluded. A formula satisfied by no input at all is uninformative and
//! discarded rather than scored.
//!
//! Scoring is pure and read-only over the frozen pool, so candidates are
//! scored in parallel.

use rayon::prelude::*;
use serde::Serialize;

use super::Formula;
use crate::input::InputPool;

/// A formula with its measured predictive scores.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredCandidate {
    /// The instantiated formula.
    pub formula: Formula,
    /// Fraction of formula-satisfying inputs that are failing.
    pub precision: f64,
    /// Fraction of failing inputs satisfied by the formula.
    pub recall: f64,
    /// 1 - false-positive rate.
    pub specificity: f64,
    /// Failing inputs satisfying the formula.
    pub true_positives: usize,
    /// Passing inputs satisfying the formula.
    pub false_positives: usize,
    /// Failing inputs not satisfying the formula.
    pub false_negatives: usize,
    /// Passing inputs not satisfying the formula.
    pub true_negatives: usize,
}

impl ScoredCandidate {
    /// True when both precision and recall meet the given thresholds.
    pub fn meets(&self, precision: f64, recall: f64) -> bool {
        self.precision >= precision && self.recall >= recall
    }
}

/// Score one formula against the pool.
///
/// Returns `None` when the formula holds on no defined input (neither
/// failing nor passing evidence supports it).
pub fn score(formula: &Formula, pool: &InputPool) -> Option<ScoredCandidate> {
    let mut true_positives = 0usize;
    let mut false_positives = 0usize;
    let mut false_negatives = 0usize;
    let mut true_negatives = 0usize;

    for input in pool.defined() {
        let holds = formula.eval(input.tree());
        match (holds, input.verdict().is_failing()) {
            (true, true) => true_positives += 1,
            (true, false) => false_positives += 1,
            (false, true) => false_negatives += 1,
            (false, false) => true_negatives += 1,
        }
    }

    if true_positives + false_positives == 0 {
        return None;
    }

    Some(ScoredCandidate {
        formula: formula.clone(),
        precision: ratio(true_positives, true_positives + false_positives),
        recall: ratio(true_positives, true_positives + false_negatives),
        specificity: ratio(true_negatives, true_negatives + false_positives),
        true_positives,
        false_positives,
        false_negatives,
        true_negatives,
    })
}

/// Score a candidate set and sort it into ranking order.
///
/// Primary key recall, secondary precision, then syntactic simplicity,
/// then the canonical rendering; the last key makes ties fully
/// deterministic across runs.
pub fn rank(formulas: &[Formula], pool: &InputPool) -> Vec<ScoredCandidate> {
    let mut candidates: Vec<ScoredCandidate> = formulas
        .par_iter()
        .filter_map(|formula| score(formula, pool))
        .collect();
    candidates.sort_by(|a, b| {
        b.recall
            .total_cmp(&a.recall)
            .then_with(|| b.precision.total_cmp(&a.precision))
            .then_with(|| a.formula.complexity().cmp(&b.formula.complexity()))
            .then_with(|| a.formula.to_string().cmp(&b.formula.to_string()))
    });
    candidates.dedup_by(|a, b| a.formula == b.formula);
    candidates
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

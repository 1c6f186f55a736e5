//! Per-feature discrimination statistics.
//!
//! The engine summarizes the frozen pool into one
//! [`FeatureObservation`] per feature: mean value over failing and over
//! passing inputs, observed value ranges, and a discrimination score in
//! [0, 1]. The score is the absolute difference of the class means,
//! normalized by the feature's observed value range, so boolean and
//! numeric features are comparable. Inputs where the feature is absent
//! contribute nothing (absence is not zero).

use super::{Feature, FeatureVector};
use crate::oracle::Verdict;

/// Summary of one feature across the labeled pool.
#[derive(Debug, Clone)]
pub struct FeatureObservation {
    /// The summarized feature.
    pub feature: Feature,
    /// Class-separation score in [0, 1]; 0 when either class has no
    /// defined value for this feature.
    pub discrimination: f64,
    /// Mean value over failing inputs where the feature is defined.
    pub failing_mean: f64,
    /// Mean value over passing inputs where the feature is defined.
    pub passing_mean: f64,
    /// (min, max) over failing inputs, if any value is defined.
    pub failing_range: Option<(f64, f64)>,
    /// (min, max) over passing inputs, if any value is defined.
    pub passing_range: Option<(f64, f64)>,
}

#[derive(Default)]
struct Accumulator {
    failing: Vec<f64>,
    passing: Vec<f64>,
}

/// Summarize every feature over the labeled pool entries.
///
/// Undefined-verdict inputs are excluded. The result is sorted by
/// descending discrimination, ties broken by feature order, so the
/// ranking is deterministic.
pub fn observe<'a, I>(inputs: I) -> Vec<FeatureObservation>
where
    I: IntoIterator<Item = (&'a FeatureVector, Verdict)>,
{
    use std::collections::BTreeMap;

    let mut table: BTreeMap<Feature, Accumulator> = BTreeMap::new();
    for (vector, verdict) in inputs {
        if !verdict.is_defined() {
            continue;
        }
        for (feature, value) in vector {
            let Some(number) = value.as_number() else {
                continue;
            };
            let acc = table.entry(feature.clone()).or_default();
            match verdict {
                Verdict::Failing => acc.failing.push(number),
                Verdict::Passing => acc.passing.push(number),
                Verdict::Undefined => unreachable!("filtered above"),
            }
        }
    }

    let mut observations: Vec<FeatureObservation> = table
        .into_iter()
        .map(|(feature, acc)| summarize(feature, &acc))
        .collect();
    observations.sort_by(|a, b| {
        b.discrimination
            .total_cmp(&a.discrimination)
            .then_with(|| a.feature.cmp(&b.feature))
    });
    observations
}

fn summarize(feature: Feature, acc: &Accumulator) -> FeatureObservation {
    let failing_range = range(&acc.failing);
    let passing_range = range(&acc.passing);
    let failing_mean = mean(&acc.failing);
    let passing_mean = mean(&acc.passing);

    let discrimination = match (failing_range, passing_range) {
        (Some(f), Some(p)) => {
            let low = f.0.min(p.0);
            let high = f.1.max(p.1);
            let spread = high - low;
            if spread > 0.0 {
                ((failing_mean - passing_mean).abs() / spread).clamp(0.0, 1.0)
            } else {
                0.0
            }
        }
        // A feature measurable in only one class cannot rank kinds; the
        // existence feature of the same nonterminal captures the split.
        _ => 0.0,
    };

    FeatureObservation {
        feature,
        discrimination,
        failing_mean,
        passing_mean,
        failing_range,
        passing_range,
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn range(values: &[f64]) -> Option<(f64, f64)> {
    let mut iter = values.iter().copied();
    let first = iter.next()?;
    let (min, max) = iter.fold((first, first), |(lo, hi), x| (lo.min(x), hi.max(x)));
    Some((min, max))
}

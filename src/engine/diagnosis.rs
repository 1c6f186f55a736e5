//! Diagnosis result objects.
//!
//! A [`Diagnosis`] is the immutable outcome of one `explain()` call: the
//! ranked candidate list, the equivalence class of the top formula, and
//! whether the run actually converged.

use serde::Serialize;

use crate::formula::{Formula, ScoredCandidate};
use crate::input::InputPool;

/// The ranked explanation produced by the engine.
///
/// Serializes to JSON for the CLI's machine-readable report mode.
#[derive(Debug, Serialize)]
pub struct Diagnosis {
    /// Candidate formulas in ranking order (best first).
    pub candidates: Vec<ScoredCandidate>,
    /// Formulas logically interchangeable with the top candidate over
    /// the final pool (the top formula itself excluded).
    pub equivalent: Vec<Formula>,
    /// True when the run reached the convergence thresholds; false for
    /// a best-so-far result from an exhausted budget.
    pub converged: bool,
    /// Refinement cycles performed.
    pub iterations: usize,
}

impl Diagnosis {
    /// The top-ranked candidate, if any formula survived scoring.
    pub fn best(&self) -> Option<&ScoredCandidate> {
        self.candidates.first()
    }

    /// One-line human summary for logs and the CLI.
    pub fn summary(&self) -> String {
        match self.best() {
            Some(top) => format!(
                "{} (precision {:.2}, recall {:.2}, {} after {} iterations, {} equivalent)",
                top.formula,
                top.precision,
                top.recall,
                if self.converged {
                    "converged"
                } else {
                    "not converged"
                },
                self.iterations,
                self.equivalent.len()
            ),
            None => "no explanation found".to_string(),
        }
    }
}

/// The equivalence class of the top-ranked candidate.
///
/// Two formulas are interchangeable when they carry the same (recall,
/// precision) score and agree on every input in the final pool. Only
/// candidates tied with the top score are considered.
pub fn equivalent_formulas(candidates: &[ScoredCandidate], pool: &InputPool) -> Vec<Formula> {
    let Some(top) = candidates.first() else {
        return Vec::new();
    };
    let top_truth = truth_vector(&top.formula, pool);

    candidates
        .iter()
        .skip(1)
        .take_while(|c| c.recall == top.recall && c.precision == top.precision)
        .filter(|c| truth_vector(&c.formula, pool) == top_truth)
        .map(|c| c.formula.clone())
        .collect()
}

fn truth_vector(formula: &Formula, pool: &InputPool) -> Vec<bool> {
    pool.inputs()
        .iter()
        .map(|input| formula.eval(input.tree()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::rank;
    use crate::grammar::Grammar;
    use crate::input::TestInput;
    use crate::oracle::Verdict;
    use std::collections::BTreeMap;

    fn pool() -> (Grammar, InputPool) {
        let mut rules = BTreeMap::new();
        rules.insert(
            "<start>".to_string(),
            vec!["<amp>".to_string(), "<char>".to_string()],
        );
        rules.insert("<amp>".to_string(), vec!["&".to_string()]);
        rules.insert("<char>".to_string(), crate::grammar::char_range('a', 'b'));
        let grammar = Grammar::from_rules("<start>", rules).unwrap();
        let mut pool = InputPool::new();
        for (text, verdict) in [
            ("&", Verdict::Failing),
            ("a", Verdict::Passing),
            ("b", Verdict::Passing),
        ] {
            pool.admit(TestInput::labeled(
                grammar.parse(text).unwrap(),
                &grammar,
                verdict,
            ));
        }
        (grammar, pool)
    }

    #[test]
    fn equivalents_agree_on_every_input() {
        let (_, pool) = pool();
        // exists(<amp>) and not(exists(<char>)) have identical truth
        // values on this pool.
        let formulas = vec![
            Formula::Exists("<amp>".to_string()),
            Formula::Exists("<char>".to_string()).negated(),
            Formula::Exists("<char>".to_string()),
        ];
        let candidates = rank(&formulas, &pool);
        let equivalent = equivalent_formulas(&candidates, &pool);
        assert_eq!(equivalent.len(), 1);
        let top = &candidates[0].formula;
        for formula in &equivalent {
            for input in pool.inputs() {
                assert_eq!(formula.eval(input.tree()), top.eval(input.tree()));
            }
        }
    }

    #[test]
    fn lower_scored_candidates_are_not_equivalent() {
        let (_, pool) = pool();
        let formulas = vec![
            Formula::Exists("<amp>".to_string()),
            // Holds on the failing input and one passing input.
            Formula::Exists("<amp>".to_string())
                .and(Formula::Exists("<char>".to_string()).negated()),
            Formula::LengthGreater("<start>".to_string(), 0),
        ];
        let candidates = rank(&formulas, &pool);
        let equivalent = equivalent_formulas(&candidates, &pool);
        for formula in &equivalent {
            assert_ne!(formula, &Formula::LengthGreater("<start>".to_string(), 0));
        }
    }

    #[test]
    fn empty_candidate_list_has_no_equivalents() {
        let (_, pool) = pool();
        assert!(equivalent_formulas(&[], &pool).is_empty());
    }

    #[test]
    fn serializes_to_a_json_report() {
        let (_, pool) = pool();
        let candidates = rank(&[Formula::Exists("<amp>".to_string())], &pool);
        let equivalent = equivalent_formulas(&candidates, &pool);
        let diagnosis = Diagnosis {
            candidates,
            equivalent,
            converged: true,
            iterations: 2,
        };
        let report = serde_json::to_value(&diagnosis).unwrap();
        assert_eq!(report["converged"], true);
        assert_eq!(report["iterations"], 2);
        assert_eq!(report["candidates"][0]["precision"], 1.0);
        assert_eq!(
            report["candidates"][0]["formula"]["Exists"],
            "<amp>"
        );
    }

    #[test]
    fn summary_marks_unconverged_runs() {
        let (_, pool) = pool();
        let candidates = rank(&[Formula::Exists("<amp>".to_string())], &pool);
        let diagnosis = Diagnosis {
            candidates,
            equivalent: Vec::new(),
            converged: false,
            iterations: 5,
        };
        assert!(diagnosis.summary().contains("not converged"));
        assert!(diagnosis.best().is_some());
    }
}

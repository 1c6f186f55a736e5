//! The diagnosis driver.
//!
//! [`Explainer`] wires grammar, oracle, seed inputs, and a selection
//! strategy into the bounded state machine described in the module docs.
//! Configuration goes through [`ExplainerBuilder`], which fails fast on
//! anything that cannot produce a diagnosis (empty grammar, no seeds,
//! thresholds outside [0, 1]).
//!
//! Within a cycle the pool is frozen: feature summaries and candidate
//! scores are pure reads and run in parallel, and oracle labeling of
//! freshly generated inputs is dispatched over the rayon pool. The pool
//! itself is extended only at the end of a cycle, by the single driver
//! thread.

use std::collections::BTreeSet;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::diagnosis::{equivalent_formulas, Diagnosis};
use super::EngineState;
use crate::error::{DiagnosisError, DiagnosisResult};
use crate::features::{observe, FeatureObservation};
use crate::formula::{rank, Formula, ScoredCandidate};
use crate::generate::InputGenerator;
use crate::grammar::Grammar;
use crate::input::{InputPool, TestInput};
use crate::oracle::{Oracle, Verdict};
use crate::patterns::{AllPatterns, ByFeatureKind, PatternSelection};

enum Strategy {
    /// Exhaustive on the first cycle, feature-guided afterwards.
    Staged {
        all: AllPatterns,
        by_feature: ByFeatureKind,
    },
    /// One caller-chosen strategy for every cycle.
    Fixed(Box<dyn PatternSelection>),
}

impl Strategy {
    fn for_cycle(&self, iteration: usize) -> &dyn PatternSelection {
        match self {
            Strategy::Staged { all, by_feature } => {
                if iteration == 0 {
                    all
                } else {
                    by_feature
                }
            }
            Strategy::Fixed(strategy) => strategy.as_ref(),
        }
    }
}

/// Builder for [`Explainer`]; validates the configuration at `build()`.
pub struct ExplainerBuilder<'a> {
    grammar: Option<Grammar>,
    oracle: Option<&'a dyn Oracle>,
    seeds: Vec<(String, Option<Verdict>)>,
    strategy: Strategy,
    max_iterations: usize,
    log: bool,
    rng_seed: u64,
    convergence_precision: f64,
    convergence_recall: f64,
    stagnation_window: usize,
    batch_size: usize,
    excluded: BTreeSet<String>,
    relevant_count: usize,
    correlated_count: usize,
}

impl Default for ExplainerBuilder<'_> {
    fn default() -> Self {
        Self {
            grammar: None,
            oracle: None,
            seeds: Vec::new(),
            strategy: Strategy::Staged {
                all: AllPatterns,
                by_feature: ByFeatureKind::default(),
            },
            max_iterations: 10,
            log: false,
            rng_seed: 0,
            convergence_precision: 1.0,
            convergence_recall: 1.0,
            stagnation_window: 3,
            batch_size: 8,
            excluded: BTreeSet::new(),
            relevant_count: 10,
            correlated_count: 10,
        }
    }
}

impl<'a> ExplainerBuilder<'a> {
    /// Start an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// The grammar describing the input language.
    pub fn grammar(mut self, grammar: Grammar) -> Self {
        self.grammar = Some(grammar);
        self
    }

    /// The black-box verdict oracle.
    pub fn oracle(mut self, oracle: &'a dyn Oracle) -> Self {
        self.oracle = Some(oracle);
        self
    }

    /// Add an unlabeled seed input; it is labeled through the oracle
    /// during initialization.
    pub fn seed(mut self, input: &str) -> Self {
        self.seeds.push((input.to_string(), None));
        self
    }

    /// Add a seed input with a known verdict (no oracle call).
    pub fn seed_labeled(mut self, input: &str, verdict: Verdict) -> Self {
        self.seeds.push((input.to_string(), Some(verdict)));
        self
    }

    /// Hard cap on refinement cycles. Zero means evaluate-only.
    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Use one selection strategy for every cycle instead of the staged
    /// default (exhaustive first, feature-guided afterwards).
    pub fn strategy(mut self, strategy: impl PatternSelection + 'static) -> Self {
        self.strategy = Strategy::Fixed(Box::new(strategy));
        self
    }

    /// Emit per-cycle diagnostics at info level.
    pub fn log(mut self, log: bool) -> Self {
        self.log = log;
        self
    }

    /// Seed for the input generator's RNG; fixed seeds reproduce runs.
    pub fn rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = seed;
        self
    }

    /// Precision and recall the top candidate must reach to converge.
    pub fn convergence(mut self, precision: f64, recall: f64) -> Self {
        self.convergence_precision = precision;
        self.convergence_recall = recall;
        self
    }

    /// Cycles without score improvement before the run is cut off.
    pub fn stagnation_window(mut self, window: usize) -> Self {
        self.stagnation_window = window;
        self
    }

    /// Refinement inputs requested per weak candidate per cycle.
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Exclude a nonterminal from every candidate formula.
    pub fn exclude(mut self, nonterminal: &str) -> Self {
        self.excluded.insert(nonterminal.to_string());
        self
    }

    /// Validate and build the explainer.
    pub fn build(self) -> DiagnosisResult<Explainer<'a>> {
        let grammar = self
            .grammar
            .ok_or_else(|| DiagnosisError::Config("no grammar supplied".to_string()))?;
        let oracle = self
            .oracle
            .ok_or_else(|| DiagnosisError::Config("no oracle supplied".to_string()))?;
        if self.seeds.is_empty() {
            return Err(DiagnosisError::Config("no seed inputs".to_string()));
        }
        for (name, value) in [
            ("convergence precision", self.convergence_precision),
            ("convergence recall", self.convergence_recall),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(DiagnosisError::Config(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        if self.stagnation_window == 0 {
            return Err(DiagnosisError::Config(
                "stagnation window must be at least 1".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(DiagnosisError::Config(
                "batch size must be at least 1".to_string(),
            ));
        }
        Ok(Explainer {
            grammar,
            oracle,
            seeds: self.seeds,
            strategy: self.strategy,
            max_iterations: self.max_iterations,
            log: self.log,
            rng_seed: self.rng_seed,
            convergence_precision: self.convergence_precision,
            convergence_recall: self.convergence_recall,
            stagnation_window: self.stagnation_window,
            batch_size: self.batch_size,
            excluded: self.excluded,
            relevant_count: self.relevant_count,
            correlated_count: self.correlated_count,
        })
    }
}

/// The explanation engine entry point.
pub struct Explainer<'a> {
    grammar: Grammar,
    oracle: &'a dyn Oracle,
    seeds: Vec<(String, Option<Verdict>)>,
    strategy: Strategy,
    max_iterations: usize,
    log: bool,
    rng_seed: u64,
    convergence_precision: f64,
    convergence_recall: f64,
    stagnation_window: usize,
    batch_size: usize,
    excluded: BTreeSet<String>,
    relevant_count: usize,
    correlated_count: usize,
}

impl Explainer<'_> {
    /// Weak candidates refined per cycle.
    const REFINE_TOP: usize = 3;

    /// Run the diagnosis loop to a terminal state.
    ///
    /// Every call owns a fresh pool and counter; results from earlier
    /// calls are never reused.
    pub fn explain(&self) -> DiagnosisResult<Diagnosis> {
        let mut state = EngineState::Init;
        let mut pool = InputPool::new();
        let mut generator = InputGenerator::new(&self.grammar, self.rng_seed);
        let mut bank: Vec<Formula> = Vec::new();
        let mut ranked: Vec<ScoredCandidate> = Vec::new();
        let mut iterations = 0usize;
        let mut stagnant = 0usize;
        let mut best_score: Option<(f64, f64)> = None;
        let mut converged = false;

        while !state.is_terminal() {
            state = match state {
                EngineState::Init => {
                    self.seed_pool(&mut pool)?;
                    EngineState::Evaluating
                }
                EngineState::Evaluating => {
                    let observations = observe(pool.vectors());
                    let (relevant, correlated) = self.split_observations(&observations);
                    let strategy = self.strategy.for_cycle(iterations);
                    let selected =
                        strategy.select(&self.grammar, relevant, correlated, &self.excluded);
                    let selection_empty = selected.is_empty();
                    for formula in selected {
                        if !bank.contains(&formula) {
                            bank.push(formula);
                        }
                    }
                    ranked = rank(&bank, &pool);

                    if self.log {
                        info!(
                            iteration = iterations,
                            pool = pool.len(),
                            failing = pool.failing().count(),
                            candidates = ranked.len(),
                            strategy = strategy.name(),
                            top = ?ranked.first().map(|c| c.formula.to_string()),
                            "evaluation cycle"
                        );
                    }

                    match ranked.first() {
                        None => {
                            // Nothing scoreable: with an empty selection
                            // there is no way forward.
                            if selection_empty {
                                EngineState::Exhausted
                            } else {
                                EngineState::Refining
                            }
                        }
                        Some(top) => {
                            let score = (top.recall, top.precision);
                            let improved = best_score
                                .map_or(true, |(r, p)| score.0 > r || (score.0 == r && score.1 > p));
                            if improved {
                                best_score = Some(score);
                                stagnant = 0;
                            } else {
                                stagnant += 1;
                            }

                            if top.meets(self.convergence_precision, self.convergence_recall) {
                                converged = true;
                                EngineState::Converged
                            } else if selection_empty && !improved {
                                // Catalog exhaustion: an empty selection
                                // with no progress will not recover.
                                EngineState::Exhausted
                            } else if stagnant >= self.stagnation_window {
                                EngineState::Exhausted
                            } else if iterations >= self.max_iterations {
                                EngineState::Exhausted
                            } else {
                                EngineState::Refining
                            }
                        }
                    }
                }
                EngineState::Refining => {
                    let admitted = self.refine(&mut generator, &ranked, &mut pool);
                    iterations += 1;
                    if admitted == 0 {
                        debug!(iteration = iterations, "refinement produced no new inputs");
                    }
                    if iterations >= self.max_iterations && admitted == 0 {
                        EngineState::Exhausted
                    } else {
                        EngineState::Evaluating
                    }
                }
                terminal => terminal,
            };
        }

        // Terminal: rescore the bank on the final pool so the reported
        // ranking reflects all admitted evidence.
        let candidates = rank(&bank, &pool);
        let equivalent = equivalent_formulas(&candidates, &pool);
        if self.log {
            info!(
                converged,
                iterations,
                pool = pool.len(),
                top = ?candidates.first().map(|c| c.formula.to_string()),
                "diagnosis finished"
            );
        }
        Ok(Diagnosis {
            candidates,
            equivalent,
            converged,
            iterations,
        })
    }

    /// Parse and label the seed inputs. Unparseable seeds are skipped
    /// with a warning; an entirely unparseable seed set is fatal.
    fn seed_pool(&self, pool: &mut InputPool) -> DiagnosisResult<()> {
        let mut parsed = Vec::new();
        for (text, verdict) in &self.seeds {
            match self.grammar.parse(text) {
                Ok(tree) => parsed.push((tree, text.as_str(), *verdict)),
                Err(error) if error.is_recoverable() => {
                    warn!(input = text.as_str(), %error, "seed rejected");
                }
                Err(error) => return Err(error),
            }
        }
        if parsed.is_empty() {
            return Err(DiagnosisError::Config(
                "no seed input could be parsed against the grammar".to_string(),
            ));
        }

        // Label unlabeled seeds concurrently; each call reads its own
        // input and writes its own slot.
        let verdicts: Vec<Verdict> = parsed
            .par_iter()
            .map(|(_, text, verdict)| match verdict {
                Some(v) => *v,
                None => self.oracle.verdict(text),
            })
            .collect();

        for ((tree, _, _), verdict) in parsed.into_iter().zip(verdicts) {
            pool.admit(TestInput::labeled(tree, &self.grammar, verdict));
        }
        Ok(())
    }

    fn split_observations<'o>(
        &self,
        observations: &'o [FeatureObservation],
    ) -> (&'o [FeatureObservation], &'o [FeatureObservation]) {
        let relevant_end = self.relevant_count.min(observations.len());
        let correlated_end = (relevant_end + self.correlated_count).min(observations.len());
        (
            &observations[..relevant_end],
            &observations[relevant_end..correlated_end],
        )
    }

    /// One refinement round: generate inputs around the weakest top
    /// candidates, label them, and merge them into the pool.
    fn refine(
        &self,
        generator: &mut InputGenerator<'_>,
        ranked: &[ScoredCandidate],
        pool: &mut InputPool,
    ) -> usize {
        let weak: Vec<&ScoredCandidate> = ranked
            .iter()
            .take(Self::REFINE_TOP)
            .filter(|c| !c.meets(self.convergence_precision, self.convergence_recall))
            .collect();

        let mut texts: Vec<String> = Vec::new();
        for candidate in weak {
            for nonterminal in candidate.formula.nonterminals() {
                let Some(focus) = pool
                    .failing()
                    .find(|i| i.tree().contains(nonterminal))
                    .or_else(|| pool.defined().find(|i| i.tree().contains(nonterminal)))
                else {
                    continue;
                };
                let donors: Vec<&TestInput> = pool
                    .inputs()
                    .iter()
                    .filter(|i| i.verdict().is_defined() && i.verdict() != focus.verdict())
                    .collect();
                for text in generator.refine(focus, &donors, nonterminal, self.batch_size) {
                    if !pool.contains_text(&text) && !texts.contains(&text) {
                        texts.push(text);
                    }
                }
            }
        }

        // Generated strings are grammar-derived; re-parse so only the
        // parser's canonical tree enters the pool.
        let mut admitted_trees = Vec::new();
        for text in texts {
            match self.grammar.parse(&text) {
                Ok(tree) => admitted_trees.push((tree, text)),
                Err(error) => {
                    warn!(input = text.as_str(), %error, "generated input rejected");
                }
            }
        }

        let verdicts: Vec<Verdict> = admitted_trees
            .par_iter()
            .map(|(_, text)| self.oracle.verdict(text))
            .collect();

        let mut admitted = 0usize;
        for ((tree, _), verdict) in admitted_trees.into_iter().zip(verdicts) {
            if pool.admit(TestInput::labeled(tree, &self.grammar, verdict)) {
                admitted += 1;
            }
        }
        if self.log {
            info!(admitted, pool = pool.len(), "refinement merged");
        }
        admitted
    }
}

//! Refining input generation.
//!
//! When a candidate discriminates weakly, the engine asks the generator
//! for fresh inputs that probe the nonterminal the candidate concerns:
//! mutation regrows one subtree under a different alternative, crossover
//! transplants a subtree from an input with the opposite verdict. Both
//! operate on derivation trees, so every generated string is in the
//! grammar's language by construction; there are no raw string edits.
//!
//! The generator owns a seeded RNG; a fixed seed reproduces the whole
//! refinement sequence.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::grammar::{DerivationTree, Grammar, Symbol};
use crate::input::TestInput;

/// Grammar-directed mutation and recombination of pool inputs.
pub struct InputGenerator<'g> {
    grammar: &'g Grammar,
    rng: StdRng,
}

impl<'g> InputGenerator<'g> {
    /// Expansion budget for regrown subtrees. Large enough for any
    /// realistic replacement, small enough to force recursive rules
    /// toward their cheapest close-out.
    const EXPANSION_BUDGET: usize = 64;

    /// Create a generator with a deterministic seed.
    pub fn new(grammar: &'g Grammar, seed: u64) -> Self {
        Self {
            grammar,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Regrow one `nonterminal` subtree of `input` under a different
    /// alternative. Returns the rendered string, or `None` when the
    /// input has no such subtree.
    pub fn mutate(&mut self, input: &TestInput, nonterminal: &str) -> Option<String> {
        let tree = input.tree();
        let target = self.pick_occurrence(tree, nonterminal)?;
        let current = tree.nodes()[target].alternative();

        let count = self.grammar.alternatives(nonterminal)?.len();
        let choices: Vec<usize> = (0..count).filter(|i| Some(*i) != current).collect();
        let alternative = if choices.is_empty() {
            // Single-alternative rule: regrow the same alternative with
            // fresh random content below it.
            current?
        } else {
            choices[self.rng.gen_range(0..choices.len())]
        };

        let replacement = self.expand_alternative(nonterminal, alternative, Self::EXPANSION_BUDGET);
        let mutated = tree.with_replacement(target, &replacement)?;
        Some(mutated.render())
    }

    /// Transplant a `nonterminal` subtree from `donor` into `host`.
    /// Returns the rendered string, or `None` when either tree lacks
    /// such a subtree.
    pub fn crossover(
        &mut self,
        host: &TestInput,
        donor: &TestInput,
        nonterminal: &str,
    ) -> Option<String> {
        let donor_nodes = donor.tree().find_all(nonterminal);
        if donor_nodes.is_empty() {
            return None;
        }
        let graft = donor_nodes[self.rng.gen_range(0..donor_nodes.len())].clone();

        let target = self.pick_occurrence(host.tree(), nonterminal)?;
        let recombined = host.tree().with_replacement(target, &graft)?;
        Some(recombined.render())
    }

    /// A batch of refinement inputs around one nonterminal, drawn from
    /// mutations of `focus` and crossovers with opposite-verdict donors.
    pub fn refine(
        &mut self,
        focus: &TestInput,
        donors: &[&TestInput],
        nonterminal: &str,
        count: usize,
    ) -> Vec<String> {
        let mut out = Vec::new();
        for round in 0..count {
            let generated = if donors.is_empty() || round % 2 == 0 {
                self.mutate(focus, nonterminal)
            } else {
                let donor = donors[self.rng.gen_range(0..donors.len())];
                self.crossover(focus, donor, nonterminal)
            };
            if let Some(text) = generated {
                if !out.contains(&text) {
                    out.push(text);
                }
            }
        }
        out
    }

    /// Pre-order index of a random occurrence of `nonterminal`.
    fn pick_occurrence(&mut self, tree: &DerivationTree, nonterminal: &str) -> Option<usize> {
        let indices: Vec<usize> = tree
            .nodes()
            .iter()
            .enumerate()
            .filter(|(_, node)| node.symbol() == Some(nonterminal))
            .map(|(index, _)| index)
            .collect();
        if indices.is_empty() {
            None
        } else {
            Some(indices[self.rng.gen_range(0..indices.len())])
        }
    }

    /// Random expansion of one alternative within a step budget.
    fn expand_alternative(
        &mut self,
        nonterminal: &str,
        alternative: usize,
        budget: usize,
    ) -> DerivationTree {
        let symbols = self
            .grammar
            .alternatives(nonterminal)
            .and_then(|alts| alts.get(alternative))
            .cloned()
            .unwrap_or_default();
        let children = symbols
            .iter()
            .map(|symbol| match symbol {
                Symbol::Terminal(text) => DerivationTree::Leaf { text: text.clone() },
                Symbol::Nonterminal(name) => self.expand(name, budget.saturating_sub(1)),
            })
            .collect();
        DerivationTree::Expansion {
            symbol: nonterminal.to_string(),
            alternative,
            children,
        }
    }

    /// Random expansion of a nonterminal. While the budget allows, any
    /// alternative that can still close out may be chosen; once the
    /// budget is spent, only the cheapest derivation is taken.
    fn expand(&mut self, nonterminal: &str, budget: usize) -> DerivationTree {
        let alternatives = self
            .grammar
            .alternatives(nonterminal)
            .map(|a| a.to_vec())
            .unwrap_or_default();

        let affordable: Vec<usize> = (0..alternatives.len())
            .filter(|i| self.alternative_cost(&alternatives[*i]) <= budget)
            .collect();
        let index = if affordable.is_empty() {
            self.cheapest_alternative(&alternatives)
        } else {
            affordable[self.rng.gen_range(0..affordable.len())]
        };

        self.expand_alternative(nonterminal, index, budget)
    }

    fn alternative_cost(&self, symbols: &[Symbol]) -> usize {
        let mut total = 1usize;
        for symbol in symbols {
            if let Some(name) = symbol.as_nonterminal() {
                total = total.saturating_add(self.grammar.expansion_cost(name).unwrap_or(usize::MAX));
            }
        }
        total
    }

    fn cheapest_alternative(&self, alternatives: &[Vec<Symbol>]) -> usize {
        alternatives
            .iter()
            .enumerate()
            .min_by_key(|(_, symbols)| self.alternative_cost(symbols))
            .map(|(index, _)| index)
            .unwrap_or(0)
    }
}

//! Labeled inputs and the evidence pool.
//!
//! A [`TestInput`] couples a derivation tree with its rendered raw string
//! and the oracle verdict, plus the feature vector computed once at
//! admission. Inputs are immutable after labeling.
//!
//! The [`InputPool`] is append-only and deduplicated by rendered text;
//! within a diagnosis cycle it is frozen, and the engine extends it only
//! at the end of a cycle under a single writer.

use std::collections::HashSet;

use crate::features::{extract, FeatureVector};
use crate::grammar::{DerivationTree, Grammar};
use crate::oracle::Verdict;

/// One labeled input: tree, rendered string, verdict, cached features.
#[derive(Debug, Clone)]
pub struct TestInput {
    tree: DerivationTree,
    text: String,
    verdict: Verdict,
    features: FeatureVector,
}

impl TestInput {
    /// Build a labeled input from a parser-produced tree.
    pub fn labeled(tree: DerivationTree, grammar: &Grammar, verdict: Verdict) -> Self {
        let text = tree.render();
        let features = extract(&tree, grammar);
        Self {
            tree,
            text,
            verdict,
            features,
        }
    }

    /// The derivation tree.
    pub fn tree(&self) -> &DerivationTree {
        &self.tree
    }

    /// The rendered raw string.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The oracle verdict, assigned once.
    pub fn verdict(&self) -> Verdict {
        self.verdict
    }

    /// The feature vector, computed at admission.
    pub fn features(&self) -> &FeatureVector {
        &self.features
    }
}

/// Append-only pool of labeled inputs, deduplicated by rendered text.
#[derive(Debug, Default)]
pub struct InputPool {
    inputs: Vec<TestInput>,
    seen: HashSet<String>,
}

impl InputPool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// All inputs in admission order.
    pub fn inputs(&self) -> &[TestInput] {
        &self.inputs
    }

    /// Number of inputs, including undefined-verdict ones.
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    /// True when no input has been admitted.
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// True if an input with this rendered text is already pooled.
    pub fn contains_text(&self, text: &str) -> bool {
        self.seen.contains(text)
    }

    /// Admit an input; returns false (and drops it) on duplicate text.
    pub fn admit(&mut self, input: TestInput) -> bool {
        if !self.seen.insert(input.text.clone()) {
            return false;
        }
        self.inputs.push(input);
        true
    }

    /// Inputs with a failing verdict.
    pub fn failing(&self) -> impl Iterator<Item = &TestInput> {
        self.inputs.iter().filter(|i| i.verdict.is_failing())
    }

    /// Inputs with a passing verdict.
    pub fn passing(&self) -> impl Iterator<Item = &TestInput> {
        self.inputs.iter().filter(|i| i.verdict.is_passing())
    }

    /// Inputs with a defined (failing or passing) verdict.
    pub fn defined(&self) -> impl Iterator<Item = &TestInput> {
        self.inputs.iter().filter(|i| i.verdict.is_defined())
    }

    /// Feature vectors paired with verdicts, for the statistics layer.
    pub fn vectors(&self) -> impl Iterator<Item = (&FeatureVector, Verdict)> {
        self.inputs.iter().map(|i| (&i.features, i.verdict))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn tiny_grammar() -> Grammar {
        let mut rules = BTreeMap::new();
        rules.insert(
            "<start>".to_string(),
            vec!["a".to_string(), "b".to_string()],
        );
        Grammar::from_rules("<start>", rules).unwrap()
    }

    #[test]
    fn admission_renders_and_extracts() {
        let grammar = tiny_grammar();
        let tree = grammar.parse("a").unwrap();
        let input = TestInput::labeled(tree, &grammar, Verdict::Failing);
        assert_eq!(input.text(), "a");
        assert!(!input.features().is_empty());
    }

    #[test]
    fn duplicates_are_rejected() {
        let grammar = tiny_grammar();
        let mut pool = InputPool::new();
        let tree = grammar.parse("a").unwrap();
        assert!(pool.admit(TestInput::labeled(tree.clone(), &grammar, Verdict::Failing)));
        assert!(!pool.admit(TestInput::labeled(tree, &grammar, Verdict::Passing)));
        assert_eq!(pool.len(), 1);
        // First verdict sticks; inputs are never re-labeled.
        assert_eq!(pool.inputs()[0].verdict(), Verdict::Failing);
    }

    #[test]
    fn verdict_splits() {
        let grammar = tiny_grammar();
        let mut pool = InputPool::new();
        pool.admit(TestInput::labeled(
            grammar.parse("a").unwrap(),
            &grammar,
            Verdict::Failing,
        ));
        pool.admit(TestInput::labeled(
            grammar.parse("b").unwrap(),
            &grammar,
            Verdict::Undefined,
        ));
        assert_eq!(pool.failing().count(), 1);
        assert_eq!(pool.passing().count(), 0);
        assert_eq!(pool.defined().count(), 1);
        assert_eq!(pool.len(), 2);
    }
}

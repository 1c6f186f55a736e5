//! Context-free grammar types.
//!
//! A [`Grammar`] maps nonterminal names to ordered lists of alternatives,
//! each alternative an ordered sequence of terminal and nonterminal
//! symbols. Grammars are validated on construction and immutable
//! afterwards; every component of the engine shares one `&Grammar`.
//!
//! The external format is the conventional mapping from angle-bracketed
//! nonterminal names to production strings, where `<name>` substrings
//! reference other nonterminals and everything else is literal text:
//!
//! ```
//! use failcause::grammar::Grammar;
//! use std::collections::BTreeMap;
//!
//! let mut rules = BTreeMap::new();
//! rules.insert("<start>".to_string(), vec!["<digit>".to_string()]);
//! rules.insert(
//!     "<digit>".to_string(),
//!     vec!["0".to_string(), "1".to_string()],
//! );
//! let grammar = Grammar::from_rules("<start>", rules).unwrap();
//! assert_eq!(grammar.alternatives("<digit>").unwrap().len(), 2);
//! ```

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{DiagnosisError, DiagnosisResult};

/// One element of a production: literal text or a reference to another
/// nonterminal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Symbol {
    /// Literal text, matched verbatim.
    Terminal(String),
    /// Reference to a nonterminal defined elsewhere in the grammar.
    Nonterminal(String),
}

impl Symbol {
    /// Returns the nonterminal name if this is a reference.
    pub fn as_nonterminal(&self) -> Option<&str> {
        match self {
            Symbol::Nonterminal(name) => Some(name),
            Symbol::Terminal(_) => None,
        }
    }
}

/// An ordered sequence of symbols forming one alternative of a rule.
pub type Alternative = Vec<Symbol>;

/// A validated, immutable context-free grammar.
#[derive(Debug, Clone)]
pub struct Grammar {
    start: String,
    rules: BTreeMap<String, Vec<Alternative>>,
    reachable: BTreeSet<String>,
    // Minimum number of expansion steps to derive a terminal-only string
    // from each nonterminal. Used by the generator to close out subtrees.
    costs: BTreeMap<String, usize>,
}

impl Grammar {
    /// Build a grammar from the external mapping format.
    ///
    /// Validation is strict: the start symbol must be defined, every
    /// referenced nonterminal must have a rule, every rule must have at
    /// least one alternative, every nonterminal must be reachable from
    /// the start symbol, and every nonterminal must derive at least one
    /// finite string.
    pub fn from_rules(
        start: &str,
        rules: BTreeMap<String, Vec<String>>,
    ) -> DiagnosisResult<Self> {
        if rules.is_empty() {
            return Err(DiagnosisError::Grammar("no rules defined".to_string()));
        }
        if !rules.contains_key(start) {
            return Err(DiagnosisError::Grammar(format!(
                "start symbol {start} is not defined"
            )));
        }

        let mut decomposed: BTreeMap<String, Vec<Alternative>> = BTreeMap::new();
        for (name, productions) in &rules {
            if productions.is_empty() {
                return Err(DiagnosisError::Grammar(format!(
                    "nonterminal {name} has no alternatives"
                )));
            }
            let alternatives = productions
                .iter()
                .map(|p| decompose(p))
                .collect::<Vec<_>>();
            decomposed.insert(name.clone(), alternatives);
        }

        // Closed-grammar check: every reference resolves to a rule.
        for (name, alternatives) in &decomposed {
            for alt in alternatives {
                for symbol in alt {
                    if let Some(reference) = symbol.as_nonterminal() {
                        if !decomposed.contains_key(reference) {
                            return Err(DiagnosisError::Grammar(format!(
                                "{name} references undefined nonterminal {reference}"
                            )));
                        }
                    }
                }
            }
        }

        let reachable = reach(start, &decomposed);
        for name in decomposed.keys() {
            if !reachable.contains(name) {
                return Err(DiagnosisError::Grammar(format!(
                    "nonterminal {name} is unreachable from {start}"
                )));
            }
        }

        let costs = expansion_costs(&decomposed)?;

        Ok(Self {
            start: start.to_string(),
            rules: decomposed,
            reachable,
            costs,
        })
    }

    /// The distinguished start symbol.
    pub fn start(&self) -> &str {
        &self.start
    }

    /// Ordered alternatives of a nonterminal, or `None` if undefined.
    pub fn alternatives(&self, nonterminal: &str) -> Option<&[Alternative]> {
        self.rules.get(nonterminal).map(|v| v.as_slice())
    }

    /// All nonterminals reachable from the start symbol, in sorted order.
    pub fn reachable(&self) -> &BTreeSet<String> {
        &self.reachable
    }

    /// True if the nonterminal is defined in this grammar.
    pub fn contains(&self, nonterminal: &str) -> bool {
        self.rules.contains_key(nonterminal)
    }

    /// Minimum expansion steps from a nonterminal to a terminal-only
    /// derivation. Defined for every nonterminal of a valid grammar.
    pub fn expansion_cost(&self, nonterminal: &str) -> Option<usize> {
        self.costs.get(nonterminal).copied()
    }
}

/// Split a production string into terminal chunks and `<name>` references.
fn decompose(production: &str) -> Alternative {
    let mut symbols = Vec::new();
    let mut literal = String::new();
    let mut rest = production;

    while let Some(open) = rest.find('<') {
        if let Some(close) = rest[open..].find('>') {
            let name = &rest[open..open + close + 1];
            // A reference must be non-empty and free of nested brackets.
            if name.len() > 2 && !name[1..name.len() - 1].contains('<') {
                literal.push_str(&rest[..open]);
                if !literal.is_empty() {
                    symbols.push(Symbol::Terminal(std::mem::take(&mut literal)));
                }
                symbols.push(Symbol::Nonterminal(name.to_string()));
                rest = &rest[open + close + 1..];
                continue;
            }
        }
        // Lone '<' with no closing bracket: literal text.
        literal.push_str(&rest[..=open]);
        rest = &rest[open + 1..];
    }
    literal.push_str(rest);
    if !literal.is_empty() {
        symbols.push(Symbol::Terminal(literal));
    }
    if symbols.is_empty() {
        // Empty production derives the empty string.
        symbols.push(Symbol::Terminal(String::new()));
    }
    symbols
}

/// Nonterminals reachable from `start` by following references.
fn reach(start: &str, rules: &BTreeMap<String, Vec<Alternative>>) -> BTreeSet<String> {
    let mut seen = BTreeSet::new();
    let mut stack = vec![start.to_string()];
    while let Some(name) = stack.pop() {
        if !seen.insert(name.clone()) {
            continue;
        }
        if let Some(alternatives) = rules.get(&name) {
            for alt in alternatives {
                for symbol in alt {
                    if let Some(reference) = symbol.as_nonterminal() {
                        if !seen.contains(reference) {
                            stack.push(reference.to_string());
                        }
                    }
                }
            }
        }
    }
    seen
}

/// Fixpoint computation of minimum expansion steps per nonterminal.
///
/// Fails when some nonterminal can never reach a terminal-only string
/// (a grammar that admits no finite derivation for it).
fn expansion_costs(
    rules: &BTreeMap<String, Vec<Alternative>>,
) -> DiagnosisResult<BTreeMap<String, usize>> {
    let mut costs: BTreeMap<String, usize> = BTreeMap::new();
    loop {
        let mut changed = false;
        for (name, alternatives) in rules {
            let mut best: Option<usize> = costs.get(name).copied();
            for alt in alternatives {
                let mut total = 1usize;
                let mut complete = true;
                for symbol in alt {
                    if let Some(reference) = symbol.as_nonterminal() {
                        match costs.get(reference) {
                            Some(c) => total = total.saturating_add(*c),
                            None => {
                                complete = false;
                                break;
                            }
                        }
                    }
                }
                if complete && best.map_or(true, |b| total < b) {
                    best = Some(total);
                }
            }
            if let Some(value) = best {
                if costs.get(name) != Some(&value) {
                    costs.insert(name.clone(), value);
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }
    for name in rules.keys() {
        if !costs.contains_key(name) {
            return Err(DiagnosisError::Grammar(format!(
                "nonterminal {name} cannot derive a finite string"
            )));
        }
    }
    Ok(costs)
}

/// Expand an inclusive character range into single-character productions.
///
/// Convenience for grammars over character classes, e.g.
/// `char_range('a', 'z')` for lowercase letters.
pub fn char_range(low: char, high: char) -> Vec<String> {
    (low..=high).map(|c| c.to_string()).collect()
}

//! Derivation-tree parser.
//!
//! Recursive descent over the grammar's alternatives with memoization on
//! `(nonterminal, position)`. For each memo entry only the first
//! derivation per end position is kept, so parsing is deterministic and
//! the order of alternatives in the grammar expresses preference: listing
//! `<entity>` before `<raw-amp>` makes the parser read `&amp;` as an
//! entity wherever a full parse exists that way.
//!
//! The whole input must be consumed; trailing content is a parse failure.
//! Left-recursive rules are cut by the re-entry guard and therefore
//! cannot contribute derivations; grammars in this crate's domain are
//! written right-recursively.

use std::collections::{HashMap, HashSet};

use super::tree::DerivationTree;
use super::types::{Grammar, Symbol};
use crate::error::{DiagnosisError, DiagnosisResult};

impl Grammar {
    /// Parse a raw string into its derivation tree.
    ///
    /// Fails with a recoverable [`DiagnosisError::Parse`] carrying the
    /// furthest position any derivation reached.
    pub fn parse(&self, input: &str) -> DiagnosisResult<DerivationTree> {
        let mut parser = Parser {
            grammar: self,
            input,
            memo: HashMap::new(),
            active: HashSet::new(),
            furthest: 0,
        };
        let derivations = parser.parse_nonterminal(self.start(), 0);
        derivations
            .into_iter()
            .find(|(end, _)| *end == input.len())
            .map(|(_, tree)| tree)
            .ok_or_else(|| DiagnosisError::Parse {
                input: input.to_string(),
                position: parser.furthest,
            })
    }
}

struct Parser<'g> {
    grammar: &'g Grammar,
    input: &'g str,
    memo: HashMap<(String, usize), Vec<(usize, DerivationTree)>>,
    active: HashSet<(String, usize)>,
    furthest: usize,
}

impl Parser<'_> {
    /// All derivations of `nonterminal` starting at `pos`, one tree per
    /// reachable end position, in alternative order.
    fn parse_nonterminal(&mut self, nonterminal: &str, pos: usize) -> Vec<(usize, DerivationTree)> {
        let key = (nonterminal.to_string(), pos);
        if let Some(cached) = self.memo.get(&key) {
            return cached.clone();
        }
        if self.active.contains(&key) {
            // Left-recursion cut: no derivation from a rule re-entered
            // at the same position.
            return Vec::new();
        }
        self.active.insert(key.clone());

        let alternatives = self
            .grammar
            .alternatives(nonterminal)
            .map(|a| a.to_vec())
            .unwrap_or_default();

        let mut results: Vec<(usize, DerivationTree)> = Vec::new();
        for (index, alternative) in alternatives.iter().enumerate() {
            for (end, children) in self.parse_sequence(alternative, pos) {
                if results.iter().all(|(e, _)| *e != end) {
                    results.push((
                        end,
                        DerivationTree::Expansion {
                            symbol: nonterminal.to_string(),
                            alternative: index,
                            children,
                        },
                    ));
                }
            }
        }

        self.active.remove(&key);
        self.memo.insert(key, results.clone());
        results
    }

    /// Derivations of a symbol sequence: for each reachable end position,
    /// the first-found child list covering `pos..end`.
    fn parse_sequence(
        &mut self,
        symbols: &[Symbol],
        pos: usize,
    ) -> Vec<(usize, Vec<DerivationTree>)> {
        let mut states: Vec<(usize, Vec<DerivationTree>)> = vec![(pos, Vec::new())];
        for symbol in symbols {
            let mut next: Vec<(usize, Vec<DerivationTree>)> = Vec::new();
            for (p, children) in &states {
                match symbol {
                    Symbol::Terminal(text) => {
                        if self.input[*p..].starts_with(text.as_str()) {
                            let end = p + text.len();
                            self.furthest = self.furthest.max(end);
                            if next.iter().all(|(e, _)| *e != end) {
                                let mut extended = children.clone();
                                extended.push(DerivationTree::Leaf { text: text.clone() });
                                next.push((end, extended));
                            }
                        }
                    }
                    Symbol::Nonterminal(name) => {
                        for (end, subtree) in self.parse_nonterminal(name, *p) {
                            if next.iter().all(|(e, _)| *e != end) {
                                let mut extended = children.clone();
                                extended.push(subtree);
                                next.push((end, extended));
                            }
                        }
                    }
                }
            }
            states = next;
            if states.is_empty() {
                break;
            }
        }
        states
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn entity_grammar() -> Grammar {
        let mut rules = BTreeMap::new();
        rules.insert("<start>".to_string(), vec!["<string>".to_string()]);
        rules.insert(
            "<string>".to_string(),
            vec!["<element><string>".to_string(), "<element>".to_string()],
        );
        rules.insert(
            "<element>".to_string(),
            vec![
                "<entity>".to_string(),
                "<char>".to_string(),
                "<raw-amp>".to_string(),
            ],
        );
        rules.insert(
            "<entity>".to_string(),
            vec!["&<name>;".to_string(), "&#<digits>;".to_string()],
        );
        rules.insert("<raw-amp>".to_string(), vec!["&".to_string()]);
        rules.insert("<char>".to_string(), {
            let mut chars = crate::grammar::char_range('a', 'z');
            chars.extend(crate::grammar::char_range('0', '9'));
            chars
        });
        rules.insert(
            "<name>".to_string(),
            vec!["<letter><name>".to_string(), "<letter>".to_string()],
        );
        rules.insert(
            "<digits>".to_string(),
            vec!["<digit><digits>".to_string(), "<digit>".to_string()],
        );
        rules.insert("<letter>".to_string(), crate::grammar::char_range('a', 'z'));
        rules.insert("<digit>".to_string(), crate::grammar::char_range('0', '9'));
        Grammar::from_rules("<start>", rules).unwrap()
    }

    #[test]
    fn parses_numeric_entity() {
        let grammar = entity_grammar();
        let tree = grammar.parse("&#33;").unwrap();
        assert_eq!(tree.render(), "&#33;");
        assert!(tree.contains("<entity>"));
        assert!(!tree.contains("<raw-amp>"));
    }

    #[test]
    fn prefers_entity_over_raw_ampersand() {
        let grammar = entity_grammar();
        // "&amp;x" could parse as raw '&' plus literal characters, but the
        // entity alternative is listed first and must win.
        let tree = grammar.parse("&abc;x").unwrap();
        assert!(tree.contains("<entity>"));
        assert!(!tree.contains("<raw-amp>"));
    }

    #[test]
    fn unterminated_entity_falls_back_to_raw_ampersand() {
        let grammar = entity_grammar();
        let tree = grammar.parse("&ab&cd;").unwrap();
        // First '&' cannot start an entity (no ';' before the second '&'),
        // so it must derive through <raw-amp>; the second one can.
        assert!(tree.contains("<raw-amp>"));
        assert!(tree.contains("<entity>"));
    }

    #[test]
    fn rejects_string_outside_language() {
        let grammar = entity_grammar();
        let result = grammar.parse("ab!cd");
        match result {
            Err(DiagnosisError::Parse { position, .. }) => assert_eq!(position, 2),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_empty_input_when_not_derivable() {
        let grammar = entity_grammar();
        assert!(grammar.parse("").is_err());
    }

    #[test]
    fn round_trips_canonical_trees() {
        let grammar = entity_grammar();
        for input in ["&#33;", "&abc;", "&ab&cd;", "x", "&&&"] {
            let tree = grammar.parse(input).unwrap();
            assert_eq!(tree.render(), input);
            let reparsed = grammar.parse(&tree.render()).unwrap();
            assert_eq!(reparsed, tree, "round trip differs for {input:?}");
        }
    }

    #[test]
    fn parsing_is_deterministic() {
        let grammar = entity_grammar();
        let a = grammar.parse("&ab&cd;ef").unwrap();
        let b = grammar.parse("&ab&cd;ef").unwrap();
        assert_eq!(a, b);
    }
}

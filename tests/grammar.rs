//! Grammar and parser integration tests.
//!
//! These exercise the grammar layer the way the engine consumes it:
//! JSON-shaped rule maps, parsing with alternative preference, and the
//! render round-trip the evidence pool relies on.

use std::collections::BTreeMap;

use failcause::grammar::char_range;
use failcause::{DiagnosisError, Grammar};

fn entity_rules() -> BTreeMap<String, Vec<String>> {
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
    rules.insert(
        "<name>".to_string(),
        vec!["<letter><name>".to_string(), "<letter>".to_string()],
    );
    rules.insert(
        "<digits>".to_string(),
        vec!["<digit><digits>".to_string(), "<digit>".to_string()],
    );
    rules.insert("<letter>".to_string(), char_range('a', 'z'));
    rules.insert("<digit>".to_string(), char_range('0', '9'));
    rules.insert("<char>".to_string(), char_range('a', 'z'));
    rules.insert("<raw-amp>".to_string(), vec!["&".to_string()]);
    rules
}

#[test]
fn grammar_rules_round_trip_through_json() {
    // The CLI stores grammars as a JSON object of productions; the same
    // map must build the same grammar after a serde round trip.
    let rules = entity_rules();
    let json = serde_json::to_string(&rules).unwrap();
    let reloaded: BTreeMap<String, Vec<String>> = serde_json::from_str(&json).unwrap();
    let grammar = Grammar::from_rules("<start>", reloaded).unwrap();
    assert!(grammar.contains("<raw-amp>"));
    assert_eq!(grammar.start(), "<start>");
}

#[test]
fn parse_render_round_trips_every_admitted_input() {
    let grammar = Grammar::from_rules("<start>", entity_rules()).unwrap();
    for input in ["&a&quot;", "&anna&&eacute;ric", "&#33;", "&eacute;ric", "x"] {
        let tree = grammar.parse(input).unwrap();
        assert_eq!(tree.render(), input);
    }
}

#[test]
fn entity_alternative_is_preferred_over_raw_ampersand() {
    let grammar = Grammar::from_rules("<start>", entity_rules()).unwrap();
    // A well-formed entity must parse as <entity>, not as <raw-amp>
    // followed by characters; only the dangling ampersand is raw.
    let tree = grammar.parse("&quot;").unwrap();
    assert!(tree.contains("<entity>"));
    assert!(!tree.contains("<raw-amp>"));

    let tree = grammar.parse("&a").unwrap();
    assert!(tree.contains("<raw-amp>"));
}

#[test]
fn undefined_nonterminal_is_a_construction_error() {
    let mut rules = BTreeMap::new();
    rules.insert("<start>".to_string(), vec!["<missing>".to_string()]);
    assert!(matches!(
        Grammar::from_rules("<start>", rules),
        Err(DiagnosisError::Grammar(_))
    ));
}

#[test]
fn out_of_language_input_reports_a_position() {
    let grammar = Grammar::from_rules("<start>", entity_rules()).unwrap();
    match grammar.parse("ab!cd") {
        Err(DiagnosisError::Parse { position, .. }) => assert_eq!(position, 2),
        other => panic!("expected a parse error, got {other:?}"),
    }
}

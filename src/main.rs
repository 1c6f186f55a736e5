//! `failcause` CLI.
//!
//! Diagnose why a program fails: feed it a grammar for the input
//! language, seed inputs, and a command to run as the oracle, and it
//! prints a ranked list of failure-predicting formulas.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::error;

use failcause::patterns::{AllPatterns, ByFeatureKind};
use failcause::{DiagnosisError, DiagnosisResult, ExplainerBuilder, Grammar, SubprocessOracle, Verdict};

#[derive(Parser)]
#[command(name = "failcause")]
#[command(about = "Grammar-based diagnosis of program failures", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the diagnosis loop and print the ranked explanation
    Explain {
        /// Grammar file: JSON object mapping nonterminals to productions
        #[arg(long)]
        grammar: PathBuf,

        /// File of known-failing seed inputs, one per line
        #[arg(long)]
        failing: PathBuf,

        /// File of known-passing seed inputs, one per line
        #[arg(long)]
        passing: Option<PathBuf>,

        /// Oracle command; receives the input on stdin, exit 0 means
        /// passing, nonzero means failing
        #[arg(long)]
        oracle_cmd: String,

        /// Extra arguments passed to the oracle command
        #[arg(long = "oracle-arg", allow_hyphen_values = true)]
        oracle_args: Vec<String>,

        /// Oracle timeout in seconds; a timed-out run counts as undefined
        #[arg(long, default_value_t = 10)]
        timeout: u64,

        /// Refinement cycle budget
        #[arg(long, default_value_t = 10)]
        max_iterations: usize,

        /// RNG seed for reproducible input generation
        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Pattern selection strategy for every cycle (default: staged)
        #[arg(long, value_enum)]
        strategy: Option<StrategyArg>,

        /// Nonterminal to exclude from explanations (repeatable)
        #[arg(long = "exclude")]
        excluded: Vec<String>,

        /// Candidates to print beyond the top one
        #[arg(long, default_value_t = 5)]
        top: usize,

        /// Emit the full diagnosis as JSON instead of the text summary
        #[arg(long)]
        json: bool,
    },

    /// Validate a grammar file, optionally parsing a sample input
    CheckGrammar {
        /// Grammar file: JSON object mapping nonterminals to productions
        #[arg(long)]
        grammar: PathBuf,

        /// Input to parse against the grammar
        #[arg(long)]
        parse: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StrategyArg {
    /// Every template against every nonterminal, every cycle
    All,
    /// Feature-kind guided selection, every cycle
    ByFeature,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Explain {
            grammar,
            failing,
            passing,
            oracle_cmd,
            oracle_args,
            timeout,
            max_iterations,
            seed,
            strategy,
            excluded,
            top,
            json,
        } => explain(
            &grammar,
            &failing,
            passing.as_deref(),
            &oracle_cmd,
            oracle_args,
            timeout,
            max_iterations,
            seed,
            strategy,
            excluded,
            top,
            json,
        ),
        Commands::CheckGrammar { grammar, parse } => check_grammar(&grammar, parse.as_deref()),
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            error!("{err}");
            eprintln!("error: {err}");
            ExitCode::from(2)
        }
    }
}

fn load_grammar(path: &Path) -> DiagnosisResult<Grammar> {
    let raw = fs::read_to_string(path).map_err(|e| DiagnosisError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    let rules: BTreeMap<String, Vec<String>> =
        serde_json::from_str(&raw).map_err(|e| DiagnosisError::Io {
            path: path.display().to_string(),
            message: format!("invalid grammar JSON: {e}"),
        })?;
    Grammar::from_rules("<start>", rules)
}

fn load_seeds(path: &Path) -> DiagnosisResult<Vec<String>> {
    let raw = fs::read_to_string(path).map_err(|e| DiagnosisError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    Ok(raw
        .lines()
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

#[allow(clippy::too_many_arguments)]
fn explain(
    grammar_path: &Path,
    failing_path: &Path,
    passing_path: Option<&Path>,
    oracle_cmd: &str,
    oracle_args: Vec<String>,
    timeout: u64,
    max_iterations: usize,
    seed: u64,
    strategy: Option<StrategyArg>,
    excluded: Vec<String>,
    top: usize,
    json: bool,
) -> DiagnosisResult<ExitCode> {
    let grammar = load_grammar(grammar_path)?;
    let oracle = SubprocessOracle::new(oracle_cmd, oracle_args)
        .with_timeout(Duration::from_secs(timeout));

    let mut builder = ExplainerBuilder::new()
        .grammar(grammar)
        .oracle(&oracle)
        .max_iterations(max_iterations)
        .rng_seed(seed)
        .log(true);
    for input in load_seeds(failing_path)? {
        builder = builder.seed_labeled(&input, Verdict::Failing);
    }
    if let Some(path) = passing_path {
        for input in load_seeds(path)? {
            builder = builder.seed_labeled(&input, Verdict::Passing);
        }
    }
    for nonterminal in &excluded {
        builder = builder.exclude(nonterminal);
    }
    builder = match strategy {
        Some(StrategyArg::All) => builder.strategy(AllPatterns),
        Some(StrategyArg::ByFeature) => builder.strategy(ByFeatureKind::default()),
        None => builder,
    };

    let diagnosis = builder.build()?.explain()?;

    if json {
        let report = serde_json::to_string_pretty(&diagnosis)
            .map_err(|e| DiagnosisError::Config(format!("cannot serialize report: {e}")))?;
        println!("{report}");
    } else {
        println!("{}", diagnosis.summary());
        for formula in &diagnosis.equivalent {
            println!("  equivalent: {formula}");
        }
        for candidate in diagnosis.candidates.iter().skip(1).take(top) {
            println!(
                "  also: {} (precision {:.2}, recall {:.2})",
                candidate.formula, candidate.precision, candidate.recall
            );
        }
    }

    if diagnosis.best().is_some() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(1))
    }
}

fn check_grammar(path: &Path, sample: Option<&str>) -> DiagnosisResult<ExitCode> {
    let grammar = load_grammar(path)?;
    println!(
        "grammar ok: {} nonterminals reachable from {}",
        grammar.reachable().len(),
        grammar.start()
    );
    if let Some(input) = sample {
        match grammar.parse(input) {
            Ok(tree) => {
                println!("parse ok: {} nodes", tree.node_count());
            }
            Err(err) => {
                eprintln!("parse failed: {err}");
                return Ok(ExitCode::from(1));
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

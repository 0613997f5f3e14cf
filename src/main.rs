use std::process::ExitCode;

use bupsynth::{
    error::SynthError,
    grammar::{Grammar, RuleSet},
    oracle::parse_example,
    search::{BottomUpSearch, SearchConfig, SearchOutcome},
    synth::bias::{DomainBias, NoBias},
};
use clap::{Parser, ValueEnum};
use log::{error, info, LevelFilter};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BiasKind {
    /// Boundary/source comparisons, small products, boundary-only terms
    Domain,
    /// Enumerate the whole canonical language
    None,
}

#[derive(Parser)]
#[command(name = "bupsynth")]
#[command(about = "Bottom-up enumerative synthesis from input/output examples", long_about = None)]
struct Cli {
    /// Maximum expression depth
    #[arg(short, long, default_value_t = 3)]
    depth: u32,
    /// Integer operators: PLUS, MINUS, TIMES, LEFTSHIFT, RIGHTSHIFT, ITE
    #[arg(long, value_delimiter = ',')]
    int_ops: Vec<String>,
    /// Boolean operators: F, NOT, AND, LT
    #[arg(long, value_delimiter = ',')]
    bool_ops: Vec<String>,
    #[arg(long, value_delimiter = ',')]
    vars: Vec<String>,
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    consts: Vec<String>,
    /// Synthesize a predicate instead of a term
    #[arg(short, long)]
    predicate: bool,
    /// An example such as `x=1,y=2,_out=1`. May be repeated.
    #[arg(short, long = "example", required = true)]
    examples: Vec<String>,
    #[arg(long, value_enum, default_value = "domain")]
    bias: BiasKind,
    /// Optional pruning rules to enable
    #[arg(long, value_delimiter = ',', default_value = "canonical,bias")]
    rules: Vec<String>,
    #[arg(long)]
    max_rounds: Option<u32>,
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn build(cli: &Cli) -> Result<BottomUpSearch, SynthError> {
    let grammar = Grammar::parse(
        cli.depth,
        &cli.int_ops,
        &cli.bool_ops,
        cli.vars.iter().cloned(),
        &cli.consts,
        cli.predicate,
    )?;
    let config = SearchConfig::new(grammar).with_rules(RuleSet::parse(&cli.rules)?);
    let config = match cli.bias {
        BiasKind::Domain => config.with_bias(DomainBias::default()),
        BiasKind::None => config.with_bias(NoBias),
    };
    let config = match cli.max_rounds {
        Some(x) => config.with_max_rounds(x),
        None => config,
    };
    let records = cli.examples.iter()
        .map(|x| parse_example(x))
        .collect::<Result<Vec<_>, _>>()?;

    BottomUpSearch::new(config, records)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    colog::default_builder()
        .filter_level(level)
        .init();

    let mut search = match build(&cli) {
        Ok(x) => x,
        Err(e) => {
            error!("{e}");
            return ExitCode::from(2);
        },
    };

    let outcome = search.run();
    let stats = search.stats();
    info!(
        "{} rounds, {} nodes, {} live, cache {}/{} hits",
        stats.rounds,
        stats.nodes,
        stats.live,
        stats.cache_hits,
        stats.cache_hits + stats.cache_misses,
    );

    match outcome {
        SearchOutcome::Found(sol) => {
            println!("{}", sol.text);
            ExitCode::SUCCESS
        },
        SearchOutcome::Exhausted { rounds } => {
            error!("No program within the depth bound ({rounds} rounds)");
            ExitCode::FAILURE
        },
        SearchOutcome::Abandoned { rounds } => {
            error!("Gave up after {rounds} rounds");
            ExitCode::FAILURE
        },
    }
}

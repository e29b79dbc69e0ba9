use anyhow::Context as _;
use clap::{Parser, ValueEnum};
use lrtab::{
    first_sets::FirstSets,
    follow_sets::FollowSets,
    grammar::Grammar,
    parser::display_trace,
    table::{BuildError, Config},
};
use std::{path::PathBuf, time::Instant};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The path of grammar definition file.
    grammar: PathBuf,

    /// The construction method of the automaton.
    #[arg(long, value_enum, default_value_t = Algorithm::Lalr)]
    algorithm: Algorithm,

    /// Fail if the table has any conflict.
    #[arg(long)]
    strict: bool,

    /// Whitespace-separated input tokens to parse. May be repeated.
    #[arg(short, long = "input", value_name = "TOKENS")]
    inputs: Vec<String>,

    /// Print the trace of each parse.
    #[arg(long)]
    trace: bool,

    /// What to print after the construction.
    #[arg(long, value_enum)]
    dump: Vec<Dump>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Algorithm {
    Canonical,
    Lalr,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Dump {
    Grammar,
    First,
    Follow,
    Automaton,
    Table,
    All,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::trace!("CLI args = {:?}", args);

    let dumps = |what: Dump| args.dump.contains(&what) || args.dump.contains(&Dump::All);

    let mut config = Config::new();
    match args.algorithm {
        Algorithm::Canonical => config.use_canonical(),
        Algorithm::Lalr => config.use_lalr(),
    };
    config.strict(args.strict);

    let start = Instant::now();
    let grammar = Grammar::from_file(&args.grammar)
        .with_context(|| format!("failed to load the grammar from {}", args.grammar.display()))?;
    tracing::info!("parsed the grammar in {:?}", start.elapsed());
    if dumps(Dump::Grammar) {
        println!("{}", grammar);
    }

    let start = Instant::now();
    let first_sets = FirstSets::new(&grammar);
    tracing::info!("computed the first sets in {:?}", start.elapsed());
    if dumps(Dump::First) {
        println!("{}", first_sets.display(&grammar));
    }
    if dumps(Dump::Follow) {
        let follow_sets = FollowSets::new(&grammar, &first_sets);
        println!("{}", follow_sets.display(&grammar));
    }

    let start = Instant::now();
    let automaton = config
        .build_automaton(&grammar, &first_sets)
        .context("failed to build the automaton")?;
    tracing::info!(
        "built the {:?} automaton ({} states) in {:?}",
        automaton.kind(),
        automaton.len(),
        start.elapsed()
    );
    if dumps(Dump::Automaton) {
        println!("{}", automaton.display(&grammar));
    }

    let start = Instant::now();
    let table = match config.build_table(&grammar, &automaton) {
        Ok(table) => table,
        Err(BuildError::Conflicts(conflicts)) => {
            for conflict in &conflicts {
                eprintln!("[error] {}", conflict.display(&grammar));
            }
            anyhow::bail!("{} conflict(s) detected in strict mode", conflicts.len());
        }
        Err(err) => return Err(err).context("failed to build the parse table"),
    };
    tracing::info!("built the parse table in {:?}", start.elapsed());
    if dumps(Dump::Table) {
        println!("{}", table.display(&grammar));
    }

    if !table.conflicts().is_empty() {
        let suffix = if table.conflicts().len() == 1 { "" } else { "s" };
        println!(
            "[warning] The table has {} conflict{}; the first action is kept in each cell.",
            table.conflicts().len(),
            suffix
        );
        for conflict in table.conflicts() {
            println!("- {}", conflict.display(&grammar));
        }
    }

    for input in &args.inputs {
        let outcome = lrtab::parse(&grammar, &table, input)
            .with_context(|| format!("the parse table is malformed (input: {:?})", input))?;
        if args.trace {
            println!("{}", display_trace(&grammar, &outcome));
        }
        match outcome.rejection() {
            None => println!("{:?}: accepted", input),
            Some(rejection) => match &rejection.lookahead {
                Some(token) => println!(
                    "{:?}: rejected at token {} (`{}')",
                    input,
                    rejection.position + 1,
                    token
                ),
                None => println!("{:?}: rejected at the end of input", input),
            },
        }
    }

    Ok(())
}

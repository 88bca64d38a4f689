//! webgraph-discover - command-line front end for DiscoveryEngine
//!
//! Usage:
//!   webgraph-discover <GRAPH_DIR> [--config FILE] [--reversed] backlinks --seeds cnn.com,bbc.com --min 2
//!   webgraph-discover <GRAPH_DIR> outlinks --seeds a.com,b.com --max 20 --format edges
//!   webgraph-discover <GRAPH_DIR> validate --seeds a.com,missing.xyz
//!   webgraph-discover <GRAPH_DIR> info
//!
//! GRAPH_DIR holds `vertices.tsv` and `edges.tsv`. Results go to stdout,
//! logs to stderr (`RUST_LOG`, default `info`).

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use webgraph_discovery::convert::{to_edge_list, to_node_table};
use webgraph_discovery::{
    Direction, DiscoveryConfig, DiscoveryEngine, DiscoveryError, DiscoveryOptions, FlatFileGraph,
    LabelNotation,
};

#[derive(Parser)]
#[command(name = "webgraph-discover", version, about = "Seed-based domain discovery over a web-link graph")]
struct Cli {
    /// Directory containing vertices.tsv and edges.tsv
    graph_dir: PathBuf,

    /// TOML engine config
    #[arg(long)]
    config: Option<PathBuf>,

    /// Graph labels use reversed notation (com.cnn.www)
    #[arg(long)]
    reversed: bool,

    /// Neighbor fetch threads (0 = available parallelism)
    #[arg(long)]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Domains linking to many of the seeds
    Backlinks(DiscoverArgs),
    /// Domains linked from many of the seeds
    Outlinks(DiscoverArgs),
    /// Report which seeds exist in the graph
    Validate {
        #[arg(long, value_delimiter = ',', required = true)]
        seeds: Vec<String>,
    },
    /// Print graph size and version
    Info,
}

#[derive(clap::Args)]
struct DiscoverArgs {
    /// Comma-separated seed domains
    #[arg(long, value_delimiter = ',', required = true)]
    seeds: Vec<String>,

    /// Minimum number of seeds a result must connect to
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    min: i64,

    /// Keep only the top N results
    #[arg(long, allow_negative_numbers = true)]
    max: Option<i64>,

    /// Abort the discovery after this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Edges,
    Nodes,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let code = err
                .downcast_ref::<DiscoveryError>()
                .map_or("INTERNAL_ERROR", DiscoveryError::code);
            eprintln!("error [{}]: {:#}", code, err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = match &cli.config {
        Some(path) => DiscoveryConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => DiscoveryConfig::default(),
    };
    if cli.reversed {
        config.label_notation = LabelNotation::Reversed;
    }
    if let Some(threads) = cli.threads {
        config.fetch_threads = threads;
    }

    let start = Instant::now();
    let graph = FlatFileGraph::open(&cli.graph_dir)?;
    tracing::info!("graph loaded in {:?}", start.elapsed());

    let engine = DiscoveryEngine::new(Arc::new(graph), config)?;

    match cli.command {
        Command::Backlinks(args) => discover(&engine, Direction::Backlinks, args),
        Command::Outlinks(args) => discover(&engine, Direction::Outlinks, args),
        Command::Validate { seeds } => {
            let (found, missing) = engine.validate_seeds(&seeds)?;
            let report = serde_json::json!({ "found": found, "missing": missing });
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Command::Info => {
            let snapshot = engine.snapshot();
            println!("nodes:   {}", snapshot.node_count);
            println!("edges:   {}", snapshot.edge_count);
            println!("version: {}", snapshot.version.as_deref().unwrap_or("-"));
            Ok(())
        }
    }
}

fn discover(engine: &DiscoveryEngine, direction: Direction, args: DiscoverArgs) -> anyhow::Result<()> {
    let mut options = DiscoveryOptions::from_raw(args.min, args.max)?;
    if let Some(ms) = args.timeout_ms {
        options = options.timeout(Duration::from_millis(ms));
    }

    let result = engine.discover(&args.seeds, direction, &options)?;
    tracing::info!("{}", result);

    match args.format {
        OutputFormat::Json => println!("{}", result.to_json()?),
        OutputFormat::Edges => {
            for (from, to) in to_edge_list(&result) {
                println!("{}\t{}", from, to);
            }
        }
        OutputFormat::Nodes => print!("{}", to_node_table(&result)),
    }
    Ok(())
}

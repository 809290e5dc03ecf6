use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

// 导入库模块
use pgql_engine::config::{Config, ExecutionMode};
use pgql_engine::query::grouper::GrouperAlias;
use pgql_engine::query::sorter::SorterAlias;
use pgql_engine::query::{format_results, PrintFormat, Query};
use pgql_engine::storage::load_graph;
use pgql_engine::utils::logging;

#[derive(Parser)]
#[clap(version = "0.1.0", author = "GraphDB Contributors")]
/// Run a pattern query against a JSON property graph
struct Cli {
    /// Graph document (JSON)
    #[clap(short, long)]
    graph: PathBuf,

    /// Query text, e.g. "SELECT x, COUNT(*) MATCH (x)->(y) GROUP BY x"
    #[clap(short, long)]
    query: String,

    /// Configuration file (TOML)
    #[clap(short, long)]
    config: Option<PathBuf>,

    #[clap(short, long)]
    threads: Option<usize>,

    #[clap(long)]
    grouper: Option<GrouperAlias>,

    #[clap(long)]
    sorter: Option<SorterAlias>,

    #[clap(long)]
    mode: Option<ExecutionMode>,

    #[clap(short, long, default_value = "plain")]
    format: PrintFormat,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(threads) = cli.threads {
        config.execution.thread_count = threads;
    }
    if let Some(grouper) = cli.grouper {
        config.execution.grouper = grouper;
    }
    if let Some(sorter) = cli.sorter {
        config.execution.sorter = sorter;
    }
    if let Some(mode) = cli.mode {
        config.execution.mode = mode;
    }

    logging::init(&config.log).context("failed to initialise logging")?;
    let outcome = run(&cli, &config);
    logging::shutdown();

    println!("{}", outcome?);
    Ok(())
}

fn run(cli: &Cli, config: &Config) -> Result<String> {
    let graph = load_graph(&cli.graph)
        .with_context(|| format!("failed to load graph {}", cli.graph.display()))?;
    let query = Query::new(Arc::new(graph), &cli.query, &config.execution)?;
    let results = query.run()?;
    Ok(format_results(&results, cli.format))
}

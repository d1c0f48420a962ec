//! dagkit: command line access to the DAG kernel.
//!
//! Every subcommand reads a JSON graph document (see
//! [`dag_kernel::GraphDocument`]) and can narrow it with `--tag`,
//! `--upstream-of` or `--downstream-of` before doing its work.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `RUST_LOG`: Log level filter (default: warn)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: pretty)
//!
//! ## Exit codes
//!
//! - `0`: success
//! - `1`: the graph failed validation (cycle, inconsistency, checksum mismatch)
//! - `2`: any other error
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin dagkit --features cli -- info pipeline.json
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dag_kernel::document::{self, DocumentError, GraphDocument, LoadedGraph, Source};
use dag_kernel::{
    read_checksum, ChecksumValidation, Graph, GraphError, NodeId, NodeStore, ReferenceLabeler,
    TagColorStyler,
};

#[derive(Parser)]
#[command(name = "dagkit")]
#[command(about = "Inspect, validate and transform dependency graphs", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Narrowing applied to a loaded graph, in order: tag, upstream, downstream.
#[derive(Args, Debug, Clone, Default)]
struct Filter {
    /// Keep only nodes carrying this tag (plus their connected neighbours)
    #[arg(short, long)]
    tag: Option<String>,
    /// Keep only this node and its ancestors
    #[arg(long)]
    upstream_of: Option<String>,
    /// Keep only this node and its descendants
    #[arg(long)]
    downstream_of: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print node, edge and scheduling statistics
    Info {
        /// Graph document
        file: PathBuf,
        #[command(flatten)]
        filter: Filter,
    },
    /// Check the graph for cycles and broken edge bookkeeping
    Check {
        /// Graph document
        file: PathBuf,
        #[command(flatten)]
        filter: Filter,
    },
    /// Write the transitive reduction of the graph
    Reduce {
        /// Graph document
        input: PathBuf,
        /// Output document
        output: PathBuf,
        /// Wrap the output with its checksum
        #[arg(long)]
        embed_checksum: bool,
        #[command(flatten)]
        filter: Filter,
    },
    /// Print the graph checksum
    Checksum {
        /// Graph document
        file: PathBuf,
        #[command(flatten)]
        filter: Filter,
    },
    /// Verify the graph against a checksum, or the one embedded in the file
    Verify {
        /// Graph document
        file: PathBuf,
        /// Expected checksum
        #[arg(short, long)]
        expected: Option<String>,
        #[command(flatten)]
        filter: Filter,
    },
    /// Write the graph checksum to a file
    WriteChecksum {
        /// Graph document
        file: PathBuf,
        /// Checksum file
        output: PathBuf,
        #[command(flatten)]
        filter: Filter,
    },
    /// Compare two graphs
    Diff {
        /// Old graph document
        old: PathBuf,
        /// New graph document
        new: PathBuf,
        /// Write the annotated diff graph here
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        filter: Filter,
    },
    /// List every path between two nodes
    Paths {
        /// Graph document
        file: PathBuf,
        /// Reference of the first node
        source: String,
        /// Reference of the last node
        target: String,
        #[command(flatten)]
        filter: Filter,
    },
    /// Print the CPM schedule and the critical path
    CriticalPath {
        /// Graph document
        file: PathBuf,
        #[command(flatten)]
        filter: Filter,
    },
}

/// Initialize the tracing subscriber with JSON or pretty format
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "dagkit=warn,dag_kernel=warn".into());

    if log_format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true).flatten_event(true).with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli.command) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(DocumentError::Graph(error)) if error.is_cycle() || error.is_consistency() => {
            eprintln!("Invalid graph: {}", error);
            ExitCode::from(1)
        }
        Err(error @ DocumentError::ChecksumMismatch { .. }) => {
            eprintln!("{}", error);
            ExitCode::from(1)
        }
        Err(error) => {
            tracing::error!(error = %error, "Command failed");
            eprintln!("Error: {}", error);
            ExitCode::from(2)
        }
    }
}

/// Run one subcommand. `Ok(false)` reports a validation failure.
fn run(command: Commands) -> Result<bool, DocumentError> {
    match command {
        Commands::Info { file, filter } => info(&file, &filter),
        Commands::Check { file, filter } => check(&file, &filter),
        Commands::Reduce {
            input,
            output,
            embed_checksum,
            filter,
        } => reduce(&input, &output, embed_checksum, &filter),
        Commands::Checksum { file, filter } => {
            let (store, graph) = open(&file, &filter)?;
            println!("{}", graph.checksum(&store));
            Ok(true)
        }
        Commands::Verify { file, expected, filter } => verify(&file, expected, &filter),
        Commands::WriteChecksum { file, output, filter } => {
            let (store, graph) = open(&file, &filter)?;
            graph.write_checksum(&store, &output)?;
            println!("Checksum written to {}", output.display());
            Ok(true)
        }
        Commands::Diff {
            old,
            new,
            output,
            filter,
        } => diff(&old, &new, output.as_deref(), &filter),
        Commands::Paths {
            file,
            source,
            target,
            filter,
        } => paths(&file, &source, &target, &filter),
        Commands::CriticalPath { file, filter } => critical_path(&file, &filter),
    }
}

/// Load a document and apply the filter.
fn open(path: &Path, filter: &Filter) -> Result<(NodeStore<String>, Graph<String>), DocumentError> {
    let LoadedGraph { store, graph, .. } = document::load(&Source::Path(path.to_path_buf()))?;
    let graph = narrow(&store, graph, filter)?;
    Ok((store, graph))
}

fn narrow(store: &NodeStore<String>, graph: Graph<String>, filter: &Filter) -> Result<Graph<String>, GraphError> {
    let mut graph = match &filter.tag {
        Some(tag) => graph.subgraph_tagged(store, tag)?,
        None => graph,
    };
    if let Some(reference) = &filter.upstream_of {
        let id = graph.get(store, reference)?;
        graph = graph.upstream_of(store, id)?;
    }
    if let Some(reference) = &filter.downstream_of {
        let id = graph.get(store, reference)?;
        graph = graph.downstream_of(store, id)?;
    }
    Ok(graph)
}

fn references(store: &NodeStore<String>, ids: &[NodeId], separator: &str) -> String {
    ids.iter().map(|id| store.label(*id)).collect::<Vec<_>>().join(separator)
}

fn info(path: &Path, filter: &Filter) -> Result<bool, DocumentError> {
    let (store, graph) = open(path, filter)?;

    println!("Nodes: {}", graph.len());
    println!("Edges: {}", graph.edge_count(&store));
    println!("Sources: {}", references(&store, &graph.sources(&store), ", "));
    println!("Sinks: {}", references(&store, &graph.sinks(&store), ", "));

    let scheduled = graph
        .iter()
        .filter_map(|id| store.node(id))
        .any(|node| node.duration() > 0.0);
    if scheduled {
        let analysis = graph.cpm_analysis(&store)?;
        println!("Project Duration: {}", analysis.project_duration());
        println!("Critical Path Length: {}", analysis.critical_path().len());
    }
    Ok(true)
}

fn check(path: &Path, filter: &Filter) -> Result<bool, DocumentError> {
    let (store, graph) = open(path, filter)?;
    graph.check_cycles(&store)?;
    graph.check_consistency(&store)?;
    println!("Graph is valid");
    Ok(true)
}

fn reduce(input: &Path, output: &Path, embed_checksum: bool, filter: &Filter) -> Result<bool, DocumentError> {
    let (mut store, graph) = open(input, filter)?;
    let before = graph.edge_count(&store);
    let reduced = graph.transitive_reduction(&mut store)?.graph;
    document::save(&reduced, &store, output, embed_checksum)?;
    println!(
        "Reduced {} edges to {}, written to {}",
        before,
        reduced.edge_count(&store),
        output.display()
    );
    Ok(true)
}

fn verify(path: &Path, expected: Option<String>, filter: &Filter) -> Result<bool, DocumentError> {
    let text = std::fs::read_to_string(path)?;
    let (document, embedded) = GraphDocument::parse(&text)?;
    let (store, graph, _) = document.build()?;
    let graph = narrow(&store, graph, filter)?;

    let expected = match expected {
        Some(value) if Path::new(&value).is_file() => Some(read_checksum(&value)?),
        Some(value) => Some(value),
        None => embedded,
    };

    match graph.verify_checksum(&store, expected.as_deref()) {
        ChecksumValidation::Valid => {
            println!("Checksum valid");
            Ok(true)
        }
        ChecksumValidation::Mismatch { expected, computed } => {
            println!("Checksum mismatch");
            println!("  expected: {}", expected);
            println!("  computed: {}", computed);
            Ok(false)
        }
        ChecksumValidation::Missing => {
            println!("No checksum to verify against");
            println!("  computed: {}", graph.checksum(&store));
            Ok(true)
        }
    }
}

fn diff(old: &Path, new: &Path, output: Option<&Path>, filter: &Filter) -> Result<bool, DocumentError> {
    let (old_store, old_graph) = open(old, filter)?;
    let (new_store, new_graph) = open(new, filter)?;

    let changes = old_graph.diff(&old_store, new_graph.bind(&new_store));
    if changes.is_empty() {
        println!("No differences");
    } else {
        print!("{}", changes);
    }

    if let Some(output) = output {
        let projection = old_graph.diff_graph(&old_store, new_graph.bind(&new_store))?;
        let rendered =
            GraphDocument::from_graph_with(&projection.graph, &projection.store, &ReferenceLabeler, &TagColorStyler)?
                .to_json()?;
        std::fs::write(output, rendered)?;
        println!("Diff graph written to {}", output.display());
    }
    Ok(true)
}

fn paths(path: &Path, source: &str, target: &str, filter: &Filter) -> Result<bool, DocumentError> {
    let (store, graph) = open(path, filter)?;
    let from = graph.get(&store, &source.to_string())?;
    let to = graph.get(&store, &target.to_string())?;

    let found = graph.all_paths(&store, from, to)?;
    if found.is_empty() {
        println!("No paths from {} to {}", source, target);
    }
    for route in &found {
        println!("{}", references(&store, route, " -> "));
    }
    Ok(true)
}

fn critical_path(path: &Path, filter: &Filter) -> Result<bool, DocumentError> {
    let (store, graph) = open(path, filter)?;
    let analysis = graph.cpm_analysis(&store)?;

    println!("{:<24} {:>8} {:>8} {:>8} {:>8} {:>8}", "node", "ES", "EF", "LS", "LF", "slack");
    for (id, entry) in analysis.iter() {
        println!(
            "{:<24} {:>8} {:>8} {:>8} {:>8} {:>8}",
            store.label(id),
            entry.earliest_start,
            entry.earliest_finish,
            entry.latest_start,
            entry.latest_finish,
            entry.slack
        );
    }
    println!("Project Duration: {}", analysis.project_duration());
    println!("Critical Path: {}", references(&store, &graph.longest_path(&store)?, " -> "));
    Ok(true)
}

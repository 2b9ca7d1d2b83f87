use std::error::Error;
use std::io::stdin;
use std::time::Instant;

use clap::Parser;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::FmtSubscriber;

use modtree::{read_edge_list, Backing, Graph, MDTree};

/// Computes the modular decomposition of an edge list read from stdin.
///
/// Prints the modular width, the time spent decomposing in seconds and the
/// canonical parenthesized tree, one per line.
#[derive(Debug, Parser)]
struct Cli {
    /// Store adjacency in per-vertex bitsets (bounded graph size).
    #[arg(long)]
    dense: bool,
    /// Enable log output at this level (logs go to stderr).
    #[arg(long)]
    log_level: Option<Level>,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if let Some(level) = cli.log_level {
        FmtSubscriber::builder()
            .with_max_level(level)
            .with_span_events(FmtSpan::CLOSE)
            .with_writer(std::io::stderr)
            .finish()
            .init();
    }

    let graph = read_edge_list(stdin().lock())?;
    let graph = if cli.dense {
        let mut dense = Graph::with_backing(graph.number_of_nodes(), Backing::Dense)?;
        for (u, v) in graph.edges() {
            dense.add_edge(u, v)?;
        }
        dense
    } else {
        graph
    };

    let start = Instant::now();
    let mut md = MDTree::new(&graph);
    md.sort();
    let elapsed = start.elapsed();

    println!("{}", md.modular_width());
    println!("{:.10}", elapsed.as_secs_f64());
    println!("{md}");

    Ok(())
}

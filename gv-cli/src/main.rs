#![warn(clippy::all, rust_2018_idioms)]

use std::path::PathBuf;

use anyhow::{Context, anyhow, bail};
use clap::Parser;
use graphviz_rust::printer::PrinterContext;
use gv_core::{
    algorithm::{AlgorithmKind, Status},
    document::{GraphDocument, LoadOptions},
    dot::{from_dot, to_dot},
    edge_list::parse_edge_list,
    graph::{Graph, NodeId},
    mermaid::{Direction, to_mermaid},
};
use gv_graphics::{
    layout::LayoutSettings,
    session::{Session, SessionConfig},
    shape::Shapes,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Read in a saved JSON graph
    #[arg(long, value_name = "FILE", group = "input")]
    json: Option<PathBuf>,

    /// Keep the node positions stored in a JSON graph
    #[arg(long, requires = "json")]
    keep_positions: bool,

    /// Read in an edge list
    #[arg(long, value_name = "FILE", group = "input")]
    edges: Option<PathBuf>,

    /// Read in a dot file
    #[arg(long, value_name = "FILE", group = "input")]
    dot: Option<PathBuf>,

    /// Algorithm to run once the layout has settled
    #[arg(short, long, value_enum)]
    algorithm: Option<AlgorithmKind>,

    /// Label of the start node
    #[arg(long, requires = "algorithm")]
    start: Option<String>,

    /// Label of the target node
    #[arg(long, requires = "algorithm")]
    target: Option<String>,

    /// Seed for initial placement
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Upper bound on layout ticks
    #[arg(long, default_value_t = 5000)]
    max_ticks: usize,

    /// Write the final frame as SVG
    #[arg(long, value_name = "FILE")]
    svg: Option<PathBuf>,

    /// Save the graph with its positions as JSON
    #[arg(long, value_name = "FILE")]
    save: Option<PathBuf>,

    /// Print a Mermaid flowchart
    #[arg(long, value_enum, value_name = "DIRECTION")]
    mermaid: Option<Direction>,

    /// Write the graph as a dot file
    #[arg(long, value_name = "FILE")]
    dot_out: Option<PathBuf>,
}

fn read_graph(args: &Args) -> anyhow::Result<Graph> {
    if let Some(path) = &args.json {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let document = GraphDocument::from_json(&source)?;
        let options = LoadOptions {
            keep_positions: args.keep_positions,
        };
        Ok(Graph::from_document(&document, options)?)
    } else if let Some(path) = &args.edges {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Ok(parse_edge_list(&source)?)
    } else if let Some(path) = &args.dot {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let dot = graphviz_rust::parse(&source).map_err(|err| anyhow!(err))?;
        Ok(from_dot(&dot)?)
    } else {
        bail!("no input given, use one of --json, --edges or --dot")
    }
}

fn lookup(graph: &Graph, label: Option<&str>) -> anyhow::Result<Option<NodeId>> {
    label
        .map(|label| {
            graph
                .find_label(label)
                .ok_or_else(|| anyhow!("no node labelled `{label}`"))
        })
        .transpose()
}

fn main() -> anyhow::Result<()> {
    // Log to stderr (if you run with `RUST_LOG=debug`).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let graph = read_graph(&args)?;
    let start = lookup(&graph, args.start.as_deref())?;
    let target = lookup(&graph, args.target.as_deref())?;

    let config = SessionConfig {
        layout: LayoutSettings {
            seed: args.seed,
            ..LayoutSettings::default()
        },
        ..SessionConfig::default()
    };
    let mut session = Session::new(graph, config);

    let mut ticks = 0;
    while ticks < args.max_ticks && !session.layout().is_stable() {
        session.advance_frame();
        ticks += 1;
    }
    info!(
        "Layout {} after {ticks} ticks",
        if session.layout().is_stable() {
            "settled"
        } else {
            "still moving"
        }
    );

    if let Some(kind) = args.algorithm {
        session.run_algorithm_to(kind, start, target)?;
        while session
            .advance_frame()
            .run
            .is_some_and(|run| run.position < run.recorded || run.status == Status::Running)
        {}
        for event in session.events() {
            println!("{event}");
        }
    }

    if let Some(path) = &args.svg {
        let document = Shapes::from_view(&session.view_model()).to_svg();
        std::fs::write(path, document.to_string())
            .with_context(|| format!("writing {}", path.display()))?;
    }
    if let Some(path) = &args.save {
        std::fs::write(path, session.save().to_json()?)
            .with_context(|| format!("writing {}", path.display()))?;
    }
    if let Some(direction) = args.mermaid {
        print!("{}", to_mermaid(session.graph(), direction));
    }
    if let Some(path) = &args.dot_out {
        let dot = graphviz_rust::print(to_dot(session.graph()), &mut PrinterContext::default());
        std::fs::write(path, dot).with_context(|| format!("writing {}", path.display()))?;
    }

    Ok(())
}

use std::fmt::Write;

use clap_derive::ValueEnum;
use derive_more::Display;

use crate::graph::{DEFAULT_WEIGHT, Graph};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Display)]
pub enum Direction {
    #[default]
    #[display("TD")]
    TopDown,
    #[display("LR")]
    LeftRight,
}

/// Renders the enabled part of a graph as a Mermaid flowchart.
///
/// Weights other than the default are written as edge labels.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn to_mermaid(graph: &Graph, direction: Direction) -> String {
    let mut out = format!("graph {direction}\n");
    for node in graph.nodes().filter(|node| node.enabled) {
        let label = node.label.replace('"', "#quot;");
        let _ = writeln!(out, "  {}[\"{label}\"]", node.id);
    }
    for edge in graph.enabled_edges() {
        let arrow = if graph.is_directed(edge) { "-->" } else { "---" };
        let _ = write!(out, "  {} {arrow}", edge.source);
        if edge.weight != DEFAULT_WEIGHT {
            let _ = write!(out, "|{}|", edge.weight);
        }
        let _ = writeln!(out, " {}", edge.target);
    }
    out
}

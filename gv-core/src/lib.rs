pub mod algorithm;
pub mod document;
pub mod dot;
pub mod edge_list;
pub mod graph;
pub mod mermaid;
pub mod petgraph;

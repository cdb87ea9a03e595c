//! Plain-text edge lists.
//!
//! ```text
//! # comments run to the end of the line
//! A -> B : 2.5
//! B -- C
//! D
//! ```
//!
//! Nodes are created by label on first mention. A list containing any `->` produces a directed
//! graph in which `--` edges carry an undirected override. Otherwise the graph is undirected.

use indexmap::IndexMap;
use pest::{Parser as _, iterators::Pair};
use pest_derive::Parser;
use thiserror::Error;
use tracing::debug;

use crate::graph::{EdgePolicy, Graph, GraphError, GraphMode, NodeId};

#[derive(Parser)]
#[grammar = "edge_list.pest"]
pub struct EdgeListParser;

#[derive(Clone, Debug, Error)]
pub enum ParseError {
    #[error("Edge list parsing error:\n{0}")]
    Syntax(#[from] Box<pest::error::Error<Rule>>),

    #[error("Invalid weight `{0}`")]
    Weight(String),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

struct Statement<'a> {
    source: &'a str,
    target: Option<(&'a str, bool, Option<f64>)>,
}

fn label(pair: Pair<'_, Rule>) -> &str {
    match pair.as_rule() {
        Rule::quoted => pair.into_inner().next().map_or("", |inner| inner.as_str()),
        _ => pair.as_str(),
    }
}

fn statement(pair: Pair<'_, Rule>) -> Result<Statement<'_>, ParseError> {
    let rule = pair.as_rule();
    let mut inner = pair.into_inner();
    let source = inner.next().map(label).unwrap_or_default();
    if rule == Rule::node {
        return Ok(Statement {
            source,
            target: None,
        });
    }

    let directed = inner
        .next()
        .is_some_and(|arrow| arrow.as_rule() == Rule::directed);
    let target = inner.next().map(label).unwrap_or_default();
    let weight = inner
        .next()
        .map(|number| {
            number
                .as_str()
                .parse::<f64>()
                .map_err(|_| ParseError::Weight(number.as_str().to_owned()))
        })
        .transpose()?;
    Ok(Statement {
        source,
        target: Some((target, directed, weight)),
    })
}

/// # Errors
///
/// Fails on syntax errors.
pub fn parse_edge_list(source: &str) -> Result<Graph, ParseError> {
    let program = EdgeListParser::parse(Rule::program, source)
        .map_err(Box::new)?
        .next()
        .into_iter()
        .flat_map(Pair::into_inner)
        .filter(|pair| matches!(pair.as_rule(), Rule::edge | Rule::node))
        .map(statement)
        .collect::<Result<Vec<_>, _>>()?;

    let mode = if program
        .iter()
        .any(|statement| matches!(statement.target, Some((_, true, _))))
    {
        GraphMode::Directed
    } else {
        GraphMode::Undirected
    };
    let mut graph = Graph::new(mode, EdgePolicy::Simple);
    let mut labels: IndexMap<&str, NodeId> = IndexMap::new();
    let mut node = |graph: &mut Graph, label| {
        *labels
            .entry(label)
            .or_insert_with(|| graph.add_node(label))
    };

    for statement in &program {
        let source = node(&mut graph, statement.source);
        let Some((target, directed, weight)) = statement.target else {
            continue;
        };
        let target = node(&mut graph, target);
        match graph.add_edge_with(source, target, weight, Some(directed)) {
            Ok(_) => {}
            Err(GraphError::DuplicateEdge { existing, .. }) => {
                debug!("Skipping duplicate of {existing} between {source} and {target}");
            }
            Err(err) => return Err(err.into()),
        }
    }

    debug!(
        "Parsed edge list with {} nodes and {} edges",
        graph.node_count(),
        graph.edge_count()
    );
    Ok(graph)
}

#[cfg(test)]
pub(crate) mod tests {
    use anyhow::Result;
    use dir_test::{Fixture, dir_test};
    use rstest::rstest;

    use super::{ParseError, parse_edge_list};
    use crate::graph::{Graph, GraphMode};

    pub(crate) fn load_edge_list(raw_path: &str) -> (String, Graph) {
        let path = std::path::Path::new(raw_path);
        let source = std::fs::read_to_string(path).unwrap();
        let graph = parse_edge_list(&source)
            .unwrap_or_else(|err| panic!("could not parse {:?}\n{err}", path.file_stem()));
        let name = path.file_stem().unwrap().to_string_lossy().into_owned();
        (name, graph)
    }

    #[allow(clippy::needless_pass_by_value)]
    #[dir_test(dir: "$CARGO_MANIFEST_DIR/../fixtures", glob: "**/*.txt", loader: crate::edge_list::tests::load_edge_list, postfix: "check_parse")]
    fn check_parse(fixture: Fixture<(String, Graph)>) {
        let (name, graph) = fixture.content();
        assert!(graph.node_count() > 0, "{name} has no nodes");
        for edge in graph.edges() {
            assert!(graph.contains_node(edge.source));
            assert!(graph.contains_node(edge.target));
        }
    }

    fn labels(graph: &Graph) -> Vec<&str> {
        graph.nodes().map(|node| node.label.as_str()).collect()
    }

    #[test]
    fn nodes_are_created_by_label() -> Result<()> {
        let graph = parse_edge_list("A -> B\nB -> C\nC -> A\nD\n")?;
        assert_eq!(graph.mode(), GraphMode::Directed);
        assert_eq!(labels(&graph), ["A", "B", "C", "D"]);
        assert_eq!(graph.edge_count(), 3);
        Ok(())
    }

    #[test]
    fn weights_comments_and_quotes() -> Result<()> {
        let graph = parse_edge_list(
            "# a weighted triangle\n\"New York\" -- Boston : 3.5  # miles, roughly\n\nBoston -- Albany: -2\n",
        )?;
        assert_eq!(graph.mode(), GraphMode::Undirected);
        assert_eq!(labels(&graph), ["New York", "Boston", "Albany"]);
        let weights: Vec<f64> = graph.edges().map(|edge| edge.weight).collect();
        assert_eq!(weights, [3.5, -2.0]);
        Ok(())
    }

    #[test]
    fn undirected_lines_in_a_directed_list_keep_an_override() -> Result<()> {
        let graph = parse_edge_list("A -> B\nB -- C")?;
        let overrides: Vec<Option<bool>> = graph.edges().map(|edge| edge.directed).collect();
        assert_eq!(overrides, [None, Some(false)]);
        Ok(())
    }

    #[test]
    fn duplicates_are_skipped() -> Result<()> {
        let graph = parse_edge_list("A -- B\nB -- A\nA -- B : 4")?;
        assert_eq!(graph.edge_count(), 1);
        Ok(())
    }

    #[rstest]
    #[case("A ->")]
    #[case("A -> B -> C")]
    #[case("A => B")]
    #[case("A -> B : heavy")]
    fn syntax_errors(#[case] source: &str) {
        assert!(matches!(
            parse_edge_list(source),
            Err(ParseError::Syntax(_))
        ));
    }

    #[test]
    fn empty_input_is_an_empty_graph() -> Result<()> {
        let graph = parse_edge_list("\n# nothing here\n")?;
        assert_eq!(graph.node_count(), 0);
        Ok(())
    }
}

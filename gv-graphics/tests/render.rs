use anyhow::Result;
use gv_core::{
    algorithm::AlgorithmKind,
    edge_list::parse_edge_list,
    graph::{Graph, NodeId},
};
use gv_graphics::{
    layout::{ForceLayout, LayoutSettings},
    session::{Session, SessionConfig},
    shape::Shapes,
};
use itertools::Itertools;

/// A ring of `count` nodes with a chord from every fifth node.
fn ring_with_chords(count: usize) -> Result<Graph> {
    let mut graph = Graph::undirected();
    let nodes: Vec<NodeId> = (0..count)
        .map(|i| graph.add_node(format!("v{i}")))
        .collect();
    for i in 0..count {
        graph.add_edge(nodes[i], nodes[(i + 1) % count], None)?;
        if i % 5 == 0 {
            graph.add_edge(nodes[i], nodes[(i + count / 2) % count], None)?;
        }
    }
    Ok(graph)
}

fn squeeze(document: &str) -> String {
    document.split_whitespace().collect()
}

#[test]
fn layout_settles_on_a_medium_graph() -> Result<()> {
    let graph = ring_with_chords(24)?;
    let mut layout = ForceLayout::from_graph(&graph, LayoutSettings::default());

    let mut snapshot = layout.snapshot();
    while !snapshot.stable && snapshot.settle_counter < 10_000 {
        snapshot = layout.tick();
    }
    assert!(snapshot.stable, "no convergence: {}", snapshot.displacement);
    assert_eq!(snapshot.positions.len(), 24);

    for ((_, a), (_, b)) in snapshot.positions.iter().tuple_combinations() {
        assert!(a.x.is_finite() && a.y.is_finite());
        assert!(a.distance(*b) > 0.1);
    }
    Ok(())
}

#[test]
fn settled_frames_stop_ticking() -> Result<()> {
    let mut session = Session::new(ring_with_chords(10)?, SessionConfig::default());
    let mut frames = 0;
    while !session.advance_frame().stable {
        frames += 1;
        assert!(frames < 10_000);
    }
    let settled = session.layout().snapshot();
    session.advance_frame();
    assert_eq!(session.layout().snapshot(), settled);
    Ok(())
}

#[test]
fn svg_has_an_element_per_shape() -> Result<()> {
    let mut session = Session::new(
        parse_edge_list("A -> B\nB -> C : 2")?,
        SessionConfig::default(),
    );
    for _ in 0..2_000 {
        session.advance_frame();
    }
    let document = Shapes::from_view(&session.view_model()).to_svg().to_string();

    assert_eq!(document.matches("<circle").count(), 3);
    assert_eq!(document.matches("<line").count(), 2);
    assert_eq!(document.matches("<polygon").count(), 2);
    // Three labels and one weight.
    assert_eq!(document.matches("<text").count(), 4);
    assert!(squeeze(&document).contains(">A</text>"));
    Ok(())
}

#[test]
fn svg_shows_run_annotations() -> Result<()> {
    let mut session = Session::new(
        parse_edge_list("A -> B\nB -> C : 2")?,
        SessionConfig {
            steps_per_frame: 100,
            ..SessionConfig::default()
        },
    );
    session.run_algorithm(AlgorithmKind::Dijkstra, None)?;
    let view = session.advance_frame();
    let shapes = Shapes::from_view(&view);
    let document = shapes.to_svg().to_string();

    assert!(squeeze(&document).contains(">3</text>"));
    assert!(shapes.bounding_box().is_finite());
    Ok(())
}

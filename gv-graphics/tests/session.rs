use anyhow::Result;
use egui::pos2;
use gv_core::{
    algorithm::{AlgorithmError, AlgorithmKind, Event, Runtime, Status},
    document::{GraphDocument, LoadOptions},
    edge_list::parse_edge_list,
    graph::{EdgeId, Graph, GraphError, NodeId},
};
use gv_graphics::{
    session::{EditIntent, EditOutcome, Session, SessionConfig, SessionError},
    view::Highlight,
};
use insta::assert_snapshot;
use rstest::rstest;

/// A–B, A–C, B–D, C–D, added in that order.
fn diamond() -> Result<Graph> {
    Ok(parse_edge_list("A -- B\nA -- C\nB -- D\nC -- D")?)
}

fn session(graph: Graph) -> Session {
    Session::new(graph, SessionConfig::default())
}

fn frames(session: &mut Session, count: usize) {
    for _ in 0..count {
        session.advance_frame();
    }
}

fn run_status(session: &Session) -> Option<Status> {
    session.view_model().run.map(|run| run.status)
}

#[test]
fn failed_edits_change_nothing() -> Result<()> {
    let mut session = session(diamond()?);
    let before = session.save();

    let duplicate = session.apply_edit(EditIntent::AddEdge {
        source: NodeId(1),
        target: NodeId(0),
        weight: None,
        directed: None,
    });
    assert!(matches!(
        duplicate,
        Err(SessionError::Graph(GraphError::DuplicateEdge {
            existing: EdgeId(0),
            ..
        }))
    ));

    for intent in [
        EditIntent::RemoveNode(NodeId(42)),
        EditIntent::RemoveEdge(EdgeId(42)),
        EditIntent::MoveNodeManually {
            node: NodeId(42),
            position: pos2(1.0, 1.0),
        },
        EditIntent::ReleaseNode(NodeId(42)),
        EditIntent::SetLabel {
            node: NodeId(42),
            label: "Z".to_owned(),
        },
    ] {
        assert!(matches!(
            session.apply_edit(intent),
            Err(SessionError::Graph(GraphError::InvalidReference(_)))
        ));
    }

    assert_eq!(session.save(), before);
    Ok(())
}

#[test]
fn added_elements_get_fresh_ids() -> Result<()> {
    let mut session = session(diamond()?);
    let e = session.apply_edit(EditIntent::AddNode {
        label: "E".to_owned(),
    })?;
    assert_eq!(e, EditOutcome::NodeAdded(NodeId(4)));
    let edge = session.apply_edit(EditIntent::AddEdge {
        source: NodeId(3),
        target: NodeId(4),
        weight: Some(2.0),
        directed: None,
    })?;
    assert_eq!(edge, EditOutcome::EdgeAdded(EdgeId(4)));

    session.apply_edit(EditIntent::RemoveNode(NodeId(4)))?;
    let f = session.apply_edit(EditIntent::AddNode {
        label: "F".to_owned(),
    })?;
    assert_eq!(f, EditOutcome::NodeAdded(NodeId(5)));

    let view = session.advance_frame();
    assert_eq!(view.nodes.len(), 5);
    assert_eq!(view.edges.len(), 4);
    assert!(session.layout().position(NodeId(4)).is_none());
    Ok(())
}

#[test]
fn moved_nodes_stay_pinned_until_released() -> Result<()> {
    let mut session = session(diamond()?);
    let target = pos2(5.0, -5.0);
    session.apply_edit(EditIntent::MoveNodeManually {
        node: NodeId(0),
        position: target,
    })?;
    frames(&mut session, 50);

    assert_eq!(session.layout().position(NodeId(0)), Some(target));
    assert_eq!(session.graph().node(NodeId(0))?.position, Some(target));
    let view = session.view_model();
    assert!(view.nodes[0].pinned);
    assert!(view.bounds.contains(target));

    session.apply_edit(EditIntent::ReleaseNode(NodeId(0)))?;
    frames(&mut session, 50);
    assert!(!session.layout().is_pinned(NodeId(0)));
    assert_ne!(session.layout().position(NodeId(0)), Some(target));
    Ok(())
}

#[test]
fn attribute_edits_show_up_in_the_view() -> Result<()> {
    let mut session = session(diamond()?);
    session.apply_edit(EditIntent::SetLabel {
        node: NodeId(3),
        label: "Sink".to_owned(),
    })?;
    session.apply_edit(EditIntent::SetEnabled {
        node: NodeId(1),
        enabled: false,
    })?;
    let view = session.advance_frame();
    assert_eq!(view.nodes[3].label, "Sink");
    assert!(!view.nodes[1].enabled);
    assert_eq!(view.edges.len(), 2);
    Ok(())
}

#[test]
fn frames_step_the_run_and_scrubbing_rewinds() -> Result<()> {
    let mut session = session(diamond()?);
    session.run_algorithm(AlgorithmKind::Bfs, None)?;
    frames(&mut session, 3);
    assert_eq!(session.events().len(), 3);

    session.scrub_to(1)?;
    let view = session.view_model();
    let run = view.run.as_ref().ok_or(SessionError::NoAlgorithm)?;
    assert_eq!((run.position, run.recorded, run.paused), (1, 3, true));
    assert_eq!(view.nodes[0].highlight, Highlight::Visited);
    assert_eq!(view.nodes[1].highlight, Highlight::None);
    assert_eq!(view.edges[0].highlight, Highlight::None);

    frames(&mut session, 5);
    assert_eq!(session.events().len(), 3);

    session.resume()?;
    let view = session.advance_frame();
    let run = view.run.ok_or(SessionError::NoAlgorithm)?;
    assert_eq!((run.position, run.recorded), (2, 3));
    assert_eq!(view.edges[0].highlight, Highlight::Relaxed);

    frames(&mut session, 50);
    assert_eq!(run_status(&session), Some(Status::Complete));
    let expected = Runtime::start(AlgorithmKind::Bfs, &diamond()?, None)?.run_to_completion()?;
    assert_eq!(session.events(), expected.as_slice());
    Ok(())
}

#[test]
fn scrubbing_past_the_recording_fails() -> Result<()> {
    let mut session = session(diamond()?);
    assert!(matches!(session.scrub_to(0), Err(SessionError::NoAlgorithm)));
    assert!(matches!(session.pause(), Err(SessionError::NoAlgorithm)));

    session.run_algorithm(AlgorithmKind::Dfs, None)?;
    frames(&mut session, 3);
    let err = session.scrub_to(4).unwrap_err();
    assert_snapshot!(err.to_string(), @"Cannot scrub to event 4, only 3 recorded");
    session.scrub_to(3)?;
    session.scrub_to(0)?;
    assert!(
        session
            .view_model()
            .nodes
            .iter()
            .all(|node| node.highlight == Highlight::None)
    );
    Ok(())
}

#[test]
fn cancelling_keeps_what_was_recorded() -> Result<()> {
    let mut session = session(parse_edge_list("A -- B : 1\nB -- C : 2\nA -- C : 4")?);
    session.run_algorithm(AlgorithmKind::Dijkstra, None)?;
    frames(&mut session, 2);
    session.cancel()?;
    frames(&mut session, 5);

    assert_eq!(session.events().len(), 2);
    let view = session.view_model();
    let run = view.run.ok_or(SessionError::NoAlgorithm)?;
    assert_eq!(run.status, Status::Cancelled);
    assert_eq!(run.position, 2);
    assert_eq!(view.nodes[0].highlight, Highlight::Visited);
    session.scrub_to(1)?;
    Ok(())
}

#[rstest]
#[case(1)]
#[case(3)]
#[case(100)]
fn steps_per_frame_controls_speed(#[case] steps: usize) -> Result<()> {
    let graph = diamond()?;
    let total = Runtime::start(AlgorithmKind::Bfs, &graph, None)?
        .run_to_completion()?
        .len();
    let config = SessionConfig {
        steps_per_frame: steps,
        ..SessionConfig::default()
    };
    let mut session = Session::new(graph, config);
    session.run_algorithm(AlgorithmKind::Bfs, None)?;

    let needed = total.div_ceil(steps);
    frames(&mut session, needed - 1);
    assert_eq!(session.events().len(), (needed - 1) * steps);
    assert_eq!(run_status(&session), Some(Status::Running));
    frames(&mut session, 1);
    assert_eq!(session.events().len(), total);
    assert_eq!(session.events().last(), Some(&Event::Complete));
    Ok(())
}

#[test]
fn rejected_runs_keep_the_previous_one() -> Result<()> {
    let mut session = session(diamond()?);
    session.run_algorithm(AlgorithmKind::Bfs, None)?;
    frames(&mut session, 2);

    let err = session.run_algorithm(AlgorithmKind::TopologicalSort, None);
    assert!(matches!(
        err,
        Err(SessionError::Algorithm(AlgorithmError::WrongGraphMode { .. }))
    ));
    let err = session.run_algorithm_to(AlgorithmKind::Prim, None, Some(NodeId(3)));
    assert!(matches!(
        err,
        Err(SessionError::Algorithm(AlgorithmError::InvalidInput(_)))
    ));

    assert_eq!(session.events().len(), 2);
    assert_eq!(run_status(&session), Some(Status::Running));
    Ok(())
}

#[test]
fn runs_ignore_later_edits() -> Result<()> {
    let mut session = session(diamond()?);
    session.run_algorithm_to(AlgorithmKind::Bfs, None, Some(NodeId(3)))?;
    session.apply_edit(EditIntent::RemoveNode(NodeId(3)))?;
    frames(&mut session, 100);

    assert_eq!(run_status(&session), Some(Status::Complete));
    assert!(session.events().iter().any(|event| matches!(
        event,
        Event::PathFound {
            target: NodeId(3),
            ..
        }
    )));
    let view = session.view_model();
    assert_eq!(view.nodes.len(), 3);
    assert_eq!(view.nodes[0].highlight, Highlight::Path);
    Ok(())
}

#[test]
fn saved_sessions_reload_in_place() -> Result<()> {
    let mut session = session(diamond()?);
    frames(&mut session, 20);
    session.apply_edit(EditIntent::MoveNodeManually {
        node: NodeId(2),
        position: pos2(3.0, 3.0),
    })?;

    let document = session.save();
    assert!(document.nodes.iter().all(|node| node.position.is_some()));
    let document = GraphDocument::from_json(&document.to_json()?)?;

    let reloaded = Session::load(
        &document,
        LoadOptions {
            keep_positions: true,
        },
        SessionConfig::default(),
    )?;
    for node in &document.nodes {
        assert_eq!(reloaded.layout().position(node.id), node.position);
    }
    assert_eq!(reloaded.save(), document);

    let fresh = Session::load(&document, LoadOptions::default(), SessionConfig::default())?;
    assert_eq!(fresh.graph().node_count(), 4);
    assert_ne!(fresh.layout().position(NodeId(2)), Some(pos2(3.0, 3.0)));
    Ok(())
}

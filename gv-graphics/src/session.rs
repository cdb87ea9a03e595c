use derivative::Derivative;
use egui::Pos2;
use gv_core::{
    algorithm::{AlgorithmError, AlgorithmKind, Event, Runtime, Status},
    document::{DocumentError, GraphDocument, LoadOptions},
    graph::{EdgeId, Graph, GraphError, NodeId, Style},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    layout::{ForceLayout, LayoutError, LayoutSettings},
    view::{HighlightState, RunView, ViewModel},
};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Algorithm(#[from] AlgorithmError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error("Cannot scrub to event {requested}, only {recorded} recorded")]
    ScrubOutOfRange { requested: usize, recorded: usize },
    #[error("No algorithm has been started")]
    NoAlgorithm,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub layout: LayoutSettings,
    /// Events applied by each unpaused frame.
    pub steps_per_frame: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            layout: LayoutSettings::default(),
            steps_per_frame: 1,
        }
    }
}

/// A change requested by the user.
#[derive(Clone, Debug, PartialEq)]
pub enum EditIntent {
    AddNode {
        label: String,
    },
    AddEdge {
        source: NodeId,
        target: NodeId,
        weight: Option<f64>,
        directed: Option<bool>,
    },
    RemoveNode(NodeId),
    RemoveEdge(EdgeId),
    /// Drags a node to `position` and pins it there.
    MoveNodeManually {
        node: NodeId,
        position: Pos2,
    },
    /// Hands a pinned node back to the simulation.
    ReleaseNode(NodeId),
    SetLabel {
        node: NodeId,
        label: String,
    },
    SetStyle {
        node: NodeId,
        style: Style,
    },
    SetEnabled {
        node: NodeId,
        enabled: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditOutcome {
    NodeAdded(NodeId),
    EdgeAdded(EdgeId),
    Applied,
}

#[derive(Derivative)]
#[derivative(Debug)]
struct Run {
    runtime: Runtime,
    #[derivative(Debug = "ignore")]
    events: Vec<Event>,
    /// Number of recorded events reflected in `highlights`.
    cursor: usize,
    #[derivative(Debug = "ignore")]
    highlights: HighlightState,
    paused: bool,
}

impl Run {
    fn new(runtime: Runtime) -> Self {
        Run {
            runtime,
            events: vec![],
            cursor: 0,
            highlights: HighlightState::default(),
            paused: false,
        }
    }

    /// Applies the next recorded event, or asks the runtime for a new one.
    ///
    /// Returns `false` once nothing is left to show.
    fn advance(&mut self) -> bool {
        if self.cursor == self.events.len() {
            if self.runtime.status() != Status::Running {
                return false;
            }
            match self.runtime.step() {
                Ok(event) => self.events.push(event),
                Err(err) => {
                    warn!("Stepping {} failed: {err}", self.runtime.kind());
                    return false;
                }
            }
        }
        self.highlights.apply(&self.events[self.cursor]);
        self.cursor += 1;
        true
    }

    fn view(&self) -> RunView {
        RunView {
            kind: self.runtime.kind(),
            status: self.runtime.status(),
            position: self.cursor,
            recorded: self.events.len(),
            paused: self.paused,
        }
    }
}

/// Owns a graph, its layout and at most one algorithm run, and composes them into frames.
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    graph: Graph,
    layout: ForceLayout,
    run: Option<Run>,
}

impl Session {
    #[must_use]
    pub fn new(graph: Graph, config: SessionConfig) -> Self {
        let layout = ForceLayout::from_graph(&graph, config.layout.clone());
        let mut session = Session {
            config,
            graph,
            layout,
            run: None,
        };
        session.sync_positions();
        session
    }

    /// # Errors
    ///
    /// Fails if the document does not describe a valid graph.
    pub fn load(
        document: &GraphDocument,
        options: LoadOptions,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        let graph = Graph::from_document(document, options)?;
        info!(
            "Loaded graph with {} nodes and {} edges",
            graph.node_count(),
            graph.edge_count()
        );
        Ok(Self::new(graph, config))
    }

    /// The graph with the current layout positions stored on its nodes.
    #[must_use]
    pub fn save(&self) -> GraphDocument {
        self.graph.to_document()
    }

    #[must_use]
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    #[must_use]
    pub fn layout(&self) -> &ForceLayout {
        &self.layout
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn sync_positions(&mut self) {
        let positions: Vec<(NodeId, Pos2)> = self.layout.positions().collect();
        for (node, position) in positions {
            if let Err(err) = self.graph.set_position(node, Some(position)) {
                warn!("Layout and graph disagree: {err}");
            }
        }
    }

    /// Applies one edit. On failure neither the graph nor the layout has changed.
    ///
    /// # Errors
    ///
    /// Fails if the edit names a missing node or edge, or would add a parallel edge to a simple
    /// graph.
    pub fn apply_edit(&mut self, intent: EditIntent) -> Result<EditOutcome, SessionError> {
        debug!("Applying {intent:?}");
        let outcome = match intent {
            EditIntent::AddNode { label } => EditOutcome::NodeAdded(self.graph.add_node(label)),
            EditIntent::AddEdge {
                source,
                target,
                weight,
                directed,
            } => EditOutcome::EdgeAdded(
                self.graph
                    .add_edge_with(source, target, weight, directed)?,
            ),
            EditIntent::RemoveNode(node) => {
                self.graph.remove_node(node)?;
                EditOutcome::Applied
            }
            EditIntent::RemoveEdge(edge) => {
                self.graph.remove_edge(edge)?;
                EditOutcome::Applied
            }
            EditIntent::MoveNodeManually { node, position } => {
                self.graph.node(node)?;
                self.layout.pin(node, position)?;
                self.graph.set_position(node, Some(position))?;
                return Ok(EditOutcome::Applied);
            }
            EditIntent::ReleaseNode(node) => {
                self.graph.node(node)?;
                self.layout.unpin(node)?;
                return Ok(EditOutcome::Applied);
            }
            EditIntent::SetLabel { node, label } => {
                self.graph.set_label(node, label)?;
                return Ok(EditOutcome::Applied);
            }
            EditIntent::SetStyle { node, style } => {
                self.graph.set_style(node, style)?;
                return Ok(EditOutcome::Applied);
            }
            EditIntent::SetEnabled { node, enabled } => {
                self.graph.set_enabled(node, enabled)?;
                return Ok(EditOutcome::Applied);
            }
        };
        self.layout.on_graph_changed(&self.graph);
        self.sync_positions();
        Ok(outcome)
    }

    /// Does one frame of work: a layout tick unless the layout has settled, then up to
    /// `steps_per_frame` algorithm events unless the run is paused.
    pub fn advance_frame(&mut self) -> ViewModel {
        if !self.layout.is_stable() {
            self.layout.tick();
            self.sync_positions();
        }
        if let Some(run) = &mut self.run {
            if !run.paused {
                for _ in 0..self.config.steps_per_frame {
                    if !run.advance() {
                        break;
                    }
                }
            }
        }
        self.view_model()
    }

    /// Starts `kind` on a snapshot of the current graph, replacing any earlier run.
    ///
    /// # Errors
    ///
    /// Fails with whatever [`Runtime::start`] fails with; an earlier run is then kept.
    pub fn run_algorithm(
        &mut self,
        kind: AlgorithmKind,
        start: Option<NodeId>,
    ) -> Result<(), SessionError> {
        self.run_algorithm_to(kind, start, None)
    }

    /// # Errors
    ///
    /// Fails with whatever [`Runtime::start_with_target`] fails with.
    pub fn run_algorithm_to(
        &mut self,
        kind: AlgorithmKind,
        start: Option<NodeId>,
        target: Option<NodeId>,
    ) -> Result<(), SessionError> {
        let runtime = Runtime::start_with_target(kind, &self.graph, start, target)?;
        if let Some(previous) = &mut self.run {
            previous.runtime.cancel();
        }
        self.run = Some(Run::new(runtime));
        Ok(())
    }

    fn run_mut(&mut self) -> Result<&mut Run, SessionError> {
        self.run.as_mut().ok_or(SessionError::NoAlgorithm)
    }

    /// # Errors
    ///
    /// Fails if no algorithm has been started.
    pub fn pause(&mut self) -> Result<(), SessionError> {
        self.run_mut()?.paused = true;
        Ok(())
    }

    /// # Errors
    ///
    /// Fails if no algorithm has been started.
    pub fn resume(&mut self) -> Result<(), SessionError> {
        self.run_mut()?.paused = false;
        Ok(())
    }

    /// Rebuilds the highlights from the first `position` recorded events and pauses the run.
    ///
    /// # Errors
    ///
    /// Fails if no algorithm has been started or fewer than `position` events are recorded.
    pub fn scrub_to(&mut self, position: usize) -> Result<(), SessionError> {
        let run = self.run_mut()?;
        if position > run.events.len() {
            return Err(SessionError::ScrubOutOfRange {
                requested: position,
                recorded: run.events.len(),
            });
        }
        let mut highlights = HighlightState::default();
        for event in &run.events[..position] {
            highlights.apply(event);
        }
        debug!("Scrubbed to {position} of {}", run.events.len());
        run.highlights = highlights;
        run.cursor = position;
        run.paused = true;
        Ok(())
    }

    /// Stops the run. Recorded events and highlights stay available for scrubbing.
    ///
    /// # Errors
    ///
    /// Fails if no algorithm has been started.
    pub fn cancel(&mut self) -> Result<(), SessionError> {
        self.run_mut()?.runtime.cancel();
        Ok(())
    }

    /// Events recorded by the current run.
    #[must_use]
    pub fn events(&self) -> &[Event] {
        self.run
            .as_ref()
            .map(|run| run.events.as_slice())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn view_model(&self) -> ViewModel {
        ViewModel::compose(
            &self.graph,
            &self.layout,
            self.run.as_ref().map(|run| &run.highlights),
            self.run.as_ref().map(Run::view),
        )
    }
}

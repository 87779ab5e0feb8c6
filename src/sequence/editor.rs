//! Interactive editing of a sequence graph.
//!
//! Structural edits (adding or removing nodes and edges) re-run the layout
//! and report bounds for a viewport fit. Attribute edits leave positions
//! alone.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::SequenceError;

use super::layout::{Bounds, bounds, layout};
use super::model::{
    CONDITION_HANDLES, OUT_HANDLE, START_ID, SequenceGraph, StepEdge, StepKind, StepNode, WaitDays,
};
use super::parser::parse_cadence;

/// Result of an edit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditOutcome {
    /// Whether positions were recomputed.
    pub relayout: bool,
    /// Bounds to fit the viewport to, set only after a re-layout.
    pub fit_view: Option<Bounds>,
}

impl EditOutcome {
    fn attribute_only() -> Self {
        Self {
            relayout: false,
            fit_view: None,
        }
    }
}

/// A connection request from the canvas.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub source: String,
    pub target: String,
    #[serde(default, alias = "source_handle")]
    pub source_handle: Option<String>,
}

/// A structural problem the editor tolerates but reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphIssue {
    pub node_id: String,
    pub message: String,
}

/// One row of the flattened sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRow {
    pub step_order: u32,
    pub step_type: StepKind,
    pub wait_days: u32,
    pub content: String,
}

/// Owns a laid-out graph and applies edits to it.
#[derive(Debug, Clone, Default)]
pub struct SequenceEditor {
    graph: SequenceGraph,
}

impl SequenceGraph {
    /// Parse a cadence description and lay it out.
    pub fn from_cadence(text: &str) -> Self {
        let mut graph = parse_cadence(text);
        layout(&mut graph);
        graph
    }
}

impl SequenceEditor {
    pub fn new(graph: SequenceGraph) -> Self {
        Self { graph }
    }

    pub fn from_cadence(text: &str) -> Self {
        Self::new(SequenceGraph::from_cadence(text))
    }

    pub fn graph(&self) -> &SequenceGraph {
        &self.graph
    }

    pub fn into_graph(self) -> SequenceGraph {
        self.graph
    }

    fn relayout(&mut self) -> EditOutcome {
        layout(&mut self.graph);
        EditOutcome {
            relayout: true,
            fit_view: bounds(self.graph.nodes()),
        }
    }

    fn require_node(&self, id: &str) -> Result<&StepNode, SequenceError> {
        self.graph
            .node(id)
            .ok_or_else(|| SequenceError::NodeNotFound(id.to_string()))
    }

    /// Insert a node dropped from the palette. Returns its id.
    pub fn drop_node(&mut self, kind: StepKind) -> Result<(String, EditOutcome), SequenceError> {
        if kind == StepKind::Start {
            return Err(SequenceError::StartNode("be added twice"));
        }
        let wait = match kind {
            StepKind::Condition => WaitDays::Days(0),
            _ => WaitDays::Days(1),
        };
        let id = self.graph.push_step(kind, kind.placeholder(), wait);
        info!(node_id = %id, kind = %kind, "Dropped sequence node");
        Ok((id, self.relayout()))
    }

    /// Connect two nodes. Returns the new edge id.
    ///
    /// Each output handle carries at most one edge. Condition nodes must use
    /// a `true`/`false` handle; when none is given, the first free branch is
    /// taken.
    pub fn connect(&mut self, connection: &Connection) -> Result<(String, EditOutcome), SequenceError> {
        let source = self.require_node(&connection.source)?;
        let source_kind = source.kind;
        self.require_node(&connection.target)?;

        if connection.source == connection.target {
            return Err(SequenceError::SelfLoop {
                node_id: connection.source.clone(),
            });
        }
        if connection.target == START_ID {
            return Err(SequenceError::StartNode("have incoming edges"));
        }
        if self
            .graph
            .edges
            .iter()
            .any(|e| e.source == connection.source && e.target == connection.target)
        {
            return Err(SequenceError::DuplicateEdge {
                source_id: connection.source.clone(),
                target_id: connection.target.clone(),
            });
        }

        let handle = self.resolve_handle(&connection.source, source_kind, connection.source_handle.as_deref())?;
        let edge = StepEdge::new(&connection.source, &handle, &connection.target);
        let id = edge.id.clone();
        self.graph.edges.push(edge);
        info!(edge_id = %id, handle = %handle, "Connected sequence nodes");
        Ok((id, self.relayout()))
    }

    fn resolve_handle(
        &self,
        node_id: &str,
        kind: StepKind,
        requested: Option<&str>,
    ) -> Result<String, SequenceError> {
        let in_use = |handle: &str| self.graph.outgoing(node_id).any(|e| e.source_handle == handle);
        let valid = kind.output_handles();

        let handle = match requested {
            Some(h) if valid.contains(&h) => h,
            Some(h) => {
                return Err(SequenceError::InvalidHandle {
                    node_id: node_id.to_string(),
                    handle: h.to_string(),
                });
            }
            None => valid.iter().copied().find(|&h| !in_use(h)).unwrap_or(valid[0]),
        };

        if in_use(handle) {
            return Err(SequenceError::HandleInUse {
                node_id: node_id.to_string(),
                handle: handle.to_string(),
            });
        }
        Ok(handle.to_string())
    }

    /// Remove a node and every edge touching it.
    pub fn delete_node(&mut self, id: &str) -> Result<EditOutcome, SequenceError> {
        if id == START_ID {
            return Err(SequenceError::StartNode("be deleted"));
        }
        self.require_node(id)?;
        self.graph.nodes.retain(|n| n.id != id);
        let before = self.graph.edges.len();
        self.graph.edges.retain(|e| e.source != id && e.target != id);
        info!(node_id = %id, removed_edges = before - self.graph.edges.len(), "Deleted sequence node");
        Ok(self.relayout())
    }

    pub fn delete_edge(&mut self, id: &str) -> Result<EditOutcome, SequenceError> {
        if self.graph.edge(id).is_none() {
            return Err(SequenceError::EdgeNotFound(id.to_string()));
        }
        self.graph.edges.retain(|e| e.id != id);
        info!(edge_id = %id, "Deleted sequence edge");
        Ok(self.relayout())
    }

    /// Change a step's delay. Positions are left as they are.
    pub fn set_wait(&mut self, id: &str, wait: WaitDays) -> Result<EditOutcome, SequenceError> {
        if id == START_ID {
            return Err(SequenceError::StartNode("have a delay"));
        }
        let node = self
            .graph
            .node_mut(id)
            .ok_or_else(|| SequenceError::NodeNotFound(id.to_string()))?;
        node.wait_days = wait;
        debug!(node_id = %id, wait = %wait, "Updated step delay");
        Ok(EditOutcome::attribute_only())
    }

    pub fn set_details(&mut self, id: &str, details: &str) -> Result<EditOutcome, SequenceError> {
        let node = self
            .graph
            .node_mut(id)
            .ok_or_else(|| SequenceError::NodeNotFound(id.to_string()))?;
        node.details = details.to_string();
        debug!(node_id = %id, "Updated step details");
        Ok(EditOutcome::attribute_only())
    }

    /// Report condition nodes with a missing branch and nodes the start
    /// node cannot reach.
    pub fn validate(&self) -> Vec<GraphIssue> {
        let mut issues = Vec::new();

        for node in self.graph.nodes().iter().filter(|n| n.kind == StepKind::Condition) {
            for handle in CONDITION_HANDLES {
                if !self.graph.outgoing(&node.id).any(|e| e.source_handle == handle) {
                    issues.push(GraphIssue {
                        node_id: node.id.clone(),
                        message: format!("Condition has no '{handle}' branch"),
                    });
                }
            }
        }

        let reachable = self.reachable_from_start();
        for node in self.graph.nodes() {
            if !reachable.contains(&node.id.as_str()) {
                issues.push(GraphIssue {
                    node_id: node.id.clone(),
                    message: "Step is not connected to the start".to_string(),
                });
            }
        }

        issues
    }

    fn reachable_from_start(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = vec![START_ID];
        let mut stack = vec![START_ID];
        while let Some(id) = stack.pop() {
            for edge in self.graph.edges().iter().filter(|e| e.source == id) {
                if !seen.contains(&edge.target.as_str()) {
                    seen.push(edge.target.as_str());
                    stack.push(edge.target.as_str());
                }
            }
        }
        seen
    }

    /// Flatten the path from the start node into ordered step rows.
    ///
    /// Condition nodes follow their `true` branch. Stops on a revisit.
    pub fn linear_steps(&self) -> Vec<StepRow> {
        let mut rows = Vec::new();
        let mut visited = vec![START_ID.to_string()];
        let mut current = START_ID.to_string();

        loop {
            let Some(node) = self.graph.node(&current) else {
                break;
            };
            let preferred = match node.kind {
                StepKind::Condition => CONDITION_HANDLES[0],
                _ => OUT_HANDLE,
            };
            let next = self
                .graph
                .outgoing(&current)
                .find(|e| e.source_handle == preferred)
                .or_else(|| self.graph.outgoing(&current).next());
            let Some(edge) = next else {
                break;
            };
            if visited.contains(&edge.target) {
                break;
            }
            let Some(step) = self.graph.node(&edge.target) else {
                break;
            };

            rows.push(StepRow {
                step_order: rows.len() as u32 + 1,
                step_type: step.kind,
                wait_days: step.wait_days.as_days(),
                content: step.details.clone(),
            });
            visited.push(step.id.clone());
            current = step.id.clone();
        }

        rows
    }
}

//! Sequence graph model — typed step nodes joined by handle-addressed edges.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Node id of the single entry node.
pub const START_ID: &str = "start";

/// Output handle of every non-condition node.
pub const OUT_HANDLE: &str = "out";

/// Input handle of every non-start node.
pub const IN_HANDLE: &str = "in";

/// Branch handles of a condition node.
pub const CONDITION_HANDLES: [&str; 2] = ["true", "false"];

/// What a step does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    Start,
    Email,
    Call,
    Linkedin,
    Wait,
    Condition,
}

impl StepKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Email => "email",
            Self::Call => "call",
            Self::Linkedin => "linkedin",
            Self::Wait => "wait",
            Self::Condition => "condition",
        }
    }

    /// Display label shown on the node.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Start => "Start",
            Self::Email => "Email",
            Self::Call => "Call",
            Self::Linkedin => "LinkedIn",
            Self::Wait => "Wait",
            Self::Condition => "Condition",
        }
    }

    /// Placeholder details for a node dropped from the palette.
    pub fn placeholder(&self) -> &'static str {
        match self {
            Self::Start => "Sequence start",
            Self::Email => "Write your email...",
            Self::Call => "Add call talking points...",
            Self::Linkedin => "Write your LinkedIn message...",
            Self::Wait => "Pause before the next step",
            Self::Condition => "If the contact replied",
        }
    }

    /// Output handles this kind exposes.
    pub fn output_handles(&self) -> &'static [&'static str] {
        match self {
            Self::Condition => &CONDITION_HANDLES,
            _ => &[OUT_HANDLE],
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Delay before a step runs.
///
/// Serialized as `"immediate"` or a plain day count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WaitDays {
    #[default]
    Immediate,
    Days(u32),
}

impl WaitDays {
    /// Day count, with `Immediate` as zero.
    pub fn as_days(&self) -> u32 {
        match self {
            Self::Immediate => 0,
            Self::Days(n) => *n,
        }
    }
}

impl fmt::Display for WaitDays {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Immediate => write!(f, "immediate"),
            Self::Days(1) => write!(f, "1 day"),
            Self::Days(n) => write!(f, "{n} days"),
        }
    }
}

impl Serialize for WaitDays {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Immediate => serializer.serialize_str("immediate"),
            Self::Days(n) => serializer.serialize_u32(*n),
        }
    }
}

impl<'de> Deserialize<'de> for WaitDays {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Days(u32),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Days(n) => Ok(Self::Days(n)),
            Repr::Text(s) if s.trim().eq_ignore_ascii_case("immediate") => Ok(Self::Immediate),
            Repr::Text(s) => s
                .trim()
                .parse()
                .map(Self::Days)
                .map_err(|_| serde::de::Error::custom(format!("invalid wait value '{s}'"))),
        }
    }
}

/// Top-left corner of a laid-out node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// One step in the sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepNode {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: StepKind,
    pub label: String,
    pub details: String,
    pub wait_days: WaitDays,
    #[serde(default)]
    pub position: Position,
}

impl StepNode {
    pub fn new(id: impl Into<String>, kind: StepKind, details: impl Into<String>, wait_days: WaitDays) -> Self {
        Self {
            id: id.into(),
            kind,
            label: kind.label().to_string(),
            details: details.into(),
            wait_days,
            position: Position::default(),
        }
    }

    pub fn start() -> Self {
        Self::new(START_ID, StepKind::Start, StepKind::Start.placeholder(), WaitDays::Immediate)
    }
}

/// Directed connection between two node handles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(alias = "source_handle")]
    pub source_handle: String,
    #[serde(alias = "target_handle")]
    pub target_handle: String,
}

impl StepEdge {
    pub fn new(source: &str, source_handle: &str, target: &str) -> Self {
        Self {
            id: format!("e-{source}-{target}"),
            source: source.to_string(),
            target: target.to_string(),
            source_handle: source_handle.to_string(),
            target_handle: IN_HANDLE.to_string(),
        }
    }
}

/// A sequence graph. Always holds exactly one start node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SequenceGraph {
    pub(crate) nodes: Vec<StepNode>,
    pub(crate) edges: Vec<StepEdge>,
    #[serde(skip)]
    pub(crate) next_step: u32,
}

impl Default for SequenceGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SequenceGraph {
    /// Graph holding only the start node.
    pub fn new() -> Self {
        Self {
            nodes: vec![StepNode::start()],
            edges: Vec::new(),
            next_step: 1,
        }
    }

    pub fn nodes(&self) -> &[StepNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[StepEdge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&StepNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub(crate) fn node_mut(&mut self, id: &str) -> Option<&mut StepNode> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&StepEdge> {
        self.edges.iter().find(|e| e.id == id)
    }

    /// Edges leaving `node_id`.
    pub fn outgoing<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a StepEdge> + 'a {
        self.edges.iter().filter(move |e| e.source == node_id)
    }

    /// Allocate the next `step-N` id.
    pub(crate) fn next_step_id(&mut self) -> String {
        let id = format!("step-{}", self.next_step);
        self.next_step += 1;
        id
    }

    /// Append a step node and return its id.
    pub(crate) fn push_step(&mut self, kind: StepKind, details: impl Into<String>, wait_days: WaitDays) -> String {
        let id = self.next_step_id();
        self.nodes.push(StepNode::new(id.clone(), kind, details, wait_days));
        id
    }
}

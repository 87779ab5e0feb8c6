//! Sequence builder — cadence text to a laid-out flow graph, plus the
//! edit operations the canvas performs on it.

pub mod editor;
pub mod layout;
pub mod model;
pub mod parser;
pub mod routes;

pub use editor::{Connection, EditOutcome, GraphIssue, SequenceEditor, StepRow};
pub use layout::Bounds;
pub use model::{Position, SequenceGraph, StepEdge, StepKind, StepNode, WaitDays};
pub use parser::{PENDING, parse_cadence};

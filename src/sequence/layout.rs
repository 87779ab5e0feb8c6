//! Hierarchical top-to-bottom layout.
//!
//! Ranks come from the longest path over the graph with back edges removed.
//! Edges spanning several ranks are split by virtual nodes so every node has
//! its predecessors one rank up. Each node is placed under the mean x of its
//! predecessors, then pushed apart from its row neighbours. The first rank is
//! centred on x = 0. Only positions change.

use std::collections::HashMap;

use serde::Serialize;

use super::model::{Position, SequenceGraph, StepNode};

pub const NODE_WIDTH: f64 = 250.0;
pub const NODE_HEIGHT: f64 = 80.0;
/// Vertical gap between ranks.
pub const RANK_SEP: f64 = 80.0;
/// Horizontal gap between nodes in one rank.
pub const NODE_SEP: f64 = 50.0;

/// Bounding box of laid-out nodes, used to fit the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// Bounds of `nodes`, or `None` when empty.
pub fn bounds(nodes: &[StepNode]) -> Option<Bounds> {
    let first = nodes.first()?;
    let mut b = Bounds {
        min_x: first.position.x,
        min_y: first.position.y,
        max_x: first.position.x + NODE_WIDTH,
        max_y: first.position.y + NODE_HEIGHT,
    };
    for node in &nodes[1..] {
        b.min_x = b.min_x.min(node.position.x);
        b.min_y = b.min_y.min(node.position.y);
        b.max_x = b.max_x.max(node.position.x + NODE_WIDTH);
        b.max_y = b.max_y.max(node.position.y + NODE_HEIGHT);
    }
    Some(b)
}

/// Recompute every node position.
pub fn layout(graph: &mut SequenceGraph) {
    let n = graph.nodes.len();
    if n == 0 {
        return;
    }

    let index: HashMap<&str, usize> = graph
        .nodes
        .iter()
        .enumerate()
        .map(|(i, node)| (node.id.as_str(), i))
        .collect();

    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); n];
    for edge in &graph.edges {
        if let (Some(&s), Some(&t)) = (index.get(edge.source.as_str()), index.get(edge.target.as_str())) {
            successors[s].push(t);
        }
    }

    let (order, forward) = acyclic_order(&successors);
    let ranks = longest_path_ranks(&order, &forward, n);
    let positions = place(&ranks, &forward, n);

    for (node, position) in graph.nodes.iter_mut().zip(positions) {
        node.position = position;
    }
    tracing::debug!(
        nodes = n,
        edges = graph.edges.len(),
        ranks = ranks.iter().max().map_or(0, |r| r + 1),
        "Laid out sequence graph"
    );
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Unvisited,
    OnStack,
    Done,
}

/// Topological order plus the forward edges (back edges dropped).
fn acyclic_order(successors: &[Vec<usize>]) -> (Vec<usize>, Vec<Vec<usize>>) {
    let n = successors.len();
    let mut marks = vec![Mark::Unvisited; n];
    let mut forward: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut postorder = Vec::with_capacity(n);

    for root in 0..n {
        visit(root, successors, &mut marks, &mut forward, &mut postorder);
    }

    postorder.reverse();
    (postorder, forward)
}

fn visit(
    idx: usize,
    successors: &[Vec<usize>],
    marks: &mut [Mark],
    forward: &mut [Vec<usize>],
    postorder: &mut Vec<usize>,
) {
    if marks[idx] != Mark::Unvisited {
        return;
    }
    marks[idx] = Mark::OnStack;
    for &next in &successors[idx] {
        if marks[next] == Mark::OnStack {
            continue;
        }
        forward[idx].push(next);
        visit(next, successors, marks, forward, postorder);
    }
    marks[idx] = Mark::Done;
    postorder.push(idx);
}

fn longest_path_ranks(order: &[usize], forward: &[Vec<usize>], n: usize) -> Vec<usize> {
    let mut ranks = vec![0usize; n];
    for &idx in order {
        for &next in &forward[idx] {
            ranks[next] = ranks[next].max(ranks[idx] + 1);
        }
    }
    ranks
}

/// Assign coordinates rank by rank; returns positions for the real nodes only.
fn place(ranks: &[usize], forward: &[Vec<usize>], n: usize) -> Vec<Position> {
    let mut layer_rank = ranks.to_vec();
    let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (idx, targets) in forward.iter().enumerate() {
        for &t in targets {
            let mut prev = idx;
            for rank in ranks[idx] + 1..ranks[t] {
                let virtual_node = layer_rank.len();
                layer_rank.push(rank);
                predecessors.push(vec![prev]);
                prev = virtual_node;
            }
            predecessors[t].push(prev);
        }
    }

    let total = layer_rank.len();
    let max_rank = layer_rank.iter().copied().max().unwrap_or(0);
    let mut rows: Vec<Vec<usize>> = vec![Vec::new(); max_rank + 1];
    for (idx, &rank) in layer_rank.iter().enumerate() {
        rows[rank].push(idx);
    }

    let mut centers = vec![0.0f64; total];
    for row in &rows {
        let desired: Vec<(f64, usize)> = row
            .iter()
            .map(|&idx| {
                let preds = &predecessors[idx];
                let x = if preds.is_empty() {
                    0.0
                } else {
                    preds.iter().map(|&p| centers[p]).sum::<f64>() / preds.len() as f64
                };
                (x, idx)
            })
            .collect();
        for (idx, center) in spread(desired) {
            centers[idx] = center;
        }
    }

    (0..n)
        .map(|idx| Position {
            x: centers[idx] - NODE_WIDTH / 2.0,
            y: layer_rank[idx] as f64 * (NODE_HEIGHT + RANK_SEP),
        })
        .collect()
}

/// Order one row by desired center and separate overlapping nodes.
///
/// The row is shifted afterwards so its mean center matches the mean desired
/// center.
fn spread(mut desired: Vec<(f64, usize)>) -> Vec<(usize, f64)> {
    desired.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

    let mut placed: Vec<(usize, f64)> = Vec::with_capacity(desired.len());
    for &(want, idx) in &desired {
        let center = match placed.last() {
            Some(&(_, prev)) => want.max(prev + NODE_WIDTH + NODE_SEP),
            None => want,
        };
        placed.push((idx, center));
    }

    let count = desired.len().max(1) as f64;
    let shift = desired.iter().map(|d| d.0).sum::<f64>() / count - placed.iter().map(|p| p.1).sum::<f64>() / count;
    for entry in &mut placed {
        entry.1 += shift;
    }
    placed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::model::{OUT_HANDLE, StepEdge, StepKind, WaitDays};
    use crate::sequence::parser::parse_cadence;

    fn laid_out(text: &str) -> SequenceGraph {
        let mut graph = parse_cadence(text);
        layout(&mut graph);
        graph
    }

    #[test]
    fn chain_stacks_vertically() {
        let graph = laid_out("Day 1: Email, Day 3: Call, Day 5: LinkedIn connect");
        let ys: Vec<f64> = graph.nodes().iter().map(|n| n.position.y).collect();
        assert_eq!(ys, vec![0.0, 160.0, 320.0, 480.0]);
        for node in graph.nodes() {
            assert_eq!(node.position.x, -NODE_WIDTH / 2.0);
        }
    }

    #[test]
    fn layout_is_deterministic() {
        let a = laid_out("Day 1: Email, Day 2: Call");
        let b = laid_out("Day 1: Email, Day 2: Call");
        assert_eq!(a, b);
    }

    #[test]
    fn layout_leaves_data_untouched() {
        let before = parse_cadence("Day 1: Email, Day 4: Call");
        let mut after = before.clone();
        layout(&mut after);
        assert_eq!(before.edges(), after.edges());
        for (a, b) in before.nodes().iter().zip(after.nodes()) {
            assert_eq!((&a.id, a.kind, &a.details, a.wait_days), (&b.id, b.kind, &b.details, b.wait_days));
        }
    }

    #[test]
    fn branches_share_a_rank_side_by_side() {
        let mut graph = SequenceGraph::new();
        let cond = graph.push_step(StepKind::Condition, "If replied", WaitDays::Days(0));
        let yes = graph.push_step(StepKind::Email, "Thanks", WaitDays::Days(1));
        let no = graph.push_step(StepKind::Call, "Call", WaitDays::Days(1));
        graph.edges.push(StepEdge::new("start", OUT_HANDLE, &cond));
        graph.edges.push(StepEdge::new(&cond, "true", &yes));
        graph.edges.push(StepEdge::new(&cond, "false", &no));
        layout(&mut graph);

        let yes_pos = graph.node(&yes).unwrap().position;
        let no_pos = graph.node(&no).unwrap().position;
        assert_eq!(yes_pos.y, no_pos.y);
        assert_eq!(no_pos.x - yes_pos.x, NODE_WIDTH + NODE_SEP);
    }

    #[test]
    fn child_sits_under_its_parents() {
        let mut graph = SequenceGraph::new();
        let left = graph.push_step(StepKind::Email, "Left", WaitDays::Days(1));
        let right = graph.push_step(StepKind::Call, "Right", WaitDays::Days(1));
        graph.edges.push(StepEdge::new("start", OUT_HANDLE, &left));
        layout(&mut graph);
        let before = graph.node(&left).unwrap().position;

        // A second parent on the first rank pulls the child between both.
        graph.edges.push(StepEdge::new(&right, OUT_HANDLE, &left));
        layout(&mut graph);
        let after = graph.node(&left).unwrap().position;
        let start_x = graph.node("start").unwrap().position.x;
        let right_x = graph.node(&right).unwrap().position.x;
        assert_eq!(after.y, before.y);
        assert_ne!(after.x, before.x);
        assert_eq!(after.x, (start_x + right_x) / 2.0);
    }

    #[test]
    fn long_edge_reserves_a_slot() {
        let mut graph = parse_cadence("Day 1: Email, Day 3: Call");
        layout(&mut graph);
        let before: Vec<Position> = graph.nodes().iter().map(|n| n.position).collect();

        graph.edges.push(StepEdge::new("start", "true", "step-2"));
        layout(&mut graph);
        let after: Vec<Position> = graph.nodes().iter().map(|n| n.position).collect();
        assert_ne!(before, after);
        assert_eq!(after[2].y, before[2].y, "ranks are unchanged");
        assert!(after[1].x < before[1].x, "step-1 makes room for the long edge");
    }

    #[test]
    fn cycles_do_not_hang() {
        let mut graph = parse_cadence("Day 1: Email, Day 2: Call");
        graph.edges.push(StepEdge::new("step-2", OUT_HANDLE, "step-1"));
        layout(&mut graph);
        assert!(graph.node("step-2").unwrap().position.y > graph.node("step-1").unwrap().position.y);
    }

    #[test]
    fn bounds_cover_all_nodes() {
        let graph = laid_out("Day 1: Email, Day 3: Call");
        let b = bounds(graph.nodes()).unwrap();
        assert_eq!(b.width(), NODE_WIDTH);
        assert_eq!(b.height(), 2.0 * (NODE_HEIGHT + RANK_SEP) + NODE_HEIGHT);
        assert!(bounds(&[]).is_none());
    }
}

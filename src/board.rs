use crate::game::GameError;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::fmt;

/// Opaque node identifier on the board graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Query contract the game engine needs from a board provider.
///
/// Implementations must describe a connected, undirected graph whose node set
/// does not change while a game is running.
pub trait Board: Send + Sync {
    fn node_count(&self) -> usize;

    fn contains(&self, node: NodeId) -> bool;

    /// Nodes sharing an edge with `node`, in a stable order
    fn neighbors(&self, node: NodeId) -> &[NodeId];

    /// Shortest path from `from` to `to`, both endpoints included
    fn shortest_path(&self, from: NodeId, to: NodeId) -> Result<Vec<NodeId>, GameError>;

    fn is_adjacent(&self, a: NodeId, b: NodeId) -> bool {
        self.neighbors(a).contains(&b)
    }

    /// Path length counted in nodes, so a node is at distance 1 from itself
    fn distance(&self, from: NodeId, to: NodeId) -> Result<usize, GameError> {
        Ok(self.shortest_path(from, to)?.len())
    }
}

/// Adjacency-list board over nodes `0..n`
#[derive(Debug, Clone)]
pub struct GraphBoard {
    adjacency: Vec<Vec<NodeId>>,
}

impl GraphBoard {
    /// Create a board with `node_count` isolated nodes
    pub fn new(node_count: usize) -> Self {
        GraphBoard {
            adjacency: vec![Vec::new(); node_count],
        }
    }

    /// Build a 4-connected `rows` x `cols` grid.
    ///
    /// Cell `(r, c)` is labelled `r * cols + c`.
    pub fn grid(rows: usize, cols: usize) -> Self {
        let mut board = GraphBoard::new(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                let node = r * cols + c;
                if r + 1 < rows {
                    board.connect(node, node + cols);
                }
                if c + 1 < cols {
                    board.connect(node, node + 1);
                }
            }
        }
        board
    }

    fn connect(&mut self, a: usize, b: usize) {
        if !self.adjacency[a].contains(&NodeId(b)) {
            self.adjacency[a].push(NodeId(b));
            self.adjacency[b].push(NodeId(a));
        }
    }

    /// Add an undirected edge between two existing nodes
    pub fn add_edge(&mut self, a: NodeId, b: NodeId) -> Result<(), GameError> {
        for node in [a, b] {
            if !self.contains(node) {
                return Err(GameError::UnknownNode(node));
            }
        }
        if a == b {
            return Err(GameError::InvalidSetup(format!("self-loop on node {}", a)));
        }
        self.connect(a.0, b.0);
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        if self.adjacency.is_empty() {
            return false;
        }

        let mut seen = HashSet::from([NodeId(0)]);
        let mut queue = VecDeque::from([NodeId(0)]);
        while let Some(node) = queue.pop_front() {
            for &next in &self.adjacency[node.0] {
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        seen.len() == self.adjacency.len()
    }
}

impl Board for GraphBoard {
    fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    fn contains(&self, node: NodeId) -> bool {
        node.0 < self.adjacency.len()
    }

    fn neighbors(&self, node: NodeId) -> &[NodeId] {
        self.adjacency.get(node.0).map(Vec::as_slice).unwrap_or(&[])
    }

    fn shortest_path(&self, from: NodeId, to: NodeId) -> Result<Vec<NodeId>, GameError> {
        for node in [from, to] {
            if !self.contains(node) {
                return Err(GameError::UnknownNode(node));
            }
        }

        let mut parent: Vec<Option<NodeId>> = vec![None; self.adjacency.len()];
        let mut visited = vec![false; self.adjacency.len()];
        let mut queue = VecDeque::from([from]);
        visited[from.0] = true;

        while let Some(node) = queue.pop_front() {
            if node == to {
                let mut path = vec![to];
                let mut current = to;
                while let Some(prev) = parent[current.0] {
                    path.push(prev);
                    current = prev;
                }
                path.reverse();
                return Ok(path);
            }
            for &next in &self.adjacency[node.0] {
                if !visited[next.0] {
                    visited[next.0] = true;
                    parent[next.0] = Some(node);
                    queue.push_back(next);
                }
            }
        }

        Err(GameError::NoPath { from, to })
    }
}

/// Breadth-first placement of `count` agents around `base`.
///
/// The base itself is the first spot. Fewer than `count` positions come back
/// when the reachable component is smaller than the roster.
pub fn spawn_positions(board: &dyn Board, base: NodeId, count: usize) -> Vec<NodeId> {
    let mut visited = HashSet::new();
    let mut queue = VecDeque::from([base]);
    let mut order = Vec::with_capacity(count);

    while order.len() < count {
        let Some(node) = queue.pop_front() else {
            break;
        };
        if visited.insert(node) {
            order.push(node);
            for &next in board.neighbors(node) {
                if !visited.contains(&next) {
                    queue.push_back(next);
                }
            }
        }
    }

    order
}

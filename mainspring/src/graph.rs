//! A directed graph with dense node indices and deterministic topological
//! sorting, used by the scheduler to order schedules.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::error::Error;
use std::fmt;

use itertools::Itertools;
use smallvec::SmallVec;

/// Failures surfaced by graph operations.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GraphError {
    /// A node index did not name a current node.
    IndicesOutOfBounds,
}

impl Error for GraphError {}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::IndicesOutOfBounds => "node index out of bounds".fmt(f),
        }
    }
}

/// A dense identifier for a graph node.
///
/// Indices are handed out contiguously from zero and are stable only between
/// mutating operations: removing a node relocates the last node into the
/// vacated index.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct NodeIndex(u32);

impl NodeIndex {
    /// The position of the node in the graph's dense index space.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The result of a topological sort.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TopologicalOrder {
    /// Sorted nodes; a proper prefix of the reachable set when cyclic.
    pub order: Vec<NodeIndex>,
    /// True when the sorted subgraph contains a directed cycle.
    pub has_cycles: bool,
}

/// A directed graph over node weights `N` and edge weights `E`.
///
/// Nodes live in a dense, contiguous index space; each node keeps an ordered
/// adjacency list of out-edges. Duplicate edges between the same ordered
/// pair of nodes are not stored.
///
/// # Examples
///
/// ```
/// use mainspring::graph::Graph;
///
/// let mut graph = Graph::<&str, ()>::new();
/// let a = graph.add_node("a");
/// let b = graph.add_node("b");
/// graph.add_edge(a, b, ()).unwrap();
///
/// let sorted = graph.topological_sort_from(a).unwrap();
/// assert_eq!(sorted.order, vec![a, b]);
/// assert!(!sorted.has_cycles);
/// ```
pub struct Graph<N, E> {
    nodes: Vec<N>,
    edges: Vec<SmallVec<[(NodeIndex, E); 4]>>,
}

impl<N, E> Default for Graph<N, E> {
    fn default() -> Self {
        Graph::new()
    }
}

impl<N, E> Graph<N, E> {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Graph {
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// The number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The number of directed edges.
    pub fn edge_count(&self) -> usize {
        self.edges.iter().map(|list| list.len()).sum()
    }

    /// Adds a node with the given weight, returning its index.
    pub fn add_node(&mut self, weight: N) -> NodeIndex {
        let index = NodeIndex(self.nodes.len() as u32);
        self.nodes.push(weight);
        self.edges.push(SmallVec::new());
        index
    }

    /// Adds the directed edge `from -> to`.
    ///
    /// Returns `Ok(false)` without storing anything when the edge already
    /// exists, and fails when either endpoint is out of bounds.
    ///
    /// # Examples
    ///
    ///```
    /// use mainspring::graph::Graph;
    ///
    /// let mut graph = Graph::<(), u32>::new();
    /// let a = graph.add_node(());
    /// let b = graph.add_node(());
    /// assert_eq!(graph.add_edge(a, b, 7), Ok(true));
    /// assert_eq!(graph.add_edge(a, b, 9), Ok(false));
    /// assert_eq!(graph.edge_count(), 1);
    ///```
    pub fn add_edge(&mut self, from: NodeIndex, to: NodeIndex, weight: E) -> Result<bool, GraphError> {
        self.check(from)?;
        self.check(to)?;
        if self.edges[from.index()].iter().any(|(target, _)| *target == to) {
            return Ok(false);
        }
        self.edges[from.index()].push((to, weight));
        Ok(true)
    }

    /// Removes node `index` and every edge incident to it, in either
    /// direction, returning the node's weight.
    ///
    /// The index space is compacted by relocation: the node that held the
    /// largest index moves into the vacated slot, and all edge targets are
    /// rewritten accordingly.
    ///
    /// # Examples
    ///
    ///```
    /// use mainspring::graph::Graph;
    ///
    /// let mut graph = Graph::<&str, ()>::new();
    /// let a = graph.add_node("a");
    /// let b = graph.add_node("b");
    /// let c = graph.add_node("c");
    /// graph.add_edge(a, c, ()).unwrap();
    ///
    /// assert_eq!(graph.remove_node(b), Ok("b"));
    /// // The last node now answers at the vacated index.
    /// assert_eq!(graph.node_weight(b), Ok(&"c"));
    /// assert!(graph.contains_edge(a, b).unwrap());
    ///```
    pub fn remove_node(&mut self, index: NodeIndex) -> Result<N, GraphError> {
        self.check(index)?;
        let relocated = NodeIndex(self.nodes.len() as u32 - 1);
        let weight = self.nodes.swap_remove(index.index());
        self.edges.swap_remove(index.index());
        for list in self.edges.iter_mut() {
            list.retain(|(target, _)| *target != index);
            for (target, _) in list.iter_mut() {
                if *target == relocated {
                    *target = index;
                }
            }
        }
        Ok(weight)
    }

    /// The targets of the node's out-edges, in insertion order.
    pub fn neighbors(&self, index: NodeIndex) -> Result<impl Iterator<Item = NodeIndex> + '_, GraphError> {
        self.check(index)?;
        Ok(self.edges[index.index()].iter().map(|(target, _)| *target))
    }

    /// The node's out-edges with their weights, in insertion order.
    pub fn edges(&self, index: NodeIndex) -> Result<&[(NodeIndex, E)], GraphError> {
        self.check(index)?;
        Ok(&self.edges[index.index()])
    }

    /// The number of out-edges of the node.
    pub fn out_degree(&self, index: NodeIndex) -> Result<usize, GraphError> {
        self.check(index)?;
        Ok(self.edges[index.index()].len())
    }

    /// True when the direct edge `from -> to` exists.
    pub fn contains_edge(&self, from: NodeIndex, to: NodeIndex) -> Result<bool, GraphError> {
        self.check(from)?;
        self.check(to)?;
        Ok(self.edges[from.index()].iter().any(|(target, _)| *target == to))
    }

    /// True when a directed path `from -> .. -> to` exists.
    ///
    /// A node reaches itself only through a non-empty path.
    pub fn contains_path(&self, from: NodeIndex, to: NodeIndex) -> Result<bool, GraphError> {
        self.check(from)?;
        self.check(to)?;
        let mut visited = vec![false; self.nodes.len()];
        let mut frontier = vec![from];
        while let Some(node) = frontier.pop() {
            for (target, _) in self.edges[node.index()].iter() {
                if *target == to {
                    return Ok(true);
                }
                if !visited[target.index()] {
                    visited[target.index()] = true;
                    frontier.push(*target);
                }
            }
        }
        Ok(false)
    }

    /// A shared borrow of the node's weight.
    pub fn node_weight(&self, index: NodeIndex) -> Result<&N, GraphError> {
        self.check(index)?;
        Ok(&self.nodes[index.index()])
    }

    /// An exclusive borrow of the node's weight.
    pub fn node_weight_mut(&mut self, index: NodeIndex) -> Result<&mut N, GraphError> {
        self.check(index)?;
        Ok(&mut self.nodes[index.index()])
    }

    /// Topologically sorts the subgraph reachable from `seed`.
    ///
    /// Kahn's algorithm over the reachable set, emitting the smallest ready
    /// index first so results are deterministic. When the reachable subgraph
    /// contains a cycle, `order` holds the acyclic prefix and `has_cycles`
    /// is set; the cycle's nodes never become ready.
    pub fn topological_sort_from(&self, seed: NodeIndex) -> Result<TopologicalOrder, GraphError> {
        self.check(seed)?;
        let mut reachable = vec![false; self.nodes.len()];
        reachable[seed.index()] = true;
        let mut frontier = vec![seed];
        while let Some(node) = frontier.pop() {
            for (target, _) in self.edges[node.index()].iter() {
                if !reachable[target.index()] {
                    reachable[target.index()] = true;
                    frontier.push(*target);
                }
            }
        }
        Ok(self.sort_within(&reachable))
    }

    /// Topologically sorts the entire graph, including disconnected parts.
    pub fn topological_sort(&self) -> TopologicalOrder {
        self.sort_within(&vec![true; self.nodes.len()])
    }

    /// Kahn's algorithm restricted to the nodes marked in `members`.
    fn sort_within(&self, members: &[bool]) -> TopologicalOrder {
        let member_count = members.iter().filter(|within| **within).count();

        // In-degrees within the subgraph; edges from non-members are absent
        // by construction for reachable sets, but are skipped regardless.
        let in_degrees = members
            .iter()
            .enumerate()
            .filter(|(_, within)| **within)
            .flat_map(|(node, _)| self.edges[node].iter())
            .filter(|(target, _)| members[target.index()])
            .map(|(target, _)| *target)
            .counts();

        let mut remaining: Vec<usize> = (0..self.nodes.len())
            .map(|node| in_degrees.get(&NodeIndex(node as u32)).copied().unwrap_or(0))
            .collect();

        let mut ready: BinaryHeap<Reverse<NodeIndex>> = (0..self.nodes.len())
            .filter(|node| members[*node] && remaining[*node] == 0)
            .map(|node| Reverse(NodeIndex(node as u32)))
            .collect();

        let mut order = Vec::with_capacity(member_count);
        while let Some(Reverse(node)) = ready.pop() {
            order.push(node);
            for (target, _) in self.edges[node.index()].iter() {
                if members[target.index()] {
                    remaining[target.index()] -= 1;
                    if remaining[target.index()] == 0 {
                        ready.push(Reverse(*target));
                    }
                }
            }
        }

        let has_cycles = order.len() < member_count;
        TopologicalOrder { order, has_cycles }
    }

    fn check(&self, index: NodeIndex) -> Result<(), GraphError> {
        if index.index() < self.nodes.len() {
            Ok(())
        } else {
            Err(GraphError::IndicesOutOfBounds)
        }
    }
}

use crate::InteractionGraph;
use serde::{Deserialize, Serialize};

/// Doubled (bidirectional) connectivity derived from a graph.
///
/// Each undirected edge {u, v} contributes both (u, v) and (v, u), so the
/// index is symmetric by construction: a pair is present iff its reverse is.
/// Pairs are dense node indices, ready to address embedding-table rows.
///
/// Also carries the unique positive edge list (one direction per undirected
/// edge), which the training loop uses as supervision pairs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeIndex {
    /// Source of each directed pair.
    sources: Vec<u32>,
    /// Target of each directed pair.
    targets: Vec<u32>,
    /// Unique undirected edges as dense-index pairs, one direction each.
    positive: Vec<(u32, u32)>,
    /// Number of nodes in the originating graph.
    num_nodes: usize,
}

impl EdgeIndex {
    /// Build the edge index from a graph.
    pub fn from_graph(graph: &InteractionGraph) -> Self {
        let num_edges = graph.num_edges();
        let mut sources = Vec::with_capacity(2 * num_edges);
        let mut targets = Vec::with_capacity(2 * num_edges);
        let mut positive = Vec::with_capacity(num_edges);

        for &(u, v) in graph.edges() {
            // Edges come from the graph, so both endpoints resolve.
            let (Some(u_dense), Some(v_dense)) = (graph.dense_index(u), graph.dense_index(v))
            else {
                continue;
            };
            let (u_dense, v_dense) = (u_dense as u32, v_dense as u32);

            positive.push((u_dense, v_dense));
            sources.push(u_dense);
            targets.push(v_dense);
            sources.push(v_dense);
            targets.push(u_dense);
        }

        Self {
            sources,
            targets,
            positive,
            num_nodes: graph.num_nodes(),
        }
    }

    /// Directed pair count (twice the undirected edge count).
    pub fn num_directed(&self) -> usize {
        self.sources.len()
    }

    /// Number of nodes in the originating graph.
    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    /// Directed sources.
    pub fn sources(&self) -> &[u32] {
        &self.sources
    }

    /// Directed targets.
    pub fn targets(&self) -> &[u32] {
        &self.targets
    }

    /// Unique positive edges (dense-index pairs, one direction each).
    pub fn positive_edges(&self) -> &[(u32, u32)] {
        &self.positive
    }

    /// Iterate directed (source, target) pairs.
    pub fn directed_pairs(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.sources
            .iter()
            .copied()
            .zip(self.targets.iter().copied())
    }

    /// Check the symmetry invariant: (u, v) present iff (v, u) present.
    pub fn is_symmetric(&self) -> bool {
        use std::collections::HashSet;
        let pairs: HashSet<(u32, u32)> = self.directed_pairs().collect();
        pairs.iter().all(|&(u, v)| pairs.contains(&(v, u)))
    }
}

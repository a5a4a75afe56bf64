use crate::{Error, Result};
use petgraph::graph::{NodeIndex, UnGraph};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

/// An undirected interaction graph over integer node IDs.
///
/// Uses petgraph's undirected graph internally for traversal. Maintains an
/// external-ID index for O(1) node lookup and a canonical edge set for O(1)
/// membership tests. Built once per experiment, immutable during training.
///
/// Node IDs are arbitrary u32 values (the benchmark uses contiguous IDs, but
/// nothing here requires it). Dense indices follow insertion order and are
/// what embedding tables and edge indexes are keyed by.
///
/// # Example
///
/// ```rust
/// use ddilink_core::InteractionGraph;
///
/// let mut graph = InteractionGraph::new();
/// graph.add_edge(0, 1);
/// graph.add_edge(0, 2);
///
/// assert_eq!(graph.num_nodes(), 3);
/// assert_eq!(graph.degree(0), 2);
/// assert!(graph.has_edge(1, 0));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionGraph {
    /// The underlying undirected graph; node weight is the external ID.
    graph: UnGraph<u32, ()>,

    /// Map from external node ID to node index.
    node_index: HashMap<u32, NodeIndex>,

    /// Canonical (min, max) edge list in insertion order.
    edges: Vec<(u32, u32)>,

    /// Canonical edge set for O(1) membership.
    #[serde(skip, default)]
    edge_set: HashSet<(u32, u32)>,
}

fn canonical(u: u32, v: u32) -> (u32, u32) {
    if u <= v {
        (u, v)
    } else {
        (v, u)
    }
}

impl Default for InteractionGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl InteractionGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self {
            graph: UnGraph::default(),
            node_index: HashMap::new(),
            edges: Vec::new(),
            edge_set: HashSet::new(),
        }
    }

    /// Create a graph with estimated capacity.
    pub fn with_capacity(nodes: usize, edges: usize) -> Self {
        Self {
            graph: UnGraph::with_capacity(nodes, edges),
            node_index: HashMap::with_capacity(nodes),
            edges: Vec::with_capacity(edges),
            edge_set: HashSet::with_capacity(edges),
        }
    }

    /// Rebuild the edge set after deserialization.
    fn rebuild_indexes(&mut self) {
        self.edge_set.clear();
        self.edge_set.extend(self.edges.iter().copied());
    }

    /// Add an undirected edge. Self-loops and duplicate edges are ignored.
    pub fn add_edge(&mut self, u: u32, v: u32) {
        if u == v {
            return;
        }
        let key = canonical(u, v);
        if self.edge_set.contains(&key) {
            return;
        }

        let u_idx = self.get_or_create_node(u);
        let v_idx = self.get_or_create_node(v);
        self.graph.add_edge(u_idx, v_idx, ());
        self.edges.push(key);
        self.edge_set.insert(key);
    }

    fn get_or_create_node(&mut self, id: u32) -> NodeIndex {
        if let Some(&idx) = self.node_index.get(&id) {
            return idx;
        }
        let idx = self.graph.add_node(id);
        self.node_index.insert(id, idx);
        idx
    }

    /// Ensure a node exists even if it has no edges.
    pub fn add_node(&mut self, id: u32) {
        self.get_or_create_node(id);
    }

    /// Load from a CSV edge list (`source,target` per line).
    ///
    /// A leading header row is tolerated; any other non-numeric record is an
    /// error.
    pub fn from_csv_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_csv_reader(BufReader::new(file))
    }

    /// Load from a CSV edge list reader.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut graph = Self::new();

        for (line, record) in csv_reader.records().enumerate() {
            let record = record?;
            if record.len() < 2 {
                return Err(Error::Parse(format!(
                    "line {}: expected 2 columns, got {}",
                    line + 1,
                    record.len()
                )));
            }

            let parsed = record[0]
                .trim()
                .parse::<u32>()
                .and_then(|u| record[1].trim().parse::<u32>().map(|v| (u, v)));

            match parsed {
                Ok((u, v)) => graph.add_edge(u, v),
                // Tolerate a "source,target" header on the first record only.
                Err(_) if line == 0 => continue,
                Err(e) => {
                    return Err(Error::Parse(format!("line {}: {}", line + 1, e)));
                }
            }
        }

        Ok(graph)
    }

    /// Save to a CSV edge list (`source,target` per line, no header).
    pub fn to_csv_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        for &(u, v) in &self.edges {
            writeln!(file, "{},{}", u, v)?;
        }
        Ok(())
    }

    /// Load from a binary snapshot (bincode).
    pub fn from_binary_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut graph: Self = bincode::deserialize_from(reader)?;
        graph.rebuild_indexes();
        Ok(graph)
    }

    /// Save to a binary snapshot (bincode).
    pub fn to_binary_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = std::io::BufWriter::new(file);
        bincode::serialize_into(&mut writer, self)?;
        Ok(())
    }

    /// Number of nodes.
    pub fn num_nodes(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of undirected edges.
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Check whether an edge exists (order-insensitive). O(1).
    pub fn has_edge(&self, u: u32, v: u32) -> bool {
        self.edge_set.contains(&canonical(u, v))
    }

    /// Canonical (min, max) edge list in insertion order.
    pub fn edges(&self) -> &[(u32, u32)] {
        &self.edges
    }

    /// External node IDs in dense-index order.
    pub fn node_ids(&self) -> Vec<u32> {
        self.graph.node_weights().copied().collect()
    }

    /// Dense index of a node (its row in embedding tables), if present.
    pub fn dense_index(&self, id: u32) -> Option<usize> {
        self.node_index.get(&id).map(|idx| idx.index())
    }

    /// External ID of the node at a dense index, if in range.
    pub fn node_id(&self, dense: usize) -> Option<u32> {
        if dense < self.graph.node_count() {
            Some(self.graph[NodeIndex::new(dense)])
        } else {
            None
        }
    }

    /// Neighbor IDs of a node. O(d). Empty for unknown nodes.
    pub fn neighbors(&self, id: u32) -> Vec<u32> {
        match self.node_index.get(&id) {
            Some(&idx) => self.graph.neighbors(idx).map(|n| self.graph[n]).collect(),
            None => vec![],
        }
    }

    /// Degree of a node. O(d). Zero for unknown nodes.
    pub fn degree(&self, id: u32) -> usize {
        match self.node_index.get(&id) {
            Some(&idx) => self.graph.neighbors(idx).count(),
            None => 0,
        }
    }

    /// Number of shared neighbors between two nodes. O(d_u + d_v).
    pub fn common_neighbors(&self, u: u32, v: u32) -> usize {
        self.common_neighbor_ids(u, v).len()
    }

    /// Shared neighbor IDs between two nodes.
    pub fn common_neighbor_ids(&self, u: u32, v: u32) -> Vec<u32> {
        let (Some(&u_idx), Some(&v_idx)) = (self.node_index.get(&u), self.node_index.get(&v))
        else {
            return vec![];
        };

        let u_set: HashSet<NodeIndex> = self.graph.neighbors(u_idx).collect();
        self.graph
            .neighbors(v_idx)
            .filter(|n| u_set.contains(n))
            .map(|n| self.graph[n])
            .collect()
    }

    /// Access the underlying petgraph for advanced operations.
    pub fn as_petgraph(&self) -> &UnGraph<u32, ()> {
        &self.graph
    }

    /// Compute statistics about the graph.
    pub fn stats(&self) -> GraphStats {
        let node_count = self.num_nodes();
        let edge_count = self.num_edges();

        let avg_degree = if node_count > 0 {
            2.0 * edge_count as f64 / node_count as f64
        } else {
            0.0
        };

        GraphStats {
            node_count,
            edge_count,
            avg_degree,
        }
    }
}

/// Statistics about an interaction graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphStats {
    /// Number of nodes.
    pub node_count: usize,
    /// Number of undirected edges.
    pub edge_count: usize,
    /// Average degree (2E / N).
    pub avg_degree: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path_graph() -> InteractionGraph {
        let mut g = InteractionGraph::new();
        g.add_edge(0, 1);
        g.add_edge(1, 2);
        g.add_edge(2, 3);
        g
    }

    #[test]
    fn test_add_edges() {
        let g = path_graph();
        assert_eq!(g.num_nodes(), 4);
        assert_eq!(g.num_edges(), 3);
    }

    #[test]
    fn test_duplicate_and_self_loop_ignored() {
        let mut g = path_graph();
        g.add_edge(1, 0); // same undirected edge
        g.add_edge(2, 2); // self-loop
        assert_eq!(g.num_edges(), 3);
        assert_eq!(g.num_nodes(), 4);
    }

    #[test]
    fn test_has_edge_symmetric() {
        let g = path_graph();
        assert!(g.has_edge(0, 1));
        assert!(g.has_edge(1, 0));
        assert!(!g.has_edge(0, 2));
    }

    #[test]
    fn test_common_neighbors() {
        let g = path_graph();
        // 0-1, 1-2, 2-3: nodes 0 and 2 share neighbor 1
        assert_eq!(g.common_neighbors(0, 2), 1);
        assert_eq!(g.common_neighbors(0, 3), 0);
    }

    #[test]
    fn test_degree() {
        let g = path_graph();
        assert_eq!(g.degree(0), 1);
        assert_eq!(g.degree(1), 2);
        assert_eq!(g.degree(42), 0);
    }

    #[test]
    fn test_dense_index_roundtrip() {
        let g = path_graph();
        for id in g.node_ids() {
            let dense = g.dense_index(id).unwrap();
            assert_eq!(g.node_id(dense), Some(id));
        }
        assert_eq!(g.node_id(99), None);
    }

    #[test]
    fn test_csv_roundtrip() {
        let g = path_graph();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edges.csv");

        g.to_csv_file(&path).unwrap();
        let loaded = InteractionGraph::from_csv_file(&path).unwrap();

        assert_eq!(loaded.num_nodes(), 4);
        assert_eq!(loaded.num_edges(), 3);
        assert!(loaded.has_edge(2, 3));
    }

    #[test]
    fn test_csv_header_tolerated() {
        let data = "source,target\n0,1\n1,2\n";
        let g = InteractionGraph::from_csv_reader(data.as_bytes()).unwrap();
        assert_eq!(g.num_edges(), 2);
    }

    #[test]
    fn test_csv_malformed_rejected() {
        let data = "0,1\nfoo,bar\n";
        assert!(InteractionGraph::from_csv_reader(data.as_bytes()).is_err());
    }

    #[test]
    fn test_binary_roundtrip() {
        let g = path_graph();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.bin");

        g.to_binary_file(&path).unwrap();
        let loaded = InteractionGraph::from_binary_file(&path).unwrap();

        assert_eq!(loaded.num_nodes(), 4);
        assert_eq!(loaded.num_edges(), 3);
        // Edge set must be rebuilt after deserialization
        assert!(loaded.has_edge(0, 1));
        assert!(!loaded.has_edge(0, 3));
    }
}

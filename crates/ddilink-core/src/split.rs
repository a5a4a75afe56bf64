//! Train/valid/test edge partitions with fixed negative samples.
//!
//! Negative edges for valid/test are sampled once, disjoint from every edge
//! in the graph, and persisted alongside the positives so that repeated runs
//! evaluate against the same contrastive set.

use crate::{Error, InteractionGraph, Result};
use rand::prelude::*;
use rand_xorshift::XorShiftRng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// One named partition: positive edges plus (for valid/test) negatives.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SplitEdges {
    /// Positive edges (external node IDs).
    pub edges: Vec<(u32, u32)>,
    /// Negative edges (external node IDs); empty for the train partition.
    pub neg_edges: Vec<(u32, u32)>,
}

/// Configuration for generating an edge split.
#[derive(Debug, Clone, Copy)]
pub struct SplitConfig {
    /// Fraction of edges held out for validation (default: 0.1).
    pub valid_frac: f64,
    /// Fraction of edges held out for testing (default: 0.1).
    pub test_frac: f64,
    /// Negative samples per held-out partition (default: match positives).
    pub num_neg: Option<usize>,
    /// Random seed (default: 42).
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            valid_frac: 0.1,
            test_frac: 0.1,
            num_neg: None,
            seed: 42,
        }
    }
}

/// Named partitions {train, valid, test} over a graph's edges.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EdgeSplit {
    /// Training positives (no negatives).
    pub train: SplitEdges,
    /// Validation positives and fixed negatives.
    pub valid: SplitEdges,
    /// Test positives and fixed negatives.
    pub test: SplitEdges,
}

impl EdgeSplit {
    /// Generate a split from a graph.
    ///
    /// Edges are shuffled with the configured seed and partitioned by the
    /// valid/test fractions; negatives are drawn uniformly from non-edges,
    /// without duplicates, disjoint from all graph edges.
    pub fn generate(graph: &InteractionGraph, config: &SplitConfig) -> Result<Self> {
        let mut rng = XorShiftRng::seed_from_u64(config.seed);

        let mut edges: Vec<(u32, u32)> = graph.edges().to_vec();
        edges.shuffle(&mut rng);

        let n = edges.len();
        let n_valid = (n as f64 * config.valid_frac).floor() as usize;
        let n_test = (n as f64 * config.test_frac).floor() as usize;

        let valid_edges: Vec<_> = edges[..n_valid].to_vec();
        let test_edges: Vec<_> = edges[n_valid..n_valid + n_test].to_vec();
        let train_edges: Vec<_> = edges[n_valid + n_test..].to_vec();

        let n_neg_valid = config.num_neg.unwrap_or(valid_edges.len());
        let n_neg_test = config.num_neg.unwrap_or(test_edges.len());

        let valid_neg = sample_negative_edges(graph, n_neg_valid, &mut rng)?;
        let test_neg = sample_negative_edges(graph, n_neg_test, &mut rng)?;

        Ok(Self {
            train: SplitEdges {
                edges: train_edges,
                neg_edges: vec![],
            },
            valid: SplitEdges {
                edges: valid_edges,
                neg_edges: valid_neg,
            },
            test: SplitEdges {
                edges: test_edges,
                neg_edges: test_neg,
            },
        })
    }

    /// Check the invariant: no negative edge exists in the graph.
    pub fn negatives_disjoint(&self, graph: &InteractionGraph) -> bool {
        self.valid
            .neg_edges
            .iter()
            .chain(self.test.neg_edges.iter())
            .all(|&(u, v)| !graph.has_edge(u, v))
    }

    /// Save as a directory of CSV edge lists.
    ///
    /// Layout: `train.csv`, `valid.csv`, `valid_neg.csv`, `test.csv`,
    /// `test_neg.csv` (headerless `source,target` lines).
    pub fn save_dir(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        write_edge_csv(&dir.join("train.csv"), &self.train.edges)?;
        write_edge_csv(&dir.join("valid.csv"), &self.valid.edges)?;
        write_edge_csv(&dir.join("valid_neg.csv"), &self.valid.neg_edges)?;
        write_edge_csv(&dir.join("test.csv"), &self.test.edges)?;
        write_edge_csv(&dir.join("test_neg.csv"), &self.test.neg_edges)?;
        Ok(())
    }

    /// Load from a directory previously written by [`EdgeSplit::save_dir`].
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        Ok(Self {
            train: SplitEdges {
                edges: read_edge_csv(&dir.join("train.csv"))?,
                neg_edges: vec![],
            },
            valid: SplitEdges {
                edges: read_edge_csv(&dir.join("valid.csv"))?,
                neg_edges: read_edge_csv(&dir.join("valid_neg.csv"))?,
            },
            test: SplitEdges {
                edges: read_edge_csv(&dir.join("test.csv"))?,
                neg_edges: read_edge_csv(&dir.join("test_neg.csv"))?,
            },
        })
    }
}

/// Sample `count` distinct non-edges uniformly from a graph's node set.
pub fn sample_negative_edges<R: Rng>(
    graph: &InteractionGraph,
    count: usize,
    rng: &mut R,
) -> Result<Vec<(u32, u32)>> {
    let node_ids = graph.node_ids();
    let n = node_ids.len();

    // A graph this dense has no room for the requested negatives.
    let possible = n.saturating_mul(n.saturating_sub(1)) / 2 - graph.num_edges();
    if count > possible {
        return Err(Error::Parse(format!(
            "cannot sample {} negative edges, only {} non-edges exist",
            count, possible
        )));
    }

    let mut seen: HashSet<(u32, u32)> = HashSet::with_capacity(count);
    let mut result = Vec::with_capacity(count);

    while result.len() < count {
        let u = node_ids[rng.random_range(0..n)];
        let v = node_ids[rng.random_range(0..n)];
        if u == v || graph.has_edge(u, v) {
            continue;
        }
        let key = if u <= v { (u, v) } else { (v, u) };
        if seen.insert(key) {
            result.push(key);
        }
    }

    Ok(result)
}

fn write_edge_csv(path: &Path, edges: &[(u32, u32)]) -> Result<()> {
    let mut file = File::create(path)?;
    for &(u, v) in edges {
        writeln!(file, "{},{}", u, v)?;
    }
    Ok(())
}

fn read_edge_csv(path: &Path) -> Result<Vec<(u32, u32)>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)?;

    let mut edges = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        if record.len() < 2 {
            return Err(Error::Parse(format!(
                "{}: line {}: expected 2 columns",
                path.display(),
                line + 1
            )));
        }
        let u = record[0]
            .trim()
            .parse::<u32>()
            .map_err(|e| Error::Parse(format!("{}: line {}: {}", path.display(), line + 1, e)))?;
        let v = record[1]
            .trim()
            .parse::<u32>()
            .map_err(|e| Error::Parse(format!("{}: line {}: {}", path.display(), line + 1, e)))?;
        edges.push((u, v));
    }
    Ok(edges)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cycle_graph(n: u32) -> InteractionGraph {
        let mut g = InteractionGraph::new();
        for i in 0..n {
            g.add_edge(i, (i + 1) % n);
        }
        g
    }

    #[test]
    fn test_generate_partitions() {
        let g = cycle_graph(20);
        let split = EdgeSplit::generate(&g, &SplitConfig::default()).unwrap();

        assert_eq!(split.valid.edges.len(), 2);
        assert_eq!(split.test.edges.len(), 2);
        assert_eq!(split.train.edges.len(), 16);
        assert!(split.train.neg_edges.is_empty());
        assert_eq!(split.valid.neg_edges.len(), 2);
        assert_eq!(split.test.neg_edges.len(), 2);
    }

    #[test]
    fn test_negatives_disjoint_from_graph() {
        let g = cycle_graph(30);
        let config = SplitConfig {
            num_neg: Some(50),
            ..Default::default()
        };
        let split = EdgeSplit::generate(&g, &config).unwrap();

        assert!(split.negatives_disjoint(&g));
        for &(u, v) in &split.valid.neg_edges {
            assert!(!g.has_edge(u, v));
            assert_ne!(u, v);
        }
    }

    #[test]
    fn test_generation_is_reproducible() {
        let g = cycle_graph(20);
        let config = SplitConfig::default();

        let a = EdgeSplit::generate(&g, &config).unwrap();
        let b = EdgeSplit::generate(&g, &config).unwrap();

        assert_eq!(a.valid.edges, b.valid.edges);
        assert_eq!(a.valid.neg_edges, b.valid.neg_edges);
        assert_eq!(a.test.neg_edges, b.test.neg_edges);
    }

    #[test]
    fn test_save_load_roundtrip() {
        let g = cycle_graph(20);
        let split = EdgeSplit::generate(&g, &SplitConfig::default()).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("split");
        split.save_dir(&path).unwrap();

        let loaded = EdgeSplit::load_dir(&path).unwrap();
        assert_eq!(loaded.train.edges, split.train.edges);
        assert_eq!(loaded.valid.edges, split.valid.edges);
        assert_eq!(loaded.valid.neg_edges, split.valid.neg_edges);
        assert_eq!(loaded.test.neg_edges, split.test.neg_edges);
    }

    #[test]
    fn test_too_many_negatives_rejected() {
        // Triangle: 3 nodes, 3 edges, zero non-edges.
        let g = cycle_graph(3);
        let mut rng = XorShiftRng::seed_from_u64(1);
        assert!(sample_negative_edges(&g, 1, &mut rng).is_err());
    }
}

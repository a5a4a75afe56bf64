//! Heuristic neighborhood scorers.
//!
//! Stateless with respect to training: "training" just snapshots the graph,
//! and scores are deterministic functions of shared-neighbor counts. Both
//! scorers are symmetric in their arguments.

use crate::{Error, LinkPredictor, Result, TrainContext, TrainReport};
use ddilink_core::InteractionGraph;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Common-neighbors scorer: `score(u, v) = |N(u) ∩ N(v)|`.
#[derive(Default)]
pub struct CommonNeighbors {
    graph: Option<InteractionGraph>,
}

impl CommonNeighbors {
    /// Create an untrained scorer.
    pub fn new() -> Self {
        Self::default()
    }
}

impl LinkPredictor for CommonNeighbors {
    fn name(&self) -> &'static str {
        "common_neighbors"
    }

    fn train(&mut self, graph: &InteractionGraph, _ctx: &TrainContext<'_>) -> Result<TrainReport> {
        self.graph = Some(graph.clone());
        Ok(TrainReport::default())
    }

    fn score_edge(&self, u: u32, v: u32) -> Result<f32> {
        let graph = self
            .graph
            .as_ref()
            .ok_or(Error::NotTrained("common-neighbors scorer"))?;
        Ok(graph.common_neighbors(u, v) as f32)
    }

    fn save_model(&self, path: &Path) -> Result<()> {
        snapshot_graph(self.graph.as_ref(), "common-neighbors scorer", path)
    }

    fn load_model(&mut self, path: &Path) -> Result<()> {
        self.graph = Some(load_graph(path)?);
        Ok(())
    }

    fn is_trained(&self) -> bool {
        self.graph.is_some()
    }
}

/// Adamic–Adar scorer: `score(u, v) = Σ_{w ∈ N(u) ∩ N(v)} 1 / ln(deg(w))`.
///
/// Rare shared neighbors count for more than hub neighbors.
#[derive(Default)]
pub struct AdamicAdar {
    graph: Option<InteractionGraph>,
}

impl AdamicAdar {
    /// Create an untrained scorer.
    pub fn new() -> Self {
        Self::default()
    }
}

impl LinkPredictor for AdamicAdar {
    fn name(&self) -> &'static str {
        "adamic_adar"
    }

    fn train(&mut self, graph: &InteractionGraph, _ctx: &TrainContext<'_>) -> Result<TrainReport> {
        self.graph = Some(graph.clone());
        Ok(TrainReport::default())
    }

    fn score_edge(&self, u: u32, v: u32) -> Result<f32> {
        let graph = self
            .graph
            .as_ref()
            .ok_or(Error::NotTrained("adamic-adar scorer"))?;

        let score = graph
            .common_neighbor_ids(u, v)
            .into_iter()
            .map(|w| graph.degree(w))
            // A shared neighbor of distinct endpoints has degree >= 2; the
            // guard only matters when u == v.
            .filter(|&deg| deg > 1)
            .map(|deg| 1.0 / (deg as f32).ln())
            .sum();
        Ok(score)
    }

    fn save_model(&self, path: &Path) -> Result<()> {
        snapshot_graph(self.graph.as_ref(), "adamic-adar scorer", path)
    }

    fn load_model(&mut self, path: &Path) -> Result<()> {
        self.graph = Some(load_graph(path)?);
        Ok(())
    }

    fn is_trained(&self) -> bool {
        self.graph.is_some()
    }
}

fn snapshot_graph(
    graph: Option<&InteractionGraph>,
    name: &'static str,
    path: &Path,
) -> Result<()> {
    let graph = graph.ok_or(Error::NotTrained(name))?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let writer = BufWriter::new(File::create(path)?);
    bincode::serialize_into(writer, graph)?;
    Ok(())
}

fn load_graph(path: &Path) -> Result<InteractionGraph> {
    Ok(InteractionGraph::from_binary_file(path)?)
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
    fn test_common_neighbors_examples() {
        let mut model = CommonNeighbors::new();
        model.train(&path_graph(), &TrainContext::default()).unwrap();

        // 0 and 2 share neighbor 1; 0 and 3 share nothing
        assert_eq!(model.score_edge(0, 2).unwrap(), 1.0);
        assert_eq!(model.score_edge(0, 3).unwrap(), 0.0);
    }

    #[test]
    fn test_heuristics_symmetric() {
        let graph = path_graph();

        let mut cn = CommonNeighbors::new();
        cn.train(&graph, &TrainContext::default()).unwrap();
        assert_eq!(cn.score_edge(0, 2).unwrap(), cn.score_edge(2, 0).unwrap());

        let mut aa = AdamicAdar::new();
        aa.train(&graph, &TrainContext::default()).unwrap();
        assert_eq!(aa.score_edge(0, 2).unwrap(), aa.score_edge(2, 0).unwrap());
    }

    #[test]
    fn test_heuristics_deterministic() {
        let mut model = AdamicAdar::new();
        model.train(&path_graph(), &TrainContext::default()).unwrap();

        let a = model.score_edge(0, 2).unwrap();
        let b = model.score_edge(0, 2).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_adamic_adar_value() {
        let mut model = AdamicAdar::new();
        model.train(&path_graph(), &TrainContext::default()).unwrap();

        // Shared neighbor of 0 and 2 is node 1 with degree 2
        let expected = 1.0 / 2.0f32.ln();
        let score = model.score_edge(0, 2).unwrap();
        assert!((score - expected).abs() < 1e-6);
    }

    #[test]
    fn test_untrained_fails() {
        let model = CommonNeighbors::new();
        assert!(matches!(model.score_edge(0, 1), Err(Error::NotTrained(_))));
    }

    #[test]
    fn test_save_load_roundtrip_scores() {
        let mut model = CommonNeighbors::new();
        model.train(&path_graph(), &TrainContext::default()).unwrap();

        let pairs = [(0u32, 2u32), (0, 3), (1, 3)];
        let before = model.score_edges(&pairs).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cn.bin");
        model.save_model(&path).unwrap();

        let mut restored = CommonNeighbors::new();
        restored.load_model(&path).unwrap();
        let after = restored.score_edges(&pairs).unwrap();

        assert_eq!(before, after);
    }

    #[test]
    fn test_scores_unknown_nodes_as_zero() {
        let mut model = CommonNeighbors::new();
        model.train(&path_graph(), &TrainContext::default()).unwrap();
        // Nodes outside the snapshot have empty neighborhoods
        assert_eq!(model.score_edge(0, 99).unwrap(), 0.0);
    }
}

//! Edge perturbation for robustness experiments.
//!
//! Produces a modified copy of a graph with a proportion of edges removed or
//! spurious non-edges added. Perturbed graphs are written as ordinary edge
//! CSVs so the rest of the harness loads them like any dataset.

use crate::split::sample_negative_edges;
use crate::{Error, InteractionGraph, Result};
use rand::prelude::*;
use rand_xorshift::XorShiftRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Kind of perturbation applied to a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PerturbKind {
    /// Insert random non-edges.
    Add,
    /// Delete existing edges.
    Remove,
}

impl fmt::Display for PerturbKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => write!(f, "add"),
            Self::Remove => write!(f, "remove"),
        }
    }
}

impl FromStr for PerturbKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "add" => Ok(Self::Add),
            "remove" => Ok(Self::Remove),
            other => Err(Error::Parse(format!(
                "unknown perturbation kind: {other} (expected add|remove)"
            ))),
        }
    }
}

/// A perturbation setting: kind plus the proportion of edges affected.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PerturbConfig {
    /// What to do to the edges.
    pub kind: PerturbKind,
    /// Proportion of the edge count to add or remove, in [0, 1].
    pub proportion: f64,
    /// Random seed.
    pub seed: u64,
}

impl PerturbConfig {
    /// Create a config with the default seed.
    pub fn new(kind: PerturbKind, proportion: f64) -> Self {
        Self {
            kind,
            proportion,
            seed: 42,
        }
    }

    /// CSV file name carrying the setting, e.g. `remove_0.25.csv`.
    pub fn file_name(&self) -> String {
        format!("{}_{}.csv", self.kind, self.proportion)
    }

    /// Full path of the perturbation CSV under a directory.
    pub fn csv_path(&self, dir: impl AsRef<Path>) -> PathBuf {
        dir.as_ref().join(self.file_name())
    }
}

/// Produce a perturbed copy of a graph.
///
/// `Remove` deletes `round(proportion * E)` edges chosen uniformly; isolated
/// nodes are kept so dense indices stay aligned with the node set. `Add`
/// inserts the same count of uniformly-sampled non-edges.
pub fn perturb(graph: &InteractionGraph, config: &PerturbConfig) -> Result<InteractionGraph> {
    if !(0.0..=1.0).contains(&config.proportion) {
        return Err(Error::Parse(format!(
            "perturbation proportion must be in [0, 1], got {}",
            config.proportion
        )));
    }

    let mut rng = XorShiftRng::seed_from_u64(config.seed);
    let n_change = (config.proportion * graph.num_edges() as f64).round() as usize;

    match config.kind {
        PerturbKind::Remove => {
            let mut keep: Vec<(u32, u32)> = graph.edges().to_vec();
            keep.shuffle(&mut rng);
            keep.truncate(graph.num_edges() - n_change);

            let mut out = InteractionGraph::with_capacity(graph.num_nodes(), keep.len());
            // Preserve the node set (and dense ordering) of the original.
            for id in graph.node_ids() {
                out.add_node(id);
            }
            for (u, v) in keep {
                out.add_edge(u, v);
            }
            Ok(out)
        }
        PerturbKind::Add => {
            let additions = sample_negative_edges(graph, n_change, &mut rng)?;
            let mut out = graph.clone();
            for (u, v) in additions {
                out.add_edge(u, v);
            }
            Ok(out)
        }
    }
}

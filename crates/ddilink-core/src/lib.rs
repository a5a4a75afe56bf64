//! Core types for link-prediction datasets.
//!
//! This crate provides the structural layer of the harness:
//!
//! - [`InteractionGraph`] - An undirected graph over integer node IDs
//! - [`EdgeIndex`] - Doubled (bidirectional) connectivity derived from a graph
//! - [`EdgeSplit`] - Train/valid/test edge partitions with fixed negatives
//! - [`perturb`] - Edge addition/removal for robustness experiments
//! - [`algo::random_walk`] - Node2Vec-style random walks
//!
//! # Example
//!
//! ```rust
//! use ddilink_core::InteractionGraph;
//!
//! let mut graph = InteractionGraph::new();
//! graph.add_edge(0, 1);
//! graph.add_edge(1, 2);
//!
//! assert_eq!(graph.num_nodes(), 3);
//! assert_eq!(graph.num_edges(), 2);
//! assert_eq!(graph.common_neighbors(0, 2), 1);
//! ```

pub mod algo;
mod edge_index;
mod error;
mod graph;
pub mod perturb;
mod split;

pub use edge_index::EdgeIndex;
pub use error::{Error, Result};
pub use graph::{GraphStats, InteractionGraph};
pub use perturb::{PerturbConfig, PerturbKind};
pub use split::{EdgeSplit, SplitConfig, SplitEdges};

// Re-export petgraph for advanced graph operations
pub use petgraph;

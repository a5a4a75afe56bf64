//! Link predictor variants and the harness around them.
//!
//! Every edge-scoring model implements the [`LinkPredictor`] trait, a
//! model-level abstraction: each variant owns its internal representation
//! (candle tensors, flat embedding matrices, a graph snapshot) and exposes
//! the same train / score / persist contract. Trainable neural models and
//! stateless heuristics sit behind one object-safe interface rather than an
//! inheritance hierarchy.
//!
//! # Variants
//!
//! | Variant | Score | State |
//! |---------|-------|-------|
//! | [`GnnPredictor`] | sigmoid(MLP(h_u * h_v)) after message passing | embedding table + SAGE stack + MLP head |
//! | [`RandomWalkPredictor`] | sigmoid(dot(emb_u, emb_v)) | skip-gram embedding matrix |
//! | [`CommonNeighbors`] | \|N(u) ∩ N(v)\| | graph snapshot |
//! | [`AdamicAdar`] | Σ 1/ln(deg(w)) over shared w | graph snapshot |
//!
//! # Example
//!
//! ```rust,ignore
//! use ddilink_predict::{CommonNeighbors, LinkPredictor, TrainContext};
//!
//! let mut model = CommonNeighbors::new();
//! model.train(&graph, &TrainContext::default())?;
//! let score = model.score_edge(0, 2)?;
//! ```

mod error;
pub mod eval;
mod gnn;
mod neighborhood;
pub mod training;
mod walk;

pub use error::{Error, Result};
pub use eval::{hits_at_k, HitsEvaluator};
pub use gnn::GnnPredictor;
pub use neighborhood::{AdamicAdar, CommonNeighbors};
pub use training::{best_checkpoint, Checkpointer, GnnTrainConfig, WalkTrainConfig};
pub use walk::RandomWalkPredictor;

use ddilink_core::{InteractionGraph, SplitEdges};
use std::path::Path;

/// Context handed to [`LinkPredictor::train`].
#[derive(Default)]
pub struct TrainContext<'a> {
    /// Validation edges scored every epoch (Hits@20 drives checkpointing).
    pub val: Option<&'a SplitEdges>,
    /// Directory for epoch-stamped best-so-far checkpoints.
    pub checkpoint_dir: Option<&'a Path>,
}

impl<'a> TrainContext<'a> {
    /// Attach a validation edge set.
    pub fn with_validation(mut self, val: &'a SplitEdges) -> Self {
        self.val = Some(val);
        self
    }

    /// Attach a checkpoint directory.
    pub fn with_checkpoint_dir(mut self, dir: &'a Path) -> Self {
        self.checkpoint_dir = Some(dir);
        self
    }
}

/// What a training run produced, for reporting.
#[derive(Debug, Clone, Default)]
pub struct TrainReport {
    /// Mean loss per epoch (empty for models without a scalar loss).
    pub loss_history: Vec<f32>,
    /// Validation Hits@20 per epoch (empty without a validation set).
    pub val_hits: Vec<f64>,
    /// Epoch of the best validation score, if validation ran.
    pub best_epoch: Option<usize>,
    /// Best validation Hits@20, if validation ran.
    pub best_val_hits: Option<f64>,
}

/// Interchangeable edge-scoring model.
///
/// Scoring is pure given the current model state; `score_edge`/`score_edges`
/// return [`Error::NotTrained`] before `train` or `load_model` has run.
/// `save_model` followed by `load_model` on a fresh instance must reproduce
/// scores exactly.
pub trait LinkPredictor {
    /// Short variant name used in filenames and logs.
    fn name(&self) -> &'static str;

    /// Train on a graph, optionally validating and checkpointing per epoch.
    fn train(&mut self, graph: &InteractionGraph, ctx: &TrainContext<'_>) -> Result<TrainReport>;

    /// Score a single node pair.
    fn score_edge(&self, u: u32, v: u32) -> Result<f32>;

    /// Score a batch of node pairs.
    fn score_edges(&self, pairs: &[(u32, u32)]) -> Result<Vec<f32>> {
        pairs.iter().map(|&(u, v)| self.score_edge(u, v)).collect()
    }

    /// Persist the model state to a file.
    fn save_model(&self, path: &Path) -> Result<()>;

    /// Restore the model state from a file.
    fn load_model(&mut self, path: &Path) -> Result<()>;

    /// Whether the model can score edges.
    fn is_trained(&self) -> bool;
}

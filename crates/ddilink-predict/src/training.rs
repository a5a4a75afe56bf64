//! Training configuration and checkpoint bookkeeping.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Training configuration for the message-passing predictor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GnnTrainConfig {
    /// Number of training epochs (default: 500).
    pub epochs: usize,
    /// Hidden dimension of the conv layers and scoring head (default: 256).
    pub hidden_dim: usize,
    /// Number of SAGE layers (default: 2).
    pub num_layers: usize,
    /// Dropout probability (default: 0.3).
    pub dropout: f32,
    /// Learning rate (default: 3e-3).
    pub learning_rate: f64,
    /// Decoupled weight decay (default: 0.0).
    pub weight_decay: f64,
    /// Dimension of the learned node-embedding table (default: 256).
    pub node_emb_dim: usize,
    /// Positive edges per mini-batch (default: 64 * 1024).
    pub batch_size: usize,
    /// Random seed (default: 42).
    pub seed: u64,
}

impl Default for GnnTrainConfig {
    fn default() -> Self {
        Self {
            epochs: 500,
            hidden_dim: 256,
            num_layers: 2,
            dropout: 0.3,
            learning_rate: 3e-3,
            weight_decay: 0.0,
            node_emb_dim: 256,
            batch_size: 64 * 1024,
            seed: 42,
        }
    }
}

impl GnnTrainConfig {
    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_hidden_dim(mut self, dim: usize) -> Self {
        self.hidden_dim = dim;
        self
    }

    pub fn with_num_layers(mut self, layers: usize) -> Self {
        self.num_layers = layers;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_node_emb_dim(mut self, dim: usize) -> Self {
        self.node_emb_dim = dim;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Training configuration for the random-walk predictor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkTrainConfig {
    /// Embedding dimension (default: 128).
    pub embedding_dim: usize,
    /// Length of each walk (default: 40).
    pub walk_length: usize,
    /// Walks started per node (default: 10).
    pub walks_per_node: usize,
    /// Skip-gram context window, each side (default: 10).
    pub context_window: usize,
    /// Negative samples per positive pair (default: 5).
    pub negative_samples: usize,
    /// Passes over the walk corpus (default: 50).
    pub epochs: usize,
    /// Initial learning rate (default: 0.01).
    pub learning_rate: f32,
    /// Floor for the decayed learning rate (default: 1e-4).
    pub min_learning_rate: f32,
    /// Node2Vec return parameter (default: 1.0).
    pub p: f32,
    /// Node2Vec in-out parameter (default: 1.0).
    pub q: f32,
    /// Random seed (default: 42).
    pub seed: u64,
}

impl Default for WalkTrainConfig {
    fn default() -> Self {
        Self {
            embedding_dim: 128,
            walk_length: 40,
            walks_per_node: 10,
            context_window: 10,
            negative_samples: 5,
            epochs: 50,
            learning_rate: 0.01,
            min_learning_rate: 1e-4,
            p: 1.0,
            q: 1.0,
            seed: 42,
        }
    }
}

impl WalkTrainConfig {
    pub fn with_embedding_dim(mut self, dim: usize) -> Self {
        self.embedding_dim = dim;
        self
    }

    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_walks(mut self, walks_per_node: usize, walk_length: usize) -> Self {
        self.walks_per_node = walks_per_node;
        self.walk_length = walk_length;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Writes epoch-stamped checkpoint files into a directory.
///
/// File names embed the epoch (`ep12.safetensors`, `ep40.bin`) so a later
/// run can pick the best checkpoint back out with [`best_checkpoint`].
pub struct Checkpointer {
    dir: PathBuf,
    extension: &'static str,
}

impl Checkpointer {
    /// Create the directory if needed and return a checkpointer for it.
    pub fn new(dir: impl Into<PathBuf>, extension: &'static str) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir, extension })
    }

    /// Path for a given epoch's checkpoint.
    pub fn path_for(&self, epoch: usize) -> PathBuf {
        self.dir.join(format!("ep{}.{}", epoch, self.extension))
    }

    /// The checkpoint directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Find the checkpoint with the highest embedded epoch number.
///
/// Scans `dir` for files named `ep<N>.<ext>` (JSON sidecars are ignored) and
/// returns the path with maximal N. The best-so-far checkpointing policy only
/// writes on improvement, so the highest epoch is the best validation score.
pub fn best_checkpoint(dir: impl AsRef<Path>) -> Result<PathBuf> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(Error::NoCheckpoint(dir.to_path_buf()));
    }

    let mut best: Option<(usize, PathBuf)> = None;

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() || path.extension().is_some_and(|e| e == "json") {
            continue;
        }

        let Some(epoch) = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.strip_prefix("ep"))
            .and_then(|s| s.parse::<usize>().ok())
        else {
            continue;
        };

        if best.as_ref().is_none_or(|(e, _)| epoch > *e) {
            best = Some((epoch, path));
        }
    }

    best.map(|(_, path)| path)
        .ok_or_else(|| Error::NoCheckpoint(dir.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_config_builders() {
        let config = GnnTrainConfig::default()
            .with_epochs(10)
            .with_hidden_dim(64)
            .with_learning_rate(0.01);

        assert_eq!(config.epochs, 10);
        assert_eq!(config.hidden_dim, 64);
        assert!((config.learning_rate - 0.01).abs() < 1e-12);
        // Untouched fields keep their defaults
        assert_eq!(config.batch_size, 64 * 1024);
    }

    #[test]
    fn test_checkpointer_paths() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = Checkpointer::new(dir.path().join("ckpts"), "bin").unwrap();

        assert!(ckpt.dir().is_dir());
        assert_eq!(
            ckpt.path_for(42).file_name().unwrap().to_str().unwrap(),
            "ep42.bin"
        );
    }

    #[test]
    fn test_best_checkpoint_selects_max_epoch() {
        let dir = tempfile::tempdir().unwrap();
        for epoch in [3usize, 40, 7] {
            fs::write(dir.path().join(format!("ep{epoch}.safetensors")), b"x").unwrap();
            fs::write(dir.path().join(format!("ep{epoch}.json")), b"{}").unwrap();
        }
        fs::write(dir.path().join("notes.txt"), b"ignore me").unwrap();

        let best = best_checkpoint(dir.path()).unwrap();
        assert_eq!(best.file_name().unwrap().to_str().unwrap(), "ep40.safetensors");
    }

    #[test]
    fn test_best_checkpoint_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            best_checkpoint(&missing),
            Err(Error::NoCheckpoint(_))
        ));
    }

    #[test]
    fn test_best_checkpoint_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            best_checkpoint(dir.path()),
            Err(Error::NoCheckpoint(_))
        ));
    }
}

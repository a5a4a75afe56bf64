use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur in ddilink-predict.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON serialization error.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    /// Binary serialization error.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),
    /// Core graph error.
    #[error(transparent)]
    Core(#[from] ddilink_core::Error),
    /// Candle tensor error.
    #[error("tensor error: {0}")]
    Tensor(#[from] candle_core::Error),
    /// Neural layer error.
    #[error(transparent)]
    Nn(#[from] ddilink_nn::Error),
    /// Scoring was requested before the model was trained or loaded.
    #[error("{0} has no trained state (call train or load_model first)")]
    NotTrained(&'static str),
    /// Training requires at least one positive edge.
    #[error("training requires a non-empty positive edge set")]
    EmptyTrainingSet,
    /// A scored node is unknown to the model.
    #[error("node {0} is not part of the trained graph")]
    UnknownNode(u32),
    /// No epoch-stamped checkpoint was found in a directory.
    #[error("no checkpoint found under {}", .0.display())]
    NoCheckpoint(PathBuf),
    /// Negative sampling is impossible (the graph is complete).
    #[error("graph has no non-edges to sample negatives from")]
    NoNegativeCandidates,
}

/// Result type alias for ddilink-predict.
pub type Result<T> = std::result::Result<T, Error>;

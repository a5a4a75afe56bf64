use thiserror::Error;

/// Errors that can occur in ddilink-core.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// CSV parsing error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    /// Malformed record in an edge list.
    #[error("malformed edge record: {0}")]
    Parse(String),
    /// Binary serialization error.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),
    /// Node not present in the graph.
    #[error("unknown node: {0}")]
    UnknownNode(u32),
}

/// Result type alias for ddilink-core.
pub type Result<T> = std::result::Result<T, Error>;

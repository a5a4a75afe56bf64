//! Neural primitives for link prediction.
//!
//! `ddilink-nn` provides the trainable building blocks the predictors are
//! assembled from. It sits between the structure layer (`ddilink-core`) and
//! the predictor layer (`ddilink-predict`).
//!
//! # Modules
//!
//! - [`conv`]: GraphSAGE message-passing layers and the full aggregation stack
//! - [`predictor`]: Pairwise edge-scoring MLP head
//! - [`node2vec`]: Skip-gram training for node embeddings
//!
//! # Example: SAGE forward pass
//!
//! ```rust,ignore
//! use ddilink_nn::conv::{dense_adjacency, SageStack};
//! use candle_core::{DType, Device};
//! use candle_nn::{VarBuilder, VarMap};
//!
//! let device = Device::Cpu;
//! let varmap = VarMap::new();
//! let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
//!
//! let stack = SageStack::new(256, 256, 256, 2, 0.3, vb)?;
//! let adj = dense_adjacency(&edge_index, &device)?;
//! let node_emb = stack.forward(&initial_emb, &adj, true)?;  // (N, 256)
//! ```

pub mod conv;
pub mod error;
pub mod node2vec;
pub mod predictor;

pub use error::{Error, Result};

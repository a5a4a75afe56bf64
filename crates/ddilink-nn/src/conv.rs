//! Message-passing convolutional layers.
//!
//! Implements the GraphSAGE architecture (Hamilton et al., 2017) used by the
//! message-passing link predictor:
//!
//! 1. **Message**: Neighbor features, gathered via the adjacency matrix
//! 2. **Aggregate**: Mean over neighbors
//! 3. **Update**: Self transform + neighbor transform
//!
//! ```text
//! h_i^{(l+1)} = W_self h_i^{(l)} + W_nbr mean({h_j^{(l)} : j in N(i)})
//! ```

use candle_core::{bail, Device, Result, Tensor};
use candle_nn::{linear, Dropout, Linear, Module, VarBuilder};
use ddilink_core::EdgeIndex;

/// Build a dense adjacency matrix from a doubled edge index.
///
/// Entry (i, j) is 1.0 when a directed pair (j, i) exists, so `adj.matmul(x)`
/// sums each node's neighbor features. The edge index is symmetric, so the
/// matrix is too.
pub fn dense_adjacency(edge_index: &EdgeIndex, device: &Device) -> Result<Tensor> {
    let n = edge_index.num_nodes();
    let mut data = vec![0f32; n * n];
    for (src, dst) in edge_index.directed_pairs() {
        data[dst as usize * n + src as usize] = 1.0;
    }
    Tensor::from_vec(data, (n, n), device)
}

/// GraphSAGE convolutional layer with mean aggregation.
///
/// # Reference
///
/// Hamilton et al., "Inductive Representation Learning on Large Graphs",
/// NeurIPS 2017.
pub struct SageConv {
    lin_self: Linear,
    lin_neighbor: Linear,
    normalize: bool,
}

impl SageConv {
    /// Create a new GraphSAGE layer.
    ///
    /// # Arguments
    /// - `in_features`: Input feature dimension
    /// - `out_features`: Output feature dimension
    /// - `normalize`: Whether to L2-normalize the output rows
    /// - `vb`: Variable builder for parameter initialization
    pub fn new(
        in_features: usize,
        out_features: usize,
        normalize: bool,
        vb: VarBuilder,
    ) -> Result<Self> {
        let lin_self = linear(in_features, out_features, vb.pp("lin_self"))?;
        let lin_neighbor = linear(in_features, out_features, vb.pp("lin_neighbor"))?;

        Ok(Self {
            lin_self,
            lin_neighbor,
            normalize,
        })
    }

    /// Forward pass.
    ///
    /// # Arguments
    /// - `x`: Node features (N x in_features)
    /// - `adj`: Adjacency matrix (N x N)
    ///
    /// # Returns
    /// - Node embeddings (N x out_features)
    pub fn forward(&self, x: &Tensor, adj: &Tensor) -> Result<Tensor> {
        // Self features
        let h_self = self.lin_self.forward(x)?;

        // Mean aggregation: A * X / degree
        let agg = adj.matmul(x)?;
        let deg = adj.sum(1)?;
        let deg = deg.reshape((deg.elem_count(), 1))?;
        // Avoid division by zero for isolated nodes
        let deg = (deg + 1e-6)?;
        let h_agg = agg.broadcast_div(&deg)?;

        let h_neighbor = self.lin_neighbor.forward(&h_agg)?;

        let out = (h_self + h_neighbor)?;

        if self.normalize {
            let norm = out.sqr()?.sum(1)?.sqrt()?;
            let norm = norm.reshape((norm.elem_count(), 1))?;
            let norm = (norm + 1e-6)?;
            out.broadcast_div(&norm)
        } else {
            Ok(out)
        }
    }
}

/// A stack of SAGE layers with a post-aggregation MLP.
///
/// Mirrors the standard GNN encoder shape: L convolutions with ReLU and
/// dropout between them, then a two-layer MLP producing the final node
/// embeddings.
pub struct SageStack {
    convs: Vec<SageConv>,
    post_lin1: Linear,
    post_lin2: Linear,
    dropout: Dropout,
}

impl SageStack {
    /// Create a new stack.
    ///
    /// # Arguments
    /// - `input_dim`: Dimension of the initial node embeddings
    /// - `hidden_dim`: Hidden dimension of the conv layers
    /// - `output_dim`: Dimension of the final embeddings
    /// - `num_layers`: Number of SAGE layers (must be >= 1)
    /// - `dropout`: Dropout probability
    /// - `vb`: Variable builder
    pub fn new(
        input_dim: usize,
        hidden_dim: usize,
        output_dim: usize,
        num_layers: usize,
        dropout: f32,
        vb: VarBuilder,
    ) -> Result<Self> {
        if num_layers < 1 {
            bail!("SageStack requires at least one layer");
        }

        let mut convs = Vec::with_capacity(num_layers);
        convs.push(SageConv::new(input_dim, hidden_dim, false, vb.pp("conv0"))?);
        for l in 1..num_layers {
            convs.push(SageConv::new(
                hidden_dim,
                hidden_dim,
                false,
                vb.pp(format!("conv{l}")),
            )?);
        }

        let post_lin1 = linear(hidden_dim, hidden_dim, vb.pp("post_lin1"))?;
        let post_lin2 = linear(hidden_dim, output_dim, vb.pp("post_lin2"))?;

        Ok(Self {
            convs,
            post_lin1,
            post_lin2,
            dropout: Dropout::new(dropout),
        })
    }

    /// Forward pass over the whole graph.
    ///
    /// # Arguments
    /// - `x`: Initial node embeddings (N x input_dim)
    /// - `adj`: Adjacency matrix (N x N)
    /// - `train`: Whether dropout is active
    pub fn forward(&self, x: &Tensor, adj: &Tensor, train: bool) -> Result<Tensor> {
        let mut h = x.clone();
        for conv in &self.convs {
            h = conv.forward(&h, adj)?.relu()?;
            h = self.dropout.forward(&h, train)?;
        }

        let h = self.post_lin1.forward(&h)?;
        let h = self.dropout.forward(&h, train)?;
        self.post_lin2.forward(&h)
    }
}

//! Pairwise edge-scoring head.

use candle_core::{bail, Result, Tensor};
use candle_nn::{linear, ops, Dropout, Linear, Module, VarBuilder};

/// MLP that scores a node pair from the elementwise product of its embeddings.
///
/// `score(i, j) = sigmoid(MLP(h_i * h_j))`, a value in (0, 1). The product
/// makes the head symmetric in its inputs up to the shared weights, matching
/// undirected edges.
pub struct LinkMlp {
    lins: Vec<Linear>,
    dropout: Dropout,
}

impl LinkMlp {
    /// Create a new scoring head.
    ///
    /// # Arguments
    /// - `in_channels`: Dimension of the node embeddings
    /// - `hidden_channels`: Hidden width
    /// - `out_channels`: Output width (1 for a scalar score)
    /// - `num_layers`: Total linear layers (must be >= 2)
    /// - `dropout`: Dropout probability between hidden layers
    pub fn new(
        in_channels: usize,
        hidden_channels: usize,
        out_channels: usize,
        num_layers: usize,
        dropout: f32,
        vb: VarBuilder,
    ) -> Result<Self> {
        if num_layers < 2 {
            bail!("LinkMlp requires at least two layers");
        }

        let mut lins = Vec::with_capacity(num_layers);
        lins.push(linear(in_channels, hidden_channels, vb.pp("lin0"))?);
        for l in 1..num_layers - 1 {
            lins.push(linear(
                hidden_channels,
                hidden_channels,
                vb.pp(format!("lin{l}")),
            )?);
        }
        lins.push(linear(
            hidden_channels,
            out_channels,
            vb.pp(format!("lin{}", num_layers - 1)),
        )?);

        Ok(Self {
            lins,
            dropout: Dropout::new(dropout),
        })
    }

    /// Score a batch of node pairs.
    ///
    /// # Arguments
    /// - `x_i`, `x_j`: Endpoint embeddings, both (B x in_channels)
    /// - `train`: Whether dropout is active
    ///
    /// # Returns
    /// - Scores in (0, 1), shape (B x out_channels)
    pub fn forward(&self, x_i: &Tensor, x_j: &Tensor, train: bool) -> Result<Tensor> {
        let mut x = (x_i * x_j)?;
        for lin in &self.lins[..self.lins.len() - 1] {
            x = lin.forward(&x)?.relu()?;
            x = self.dropout.forward(&x, train)?;
        }
        let x = self.lins[self.lins.len() - 1].forward(&x)?;
        ops::sigmoid(&x)
    }
}

//! Message-passing link predictor.
//!
//! Learns a per-node embedding table jointly with a GraphSAGE stack and a
//! pairwise MLP head. Each mini-batch refreshes node embeddings with a
//! forward pass over the entire graph (no caching between batches), scores
//! the batch's positive pairs plus an equal number of uniformly sampled
//! non-edges, and minimizes the contrastive log-likelihood:
//!
//! ```text
//! loss = -mean(log(p_pos + eps)) - mean(log(1 - p_neg + eps))
//! ```
//!
//! With a validation set, Hits@20 is scored every epoch and the model is
//! checkpointed whenever the running maximum strictly improves.

use crate::eval::hits_at_k;
use crate::training::{Checkpointer, GnnTrainConfig};
use crate::{Error, LinkPredictor, Result, TrainContext, TrainReport};
use candle_core::{DType, Device, Tensor};
use candle_nn::{embedding, AdamW, Embedding, Optimizer, ParamsAdamW, VarBuilder, VarMap};
use ddilink_core::{EdgeIndex, InteractionGraph};
use ddilink_nn::conv::{dense_adjacency, SageStack};
use ddilink_nn::predictor::LinkMlp;
use rand::prelude::*;
use rand_xorshift::XorShiftRng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::info;

/// Floor inside the log terms so a saturated sigmoid cannot produce log(0).
const LOG_EPS: f64 = 1e-15;

/// GraphSAGE-based link predictor.
pub struct GnnPredictor {
    config: GnnTrainConfig,
    device: Device,
    state: Option<GnnState>,
}

struct GnnState {
    varmap: VarMap,
    emb: Embedding,
    stack: SageStack,
    link_mlp: LinkMlp,
    adj: Tensor,
    edge_index: EdgeIndex,
    node_ids: Vec<u32>,
    dense: HashMap<u32, u32>,
}

/// Sidecar metadata persisted next to the weight file.
#[derive(Serialize, Deserialize)]
struct GnnMeta {
    config: GnnTrainConfig,
    node_ids: Vec<u32>,
    edge_index: EdgeIndex,
}

impl Default for GnnPredictor {
    fn default() -> Self {
        Self::new(GnnTrainConfig::default())
    }
}

impl GnnPredictor {
    /// Create an untrained predictor.
    pub fn new(config: GnnTrainConfig) -> Self {
        Self {
            config,
            device: Device::Cpu,
            state: None,
        }
    }

    /// The active training configuration.
    pub fn config(&self) -> &GnnTrainConfig {
        &self.config
    }

    fn state(&self) -> Result<&GnnState> {
        self.state
            .as_ref()
            .ok_or(Error::NotTrained("gnn predictor"))
    }
}

fn build_modules(
    config: &GnnTrainConfig,
    num_nodes: usize,
    vb: VarBuilder,
) -> Result<(Embedding, SageStack, LinkMlp)> {
    let emb = embedding(num_nodes, config.node_emb_dim, vb.pp("node_emb"))?;
    let stack = SageStack::new(
        config.node_emb_dim,
        config.hidden_dim,
        config.hidden_dim,
        config.num_layers,
        config.dropout,
        vb.pp("gnn"),
    )?;
    let link_mlp = LinkMlp::new(
        config.hidden_dim,
        config.hidden_dim,
        1,
        config.num_layers + 1,
        config.dropout,
        vb.pp("link_mlp"),
    )?;
    Ok((emb, stack, link_mlp))
}

fn dense_map(node_ids: &[u32]) -> HashMap<u32, u32> {
    node_ids
        .iter()
        .enumerate()
        .map(|(i, &id)| (id, i as u32))
        .collect()
}

/// Translate external-ID pairs into dense-index pairs.
fn map_pairs(pairs: &[(u32, u32)], dense: &HashMap<u32, u32>) -> Result<Vec<(u32, u32)>> {
    pairs
        .iter()
        .map(|&(u, v)| {
            let du = *dense.get(&u).ok_or(Error::UnknownNode(u))?;
            let dv = *dense.get(&v).ok_or(Error::UnknownNode(v))?;
            Ok((du, dv))
        })
        .collect()
}

/// Score dense pairs against refreshed node embeddings, keeping the graph.
fn forward_pairs(
    link_mlp: &LinkMlp,
    node_emb: &Tensor,
    pairs: &[(u32, u32)],
    train: bool,
    device: &Device,
) -> Result<Tensor> {
    let (src, dst): (Vec<u32>, Vec<u32>) = pairs.iter().copied().unzip();
    let src = Tensor::from_vec(src, pairs.len(), device)?;
    let dst = Tensor::from_vec(dst, pairs.len(), device)?;

    let h_src = node_emb.index_select(&src, 0)?;
    let h_dst = node_emb.index_select(&dst, 0)?;

    Ok(link_mlp.forward(&h_src, &h_dst, train)?.squeeze(1)?)
}

/// Score dense pairs in fixed-size batches, detached from the graph.
fn predict_scores(
    link_mlp: &LinkMlp,
    node_emb: &Tensor,
    pairs: &[(u32, u32)],
    batch_size: usize,
    device: &Device,
) -> Result<Vec<f32>> {
    let node_emb = node_emb.detach();
    let mut scores = Vec::with_capacity(pairs.len());
    for batch in pairs.chunks(batch_size.max(1)) {
        let pred = forward_pairs(link_mlp, &node_emb, batch, false, device)?;
        scores.extend(pred.to_vec1::<f32>()?);
    }
    Ok(scores)
}

/// Sample `count` non-edges uniformly at random (dense indices).
///
/// The count always matches the positive batch actually drawn, including the
/// final partial batch. Pairs may repeat; edges and self-loops never appear.
fn sample_batch_negatives<R: Rng>(
    num_nodes: usize,
    edges: &HashSet<(u32, u32)>,
    count: usize,
    rng: &mut R,
) -> Result<Vec<(u32, u32)>> {
    let possible = num_nodes.saturating_mul(num_nodes.saturating_sub(1)) / 2;
    if possible <= edges.len() {
        return Err(Error::NoNegativeCandidates);
    }

    let mut out = Vec::with_capacity(count);
    while out.len() < count {
        let u = rng.random_range(0..num_nodes) as u32;
        let v = rng.random_range(0..num_nodes) as u32;
        if u == v {
            continue;
        }
        let key = if u < v { (u, v) } else { (v, u) };
        if edges.contains(&key) {
            continue;
        }
        out.push((u, v));
    }
    Ok(out)
}

fn write_model_files(varmap: &VarMap, meta: &GnnMeta, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    varmap.save(path)?;
    let meta_file = File::create(path.with_extension("json"))?;
    serde_json::to_writer(meta_file, meta)?;
    Ok(())
}

impl LinkPredictor for GnnPredictor {
    fn name(&self) -> &'static str {
        "gnn"
    }

    fn train(&mut self, graph: &InteractionGraph, ctx: &TrainContext<'_>) -> Result<TrainReport> {
        let edge_index = EdgeIndex::from_graph(graph);
        let mut positives: Vec<(u32, u32)> = edge_index.positive_edges().to_vec();
        if positives.is_empty() {
            return Err(Error::EmptyTrainingSet);
        }

        let num_nodes = graph.num_nodes();
        let node_ids = graph.node_ids();
        let dense = dense_map(&node_ids);

        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &self.device);
        let (emb, stack, link_mlp) = build_modules(&self.config, num_nodes, vb)?;
        let adj = dense_adjacency(&edge_index, &self.device)?;

        let mut opt = AdamW::new(
            varmap.all_vars(),
            ParamsAdamW {
                lr: self.config.learning_rate,
                weight_decay: self.config.weight_decay,
                ..Default::default()
            },
        )?;

        let dense_edges: HashSet<(u32, u32)> = positives
            .iter()
            .map(|&(u, v)| if u < v { (u, v) } else { (v, u) })
            .collect();

        // Map validation edges to dense indices once.
        let val_dense = ctx
            .val
            .map(|val| -> Result<_> {
                Ok((
                    map_pairs(&val.edges, &dense)?,
                    map_pairs(&val.neg_edges, &dense)?,
                ))
            })
            .transpose()?;

        let checkpointer = ctx
            .checkpoint_dir
            .map(|dir| Checkpointer::new(dir, "safetensors"))
            .transpose()?;

        let mut rng = XorShiftRng::seed_from_u64(self.config.seed);
        let mut report = TrainReport::default();
        let mut best_val = f64::NEG_INFINITY;

        for epoch in 0..self.config.epochs {
            positives.shuffle(&mut rng);

            let mut epoch_losses = Vec::new();
            for batch in positives.chunks(self.config.batch_size) {
                // Full-graph forward pass every batch
                let node_emb = stack.forward(emb.embeddings(), &adj, true)?;

                let pos_pred = forward_pairs(&link_mlp, &node_emb, batch, true, &self.device)?;

                let negatives =
                    sample_batch_negatives(num_nodes, &dense_edges, batch.len(), &mut rng)?;
                let neg_pred =
                    forward_pairs(&link_mlp, &node_emb, &negatives, true, &self.device)?;

                let pos_loss = (pos_pred + LOG_EPS)?.log()?.mean_all()?;
                let neg_loss = (neg_pred.affine(-1.0, 1.0)? + LOG_EPS)?.log()?.mean_all()?;
                let loss = ((pos_loss + neg_loss)? * -1.0)?;

                opt.backward_step(&loss)?;
                epoch_losses.push(loss.to_scalar::<f32>()?);
            }

            let mean_loss = epoch_losses.iter().sum::<f32>() / epoch_losses.len() as f32;
            report.loss_history.push(mean_loss);
            info!(epoch = epoch + 1, loss = mean_loss, "epoch finished");

            if let Some((val_pos, val_neg)) = &val_dense {
                let node_emb = stack.forward(emb.embeddings(), &adj, false)?;
                let pos_scores = predict_scores(
                    &link_mlp,
                    &node_emb,
                    val_pos,
                    self.config.batch_size,
                    &self.device,
                )?;
                let neg_scores = predict_scores(
                    &link_mlp,
                    &node_emb,
                    val_neg,
                    self.config.batch_size,
                    &self.device,
                )?;

                let hits = hits_at_k(&pos_scores, &neg_scores, 20);
                report.val_hits.push(hits);

                if hits > best_val {
                    best_val = hits;
                    report.best_epoch = Some(epoch);
                    report.best_val_hits = Some(hits);
                    info!(epoch = epoch + 1, hits20 = hits, "validation improved");

                    if let Some(checkpointer) = &checkpointer {
                        let meta = GnnMeta {
                            config: self.config.clone(),
                            node_ids: node_ids.clone(),
                            edge_index: edge_index.clone(),
                        };
                        write_model_files(&varmap, &meta, &checkpointer.path_for(epoch))?;
                    }
                }
            }
        }

        self.state = Some(GnnState {
            varmap,
            emb,
            stack,
            link_mlp,
            adj,
            edge_index,
            node_ids,
            dense,
        });
        Ok(report)
    }

    fn score_edge(&self, u: u32, v: u32) -> Result<f32> {
        Ok(self.score_edges(&[(u, v)])?[0])
    }

    fn score_edges(&self, pairs: &[(u32, u32)]) -> Result<Vec<f32>> {
        let state = self.state()?;
        let dense_pairs = map_pairs(pairs, &state.dense)?;

        let node_emb = state
            .stack
            .forward(state.emb.embeddings(), &state.adj, false)?;
        predict_scores(
            &state.link_mlp,
            &node_emb,
            &dense_pairs,
            self.config.batch_size,
            &self.device,
        )
    }

    fn save_model(&self, path: &Path) -> Result<()> {
        let state = self.state()?;
        let meta = GnnMeta {
            config: self.config.clone(),
            node_ids: state.node_ids.clone(),
            edge_index: state.edge_index.clone(),
        };
        write_model_files(&state.varmap, &meta, path)
    }

    fn load_model(&mut self, path: &Path) -> Result<()> {
        let meta_file = File::open(path.with_extension("json"))?;
        let meta: GnnMeta = serde_json::from_reader(BufReader::new(meta_file))?;

        let num_nodes = meta.node_ids.len();
        let mut varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &self.device);
        let (emb, stack, link_mlp) = build_modules(&meta.config, num_nodes, vb)?;
        varmap.load(path)?;

        let adj = dense_adjacency(&meta.edge_index, &self.device)?;
        let dense = dense_map(&meta.node_ids);

        self.config = meta.config;
        self.state = Some(GnnState {
            varmap,
            emb,
            stack,
            link_mlp,
            adj,
            edge_index: meta.edge_index,
            node_ids: meta.node_ids,
            dense,
        });
        Ok(())
    }

    fn is_trained(&self) -> bool {
        self.state.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_config() -> GnnTrainConfig {
        GnnTrainConfig::default()
            .with_epochs(2)
            .with_hidden_dim(8)
            .with_node_emb_dim(8)
            .with_batch_size(4)
    }

    fn tiny_graph() -> InteractionGraph {
        let mut g = InteractionGraph::new();
        for &(u, v) in &[(0, 1), (1, 2), (2, 3), (3, 4), (4, 0), (1, 3)] {
            g.add_edge(u, v);
        }
        g
    }

    #[test]
    fn test_untrained_scoring_fails() {
        let model = GnnPredictor::new(tiny_config());
        assert!(matches!(
            model.score_edge(0, 1),
            Err(Error::NotTrained(_))
        ));
    }

    #[test]
    fn test_empty_training_set_fails_fast() {
        let mut model = GnnPredictor::new(tiny_config());
        let empty = InteractionGraph::new();
        assert!(matches!(
            model.train(&empty, &TrainContext::default()),
            Err(Error::EmptyTrainingSet)
        ));
    }

    #[test]
    fn test_negative_count_matches_partial_batch() {
        let mut rng = XorShiftRng::seed_from_u64(3);
        let edges: HashSet<(u32, u32)> = [(0, 1), (1, 2)].into_iter().collect();

        // 6 positives with batch size 4 leaves a final partial batch of 2
        let positives = vec![(0, 1); 6];
        let mut counts = Vec::new();
        for batch in positives.chunks(4) {
            let negs = sample_batch_negatives(10, &edges, batch.len(), &mut rng).unwrap();
            counts.push(negs.len());
            assert_eq!(negs.len(), batch.len());
        }
        assert_eq!(counts, vec![4, 2]);
    }

    #[test]
    fn test_negatives_avoid_edges_and_self_loops() {
        let mut rng = XorShiftRng::seed_from_u64(9);
        let edges: HashSet<(u32, u32)> = [(0, 1), (0, 2), (1, 2)].into_iter().collect();

        let negs = sample_batch_negatives(6, &edges, 50, &mut rng).unwrap();
        assert_eq!(negs.len(), 50);
        for (u, v) in negs {
            assert_ne!(u, v);
            let key = if u < v { (u, v) } else { (v, u) };
            assert!(!edges.contains(&key));
        }
    }

    #[test]
    fn test_negatives_impossible_on_complete_graph() {
        let mut rng = XorShiftRng::seed_from_u64(1);
        let edges: HashSet<(u32, u32)> = [(0, 1), (0, 2), (1, 2)].into_iter().collect();
        assert!(matches!(
            sample_batch_negatives(3, &edges, 1, &mut rng),
            Err(Error::NoNegativeCandidates)
        ));
    }

    #[test]
    fn test_train_then_score() {
        let mut model = GnnPredictor::new(tiny_config());
        let graph = tiny_graph();

        let report = model.train(&graph, &TrainContext::default()).unwrap();
        assert_eq!(report.loss_history.len(), 2);
        assert!(model.is_trained());

        let scores = model.score_edges(&[(0, 1), (0, 3)]).unwrap();
        assert_eq!(scores.len(), 2);
        for s in scores {
            assert!(s > 0.0 && s < 1.0);
        }
    }

    #[test]
    fn test_unknown_node_rejected() {
        let mut model = GnnPredictor::new(tiny_config());
        let graph = tiny_graph();
        model.train(&graph, &TrainContext::default()).unwrap();

        assert!(matches!(
            model.score_edge(0, 99),
            Err(Error::UnknownNode(99))
        ));
    }

    #[test]
    fn test_save_load_roundtrip_scores() {
        let mut model = GnnPredictor::new(tiny_config());
        let graph = tiny_graph();
        model.train(&graph, &TrainContext::default()).unwrap();

        let pairs = [(0u32, 1u32), (0, 2), (1, 4), (2, 4)];
        let before = model.score_edges(&pairs).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.safetensors");
        model.save_model(&path).unwrap();

        let mut restored = GnnPredictor::new(GnnTrainConfig::default());
        restored.load_model(&path).unwrap();
        let after = restored.score_edges(&pairs).unwrap();

        assert_eq!(before, after);
    }
}

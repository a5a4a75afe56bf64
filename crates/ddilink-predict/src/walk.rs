//! Random-walk embedding link predictor.
//!
//! Generates node2vec-style walks over the graph and trains skip-gram
//! embeddings on the walk corpus. An edge (u, v) is scored as
//! `sigmoid(dot(emb_u, emb_v))` — the plausibility the skip-gram objective
//! assigns to u and v co-occurring.

use crate::eval::hits_at_k;
use crate::training::{Checkpointer, WalkTrainConfig};
use crate::{Error, LinkPredictor, Result, TrainContext, TrainReport};
use ddilink_core::algo::random_walk::{generate_walks, RandomWalkConfig};
use ddilink_core::InteractionGraph;
use ddilink_nn::node2vec::{walk_frequencies, SkipGram, SkipGramConfig};
use rand::SeedableRng;
use rand_xorshift::XorShiftRng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::info;

/// Skip-gram embedding link predictor.
pub struct RandomWalkPredictor {
    config: WalkTrainConfig,
    state: Option<WalkState>,
}

/// Trained state: the embedding matrix plus the node-ID mapping.
#[derive(Serialize, Deserialize)]
struct WalkState {
    embedding_dim: usize,
    /// External node IDs in dense order.
    node_ids: Vec<u32>,
    /// Row-major (num_nodes * embedding_dim) embedding matrix.
    embeddings: Vec<f32>,
    /// External ID -> dense row, rebuilt after deserialization.
    #[serde(skip, default)]
    dense: HashMap<u32, u32>,
}

impl WalkState {
    fn rebuild_index(&mut self) {
        self.dense = self
            .node_ids
            .iter()
            .enumerate()
            .map(|(i, &id)| (id, i as u32))
            .collect();
    }

    fn embedding(&self, node: u32) -> Result<&[f32]> {
        let dense = *self.dense.get(&node).ok_or(Error::UnknownNode(node))? as usize;
        let dim = self.embedding_dim;
        Ok(&self.embeddings[dense * dim..(dense + 1) * dim])
    }

    fn score(&self, u: u32, v: u32) -> Result<f32> {
        let eu = self.embedding(u)?;
        let ev = self.embedding(v)?;

        let dot: f32 = eu.iter().zip(ev.iter()).map(|(a, b)| a * b).sum();
        Ok(1.0 / (1.0 + (-dot).exp()))
    }
}

impl Default for RandomWalkPredictor {
    fn default() -> Self {
        Self::new(WalkTrainConfig::default())
    }
}

impl RandomWalkPredictor {
    /// Create an untrained predictor.
    pub fn new(config: WalkTrainConfig) -> Self {
        Self {
            config,
            state: None,
        }
    }

    /// The active training configuration.
    pub fn config(&self) -> &WalkTrainConfig {
        &self.config
    }

    fn state(&self) -> Result<&WalkState> {
        self.state
            .as_ref()
            .ok_or(Error::NotTrained("random-walk predictor"))
    }

    fn snapshot_state(&mut self, node_ids: &[u32], skipgram: &SkipGram) {
        let mut state = WalkState {
            embedding_dim: skipgram.embedding_dim(),
            node_ids: node_ids.to_vec(),
            embeddings: skipgram.embeddings().to_vec(),
            dense: HashMap::new(),
        };
        state.rebuild_index();
        self.state = Some(state);
    }
}

impl LinkPredictor for RandomWalkPredictor {
    fn name(&self) -> &'static str {
        "randomwalk"
    }

    fn train(&mut self, graph: &InteractionGraph, ctx: &TrainContext<'_>) -> Result<TrainReport> {
        if graph.num_edges() == 0 {
            return Err(Error::EmptyTrainingSet);
        }

        let node_ids = graph.node_ids();
        let num_nodes = node_ids.len();

        let walks = generate_walks(
            graph,
            RandomWalkConfig {
                walk_length: self.config.walk_length,
                num_walks: self.config.walks_per_node,
                p: self.config.p,
                q: self.config.q,
                seed: self.config.seed,
            },
        );
        info!(walks = walks.len(), "walk corpus generated");

        let mut skipgram = SkipGram::new(
            num_nodes,
            SkipGramConfig {
                embedding_dim: self.config.embedding_dim,
                window_size: self.config.context_window,
                negative_samples: self.config.negative_samples,
                learning_rate: self.config.learning_rate,
                min_learning_rate: self.config.min_learning_rate,
                seed: self.config.seed,
            },
        );
        skipgram.build_neg_table(&walk_frequencies(&walks, num_nodes));

        let total_words: usize = walks.iter().map(Vec::len).sum();
        skipgram.set_total_words(total_words * self.config.epochs);

        let checkpointer = ctx
            .checkpoint_dir
            .map(|dir| Checkpointer::new(dir, "bin"))
            .transpose()?;

        let mut rng = XorShiftRng::seed_from_u64(self.config.seed);
        let mut report = TrainReport::default();
        let mut best_val = f64::NEG_INFINITY;

        for epoch in 0..self.config.epochs {
            for walk in &walks {
                skipgram.train_walk(walk, &mut rng);
            }
            info!(epoch = epoch + 1, "walk epoch finished");

            // Refresh scoring state so validation sees this epoch's embeddings
            self.snapshot_state(&node_ids, &skipgram);

            if let Some(val) = ctx.val {
                let pos = self.score_edges(&val.edges)?;
                let neg = self.score_edges(&val.neg_edges)?;
                let hits = hits_at_k(&pos, &neg, 20);
                report.val_hits.push(hits);

                if hits > best_val {
                    best_val = hits;
                    report.best_epoch = Some(epoch);
                    report.best_val_hits = Some(hits);
                    info!(epoch = epoch + 1, hits20 = hits, "validation improved");

                    if let Some(checkpointer) = &checkpointer {
                        self.save_model(&checkpointer.path_for(epoch))?;
                    }
                }
            }
        }

        Ok(report)
    }

    fn score_edge(&self, u: u32, v: u32) -> Result<f32> {
        self.state()?.score(u, v)
    }

    fn save_model(&self, path: &Path) -> Result<()> {
        let state = self.state()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let writer = BufWriter::new(File::create(path)?);
        bincode::serialize_into(writer, state)?;
        Ok(())
    }

    fn load_model(&mut self, path: &Path) -> Result<()> {
        let reader = BufReader::new(File::open(path)?);
        let mut state: WalkState = bincode::deserialize_from(reader)?;
        state.rebuild_index();
        self.state = Some(state);
        Ok(())
    }

    fn is_trained(&self) -> bool {
        self.state.is_some()
    }
}

//! Skip-gram training for node embeddings.
//!
//! Nodes appearing in similar random-walk contexts get similar embeddings;
//! walks are "sentences," nodes are "words." Skip-gram with negative
//! sampling (SGNS) optimizes:
//!
//! ```text
//! L = log sigma(v_ctx . v_target) + sum_i E[log sigma(-v_neg . v_target)]
//! ```
//!
//! Negative samples are drawn from the unigram^0.75 distribution over walk
//! frequencies, smoothing between over-sampling common nodes (power 1) and
//! over-sampling rare ones (power 0).
//!
//! # References
//!
//! - Grover & Leskovec (2016). "node2vec: Scalable Feature Learning for Networks."
//! - Mikolov et al. (2013). "Distributed Representations of Words and Phrases."

use rand::prelude::*;
use rand_distr::{Distribution, Uniform};
use rand_xorshift::XorShiftRng;

/// Size of the negative-sampling table.
const NEG_TABLE_SIZE: usize = 1_000_000;

/// Skip-gram model configuration.
#[derive(Debug, Clone)]
pub struct SkipGramConfig {
    /// Embedding dimension.
    pub embedding_dim: usize,
    /// Context window size (each side).
    pub window_size: usize,
    /// Number of negative samples per positive.
    pub negative_samples: usize,
    /// Initial learning rate.
    pub learning_rate: f32,
    /// Minimum learning rate (for decay).
    pub min_learning_rate: f32,
    /// Random seed.
    pub seed: u64,
}

impl Default for SkipGramConfig {
    fn default() -> Self {
        Self {
            embedding_dim: 128,
            window_size: 10,
            negative_samples: 5,
            learning_rate: 0.025,
            min_learning_rate: 0.0001,
            seed: 42,
        }
    }
}

/// Skip-gram model for node embedding training.
///
/// Uses two embedding matrices:
/// - `embeddings`: Target node embeddings (the trained output)
/// - `context`: Context embeddings (discarded after training)
pub struct SkipGram {
    /// Target embeddings: (num_nodes * embedding_dim), row-major.
    embeddings: Vec<f32>,
    /// Context embeddings: (num_nodes * embedding_dim), row-major.
    context: Vec<f32>,
    /// Number of nodes.
    num_nodes: usize,
    /// Configuration.
    config: SkipGramConfig,
    /// Negative sampling table (unigram^0.75).
    neg_table: Vec<u32>,
    /// Current learning rate.
    current_lr: f32,
    /// Nodes processed so far (for lr decay).
    words_processed: usize,
    /// Total nodes to process across all epochs.
    total_words: usize,
}

impl SkipGram {
    /// Create a new skip-gram model with small random target embeddings.
    pub fn new(num_nodes: usize, config: SkipGramConfig) -> Self {
        let dim = config.embedding_dim;
        let mut rng = XorShiftRng::seed_from_u64(config.seed);
        let dist = Uniform::new(-0.5 / dim as f32, 0.5 / dim as f32)
            .expect("embedding dim must be nonzero");

        let embeddings: Vec<f32> = (0..num_nodes * dim).map(|_| dist.sample(&mut rng)).collect();
        let context = vec![0.0; num_nodes * dim];

        // Uniform fallback table; callers refine via build_neg_table.
        let neg_table: Vec<u32> = (0..num_nodes as u32).collect();

        Self {
            embeddings,
            context,
            num_nodes,
            current_lr: config.learning_rate,
            config,
            neg_table,
            words_processed: 0,
            total_words: 0,
        }
    }

    /// Build the negative sampling table from node frequencies.
    ///
    /// Uses the unigram^0.75 distribution as in the original Word2Vec.
    pub fn build_neg_table(&mut self, frequencies: &[u32]) {
        let total: f64 = frequencies.iter().map(|&f| (f as f64).powf(0.75)).sum();
        if total <= 0.0 {
            return;
        }

        let mut table = Vec::with_capacity(NEG_TABLE_SIZE);
        let mut cumulative = 0.0;

        for (node, &freq) in frequencies.iter().enumerate() {
            cumulative += (freq as f64).powf(0.75) / total;
            let count = ((cumulative * NEG_TABLE_SIZE as f64) as usize).saturating_sub(table.len());
            table.extend(std::iter::repeat(node as u32).take(count));
        }

        while table.len() < NEG_TABLE_SIZE {
            table.push((self.num_nodes - 1) as u32);
        }

        self.neg_table = table;
    }

    /// Set the total node count for learning-rate decay.
    pub fn set_total_words(&mut self, total: usize) {
        self.total_words = total;
    }

    /// Train on a single walk.
    ///
    /// For each position, predicts context nodes within a dynamically sampled
    /// window and updates both embedding matrices.
    pub fn train_walk<R: Rng>(&mut self, walk: &[u32], rng: &mut R) {
        let window = self.config.window_size;
        let neg_samples = self.config.negative_samples;

        for (pos, &target) in walk.iter().enumerate() {
            // Dynamic window: sample the effective window size
            let actual_window = rng.random_range(1..=window.max(1));

            let start = pos.saturating_sub(actual_window);
            let end = (pos + actual_window + 1).min(walk.len());

            for ctx_pos in start..end {
                if ctx_pos == pos {
                    continue;
                }

                let context_node = walk[ctx_pos] as usize;

                // Positive pair
                self.train_pair(target as usize, context_node, true);

                // Negative pairs
                for _ in 0..neg_samples {
                    let neg_idx = rng.random_range(0..self.neg_table.len());
                    let neg_node = self.neg_table[neg_idx] as usize;
                    if neg_node != context_node {
                        self.train_pair(target as usize, neg_node, false);
                    }
                }
            }

            self.words_processed += 1;
            self.update_lr();
        }
    }

    /// SGD update for one (target, context) pair with a binary label.
    fn train_pair(&mut self, target: usize, context: usize, positive: bool) {
        let dim = self.config.embedding_dim;
        let lr = self.current_lr;

        let t_offset = target * dim;
        let c_offset = context * dim;

        let mut dot = 0.0f32;
        for i in 0..dim {
            dot += self.embeddings[t_offset + i] * self.context[c_offset + i];
        }

        let label = if positive { 1.0 } else { 0.0 };
        let sigmoid = 1.0 / (1.0 + (-dot).exp());
        let grad = (label - sigmoid) * lr;

        for i in 0..dim {
            let t_grad = grad * self.context[c_offset + i];
            let c_grad = grad * self.embeddings[t_offset + i];

            self.embeddings[t_offset + i] += t_grad;
            self.context[c_offset + i] += c_grad;
        }
    }

    /// Decay the learning rate linearly with training progress.
    fn update_lr(&mut self) {
        if self.total_words == 0 {
            return;
        }

        let progress = self.words_processed as f32 / self.total_words as f32;
        self.current_lr = self.config.learning_rate
            - (self.config.learning_rate - self.config.min_learning_rate) * progress;
        self.current_lr = self.current_lr.max(self.config.min_learning_rate);
    }

    /// The learned embedding matrix (num_nodes * embedding_dim, row-major).
    pub fn embeddings(&self) -> &[f32] {
        &self.embeddings
    }

    /// Embedding row for one node.
    pub fn embedding(&self, node: usize) -> &[f32] {
        let dim = self.config.embedding_dim;
        &self.embeddings[node * dim..(node + 1) * dim]
    }

    /// Number of nodes.
    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    /// Embedding dimension.
    pub fn embedding_dim(&self) -> usize {
        self.config.embedding_dim
    }
}

/// Count node occurrences across a walk corpus.
///
/// Feeds [`SkipGram::build_neg_table`].
pub fn walk_frequencies(walks: &[Vec<u32>], num_nodes: usize) -> Vec<u32> {
    let mut freq = vec![0u32; num_nodes];
    for walk in walks {
        for &node in walk {
            if let Some(slot) = freq.get_mut(node as usize) {
                *slot += 1;
            }
        }
    }
    freq
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skipgram_init() {
        let model = SkipGram::new(100, SkipGramConfig::default());
        assert_eq!(model.num_nodes(), 100);
        assert_eq!(model.embedding_dim(), 128);
        assert_eq!(model.embeddings().len(), 100 * 128);
    }

    #[test]
    fn test_train_walk_updates_embeddings() {
        let mut model = SkipGram::new(
            10,
            SkipGramConfig {
                embedding_dim: 16,
                window_size: 2,
                negative_samples: 2,
                ..Default::default()
            },
        );

        let before = model.embedding(0).to_vec();

        let walk = vec![0, 1, 2, 3, 4, 5];
        let mut rng = XorShiftRng::seed_from_u64(7);
        model.train_walk(&walk, &mut rng);

        let after = model.embedding(0);
        assert_eq!(after.len(), 16);
        assert_ne!(before, after);
    }

    #[test]
    fn test_walk_frequencies() {
        let walks = vec![vec![0, 1, 1], vec![2, 1]];
        let freq = walk_frequencies(&walks, 4);
        assert_eq!(freq, vec![1, 3, 1, 0]);
    }

    #[test]
    fn test_neg_table_covers_frequent_nodes() {
        let mut model = SkipGram::new(4, SkipGramConfig::default());
        model.build_neg_table(&[1, 100, 1, 1]);

        let hits = model
            .neg_table
            .iter()
            .filter(|&&n| n == 1)
            .count();
        // Node 1 dominates the distribution
        assert!(hits > NEG_TABLE_SIZE / 2);
        assert_eq!(model.neg_table.len(), NEG_TABLE_SIZE);
    }
}

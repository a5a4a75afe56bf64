//! Node2Vec-style random walk generation.
//!
//! Implements biased 2nd-order random walks as described in:
//! Grover & Leskovec, "node2vec: Scalable Feature Learning for Networks" (KDD 2016)
//!
//! Walks are emitted as dense node indices so downstream embedding training
//! can address rows directly.
//!
//! ## Performance Notes
//!
//! - Rejection sampling gives O(1) expected time per biased step
//! - The previous node's neighbors are cached in a `HashSet` for O(1) membership
//! - Walk iterations are parallelized via rayon

use crate::InteractionGraph;
use petgraph::graph::NodeIndex;
use rand::prelude::*;
use rand_xorshift::XorShiftRng;
use rayon::prelude::*;
use std::collections::HashSet;

/// Configuration for random walks.
#[derive(Debug, Clone, Copy)]
pub struct RandomWalkConfig {
    /// Length of each random walk.
    pub walk_length: usize,
    /// Number of walks to start from each node.
    pub num_walks: usize,
    /// Return parameter (p) - likelihood of returning to the previous node.
    pub p: f32,
    /// In-out parameter (q) - BFS-like (q > 1) vs DFS-like (q < 1) behavior.
    pub q: f32,
    /// Random seed for reproducibility.
    pub seed: u64,
}

impl Default for RandomWalkConfig {
    fn default() -> Self {
        Self {
            walk_length: 40,
            num_walks: 10,
            p: 1.0,
            q: 1.0,
            seed: 42,
        }
    }
}

/// Generate random walks for all nodes in the graph.
///
/// Each walk is a sequence of dense node indices.
#[must_use]
pub fn generate_walks(graph: &InteractionGraph, config: RandomWalkConfig) -> Vec<Vec<u32>> {
    let walker = Node2VecWalker::new(graph, config);
    walker.walk()
}

/// Node2Vec random walker.
pub struct Node2VecWalker<'a> {
    graph: &'a InteractionGraph,
    config: RandomWalkConfig,
}

impl<'a> Node2VecWalker<'a> {
    /// Create a new walker.
    #[must_use]
    pub const fn new(graph: &'a InteractionGraph, config: RandomWalkConfig) -> Self {
        Self { graph, config }
    }

    /// Generate all random walks using parallel processing.
    #[must_use]
    pub fn walk(&self) -> Vec<Vec<u32>> {
        let node_indices: Vec<_> = self.graph.as_petgraph().node_indices().collect();
        let is_unbiased = (self.config.p - 1.0).abs() < f32::EPSILON
            && (self.config.q - 1.0).abs() < f32::EPSILON;

        (0..self.config.num_walks)
            .into_par_iter()
            .flat_map(|iter_idx| {
                let mut rng = XorShiftRng::seed_from_u64(self.config.seed + iter_idx as u64);
                let mut walks = Vec::with_capacity(node_indices.len());

                // Shuffle start nodes to avoid ordering bias
                let mut shuffled = node_indices.clone();
                shuffled.shuffle(&mut rng);

                for &start in &shuffled {
                    let walk = if is_unbiased {
                        self.unbiased_walk(start, &mut rng)
                    } else {
                        self.biased_walk(start, &mut rng)
                    };
                    walks.push(walk);
                }
                walks
            })
            .collect()
    }

    /// Uniform random walk (DeepWalk) - O(1) per step.
    fn unbiased_walk<R: Rng>(&self, start: NodeIndex, rng: &mut R) -> Vec<u32> {
        let graph = self.graph.as_petgraph();
        let mut walk = Vec::with_capacity(self.config.walk_length);
        walk.push(start.index() as u32);

        let mut curr = start;
        for _ in 1..self.config.walk_length {
            let neighbors: Vec<_> = graph.neighbors(curr).collect();
            let Some(&next) = neighbors.choose(rng) else {
                break;
            };
            curr = next;
            walk.push(curr.index() as u32);
        }
        walk
    }

    /// Biased 2nd-order random walk - O(1) expected per step via rejection sampling.
    fn biased_walk<R: Rng>(&self, start: NodeIndex, rng: &mut R) -> Vec<u32> {
        let graph = self.graph.as_petgraph();
        let mut walk = Vec::with_capacity(self.config.walk_length);
        walk.push(start.index() as u32);

        let mut curr = start;
        let mut prev: Option<NodeIndex> = None;
        let mut prev_neighbors: HashSet<NodeIndex> = HashSet::new();

        for _ in 1..self.config.walk_length {
            let neighbors: Vec<_> = graph.neighbors(curr).collect();
            if neighbors.is_empty() {
                break;
            }

            let next = match prev {
                Some(prev_node) => {
                    self.sample_biased_rejection(rng, prev_node, &prev_neighbors, &neighbors)
                }
                // First step: uniform over neighbors (non-empty, checked above)
                None => neighbors[rng.random_range(0..neighbors.len())],
            };

            walk.push(next.index() as u32);

            prev = Some(curr);
            prev_neighbors.clear();
            prev_neighbors.extend(graph.neighbors(curr));
            curr = next;
        }
        walk
    }

    /// Sample the next node via rejection sampling - O(1) expected time.
    ///
    /// Instead of computing weights for all neighbors (O(d)), sample uniformly
    /// and accept/reject based on the node2vec bias. Expected trials ~2-3.
    fn sample_biased_rejection<R: Rng>(
        &self,
        rng: &mut R,
        prev_node: NodeIndex,
        prev_neighbors: &HashSet<NodeIndex>,
        neighbors: &[NodeIndex],
    ) -> NodeIndex {
        let p = f64::from(self.config.p);
        let q = f64::from(self.config.q);

        // Unnormalized acceptance: backtrack 1/p, triangle 1, outward 1/q.
        let max_prob = (1.0 / p).max(1.0).max(1.0 / q);

        loop {
            let candidate = neighbors[rng.random_range(0..neighbors.len())];
            let r: f64 = rng.random();

            let unnorm_prob = if candidate == prev_node {
                1.0 / p
            } else if prev_neighbors.contains(&candidate) {
                1.0
            } else {
                1.0 / q
            };

            if r < unnorm_prob / max_prob {
                return candidate;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_graph(n: u32) -> InteractionGraph {
        let mut g = InteractionGraph::new();
        for i in 0..n - 1 {
            g.add_edge(i, i + 1);
        }
        g
    }

    #[test]
    fn test_walk_count_and_length() {
        let g = line_graph(5);
        let config = RandomWalkConfig {
            walk_length: 10,
            num_walks: 3,
            ..Default::default()
        };

        let walks = generate_walks(&g, config);
        assert_eq!(walks.len(), 15); // 5 nodes * 3 walks

        for walk in &walks {
            assert!(!walk.is_empty());
            assert!(walk.len() <= 10);
        }
    }

    #[test]
    fn test_walk_steps_follow_edges() {
        let g = line_graph(6);
        let config = RandomWalkConfig {
            walk_length: 8,
            num_walks: 2,
            ..Default::default()
        };

        let walks = generate_walks(&g, config);
        for walk in &walks {
            for pair in walk.windows(2) {
                let u = g.node_id(pair[0] as usize).unwrap();
                let v = g.node_id(pair[1] as usize).unwrap();
                assert!(g.has_edge(u, v), "walk step {u}-{v} is not an edge");
            }
        }
    }

    #[test]
    fn test_biased_walk_runs() {
        let g = line_graph(6);
        let config = RandomWalkConfig {
            walk_length: 8,
            num_walks: 2,
            p: 0.5,
            q: 2.0,
            ..Default::default()
        };

        let walks = generate_walks(&g, config);
        assert_eq!(walks.len(), 12);
    }

    #[test]
    fn test_isolated_node_walk_is_singleton() {
        let mut g = line_graph(3);
        g.add_node(99);

        let config = RandomWalkConfig {
            walk_length: 5,
            num_walks: 1,
            ..Default::default()
        };
        let walks = generate_walks(&g, config);

        let dense_99 = g.dense_index(99).unwrap() as u32;
        let isolated: Vec<_> = walks.iter().filter(|w| w[0] == dense_99).collect();
        assert_eq!(isolated.len(), 1);
        assert_eq!(isolated[0].len(), 1);
    }
}

//! Integration tests for link predictors.
//!
//! Tests the full pipeline: training -> checkpointing -> reload -> evaluation.

use ddilink_core::{EdgeSplit, InteractionGraph, SplitConfig};
use ddilink_predict::{
    best_checkpoint, AdamicAdar, CommonNeighbors, GnnPredictor, GnnTrainConfig, HitsEvaluator,
    LinkPredictor, RandomWalkPredictor, TrainContext, WalkTrainConfig,
};

/// A small synthetic interaction graph with community structure.
///
/// Two dense clusters joined by a bridge, so neighborhood heuristics have
/// real signal to rank on.
fn synthetic_graph() -> InteractionGraph {
    let mut g = InteractionGraph::new();

    // Cluster A: nodes 0-4, near-complete
    for u in 0..5u32 {
        for v in (u + 1)..5 {
            if (u, v) != (0, 4) {
                g.add_edge(u, v);
            }
        }
    }
    // Cluster B: nodes 5-9, near-complete
    for u in 5..10u32 {
        for v in (u + 1)..10 {
            if (u, v) != (5, 9) {
                g.add_edge(u, v);
            }
        }
    }
    // Bridge
    g.add_edge(4, 5);

    g
}

fn tiny_gnn() -> GnnPredictor {
    GnnPredictor::new(
        GnnTrainConfig::default()
            .with_epochs(3)
            .with_hidden_dim(8)
            .with_node_emb_dim(8)
            .with_batch_size(8),
    )
}

fn tiny_walk() -> RandomWalkPredictor {
    RandomWalkPredictor::new(
        WalkTrainConfig::default()
            .with_embedding_dim(16)
            .with_epochs(3)
            .with_walks(3, 10),
    )
}

#[test]
fn heuristics_rank_cluster_edges_above_cross_edges() {
    let graph = synthetic_graph();

    let mut model = CommonNeighbors::new();
    model.train(&graph, &TrainContext::default()).unwrap();

    // 0 and 4 sit in the same dense cluster; 0 and 9 are in different ones
    let within = model.score_edge(0, 4).unwrap();
    let across = model.score_edge(0, 9).unwrap();
    assert!(within > across);
}

#[test]
fn evaluator_reports_all_ks_and_monotonicity() {
    let graph = synthetic_graph();
    let split = EdgeSplit::generate(
        &graph,
        &SplitConfig {
            valid_frac: 0.2,
            test_frac: 0.2,
            num_neg: Some(10),
            ..Default::default()
        },
    )
    .unwrap();

    let mut model = AdamicAdar::new();
    model.train(&graph, &TrainContext::default()).unwrap();

    let evaluator = HitsEvaluator::default();
    let metrics = evaluator
        .evaluate(&model, &split.valid.edges, &split.valid.neg_edges)
        .unwrap();

    let h20 = metrics["Hits@20"];
    let h50 = metrics["Hits@50"];
    let h100 = metrics["Hits@100"];
    assert!(h20 <= h50 && h50 <= h100);

    for value in metrics.values() {
        assert!((0.0..=1.0).contains(value));
    }
}

#[test]
fn gnn_checkpoints_on_validation_improvement() {
    let graph = synthetic_graph();
    let split = EdgeSplit::generate(
        &graph,
        &SplitConfig {
            valid_frac: 0.2,
            test_frac: 0.1,
            num_neg: Some(8),
            ..Default::default()
        },
    )
    .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let ckpt_dir = dir.path().join("checkpoints");

    let mut model = tiny_gnn();
    let ctx = TrainContext::default()
        .with_validation(&split.valid)
        .with_checkpoint_dir(&ckpt_dir);
    let report = model.train(&graph, &ctx).unwrap();

    // First epoch always improves on -inf, so at least one checkpoint exists
    assert!(report.best_epoch.is_some());
    assert_eq!(report.val_hits.len(), report.loss_history.len());

    let best = best_checkpoint(&ckpt_dir).unwrap();
    assert!(best.exists());

    // Reload the best checkpoint and score with it
    let mut reloaded = GnnPredictor::new(GnnTrainConfig::default());
    reloaded.load_model(&best).unwrap();
    let scores = reloaded.score_edges(&split.test.edges).unwrap();
    assert_eq!(scores.len(), split.test.edges.len());
}

#[test]
fn walk_checkpoints_and_reloads() {
    let graph = synthetic_graph();
    let split = EdgeSplit::generate(
        &graph,
        &SplitConfig {
            valid_frac: 0.2,
            test_frac: 0.1,
            num_neg: Some(8),
            ..Default::default()
        },
    )
    .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let ckpt_dir = dir.path().join("checkpoints");

    let mut model = tiny_walk();
    let ctx = TrainContext::default()
        .with_validation(&split.valid)
        .with_checkpoint_dir(&ckpt_dir);
    model.train(&graph, &ctx).unwrap();

    let best = best_checkpoint(&ckpt_dir).unwrap();
    let mut reloaded = RandomWalkPredictor::new(WalkTrainConfig::default());
    reloaded.load_model(&best).unwrap();

    let pairs = [(0u32, 1u32), (4, 5), (0, 9)];
    assert_eq!(
        model.score_edges(&pairs).unwrap(),
        reloaded.score_edges(&pairs).unwrap()
    );
}

#[test]
fn round_trip_law_holds_for_every_variant() {
    let graph = synthetic_graph();
    let pairs = [(0u32, 2u32), (4, 5), (0, 9), (6, 8)];
    let dir = tempfile::tempdir().unwrap();

    let mut variants: Vec<(Box<dyn LinkPredictor>, Box<dyn LinkPredictor>, &str)> = vec![
        (
            Box::new(tiny_gnn()),
            Box::new(GnnPredictor::new(GnnTrainConfig::default())),
            "model.safetensors",
        ),
        (
            Box::new(tiny_walk()),
            Box::new(RandomWalkPredictor::new(WalkTrainConfig::default())),
            "model.bin",
        ),
        (
            Box::new(CommonNeighbors::new()),
            Box::new(CommonNeighbors::new()),
            "cn.bin",
        ),
        (
            Box::new(AdamicAdar::new()),
            Box::new(AdamicAdar::new()),
            "aa.bin",
        ),
    ];

    for (trained, restored, file_name) in &mut variants {
        trained.train(&graph, &TrainContext::default()).unwrap();
        let before = trained.score_edges(&pairs).unwrap();

        let path = dir.path().join(trained.name()).join(*file_name);
        trained.save_model(&path).unwrap();
        restored.load_model(&path).unwrap();
        assert!(restored.is_trained());

        let after = restored.score_edges(&pairs).unwrap();
        assert_eq!(before, after, "round-trip mismatch for {}", trained.name());
    }
}

#[test]
fn training_fails_fast_on_empty_graph_for_trainable_variants() {
    let empty = InteractionGraph::new();

    let err = tiny_gnn().train(&empty, &TrainContext::default());
    assert!(err.is_err());

    let err = tiny_walk().train(&empty, &TrainContext::default());
    assert!(err.is_err());
}

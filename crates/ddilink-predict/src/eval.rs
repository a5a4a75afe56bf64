//! Ranking evaluation for link prediction.
//!
//! Hits@K follows the benchmark evaluator's semantics: the threshold is the
//! K-th highest negative score, and a positive edge counts as a hit when its
//! score is strictly greater. The result is the hit fraction over all
//! positives, so it is monotone non-decreasing in K.

use crate::{LinkPredictor, Result};
use std::collections::BTreeMap;
use tracing::warn;

/// Hits@K for one prediction set.
///
/// Degenerate inputs: fewer than `k` negatives means no threshold can
/// exclude anything, so the result is 1.0; an empty positive set scores 0.0.
pub fn hits_at_k(pos: &[f32], neg: &[f32], k: usize) -> f64 {
    if pos.is_empty() {
        warn!("hits@{k} over an empty positive set");
        return 0.0;
    }
    if neg.len() < k {
        return 1.0;
    }

    let mut sorted = neg.to_vec();
    sorted.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    let threshold = sorted[k - 1];

    let hits = pos.iter().filter(|&&p| p > threshold).count();
    hits as f64 / pos.len() as f64
}

/// Batched Hits@K evaluation of a predictor over a split.
pub struct HitsEvaluator {
    /// K values reported, as "Hits@K" keys.
    pub ks: Vec<usize>,
    /// Edges scored per batch.
    pub batch_size: usize,
}

impl Default for HitsEvaluator {
    fn default() -> Self {
        Self {
            ks: vec![20, 50, 100],
            batch_size: 64 * 1024,
        }
    }
}

impl HitsEvaluator {
    /// Evaluate a predictor on a split's positives and negatives.
    ///
    /// Both edge sets are scored in fixed-size batches; predictions are
    /// concatenated before ranking.
    pub fn evaluate(
        &self,
        model: &dyn LinkPredictor,
        pos_edges: &[(u32, u32)],
        neg_edges: &[(u32, u32)],
    ) -> Result<BTreeMap<String, f64>> {
        let pos = self.score_in_batches(model, pos_edges)?;
        let neg = self.score_in_batches(model, neg_edges)?;

        let mut results = BTreeMap::new();
        for &k in &self.ks {
            results.insert(format!("Hits@{k}"), hits_at_k(&pos, &neg, k));
        }
        Ok(results)
    }

    fn score_in_batches(
        &self,
        model: &dyn LinkPredictor,
        edges: &[(u32, u32)],
    ) -> Result<Vec<f32>> {
        let mut scores = Vec::with_capacity(edges.len());
        for batch in edges.chunks(self.batch_size.max(1)) {
            scores.extend(model.score_edges(batch)?);
        }
        Ok(scores)
    }
}

/// Render metrics as the validation block of a result report.
pub fn validation_report(metrics: &BTreeMap<String, f64>) -> String {
    format!(
        "On validation set, model achieves:\n{}\n\n",
        render_metrics(metrics)
    )
}

/// Render metrics as the test block of a result report.
pub fn test_report(metrics: &BTreeMap<String, f64>) -> String {
    format!("On test set, model achieves:\n{}", render_metrics(metrics))
}

fn render_metrics(metrics: &BTreeMap<String, f64>) -> String {
    // BTreeMap keys give a stable order; serde_json keeps it.
    serde_json::to_string(metrics).unwrap_or_else(|_| format!("{metrics:?}"))
}

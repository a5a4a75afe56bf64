//! Property-based tests for core graph types.
//!
//! Invariants that should hold for any graph:
//! - Edge-index symmetry
//! - Edge membership is order-insensitive
//! - CSV round-trips preserve structure

use ddilink_core::{EdgeIndex, InteractionGraph};
use proptest::prelude::*;

/// Generate a small arbitrary edge list over node IDs 0..50.
fn arb_edges() -> impl Strategy<Value = Vec<(u32, u32)>> {
    prop::collection::vec((0u32..50, 0u32..50), 0..200)
}

fn build_graph(edges: &[(u32, u32)]) -> InteractionGraph {
    let mut g = InteractionGraph::new();
    for &(u, v) in edges {
        g.add_edge(u, v);
    }
    g
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn edge_index_is_symmetric(edges in arb_edges()) {
        let g = build_graph(&edges);
        let index = EdgeIndex::from_graph(&g);
        prop_assert!(index.is_symmetric());
    }

    #[test]
    fn edge_index_doubles_edges(edges in arb_edges()) {
        let g = build_graph(&edges);
        let index = EdgeIndex::from_graph(&g);
        prop_assert_eq!(index.num_directed(), 2 * g.num_edges());
        prop_assert_eq!(index.positive_edges().len(), g.num_edges());
    }

    #[test]
    fn has_edge_is_order_insensitive(edges in arb_edges()) {
        let g = build_graph(&edges);
        for &(u, v) in g.edges() {
            prop_assert!(g.has_edge(u, v));
            prop_assert!(g.has_edge(v, u));
        }
    }

    #[test]
    fn csv_roundtrip_preserves_structure(edges in arb_edges()) {
        let g = build_graph(&edges);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edges.csv");

        g.to_csv_file(&path).unwrap();
        let loaded = InteractionGraph::from_csv_file(&path).unwrap();

        prop_assert_eq!(loaded.num_edges(), g.num_edges());
        for &(u, v) in g.edges() {
            prop_assert!(loaded.has_edge(u, v));
        }
    }
}

#![allow(dead_code)]

use gridstream::{
    grid::{Balance, GridBuilder},
    types::{Edge, EdgeType},
};
use std::path::PathBuf;
use tempfile::TempDir;

/// `0 -> 1 -> 2 -> 3 -> 4` plus the shortcut `0 -> 4`.
pub fn path_graph() -> Vec<Edge> {
    vec![
        Edge::new(0, 1),
        Edge::new(1, 2),
        Edge::new(2, 3),
        Edge::new(3, 4),
        Edge::new(0, 4),
    ]
}

/// A reproducible pseudo-random graph.
pub fn random_graph(vertices: u32, edges: usize, seed: u64) -> Vec<Edge> {
    let mut state = seed;
    let mut next = move || {
        state = state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        (state >> 33) as u32
    };
    (0..edges)
        .map(|_| {
            let (source, target) = (next() % vertices, next() % vertices);
            Edge::weighted(source, target, (next() % 100) as f32 / 10.0 + 0.1)
        })
        .collect()
}

pub fn build(edges: &[Edge], partitions: usize) -> (TempDir, PathBuf) {
    build_with(edges, partitions, EdgeType::Unweighted, Balance::Range)
}

pub fn build_with(
    edges: &[Edge],
    partitions: usize,
    edge_type: EdgeType,
    balance: Balance,
) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("grid");
    GridBuilder::new(&path)
        .edge_type(edge_type)
        .partitions(partitions)
        .balance(balance)
        .build(edges)
        .unwrap();
    (dir, path)
}

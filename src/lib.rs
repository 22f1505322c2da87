//! Out-of-core grid streaming graph computation.
//!
//! A graph is partitioned once into a P×P grid of edge blocks
//! ([`grid::GridBuilder`]), then opened as an [`engine::Graph`] whose
//! `stream_vertices`/`stream_edges` run vertex-centric callbacks in parallel
//! while edge blocks are streamed from disk under a memory budget.

pub use error::{Error, Result};

pub mod atomic;
pub mod bitmap;
pub mod engine;
pub mod error;
pub mod grid;
pub mod memory_manager;
pub mod planner;
pub mod types;
pub mod vertex_array;

//! The on-disk grid: a P×P matrix of edge blocks plus its metadata.

pub use block::block_path;
pub use create::GridBuilder;
pub use meta::{GridMeta, META_FILE};
pub use partition::{degree_boundaries, range_boundaries, Balance};
pub use source::{BinaryEdgeFile, EdgeSource, SqliteEdges, TextEdgeFile};

pub(crate) use block::BlockChunks;

mod block;
mod create;
mod meta;
mod partition;
mod source;

//! The streaming execution engine.

pub use display::BlockTable;
pub use stream::StreamOrder;

use crate::{
    atomic::Scalar,
    bitmap::Bitmap,
    error::{Error, Result},
    grid::{block_path, GridMeta, META_FILE},
    types::{Edge, VertexId},
    vertex_array::{VertexArray, VertexData},
};
use log::{debug, info};
use rayon::prelude::*;
use std::{
    io,
    ops::Add,
    path::{Path, PathBuf},
};

mod display;
mod stream;

/// A partitioned graph bound to its block store.
///
/// Both streaming operations are synchronous parallel-fors over a fixed
/// worker pool. Callbacks may mutate shared vertex arrays and bitmaps only
/// through their atomic operations; no order among vertices, edges or
/// blocks is guaranteed.
pub struct Graph {
    path: PathBuf,
    meta: GridMeta,
    block_bytes: Vec<u64>,
    memory_budget: u64,
    hinted_bytes: Option<usize>,
    pool: rayon::ThreadPool,
}

impl Graph {
    /// Opens the grid at `path` with one worker per hardware thread.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_threads(path, 0)
    }

    /// Opens the grid at `path` with `threads` workers (`0` picks the
    /// hardware parallelism).
    pub fn open_with_threads<P: AsRef<Path>>(path: P, threads: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let meta = GridMeta::read(&path)?;
        let block_bytes = check_blocks(&path, &meta)?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()?;
        let memory_budget = sys_info::mem_info()
            .map(|info| info.avail.saturating_mul(1024))
            .unwrap_or(u64::MAX);
        info!(
            "opened {} ({}) with {} workers",
            path.display(),
            meta,
            pool.current_num_threads()
        );
        Ok(Self {
            path,
            meta,
            block_bytes,
            memory_budget,
            hinted_bytes: None,
            pool,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn meta(&self) -> &GridMeta {
        &self.meta
    }

    pub fn vertices(&self) -> usize {
        self.meta.vertices()
    }

    pub fn edges(&self) -> usize {
        self.meta.edges()
    }

    pub fn partitions(&self) -> usize {
        self.meta.partitions()
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Bytes stored in block `(row, col)`.
    pub fn block_bytes(&self, row: usize, col: usize) -> u64 {
        self.block_bytes[row * self.partitions() + col]
    }

    /// Sets the byte ceiling for streaming; defaults to the memory available
    /// when the graph was opened.
    pub fn set_memory_budget(&mut self, bytes: u64) {
        self.memory_budget = bytes;
    }

    pub fn memory_budget(&self) -> u64 {
        self.memory_budget
    }

    pub fn alloc_bitmap(&self) -> Bitmap {
        Bitmap::new(self.vertices())
    }

    /// Creates a zero-filled vertex array in the file `name` inside the grid
    /// directory.
    pub fn alloc_vertex_array<T: Scalar>(&self, name: &str) -> Result<VertexArray<T>> {
        if name == META_FILE || name.starts_with("block-") || name.starts_with('.') {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("`{}` would clobber the grid", name),
            )));
        }
        Ok(VertexArray::create(self.path.join(name), self.vertices())?)
    }

    /// Declares the vertex arrays the next `stream_edges` calls touch by
    /// destination. Their partition slices are kept within the memory budget
    /// and blocks are visited column by column so a slice stays hot across
    /// all blocks sharing its destination partition. An empty slice clears
    /// the hint. Never changes results.
    pub fn hint(&mut self, arrays: &[&dyn VertexData]) {
        for array in arrays {
            debug_assert_eq!(
                array.len(),
                self.vertices(),
                "hinted array does not cover every vertex"
            );
        }
        self.hinted_bytes = if arrays.is_empty() {
            None
        } else {
            Some(arrays.iter().map(|array| array.record_size()).sum())
        };
        debug!("hinted {:?} bytes per vertex", self.hinted_bytes);
    }

    pub fn clear_hint(&mut self) {
        self.hinted_bytes = None;
    }

    /// Calls `f` once per vertex and returns the sum of the results.
    pub fn stream_vertices<R, F>(&self, f: F) -> R
    where
        R: Send + Default + Add<Output = R>,
        F: Fn(VertexId) -> R + Sync + Send,
    {
        self.stream_vertices_with(f, R::default, |a, b| a + b)
    }

    /// Calls `f` once per vertex and folds the results with `reduce`.
    pub fn stream_vertices_with<R, F, ID, OP>(&self, f: F, identity: ID, reduce: OP) -> R
    where
        R: Send,
        F: Fn(VertexId) -> R + Sync + Send,
        ID: Fn() -> R + Sync + Send,
        OP: Fn(R, R) -> R + Sync + Send,
    {
        let vertices = self.vertices() as VertexId;
        self.pool.install(|| {
            (0..vertices)
                .into_par_iter()
                .map(&f)
                .reduce(&identity, &reduce)
        })
    }

    /// Calls `f` on every edge whose source is set in `active` and returns
    /// the sum of the results.
    pub fn stream_edges<R, F>(&self, f: F, active: &Bitmap) -> Result<R>
    where
        R: Send + Default + Add<Output = R>,
        F: Fn(&Edge) -> R + Sync + Send,
    {
        self.stream_edges_with(f, active, R::default, |a, b| a + b)
    }

    /// Calls `f` on every edge whose source is set in `active` and folds the
    /// results with `reduce`.
    ///
    /// Any read failure aborts the whole call; no partial result is returned.
    pub fn stream_edges_with<R, F, ID, OP>(
        &self,
        f: F,
        active: &Bitmap,
        identity: ID,
        reduce: OP,
    ) -> Result<R>
    where
        R: Send,
        F: Fn(&Edge) -> R + Sync + Send,
        ID: Fn() -> R + Sync + Send,
        OP: Fn(R, R) -> R + Sync + Send,
    {
        debug_assert_eq!(active.len(), self.vertices());
        stream::stream_edges(self, &f, active, &identity, &reduce)
    }

    /// The block order the next `stream_edges` call uses.
    pub fn stream_order(&self) -> StreamOrder {
        match self.hinted_bytes {
            Some(_) => StreamOrder::ColumnMajor,
            None => StreamOrder::RowMajor,
        }
    }

    pub fn block_table(&self) -> BlockTable<'_> {
        BlockTable::new(&self.meta, &self.block_bytes)
    }
}

/// Returns the size of every block, row-major, after checking it against
/// the metadata.
fn check_blocks(dir: &Path, meta: &GridMeta) -> Result<Vec<u64>> {
    let p = meta.partitions();
    let record = meta.edge_type().record_size() as u64;
    let mut block_bytes = Vec::with_capacity(p * p);
    for row in 0..p {
        for col in 0..p {
            let len = std::fs::metadata(block_path(dir, row, col))
                .map_err(|e| Error::CorruptBlock {
                    row,
                    col,
                    reason: e.to_string(),
                })?
                .len();
            if len % record != 0 {
                return Err(Error::CorruptBlock {
                    row,
                    col,
                    reason: format!("{} bytes is not a whole number of records", len),
                });
            }
            block_bytes.push(len);
        }
    }
    let stored = block_bytes.iter().sum::<u64>() / record;
    if stored != meta.edges() as u64 {
        return Err(Error::CorruptMeta(format!(
            "blocks hold {} edges, metadata says {}",
            stored,
            meta.edges()
        )));
    }
    Ok(block_bytes)
}

use super::{
    block::BlockWriter,
    meta::{GridMeta, META_FILE},
    partition::{degree_boundaries, range_boundaries, Balance},
    source::EdgeSource,
};
use crate::{
    error::{Error, Result},
    memory_manager::MemoryManager,
    planner,
    types::{EdgeType, VertexId},
};
use log::info;
use std::{
    io,
    mem::size_of,
    path::{Path, PathBuf},
};

/// How the builder picks the grid dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Partitions {
    Fixed(usize),
    Budget {
        bytes: u64,
        record_size: usize,
        resident_arrays: usize,
    },
}

/// Partitions a raw edge source into a grid directory.
///
/// ```no_run
/// use gridstream::grid::{GridBuilder, TextEdgeFile};
///
/// let meta = GridBuilder::new("graph.grid")
///     .partitions(4)
///     .build(&TextEdgeFile::new("graph.txt"))
///     .unwrap();
/// println!("{}", meta);
/// ```
pub struct GridBuilder {
    output: PathBuf,
    edge_type: EdgeType,
    vertices: Option<usize>,
    partitions: Partitions,
    balance: Balance,
    buffer_bytes: Option<usize>,
}

impl GridBuilder {
    pub fn new<P: AsRef<Path>>(output: P) -> Self {
        Self {
            output: output.as_ref().to_path_buf(),
            edge_type: EdgeType::Unweighted,
            vertices: None,
            partitions: Partitions::Fixed(1),
            balance: Balance::Range,
            buffer_bytes: None,
        }
    }

    pub fn edge_type(mut self, edge_type: EdgeType) -> Self {
        self.edge_type = edge_type;
        self
    }

    /// Declares the vertex count; ids at or above it are rejected.
    /// Without it the count is `max id + 1`.
    pub fn vertices(mut self, vertices: usize) -> Self {
        self.vertices = Some(vertices);
        self
    }

    pub fn partitions(mut self, partitions: usize) -> Self {
        self.partitions = Partitions::Fixed(partitions.max(1));
        self
    }

    /// Lets the planner choose the smallest grid whose blocks fit in `bytes`
    /// next to `resident_arrays` vertex arrays of `record_size` bytes each.
    pub fn memory_budget(mut self, bytes: u64, record_size: usize, resident_arrays: usize) -> Self {
        self.partitions = Partitions::Budget {
            bytes,
            record_size,
            resident_arrays,
        };
        self
    }

    pub fn balance(mut self, balance: Balance) -> Self {
        self.balance = balance;
        self
    }

    /// Ceiling of edge bytes staged in memory before spilling to the blocks.
    pub fn buffer_bytes(mut self, bytes: usize) -> Self {
        self.buffer_bytes = Some(bytes);
        self
    }

    /// Builds the grid. Everything is written into a staging directory that
    /// replaces `output` only once the build succeeded. An existing `output`
    /// is replaced only if it holds a grid.
    pub fn build<S: EdgeSource + ?Sized>(&self, source: &S) -> Result<GridMeta> {
        let replace = self.existing_grid()?;
        let parent = match self.output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent)?;
        let staging = tempfile::Builder::new()
            .prefix(".gridstream")
            .tempdir_in(&parent)?;
        let meta = self.build_in(source, staging.path())?;
        // The old grid is parked here and deleted when `retired` drops.
        let retired = tempfile::Builder::new()
            .prefix(".gridstream-old")
            .tempdir_in(&parent)?;
        let parked = retired.path().join("grid");
        if replace {
            std::fs::rename(&self.output, &parked)?;
        }
        if let Err(e) = std::fs::rename(staging.path(), &self.output) {
            if replace {
                std::fs::rename(&parked, &self.output)?;
            }
            return Err(e.into());
        }
        // `staging` no longer exists, so dropping it removes nothing.
        info!("grid written to {}", self.output.display());
        Ok(meta)
    }

    /// Whether `output` already holds a grid. Anything else at that path is
    /// left alone and reported.
    fn existing_grid(&self) -> Result<bool> {
        if !self.output.exists() {
            return Ok(false);
        }
        if self.output.join(META_FILE).is_file() {
            return Ok(true);
        }
        Err(Error::Io(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} exists and is not a grid", self.output.display()),
        )))
    }

    fn build_in<S: EdgeSource + ?Sized>(&self, source: &S, dir: &Path) -> Result<GridMeta> {
        info!("scanning edges...");
        let (vertices, edges, degrees) = self.scan(source)?;
        info!("{} vertices, {} edges", vertices, edges);
        let partitions = match self.partitions {
            Partitions::Fixed(p) => p,
            Partitions::Budget {
                bytes,
                record_size,
                resident_arrays,
            } => planner::grid_dimension(
                vertices,
                edges,
                self.edge_type.record_size(),
                record_size,
                resident_arrays,
                bytes,
            )?,
        };
        let boundaries = match &degrees {
            Some(degrees) => {
                degree_boundaries(unsafe { degrees.as_slice::<u64>(0, vertices) }, partitions)
            }
            None => range_boundaries(vertices, partitions),
        };
        drop(degrees);
        let meta = GridMeta::new(self.edge_type, vertices, edges, boundaries)?;
        info!("partitions={} boundaries={:?}", partitions, meta.boundaries());
        let buffer_bytes = self.buffer_bytes.unwrap_or_else(default_buffer_bytes);
        info!("buffer_size={}M", buffer_bytes / 1024 / 1024);
        let mut writer = BlockWriter::create(dir, partitions, self.edge_type, buffer_bytes)?;
        info!("writing blocks...");
        source.for_each_edge(&mut |edge| {
            writer.push(
                meta.partition_of(edge.source),
                meta.partition_of(edge.target),
                &edge,
            )
        })?;
        let flushes = writer.finish()?;
        info!("wrote blocks in {} flushes", flushes);
        meta.write(dir)?;
        Ok(meta)
    }

    /// First pass: counts edges, checks or derives the vertex count and,
    /// when degree balancing, accumulates per-vertex degrees.
    fn scan<S: EdgeSource + ?Sized>(
        &self,
        source: &S,
    ) -> Result<(usize, usize, Option<MemoryManager>)> {
        let mut edges = 0usize;
        let mut max_id: Option<VertexId> = None;
        source.for_each_edge(&mut |edge| {
            let hi = edge.source.max(edge.target);
            if let Some(n) = self.vertices {
                if hi as usize >= n {
                    return Err(Error::MalformedInput(format!(
                        "edge {} -> {} references a vertex beyond the declared {}",
                        edge.source, edge.target, n
                    )));
                }
            }
            max_id = Some(max_id.map_or(hi, |m| m.max(hi)));
            edges += 1;
            Ok(())
        })?;
        let vertices = self
            .vertices
            .unwrap_or_else(|| max_id.map_or(0, |m| m as usize + 1));
        if vertices > VertexId::MAX as usize {
            return Err(Error::MalformedInput(format!(
                "{} vertices exceed the 32-bit id space",
                vertices
            )));
        }
        let degrees = match self.balance {
            Balance::Range => None,
            Balance::Degree => {
                info!("counting degrees...");
                let mut mm = MemoryManager::new_scratch(vertices * size_of::<u64>())?;
                let degrees = unsafe { mm.as_mut_slice::<u64>(0, vertices) };
                source.for_each_edge(&mut |edge| {
                    degrees[edge.source as usize] += 1;
                    degrees[edge.target as usize] += 1;
                    Ok(())
                })?;
                Some(mm)
            }
        };
        Ok((vertices, edges, degrees))
    }
}

/// A fifth of the available memory, at least 64 MiB.
fn default_buffer_bytes() -> usize {
    let avail = sys_info::mem_info()
        .map(|info| info.avail.saturating_mul(1024))
        .unwrap_or(0);
    ((avail / 5) as usize).max(64 << 20)
}

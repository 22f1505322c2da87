//! Raw edge sources the grid can be built from.

use crate::{
    error::{Error, Result},
    types::{Edge, EdgeType, VertexId, Weight},
};
use std::{
    convert::TryFrom,
    fs::File,
    io::{BufRead, BufReader, Read},
    path::{Path, PathBuf},
};

const READ_BUFFER_BYTES: usize = 4 << 20;

/// A re-readable sequence of edges.
///
/// The builder scans the source twice, so `for_each_edge` must yield the same
/// edges every time it is called.
pub trait EdgeSource {
    fn for_each_edge(&self, f: &mut dyn FnMut(Edge) -> Result<()>) -> Result<()>;
}

impl EdgeSource for [Edge] {
    fn for_each_edge(&self, f: &mut dyn FnMut(Edge) -> Result<()>) -> Result<()> {
        self.iter().try_for_each(|&edge| f(edge))
    }
}

impl EdgeSource for Vec<Edge> {
    fn for_each_edge(&self, f: &mut dyn FnMut(Edge) -> Result<()>) -> Result<()> {
        self.as_slice().for_each_edge(f)
    }
}

/// A file of fixed-width little-endian records, `u32 source, u32 target`
/// followed by an `f32` weight for weighted graphs.
pub struct BinaryEdgeFile {
    path: PathBuf,
    edge_type: EdgeType,
}

impl BinaryEdgeFile {
    pub fn new<P: AsRef<Path>>(path: P, edge_type: EdgeType) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            edge_type,
        }
    }
}

impl EdgeSource for BinaryEdgeFile {
    fn for_each_edge(&self, f: &mut dyn FnMut(Edge) -> Result<()>) -> Result<()> {
        let file = File::open(&self.path)?;
        let len = file.metadata()?.len();
        let record_size = self.edge_type.record_size();
        if len % record_size as u64 != 0 {
            return Err(Error::MalformedInput(format!(
                "{}: {} bytes is not a whole number of {}-byte records",
                self.path.display(),
                len,
                record_size
            )));
        }
        let mut reader = BufReader::with_capacity(READ_BUFFER_BYTES, file);
        let mut record = vec![0u8; record_size];
        for _ in 0..len / record_size as u64 {
            reader.read_exact(&mut record)?;
            f(self.edge_type.decode(&record))?;
        }
        Ok(())
    }
}

/// A whitespace-separated edge list, one `source target [weight]` per line.
///
/// Empty lines and lines starting with `#` or `%` are skipped.
pub struct TextEdgeFile {
    path: PathBuf,
}

impl TextEdgeFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl EdgeSource for TextEdgeFile {
    fn for_each_edge(&self, f: &mut dyn FnMut(Edge) -> Result<()>) -> Result<()> {
        let reader = BufReader::with_capacity(READ_BUFFER_BYTES, File::open(&self.path)?);
        for (no, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('%') {
                continue;
            }
            let edge = parse_line(line).ok_or_else(|| {
                Error::MalformedInput(format!(
                    "{}:{}: cannot parse {:?}",
                    self.path.display(),
                    no + 1,
                    line
                ))
            })?;
            f(edge)?;
        }
        Ok(())
    }
}

fn parse_line(line: &str) -> Option<Edge> {
    let mut words = line.split_whitespace();
    let source = words.next()?.parse::<VertexId>().ok()?;
    let target = words.next()?.parse::<VertexId>().ok()?;
    let weight = match words.next() {
        Some(word) => word.parse::<Weight>().ok()?,
        None => 1.0,
    };
    match words.next() {
        Some(_) => None,
        None => Some(Edge::weighted(source, target, weight)),
    }
}

/// The `edges` table of a SQLite3 database.
///
/// The table must have the following schema:
///
/// ```sql
/// CREATE TABLE edges (src INT, dst INT);
/// ```
///
/// with an extra `weight REAL` column for weighted graphs.
pub struct SqliteEdges {
    path: PathBuf,
    edge_type: EdgeType,
}

impl SqliteEdges {
    pub fn new<P: AsRef<Path>>(path: P, edge_type: EdgeType) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            edge_type,
        }
    }
}

impl EdgeSource for SqliteEdges {
    fn for_each_edge(&self, f: &mut dyn FnMut(Edge) -> Result<()>) -> Result<()> {
        let conn = rusqlite::Connection::open_with_flags(
            &self.path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
        )?;
        let mut stmt = conn.prepare(match self.edge_type {
            EdgeType::Unweighted => "SELECT src, dst FROM edges",
            EdgeType::Weighted => "SELECT src, dst, weight FROM edges",
        })?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let source = vertex_id(row.get(0)?)?;
            let target = vertex_id(row.get(1)?)?;
            let edge = match self.edge_type {
                EdgeType::Unweighted => Edge::new(source, target),
                EdgeType::Weighted => Edge::weighted(source, target, row.get::<_, f64>(2)? as Weight),
            };
            f(edge)?;
        }
        Ok(())
    }
}

fn vertex_id(value: i64) -> Result<VertexId> {
    VertexId::try_from(value)
        .map_err(|_| Error::MalformedInput(format!("vertex id {} out of range", value)))
}

//! Edge block files.
//!
//! Block `(i, j)` holds, back to back, the records of every edge whose source
//! lies in partition `i` and whose target lies in partition `j`.

use crate::{
    error::{Error, Result},
    types::{Edge, EdgeType},
};
use log::debug;
use std::{
    fs::{File, OpenOptions},
    io::{Read, Write},
    path::{Path, PathBuf},
};

pub fn block_path<P: AsRef<Path>>(dir: P, row: usize, col: usize) -> PathBuf {
    dir.as_ref().join(format!("block-{}-{}", row, col))
}

/// Per-block staging buffers that spill to the block files once the staged
/// total exceeds a ceiling.
pub(crate) struct BlockWriter {
    dir: PathBuf,
    partitions: usize,
    edge_type: EdgeType,
    buffers: Vec<Vec<u8>>,
    staged: usize,
    max_staged: usize,
    flushes: usize,
}

impl BlockWriter {
    /// Creates every block file of the grid, empty.
    pub fn create<P: AsRef<Path>>(
        dir: P,
        partitions: usize,
        edge_type: EdgeType,
        max_staged: usize,
    ) -> Result<Self> {
        for row in 0..partitions {
            for col in 0..partitions {
                File::create(block_path(dir.as_ref(), row, col))?;
            }
        }
        Ok(Self {
            dir: dir.as_ref().to_path_buf(),
            partitions,
            edge_type,
            buffers: vec![vec![]; partitions * partitions],
            staged: 0,
            max_staged: max_staged.max(edge_type.record_size()),
            flushes: 0,
        })
    }

    pub fn push(&mut self, row: usize, col: usize, edge: &Edge) -> Result<()> {
        self.edge_type
            .encode(edge, &mut self.buffers[row * self.partitions + col]);
        self.staged += self.edge_type.record_size();
        if self.staged >= self.max_staged {
            self.flush()?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        for (i, buffer) in self.buffers.iter_mut().enumerate() {
            if buffer.is_empty() {
                continue;
            }
            // Taken, not cleared: a flushed buffer must not keep its capacity.
            let buffer = std::mem::take(buffer);
            let path = block_path(&self.dir, i / self.partitions, i % self.partitions);
            OpenOptions::new()
                .append(true)
                .open(path)?
                .write_all(&buffer)?;
        }
        debug!("flushed {} staged bytes", self.staged);
        self.staged = 0;
        self.flushes += 1;
        Ok(())
    }

    /// Flushes what is left and returns the number of flushes.
    pub fn finish(mut self) -> Result<usize> {
        if self.staged > 0 {
            self.flush()?;
        }
        Ok(self.flushes)
    }
}

/// Sequential chunked reader over one block file.
pub(crate) struct BlockChunks {
    file: File,
    row: usize,
    col: usize,
    remaining: u64,
    chunk_bytes: usize,
}

impl BlockChunks {
    /// Opens block `(row, col)` expecting exactly `len` bytes.
    pub fn open<P: AsRef<Path>>(
        dir: P,
        row: usize,
        col: usize,
        len: u64,
        chunk_bytes: usize,
    ) -> Result<Self> {
        let file = File::open(block_path(dir, row, col)).map_err(|e| Error::CorruptBlock {
            row,
            col,
            reason: e.to_string(),
        })?;
        Ok(Self {
            file,
            row,
            col,
            remaining: len,
            chunk_bytes,
        })
    }
}

impl Iterator for BlockChunks {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let len = self.remaining.min(self.chunk_bytes as u64) as usize;
        let mut chunk = vec![0u8; len];
        Some(match self.file.read_exact(&mut chunk) {
            Ok(()) => {
                self.remaining -= len as u64;
                Ok(chunk)
            }
            Err(e) => {
                self.remaining = 0;
                Err(Error::CorruptBlock {
                    row: self.row,
                    col: self.col,
                    reason: e.to_string(),
                })
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writer_spills_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        // Two records fit before a spill.
        let mut writer = BlockWriter::create(dir.path(), 2, EdgeType::Unweighted, 16).unwrap();
        writer.push(0, 1, &Edge::new(0, 5)).unwrap();
        writer.push(1, 1, &Edge::new(6, 7)).unwrap();
        writer.push(0, 1, &Edge::new(1, 6)).unwrap();
        assert_eq!(writer.finish().unwrap(), 2);
        let len = |r, c| std::fs::metadata(block_path(dir.path(), r, c)).unwrap().len();
        assert_eq!((len(0, 0), len(0, 1), len(1, 0), len(1, 1)), (0, 16, 0, 8));
        let bytes = std::fs::read(block_path(dir.path(), 0, 1)).unwrap();
        assert_eq!(EdgeType::Unweighted.decode(&bytes[..8]), Edge::new(0, 5));
        assert_eq!(EdgeType::Unweighted.decode(&bytes[8..]), Edge::new(1, 6));
    }

    #[test]
    fn test_flush_releases_staging_memory() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = BlockWriter::create(dir.path(), 8, EdgeType::Unweighted, 8192).unwrap();
        let staged_capacity =
            |writer: &BlockWriter| writer.buffers.iter().map(Vec::capacity).sum::<usize>();
        // Source-sorted input fills one row per flush window.
        for row in 0..8 {
            for i in 0..1024 {
                writer.push(row, i % 8, &Edge::new(row as u32, i as u32)).unwrap();
            }
            assert_eq!(writer.staged, 0);
            assert_eq!(staged_capacity(&writer), 0);
        }
        assert_eq!(writer.finish().unwrap(), 8);
        let total: u64 = (0..8)
            .flat_map(|row| (0..8).map(move |col| (row, col)))
            .map(|(row, col)| std::fs::metadata(block_path(dir.path(), row, col)).unwrap().len())
            .sum();
        assert_eq!(total, 8 * 1024 * 8);
    }

    #[test]
    fn test_chunks() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(block_path(dir.path(), 0, 0), vec![7u8; 20]).unwrap();
        let chunks: Vec<_> = BlockChunks::open(dir.path(), 0, 0, 20, 8)
            .unwrap()
            .map(|chunk| chunk.unwrap().len())
            .collect();
        assert_eq!(chunks, vec![8, 8, 4]);
    }

    #[test]
    fn test_short_block() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(block_path(dir.path(), 1, 0), vec![0u8; 8]).unwrap();
        let mut chunks = BlockChunks::open(dir.path(), 1, 0, 16, 16).unwrap();
        assert!(matches!(
            chunks.next(),
            Some(Err(Error::CorruptBlock { row: 1, col: 0, .. }))
        ));
        assert!(chunks.next().is_none());
    }

    #[test]
    fn test_missing_block() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            BlockChunks::open(dir.path(), 0, 0, 8, 8),
            Err(Error::CorruptBlock { .. })
        ));
    }
}

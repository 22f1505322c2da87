use crate::{
    error::{Error, Result},
    types::{EdgeType, VertexId},
};
use derive_more::Display;
use itertools::Itertools;
use std::{ops::Range, path::Path};

const MAGIC: &str = "gridstream";
const VERSION: u32 = 1;

/// Name of the metadata file inside a grid directory.
pub const META_FILE: &str = "meta";

/// The metadata of a partitioned graph.
///
/// The on-disk format is a small text file:
///
/// ```text
/// gridstream 1
/// edge_type 0
/// vertices 5
/// edges 5
/// partitions 2
/// boundaries 0 3 5
/// ```
#[derive(Debug, Display, Clone, PartialEq, Eq)]
#[display(
    fmt = "{} vertices, {} edges, {}x{} {} grid",
    vertices,
    edges,
    partitions,
    partitions,
    edge_type
)]
pub struct GridMeta {
    edge_type: EdgeType,
    vertices: usize,
    edges: usize,
    partitions: usize,
    boundaries: Vec<VertexId>,
}

impl GridMeta {
    /// `boundaries` holds `P + 1` non-decreasing ids from `0` to `vertices`.
    pub fn new(
        edge_type: EdgeType,
        vertices: usize,
        edges: usize,
        boundaries: Vec<VertexId>,
    ) -> Result<Self> {
        if boundaries.len() < 2 {
            return Err(Error::CorruptMeta(String::from(
                "at least one partition is required",
            )));
        }
        if boundaries[0] != 0 || *boundaries.last().unwrap_or(&0) as usize != vertices {
            return Err(Error::CorruptMeta(format!(
                "boundaries must span [0, {}), got {:?}",
                vertices, boundaries
            )));
        }
        if boundaries.windows(2).any(|w| w[0] > w[1]) {
            return Err(Error::CorruptMeta(format!(
                "boundaries are not sorted: {:?}",
                boundaries
            )));
        }
        Ok(Self {
            edge_type,
            vertices,
            edges,
            partitions: boundaries.len() - 1,
            boundaries,
        })
    }

    pub fn edge_type(&self) -> EdgeType {
        self.edge_type
    }

    pub fn vertices(&self) -> usize {
        self.vertices
    }

    pub fn edges(&self) -> usize {
        self.edges
    }

    pub fn partitions(&self) -> usize {
        self.partitions
    }

    pub fn boundaries(&self) -> &[VertexId] {
        &self.boundaries
    }

    /// The vertex ids of partition `i`.
    pub fn partition(&self, i: usize) -> Range<usize> {
        self.boundaries[i] as usize..self.boundaries[i + 1] as usize
    }

    /// The partition that holds `vid`.
    pub fn partition_of(&self, vid: VertexId) -> usize {
        // The first boundary greater than `vid` closes its partition.
        self.boundaries[1..].partition_point(|&b| b <= vid)
    }

    pub fn max_partition_len(&self) -> usize {
        (0..self.partitions)
            .map(|i| self.partition(i).len())
            .max()
            .unwrap_or(0)
    }

    pub fn write<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let text = format!(
            "{} {}\nedge_type {}\nvertices {}\nedges {}\npartitions {}\nboundaries {}\n",
            MAGIC,
            VERSION,
            self.edge_type.code(),
            self.vertices,
            self.edges,
            self.partitions,
            self.boundaries.iter().join(" ")
        );
        std::fs::write(dir.as_ref().join(META_FILE), text)?;
        Ok(())
    }

    pub fn read<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let text = std::fs::read_to_string(dir.as_ref().join(META_FILE))?;
        Self::parse(&text)
    }

    fn parse(text: &str) -> Result<Self> {
        let mut lines = text.lines();
        let mut field = |name: &str| next_field(&mut lines, name);
        let version = field(MAGIC)?;
        if version != [VERSION.to_string().as_str()] {
            return Err(Error::CorruptMeta(format!(
                "unsupported version {:?}",
                version
            )));
        }
        let edge_type = single::<u8>(field("edge_type")?, "edge_type")?;
        let edge_type = EdgeType::from_code(edge_type)
            .ok_or_else(|| Error::CorruptMeta(format!("unknown edge type {}", edge_type)))?;
        let vertices = single::<usize>(field("vertices")?, "vertices")?;
        let edges = single::<usize>(field("edges")?, "edges")?;
        let partitions = single::<usize>(field("partitions")?, "partitions")?;
        let boundaries = field("boundaries")?
            .into_iter()
            .map(|word| parse_word::<VertexId>(word, "boundaries"))
            .collect::<Result<Vec<_>>>()?;
        if boundaries.len() != partitions + 1 {
            return Err(Error::CorruptMeta(format!(
                "{} partitions need {} boundaries, found {}",
                partitions,
                partitions + 1,
                boundaries.len()
            )));
        }
        Self::new(edge_type, vertices, edges, boundaries)
    }
}

fn next_field<'a, I>(lines: &mut I, name: &str) -> Result<Vec<&'a str>>
where
    I: Iterator<Item = &'a str>,
{
    let line = lines
        .next()
        .ok_or_else(|| Error::CorruptMeta(format!("missing `{}`", name)))?;
    let mut words = line.split_whitespace();
    match words.next() {
        Some(key) if key == name => Ok(words.collect()),
        other => Err(Error::CorruptMeta(format!(
            "expected `{}`, found {:?}",
            name, other
        ))),
    }
}

fn single<T: std::str::FromStr>(words: Vec<&str>, name: &str) -> Result<T> {
    match words.as_slice() {
        [word] => parse_word(word, name),
        _ => Err(Error::CorruptMeta(format!(
            "`{}` takes exactly one value",
            name
        ))),
    }
}

fn parse_word<T: std::str::FromStr>(word: &str, name: &str) -> Result<T> {
    word.parse()
        .map_err(|_| Error::CorruptMeta(format!("invalid `{}` value {:?}", name, word)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> GridMeta {
        GridMeta::new(EdgeType::Weighted, 5, 7, vec![0, 3, 5]).unwrap()
    }

    #[test]
    fn test_partition_of() {
        let meta = GridMeta::new(EdgeType::Unweighted, 10, 0, vec![0, 3, 3, 7, 10]).unwrap();
        assert_eq!(meta.partitions(), 4);
        assert_eq!(meta.partition_of(0), 0);
        assert_eq!(meta.partition_of(2), 0);
        assert_eq!(meta.partition_of(3), 2);
        assert_eq!(meta.partition_of(6), 2);
        assert_eq!(meta.partition_of(7), 3);
        assert_eq!(meta.partition_of(9), 3);
        assert_eq!(meta.partition(1), 3..3);
        assert_eq!(meta.max_partition_len(), 4);
    }

    #[test]
    fn test_write_read() {
        let dir = tempfile::tempdir().unwrap();
        meta().write(dir.path()).unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join(META_FILE)).unwrap(),
            "gridstream 1\nedge_type 1\nvertices 5\nedges 7\npartitions 2\nboundaries 0 3 5\n"
        );
        assert_eq!(GridMeta::read(dir.path()).unwrap(), meta());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            meta().to_string(),
            "5 vertices, 7 edges, 2x2 weighted grid"
        );
    }

    #[test]
    fn test_invalid_boundaries() {
        assert!(GridMeta::new(EdgeType::Unweighted, 5, 0, vec![0]).is_err());
        assert!(GridMeta::new(EdgeType::Unweighted, 5, 0, vec![1, 5]).is_err());
        assert!(GridMeta::new(EdgeType::Unweighted, 5, 0, vec![0, 4]).is_err());
        assert!(GridMeta::new(EdgeType::Unweighted, 5, 0, vec![0, 4, 2, 5]).is_err());
    }

    #[test]
    fn test_corrupt_text() {
        for text in &[
            "",
            "gridstream 2\n",
            "gridstream 1\nedge_type 9\nvertices 1\nedges 0\npartitions 1\nboundaries 0 1\n",
            "gridstream 1\nedge_type 0\nvertices x\nedges 0\npartitions 1\nboundaries 0 1\n",
            "gridstream 1\nedge_type 0\nvertices 1\nedges 0\npartitions 2\nboundaries 0 1\n",
            "gridstream 1\nedge_type 0\nvertices 1\nedges 0\n",
        ] {
            assert!(
                matches!(GridMeta::parse(text), Err(Error::CorruptMeta(_))),
                "{:?}",
                text
            );
        }
    }
}

//! Various types shared by the grid and the engine.

use derive_more::Display;
use std::mem::size_of;

/// The vertex id type.
pub type VertexId = u32;

/// The edge weight type.
pub type Weight = f32;

/// A directed edge as seen by the streaming callbacks.
///
/// Unweighted graphs report a weight of `1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub source: VertexId,
    pub target: VertexId,
    pub weight: Weight,
}

impl Edge {
    pub fn new(source: VertexId, target: VertexId) -> Self {
        Self {
            source,
            target,
            weight: 1.0,
        }
    }

    pub fn weighted(source: VertexId, target: VertexId, weight: Weight) -> Self {
        Self {
            source,
            target,
            weight,
        }
    }
}

/// The on-disk edge record layout.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum EdgeType {
    #[display(fmt = "unweighted")]
    Unweighted,
    #[display(fmt = "weighted")]
    Weighted,
}

impl EdgeType {
    /// Size of one record in bytes.
    pub fn record_size(self) -> usize {
        match self {
            EdgeType::Unweighted => 2 * size_of::<VertexId>(),
            EdgeType::Weighted => 2 * size_of::<VertexId>() + size_of::<Weight>(),
        }
    }

    pub(crate) fn code(self) -> u8 {
        match self {
            EdgeType::Unweighted => 0,
            EdgeType::Weighted => 1,
        }
    }

    pub(crate) fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(EdgeType::Unweighted),
            1 => Some(EdgeType::Weighted),
            _ => None,
        }
    }

    /// Appends the little-endian record of `edge` to `buf`.
    pub fn encode(self, edge: &Edge, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&edge.source.to_le_bytes());
        buf.extend_from_slice(&edge.target.to_le_bytes());
        if self == EdgeType::Weighted {
            buf.extend_from_slice(&edge.weight.to_le_bytes());
        }
    }

    /// Decodes one record; `record` must be exactly `record_size()` bytes.
    #[inline]
    pub fn decode(self, record: &[u8]) -> Edge {
        let source = u32::from_le_bytes([record[0], record[1], record[2], record[3]]);
        let target = u32::from_le_bytes([record[4], record[5], record[6], record[7]]);
        match self {
            EdgeType::Unweighted => Edge::new(source, target),
            EdgeType::Weighted => Edge::weighted(
                source,
                target,
                f32::from_le_bytes([record[8], record[9], record[10], record[11]]),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_size() {
        assert_eq!(EdgeType::Unweighted.record_size(), 8);
        assert_eq!(EdgeType::Weighted.record_size(), 12);
    }

    #[test]
    fn test_decode_unweighted_defaults_weight() {
        let mut buf = vec![];
        EdgeType::Unweighted.encode(&Edge::weighted(7, 9, 3.5), &mut buf);
        assert_eq!(buf.len(), 8);
        assert_eq!(EdgeType::Unweighted.decode(&buf), Edge::new(7, 9));
    }

    #[test]
    fn test_decode_weighted() {
        let mut buf = vec![];
        EdgeType::Weighted.encode(&Edge::weighted(1, 2, 0.25), &mut buf);
        assert_eq!(EdgeType::Weighted.decode(&buf), Edge::weighted(1, 2, 0.25));
    }

    #[test]
    fn test_edge_type_code() {
        for t in [EdgeType::Unweighted, EdgeType::Weighted].iter() {
            assert_eq!(EdgeType::from_code(t.code()), Some(*t));
        }
        assert_eq!(EdgeType::from_code(7), None);
    }
}

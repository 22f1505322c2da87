use crate::types::VertexId;

/// How vertex ids are split into partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Balance {
    /// Equal-width id ranges.
    Range,
    /// Ranges carrying roughly the same number of edge endpoints.
    Degree,
}

/// Splits `[0, vertices)` into `partitions` ranges of (nearly) equal width.
pub fn range_boundaries(vertices: usize, partitions: usize) -> Vec<VertexId> {
    (0..=partitions)
        .map(|i| (i as u64 * vertices as u64 / partitions as u64) as VertexId)
        .collect()
}

/// Splits `[0, degrees.len())` so every partition holds about
/// `sum(degrees) / partitions` endpoints.
///
/// A single heavy vertex can make some partitions empty; boundaries stay
/// non-decreasing either way.
pub fn degree_boundaries(degrees: &[u64], partitions: usize) -> Vec<VertexId> {
    let total: u64 = degrees.iter().sum();
    if total == 0 {
        return range_boundaries(degrees.len(), partitions);
    }
    let mut boundaries = Vec::with_capacity(partitions + 1);
    boundaries.push(0);
    let mut acc = 0u64;
    let mut next = 1;
    for (vid, &degree) in degrees.iter().enumerate() {
        acc += degree;
        // Close every partition whose share is now covered.
        while next < partitions && acc * partitions as u64 >= total * next as u64 {
            boundaries.push((vid + 1) as VertexId);
            next += 1;
        }
    }
    while boundaries.len() < partitions + 1 {
        boundaries.push(degrees.len() as VertexId);
    }
    boundaries
}

//! The memory budget planner.
//!
//! At build time it fixes the grid dimension P; at run time it splits the
//! budget left over by the hinted vertex arrays into I/O chunks.

use crate::{
    error::{Error, Result},
    grid::GridMeta,
};

/// Largest grid dimension the planner will consider.
pub const MAX_PARTITIONS: usize = 4096;

/// Upper bound for one I/O chunk.
pub const IO_CHUNK_BYTES: usize = 24 << 20;

/// Upper bound for the number of chunks read ahead of the workers.
pub const MAX_PREFETCH: usize = 4;

/// Returns the smallest P such that one partition slice of every resident
/// vertex array plus one average edge block fit in `budget`.
pub fn grid_dimension(
    vertices: usize,
    edges: usize,
    edge_bytes: usize,
    record_size: usize,
    resident_arrays: usize,
    budget: u64,
) -> Result<usize> {
    let ceiling = MAX_PARTITIONS.min(vertices.max(1));
    let footprint = |p: usize| -> u64 {
        let slice = ceil_div(vertices as u64, p as u64) * (record_size * resident_arrays) as u64;
        let block = ceil_div(edges as u64 * edge_bytes as u64, (p * p) as u64);
        slice + block
    };
    (1..=ceiling)
        .find(|&p| footprint(p) <= budget)
        .ok_or_else(|| Error::BudgetTooSmall {
            budget,
            required: footprint(ceiling),
        })
}

/// How one `stream_edges` call spends its budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamPlan {
    /// Bytes per I/O chunk, a multiple of the edge record size.
    pub chunk_bytes: usize,
    /// Number of chunks the loader may run ahead.
    pub prefetch: usize,
}

impl StreamPlan {
    pub fn new(meta: &GridMeta, budget: u64, hinted_bytes_per_vertex: usize) -> Result<Self> {
        let record = meta.edge_type().record_size() as u64;
        let slice = meta.max_partition_len() as u64 * hinted_bytes_per_vertex as u64;
        // Live chunks: `prefetch` queued, one being read and one being processed.
        let spare = budget.saturating_sub(slice);
        let chunk = (spare / 3).min(IO_CHUNK_BYTES as u64) / record * record;
        if chunk == 0 {
            return Err(Error::BudgetTooSmall {
                budget,
                required: slice + 3 * record,
            });
        }
        let prefetch = ((spare / chunk).saturating_sub(2) as usize).clamp(1, MAX_PREFETCH);
        Ok(Self {
            chunk_bytes: chunk as usize,
            prefetch,
        })
    }
}

fn ceil_div(a: u64, b: u64) -> u64 {
    (a + b - 1) / b
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EdgeType;

    #[test]
    fn test_grid_dimension_fits_in_one() {
        assert_eq!(grid_dimension(100, 1000, 8, 4, 1, 1 << 20).unwrap(), 1);
    }

    #[test]
    fn test_grid_dimension_grows_with_edges() {
        // p = 1: 400 + 8000; p = 2: 200 + 2000; p = 3: 136 + 889.
        assert_eq!(grid_dimension(100, 1000, 8, 4, 1, 2200).unwrap(), 2);
        assert_eq!(grid_dimension(100, 1000, 8, 4, 1, 1100).unwrap(), 3);
    }

    #[test]
    fn test_grid_dimension_budget_too_small() {
        match grid_dimension(4, 1000, 8, 4, 1, 10) {
            Err(Error::BudgetTooSmall { budget, required }) => {
                assert_eq!(budget, 10);
                assert_eq!(required, 4 + 500);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_grid_dimension_empty_graph() {
        assert_eq!(grid_dimension(0, 0, 8, 4, 1, 0).unwrap(), 1);
    }

    #[test]
    fn test_stream_plan() {
        let meta = GridMeta::new(EdgeType::Unweighted, 1000, 10_000, vec![0, 500, 1000]).unwrap();
        let plan = StreamPlan::new(&meta, 1 << 30, 4).unwrap();
        assert_eq!(plan.chunk_bytes, IO_CHUNK_BYTES);
        assert_eq!(plan.prefetch, MAX_PREFETCH);
        // 2000 bytes of slice, 1000 spare: three live 328-byte chunks.
        let plan = StreamPlan::new(&meta, 3000, 4).unwrap();
        assert_eq!(plan.chunk_bytes, 328);
        assert_eq!(plan.prefetch, 1);
        assert!(matches!(
            StreamPlan::new(&meta, 2000, 4),
            Err(Error::BudgetTooSmall { .. })
        ));
        assert!(matches!(
            StreamPlan::new(&meta, 2023, 4),
            Err(Error::BudgetTooSmall { required: 2024, .. })
        ));
        assert!(StreamPlan::new(&meta, 2024, 4).is_ok());
    }

    #[test]
    fn test_stream_plan_fits_every_live_chunk() {
        let meta = GridMeta::new(EdgeType::Weighted, 1000, 10_000, vec![0, 400, 1000]).unwrap();
        for &hinted in &[0, 4, 16] {
            let slice = 600 * hinted as u64;
            for budget in (slice + 36..slice + 5000).chain((20..40).map(|shift| 1u64 << shift)) {
                let plan = StreamPlan::new(&meta, budget, hinted).unwrap();
                let chunk = plan.chunk_bytes as u64;
                assert_eq!(chunk % 12, 0);
                assert!((1..=MAX_PREFETCH).contains(&plan.prefetch));
                assert!(
                    slice + (plan.prefetch as u64 + 2) * chunk <= budget,
                    "budget {} hinted {}: {:?}",
                    budget,
                    hinted,
                    plan
                );
            }
        }
    }
}

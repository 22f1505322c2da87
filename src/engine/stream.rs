use super::Graph;
use crate::{
    bitmap::Bitmap,
    error::Result,
    grid::BlockChunks,
    planner::StreamPlan,
    types::Edge,
};
use itertools::iproduct;
use log::debug;
use rayon::prelude::*;
use std::{
    path::Path,
    sync::mpsc::{sync_channel, SyncSender},
};

/// The order in which `stream_edges` visits the blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOrder {
    /// Blocks sharing a source partition are consecutive.
    RowMajor,
    /// Blocks sharing a destination partition are consecutive.
    ColumnMajor,
}

impl StreamOrder {
    fn blocks(self, partitions: usize) -> Vec<(usize, usize)> {
        match self {
            StreamOrder::RowMajor => iproduct!(0..partitions, 0..partitions).collect(),
            StreamOrder::ColumnMajor => iproduct!(0..partitions, 0..partitions)
                .map(|(col, row)| (row, col))
                .collect(),
        }
    }
}

/// The blocks worth reading: non-empty, with at least one active source.
fn schedule(graph: &Graph, active: &Bitmap) -> Vec<(usize, usize)> {
    let p = graph.partitions();
    let live_rows: Vec<bool> = (0..p)
        .map(|row| active.any_in(graph.meta().partition(row)))
        .collect();
    graph
        .stream_order()
        .blocks(p)
        .into_iter()
        .filter(|&(row, col)| live_rows[row] && graph.block_bytes(row, col) > 0)
        .collect()
}

pub(super) fn stream_edges<R, F, ID, OP>(
    graph: &Graph,
    f: &F,
    active: &Bitmap,
    identity: &ID,
    reduce: &OP,
) -> Result<R>
where
    R: Send,
    F: Fn(&Edge) -> R + Sync + Send,
    ID: Fn() -> R + Sync + Send,
    OP: Fn(R, R) -> R + Sync + Send,
{
    let plan = StreamPlan::new(
        graph.meta(),
        graph.memory_budget(),
        graph.hinted_bytes.unwrap_or(0),
    )?;
    let blocks = schedule(graph, active);
    debug!(
        "streaming {} of {} blocks in {:?} order, chunk={}B prefetch={}",
        blocks.len(),
        graph.partitions() * graph.partitions(),
        graph.stream_order(),
        plan.chunk_bytes,
        plan.prefetch
    );
    if blocks.is_empty() {
        return Ok(identity());
    }
    let edge_type = graph.meta().edge_type();
    let record_size = edge_type.record_size();
    let mut total = identity();
    pipeline(
        plan.prefetch,
        |tx| load(graph, &blocks, plan.chunk_bytes, tx),
        |chunk: Vec<u8>| {
            let part = graph.pool.install(|| {
                chunk
                    .par_chunks_exact(record_size)
                    .map(|record| edge_type.decode(record))
                    .filter(|edge| active.test(edge.source))
                    .map(|edge| f(&edge))
                    .reduce(identity, reduce)
            });
            total = reduce(std::mem::replace(&mut total, identity()), part);
            Ok(())
        },
    )?;
    Ok(total)
}

/// Runs `produce` on a scoped thread and hands its items to `consume` through
/// a channel of `depth` slots.
///
/// At most `depth + 2` items are alive at once: the queued ones, the one the
/// producer is blocked on and the one being consumed.
fn pipeline<T, P, C>(depth: usize, produce: P, mut consume: C) -> Result<()>
where
    T: Send,
    P: FnOnce(SyncSender<Result<T>>) + Send,
    C: FnMut(T) -> Result<()>,
{
    std::thread::scope(|scope| -> Result<()> {
        let (tx, rx) = sync_channel(depth);
        scope.spawn(move || produce(tx));
        // Dropping `rx` on an early return stops the producer.
        for item in rx {
            consume(item?)?;
        }
        Ok(())
    })
}

/// Reads `blocks` chunk by chunk into `tx`; stops at the first error or as
/// soon as the receiver is gone.
fn load(
    graph: &Graph,
    blocks: &[(usize, usize)],
    chunk_bytes: usize,
    tx: SyncSender<Result<Vec<u8>>>,
) {
    let dir: &Path = graph.path();
    for &(row, col) in blocks {
        let len = graph.block_bytes(row, col);
        let chunks = match BlockChunks::open(dir, row, col, len, chunk_bytes) {
            Ok(chunks) => chunks,
            Err(e) => {
                let _ = tx.send(Err(e));
                return;
            }
        };
        for chunk in chunks {
            let failed = chunk.is_err();
            if tx.send(chunk).is_err() || failed {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::Error, planner::MAX_PREFETCH};
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    /// Counts itself in `live` while alive.
    struct Tracked<'a>(&'a AtomicUsize);

    impl<'a> Tracked<'a> {
        fn new(live: &'a AtomicUsize) -> Self {
            live.fetch_add(1, Ordering::SeqCst);
            Tracked(live)
        }
    }

    impl Drop for Tracked<'_> {
        fn drop(&mut self) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_pipeline_bounds_live_items() {
        for depth in 1..=MAX_PREFETCH {
            let live = AtomicUsize::new(0);
            let mut peak = 0;
            let mut consumed = 0;
            pipeline(
                depth,
                |tx| {
                    for _ in 0..16 {
                        if tx.send(Ok(Tracked::new(&live))).is_err() {
                            return;
                        }
                    }
                },
                |item| {
                    // Give the producer time to fill every slot.
                    std::thread::sleep(Duration::from_millis(2));
                    peak = peak.max(live.load(Ordering::SeqCst));
                    consumed += 1;
                    drop(item);
                    Ok(())
                },
            )
            .unwrap();
            assert_eq!(consumed, 16);
            assert!(peak <= depth + 2, "depth {}: {} live", depth, peak);
            assert_eq!(live.load(Ordering::SeqCst), 0);
        }
    }

    #[test]
    fn test_pipeline_stops_at_first_error() {
        let mut consumed = 0;
        let result = pipeline(
            1,
            |tx| {
                for i in 0..8 {
                    let item = if i == 2 {
                        Err(Error::CorruptMeta(String::from("bad")))
                    } else {
                        Ok(i)
                    };
                    if tx.send(item).is_err() {
                        return;
                    }
                }
            },
            |_| {
                consumed += 1;
                Ok(())
            },
        );
        assert!(matches!(result, Err(Error::CorruptMeta(_))));
        assert_eq!(consumed, 2);
    }

    #[test]
    fn test_block_orders() {
        assert_eq!(
            StreamOrder::RowMajor.blocks(2),
            vec![(0, 0), (0, 1), (1, 0), (1, 1)]
        );
        assert_eq!(
            StreamOrder::ColumnMajor.blocks(2),
            vec![(0, 0), (1, 0), (0, 1), (1, 1)]
        );
    }
}

use crate::grid::GridMeta;

/// A printable summary of the grid: partition boundaries and the number of
/// edges in every block.
pub struct BlockTable<'a> {
    meta: &'a GridMeta,
    block_bytes: &'a [u64],
}

impl<'a> BlockTable<'a> {
    pub(super) fn new(meta: &'a GridMeta, block_bytes: &'a [u64]) -> Self {
        Self { meta, block_bytes }
    }

    fn edges(&self, row: usize, col: usize) -> u64 {
        self.block_bytes[row * self.meta.partitions() + col]
            / self.meta.edge_type().record_size() as u64
    }
}

impl<'a> std::fmt::Display for BlockTable<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let p = self.meta.partitions();
        writeln!(f, "{}", self.meta)?;
        writeln!(f, "+------+--------------------------+")?;
        writeln!(f, "|    i |                partition |")?;
        writeln!(f, "+------+--------------------------+")?;
        for i in 0..p {
            let range = self.meta.partition(i);
            writeln!(
                f,
                "|{:>5} | [{:>10}, {:>10}) |",
                i, range.start, range.end
            )?;
        }
        writeln!(f, "+------+--------------------------+")?;
        write!(f, "|  src\\dst |")?;
        for col in 0..p {
            write!(f, "{:>12} |", col)?;
        }
        writeln!(f)?;
        for row in 0..p {
            write!(f, "|{:>9} |", row)?;
            for col in 0..p {
                write!(f, "{:>12} |", self.edges(row, col))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

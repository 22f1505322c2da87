use crate::types::VertexId;
use rayon::prelude::*;
use std::{
    ops::Range,
    sync::atomic::{AtomicU64, Ordering},
};

const WORD_BITS: usize = 64;

/// A per-vertex active set.
///
/// `set` is an atomic `fetch_or`, so callbacks running on different threads
/// may set bits that share a word.
pub struct Bitmap {
    len: usize,
    words: Vec<AtomicU64>,
}

impl Bitmap {
    /// Creates a cleared bitmap of `len` bits.
    pub fn new(len: usize) -> Self {
        Self {
            len,
            words: (0..(len + WORD_BITS - 1) / WORD_BITS)
                .map(|_| AtomicU64::new(0))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&self) {
        self.words
            .par_iter()
            .for_each(|word| word.store(0, Ordering::Relaxed));
    }

    pub fn fill(&self) {
        let last = self.words.len().saturating_sub(1);
        let tail = self.len % WORD_BITS;
        self.words.par_iter().enumerate().for_each(|(i, word)| {
            let mask = if i == last && tail != 0 {
                (1u64 << tail) - 1
            } else {
                u64::MAX
            };
            word.store(mask, Ordering::Relaxed)
        });
    }

    /// Sets bit `i`; returns `true` iff it was not set before.
    #[inline]
    pub fn set(&self, i: VertexId) -> bool {
        let i = i as usize;
        let bit = 1u64 << (i % WORD_BITS);
        self.words[i / WORD_BITS].fetch_or(bit, Ordering::Relaxed) & bit == 0
    }

    #[inline]
    pub fn test(&self, i: VertexId) -> bool {
        let i = i as usize;
        self.words[i / WORD_BITS].load(Ordering::Relaxed) & (1u64 << (i % WORD_BITS)) != 0
    }

    /// Number of set bits.
    pub fn count(&self) -> usize {
        self.words
            .par_iter()
            .map(|word| word.load(Ordering::Relaxed).count_ones() as usize)
            .sum()
    }

    /// Whether any bit in `range` is set.
    pub fn any_in(&self, range: Range<usize>) -> bool {
        let (begin, end) = (range.start, range.end.min(self.len));
        if begin >= end {
            return false;
        }
        let (first, last) = (begin / WORD_BITS, (end - 1) / WORD_BITS);
        (first..=last).any(|w| {
            let mut mask = u64::MAX;
            if w == first {
                mask &= u64::MAX << (begin % WORD_BITS);
            }
            if w == last && end % WORD_BITS != 0 {
                mask &= (1u64 << (end % WORD_BITS)) - 1;
            }
            self.words[w].load(Ordering::Relaxed) & mask != 0
        })
    }
}

impl std::fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bitmap")
            .field("len", &self.len)
            .field("count", &self.count())
            .finish()
    }
}

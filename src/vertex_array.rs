use crate::{
    atomic::{self, Scalar},
    memory_manager::MemoryManager,
    types::VertexId,
};
use rayon::prelude::*;
use std::{
    io,
    marker::PhantomData,
    mem::size_of,
    path::{Path, PathBuf},
};

/// Anything that keeps one fixed-size record per vertex.
///
/// The engine only needs the footprint of a hinted array, never its contents.
pub trait VertexData {
    fn record_size(&self) -> usize;

    fn len(&self) -> usize;
}

/// A per-vertex array of numeric records, backed by a file or by memory.
///
/// Every slot is accessed through its native atomic, so the array can be
/// shared by all workers of a streaming call. Plain `get`/`set` never
/// read-modify-write; concurrent updates must use `write_min`, `write_max`,
/// `write_add` or `compare_and_set`.
pub struct VertexArray<T: Scalar> {
    mm: MemoryManager,
    atoms: *const T::Atom,
    len: usize,
    path: Option<PathBuf>,
    _marker: PhantomData<T>,
}

// The raw pointer only aliases `mm`, which lives as long as the array; all
// accesses through it go via `T::Atom`, which is `Sync`.
unsafe impl<T: Scalar> Send for VertexArray<T> {}
unsafe impl<T: Scalar> Sync for VertexArray<T> {}

impl<T: Scalar> VertexArray<T> {
    /// Creates a zero-filled array of `len` records in the file at `path`.
    pub fn create<P: AsRef<Path>>(path: P, len: usize) -> io::Result<Self> {
        let mm = MemoryManager::new_mmap(path.as_ref(), len * size_of::<T>())?;
        Ok(Self::from_mm(mm, len, Some(path.as_ref().to_path_buf())))
    }

    /// Creates a zero-filled array of `len` records on the heap.
    pub fn in_memory(len: usize) -> Self {
        Self::from_mm(MemoryManager::new_mem(len * size_of::<T>()), len, None)
    }

    fn from_mm(mut mm: MemoryManager, len: usize, path: Option<PathBuf>) -> Self {
        debug_assert_eq!(size_of::<T::Atom>(), size_of::<T>());
        let atoms = mm.as_mut_ptr() as *const T::Atom;
        Self {
            mm,
            atoms,
            len,
            path,
            _marker: PhantomData,
        }
    }

    #[inline]
    fn atoms(&self) -> &[T::Atom] {
        unsafe { std::slice::from_raw_parts(self.atoms, self.len) }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    #[inline]
    pub fn get(&self, i: VertexId) -> T {
        T::load(&self.atoms()[i as usize])
    }

    #[inline]
    pub fn set(&self, i: VertexId, value: T) {
        T::store(&self.atoms()[i as usize], value)
    }

    pub fn fill(&self, value: T) {
        self.atoms()
            .par_iter()
            .for_each(|atom| T::store(atom, value));
    }

    /// Lowers slot `i` to `candidate`; returns whether it changed.
    #[inline]
    pub fn write_min(&self, i: VertexId, candidate: T) -> bool {
        atomic::write_min(&self.atoms()[i as usize], candidate)
    }

    /// Raises slot `i` to `candidate`; returns whether it changed.
    #[inline]
    pub fn write_max(&self, i: VertexId, candidate: T) -> bool {
        atomic::write_max(&self.atoms()[i as usize], candidate)
    }

    #[inline]
    pub fn write_add(&self, i: VertexId, delta: T) {
        atomic::write_add(&self.atoms()[i as usize], delta)
    }

    /// Replaces slot `i` with `new` iff it still holds `expected`.
    #[inline]
    pub fn compare_and_set(&self, i: VertexId, expected: T, new: T) -> bool {
        atomic::compare_and_set(&self.atoms()[i as usize], expected, new)
    }

    pub fn flush(&self) -> io::Result<()> {
        self.mm.flush()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.atoms().iter().map(T::load).collect()
    }
}

impl<T: Scalar> VertexData for VertexArray<T> {
    fn record_size(&self) -> usize {
        size_of::<T>()
    }

    fn len(&self) -> usize {
        self.len
    }
}

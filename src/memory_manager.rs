use memmap::MmapMut;
use std::{
    fs::{File, OpenOptions},
    io,
    mem::size_of,
    path::Path,
};

/// A memory mapped file.
pub struct MmapFile {
    mmap: MmapMut,
    len: u64,
}

impl MmapFile {
    /// Creates (or truncates) the file at `path` and maps `len` zeroed bytes.
    pub fn create<P: AsRef<Path>>(path: P, len: usize) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.set_len(len as u64)?;
        Self::from_file(file)
    }

    pub fn from_file(file: File) -> io::Result<Self> {
        let len = file.metadata()?.len();
        let mmap = if len == 0 {
            MmapMut::map_anon(1)?
        } else {
            unsafe { MmapMut::map_mut(&file)? }
        };
        Ok(Self { mmap, len })
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn flush(&self) -> io::Result<()> {
        if self.len == 0 {
            Ok(())
        } else {
            self.mmap.flush()
        }
    }
}

/// A memory manager to hide the underlying type of the memory buffer.
///
/// Both variants hand out 8-byte aligned memory, so any numeric record
/// type can be laid over them.
pub enum MemoryManager {
    /// A heap buffer of `len` bytes backed by whole words.
    Mem { words: Vec<u64>, len: usize },
    /// A memory mapped buffer.
    Mmap(MmapFile),
}

impl MemoryManager {
    pub fn new_mem(size: usize) -> Self {
        MemoryManager::Mem {
            words: vec![0; words_for(size)],
            len: size,
        }
    }

    pub fn new_mmap<P: AsRef<Path>>(path: P, size: usize) -> io::Result<Self> {
        Ok(MemoryManager::Mmap(MmapFile::create(path, size)?))
    }

    /// A zeroed scratch buffer: in memory when the machine has room for it,
    /// otherwise mapped over an anonymous temporary file.
    pub fn new_scratch(size: usize) -> io::Result<Self> {
        let avail = sys_info::mem_info()
            .map(|info| info.avail.saturating_mul(1024))
            .unwrap_or(0);
        if avail > 2 * size as u64 {
            Ok(Self::new_mem(size))
        } else {
            let file = tempfile::tempfile()?;
            file.set_len(size as u64)?;
            Ok(MemoryManager::Mmap(MmapFile::from_file(file)?))
        }
    }

    pub fn len(&self) -> usize {
        match self {
            MemoryManager::Mem { len, .. } => *len,
            MemoryManager::Mmap(mmapfile) => mmapfile.len(),
        }
    }

    pub fn flush(&self) -> io::Result<()> {
        match self {
            MemoryManager::Mem { .. } => Ok(()),
            MemoryManager::Mmap(mmapfile) => mmapfile.flush(),
        }
    }

    pub fn as_ptr(&self) -> *const u8 {
        match self {
            MemoryManager::Mem { words, .. } => words.as_ptr() as *const u8,
            MemoryManager::Mmap(mmapfile) => mmapfile.mmap.as_ptr(),
        }
    }

    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        match self {
            MemoryManager::Mem { words, .. } => words.as_mut_ptr() as *mut u8,
            MemoryManager::Mmap(mmapfile) => mmapfile.mmap.as_mut_ptr(),
        }
    }

    /// # Safety
    ///
    /// `pos + count * size_of::<T>()` must be within `len()` and `pos` must be
    /// aligned for `T`.
    pub unsafe fn as_slice<T>(&self, pos: usize, count: usize) -> &[T] {
        debug_assert!(pos + count * size_of::<T>() <= self.len());
        std::slice::from_raw_parts(self.as_ptr().add(pos) as *const T, count)
    }

    /// # Safety
    ///
    /// Same requirements as [`as_slice`](Self::as_slice).
    pub unsafe fn as_mut_slice<T>(&mut self, pos: usize, count: usize) -> &mut [T] {
        debug_assert!(pos + count * size_of::<T>() <= self.len());
        std::slice::from_raw_parts_mut(self.as_mut_ptr().add(pos) as *mut T, count)
    }
}

fn words_for(bytes: usize) -> usize {
    (bytes + size_of::<u64>() - 1) / size_of::<u64>()
}

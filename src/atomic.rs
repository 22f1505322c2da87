//! Lock-free relaxation primitives.
//!
//! Every operation is a single atomic instruction or a compare-and-retry loop
//! on one memory location. Concurrent calls on the same location behave as if
//! they ran in some serial order.

use std::sync::atomic::{AtomicI32, AtomicI64, AtomicU32, AtomicU64, AtomicUsize, Ordering};

/// A numeric record that has a native atomic counterpart of the same size.
pub trait Scalar: Copy + PartialOrd + Send + Sync + 'static {
    type Atom: Send + Sync;

    fn new_atom(value: Self) -> Self::Atom;

    fn load(atom: &Self::Atom) -> Self;

    fn store(atom: &Self::Atom, value: Self);

    /// Installs `new` iff the location still holds `current`; on failure
    /// returns the value found.
    fn compare_exchange(atom: &Self::Atom, current: Self, new: Self) -> Result<Self, Self>;

    fn fetch_add(atom: &Self::Atom, delta: Self) -> Self;

    /// Bitwise identity, which is what the hardware compares.
    fn identical(a: Self, b: Self) -> bool;
}

macro_rules! impl_int_scalar {
    ($($t:ty => $atom:ty),*) => {
        $(
            impl Scalar for $t {
                type Atom = $atom;

                #[inline]
                fn new_atom(value: Self) -> Self::Atom {
                    <$atom>::new(value)
                }

                #[inline]
                fn load(atom: &Self::Atom) -> Self {
                    atom.load(Ordering::Acquire)
                }

                #[inline]
                fn store(atom: &Self::Atom, value: Self) {
                    atom.store(value, Ordering::Release)
                }

                #[inline]
                fn compare_exchange(atom: &Self::Atom, current: Self, new: Self) -> Result<Self, Self> {
                    atom.compare_exchange_weak(current, new, Ordering::AcqRel, Ordering::Acquire)
                }

                #[inline]
                fn fetch_add(atom: &Self::Atom, delta: Self) -> Self {
                    atom.fetch_add(delta, Ordering::AcqRel)
                }

                #[inline]
                fn identical(a: Self, b: Self) -> bool {
                    a == b
                }
            }
        )*
    };
}

impl_int_scalar!(
    u32 => AtomicU32,
    u64 => AtomicU64,
    i32 => AtomicI32,
    i64 => AtomicI64,
    usize => AtomicUsize
);

macro_rules! impl_float_scalar {
    ($($t:ty => $atom:ty),*) => {
        $(
            impl Scalar for $t {
                type Atom = $atom;

                #[inline]
                fn new_atom(value: Self) -> Self::Atom {
                    <$atom>::new(value.to_bits())
                }

                #[inline]
                fn load(atom: &Self::Atom) -> Self {
                    <$t>::from_bits(atom.load(Ordering::Acquire))
                }

                #[inline]
                fn store(atom: &Self::Atom, value: Self) {
                    atom.store(value.to_bits(), Ordering::Release)
                }

                #[inline]
                fn compare_exchange(atom: &Self::Atom, current: Self, new: Self) -> Result<Self, Self> {
                    atom.compare_exchange_weak(
                        current.to_bits(),
                        new.to_bits(),
                        Ordering::AcqRel,
                        Ordering::Acquire,
                    )
                    .map(<$t>::from_bits)
                    .map_err(<$t>::from_bits)
                }

                fn fetch_add(atom: &Self::Atom, delta: Self) -> Self {
                    let mut current = Self::load(atom);
                    loop {
                        match Self::compare_exchange(atom, current, current + delta) {
                            Ok(previous) => return previous,
                            Err(found) => current = found,
                        }
                    }
                }

                #[inline]
                fn identical(a: Self, b: Self) -> bool {
                    a.to_bits() == b.to_bits()
                }
            }
        )*
    };
}

impl_float_scalar!(f32 => AtomicU32, f64 => AtomicU64);

/// Stores `candidate` iff it is smaller than the current value.
///
/// Returns whether the stored value changed.
#[inline]
pub(crate) fn write_min<T: Scalar>(atom: &T::Atom, candidate: T) -> bool {
    write_if(atom, candidate, |candidate, current| candidate < current)
}

/// Stores `candidate` iff it is greater than the current value.
#[inline]
pub(crate) fn write_max<T: Scalar>(atom: &T::Atom, candidate: T) -> bool {
    write_if(atom, candidate, |candidate, current| candidate > current)
}

#[inline]
pub(crate) fn write_add<T: Scalar>(atom: &T::Atom, delta: T) {
    T::fetch_add(atom, delta);
}

/// Stores `new` iff the location holds `expected`, retrying spurious failures.
#[inline]
pub(crate) fn compare_and_set<T: Scalar>(atom: &T::Atom, expected: T, new: T) -> bool {
    loop {
        match T::compare_exchange(atom, expected, new) {
            Ok(_) => return true,
            Err(found) if T::identical(found, expected) => continue,
            Err(_) => return false,
        }
    }
}

#[inline]
fn write_if<T, F>(atom: &T::Atom, candidate: T, better: F) -> bool
where
    T: Scalar,
    F: Fn(T, T) -> bool,
{
    let mut current = T::load(atom);
    while better(candidate, current) {
        match T::compare_exchange(atom, current, candidate) {
            Ok(_) => return true,
            Err(found) => current = found,
        }
    }
    false
}

/// A single shared scalar, e.g. a global bound or counter updated from
/// streaming callbacks.
pub struct SharedScalar<T: Scalar> {
    atom: T::Atom,
}

impl<T: Scalar> SharedScalar<T> {
    pub fn new(value: T) -> Self {
        Self {
            atom: T::new_atom(value),
        }
    }

    pub fn get(&self) -> T {
        T::load(&self.atom)
    }

    pub fn set(&self, value: T) {
        T::store(&self.atom, value)
    }

    pub fn write_min(&self, candidate: T) -> bool {
        write_min(&self.atom, candidate)
    }

    pub fn write_max(&self, candidate: T) -> bool {
        write_max(&self.atom, candidate)
    }

    pub fn write_add(&self, delta: T) {
        write_add(&self.atom, delta)
    }

    pub fn compare_and_set(&self, expected: T, new: T) -> bool {
        compare_and_set(&self.atom, expected, new)
    }
}

impl<T: Scalar + std::fmt::Debug> std::fmt::Debug for SharedScalar<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SharedScalar").field(&self.get()).finish()
    }
}

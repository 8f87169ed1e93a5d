//! Immutable typed buffers shared by the stela value containers.
//!
//! A [`Buffer`] is a contiguous run of `T` that never changes after
//! construction, so it can be sliced and shared across arrays and threads
//! without copying or locking. Mutation always goes through a
//! [`BufferBuilder`], which produces a fresh buffer.

use std::sync::Arc;

pub mod builder;

pub use builder::{BufferBuilder, BufferInserter};

enum Storage<T: 'static> {
    /// Ref-counted storage owned by this buffer (possibly shared with others).
    Owned(Arc<[T]>),
    /// Unowned view into storage that outlives every buffer.
    Static(&'static [T]),
}

impl<T> Storage<T> {
    #[inline]
    fn as_full_slice(&self) -> &[T] {
        match self {
            Storage::Owned(items) => items,
            Storage::Static(items) => items,
        }
    }
}

impl<T> Clone for Storage<T> {
    fn clone(&self) -> Self {
        match self {
            Storage::Owned(items) => Storage::Owned(items.clone()),
            Storage::Static(items) => Storage::Static(items),
        }
    }
}

/// A contiguous, immutable region of `T` that can be shared with other
/// buffers and across thread boundaries.
///
/// `Buffer` can be sliced and cloned without copying the underlying data:
/// a slice is a `(storage, range)` view onto the same allocation.
pub struct Buffer<T: 'static> {
    storage: Storage<T>,
    start: usize,
    len: usize,
}

impl<T> Buffer<T> {
    /// Creates a new empty `Buffer`.
    #[inline]
    pub fn new() -> Buffer<T> {
        Buffer {
            storage: Storage::Static(&[]),
            start: 0,
            len: 0,
        }
    }

    /// Creates a buffer that takes ownership of the vector's storage.
    pub fn from_vec(items: Vec<T>) -> Buffer<T> {
        let len = items.len();
        Buffer {
            storage: Storage::Owned(Arc::from(items)),
            start: 0,
            len,
        }
    }

    /// Creates an unowned buffer viewing statically-allocated items.
    pub fn from_static(items: &'static [T]) -> Buffer<T> {
        Buffer {
            storage: Storage::Static(items),
            start: 0,
            len: items.len(),
        }
    }

    /// Creates an owning buffer with a copy of the given items.
    pub fn copy_from_slice(items: &[T]) -> Buffer<T>
    where
        T: Clone,
    {
        let len = items.len();
        Buffer {
            storage: Storage::Owned(Arc::from(items)),
            start: 0,
            len,
        }
    }

    /// Collects an iterator into an owning buffer.
    pub fn create(items: impl IntoIterator<Item = T>) -> Buffer<T> {
        Buffer::from_vec(items.into_iter().collect())
    }

    /// Returns the number of items in the buffer.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the buffer is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns a slice of the buffer's contents.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.storage.as_full_slice()[self.start..self.start + self.len]
    }

    /// Returns `true` when the buffer owns (a share of) its storage, as
    /// opposed to viewing unowned static items.
    #[inline]
    pub fn is_owner(&self) -> bool {
        matches!(self.storage, Storage::Owned(_))
    }

    /// Creates a zero-copy view of `count` items starting at `start`.
    ///
    /// The new buffer shares storage with `self`.
    ///
    /// # Panics
    ///
    /// Panics if `start + count` exceeds the buffer length. Out-of-range
    /// slicing is a contract violation, not a recoverable error.
    pub fn slice(&self, start: usize, count: usize) -> Buffer<T> {
        assert!(
            start <= self.len && count <= self.len - start,
            "slice [{start}, {start}+{count}) out of bounds for buffer of length {}",
            self.len
        );
        Buffer {
            storage: self.storage.clone(),
            start: self.start + start,
            len: count,
        }
    }

    /// Creates an owning buffer holding an exactly-sized copy of the contents.
    pub fn deep_copy(&self) -> Buffer<T>
    where
        T: Clone,
    {
        Buffer::copy_from_slice(self.as_slice())
    }

    /// Creates a new buffer aliasing the same storage and range.
    #[inline]
    pub fn shallow_copy(&self) -> Buffer<T> {
        self.clone()
    }
}

impl<T> Clone for Buffer<T> {
    fn clone(&self) -> Self {
        Buffer {
            storage: self.storage.clone(),
            start: self.start,
            len: self.len,
        }
    }
}

impl<T> Default for Buffer<T> {
    fn default() -> Self {
        Buffer::new()
    }
}

impl<T> std::ops::Deref for Buffer<T> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

impl<T> AsRef<[T]> for Buffer<T> {
    #[inline]
    fn as_ref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T> From<Vec<T>> for Buffer<T> {
    fn from(items: Vec<T>) -> Self {
        Buffer::from_vec(items)
    }
}

impl<T> FromIterator<T> for Buffer<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Buffer::create(iter)
    }
}

impl<T: PartialEq> PartialEq for Buffer<T> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Eq> Eq for Buffer<T> {}

impl<T: std::fmt::Debug> std::fmt::Debug for Buffer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

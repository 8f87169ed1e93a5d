//! Construction of immutable buffers.

use crate::Buffer;

/// Pre-sized builder for [`Buffer`].
///
/// All positions start as `T::default()`, so a partially-filled build is
/// deterministic. Positions can be written in any order with [`set`], or
/// sequentially through a [`BufferInserter`].
///
/// [`set`]: BufferBuilder::set
#[derive(Debug, Clone)]
pub struct BufferBuilder<T> {
    items: Vec<T>,
}

impl<T: Clone + Default> BufferBuilder<T> {
    /// Creates a builder for `size` items, all initialized to `T::default()`.
    pub fn new(size: usize) -> BufferBuilder<T> {
        BufferBuilder {
            items: vec![T::default(); size],
        }
    }

    /// Returns the number of items in the builder.
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the builder holds no items.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Writes `value` at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    #[inline]
    pub fn set(&mut self, index: usize, value: T) {
        self.items[index] = value;
    }

    /// Returns a sequential inserter positioned at the first item.
    pub fn inserter(&mut self) -> BufferInserter<'_, T> {
        BufferInserter {
            items: &mut self.items,
            position: 0,
        }
    }

    /// Finalizes the builder into an immutable buffer.
    pub fn build(self) -> Buffer<T> {
        Buffer::from_vec(self.items)
    }

    /// Finalizes only the first `count` items.
    ///
    /// # Panics
    ///
    /// Panics if `count` exceeds the builder size.
    pub fn build_prefix(mut self, count: usize) -> Buffer<T> {
        assert!(count <= self.items.len());
        self.items.truncate(count);
        Buffer::from_vec(self.items)
    }
}

/// Sequential writer over a [`BufferBuilder`].
pub struct BufferInserter<'a, T> {
    items: &'a mut Vec<T>,
    position: usize,
}

impl<'a, T> BufferInserter<'a, T> {
    /// Writes `value` at the current position and advances.
    ///
    /// # Panics
    ///
    /// Panics when inserting past the builder size.
    #[inline]
    pub fn insert(&mut self, value: T) {
        self.items[self.position] = value;
        self.position += 1;
    }

    /// Returns the next position to be written.
    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults_unset_positions() {
        let mut builder = BufferBuilder::<i32>::new(4);
        builder.set(1, 10);
        builder.set(3, 30);
        assert_eq!(builder.build().as_slice(), &[0, 10, 0, 30]);
    }

    #[test]
    fn test_builder_set_overwrites() {
        let mut builder = BufferBuilder::<i32>::new(2);
        builder.set(0, 1);
        builder.set(0, 2);
        assert_eq!(builder.build().as_slice(), &[2, 0]);
    }

    #[test]
    fn test_inserter_fills_sequentially() {
        let mut builder = BufferBuilder::<String>::new(3);
        let mut inserter = builder.inserter();
        inserter.insert("a".to_string());
        inserter.insert("b".to_string());
        assert_eq!(inserter.position(), 2);
        inserter.insert("c".to_string());
        assert_eq!(
            builder.build().as_slice(),
            &["a".to_string(), "b".to_string(), "c".to_string()]
        );
    }

    #[test]
    fn test_build_prefix_truncates() {
        let mut builder = BufferBuilder::<i64>::new(5);
        for i in 0..5 {
            builder.set(i, i as i64);
        }
        let buffer = builder.build_prefix(3);
        assert_eq!(buffer.as_slice(), &[0, 1, 2]);
    }

    #[test]
    #[should_panic]
    fn test_inserter_past_end_panics() {
        let mut builder = BufferBuilder::<i32>::new(1);
        let mut inserter = builder.inserter();
        inserter.insert(1);
        inserter.insert(2);
    }
}

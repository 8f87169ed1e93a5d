//! Dense arrays: a value buffer plus a word-packed presence bitmap.

use stela_bits::bitmap;
use stela_buffer::{Buffer, builder::BufferBuilder};
use stela_common::{Result, verify_arg};

use crate::optional::OptionalValue;

/// An immutable array of optional values.
///
/// Values live in a contiguous [`Buffer`], one slot per element whether
/// present or not. Presence is tracked by a little-endian bitmap of `u64`
/// words, with bit `bitmap_bit_offset + i` describing element `i`. An
/// empty bitmap is the canonical form of "everything present".
///
/// The bit offset exists so that [`DenseArray::slice`] can share bitmap
/// words with the parent array instead of re-packing them; it is always
/// below 64 since whole leading words are dropped while slicing.
#[derive(Debug, Clone)]
pub struct DenseArray<T> {
    values: Buffer<T>,
    bitmap: Buffer<u64>,
    bitmap_bit_offset: usize,
}

impl<T> DenseArray<T> {
    /// Assembles an array from its raw parts, verifying the bitmap shape.
    ///
    /// An empty `bitmap` means all elements are present and requires a
    /// zero `bitmap_bit_offset`. A non-empty bitmap must hold exactly
    /// enough words to cover `bitmap_bit_offset + values.len()` bits.
    pub fn from_parts(
        values: Buffer<T>,
        bitmap: Buffer<u64>,
        bitmap_bit_offset: usize,
    ) -> Result<DenseArray<T>> {
        verify_arg!(bitmap_bit_offset, bitmap_bit_offset < bitmap::WORD_BITS);
        if bitmap.is_empty() {
            verify_arg!(bitmap_bit_offset, bitmap_bit_offset == 0);
        } else {
            verify_arg!(
                bitmap,
                bitmap.len() == bitmap::word_count(bitmap_bit_offset + values.len())
            );
        }
        Ok(DenseArray {
            values,
            bitmap,
            bitmap_bit_offset,
        })
    }

    /// Creates a fully-present array over an existing buffer.
    pub fn from_buffer(values: Buffer<T>) -> DenseArray<T> {
        DenseArray {
            values,
            bitmap: Buffer::new(),
            bitmap_bit_offset: 0,
        }
    }

    /// Creates a fully-present array from a sequence of values.
    pub fn from_values(values: impl IntoIterator<Item = T>) -> DenseArray<T> {
        DenseArray::from_buffer(Buffer::create(values))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The value buffer. Slots of missing elements hold unspecified
    /// (but initialized) values.
    pub fn values(&self) -> &Buffer<T> {
        &self.values
    }

    /// The presence bitmap words. Empty means all elements are present.
    pub fn bitmap(&self) -> &Buffer<u64> {
        &self.bitmap
    }

    /// Position of the bit describing element 0 within `bitmap`.
    pub fn bitmap_bit_offset(&self) -> usize {
        self.bitmap_bit_offset
    }

    /// Whether element `index` is present.
    pub fn present(&self, index: usize) -> bool {
        assert!(
            index < self.len(),
            "index {index} out of bounds for array of length {}",
            self.len()
        );
        self.bitmap.is_empty() || bitmap::get_bit(&self.bitmap, self.bitmap_bit_offset + index)
    }

    /// Whether every element is present.
    pub fn is_full(&self) -> bool {
        bitmap::are_all_set(&self.bitmap, self.bitmap_bit_offset, self.len())
    }

    /// Number of present elements.
    pub fn present_count(&self) -> usize {
        bitmap::count_bits(&self.bitmap, self.bitmap_bit_offset, self.len())
    }

    pub fn is_all_missing(&self) -> bool {
        self.present_count() == 0
    }

    /// Calls `f(index, present, value)` for every element in order.
    pub fn for_each(&self, mut f: impl FnMut(usize, bool, &T)) {
        let values = self.values.as_slice();
        let mut index = 0;
        bitmap::iterate(
            &self.bitmap,
            self.bitmap_bit_offset,
            values.len(),
            |present| {
                f(index, present, &values[index]);
                index += 1;
            },
        );
    }

    /// Calls `f(index, value)` for every present element in order.
    pub fn for_each_present(&self, mut f: impl FnMut(usize, &T)) {
        self.for_each(|index, present, value| {
            if present {
                f(index, value);
            }
        });
    }

    /// Iterates elements in runs that never straddle a bitmap word.
    ///
    /// Each run is described by a [`PresenceGroup`] whose `word` holds the
    /// run's presence bits shifted down to bit 0, alongside the matching
    /// value slice. The first run may be shorter than a word when the bit
    /// offset is non-zero; all later runs start on a word boundary.
    /// Callers that consume whole bitmap words (population counts, masked
    /// copies) use this to stay off the per-bit path.
    pub fn for_each_by_groups(&self, mut f: impl FnMut(PresenceGroup, &[T])) {
        let size = self.len();
        let values = self.values.as_slice();
        let words = self.bitmap.as_slice();
        let mut start = 0;
        while start < size {
            let bit = self.bitmap_bit_offset + start;
            let len = (bitmap::WORD_BITS - bit % bitmap::WORD_BITS).min(size - start);
            let word = if words.is_empty() {
                group_mask(len)
            } else {
                (words[bit / bitmap::WORD_BITS] >> (bit % bitmap::WORD_BITS)) & group_mask(len)
            };
            f(
                PresenceGroup { start, len, word },
                &values[start..start + len],
            );
            start += len;
        }
    }

    /// Returns a zero-copy view of `count` elements starting at `start`.
    ///
    /// Both the value buffer and the bitmap words are shared with `self`;
    /// the bit offset of the result absorbs the sub-word part of `start`.
    pub fn slice(&self, start: usize, count: usize) -> DenseArray<T> {
        let values = self.values.slice(start, count);
        if self.bitmap.is_empty() {
            return DenseArray::from_buffer(values);
        }
        let bit = self.bitmap_bit_offset + start;
        let word_start = bit / bitmap::WORD_BITS;
        let bitmap_bit_offset = bit % bitmap::WORD_BITS;
        let words = bitmap::word_count(bitmap_bit_offset + count);
        DenseArray {
            values,
            bitmap: self.bitmap.slice(word_start, words),
            bitmap_bit_offset,
        }
    }

    /// Rewrites the bitmap so that `bitmap_bit_offset` becomes zero.
    ///
    /// Useful before handing the bitmap to code that assumes bit `i`
    /// describes element `i`. Returns `self` unchanged (shared) when the
    /// offset is already zero.
    pub fn force_no_bitmap_bit_offset(&self) -> DenseArray<T> {
        if self.bitmap_bit_offset == 0 {
            return self.clone();
        }
        let words = bitmap::normalize(&self.bitmap, self.bitmap_bit_offset, self.len());
        DenseArray {
            values: self.values.shallow_copy(),
            bitmap: Buffer::from_vec(words),
            bitmap_bit_offset: 0,
        }
    }
}

impl<T: Clone> DenseArray<T> {
    /// Creates an array of `size` copies of `value`, all present.
    pub fn constant(size: usize, value: T) -> DenseArray<T> {
        DenseArray::from_values(std::iter::repeat_n(value, size))
    }

    /// Returns element `index`, cloning the value slot.
    pub fn get(&self, index: usize) -> OptionalValue<T> {
        OptionalValue {
            present: self.present(index),
            value: self.values[index].clone(),
        }
    }

    /// Copies the underlying storage so the result shares nothing with
    /// `self`.
    pub fn deep_copy(&self) -> DenseArray<T> {
        DenseArray {
            values: self.values.deep_copy(),
            bitmap: self.bitmap.deep_copy(),
            bitmap_bit_offset: self.bitmap_bit_offset,
        }
    }
}

impl<T: Clone + Default> DenseArray<T> {
    /// Creates an array of `size` missing elements.
    pub fn all_missing(size: usize) -> DenseArray<T> {
        DenseArray {
            values: Buffer::create(std::iter::repeat_with(T::default).take(size)),
            bitmap: Buffer::from_vec(vec![0; bitmap::word_count(size)]),
            bitmap_bit_offset: 0,
        }
    }

    /// Concatenates two arrays into a new one.
    pub fn concat(&self, other: &DenseArray<T>) -> DenseArray<T> {
        let mut builder = DenseArrayBuilder::new(self.len() + other.len());
        self.for_each_present(|index, value| builder.set_value(index, value.clone()));
        let offset = self.len();
        other.for_each_present(|index, value| builder.set_value(offset + index, value.clone()));
        builder.build()
    }
}

/// A run of up to 64 elements whose presence bits fit in one word.
///
/// Produced by [`DenseArray::for_each_by_groups`].
#[derive(Debug, Clone, Copy)]
pub struct PresenceGroup {
    /// Index of the first element in the run.
    pub start: usize,
    /// Number of elements in the run, at most 64.
    pub len: usize,
    /// Presence bits for the run: bit `i` describes element `start + i`.
    /// Bits at positions `len` and above are zero.
    pub word: u64,
}

fn group_mask(len: usize) -> u64 {
    if len == bitmap::WORD_BITS {
        u64::MAX
    } else {
        (1u64 << len) - 1
    }
}

impl<T> Default for DenseArray<T> {
    fn default() -> DenseArray<T> {
        DenseArray::from_buffer(Buffer::new())
    }
}

impl<T> FromIterator<T> for DenseArray<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> DenseArray<T> {
        DenseArray::from_values(iter)
    }
}

impl<T: Clone + Default> FromIterator<Option<T>> for DenseArray<T> {
    fn from_iter<I: IntoIterator<Item = Option<T>>>(iter: I) -> DenseArray<T> {
        let items: Vec<Option<T>> = iter.into_iter().collect();
        let mut builder = DenseArrayBuilder::new(items.len());
        for (index, item) in items.into_iter().enumerate() {
            builder.set_option(index, item);
        }
        builder.build()
    }
}

/// Element-wise equality: sizes match and each position is either missing
/// in both arrays or present in both with equal values. Value slots of
/// missing elements are ignored.
impl<T: PartialEq> PartialEq for DenseArray<T> {
    fn eq(&self, other: &DenseArray<T>) -> bool {
        if self.len() != other.len() {
            return false;
        }
        for index in 0..self.len() {
            let present = self.present(index);
            if present != other.present(index) {
                return false;
            }
            if present && self.values[index] != other.values[index] {
                return false;
            }
        }
        true
    }
}

impl<T: Eq> Eq for DenseArray<T> {}

/// Fixed-size builder for [`DenseArray`].
///
/// Starts with every element missing and every value slot defaulted;
/// elements may be set in any order and overwritten.
pub struct DenseArrayBuilder<T> {
    values: BufferBuilder<T>,
    bits: bitmap::Builder,
}

impl<T: Clone + Default> DenseArrayBuilder<T> {
    pub fn new(size: usize) -> DenseArrayBuilder<T> {
        DenseArrayBuilder {
            values: BufferBuilder::new(size),
            bits: bitmap::Builder::new(size),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Sets element `index` to a present `value`.
    pub fn set_value(&mut self, index: usize, value: T) {
        self.values.set(index, value);
        self.bits.set(index);
    }

    /// Marks element `index` missing, resetting its value slot.
    pub fn set_missing(&mut self, index: usize) {
        self.values.set(index, T::default());
        self.bits.clear(index);
    }

    pub fn set(&mut self, index: usize, value: OptionalValue<T>) {
        if value.present {
            self.set_value(index, value.value);
        } else {
            self.set_missing(index);
        }
    }

    pub fn set_option(&mut self, index: usize, value: Option<T>) {
        match value {
            Some(value) => self.set_value(index, value),
            None => self.set_missing(index),
        }
    }

    /// Finishes the array. A fully-present result gets an empty bitmap.
    pub fn build(self) -> DenseArray<T> {
        DenseArray {
            values: self.values.build(),
            bitmap: Buffer::from_vec(self.bits.build()),
            bitmap_bit_offset: 0,
        }
    }

    /// Finishes only the first `count` elements.
    pub fn build_prefix(self, count: usize) -> DenseArray<T> {
        DenseArray {
            values: self.values.build_prefix(count),
            bitmap: Buffer::from_vec(self.bits.build_prefix(count)),
            bitmap_bit_offset: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_options<T: Clone + Default>(items: &[Option<T>]) -> DenseArray<T> {
        items.iter().cloned().collect()
    }

    #[test]
    fn full_array_has_empty_bitmap() {
        let array = DenseArray::from_values([1, 2, 3]);
        assert_eq!(array.len(), 3);
        assert!(array.bitmap().is_empty());
        assert!(array.is_full());
        assert_eq!(array.present_count(), 3);
        assert_eq!(array.get(1), OptionalValue::present(2));
    }

    #[test]
    fn builder_tracks_presence() {
        let mut builder = DenseArrayBuilder::new(4);
        builder.set_value(0, 10i64);
        builder.set_missing(1);
        builder.set_value(2, 30);
        builder.set_value(3, 40);
        builder.set_missing(3);
        let array = builder.build();

        assert!(array.present(0));
        assert!(!array.present(1));
        assert!(array.present(2));
        assert!(!array.present(3));
        assert_eq!(array.present_count(), 2);
        assert_eq!(array.values()[3], 0, "missing slot is reset to default");
    }

    #[test]
    fn fully_set_builder_collapses_bitmap() {
        let mut builder = DenseArrayBuilder::new(70);
        for index in 0..70 {
            builder.set_value(index, index as i64);
        }
        let array = builder.build();
        assert!(array.bitmap().is_empty());
        assert!(array.is_full());
    }

    #[test]
    fn from_parts_validates_word_count() {
        let values = Buffer::from_vec(vec![1i32; 70]);
        assert!(DenseArray::from_parts(values.shallow_copy(), Buffer::from_vec(vec![0; 2]), 0).is_ok());
        assert!(DenseArray::from_parts(values.shallow_copy(), Buffer::from_vec(vec![0; 1]), 0).is_err());
        assert!(DenseArray::from_parts(values.shallow_copy(), Buffer::from_vec(vec![0; 2]), 64).is_err());
        assert!(DenseArray::from_parts(values, Buffer::new(), 3).is_err());
    }

    #[test]
    fn missing_values_ignored_by_eq() {
        let a = from_options(&[Some(1), None, Some(3)]);
        let mut builder = DenseArrayBuilder::new(3);
        builder.set_value(0, 1);
        builder.set_value(1, 777);
        builder.set_missing(1);
        builder.set_value(2, 3);
        let b = builder.build();

        assert_eq!(a, b);
        assert_ne!(a, from_options(&[Some(1), Some(2), Some(3)]));
        assert_ne!(a, from_options(&[Some(1), None]));
    }

    #[test]
    fn slice_shares_storage_and_offsets_bitmap() {
        let source: DenseArray<i64> = (0..130)
            .map(|i| (i % 3 != 0).then_some(i))
            .collect();
        let view = source.slice(65, 40);

        assert_eq!(view.len(), 40);
        assert_eq!(view.bitmap_bit_offset(), 1);
        assert!(view.values().as_slice().as_ptr() == source.values().as_slice()[65..].as_ptr());
        for i in 0..40 {
            assert_eq!(view.get(i), source.get(65 + i), "element {i}");
        }

        let aligned = view.force_no_bitmap_bit_offset();
        assert_eq!(aligned.bitmap_bit_offset(), 0);
        assert_eq!(aligned, view);
    }

    #[test]
    fn slice_of_full_array_stays_full() {
        let source = DenseArray::from_values(0..100i32);
        let view = source.slice(10, 50);
        assert!(view.bitmap().is_empty());
        assert!(view.is_full());
    }

    #[test]
    fn constant_and_all_missing() {
        let constant = DenseArray::constant(5, 7i32);
        assert!(constant.is_full());
        assert_eq!(constant.get(4), OptionalValue::present(7));

        let missing: DenseArray<i32> = DenseArray::all_missing(80);
        assert_eq!(missing.len(), 80);
        assert!(missing.is_all_missing());
        assert!(!missing.present(79));
    }

    #[test]
    fn for_each_visits_everything_in_order() {
        let array = from_options(&[Some(1i64), None, Some(3), None]);
        let mut seen = Vec::new();
        array.for_each(|index, present, value| seen.push((index, present, *value)));
        assert_eq!(seen, [(0, true, 1), (1, false, 0), (2, true, 3), (3, false, 0)]);

        let mut present_ids = Vec::new();
        array.for_each_present(|index, _| present_ids.push(index));
        assert_eq!(present_ids, [0, 2]);
    }

    #[test]
    fn groups_align_to_word_boundaries() {
        let source: DenseArray<i64> = (0..200).map(|i| (i % 7 != 0).then_some(i)).collect();
        let array = source.slice(5, 150);

        let mut spans = Vec::new();
        let mut seen = Vec::new();
        array.for_each_by_groups(|group, values| {
            spans.push((group.start, group.len));
            assert_eq!(values.len(), group.len);
            for i in 0..group.len {
                seen.push((group.start + i, group.word >> i & 1 == 1, values[i]));
            }
        });

        assert_eq!(spans, [(0, 59), (59, 64), (123, 27)]);
        let mut expected = Vec::new();
        array.for_each(|index, present, value| expected.push((index, present, *value)));
        assert_eq!(seen, expected);
    }

    #[test]
    fn groups_of_full_array_report_all_present() {
        let array = DenseArray::from_values(0..10i32);
        let mut groups = Vec::new();
        array.for_each_by_groups(|group, _| groups.push(group));
        assert_eq!(groups.len(), 1);
        assert_eq!((groups[0].start, groups[0].len), (0, 10));
        assert_eq!(groups[0].word, 0b11_1111_1111);
    }

    #[test]
    fn concat_preserves_presence() {
        let a = from_options(&[Some(1), None]);
        let b = from_options(&[None, Some(4), Some(5)]);
        let joined = a.concat(&b);
        assert_eq!(joined, from_options(&[Some(1), None, None, Some(4), Some(5)]));
    }

    #[test]
    fn deep_copy_detaches_storage() {
        let source = DenseArray::from_values([1, 2, 3]);
        let copy = source.deep_copy();
        assert_eq!(copy, source);
        assert!(copy.values().as_slice().as_ptr() != source.values().as_slice().as_ptr());
    }

    #[test]
    fn randomized_builder_round_trip() {
        let mut rng = fastrand::Rng::with_seed(41);
        for _ in 0..100 {
            let size = rng.usize(0..300);
            let items: Vec<Option<i64>> = (0..size)
                .map(|_| rng.bool().then(|| rng.i64(-100..100)))
                .collect();
            let array = from_options(&items);
            assert_eq!(array.len(), size);
            for (index, item) in items.iter().enumerate() {
                assert_eq!(array.get(index).into_option(), *item);
            }
            assert_eq!(
                array.present_count(),
                items.iter().filter(|item| item.is_some()).count()
            );

            if size > 2 {
                let start = rng.usize(0..size / 2);
                let count = rng.usize(0..size - start);
                let view = array.slice(start, count);
                for i in 0..count {
                    assert_eq!(view.get(i).into_option(), items[start + i]);
                }
            }
        }
    }
}

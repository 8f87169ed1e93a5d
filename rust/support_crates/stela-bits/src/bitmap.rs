//! Presence bitmap primitives.
//!
//! All functions take the bitmap as a word slice plus a `bit_offset` in
//! `[0, 64)` and a logical `size` in bits. Functions that accept an offset
//! honor the empty-slice convention: an empty bitmap means "all bits set".
//! The raw single-bit accessors ([`get_bit`], [`set_bit`], [`clear_bit`])
//! operate on materialized storage only; callers check for the empty
//! encoding first.
//!
//! # Example
//!
//! ```rust
//! use stela_bits::bitmap;
//!
//! let mut builder = bitmap::Builder::new(100);
//! for i in 0..100 {
//!     if i % 3 != 0 {
//!         builder.set(i);
//!     }
//! }
//! let words = builder.build();
//! assert_eq!(bitmap::count_bits(&words, 0, 100), 66);
//! assert!(!bitmap::get_bit(&words, 0));
//! assert!(bitmap::get_bit(&words, 1));
//! ```

/// Number of bits in a bitmap word.
pub const WORD_BITS: usize = 64;

/// Returns the number of words needed to store `bit_count` bits.
#[inline]
pub const fn word_count(bit_count: usize) -> usize {
    bit_count.div_ceil(WORD_BITS)
}

/// Returns the state of bit `index`.
///
/// # Panics
///
/// Panics if `index` is out of the slice's bit range.
#[inline]
pub fn get_bit(words: &[u64], index: usize) -> bool {
    words[index / WORD_BITS] >> (index % WORD_BITS) & 1 == 1
}

/// Sets bit `index`.
#[inline]
pub fn set_bit(words: &mut [u64], index: usize) {
    words[index / WORD_BITS] |= 1 << (index % WORD_BITS);
}

/// Clears bit `index`.
#[inline]
pub fn clear_bit(words: &mut [u64], index: usize) {
    words[index / WORD_BITS] &= !(1 << (index % WORD_BITS));
}

/// Returns the number of set bits in the `size` bits starting at `offset`.
///
/// An empty `words` slice counts as all-set and yields `size`.
pub fn count_bits(words: &[u64], offset: usize, size: usize) -> usize {
    debug_assert!(offset < WORD_BITS);
    if words.is_empty() {
        return size;
    }
    let full_words = size / WORD_BITS;
    let mut count = 0usize;
    for index in 0..full_words {
        count += get_word_with_offset(words, index, offset).count_ones() as usize;
    }
    let tail = size % WORD_BITS;
    if tail != 0 {
        let word = get_word_with_offset(words, full_words, offset);
        count += (word & low_bits(tail)).count_ones() as usize;
    }
    count
}

/// Returns true when every one of the `size` bits starting at `offset` is set.
///
/// An empty `words` slice counts as all-set.
pub fn are_all_set(words: &[u64], offset: usize, size: usize) -> bool {
    debug_assert!(offset < WORD_BITS);
    if words.is_empty() {
        return true;
    }
    let full_words = size / WORD_BITS;
    for index in 0..full_words {
        if get_word_with_offset(words, index, offset) != u64::MAX {
            return false;
        }
    }
    let tail = size % WORD_BITS;
    if tail != 0 {
        let mask = low_bits(tail);
        if get_word_with_offset(words, full_words, offset) & mask != mask {
            return false;
        }
    }
    true
}

/// Returns 64 bits of the bitmap starting at bit `index * 64 + offset`.
///
/// Bits past the end of the slice read as zero, so the caller is responsible
/// for masking any tail beyond the logical size.
#[inline]
pub fn get_word_with_offset(words: &[u64], index: usize, offset: usize) -> u64 {
    debug_assert!(offset < WORD_BITS);
    if offset == 0 {
        return words[index];
    }
    let low = words[index] >> offset;
    let high = if index + 1 < words.len() {
        words[index + 1] << (WORD_BITS - offset)
    } else {
        0
    };
    low | high
}

/// Rebuilds the `size` bits starting at `offset` as an offset-0 bitmap.
///
/// The final partial word is masked so that bits past `size` are zero. An
/// empty input stays empty (all-present in, all-present out).
pub fn normalize(words: &[u64], offset: usize, size: usize) -> Vec<u64> {
    debug_assert!(offset < WORD_BITS);
    if words.is_empty() {
        return Vec::new();
    }
    let count = word_count(size);
    let mut out = Vec::with_capacity(count);
    for index in 0..count {
        out.push(get_word_with_offset(words, index, offset));
    }
    let tail = size % WORD_BITS;
    if tail != 0 {
        out[count - 1] &= low_bits(tail);
    }
    out
}

/// Calls `f(present)` for each of the `size` bits starting at `offset`.
///
/// The empty (all-present) encoding is handled without touching words.
pub fn iterate(words: &[u64], offset: usize, size: usize, mut f: impl FnMut(bool)) {
    debug_assert!(offset < WORD_BITS);
    if words.is_empty() {
        for _ in 0..size {
            f(true);
        }
        return;
    }
    let mut start = 0;
    while start < size {
        let word = get_word_with_offset(words, start / WORD_BITS, offset);
        let bits = (size - start).min(WORD_BITS);
        for bit in 0..bits {
            f(word >> bit & 1 == 1);
        }
        start += bits;
    }
}

#[inline]
fn low_bits(count: usize) -> u64 {
    debug_assert!(count >= 1 && count <= WORD_BITS);
    u64::MAX >> (WORD_BITS - count)
}

/// Incremental bitmap builder.
///
/// Starts with all `size` bits clear. `build()` returns the empty word vector
/// when every bit ended up set, preserving the all-present encoding.
#[derive(Debug, Clone)]
pub struct Builder {
    words: Vec<u64>,
    size: usize,
}

impl Builder {
    pub fn new(size: usize) -> Builder {
        Builder {
            words: vec![0; word_count(size)],
            size,
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Sets bit `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= size`.
    #[inline]
    pub fn set(&mut self, index: usize) {
        assert!(index < self.size);
        set_bit(&mut self.words, index);
    }

    /// Clears bit `index`.
    #[inline]
    pub fn clear(&mut self, index: usize) {
        assert!(index < self.size);
        clear_bit(&mut self.words, index);
    }

    #[inline]
    pub fn is_set(&self, index: usize) -> bool {
        assert!(index < self.size);
        get_bit(&self.words, index)
    }

    /// Finalizes the bitmap, collapsing the all-set case to the empty vector.
    pub fn build(self) -> Vec<u64> {
        if count_bits(&self.words, 0, self.size) == self.size {
            Vec::new()
        } else {
            self.words
        }
    }

    /// Finalizes only the first `count` bits.
    ///
    /// # Panics
    ///
    /// Panics if `count > size`.
    pub fn build_prefix(mut self, count: usize) -> Vec<u64> {
        assert!(count <= self.size);
        self.words.truncate(word_count(count));
        let tail = count % WORD_BITS;
        if tail != 0 {
            let last = self.words.len() - 1;
            self.words[last] &= low_bits(tail);
        }
        if count_bits(&self.words, 0, count) == count {
            Vec::new()
        } else {
            self.words
        }
    }
}

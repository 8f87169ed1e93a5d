//! Word-packed presence bitmaps for the stela value containers.
//!
//! A bitmap is a plain `&[u64]` slice with LSB-first bit order: bit `i` lives
//! in word `i / 64` at position `i % 64`. An *empty* slice is the canonical
//! encoding of "every element is present", which keeps fully-present arrays
//! free of presence storage. A `bit_offset` in `[0, 64)` lets a bitmap act as
//! a zero-copy view into a larger bitmap starting at a non-word-aligned bit.

pub mod bitmap;

//! Columnar value containers for the Stela expression model.
//!
//! This crate provides the two array families that carry per-row values
//! through evaluation, along with the edges that relate arrays to each
//! other:
//!
//! # Core Concepts
//!
//! - **Dense arrays** ([`dense_array::DenseArray`]): a buffer of values
//!   plus a word-packed presence bitmap. An empty bitmap means every
//!   element is present, so fully-populated arrays pay nothing for
//!   optionality.
//!
//! - **Sparse arrays** ([`array::Array`]): a logical size, an id filter
//!   selecting which rows have explicitly stored values, a dense array of
//!   those stored values, and a single default for all unlisted rows.
//!   Constants and all-missing arrays are O(1) regardless of size.
//!
//! - **Edges** ([`edge::DenseArrayEdge`], [`edge::ArrayEdge`]): child-to-
//!   parent index relationships, stored either as split points (contiguous
//!   groups) or as an explicit mapping. Edges are what aggregations and
//!   broadcasts travel along.
//!
//! - **Grouping** ([`group_by`]): turns a value series into an edge whose
//!   parents are the distinct (parent, value) groups, refining an existing
//!   edge in a single scan.
//!
//! All containers share immutable [`stela_buffer::Buffer`] storage, so
//! slicing never copies values.

pub mod array;
pub mod dense_array;
pub mod edge;
pub mod group_by;
pub mod optional;
pub mod scalars;
pub mod shape;

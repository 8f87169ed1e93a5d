//! Runtime type descriptors for the Stela expression model.
//!
//! Code that cannot name value types at compile time runs on qtypes:
//! process-wide singleton descriptors covering scalars, optionals, the
//! two array families, shapes, edges and tuples.
//!
//! # Core Concepts
//!
//! - **QTypes** ([`qtype::QType`], [`qtype::QTypePtr`]): the descriptor
//!   itself. Identity is pointer identity, so comparison is O(1) and
//!   qtypes work as map keys.
//!
//! - **The registry** ([`registry::TypeRegistry`]): owns the
//!   singletons. Standard scalars and their containers are
//!   pre-registered; user scalars declared with [`scalar_value!`]
//!   register lazily on first use.
//!
//! - **Erased values** ([`typed_value::TypedValue`]): a shared value
//!   tagged with its qtype, supporting repr, equality and checked
//!   downcasts without compile-time type knowledge.
//!
//! - **Frames and copiers** ([`frame`], [`copier`]): row-major scratch
//!   storage and the batch copiers that scatter arrays into frames and
//!   gather frames back into arrays.
//!
//! - **The type lattice** ([`properties`], [`casting`]): common-qtype
//!   joins over scalar promotion chains and container shapes, and the
//!   implicit cast planner that turns a `(from, to)` pair into an
//!   ordered list of cast steps.

pub mod casting;
pub mod copier;
pub mod frame;
pub mod properties;
pub mod qtype;
pub mod registry;
pub mod repr;
pub mod scalars;
pub mod typed_value;

mod array_ops;
mod edge_ops;
mod shape_ops;

pub use stela_common::Result;

#[doc(hidden)]
pub use paste;

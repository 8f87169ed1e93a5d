//! Canonical textual representation of values.
//!
//! Every value type renders to a stable debug string used in error
//! messages and interactive display. The forms are part of the public
//! contract and are pinned by tests:
//!
//! - scalars: `5`, `true`, `1.5`, or qualified `int64{5}` for types whose
//!   bare payload would be ambiguous;
//! - optionals: `optional_int32{5}` / `optional_int32{NA}`, except the
//!   unit presence value which renders as `present` / `missing`;
//! - arrays: `dense_array([1, NA, 3])`, truncated past ten elements with
//!   `...` and an explicit `size=N`, plus `value_qtype=NAME` whenever no
//!   displayed element reveals the element type;
//! - shapes and edges: `array_shape{size=5}`,
//!   `dense_array_edge(split_points=dense_array([int64{0}, int64{2}]))`.

use std::any::TypeId;

use itertools::Itertools;
use stela_arrays::array::Array;
use stela_arrays::dense_array::DenseArray;
use stela_arrays::edge::{
    ArrayEdge, ArrayGroupScalarEdge, DenseArrayEdge, DenseArrayGroupScalarEdge, ScalarToScalarEdge,
};
use stela_arrays::optional::OptionalValue;
use stela_arrays::scalars::Unit;
use stela_arrays::shape::{ArrayShape, DenseArrayShape, OptionalScalarShape, ScalarShape};

use crate::scalars::ScalarValue;

/// Renders the canonical repr of a value.
pub trait ReprValue {
    fn repr(&self) -> String;
}

/// Renders a scalar's payload without its type qualification.
pub trait ReprBare {
    fn repr_bare(&self) -> String;
}

/// Formats an `f64` so the text is unambiguously floating-point:
/// a `.` is appended to values that would otherwise print as integers,
/// and the special values render as `nan`, `inf` and `-inf`.
pub fn format_float64(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value.is_sign_positive() { "inf" } else { "-inf" }.to_string();
    }
    let mut text = value.to_string();
    if !text.contains(['.', 'e']) {
        text.push('.');
    }
    text
}

/// [`format_float64`] for `f32`, formatting natively so the shortest
/// round-trip text of the 32-bit value is used.
pub fn format_float32(value: f32) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value.is_sign_positive() { "inf" } else { "-inf" }.to_string();
    }
    let mut text = value.to_string();
    if !text.contains(['.', 'e']) {
        text.push('.');
    }
    text
}

impl<T: ScalarValue> ReprValue for OptionalValue<T> {
    fn repr(&self) -> String {
        if TypeId::of::<T>() == TypeId::of::<Unit>() {
            return if self.present { "present" } else { "missing" }.to_string();
        }
        let payload = if self.present {
            self.value.repr_bare()
        } else {
            "NA".to_string()
        };
        format!("optional_{}{{{payload}}}", T::LOWER_NAME)
    }
}

const MAX_REPR_ELEMENTS: usize = 10;

fn array_repr<T: ScalarValue>(
    family: &str,
    size: usize,
    element: impl Fn(usize) -> OptionalValue<T>,
) -> String {
    let displayed = size.min(MAX_REPR_ELEMENTS);
    let mut any_present = false;
    let mut parts = Vec::with_capacity(displayed + 1);
    for index in 0..displayed {
        let value = element(index);
        if value.present {
            any_present = true;
            parts.push(value.value.repr());
        } else {
            parts.push("NA".to_string());
        }
    }
    if size > MAX_REPR_ELEMENTS {
        parts.push("...".to_string());
    }
    let mut out = format!("{family}([{}]", parts.iter().join(", "));
    if size > MAX_REPR_ELEMENTS {
        out.push_str(&format!(", size={size}"));
    }
    if !any_present {
        out.push_str(&format!(", value_qtype={}", T::NAME));
    }
    out.push(')');
    out
}

impl<T: ScalarValue> ReprValue for DenseArray<T> {
    fn repr(&self) -> String {
        array_repr("dense_array", self.len(), |index| self.get(index))
    }
}

impl<T: ScalarValue> ReprValue for Array<T> {
    fn repr(&self) -> String {
        array_repr("array", self.len(), |index| self.get(index))
    }
}

impl ReprValue for ScalarShape {
    fn repr(&self) -> String {
        "scalar_shape".to_string()
    }
}

impl ReprValue for OptionalScalarShape {
    fn repr(&self) -> String {
        "optional_scalar_shape".to_string()
    }
}

impl ReprValue for DenseArrayShape {
    fn repr(&self) -> String {
        format!("dense_array_shape{{size={}}}", self.size)
    }
}

impl ReprValue for ArrayShape {
    fn repr(&self) -> String {
        format!("array_shape{{size={}}}", self.size)
    }
}

impl ReprValue for DenseArrayEdge {
    fn repr(&self) -> String {
        match self {
            DenseArrayEdge::SplitPoints { split_points } => {
                format!("dense_array_edge(split_points={})", split_points.repr())
            }
            DenseArrayEdge::Mapping {
                mapping,
                parent_size,
            } => format!(
                "dense_array_edge(mapping={}, parent_size={parent_size})",
                mapping.repr()
            ),
        }
    }
}

impl ReprValue for ArrayEdge {
    fn repr(&self) -> String {
        match self {
            ArrayEdge::SplitPoints { split_points } => {
                format!("array_edge(split_points={})", split_points.repr())
            }
            ArrayEdge::Mapping {
                mapping,
                parent_size,
            } => format!(
                "array_edge(mapping={}, parent_size={parent_size})",
                mapping.repr()
            ),
        }
    }
}

impl ReprValue for DenseArrayGroupScalarEdge {
    fn repr(&self) -> String {
        format!("dense_array_to_scalar_edge(child_size={})", self.child_size())
    }
}

impl ReprValue for ArrayGroupScalarEdge {
    fn repr(&self) -> String {
        format!("array_to_scalar_edge(child_size={})", self.child_size())
    }
}

impl ReprValue for ScalarToScalarEdge {
    fn repr(&self) -> String {
        "scalar_to_scalar_edge".to_string()
    }
}

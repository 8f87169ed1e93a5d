//! Scalar value types that are not plain Rust primitives.

/// The unit scalar: a type with exactly one value, used where only
/// presence matters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Unit;

/// A float64 that remembers it came from an untyped literal.
///
/// Weak floats combine with any concrete float type without forcing a
/// widening, so `x + 1.5` keeps the type of `x`. The runtime
/// representation is an ordinary `f64`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[repr(transparent)]
pub struct WeakFloat(f64);

impl WeakFloat {
    pub fn new(value: f64) -> WeakFloat {
        WeakFloat(value)
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl From<f64> for WeakFloat {
    fn from(value: f64) -> WeakFloat {
        WeakFloat(value)
    }
}

impl From<WeakFloat> for f64 {
    fn from(value: WeakFloat) -> f64 {
        value.0
    }
}

/// An owned byte string scalar.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Bytes(pub Vec<u8>);

impl Bytes {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(value: Vec<u8>) -> Bytes {
        Bytes(value)
    }
}

impl From<&[u8]> for Bytes {
    fn from(value: &[u8]) -> Bytes {
        Bytes(value.to_vec())
    }
}

/// An owned text scalar, always valid UTF-8.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Text(pub String);

impl Text {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Text {
    fn from(value: String) -> Text {
        Text(value)
    }
}

impl From<&str> for Text {
    fn from(value: &str) -> Text {
        Text(value.to_string())
    }
}

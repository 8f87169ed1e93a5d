//! Scalar value types and their qtype bindings.
//!
//! The [`scalar_value!`] macro ties a Rust type to its registered qtype
//! name and repr form. All standard scalars are declared here; crates
//! defining their own scalar types invoke the same macro and then call
//! [`TypeRegistry::register_scalar`](crate::registry::TypeRegistry::register_scalar).

use stela_arrays::array::Array;
use stela_arrays::dense_array::DenseArray;
use stela_arrays::optional::OptionalValue;
use stela_arrays::scalars::{Bytes, Text, Unit, WeakFloat};
use stela_common::Result;

use crate::qtype::{QTypePtr, QTypeValue};
use crate::registry::TypeRegistry;
use crate::repr::{ReprBare, ReprValue, format_float32, format_float64};

/// A scalar type usable as the element type of optionals and arrays.
///
/// `Base` is the scalar a derived type decays to; it is `Self` for every
/// non-derived scalar.
pub trait ScalarValue: QTypeValue + ReprValue + ReprBare + PartialEq + Default {
    /// Registered qtype name, e.g. `"INT32"`.
    const NAME: &'static str;

    /// Lowercase form used inside container reprs, e.g. `"int32"`.
    const LOWER_NAME: &'static str;

    /// Whether the scalar repr wraps the payload as `name{payload}`.
    const QUALIFIED_REPR: bool;

    type Base: ScalarValue;
}

/// Declares the qtype binding of a scalar type: its registered name,
/// whether its repr is qualified, the scalar it decays to, and how its
/// payload renders.
#[macro_export]
macro_rules! scalar_value {
    ($ty:ty, $name:ident, qualified: $qualified:expr, base: $base:ty,
     |$value:ident| $payload:expr) => {
        impl $crate::repr::ReprBare for $ty {
            fn repr_bare(&self) -> String {
                let $value = self;
                $payload
            }
        }

        impl $crate::repr::ReprValue for $ty {
            fn repr(&self) -> String {
                if <$ty as $crate::scalars::ScalarValue>::QUALIFIED_REPR {
                    format!(
                        "{}{{{}}}",
                        <$ty as $crate::scalars::ScalarValue>::LOWER_NAME,
                        $crate::repr::ReprBare::repr_bare(self)
                    )
                } else {
                    $crate::repr::ReprBare::repr_bare(self)
                }
            }
        }

        impl $crate::qtype::QTypeValue for $ty {
            fn qtype(
                registry: &$crate::registry::TypeRegistry,
            ) -> $crate::Result<$crate::qtype::QTypePtr> {
                registry.scalar_of::<$ty>()
            }
        }

        $crate::paste::paste! {
            impl $crate::scalars::ScalarValue for $ty {
                const NAME: &'static str = stringify!($name);
                const LOWER_NAME: &'static str = stringify!([<$name:lower>]);
                const QUALIFIED_REPR: bool = $qualified;
                type Base = $base;
            }
        }
    };
}

scalar_value!(Unit, UNIT, qualified: false, base: Unit, |value| {
    let _ = value;
    "unit".to_string()
});
scalar_value!(bool, BOOLEAN, qualified: false, base: bool, |value| value.to_string());
scalar_value!(i32, INT32, qualified: false, base: i32, |value| value.to_string());
scalar_value!(i64, INT64, qualified: true, base: i64, |value| value.to_string());
scalar_value!(u64, UINT64, qualified: true, base: u64, |value| value.to_string());
scalar_value!(f32, FLOAT32, qualified: false, base: f32, |value| format_float32(*value));
scalar_value!(f64, FLOAT64, qualified: true, base: f64, |value| format_float64(*value));
scalar_value!(WeakFloat, WEAK_FLOAT, qualified: true, base: f64, |value| {
    format_float64(value.value())
});
scalar_value!(Bytes, BYTES, qualified: false, base: Bytes, |value| {
    format!("b'{}'", value.as_bytes().escape_ascii())
});
scalar_value!(Text, TEXT, qualified: false, base: Text, |value| {
    format!("'{}'", value.as_str().escape_debug())
});

impl<T: ScalarValue> QTypeValue for OptionalValue<T> {
    fn qtype(registry: &TypeRegistry) -> Result<QTypePtr> {
        registry.optional_of::<T>()
    }
}

impl<T: ScalarValue> QTypeValue for DenseArray<T> {
    fn qtype(registry: &TypeRegistry) -> Result<QTypePtr> {
        registry.dense_array_of::<T>()
    }
}

impl<T: ScalarValue> QTypeValue for Array<T> {
    fn qtype(registry: &TypeRegistry) -> Result<QTypePtr> {
        registry.array_of::<T>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_and_qualification() {
        assert_eq!(<i32 as ScalarValue>::NAME, "INT32");
        assert_eq!(<i32 as ScalarValue>::LOWER_NAME, "int32");
        assert!(!<i32 as ScalarValue>::QUALIFIED_REPR);

        assert_eq!(<bool as ScalarValue>::NAME, "BOOLEAN");
        assert_eq!(<WeakFloat as ScalarValue>::NAME, "WEAK_FLOAT");
        assert_eq!(<WeakFloat as ScalarValue>::LOWER_NAME, "weak_float");
        assert!(<WeakFloat as ScalarValue>::QUALIFIED_REPR);
        assert_eq!(<Text as ScalarValue>::NAME, "TEXT");
    }

    #[test]
    fn qtype_resolution_through_registry() {
        let registry = TypeRegistry::new();
        assert_eq!(<i32 as QTypeValue>::qtype(&registry).unwrap().name(), "INT32");
        assert_eq!(
            <OptionalValue<f64> as QTypeValue>::qtype(&registry)
                .unwrap()
                .name(),
            "OPTIONAL_FLOAT64"
        );
        assert_eq!(
            <DenseArray<Text> as QTypeValue>::qtype(&registry)
                .unwrap()
                .name(),
            "DENSE_ARRAY_TEXT"
        );
        assert_eq!(
            <Array<bool> as QTypeValue>::qtype(&registry).unwrap().name(),
            "ARRAY_BOOLEAN"
        );
    }

    #[test]
    fn bytes_repr_escapes_non_printable() {
        assert_eq!(Bytes::from(vec![0x61, 0x00, 0xff]).repr(), r"b'a\x00\xff'");
        assert_eq!(Text::from("a'b").repr(), r"'a\'b'");
    }
}

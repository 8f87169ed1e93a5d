//! Scalar values that may be missing.

use crate::scalars::Unit;

/// A value paired with a presence flag.
///
/// Unlike `Option`, the value slot always holds a well-defined `T` (the
/// default when missing), which keeps columnar code branch-free: kernels
/// read the value unconditionally and consult `present` separately.
///
/// Two missing values compare equal even when their value slots differ,
/// and hashing is consistent with that equality.
#[derive(Clone, Copy, Debug)]
pub struct OptionalValue<T> {
    pub present: bool,
    pub value: T,
}

impl<T> OptionalValue<T> {
    /// Creates a present value.
    pub fn present(value: T) -> OptionalValue<T> {
        OptionalValue {
            present: true,
            value,
        }
    }

    /// Creates a missing value with a defaulted value slot.
    pub fn missing() -> OptionalValue<T>
    where
        T: Default,
    {
        OptionalValue {
            present: false,
            value: T::default(),
        }
    }

    pub fn is_present(&self) -> bool {
        self.present
    }

    pub fn is_missing(&self) -> bool {
        !self.present
    }

    /// Borrows the value when present.
    pub fn as_option(&self) -> Option<&T> {
        self.present.then_some(&self.value)
    }

    /// Consumes the value, discarding the slot contents when missing.
    pub fn into_option(self) -> Option<T> {
        self.present.then_some(self.value)
    }
}

impl<T: Default> Default for OptionalValue<T> {
    fn default() -> OptionalValue<T> {
        OptionalValue::missing()
    }
}

impl<T: Default> From<Option<T>> for OptionalValue<T> {
    fn from(value: Option<T>) -> OptionalValue<T> {
        match value {
            Some(value) => OptionalValue::present(value),
            None => OptionalValue::missing(),
        }
    }
}

impl<T: PartialEq> PartialEq for OptionalValue<T> {
    fn eq(&self, other: &OptionalValue<T>) -> bool {
        if self.present != other.present {
            return false;
        }
        !self.present || self.value == other.value
    }
}

impl<T: Eq> Eq for OptionalValue<T> {}

impl<T: std::hash::Hash> std::hash::Hash for OptionalValue<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.present.hash(state);
        if self.present {
            self.value.hash(state);
        }
    }
}

/// A presence mask with no payload, the result type of presence checks.
pub type OptionalUnit = OptionalValue<Unit>;

impl From<bool> for OptionalUnit {
    fn from(present: bool) -> OptionalUnit {
        OptionalValue {
            present,
            value: Unit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_values_compare_equal() {
        let a = OptionalValue {
            present: false,
            value: 5i32,
        };
        let b = OptionalValue {
            present: false,
            value: -3i32,
        };
        assert_eq!(a, b);
        assert_ne!(a, OptionalValue::present(5));
        assert_eq!(OptionalValue::present(5), OptionalValue::present(5));
        assert_ne!(OptionalValue::present(5), OptionalValue::present(6));
    }

    #[test]
    fn hash_consistent_with_eq() {
        use std::hash::{BuildHasher, RandomState};
        let state = RandomState::new();
        let a = OptionalValue {
            present: false,
            value: 17i64,
        };
        let b = OptionalValue {
            present: false,
            value: 99i64,
        };
        assert_eq!(state.hash_one(a), state.hash_one(b));
    }

    #[test]
    fn option_conversions() {
        let present = OptionalValue::from(Some(7i32));
        assert!(present.is_present());
        assert_eq!(present.into_option(), Some(7));

        let missing: OptionalValue<i32> = None.into();
        assert!(missing.is_missing());
        assert_eq!(missing.as_option(), None);
        assert_eq!(missing.value, 0);
    }

    #[test]
    fn optional_unit_from_bool() {
        assert!(OptionalUnit::from(true).present);
        assert!(!OptionalUnit::from(false).present);
        assert_eq!(OptionalUnit::from(true), OptionalValue::present(Unit));
    }
}

//! Deriving group edges from value series.

use std::hash::Hash;

use ordered_float::OrderedFloat;
use stela_common::{Result, error::Error};

use crate::array::Array;
use crate::dense_array::{DenseArray, DenseArrayBuilder};
use crate::edge::{ArrayEdge, DenseArrayEdge};
use crate::optional::OptionalValue;
use crate::scalars::{Bytes, Text, Unit, WeakFloat};

/// A value type usable as a grouping key.
///
/// The associated key must be hashable and reflexively equal; floats map
/// to [`OrderedFloat`] so that NaN groups with NaN instead of forming a
/// fresh group per row.
pub trait GroupKey: Clone {
    type Key: Hash + Eq;

    fn group_key(&self) -> Self::Key;
}

macro_rules! self_group_key {
    ($($ty:ty),* $(,)?) => {
        $(
            impl GroupKey for $ty {
                type Key = $ty;

                fn group_key(&self) -> $ty {
                    self.clone()
                }
            }
        )*
    };
}

self_group_key!(bool, i32, i64, u64, Unit, Bytes, Text);

impl GroupKey for f32 {
    type Key = OrderedFloat<f32>;

    fn group_key(&self) -> OrderedFloat<f32> {
        OrderedFloat(*self)
    }
}

impl GroupKey for f64 {
    type Key = OrderedFloat<f64>;

    fn group_key(&self) -> OrderedFloat<f64> {
        OrderedFloat(*self)
    }
}

impl GroupKey for WeakFloat {
    type Key = OrderedFloat<f64>;

    fn group_key(&self) -> OrderedFloat<f64> {
        OrderedFloat(self.value())
    }
}

impl<T: GroupKey> GroupKey for OptionalValue<T> {
    type Key = Option<T::Key>;

    fn group_key(&self) -> Option<T::Key> {
        self.as_option().map(GroupKey::group_key)
    }
}

/// Refines `over` by the distinct values of `series`.
///
/// Each (parent, value) combination becomes one parent of the result,
/// with codes assigned in order of first appearance over the child scan,
/// not in sorted order. Children whose series entry is missing, or whose
/// parent in `over` is missing, get a missing code. The resulting edge's
/// parent size is the total number of distinct combinations.
pub fn group_by<T: GroupKey>(
    series: &DenseArray<T>,
    over: &DenseArrayEdge,
) -> Result<DenseArrayEdge> {
    if series.len() != over.child_size() {
        return Err(Error::invalid_arg(
            "series",
            format!(
                "series size {} doesn't match edge child size {}",
                series.len(),
                over.child_size()
            ),
        ));
    }
    let parents = over.to_mapping_values();
    let parent_values = parents.values().as_slice();
    let series_values = series.values().as_slice();
    let mut seen: ahash::HashMap<(i64, T::Key), i64> = ahash::HashMap::default();
    let mut codes = DenseArrayBuilder::new(series.len());
    for index in 0..series.len() {
        if !parents.present(index) || !series.present(index) {
            continue;
        }
        let key = (parent_values[index], series_values[index].group_key());
        let next = seen.len() as i64;
        let code = *seen.entry(key).or_insert(next);
        codes.set_value(index, code);
    }
    let parent_size = seen.len();
    DenseArrayEdge::from_mapping(codes.build(), parent_size)
}

/// Sparse-family counterpart of [`group_by`].
pub fn group_by_array<T: GroupKey + Default>(
    series: &Array<T>,
    over: &ArrayEdge,
) -> Result<ArrayEdge> {
    Ok(group_by(&series.to_dense(), &over.to_dense_edge())?.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes_of(edge: &DenseArrayEdge) -> Vec<Option<i64>> {
        let mapping = edge.to_mapping_values();
        (0..mapping.len()).map(|i| mapping.get(i).into_option()).collect()
    }

    #[test]
    fn codes_follow_first_appearance() {
        let series = DenseArray::from_values([5i64, 7, 5, 7, 4, 8]);
        let over = DenseArrayEdge::from_uniform_groups(1, 6);
        let grouped = group_by(&series, &over).unwrap();

        assert_eq!(grouped.parent_size(), 4);
        assert_eq!(
            codes_of(&grouped),
            [Some(0), Some(1), Some(0), Some(1), Some(2), Some(3)]
        );
    }

    #[test]
    fn missing_series_entries_get_missing_codes() {
        let series: DenseArray<i64> = [Some(1), None, Some(1), None].into_iter().collect();
        let over = DenseArrayEdge::from_uniform_groups(1, 4);
        let grouped = group_by(&series, &over).unwrap();

        assert_eq!(grouped.parent_size(), 1);
        assert_eq!(codes_of(&grouped), [Some(0), None, Some(0), None]);
    }

    #[test]
    fn equal_values_in_different_groups_stay_apart() {
        let series = DenseArray::from_values([1i32, 1, 1, 1]);
        let over = DenseArrayEdge::from_sizes(&[2, 2]).unwrap();
        let grouped = group_by(&series, &over).unwrap();

        assert_eq!(grouped.parent_size(), 2);
        assert_eq!(codes_of(&grouped), [Some(0), Some(0), Some(1), Some(1)]);
    }

    #[test]
    fn unattached_children_get_missing_codes() {
        let over = DenseArrayEdge::from_mapping(
            [Some(0), None, Some(0)].into_iter().collect(),
            1,
        )
        .unwrap();
        let series = DenseArray::from_values([7i64, 7, 7]);
        let grouped = group_by(&series, &over).unwrap();

        assert_eq!(grouped.parent_size(), 1);
        assert_eq!(codes_of(&grouped), [Some(0), None, Some(0)]);
    }

    #[test]
    fn nan_groups_with_nan() {
        let series = DenseArray::from_values([1.5f64, f64::NAN, 1.5, f64::NAN]);
        let over = DenseArrayEdge::from_uniform_groups(1, 4);
        let grouped = group_by(&series, &over).unwrap();

        assert_eq!(grouped.parent_size(), 2);
        assert_eq!(codes_of(&grouped), [Some(0), Some(1), Some(0), Some(1)]);
    }

    #[test]
    fn text_and_weak_float_keys() {
        let series: DenseArray<Text> = ["a", "b", "a"].map(Text::from).into_iter().collect();
        let over = DenseArrayEdge::from_uniform_groups(1, 3);
        assert_eq!(
            codes_of(&group_by(&series, &over).unwrap()),
            [Some(0), Some(1), Some(0)]
        );

        let weak: DenseArray<WeakFloat> =
            [1.0, 2.0, 1.0].map(WeakFloat::new).into_iter().collect();
        assert_eq!(
            codes_of(&group_by(&weak, &over).unwrap()),
            [Some(0), Some(1), Some(0)]
        );
    }

    #[test]
    fn size_mismatch_is_rejected() {
        let series = DenseArray::from_values([1i64, 2]);
        let over = DenseArrayEdge::from_uniform_groups(1, 3);
        let err = group_by(&series, &over).unwrap_err();
        assert!(
            err.to_string()
                .contains("series size 2 doesn't match edge child size 3"),
            "{err}"
        );
    }

    #[test]
    fn sparse_family_delegates_to_dense() {
        let series: Array<i64> = Array::from_values([5, 7, 5]);
        let over = ArrayEdge::from_uniform_groups(1, 3);
        let grouped = group_by_array(&series, &over).unwrap();

        assert_eq!(grouped.parent_size(), 2);
        assert_eq!(
            codes_of(&grouped.to_dense_edge()),
            [Some(0), Some(1), Some(0)]
        );
    }

    #[test]
    fn grouped_edge_composes_with_source_edge() {
        // Refining and then aggregating all the way up reaches the same
        // root as aggregating the original edge directly.
        let series = DenseArray::from_values([1i64, 2, 1, 2]);
        let over = DenseArrayEdge::from_uniform_groups(2, 2);
        let grouped = group_by(&series, &over).unwrap();
        assert_eq!(grouped.parent_size(), 4);

        let to_root = DenseArrayEdge::from_uniform_groups(1, 2);
        let chain = DenseArrayEdge::compose_edges(&[to_root, over]).unwrap();
        assert_eq!(chain.child_size(), grouped.child_size());
    }
}

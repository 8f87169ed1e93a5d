//! Sparse arrays: dense data for selected rows, one default for the rest.

use stela_buffer::Buffer;
use stela_common::{Result, error::Error, verify_arg};

use crate::dense_array::{DenseArray, DenseArrayBuilder};
use crate::optional::OptionalValue;

/// Selects which logical row ids of an [`Array`] have explicitly stored
/// values.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum IdFilter {
    /// Every row is stored: row `i` lives at dense position `i`.
    #[default]
    Full,
    /// No row is stored; every lookup yields the array's default.
    Empty,
    /// Rows listed in `ids` are stored, in strictly increasing order.
    /// The row with stored id `ids[k]` lives at dense position `k`, and
    /// its logical id is `ids[k] - ids_offset`. Slicing only has to bump
    /// the offset, so stored ids are shared across slices.
    Partial { ids: Buffer<i64>, ids_offset: i64 },
}

impl IdFilter {
    /// Dense position of logical row `id`, if the row is stored.
    pub fn find(&self, id: usize) -> Option<usize> {
        match self {
            IdFilter::Full => Some(id),
            IdFilter::Empty => None,
            IdFilter::Partial { ids, ids_offset } => {
                let stored = id as i64 + ids_offset;
                let position = ids.partition_point(|&v| v < stored);
                (position < ids.len() && ids[position] == stored).then_some(position)
            }
        }
    }
}

/// An immutable array that stores values only for a subset of its rows.
///
/// Rows selected by the id filter take their value (or missingness) from
/// `dense_data`; every other row yields `missing_id_value`. This makes
/// constants and all-missing arrays O(1) in memory regardless of size,
/// and keeps mostly-default data proportional to the number of
/// exceptions.
#[derive(Debug, Clone)]
pub struct Array<T> {
    size: usize,
    id_filter: IdFilter,
    dense_data: DenseArray<T>,
    missing_id_value: OptionalValue<T>,
}

impl<T> Array<T> {
    /// Assembles an array from its parts, verifying their consistency.
    ///
    /// `dense_data` must have exactly one element per filtered row: `size`
    /// rows for [`IdFilter::Full`], zero for [`IdFilter::Empty`], one per
    /// stored id for [`IdFilter::Partial`]. Stored ids must be strictly
    /// increasing and map into `[0, size)` after subtracting the offset.
    pub fn new(
        size: usize,
        id_filter: IdFilter,
        dense_data: DenseArray<T>,
        missing_id_value: OptionalValue<T>,
    ) -> Result<Array<T>> {
        match &id_filter {
            IdFilter::Full => {
                verify_arg!(dense_data, dense_data.len() == size);
            }
            IdFilter::Empty => {
                verify_arg!(dense_data, dense_data.is_empty());
            }
            IdFilter::Partial { ids, ids_offset } => {
                verify_arg!(dense_data, dense_data.len() == ids.len());
                let mut previous: Option<i64> = None;
                for &stored in ids.iter() {
                    if previous.is_some_and(|p| p >= stored) {
                        return Err(Error::invalid_arg(
                            "ids",
                            "stored ids must be strictly increasing",
                        ));
                    }
                    let id = stored - ids_offset;
                    if id < 0 || id >= size as i64 {
                        return Err(Error::invalid_arg(
                            "ids",
                            format!("id {id} is out of range [0, {size})"),
                        ));
                    }
                    previous = Some(stored);
                }
            }
        }
        Ok(Array {
            size,
            id_filter,
            dense_data,
            missing_id_value,
        })
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn id_filter(&self) -> &IdFilter {
        &self.id_filter
    }

    pub fn dense_data(&self) -> &DenseArray<T> {
        &self.dense_data
    }

    /// The value yielded by rows the id filter does not store.
    pub fn missing_id_value(&self) -> &OptionalValue<T> {
        &self.missing_id_value
    }

    /// Whether every row is explicitly stored.
    pub fn is_full_form(&self) -> bool {
        matches!(self.id_filter, IdFilter::Full)
    }

    /// Whether row `index` holds a present value.
    pub fn present(&self, index: usize) -> bool {
        self.row(index).0
    }

    /// Presence flag and value slot of row `index`, without cloning.
    fn row(&self, index: usize) -> (bool, &T) {
        assert!(
            index < self.size,
            "index {index} out of bounds for array of length {}",
            self.size
        );
        match self.id_filter.find(index) {
            Some(position) => (
                self.dense_data.present(position),
                &self.dense_data.values()[position],
            ),
            None => (self.missing_id_value.present, &self.missing_id_value.value),
        }
    }

    /// Number of rows holding a present value.
    pub fn present_count(&self) -> usize {
        let stored = self.dense_data.present_count();
        if self.missing_id_value.present {
            stored + (self.size - self.dense_data.len())
        } else {
            stored
        }
    }

    /// Returns a zero-copy view of `count` rows starting at `start`.
    ///
    /// For partial filters the stored ids are shared and only the offset
    /// moves, so slicing is O(log n) in the number of stored rows.
    pub fn slice(&self, start: usize, count: usize) -> Array<T>
    where
        T: Clone,
    {
        assert!(
            start + count <= self.size,
            "slice [{start}, {start}+{count}) out of bounds for array of length {}",
            self.size
        );
        match &self.id_filter {
            IdFilter::Full => Array {
                size: count,
                id_filter: IdFilter::Full,
                dense_data: self.dense_data.slice(start, count),
                missing_id_value: self.missing_id_value.clone(),
            },
            IdFilter::Empty => Array {
                size: count,
                id_filter: IdFilter::Empty,
                dense_data: DenseArray::default(),
                missing_id_value: self.missing_id_value.clone(),
            },
            IdFilter::Partial { ids, ids_offset } => {
                let low = ids.partition_point(|&v| v < start as i64 + ids_offset);
                let high = ids.partition_point(|&v| v < (start + count) as i64 + ids_offset);
                Array {
                    size: count,
                    id_filter: IdFilter::Partial {
                        ids: ids.slice(low, high - low),
                        ids_offset: ids_offset + start as i64,
                    },
                    dense_data: self.dense_data.slice(low, high - low),
                    missing_id_value: self.missing_id_value.clone(),
                }
            }
        }
    }

    /// Calls `f(index, present, value)` for every row in order, without
    /// materializing unstored rows.
    pub fn for_each(&self, mut f: impl FnMut(usize, bool, &T)) {
        match &self.id_filter {
            IdFilter::Full => self.dense_data.for_each(f),
            IdFilter::Empty => {
                for index in 0..self.size {
                    f(
                        index,
                        self.missing_id_value.present,
                        &self.missing_id_value.value,
                    );
                }
            }
            IdFilter::Partial { ids, ids_offset } => {
                let values = self.dense_data.values().as_slice();
                let mut position = 0;
                for index in 0..self.size {
                    if position < ids.len() && ids[position] - ids_offset == index as i64 {
                        f(index, self.dense_data.present(position), &values[position]);
                        position += 1;
                    } else {
                        f(
                            index,
                            self.missing_id_value.present,
                            &self.missing_id_value.value,
                        );
                    }
                }
            }
        }
    }
}

impl<T: Clone> Array<T> {
    /// Returns row `index`.
    pub fn get(&self, index: usize) -> OptionalValue<T> {
        let (present, value) = self.row(index);
        OptionalValue {
            present,
            value: value.clone(),
        }
    }

    /// Creates an array of `size` copies of `value` in O(1) memory.
    pub fn constant(size: usize, value: T) -> Array<T> {
        Array {
            size,
            id_filter: IdFilter::Empty,
            dense_data: DenseArray::default(),
            missing_id_value: OptionalValue::present(value),
        }
    }

    /// Materializes every row into a [`DenseArray`].
    pub fn to_dense(&self) -> DenseArray<T>
    where
        T: Default,
    {
        match &self.id_filter {
            IdFilter::Full => self.dense_data.clone(),
            IdFilter::Empty => match self.missing_id_value.as_option() {
                Some(value) => DenseArray::constant(self.size, value.clone()),
                None => DenseArray::all_missing(self.size),
            },
            IdFilter::Partial { ids, ids_offset } => {
                let mut builder = DenseArrayBuilder::new(self.size);
                if self.missing_id_value.present {
                    for index in 0..self.size {
                        builder.set_value(index, self.missing_id_value.value.clone());
                    }
                }
                for (position, &stored) in ids.iter().enumerate() {
                    builder.set((stored - ids_offset) as usize, self.dense_data.get(position));
                }
                builder.build()
            }
        }
    }
}

impl<T: Clone + Default> Array<T> {
    /// Creates an array of `size` missing rows in O(1) memory.
    pub fn all_missing(size: usize) -> Array<T> {
        Array {
            size,
            id_filter: IdFilter::Empty,
            dense_data: DenseArray::default(),
            missing_id_value: OptionalValue::missing(),
        }
    }

    /// Creates a fully-present, fully-stored array from a sequence of
    /// values.
    pub fn from_values(values: impl IntoIterator<Item = T>) -> Array<T> {
        Array::from(DenseArray::from_values(values))
    }
}

impl<T: Default> From<DenseArray<T>> for Array<T> {
    fn from(dense_data: DenseArray<T>) -> Array<T> {
        Array {
            size: dense_data.len(),
            id_filter: IdFilter::Full,
            dense_data,
            missing_id_value: OptionalValue::missing(),
        }
    }
}

impl<T: Default> Default for Array<T> {
    fn default() -> Array<T> {
        Array::from(DenseArray::default())
    }
}

impl<T: Clone + Default> FromIterator<Option<T>> for Array<T> {
    fn from_iter<I: IntoIterator<Item = Option<T>>>(iter: I) -> Array<T> {
        Array::from(DenseArray::from_iter(iter))
    }
}

/// Row-wise equality over the logical view; representations may differ.
impl<T: PartialEq> PartialEq for Array<T> {
    fn eq(&self, other: &Array<T>) -> bool {
        if self.size != other.size {
            return false;
        }
        for index in 0..self.size {
            let (present, value) = self.row(index);
            let (other_present, other_value) = other.row(index);
            if present != other_present {
                return false;
            }
            if present && value != other_value {
                return false;
            }
        }
        true
    }
}

impl<T: Eq> Eq for Array<T> {}

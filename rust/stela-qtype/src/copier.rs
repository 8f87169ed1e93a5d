//! Batch copiers between columnar arrays and per-row frames.
//!
//! Row-by-row evaluation over arrays works on frames: a
//! [`BatchToFramesCopier`] scatters the rows of one or more arrays into
//! scalar slots of consecutive frames, and a [`BatchFromFramesCopier`]
//! gathers scalar slots of consecutive frames back into freshly built
//! arrays. Both are staged: mappings are declared up front and frozen by
//! `start`, after which copying proceeds in caller-sized batches.
//!
//! Array rows travel as `OptionalValue` cells, so missing elements
//! survive the round trip. Copiers are obtained through
//! [`ArrayLikeOps`](crate::qtype::ArrayLikeOps), which lets callers stay
//! generic over the array family and element type.

use stela_common::{Result, error::Error};

use stela_arrays::array::Array;
use stela_arrays::dense_array::{DenseArray, DenseArrayBuilder};
use stela_arrays::optional::OptionalValue;

use crate::frame::{Frame, Slot, TypedSlot};
use crate::scalars::ScalarValue;
use crate::typed_value::TypedValue;

/// Scatters array rows into scalar slots of consecutive frames.
pub trait BatchToFramesCopier: Send {
    /// Declares that rows of the array `value` land in `slot` of each
    /// output frame. All mapped arrays must share one row count.
    fn add_mapping(&mut self, value: &TypedValue, slot: &TypedSlot) -> Result<()>;

    /// Freezes the mapping set; copying may begin.
    fn start(&mut self);

    /// The shared row count of the mapped arrays, `None` before the
    /// first mapping is added.
    fn row_count(&self) -> Option<usize>;

    /// Fills `frames` with the next rows, one row per frame, and
    /// returns how many rows were written. Returns zero once the
    /// source arrays are exhausted.
    fn copy_next_batch(&mut self, frames: &mut [Frame]) -> usize;
}

/// Gathers scalar slots of consecutive frames back into arrays.
pub trait BatchFromFramesCopier: Send {
    /// Declares that `slot` of every input frame feeds the array
    /// written to `output` at finalize time.
    fn add_mapping(&mut self, slot: &TypedSlot, output: &TypedSlot) -> Result<()>;

    /// Freezes the mapping set and sizes the output columns for
    /// `row_count` rows.
    fn start(&mut self, row_count: usize);

    /// Appends one row per frame to every output column.
    fn copy_next_batch(&mut self, frames: &[Frame]);

    /// Builds the collected columns and writes them to their output
    /// slots in `frame`. Fails unless exactly the promised number of
    /// rows was copied.
    fn finalize(&mut self, frame: &mut Frame) -> Result<()>;
}

fn mappings_frozen() -> Error {
    Error::failed_precondition("cannot add mappings after the copier has started")
}

fn row_count_mismatch(expected: usize, actual: usize) -> Error {
    Error::invalid_arg(
        "value",
        format!("array size doesn't match: {expected} vs {actual}"),
    )
}

pub(crate) struct DenseArrayToFramesCopier<T: ScalarValue> {
    columns: Vec<(DenseArray<T>, Slot<OptionalValue<T>>)>,
    row_count: Option<usize>,
    position: usize,
    started: bool,
}

impl<T: ScalarValue> DenseArrayToFramesCopier<T> {
    pub(crate) fn new() -> DenseArrayToFramesCopier<T> {
        DenseArrayToFramesCopier {
            columns: Vec::new(),
            row_count: None,
            position: 0,
            started: false,
        }
    }
}

impl<T: ScalarValue> BatchToFramesCopier for DenseArrayToFramesCopier<T> {
    fn add_mapping(&mut self, value: &TypedValue, slot: &TypedSlot) -> Result<()> {
        if self.started {
            return Err(mappings_frozen());
        }
        let array = value.as_ref::<DenseArray<T>>()?.clone();
        let slot = slot.typed::<OptionalValue<T>>()?;
        match self.row_count {
            None => self.row_count = Some(array.len()),
            Some(count) if count != array.len() => {
                return Err(row_count_mismatch(count, array.len()));
            }
            Some(_) => {}
        }
        self.columns.push((array, slot));
        Ok(())
    }

    fn start(&mut self) {
        self.started = true;
    }

    fn row_count(&self) -> Option<usize> {
        self.row_count
    }

    fn copy_next_batch(&mut self, frames: &mut [Frame]) -> usize {
        assert!(self.started, "copy_next_batch called before start");
        let remaining = self.row_count.unwrap_or(0) - self.position;
        let count = remaining.min(frames.len());
        for (array, slot) in &self.columns {
            for (offset, frame) in frames[..count].iter_mut().enumerate() {
                frame.set(slot, array.get(self.position + offset));
            }
        }
        self.position += count;
        count
    }
}

pub(crate) struct ArrayToFramesCopier<T: ScalarValue> {
    columns: Vec<(Array<T>, Slot<OptionalValue<T>>)>,
    row_count: Option<usize>,
    position: usize,
    started: bool,
}

impl<T: ScalarValue> ArrayToFramesCopier<T> {
    pub(crate) fn new() -> ArrayToFramesCopier<T> {
        ArrayToFramesCopier {
            columns: Vec::new(),
            row_count: None,
            position: 0,
            started: false,
        }
    }
}

impl<T: ScalarValue> BatchToFramesCopier for ArrayToFramesCopier<T> {
    fn add_mapping(&mut self, value: &TypedValue, slot: &TypedSlot) -> Result<()> {
        if self.started {
            return Err(mappings_frozen());
        }
        let array = value.as_ref::<Array<T>>()?.clone();
        let slot = slot.typed::<OptionalValue<T>>()?;
        match self.row_count {
            None => self.row_count = Some(array.len()),
            Some(count) if count != array.len() => {
                return Err(row_count_mismatch(count, array.len()));
            }
            Some(_) => {}
        }
        self.columns.push((array, slot));
        Ok(())
    }

    fn start(&mut self) {
        self.started = true;
    }

    fn row_count(&self) -> Option<usize> {
        self.row_count
    }

    fn copy_next_batch(&mut self, frames: &mut [Frame]) -> usize {
        assert!(self.started, "copy_next_batch called before start");
        let remaining = self.row_count.unwrap_or(0) - self.position;
        let count = remaining.min(frames.len());
        for (array, slot) in &self.columns {
            for (offset, frame) in frames[..count].iter_mut().enumerate() {
                frame.set(slot, array.get(self.position + offset));
            }
        }
        self.position += count;
        count
    }
}

pub(crate) struct DenseArrayFromFramesCopier<T: ScalarValue> {
    columns: Vec<(Slot<OptionalValue<T>>, Slot<DenseArray<T>>)>,
    builders: Vec<DenseArrayBuilder<T>>,
    row_count: usize,
    position: usize,
    started: bool,
}

impl<T: ScalarValue> DenseArrayFromFramesCopier<T> {
    pub(crate) fn new() -> DenseArrayFromFramesCopier<T> {
        DenseArrayFromFramesCopier {
            columns: Vec::new(),
            builders: Vec::new(),
            row_count: 0,
            position: 0,
            started: false,
        }
    }
}

impl<T: ScalarValue> BatchFromFramesCopier for DenseArrayFromFramesCopier<T> {
    fn add_mapping(&mut self, slot: &TypedSlot, output: &TypedSlot) -> Result<()> {
        if self.started {
            return Err(mappings_frozen());
        }
        let input = slot.typed::<OptionalValue<T>>()?;
        let output = output.typed::<DenseArray<T>>()?;
        self.columns.push((input, output));
        Ok(())
    }

    fn start(&mut self, row_count: usize) {
        self.started = true;
        self.row_count = row_count;
        self.builders = self
            .columns
            .iter()
            .map(|_| DenseArrayBuilder::new(row_count))
            .collect();
    }

    fn copy_next_batch(&mut self, frames: &[Frame]) {
        assert!(self.started, "copy_next_batch called before start");
        for ((input, _), builder) in self.columns.iter().zip(self.builders.iter_mut()) {
            for (offset, frame) in frames.iter().enumerate() {
                builder.set(self.position + offset, frame.get(input).clone());
            }
        }
        self.position += frames.len();
    }

    fn finalize(&mut self, frame: &mut Frame) -> Result<()> {
        if self.position != self.row_count {
            return Err(Error::failed_precondition(format!(
                "only {} of {} rows were copied",
                self.position, self.row_count
            )));
        }
        for ((_, output), builder) in self.columns.iter().zip(self.builders.drain(..)) {
            frame.set(output, builder.build());
        }
        Ok(())
    }
}

pub(crate) struct ArrayFromFramesCopier<T: ScalarValue> {
    columns: Vec<(Slot<OptionalValue<T>>, Slot<Array<T>>)>,
    builders: Vec<DenseArrayBuilder<T>>,
    row_count: usize,
    position: usize,
    started: bool,
}

impl<T: ScalarValue> ArrayFromFramesCopier<T> {
    pub(crate) fn new() -> ArrayFromFramesCopier<T> {
        ArrayFromFramesCopier {
            columns: Vec::new(),
            builders: Vec::new(),
            row_count: 0,
            position: 0,
            started: false,
        }
    }
}

impl<T: ScalarValue> BatchFromFramesCopier for ArrayFromFramesCopier<T> {
    fn add_mapping(&mut self, slot: &TypedSlot, output: &TypedSlot) -> Result<()> {
        if self.started {
            return Err(mappings_frozen());
        }
        let input = slot.typed::<OptionalValue<T>>()?;
        let output = output.typed::<Array<T>>()?;
        self.columns.push((input, output));
        Ok(())
    }

    fn start(&mut self, row_count: usize) {
        self.started = true;
        self.row_count = row_count;
        self.builders = self
            .columns
            .iter()
            .map(|_| DenseArrayBuilder::new(row_count))
            .collect();
    }

    fn copy_next_batch(&mut self, frames: &[Frame]) {
        assert!(self.started, "copy_next_batch called before start");
        for ((input, _), builder) in self.columns.iter().zip(self.builders.iter_mut()) {
            for (offset, frame) in frames.iter().enumerate() {
                builder.set(self.position + offset, frame.get(input).clone());
            }
        }
        self.position += frames.len();
    }

    fn finalize(&mut self, frame: &mut Frame) -> Result<()> {
        if self.position != self.row_count {
            return Err(Error::failed_precondition(format!(
                "only {} of {} rows were copied",
                self.position, self.row_count
            )));
        }
        for ((_, output), builder) in self.columns.iter().zip(self.builders.drain(..)) {
            frame.set(output, Array::from(builder.build()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameLayoutBuilder;
    use crate::registry::TypeRegistry;
    use std::sync::Arc;

    #[test]
    fn dense_rows_scatter_into_frames() {
        let registry = TypeRegistry::new();
        let mut builder = FrameLayoutBuilder::new();
        let slot = builder
            .add_slot::<OptionalValue<i32>>(&registry.lookup_by_name("OPTIONAL_INT32").unwrap());
        let layout = builder.build();

        let source: DenseArray<i32> = [Some(1), None, Some(3)].into_iter().collect();
        let value = TypedValue::new(&registry, source).unwrap();

        let mut copier = DenseArrayToFramesCopier::<i32>::new();
        copier.add_mapping(&value, &slot.untyped()).unwrap();
        assert_eq!(copier.row_count(), Some(3));
        copier.start();

        let mut frames = vec![
            Frame::new(Arc::clone(&layout)),
            Frame::new(Arc::clone(&layout)),
        ];
        assert_eq!(copier.copy_next_batch(&mut frames), 2);
        assert_eq!(frames[0].get(&slot).as_option(), Some(&1));
        assert!(frames[1].get(&slot).is_missing());

        assert_eq!(copier.copy_next_batch(&mut frames), 1);
        assert_eq!(frames[0].get(&slot).as_option(), Some(&3));

        assert_eq!(copier.copy_next_batch(&mut frames), 0);
    }

    #[test]
    fn mapped_arrays_must_share_a_row_count() {
        let registry = TypeRegistry::new();
        let mut builder = FrameLayoutBuilder::new();
        let a = builder
            .add_slot::<OptionalValue<i32>>(&registry.lookup_by_name("OPTIONAL_INT32").unwrap());
        let b = builder
            .add_slot::<OptionalValue<i64>>(&registry.lookup_by_name("OPTIONAL_INT64").unwrap());

        let mut copier = DenseArrayToFramesCopier::<i32>::new();
        let three = TypedValue::new(&registry, DenseArray::from_values([1i32, 2, 3])).unwrap();
        copier.add_mapping(&three, &a.untyped()).unwrap();

        let four = TypedValue::new(&registry, DenseArray::from_values([1i32, 2, 3, 4])).unwrap();
        let err = copier.add_mapping(&four, &b.untyped()).unwrap_err();
        assert!(
            err.to_string().contains("array size doesn't match: 3 vs 4"),
            "{err}"
        );
    }

    #[test]
    fn mappings_freeze_once_started() {
        let registry = TypeRegistry::new();
        let mut builder = FrameLayoutBuilder::new();
        let slot = builder
            .add_slot::<OptionalValue<i32>>(&registry.lookup_by_name("OPTIONAL_INT32").unwrap());

        let mut copier = DenseArrayToFramesCopier::<i32>::new();
        copier.start();

        let value = TypedValue::new(&registry, DenseArray::from_values([1i32])).unwrap();
        let err = copier.add_mapping(&value, &slot.untyped()).unwrap_err();
        assert!(
            err.to_string()
                .contains("cannot add mappings after the copier has started"),
            "{err}"
        );
    }

    #[test]
    #[should_panic(expected = "copy_next_batch called before start")]
    fn copying_before_start_panics() {
        let mut copier = ArrayToFramesCopier::<i32>::new();
        let mut frames: Vec<Frame> = Vec::new();
        copier.copy_next_batch(&mut frames);
    }

    #[test]
    fn gathering_checks_the_promised_row_count() {
        let registry = TypeRegistry::new();

        let mut rows = FrameLayoutBuilder::new();
        let cell = rows
            .add_slot::<OptionalValue<i32>>(&registry.lookup_by_name("OPTIONAL_INT32").unwrap());
        let row_layout = rows.build();

        let mut outputs = FrameLayoutBuilder::new();
        let column = outputs
            .add_slot::<DenseArray<i32>>(&registry.lookup_by_name("DENSE_ARRAY_INT32").unwrap());
        let output_layout = outputs.build();

        let mut copier = DenseArrayFromFramesCopier::<i32>::new();
        copier
            .add_mapping(&cell.untyped(), &column.untyped())
            .unwrap();
        copier.start(3);

        let mut frame = Frame::new(Arc::clone(&row_layout));
        frame.set(&cell, OptionalValue::present(9));
        copier.copy_next_batch(std::slice::from_ref(&frame));
        frame.set(&cell, OptionalValue::missing());
        copier.copy_next_batch(std::slice::from_ref(&frame));

        let mut result = Frame::new(Arc::clone(&output_layout));
        let err = copier.finalize(&mut result).unwrap_err();
        assert!(
            err.to_string().contains("only 2 of 3 rows were copied"),
            "{err}"
        );

        frame.set(&cell, OptionalValue::present(5));
        copier.copy_next_batch(std::slice::from_ref(&frame));
        copier.finalize(&mut result).unwrap();

        let expected: DenseArray<i32> = [Some(9), None, Some(5)].into_iter().collect();
        assert_eq!(result.get(&column), &expected);
    }
}

//! Scatter/gather round trips between arrays and frames, driven through
//! the erased copier factories the way an evaluator would drive them.

use std::sync::Arc;

use stela_arrays::array::Array;
use stela_arrays::dense_array::DenseArray;
use stela_arrays::optional::OptionalValue;

use stela_qtype::copier::{BatchFromFramesCopier, BatchToFramesCopier};
use stela_qtype::frame::{Frame, FrameLayoutBuilder};
use stela_qtype::qtype::QTypePtr;
use stela_qtype::registry::TypeRegistry;
use stela_qtype::typed_value::TypedValue;

fn named(registry: &TypeRegistry, name: &str) -> QTypePtr {
    registry.lookup_by_name(name).unwrap()
}

#[test]
fn dense_columns_round_trip_through_frames() {
    let registry = TypeRegistry::new();
    let dense_int32 = named(&registry, "DENSE_ARRAY_INT32");
    let dense_float64 = named(&registry, "DENSE_ARRAY_FLOAT64");

    let ints: DenseArray<i32> = [Some(1), None, Some(3), Some(4), None].into_iter().collect();
    let floats = DenseArray::from_values([0.5f64, 1.5, 2.5, 3.5, 4.5]);

    let mut rows = FrameLayoutBuilder::new();
    let int_cell = rows.add_slot::<OptionalValue<i32>>(&named(&registry, "OPTIONAL_INT32"));
    let float_cell = rows.add_slot::<OptionalValue<f64>>(&named(&registry, "OPTIONAL_FLOAT64"));
    let row_layout = rows.build();

    let mut outputs = FrameLayoutBuilder::new();
    let int_column = outputs.add_slot::<DenseArray<i32>>(&dense_int32);
    let float_column = outputs.add_slot::<DenseArray<f64>>(&dense_float64);
    let output_layout = outputs.build();

    let mut scatter_ints = dense_int32.array_ops().unwrap().make_to_frames_copier();
    let mut scatter_floats = dense_float64.array_ops().unwrap().make_to_frames_copier();
    scatter_ints
        .add_mapping(
            &TypedValue::new(&registry, ints.clone()).unwrap(),
            &int_cell.untyped(),
        )
        .unwrap();
    scatter_floats
        .add_mapping(
            &TypedValue::new(&registry, floats.clone()).unwrap(),
            &float_cell.untyped(),
        )
        .unwrap();
    assert_eq!(scatter_ints.row_count(), Some(5));
    scatter_ints.start();
    scatter_floats.start();

    let mut gather_ints = dense_int32.array_ops().unwrap().make_from_frames_copier();
    let mut gather_floats = dense_float64.array_ops().unwrap().make_from_frames_copier();
    gather_ints
        .add_mapping(&int_cell.untyped(), &int_column.untyped())
        .unwrap();
    gather_floats
        .add_mapping(&float_cell.untyped(), &float_column.untyped())
        .unwrap();
    gather_ints.start(5);
    gather_floats.start(5);

    let mut frames: Vec<Frame> = (0..2).map(|_| Frame::new(Arc::clone(&row_layout))).collect();
    loop {
        let copied = scatter_ints.copy_next_batch(&mut frames);
        assert_eq!(scatter_floats.copy_next_batch(&mut frames), copied);
        if copied == 0 {
            break;
        }
        gather_ints.copy_next_batch(&frames[..copied]);
        gather_floats.copy_next_batch(&frames[..copied]);
    }

    let mut result = Frame::new(output_layout);
    gather_ints.finalize(&mut result).unwrap();
    gather_floats.finalize(&mut result).unwrap();

    assert_eq!(result.get(&int_column), &ints);
    assert_eq!(result.get(&float_column), &floats);
}

#[test]
fn sparse_constants_round_trip_through_frames() {
    let registry = TypeRegistry::new();
    let array_int64 = named(&registry, "ARRAY_INT64");

    let source = Array::constant(4, 7i64);

    let mut rows = FrameLayoutBuilder::new();
    let cell = rows.add_slot::<OptionalValue<i64>>(&named(&registry, "OPTIONAL_INT64"));
    let row_layout = rows.build();

    let mut outputs = FrameLayoutBuilder::new();
    let column = outputs.add_slot::<Array<i64>>(&array_int64);
    let output_layout = outputs.build();

    let ops = array_int64.array_ops().unwrap();
    let mut scatter = ops.make_to_frames_copier();
    scatter
        .add_mapping(
            &TypedValue::new(&registry, source.clone()).unwrap(),
            &cell.untyped(),
        )
        .unwrap();
    scatter.start();

    let mut gather = ops.make_from_frames_copier();
    gather
        .add_mapping(&cell.untyped(), &column.untyped())
        .unwrap();
    gather.start(4);

    let mut frames: Vec<Frame> = (0..3).map(|_| Frame::new(Arc::clone(&row_layout))).collect();
    loop {
        let copied = scatter.copy_next_batch(&mut frames);
        if copied == 0 {
            break;
        }
        gather.copy_next_batch(&frames[..copied]);
    }

    let mut result = Frame::new(output_layout);
    gather.finalize(&mut result).unwrap();
    assert_eq!(result.get(&column), &source);
}

#[test]
fn randomized_dense_round_trip() {
    fastrand::seed(17);
    let registry = TypeRegistry::new();
    let dense_int64 = named(&registry, "DENSE_ARRAY_INT64");

    let rows = 257;
    let source: DenseArray<i64> = (0..rows)
        .map(|_| fastrand::bool().then(|| fastrand::i64(-1000..1000)))
        .collect();

    let mut row_slots = FrameLayoutBuilder::new();
    let cell = row_slots.add_slot::<OptionalValue<i64>>(&named(&registry, "OPTIONAL_INT64"));
    let row_layout = row_slots.build();

    let mut outputs = FrameLayoutBuilder::new();
    let column = outputs.add_slot::<DenseArray<i64>>(&dense_int64);
    let output_layout = outputs.build();

    let ops = dense_int64.array_ops().unwrap();
    let mut scatter = ops.make_to_frames_copier();
    scatter
        .add_mapping(
            &TypedValue::new(&registry, source.clone()).unwrap(),
            &cell.untyped(),
        )
        .unwrap();
    scatter.start();

    let mut gather = ops.make_from_frames_copier();
    gather
        .add_mapping(&cell.untyped(), &column.untyped())
        .unwrap();
    gather.start(rows);

    let mut frames: Vec<Frame> = (0..16).map(|_| Frame::new(Arc::clone(&row_layout))).collect();
    loop {
        let copied = scatter.copy_next_batch(&mut frames);
        if copied == 0 {
            break;
        }
        gather.copy_next_batch(&frames[..copied]);
    }

    let mut result = Frame::new(output_layout);
    gather.finalize(&mut result).unwrap();
    assert_eq!(result.get(&column), &source);
}

#[test]
fn erased_mappings_are_type_checked() {
    let registry = TypeRegistry::new();
    let dense_int32 = named(&registry, "DENSE_ARRAY_INT32");

    let mut rows = FrameLayoutBuilder::new();
    let int32_cell = rows.add_slot::<OptionalValue<i32>>(&named(&registry, "OPTIONAL_INT32"));
    let int64_cell = rows.add_slot::<OptionalValue<i64>>(&named(&registry, "OPTIONAL_INT64"));

    let mut copier = dense_int32.array_ops().unwrap().make_to_frames_copier();

    let sparse = TypedValue::new(&registry, Array::from_values([1i32])).unwrap();
    let err = copier
        .add_mapping(&sparse, &int32_cell.untyped())
        .unwrap_err();
    assert!(
        err.to_string()
            .contains("ARRAY_INT32 value cannot be read as the requested type"),
        "{err}"
    );

    let dense = TypedValue::new(&registry, DenseArray::from_values([1i32])).unwrap();
    let err = copier
        .add_mapping(&dense, &int64_cell.untyped())
        .unwrap_err();
    assert!(
        err.to_string()
            .contains("slot of qtype OPTIONAL_INT64 does not hold values"),
        "{err}"
    );

    copier.add_mapping(&dense, &int32_cell.untyped()).unwrap();
}

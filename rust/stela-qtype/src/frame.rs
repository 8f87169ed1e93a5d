//! Row-major frames.
//!
//! A [`FrameLayout`] fixes an ordered set of typed slots; a [`Frame`] is one
//! row of storage following that layout. Batch copiers move columns between
//! arrays and runs of frames, one cell per row.
//!
//! Slot handles come in two flavors: [`Slot<V>`] knows the Rust type stored
//! in the cell, [`TypedSlot`] only knows the qtype. Mixing up slots and
//! frames is a programming error and panics; recovering a typed slot from
//! an erased one is fallible and checked.

use std::any::{Any, TypeId};
use std::marker::PhantomData;
use std::sync::Arc;

use stela_common::{Result, error::Error};

use crate::qtype::QTypePtr;

/// An immutable slot list shared by all frames of one batch.
pub struct FrameLayout {
    slots: Vec<QTypePtr>,
}

impl FrameLayout {
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn slot_qtype(&self, index: usize) -> &QTypePtr {
        &self.slots[index]
    }
}

/// Collects slot declarations into a [`FrameLayout`].
#[derive(Default)]
pub struct FrameLayoutBuilder {
    slots: Vec<QTypePtr>,
}

impl FrameLayoutBuilder {
    pub fn new() -> FrameLayoutBuilder {
        FrameLayoutBuilder::default()
    }

    /// Adds a slot holding values of `qtype`.
    ///
    /// Panics if `V` is not the Rust type carrying `qtype` values.
    pub fn add_slot<V: 'static>(&mut self, qtype: &QTypePtr) -> Slot<V> {
        assert_eq!(
            qtype.type_id(),
            Some(TypeId::of::<V>()),
            "slot type does not carry {} values",
            qtype.name()
        );
        let index = self.slots.len();
        self.slots.push(qtype.clone());
        Slot {
            index,
            qtype: qtype.clone(),
            marker: PhantomData,
        }
    }

    pub fn build(self) -> Arc<FrameLayout> {
        Arc::new(FrameLayout { slots: self.slots })
    }
}

/// A handle to one frame slot holding values of the Rust type `V`.
pub struct Slot<V> {
    index: usize,
    qtype: QTypePtr,
    marker: PhantomData<fn() -> V>,
}

impl<V> Slot<V> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn qtype(&self) -> &QTypePtr {
        &self.qtype
    }

    /// Erases the compile-time value type.
    pub fn untyped(&self) -> TypedSlot {
        TypedSlot {
            index: self.index,
            qtype: self.qtype.clone(),
        }
    }
}

impl<V> Clone for Slot<V> {
    fn clone(&self) -> Slot<V> {
        Slot {
            index: self.index,
            qtype: self.qtype.clone(),
            marker: PhantomData,
        }
    }
}

/// A slot handle carrying only the qtype of its values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypedSlot {
    index: usize,
    qtype: QTypePtr,
}

impl TypedSlot {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn qtype(&self) -> &QTypePtr {
        &self.qtype
    }

    /// Recovers the typed handle, verifying that the slot indeed holds `V`
    /// values.
    pub fn typed<V: 'static>(&self) -> Result<Slot<V>> {
        if self.qtype.type_id() == Some(TypeId::of::<V>()) {
            Ok(Slot {
                index: self.index,
                qtype: self.qtype.clone(),
                marker: PhantomData,
            })
        } else {
            Err(Error::invalid_arg(
                "slot",
                format!(
                    "slot of qtype {} does not hold values of the requested type",
                    self.qtype.name()
                ),
            ))
        }
    }
}

/// One row of cells, default-initialized per its layout.
pub struct Frame {
    layout: Arc<FrameLayout>,
    cells: Vec<Box<dyn Any + Send + Sync>>,
}

impl Frame {
    pub fn new(layout: Arc<FrameLayout>) -> Frame {
        let cells = layout
            .slots
            .iter()
            .map(|qtype| {
                qtype
                    .value_ops()
                    .expect("frame slots hold value-carrying qtypes")
                    .default_value()
            })
            .collect();
        Frame { layout, cells }
    }

    pub fn layout(&self) -> &Arc<FrameLayout> {
        &self.layout
    }

    pub fn get<V: 'static>(&self, slot: &Slot<V>) -> &V {
        self.cells[slot.index]
            .downcast_ref::<V>()
            .expect("slot does not belong to this frame's layout")
    }

    pub fn set<V: 'static>(&mut self, slot: &Slot<V>, value: V) {
        *self.cells[slot.index]
            .downcast_mut::<V>()
            .expect("slot does not belong to this frame's layout") = value;
    }

    pub(crate) fn cell(&self, index: usize) -> &(dyn Any + Send + Sync) {
        self.cells[index].as_ref()
    }

    pub(crate) fn set_cell(&mut self, index: usize, value: Box<dyn Any + Send + Sync>) {
        debug_assert_eq!(
            value.as_ref().type_id(),
            self.cells[index].as_ref().type_id()
        );
        self.cells[index] = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TypeRegistry;
    use stela_arrays::optional::OptionalValue;

    #[test]
    fn cells_start_at_their_defaults() {
        let registry = TypeRegistry::new();
        let mut builder = FrameLayoutBuilder::new();
        let number = builder.add_slot::<i64>(&registry.lookup_by_name("INT64").unwrap());
        let maybe = builder
            .add_slot::<OptionalValue<f64>>(&registry.lookup_by_name("OPTIONAL_FLOAT64").unwrap());
        let layout = builder.build();

        let frame = Frame::new(layout);
        assert_eq!(*frame.get(&number), 0);
        assert!(frame.get(&maybe).is_missing());
    }

    #[test]
    fn set_then_get_round_trips() {
        let registry = TypeRegistry::new();
        let mut builder = FrameLayoutBuilder::new();
        let slot = builder
            .add_slot::<OptionalValue<i32>>(&registry.lookup_by_name("OPTIONAL_INT32").unwrap());
        let layout = builder.build();

        let mut frame = Frame::new(Arc::clone(&layout));
        frame.set(&slot, OptionalValue::present(7));
        assert_eq!(frame.get(&slot).as_option(), Some(&7));

        let mut other = Frame::new(layout);
        assert!(other.get(&slot).is_missing());
        other.set(&slot, OptionalValue::missing());
        assert!(other.get(&slot).is_missing());
    }

    #[test]
    fn typed_and_erased_slots_interconvert() {
        let registry = TypeRegistry::new();
        let mut builder = FrameLayoutBuilder::new();
        let slot = builder.add_slot::<bool>(&registry.lookup_by_name("BOOLEAN").unwrap());
        let erased = slot.untyped();
        assert_eq!(erased.index(), slot.index());
        assert_eq!(erased.qtype(), slot.qtype());

        assert!(erased.typed::<bool>().is_ok());
        let err = erased.typed::<i32>().unwrap_err();
        assert!(
            err.to_string()
                .contains("slot of qtype BOOLEAN does not hold values"),
            "{err}"
        );
    }

    #[test]
    #[should_panic(expected = "slot type does not carry INT32 values")]
    fn mismatched_slot_declarations_panic() {
        let registry = TypeRegistry::new();
        let mut builder = FrameLayoutBuilder::new();
        let _ = builder.add_slot::<i64>(&registry.lookup_by_name("INT32").unwrap());
    }
}

//! Values paired with their qtype, usable where the Rust type is not
//! known at compile time.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use stela_common::{Result, error::Error};

use crate::frame::{Frame, TypedSlot};
use crate::qtype::{QTypePtr, QTypeValue, ValueOps};
use crate::registry::TypeRegistry;

/// A type-erased value tagged with its qtype.
///
/// Cloning is cheap: the payload is shared behind an [`Arc`]. Equality
/// compares qtypes by identity and payloads through the qtype's value
/// operations, so two `TypedValue`s built from equal typed values
/// compare equal.
#[derive(Clone)]
pub struct TypedValue {
    qtype: QTypePtr,
    value: Arc<dyn Any + Send + Sync>,
}

impl TypedValue {
    /// Erases `value` behind its qtype, registering the qtype on first
    /// use.
    pub fn new<V: QTypeValue>(registry: &TypeRegistry, value: V) -> Result<TypedValue> {
        let qtype = V::qtype(registry)?;
        debug_assert_eq!(qtype.type_id(), Some(TypeId::of::<V>()));
        Ok(TypedValue {
            qtype,
            value: Arc::new(value),
        })
    }

    /// Reads a copy of the value stored in `slot` out of `frame`.
    pub fn from_slot(slot: &TypedSlot, frame: &Frame) -> TypedValue {
        let qtype = slot.qtype().clone();
        let value = ops_of(&qtype).clone_value(frame.cell(slot.index()));
        TypedValue {
            qtype,
            value: Arc::from(value),
        }
    }

    /// Writes a copy of this value into `slot` of `frame`.
    ///
    /// Fails when the slot's qtype differs from the value's qtype.
    pub fn copy_to_slot(&self, slot: &TypedSlot, frame: &mut Frame) -> Result<()> {
        if *slot.qtype() != self.qtype {
            return Err(Error::invalid_arg(
                "slot",
                format!(
                    "cannot copy {} value into {} slot",
                    self.qtype.name(),
                    slot.qtype().name()
                ),
            ));
        }
        frame.set_cell(slot.index(), self.ops().clone_value(self.value.as_ref()));
        Ok(())
    }

    pub fn qtype(&self) -> &QTypePtr {
        &self.qtype
    }

    /// The stored value's printable form, e.g. `optional_int32{5}`.
    pub fn repr(&self) -> String {
        self.ops().repr(self.value.as_ref())
    }

    /// Borrows the payload as `V`.
    pub fn as_ref<V: 'static>(&self) -> Result<&V> {
        self.value.downcast_ref::<V>().ok_or_else(|| {
            Error::invalid_arg(
                "value",
                format!(
                    "{} value cannot be read as the requested type",
                    self.qtype.name()
                ),
            )
        })
    }

    fn ops(&self) -> &dyn ValueOps {
        ops_of(&self.qtype)
    }
}

fn ops_of(qtype: &QTypePtr) -> &dyn ValueOps {
    qtype
        .value_ops()
        .expect("typed values hold value-carrying qtypes")
}

impl PartialEq for TypedValue {
    fn eq(&self, other: &TypedValue) -> bool {
        self.qtype == other.qtype
            && self
                .ops()
                .values_eq(self.value.as_ref(), other.value.as_ref())
    }
}

impl fmt::Debug for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypedValue({}, {})", self.qtype.name(), self.repr())
    }
}

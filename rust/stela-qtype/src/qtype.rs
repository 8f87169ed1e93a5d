//! The `QType` runtime type object and its capability tables.
//!
//! A `QType` is a process-wide singleton describing one value type:
//! its registered name, the coarse kind it belongs to, the `TypeId` of
//! the Rust type carrying its values, and links to related qtypes (the
//! element type of a container, the base type of a derived type).
//!
//! Behavior that differs per type is attached through small capability
//! tables rather than inheritance: every value-carrying qtype has
//! [`ValueOps`], array qtypes add [`ArrayLikeOps`], shape qtypes add
//! [`ShapeOps`], and edge qtypes add [`EdgeOps`]. Code that works with
//! erased values asks the qtype for the table it needs and fails (or
//! skips) cleanly when a qtype does not carry it.

use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use stela_common::Result;

use crate::copier::{BatchFromFramesCopier, BatchToFramesCopier};
use crate::registry::TypeRegistry;
use crate::repr::ReprValue;

/// Coarse classification of a qtype, driving shape/scalar dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QTypeKind {
    Scalar,
    OptionalScalar,
    DenseArray,
    Array,
    Shape,
    Edge,
    ToScalarEdge,
    Tuple,
}

/// Erased per-value operations of a qtype.
pub trait ValueOps: Send + Sync {
    /// `TypeId` of the Rust type holding this qtype's values.
    fn type_id(&self) -> TypeId;

    fn default_value(&self) -> Box<dyn Any + Send + Sync>;

    fn clone_value(&self, value: &(dyn Any + Send + Sync)) -> Box<dyn Any + Send + Sync>;

    fn repr(&self, value: &(dyn Any + Send + Sync)) -> String;

    fn values_eq(
        &self,
        lhs: &(dyn Any + Send + Sync),
        rhs: &(dyn Any + Send + Sync),
    ) -> bool;
}

/// [`ValueOps`] for a concrete value type `T`.
pub struct TypedOps<T>(PhantomData<fn() -> T>);

impl<T> TypedOps<T>
where
    T: ReprValue + PartialEq + Clone + Default + Send + Sync + 'static,
{
    pub(crate) fn boxed() -> Box<dyn ValueOps> {
        Box::new(TypedOps::<T>(PhantomData))
    }
}

impl<T> ValueOps for TypedOps<T>
where
    T: ReprValue + PartialEq + Clone + Default + Send + Sync + 'static,
{
    fn type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn default_value(&self) -> Box<dyn Any + Send + Sync> {
        Box::new(T::default())
    }

    fn clone_value(&self, value: &(dyn Any + Send + Sync)) -> Box<dyn Any + Send + Sync> {
        Box::new(downcast::<T>(value).clone())
    }

    fn repr(&self, value: &(dyn Any + Send + Sync)) -> String {
        downcast::<T>(value).repr()
    }

    fn values_eq(
        &self,
        lhs: &(dyn Any + Send + Sync),
        rhs: &(dyn Any + Send + Sync),
    ) -> bool {
        downcast::<T>(lhs) == downcast::<T>(rhs)
    }
}

fn downcast<T: 'static>(value: &(dyn Any + Send + Sync)) -> &T {
    value
        .downcast_ref::<T>()
        .expect("erased value does not match its qtype")
}

/// Capabilities of array qtypes: related qtypes and frame copiers.
pub trait ArrayLikeOps: Send + Sync {
    /// The shape qtype of this array family.
    fn shape_qtype(&self, registry: &TypeRegistry) -> QTypePtr;

    /// The parent-child edge qtype of this array family.
    fn edge_qtype(&self, registry: &TypeRegistry) -> QTypePtr;

    /// The to-scalar edge qtype of this array family.
    fn group_scalar_edge_qtype(&self, registry: &TypeRegistry) -> QTypePtr;

    /// The unit array of this family, representing a presence mask.
    fn presence_qtype(&self, registry: &TypeRegistry) -> Result<QTypePtr>;

    /// Row count of an erased array value.
    fn array_size(&self, value: &(dyn Any + Send + Sync)) -> usize;

    /// A copier that scatters arrays of this qtype into per-row frames.
    fn make_to_frames_copier(&self) -> Box<dyn BatchToFramesCopier>;

    /// A copier that gathers per-row frames back into arrays of this
    /// qtype.
    fn make_from_frames_copier(&self) -> Box<dyn BatchFromFramesCopier>;
}

/// Capabilities of shape qtypes.
pub trait ShapeOps: Send + Sync {
    /// The container qtype of this shape holding `scalar` elements.
    ///
    /// Fails when no container qtype has been registered for `scalar`.
    fn with_value_qtype(&self, registry: &TypeRegistry, scalar: &QTypePtr) -> Result<QTypePtr>;

    /// The presence container of this shape (unit-valued).
    fn presence_qtype(&self, registry: &TypeRegistry) -> Result<QTypePtr>;
}

/// Capabilities of edge qtypes.
pub trait EdgeOps: Send + Sync {
    fn parent_shape_qtype(&self, registry: &TypeRegistry) -> QTypePtr;

    fn child_shape_qtype(&self, registry: &TypeRegistry) -> QTypePtr;
}

/// A runtime type descriptor. Instances are singletons owned by a
/// [`TypeRegistry`]; identity comparison is pointer comparison.
pub struct QType {
    name: String,
    kind: QTypeKind,
    type_id: Option<TypeId>,
    value_qtype: Option<QTypePtr>,
    base_qtype: Option<QTypePtr>,
    value_ops: Option<Box<dyn ValueOps>>,
    array_ops: Option<Box<dyn ArrayLikeOps>>,
    shape_ops: Option<Box<dyn ShapeOps>>,
    edge_ops: Option<Box<dyn EdgeOps>>,
}

impl QType {
    pub(crate) fn new(name: impl Into<String>, kind: QTypeKind) -> QType {
        QType {
            name: name.into(),
            kind,
            type_id: None,
            value_qtype: None,
            base_qtype: None,
            value_ops: None,
            array_ops: None,
            shape_ops: None,
            edge_ops: None,
        }
    }

    pub(crate) fn with_value_ops<T>(mut self) -> QType
    where
        T: ReprValue + PartialEq + Clone + Default + Send + Sync + 'static,
    {
        self.type_id = Some(TypeId::of::<T>());
        self.value_ops = Some(TypedOps::<T>::boxed());
        self
    }

    pub(crate) fn with_value_qtype(mut self, value_qtype: QTypePtr) -> QType {
        self.value_qtype = Some(value_qtype);
        self
    }

    pub(crate) fn with_base_qtype(mut self, base_qtype: QTypePtr) -> QType {
        self.base_qtype = Some(base_qtype);
        self
    }

    pub(crate) fn with_array_ops(mut self, ops: Box<dyn ArrayLikeOps>) -> QType {
        self.array_ops = Some(ops);
        self
    }

    pub(crate) fn with_shape_ops(mut self, ops: Box<dyn ShapeOps>) -> QType {
        self.shape_ops = Some(ops);
        self
    }

    pub(crate) fn with_edge_ops(mut self, ops: Box<dyn EdgeOps>) -> QType {
        self.edge_ops = Some(ops);
        self
    }

    /// The registered name, e.g. `"INT32"` or `"DENSE_ARRAY_FLOAT64"`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> QTypeKind {
        self.kind
    }

    /// `TypeId` of the Rust value type, when this qtype carries values.
    pub fn type_id(&self) -> Option<TypeId> {
        self.type_id
    }

    /// Element type of containers (`INT32` for `DENSE_ARRAY_INT32`),
    /// `None` for scalars and non-container qtypes.
    pub fn value_qtype(&self) -> Option<&QTypePtr> {
        self.value_qtype.as_ref()
    }

    /// The type a derived qtype decays to (`FLOAT64` for `WEAK_FLOAT`).
    pub fn base_qtype(&self) -> Option<&QTypePtr> {
        self.base_qtype.as_ref()
    }

    pub fn is_derived(&self) -> bool {
        self.base_qtype.is_some()
    }

    pub fn is_scalar(&self) -> bool {
        self.kind == QTypeKind::Scalar
    }

    pub fn is_optional_scalar(&self) -> bool {
        self.kind == QTypeKind::OptionalScalar
    }

    pub fn is_array_like(&self) -> bool {
        matches!(self.kind, QTypeKind::DenseArray | QTypeKind::Array)
    }

    pub fn value_ops(&self) -> Option<&dyn ValueOps> {
        self.value_ops.as_deref()
    }

    pub fn array_ops(&self) -> Option<&dyn ArrayLikeOps> {
        self.array_ops.as_deref()
    }

    pub fn shape_ops(&self) -> Option<&dyn ShapeOps> {
        self.shape_ops.as_deref()
    }

    pub fn edge_ops(&self) -> Option<&dyn EdgeOps> {
        self.edge_ops.as_deref()
    }
}

impl fmt::Display for QType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl fmt::Debug for QType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QType")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

/// A shared handle to a [`QType`] singleton.
///
/// Equality and hashing use pointer identity: two handles are equal iff
/// they refer to the same registered singleton. This is what makes qtype
/// comparison O(1) and keeps qtypes usable as map keys.
#[derive(Clone)]
pub struct QTypePtr(Arc<QType>);

impl QTypePtr {
    pub(crate) fn new(qtype: QType) -> QTypePtr {
        QTypePtr(Arc::new(qtype))
    }
}

impl std::ops::Deref for QTypePtr {
    type Target = QType;

    fn deref(&self) -> &QType {
        &self.0
    }
}

impl PartialEq for QTypePtr {
    fn eq(&self, other: &QTypePtr) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for QTypePtr {}

impl std::hash::Hash for QTypePtr {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.0).hash(state);
    }
}

impl fmt::Display for QTypePtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Debug for QTypePtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QTypePtr({})", self.name())
    }
}

/// A Rust type that has a qtype in a given registry.
pub trait QTypeValue: Clone + Send + Sync + 'static {
    /// Resolves the qtype describing `Self`, registering it on first
    /// use (scalars and their standard containers register lazily).
    fn qtype(registry: &TypeRegistry) -> Result<QTypePtr>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TypeRegistry;

    #[test]
    fn ptr_identity_semantics() {
        let registry = TypeRegistry::new();
        let a = registry.lookup_by_name("INT32").unwrap();
        let b = registry.lookup_by_name("INT32").unwrap();
        assert_eq!(a, b);

        let c = registry.lookup_by_name("INT64").unwrap();
        assert_ne!(a, c);

        use std::hash::{BuildHasher, RandomState};
        let state = RandomState::new();
        assert_eq!(state.hash_one(&a), state.hash_one(&b));
    }

    #[test]
    fn typed_ops_round_trip() {
        let ops = TypedOps::<i32>::boxed();
        assert_eq!(ops.type_id(), TypeId::of::<i32>());

        let default = ops.default_value();
        assert_eq!(default.downcast_ref::<i32>(), Some(&0));

        let value: Box<dyn Any + Send + Sync> = Box::new(5i32);
        assert_eq!(ops.repr(value.as_ref()), "5");
        assert!(ops.values_eq(value.as_ref(), value.as_ref()));
        assert!(!ops.values_eq(value.as_ref(), default.as_ref()));

        let cloned = ops.clone_value(value.as_ref());
        assert_eq!(cloned.downcast_ref::<i32>(), Some(&5));
    }

    #[test]
    #[should_panic(expected = "erased value does not match its qtype")]
    fn typed_ops_reject_foreign_values() {
        let ops = TypedOps::<i32>::boxed();
        let value: Box<dyn Any + Send + Sync> = Box::new("nope".to_string());
        ops.repr(value.as_ref());
    }
}

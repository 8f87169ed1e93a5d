//! Runtime registry of qtype descriptors.
//!
//! A [`TypeRegistry`] owns every [`QType`] singleton: the standard scalars
//! and their optional/array containers, the shape and edge qtypes, and any
//! qtypes registered later for user-defined scalar types. Lookups hand out
//! [`QTypePtr`] clones; two lookups of the same qtype always return pointers
//! to the same descriptor, so identity comparison is cheap and reliable.
//!
//! # Registration
//!
//! Container qtypes are registered lazily: the first call to a generic
//! getter such as [`TypeRegistry::dense_array_of`] creates and publishes the
//! container descriptor for that element type. Dynamic lookups
//! ([`TypeRegistry::dense_array_by_value`] and friends) never register
//! anything and fail with `NotFound` for combinations nothing has registered.
//!
//! # Thread safety
//!
//! The name/type-id index and each value-to-container mapping are guarded by
//! their own `RwLock`; lookups take reader locks, registration takes writer
//! locks and re-checks before publishing, so concurrent first-use from
//! multiple threads registers each qtype exactly once.

use std::any::TypeId;
use std::sync::RwLock;

use itertools::Itertools;
use stela_arrays::array::Array;
use stela_arrays::dense_array::DenseArray;
use stela_arrays::edge::{
    ArrayEdge, ArrayGroupScalarEdge, DenseArrayEdge, DenseArrayGroupScalarEdge, ScalarToScalarEdge,
};
use stela_arrays::optional::OptionalValue;
use stela_arrays::scalars::{Bytes, Text, Unit, WeakFloat};
use stela_arrays::shape::{ArrayShape, DenseArrayShape, OptionalScalarShape, ScalarShape};
use stela_common::{Result, error::Error};

use crate::array_ops::{ArrayOps, DenseArrayOps};
use crate::edge_ops::{
    ArrayEdgeOps, ArrayToScalarEdgeOps, DenseArrayEdgeOps, DenseArrayToScalarEdgeOps,
    ScalarToScalarEdgeOps,
};
use crate::qtype::{QType, QTypeKind, QTypePtr};
use crate::scalars::ScalarValue;
use crate::shape_ops::{
    ArrayShapeOps, DenseArrayShapeOps, OptionalScalarShapeOps, ScalarShapeOps,
};

/// The set of qtypes known to one value model instance.
pub struct TypeRegistry {
    index: RwLock<Index>,
    optional_types: ValueToContainerMapping,
    dense_array_types: ValueToContainerMapping,
    array_types: ValueToContainerMapping,
    tuple_types: RwLock<ahash::HashMap<Vec<QTypePtr>, QTypePtr>>,
    scalar_shape: QTypePtr,
    optional_scalar_shape: QTypePtr,
    dense_array_shape: QTypePtr,
    array_shape: QTypePtr,
    dense_array_edge: QTypePtr,
    array_edge: QTypePtr,
    dense_array_to_scalar_edge: QTypePtr,
    array_to_scalar_edge: QTypePtr,
    scalar_to_scalar_edge: QTypePtr,
    integral_chain: Vec<QTypePtr>,
    float_chain: Vec<QTypePtr>,
}

impl TypeRegistry {
    /// Creates a registry pre-populated with the standard qtypes: the ten
    /// scalars, their `OPTIONAL_*`/`DENSE_ARRAY_*`/`ARRAY_*` containers, the
    /// four shape qtypes and the five edge qtypes.
    pub fn new() -> TypeRegistry {
        let mut builder = Builder::default();

        builder.standard::<Unit>();
        builder.standard::<bool>();
        let int32 = builder.standard::<i32>();
        let int64 = builder.standard::<i64>();
        builder.standard::<u64>();
        let float32 = builder.standard::<f32>();
        let float64 = builder.standard::<f64>();
        // Derived scalars decay to their bases, so float64 must already be
        // published when the weak float containers are built.
        let weak_float = builder.standard::<WeakFloat>();
        builder.standard::<Bytes>();
        builder.standard::<Text>();

        let scalar_shape = builder.add(
            QType::new("SCALAR_SHAPE", QTypeKind::Shape)
                .with_value_ops::<ScalarShape>()
                .with_shape_ops(Box::new(ScalarShapeOps)),
        );
        let optional_scalar_shape = builder.add(
            QType::new("OPTIONAL_SCALAR_SHAPE", QTypeKind::Shape)
                .with_value_ops::<OptionalScalarShape>()
                .with_shape_ops(Box::new(OptionalScalarShapeOps)),
        );
        let dense_array_shape = builder.add(
            QType::new("DENSE_ARRAY_SHAPE", QTypeKind::Shape)
                .with_value_ops::<DenseArrayShape>()
                .with_shape_ops(Box::new(DenseArrayShapeOps)),
        );
        let array_shape = builder.add(
            QType::new("ARRAY_SHAPE", QTypeKind::Shape)
                .with_value_ops::<ArrayShape>()
                .with_shape_ops(Box::new(ArrayShapeOps)),
        );

        let dense_array_edge = builder.add(
            QType::new("DENSE_ARRAY_EDGE", QTypeKind::Edge)
                .with_value_ops::<DenseArrayEdge>()
                .with_edge_ops(Box::new(DenseArrayEdgeOps)),
        );
        let array_edge = builder.add(
            QType::new("ARRAY_EDGE", QTypeKind::Edge)
                .with_value_ops::<ArrayEdge>()
                .with_edge_ops(Box::new(ArrayEdgeOps)),
        );
        let dense_array_to_scalar_edge = builder.add(
            QType::new("DENSE_ARRAY_TO_SCALAR_EDGE", QTypeKind::ToScalarEdge)
                .with_value_ops::<DenseArrayGroupScalarEdge>()
                .with_edge_ops(Box::new(DenseArrayToScalarEdgeOps)),
        );
        let array_to_scalar_edge = builder.add(
            QType::new("ARRAY_TO_SCALAR_EDGE", QTypeKind::ToScalarEdge)
                .with_value_ops::<ArrayGroupScalarEdge>()
                .with_edge_ops(Box::new(ArrayToScalarEdgeOps)),
        );
        let scalar_to_scalar_edge = builder.add(
            QType::new("SCALAR_TO_SCALAR_EDGE", QTypeKind::ToScalarEdge)
                .with_value_ops::<ScalarToScalarEdge>()
                .with_edge_ops(Box::new(ScalarToScalarEdgeOps)),
        );

        TypeRegistry {
            index: RwLock::new(Index {
                by_name: builder.by_name,
                by_type_id: builder.by_type_id,
            }),
            optional_types: ValueToContainerMapping::new("Optional", builder.optional),
            dense_array_types: ValueToContainerMapping::new("DenseArray", builder.dense_array),
            array_types: ValueToContainerMapping::new("Array", builder.array),
            tuple_types: RwLock::new(ahash::HashMap::default()),
            scalar_shape,
            optional_scalar_shape,
            dense_array_shape,
            array_shape,
            dense_array_edge,
            array_edge,
            dense_array_to_scalar_edge,
            array_to_scalar_edge,
            scalar_to_scalar_edge,
            integral_chain: vec![int32, int64],
            float_chain: vec![weak_float, float32, float64],
        }
    }

    /// Looks up a qtype by its registered name, e.g. `"DENSE_ARRAY_INT32"`.
    pub fn lookup_by_name(&self, name: &str) -> Option<QTypePtr> {
        self.index.read().unwrap().by_name.get(name).cloned()
    }

    /// Looks up the qtype whose values have the given Rust `TypeId`.
    pub fn lookup_by_type_id(&self, type_id: TypeId) -> Option<QTypePtr> {
        self.index.read().unwrap().by_type_id.get(&type_id).cloned()
    }

    /// Resolves the qtype of the Rust type `T`, failing with `NotFound` if
    /// no qtype was ever registered for it.
    pub fn qtype_of<T: 'static>(&self) -> Result<QTypePtr> {
        self.lookup_by_type_id(TypeId::of::<T>()).ok_or_else(|| {
            Error::not_found(format!(
                "no qtype is registered for rust type {}",
                std::any::type_name::<T>()
            ))
        })
    }

    /// Returns `OPTIONAL_X` for the scalar qtype `X`.
    pub fn to_optional(&self, value_qtype: &QTypePtr) -> Result<QTypePtr> {
        self.optional_types.get(value_qtype)
    }

    /// Returns `DENSE_ARRAY_X` for the value qtype `X`, without registering
    /// anything.
    pub fn dense_array_by_value(&self, value_qtype: &QTypePtr) -> Result<QTypePtr> {
        self.dense_array_types.get(value_qtype)
    }

    /// Returns `ARRAY_X` for the value qtype `X`, without registering
    /// anything.
    pub fn array_by_value(&self, value_qtype: &QTypePtr) -> Result<QTypePtr> {
        self.array_types.get(value_qtype)
    }

    /// Returns the scalar qtype of `T`, registering it (and its optional)
    /// on first use.
    pub fn scalar_of<T: ScalarValue>(&self) -> Result<QTypePtr> {
        if let Some(existing) = self.lookup_by_type_id(TypeId::of::<T>()) {
            return Ok(existing);
        }
        self.register_scalar::<T>()
    }

    /// Returns `OPTIONAL_<T>`, registering the scalar on first use.
    pub fn optional_of<T: ScalarValue>(&self) -> Result<QTypePtr> {
        let scalar = self.scalar_of::<T>()?;
        self.optional_types.get(&scalar)
    }

    /// Returns `DENSE_ARRAY_<T>`, registering it on first use.
    pub fn dense_array_of<T: ScalarValue>(&self) -> Result<QTypePtr> {
        let scalar = self.scalar_of::<T>()?;
        if let Some(existing) = self.dense_array_types.lookup(&scalar) {
            return Ok(existing);
        }
        let base = if TypeId::of::<T>() == TypeId::of::<T::Base>() {
            None
        } else {
            Some(self.dense_array_of::<T::Base>()?)
        };
        let mut qtype = QType::new(format!("DENSE_ARRAY_{}", T::NAME), QTypeKind::DenseArray)
            .with_value_ops::<DenseArray<T>>()
            .with_value_qtype(scalar.clone())
            .with_array_ops(DenseArrayOps::<T>::boxed());
        if let Some(base) = base {
            qtype = qtype.with_base_qtype(base);
        }
        self.publish_container(&self.dense_array_types, &scalar, QTypePtr::new(qtype))
    }

    /// Returns `ARRAY_<T>`, registering it on first use.
    pub fn array_of<T: ScalarValue>(&self) -> Result<QTypePtr> {
        let scalar = self.scalar_of::<T>()?;
        if let Some(existing) = self.array_types.lookup(&scalar) {
            return Ok(existing);
        }
        let base = if TypeId::of::<T>() == TypeId::of::<T::Base>() {
            None
        } else {
            Some(self.array_of::<T::Base>()?)
        };
        let mut qtype = QType::new(format!("ARRAY_{}", T::NAME), QTypeKind::Array)
            .with_value_ops::<Array<T>>()
            .with_value_qtype(scalar.clone())
            .with_array_ops(ArrayOps::<T>::boxed());
        if let Some(base) = base {
            qtype = qtype.with_base_qtype(base);
        }
        self.publish_container(&self.array_types, &scalar, QTypePtr::new(qtype))
    }

    /// Registers the scalar qtype of `T` together with `OPTIONAL_<T>`.
    ///
    /// Registering the same Rust type again returns the existing descriptor.
    /// Registering a different Rust type under an already-taken name fails
    /// with `AlreadyRegistered`.
    pub fn register_scalar<T: ScalarValue>(&self) -> Result<QTypePtr> {
        if let Some(existing) = self.lookup_by_type_id(TypeId::of::<T>()) {
            return Ok(existing);
        }

        let (base_scalar, base_optional) = if TypeId::of::<T>() == TypeId::of::<T::Base>() {
            (None, None)
        } else {
            let base = self.scalar_of::<T::Base>()?;
            let base_optional = self.optional_types.get(&base)?;
            (Some(base), Some(base_optional))
        };

        let mut scalar = QType::new(T::NAME, QTypeKind::Scalar).with_value_ops::<T>();
        if let Some(base) = &base_scalar {
            scalar = scalar.with_base_qtype(base.clone());
        }
        let scalar = QTypePtr::new(scalar);

        let mut optional = QType::new(format!("OPTIONAL_{}", T::NAME), QTypeKind::OptionalScalar)
            .with_value_ops::<OptionalValue<T>>()
            .with_value_qtype(scalar.clone());
        if let Some(base) = base_optional {
            optional = optional.with_base_qtype(base);
        }
        let optional = QTypePtr::new(optional);

        let mut index = self.index.write().unwrap();
        if let Some(existing) = index.by_type_id.get(&TypeId::of::<T>()) {
            return Ok(existing.clone());
        }
        for name in [scalar.name(), optional.name()] {
            if index.by_name.contains_key(name) {
                return Err(Error::already_registered(name));
            }
        }
        self.optional_types.set(&scalar, optional.clone())?;
        index.publish(&scalar);
        index.publish(&optional);
        log::debug!("registered scalar qtype {}", scalar.name());
        Ok(scalar)
    }

    fn publish_container(
        &self,
        mapping: &ValueToContainerMapping,
        scalar: &QTypePtr,
        qtype: QTypePtr,
    ) -> Result<QTypePtr> {
        let mut index = self.index.write().unwrap();
        // Re-check under the writer lock: another thread may have published
        // the same container between our lookup and here.
        if let Some(existing) = mapping.lookup(scalar) {
            return Ok(existing);
        }
        if index.by_name.contains_key(qtype.name()) {
            return Err(Error::already_registered(qtype.name()));
        }
        mapping.set(scalar, qtype.clone())?;
        index.publish(&qtype);
        log::debug!("registered qtype {}", qtype.name());
        Ok(qtype)
    }

    /// Returns the interned tuple qtype with the given field qtypes.
    pub fn tuple_of(&self, fields: &[QTypePtr]) -> QTypePtr {
        if let Some(existing) = self.tuple_types.read().unwrap().get(fields) {
            return existing.clone();
        }
        let name = format!(
            "tuple<{}>",
            fields.iter().map(|field| field.name()).join(",")
        );
        let qtype = QTypePtr::new(QType::new(name, QTypeKind::Tuple));
        self.tuple_types
            .write()
            .unwrap()
            .entry(fields.to_vec())
            .or_insert(qtype)
            .clone()
    }

    pub fn scalar_shape(&self) -> &QTypePtr {
        &self.scalar_shape
    }

    pub fn optional_scalar_shape(&self) -> &QTypePtr {
        &self.optional_scalar_shape
    }

    pub fn dense_array_shape(&self) -> &QTypePtr {
        &self.dense_array_shape
    }

    pub fn array_shape(&self) -> &QTypePtr {
        &self.array_shape
    }

    pub fn dense_array_edge_qtype(&self) -> &QTypePtr {
        &self.dense_array_edge
    }

    pub fn array_edge_qtype(&self) -> &QTypePtr {
        &self.array_edge
    }

    pub fn dense_array_to_scalar_edge_qtype(&self) -> &QTypePtr {
        &self.dense_array_to_scalar_edge
    }

    pub fn array_to_scalar_edge_qtype(&self) -> &QTypePtr {
        &self.array_to_scalar_edge
    }

    pub fn scalar_to_scalar_edge_qtype(&self) -> &QTypePtr {
        &self.scalar_to_scalar_edge
    }

    /// Integral scalar promotion chain, narrowest first.
    pub fn integral_chain(&self) -> &[QTypePtr] {
        &self.integral_chain
    }

    /// Floating-point scalar promotion chain, loosest first.
    pub fn float_chain(&self) -> &[QTypePtr] {
        &self.float_chain
    }
}

impl Default for TypeRegistry {
    fn default() -> TypeRegistry {
        TypeRegistry::new()
    }
}

struct Index {
    by_name: ahash::HashMap<String, QTypePtr>,
    by_type_id: ahash::HashMap<TypeId, QTypePtr>,
}

impl Index {
    fn publish(&mut self, qtype: &QTypePtr) {
        self.by_name.insert(qtype.name().to_string(), qtype.clone());
        if let Some(type_id) = qtype.type_id() {
            self.by_type_id.insert(type_id, qtype.clone());
        }
    }
}

/// One value-qtype to container-qtype mapping (one instance per container
/// kind), guarded by its own reader/writer lock.
struct ValueToContainerMapping {
    kind: &'static str,
    map: RwLock<ahash::HashMap<QTypePtr, QTypePtr>>,
}

impl ValueToContainerMapping {
    fn new(kind: &'static str, map: ahash::HashMap<QTypePtr, QTypePtr>) -> ValueToContainerMapping {
        ValueToContainerMapping {
            kind,
            map: RwLock::new(map),
        }
    }

    fn lookup(&self, value_qtype: &QTypePtr) -> Option<QTypePtr> {
        self.map.read().unwrap().get(value_qtype).cloned()
    }

    fn get(&self, value_qtype: &QTypePtr) -> Result<QTypePtr> {
        self.lookup(value_qtype).ok_or_else(|| {
            Error::not_found(format!(
                "{} type with elements of type {} is not registered.",
                self.kind,
                value_qtype.name()
            ))
        })
    }

    fn set(&self, value_qtype: &QTypePtr, container_qtype: QTypePtr) -> Result<()> {
        let mut map = self.map.write().unwrap();
        if map.contains_key(value_qtype) {
            return Err(Error::already_registered(format!(
                "{} type with elements of type {}",
                self.kind,
                value_qtype.name()
            )));
        }
        map.insert(value_qtype.clone(), container_qtype);
        Ok(())
    }
}

/// Builds the pre-registered qtype set without any locking; the result is
/// wrapped into the registry's locked structures once complete.
#[derive(Default)]
struct Builder {
    by_name: ahash::HashMap<String, QTypePtr>,
    by_type_id: ahash::HashMap<TypeId, QTypePtr>,
    optional: ahash::HashMap<QTypePtr, QTypePtr>,
    dense_array: ahash::HashMap<QTypePtr, QTypePtr>,
    array: ahash::HashMap<QTypePtr, QTypePtr>,
}

impl Builder {
    fn add(&mut self, qtype: QType) -> QTypePtr {
        let qtype = QTypePtr::new(qtype);
        self.by_name.insert(qtype.name().to_string(), qtype.clone());
        if let Some(type_id) = qtype.type_id() {
            self.by_type_id.insert(type_id, qtype.clone());
        }
        qtype
    }

    fn standard<T: ScalarValue>(&mut self) -> QTypePtr {
        let base = (TypeId::of::<T>() != TypeId::of::<T::Base>()).then(|| {
            self.by_type_id
                .get(&TypeId::of::<T::Base>())
                .expect("base scalar registered before its derived type")
                .clone()
        });

        let mut scalar = QType::new(T::NAME, QTypeKind::Scalar).with_value_ops::<T>();
        if let Some(base) = &base {
            scalar = scalar.with_base_qtype(base.clone());
        }
        let scalar = self.add(scalar);

        let mut optional = QType::new(format!("OPTIONAL_{}", T::NAME), QTypeKind::OptionalScalar)
            .with_value_ops::<OptionalValue<T>>()
            .with_value_qtype(scalar.clone());
        if let Some(base) = &base {
            optional = optional.with_base_qtype(container_of(&self.optional, base));
        }
        let optional = self.add(optional);
        self.optional.insert(scalar.clone(), optional);

        let mut dense = QType::new(format!("DENSE_ARRAY_{}", T::NAME), QTypeKind::DenseArray)
            .with_value_ops::<DenseArray<T>>()
            .with_value_qtype(scalar.clone())
            .with_array_ops(DenseArrayOps::<T>::boxed());
        if let Some(base) = &base {
            dense = dense.with_base_qtype(container_of(&self.dense_array, base));
        }
        let dense = self.add(dense);
        self.dense_array.insert(scalar.clone(), dense);

        let mut array = QType::new(format!("ARRAY_{}", T::NAME), QTypeKind::Array)
            .with_value_ops::<Array<T>>()
            .with_value_qtype(scalar.clone())
            .with_array_ops(ArrayOps::<T>::boxed());
        if let Some(base) = &base {
            array = array.with_base_qtype(container_of(&self.array, base));
        }
        let array = self.add(array);
        self.array.insert(scalar.clone(), array);

        scalar
    }
}

fn container_of(map: &ahash::HashMap<QTypePtr, QTypePtr>, scalar: &QTypePtr) -> QTypePtr {
    map.get(scalar)
        .expect("base scalar containers registered before the derived type")
        .clone()
}

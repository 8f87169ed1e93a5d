//! Capability tables of the standard shape qtypes.

use stela_arrays::scalars::Unit;
use stela_arrays::shape::{ArrayShape, DenseArrayShape, OptionalScalarShape, ScalarShape};
use stela_common::{Result, error::Error};

use crate::qtype::{QTypePtr, QTypeValue, ShapeOps};
use crate::registry::TypeRegistry;

fn expect_scalar(qtype: &QTypePtr) -> Result<()> {
    if qtype.is_scalar() {
        Ok(())
    } else {
        Err(Error::invalid_arg(
            "scalar",
            format!("{} is not a scalar qtype", qtype.name()),
        ))
    }
}

pub(crate) struct ScalarShapeOps;

impl ShapeOps for ScalarShapeOps {
    fn with_value_qtype(&self, _registry: &TypeRegistry, scalar: &QTypePtr) -> Result<QTypePtr> {
        expect_scalar(scalar)?;
        Ok(scalar.clone())
    }

    fn presence_qtype(&self, registry: &TypeRegistry) -> Result<QTypePtr> {
        Unit::qtype(registry)
    }
}

pub(crate) struct OptionalScalarShapeOps;

impl ShapeOps for OptionalScalarShapeOps {
    fn with_value_qtype(&self, registry: &TypeRegistry, scalar: &QTypePtr) -> Result<QTypePtr> {
        expect_scalar(scalar)?;
        registry.to_optional(scalar)
    }

    fn presence_qtype(&self, registry: &TypeRegistry) -> Result<QTypePtr> {
        registry.optional_of::<Unit>()
    }
}

pub(crate) struct DenseArrayShapeOps;

impl ShapeOps for DenseArrayShapeOps {
    fn with_value_qtype(&self, registry: &TypeRegistry, scalar: &QTypePtr) -> Result<QTypePtr> {
        expect_scalar(scalar)?;
        registry.dense_array_by_value(scalar)
    }

    fn presence_qtype(&self, registry: &TypeRegistry) -> Result<QTypePtr> {
        registry.dense_array_of::<Unit>()
    }
}

pub(crate) struct ArrayShapeOps;

impl ShapeOps for ArrayShapeOps {
    fn with_value_qtype(&self, registry: &TypeRegistry, scalar: &QTypePtr) -> Result<QTypePtr> {
        expect_scalar(scalar)?;
        registry.array_by_value(scalar)
    }

    fn presence_qtype(&self, registry: &TypeRegistry) -> Result<QTypePtr> {
        registry.array_of::<Unit>()
    }
}

impl QTypeValue for ScalarShape {
    fn qtype(registry: &TypeRegistry) -> Result<QTypePtr> {
        Ok(registry.scalar_shape().clone())
    }
}

impl QTypeValue for OptionalScalarShape {
    fn qtype(registry: &TypeRegistry) -> Result<QTypePtr> {
        Ok(registry.optional_scalar_shape().clone())
    }
}

impl QTypeValue for DenseArrayShape {
    fn qtype(registry: &TypeRegistry) -> Result<QTypePtr> {
        Ok(registry.dense_array_shape().clone())
    }
}

impl QTypeValue for ArrayShape {
    fn qtype(registry: &TypeRegistry) -> Result<QTypePtr> {
        Ok(registry.array_shape().clone())
    }
}

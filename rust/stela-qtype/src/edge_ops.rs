//! Capability tables of the standard edge qtypes.

use stela_arrays::edge::{
    ArrayEdge, ArrayGroupScalarEdge, DenseArrayEdge, DenseArrayGroupScalarEdge, ScalarToScalarEdge,
};
use stela_common::Result;

use crate::qtype::{EdgeOps, QTypePtr, QTypeValue};
use crate::registry::TypeRegistry;

pub(crate) struct DenseArrayEdgeOps;

impl EdgeOps for DenseArrayEdgeOps {
    fn parent_shape_qtype(&self, registry: &TypeRegistry) -> QTypePtr {
        registry.dense_array_shape().clone()
    }

    fn child_shape_qtype(&self, registry: &TypeRegistry) -> QTypePtr {
        registry.dense_array_shape().clone()
    }
}

pub(crate) struct ArrayEdgeOps;

impl EdgeOps for ArrayEdgeOps {
    fn parent_shape_qtype(&self, registry: &TypeRegistry) -> QTypePtr {
        registry.array_shape().clone()
    }

    fn child_shape_qtype(&self, registry: &TypeRegistry) -> QTypePtr {
        registry.array_shape().clone()
    }
}

pub(crate) struct DenseArrayToScalarEdgeOps;

impl EdgeOps for DenseArrayToScalarEdgeOps {
    fn parent_shape_qtype(&self, registry: &TypeRegistry) -> QTypePtr {
        registry.optional_scalar_shape().clone()
    }

    fn child_shape_qtype(&self, registry: &TypeRegistry) -> QTypePtr {
        registry.dense_array_shape().clone()
    }
}

pub(crate) struct ArrayToScalarEdgeOps;

impl EdgeOps for ArrayToScalarEdgeOps {
    fn parent_shape_qtype(&self, registry: &TypeRegistry) -> QTypePtr {
        registry.optional_scalar_shape().clone()
    }

    fn child_shape_qtype(&self, registry: &TypeRegistry) -> QTypePtr {
        registry.array_shape().clone()
    }
}

pub(crate) struct ScalarToScalarEdgeOps;

impl EdgeOps for ScalarToScalarEdgeOps {
    fn parent_shape_qtype(&self, registry: &TypeRegistry) -> QTypePtr {
        registry.scalar_shape().clone()
    }

    fn child_shape_qtype(&self, registry: &TypeRegistry) -> QTypePtr {
        registry.scalar_shape().clone()
    }
}

impl QTypeValue for DenseArrayEdge {
    fn qtype(registry: &TypeRegistry) -> Result<QTypePtr> {
        Ok(registry.dense_array_edge_qtype().clone())
    }
}

impl QTypeValue for ArrayEdge {
    fn qtype(registry: &TypeRegistry) -> Result<QTypePtr> {
        Ok(registry.array_edge_qtype().clone())
    }
}

impl QTypeValue for DenseArrayGroupScalarEdge {
    fn qtype(registry: &TypeRegistry) -> Result<QTypePtr> {
        Ok(registry.dense_array_to_scalar_edge_qtype().clone())
    }
}

impl QTypeValue for ArrayGroupScalarEdge {
    fn qtype(registry: &TypeRegistry) -> Result<QTypePtr> {
        Ok(registry.array_to_scalar_edge_qtype().clone())
    }
}

impl QTypeValue for ScalarToScalarEdge {
    fn qtype(registry: &TypeRegistry) -> Result<QTypePtr> {
        Ok(registry.scalar_to_scalar_edge_qtype().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_endpoints_resolve_to_shapes() {
        let registry = TypeRegistry::new();

        let cases = [
            ("DENSE_ARRAY_EDGE", "DENSE_ARRAY_SHAPE", "DENSE_ARRAY_SHAPE"),
            ("ARRAY_EDGE", "ARRAY_SHAPE", "ARRAY_SHAPE"),
            (
                "DENSE_ARRAY_TO_SCALAR_EDGE",
                "OPTIONAL_SCALAR_SHAPE",
                "DENSE_ARRAY_SHAPE",
            ),
            (
                "ARRAY_TO_SCALAR_EDGE",
                "OPTIONAL_SCALAR_SHAPE",
                "ARRAY_SHAPE",
            ),
            ("SCALAR_TO_SCALAR_EDGE", "SCALAR_SHAPE", "SCALAR_SHAPE"),
        ];
        for (edge_name, parent, child) in cases {
            let edge = registry.lookup_by_name(edge_name).unwrap();
            let ops = edge.edge_ops().unwrap();
            assert_eq!(ops.parent_shape_qtype(&registry).name(), parent);
            assert_eq!(ops.child_shape_qtype(&registry).name(), child);
        }
    }

    #[test]
    fn edge_values_resolve_their_qtypes() {
        let registry = TypeRegistry::new();
        assert_eq!(
            DenseArrayEdge::qtype(&registry).unwrap().name(),
            "DENSE_ARRAY_EDGE"
        );
        assert_eq!(
            ScalarToScalarEdge::qtype(&registry).unwrap().name(),
            "SCALAR_TO_SCALAR_EDGE"
        );
    }
}

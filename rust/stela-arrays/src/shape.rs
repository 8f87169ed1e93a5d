//! Shapes: how many rows a value spans, without the values themselves.
//!
//! A shape is what remains of a container after dropping its payload.
//! Scalar shapes are zero-sized markers; array shapes carry the row
//! count. Operations that only need cardinality (broadcasting a constant,
//! sizing an output) take shapes instead of arrays.

/// The shape of a single mandatory scalar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ScalarShape;

/// The shape of a single optional scalar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct OptionalScalarShape;

/// The shape of a [`crate::dense_array::DenseArray`]: its row count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DenseArrayShape {
    pub size: usize,
}

/// The shape of a sparse [`crate::array::Array`]: its row count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ArrayShape {
    pub size: usize,
}

impl DenseArrayShape {
    pub fn new(size: usize) -> DenseArrayShape {
        DenseArrayShape { size }
    }
}

impl ArrayShape {
    pub fn new(size: usize) -> ArrayShape {
        ArrayShape { size }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_shapes_compare_by_size() {
        assert_eq!(DenseArrayShape::new(5), DenseArrayShape { size: 5 });
        assert_ne!(ArrayShape::new(5), ArrayShape::new(6));
        assert_eq!(ScalarShape, ScalarShape);
    }
}

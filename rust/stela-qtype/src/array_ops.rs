//! Capability tables of the array-like qtypes.

use std::any::Any;
use std::marker::PhantomData;

use stela_arrays::array::Array;
use stela_arrays::dense_array::DenseArray;
use stela_arrays::scalars::Unit;
use stela_common::Result;

use crate::copier::{
    ArrayFromFramesCopier, ArrayToFramesCopier, BatchFromFramesCopier, BatchToFramesCopier,
    DenseArrayFromFramesCopier, DenseArrayToFramesCopier,
};
use crate::qtype::{ArrayLikeOps, QTypePtr};
use crate::registry::TypeRegistry;
use crate::scalars::ScalarValue;

fn downcast<A: Send + Sync + 'static>(value: &(dyn Any + Send + Sync)) -> &A {
    value
        .downcast_ref::<A>()
        .expect("erased value does not match its qtype")
}

pub(crate) struct DenseArrayOps<T>(PhantomData<fn() -> T>);

impl<T: ScalarValue> DenseArrayOps<T> {
    pub(crate) fn boxed() -> Box<dyn ArrayLikeOps> {
        Box::new(Self(PhantomData))
    }
}

impl<T: ScalarValue> ArrayLikeOps for DenseArrayOps<T> {
    fn shape_qtype(&self, registry: &TypeRegistry) -> QTypePtr {
        registry.dense_array_shape().clone()
    }

    fn edge_qtype(&self, registry: &TypeRegistry) -> QTypePtr {
        registry.dense_array_edge_qtype().clone()
    }

    fn group_scalar_edge_qtype(&self, registry: &TypeRegistry) -> QTypePtr {
        registry.dense_array_to_scalar_edge_qtype().clone()
    }

    fn presence_qtype(&self, registry: &TypeRegistry) -> Result<QTypePtr> {
        registry.dense_array_of::<Unit>()
    }

    fn array_size(&self, value: &(dyn Any + Send + Sync)) -> usize {
        downcast::<DenseArray<T>>(value).len()
    }

    fn make_to_frames_copier(&self) -> Box<dyn BatchToFramesCopier> {
        Box::new(DenseArrayToFramesCopier::<T>::new())
    }

    fn make_from_frames_copier(&self) -> Box<dyn BatchFromFramesCopier> {
        Box::new(DenseArrayFromFramesCopier::<T>::new())
    }
}

pub(crate) struct ArrayOps<T>(PhantomData<fn() -> T>);

impl<T: ScalarValue> ArrayOps<T> {
    pub(crate) fn boxed() -> Box<dyn ArrayLikeOps> {
        Box::new(Self(PhantomData))
    }
}

impl<T: ScalarValue> ArrayLikeOps for ArrayOps<T> {
    fn shape_qtype(&self, registry: &TypeRegistry) -> QTypePtr {
        registry.array_shape().clone()
    }

    fn edge_qtype(&self, registry: &TypeRegistry) -> QTypePtr {
        registry.array_edge_qtype().clone()
    }

    fn group_scalar_edge_qtype(&self, registry: &TypeRegistry) -> QTypePtr {
        registry.array_to_scalar_edge_qtype().clone()
    }

    fn presence_qtype(&self, registry: &TypeRegistry) -> Result<QTypePtr> {
        registry.array_of::<Unit>()
    }

    fn array_size(&self, value: &(dyn Any + Send + Sync)) -> usize {
        downcast::<Array<T>>(value).len()
    }

    fn make_to_frames_copier(&self) -> Box<dyn BatchToFramesCopier> {
        Box::new(ArrayToFramesCopier::<T>::new())
    }

    fn make_from_frames_copier(&self) -> Box<dyn BatchFromFramesCopier> {
        Box::new(ArrayFromFramesCopier::<T>::new())
    }
}

//! Edges: child-to-parent index relationships between array domains.
//!
//! An edge connects a parent index space of `parent_size` rows to a child
//! index space of `child_size` rows. It is stored in one of two terminal
//! representations, chosen at construction:
//!
//! - **Split points**: `parent_size + 1` non-decreasing offsets into the
//!   child domain; children `[split[k], split[k+1])` belong to parent
//!   `k`. Only contiguous groupings are expressible this way.
//!
//! - **Mapping**: one (possibly missing) parent id per child. Missing
//!   entries mean the child belongs to no parent.
//!
//! An instance never changes representation; conversions build new edges.

use itertools::Itertools;
use stela_common::{Result, error::Error, verify_arg};

use crate::array::Array;
use crate::dense_array::{DenseArray, DenseArrayBuilder};

/// Which terminal representation an edge uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    SplitPoints,
    Mapping,
}

/// An edge whose index arrays are [`DenseArray`]s.
#[derive(Debug, Clone, PartialEq)]
pub enum DenseArrayEdge {
    SplitPoints { split_points: DenseArray<i64> },
    Mapping { mapping: DenseArray<i64>, parent_size: usize },
}

impl DenseArrayEdge {
    /// Creates a split-points edge, validating that the offsets start at
    /// zero, are all present, and never decrease.
    pub fn from_split_points(split_points: DenseArray<i64>) -> Result<DenseArrayEdge> {
        verify_arg!(split_points, !split_points.is_empty());
        if !split_points.is_full() {
            return Err(Error::invalid_arg(
                "split_points",
                "split points must not contain missing values",
            ));
        }
        let values = split_points.values().as_slice();
        if values[0] != 0 {
            return Err(Error::invalid_arg(
                "split_points",
                format!("split points must start at 0, got {}", values[0]),
            ));
        }
        if !values.iter().tuple_windows().all(|(a, b)| a <= b) {
            return Err(Error::invalid_arg(
                "split_points",
                "split points must be non-decreasing",
            ));
        }
        Ok(DenseArrayEdge::SplitPoints { split_points })
    }

    /// Creates a mapping edge, validating that every present entry is a
    /// parent id in `[0, parent_size)`.
    pub fn from_mapping(mapping: DenseArray<i64>, parent_size: usize) -> Result<DenseArrayEdge> {
        let mut first_bad = None;
        mapping.for_each_present(|_, &parent| {
            if (parent < 0 || parent >= parent_size as i64) && first_bad.is_none() {
                first_bad = Some(parent);
            }
        });
        if let Some(parent) = first_bad {
            return Err(Error::invalid_arg(
                "mapping",
                format!("parent id {parent} is out of range [0, {parent_size})"),
            ));
        }
        Ok(DenseArrayEdge::Mapping {
            mapping,
            parent_size,
        })
    }

    /// Creates a split-points edge from per-parent group sizes.
    pub fn from_sizes(sizes: &[i64]) -> Result<DenseArrayEdge> {
        let mut split_points = Vec::with_capacity(sizes.len() + 1);
        let mut total = 0;
        split_points.push(0);
        for &size in sizes {
            verify_arg!(sizes, size >= 0);
            total += size;
            split_points.push(total);
        }
        Ok(DenseArrayEdge::SplitPoints {
            split_points: DenseArray::from_values(split_points),
        })
    }

    /// Creates a split-points edge of `parent_size` groups of
    /// `group_size` children each.
    pub fn from_uniform_groups(parent_size: usize, group_size: usize) -> DenseArrayEdge {
        DenseArrayEdge::SplitPoints {
            split_points: DenseArray::from_values(
                (0..=parent_size).map(|k| (k * group_size) as i64),
            ),
        }
    }

    pub fn kind(&self) -> EdgeKind {
        match self {
            DenseArrayEdge::SplitPoints { .. } => EdgeKind::SplitPoints,
            DenseArrayEdge::Mapping { .. } => EdgeKind::Mapping,
        }
    }

    pub fn parent_size(&self) -> usize {
        match self {
            DenseArrayEdge::SplitPoints { split_points } => split_points.len() - 1,
            DenseArrayEdge::Mapping { parent_size, .. } => *parent_size,
        }
    }

    pub fn child_size(&self) -> usize {
        match self {
            DenseArrayEdge::SplitPoints { split_points } => {
                split_points.values()[split_points.len() - 1] as usize
            }
            DenseArrayEdge::Mapping { mapping, .. } => mapping.len(),
        }
    }

    /// The index array backing this edge, in whichever representation it
    /// uses.
    pub fn edge_values(&self) -> &DenseArray<i64> {
        match self {
            DenseArrayEdge::SplitPoints { split_points } => split_points,
            DenseArrayEdge::Mapping { mapping, .. } => mapping,
        }
    }

    pub fn split_points(&self) -> Option<&DenseArray<i64>> {
        match self {
            DenseArrayEdge::SplitPoints { split_points } => Some(split_points),
            DenseArrayEdge::Mapping { .. } => None,
        }
    }

    pub fn mapping(&self) -> Option<&DenseArray<i64>> {
        match self {
            DenseArrayEdge::SplitPoints { .. } => None,
            DenseArrayEdge::Mapping { mapping, .. } => Some(mapping),
        }
    }

    /// Parent of child `index`, or `None` when the child is unattached.
    pub fn parent_of(&self, index: usize) -> Option<usize> {
        match self {
            DenseArrayEdge::SplitPoints { split_points } => {
                let values = split_points.values().as_slice();
                assert!(
                    index < self.child_size(),
                    "child {index} out of bounds for edge with child size {}",
                    self.child_size()
                );
                Some(values.partition_point(|&v| v <= index as i64) - 1)
            }
            DenseArrayEdge::Mapping { mapping, .. } => {
                mapping.get(index).into_option().map(|parent| parent as usize)
            }
        }
    }

    /// The child-to-parent mapping array, materializing it for
    /// split-points edges.
    pub fn to_mapping_values(&self) -> DenseArray<i64> {
        match self {
            DenseArrayEdge::SplitPoints { split_points } => {
                let values = split_points.values().as_slice();
                let mut mapping = Vec::with_capacity(self.child_size());
                for (parent, (&start, &end)) in values.iter().tuple_windows().enumerate() {
                    mapping.extend(std::iter::repeat_n(parent as i64, (end - start) as usize));
                }
                DenseArray::from_values(mapping)
            }
            DenseArrayEdge::Mapping { mapping, .. } => mapping.clone(),
        }
    }

    /// Re-expresses this edge as a mapping edge.
    pub fn to_mapping_edge(&self) -> DenseArrayEdge {
        DenseArrayEdge::Mapping {
            mapping: self.to_mapping_values(),
            parent_size: self.parent_size(),
        }
    }

    /// Re-expresses this edge as a split-points edge.
    ///
    /// Fails when the mapping has missing entries or assigns children to
    /// parents out of order, since split points can only describe
    /// contiguous groups.
    pub fn to_split_points_edge(&self) -> Result<DenseArrayEdge> {
        match self {
            DenseArrayEdge::SplitPoints { .. } => Ok(self.clone()),
            DenseArrayEdge::Mapping {
                mapping,
                parent_size,
            } => {
                if !mapping.is_full() {
                    return Err(Error::invalid_arg(
                        "mapping",
                        "a mapping with missing values cannot be converted to split points",
                    ));
                }
                let values = mapping.values().as_slice();
                if !values.iter().tuple_windows().all(|(a, b)| a <= b) {
                    return Err(Error::invalid_arg(
                        "mapping",
                        "only a sorted mapping can be converted to split points",
                    ));
                }
                let mut split_points = Vec::with_capacity(parent_size + 1);
                split_points.push(0);
                let mut child = 0;
                for parent in 0..*parent_size as i64 {
                    while child < values.len() && values[child] == parent {
                        child += 1;
                    }
                    split_points.push(child as i64);
                }
                Ok(DenseArrayEdge::SplitPoints {
                    split_points: DenseArray::from_values(split_points),
                })
            }
        }
    }

    /// Per-parent child counts.
    pub fn sizes(&self) -> DenseArray<i64> {
        match self {
            DenseArrayEdge::SplitPoints { split_points } => DenseArray::from_values(
                split_points
                    .values()
                    .iter()
                    .tuple_windows()
                    .map(|(a, b)| b - a),
            ),
            DenseArrayEdge::Mapping {
                mapping,
                parent_size,
            } => {
                let mut counts = vec![0; *parent_size];
                mapping.for_each_present(|_, &parent| counts[parent as usize] += 1);
                DenseArray::from_values(counts)
            }
        }
    }

    /// Composes a chain of edges `A→B, B→C, ...` into a single edge from
    /// the first edge's parent domain to the last edge's child domain.
    ///
    /// The result is a split-points edge iff every input is; one mapping
    /// edge anywhere makes the result a mapping edge.
    pub fn compose_edges(edges: &[DenseArrayEdge]) -> Result<DenseArrayEdge> {
        verify_arg!(edges, !edges.is_empty());
        let mut composed = edges[0].clone();
        for next in &edges[1..] {
            composed = compose_pair(&composed, next)?;
        }
        Ok(composed)
    }
}

impl Default for DenseArrayEdge {
    /// An edge between empty domains.
    fn default() -> DenseArrayEdge {
        DenseArrayEdge::SplitPoints {
            split_points: DenseArray::from_values([0]),
        }
    }
}

fn compose_pair(first: &DenseArrayEdge, second: &DenseArrayEdge) -> Result<DenseArrayEdge> {
    if first.child_size() != second.parent_size() {
        return Err(Error::invalid_arg(
            "edges",
            format!(
                "edges are not composable: child size {} does not match parent size {}",
                first.child_size(),
                second.parent_size()
            ),
        ));
    }
    match (first, second) {
        (
            DenseArrayEdge::SplitPoints { split_points: ab },
            DenseArrayEdge::SplitPoints { split_points: bc },
        ) => {
            let ab = ab.values().as_slice();
            let bc = bc.values().as_slice();
            Ok(DenseArrayEdge::SplitPoints {
                split_points: ab.iter().map(|&b| bc[b as usize]).collect(),
            })
        }
        _ => {
            let ab = first.to_mapping_values();
            let bc = second.to_mapping_values();
            let mut composed = DenseArrayBuilder::new(bc.len());
            bc.for_each_present(|child, &b| {
                let b = b as usize;
                if ab.present(b) {
                    composed.set_value(child, ab.values()[b]);
                }
            });
            Ok(DenseArrayEdge::Mapping {
                mapping: composed.build(),
                parent_size: first.parent_size(),
            })
        }
    }
}

/// An edge whose index arrays are sparse [`Array`]s.
///
/// Semantically identical to [`DenseArrayEdge`]; algorithms delegate to
/// the dense form, while the stored arrays keep whatever sparse
/// representation they arrived in.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayEdge {
    SplitPoints { split_points: Array<i64> },
    Mapping { mapping: Array<i64>, parent_size: usize },
}

impl ArrayEdge {
    pub fn from_split_points(split_points: Array<i64>) -> Result<ArrayEdge> {
        DenseArrayEdge::from_split_points(split_points.to_dense())?;
        Ok(ArrayEdge::SplitPoints { split_points })
    }

    pub fn from_mapping(mapping: Array<i64>, parent_size: usize) -> Result<ArrayEdge> {
        DenseArrayEdge::from_mapping(mapping.to_dense(), parent_size)?;
        Ok(ArrayEdge::Mapping {
            mapping,
            parent_size,
        })
    }

    pub fn from_sizes(sizes: &[i64]) -> Result<ArrayEdge> {
        Ok(DenseArrayEdge::from_sizes(sizes)?.into())
    }

    pub fn from_uniform_groups(parent_size: usize, group_size: usize) -> ArrayEdge {
        DenseArrayEdge::from_uniform_groups(parent_size, group_size).into()
    }

    pub fn kind(&self) -> EdgeKind {
        match self {
            ArrayEdge::SplitPoints { .. } => EdgeKind::SplitPoints,
            ArrayEdge::Mapping { .. } => EdgeKind::Mapping,
        }
    }

    pub fn parent_size(&self) -> usize {
        match self {
            ArrayEdge::SplitPoints { split_points } => split_points.len() - 1,
            ArrayEdge::Mapping { parent_size, .. } => *parent_size,
        }
    }

    pub fn child_size(&self) -> usize {
        match self {
            ArrayEdge::SplitPoints { split_points } => {
                split_points.get(split_points.len() - 1).value as usize
            }
            ArrayEdge::Mapping { mapping, .. } => mapping.len(),
        }
    }

    pub fn edge_values(&self) -> &Array<i64> {
        match self {
            ArrayEdge::SplitPoints { split_points } => split_points,
            ArrayEdge::Mapping { mapping, .. } => mapping,
        }
    }

    pub fn split_points(&self) -> Option<&Array<i64>> {
        match self {
            ArrayEdge::SplitPoints { split_points } => Some(split_points),
            ArrayEdge::Mapping { .. } => None,
        }
    }

    pub fn mapping(&self) -> Option<&Array<i64>> {
        match self {
            ArrayEdge::SplitPoints { .. } => None,
            ArrayEdge::Mapping { mapping, .. } => Some(mapping),
        }
    }

    /// Converts to the dense form, materializing sparse index arrays.
    pub fn to_dense_edge(&self) -> DenseArrayEdge {
        match self {
            ArrayEdge::SplitPoints { split_points } => DenseArrayEdge::SplitPoints {
                split_points: split_points.to_dense(),
            },
            ArrayEdge::Mapping {
                mapping,
                parent_size,
            } => DenseArrayEdge::Mapping {
                mapping: mapping.to_dense(),
                parent_size: *parent_size,
            },
        }
    }

    pub fn to_mapping_edge(&self) -> ArrayEdge {
        match self {
            ArrayEdge::Mapping { .. } => self.clone(),
            ArrayEdge::SplitPoints { .. } => self.to_dense_edge().to_mapping_edge().into(),
        }
    }

    pub fn to_split_points_edge(&self) -> Result<ArrayEdge> {
        match self {
            ArrayEdge::SplitPoints { .. } => Ok(self.clone()),
            ArrayEdge::Mapping { .. } => Ok(self.to_dense_edge().to_split_points_edge()?.into()),
        }
    }

    pub fn parent_of(&self, index: usize) -> Option<usize> {
        self.to_dense_edge().parent_of(index)
    }

    pub fn sizes(&self) -> Array<i64> {
        Array::from(self.to_dense_edge().sizes())
    }

    /// Composes a chain of edges; see [`DenseArrayEdge::compose_edges`].
    pub fn compose_edges(edges: &[ArrayEdge]) -> Result<ArrayEdge> {
        let dense: Vec<DenseArrayEdge> = edges.iter().map(ArrayEdge::to_dense_edge).collect();
        Ok(DenseArrayEdge::compose_edges(&dense)?.into())
    }
}

impl Default for ArrayEdge {
    fn default() -> ArrayEdge {
        DenseArrayEdge::default().into()
    }
}

impl From<DenseArrayEdge> for ArrayEdge {
    fn from(edge: DenseArrayEdge) -> ArrayEdge {
        match edge {
            DenseArrayEdge::SplitPoints { split_points } => ArrayEdge::SplitPoints {
                split_points: Array::from(split_points),
            },
            DenseArrayEdge::Mapping {
                mapping,
                parent_size,
            } => ArrayEdge::Mapping {
                mapping: Array::from(mapping),
                parent_size,
            },
        }
    }
}

/// Relates every element of a [`DenseArray`] to a single scalar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DenseArrayGroupScalarEdge {
    child_size: usize,
}

impl DenseArrayGroupScalarEdge {
    pub fn new(child_size: usize) -> DenseArrayGroupScalarEdge {
        DenseArrayGroupScalarEdge { child_size }
    }

    pub fn child_size(&self) -> usize {
        self.child_size
    }
}

/// Relates every element of a sparse [`Array`] to a single scalar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ArrayGroupScalarEdge {
    child_size: usize,
}

impl ArrayGroupScalarEdge {
    pub fn new(child_size: usize) -> ArrayGroupScalarEdge {
        ArrayGroupScalarEdge { child_size }
    }

    pub fn child_size(&self) -> usize {
        self.child_size
    }
}

/// The trivial edge from a scalar to a scalar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ScalarToScalarEdge;

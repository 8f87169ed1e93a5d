//! Derived qtype properties: scalar and shape projections, optional-ness,
//! derived-type decay, and the common-type join used for implicit casting.

use stela_common::{Result, error::Error, verify_arg};

use crate::qtype::{QTypeKind, QTypePtr};
use crate::registry::TypeRegistry;

/// Returns the scalar qtype underlying `qtype`: the element qtype of a
/// container, or `qtype` itself if it is already scalar.
pub fn get_scalar_qtype(qtype: &QTypePtr) -> Result<QTypePtr> {
    if let Some(value_qtype) = qtype.value_qtype() {
        return Ok(value_qtype.clone());
    }
    if qtype.is_scalar() {
        return Ok(qtype.clone());
    }
    Err(Error::invalid_arg(
        "qtype",
        format!("{} has no scalar qtype", qtype.name()),
    ))
}

/// Returns the shape qtype describing `qtype`'s presence and size structure.
pub fn get_shape_qtype(registry: &TypeRegistry, qtype: &QTypePtr) -> Result<QTypePtr> {
    match qtype.kind() {
        QTypeKind::Scalar => Ok(registry.scalar_shape().clone()),
        QTypeKind::OptionalScalar => Ok(registry.optional_scalar_shape().clone()),
        _ => match qtype.array_ops() {
            Some(ops) => Ok(ops.shape_qtype(registry)),
            None => Err(Error::invalid_arg(
                "qtype",
                format!("{} has no shape qtype", qtype.name()),
            )),
        },
    }
}

/// Rebuilds `qtype` around a different scalar: same shape, new element type.
///
/// Fails when the requested element/container combination was never
/// registered.
pub fn with_scalar_qtype(
    registry: &TypeRegistry,
    qtype: &QTypePtr,
    scalar: &QTypePtr,
) -> Result<QTypePtr> {
    let shape = get_shape_qtype(registry, qtype)?;
    shape_ops_of(&shape)?.with_value_qtype(registry, scalar)
}

/// True for qtypes whose values can be missing: optional scalars and both
/// array kinds.
pub fn is_optional_like_qtype(qtype: &QTypePtr) -> bool {
    matches!(
        qtype.kind(),
        QTypeKind::OptionalScalar | QTypeKind::DenseArray | QTypeKind::Array
    )
}

/// Wraps a scalar qtype into its optional; optional-like qtypes pass
/// through unchanged.
pub fn to_optional_like_qtype(registry: &TypeRegistry, qtype: &QTypePtr) -> Result<QTypePtr> {
    if is_optional_like_qtype(qtype) {
        return Ok(qtype.clone());
    }
    if qtype.is_scalar() {
        return registry.to_optional(qtype);
    }
    Err(Error::invalid_arg(
        "qtype",
        format!("{} has no optional-like counterpart", qtype.name()),
    ))
}

/// Strips one level of derivation: a derived qtype decays to its base,
/// anything else is returned unchanged.
pub fn decay_derived_qtype(qtype: &QTypePtr) -> QTypePtr {
    qtype.base_qtype().unwrap_or(qtype).clone()
}

/// Computes the join of two qtypes, or `None` when they cannot be used
/// together.
///
/// The join combines two independent lattices: scalar promotion chains
/// (integral and floating-point, with no implicit crossing between them)
/// and the shape lattice, where scalars are absorbed into optionals always
/// and into array shapes only when `enable_broadcasting` is set. Distinct
/// array kinds never unify.
pub fn common_qtype(
    registry: &TypeRegistry,
    lhs: &QTypePtr,
    rhs: &QTypePtr,
    enable_broadcasting: bool,
) -> Option<QTypePtr> {
    if lhs == rhs {
        return Some(lhs.clone());
    }
    let scalar = common_scalar_qtype(
        registry,
        &get_scalar_qtype(lhs).ok()?,
        &get_scalar_qtype(rhs).ok()?,
    )?;
    let shape = common_shape_qtype(
        registry,
        &get_shape_qtype(registry, lhs).ok()?,
        &get_shape_qtype(registry, rhs).ok()?,
        enable_broadcasting,
    )?;
    shape_ops_of(&shape).ok()?.with_value_qtype(registry, &scalar).ok()
}

/// Folds [`common_qtype`] over a non-empty list.
pub fn common_qtype_many(
    registry: &TypeRegistry,
    qtypes: &[QTypePtr],
    enable_broadcasting: bool,
) -> Result<QTypePtr> {
    verify_arg!(qtypes, !qtypes.is_empty());
    let mut common = qtypes[0].clone();
    for qtype in &qtypes[1..] {
        common = common_qtype(registry, &common, qtype, enable_broadcasting).ok_or_else(|| {
            Error::invalid_arg(
                "qtypes",
                format!("no common qtype for {} and {}", common.name(), qtype.name()),
            )
        })?;
    }
    Ok(common)
}

/// Expands `qtype`'s shape so it can be used alongside all `target_qtypes`
/// (always with broadcasting), keeping its own scalar type.
pub fn broadcast_qtype(
    registry: &TypeRegistry,
    target_qtypes: &[QTypePtr],
    qtype: &QTypePtr,
) -> Option<QTypePtr> {
    let mut shape = get_shape_qtype(registry, qtype).ok()?;
    for target in target_qtypes {
        let target_shape = get_shape_qtype(registry, target).ok()?;
        shape = common_shape_qtype(registry, &shape, &target_shape, true)?;
    }
    let scalar = get_scalar_qtype(qtype).ok()?;
    shape_ops_of(&shape).ok()?.with_value_qtype(registry, &scalar).ok()
}

/// True when a value of qtype `from` is accepted wherever `to` is expected:
/// the join of the two must be `to` itself.
pub fn can_cast_implicitly(
    registry: &TypeRegistry,
    from: &QTypePtr,
    to: &QTypePtr,
    enable_broadcasting: bool,
) -> bool {
    common_qtype(registry, from, to, enable_broadcasting).is_some_and(|common| &common == to)
}

fn shape_ops_of(shape: &QTypePtr) -> Result<&dyn crate::qtype::ShapeOps> {
    shape.shape_ops().ok_or_else(|| {
        Error::invalid_arg("qtype", format!("{} is not a shape qtype", shape.name()))
    })
}

fn common_scalar_qtype(
    registry: &TypeRegistry,
    lhs: &QTypePtr,
    rhs: &QTypePtr,
) -> Option<QTypePtr> {
    if lhs == rhs {
        return Some(lhs.clone());
    }
    for chain in [registry.integral_chain(), registry.float_chain()] {
        let lhs_at = chain.iter().position(|qtype| qtype == lhs);
        let rhs_at = chain.iter().position(|qtype| qtype == rhs);
        if let (Some(lhs_at), Some(rhs_at)) = (lhs_at, rhs_at) {
            return Some(chain[lhs_at.max(rhs_at)].clone());
        }
    }
    None
}

fn common_shape_qtype(
    registry: &TypeRegistry,
    lhs: &QTypePtr,
    rhs: &QTypePtr,
    enable_broadcasting: bool,
) -> Option<QTypePtr> {
    if lhs == rhs {
        return Some(lhs.clone());
    }
    if absorbs(registry, rhs, lhs, enable_broadcasting) {
        return Some(rhs.clone());
    }
    if absorbs(registry, lhs, rhs, enable_broadcasting) {
        return Some(lhs.clone());
    }
    None
}

/// Whether the `loser` shape is absorbed into the (distinct) `winner` shape.
fn absorbs(
    registry: &TypeRegistry,
    winner: &QTypePtr,
    loser: &QTypePtr,
    enable_broadcasting: bool,
) -> bool {
    if loser == registry.scalar_shape() {
        winner == registry.optional_scalar_shape() || enable_broadcasting
    } else if loser == registry.optional_scalar_shape() {
        enable_broadcasting
            && (winner == registry.dense_array_shape() || winner == registry.array_shape())
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(registry: &TypeRegistry, name: &str) -> QTypePtr {
        registry.lookup_by_name(name).unwrap()
    }

    #[test]
    fn scalar_projection() {
        let registry = TypeRegistry::new();
        let int32 = named(&registry, "INT32");
        for name in ["INT32", "OPTIONAL_INT32", "DENSE_ARRAY_INT32", "ARRAY_INT32"] {
            assert_eq!(get_scalar_qtype(&named(&registry, name)).unwrap(), int32);
        }
        let err = get_scalar_qtype(&named(&registry, "ARRAY_EDGE")).unwrap_err();
        assert!(err.to_string().contains("ARRAY_EDGE has no scalar qtype"), "{err}");
    }

    #[test]
    fn shape_projection() {
        let registry = TypeRegistry::new();
        let cases = [
            ("INT32", "SCALAR_SHAPE"),
            ("TEXT", "SCALAR_SHAPE"),
            ("OPTIONAL_FLOAT64", "OPTIONAL_SCALAR_SHAPE"),
            ("DENSE_ARRAY_BYTES", "DENSE_ARRAY_SHAPE"),
            ("ARRAY_UNIT", "ARRAY_SHAPE"),
        ];
        for (qtype, shape) in cases {
            assert_eq!(
                get_shape_qtype(&registry, &named(&registry, qtype)).unwrap(),
                named(&registry, shape),
            );
        }
        let tuple = registry.tuple_of(&[]);
        assert!(get_shape_qtype(&registry, &tuple).is_err());
    }

    #[test]
    fn scalar_substitution() {
        let registry = TypeRegistry::new();
        let float64 = named(&registry, "FLOAT64");
        let rebuilt =
            with_scalar_qtype(&registry, &named(&registry, "ARRAY_INT32"), &float64).unwrap();
        assert_eq!(rebuilt, named(&registry, "ARRAY_FLOAT64"));

        let kept =
            with_scalar_qtype(&registry, &named(&registry, "FLOAT32"), &float64).unwrap();
        assert_eq!(kept, float64);
    }

    #[test]
    fn optional_like_conversion() {
        let registry = TypeRegistry::new();
        assert!(!is_optional_like_qtype(&named(&registry, "INT32")));
        assert!(is_optional_like_qtype(&named(&registry, "OPTIONAL_INT32")));
        assert!(is_optional_like_qtype(&named(&registry, "ARRAY_INT32")));

        assert_eq!(
            to_optional_like_qtype(&registry, &named(&registry, "INT32")).unwrap(),
            named(&registry, "OPTIONAL_INT32"),
        );
        let dense = named(&registry, "DENSE_ARRAY_TEXT");
        assert_eq!(to_optional_like_qtype(&registry, &dense).unwrap(), dense);
        assert!(to_optional_like_qtype(&registry, registry.scalar_shape()).is_err());
    }

    #[test]
    fn derived_decay() {
        let registry = TypeRegistry::new();
        assert_eq!(
            decay_derived_qtype(&named(&registry, "WEAK_FLOAT")),
            named(&registry, "FLOAT64"),
        );
        assert_eq!(
            decay_derived_qtype(&named(&registry, "DENSE_ARRAY_WEAK_FLOAT")),
            named(&registry, "DENSE_ARRAY_FLOAT64"),
        );
        let int32 = named(&registry, "INT32");
        assert_eq!(decay_derived_qtype(&int32), int32);
    }

    #[test]
    fn scalar_chains_join() {
        let registry = TypeRegistry::new();
        let join = |lhs: &str, rhs: &str| {
            common_qtype(&registry, &named(&registry, lhs), &named(&registry, rhs), false)
                .map(|q| q.name().to_string())
        };
        assert_eq!(join("INT32", "INT64").as_deref(), Some("INT64"));
        assert_eq!(join("INT64", "INT32").as_deref(), Some("INT64"));
        assert_eq!(join("WEAK_FLOAT", "FLOAT32").as_deref(), Some("FLOAT32"));
        assert_eq!(join("WEAK_FLOAT", "FLOAT64").as_deref(), Some("FLOAT64"));
        assert_eq!(join("FLOAT32", "FLOAT64").as_deref(), Some("FLOAT64"));
        assert_eq!(join("INT32", "FLOAT32"), None);
        assert_eq!(join("BYTES", "TEXT"), None);
        assert_eq!(join("BOOLEAN", "BOOLEAN").as_deref(), Some("BOOLEAN"));
    }

    #[test]
    fn shape_absorption() {
        let registry = TypeRegistry::new();
        let join = |lhs: &str, rhs: &str, broadcasting: bool| {
            common_qtype(
                &registry,
                &named(&registry, lhs),
                &named(&registry, rhs),
                broadcasting,
            )
            .map(|q| q.name().to_string())
        };
        assert_eq!(
            join("INT32", "OPTIONAL_INT64", false).as_deref(),
            Some("OPTIONAL_INT64")
        );
        assert_eq!(join("INT32", "DENSE_ARRAY_INT64", false), None);
        assert_eq!(
            join("INT32", "DENSE_ARRAY_INT64", true).as_deref(),
            Some("DENSE_ARRAY_INT64")
        );
        assert_eq!(
            join("OPTIONAL_FLOAT32", "ARRAY_WEAK_FLOAT", true).as_deref(),
            Some("ARRAY_FLOAT32")
        );
        assert_eq!(join("DENSE_ARRAY_INT32", "ARRAY_INT32", true), None);
    }

    #[test]
    fn many_and_empty() {
        let registry = TypeRegistry::new();
        let qtypes = [
            named(&registry, "INT32"),
            named(&registry, "INT64"),
            named(&registry, "OPTIONAL_INT32"),
        ];
        assert_eq!(
            common_qtype_many(&registry, &qtypes, false).unwrap(),
            named(&registry, "OPTIONAL_INT64"),
        );

        assert!(common_qtype_many(&registry, &[], false).is_err());

        let clash = [named(&registry, "INT32"), named(&registry, "TEXT")];
        let err = common_qtype_many(&registry, &clash, false).unwrap_err();
        assert!(
            err.to_string().contains("no common qtype for INT32 and TEXT"),
            "{err}"
        );
    }

    #[test]
    fn broadcast_keeps_own_scalar() {
        let registry = TypeRegistry::new();
        let targets = [named(&registry, "ARRAY_FLOAT64")];
        assert_eq!(
            broadcast_qtype(&registry, &targets, &named(&registry, "INT32")).unwrap(),
            named(&registry, "ARRAY_INT32"),
        );
        let crossed = [named(&registry, "DENSE_ARRAY_INT64")];
        assert_eq!(
            broadcast_qtype(&registry, &crossed, &named(&registry, "ARRAY_INT32")),
            None
        );
    }

    #[test]
    fn implicit_cast_is_directional() {
        let registry = TypeRegistry::new();
        let check = |from: &str, to: &str| {
            can_cast_implicitly(&registry, &named(&registry, from), &named(&registry, to), false)
        };
        assert!(check("INT32", "INT64"));
        assert!(!check("INT64", "INT32"));
        assert!(check("WEAK_FLOAT", "FLOAT32"));
        assert!(!check("FLOAT32", "WEAK_FLOAT"));
        assert!(check("INT32", "OPTIONAL_INT32"));
        assert!(!check("OPTIONAL_INT32", "INT32"));
    }
}

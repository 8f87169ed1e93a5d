//! Implicit cast planning.
//!
//! [`implicit_cast_path`] turns a `from`/`to` qtype pair into the ordered
//! list of elementary casts an evaluator has to apply: scalar promotion
//! first, then array-ness expansion, then optional-ness wrapping. Each step
//! records the qtype the value has after that step.

use stela_common::{Result, error::Error};

use crate::properties::{
    can_cast_implicitly, decay_derived_qtype, get_scalar_qtype, get_shape_qtype,
    to_optional_like_qtype, with_scalar_qtype,
};
use crate::qtype::QTypePtr;
use crate::registry::TypeRegistry;

/// One elementary cast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CastStep {
    pub kind: CastKind,
    /// The value's qtype after this step.
    pub qtype: QTypePtr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CastKind {
    /// Decay a derived qtype to its base (weak float to float64).
    Upcast,
    /// Promote the scalar type along its chain, element-wise for containers.
    ToScalar,
    /// Expand a scalar or optional value into an array of the target shape.
    ConstWithShape,
    /// Wrap a scalar value into an optional.
    ToOptional,
}

impl CastStep {
    /// Name of the operator implementing this step, e.g. `"to_int64"`.
    pub fn operator_name(&self) -> String {
        match self.kind {
            CastKind::Upcast => "upcast".to_string(),
            CastKind::ToScalar => {
                let scalar = self.qtype.value_qtype().unwrap_or(&self.qtype);
                format!("to_{}", scalar.name().to_lowercase())
            }
            CastKind::ConstWithShape => "const_with_shape".to_string(),
            CastKind::ToOptional => "to_optional".to_string(),
        }
    }
}

/// Computes the cast steps taking a value of qtype `from` to qtype `to`.
///
/// Casting a non-array to an array qtype additionally requires the target's
/// shape qtype as `shape_template`; the returned `ConstWithShape` step is
/// applied with a concrete shape value of that qtype.
///
/// Fails with `InvalidArgument` when no implicit cast chain exists.
pub fn implicit_cast_path(
    registry: &TypeRegistry,
    from: &QTypePtr,
    to: &QTypePtr,
    shape_template: Option<&QTypePtr>,
) -> Result<Vec<CastStep>> {
    if from == to {
        return Ok(Vec::new());
    }
    let to_scalar = get_scalar_qtype(to)?;

    let needs_array_conversion = !from.is_array_like() && to.is_array_like();
    if needs_array_conversion {
        let to_shape = get_shape_qtype(registry, to)?;
        match shape_template {
            Some(template) if *template == to_shape => {}
            Some(template) => {
                return Err(Error::invalid_arg(
                    "shape_template",
                    format!(
                        "shape template {} does not match {}",
                        template.name(),
                        to_shape.name()
                    ),
                ));
            }
            None => {
                return Err(Error::invalid_arg(
                    "shape_template",
                    format!(
                        "casting {} to {} requires a shape template",
                        from.name(),
                        to.name()
                    ),
                ));
            }
        }
    }
    if !can_cast_implicitly(registry, from, to, needs_array_conversion) {
        return Err(Error::invalid_arg(
            "from",
            format!("no implicit cast from {} to {}", from.name(), to.name()),
        ));
    }

    let mut steps = Vec::new();
    let mut current = from.clone();

    if get_scalar_qtype(&current)? != to_scalar {
        if current.is_derived() {
            current = decay_derived_qtype(&current);
            steps.push(CastStep {
                kind: CastKind::Upcast,
                qtype: current.clone(),
            });
        }
        if get_scalar_qtype(&current)? != to_scalar {
            current = with_scalar_qtype(registry, &current, &to_scalar)?;
            steps.push(CastStep {
                kind: CastKind::ToScalar,
                qtype: current.clone(),
            });
        }
    }

    if needs_array_conversion {
        current = with_scalar_qtype(registry, to, &to_scalar)?;
        steps.push(CastStep {
            kind: CastKind::ConstWithShape,
            qtype: current.clone(),
        });
    }

    if &current != to {
        current = to_optional_like_qtype(registry, &current)?;
        steps.push(CastStep {
            kind: CastKind::ToOptional,
            qtype: current.clone(),
        });
    }

    debug_assert_eq!(current, *to);
    log::trace!(
        "cast path from {} to {}: {} step(s)",
        from.name(),
        to.name(),
        steps.len()
    );
    Ok(steps)
}

/// Renders a cast chain around a leaf expression, innermost step first,
/// e.g. `to_optional(upcast(x))`.
pub fn format_cast_chain(steps: &[CastStep], leaf: &str) -> String {
    steps.iter().fold(leaf.to_string(), |inner, step| {
        format!("{}({})", step.operator_name(), inner)
    })
}

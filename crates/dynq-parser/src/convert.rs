//! Implicit promotion and explicit conversion of expressions.

use dynq_common::error::{ErrorKind, ParseError};
use dynq_typeck::promote::{
    is_assignable_from, is_compatible_with, is_interface, is_numeric, parse_enum, parse_number,
};
use dynq_typeck::{Ty, Value};

use crate::expr::{Expr, ExprKind};
use crate::literals::LiteralTable;

/// Promote `expr` to `ty`, or `None` when it does not convert implicitly.
///
/// Source literals get a second chance: their text is re-read as the
/// target type, so `5` may become a `Decimal` or an `UInt64` constant and
/// `'Red'` a member of an enum. With `exact` set, a compatible expression is
/// always wrapped in a conversion node; otherwise only value-type targets
/// are.
pub fn promote(literals: &LiteralTable, expr: &Expr, ty: &Ty, exact: bool) -> Option<Expr> {
    if expr.ty == *ty {
        return Some(expr.clone());
    }
    if expr.is_null_literal() {
        if !ty.is_value_type() || ty.is_nullable() {
            return Some(Expr::constant(Value::Null, ty.clone(), expr.span));
        }
    } else if let Some(value) = reparse_literal(literals, expr, ty) {
        return Some(Expr::constant(value, ty.clone(), expr.span));
    }
    if is_compatible_with(&expr.ty, ty) {
        if ty.is_value_type() || exact {
            return Some(expr.clone().convert(ty.clone()));
        }
        return Some(expr.clone());
    }
    None
}

fn reparse_literal(literals: &LiteralTable, expr: &Expr, ty: &Ty) -> Option<Value> {
    let ExprKind::Constant {
        literal: Some(id), ..
    } = &expr.kind
    else {
        return None;
    };
    let text = literals.text(*id)?;
    let target = ty.non_nullable();
    match &expr.ty {
        Ty::Int32 | Ty::UInt32 | Ty::Int64 | Ty::UInt64 => parse_number(text, target),
        Ty::Double if *target == Ty::Decimal => parse_number(text, target),
        Ty::String => parse_enum(text, target),
        _ => None,
    }
}

fn is_numeric_or_enum(ty: &Ty) -> bool {
    is_numeric(ty) || ty.non_nullable().is_enum()
}

/// Explicit conversion, as written with `Type(expr)`.
///
/// Numeric and enum conversions are checked; wrapping to or unwrapping
/// from `T?` and reference conversions in either direction are not.
pub fn explicit(expr: Expr, ty: &Ty, pos: u32) -> Result<Expr, ParseError> {
    let from = &expr.ty;
    if from == ty {
        return Ok(expr);
    }
    if from.is_value_type() && ty.is_value_type() {
        if (from.is_nullable() || ty.is_nullable()) && from.non_nullable() == ty.non_nullable() {
            return Ok(expr.convert(ty.clone()));
        }
        if is_numeric_or_enum(from) && is_numeric_or_enum(ty) {
            let span = expr.span;
            return Ok(Expr::new(
                ExprKind::Convert {
                    operand: Box::new(expr),
                    checked: true,
                },
                ty.clone(),
                span,
            ));
        }
    }
    if is_assignable_from(from, ty)
        || is_assignable_from(ty, from)
        || is_interface(from)
        || is_interface(ty)
    {
        return Ok(expr.convert(ty.clone()));
    }
    Err(ParseError::at(
        ErrorKind::CannotConvertValue {
            from: from.to_string(),
            to: ty.to_string(),
        },
        pos,
    ))
}

//! Operator semantics over runtime values.
//!
//! Operands arrive already promoted to a common type by the parser, so
//! every operator only has to handle pairs of the same runtime type, plus
//! the date/time mixes. `null` on either side lifts: arithmetic yields
//! `null`, ordering comparisons yield `false`, equality compares nullness.

use std::cmp::Ordering;

use dynq_parser::BinaryOp;
use dynq_typeck::{HostError, Value};
use rust_decimal::Decimal;

use crate::error::{EvalError, EvalResult};

fn invalid_operands(op: BinaryOp, left: &Value, right: &Value) -> EvalError {
    EvalError::InvalidOperands {
        op: op.symbol(),
        left: left.ty().to_string(),
        right: right.ty().to_string(),
    }
}

fn overflow(ty: &str) -> EvalError {
    HostError::Overflow(ty.to_string()).into()
}

// ── Arithmetic ─────────────────────────────────────────────────────────

macro_rules! integral {
    ($op:expr, $a:expr, $b:expr, $variant:ident, $checked:expr) => {{
        let (a, b) = ($a, $b);
        let result = match $op {
            BinaryOp::Add if $checked => a.checked_add(b),
            BinaryOp::Add => Some(a.wrapping_add(b)),
            BinaryOp::Subtract if $checked => a.checked_sub(b),
            BinaryOp::Subtract => Some(a.wrapping_sub(b)),
            BinaryOp::Multiply if $checked => a.checked_mul(b),
            BinaryOp::Multiply => Some(a.wrapping_mul(b)),
            BinaryOp::Divide | BinaryOp::Modulo if b == 0 => {
                return Err(EvalError::DivideByZero)
            }
            BinaryOp::Divide => Some(a.wrapping_div(b)),
            _ => Some(a.wrapping_rem(b)),
        };
        result
            .map(Value::$variant)
            .ok_or_else(|| overflow(stringify!($variant)))
    }};
}

macro_rules! real {
    ($op:expr, $a:expr, $b:expr, $variant:ident) => {{
        let (a, b) = ($a, $b);
        Ok(Value::$variant(match $op {
            BinaryOp::Add => a + b,
            BinaryOp::Subtract => a - b,
            BinaryOp::Multiply => a * b,
            BinaryOp::Divide => a / b,
            _ => a % b,
        }))
    }};
}

fn decimal(op: BinaryOp, a: Decimal, b: Decimal) -> EvalResult<Value> {
    if matches!(op, BinaryOp::Divide | BinaryOp::Modulo) && b.is_zero() {
        return Err(EvalError::DivideByZero);
    }
    let result = match op {
        BinaryOp::Add => a.checked_add(b),
        BinaryOp::Subtract => a.checked_sub(b),
        BinaryOp::Multiply => a.checked_mul(b),
        BinaryOp::Divide => a.checked_div(b),
        _ => a.checked_rem(b),
    };
    result.map(Value::Decimal).ok_or_else(|| overflow("Decimal"))
}

/// `+ - * / %`. Integer arithmetic wraps unless `checked`; integer and
/// decimal division by zero fails.
pub fn arithmetic(op: BinaryOp, left: &Value, right: &Value, checked: bool) -> EvalResult<Value> {
    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }
    match (left, right) {
        (Value::Int32(a), Value::Int32(b)) => integral!(op, *a, *b, Int32, checked),
        (Value::UInt32(a), Value::UInt32(b)) => integral!(op, *a, *b, UInt32, checked),
        (Value::Int64(a), Value::Int64(b)) => integral!(op, *a, *b, Int64, checked),
        (Value::UInt64(a), Value::UInt64(b)) => integral!(op, *a, *b, UInt64, checked),
        (Value::Single(a), Value::Single(b)) => real!(op, *a, *b, Single),
        (Value::Double(a), Value::Double(b)) => real!(op, *a, *b, Double),
        (Value::Decimal(a), Value::Decimal(b)) => decimal(op, *a, *b),
        (Value::DateTime(a), Value::TimeSpan(b)) => {
            let moved = match op {
                BinaryOp::Add => a.checked_add_signed(*b),
                BinaryOp::Subtract => a.checked_sub_signed(*b),
                _ => return Err(invalid_operands(op, left, right)),
            };
            moved.map(Value::DateTime).ok_or_else(|| overflow("DateTime"))
        }
        (Value::DateTime(a), Value::DateTime(b)) if op == BinaryOp::Subtract => {
            Ok(Value::TimeSpan(a.signed_duration_since(*b)))
        }
        (Value::TimeSpan(a), Value::TimeSpan(b)) => {
            let span = match op {
                BinaryOp::Add => a.checked_add(b),
                BinaryOp::Subtract => a.checked_sub(b),
                _ => return Err(invalid_operands(op, left, right)),
            };
            span.map(Value::TimeSpan).ok_or_else(|| overflow("TimeSpan"))
        }
        _ => Err(invalid_operands(op, left, right)),
    }
}

// ── Comparison ─────────────────────────────────────────────────────────

/// `== != < <= > >=`. Ordering against `null` is false; equality holds
/// when both sides are `null`.
pub fn compare(op: BinaryOp, left: &Value, right: &Value) -> EvalResult<Value> {
    if left.is_null() || right.is_null() {
        let both = left.is_null() && right.is_null();
        return Ok(Value::Bool(match op {
            BinaryOp::Equal => both,
            BinaryOp::NotEqual => !both,
            _ => false,
        }));
    }
    let result = match op {
        BinaryOp::Equal => left == right,
        BinaryOp::NotEqual => left != right,
        _ => {
            let ord = left
                .compare(right)
                .ok_or_else(|| invalid_operands(op, left, right))?;
            match op {
                BinaryOp::LessThan => ord == Ordering::Less,
                BinaryOp::LessThanOrEqual => ord != Ordering::Greater,
                BinaryOp::GreaterThan => ord == Ordering::Greater,
                _ => ord != Ordering::Less,
            }
        }
    };
    Ok(Value::Bool(result))
}

/// Ordering for sorts: `null` first, incomparable values equal.
pub fn sort_order(a: &Value, b: &Value) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => a.compare(b).unwrap_or(Ordering::Equal),
    }
}

// ── Unary ──────────────────────────────────────────────────────────────

pub fn negate(value: &Value) -> EvalResult<Value> {
    Ok(match value {
        Value::Null => Value::Null,
        Value::Int32(v) => Value::Int32(v.wrapping_neg()),
        Value::Int64(v) => Value::Int64(v.wrapping_neg()),
        Value::Single(v) => Value::Single(-v),
        Value::Double(v) => Value::Double(-v),
        Value::Decimal(v) => Value::Decimal(-*v),
        other => {
            return Err(EvalError::InvalidOperand {
                op: "-",
                operand: other.ty().to_string(),
            })
        }
    })
}

pub fn not(value: &Value) -> EvalResult<Value> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::Bool(b) => Ok(Value::Bool(!b)),
        other => Err(EvalError::InvalidOperand {
            op: "!",
            operand: other.ty().to_string(),
        }),
    }
}

/// Truth value of a `Boolean` or `Boolean?` operand.
pub fn truth(op: BinaryOp, value: &Value) -> EvalResult<Option<bool>> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(*b)),
        other => Err(EvalError::InvalidOperand {
            op: op.symbol(),
            operand: other.ty().to_string(),
        }),
    }
}

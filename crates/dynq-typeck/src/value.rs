//! Runtime values.
//!
//! Constants in expression trees, substitution values, and everything the
//! evaluator produces are [`Value`]s. A nullable value is just the inner
//! value or `Null`; the static type lives on the tree node, not the value.

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use chrono::{NaiveDateTime, TimeDelta};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::host::{HostError, HostType};
use crate::records::RecordValue;
use crate::ty::{EnumType, Ty};

#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Bool(bool),
    Char(char),
    String(Arc<str>),
    SByte(i8),
    Byte(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Single(f32),
    Double(f64),
    Decimal(Decimal),
    DateTime(NaiveDateTime),
    TimeSpan(TimeDelta),
    Guid(Uuid),
    Enum(EnumType, i64),
    Array(ArrayValue),
    Record(RecordValue),
    Object(HostObject),
}

/// A one-dimensional array. Arrays compare by reference.
#[derive(Clone, Debug)]
pub struct ArrayValue {
    pub elem: Ty,
    pub items: Arc<[Value]>,
}

/// An instance of a caller-registered host type. Compares by reference.
#[derive(Clone)]
pub struct HostObject {
    pub ty: HostType,
    pub data: Arc<dyn Any + Send + Sync>,
}

impl fmt::Debug for HostObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{ .. }}", self.ty.name())
    }
}

impl Value {
    pub fn array(elem: Ty, items: impl Into<Arc<[Value]>>) -> Value {
        Value::Array(ArrayValue {
            elem,
            items: items.into(),
        })
    }

    pub fn object<T: Any + Send + Sync>(ty: &HostType, data: T) -> Value {
        Value::Object(HostObject {
            ty: ty.clone(),
            data: Arc::new(data),
        })
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The runtime type of the value. `Null` reports `Object`.
    pub fn ty(&self) -> Ty {
        match self {
            Value::Null => Ty::Object,
            Value::Bool(_) => Ty::Bool,
            Value::Char(_) => Ty::Char,
            Value::String(_) => Ty::String,
            Value::SByte(_) => Ty::SByte,
            Value::Byte(_) => Ty::Byte,
            Value::Int16(_) => Ty::Int16,
            Value::UInt16(_) => Ty::UInt16,
            Value::Int32(_) => Ty::Int32,
            Value::UInt32(_) => Ty::UInt32,
            Value::Int64(_) => Ty::Int64,
            Value::UInt64(_) => Ty::UInt64,
            Value::Single(_) => Ty::Single,
            Value::Double(_) => Ty::Double,
            Value::Decimal(_) => Ty::Decimal,
            Value::DateTime(_) => Ty::DateTime,
            Value::TimeSpan(_) => Ty::TimeSpan,
            Value::Guid(_) => Ty::Guid,
            Value::Enum(ty, _) => Ty::Enum(ty.clone()),
            Value::Array(a) => Ty::array(a.elem.clone()),
            Value::Record(r) => Ty::Record(r.record_type().clone()),
            Value::Object(o) => Ty::Host(o.ty.clone()),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Any signed or unsigned integral value that fits in `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::SByte(v) => Some(v.into()),
            Value::Byte(v) => Some(v.into()),
            Value::Int16(v) => Some(v.into()),
            Value::UInt16(v) => Some(v.into()),
            Value::Int32(v) => Some(v.into()),
            Value::UInt32(v) => Some(v.into()),
            Value::Int64(v) => Some(v),
            Value::UInt64(v) => i64::try_from(v).ok(),
            Value::Char(c) => Some(u32::from(c).into()),
            Value::Enum(_, v) => Some(v),
            _ => None,
        }
    }

    /// Any numeric value, widened to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Single(v) => Some(v.into()),
            Value::Double(v) => Some(v),
            Value::UInt64(v) => Some(v as f64),
            Value::Decimal(d) => rust_decimal::prelude::ToPrimitive::to_f64(&d),
            _ => self.as_i64().map(|v| v as f64),
        }
    }

    /// Any integral or decimal value as a `Decimal`.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match *self {
            Value::Decimal(d) => Some(d),
            Value::UInt64(v) => Some(Decimal::from(v)),
            Value::Single(v) => Decimal::try_from(v).ok(),
            Value::Double(v) => Decimal::try_from(v).ok(),
            _ => self.as_i64().map(Decimal::from),
        }
    }

    /// Borrow the native payload of a host object.
    pub fn downcast_ref<T: Any>(&self) -> Result<&T, HostError> {
        match self {
            Value::Object(o) => o.data.downcast_ref::<T>().ok_or_else(|| HostError::TypeMismatch {
                expected: std::any::type_name::<T>().to_string(),
                found: o.ty.name().to_string(),
            }),
            Value::Null => Err(HostError::NullReference),
            other => Err(HostError::TypeMismatch {
                expected: std::any::type_name::<T>().to_string(),
                found: other.ty().to_string(),
            }),
        }
    }
}

// ── Equality ───────────────────────────────────────────────────────────
//
// Values of different runtime types are never equal, even when numerically
// the same (`Int32(1) != Int64(1)`). Floating NaN equals itself.

fn f64_eq(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

fn f64_bits(v: f64) -> u64 {
    if v == 0.0 {
        0
    } else if v.is_nan() {
        f64::NAN.to_bits()
    } else {
        v.to_bits()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (Null, Null) => true,
            (Bool(a), Bool(b)) => a == b,
            (Char(a), Char(b)) => a == b,
            (String(a), String(b)) => a == b,
            (SByte(a), SByte(b)) => a == b,
            (Byte(a), Byte(b)) => a == b,
            (Int16(a), Int16(b)) => a == b,
            (UInt16(a), UInt16(b)) => a == b,
            (Int32(a), Int32(b)) => a == b,
            (UInt32(a), UInt32(b)) => a == b,
            (Int64(a), Int64(b)) => a == b,
            (UInt64(a), UInt64(b)) => a == b,
            (Single(a), Single(b)) => f64_eq((*a).into(), (*b).into()),
            (Double(a), Double(b)) => f64_eq(*a, *b),
            (Decimal(a), Decimal(b)) => a == b,
            (DateTime(a), DateTime(b)) => a == b,
            (TimeSpan(a), TimeSpan(b)) => a == b,
            (Guid(a), Guid(b)) => a == b,
            (Enum(ta, a), Enum(tb, b)) => ta == tb && a == b,
            (Array(a), Array(b)) => Arc::ptr_eq(&a.items, &b.items),
            (Record(a), Record(b)) => a == b,
            (Object(a), Object(b)) => Arc::ptr_eq(&a.data, &b.data),
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Bool(v) => v.hash(state),
            Value::Char(v) => v.hash(state),
            Value::String(v) => v.hash(state),
            Value::SByte(v) => v.hash(state),
            Value::Byte(v) => v.hash(state),
            Value::Int16(v) => v.hash(state),
            Value::UInt16(v) => v.hash(state),
            Value::Int32(v) => v.hash(state),
            Value::UInt32(v) => v.hash(state),
            Value::Int64(v) => v.hash(state),
            Value::UInt64(v) => v.hash(state),
            Value::Single(v) => f64_bits((*v).into()).hash(state),
            Value::Double(v) => f64_bits(*v).hash(state),
            Value::Decimal(v) => v.normalize().hash(state),
            Value::DateTime(v) => v.hash(state),
            Value::TimeSpan(v) => v.hash(state),
            Value::Guid(v) => v.hash(state),
            Value::Enum(ty, v) => {
                ty.hash(state);
                v.hash(state);
            }
            Value::Array(a) => (Arc::as_ptr(&a.items) as *const () as usize).hash(state),
            Value::Record(r) => r.hash(state),
            Value::Object(o) => (Arc::as_ptr(&o.data) as *const () as usize).hash(state),
        }
    }
}

// ── Display ────────────────────────────────────────────────────────────
//
// The text `&` concatenation and `ToString()` produce.

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Char(c) => write!(f, "{c}"),
            Value::String(s) => write!(f, "{s}"),
            Value::SByte(v) => write!(f, "{v}"),
            Value::Byte(v) => write!(f, "{v}"),
            Value::Int16(v) => write!(f, "{v}"),
            Value::UInt16(v) => write!(f, "{v}"),
            Value::Int32(v) => write!(f, "{v}"),
            Value::UInt32(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::UInt64(v) => write!(f, "{v}"),
            Value::Single(v) => write_float(f, (*v).into()),
            Value::Double(v) => write_float(f, *v),
            Value::Decimal(v) => write!(f, "{v}"),
            Value::DateTime(v) => write!(f, "{}", v.format("%m/%d/%Y %H:%M:%S")),
            Value::TimeSpan(v) => write_time_span(f, *v),
            Value::Guid(v) => write!(f, "{v}"),
            Value::Enum(ty, v) => match ty.name_of(*v) {
                Some(name) => write!(f, "{name}"),
                None => write!(f, "{v}"),
            },
            Value::Array(a) => write!(f, "{}[]", a.elem),
            Value::Record(r) => write!(f, "{r}"),
            Value::Object(o) => write!(f, "{}", o.ty.name()),
        }
    }
}

fn write_float(f: &mut fmt::Formatter<'_>, v: f64) -> fmt::Result {
    if v.is_infinite() {
        write!(f, "{}Infinity", if v < 0.0 { "-" } else { "" })
    } else {
        write!(f, "{v}")
    }
}

/// `[-][d.]hh:mm:ss[.fffffff]`
fn write_time_span(f: &mut fmt::Formatter<'_>, span: TimeDelta) -> fmt::Result {
    let ticks = span.num_nanoseconds().map_or(i64::MAX, |n| n / 100);
    if ticks < 0 {
        write!(f, "-")?;
    }
    let ticks = ticks.unsigned_abs();
    let fraction = ticks % 10_000_000;
    let total_seconds = ticks / 10_000_000;
    let days = total_seconds / 86_400;
    let hours = (total_seconds / 3_600) % 24;
    let minutes = (total_seconds / 60) % 60;
    let seconds = total_seconds % 60;
    if days > 0 {
        write!(f, "{days}.")?;
    }
    write!(f, "{hours:02}:{minutes:02}:{seconds:02}")?;
    if fraction > 0 {
        write!(f, ".{fraction:07}")?;
    }
    Ok(())
}

// ── Conversions ────────────────────────────────────────────────────────

macro_rules! impl_from {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::$variant(v.into())
            }
        })*
    };
}

impl_from! {
    bool => Bool,
    char => Char,
    &str => String,
    String => String,
    i8 => SByte,
    u8 => Byte,
    i16 => Int16,
    u16 => UInt16,
    i32 => Int32,
    u32 => UInt32,
    i64 => Int64,
    u64 => UInt64,
    f32 => Single,
    f64 => Double,
    Decimal => Decimal,
    NaiveDateTime => DateTime,
    TimeDelta => TimeSpan,
    Uuid => Guid,
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

// ── Runtime conversion and ordering ────────────────────────────────────

fn overflow(target: &Ty) -> HostError {
    HostError::Overflow(target.to_string())
}

fn cannot_convert(value: &Value, target: &Ty) -> HostError {
    HostError::TypeMismatch {
        expected: target.to_string(),
        found: value.ty().to_string(),
    }
}

macro_rules! int_cast {
    ($v:expr, $t:ty, $variant:ident, $checked:expr, $target:expr) => {
        if $checked {
            <$t>::try_from($v)
                .map(Value::$variant)
                .map_err(|_| overflow($target))
        } else {
            Ok(Value::$variant($v as $t))
        }
    };
}

impl Value {
    /// Convert to `target` the way an explicit cast does. With `checked`,
    /// narrowing that loses magnitude fails instead of wrapping.
    pub fn convert(&self, target: &Ty, checked: bool) -> Result<Value, HostError> {
        if let Ty::Nullable(inner) = target {
            return match self {
                Value::Null => Ok(Value::Null),
                v => v.convert(inner, checked),
            };
        }
        if self.is_null() {
            return if target.is_value_type() {
                Err(HostError::NullReference)
            } else {
                Ok(Value::Null)
            };
        }
        if *target == Ty::Object || self.ty() == *target {
            return Ok(self.clone());
        }

        match target {
            Ty::SByte
            | Ty::Byte
            | Ty::Int16
            | Ty::UInt16
            | Ty::Int32
            | Ty::UInt32
            | Ty::Int64
            | Ty::UInt64
            | Ty::Char => {
                let wide = self.integral_part(target, checked)?;
                match target {
                    Ty::SByte => int_cast!(wide, i8, SByte, checked, target),
                    Ty::Byte => int_cast!(wide, u8, Byte, checked, target),
                    Ty::Int16 => int_cast!(wide, i16, Int16, checked, target),
                    Ty::UInt16 => int_cast!(wide, u16, UInt16, checked, target),
                    Ty::Int32 => int_cast!(wide, i32, Int32, checked, target),
                    Ty::UInt32 => int_cast!(wide, u32, UInt32, checked, target),
                    Ty::Int64 => int_cast!(wide, i64, Int64, checked, target),
                    Ty::UInt64 => int_cast!(wide, u64, UInt64, checked, target),
                    _ => {
                        let code = if checked {
                            u16::try_from(wide).map_err(|_| overflow(target))?
                        } else {
                            wide as u16
                        };
                        char::from_u32(code.into())
                            .map(Value::Char)
                            .ok_or_else(|| overflow(target))
                    }
                }
            }
            Ty::Single => self
                .as_f64()
                .map(|v| Value::Single(v as f32))
                .ok_or_else(|| cannot_convert(self, target)),
            Ty::Double => self
                .as_f64()
                .map(Value::Double)
                .ok_or_else(|| cannot_convert(self, target)),
            Ty::Decimal => match self {
                Value::Single(_) | Value::Double(_) => {
                    self.as_decimal().map(Value::Decimal).ok_or_else(|| overflow(target))
                }
                _ => self
                    .as_decimal()
                    .map(Value::Decimal)
                    .ok_or_else(|| cannot_convert(self, target)),
            },
            Ty::Enum(e) => self
                .as_i64()
                .map(|v| Value::Enum(e.clone(), v))
                .ok_or_else(|| cannot_convert(self, target)),
            _ if crate::promote::is_assignable_from(target, &self.ty()) => Ok(self.clone()),
            _ => Err(cannot_convert(self, target)),
        }
    }

    /// The value as a wide integer, truncating reals toward zero.
    fn integral_part(&self, target: &Ty, checked: bool) -> Result<i128, HostError> {
        use rust_decimal::prelude::ToPrimitive;
        match *self {
            Value::UInt64(v) => Ok(v.into()),
            Value::Single(_) | Value::Double(_) => {
                let v = self.as_f64().unwrap_or(f64::NAN).trunc();
                if checked && !(v >= i128::MIN as f64 && v <= i128::MAX as f64) {
                    Err(overflow(target))
                } else {
                    Ok(v as i128)
                }
            }
            Value::Decimal(d) => d.trunc().to_i128().ok_or_else(|| overflow(target)),
            _ => self
                .as_i64()
                .map(i128::from)
                .ok_or_else(|| cannot_convert(self, target)),
        }
    }

    /// Ordering between two values of the same runtime type. `None` for
    /// values that have no ordering or differ in type. NaN sorts first.
    pub fn compare(&self, other: &Value) -> Option<std::cmp::Ordering> {
        use std::cmp::Ordering;
        fn float(a: f64, b: f64) -> Ordering {
            match (a.is_nan(), b.is_nan()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
                _ => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            }
        }
        use Value::*;
        let ord = match (self, other) {
            (Bool(a), Bool(b)) => a.cmp(b),
            (Char(a), Char(b)) => a.cmp(b),
            (String(a), String(b)) => a.cmp(b),
            (SByte(a), SByte(b)) => a.cmp(b),
            (Byte(a), Byte(b)) => a.cmp(b),
            (Int16(a), Int16(b)) => a.cmp(b),
            (UInt16(a), UInt16(b)) => a.cmp(b),
            (Int32(a), Int32(b)) => a.cmp(b),
            (UInt32(a), UInt32(b)) => a.cmp(b),
            (Int64(a), Int64(b)) => a.cmp(b),
            (UInt64(a), UInt64(b)) => a.cmp(b),
            (Single(a), Single(b)) => float((*a).into(), (*b).into()),
            (Double(a), Double(b)) => float(*a, *b),
            (Decimal(a), Decimal(b)) => a.cmp(b),
            (DateTime(a), DateTime(b)) => a.cmp(b),
            (TimeSpan(a), TimeSpan(b)) => a.cmp(b),
            (Guid(a), Guid(b)) => a.cmp(b),
            (Enum(ta, a), Enum(tb, b)) if ta == tb => a.cmp(b),
            _ => return None,
        };
        Some(ord)
    }

    /// The value a default-initialised `ty` holds.
    pub fn default_for(ty: &Ty) -> Value {
        match ty {
            Ty::Bool => Value::Bool(false),
            Ty::Char => Value::Char('\0'),
            Ty::SByte => Value::SByte(0),
            Ty::Byte => Value::Byte(0),
            Ty::Int16 => Value::Int16(0),
            Ty::UInt16 => Value::UInt16(0),
            Ty::Int32 => Value::Int32(0),
            Ty::UInt32 => Value::UInt32(0),
            Ty::Int64 => Value::Int64(0),
            Ty::UInt64 => Value::UInt64(0),
            Ty::Single => Value::Single(0.0),
            Ty::Double => Value::Double(0.0),
            Ty::Decimal => Value::Decimal(Decimal::ZERO),
            Ty::DateTime => Value::DateTime(NaiveDateTime::MIN),
            Ty::TimeSpan => Value::TimeSpan(TimeDelta::zero()),
            Ty::Guid => Value::Guid(Uuid::nil()),
            Ty::Enum(e) => Value::Enum(e.clone(), 0),
            _ => Value::Null,
        }
    }
}

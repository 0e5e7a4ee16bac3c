//! Capability tables for the predefined types, and type-hierarchy queries.
//!
//! The tables for `Object`, `String`, the numeric types, `Boolean`, `Char`,
//! `DateTime`, `TimeSpan`, `Guid`, arrays and the static classes `Math` and
//! `Convert` are built once on first use. Tables for `T?` are made on
//! demand since they depend on `T`.

use std::sync::{Arc, OnceLock};

use chrono::{Datelike, Months, NaiveDate, NaiveDateTime, TimeDelta, Timelike};
use rust_decimal::{Decimal, RoundingStrategy};
use rustc_hash::FxHashMap;
use uuid::Uuid;

use crate::host::{HostError, HostType, TypeBuilder, TypeDef, TypeKind};
use crate::promote::is_interface;
use crate::ty::Ty;
use crate::value::Value;

struct Builtins {
    primitives: FxHashMap<Ty, Arc<TypeDef>>,
    array: Arc<TypeDef>,
    math: HostType,
    convert: HostType,
}

static BUILTINS: OnceLock<Builtins> = OnceLock::new();

fn builtins() -> &'static Builtins {
    BUILTINS.get_or_init(|| {
        let mut primitives = FxHashMap::default();
        primitives.insert(Ty::Object, object_def());
        primitives.insert(Ty::String, string_def());
        primitives.insert(Ty::Bool, bool_def());
        primitives.insert(Ty::Char, char_def());
        primitives.insert(Ty::DateTime, datetime_def());
        primitives.insert(Ty::TimeSpan, timespan_def());
        primitives.insert(Ty::Guid, guid_def());
        for (ty, def) in numeric_defs() {
            primitives.insert(ty, def);
        }
        Builtins {
            primitives,
            array: TypeBuilder::for_builtin(&Ty::array(Ty::Object), TypeKind::Class)
                .property("Length", Ty::Int32, |this| match this {
                    Value::Array(a) => Ok(Value::Int32(a.items.len() as i32)),
                    _ => Err(HostError::NullReference),
                })
                .finish(),
            math: math_type(),
            convert: convert_type(),
        }
    })
}

/// Type names usable in expressions besides the primitives: the static
/// classes `Math` and `Convert`.
pub fn builtin_type(name: &str) -> Option<Ty> {
    if let Some(ty) = Ty::predefined(name) {
        return Some(ty);
    }
    let b = builtins();
    [&b.math, &b.convert]
        .into_iter()
        .find(|h| h.name().eq_ignore_ascii_case(name))
        .map(HostType::ty)
}

/// The capability table declared directly by `ty`, if it has one.
pub fn definition(ty: &Ty) -> Option<Arc<TypeDef>> {
    match ty {
        Ty::Host(h) => Some(h.def().clone()),
        Ty::Record(r) => Some(r.def().clone()),
        Ty::Array(..) => Some(builtins().array.clone()),
        Ty::Nullable(inner) => Some(nullable_def(inner)),
        Ty::Enum(_) | Ty::Enumerable(_) | Ty::Fun(..) | Ty::Void => None,
        other => builtins().primitives.get(other).cloned(),
    }
}

/// Member lookup order: the type and its base chain ending in `Object`,
/// or for an interface the interface and everything it extends.
pub fn self_and_base_types(ty: &Ty) -> Vec<Ty> {
    if is_interface(ty) {
        let mut types = Vec::new();
        add_interface(&mut types, ty);
        return types;
    }
    let mut types = Vec::new();
    let mut current = Some(ty.clone());
    while let Some(t) = current {
        current = match &t {
            Ty::Host(h) => h.def().base().cloned(),
            _ => None,
        };
        types.push(t);
    }
    if !types.contains(&Ty::Object) {
        types.push(Ty::Object);
    }
    types
}

fn add_interface(types: &mut Vec<Ty>, ty: &Ty) {
    if types.contains(ty) {
        return;
    }
    types.push(ty.clone());
    if let Ty::Host(h) = ty {
        for parent in h.def().interfaces() {
            add_interface(types, parent);
        }
    }
}

/// Every type a value of `ty` may be used as: itself, its bases, all the
/// interfaces any of them implement, and `Object`.
pub fn supertypes(ty: &Ty) -> Vec<Ty> {
    let mut types = Vec::new();
    for t in self_and_base_types(ty) {
        if let Ty::Host(h) = &t {
            for iface in h.def().interfaces() {
                add_interface(&mut types, iface);
            }
        }
        if !types.contains(&t) {
            types.push(t);
        }
    }
    types
}

/// `T` when `ty` is `IEnumerable<T>`, an array of `T`, or implements it.
pub fn element_type(ty: &Ty) -> Option<Ty> {
    match ty {
        Ty::Enumerable(elem) | Ty::Array(elem, _) => Some((**elem).clone()),
        Ty::Host(_) => supertypes(ty).into_iter().find_map(|t| match t {
            Ty::Enumerable(elem) => Some(*elem),
            _ => None,
        }),
        _ => None,
    }
}

/// List the elements of an array or enumerable host object.
pub fn enumerate(value: &Value) -> Result<Vec<Value>, HostError> {
    match value {
        Value::Array(a) => Ok(a.items.to_vec()),
        Value::Object(o) => {
            for t in self_and_base_types(&o.ty.ty()) {
                if let Ty::Host(h) = t {
                    if let Some(items) = h.def().enumerator() {
                        return items(value);
                    }
                }
            }
            Err(HostError::TypeMismatch {
                expected: "IEnumerable".to_string(),
                found: o.ty.name().to_string(),
            })
        }
        Value::Null => Err(HostError::NullReference),
        other => Err(HostError::TypeMismatch {
            expected: "IEnumerable".to_string(),
            found: other.ty().to_string(),
        }),
    }
}

// ── Argument helpers ───────────────────────────────────────────────────

fn mismatch(expected: &str, found: &Value) -> HostError {
    match found {
        Value::Null => HostError::NullReference,
        other => HostError::TypeMismatch {
            expected: expected.to_string(),
            found: other.ty().to_string(),
        },
    }
}

fn str_arg(v: &Value) -> Result<&str, HostError> {
    v.as_str().ok_or_else(|| mismatch("String", v))
}

fn i32_arg(v: &Value) -> Result<i32, HostError> {
    match v {
        Value::Int32(i) => Ok(*i),
        other => Err(mismatch("Int32", other)),
    }
}

fn f64_arg(v: &Value) -> Result<f64, HostError> {
    v.as_f64().ok_or_else(|| mismatch("Double", v))
}

fn dec_arg(v: &Value) -> Result<Decimal, HostError> {
    match v {
        Value::Decimal(d) => Ok(*d),
        other => Err(mismatch("Decimal", other)),
    }
}

fn char_arg(v: &Value) -> Result<char, HostError> {
    match v {
        Value::Char(c) => Ok(*c),
        other => Err(mismatch("Char", other)),
    }
}

fn datetime_arg(v: &Value) -> Result<NaiveDateTime, HostError> {
    match v {
        Value::DateTime(d) => Ok(*d),
        other => Err(mismatch("DateTime", other)),
    }
}

fn timespan_arg(v: &Value) -> Result<TimeDelta, HostError> {
    match v {
        Value::TimeSpan(t) => Ok(*t),
        other => Err(mismatch("TimeSpan", other)),
    }
}

fn char_index(haystack: &str, byte_index: Option<usize>) -> Value {
    Value::Int32(byte_index.map_or(-1, |b| haystack[..b].chars().count() as i32))
}

// ── Object, String, Boolean, Char ──────────────────────────────────────

fn object_def() -> Arc<TypeDef> {
    TypeBuilder::for_builtin(&Ty::Object, TypeKind::Class)
        .method("ToString", [], Ty::String, |this, _| Ok(Value::from(this.to_string())))
        .method("Equals", [Ty::Object], Ty::Bool, |this, args| {
            Ok(Value::Bool(*this == args[0]))
        })
        .finish()
}

fn substring(s: &str, start: i32, len: Option<i32>) -> Result<Value, HostError> {
    let total = s.chars().count() as i64;
    let start = i64::from(start);
    let len = len.map_or(total - start, i64::from);
    if start < 0 || len < 0 || start + len > total {
        return Err(HostError::IndexOutOfRange);
    }
    Ok(Value::from(
        s.chars()
            .skip(start as usize)
            .take(len as usize)
            .collect::<String>(),
    ))
}

fn string_def() -> Arc<TypeDef> {
    let s = Ty::String;
    TypeBuilder::for_builtin(&s, TypeKind::Class)
        .property("Length", Ty::Int32, |this| {
            Ok(Value::Int32(str_arg(this)?.chars().count() as i32))
        })
        .indexer([Ty::Int32], Ty::Char, |this, args| {
            let index = i32_arg(&args[0])?;
            usize::try_from(index)
                .ok()
                .and_then(|i| str_arg(this).ok()?.chars().nth(i))
                .map(Value::Char)
                .ok_or(HostError::IndexOutOfRange)
        })
        .method("Contains", [Ty::String], Ty::Bool, |this, args| {
            Ok(Value::Bool(str_arg(this)?.contains(str_arg(&args[0])?)))
        })
        .method("StartsWith", [Ty::String], Ty::Bool, |this, args| {
            Ok(Value::Bool(str_arg(this)?.starts_with(str_arg(&args[0])?)))
        })
        .method("EndsWith", [Ty::String], Ty::Bool, |this, args| {
            Ok(Value::Bool(str_arg(this)?.ends_with(str_arg(&args[0])?)))
        })
        .method("IndexOf", [Ty::String], Ty::Int32, |this, args| {
            let hay = str_arg(this)?;
            Ok(char_index(hay, hay.find(str_arg(&args[0])?)))
        })
        .method("IndexOf", [Ty::Char], Ty::Int32, |this, args| {
            let hay = str_arg(this)?;
            Ok(char_index(hay, hay.find(char_arg(&args[0])?)))
        })
        .method("ToUpper", [], s.clone(), |this, _| {
            Ok(Value::from(str_arg(this)?.to_uppercase()))
        })
        .method("ToLower", [], s.clone(), |this, _| {
            Ok(Value::from(str_arg(this)?.to_lowercase()))
        })
        .method("Trim", [], s.clone(), |this, _| Ok(Value::from(str_arg(this)?.trim())))
        .method("TrimStart", [], s.clone(), |this, _| {
            Ok(Value::from(str_arg(this)?.trim_start()))
        })
        .method("TrimEnd", [], s.clone(), |this, _| {
            Ok(Value::from(str_arg(this)?.trim_end()))
        })
        .method("Substring", [Ty::Int32], s.clone(), |this, args| {
            substring(str_arg(this)?, i32_arg(&args[0])?, None)
        })
        .method("Substring", [Ty::Int32, Ty::Int32], s.clone(), |this, args| {
            substring(str_arg(this)?, i32_arg(&args[0])?, Some(i32_arg(&args[1])?))
        })
        .method("Replace", [Ty::String, Ty::String], s.clone(), |this, args| {
            Ok(Value::from(
                str_arg(this)?.replace(str_arg(&args[0])?, str_arg(&args[1])?),
            ))
        })
        .static_method("Concat", [Ty::Object, Ty::Object], s.clone(), |args| {
            Ok(Value::from(format!("{}{}", args[0], args[1])))
        })
        .static_method("Compare", [Ty::String, Ty::String], Ty::Int32, |args| {
            // Null sorts before every string.
            let ord = match (&args[0], &args[1]) {
                (Value::Null, Value::Null) => std::cmp::Ordering::Equal,
                (Value::Null, _) => std::cmp::Ordering::Less,
                (_, Value::Null) => std::cmp::Ordering::Greater,
                (a, b) => str_arg(a)?.cmp(str_arg(b)?),
            };
            Ok(Value::Int32(ord as i32))
        })
        .static_method("IsNullOrEmpty", [Ty::String], Ty::Bool, |args| {
            Ok(Value::Bool(args[0].as_str().map_or(true, str::is_empty)))
        })
        .finish()
}

fn bool_def() -> Arc<TypeDef> {
    TypeBuilder::for_builtin(&Ty::Bool, TypeKind::Struct)
        .static_method("Parse", [Ty::String], Ty::Bool, |args| {
            let text = str_arg(&args[0])?.trim();
            if text.eq_ignore_ascii_case("true") {
                Ok(Value::Bool(true))
            } else if text.eq_ignore_ascii_case("false") {
                Ok(Value::Bool(false))
            } else {
                Err(HostError::Format(text.to_string()))
            }
        })
        .finish()
}

fn char_def() -> Arc<TypeDef> {
    let predicate = |builder: TypeBuilder, name: &str, test: fn(char) -> bool| {
        builder.static_method(name, [Ty::Char], Ty::Bool, move |args| {
            Ok(Value::Bool(test(char_arg(&args[0])?)))
        })
    };
    let builder = TypeBuilder::for_builtin(&Ty::Char, TypeKind::Struct);
    let builder = predicate(builder, "IsDigit", |c| c.is_ascii_digit());
    let builder = predicate(builder, "IsLetter", char::is_alphabetic);
    let builder = predicate(builder, "IsWhiteSpace", char::is_whitespace);
    let builder = predicate(builder, "IsUpper", char::is_uppercase);
    let builder = predicate(builder, "IsLower", char::is_lowercase);
    builder
        .static_method("ToUpper", [Ty::Char], Ty::Char, |args| {
            let c = char_arg(&args[0])?;
            Ok(Value::Char(c.to_uppercase().next().unwrap_or(c)))
        })
        .static_method("ToLower", [Ty::Char], Ty::Char, |args| {
            let c = char_arg(&args[0])?;
            Ok(Value::Char(c.to_lowercase().next().unwrap_or(c)))
        })
        .finish()
}

// ── Numerics ───────────────────────────────────────────────────────────

fn numeric_def(
    ty: Ty,
    min: Value,
    max: Value,
    parse: fn(&str) -> Option<Value>,
) -> (Ty, Arc<TypeDef>) {
    let def = TypeBuilder::for_builtin(&ty, TypeKind::Struct)
        .static_property("MinValue", ty.clone(), move || Ok(min.clone()))
        .static_property("MaxValue", ty.clone(), move || Ok(max.clone()))
        .static_method("Parse", [Ty::String], ty.clone(), move |args| {
            let text = str_arg(&args[0])?;
            parse(text.trim()).ok_or_else(|| HostError::Format(text.to_string()))
        })
        .finish();
    (ty, def)
}

fn numeric_defs() -> Vec<(Ty, Arc<TypeDef>)> {
    vec![
        numeric_def(Ty::SByte, i8::MIN.into(), i8::MAX.into(), |s| s.parse::<i8>().ok().map(Value::from)),
        numeric_def(Ty::Byte, u8::MIN.into(), u8::MAX.into(), |s| s.parse::<u8>().ok().map(Value::from)),
        numeric_def(Ty::Int16, i16::MIN.into(), i16::MAX.into(), |s| s.parse::<i16>().ok().map(Value::from)),
        numeric_def(Ty::UInt16, u16::MIN.into(), u16::MAX.into(), |s| s.parse::<u16>().ok().map(Value::from)),
        numeric_def(Ty::Int32, i32::MIN.into(), i32::MAX.into(), |s| s.parse::<i32>().ok().map(Value::from)),
        numeric_def(Ty::UInt32, u32::MIN.into(), u32::MAX.into(), |s| s.parse::<u32>().ok().map(Value::from)),
        numeric_def(Ty::Int64, i64::MIN.into(), i64::MAX.into(), |s| s.parse::<i64>().ok().map(Value::from)),
        numeric_def(Ty::UInt64, u64::MIN.into(), u64::MAX.into(), |s| s.parse::<u64>().ok().map(Value::from)),
        numeric_def(Ty::Single, f32::MIN.into(), f32::MAX.into(), |s| s.parse::<f32>().ok().map(Value::from)),
        numeric_def(Ty::Double, f64::MIN.into(), f64::MAX.into(), |s| s.parse::<f64>().ok().map(Value::from)),
        numeric_def(Ty::Decimal, Decimal::MIN.into(), Decimal::MAX.into(), |s| {
            crate::promote::parse_decimal(s).map(Value::from)
        }),
    ]
}

// ── DateTime, TimeSpan, Guid ───────────────────────────────────────────

fn date_from_parts(parts: &[Value]) -> Result<Value, HostError> {
    let mut n = [0u32; 6];
    for (slot, v) in n.iter_mut().zip(parts) {
        *slot = u32::try_from(i32_arg(v)?).map_err(|_| HostError::IndexOutOfRange)?;
    }
    let year = i32::try_from(n[0]).map_err(|_| HostError::IndexOutOfRange)?;
    NaiveDate::from_ymd_opt(year, n[1], n[2])
        .and_then(|d| d.and_hms_opt(n[3], n[4], n[5]))
        .map(Value::DateTime)
        .ok_or(HostError::IndexOutOfRange)
}

fn add_span(dt: NaiveDateTime, span: TimeDelta) -> Result<Value, HostError> {
    dt.checked_add_signed(span)
        .map(Value::DateTime)
        .ok_or_else(|| HostError::Overflow("DateTime".to_string()))
}

/// `value` units of `unit_ms` milliseconds, rounded to the millisecond.
fn span_of(value: f64, unit_ms: f64) -> Result<TimeDelta, HostError> {
    let ms = (value * unit_ms).round();
    if !ms.is_finite() || ms.abs() > i64::MAX as f64 {
        return Err(HostError::Overflow("TimeSpan".to_string()));
    }
    TimeDelta::try_milliseconds(ms as i64).ok_or_else(|| HostError::Overflow("TimeSpan".to_string()))
}

fn add_months(dt: NaiveDateTime, months: i32) -> Result<Value, HostError> {
    let shifted = if months >= 0 {
        dt.checked_add_months(Months::new(months.unsigned_abs()))
    } else {
        dt.checked_sub_months(Months::new(months.unsigned_abs()))
    };
    shifted
        .map(Value::DateTime)
        .ok_or_else(|| HostError::Overflow("DateTime".to_string()))
}

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    const DATE_TIMES: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%m/%d/%Y %H:%M:%S"];
    const DATES: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];
    DATE_TIMES
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(text, f).ok())
        .or_else(|| {
            DATES
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(text, f).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn datetime_def() -> Arc<TypeDef> {
    let dt = Ty::DateTime;
    let part = |builder: TypeBuilder, name: &str, get: fn(&NaiveDateTime) -> u32| {
        builder.property(name, Ty::Int32, move |this| {
            Ok(Value::Int32(get(&datetime_arg(this)?) as i32))
        })
    };
    let adder = |builder: TypeBuilder, name: &str, unit_ms: f64| {
        builder.method(name, [Ty::Double], Ty::DateTime, move |this, args| {
            add_span(datetime_arg(this)?, span_of(f64_arg(&args[0])?, unit_ms)?)
        })
    };

    let builder = TypeBuilder::for_builtin(&dt, TypeKind::Struct)
        .constructor([Ty::Int32, Ty::Int32, Ty::Int32], date_from_parts)
        .constructor(vec![Ty::Int32; 6], date_from_parts);
    let builder = part(builder, "Month", |d| d.month());
    let builder = part(builder, "Day", |d| d.day());
    let builder = part(builder, "Hour", |d| d.hour());
    let builder = part(builder, "Minute", |d| d.minute());
    let builder = part(builder, "Second", |d| d.second());
    let builder = part(builder, "DayOfYear", |d| d.ordinal());
    let builder = part(builder, "Millisecond", |d| d.and_utc().timestamp_subsec_millis());
    let builder = adder(builder, "AddDays", 86_400_000.0);
    let builder = adder(builder, "AddHours", 3_600_000.0);
    let builder = adder(builder, "AddMinutes", 60_000.0);
    let builder = adder(builder, "AddSeconds", 1_000.0);
    builder
        .property("Year", Ty::Int32, |this| Ok(Value::Int32(datetime_arg(this)?.year())))
        .property("Date", dt.clone(), |this| {
            let d = datetime_arg(this)?;
            Ok(Value::DateTime(d.date().and_time(chrono::NaiveTime::MIN)))
        })
        .property("TimeOfDay", Ty::TimeSpan, |this| {
            let d = datetime_arg(this)?;
            Ok(Value::TimeSpan(d.time() - chrono::NaiveTime::MIN))
        })
        .method("AddMonths", [Ty::Int32], dt.clone(), |this, args| {
            add_months(datetime_arg(this)?, i32_arg(&args[0])?)
        })
        .method("AddYears", [Ty::Int32], dt.clone(), |this, args| {
            let years = i32_arg(&args[0])?;
            let months = years.checked_mul(12).ok_or_else(|| HostError::Overflow("DateTime".into()))?;
            add_months(datetime_arg(this)?, months)
        })
        .method("Add", [Ty::TimeSpan], dt.clone(), |this, args| {
            add_span(datetime_arg(this)?, timespan_arg(&args[0])?)
        })
        .method("Subtract", [Ty::DateTime], Ty::TimeSpan, |this, args| {
            Ok(Value::TimeSpan(datetime_arg(this)? - datetime_arg(&args[0])?))
        })
        .method("Subtract", [Ty::TimeSpan], dt.clone(), |this, args| {
            add_span(datetime_arg(this)?, -timespan_arg(&args[0])?)
        })
        .static_property("Now", dt.clone(), || {
            Ok(Value::DateTime(chrono::Local::now().naive_local()))
        })
        .static_property("UtcNow", dt.clone(), || Ok(Value::DateTime(chrono::Utc::now().naive_utc())))
        .static_property("Today", dt.clone(), || {
            let today = chrono::Local::now().date_naive();
            Ok(Value::DateTime(today.and_time(chrono::NaiveTime::MIN)))
        })
        .static_property("MinValue", dt.clone(), || Ok(Value::DateTime(NaiveDateTime::MIN)))
        .static_property("MaxValue", dt.clone(), || Ok(Value::DateTime(NaiveDateTime::MAX)))
        .static_method("Parse", [Ty::String], dt.clone(), |args| {
            let text = str_arg(&args[0])?;
            parse_datetime(text.trim())
                .map(Value::DateTime)
                .ok_or_else(|| HostError::Format(text.to_string()))
        })
        .finish()
}

fn total(span: TimeDelta, unit_seconds: f64) -> f64 {
    (span.num_seconds() as f64 + f64::from(span.subsec_nanos()) / 1e9) / unit_seconds
}

fn timespan_def() -> Arc<TypeDef> {
    let ts = Ty::TimeSpan;
    let component = |builder: TypeBuilder, name: &str, get: fn(TimeDelta) -> i64| {
        builder.property(name, Ty::Int32, move |this| {
            Ok(Value::Int32(get(timespan_arg(this)?) as i32))
        })
    };
    let total_in = |builder: TypeBuilder, name: &str, unit_seconds: f64| {
        builder.property(name, Ty::Double, move |this| {
            Ok(Value::Double(total(timespan_arg(this)?, unit_seconds)))
        })
    };
    let from = |builder: TypeBuilder, name: &str, unit_ms: f64| {
        builder.static_method(name, [Ty::Double], Ty::TimeSpan, move |args| {
            span_of(f64_arg(&args[0])?, unit_ms).map(Value::TimeSpan)
        })
    };
    let from_parts = |args: &[Value]| -> Result<Value, HostError> {
        let mut secs = 0i64;
        let units: &[i64] = match args.len() {
            3 => &[3_600, 60, 1],
            _ => &[86_400, 3_600, 60, 1],
        };
        for (arg, unit) in args.iter().zip(units) {
            secs += i64::from(i32_arg(arg)?) * unit;
        }
        TimeDelta::try_seconds(secs)
            .map(Value::TimeSpan)
            .ok_or_else(|| HostError::Overflow("TimeSpan".to_string()))
    };

    let builder = TypeBuilder::for_builtin(&ts, TypeKind::Struct)
        .constructor(vec![Ty::Int32; 3], from_parts)
        .constructor(vec![Ty::Int32; 4], from_parts);
    let builder = component(builder, "Days", |t| t.num_days());
    let builder = component(builder, "Hours", |t| t.num_hours() % 24);
    let builder = component(builder, "Minutes", |t| t.num_minutes() % 60);
    let builder = component(builder, "Seconds", |t| t.num_seconds() % 60);
    let builder = component(builder, "Milliseconds", |t| t.num_milliseconds() % 1000);
    let builder = total_in(builder, "TotalDays", 86_400.0);
    let builder = total_in(builder, "TotalHours", 3_600.0);
    let builder = total_in(builder, "TotalMinutes", 60.0);
    let builder = total_in(builder, "TotalSeconds", 1.0);
    let builder = total_in(builder, "TotalMilliseconds", 0.001);
    let builder = from(builder, "FromDays", 86_400_000.0);
    let builder = from(builder, "FromHours", 3_600_000.0);
    let builder = from(builder, "FromMinutes", 60_000.0);
    let builder = from(builder, "FromSeconds", 1_000.0);
    let builder = from(builder, "FromMilliseconds", 1.0);
    builder
        .property("Ticks", Ty::Int64, |this| {
            let span = timespan_arg(this)?;
            span.num_nanoseconds()
                .map(|n| Value::Int64(n / 100))
                .ok_or_else(|| HostError::Overflow("Int64".to_string()))
        })
        .method("Add", [ts.clone()], ts.clone(), |this, args| {
            timespan_arg(this)?
                .checked_add(&timespan_arg(&args[0])?)
                .map(Value::TimeSpan)
                .ok_or_else(|| HostError::Overflow("TimeSpan".to_string()))
        })
        .method("Subtract", [ts.clone()], ts.clone(), |this, args| {
            timespan_arg(this)?
                .checked_sub(&timespan_arg(&args[0])?)
                .map(Value::TimeSpan)
                .ok_or_else(|| HostError::Overflow("TimeSpan".to_string()))
        })
        .method("Negate", [], ts.clone(), |this, _| Ok(Value::TimeSpan(-timespan_arg(this)?)))
        .method("Duration", [], ts.clone(), |this, _| Ok(Value::TimeSpan(timespan_arg(this)?.abs())))
        .static_property("Zero", ts.clone(), || Ok(Value::TimeSpan(TimeDelta::zero())))
        .finish()
}

fn guid_def() -> Arc<TypeDef> {
    let parse = |args: &[Value]| {
        let text = str_arg(&args[0])?;
        Uuid::parse_str(text.trim())
            .map(Value::Guid)
            .map_err(|_| HostError::Format(text.to_string()))
    };
    TypeBuilder::for_builtin(&Ty::Guid, TypeKind::Struct)
        .constructor([Ty::String], parse)
        .static_method("Parse", [Ty::String], Ty::Guid, parse)
        .static_method("NewGuid", [], Ty::Guid, |_| Ok(Value::Guid(Uuid::new_v4())))
        .static_property("Empty", Ty::Guid, || Ok(Value::Guid(Uuid::nil())))
        .finish()
}

// ── Nullable<T> ────────────────────────────────────────────────────────

fn nullable_def(inner: &Ty) -> Arc<TypeDef> {
    let default = Value::default_for(inner);
    TypeBuilder::for_builtin(&Ty::nullable(inner.clone()), TypeKind::Struct)
        .property("HasValue", Ty::Bool, |this| Ok(Value::Bool(!this.is_null())))
        .property("Value", inner.clone(), |this| match this {
            Value::Null => Err(HostError::Other(
                "nullable object must have a value".to_string(),
            )),
            v => Ok(v.clone()),
        })
        .method("GetValueOrDefault", [], inner.clone(), move |this, _| match this {
            Value::Null => Ok(default.clone()),
            v => Ok(v.clone()),
        })
        .finish()
}

// ── Math, Convert ──────────────────────────────────────────────────────

fn math_type() -> HostType {
    let mut builder = HostType::static_class("Math")
        .static_property("PI", Ty::Double, || Ok(Value::Double(std::f64::consts::PI)))
        .static_property("E", Ty::Double, || Ok(Value::Double(std::f64::consts::E)));

    for ty in [Ty::Int32, Ty::Int64, Ty::Single, Ty::Double, Ty::Decimal] {
        builder = builder.static_method("Abs", [ty.clone()], ty, |args| match &args[0] {
            Value::Int32(v) => v.checked_abs().map(Value::Int32).ok_or_else(|| HostError::Overflow("Int32".into())),
            Value::Int64(v) => v.checked_abs().map(Value::Int64).ok_or_else(|| HostError::Overflow("Int64".into())),
            Value::Single(v) => Ok(Value::Single(v.abs())),
            Value::Double(v) => Ok(Value::Double(v.abs())),
            Value::Decimal(v) => Ok(Value::Decimal(v.abs())),
            other => Err(mismatch("numeric", other)),
        });
    }
    for ty in [
        Ty::Int32,
        Ty::UInt32,
        Ty::Int64,
        Ty::UInt64,
        Ty::Single,
        Ty::Double,
        Ty::Decimal,
    ] {
        builder = builder
            .static_method("Min", [ty.clone(), ty.clone()], ty.clone(), |args| {
                pick(&args[0], &args[1], std::cmp::Ordering::Less)
            })
            .static_method("Max", [ty.clone(), ty.clone()], ty, |args| {
                pick(&args[0], &args[1], std::cmp::Ordering::Greater)
            });
    }

    builder
        .static_method("Round", [Ty::Double], Ty::Double, |args| {
            Ok(Value::Double(f64_arg(&args[0])?.round_ties_even()))
        })
        .static_method("Round", [Ty::Double, Ty::Int32], Ty::Double, |args| {
            let scale = 10f64.powi(i32_arg(&args[1])?);
            Ok(Value::Double((f64_arg(&args[0])? * scale).round_ties_even() / scale))
        })
        .static_method("Round", [Ty::Decimal], Ty::Decimal, |args| {
            Ok(Value::Decimal(dec_arg(&args[0])?.round()))
        })
        .static_method("Round", [Ty::Decimal, Ty::Int32], Ty::Decimal, |args| {
            let dp = u32::try_from(i32_arg(&args[1])?).map_err(|_| HostError::IndexOutOfRange)?;
            Ok(Value::Decimal(
                dec_arg(&args[0])?.round_dp_with_strategy(dp, RoundingStrategy::MidpointNearestEven),
            ))
        })
        .static_method("Floor", [Ty::Double], Ty::Double, |args| {
            Ok(Value::Double(f64_arg(&args[0])?.floor()))
        })
        .static_method("Floor", [Ty::Decimal], Ty::Decimal, |args| {
            Ok(Value::Decimal(dec_arg(&args[0])?.floor()))
        })
        .static_method("Ceiling", [Ty::Double], Ty::Double, |args| {
            Ok(Value::Double(f64_arg(&args[0])?.ceil()))
        })
        .static_method("Ceiling", [Ty::Decimal], Ty::Decimal, |args| {
            Ok(Value::Decimal(dec_arg(&args[0])?.ceil()))
        })
        .static_method("Sqrt", [Ty::Double], Ty::Double, |args| {
            Ok(Value::Double(f64_arg(&args[0])?.sqrt()))
        })
        .static_method("Pow", [Ty::Double, Ty::Double], Ty::Double, |args| {
            Ok(Value::Double(f64_arg(&args[0])?.powf(f64_arg(&args[1])?)))
        })
        .build()
}

fn pick(a: &Value, b: &Value, want: std::cmp::Ordering) -> Result<Value, HostError> {
    match a.compare(b) {
        Some(ord) if ord == want => Ok(a.clone()),
        Some(_) => Ok(b.clone()),
        None => Err(mismatch(&a.ty().to_string(), b)),
    }
}

/// `Convert.ToXxx(Object)`: strings are parsed, reals are rounded to the
/// nearest even integer, everything else converts as a checked cast.
fn convert_to(value: &Value, target: &Ty) -> Result<Value, HostError> {
    match value {
        Value::Null => Ok(Value::default_for(target)),
        Value::String(s) => {
            let text = s.trim();
            let parsed = match target {
                Ty::Bool => {
                    if text.eq_ignore_ascii_case("true") {
                        Some(Value::Bool(true))
                    } else if text.eq_ignore_ascii_case("false") {
                        Some(Value::Bool(false))
                    } else {
                        None
                    }
                }
                Ty::String => Some(value.clone()),
                _ => crate::promote::parse_number(text, target),
            };
            parsed.ok_or_else(|| HostError::Format(s.to_string()))
        }
        Value::Bool(b) => match target {
            Ty::Bool => Ok(value.clone()),
            Ty::String => Ok(Value::from(value.to_string())),
            _ => Value::Int32(i32::from(*b)).convert(target, true),
        },
        _ if *target == Ty::String => Ok(Value::from(value.to_string())),
        _ if *target == Ty::Bool => value
            .as_f64()
            .map(|v| Value::Bool(v != 0.0))
            .ok_or_else(|| mismatch("Boolean", value)),
        Value::Single(_) | Value::Double(_) if !matches!(target, Ty::Double | Ty::Decimal) => {
            Value::Double(f64_arg(value)?.round_ties_even()).convert(target, true)
        }
        Value::Decimal(d) if *target != Ty::Double && *target != Ty::Decimal => {
            Value::Decimal(d.round()).convert(target, true)
        }
        _ => value.convert(target, true),
    }
}

fn convert_type() -> HostType {
    [
        ("ToInt32", Ty::Int32),
        ("ToInt64", Ty::Int64),
        ("ToDouble", Ty::Double),
        ("ToDecimal", Ty::Decimal),
        ("ToBoolean", Ty::Bool),
        ("ToString", Ty::String),
    ]
    .into_iter()
    .fold(HostType::static_class("Convert"), |builder, (name, target)| {
        let ret = target.clone();
        builder.static_method(name, [Ty::Object], ret, move |args| convert_to(&args[0], &target))
    })
    .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call_static(ty: &Ty, name: &str, args: &[Value]) -> Value {
        let def = definition(ty).expect("builtin table");
        let arg_tys: Vec<Ty> = args.iter().map(Value::ty).collect();
        let method = def
            .methods(name, true)
            .find(|m| m.params == arg_tys)
            .expect("overload");
        (method.call)(&Value::Null, args).expect("call succeeds")
    }

    fn call(this: Value, name: &str, args: &[Value]) -> Value {
        let def = definition(&this.ty()).expect("builtin table");
        let arg_tys: Vec<Ty> = args.iter().map(Value::ty).collect();
        let method = def
            .methods(name, false)
            .find(|m| m.params == arg_tys)
            .expect("overload");
        (method.call)(&this, args).expect("call succeeds")
    }

    #[test]
    fn hierarchy_of_plain_types() {
        assert_eq!(self_and_base_types(&Ty::String), vec![Ty::String, Ty::Object]);
        assert_eq!(self_and_base_types(&Ty::Object), vec![Ty::Object]);
    }

    #[test]
    fn hierarchy_of_host_types() {
        let named = HostType::interface("INamed").build();
        let animal = HostType::class("Animal").implements(named.ty()).build();
        let dog = HostType::class("Dog")
            .base(animal.ty())
            .enumerable(Ty::String, |_| Ok(vec![]))
            .build();
        assert_eq!(
            self_and_base_types(&dog.ty()),
            vec![dog.ty(), animal.ty(), Ty::Object]
        );
        let all = supertypes(&dog.ty());
        assert!(all.contains(&named.ty()));
        assert!(all.contains(&Ty::enumerable(Ty::String)));
        assert_eq!(element_type(&dog.ty()), Some(Ty::String));
        assert_eq!(self_and_base_types(&named.ty()), vec![named.ty()]);
    }

    #[test]
    fn static_class_names() {
        assert!(matches!(builtin_type("math"), Some(Ty::Host(_))));
        assert_eq!(builtin_type("Int64"), Some(Ty::Int64));
        assert_eq!(builtin_type("Nope"), None);
    }

    #[test]
    fn string_members() {
        let s = Value::from("Hello");
        assert_eq!(call(s.clone(), "ToUpper", &[]), Value::from("HELLO"));
        assert_eq!(call(s.clone(), "IndexOf", &[Value::Char('l')]), Value::Int32(2));
        assert_eq!(
            call(s.clone(), "Substring", &[Value::Int32(1), Value::Int32(3)]),
            Value::from("ell")
        );
        let length = definition(&Ty::String).unwrap();
        let length = length.property("length", false).unwrap();
        assert_eq!((length.get)(&s).unwrap(), Value::Int32(5));
        assert_eq!(
            call_static(&Ty::String, "Compare", &[Value::from("a"), Value::from("b")]),
            Value::Int32(-1)
        );
    }

    #[test]
    fn math_and_convert() {
        let math = builtin_type("Math").unwrap();
        assert_eq!(
            call_static(&math, "Max", &[Value::Int32(3), Value::Int32(7)]),
            Value::Int32(7)
        );
        assert_eq!(call_static(&math, "Round", &[Value::Double(2.5)]), Value::Double(2.0));

        let convert = builtin_type("Convert").unwrap();
        let def = definition(&convert).unwrap();
        let to_int = def.methods("ToInt32", true).next().unwrap();
        assert_eq!((to_int.call)(&Value::Null, &[Value::from(" 42 ")]), Ok(Value::Int32(42)));
        assert_eq!((to_int.call)(&Value::Null, &[Value::Double(3.5)]), Ok(Value::Int32(4)));
        assert!((to_int.call)(&Value::Null, &[Value::from("x")]).is_err());
    }

    #[test]
    fn dates_and_spans() {
        let def = definition(&Ty::DateTime).unwrap();
        let ctor = &def.constructors()[0];
        let date = (ctor.call)(&[Value::Int32(2024), Value::Int32(1), Value::Int32(31)]).unwrap();
        assert_eq!(
            call(date.clone(), "AddMonths", &[Value::Int32(1)]).to_string(),
            "02/29/2024 00:00:00"
        );
        let later = call(date.clone(), "AddDays", &[Value::Double(1.5)]);
        let diff = call(later, "Subtract", &[date]);
        assert_eq!(diff.to_string(), "1.12:00:00");
    }

    #[test]
    fn nullable_members() {
        let def = definition(&Ty::nullable(Ty::Int32)).unwrap();
        let has_value = &def.property("HasValue", false).unwrap().get;
        assert_eq!(has_value(&Value::Null).unwrap(), Value::Bool(false));
        assert_eq!(has_value(&Value::Int32(1)).unwrap(), Value::Bool(true));
        let or_default = def.methods("GetValueOrDefault", false).next().unwrap();
        assert_eq!((or_default.call)(&Value::Null, &[]).unwrap(), Value::Int32(0));
    }

    #[test]
    fn enumerate_arrays_and_hosts() {
        let arr = Value::array(Ty::Int32, vec![Value::Int32(1), Value::Int32(2)]);
        assert_eq!(enumerate(&arr).unwrap().len(), 2);
        let bag = HostType::class("Bag")
            .enumerable(Ty::Int32, |_| Ok(vec![Value::Int32(9)]))
            .build();
        let obj = Value::object(&bag, ());
        assert_eq!(enumerate(&obj).unwrap(), vec![Value::Int32(9)]);
        assert_eq!(enumerate(&Value::Null), Err(HostError::NullReference));
    }
}

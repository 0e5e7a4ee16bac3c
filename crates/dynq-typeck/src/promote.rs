//! The type-promotion lattice.
//!
//! Pure functions over [`Ty`]: which numeric family a type belongs to,
//! whether a value of one type may be used where another is expected, and
//! which of two target types is the better conversion. Literal re-parsing
//! (`parse_number`, `parse_enum`) lives here too; the parser decides when
//! a literal is eligible.

use std::cmp::Ordering;
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::builtins::{element_type, supertypes};
use crate::host::TypeKind;
use crate::ty::Ty;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericKind {
    /// `Char`, `Single`, `Double`, `Decimal`.
    Real,
    SignedIntegral,
    UnsignedIntegral,
}

/// Numeric family of a type, looking through `T?`. Enums are not numeric.
pub fn numeric_kind(ty: &Ty) -> Option<NumericKind> {
    match ty.non_nullable() {
        Ty::Char | Ty::Single | Ty::Double | Ty::Decimal => Some(NumericKind::Real),
        Ty::SByte | Ty::Int16 | Ty::Int32 | Ty::Int64 => Some(NumericKind::SignedIntegral),
        Ty::Byte | Ty::UInt16 | Ty::UInt32 | Ty::UInt64 => Some(NumericKind::UnsignedIntegral),
        _ => None,
    }
}

pub fn is_numeric(ty: &Ty) -> bool {
    numeric_kind(ty).is_some()
}

pub fn is_signed_integral(ty: &Ty) -> bool {
    numeric_kind(ty) == Some(NumericKind::SignedIntegral)
}

pub fn is_unsigned_integral(ty: &Ty) -> bool {
    numeric_kind(ty) == Some(NumericKind::UnsignedIntegral)
}

/// Implicit numeric widenings, per source type (the target list includes
/// the source itself).
fn implicit_numeric_targets(source: &Ty) -> Option<&'static [Ty]> {
    use Ty::*;
    let targets: &'static [Ty] = match source {
        SByte => &[SByte, Int16, Int32, Int64, Single, Double, Decimal],
        Byte => &[Byte, Int16, UInt16, Int32, UInt32, Int64, UInt64, Single, Double, Decimal],
        Int16 => &[Int16, Int32, Int64, Single, Double, Decimal],
        UInt16 => &[UInt16, Int32, UInt32, Int64, UInt64, Single, Double, Decimal],
        Int32 => &[Int32, Int64, Single, Double, Decimal],
        UInt32 => &[UInt32, Int64, UInt64, Single, Double, Decimal],
        Int64 => &[Int64, Single, Double, Decimal],
        UInt64 => &[UInt64, Single, Double, Decimal],
        Single => &[Single, Double],
        _ => return None,
    };
    Some(targets)
}

/// Whether a value of type `source` can be used where `target` is expected
/// without an explicit conversion.
pub fn is_compatible_with(source: &Ty, target: &Ty) -> bool {
    if source == target {
        return true;
    }
    if !target.is_value_type() {
        return is_assignable_from(target, source);
    }
    let st = source.non_nullable();
    let tt = target.non_nullable();
    if source.is_nullable() && !target.is_nullable() {
        return false;
    }
    match implicit_numeric_targets(st) {
        Some(targets) => targets.contains(tt),
        None => st == tt,
    }
}

/// Reference assignability: `target` is `source`, a base of it, an
/// interface it implements, or `Object`. Arrays and enumerables are
/// covariant in reference element types.
pub fn is_assignable_from(target: &Ty, source: &Ty) -> bool {
    if target == source || *target == Ty::Object {
        return true;
    }
    match (target, source) {
        (Ty::Array(t, trank), Ty::Array(s, srank)) => {
            trank == srank && !s.is_value_type() && is_assignable_from(t, s)
        }
        (Ty::Enumerable(t), _) => match element_type(source) {
            Some(s) => s == **t || (!s.is_value_type() && is_assignable_from(t, &s)),
            None => false,
        },
        (Ty::Host(_), _) => supertypes(source).contains(target),
        _ => false,
    }
}

/// Whether `ty` is an interface type.
pub fn is_interface(ty: &Ty) -> bool {
    match ty {
        Ty::Enumerable(_) => true,
        Ty::Host(h) => h.kind() == TypeKind::Interface,
        _ => false,
    }
}

/// Betterness of converting an argument of type `source` to `t1` rather
/// than `t2`. `Greater` means `t1` is the better target.
pub fn compare_conversions(source: &Ty, t1: &Ty, t2: &Ty) -> Ordering {
    if t1 == t2 {
        return Ordering::Equal;
    }
    if source == t1 {
        return Ordering::Greater;
    }
    if source == t2 {
        return Ordering::Less;
    }
    let t1_to_t2 = is_compatible_with(t1, t2);
    let t2_to_t1 = is_compatible_with(t2, t1);
    if t1_to_t2 && !t2_to_t1 {
        return Ordering::Greater;
    }
    if t2_to_t1 && !t1_to_t2 {
        return Ordering::Less;
    }
    if is_signed_integral(t1) && is_unsigned_integral(t2) {
        return Ordering::Greater;
    }
    if is_signed_integral(t2) && is_unsigned_integral(t1) {
        return Ordering::Less;
    }
    Ordering::Equal
}

/// Re-read numeric literal text as the numeric type `ty` (or its nullable
/// form). `None` when the text does not fit or `ty` is not numeric.
pub fn parse_number(text: &str, ty: &Ty) -> Option<Value> {
    let value = match ty.non_nullable() {
        Ty::SByte => Value::SByte(text.parse().ok()?),
        Ty::Byte => Value::Byte(text.parse().ok()?),
        Ty::Int16 => Value::Int16(text.parse().ok()?),
        Ty::UInt16 => Value::UInt16(text.parse().ok()?),
        Ty::Int32 => Value::Int32(text.parse().ok()?),
        Ty::UInt32 => Value::UInt32(text.parse().ok()?),
        Ty::Int64 => Value::Int64(text.parse().ok()?),
        Ty::UInt64 => Value::UInt64(text.parse().ok()?),
        Ty::Single => Value::Single(text.trim_end_matches(['f', 'F']).parse().ok()?),
        Ty::Double => Value::Double(text.parse().ok()?),
        Ty::Decimal => Value::Decimal(parse_decimal(text)?),
        _ => return None,
    };
    Some(value)
}

pub fn parse_decimal(text: &str) -> Option<Decimal> {
    if text.contains(['e', 'E']) {
        Decimal::from_scientific(text).ok()
    } else {
        Decimal::from_str(text).ok()
    }
}

/// Look up `name` as a member of the enum type `ty`, ignoring case.
pub fn parse_enum(name: &str, ty: &Ty) -> Option<Value> {
    match ty {
        Ty::Enum(e) => e.member(name).map(|v| Value::Enum(e.clone(), v)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostType;
    use crate::ty::EnumType;

    #[test]
    fn numeric_kinds() {
        assert_eq!(numeric_kind(&Ty::Char), Some(NumericKind::Real));
        assert_eq!(numeric_kind(&Ty::nullable(Ty::Int32)), Some(NumericKind::SignedIntegral));
        assert_eq!(numeric_kind(&Ty::UInt16), Some(NumericKind::UnsignedIntegral));
        let color = Ty::Enum(EnumType::new("Color", [("Red", 0)]));
        assert_eq!(numeric_kind(&color), None);
        assert_eq!(numeric_kind(&Ty::Bool), None);
    }

    #[test]
    fn implicit_numeric_table() {
        assert!(is_compatible_with(&Ty::SByte, &Ty::Decimal));
        assert!(!is_compatible_with(&Ty::SByte, &Ty::UInt16));
        assert!(is_compatible_with(&Ty::Byte, &Ty::UInt64));
        assert!(is_compatible_with(&Ty::Int32, &Ty::Single));
        assert!(!is_compatible_with(&Ty::Int32, &Ty::UInt32));
        assert!(!is_compatible_with(&Ty::Int64, &Ty::Int32));
        assert!(is_compatible_with(&Ty::UInt32, &Ty::Int64));
        assert!(is_compatible_with(&Ty::Single, &Ty::Double));
        assert!(!is_compatible_with(&Ty::Double, &Ty::Decimal));
        assert!(!is_compatible_with(&Ty::Char, &Ty::Int32));
    }

    #[test]
    fn nullable_wrapping() {
        let int_n = Ty::nullable(Ty::Int32);
        assert!(is_compatible_with(&Ty::Int32, &int_n));
        assert!(is_compatible_with(&int_n, &Ty::nullable(Ty::Int64)));
        assert!(!is_compatible_with(&int_n, &Ty::Int32));
        assert!(is_compatible_with(&Ty::Bool, &Ty::nullable(Ty::Bool)));
    }

    #[test]
    fn reference_assignability() {
        let animal = HostType::class("Animal").build();
        let dog = HostType::class("Dog").base(animal.ty()).build();
        assert!(is_compatible_with(&dog.ty(), &animal.ty()));
        assert!(!is_compatible_with(&animal.ty(), &dog.ty()));
        assert!(is_compatible_with(&Ty::Int32, &Ty::Object));
        assert!(is_compatible_with(&Ty::array(dog.ty()), &Ty::array(animal.ty())));
        assert!(is_compatible_with(&Ty::array(dog.ty()), &Ty::enumerable(animal.ty())));
        assert!(is_compatible_with(&Ty::array(Ty::Int32), &Ty::enumerable(Ty::Int32)));
        assert!(!is_compatible_with(&Ty::array(Ty::Int32), &Ty::enumerable(Ty::Object)));
        assert!(!is_compatible_with(&Ty::String, &dog.ty()));
    }

    #[test]
    fn interfaces_are_assignable() {
        let named = HostType::interface("INamed").build();
        let person = HostType::class("Person").implements(named.ty()).build();
        assert!(is_assignable_from(&named.ty(), &person.ty()));
        assert!(is_interface(&named.ty()));
    }

    #[test]
    fn conversion_betterness() {
        use Ordering::*;
        assert_eq!(compare_conversions(&Ty::Int32, &Ty::Int32, &Ty::Int64), Greater);
        assert_eq!(compare_conversions(&Ty::Int32, &Ty::Int64, &Ty::Double), Greater);
        assert_eq!(compare_conversions(&Ty::Byte, &Ty::UInt32, &Ty::Int32), Less);
        assert_eq!(compare_conversions(&Ty::Byte, &Ty::Int64, &Ty::UInt64), Greater);
        assert_eq!(compare_conversions(&Ty::Int32, &Ty::Double, &Ty::Double), Equal);
    }

    #[test]
    fn literal_reparse() {
        assert_eq!(parse_number("5", &Ty::Decimal), Some(Value::Decimal(Decimal::from(5))));
        assert_eq!(parse_number("-5", &Ty::nullable(Ty::Int64)), Some(Value::Int64(-5)));
        assert_eq!(parse_number("300", &Ty::Byte), None);
        assert_eq!(parse_number("1.5e2", &Ty::Decimal), Some(Value::Decimal(Decimal::from(150))));
        assert_eq!(parse_number("1", &Ty::Bool), None);

        let color = EnumType::new("Color", [("Red", 0), ("Green", 1)]);
        let ty = Ty::Enum(color.clone());
        assert_eq!(parse_enum("green", &ty), Some(Value::Enum(color, 1)));
        assert_eq!(parse_enum("Blue", &ty), None);
    }
}

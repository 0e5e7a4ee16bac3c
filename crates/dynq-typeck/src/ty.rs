//! Static types of the dynq host type system.
//!
//! `Ty` covers the primitive value types, the reference types the
//! expression language knows natively (`Object`, `String`, arrays,
//! enumerables, lambdas) and three open-ended families: caller-registered
//! host types, enum types and synthesized record types. The open families
//! compare by identity (a process-unique id), never by name.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::host::{HostType, TypeKind};
use crate::records::RecordType;

static NEXT_TYPE_ID: AtomicU32 = AtomicU32::new(1);

/// Allocate an id for a nominal type. Ids are never reused.
pub(crate) fn next_type_id() -> u32 {
    NEXT_TYPE_ID.fetch_add(1, Ordering::Relaxed)
}

/// A dynq static type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Ty {
    Object,
    Bool,
    Char,
    String,
    SByte,
    Byte,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Single,
    Double,
    Decimal,
    DateTime,
    TimeSpan,
    Guid,
    /// Return type of methods that produce no value.
    Void,
    /// `T?` over a non-nullable value type.
    Nullable(Box<Ty>),
    /// Element type and rank.
    Array(Box<Ty>, u32),
    /// `IEnumerable<T>`.
    Enumerable(Box<Ty>),
    /// The type of a lambda: parameter types and result type.
    Fun(Vec<Ty>, Box<Ty>),
    Enum(EnumType),
    Host(HostType),
    Record(RecordType),
}

impl Ty {
    pub fn nullable(inner: Ty) -> Ty {
        Ty::Nullable(Box::new(inner))
    }

    pub fn array(elem: Ty) -> Ty {
        Ty::Array(Box::new(elem), 1)
    }

    pub fn enumerable(elem: Ty) -> Ty {
        Ty::Enumerable(Box::new(elem))
    }

    pub fn fun(params: Vec<Ty>, ret: Ty) -> Ty {
        Ty::Fun(params, Box::new(ret))
    }

    pub fn is_nullable(&self) -> bool {
        matches!(self, Ty::Nullable(_))
    }

    /// The underlying type of `T?`, or the type itself.
    pub fn non_nullable(&self) -> &Ty {
        match self {
            Ty::Nullable(inner) => inner,
            other => other,
        }
    }

    /// Whether values of this type are copied rather than referenced.
    ///
    /// Records are reference types; host types are value types only when
    /// registered as structs.
    pub fn is_value_type(&self) -> bool {
        match self {
            Ty::Object
            | Ty::String
            | Ty::Void
            | Ty::Array(..)
            | Ty::Enumerable(_)
            | Ty::Fun(..)
            | Ty::Record(_) => false,
            Ty::Host(host) => host.kind() == TypeKind::Struct,
            _ => true,
        }
    }

    pub fn is_enum(&self) -> bool {
        matches!(self, Ty::Enum(_))
    }

    /// The nullable form of a value type, or `None` when the type has none.
    pub fn nullable_form(&self) -> Option<Ty> {
        if self.is_value_type() && !self.is_nullable() {
            Some(Ty::nullable(self.clone()))
        } else {
            None
        }
    }

    /// Names accepted in expression text for the predefined types, paired
    /// with the type they denote. `Math` and `Convert` are handled by the
    /// builtin tables since they are static classes.
    pub fn predefined(name: &str) -> Option<Ty> {
        const TABLE: &[(&str, Ty)] = &[
            ("Object", Ty::Object),
            ("Boolean", Ty::Bool),
            ("Char", Ty::Char),
            ("String", Ty::String),
            ("SByte", Ty::SByte),
            ("Byte", Ty::Byte),
            ("Int16", Ty::Int16),
            ("UInt16", Ty::UInt16),
            ("Int32", Ty::Int32),
            ("UInt32", Ty::UInt32),
            ("Int64", Ty::Int64),
            ("UInt64", Ty::UInt64),
            ("Single", Ty::Single),
            ("Double", Ty::Double),
            ("Decimal", Ty::Decimal),
            ("DateTime", Ty::DateTime),
            ("TimeSpan", Ty::TimeSpan),
            ("Guid", Ty::Guid),
        ];
        TABLE
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, ty)| ty.clone())
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Object => write!(f, "Object"),
            Ty::Bool => write!(f, "Boolean"),
            Ty::Char => write!(f, "Char"),
            Ty::String => write!(f, "String"),
            Ty::SByte => write!(f, "SByte"),
            Ty::Byte => write!(f, "Byte"),
            Ty::Int16 => write!(f, "Int16"),
            Ty::UInt16 => write!(f, "UInt16"),
            Ty::Int32 => write!(f, "Int32"),
            Ty::UInt32 => write!(f, "UInt32"),
            Ty::Int64 => write!(f, "Int64"),
            Ty::UInt64 => write!(f, "UInt64"),
            Ty::Single => write!(f, "Single"),
            Ty::Double => write!(f, "Double"),
            Ty::Decimal => write!(f, "Decimal"),
            Ty::DateTime => write!(f, "DateTime"),
            Ty::TimeSpan => write!(f, "TimeSpan"),
            Ty::Guid => write!(f, "Guid"),
            Ty::Void => write!(f, "Void"),
            Ty::Nullable(inner) => write!(f, "{inner}?"),
            Ty::Array(elem, rank) => {
                write!(f, "{elem}[")?;
                for _ in 1..*rank {
                    write!(f, ",")?;
                }
                write!(f, "]")
            }
            Ty::Enumerable(elem) => write!(f, "IEnumerable<{elem}>"),
            Ty::Fun(params, ret) => {
                write!(f, "Func<")?;
                for p in params {
                    write!(f, "{p}, ")?;
                }
                write!(f, "{ret}>")
            }
            Ty::Enum(e) => write!(f, "{}", e.name()),
            Ty::Host(h) => write!(f, "{}", h.name()),
            Ty::Record(r) => write!(f, "{}", r.name()),
        }
    }
}

// ── Enums ──────────────────────────────────────────────────────────────

struct EnumInner {
    id: u32,
    name: String,
    members: Vec<(String, i64)>,
}

/// A caller-registered enum type: a name and its named integral members.
#[derive(Clone)]
pub struct EnumType(Arc<EnumInner>);

impl EnumType {
    pub fn new<N: Into<String>>(
        name: impl Into<String>,
        members: impl IntoIterator<Item = (N, i64)>,
    ) -> Self {
        EnumType(Arc::new(EnumInner {
            id: next_type_id(),
            name: name.into(),
            members: members.into_iter().map(|(n, v)| (n.into(), v)).collect(),
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn members(&self) -> &[(String, i64)] {
        &self.0.members
    }

    /// Look up a member by name, ignoring case.
    pub fn member(&self, name: &str) -> Option<i64> {
        self.0
            .members
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|&(_, v)| v)
    }

    /// The member name for a value, if one is declared.
    pub fn name_of(&self, value: i64) -> Option<&str> {
        self.0
            .members
            .iter()
            .find(|&&(_, v)| v == value)
            .map(|(n, _)| n.as_str())
    }
}

impl PartialEq for EnumType {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for EnumType {}

impl Hash for EnumType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for EnumType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Enum({})", self.0.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names() {
        assert_eq!(Ty::nullable(Ty::Int32).to_string(), "Int32?");
        assert_eq!(Ty::Array(Box::new(Ty::String), 2).to_string(), "String[,]");
        assert_eq!(Ty::enumerable(Ty::Double).to_string(), "IEnumerable<Double>");
        assert_eq!(
            Ty::fun(vec![Ty::Int32], Ty::Bool).to_string(),
            "Func<Int32, Boolean>"
        );
    }

    #[test]
    fn value_types_and_nullable_forms() {
        assert!(Ty::Int32.is_value_type());
        assert!(!Ty::String.is_value_type());
        assert_eq!(Ty::Int32.nullable_form(), Some(Ty::nullable(Ty::Int32)));
        assert_eq!(Ty::nullable(Ty::Int32).nullable_form(), None);
        assert_eq!(Ty::String.nullable_form(), None);
    }

    #[test]
    fn enum_identity_is_not_structural() {
        let a = EnumType::new("Color", [("Red", 0), ("Green", 1)]);
        let b = EnumType::new("Color", [("Red", 0), ("Green", 1)]);
        assert_ne!(Ty::Enum(a.clone()), Ty::Enum(b));
        assert_eq!(Ty::Enum(a.clone()), Ty::Enum(a.clone()));
        assert_eq!(a.member("green"), Some(1));
        assert_eq!(a.name_of(0), Some("Red"));
    }

    #[test]
    fn predefined_names_ignore_case() {
        assert_eq!(Ty::predefined("int32"), Some(Ty::Int32));
        assert_eq!(Ty::predefined("DATETIME"), Some(Ty::DateTime));
        assert_eq!(Ty::predefined("Int"), None);
    }
}

//! dynq type system: static types, runtime values, host capability tables,
//! the type-promotion lattice, overload resolution and structural record
//! synthesis.
//!
//! Nothing here knows about source text. The parser asks questions of this
//! crate ("is `S` usable as `T`?", "which of these methods wins?", "give me
//! the record type for these fields") and builds its tree from the answers.

pub mod builtins;
pub mod host;
pub mod overload;
pub mod promote;
pub mod records;
pub mod signatures;
pub mod ty;
pub mod value;

pub use host::{HostError, HostType, TypeDef, TypeKind};
pub use overload::{resolve, Argument, Candidate, Resolution};
pub use records::{record_types, FieldDescriptor, RecordType, RecordTypeFactory, RecordValue};
pub use ty::{EnumType, Ty};
pub use value::Value;

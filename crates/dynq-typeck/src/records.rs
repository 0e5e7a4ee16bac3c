//! Structural record types for `new(...)` projections.
//!
//! Every distinct ordered list of (field name, field type) pairs maps to
//! exactly one [`RecordType`], created on first use and kept for the life
//! of the process. Instances compare and hash structurally.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use rustc_hash::{FxHashMap, FxHasher};

use crate::host::{HostError, HostType, TypeDef};
use crate::ty::{next_type_id, Ty};
use crate::value::Value;

/// One field of a record: a non-empty name and its type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldDescriptor {
    pub name: String,
    pub ty: Ty,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, ty: Ty) -> Self {
        let name = name.into();
        debug_assert!(!name.is_empty(), "record field names are non-empty");
        FieldDescriptor { name, ty }
    }
}

fn fx_hash<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = FxHasher::default();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Cache key for the factory.
///
/// Equality is positional; the hash is an XOR over the fields and so does
/// not see their order. Permutations of the same fields collide and are
/// told apart by the full comparison.
#[derive(Clone, Debug)]
pub struct Signature {
    fields: Vec<FieldDescriptor>,
    hash: u64,
}

impl Signature {
    pub fn new(fields: &[FieldDescriptor]) -> Self {
        let hash = fields
            .iter()
            .fold(0, |acc, f| acc ^ fx_hash(f.name.as_str()) ^ fx_hash(&f.ty));
        Signature {
            fields: fields.to_vec(),
            hash,
        }
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn hash_code(&self) -> u64 {
        self.hash
    }
}

impl PartialEq for Signature {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
    }
}

impl Eq for Signature {}

impl Hash for Signature {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

// ── Record types ───────────────────────────────────────────────────────

struct RecordInner {
    id: u32,
    name: String,
    fields: Vec<FieldDescriptor>,
    def: Arc<TypeDef>,
}

/// A synthesized record type. Identity is the type, not its shape: two
/// factories produce distinct types for the same signature.
#[derive(Clone)]
pub struct RecordType(Arc<RecordInner>);

impl RecordType {
    fn synthesize(name: String, fields: Vec<FieldDescriptor>) -> Self {
        let def = fields
            .iter()
            .enumerate()
            .fold(HostType::class(name.clone()), |builder, (index, field)| {
                builder.property(field.name.clone(), field.ty.clone(), move |this| {
                    match this {
                        Value::Record(record) => Ok(record.values[index].clone()),
                        Value::Null => Err(HostError::NullReference),
                        other => Err(HostError::TypeMismatch {
                            expected: "record".to_string(),
                            found: other.ty().to_string(),
                        }),
                    }
                })
            })
            .finish();
        RecordType(Arc::new(RecordInner {
            id: next_type_id(),
            name,
            fields,
            def,
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.0.fields
    }

    /// Accessor table: one read-only property per field.
    pub fn def(&self) -> &Arc<TypeDef> {
        &self.0.def
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.0
            .fields
            .iter()
            .position(|f| f.name.eq_ignore_ascii_case(name))
    }
}

impl PartialEq for RecordType {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for RecordType {}

impl Hash for RecordType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.0.name)?;
        for (i, field) in self.0.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", field.name, field.ty)?;
        }
        write!(f, ")")
    }
}

// ── Instances ──────────────────────────────────────────────────────────

/// An instance of a record type, field values in declaration order.
#[derive(Clone, Debug)]
pub struct RecordValue {
    ty: RecordType,
    values: Box<[Value]>,
}

impl RecordValue {
    pub fn new(ty: RecordType, values: Vec<Value>) -> Self {
        debug_assert_eq!(ty.fields().len(), values.len());
        RecordValue {
            ty,
            values: values.into_boxed_slice(),
        }
    }

    pub fn record_type(&self) -> &RecordType {
        &self.ty
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.ty.field_index(name).map(|i| &self.values[i])
    }

    /// Replace a field value. Returns `false` when no such field exists.
    pub fn set(&mut self, name: &str, value: Value) -> bool {
        match self.ty.field_index(name) {
            Some(i) => {
                self.values[i] = value;
                true
            }
            None => false,
        }
    }
}

impl PartialEq for RecordValue {
    fn eq(&self, other: &Self) -> bool {
        self.ty == other.ty && self.values.iter().zip(other.values.iter()).all(|(a, b)| a == b)
    }
}

impl Eq for RecordValue {}

impl Hash for RecordValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let folded = self.values.iter().fold(0u64, |acc, v| acc ^ fx_hash(v));
        state.write_u64(folded);
    }
}

impl fmt::Display for RecordValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (field, value)) in self.ty.fields().iter().zip(self.values.iter()).enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", field.name, value)?;
        }
        write!(f, "}}")
    }
}

// ── Factory ────────────────────────────────────────────────────────────

/// Interning cache from signature to record type.
///
/// Hits take a shared read lock. A miss takes the upgradable lock, which
/// admits readers but excludes other upgraders, re-checks, synthesizes, and
/// only then upgrades to a write lock for the insert.
pub struct RecordTypeFactory {
    classes: RwLock<FxHashMap<Signature, RecordType>>,
    class_count: AtomicU32,
}

impl RecordTypeFactory {
    pub fn new() -> Self {
        RecordTypeFactory {
            classes: RwLock::new(FxHashMap::default()),
            class_count: AtomicU32::new(0),
        }
    }

    pub fn get_or_create(&self, fields: &[FieldDescriptor]) -> RecordType {
        let signature = Signature::new(fields);
        if let Some(ty) = self.classes.read().get(&signature) {
            return ty.clone();
        }

        let classes = self.classes.upgradable_read();
        if let Some(ty) = classes.get(&signature) {
            return ty.clone();
        }

        let n = self.class_count.fetch_add(1, Ordering::Relaxed) + 1;
        let ty = RecordType::synthesize(format!("DynamicClass{n}"), signature.fields.clone());
        tracing::debug!(name = ty.name(), fields = fields.len(), "synthesized record type");

        let mut classes = RwLockUpgradableReadGuard::upgrade(classes);
        classes.insert(signature, ty.clone());
        ty
    }

    /// Number of record types created so far.
    pub fn len(&self) -> usize {
        self.classes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RecordTypeFactory {
    fn default() -> Self {
        Self::new()
    }
}

static RECORD_TYPES: OnceLock<RecordTypeFactory> = OnceLock::new();

/// The process-wide record type factory.
pub fn record_types() -> &'static RecordTypeFactory {
    RECORD_TYPES.get_or_init(RecordTypeFactory::new)
}

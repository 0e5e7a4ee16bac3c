//! Built-in operator and aggregate signature tables.
//!
//! Binary and unary operators are typed by resolving their operands against
//! a fixed list of signatures, exactly like a method call. The tables are
//! built once and shared.

use std::sync::OnceLock;

use crate::overload::Candidate;
use crate::ty::Ty;

/// One operator overload: the operand types it accepts.
#[derive(Clone, Debug, PartialEq)]
pub struct OperatorSig {
    pub params: Vec<Ty>,
}

impl Candidate for OperatorSig {
    fn param_types(&self) -> &[Ty] {
        &self.params
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorSet {
    /// `&&`, `||`
    Logical,
    /// `*`, `/`, `%`
    Arithmetic,
    /// `<`, `<=`, `>`, `>=`
    Relational,
    /// `==`, `!=`
    Equality,
    Add,
    Subtract,
    /// Unary `-`
    Negation,
    /// `!`
    Not,
}

struct OperatorTables {
    logical: Vec<OperatorSig>,
    arithmetic: Vec<OperatorSig>,
    relational: Vec<OperatorSig>,
    equality: Vec<OperatorSig>,
    add: Vec<OperatorSig>,
    subtract: Vec<OperatorSig>,
    negation: Vec<OperatorSig>,
    not: Vec<OperatorSig>,
}

/// `(T, T)` and `(T?, T?)` for each type.
fn binary(types: &[Ty]) -> Vec<OperatorSig> {
    types
        .iter()
        .flat_map(|t| {
            let n = Ty::nullable(t.clone());
            [
                OperatorSig { params: vec![t.clone(), t.clone()] },
                OperatorSig { params: vec![n.clone(), n] },
            ]
        })
        .collect()
}

/// `(T)` and `(T?)` for each type.
fn unary(types: &[Ty]) -> Vec<OperatorSig> {
    types
        .iter()
        .flat_map(|t| {
            [
                OperatorSig { params: vec![t.clone()] },
                OperatorSig { params: vec![Ty::nullable(t.clone())] },
            ]
        })
        .collect()
}

/// `(A, B)` and `(A?, B?)`.
fn mixed(a: Ty, b: Ty) -> [OperatorSig; 2] {
    [
        OperatorSig { params: vec![a.clone(), b.clone()] },
        OperatorSig { params: vec![Ty::nullable(a), Ty::nullable(b)] },
    ]
}

fn build_operator_tables() -> OperatorTables {
    let arithmetic = binary(&[
        Ty::Int32,
        Ty::UInt32,
        Ty::Int64,
        Ty::UInt64,
        Ty::Single,
        Ty::Double,
        Ty::Decimal,
    ]);

    let mut relational = arithmetic.clone();
    relational.extend(binary(&[Ty::String, Ty::Char, Ty::DateTime, Ty::TimeSpan]));

    let mut equality = relational.clone();
    equality.extend(binary(&[Ty::Bool, Ty::Guid]));

    let mut add = arithmetic.clone();
    add.extend(mixed(Ty::DateTime, Ty::TimeSpan));
    add.extend(mixed(Ty::TimeSpan, Ty::TimeSpan));

    let mut subtract = add.clone();
    subtract.extend(mixed(Ty::DateTime, Ty::DateTime));

    OperatorTables {
        logical: binary(&[Ty::Bool]),
        arithmetic,
        relational,
        equality,
        add,
        subtract,
        negation: unary(&[Ty::Int32, Ty::Int64, Ty::Single, Ty::Double, Ty::Decimal]),
        not: unary(&[Ty::Bool]),
    }
}

static OPERATORS: OnceLock<OperatorTables> = OnceLock::new();

impl OperatorSet {
    pub fn signatures(self) -> &'static [OperatorSig] {
        let t = OPERATORS.get_or_init(build_operator_tables);
        match self {
            OperatorSet::Logical => &t.logical,
            OperatorSet::Arithmetic => &t.arithmetic,
            OperatorSet::Relational => &t.relational,
            OperatorSet::Equality => &t.equality,
            OperatorSet::Add => &t.add,
            OperatorSet::Subtract => &t.subtract,
            OperatorSet::Negation => &t.negation,
            OperatorSet::Not => &t.not,
        }
    }
}

// ── Aggregates ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateKind {
    Where,
    Select,
    OrderBy,
    OrderByDescending,
    Any,
    All,
    Count,
    Min,
    Max,
    Sum,
    Average,
    First,
    FirstOrDefault,
    Last,
    LastOrDefault,
    Distinct,
}

impl AggregateKind {
    pub fn name(self) -> &'static str {
        match self {
            AggregateKind::Where => "Where",
            AggregateKind::Select => "Select",
            AggregateKind::OrderBy => "OrderBy",
            AggregateKind::OrderByDescending => "OrderByDescending",
            AggregateKind::Any => "Any",
            AggregateKind::All => "All",
            AggregateKind::Count => "Count",
            AggregateKind::Min => "Min",
            AggregateKind::Max => "Max",
            AggregateKind::Sum => "Sum",
            AggregateKind::Average => "Average",
            AggregateKind::First => "First",
            AggregateKind::FirstOrDefault => "FirstOrDefault",
            AggregateKind::Last => "Last",
            AggregateKind::LastOrDefault => "LastOrDefault",
            AggregateKind::Distinct => "Distinct",
        }
    }

    /// Result type of the call over elements of `elem`, given the resolved
    /// parameter type and the type of the (unpromoted) selector body.
    pub fn result_type(self, elem: &Ty, param: Option<&Ty>, selector: Option<&Ty>) -> Ty {
        use AggregateKind::*;
        match self {
            Where | OrderBy | OrderByDescending | Distinct => Ty::enumerable(elem.clone()),
            Select => Ty::enumerable(selector.unwrap_or(elem).clone()),
            Any | All => Ty::Bool,
            Count => Ty::Int32,
            Min | Max => selector.unwrap_or(elem).clone(),
            Sum => param.unwrap_or(elem).clone(),
            Average => {
                let param = param.unwrap_or(elem);
                match param {
                    Ty::Int32 | Ty::Int64 => Ty::Double,
                    Ty::Nullable(inner) if matches!(**inner, Ty::Int32 | Ty::Int64) => {
                        Ty::nullable(Ty::Double)
                    }
                    other => other.clone(),
                }
            }
            First | FirstOrDefault | Last | LastOrDefault => elem.clone(),
        }
    }
}

/// An aggregate overload. The single parameter, when present, is the type
/// the selector or predicate body must promote to.
#[derive(Clone, Debug, PartialEq)]
pub struct AggregateSig {
    pub kind: AggregateKind,
    pub params: Vec<Ty>,
}

impl Candidate for AggregateSig {
    fn param_types(&self) -> &[Ty] {
        &self.params
    }
}

fn build_aggregates() -> Vec<AggregateSig> {
    use AggregateKind::*;
    let sig = |kind, params: &[Ty]| AggregateSig {
        kind,
        params: params.to_vec(),
    };
    let mut table = vec![
        sig(Where, &[Ty::Bool]),
        sig(Select, &[Ty::Object]),
        sig(OrderBy, &[Ty::Object]),
        sig(OrderByDescending, &[Ty::Object]),
        sig(Any, &[]),
        sig(Any, &[Ty::Bool]),
        sig(All, &[Ty::Bool]),
        sig(Count, &[]),
        sig(Count, &[Ty::Bool]),
        sig(Min, &[Ty::Object]),
        sig(Max, &[Ty::Object]),
        sig(First, &[]),
        sig(First, &[Ty::Bool]),
        sig(FirstOrDefault, &[]),
        sig(FirstOrDefault, &[Ty::Bool]),
        sig(Last, &[]),
        sig(Last, &[Ty::Bool]),
        sig(LastOrDefault, &[]),
        sig(LastOrDefault, &[Ty::Bool]),
        sig(Distinct, &[]),
    ];
    for kind in [Sum, Average] {
        for t in [Ty::Int32, Ty::Int64, Ty::Single, Ty::Double, Ty::Decimal] {
            table.push(sig(kind, &[t.clone()]));
            table.push(sig(kind, &[Ty::nullable(t)]));
        }
    }
    table
}

static AGGREGATES: OnceLock<Vec<AggregateSig>> = OnceLock::new();

/// Aggregate overloads with the given method name, ignoring case.
pub fn aggregates_named(name: &str) -> Vec<&'static AggregateSig> {
    AGGREGATES
        .get_or_init(build_aggregates)
        .iter()
        .filter(|s| s.kind.name().eq_ignore_ascii_case(name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overload::{resolve, Resolution};
    use crate::promote::is_compatible_with;

    fn resolve_ops(set: OperatorSet, args: &[Ty]) -> Option<Vec<Ty>> {
        match resolve(set.signatures(), args, |a, t| is_compatible_with(a, t).then(|| t.clone())) {
            Resolution::Found { candidate, .. } => Some(candidate.params),
            _ => None,
        }
    }

    #[test]
    fn table_sizes() {
        assert_eq!(OperatorSet::Logical.signatures().len(), 2);
        assert_eq!(OperatorSet::Arithmetic.signatures().len(), 14);
        assert_eq!(OperatorSet::Relational.signatures().len(), 22);
        assert_eq!(OperatorSet::Equality.signatures().len(), 26);
        assert_eq!(OperatorSet::Add.signatures().len(), 18);
        assert_eq!(OperatorSet::Subtract.signatures().len(), 20);
        assert_eq!(OperatorSet::Negation.signatures().len(), 10);
        assert_eq!(OperatorSet::Not.signatures().len(), 2);
    }

    #[test]
    fn mixed_numeric_operands_widen() {
        assert_eq!(
            resolve_ops(OperatorSet::Arithmetic, &[Ty::Int32, Ty::Double]),
            Some(vec![Ty::Double, Ty::Double])
        );
        assert_eq!(
            resolve_ops(OperatorSet::Arithmetic, &[Ty::Int16, Ty::Byte]),
            Some(vec![Ty::Int32, Ty::Int32])
        );
        assert_eq!(
            resolve_ops(OperatorSet::Arithmetic, &[Ty::Int32, Ty::nullable(Ty::Int32)]),
            Some(vec![Ty::nullable(Ty::Int32), Ty::nullable(Ty::Int32)])
        );
    }

    #[test]
    fn date_arithmetic() {
        assert_eq!(
            resolve_ops(OperatorSet::Subtract, &[Ty::DateTime, Ty::DateTime]),
            Some(vec![Ty::DateTime, Ty::DateTime])
        );
        assert_eq!(resolve_ops(OperatorSet::Add, &[Ty::DateTime, Ty::DateTime]), None);
    }

    #[test]
    fn decimal_and_double_do_not_mix() {
        assert_eq!(resolve_ops(OperatorSet::Arithmetic, &[Ty::Decimal, Ty::Double]), None);
    }

    #[test]
    fn aggregate_lookup_and_results() {
        assert_eq!(aggregates_named("count").len(), 2);
        assert_eq!(aggregates_named("SUM").len(), 10);
        assert!(aggregates_named("Reverse").is_empty());
        assert_eq!(
            AggregateKind::Average.result_type(&Ty::Int32, Some(&Ty::Int32), Some(&Ty::Int32)),
            Ty::Double
        );
        assert_eq!(
            AggregateKind::Select.result_type(&Ty::Int32, Some(&Ty::Object), Some(&Ty::String)),
            Ty::enumerable(Ty::String)
        );
        assert_eq!(AggregateKind::Count.result_type(&Ty::String, None, None), Ty::Int32);
    }
}

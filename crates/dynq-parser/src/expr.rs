//! Typed expression trees.
//!
//! The parser produces an [`Expr`] for every sub-expression it accepts.
//! Each node carries its static [`Ty`] and the character span it was parsed
//! from. Member, method, indexer and constructor nodes hold the resolved
//! capability-table entry, so the tree can be evaluated without any further
//! lookup.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use dynq_common::span::Span;
use dynq_typeck::host::{Constructor, Indexer, Method, Property};
use dynq_typeck::overload::Argument;
use dynq_typeck::signatures::AggregateKind;
use dynq_typeck::{RecordType, Ty, Value};

use crate::literals::LiteralId;

static NEXT_PARAM_ID: AtomicU32 = AtomicU32::new(1);

struct ParamInner {
    id: u32,
    name: Option<String>,
    ty: Ty,
}

/// A typed placeholder bound to a value when the tree is evaluated.
///
/// Parameters compare by identity: two parameters with the same name and
/// type are still different parameters.
#[derive(Clone)]
pub struct Param(Arc<ParamInner>);

impl Param {
    pub fn named(name: impl Into<String>, ty: Ty) -> Self {
        Self::build(Some(name.into()), ty)
    }

    /// A parameter without a name. When it is the only parameter of a parse
    /// it becomes the implicit `it`.
    pub fn anonymous(ty: Ty) -> Self {
        Self::build(None, ty)
    }

    fn build(name: Option<String>, ty: Ty) -> Self {
        Param(Arc::new(ParamInner {
            id: NEXT_PARAM_ID.fetch_add(1, Ordering::Relaxed),
            name: name.filter(|n| !n.is_empty()),
            ty,
        }))
    }

    pub fn id(&self) -> u32 {
        self.0.id
    }

    pub fn name(&self) -> Option<&str> {
        self.0.name.as_deref()
    }

    pub fn ty(&self) -> &Ty {
        &self.0.ty
    }
}

impl PartialEq for Param {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for Param {}

impl fmt::Debug for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name().unwrap_or("it"), self.0.ty)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    OrElse,
    AndAlso,
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::OrElse => "||",
            BinaryOp::AndAlso => "&&",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::LessThan => "<",
            BinaryOp::LessThanOrEqual => "<=",
            BinaryOp::GreaterThan => ">",
            BinaryOp::GreaterThanOrEqual => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Equal
                | BinaryOp::NotEqual
                | BinaryOp::LessThan
                | BinaryOp::LessThanOrEqual
                | BinaryOp::GreaterThan
                | BinaryOp::GreaterThanOrEqual
        )
    }
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    /// The `null` keyword, before promotion gives it a type.
    Null,
    /// A constant value. Literals written in the source keep the id of
    /// their entry in the literal table.
    Constant {
        value: Value,
        literal: Option<LiteralId>,
    },
    Parameter(Param),
    /// Property or field read. `target` is `None` for static members;
    /// `owner` is the type that declares the member.
    Member {
        target: Option<Box<Expr>>,
        owner: Ty,
        property: Property,
    },
    Call {
        target: Option<Box<Expr>>,
        owner: Ty,
        method: Method,
        args: Vec<Expr>,
    },
    Index {
        target: Box<Expr>,
        indexer: Indexer,
        args: Vec<Expr>,
    },
    ArrayIndex {
        array: Box<Expr>,
        index: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Conversion to the node's type. `checked` conversions fail on
    /// overflow at run time.
    Convert {
        operand: Box<Expr>,
        checked: bool,
    },
    Conditional {
        test: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Invoke {
        lambda: Arc<Lambda>,
        args: Vec<Expr>,
    },
    New {
        constructor: Constructor,
        args: Vec<Expr>,
    },
    Record {
        record: RecordType,
        fields: Vec<Expr>,
    },
    Aggregate {
        kind: AggregateKind,
        source: Box<Expr>,
        selector: Option<Box<Lambda>>,
    },
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: Ty,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, ty: Ty, span: Span) -> Self {
        Expr { kind, ty, span }
    }

    pub fn constant(value: Value, ty: Ty, span: Span) -> Self {
        Expr::new(
            ExprKind::Constant {
                value,
                literal: None,
            },
            ty,
            span,
        )
    }

    pub fn parameter(param: &Param, span: Span) -> Self {
        Expr::new(ExprKind::Parameter(param.clone()), param.ty().clone(), span)
    }

    /// Wrap in an unchecked conversion to `ty`.
    pub fn convert(self, ty: Ty) -> Self {
        let span = self.span;
        Expr::new(
            ExprKind::Convert {
                operand: Box::new(self),
                checked: false,
            },
            ty,
            span,
        )
    }

    pub fn is_null_literal(&self) -> bool {
        matches!(self.kind, ExprKind::Null)
    }

    /// The constant value, when this node is a constant.
    pub fn as_constant(&self) -> Option<&Value> {
        match &self.kind {
            ExprKind::Constant { value, .. } => Some(value),
            _ => None,
        }
    }
}

impl Argument for Expr {
    fn ty(&self) -> &Ty {
        &self.ty
    }
}

/// A parsed expression with the parameters it is a function of.
#[derive(Debug, Clone)]
pub struct Lambda {
    pub params: Vec<Param>,
    pub body: Expr,
}

impl Lambda {
    pub fn new(params: Vec<Param>, body: Expr) -> Self {
        Lambda { params, body }
    }

    pub fn param_types(&self) -> Vec<Ty> {
        self.params.iter().map(|p| p.ty().clone()).collect()
    }

    /// `Func<P1, .., R>`.
    pub fn ty(&self) -> Ty {
        Ty::fun(self.param_types(), self.body.ty.clone())
    }
}

/// One key of an ordering list.
#[derive(Debug, Clone)]
pub struct OrderingKey {
    pub selector: Expr,
    pub ascending: bool,
}

// ── Rendering ──────────────────────────────────────────────────────────

fn write_args(f: &mut fmt::Formatter<'_>, args: &[Expr]) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{arg}")?;
    }
    Ok(())
}

fn write_target(f: &mut fmt::Formatter<'_>, target: Option<&Expr>, owner: &Ty) -> fmt::Result {
    match target {
        Some(t) => write!(f, "{t}"),
        None => write!(f, "{owner}"),
    }
}

/// Expression-syntax rendering of the tree, with every conversion spelled out.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Null => write!(f, "null"),
            ExprKind::Constant { value, .. } => match value {
                Value::Null => write!(f, "null"),
                Value::String(s) => write!(f, "\"{s}\""),
                Value::Char(c) => write!(f, "'{c}'"),
                Value::Enum(ty, _) => write!(f, "{}.{value}", ty.name()),
                other => write!(f, "{other}"),
            },
            ExprKind::Parameter(p) => write!(f, "{}", p.name().unwrap_or("it")),
            ExprKind::Member {
                target,
                owner,
                property,
            } => {
                write_target(f, target.as_deref(), owner)?;
                write!(f, ".{}", property.name)
            }
            ExprKind::Call {
                target,
                owner,
                method,
                args,
            } => {
                write_target(f, target.as_deref(), owner)?;
                write!(f, ".{}(", method.name)?;
                write_args(f, args)?;
                write!(f, ")")
            }
            ExprKind::Index { target, args, .. } => {
                write!(f, "{target}[")?;
                write_args(f, args)?;
                write!(f, "]")
            }
            ExprKind::ArrayIndex { array, index } => write!(f, "{array}[{index}]"),
            ExprKind::Unary { op, operand } => match op {
                UnaryOp::Negate => write!(f, "-{operand}"),
                UnaryOp::Not => write!(f, "!{operand}"),
            },
            ExprKind::Binary { op, left, right } => {
                write!(f, "({left} {} {right})", op.symbol())
            }
            ExprKind::Convert { operand, checked } => {
                let name = if *checked { "ConvertChecked" } else { "Convert" };
                write!(f, "{name}({operand}, {})", self.ty)
            }
            ExprKind::Conditional {
                test,
                then,
                otherwise,
            } => write!(f, "iif({test}, {then}, {otherwise})"),
            ExprKind::Invoke { lambda, args } => {
                write!(f, "Invoke({}", lambda.body)?;
                for arg in args {
                    write!(f, ", {arg}")?;
                }
                write!(f, ")")
            }
            ExprKind::New { args, .. } => {
                write!(f, "new {}(", self.ty)?;
                write_args(f, args)?;
                write!(f, ")")
            }
            ExprKind::Record { record, fields } => {
                write!(f, "new {}() {{", record.name())?;
                for (i, (field, value)) in record.fields().iter().zip(fields).enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, " {} = {value}", field.name)?;
                }
                write!(f, " }}")
            }
            ExprKind::Aggregate {
                kind,
                source,
                selector,
            } => {
                write!(f, "{source}.{}(", kind.name())?;
                if let Some(lambda) = selector {
                    write!(f, "it => {}", lambda.body)?;
                }
                write!(f, ")")
            }
        }
    }
}

//! Parser and semantic resolver for dynq expressions.
//!
//! A [`ParseContext`] describes what an expression may refer to: its
//! parameters, positional substitution values (`@0`, `@1`, ...), an
//! optional pool of external values and any extra type names. Parsing
//! turns source text into a fully typed [`Expr`] tree, a [`Lambda`] over
//! the context's parameters, or a list of [`OrderingKey`]s.
//!
//! ```ignore
//! let x = Param::named("x", Ty::Decimal);
//! let ctx = ParseContext::new().parameter(x);
//! let lambda = ctx.parse_lambda("x == 5", Some(&Ty::Bool))?;
//! ```

pub mod convert;
pub mod diagnostics;
pub mod expr;
pub mod literals;
pub mod symbols;

mod parser;

use rustc_hash::FxHashMap;

use dynq_common::error::ParseError;
use dynq_typeck::{record_types, RecordTypeFactory, Ty};

pub use diagnostics::{render_diagnostic, DiagnosticOptions};
pub use expr::{BinaryOp, Expr, ExprKind, Lambda, OrderingKey, Param, UnaryOp};
pub use symbols::{Externals, Substitution, Symbol};

use parser::Parser;
use symbols::SymbolTable;

/// Everything an expression may refer to, besides the builtins.
///
/// A context is reusable: every parse builds its own symbol and literal
/// tables from it. Record types produced by `new(...)` are interned in the
/// context's factory, the process-wide one unless another is supplied.
pub struct ParseContext<'r> {
    params: Vec<Param>,
    values: Vec<Substitution>,
    known_types: FxHashMap<String, Ty>,
    records: &'r RecordTypeFactory,
}

impl ParseContext<'static> {
    pub fn new() -> Self {
        ParseContext::with_records(record_types())
    }
}

impl Default for ParseContext<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'r> ParseContext<'r> {
    /// A context interning record types in `records`.
    pub fn with_records(records: &'r RecordTypeFactory) -> Self {
        ParseContext {
            params: Vec::new(),
            values: Vec::new(),
            known_types: FxHashMap::default(),
            records,
        }
    }

    /// Add a parameter. A lone anonymous parameter is the implicit `it`.
    pub fn parameter(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    pub fn parameters(mut self, params: impl IntoIterator<Item = Param>) -> Self {
        self.params.extend(params);
        self
    }

    /// Add the next positional substitution value, bound as `@<index>`.
    pub fn value(mut self, value: impl Into<Symbol>) -> Self {
        self.values.push(Substitution::Value(value.into()));
        self
    }

    /// Add a pool of named values, consulted after parameters and
    /// substitutions. Must be the last substitution.
    pub fn externals(mut self, externals: Externals) -> Self {
        self.values.push(Substitution::Externals(externals));
        self
    }

    /// Make a host, enum or record type nameable in expressions.
    pub fn known_type(mut self, ty: Ty) -> Self {
        self.known_types.insert(ty.to_string().to_ascii_lowercase(), ty);
        self
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    fn parser<'src>(&self, source: &'src str) -> Result<Parser<'src, '_>, ParseError> {
        let symbols = SymbolTable::build(&self.params, &self.values)?;
        Parser::new(source, symbols, &self.known_types, self.records)
    }

    /// Parse a single expression. With `result_type`, the expression must
    /// convert to it exactly.
    pub fn parse(&self, source: &str, result_type: Option<&Ty>) -> Result<Expr, ParseError> {
        tracing::debug!(source, params = self.params.len(), "parsing expression");
        self.parser(source)?.parse(result_type)
    }

    /// Parse a single expression as the body of a lambda over the
    /// context's parameters.
    pub fn parse_lambda(&self, source: &str, result_type: Option<&Ty>) -> Result<Lambda, ParseError> {
        let body = self.parse(source, result_type)?;
        Ok(Lambda::new(self.params.clone(), body))
    }

    /// Parse a comma-separated ordering list.
    pub fn parse_ordering(&self, source: &str) -> Result<Vec<OrderingKey>, ParseError> {
        tracing::debug!(source, "parsing ordering");
        self.parser(source)?.parse_ordering()
    }
}

//! Names visible to an expression: parameters, positional substitution
//! values (`@0`, `@1`, ...) and an optional pool of external values.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use dynq_common::error::{ErrorKind, ParseError};
use dynq_typeck::Value;

use crate::expr::{Expr, Lambda, Param};

/// What a name is bound to.
#[derive(Debug, Clone)]
pub enum Symbol {
    Parameter(Param),
    Constant(Value),
    /// A previously built expression, spliced in where the name appears.
    Expr(Expr),
    /// A lambda; the name must be followed by an argument list.
    Lambda(Arc<Lambda>),
}

impl From<Value> for Symbol {
    fn from(value: Value) -> Self {
        Symbol::Constant(value)
    }
}

impl From<Expr> for Symbol {
    fn from(expr: Expr) -> Self {
        Symbol::Expr(expr)
    }
}

impl From<Lambda> for Symbol {
    fn from(lambda: Lambda) -> Self {
        Symbol::Lambda(Arc::new(lambda))
    }
}

impl From<Param> for Symbol {
    fn from(param: Param) -> Self {
        Symbol::Parameter(param)
    }
}

/// Named values consulted after parameters and substitutions.
pub type Externals = FxHashMap<String, Symbol>;

/// One positional substitution value.
#[derive(Debug, Clone)]
pub enum Substitution {
    Value(Symbol),
    /// Only valid as the last substitution.
    Externals(Externals),
}

/// Symbol table for one parse. Lookups ignore case.
#[derive(Debug, Default)]
pub struct SymbolTable {
    entries: FxHashMap<String, Symbol>,
    externals: Option<Externals>,
    it: Option<Param>,
}

impl SymbolTable {
    /// Bind named parameters under their names and substitutions under
    /// `@<index>`. A single unnamed parameter becomes `it`.
    pub fn build(params: &[Param], values: &[Substitution]) -> Result<Self, ParseError> {
        let mut table = SymbolTable::default();
        for param in params {
            if let Some(name) = param.name() {
                table.add(name, Symbol::Parameter(param.clone()))?;
            }
        }
        if let [only] = params {
            if only.name().is_none() {
                table.it = Some(only.clone());
            }
        }

        let last = values.len().saturating_sub(1);
        for (i, value) in values.iter().enumerate() {
            match value {
                Substitution::Value(symbol) => table.add(&format!("@{i}"), symbol.clone())?,
                Substitution::Externals(map) if i == last => table.externals = Some(map.clone()),
                Substitution::Externals(_) => {
                    return Err(ParseError::at(ErrorKind::MisplacedExternals, 0));
                }
            }
        }
        Ok(table)
    }

    fn add(&mut self, name: &str, symbol: Symbol) -> Result<(), ParseError> {
        let key = name.to_ascii_lowercase();
        if self.entries.contains_key(&key) {
            return Err(ParseError::at(
                ErrorKind::DuplicateIdentifier(name.to_string()),
                0,
            ));
        }
        self.entries.insert(key, symbol);
        Ok(())
    }

    /// Resolve a name: parameters and substitutions first, then externals.
    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .or_else(|| self.external(name))
    }

    fn external(&self, name: &str) -> Option<&Symbol> {
        let externals = self.externals.as_ref()?;
        externals.get(name).or_else(|| {
            externals
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, symbol)| symbol)
        })
    }

    /// The implicit parameter, if there is one.
    pub fn it(&self) -> Option<&Param> {
        self.it.as_ref()
    }
}

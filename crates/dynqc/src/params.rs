//! Parameter declarations on the command line.
//!
//! `--param name:Type[=value]` declares a named parameter and `--it
//! Type[=value]` the implicit one. Types are predefined type names with
//! optional `?` and `[]` suffixes. A value is itself an expression parsed
//! against the declared type, so `DateTime(2024, 1, 31)` or `null` work;
//! `String` parameters take the raw text unless it is quoted.

use dynq_parser::{Param, ParseContext};
use dynq_typeck::{Ty, Value};

use crate::Failure;

/// One parsed `--param` or `--it` argument.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: Option<String>,
    pub ty: Ty,
    pub value: Option<String>,
}

impl ParamSpec {
    pub fn param(&self) -> Param {
        match &self.name {
            Some(name) => Param::named(name.clone(), self.ty.clone()),
            None => Param::anonymous(self.ty.clone()),
        }
    }

    fn label(&self) -> String {
        match &self.name {
            Some(name) => format!("--param {name}"),
            None => "--it".to_string(),
        }
    }

    /// The bound value, if one was given.
    pub fn value(&self) -> Result<Option<Value>, Failure> {
        self.value
            .as_deref()
            .map(|text| parse_value(text, &self.ty, &self.label()))
            .transpose()
    }
}

/// `Int32`, `decimal?`, `String[]`, `Int64?[]`.
pub fn parse_type(text: &str) -> Result<Ty, String> {
    let text = text.trim();
    if let Some(elem) = text.strip_suffix("[]") {
        return Ok(Ty::array(parse_type(elem)?));
    }
    if let Some(inner) = text.strip_suffix('?') {
        let inner = parse_type(inner)?;
        return inner
            .nullable_form()
            .ok_or_else(|| format!("type '{inner}' has no nullable form"));
    }
    Ty::predefined(text).ok_or_else(|| format!("unknown type '{text}'"))
}

fn split_value(text: &str) -> (&str, Option<String>) {
    match text.split_once('=') {
        Some((decl, value)) => (decl, Some(value.to_string())),
        None => (text, None),
    }
}

/// `name:Type[=value]`.
pub fn parse_param(text: &str) -> Result<ParamSpec, String> {
    let (decl, value) = split_value(text);
    let (name, ty) = decl
        .split_once(':')
        .ok_or_else(|| format!("expected name:Type[=value], got '{text}'"))?;
    let name = name.trim();
    let valid = name.chars().next().is_some_and(|c| c.is_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_alphanumeric() || c == '_');
    if !valid {
        return Err(format!("'{name}' is not a valid parameter name"));
    }
    Ok(ParamSpec {
        name: Some(name.to_string()),
        ty: parse_type(ty)?,
        value,
    })
}

/// `Type[=value]`.
pub fn parse_it(text: &str) -> Result<ParamSpec, String> {
    let (decl, value) = split_value(text);
    Ok(ParamSpec {
        name: None,
        ty: parse_type(decl)?,
        value,
    })
}

/// Evaluate `text` as a constant of type `ty`.
pub fn parse_value(text: &str, ty: &Ty, origin: &str) -> Result<Value, Failure> {
    let raw_text = matches!(ty.non_nullable(), Ty::String) && !text.starts_with('"') && text != "null";
    if raw_text {
        return Ok(Value::from(text));
    }
    let expr = ParseContext::new()
        .parse(text, Some(ty))
        .map_err(|error| Failure::parse(error, text, origin))?;
    dynq_rt::evaluate(&expr).map_err(Failure::Eval)
}

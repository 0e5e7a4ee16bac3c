//! Identifiers and everything hanging off them: keywords, type names,
//! symbols, member and method access, aggregates, indexing, `new(...)`
//! projections and lambda invocation.

use std::sync::Arc;

use dynq_common::error::{ErrorKind, ParseError};
use dynq_common::token::TokenKind;
use dynq_typeck::builtins::{definition, element_type, self_and_base_types};
use dynq_typeck::overload::Candidate;
use dynq_typeck::signatures::aggregates_named;
use dynq_typeck::{resolve, FieldDescriptor, Resolution, Ty, Value};

use super::expressions::{self, conditional};
use super::{PResult, Parser};
use crate::convert;
use crate::expr::{Expr, ExprKind, Lambda, Param};
use crate::symbols::Symbol;

// ── Identifiers ────────────────────────────────────────────────────────

/// Resolve an identifier: keyword, type name, symbol, external value, then
/// a member of the implicit parameter.
pub(crate) fn identifier(p: &mut Parser) -> PResult<Expr> {
    let token = p.token();
    let name = token.text;
    let pos = token.pos();

    match name.to_ascii_lowercase().as_str() {
        "true" | "false" => {
            p.advance()?;
            let value = name.eq_ignore_ascii_case("true");
            return Ok(Expr::constant(Value::Bool(value), Ty::Bool, p.span_from(pos)));
        }
        "null" => {
            p.advance()?;
            return Ok(Expr::new(ExprKind::Null, Ty::Object, p.span_from(pos)));
        }
        "it" => return it(p),
        "iif" => return iif(p),
        "new" => return new_record(p),
        _ => {}
    }

    if let Some(ty) = p.type_named(name) {
        return type_access(p, ty);
    }

    if let Some(symbol) = p.symbols.get(name).cloned() {
        return match symbol {
            Symbol::Lambda(lambda) => lambda_invocation(p, lambda),
            Symbol::Parameter(param) => {
                p.advance()?;
                Ok(Expr::parameter(&param, p.span_from(pos)))
            }
            Symbol::Constant(value) => {
                p.advance()?;
                let ty = value.ty();
                Ok(Expr::constant(value, ty, p.span_from(pos)))
            }
            Symbol::Expr(expr) => {
                p.advance()?;
                Ok(expr)
            }
        };
    }

    if let Some(it) = p.it.clone() {
        let target = Expr::parameter(&it, p.span_from(pos));
        return member_access(p, it.ty().clone(), Some(target));
    }

    Err(ParseError::at(ErrorKind::UnknownIdentifier(name.to_string()), pos))
}

fn it(p: &mut Parser) -> PResult<Expr> {
    let pos = p.pos();
    let Some(it) = p.it.clone() else {
        return Err(p.error(ErrorKind::NoItInScope));
    };
    p.advance()?;
    Ok(Expr::parameter(&it, p.span_from(pos)))
}

fn iif(p: &mut Parser) -> PResult<Expr> {
    let pos = p.pos();
    p.advance()?;
    let args = argument_list(p)?;
    let Ok([test, then, otherwise]) = <[Expr; 3]>::try_from(args) else {
        return Err(ParseError::at(ErrorKind::IifRequiresThreeArgs, pos));
    };
    conditional(p, test, then, otherwise, pos)
}

// ── Arguments ──────────────────────────────────────────────────────────

/// `( [expr, ...] )`
fn argument_list(p: &mut Parser) -> PResult<Vec<Expr>> {
    p.expect(TokenKind::OpenParen, ErrorKind::OpenParenExpected)?;
    let args = if p.current() != TokenKind::CloseParen {
        arguments(p)?
    } else {
        Vec::new()
    };
    p.expect(TokenKind::CloseParen, ErrorKind::CloseParenOrCommaExpected)?;
    Ok(args)
}

fn arguments(p: &mut Parser) -> PResult<Vec<Expr>> {
    let mut args = Vec::new();
    loop {
        args.push(expressions::expr(p)?);
        if p.current() != TokenKind::Comma {
            return Ok(args);
        }
        p.advance()?;
    }
}

// ── Projections and lambdas ────────────────────────────────────────────

/// `new(expr [as Name], ...)`: a construction of the record type for the
/// listed fields. Without `as`, the field is named after the member the
/// expression reads.
fn new_record(p: &mut Parser) -> PResult<Expr> {
    let pos = p.pos();
    p.advance()?;
    p.expect(TokenKind::OpenParen, ErrorKind::OpenParenExpected)?;
    let mut fields: Vec<FieldDescriptor> = Vec::new();
    let mut values = Vec::new();
    loop {
        let expr_pos = p.pos();
        let value = expressions::expr(p)?;
        let name = if p.at_word("as") {
            p.advance()?;
            let name = p.identifier()?.to_string();
            p.advance()?;
            name
        } else {
            match &value.kind {
                ExprKind::Member { property, .. } => property.name.clone(),
                _ => return Err(ParseError::at(ErrorKind::MissingAsClause, expr_pos)),
            }
        };
        if fields.iter().any(|f| f.name.eq_ignore_ascii_case(&name)) {
            return Err(ParseError::at(ErrorKind::DuplicateRecordField(name), expr_pos));
        }
        fields.push(FieldDescriptor::new(name, value.ty.clone()));
        values.push(value);
        if p.current() != TokenKind::Comma {
            break;
        }
        p.advance()?;
    }
    p.expect(TokenKind::CloseParen, ErrorKind::CloseParenOrCommaExpected)?;

    let record = p.records.get_or_create(&fields);
    Ok(Expr::new(
        ExprKind::Record {
            record: record.clone(),
            fields: values,
        },
        Ty::Record(record),
        p.span_from(pos),
    ))
}

/// Parameter list of a lambda, as an overload candidate.
#[derive(Clone)]
struct InvokeSig {
    params: Vec<Ty>,
}

impl Candidate for InvokeSig {
    fn param_types(&self) -> &[Ty] {
        &self.params
    }
}

fn lambda_invocation(p: &mut Parser, lambda: Arc<Lambda>) -> PResult<Expr> {
    let pos = p.pos();
    p.advance()?;
    let args = argument_list(p)?;
    let sig = InvokeSig {
        params: lambda.param_types(),
    };
    match resolve([&sig], &args, |arg, ty| p.promote(arg, ty, false)) {
        Resolution::Found { args, .. } => {
            let ty = lambda.body.ty.clone();
            Ok(Expr::new(ExprKind::Invoke { lambda, args }, ty, p.span_from(pos)))
        }
        _ => Err(ParseError::at(ErrorKind::ArgsIncompatibleWithLambda, pos)),
    }
}

// ── Types ──────────────────────────────────────────────────────────────

/// After a type name: `T?`, a constructor call or conversion `T(args)`, or
/// a static member `T.Member`.
fn type_access(p: &mut Parser, ty: Ty) -> PResult<Expr> {
    let pos = p.pos();
    p.advance()?;
    let mut ty = ty;
    if p.current() == TokenKind::Question {
        ty = ty.nullable_form().ok_or_else(|| {
            ParseError::at(ErrorKind::TypeHasNoNullableForm(ty.to_string()), pos)
        })?;
        p.advance()?;
    }
    if p.current() == TokenKind::OpenParen {
        let args = argument_list(p)?;
        let constructors = definition(&ty)
            .map(|def| def.constructors().to_vec())
            .unwrap_or_default();
        return match resolve(&constructors, &args, |arg, t| p.promote(arg, t, false)) {
            Resolution::Found { candidate, args } => Ok(Expr::new(
                ExprKind::New {
                    constructor: candidate,
                    args,
                },
                ty,
                p.span_from(pos),
            )),
            Resolution::Ambiguous => Err(ParseError::at(
                ErrorKind::AmbiguousConstructorInvocation(ty.to_string()),
                pos,
            )),
            Resolution::NoMatch => match <[Expr; 1]>::try_from(args) {
                Ok([arg]) => {
                    let mut converted = convert::explicit(arg, &ty, pos)?;
                    converted.span = p.span_from(pos);
                    Ok(converted)
                }
                Err(_) => Err(ParseError::at(
                    ErrorKind::NoMatchingConstructor(ty.to_string()),
                    pos,
                )),
            },
        };
    }
    p.expect(TokenKind::Dot, ErrorKind::DotOrOpenParenExpected)?;
    member_access(p, ty, None)
}

// ── Members ────────────────────────────────────────────────────────────

/// `.Name` or `.Name(args)` on `instance`, or on the type `owner` itself
/// when `instance` is `None`.
pub(crate) fn member_access(p: &mut Parser, owner: Ty, instance: Option<Expr>) -> PResult<Expr> {
    let pos = p.pos();
    let start = instance.as_ref().map_or(pos, |e| e.span.start);
    let name = p.identifier()?;
    p.advance()?;

    if p.current() == TokenKind::OpenParen {
        if let Some(source) = instance {
            if owner != Ty::String && !aggregates_named(name).is_empty() {
                if let Some(elem) = element_type(&owner) {
                    return aggregate(p, source, elem, name, pos);
                }
            }
            let args = argument_list(p)?;
            return method_call(p, owner, Some(source), name, args, pos, start);
        }
        let args = argument_list(p)?;
        return method_call(p, owner, None, name, args, pos, start);
    }

    let is_static = instance.is_none();
    if is_static {
        if let Ty::Enum(e) = &owner {
            if let Some(v) = e.member(name) {
                let value = Value::Enum(e.clone(), v);
                return Ok(Expr::constant(value, owner.clone(), p.span_from(start)));
            }
        }
    }
    for t in self_and_base_types(&owner) {
        let Some(def) = definition(&t) else { continue };
        if let Some(property) = def.property(name, is_static) {
            let ty = property.ty.clone();
            return Ok(Expr::new(
                ExprKind::Member {
                    target: instance.map(Box::new),
                    owner: t,
                    property: property.clone(),
                },
                ty,
                p.span_from(start),
            ));
        }
    }
    Err(ParseError::at(
        ErrorKind::UnknownPropertyOrField {
            member: name.to_string(),
            ty: owner.to_string(),
        },
        pos,
    ))
}

/// Resolve a method over the type and its bases. The first level with an
/// applicable overload decides.
fn method_call(
    p: &Parser,
    owner: Ty,
    instance: Option<Expr>,
    name: &str,
    args: Vec<Expr>,
    pos: u32,
    start: u32,
) -> PResult<Expr> {
    let is_static = instance.is_none();
    for t in self_and_base_types(&owner) {
        let Some(def) = definition(&t) else { continue };
        match resolve(def.methods(name, is_static), &args, |arg, ty| p.promote(arg, ty, false)) {
            Resolution::NoMatch => continue,
            Resolution::Ambiguous => {
                return Err(ParseError::at(
                    ErrorKind::AmbiguousMethodInvocation {
                        method: name.to_string(),
                        ty: owner.to_string(),
                    },
                    pos,
                ));
            }
            Resolution::Found { candidate, args } => {
                if candidate.ret == Ty::Void {
                    return Err(ParseError::at(
                        ErrorKind::MethodIsVoid {
                            method: name.to_string(),
                            ty: owner.to_string(),
                        },
                        pos,
                    ));
                }
                let ty = candidate.ret.clone();
                return Ok(Expr::new(
                    ExprKind::Call {
                        target: instance.map(Box::new),
                        owner: t,
                        method: candidate,
                        args,
                    },
                    ty,
                    p.span_from(start),
                ));
            }
        }
    }
    Err(ParseError::at(
        ErrorKind::NoApplicableMethod {
            method: name.to_string(),
            ty: owner.to_string(),
        },
        pos,
    ))
}

/// `source.Where(pred)`, `source.Sum(sel)`, ... The argument is parsed with
/// `it` bound to a fresh parameter of the element type and becomes the body
/// of a lambda over that parameter.
fn aggregate(p: &mut Parser, source: Expr, elem: Ty, name: &str, pos: u32) -> PResult<Expr> {
    let inner = Param::anonymous(elem.clone());
    let outer = p.it.replace(inner.clone());
    let args = argument_list(p);
    p.it = outer;
    let args = args?;

    let selector_ty = args.first().map(|a| a.ty.clone());
    let sigs = aggregates_named(name);
    let Resolution::Found { candidate, args } =
        resolve(sigs.iter().copied(), &args, |arg, ty| p.promote(arg, ty, false))
    else {
        return Err(ParseError::at(
            ErrorKind::NoApplicableAggregate(name.to_string()),
            pos,
        ));
    };
    let ty = candidate
        .kind
        .result_type(&elem, candidate.params.first(), selector_ty.as_ref());
    let selector = args
        .into_iter()
        .next()
        .map(|body| Box::new(Lambda::new(vec![inner], body)));
    let start = source.span.start;
    Ok(Expr::new(
        ExprKind::Aggregate {
            kind: candidate.kind,
            source: Box::new(source),
            selector,
        },
        ty,
        p.span_from(start),
    ))
}

// ── Indexing ───────────────────────────────────────────────────────────

/// `target[args]`: one-dimensional arrays take a single `Int32` index;
/// other types resolve over their indexers.
pub(crate) fn element_access(p: &mut Parser, target: Expr) -> PResult<Expr> {
    let pos = p.pos();
    p.advance()?;
    let args = arguments(p)?;
    p.expect(TokenKind::CloseBracket, ErrorKind::CloseBracketOrCommaExpected)?;
    let start = target.span.start;

    if let Ty::Array(elem, rank) = &target.ty {
        let elem = (**elem).clone();
        if *rank != 1 || args.len() != 1 {
            return Err(ParseError::at(ErrorKind::CannotIndexMultiDimArray, pos));
        }
        let index = p
            .promote(&args[0], &Ty::Int32, true)
            .ok_or_else(|| ParseError::at(ErrorKind::InvalidIndex, pos))?;
        return Ok(Expr::new(
            ExprKind::ArrayIndex {
                array: Box::new(target),
                index: Box::new(index),
            },
            elem,
            p.span_from(start),
        ));
    }

    for t in self_and_base_types(&target.ty) {
        let Some(def) = definition(&t) else { continue };
        match resolve(def.indexers(), &args, |arg, ty| p.promote(arg, ty, false)) {
            Resolution::NoMatch => continue,
            Resolution::Ambiguous => {
                return Err(ParseError::at(
                    ErrorKind::AmbiguousIndexerInvocation(target.ty.to_string()),
                    pos,
                ));
            }
            Resolution::Found { candidate, args } => {
                let ty = candidate.ret.clone();
                return Ok(Expr::new(
                    ExprKind::Index {
                        target: Box::new(target),
                        indexer: candidate,
                        args,
                    },
                    ty,
                    p.span_from(start),
                ));
            }
        }
    }
    Err(ParseError::at(
        ErrorKind::NoApplicableIndexer(target.ty.to_string()),
        pos,
    ))
}

//! Operator precedence levels, literals and the conditional rule.
//!
//! Lowest to highest: `?:`, `|| or`, `&& and`, comparison, additive,
//! multiplicative, unary, primary. Each binary level is a left-associative
//! loop over the next level up.

use dynq_common::error::{ErrorKind, ParseError};
use dynq_common::token::{Token, TokenKind};
use dynq_typeck::builtins::definition;
use dynq_typeck::promote::is_assignable_from;
use dynq_typeck::signatures::OperatorSet;
use dynq_typeck::{resolve, Resolution, Ty, Value};

use super::{members, PResult, Parser};
use crate::expr::{BinaryOp, Expr, ExprKind, UnaryOp};

// ── Levels ─────────────────────────────────────────────────────────────

/// `test ? a : b`, or anything of higher precedence.
pub(crate) fn expr(p: &mut Parser) -> PResult<Expr> {
    let start = p.pos();
    let test = logical_or(p)?;
    if p.current() != TokenKind::Question {
        return Ok(test);
    }
    p.advance()?;
    let then = expr(p)?;
    p.expect(TokenKind::Colon, ErrorKind::ColonExpected)?;
    let otherwise = expr(p)?;
    conditional(p, test, then, otherwise, start)
}

fn logical_or(p: &mut Parser) -> PResult<Expr> {
    let start = p.pos();
    let mut left = logical_and(p)?;
    while p.current() == TokenKind::DoubleBar || p.at_word("or") {
        let op = p.token();
        p.advance()?;
        let right = logical_and(p)?;
        left = logical(p, BinaryOp::OrElse, op, left, right, start)?;
    }
    Ok(left)
}

fn logical_and(p: &mut Parser) -> PResult<Expr> {
    let start = p.pos();
    let mut left = comparison(p)?;
    while p.current() == TokenKind::DoubleAmphersand || p.at_word("and") {
        let op = p.token();
        p.advance()?;
        let right = comparison(p)?;
        left = logical(p, BinaryOp::AndAlso, op, left, right, start)?;
    }
    Ok(left)
}

fn comparison(p: &mut Parser) -> PResult<Expr> {
    let start = p.pos();
    let mut left = additive(p)?;
    while p.current().is_comparison() {
        let op = p.token();
        p.advance()?;
        let right = additive(p)?;
        let (l, r) = comparison_operands(p, op, left, right)?;
        left = comparison_node(p, op, l, r, start)?;
    }
    Ok(left)
}

fn additive(p: &mut Parser) -> PResult<Expr> {
    let start = p.pos();
    let mut left = multiplicative(p)?;
    while matches!(
        p.current(),
        TokenKind::Plus | TokenKind::Minus | TokenKind::Amphersand
    ) {
        let op = p.token();
        p.advance()?;
        let right = multiplicative(p)?;
        left = match op.kind {
            TokenKind::Plus if left.ty == Ty::String || right.ty == Ty::String => {
                concat(p, op, left, right, start)?
            }
            TokenKind::Plus => {
                let (l, r) = binary_operands(p, OperatorSet::Add, op, left, right)?;
                arithmetic(p, BinaryOp::Add, l, r, start)
            }
            TokenKind::Minus => {
                let (l, r) = binary_operands(p, OperatorSet::Subtract, op, left, right)?;
                arithmetic(p, BinaryOp::Subtract, l, r, start)
            }
            _ => concat(p, op, left, right, start)?,
        };
    }
    Ok(left)
}

fn multiplicative(p: &mut Parser) -> PResult<Expr> {
    let start = p.pos();
    let mut left = unary(p)?;
    loop {
        let op = p.token();
        let bop = match op.kind {
            TokenKind::Asterisk => BinaryOp::Multiply,
            TokenKind::Slash => BinaryOp::Divide,
            TokenKind::Percent => BinaryOp::Modulo,
            _ if op.is_identifier("mod") => BinaryOp::Modulo,
            _ => break,
        };
        p.advance()?;
        let right = unary(p)?;
        let (l, r) = binary_operands(p, OperatorSet::Arithmetic, op, left, right)?;
        left = arithmetic(p, bop, l, r, start);
    }
    Ok(left)
}

fn unary(p: &mut Parser) -> PResult<Expr> {
    let is_minus = p.current() == TokenKind::Minus;
    if !is_minus && p.current() != TokenKind::Exclamation && !p.at_word("not") {
        return primary(p);
    }
    let op = p.token();
    p.advance()?;
    if is_minus && matches!(p.current(), TokenKind::IntegerLiteral | TokenKind::RealLiteral) {
        p.negated = Some(op.pos());
        return primary(p);
    }
    let operand = unary(p)?;
    let (set, uop) = if is_minus {
        (OperatorSet::Negation, UnaryOp::Negate)
    } else {
        (OperatorSet::Not, UnaryOp::Not)
    };
    let operand = unary_operand(p, set, op, operand)?;
    let ty = operand.ty.clone();
    Ok(Expr::new(
        ExprKind::Unary {
            op: uop,
            operand: Box::new(operand),
        },
        ty,
        p.span_from(op.pos()),
    ))
}

/// A primary start followed by any number of `.member` and `[index]`
/// suffixes.
fn primary(p: &mut Parser) -> PResult<Expr> {
    let mut expr = primary_start(p)?;
    loop {
        match p.current() {
            TokenKind::Dot => {
                p.advance()?;
                let owner = expr.ty.clone();
                expr = members::member_access(p, owner, Some(expr))?;
            }
            TokenKind::OpenBracket => expr = members::element_access(p, expr)?,
            _ => return Ok(expr),
        }
    }
}

fn primary_start(p: &mut Parser) -> PResult<Expr> {
    match p.current() {
        TokenKind::Identifier => members::identifier(p),
        TokenKind::StringLiteral => string_literal(p),
        TokenKind::IntegerLiteral => integer_literal(p),
        TokenKind::RealLiteral => real_literal(p),
        TokenKind::OpenParen => {
            p.advance()?;
            let inner = expr(p)?;
            p.expect(TokenKind::CloseParen, ErrorKind::CloseParenOrOperatorExpected)?;
            Ok(inner)
        }
        _ => Err(p.error(ErrorKind::ExpressionExpected)),
    }
}

// ── Literals ───────────────────────────────────────────────────────────

fn literal(p: &mut Parser, value: Value, ty: Ty, text: String, start: u32) -> Expr {
    let id = p.literals.add(text);
    Expr::new(
        ExprKind::Constant {
            value,
            literal: Some(id),
        },
        ty,
        p.span_from(start),
    )
}

/// `"..."` is a `String`, `'c'` a `Char`. A doubled delimiter stands for
/// one delimiter character.
fn string_literal(p: &mut Parser) -> PResult<Expr> {
    let token = p.token();
    let text = token.text;
    let quote = text.chars().next().unwrap_or('"');
    let body = text
        .strip_prefix(quote)
        .and_then(|t| t.strip_suffix(quote))
        .unwrap_or_default();
    let mut doubled = String::with_capacity(2);
    doubled.push(quote);
    doubled.push(quote);
    let unescaped = body.replace(&doubled, &quote.to_string());
    p.advance()?;

    if quote == '\'' {
        let mut chars = unescaped.chars();
        let (Some(c), None) = (chars.next(), chars.next()) else {
            return Err(ParseError::at(ErrorKind::InvalidCharacterLiteral, token.pos()));
        };
        return Ok(literal(p, Value::Char(c), Ty::Char, unescaped, token.pos()));
    }
    let value = Value::from(unescaped.as_str());
    Ok(literal(p, value, Ty::String, unescaped, token.pos()))
}

/// Non-negative literals take the first of `Int32`, `UInt32`, `Int64`,
/// `UInt64` that holds them; negative ones `Int32` or `Int64`.
fn integer_literal(p: &mut Parser) -> PResult<Expr> {
    let (text, start) = p.literal_text();
    let invalid = || ParseError::at(ErrorKind::InvalidIntegerLiteral(text.to_string()), start);
    let (value, ty) = if text.starts_with('-') {
        let n: i64 = text.parse().map_err(|_| invalid())?;
        match i32::try_from(n) {
            Ok(small) => (Value::Int32(small), Ty::Int32),
            Err(_) => (Value::Int64(n), Ty::Int64),
        }
    } else {
        let n: u64 = text.parse().map_err(|_| invalid())?;
        if let Ok(v) = i32::try_from(n) {
            (Value::Int32(v), Ty::Int32)
        } else if let Ok(v) = u32::try_from(n) {
            (Value::UInt32(v), Ty::UInt32)
        } else if let Ok(v) = i64::try_from(n) {
            (Value::Int64(v), Ty::Int64)
        } else {
            (Value::UInt64(n), Ty::UInt64)
        }
    };
    let text = text.into_owned();
    p.advance()?;
    Ok(literal(p, value, ty, text, start))
}

/// A trailing `f` or `F` selects `Single`; otherwise `Double`.
fn real_literal(p: &mut Parser) -> PResult<Expr> {
    let (text, start) = p.literal_text();
    let invalid = || ParseError::at(ErrorKind::InvalidRealLiteral(text.to_string()), start);
    let (value, ty) = match text.strip_suffix(['f', 'F']) {
        Some(digits) => {
            let v: f32 = digits.parse().map_err(|_| invalid())?;
            (Value::Single(v), Ty::Single)
        }
        None => {
            let v: f64 = text.parse().map_err(|_| invalid())?;
            (Value::Double(v), Ty::Double)
        }
    };
    let text = text.into_owned();
    p.advance()?;
    Ok(literal(p, value, ty, text, start))
}

// ── Operators ──────────────────────────────────────────────────────────

fn incompatible_operands(op: Token, left: &Ty, right: &Ty) -> ParseError {
    ParseError::at(
        ErrorKind::IncompatibleOperands {
            op: op.text.to_string(),
            left: left.to_string(),
            right: right.to_string(),
        },
        op.pos(),
    )
}

/// Resolve both operands against an operator signature table and return
/// them promoted to the winning signature.
fn binary_operands(
    p: &Parser,
    set: OperatorSet,
    op: Token,
    left: Expr,
    right: Expr,
) -> PResult<(Expr, Expr)> {
    let err = incompatible_operands(op, &left.ty, &right.ty);
    let args = [left, right];
    match resolve(set.signatures(), &args, |arg, ty| p.promote(arg, ty, false)) {
        Resolution::Found { args, .. } => match <[Expr; 2]>::try_from(args) {
            Ok([l, r]) => Ok((l, r)),
            Err(_) => Err(err),
        },
        _ => Err(err),
    }
}

fn unary_operand(p: &Parser, set: OperatorSet, op: Token, operand: Expr) -> PResult<Expr> {
    let err = ParseError::at(
        ErrorKind::IncompatibleOperand {
            op: op.text.to_string(),
            ty: operand.ty.to_string(),
        },
        op.pos(),
    );
    let args = [operand];
    match resolve(set.signatures(), &args, |arg, ty| p.promote(arg, ty, false)) {
        Resolution::Found { args, .. } => args.into_iter().next().ok_or(err),
        _ => Err(err),
    }
}

fn binary(p: &Parser, op: BinaryOp, left: Expr, right: Expr, ty: Ty, start: u32) -> Expr {
    Expr::new(
        ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        ty,
        p.span_from(start),
    )
}

fn logical(
    p: &Parser,
    bop: BinaryOp,
    op: Token,
    left: Expr,
    right: Expr,
    start: u32,
) -> PResult<Expr> {
    let (l, r) = binary_operands(p, OperatorSet::Logical, op, left, right)?;
    let ty = if l.ty.is_nullable() {
        Ty::nullable(Ty::Bool)
    } else {
        Ty::Bool
    };
    Ok(binary(p, bop, l, r, ty, start))
}

/// Result type of `+ - * / %`: the operand type, except that the
/// difference of two dates is a `TimeSpan`.
fn arithmetic(p: &Parser, op: BinaryOp, left: Expr, right: Expr, start: u32) -> Expr {
    let dates = left.ty.non_nullable() == &Ty::DateTime && right.ty.non_nullable() == &Ty::DateTime;
    let ty = match (op, dates) {
        (BinaryOp::Subtract, true) if left.ty.is_nullable() => Ty::nullable(Ty::TimeSpan),
        (BinaryOp::Subtract, true) => Ty::TimeSpan,
        _ => left.ty.clone(),
    };
    binary(p, op, left, right, ty, start)
}

fn is_enum_like(ty: &Ty) -> bool {
    ty.non_nullable().is_enum()
}

/// Bring both sides of a comparison to a common type.
///
/// Reference equality needs one side assignable to the other; comparisons
/// involving an enum promote the other side to the enum; everything else
/// resolves against the equality or relational operator table.
fn comparison_operands(p: &Parser, op: Token, left: Expr, right: Expr) -> PResult<(Expr, Expr)> {
    let is_equality = op.kind.is_equality();
    if is_equality && !left.ty.is_value_type() && !right.ty.is_value_type() {
        if left.ty == right.ty {
            return Ok((left, right));
        }
        if is_assignable_from(&left.ty, &right.ty) {
            let ty = left.ty.clone();
            return Ok((left, right.convert(ty)));
        }
        if is_assignable_from(&right.ty, &left.ty) {
            let ty = right.ty.clone();
            return Ok((left.convert(ty), right));
        }
        return Err(incompatible_operands(op, &left.ty, &right.ty));
    }
    if is_enum_like(&left.ty) || is_enum_like(&right.ty) {
        if left.ty == right.ty {
            return Ok((left, right));
        }
        if let Some(r) = p.promote(&right, &left.ty, true) {
            return Ok((left, r));
        }
        if let Some(l) = p.promote(&left, &right.ty, true) {
            return Ok((l, right));
        }
        return Err(incompatible_operands(op, &left.ty, &right.ty));
    }
    let set = if is_equality {
        OperatorSet::Equality
    } else {
        OperatorSet::Relational
    };
    binary_operands(p, set, op, left, right)
}

/// Build the comparison node. Ordering comparisons of strings go through
/// `String.Compare(left, right) <op> 0`.
fn comparison_node(p: &Parser, op: Token, left: Expr, right: Expr, start: u32) -> PResult<Expr> {
    let bop = match op.kind {
        TokenKind::Equal | TokenKind::DoubleEqual => BinaryOp::Equal,
        TokenKind::ExclamationEqual | TokenKind::LessGreater => BinaryOp::NotEqual,
        TokenKind::GreaterThan => BinaryOp::GreaterThan,
        TokenKind::GreaterThanEqual => BinaryOp::GreaterThanOrEqual,
        TokenKind::LessThan => BinaryOp::LessThan,
        _ => BinaryOp::LessThanOrEqual,
    };
    if left.ty == Ty::String && !op.kind.is_equality() {
        let err = incompatible_operands(op, &left.ty, &right.ty);
        let span = p.span_from(start);
        let compare = string_static_call(p, "Compare", vec![left, right], start).ok_or(err)?;
        let zero = Expr::constant(Value::Int32(0), Ty::Int32, span);
        return Ok(binary(p, bop, compare, zero, Ty::Bool, start));
    }
    Ok(binary(p, bop, left, right, Ty::Bool, start))
}

/// `String.Concat(Object, Object)` over both operands, boxing value types.
fn concat(p: &Parser, op: Token, left: Expr, right: Expr, start: u32) -> PResult<Expr> {
    let err = incompatible_operands(op, &left.ty, &right.ty);
    let boxed = |e: Expr| {
        if e.ty.is_value_type() {
            e.convert(Ty::Object)
        } else {
            e
        }
    };
    string_static_call(p, "Concat", vec![boxed(left), boxed(right)], start).ok_or(err)
}

fn string_static_call(p: &Parser, name: &str, args: Vec<Expr>, start: u32) -> Option<Expr> {
    let def = definition(&Ty::String)?;
    let Resolution::Found { candidate, args } =
        resolve(def.methods(name, true), &args, |arg, ty| p.promote(arg, ty, false))
    else {
        return None;
    };
    let ty = candidate.ret.clone();
    Some(Expr::new(
        ExprKind::Call {
            target: None,
            owner: Ty::String,
            method: candidate,
            args,
        },
        ty,
        p.span_from(start),
    ))
}

// ── Conditional ────────────────────────────────────────────────────────

fn branch_name(e: &Expr) -> String {
    if e.is_null_literal() {
        "null".to_string()
    } else {
        e.ty.to_string()
    }
}

/// The rule shared by `?:` and `iif`: a `Boolean` test, and branches of
/// the same type or where exactly one converts to the other's type.
pub(crate) fn conditional(
    p: &Parser,
    test: Expr,
    then: Expr,
    otherwise: Expr,
    pos: u32,
) -> PResult<Expr> {
    if test.ty != Ty::Bool {
        return Err(ParseError::at(ErrorKind::FirstExprMustBeBool, pos));
    }
    let (then, otherwise) = if then.ty == otherwise.ty {
        (then, otherwise)
    } else {
        let then_as_other = if otherwise.is_null_literal() {
            None
        } else {
            p.promote(&then, &otherwise.ty, true)
        };
        let other_as_then = if then.is_null_literal() {
            None
        } else {
            p.promote(&otherwise, &then.ty, true)
        };
        match (then_as_other, other_as_then) {
            (Some(t), None) => (t, otherwise),
            (None, Some(o)) => (then, o),
            (Some(_), Some(_)) => {
                return Err(ParseError::at(
                    ErrorKind::BothTypesConvertToOther {
                        first: branch_name(&then),
                        second: branch_name(&otherwise),
                    },
                    pos,
                ));
            }
            (None, None) => {
                return Err(ParseError::at(
                    ErrorKind::NeitherTypeConvertsToOther {
                        first: branch_name(&then),
                        second: branch_name(&otherwise),
                    },
                    pos,
                ));
            }
        }
    };
    let ty = then.ty.clone();
    Ok(Expr::new(
        ExprKind::Conditional {
            test: Box::new(test),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        },
        ty,
        p.span_from(pos),
    ))
}

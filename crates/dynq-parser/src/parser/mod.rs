//! Recursive-descent parser for dynq expressions.
//!
//! The parser pulls tokens from the lexer one at a time and builds a typed
//! [`Expr`] directly: there is no untyped syntax tree in between. Every
//! operator, call, index and conversion site is resolved against the type
//! system the moment it is parsed, and the first problem found aborts the
//! parse with a [`ParseError`].
//!
//! # Layout
//!
//! - `expressions`: the precedence levels, operators, literals and the
//!   conditional rule shared by `?:` and `iif`.
//! - `members`: identifiers, type names, member access, aggregates,
//!   indexing, `new(...)` projections and lambda invocation.
//!
//! Grammar functions are free functions over `&mut Parser`; the parser
//! itself only owns the cursor and the per-parse tables.

pub(crate) mod expressions;
pub(crate) mod members;

use std::borrow::Cow;

use rustc_hash::FxHashMap;

use dynq_common::error::{ErrorKind, ParseError};
use dynq_common::span::Span;
use dynq_common::token::{Token, TokenKind};
use dynq_lexer::Lexer;
use dynq_typeck::builtins::builtin_type;
use dynq_typeck::{RecordTypeFactory, Ty};

use crate::convert;
use crate::expr::{Expr, OrderingKey, Param};
use crate::literals::LiteralTable;
use crate::symbols::SymbolTable;

pub(crate) type PResult<T> = Result<T, ParseError>;

/// Single-use parser state for one parse call.
pub(crate) struct Parser<'src, 'ctx> {
    lexer: Lexer<'src>,
    /// The current token.
    token: Token<'src>,
    /// End offset of the last consumed token, for node spans.
    prev_end: u32,
    /// Position of a unary minus waiting to be folded into the next
    /// numeric literal.
    negated: Option<u32>,
    symbols: SymbolTable,
    /// Caller-registered type names, keyed in lower case.
    known_types: &'ctx FxHashMap<String, Ty>,
    records: &'ctx RecordTypeFactory,
    literals: LiteralTable,
    /// The implicit parameter currently in scope. Aggregate arguments
    /// replace it with the element parameter while they are parsed.
    it: Option<Param>,
}

impl<'src, 'ctx> Parser<'src, 'ctx> {
    pub(crate) fn new(
        source: &'src str,
        symbols: SymbolTable,
        known_types: &'ctx FxHashMap<String, Ty>,
        records: &'ctx RecordTypeFactory,
    ) -> PResult<Self> {
        let mut lexer = Lexer::new(source);
        let token = lexer.next_token()?;
        let it = symbols.it().cloned();
        Ok(Parser {
            lexer,
            token,
            prev_end: 0,
            negated: None,
            symbols,
            known_types,
            records,
            literals: LiteralTable::new(),
            it,
        })
    }

    // ── Entry points ───────────────────────────────────────────────────

    /// Parse one expression spanning the whole source. With a result type,
    /// the expression must promote to it exactly.
    pub(crate) fn parse(mut self, result_type: Option<&Ty>) -> PResult<Expr> {
        let start = self.token.pos();
        let mut expr = expressions::expr(&mut self)?;
        if let Some(ty) = result_type {
            expr = self.promote(&expr, ty, true).ok_or_else(|| {
                ParseError::at(ErrorKind::ExpressionTypeMismatch(ty.to_string()), start)
            })?;
        }
        self.expect(TokenKind::End, ErrorKind::SyntaxError)?;
        tracing::debug!(ty = %expr.ty, literals = self.literals.len(), "parsed expression");
        Ok(expr)
    }

    /// Parse `expr [asc|ascending|desc|descending], ...` spanning the
    /// whole source.
    pub(crate) fn parse_ordering(mut self) -> PResult<Vec<OrderingKey>> {
        let mut keys = Vec::new();
        loop {
            let selector = expressions::expr(&mut self)?;
            let mut ascending = true;
            if self.token.is_identifier("asc") || self.token.is_identifier("ascending") {
                self.advance()?;
            } else if self.token.is_identifier("desc") || self.token.is_identifier("descending") {
                self.advance()?;
                ascending = false;
            }
            keys.push(OrderingKey {
                selector,
                ascending,
            });
            if self.token.kind != TokenKind::Comma {
                break;
            }
            self.advance()?;
        }
        self.expect(TokenKind::End, ErrorKind::SyntaxError)?;
        tracing::debug!(keys = keys.len(), "parsed ordering");
        Ok(keys)
    }

    // ── Cursor ─────────────────────────────────────────────────────────

    pub(crate) fn current(&self) -> TokenKind {
        self.token.kind
    }

    pub(crate) fn token(&self) -> Token<'src> {
        self.token
    }

    pub(crate) fn pos(&self) -> u32 {
        self.token.pos()
    }

    pub(crate) fn at_word(&self, word: &str) -> bool {
        self.token.is_identifier(word)
    }

    /// Move to the next token.
    pub(crate) fn advance(&mut self) -> PResult<()> {
        self.prev_end = self.token.span.end;
        self.token = self.lexer.next_token()?;
        Ok(())
    }

    /// Consume a token of the given kind, or fail with `err` at the
    /// current token.
    pub(crate) fn expect(&mut self, kind: TokenKind, err: ErrorKind) -> PResult<()> {
        if self.token.kind != kind {
            return Err(self.error(err));
        }
        self.advance()
    }

    pub(crate) fn error(&self, kind: ErrorKind) -> ParseError {
        ParseError::at(kind, self.token.pos())
    }

    /// Span from `start` to the end of the last consumed token.
    pub(crate) fn span_from(&self, start: u32) -> Span {
        Span::new(start, self.prev_end.max(start))
    }

    /// The current identifier, with a verbatim `@` prefix stripped.
    pub(crate) fn identifier(&self) -> PResult<&'src str> {
        if self.token.kind != TokenKind::Identifier {
            return Err(self.error(ErrorKind::IdentifierExpected));
        }
        let text = self.token.text;
        match text.strip_prefix('@') {
            Some(rest) if !rest.is_empty() => Ok(rest),
            _ => Ok(text),
        }
    }

    /// Take the pending unary minus, if any, and return the literal text and
    /// start position with the sign folded in.
    pub(crate) fn literal_text(&mut self) -> (Cow<'src, str>, u32) {
        match self.negated.take() {
            Some(pos) => (Cow::Owned(format!("-{}", self.token.text)), pos),
            None => (Cow::Borrowed(self.token.text), self.token.pos()),
        }
    }

    // ── Tables ─────────────────────────────────────────────────────────

    pub(crate) fn promote(&self, expr: &Expr, ty: &Ty, exact: bool) -> Option<Expr> {
        convert::promote(&self.literals, expr, ty, exact)
    }

    /// A predefined or caller-registered type with the given name.
    pub(crate) fn type_named(&self, name: &str) -> Option<Ty> {
        builtin_type(name).or_else(|| self.known_types.get(&name.to_ascii_lowercase()).cloned())
    }
}

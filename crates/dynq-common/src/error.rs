//! The single error type surfaced by the dynq front end.
//!
//! Lexing, parsing and semantic resolution all fail through [`ParseError`]:
//! a kind (which renders the human-readable message) plus the character
//! span at which the problem was detected. Nothing is recovered mid-parse.

use std::fmt;

use serde::Serialize;

use crate::span::Span;

/// Coarse grouping of error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorCategory {
    Lexical,
    Syntax,
    NameResolution,
    TypeResolution,
}

/// The specific condition that stopped the parse.
///
/// Type names carried by variants are already rendered (e.g. `Int32?`), so
/// this crate does not depend on the type checker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ErrorKind {
    // ── Lexical ────────────────────────────────────────────────────────
    InvalidCharacter(char),
    UnterminatedStringLiteral,
    DigitExpected,
    InvalidIntegerLiteral(String),
    InvalidRealLiteral(String),
    InvalidCharacterLiteral,

    // ── Syntax ─────────────────────────────────────────────────────────
    SyntaxError,
    ExpressionExpected,
    OpenParenExpected,
    CloseParenOrOperatorExpected,
    CloseParenOrCommaExpected,
    CloseBracketOrCommaExpected,
    ColonExpected,
    IdentifierExpected,
    DotOrOpenParenExpected,
    IifRequiresThreeArgs,
    MissingAsClause,

    // ── Name resolution ────────────────────────────────────────────────
    DuplicateIdentifier(String),
    UnknownIdentifier(String),
    UnknownPropertyOrField { member: String, ty: String },
    NoItInScope,
    DuplicateRecordField(String),
    MisplacedExternals,

    // ── Type resolution ────────────────────────────────────────────────
    IncompatibleOperand { op: String, ty: String },
    IncompatibleOperands { op: String, left: String, right: String },
    NoApplicableMethod { method: String, ty: String },
    AmbiguousMethodInvocation { method: String, ty: String },
    MethodIsVoid { method: String, ty: String },
    NoMatchingConstructor(String),
    AmbiguousConstructorInvocation(String),
    NoApplicableIndexer(String),
    AmbiguousIndexerInvocation(String),
    NoApplicableAggregate(String),
    ArgsIncompatibleWithLambda,
    FirstExprMustBeBool,
    BothTypesConvertToOther { first: String, second: String },
    NeitherTypeConvertsToOther { first: String, second: String },
    TypeHasNoNullableForm(String),
    CannotConvertValue { from: String, to: String },
    ExpressionTypeMismatch(String),
    CannotIndexMultiDimArray,
    InvalidIndex,
}

impl ErrorKind {
    pub fn category(&self) -> ErrorCategory {
        use ErrorKind::*;
        match self {
            InvalidCharacter(_)
            | UnterminatedStringLiteral
            | DigitExpected
            | InvalidIntegerLiteral(_)
            | InvalidRealLiteral(_)
            | InvalidCharacterLiteral => ErrorCategory::Lexical,
            SyntaxError
            | ExpressionExpected
            | OpenParenExpected
            | CloseParenOrOperatorExpected
            | CloseParenOrCommaExpected
            | CloseBracketOrCommaExpected
            | ColonExpected
            | IdentifierExpected
            | DotOrOpenParenExpected
            | IifRequiresThreeArgs
            | MissingAsClause => ErrorCategory::Syntax,
            DuplicateIdentifier(_)
            | UnknownIdentifier(_)
            | UnknownPropertyOrField { .. }
            | NoItInScope
            | DuplicateRecordField(_)
            | MisplacedExternals => ErrorCategory::NameResolution,
            _ => ErrorCategory::TypeResolution,
        }
    }

    /// Stable code used by the diagnostic renderer.
    pub fn code(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Lexical => "E0100",
            ErrorCategory::Syntax => "E0200",
            ErrorCategory::NameResolution => "E0300",
            ErrorCategory::TypeResolution => "E0400",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ErrorKind::*;
        match self {
            InvalidCharacter(c) => write!(f, "syntax error '{c}'"),
            UnterminatedStringLiteral => write!(f, "unterminated string literal"),
            DigitExpected => write!(f, "digit expected"),
            InvalidIntegerLiteral(text) => write!(f, "invalid integer literal '{text}'"),
            InvalidRealLiteral(text) => write!(f, "invalid real literal '{text}'"),
            InvalidCharacterLiteral => {
                write!(f, "character literal must contain exactly one character")
            }
            SyntaxError => write!(f, "syntax error"),
            ExpressionExpected => write!(f, "expression expected"),
            OpenParenExpected => write!(f, "'(' expected"),
            CloseParenOrOperatorExpected => write!(f, "')' or operator expected"),
            CloseParenOrCommaExpected => write!(f, "')' or ',' expected"),
            CloseBracketOrCommaExpected => write!(f, "']' or ',' expected"),
            ColonExpected => write!(f, "':' expected"),
            IdentifierExpected => write!(f, "identifier expected"),
            DotOrOpenParenExpected => write!(f, "'.' or '(' expected"),
            IifRequiresThreeArgs => write!(f, "the 'iif' function requires three arguments"),
            MissingAsClause => write!(f, "expression is missing an 'as' clause"),
            DuplicateIdentifier(name) => {
                write!(f, "the identifier '{name}' was defined more than once")
            }
            UnknownIdentifier(name) => write!(f, "unknown identifier '{name}'"),
            UnknownPropertyOrField { member, ty } => {
                write!(f, "no property or field '{member}' exists in type '{ty}'")
            }
            NoItInScope => write!(f, "no 'it' is in scope"),
            DuplicateRecordField(name) => {
                write!(f, "the property '{name}' appears more than once in new()")
            }
            MisplacedExternals => {
                write!(f, "a map of external values must be the last substitution value")
            }
            IncompatibleOperand { op, ty } => {
                write!(f, "operator '{op}' incompatible with operand type '{ty}'")
            }
            IncompatibleOperands { op, left, right } => write!(
                f,
                "operator '{op}' incompatible with operand types '{left}' and '{right}'"
            ),
            NoApplicableMethod { method, ty } => {
                write!(f, "no applicable method '{method}' exists in type '{ty}'")
            }
            AmbiguousMethodInvocation { method, ty } => {
                write!(f, "ambiguous invocation of method '{method}' in type '{ty}'")
            }
            MethodIsVoid { method, ty } => {
                write!(f, "method '{method}' in type '{ty}' does not return a value")
            }
            NoMatchingConstructor(ty) => write!(f, "no matching constructor in type '{ty}'"),
            AmbiguousConstructorInvocation(ty) => {
                write!(f, "ambiguous invocation of '{ty}' constructor")
            }
            NoApplicableIndexer(ty) => write!(f, "no applicable indexer exists in type '{ty}'"),
            AmbiguousIndexerInvocation(ty) => {
                write!(f, "ambiguous invocation of indexer in type '{ty}'")
            }
            NoApplicableAggregate(name) => {
                write!(f, "no applicable aggregate method '{name}' exists")
            }
            ArgsIncompatibleWithLambda => {
                write!(f, "argument list incompatible with lambda expression")
            }
            FirstExprMustBeBool => write!(f, "the first expression must be of type 'Boolean'"),
            BothTypesConvertToOther { first, second } => write!(
                f,
                "both of the types '{first}' and '{second}' convert to the other"
            ),
            NeitherTypeConvertsToOther { first, second } => write!(
                f,
                "neither of the types '{first}' and '{second}' converts to the other"
            ),
            TypeHasNoNullableForm(ty) => write!(f, "type '{ty}' has no nullable form"),
            CannotConvertValue { from, to } => {
                write!(f, "a value of type '{from}' cannot be converted to type '{to}'")
            }
            ExpressionTypeMismatch(ty) => write!(f, "expression of type '{ty}' expected"),
            CannotIndexMultiDimArray => {
                write!(f, "indexing of multi-dimensional arrays is not supported")
            }
            InvalidIndex => write!(f, "array index must be an integer expression"),
        }
    }
}

/// A fatal lexing, parsing or resolution error with its source location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseError {
    pub kind: ErrorKind,
    pub span: Span,
}

impl ParseError {
    pub fn new(kind: ErrorKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// An error anchored at a single character offset.
    pub fn at(kind: ErrorKind, pos: u32) -> Self {
        Self::new(kind, Span::at(pos))
    }

    /// Zero-based character offset at which the condition was detected.
    pub fn position(&self) -> u32 {
        self.span.start
    }

    /// The rendered message, without the position suffix.
    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (at index {})", self.kind, self.span.start)
    }
}

impl std::error::Error for ParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_position() {
        let err = ParseError::at(ErrorKind::UnknownIdentifier("foo".into()), 7);
        assert_eq!(err.to_string(), "unknown identifier 'foo' (at index 7)");
        assert_eq!(err.message(), "unknown identifier 'foo'");
        assert_eq!(err.position(), 7);
    }

    #[test]
    fn categories() {
        assert_eq!(
            ErrorKind::UnterminatedStringLiteral.category(),
            ErrorCategory::Lexical
        );
        assert_eq!(ErrorKind::ColonExpected.category(), ErrorCategory::Syntax);
        assert_eq!(ErrorKind::NoItInScope.category(), ErrorCategory::NameResolution);
        assert_eq!(
            ErrorKind::IncompatibleOperands {
                op: "+".into(),
                left: "String".into(),
                right: "Int32".into(),
            }
            .category(),
            ErrorCategory::TypeResolution
        );
    }

    #[test]
    fn operand_message_names_both_types() {
        let kind = ErrorKind::IncompatibleOperands {
            op: "-".into(),
            left: "String".into(),
            right: "Boolean".into(),
        };
        assert_eq!(
            kind.to_string(),
            "operator '-' incompatible with operand types 'String' and 'Boolean'"
        );
    }
}

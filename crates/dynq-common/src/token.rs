use serde::Serialize;

use crate::span::Span;

/// A token produced by the dynq lexer.
///
/// Tokens borrow their text from the source string and are superseded by the
/// next call to the lexer; the parser only ever holds the current one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Token<'src> {
    pub kind: TokenKind,
    pub text: &'src str,
    pub span: Span,
}

impl<'src> Token<'src> {
    pub fn new(kind: TokenKind, text: &'src str, start: u32, end: u32) -> Self {
        Self {
            kind,
            text,
            span: Span::new(start, end),
        }
    }

    /// Start offset of the token, used for error positions.
    pub fn pos(&self) -> u32 {
        self.span.start
    }

    /// Whether this is an identifier spelled `word`, ignoring case.
    ///
    /// The word operators (`and`, `or`, `not`, `mod`) and the ordering
    /// keywords are plain identifiers; the parser recognises them by text.
    pub fn is_identifier(&self, word: &str) -> bool {
        self.kind == TokenKind::Identifier && self.text.eq_ignore_ascii_case(word)
    }
}

/// Every kind of token in a dynq expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    // ── Literals and names ────────────────────────────────────────────
    Identifier,
    StringLiteral,
    IntegerLiteral,
    RealLiteral,

    // ── Single-character operators and punctuation ────────────────────
    /// `!`
    Exclamation,
    /// `%`
    Percent,
    /// `&`
    Amphersand,
    /// `(`
    OpenParen,
    /// `)`
    CloseParen,
    /// `*`
    Asterisk,
    /// `+`
    Plus,
    /// `,`
    Comma,
    /// `-`
    Minus,
    /// `.`
    Dot,
    /// `/`
    Slash,
    /// `:`
    Colon,
    /// `<`
    LessThan,
    /// `=`
    Equal,
    /// `>`
    GreaterThan,
    /// `?`
    Question,
    /// `[`
    OpenBracket,
    /// `]`
    CloseBracket,
    /// `|`
    Bar,

    // ── Two-character operators ───────────────────────────────────────
    /// `!=`
    ExclamationEqual,
    /// `&&`
    DoubleAmphersand,
    /// `<=`
    LessThanEqual,
    /// `<>`
    LessGreater,
    /// `==`
    DoubleEqual,
    /// `>=`
    GreaterThanEqual,
    /// `||`
    DoubleBar,

    /// End of input.
    End,
}

impl TokenKind {
    /// Whether the token is one of the equality/relational operators.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            TokenKind::Equal
                | TokenKind::DoubleEqual
                | TokenKind::ExclamationEqual
                | TokenKind::LessGreater
                | TokenKind::GreaterThan
                | TokenKind::GreaterThanEqual
                | TokenKind::LessThan
                | TokenKind::LessThanEqual
        )
    }

    /// Whether the token is an equality operator (`=`, `==`, `!=`, `<>`).
    pub fn is_equality(self) -> bool {
        matches!(
            self,
            TokenKind::Equal
                | TokenKind::DoubleEqual
                | TokenKind::ExclamationEqual
                | TokenKind::LessGreater
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_operators_match_case_insensitively() {
        let tok = Token::new(TokenKind::Identifier, "AnD", 0, 3);
        assert!(tok.is_identifier("and"));
        assert!(!tok.is_identifier("or"));
        let lit = Token::new(TokenKind::StringLiteral, "'and'", 0, 5);
        assert!(!lit.is_identifier("and"));
    }

    #[test]
    fn comparison_classification() {
        assert!(TokenKind::LessGreater.is_comparison());
        assert!(TokenKind::LessGreater.is_equality());
        assert!(TokenKind::GreaterThanEqual.is_comparison());
        assert!(!TokenKind::GreaterThanEqual.is_equality());
        assert!(!TokenKind::Plus.is_comparison());
    }
}

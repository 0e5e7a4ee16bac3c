// dynq lexer -- on-demand tokenizer for dynq expressions.

mod cursor;

use cursor::{Cursor, Mark};
use dynq_common::error::{ErrorKind, ParseError};
use dynq_common::token::{Token, TokenKind};

/// The dynq lexer. Produces one token per call to [`Lexer::next_token`].
///
/// There is no token buffer: the parser pulls tokens as it needs them and
/// never looks back. After the end of input every further call yields an
/// `End` token positioned at the source length.
pub struct Lexer<'src> {
    cursor: Cursor<'src>,
    /// Set once `End` has been handed out through the iterator.
    emitted_end: bool,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            cursor: Cursor::new(source),
            emitted_end: false,
        }
    }

    /// Tokenize the entire source, including the final `End` token.
    pub fn tokenize(source: &'src str) -> Result<Vec<Token<'src>>, ParseError> {
        Lexer::new(source).collect()
    }

    /// Skip whitespace and produce the next token.
    pub fn next_token(&mut self) -> Result<Token<'src>, ParseError> {
        self.cursor.eat_while(char::is_whitespace);

        let start = self.cursor.mark();
        let Some(c) = self.cursor.peek() else {
            return Ok(self.finish(TokenKind::End, start));
        };

        let kind = match c {
            // ── Operators and punctuation ────────────────────────────────
            '!' => self.one_or_two(TokenKind::Exclamation, &[('=', TokenKind::ExclamationEqual)]),
            '%' => self.single(TokenKind::Percent),
            '&' => self.one_or_two(TokenKind::Amphersand, &[('&', TokenKind::DoubleAmphersand)]),
            '(' => self.single(TokenKind::OpenParen),
            ')' => self.single(TokenKind::CloseParen),
            '*' => self.single(TokenKind::Asterisk),
            '+' => self.single(TokenKind::Plus),
            ',' => self.single(TokenKind::Comma),
            '-' => self.single(TokenKind::Minus),
            '.' => self.single(TokenKind::Dot),
            '/' => self.single(TokenKind::Slash),
            ':' => self.single(TokenKind::Colon),
            '<' => self.one_or_two(
                TokenKind::LessThan,
                &[('=', TokenKind::LessThanEqual), ('>', TokenKind::LessGreater)],
            ),
            '=' => self.one_or_two(TokenKind::Equal, &[('=', TokenKind::DoubleEqual)]),
            '>' => self.one_or_two(TokenKind::GreaterThan, &[('=', TokenKind::GreaterThanEqual)]),
            '?' => self.single(TokenKind::Question),
            '[' => self.single(TokenKind::OpenBracket),
            ']' => self.single(TokenKind::CloseBracket),
            '|' => self.one_or_two(TokenKind::Bar, &[('|', TokenKind::DoubleBar)]),

            // ── Literals ─────────────────────────────────────────────────
            '"' | '\'' => self.lex_string(c)?,
            '0'..='9' => self.lex_number()?,

            // ── Identifiers ──────────────────────────────────────────────
            c if is_ident_start(c) => {
                self.cursor.advance();
                self.cursor.eat_while(is_ident_continue);
                TokenKind::Identifier
            }

            _ => return Err(ParseError::at(ErrorKind::InvalidCharacter(c), start.char)),
        };

        Ok(self.finish(kind, start))
    }

    fn finish(&self, kind: TokenKind, start: Mark) -> Token<'src> {
        Token::new(
            kind,
            self.cursor.slice_from(start),
            start.char,
            self.cursor.pos(),
        )
    }

    // ── Helpers ──────────────────────────────────────────────────────────

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.cursor.advance();
        kind
    }

    /// Consume one character, then a second one if it forms a listed pair.
    fn one_or_two(&mut self, single: TokenKind, pairs: &[(char, TokenKind)]) -> TokenKind {
        self.cursor.advance();
        for &(next, kind) in pairs {
            if self.cursor.eat(next) {
                return kind;
            }
        }
        single
    }

    /// A quoted literal; a doubled delimiter stands for one delimiter.
    ///
    /// The token text keeps the quotes and the doubled delimiters; the
    /// parser unescapes it.
    fn lex_string(&mut self, quote: char) -> Result<TokenKind, ParseError> {
        self.cursor.advance();
        loop {
            self.cursor.eat_while(|c| c != quote);
            if self.cursor.is_eof() {
                return Err(ParseError::at(
                    ErrorKind::UnterminatedStringLiteral,
                    self.cursor.pos(),
                ));
            }
            self.cursor.advance();
            if !self.cursor.eat(quote) {
                return Ok(TokenKind::StringLiteral);
            }
        }
    }

    /// Digits, an optional fraction, an optional exponent and an optional
    /// `f`/`F` suffix. Anything past the integer part makes it a real.
    fn lex_number(&mut self) -> Result<TokenKind, ParseError> {
        let mut kind = TokenKind::IntegerLiteral;
        self.cursor.eat_while(|c| c.is_ascii_digit());

        if self.cursor.eat('.') {
            kind = TokenKind::RealLiteral;
            self.expect_digit()?;
        }

        if matches!(self.cursor.peek(), Some('e' | 'E')) {
            kind = TokenKind::RealLiteral;
            self.cursor.advance();
            if matches!(self.cursor.peek(), Some('+' | '-')) {
                self.cursor.advance();
            }
            self.expect_digit()?;
        }

        if matches!(self.cursor.peek(), Some('f' | 'F')) {
            kind = TokenKind::RealLiteral;
            self.cursor.advance();
        }

        Ok(kind)
    }

    fn expect_digit(&mut self) -> Result<(), ParseError> {
        if !self.cursor.peek().is_some_and(|c| c.is_ascii_digit()) {
            return Err(ParseError::at(ErrorKind::DigitExpected, self.cursor.pos()));
        }
        self.cursor.eat_while(|c| c.is_ascii_digit());
        Ok(())
    }
}

impl<'src> Iterator for Lexer<'src> {
    type Item = Result<Token<'src>, ParseError>;

    /// Yields every token up to and including `End`, or stops after the
    /// first error.
    fn next(&mut self) -> Option<Self::Item> {
        if self.emitted_end {
            return None;
        }
        let result = self.next_token();
        match &result {
            Ok(token) if token.kind == TokenKind::End => self.emitted_end = true,
            Err(_) => self.emitted_end = true,
            Ok(_) => {}
        }
        Some(result)
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '@'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::tokenize(source)
            .expect("lexes")
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn empty_source_is_end() {
        assert_eq!(kinds(""), vec![TokenKind::End]);
        assert_eq!(kinds("   \t\n"), vec![TokenKind::End]);
    }

    #[test]
    fn end_repeats_after_input() {
        let mut lexer = Lexer::new("x");
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Identifier);
        let end = lexer.next_token().unwrap();
        assert_eq!(end.kind, TokenKind::End);
        assert_eq!(end.pos(), 1);
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::End);
    }

    #[test]
    fn two_character_operators() {
        assert_eq!(
            kinds("== != <> <= >= && ||"),
            vec![
                TokenKind::DoubleEqual,
                TokenKind::ExclamationEqual,
                TokenKind::LessGreater,
                TokenKind::LessThanEqual,
                TokenKind::GreaterThanEqual,
                TokenKind::DoubleAmphersand,
                TokenKind::DoubleBar,
                TokenKind::End,
            ]
        );
    }

    #[test]
    fn number_forms() {
        assert_eq!(kinds("12")[0], TokenKind::IntegerLiteral);
        assert_eq!(kinds("1.5")[0], TokenKind::RealLiteral);
        assert_eq!(kinds("1e10")[0], TokenKind::RealLiteral);
        assert_eq!(kinds("1.5E-3")[0], TokenKind::RealLiteral);
        assert_eq!(kinds("2f")[0], TokenKind::RealLiteral);
        assert_eq!(kinds("2.5F")[0], TokenKind::RealLiteral);
    }

    #[test]
    fn dot_after_digits_needs_a_digit() {
        let err = Lexer::tokenize("1.x").unwrap_err();
        assert_eq!(err.kind, ErrorKind::DigitExpected);
        assert_eq!(err.position(), 2);
    }

    #[test]
    fn exponent_needs_a_digit() {
        let err = Lexer::tokenize("1e+").unwrap_err();
        assert_eq!(err.kind, ErrorKind::DigitExpected);
        assert_eq!(err.position(), 3);
    }

    #[test]
    fn doubled_quote_stays_inside_literal() {
        let tokens = Lexer::tokenize("'it''s' \"a\"\"b\"").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::StringLiteral);
        assert_eq!(tokens[0].text, "'it''s'");
        assert_eq!(tokens[1].text, "\"a\"\"b\"");
    }

    #[test]
    fn unterminated_string_reports_end_of_input() {
        let err = Lexer::tokenize("x == 'abc").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnterminatedStringLiteral);
        assert_eq!(err.position(), 9);
    }

    #[test]
    fn invalid_character_position() {
        let err = Lexer::tokenize("a # b").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidCharacter('#'));
        assert_eq!(err.position(), 2);
    }

    #[test]
    fn verbatim_identifiers_keep_their_marker() {
        let tokens = Lexer::tokenize("@0 @class _x1").unwrap();
        assert_eq!(tokens[0].text, "@0");
        assert_eq!(tokens[1].text, "@class");
        assert_eq!(tokens[2].text, "_x1");
        assert!(tokens[..3].iter().all(|t| t.kind == TokenKind::Identifier));
    }

    #[test]
    fn spans_are_character_offsets() {
        let tokens = Lexer::tokenize("'é' + b").unwrap();
        assert_eq!(tokens[0].span.end, 3);
        assert_eq!(tokens[1].pos(), 4);
        assert_eq!(tokens[2].pos(), 6);
    }
}

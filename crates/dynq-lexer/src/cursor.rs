/// Character iterator over a dynq expression.
///
/// Tracks two positions: the byte offset (for slicing token text out of the
/// source) and the character offset (what spans and error positions use).
pub struct Cursor<'src> {
    source: &'src str,
    byte_pos: usize,
    char_pos: u32,
    chars: std::str::Chars<'src>,
}

/// A saved cursor location, as both byte and character offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark {
    pub byte: usize,
    pub char: u32,
}

impl<'src> Cursor<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            byte_pos: 0,
            char_pos: 0,
            chars: source.chars(),
        }
    }

    /// Look at the current character without consuming it.
    pub fn peek(&self) -> Option<char> {
        self.chars.clone().next()
    }

    /// Consume the current character.
    pub fn advance(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.byte_pos += c.len_utf8();
        self.char_pos += 1;
        Some(c)
    }

    /// Consume the current character if it equals `expected`.
    pub fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Current character offset.
    pub fn pos(&self) -> u32 {
        self.char_pos
    }

    pub fn mark(&self) -> Mark {
        Mark {
            byte: self.byte_pos,
            char: self.char_pos,
        }
    }

    pub fn is_eof(&self) -> bool {
        self.peek().is_none()
    }

    /// Advance while the predicate holds for the current character.
    pub fn eat_while(&mut self, predicate: impl Fn(char) -> bool) {
        while let Some(c) = self.peek() {
            if !predicate(c) {
                break;
            }
            self.advance();
        }
    }

    /// Source text from `from` up to the current position.
    pub fn slice_from(&self, from: Mark) -> &'src str {
        &self.source[from.byte..self.byte_pos]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_cursor_starts_at_zero() {
        let cursor = Cursor::new("abc");
        assert_eq!(cursor.pos(), 0);
        assert!(!cursor.is_eof());
    }

    #[test]
    fn peek_does_not_advance() {
        let cursor = Cursor::new("ab");
        assert_eq!(cursor.peek(), Some('a'));
        assert_eq!(cursor.pos(), 0);
    }

    #[test]
    fn positions_count_characters() {
        let mut cursor = Cursor::new("\u{00E9}a");
        let start = cursor.mark();
        assert_eq!(cursor.advance(), Some('\u{00E9}'));
        assert_eq!(cursor.pos(), 1);
        assert_eq!(cursor.mark().byte, 2);
        cursor.advance();
        assert_eq!(cursor.slice_from(start), "\u{00E9}a");
        assert!(cursor.is_eof());
    }

    #[test]
    fn eat_and_eat_while() {
        let mut cursor = Cursor::new("==x1");
        assert!(cursor.eat('='));
        assert!(!cursor.eat('!'));
        cursor.eat_while(|c| c == '=');
        let start = cursor.mark();
        cursor.eat_while(char::is_alphanumeric);
        assert_eq!(cursor.slice_from(start), "x1");
    }
}

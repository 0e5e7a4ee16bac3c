use dynq_common::error::ErrorKind;
use dynq_lexer::Lexer;

/// One line per token: kind, quoted text and character span.
fn dump(source: &str) -> String {
    Lexer::tokenize(source)
        .expect("source should lex")
        .iter()
        .map(|tok| format!("{:?} {:?} {}..{}", tok.kind, tok.text, tok.span.start, tok.span.end))
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Token streams ────────────────────────────────────────────────────────

#[test]
fn test_predicate() {
    insta::assert_snapshot!(dump("Age >= 18 and Name <> 'Bob'"), @r#"
    Identifier "Age" 0..3
    GreaterThanEqual ">=" 4..6
    IntegerLiteral "18" 7..9
    Identifier "and" 10..13
    Identifier "Name" 14..18
    LessGreater "<>" 19..21
    StringLiteral "'Bob'" 22..27
    End "" 27..27
    "#);
}

#[test]
fn test_member_call_and_index() {
    insta::assert_snapshot!(dump("Orders[0].Lines.Sum(Price*2.5f)"), @r#"
    Identifier "Orders" 0..6
    OpenBracket "[" 6..7
    IntegerLiteral "0" 7..8
    CloseBracket "]" 8..9
    Dot "." 9..10
    Identifier "Lines" 10..15
    Dot "." 15..16
    Identifier "Sum" 16..19
    OpenParen "(" 19..20
    Identifier "Price" 20..25
    Asterisk "*" 25..26
    RealLiteral "2.5f" 26..30
    CloseParen ")" 30..31
    End "" 31..31
    "#);
}

#[test]
fn test_ternary_and_concat() {
    insta::assert_snapshot!(dump("x ? \"a\" & @0 : iif(!y, 1e3, -2)"), @r#"
    Identifier "x" 0..1
    Question "?" 2..3
    StringLiteral "\"a\"" 4..7
    Amphersand "&" 8..9
    Identifier "@0" 10..12
    Colon ":" 13..14
    Identifier "iif" 15..18
    OpenParen "(" 18..19
    Exclamation "!" 19..20
    Identifier "y" 20..21
    Comma "," 21..22
    RealLiteral "1e3" 23..26
    Comma "," 26..27
    Minus "-" 28..29
    IntegerLiteral "2" 29..30
    CloseParen ")" 30..31
    End "" 31..31
    "#);
}

#[test]
fn test_single_character_operators() {
    insta::assert_snapshot!(dump("a|b%c/d=e<f>g"), @r#"
    Identifier "a" 0..1
    Bar "|" 1..2
    Identifier "b" 2..3
    Percent "%" 3..4
    Identifier "c" 4..5
    Slash "/" 5..6
    Identifier "d" 6..7
    Equal "=" 7..8
    Identifier "e" 8..9
    LessThan "<" 9..10
    Identifier "f" 10..11
    GreaterThan ">" 11..12
    Identifier "g" 12..13
    End "" 13..13
    "#);
}

// ── Errors ───────────────────────────────────────────────────────────────

#[test]
fn test_iterator_stops_after_error() {
    let results: Vec<_> = Lexer::new("a ~ b").collect();
    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    let err = results[1].as_ref().unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidCharacter('~'));
    assert_eq!(err.position(), 2);
}

#[test]
fn test_unterminated_double_quoted() {
    let err = Lexer::tokenize("\"abc\"\"").unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnterminatedStringLiteral);
}

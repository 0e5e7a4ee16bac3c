//! End-to-end parsing: typed trees, promotion, overloads and errors.

use dynq_common::error::ErrorKind;
use dynq_parser::{Expr, ExprKind, Externals, ParseContext, Param, Symbol};
use dynq_typeck::{EnumType, HostType, RecordTypeFactory, Ty, Value};
use insta::assert_snapshot;
use rust_decimal::Decimal;

// ── Fixtures ───────────────────────────────────────────────────────────

struct Fixture {
    color: EnumType,
    customer: HostType,
}

fn fixture() -> Fixture {
    let color = EnumType::new("Color", [("Red", 0), ("Green", 1), ("Blue", 2)]);
    let customer = HostType::class("Customer")
        .property("Name", Ty::String, |_| Ok(Value::Null))
        .property("Age", Ty::Int32, |_| Ok(Value::Null))
        .property("Amounts", Ty::array(Ty::Decimal), |_| Ok(Value::Null))
        .property("Paint", Ty::Enum(color.clone()), |_| Ok(Value::Null))
        .method("Greet", [Ty::String], Ty::String, |_, _| Ok(Value::Null))
        .method("Touch", [], Ty::Void, |_, _| Ok(Value::Null))
        .build();
    Fixture { color, customer }
}

fn calculator() -> HostType {
    HostType::class("Calculator")
        .method("F", [Ty::Int32, Ty::Int32], Ty::String, |_, _| Ok(Value::from("int")))
        .method("F", [Ty::Int64, Ty::Int64], Ty::String, |_, _| Ok(Value::from("long")))
        .method("G", [Ty::Int64, Ty::Int32], Ty::String, |_, _| Ok(Value::from("a")))
        .method("G", [Ty::Int32, Ty::Int64], Ty::String, |_, _| Ok(Value::from("b")))
        .build()
}

/// Parse with the customer as the implicit `it`.
fn over_customer(f: &Fixture, source: &str) -> Result<Expr, dynq_common::error::ParseError> {
    ParseContext::new()
        .parameter(Param::anonymous(f.customer.ty()))
        .parse(source, None)
}

fn parse(source: &str) -> Expr {
    ParseContext::new().parse(source, None).expect("parse")
}

fn parse_err(source: &str) -> (ErrorKind, u32) {
    let err = ParseContext::new().parse(source, None).unwrap_err();
    (err.kind, err.span.start)
}

fn method_name(expr: &Expr) -> Option<&str> {
    match &expr.kind {
        ExprKind::Call { method, .. } => Some(method.name.as_str()),
        _ => None,
    }
}

// ── Arithmetic and literals ────────────────────────────────────────────

#[test]
fn integer_addition() {
    let expr = parse("1 + 2");
    assert_eq!(expr.ty, Ty::Int32);
    assert_snapshot!(expr.to_string(), @"(1 + 2)");
}

#[test]
fn precedence_and_parentheses() {
    assert_snapshot!(parse("1 + 2 * 3").to_string(), @"(1 + (2 * 3))");
    assert_snapshot!(parse("(1 + 2) * 3").to_string(), @"((1 + 2) * 3)");
    assert_snapshot!(parse("7 mod 2 = 1 or false").to_string(), @"(((7 % 2) == 1) || False)");
}

#[test]
fn mixed_numeric_operands_widen() {
    let expr = parse("1 + 2.5");
    assert_eq!(expr.ty, Ty::Double);
    let expr = parse("1.5f * 2");
    assert_eq!(expr.ty, Ty::Single);
}

#[test]
fn integer_literals_take_the_smallest_type() {
    assert_eq!(parse("2147483647").ty, Ty::Int32);
    assert_eq!(parse("2147483648").ty, Ty::UInt32);
    assert_eq!(parse("4294967296").ty, Ty::Int64);
    assert_eq!(parse("18446744073709551615").ty, Ty::UInt64);
    assert_eq!(
        parse_err("18446744073709551616"),
        (ErrorKind::InvalidIntegerLiteral("18446744073709551616".into()), 0)
    );
}

#[test]
fn unary_minus_folds_into_literals() {
    let expr = parse("-2147483648");
    assert_eq!(expr.ty, Ty::Int32);
    assert_eq!(expr.as_constant(), Some(&Value::Int32(i32::MIN)));
    assert_eq!(expr.span.start, 0);

    let spaced = parse("- 5");
    assert_eq!(spaced.as_constant(), Some(&Value::Int32(-5)));

    assert_eq!(parse("-2147483649").ty, Ty::Int64);
    assert_eq!(parse("-1.5").as_constant(), Some(&Value::Double(-1.5)));
}

#[test]
fn negation_of_a_non_literal() {
    let x = Param::named("x", Ty::Int64);
    let expr = ParseContext::new().parameter(x).parse("-x", None).unwrap();
    assert!(matches!(expr.kind, ExprKind::Unary { .. }));
    assert_eq!(expr.ty, Ty::Int64);
}

#[test]
fn string_and_char_literals() {
    let s = parse(r#""it's""#);
    assert_eq!(s.ty, Ty::String);
    assert_eq!(s.as_constant(), Some(&Value::from("it's")));
    assert_eq!(parse("''''").as_constant(), Some(&Value::Char('\'')));
    let quoted = parse(r#""say ""hi""""#);
    assert_eq!(quoted.as_constant(), Some(&Value::from(r#"say "hi""#)));
    assert_eq!(parse_err("'ab'"), (ErrorKind::InvalidCharacterLiteral, 0));
}

#[test]
fn single_quoted_single_character_is_a_char() {
    let c = parse("'a'");
    assert_eq!(c.ty, Ty::Char);
    assert_eq!(c.as_constant(), Some(&Value::Char('a')));
}

// ── Promotion ──────────────────────────────────────────────────────────

#[test]
fn integer_literal_compared_with_decimal_is_retyped() {
    let x = Param::named("x", Ty::Decimal);
    let expr = ParseContext::new().parameter(x).parse("x == 5", None).unwrap();
    assert_eq!(expr.ty, Ty::Bool);
    assert_snapshot!(expr.to_string(), @"(x == 5)");
    let ExprKind::Binary { right, .. } = &expr.kind else {
        panic!("expected a comparison, got {expr}");
    };
    assert_eq!(right.ty, Ty::Decimal);
    assert_eq!(right.as_constant(), Some(&Value::Decimal(Decimal::from(5))));
}

#[test]
fn substituted_literal_keeps_its_own_value() {
    let five = ParseContext::new().parse("5", None).unwrap();
    let x = Param::named("x", Ty::Decimal);
    let expr = ParseContext::new()
        .parameter(x)
        .value(five)
        .parse("x == 9 || x == @0", None)
        .unwrap();
    let ExprKind::Binary { right: second, .. } = &expr.kind else {
        panic!("expected a disjunction, got {expr}");
    };
    let ExprKind::Binary { right, .. } = &second.kind else {
        panic!("expected a comparison, got {second}");
    };
    assert_eq!(right.ty, Ty::Decimal);
    let ExprKind::Convert { operand, .. } = &right.kind else {
        panic!("expected a conversion, got {right}");
    };
    assert_eq!(operand.as_constant(), Some(&Value::Int32(5)));
}

#[test]
fn real_literal_is_retyped_to_decimal() {
    let x = Param::named("x", Ty::Decimal);
    let expr = ParseContext::new().parameter(x).parse("x * 1.5", None).unwrap();
    assert_eq!(expr.ty, Ty::Decimal);
}

#[test]
fn result_type_forces_exact_promotion() {
    let ctx = ParseContext::new();
    let widened = ctx.parse("1", Some(&Ty::Int64)).unwrap();
    assert_eq!(widened.ty, Ty::Int64);
    assert_eq!(widened.as_constant(), Some(&Value::Int64(1)));

    let err = ctx.parse("1", Some(&Ty::String)).unwrap_err();
    assert_eq!(err.kind, ErrorKind::ExpressionTypeMismatch("String".into()));
    assert_eq!(err.position(), 0);
}

#[test]
fn nullable_operands_lift() {
    let x = Param::named("x", Ty::nullable(Ty::Int32));
    let ctx = ParseContext::new().parameter(x);
    assert_eq!(ctx.parse("x + 1", None).unwrap().ty, Ty::nullable(Ty::Int32));
    assert_eq!(ctx.parse("x == null", None).unwrap().ty, Ty::Bool);
}

// ── Strings ────────────────────────────────────────────────────────────

#[test]
fn ampersand_concatenates() {
    let expr = parse(r#""ab" & "cd""#);
    assert_eq!(expr.ty, Ty::String);
    assert_snapshot!(expr.to_string(), @r#"String.Concat("ab", "cd")"#);
}

#[test]
fn plus_with_a_string_boxes_the_other_operand() {
    let expr = parse(r#""n=" + 1"#);
    assert_eq!(method_name(&expr), Some("Concat"));
    assert_snapshot!(expr.to_string(), @r#"String.Concat("n=", Convert(1, Object))"#);
}

#[test]
fn string_ordering_goes_through_compare() {
    let f = fixture();
    let expr = over_customer(&f, r#"Name > "M""#).unwrap();
    assert_eq!(expr.ty, Ty::Bool);
    assert_snapshot!(expr.to_string(), @r#"(String.Compare(it.Name, "M") > 0)"#);
}

#[test]
fn string_equality_with_null() {
    let f = fixture();
    let expr = over_customer(&f, "Name == null").unwrap();
    assert_eq!(expr.ty, Ty::Bool);
}

// ── Conditionals ───────────────────────────────────────────────────────

#[test]
fn conditional_promotes_one_branch() {
    let expr = parse("true ? 1 : 2.0");
    assert_eq!(expr.ty, Ty::Double);
    let iif = parse(r#"iif(1 < 2, "a", null)"#);
    assert_eq!(iif.ty, Ty::String);
}

#[test]
fn conditional_with_unrelated_branches_fails() {
    assert_eq!(
        parse_err(r#"true ? 1 : "x""#),
        (
            ErrorKind::NeitherTypeConvertsToOther {
                first: "Int32".into(),
                second: "String".into(),
            },
            0
        )
    );
}

#[test]
fn conditional_needs_a_boolean_test() {
    assert_eq!(parse_err("1 ? 2 : 3"), (ErrorKind::FirstExprMustBeBool, 0));
    assert_eq!(parse_err("iif(true, 1)"), (ErrorKind::IifRequiresThreeArgs, 0));
}

// ── Names ──────────────────────────────────────────────────────────────

#[test]
fn unknown_identifier_reports_its_offset() {
    let x = Param::named("x", Ty::Int32);
    let err = ParseContext::new().parameter(x).parse("x + y", None).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnknownIdentifier("y".into()));
    assert_eq!(err.position(), 4);
}

#[test]
fn names_ignore_case() {
    let x = Param::named("Price", Ty::Double);
    let expr = ParseContext::new().parameter(x).parse("PRICE > 1 AND TRUE", None).unwrap();
    assert_eq!(expr.ty, Ty::Bool);
}

#[test]
fn it_requires_a_single_anonymous_parameter() {
    assert_eq!(parse_err("it"), (ErrorKind::NoItInScope, 0));
    let f = fixture();
    assert_eq!(over_customer(&f, "it").unwrap().ty, f.customer.ty());
}

#[test]
fn duplicate_parameters_are_rejected() {
    let err = ParseContext::new()
        .parameter(Param::named("x", Ty::Int32))
        .parameter(Param::named("X", Ty::Int32))
        .parse("1", None)
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::DuplicateIdentifier("X".into()));
}

#[test]
fn substitution_values_and_externals() {
    let mut externals = Externals::default();
    externals.insert("Limit".into(), Symbol::Constant(Value::Int64(10)));
    let ctx = ParseContext::new().value(Value::Int32(5)).externals(externals);
    let expr = ctx.parse("@0 + limit", None).unwrap();
    assert_eq!(expr.ty, Ty::Int64);

    let misplaced = ParseContext::new()
        .externals(Externals::default())
        .value(Value::Int32(1))
        .parse("1", None)
        .unwrap_err();
    assert_eq!(misplaced.kind, ErrorKind::MisplacedExternals);
}

#[test]
fn lambda_values_are_invoked() {
    let a = Param::named("a", Ty::Int32);
    let double = ParseContext::new().parameter(a).parse_lambda("a * 2", None).unwrap();
    let ctx = ParseContext::new().value(double);

    let call = ctx.parse("@0(3)", None).unwrap();
    assert_eq!(call.ty, Ty::Int32);
    assert_snapshot!(call.to_string(), @"Invoke((a * 2), 3)");

    let err = ctx.parse(r#"@0("x")"#, None).unwrap_err();
    assert_eq!(err.kind, ErrorKind::ArgsIncompatibleWithLambda);
    assert_eq!(err.position(), 0);
}

// ── Members and overloads ──────────────────────────────────────────────

#[test]
fn implicit_member_access() {
    let f = fixture();
    let expr = over_customer(&f, "Name.Length > 3 && Age >= 18").unwrap();
    assert_eq!(expr.ty, Ty::Bool);
    assert_snapshot!(expr.to_string(), @"((it.Name.Length > 3) && (it.Age >= 18))");
}

#[test]
fn method_overloads_pick_the_better_conversion() {
    let c = Param::named("c", calculator().ty());
    let l = Param::named("l", Ty::Int64);
    let ctx = ParseContext::new().parameter(c).parameter(l);

    let exact = ctx.parse("c.F(1, 2)", None).unwrap();
    let ExprKind::Call { method, .. } = &exact.kind else {
        panic!("expected a call");
    };
    assert_eq!(method.params, vec![Ty::Int32, Ty::Int32]);

    let widened = ctx.parse("c.F(1, l)", None).unwrap();
    let ExprKind::Call { method, .. } = &widened.kind else {
        panic!("expected a call");
    };
    assert_eq!(method.params, vec![Ty::Int64, Ty::Int64]);
}

#[test]
fn equally_good_overloads_are_ambiguous() {
    let c = Param::named("c", calculator().ty());
    let err = ParseContext::new().parameter(c).parse("c.G(1, 2)", None).unwrap_err();
    assert_eq!(
        err.kind,
        ErrorKind::AmbiguousMethodInvocation {
            method: "G".into(),
            ty: "Calculator".into(),
        }
    );
    assert_eq!(err.position(), 2);
}

#[test]
fn member_errors() {
    let f = fixture();
    let err = over_customer(&f, "Age.Foo").unwrap_err();
    assert_eq!(
        err.kind,
        ErrorKind::UnknownPropertyOrField {
            member: "Foo".into(),
            ty: "Int32".into(),
        }
    );
    assert_eq!(err.position(), 4);

    let err = over_customer(&f, r#"Name.Substring("x")"#).unwrap_err();
    assert_eq!(
        err.kind,
        ErrorKind::NoApplicableMethod {
            method: "Substring".into(),
            ty: "String".into(),
        }
    );

    let err = over_customer(&f, "Touch()").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::MethodIsVoid { .. }));
}

#[test]
fn base_type_methods_are_found() {
    let f = fixture();
    let expr = over_customer(&f, "Age.ToString()").unwrap();
    assert_eq!(expr.ty, Ty::String);
    let greet = over_customer(&f, r#"Greet("hi").ToUpper()"#).unwrap();
    assert_eq!(method_name(&greet), Some("ToUpper"));
}

#[test]
fn enum_members_and_comparisons() {
    let f = fixture();
    let expr = over_customer(&f, r#"Paint == "green""#).unwrap();
    let ExprKind::Binary { right, .. } = &expr.kind else {
        panic!("expected a comparison");
    };
    assert_eq!(right.as_constant(), Some(&Value::Enum(f.color.clone(), 1)));

    let ctx = ParseContext::new().known_type(Ty::Enum(f.color.clone()));
    let blue = ctx.parse("Color.Blue", None).unwrap();
    assert_eq!(blue.as_constant(), Some(&Value::Enum(f.color.clone(), 2)));
}

// ── Aggregates and indexing ────────────────────────────────────────────

#[test]
fn aggregates_bind_a_fresh_it() {
    let f = fixture();
    let expr = over_customer(&f, "Amounts.Where(it > 10).Count()").unwrap();
    assert_eq!(expr.ty, Ty::Int32);
    assert_snapshot!(expr.to_string(), @"it.Amounts.Where(it => (it > 10)).Count()");

    assert_eq!(over_customer(&f, "Amounts.Sum(it)").unwrap().ty, Ty::Decimal);
    assert_eq!(over_customer(&f, "Amounts.Any()").unwrap().ty, Ty::Bool);
    assert_eq!(
        over_customer(&f, "Amounts.Select(it > 1)").unwrap().ty,
        Ty::enumerable(Ty::Bool)
    );
}

#[test]
fn aggregate_without_a_matching_overload() {
    let f = fixture();
    let err = over_customer(&f, "Amounts.Sum()").unwrap_err();
    assert_eq!(err.kind, ErrorKind::NoApplicableAggregate("Sum".into()));
    assert_eq!(err.position(), 8);
}

#[test]
fn array_and_indexer_access() {
    let f = fixture();
    assert_eq!(over_customer(&f, "Amounts[0]").unwrap().ty, Ty::Decimal);
    assert_eq!(over_customer(&f, "Name[0]").unwrap().ty, Ty::Char);
    let err = over_customer(&f, r#"Amounts["a"]"#).unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidIndex);
    let err = over_customer(&f, "Amounts[0, 1]").unwrap_err();
    assert_eq!(err.kind, ErrorKind::CannotIndexMultiDimArray);
}

// ── Types ──────────────────────────────────────────────────────────────

#[test]
fn type_names_construct_and_convert() {
    assert_eq!(parse("Int32?(5)").ty, Ty::nullable(Ty::Int32));
    assert_eq!(parse("DateTime(2024, 1, 31).Year").ty, Ty::Int32);
    assert_eq!(parse("Math.Max(1, 2.5)").ty, Ty::Double);
    let narrowed = parse("Int64(2.5)");
    assert!(matches!(narrowed.kind, ExprKind::Convert { checked: true, .. }));
    assert_eq!(
        parse_err("String?"),
        (ErrorKind::TypeHasNoNullableForm("String".into()), 0)
    );
    assert_eq!(
        parse_err("Int32 + 1"),
        (ErrorKind::DotOrOpenParenExpected, 6)
    );
}

// ── Records ────────────────────────────────────────────────────────────

#[test]
fn projections_reuse_record_types_across_parses() {
    let records = RecordTypeFactory::new();
    let ctx = ParseContext::with_records(&records)
        .parameter(Param::named("x", Ty::Int32))
        .parameter(Param::named("y", Ty::String))
        .parameter(Param::named("z", Ty::String));

    let first = ctx.parse("new(x as A, y as B)", None).unwrap();
    let second = ctx.parse("new(x as A, y as B)", None).unwrap();
    let third = ctx.parse("new(x as A, z as B)", None).unwrap();
    assert_eq!(first.ty, second.ty);
    assert_eq!(first.ty, third.ty);
    assert_eq!(records.len(), 1);

    let other = ctx.parse("new(y as A, x as B)", None).unwrap();
    assert_ne!(first.ty, other.ty);
    assert_eq!(records.len(), 2);
}

#[test]
fn projection_field_names() {
    let f = fixture();
    let expr = over_customer(&f, "new(Name, Age + 1 as Next)").unwrap();
    let ExprKind::Record { record, .. } = &expr.kind else {
        panic!("expected a record");
    };
    let names: Vec<&str> = record.fields().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["Name", "Next"]);

    let err = over_customer(&f, "new(Age + 1)").unwrap_err();
    assert_eq!((err.kind, err.span.start), (ErrorKind::MissingAsClause, 4));
    let err = over_customer(&f, "new(Name, Age as name)").unwrap_err();
    assert_eq!(
        (err.kind, err.span.start),
        (ErrorKind::DuplicateRecordField("name".into()), 10)
    );
}

// ── Orderings ──────────────────────────────────────────────────────────

#[test]
fn ordering_lists() {
    let f = fixture();
    let keys = ParseContext::new()
        .parameter(Param::anonymous(f.customer.ty()))
        .parse_ordering("Name desc, Age, Paint ascending")
        .unwrap();
    let directions: Vec<bool> = keys.iter().map(|k| k.ascending).collect();
    assert_eq!(directions, [false, true, true]);
    assert_eq!(keys[1].selector.ty, Ty::Int32);
}

// ── Syntax errors ──────────────────────────────────────────────────────

#[test]
fn syntax_errors_point_at_the_token() {
    assert_eq!(parse_err("1 +"), (ErrorKind::ExpressionExpected, 3));
    assert_eq!(parse_err("(1"), (ErrorKind::CloseParenOrOperatorExpected, 2));
    assert_eq!(parse_err("1 2"), (ErrorKind::SyntaxError, 2));
    assert_eq!(parse_err("true ? 1"), (ErrorKind::ColonExpected, 8));
    assert_eq!(parse_err("1 # 2"), (ErrorKind::InvalidCharacter('#'), 2));
}

#[test]
fn operator_errors_name_the_operand_types() {
    assert_eq!(
        parse_err(r#""a" - 1"#),
        (
            ErrorKind::IncompatibleOperands {
                op: "-".into(),
                left: "String".into(),
                right: "Int32".into(),
            },
            4
        )
    );
    assert_eq!(
        parse_err(r#"-"a""#),
        (
            ErrorKind::IncompatibleOperand {
                op: "-".into(),
                ty: "String".into(),
            },
            0
        )
    );
}

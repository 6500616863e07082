//! Integration tests for the top-level `bachdoc::parse` entry point,
//! covering the spec section 8 concrete scenarios and boundary behaviors
//! end to end (character stream in, `Document` or `BachError` out).

use bachdoc::{parse, parse_with_limits, BachError, CollectionType, Document, Limits, Shorthand};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn child_literal<'a>(doc: &'a Document, index: usize) -> &'a str {
    match &doc.children()[index] {
        bachdoc::Child::Literal(s) => s.as_str(),
        bachdoc::Child::Document(_) => panic!("expected literal at index {index}"),
    }
}

fn child_doc<'a>(doc: &'a Document, index: usize) -> &'a Document {
    match &doc.children()[index] {
        bachdoc::Child::Document(d) => d,
        bachdoc::Child::Literal(_) => panic!("expected subdocument at index {index}"),
    }
}

#[test]
fn scenario_1_point_with_three_attributes() {
    init_logging();
    let doc = parse("point x=\"1\" y=\"2\" z=\"3\"\n".chars(), &[]).unwrap();
    assert_eq!(doc.label(), Some("point"));
    assert_eq!(doc.attributes().get_vec("x").unwrap(), &vec!["1".to_string()]);
    assert_eq!(doc.attributes().get_vec("y").unwrap(), &vec!["2".to_string()]);
    assert_eq!(doc.attributes().get_vec("z").unwrap(), &vec!["3".to_string()]);
    assert!(doc.children().is_empty());
}

#[test]
fn scenario_2_class_and_id_shorthands() {
    init_logging();
    let shorthands = vec![
        Shorthand::new('.', "class", CollectionType::Set),
        Shorthand::new('#', "id", CollectionType::None),
    ];
    let doc = parse("document .cls #the-id".chars(), &shorthands).unwrap();
    assert_eq!(doc.label(), Some("document"));
    assert_eq!(doc.attributes().get_vec("class").unwrap(), &vec!["cls".to_string()]);
    assert_eq!(doc.attributes().get_vec("id").unwrap(), &vec!["the-id".to_string()]);
    assert!(doc.children().is_empty());
}

#[test]
fn scenario_3_list_of_nested_subdocuments() {
    init_logging();
    let doc = parse("list (quote \"hello\" (author \"A\") (date \"D\"))\n".chars(), &[]).unwrap();
    assert_eq!(doc.label(), Some("list"));
    assert_eq!(doc.children().len(), 1);

    let quote = child_doc(&doc, 0);
    assert_eq!(quote.label(), Some("quote"));
    assert_eq!(quote.children().len(), 3);
    assert_eq!(child_literal(quote, 0), "hello");

    let author = child_doc(quote, 1);
    assert_eq!(author.label(), Some("author"));
    assert_eq!(child_literal(author, 0), "A");

    let date = child_doc(quote, 2);
    assert_eq!(date.label(), Some("date"));
    assert_eq!(child_literal(date, 0), "D");
}

#[test]
fn scenario_4_comment_prelude_then_escaped_quote() {
    init_logging();
    let doc = parse("#comment\n\ndoc 'a\\'b'".chars(), &[]).unwrap();
    assert_eq!(doc.label(), Some("doc"));
    assert_eq!(child_literal(&doc, 0), "a'b");
}

#[test]
fn scenario_5_unterminated_string_hints_missing_quote() {
    init_logging();
    let err = parse("doc \"unterminated".chars(), &[]).unwrap_err();
    match err {
        BachError::Syntax { hint, .. } => assert_eq!(hint, Some("probably a missing closing quote")),
        other => panic!("expected a syntax error, got {other:?}"),
    }
}

#[test]
fn scenario_6_shorthand_collection_set_vs_none() {
    init_logging();
    let set_shorthand = vec![Shorthand::new('.', "class", CollectionType::Set)];
    let doc = parse("doc .a .a".chars(), &set_shorthand).unwrap();
    assert_eq!(doc.attributes().get_vec("class").unwrap(), &vec!["a".to_string()]);

    let none_shorthand = vec![Shorthand::new('.', "class", CollectionType::None)];
    let err = parse("doc .a .a".chars(), &none_shorthand).unwrap_err();
    assert!(matches!(err, BachError::Semantic { .. }));
}

#[test]
fn label_followed_only_by_whitespace_succeeds_with_empty_document() {
    init_logging();
    let doc = parse("justalabel   \n\t\n".chars(), &[]).unwrap();
    assert_eq!(doc.label(), Some("justalabel"));
    assert!(doc.attributes().is_empty());
    assert!(doc.children().is_empty());
}

#[test]
fn comments_and_blank_lines_only_is_an_error() {
    init_logging();
    let err = parse("\n\n# just a comment\n# another\n\n".chars(), &[]).unwrap_err();
    assert!(matches!(err, BachError::Syntax { .. }));
}

#[test]
fn nesting_exactly_at_the_limit_succeeds_one_more_fails() {
    init_logging();
    let mut limits = Limits::default();
    limits.max_nesting_depth = 3;

    let exactly_at_limit = "a (b (c (d)))";
    let doc = parse_with_limits(exactly_at_limit.chars(), &[], limits).unwrap();
    assert_eq!(doc.label(), Some("a"));

    let one_more = "a (b (c (d (e))))";
    let err = parse_with_limits(one_more.chars(), &[], limits).unwrap_err();
    assert!(matches!(err, BachError::Limit { .. }));
}

#[test]
fn literal_length_at_limit_succeeds_one_more_fails() {
    init_logging();
    let mut limits = Limits::default();
    limits.max_literal_value_len = 8;

    let ok_src = format!("doc \"{}\"", "a".repeat(8));
    assert!(parse_with_limits(ok_src.chars(), &[], limits).is_ok());

    let too_long_src = format!("doc \"{}\"", "a".repeat(9));
    let err = parse_with_limits(too_long_src.chars(), &[], limits).unwrap_err();
    assert!(matches!(err, BachError::Limit { .. }));
}

#[test]
fn attribute_value_length_limit_is_enforced_independently_of_literal_limit() {
    init_logging();
    let mut limits = Limits::default();
    limits.max_attribute_value_len = 4;
    limits.max_literal_value_len = 1024;

    let ok_src = "doc x=\"abcd\"";
    assert!(parse_with_limits(ok_src.chars(), &[], limits).is_ok());

    let too_long_src = "doc x=\"abcde\"";
    let err = parse_with_limits(too_long_src.chars(), &[], limits).unwrap_err();
    assert!(matches!(err, BachError::Limit { .. }));
}

#[test]
fn attribute_insertion_order_is_preserved_per_key() {
    init_logging();
    let doc = parse("doc x=\"1\" x=\"2\" x=\"3\"".chars(), &[]).unwrap();
    assert_eq!(doc.attributes().get_vec("x").unwrap(), &vec!["1".to_string(), "2".to_string(), "3".to_string()]);
}

#[test]
fn children_preserve_interleaving_of_literals_and_subdocuments() {
    init_logging();
    let doc = parse("doc \"first\" (a) \"second\" (b) \"third\"".chars(), &[]).unwrap();
    assert_eq!(child_literal(&doc, 0), "first");
    assert_eq!(child_doc(&doc, 1).label(), Some("a"));
    assert_eq!(child_literal(&doc, 2), "second");
    assert_eq!(child_doc(&doc, 3).label(), Some("b"));
    assert_eq!(child_literal(&doc, 4), "third");
}

#[test]
fn bracket_and_double_quoted_literals_both_work_as_delimiters() {
    init_logging();
    let doc = parse("doc \"double\" 'single' [bracket]".chars(), &[]).unwrap();
    assert_eq!(child_literal(&doc, 0), "double");
    assert_eq!(child_literal(&doc, 1), "single");
    assert_eq!(child_literal(&doc, 2), "bracket");
}

#[test]
fn colon_is_an_alternative_assignment_operator() {
    init_logging();
    let doc = parse("doc x:\"1\"".chars(), &[]).unwrap();
    assert_eq!(doc.attributes().get_vec("x").unwrap(), &vec!["1".to_string()]);
}

#[test]
fn round_trip_through_canonical_serialization() {
    init_logging();
    let original = parse("outer x=\"1\" \"lit\" (inner y=\"2\" \"child-lit\")".chars(), &[]).unwrap();
    let serialized = serialize(&original);
    let reparsed = parse(serialized.chars(), &[]).unwrap();
    assert_eq!(original, reparsed);
}

/// Canonical serialization per spec section 8's round-trip property: label,
/// then each attribute as `name="value"`, then each child either as a
/// quoted literal (escaping `\` and the closing quote) or a parenthesized
/// subdocument.
fn serialize(doc: &Document) -> String {
    let mut out = String::new();
    out.push_str(doc.label().unwrap_or(""));
    for (name, values) in doc.attributes().iter_all() {
        for value in values {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&value.replace('\\', "\\\\").replace('"', "\\\""));
            out.push('"');
        }
    }
    for child in doc.children() {
        out.push(' ');
        match child {
            bachdoc::Child::Literal(s) => {
                out.push('"');
                out.push_str(&s.replace('\\', "\\\\").replace('"', "\\\""));
                out.push('"');
            }
            bachdoc::Child::Document(d) => {
                out.push('(');
                out.push_str(&serialize(d));
                out.push(')');
            }
        }
    }
    out
}

//! The tree-builder half of the Lex/Parse Engine (spec 4.4.5 - 4.4.6):
//! consumes the [`crate::lexer::Lexer`]'s token stream with one token of
//! lookahead and assembles the [`Document`] tree, applying shorthand
//! collection rules and the per-document / per-parse size limits.
//!
//! Grounded in `bach.py`'s `Parser.parse`: a stack of open documents,
//! dispatch on `token.semantic`, `next(it)` to pull the token(s) that
//! complete an attribute or shorthand pair.

use std::collections::HashMap;

use crate::document::Document;
use crate::error::BachError;
use crate::limits::{Counters, LimitKind, Limits};
use crate::position::Position;
use crate::shorthand::Shorthand;
use crate::token::{CaptureSemantic, Token};

/// One entry of the open-document stack (spec 3 "Parser tree state"), with
/// the per-document counters the §4.4.7 limits need. The child is detached
/// from its parent while open and attached on `subdocEnd` -- ownership-only
/// reshuffling, not an observable behavior change, since nothing else can
/// touch the parent's children while this frame is on top (see DESIGN.md).
struct Frame {
    doc: Document,
    attr_count: usize,
    literal_count: usize,
    subdoc_count: usize,
}

impl Frame {
    fn new() -> Self {
        Frame { doc: Document::new(), attr_count: 0, literal_count: 0, subdoc_count: 0 }
    }
}

/// Drive `tokens` to completion and return the assembled root [`Document`].
pub fn parse_tokens<T>(tokens: T, shorthands: &[Shorthand], limits: Limits) -> Result<Document, BachError>
where
    T: IntoIterator<Item = Result<Token, BachError>>,
{
    let shorthand_table: HashMap<char, &Shorthand> = shorthands.iter().map(|s| (s.symbol, s)).collect();

    let mut stack: Vec<Frame> = vec![Frame::new()];
    let mut counters = Counters::default();
    let mut it = tokens.into_iter().peekable();

    while let Some(result) = it.next() {
        let token = result?;
        log::debug!("parse: dispatch {:?} {:?}", token.semantic, token.lexeme);

        match token.semantic {
            CaptureSemantic::Label => {
                let top = stack.last_mut().expect("open-document stack is never empty");
                top.doc.set_label(token.lexeme, token.start)?;
            }

            CaptureSemantic::Literal => {
                counters.literals_total += 1;
                if counters.literals_total > limits.max_literals_per_parse {
                    return Err(BachError::limit(LimitKind::LiteralsPerParse, token.end));
                }
                let top = stack.last_mut().expect("open-document stack is never empty");
                top.literal_count += 1;
                if top.literal_count > limits.max_literals_per_document {
                    return Err(BachError::limit(LimitKind::LiteralsPerDocument, token.end));
                }
                top.doc.push_literal(token.lexeme);
            }

            CaptureSemantic::SubdocStart => {
                counters.subdocuments_total += 1;
                if counters.subdocuments_total > limits.max_subdocuments_per_parse {
                    return Err(BachError::limit(LimitKind::SubdocumentsPerParse, token.end));
                }
                {
                    let parent = stack.last_mut().expect("open-document stack is never empty");
                    parent.subdoc_count += 1;
                    if parent.subdoc_count > limits.max_subdocuments_per_document {
                        return Err(BachError::limit(LimitKind::SubdocumentsPerDocument, token.end));
                    }
                }
                counters.nesting_depth = stack.len();
                if counters.nesting_depth > limits.max_nesting_depth {
                    return Err(BachError::limit(LimitKind::NestingDepth, token.end));
                }
                stack.push(Frame::new());
            }

            CaptureSemantic::SubdocEnd => {
                let finished = stack.pop().ok_or_else(|| {
                    BachError::semantic("subdocEnd with no open subdocument", token.start)
                })?;
                let parent = stack.last_mut().ok_or_else(|| {
                    BachError::semantic("subdocEnd closed the root document", token.start)
                })?;
                parent.doc.push_child(finished.doc);
            }

            CaptureSemantic::Attribute => {
                let name = token.lexeme;
                let (value, value_end) = match it.peek() {
                    Some(Ok(next)) if next.semantic == CaptureSemantic::Assign => {
                        it.next(); // consume the assign token
                        let value_token = it
                            .next()
                            .ok_or_else(|| BachError::semantic("assign with no following literal", token.start))??;
                        if value_token.semantic != CaptureSemantic::Literal {
                            return Err(BachError::semantic(
                                "right side of an attribute pair must be a string literal",
                                value_token.start,
                            ));
                        }
                        if value_token.lexeme.chars().count() > limits.max_attribute_value_len {
                            return Err(BachError::limit(LimitKind::AttributeValueLen, value_token.end));
                        }
                        (value_token.lexeme, value_token.end)
                    }
                    _ => (String::new(), token.end),
                };
                let top = stack.last_mut().expect("open-document stack is never empty");
                top.attr_count += 1;
                if top.attr_count > limits.max_attributes_per_document {
                    return Err(BachError::limit(LimitKind::AttributesPerDocument, value_end));
                }
                top.doc.add_attribute(name, value);
            }

            CaptureSemantic::ShorthandSymbol => {
                let symbol = token.lexeme.chars().next().ok_or_else(|| {
                    BachError::semantic("shorthand symbol token had an empty lexeme", token.start)
                })?;
                let shorthand = shorthand_table.get(&symbol).copied().ok_or_else(|| {
                    BachError::semantic(format!("no shorthand configured for symbol '{symbol}'"), token.start)
                })?;
                let value_token = it
                    .next()
                    .ok_or_else(|| BachError::semantic("shorthand symbol with no following payload", token.start))??;
                if value_token.semantic != CaptureSemantic::ShorthandAttrib {
                    return Err(BachError::semantic(
                        "shorthand symbol must be followed by its payload",
                        value_token.start,
                    ));
                }
                if value_token.lexeme.chars().count() > limits.max_attribute_value_len {
                    return Err(BachError::limit(LimitKind::AttributeValueLen, value_token.end));
                }
                let top = stack.last_mut().expect("open-document stack is never empty");
                top.doc.add_shorthand_attribute(
                    &shorthand.expansion,
                    value_token.lexeme,
                    shorthand.collection_type,
                    value_token.end,
                )?;
                top.attr_count += 1;
                if top.attr_count > limits.max_attributes_per_document {
                    return Err(BachError::limit(LimitKind::AttributesPerDocument, value_token.end));
                }
            }

            CaptureSemantic::Assign | CaptureSemantic::ShorthandAttrib => {
                return Err(BachError::semantic(
                    format!("unexpected {:?} token outside of an attribute/shorthand pair", token.semantic),
                    token.start,
                ));
            }

            CaptureSemantic::None => {
                // Not emitted by any Bach grammar rule today, but dispatch
                // ignores it rather than treating it as an invariant breach.
            }
        }
    }

    if stack.len() != 1 {
        return Err(BachError::semantic(
            "parse ended with unclosed subdocuments",
            Position::unset(),
        ));
    }

    Ok(stack.pop().expect("exactly one frame remains").doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bach_grammar;
    use crate::document::Child;
    use crate::lexer::Lexer;
    use crate::shorthand::CollectionType;

    fn parse_str(src: &str, shorthands: &[Shorthand]) -> Result<Document, BachError> {
        let grammar = if shorthands.is_empty() {
            bach_grammar::grammar().clone()
        } else {
            bach_grammar::grammar_for_shorthands(shorthands).unwrap()
        };
        let lexer = Lexer::new(&grammar, src.chars(), Limits::default());
        parse_tokens(lexer, shorthands, Limits::default())
    }

    #[test]
    fn scenario_1_attributes() {
        let doc = parse_str("point x=\"1\" y=\"2\" z=\"3\"\n", &[]).unwrap();
        assert_eq!(doc.label(), Some("point"));
        assert_eq!(doc.attributes().get_vec("x").unwrap(), &vec!["1".to_string()]);
        assert_eq!(doc.attributes().get_vec("y").unwrap(), &vec!["2".to_string()]);
        assert_eq!(doc.attributes().get_vec("z").unwrap(), &vec!["3".to_string()]);
        assert!(doc.children().is_empty());
    }

    #[test]
    fn scenario_2_shorthands() {
        let shorthands = vec![
            Shorthand::new('.', "class", CollectionType::Set),
            Shorthand::new('#', "id", CollectionType::None),
        ];
        let doc = parse_str("document .cls #the-id", &shorthands).unwrap();
        assert_eq!(doc.label(), Some("document"));
        assert_eq!(doc.attributes().get_vec("class").unwrap(), &vec!["cls".to_string()]);
        assert_eq!(doc.attributes().get_vec("id").unwrap(), &vec!["the-id".to_string()]);
    }

    #[test]
    fn scenario_3_nested_subdocuments() {
        let doc = parse_str("list (quote \"hello\" (author \"A\") (date \"D\"))\n", &[]).unwrap();
        assert_eq!(doc.label(), Some("list"));
        assert_eq!(doc.children().len(), 1);
        let Child::Document(quote) = &doc.children()[0] else { panic!("expected subdocument") };
        assert_eq!(quote.label(), Some("quote"));
        assert_eq!(quote.children().len(), 3);
        assert!(matches!(&quote.children()[0], Child::Literal(s) if s == "hello"));
        let Child::Document(author) = &quote.children()[1] else { panic!("expected subdocument") };
        assert_eq!(author.label(), Some("author"));
        assert!(matches!(&author.children()[0], Child::Literal(s) if s == "A"));
    }

    #[test]
    fn scenario_4_comment_prelude_and_escape() {
        let doc = parse_str("#comment\n\ndoc 'a\\'b'", &[]).unwrap();
        assert_eq!(doc.label(), Some("doc"));
        assert!(matches!(&doc.children()[0], Child::Literal(s) if s == "a'b"));
    }

    #[test]
    fn scenario_5_unterminated_quote_hints_missing_close() {
        let err = parse_str("doc \"unterminated", &[]).unwrap_err();
        match err {
            BachError::Syntax { hint, .. } => {
                assert_eq!(hint, Some("probably a missing closing quote"));
            }
            other => panic!("expected syntax error, got {other:?}"),
        }
    }

    #[test]
    fn scenario_6_shorthand_set_dedupes_none_errors() {
        let set_sh = vec![Shorthand::new('.', "class", CollectionType::Set)];
        let doc = parse_str("doc .a .a", &set_sh).unwrap();
        assert_eq!(doc.attributes().get_vec("class").unwrap(), &vec!["a".to_string()]);

        let none_sh = vec![Shorthand::new('.', "class", CollectionType::None)];
        assert!(parse_str("doc .a .a", &none_sh).is_err());
    }

    #[test]
    fn label_only_with_trailing_whitespace_succeeds() {
        let doc = parse_str("point   \n  \n", &[]).unwrap();
        assert_eq!(doc.label(), Some("point"));
        assert!(doc.attributes().is_empty());
        assert!(doc.children().is_empty());
    }

    #[test]
    fn comments_only_input_errors() {
        let err = parse_str("# just a comment\n\n", &[]).unwrap_err();
        assert!(matches!(err, BachError::Syntax { .. }));
    }

    #[test]
    fn standalone_attribute_without_value() {
        let doc = parse_str("doc standalone", &[]).unwrap();
        assert_eq!(doc.attributes().get_vec("standalone").unwrap(), &vec!["".to_string()]);
    }

    #[test]
    fn nesting_depth_limit_is_enforced() {
        let mut limits = Limits::default();
        limits.max_nesting_depth = 2;
        let src = "a (b (c (d)))";
        let grammar = bach_grammar::grammar().clone();
        let lexer = Lexer::new(&grammar, src.chars(), limits);
        let err = parse_tokens(lexer, &[], limits).unwrap_err();
        assert!(matches!(err, BachError::Limit { kind: LimitKind::NestingDepth, .. }));
    }
}

//! Bach — a general-purpose semantic document markup language that combines
//! XML-like structure with Lisp-like syntax and optional per-document
//! shorthand attributes (e.g. `.class`, `#id`).
//!
//! This crate is the CORE of the system (spec section 1): a streaming LL(1)
//! parser that turns a Unicode character stream into a tree of labelled
//! [`Document`]s. It is split into the four components spec section 2
//! describes, leaves first: [`grammar`] (the static grammar table model),
//! [`compiler`] (reduces a human-readable grammar to a packed binary blob),
//! [`loader`] (unpacks that blob into runtime lookup tables), and the
//! [`lexer`]/[`parser`] pair (the pushdown automaton that drives the
//! compiled grammar and assembles the [`Document`] tree).
//!
//! Command-line front-ends, conversion to XML-style element trees, and
//! file/stream buffering primitives are deliberately out of scope (spec
//! section 1) -- callers supply a `Iterator<Item = char>` and get back a
//! [`Document`] or a [`BachError`].

pub mod bach_grammar;
pub mod compiler;
pub mod document;
pub mod error;
pub mod grammar;
pub mod lexer;
pub mod limits;
pub mod loader;
pub mod parser;
pub mod position;
pub mod shorthand;
pub mod token;

pub use document::{Child, Document};
pub use error::BachError;
pub use limits::Limits;
pub use position::Position;
pub use shorthand::{CollectionType, Shorthand};
pub use token::{CaptureSemantic, Token};

/// Parse `source` into a [`Document`] tree, using the default [`Limits`]
/// (spec section 6 `parse(source, shorthands) -> Document | error`).
///
/// `shorthands` configures runtime shorthand symbols (e.g. `.` expanding to
/// `class`); each symbol must be a single code point not in the grammar's
/// core special-character set, and symbols must be unique (validated here
/// before anything is parsed).
pub fn parse<I>(source: I, shorthands: &[Shorthand]) -> Result<Document, BachError>
where
    I: IntoIterator<Item = char>,
{
    parse_with_limits(source, shorthands, Limits::default())
}

/// As [`parse`], but with caller-supplied [`Limits`] overriding the spec
/// 4.4.7 defaults (e.g. for embedding contexts with tighter memory bounds).
pub fn parse_with_limits<I>(source: I, shorthands: &[Shorthand], limits: Limits) -> Result<Document, BachError>
where
    I: IntoIterator<Item = char>,
{
    shorthand::validate(shorthands).map_err(|reason| BachError::semantic(reason, Position::start()))?;

    let grammar = bach_grammar::grammar_for_shorthands(shorthands)
        .map_err(|e| BachError::semantic(format!("grammar load failed: {e}"), Position::start()))?;

    let lex = lexer::Lexer::new(&grammar, source.into_iter(), limits);
    parser::parse_tokens(lex, shorthands, limits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_level_entry_point_parses_a_simple_document() {
        let doc = parse("point x=\"1\"\n".chars(), &[]).unwrap();
        assert_eq!(doc.label(), Some("point"));
        assert_eq!(doc.attributes().get_vec("x").unwrap(), &vec!["1".to_string()]);
    }

    #[test]
    fn duplicate_shorthand_symbols_are_rejected_before_parsing() {
        let shorthands = vec![
            Shorthand::new('.', "class", CollectionType::Set),
            Shorthand::new('.', "other", CollectionType::List),
        ];
        let err = parse("doc .x".chars(), &shorthands).unwrap_err();
        assert!(matches!(err, BachError::Semantic { .. }));
    }
}

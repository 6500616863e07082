//! The character-source-driven half of the Lex/Parse Engine (spec 4.4.1 -
//! 4.4.4): drives the compiled grammar's pushdown automaton across a
//! character stream and emits a lazy sequence of classified [`Token`]s.
//!
//! Grounded in `bach.py`'s `Parser.lex`: one character of lookahead, one
//! automaton stack, emit on `captureEnd`.

use string_builder::Builder;

use crate::error::{hint_for_nonterminal, BachError};
use crate::grammar::{CompiledGrammar, SymbolId};
use crate::limits::{LimitKind, Limits};
use crate::position::Position;
use crate::token::{CaptureSemantic, Token};

/// Holds `(current, lookahead)` by reading one position ahead of what it
/// hands out (spec 4.4.1): `current` is never `None` while iteration
/// continues; `lookahead` is `None` exactly once, on the final character.
struct CharSource<I: Iterator<Item = char>> {
    iter: I,
    current: Option<char>,
    lookahead: Option<char>,
}

impl<I: Iterator<Item = char>> CharSource<I> {
    fn new(mut iter: I) -> Self {
        let current = iter.next();
        let lookahead = iter.next();
        CharSource { iter, current, lookahead }
    }

    /// Hand out the current pair and shift the window forward by one.
    fn advance(&mut self) -> Option<(char, Option<char>)> {
        let current = self.current?;
        let lookahead = self.lookahead;
        self.current = self.lookahead;
        self.lookahead = self.iter.next();
        Some((current, lookahead))
    }
}

/// Drives `grammar` across a character stream, implementing
/// `Iterator<Item = Result<Token, BachError>>` so the parser phase can
/// consume it lazily with one token of lookahead.
pub struct Lexer<'g, I: Iterator<Item = char>> {
    grammar: &'g CompiledGrammar,
    source: CharSource<I>,
    stack: Vec<SymbolId>,
    pos: Position,
    capture: Builder,
    capture_chars: usize,
    capture_start: Option<Position>,
    capture_semantic: CaptureSemantic,
    limits: Limits,
    finished: bool,
}

impl<'g, I: Iterator<Item = char>> Lexer<'g, I> {
    pub fn new(grammar: &'g CompiledGrammar, source: I, limits: Limits) -> Self {
        Lexer {
            grammar,
            source: CharSource::new(source),
            stack: vec![grammar.start_symbol],
            pos: Position::start(),
            capture: Builder::default(),
            capture_chars: 0,
            capture_start: None,
            capture_semantic: CaptureSemantic::None,
            limits,
            finished: false,
        }
    }

    fn limit_for_semantic(sem: CaptureSemantic) -> Option<LimitKind> {
        match sem {
            CaptureSemantic::Label => Some(LimitKind::LabelLen),
            CaptureSemantic::Attribute => Some(LimitKind::AttributeNameLen),
            CaptureSemantic::Literal => Some(LimitKind::LiteralValueLen),
            CaptureSemantic::ShorthandAttrib => Some(LimitKind::AttributeValueLen),
            _ => None,
        }
    }

    fn max_for_semantic(&self, sem: CaptureSemantic) -> Option<usize> {
        match sem {
            CaptureSemantic::Label => Some(self.limits.max_label_len),
            CaptureSemantic::Attribute => Some(self.limits.max_attribute_name_len),
            CaptureSemantic::Literal => Some(self.limits.max_literal_value_len),
            CaptureSemantic::ShorthandAttrib => Some(self.limits.max_attribute_value_len),
            _ => None,
        }
    }

    fn finalize(&mut self) -> Option<Result<Token, BachError>> {
        match self.stack.last() {
            None => None,
            Some(&top) if self.grammar.is_acceptable_end_state(top) => None,
            Some(&top) => {
                let name = self.grammar.symbol_name(top).to_string();
                Some(Err(BachError::unexpected_eof(self.pos, &name)))
            }
        }
    }

    fn step(&mut self) -> Option<Result<Token, BachError>> {
        loop {
            if self.finished {
                return None;
            }

            let (current, lookahead) = match self.source.advance() {
                Some(pair) => pair,
                None => {
                    self.finished = true;
                    return self.finalize();
                }
            };

            self.pos.advance(current);

            let top = match self.stack.last().copied() {
                Some(s) => s,
                None => {
                    self.finished = true;
                    return Some(Err(BachError::syntax(
                        format!("unexpected input after end of document: '{current}'"),
                        self.pos,
                        self.pos,
                        None,
                    )));
                }
            };

            let rule = {
                let rules = self.grammar.rules_for(top);
                rules
                    .iter()
                    .find(|r| {
                        r.current.matches(&self.grammar.sets, Some(current))
                            && r.lookahead.matches(&self.grammar.sets, lookahead)
                    })
                    .cloned()
            };

            let rule = match rule {
                Some(r) => r,
                None => {
                    self.finished = true;
                    let name = self.grammar.symbol_name(top);
                    let hint = hint_for_nonterminal(name);
                    return Some(Err(BachError::syntax(
                        format!("unexpected character '{current}' while parsing {name}"),
                        self.pos,
                        self.pos,
                        hint,
                    )));
                }
            };

            log::trace!("lex: state={} current={current:?} lookahead={lookahead:?} matched={rule:?}", self.grammar.symbol_name(top));

            let mut emitted = None;

            if rule.capture.capture_start {
                self.capture = Builder::default();
                self.capture_chars = 0;
                self.capture_start = Some(self.pos);
                self.capture_semantic =
                    CaptureSemantic::from_u8(rule.capture.semantic).unwrap_or(CaptureSemantic::None);
            }

            if rule.capture.capture {
                self.capture.append(current);
                self.capture_chars += 1;
                if self.capture_chars > self.limits.max_inflight_lexeme_len {
                    self.finished = true;
                    return Some(Err(BachError::limit(LimitKind::InflightLexemeLen, self.pos)));
                }
            }

            if rule.capture.capture_end {
                let start = self.capture_start.take().unwrap_or(self.pos);
                let builder = std::mem::replace(&mut self.capture, Builder::default());
                let lexeme = builder.string().unwrap_or_default();
                let semantic = self.capture_semantic;

                if let Some(max) = self.max_for_semantic(semantic) {
                    if lexeme.chars().count() > max {
                        let kind = Self::limit_for_semantic(semantic).expect("semantic has a limit");
                        self.finished = true;
                        return Some(Err(BachError::limit(kind, self.pos)));
                    }
                }

                log::debug!("lex: emit {semantic:?} {lexeme:?} {start}-{}", self.pos);
                emitted = Some(Token::new(semantic, lexeme, start, self.pos));
            }

            self.stack.pop();
            for sym in rule.rhs_symbols().rev() {
                self.stack.push(sym);
            }

            if let Some(tok) = emitted {
                return Some(Ok(tok));
            }
        }
    }
}

impl<'g, I: Iterator<Item = char>> Iterator for Lexer<'g, I> {
    type Item = Result<Token, BachError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.step()
    }
}

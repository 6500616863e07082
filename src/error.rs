//! Error model (spec section 7): three fatal error kinds, each carrying a
//! position range and, for syntax errors, an optional hint (spec 4.4.8).

use crate::limits::LimitKind;
use crate::position::Position;

/// A hint attached to a syntax error based on which nonterminal the
/// automaton was in when the error occurred (spec 4.4.8).
pub fn hint_for_nonterminal(name: &str) -> Option<&'static str> {
    match name {
        "LSQ" | "LDQ" | "LBQ" => Some("probably a missing closing quote"),
        "LSQESC" | "LDQESC" | "LBQESC" => {
            Some("invalid escape sequence, only \\ and the closing quote may be escaped")
        }
        "LD" | "LSD" => Some("right side of an attribute pair must be a string literal"),
        "SD" => Some("missing closing parenthesis"),
        "S" => Some(
            "document must start with a left-aligned label optionally preceded by blank lines or #-comments",
        ),
        _ => None,
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum BachError {
    /// No rule matched `(current, lookahead)` from the current nonterminal,
    /// or EOF occurred at an unacceptable end state.
    #[error("syntax error at {start}-{end}: {reason}")]
    Syntax {
        /// The base reason, with any hint (spec 4.4.8) already folded in.
        reason: String,
        start: Position,
        end: Position,
        hint: Option<&'static str>,
    },
    /// A spec 4.4.7 threshold was exceeded.
    #[error("limit error at {at}: {kind} exceeded")]
    Limit { kind: LimitKind, at: Position },
    /// A duplicate shorthand value under `collectionType=none`, or an
    /// internal-invariant breach that should be unreachable given the
    /// grammar.
    #[error("semantic error at {at}: {reason}")]
    Semantic { reason: String, at: Position },
}

impl BachError {
    pub fn syntax(reason: impl Into<String>, start: Position, end: Position, hint: Option<&'static str>) -> Self {
        let reason = reason.into();
        let reason = match hint {
            Some(h) => format!("{reason} ({h})"),
            None => reason,
        };
        BachError::Syntax { reason, start, end, hint }
    }

    pub fn unexpected_eof(at: Position, nonterminal: &str) -> Self {
        let hint = hint_for_nonterminal(nonterminal);
        let reason = format!("unexpected end of file while parsing {nonterminal}");
        let reason = match hint {
            Some(h) => format!("{reason} ({h})"),
            None => reason,
        };
        BachError::Syntax { reason, start: Position::unset(), end: at, hint }
    }

    pub fn limit(kind: LimitKind, at: Position) -> Self {
        BachError::Limit { kind, at }
    }

    pub fn semantic(reason: impl Into<String>, at: Position) -> Self {
        BachError::Semantic { reason: reason.into(), at }
    }
}

//! Shorthand configuration (spec section 3 "Shorthand", section 4.4.6).

/// How repeated values for the same expanded attribute are collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionType {
    /// At most one value; a second occurrence is a semantic error.
    None,
    /// Values accumulate in insertion order, duplicates allowed.
    List,
    /// Values accumulate in first-insertion order; a duplicate is dropped.
    Set,
}

/// A single configured shorthand: `symbol` expands to the attribute named
/// `expansion`, collected per `collection_type`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shorthand {
    pub symbol: char,
    pub expansion: String,
    pub collection_type: CollectionType,
    /// Reserved for serializers; not consumed by the parser itself.
    pub collection_split: String,
}

impl Shorthand {
    pub fn new(symbol: char, expansion: impl Into<String>, collection_type: CollectionType) -> Self {
        Shorthand {
            symbol,
            expansion: expansion.into(),
            collection_type,
            collection_split: " ".to_string(),
        }
    }
}

/// Characters the grammar dispatches on inside a document/subdocument body;
/// a shorthand symbol cannot reuse one of these without making the grammar
/// ambiguous. `#` is deliberately excluded from this set: it is only special
/// in the pre-label prelude (spec 4.1's `S`/`IWS`/`C` rule family), so
/// scenario 2 in spec section 8 (`#=id`) is reachable.
fn reserved_for_body_dispatch(ch: char) -> bool {
    matches!(
        ch,
        '\t' | '\r' | '\n' | ' ' | '=' | ':' | '\'' | '"' | '[' | ']' | '{' | '}' | '<' | '>' | '(' | ')' | '\\'
    )
}

/// The allowable-shorthand-symbol predicate the loader exports (spec 4.3):
/// any character not already reserved for body-level dispatch.
pub fn allowable_shorthand_symbol(ch: char) -> bool {
    !reserved_for_body_dispatch(ch)
}

/// Validates a configured shorthand list against spec section 6: each symbol
/// must be allowable and symbols must be unique.
pub fn validate(shorthands: &[Shorthand]) -> Result<(), String> {
    let mut seen = std::collections::HashSet::new();
    for sh in shorthands {
        if !allowable_shorthand_symbol(sh.symbol) {
            return Err(format!("shorthand symbol '{}' is reserved for body dispatch", sh.symbol));
        }
        if !seen.insert(sh.symbol) {
            return Err(format!("duplicate shorthand symbol '{}'", sh.symbol));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_allowable() {
        assert!(allowable_shorthand_symbol('#'));
    }

    #[test]
    fn quote_is_not_allowable() {
        assert!(!allowable_shorthand_symbol('\''));
    }

    #[test]
    fn duplicate_symbols_rejected() {
        let shs = vec![
            Shorthand::new('.', "class", CollectionType::Set),
            Shorthand::new('.', "other", CollectionType::List),
        ];
        assert!(validate(&shs).is_err());
    }
}

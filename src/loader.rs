//! Compiled-Grammar Loader (spec 4.3): unpacks the binary blob produced by
//! [`crate::compiler`] into the runtime [`CompiledGrammar`] model, and
//! patches the two runtime-configurable terminal sets (`ss`, `sc`) for a
//! given set of configured shorthands.

use smol_str::SmolStr;

use crate::grammar::{
    CaptureDescriptor, CompiledGrammar, Rule, SetRef, SymbolId, TerminalSet, NONE_SYMBOL, SET_ALL, SET_EMPTY,
    SET_EOF, SET_SC, SET_SS,
};
use crate::shorthand::Shorthand;

const HEADER: &[u8; 8] = b"bach-cg1";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error("blob too short: expected at least {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
    #[error("bad header: expected {expected:?}")]
    HeaderMismatch { expected: &'static [u8; 8] },
    #[error("checksum mismatch: computed {computed:#04x}, stored {stored:#04x}")]
    ChecksumMismatch { computed: u8, stored: u8 },
    #[error("rule references undefined symbol id {0}")]
    BadSymbolId(u8),
    #[error("rule references undefined set id {0}")]
    BadSetId(u8),
}

/// Unpack a compiled blob into a grammar whose only acceptable end state is
/// the named `accept_symbol` (spec 9 open question iii: `{D}` only, not
/// `{D, S}`).
pub fn load(blob: &[u8], accept_symbol: &str, symbol_names: &[&str]) -> Result<CompiledGrammar, LoadError> {
    if blob.len() < 8 + 1 + 1 {
        return Err(LoadError::Truncated { expected: 10, actual: blob.len() });
    }
    if &blob[0..8] != HEADER {
        return Err(LoadError::HeaderMismatch { expected: HEADER });
    }

    let stored_checksum = *blob.last().ok_or(LoadError::Truncated { expected: 1, actual: 0 })?;
    let computed_checksum = (blob[..blob.len() - 1].iter().fold(0u32, |acc, b| acc + *b as u32) % 255) as u8;
    if computed_checksum != stored_checksum {
        return Err(LoadError::ChecksumMismatch { computed: computed_checksum, stored: stored_checksum });
    }

    let mut cursor = 8usize;
    let state_count = read_u8(blob, &mut cursor)? as usize;
    let pool_len = read_u8(blob, &mut cursor)? as usize;
    let pool_bytes = read_slice(blob, &mut cursor, pool_len)?;
    let pool = String::from_utf8_lossy(pool_bytes).into_owned();

    let set_count = read_u8(blob, &mut cursor)? as usize;
    let mut sets = Vec::with_capacity(set_count);
    let mut set_names = Vec::with_capacity(set_count);
    for i in 0..set_count {
        let start = read_u8(blob, &mut cursor)? as usize;
        let end = read_u8(blob, &mut cursor)? as usize;
        let set = match i as SymbolId {
            SET_EMPTY => TerminalSet::Empty,
            SET_EOF => TerminalSet::Eof,
            SET_ALL => TerminalSet::All,
            SET_SS | SET_SC => TerminalSet::Chars(String::new()), // patched below
            _ => {
                let slice = pool.get(start..end).unwrap_or("");
                TerminalSet::Chars(slice.to_string())
            }
        };
        sets.push(set);
        set_names.push(SmolStr::new(format!("set{i}")));
    }

    let mut offsets = Vec::with_capacity(state_count);
    for _ in 0..state_count {
        let offset = read_u8(blob, &mut cursor)?;
        let count = read_u8(blob, &mut cursor)?;
        offsets.push((offset, count));
    }

    let rules_start = cursor;
    let mut rules_by_state: Vec<Vec<Rule>> = Vec::with_capacity(state_count);
    for (lhs, (offset, count)) in offsets.iter().enumerate() {
        let mut rules = Vec::with_capacity(*count as usize);
        for i in 0..*count {
            let mut rule_off = rules_start + (*offset as usize + i as usize) * 6;
            let bytes = read_slice(blob, &mut rule_off, 6)?;
            let current_byte = bytes[0];
            let rhs_raw = [bytes[1], bytes[2], bytes[3]];
            let lookahead_byte = bytes[4];
            let capture_byte = bytes[5];

            let current_set_id = current_byte & 0x7f;
            if current_set_id as usize >= set_count {
                return Err(LoadError::BadSetId(current_set_id));
            }
            let lookahead_set_id = lookahead_byte & 0x7f;
            if lookahead_set_id as usize >= set_count {
                return Err(LoadError::BadSetId(lookahead_set_id));
            }
            for sym in rhs_raw.iter() {
                if *sym != NONE_SYMBOL && *sym as usize >= state_count {
                    return Err(LoadError::BadSymbolId(*sym));
                }
            }

            rules.push(Rule {
                lhs: lhs as SymbolId,
                current: SetRef::new(current_set_id, current_byte & 0x80 != 0),
                lookahead: SetRef::new(lookahead_set_id, lookahead_byte & 0x80 != 0),
                rhs: [
                    (rhs_raw[0] != NONE_SYMBOL).then_some(rhs_raw[0]),
                    (rhs_raw[1] != NONE_SYMBOL).then_some(rhs_raw[1]),
                    (rhs_raw[2] != NONE_SYMBOL).then_some(rhs_raw[2]),
                ],
                capture: CaptureDescriptor {
                    capture: capture_byte & 0x80 != 0,
                    capture_start: capture_byte & 0x40 != 0,
                    capture_end: capture_byte & 0x20 != 0,
                    semantic: capture_byte & 0x0f,
                },
            });
        }
        rules_by_state.push(rules);
    }

    let symbol_names: Vec<SmolStr> = if symbol_names.len() == state_count {
        symbol_names.iter().map(|s| SmolStr::new(s)).collect()
    } else {
        (0..state_count).map(|i| SmolStr::new(format!("sym{i}"))).collect()
    };

    let start_symbol = symbol_names.iter().position(|n| n.as_str() == "S").unwrap_or(0) as SymbolId;
    let accept_id = symbol_names
        .iter()
        .position(|n| n.as_str() == accept_symbol)
        .map(|i| i as SymbolId)
        .unwrap_or(start_symbol);

    Ok(CompiledGrammar {
        symbol_names,
        start_symbol,
        sets,
        set_names,
        rules_by_state,
        acceptable_end_states: vec![accept_id],
    })
}

/// Patch the runtime-configurable `ss` (shorthand-symbol) and `sc` (base
/// special-character) sets for a given shorthand configuration (spec 4.3):
/// `ss` becomes exactly the configured shorthand symbols, and `sc` becomes
/// the fixed base special-character set plus those same symbols, so that the
/// document-body dispatch rules see shorthand symbols as "special" current
/// characters.
pub fn patch_shorthand_sets(grammar: &mut CompiledGrammar, shorthands: &[Shorthand], sc_base: &str) {
    let ss: String = shorthands.iter().map(|s| s.symbol).collect();
    let mut sc = sc_base.to_string();
    for sh in shorthands {
        if !sc.contains(sh.symbol) {
            sc.push(sh.symbol);
        }
    }
    if let Some(slot) = grammar.sets.get_mut(SET_SS as usize) {
        *slot = TerminalSet::Chars(ss);
    }
    if let Some(slot) = grammar.sets.get_mut(SET_SC as usize) {
        *slot = TerminalSet::Chars(sc);
    }
}

fn read_u8(blob: &[u8], cursor: &mut usize) -> Result<u8, LoadError> {
    let b = *blob.get(*cursor).ok_or(LoadError::Truncated { expected: *cursor + 1, actual: blob.len() })?;
    *cursor += 1;
    Ok(b)
}

fn read_slice<'a>(blob: &'a [u8], cursor: &mut usize, len: usize) -> Result<&'a [u8], LoadError> {
    let end = *cursor + len;
    let slice = blob.get(*cursor..end).ok_or(LoadError::Truncated { expected: end, actual: blob.len() })?;
    *cursor = end;
    Ok(slice)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;

    const TINY_GRAMMAR: &str = "
        [Production Symbols]
        A
        [Capture Semantics]
        none 0
        [Terminals]
        \"x\"
        [Terminal Sets]
        all 0 0
        [Production Rules]
        RULE A all | lookahead all | - | as none
        [END]
    ";

    #[test]
    fn round_trips_through_compile_and_load() {
        let blob = compile(TINY_GRAMMAR).unwrap();
        let grammar = load(&blob, "A", &["A"]).unwrap();
        assert_eq!(grammar.rules_for(0).len(), 1);
        assert!(grammar.is_acceptable_end_state(0));
    }

    #[test]
    fn rejects_bad_header() {
        let mut blob = compile(TINY_GRAMMAR).unwrap();
        blob[0] = b'X';
        assert!(matches!(load(&blob, "A", &["A"]), Err(LoadError::HeaderMismatch { .. })));
    }

    #[test]
    fn rejects_corrupted_checksum() {
        let mut blob = compile(TINY_GRAMMAR).unwrap();
        let last = blob.len() - 1;
        blob[last] ^= 0xff;
        assert!(matches!(load(&blob, "A", &["A"]), Err(LoadError::ChecksumMismatch { .. })));
    }
}

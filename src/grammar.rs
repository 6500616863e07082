//! In-memory compiled grammar model (spec section 3 "Grammar", section 4.1).
//!
//! This is the runtime shape the [`crate::loader`] unpacks a binary blob
//! into; [`crate::compiler`] is what produces that blob from the
//! line-oriented text format in the first place.

use smol_str::SmolStr;

pub type SymbolId = u8;
pub type SetId = u8;

/// Reserved terminal-set IDs (spec 4.2).
pub const SET_EMPTY: SetId = 0;
pub const SET_EOF: SetId = 1;
pub const SET_ALL: SetId = 2;
pub const SET_SS: SetId = 3;
pub const SET_SC: SetId = 4;

/// Sentinel marking "no RHS nonterminal in this slot" (spec 4.2).
pub const NONE_SYMBOL: SymbolId = 255;

/// A `[start, end)` slice into the shared terminal-character pool, or, for
/// the three virtual sets (`Empty`, `Eof`, `All`) and the two runtime-patched
/// sets (`ss`, `sc`), a marker handled specially by [`TerminalSet::contains`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalSet {
    /// Matches nothing.
    Empty,
    /// Matches only end-of-stream (`ch.is_none()`).
    Eof,
    /// Matches any real character (never end-of-stream).
    All,
    /// A concrete, possibly runtime-populated, string of characters.
    Chars(String),
}

impl TerminalSet {
    /// `contains` per spec 4.4.3 step 2, before the rule's `invert` flag is
    /// applied: EOF is a member only of `Eof`, never of anything else,
    /// regardless of invert (spec 9, open question ii).
    pub fn contains(&self, ch: Option<char>) -> bool {
        match self {
            TerminalSet::Eof => ch.is_none(),
            TerminalSet::Empty => false,
            TerminalSet::All => ch.is_some(),
            TerminalSet::Chars(s) => ch.map(|c| s.contains(c)).unwrap_or(false),
        }
    }
}

/// A terminal-set reference with its invert flag, as used by a rule's
/// current-char and lookahead-char predicates (spec 3 "Production Rule").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetRef {
    pub set: SetId,
    pub invert: bool,
}

impl SetRef {
    pub fn new(set: SetId, invert: bool) -> Self {
        SetRef { set, invert }
    }

    /// Evaluate this predicate against a character (or `None` for EOF),
    /// resolving `set` against `sets`. Per spec 9 open question (ii):
    /// `ch = None` is never a member of any non-Eof set, and that holds for
    /// its inverse too -- `invert(Eof)` is the only way for EOF to satisfy a
    /// predicate other than the bare `Eof` set itself.
    pub fn matches(&self, sets: &[TerminalSet], ch: Option<char>) -> bool {
        if ch.is_none() && self.set != SET_EOF {
            return false;
        }
        let set = &sets[self.set as usize];
        let base = set.contains(ch);
        if self.invert {
            !base
        } else {
            base
        }
    }
}

/// The capture descriptor of a rule (spec 3 "Production Rule", spec 4.4.3
/// step 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureDescriptor {
    pub capture: bool,
    pub capture_start: bool,
    pub capture_end: bool,
    /// Only meaningful when `capture_start` is set: the semantic latched for
    /// the whole run of captured characters (spec 4.4.3 step 4).
    pub semantic: u8,
}

impl CaptureDescriptor {
    pub fn none() -> Self {
        CaptureDescriptor { capture: false, capture_start: false, capture_end: false, semantic: 0 }
    }
}

/// One Greibach-Normal-Form production rule (spec 3, spec 4.1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub lhs: SymbolId,
    pub current: SetRef,
    pub lookahead: SetRef,
    pub rhs: [Option<SymbolId>; 3],
    pub capture: CaptureDescriptor,
}

impl Rule {
    /// The RHS nonterminals, in left-to-right (original RHS) order.
    pub fn rhs_symbols(&self) -> impl DoubleEndedIterator<Item = SymbolId> + '_ {
        self.rhs.iter().filter_map(|s| *s)
    }
}

/// The fully loaded, immutable grammar (spec 3 "Grammar"). `rules_by_state`
/// is indexed by `SymbolId` and holds that nonterminal's rules in table
/// order, since the LL(1) match loop picks the first rule whose predicates
/// both hold (spec 4.4.3 step 2).
#[derive(Debug, Clone)]
pub struct CompiledGrammar {
    pub symbol_names: Vec<SmolStr>,
    pub start_symbol: SymbolId,
    pub sets: Vec<TerminalSet>,
    pub set_names: Vec<SmolStr>,
    pub rules_by_state: Vec<Vec<Rule>>,
    /// Acceptable end states besides the empty stack (spec 4.3; per spec 9
    /// open question iii this is `{D}` only for the Bach grammar, not
    /// `{D, S}` as section 4.3's prose states).
    pub acceptable_end_states: Vec<SymbolId>,
}

impl CompiledGrammar {
    pub fn symbol_name(&self, id: SymbolId) -> &str {
        self.symbol_names.get(id as usize).map(|s| s.as_str()).unwrap_or("?")
    }

    pub fn symbol_id(&self, name: &str) -> Option<SymbolId> {
        self.symbol_names.iter().position(|n| n.as_str() == name).map(|i| i as SymbolId)
    }

    pub fn is_acceptable_end_state(&self, sym: SymbolId) -> bool {
        self.acceptable_end_states.contains(&sym)
    }

    pub fn rules_for(&self, sym: SymbolId) -> &[Rule] {
        self.rules_by_state.get(sym as usize).map(|v| v.as_slice()).unwrap_or(&[])
    }
}

//! The Bach grammar itself: the text-format source compiled once, at first
//! use, into a [`crate::grammar::CompiledGrammar`].
//!
//! The source below is written in the line-oriented sectioned format
//! [`crate::compiler::compile`] understands. Splitting it out from the
//! compiler/loader keeps those two modules generic over any grammar, the
//! same way a parser generator's runtime is generic over any grammar it's
//! fed -- this module is the one concrete grammar this crate ships.

use std::sync::OnceLock;

use indoc::indoc;

use crate::grammar::CompiledGrammar;
use crate::loader::{self, LoadError};
use crate::shorthand::Shorthand;

/// Base special characters that always dispatch document-body parsing,
/// independent of any configured shorthand (mirrors
/// [`crate::shorthand::reserved_for_body_dispatch`] exactly -- this *is* that
/// set, spelled out as the literal pool characters `sc` is seeded from).
pub const SC_BASE: &str = "\t\r\n =:'\"[]{}<>()\\";

const SYMBOLS: &[&str] = &[
    "S", "IWS", "C", "D", "LD", "XSCC", "LSQ", "LDQ", "LBQ", "LSQESC", "LDQESC", "LBQESC", "SDS", "SD", "LSD", "DSH",
    "SDSH",
];

const SOURCE: &str = indoc! {r##"
[Production Symbols]
S
IWS
C
D
LD
XSCC
LSQ
LDQ
LBQ
LSQESC
LDQESC
LBQESC
SDS
SD
LSD
DSH
SDSH

[Capture Semantics]
none 0
label 1
attribute 2
literal 3
assign 4
subdocStart 5
subdocEnd 6
shorthandSymbol 7
shorthandAttrib 8

[Terminals]
"\t\r\n =:'\"[]()\\\t\r \t\r\n \n\\=:#()'\"[]\\'\\\"\\]"

[Terminal Sets]
empty 0 0
eof 0 0
all 0 0
ss 0 0
sc 0 0
iws 13 16
ws 16 20
lf 20 21
bs 21 22
asgn 22 24
hash 24 25
lparen 25 26
rparen 26 27
squote 27 28
dquote 28 29
lbracket 29 30
rbracket 30 31
escSQ 31 33
escDQ 33 35
escBQ 35 37

[Production Rules]
# S: pre-label prelude (blank lines, #-comments, leading inline whitespace)
RULE S lf S | lookahead all | - | as none
RULE S lf S | lookahead eof | - | as none
RULE S hash C | lookahead all | - | as none
RULE S hash C | lookahead eof | - | as none
RULE S iws IWS | lookahead all | - | as none
RULE S !sc D | lookahead sc | C,CS,CE | as label
RULE S !sc D | lookahead eof | C,CS,CE | as label
RULE S !sc XSCC D | lookahead !sc | C,CS | as label

# IWS: inline-whitespace-only run before a label; stalls (errors) if a
# non-blank, non-newline character follows -- an indented label is rejected.
RULE IWS lf S | lookahead all | - | as none
RULE IWS lf S | lookahead eof | - | as none
RULE IWS iws IWS | lookahead all | - | as none

# C: skip a #-comment to end of line, then resume the prelude.
RULE C !lf C | lookahead all | - | as none
RULE C !lf C | lookahead eof | - | as none
RULE C lf S | lookahead all | - | as none
RULE C lf S | lookahead eof | - | as none

# D: top-level document body, after the label has been captured. A run of
# whitespace is consumed one character at a time via direct self-recursion
# (no separate whitespace-run nonterminal is needed: the next character
# simply arrives as D's own `current` on the following step).
RULE D ws D | lookahead all | - | as none
RULE D ws D | lookahead eof | - | as none
RULE D lparen SDS D | lookahead all | C,CS,CE | as subdocStart
RULE D lparen SDS D | lookahead eof | C,CS,CE | as subdocStart
RULE D squote LSQ D | lookahead all | CS | as literal
RULE D squote LSQ D | lookahead eof | CS | as literal
RULE D dquote LDQ D | lookahead all | CS | as literal
RULE D dquote LDQ D | lookahead eof | CS | as literal
RULE D lbracket LBQ D | lookahead all | CS | as literal
RULE D lbracket LBQ D | lookahead eof | CS | as literal
# A configured shorthand symbol is always a `!sc` character too, so `ss`
# must be matched ahead of the generic attribute-name rules below or it is
# never reached. An attribute name is captured without knowing yet whether
# it stands alone or starts a pair; control returns straight to D, and `=`
# or `:` arriving as D's own current character is what completes the pair.
RULE D ss DSH | lookahead all | C,CS,CE | as shorthandSymbol
RULE D ss DSH | lookahead eof | C,CS,CE | as shorthandSymbol
RULE D asgn LD | lookahead all | C,CS,CE | as assign
RULE D asgn LD | lookahead eof | C,CS,CE | as assign
RULE D !sc D | lookahead sc | C,CS,CE | as attribute
RULE D !sc D | lookahead eof | C,CS,CE | as attribute
RULE D !sc XSCC D | lookahead !sc | C,CS | as attribute

# LD: expecting an attribute's value, after its name and `=`/`:` were seen.
RULE LD ws LD | lookahead all | - | as none
RULE LD squote LSQ D | lookahead all | CS | as literal
RULE LD squote LSQ D | lookahead eof | CS | as literal
RULE LD dquote LDQ D | lookahead all | CS | as literal
RULE LD dquote LDQ D | lookahead eof | CS | as literal
RULE LD lbracket LBQ D | lookahead all | CS | as literal
RULE LD lbracket LBQ D | lookahead eof | CS | as literal

# XSCC: shared multi-char capture continuation (label / attribute name /
# shorthand payload). The capture semantic is whatever the calling rule
# latched at captureStart; XSCC's own rules never start a fresh capture.
RULE XSCC !sc  | lookahead sc | C,CE | as none
RULE XSCC !sc  | lookahead eof | C,CE | as none
RULE XSCC !sc XSCC | lookahead !sc | C | as none

# LSQ / LSQESC: single-quoted literal body.
RULE LSQ squote  | lookahead all | CE | as literal
RULE LSQ squote  | lookahead eof | CE | as literal
RULE LSQ bs LSQESC | lookahead all | - | as none
RULE LSQ bs LSQESC | lookahead eof | - | as none
RULE LSQ !squote LSQ | lookahead all | C | as literal
RULE LSQ !squote LSQ | lookahead eof | C | as literal
RULE LSQESC escSQ LSQ | lookahead all | C | as literal
RULE LSQESC escSQ LSQ | lookahead eof | C | as literal

# LDQ / LDQESC: double-quoted literal body.
RULE LDQ dquote  | lookahead all | CE | as literal
RULE LDQ dquote  | lookahead eof | CE | as literal
RULE LDQ bs LDQESC | lookahead all | - | as none
RULE LDQ bs LDQESC | lookahead eof | - | as none
RULE LDQ !dquote LDQ | lookahead all | C | as literal
RULE LDQ !dquote LDQ | lookahead eof | C | as literal
RULE LDQESC escDQ LDQ | lookahead all | C | as literal
RULE LDQESC escDQ LDQ | lookahead eof | C | as literal

# LBQ / LBQESC: bracket-quoted literal body, closed by `]`.
RULE LBQ rbracket  | lookahead all | CE | as literal
RULE LBQ rbracket  | lookahead eof | CE | as literal
RULE LBQ bs LBQESC | lookahead all | - | as none
RULE LBQ bs LBQESC | lookahead eof | - | as none
RULE LBQ !rbracket LBQ | lookahead all | C | as literal
RULE LBQ !rbracket LBQ | lookahead eof | C | as literal
RULE LBQESC escBQ LBQ | lookahead all | C | as literal
RULE LBQESC escBQ LBQ | lookahead eof | C | as literal

# SDS: subdocument prelude -- optional leading whitespace, then either an
# immediate `)` (anonymous/empty subdocument) or a label.
RULE SDS ws SDS | lookahead all | - | as none
RULE SDS rparen  | lookahead all | C,CS,CE | as subdocEnd
RULE SDS rparen  | lookahead eof | C,CS,CE | as subdocEnd
RULE SDS !sc SD | lookahead sc | C,CS,CE | as label
RULE SDS !sc SD | lookahead eof | C,CS,CE | as label
RULE SDS !sc XSCC SD | lookahead !sc | C,CS | as label

# SD: subdocument body, after its label (or immediate anonymity) is settled.
# As with D, a whitespace run is handled by direct self-recursion; there is
# deliberately no `lookahead eof` variant -- trailing whitespace with no
# closing paren is an unterminated subdocument (spec 4.4.8's SD hint).
RULE SD ws SD | lookahead all | - | as none
RULE SD lparen SDS SD | lookahead all | C,CS,CE | as subdocStart
RULE SD lparen SDS SD | lookahead eof | C,CS,CE | as subdocStart
RULE SD squote LSQ SD | lookahead all | CS | as literal
RULE SD squote LSQ SD | lookahead eof | CS | as literal
RULE SD dquote LDQ SD | lookahead all | CS | as literal
RULE SD dquote LDQ SD | lookahead eof | CS | as literal
RULE SD lbracket LBQ SD | lookahead all | CS | as literal
RULE SD lbracket LBQ SD | lookahead eof | CS | as literal
RULE SD rparen  | lookahead all | C,CS,CE | as subdocEnd
RULE SD rparen  | lookahead eof | C,CS,CE | as subdocEnd
RULE SD ss SDSH | lookahead all | C,CS,CE | as shorthandSymbol
RULE SD ss SDSH | lookahead eof | C,CS,CE | as shorthandSymbol
RULE SD asgn LSD | lookahead all | C,CS,CE | as assign
RULE SD asgn LSD | lookahead eof | C,CS,CE | as assign
RULE SD !sc SD | lookahead sc | C,CS,CE | as attribute
RULE SD !sc SD | lookahead eof | C,CS,CE | as attribute
RULE SD !sc XSCC SD | lookahead !sc | C,CS | as attribute

# LSD: expecting a subdocument attribute's value.
RULE LSD ws LSD | lookahead all | - | as none
RULE LSD squote LSQ SD | lookahead all | CS | as literal
RULE LSD squote LSQ SD | lookahead eof | CS | as literal
RULE LSD dquote LDQ SD | lookahead all | CS | as literal
RULE LSD dquote LDQ SD | lookahead eof | CS | as literal
RULE LSD lbracket LBQ SD | lookahead all | CS | as literal
RULE LSD lbracket LBQ SD | lookahead eof | CS | as literal

# DSH / SDSH: shorthand payload capture, mirroring XSCC but owning its own
# captureStart since it is the first payload character after the symbol.
RULE DSH !sc D | lookahead sc | C,CS,CE | as shorthandAttrib
RULE DSH !sc D | lookahead eof | C,CS,CE | as shorthandAttrib
RULE DSH !sc XSCC D | lookahead !sc | C,CS | as shorthandAttrib

RULE SDSH !sc SD | lookahead sc | C,CS,CE | as shorthandAttrib
RULE SDSH !sc SD | lookahead eof | C,CS,CE | as shorthandAttrib
RULE SDSH !sc XSCC SD | lookahead !sc | C,CS | as shorthandAttrib

[END]
"##};

static GRAMMAR: OnceLock<CompiledGrammar> = OnceLock::new();

/// The compiled Bach grammar, built once and shared for the life of the
/// process.
pub fn grammar() -> &'static CompiledGrammar {
    GRAMMAR.get_or_init(|| {
        let blob = crate::compiler::compile(SOURCE).expect("built-in Bach grammar source fails to compile");
        let mut g = loader::load(&blob, "D", SYMBOLS).expect("built-in Bach grammar blob fails to load");
        loader::patch_shorthand_sets(&mut g, &[], SC_BASE);
        g
    })
}

/// Build a grammar instance with the `ss`/`sc` terminal sets patched for a
/// specific shorthand configuration (spec 4.3). Unlike [`grammar`], this is
/// not cached, since it varies per caller-supplied shorthand list.
pub fn grammar_for_shorthands(shorthands: &[Shorthand]) -> Result<CompiledGrammar, LoadError> {
    let blob = crate::compiler::compile(SOURCE).expect("built-in Bach grammar source fails to compile");
    let mut g = loader::load(&blob, "D", SYMBOLS)?;
    loader::patch_shorthand_sets(&mut g, shorthands, SC_BASE);
    Ok(g)
}

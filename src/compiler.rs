//! Grammar Compiler (spec 4.2): turns the line-oriented, sectioned text
//! format into the packed binary blob the [`crate::loader`] consumes.
//!
//! This is an offline batch step in spirit -- it has no dependency on the
//! character stream being parsed -- but since this crate cannot ship a build
//! step of its own, [`crate::bach_grammar`] runs it once at first use behind
//! a `OnceLock`.

use std::collections::HashMap;

use crate::grammar::NONE_SYMBOL;

const HEADER: &[u8; 8] = b"bach-cg1";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    #[error("malformed grammar source at line {line}: {reason}")]
    Malformed { line: usize, reason: String },
    #[error("duplicate symbol name '{0}'")]
    DuplicateSymbol(String),
    #[error("duplicate terminal set name '{0}'")]
    DuplicateSet(String),
    #[error("undefined set reference '{0}'")]
    UndefinedSet(String),
    #[error("undefined symbol reference '{0}'")]
    UndefinedSymbol(String),
    #[error("undefined capture semantic '{0}'")]
    UndefinedSemantic(String),
    #[error("rule for '{0}' has more than 3 RHS symbols")]
    TooManyRhs(String),
    #[error("id {0} exceeds the 127-ID limit")]
    IdTooLarge(usize),
    #[error("terminal pool exceeds 126 bytes")]
    PoolTooLarge,
    #[error("rule table exceeds 255 total rules")]
    TooManyRules,
    #[error("symbol '{0}' has more than 255 rules")]
    TooManyRulesForSymbol(String),
}

struct Parsed {
    symbols: Vec<String>,
    semantics: HashMap<String, u8>,
    pool: String,
    sets: Vec<(String, u16, u16)>,
    rules: Vec<ParsedRule>,
}

struct ParsedRule {
    lhs: String,
    current_set: String,
    current_invert: bool,
    rhs: Vec<String>,
    lookahead_set: String,
    lookahead_invert: bool,
    capture: bool,
    capture_start: bool,
    capture_end: bool,
    semantic_name: String,
}

/// Compile the text-format grammar source into a packed binary blob.
pub fn compile(source: &str) -> Result<Vec<u8>, CompileError> {
    let parsed = parse_source(source)?;
    pack(parsed)
}

fn parse_source(source: &str) -> Result<Parsed, CompileError> {
    let mut symbols = Vec::new();
    let mut semantics = HashMap::new();
    let mut pool = String::new();
    let mut sets: Vec<(String, u16, u16)> = Vec::new();
    let mut rules = Vec::new();

    let mut section = "";
    for (lineno, raw_line) in source.lines().enumerate() {
        let trimmed_raw = raw_line.trim();
        // The `[Terminals]` line is a single quoted literal that may contain a
        // `#` as one of its pool characters; comment-stripping must not touch
        // it, so it is taken verbatim rather than through `strip_comment`.
        let line = if section == "Terminals" && trimmed_raw.starts_with('"') {
            trimmed_raw
        } else {
            strip_comment(raw_line).trim()
        };
        if line.is_empty() {
            continue;
        }
        if line.starts_with('[') && line.ends_with(']') {
            section = &line[1..line.len() - 1];
            continue;
        }
        match section {
            "Production Symbols" => {
                if symbols.iter().any(|s: &String| s == line) {
                    return Err(CompileError::DuplicateSymbol(line.to_string()));
                }
                symbols.push(line.to_string());
            }
            "Capture Semantics" => {
                let mut it = line.split_whitespace();
                let name = it.next().ok_or_else(|| malformed(lineno, "missing semantic name"))?;
                let id: u8 = it
                    .next()
                    .ok_or_else(|| malformed(lineno, "missing semantic id"))?
                    .parse()
                    .map_err(|_| malformed(lineno, "semantic id not a number"))?;
                semantics.insert(name.to_string(), id);
            }
            "Terminals" => {
                let unquoted = line.trim_matches('"');
                pool = unescape(unquoted);
            }
            "Terminal Sets" => {
                let mut it = line.split_whitespace();
                let name = it.next().ok_or_else(|| malformed(lineno, "missing set name"))?;
                if sets.iter().any(|(n, _, _)| n == name) {
                    return Err(CompileError::DuplicateSet(name.to_string()));
                }
                let start: u16 = it
                    .next()
                    .ok_or_else(|| malformed(lineno, "missing set start"))?
                    .parse()
                    .map_err(|_| malformed(lineno, "set start not a number"))?;
                let end: u16 = it
                    .next()
                    .ok_or_else(|| malformed(lineno, "missing set end"))?
                    .parse()
                    .map_err(|_| malformed(lineno, "set end not a number"))?;
                sets.push((name.to_string(), start, end));
            }
            "Production Rules" => {
                rules.push(parse_rule_line(line, lineno)?);
            }
            "END" | "" => {}
            other => return Err(malformed(lineno, &format!("unknown section '{other}'"))),
        }
    }

    Ok(Parsed { symbols, semantics, pool, sets, rules })
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

fn malformed(lineno: usize, reason: &str) -> CompileError {
    CompileError::Malformed { line: lineno + 1, reason: reason.to_string() }
}

/// Undo the handful of backslash escapes the `[Terminals]` line may use
/// (`\t`, `\r`, `\n`, `\\`, `\"`), mirroring `cgrammar.py`'s `unquote`.
fn unescape(s: &str) -> String {
    let mut out = String::new();
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some('n') => out.push('\n'),
                Some('\\') => out.push('\\'),
                Some('"') => out.push('"'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// `RULE <sym> <cur> [rhs1 [rhs2 [rhs3]]] | lookahead <la> | <flags> | as <semantic>`
/// Current/lookahead specs are a set name, optionally prefixed with `!` to
/// invert. `<flags>` is a comma-joined subset of `CS,C,CE`, or `-` for none.
fn parse_rule_line(line: &str, lineno: usize) -> Result<ParsedRule, CompileError> {
    let line = line.strip_prefix("RULE ").ok_or_else(|| malformed(lineno, "expected 'RULE ...'"))?;
    let clauses: Vec<&str> = line.split('|').map(str::trim).collect();
    if clauses.len() != 4 {
        return Err(malformed(lineno, "expected 4 '|'-separated clauses"));
    }

    let mut head = clauses[0].split_whitespace();
    let lhs = head.next().ok_or_else(|| malformed(lineno, "missing LHS symbol"))?.to_string();
    let current_raw = head.next().ok_or_else(|| malformed(lineno, "missing current-set spec"))?;
    let (current_invert, current_set) = parse_set_spec(current_raw);
    let rhs: Vec<String> = head.map(|s| s.to_string()).collect();
    if rhs.len() > 3 {
        return Err(CompileError::TooManyRhs(lhs));
    }

    let la_clause = clauses[1]
        .strip_prefix("lookahead ")
        .ok_or_else(|| malformed(lineno, "expected 'lookahead <set>'"))?
        .trim();
    let (lookahead_invert, lookahead_set) = parse_set_spec(la_clause);

    let flags = clauses[2];
    let (capture, capture_start, capture_end) = if flags == "-" {
        (false, false, false)
    } else {
        let mut capture = false;
        let mut capture_start = false;
        let mut capture_end = false;
        for f in flags.split(',').map(str::trim) {
            match f {
                "C" => capture = true,
                "CS" => capture_start = true,
                "CE" => capture_end = true,
                other => return Err(malformed(lineno, &format!("unknown capture flag '{other}'"))),
            }
        }
        (capture, capture_start, capture_end)
    };

    let semantic_name = clauses[3]
        .strip_prefix("as ")
        .ok_or_else(|| malformed(lineno, "expected 'as <semantic>'"))?
        .trim()
        .to_string();

    Ok(ParsedRule {
        lhs,
        current_set,
        current_invert,
        rhs,
        lookahead_set,
        lookahead_invert,
        capture,
        capture_start,
        capture_end,
        semantic_name,
    })
}

fn parse_set_spec(raw: &str) -> (bool, String) {
    if let Some(rest) = raw.strip_prefix('!') {
        (true, rest.to_string())
    } else {
        (false, raw.to_string())
    }
}

fn pack(parsed: Parsed) -> Result<Vec<u8>, CompileError> {
    let Parsed { symbols, semantics, pool, sets, rules } = parsed;

    if symbols.len() > 127 {
        return Err(CompileError::IdTooLarge(symbols.len()));
    }
    if pool.len() > 126 {
        return Err(CompileError::PoolTooLarge);
    }
    if sets.len() > 127 {
        return Err(CompileError::IdTooLarge(sets.len()));
    }

    let symbol_id = |name: &str| -> Result<u8, CompileError> {
        symbols
            .iter()
            .position(|s| s == name)
            .map(|i| i as u8)
            .ok_or_else(|| CompileError::UndefinedSymbol(name.to_string()))
    };
    let set_id = |name: &str| -> Result<u8, CompileError> {
        sets.iter()
            .position(|(n, _, _)| n == name)
            .map(|i| i as u8)
            .ok_or_else(|| CompileError::UndefinedSet(name.to_string()))
    };
    let semantic_id = |name: &str| -> Result<u8, CompileError> {
        semantics.get(name).copied().ok_or_else(|| CompileError::UndefinedSemantic(name.to_string()))
    };

    let mut out = Vec::new();
    out.extend_from_slice(HEADER);
    out.push(symbols.len() as u8);
    out.push(pool.len() as u8);
    out.extend_from_slice(pool.as_bytes());
    out.push(sets.len() as u8);
    for (_name, start, end) in &sets {
        if *start > 126 || *end > 126 {
            return Err(CompileError::IdTooLarge((*start).max(*end) as usize));
        }
        out.push(*start as u8);
        out.push(*end as u8);
    }

    // Per-state (offset, count) table, then the flat rule array. Rules keep
    // their source order within a state, since the LL(1) match loop picks the
    // first rule whose predicates both hold (spec 4.4.3 step 2) and several
    // Bach rule families deliberately rely on that ordering to break ties
    // between overlapping current-sets (e.g. `asgn` listed ahead of `sc`).
    let mut rule_bytes: Vec<u8> = Vec::new();
    let mut per_state: Vec<(u8, u8)> = Vec::new();
    for (idx, name) in symbols.iter().enumerate() {
        let offset_count = rule_bytes.len() / 6;
        if offset_count > 255 {
            return Err(CompileError::TooManyRules);
        }
        let offset = offset_count as u8;
        let state_rules: Vec<&ParsedRule> =
            rules.iter().filter(|r| symbol_id(&r.lhs).map(|id| id as usize == idx).unwrap_or(false)).collect();
        if state_rules.len() > 255 {
            return Err(CompileError::TooManyRulesForSymbol(name.clone()));
        }
        for r in &state_rules {
            let current_id = set_id(&r.current_set)?;
            let lookahead_id = set_id(&r.lookahead_set)?;
            let mut current_byte = current_id & 0x7f;
            if r.current_invert {
                current_byte |= 0x80;
            }
            let mut lookahead_byte = lookahead_id & 0x7f;
            if r.lookahead_invert {
                lookahead_byte |= 0x80;
            }
            if r.rhs.len() > 3 {
                return Err(CompileError::TooManyRhs(r.lhs.clone()));
            }
            let mut rhs_bytes = [NONE_SYMBOL; 3];
            for (i, name) in r.rhs.iter().enumerate() {
                rhs_bytes[i] = symbol_id(name)?;
            }
            let semantic = semantic_id(&r.semantic_name)?;
            let mut capture_byte = semantic & 0x0f;
            if r.capture {
                capture_byte |= 0x80;
            }
            if r.capture_start {
                capture_byte |= 0x40;
            }
            if r.capture_end {
                capture_byte |= 0x20;
            }
            rule_bytes.push(current_byte);
            rule_bytes.push(rhs_bytes[0]);
            rule_bytes.push(rhs_bytes[1]);
            rule_bytes.push(rhs_bytes[2]);
            rule_bytes.push(lookahead_byte);
            rule_bytes.push(capture_byte);
        }
        per_state.push((offset, state_rules.len() as u8));
    }

    for (offset, count) in &per_state {
        out.push(*offset);
        out.push(*count);
    }
    out.extend_from_slice(&rule_bytes);

    let checksum: u8 = (out.iter().fold(0u32, |acc, b| acc + *b as u32) % 255) as u8;
    out.push(checksum);

    Ok(out)
}

/// Render a binary blob as the ASCII-hex text-transport form described in
/// spec section 6: lines of at most 80 hex characters.
pub fn to_hex_lines(blob: &[u8]) -> Vec<String> {
    let hex: String = blob.iter().map(|b| format!("{b:02x}")).collect();
    hex.as_bytes()
        .chunks(80)
        .map(|c| String::from_utf8_lossy(c).into_owned())
        .collect()
}

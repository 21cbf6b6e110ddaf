//! Regex-subset matcher for SDC target lists.
//!
//! SDC target lists (`-from`, `-to`, `-clock`) are matched against netlist
//! names with a small fixed subset of regex syntax, ported from the
//! original constraint reader's embedded matcher (see
//! `examples/original_source/vpr/SRC/timing/slre.c`): `.` (any character),
//! `[...]`/`[^...]` (character class, optionally negated, with `a-z`
//! ranges), `\s`/`\S`/`\d` (space / non-space / digit), `\r`/`\n` (literal
//! escapes), `\xDD` (a two-hex-digit byte escape), and the quantifiers
//! `*`, `*?`, `+`, `+?`, `?` applied to the atom immediately preceding
//! them. Everything else matches literally.
//!
//! Matching is always **anchored to the full string** — there is no
//! partial/substring match, unlike a general-purpose regex engine's
//! default behavior. A dependency on the `regex` crate would need an
//! explicit `^...$` wrapper to get this plus a subset restriction, so the
//! matcher is hand-rolled in-tree instead, the same way the original
//! constraint reader embeds a small matcher rather than linking a full
//! regex library. A bare `*` pattern is a library-wide escape meaning
//! "match everything," independent of the quantifier grammar above.

#[derive(Clone, Debug, PartialEq)]
enum Atom {
    Literal(u8),
    Any,
    Digit,
    Space,
    NonSpace,
    Class { items: Vec<ClassItem>, negated: bool },
}

#[derive(Clone, Debug, PartialEq)]
enum ClassItem {
    Char(u8),
    Range(u8, u8),
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Quant {
    One,
    Star { greedy: bool },
    Plus { greedy: bool },
    Quest,
}

#[derive(Clone, Debug, PartialEq)]
struct Piece {
    atom: Atom,
    quant: Quant,
}

fn atom_matches(atom: &Atom, b: u8) -> bool {
    match atom {
        Atom::Literal(c) => *c == b,
        Atom::Any => true,
        Atom::Digit => b.is_ascii_digit(),
        Atom::Space => b.is_ascii_whitespace(),
        Atom::NonSpace => !b.is_ascii_whitespace(),
        Atom::Class { items, negated } => {
            let hit = items.iter().any(|item| match item {
                ClassItem::Char(c) => *c == b,
                ClassItem::Range(lo, hi) => *lo <= b && b <= *hi,
            });
            hit != *negated
        }
    }
}

/// Decodes one escape sequence inside a `[...]` class, starting at
/// `bytes[i]` (the character just after the backslash). Returns the
/// decoded byte and how many bytes of `bytes` it consumed.
fn class_escape(bytes: &[u8], i: usize) -> Option<(u8, usize)> {
    match *bytes.get(i)? {
        b'n' => Some((b'\n', 1)),
        b'r' => Some((b'\r', 1)),
        b't' => Some((b'\t', 1)),
        b'x' => {
            let hex = bytes.get(i + 1..i + 3)?;
            let s = std::str::from_utf8(hex).ok()?;
            u8::from_str_radix(s, 16).ok().map(|v| (v, 3))
        }
        c => Some((c, 1)),
    }
}

/// Parses `pattern` into a sequence of atom+quantifier pieces. Returns
/// `None` on malformed syntax (unterminated `[`, dangling `\`, truncated
/// `\xDD`), which callers treat as "never matches."
fn parse(pattern: &str) -> Option<Vec<Piece>> {
    let bytes = pattern.as_bytes();
    let mut pieces = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let atom = match bytes[i] {
            b'.' => {
                i += 1;
                Atom::Any
            }
            b'[' => {
                i += 1;
                let negated = bytes.get(i) == Some(&b'^');
                if negated {
                    i += 1;
                }
                let mut items = Vec::new();
                while i < bytes.len() && bytes[i] != b']' {
                    let lo = if bytes[i] == b'\\' {
                        let (c, adv) = class_escape(bytes, i + 1)?;
                        i += 1 + adv;
                        c
                    } else {
                        let c = bytes[i];
                        i += 1;
                        c
                    };
                    if bytes.get(i) == Some(&b'-') && bytes.get(i + 1) != Some(&b']') && i + 1 < bytes.len() {
                        i += 1;
                        let hi = if bytes[i] == b'\\' {
                            let (c, adv) = class_escape(bytes, i + 1)?;
                            i += 1 + adv;
                            c
                        } else {
                            let c = bytes[i];
                            i += 1;
                            c
                        };
                        items.push(ClassItem::Range(lo, hi));
                    } else {
                        items.push(ClassItem::Char(lo));
                    }
                }
                if i >= bytes.len() {
                    return None; // unterminated class
                }
                i += 1; // consume ']'
                Atom::Class { items, negated }
            }
            b'\\' => {
                i += 1;
                match *bytes.get(i)? {
                    b's' => {
                        i += 1;
                        Atom::Space
                    }
                    b'S' => {
                        i += 1;
                        Atom::NonSpace
                    }
                    b'd' => {
                        i += 1;
                        Atom::Digit
                    }
                    b'r' => {
                        i += 1;
                        Atom::Literal(b'\r')
                    }
                    b'n' => {
                        i += 1;
                        Atom::Literal(b'\n')
                    }
                    b'x' => {
                        let hex = bytes.get(i + 1..i + 3)?;
                        let s = std::str::from_utf8(hex).ok()?;
                        let v = u8::from_str_radix(s, 16).ok()?;
                        i += 3;
                        Atom::Literal(v)
                    }
                    c => {
                        i += 1;
                        Atom::Literal(c)
                    }
                }
            }
            c => {
                i += 1;
                Atom::Literal(c)
            }
        };

        let quant = match bytes.get(i) {
            Some(b'*') => {
                i += 1;
                if bytes.get(i) == Some(&b'?') {
                    i += 1;
                    Quant::Star { greedy: false }
                } else {
                    Quant::Star { greedy: true }
                }
            }
            Some(b'+') => {
                i += 1;
                if bytes.get(i) == Some(&b'?') {
                    i += 1;
                    Quant::Plus { greedy: false }
                } else {
                    Quant::Plus { greedy: true }
                }
            }
            Some(b'?') => {
                i += 1;
                Quant::Quest
            }
            _ => Quant::One,
        };

        pieces.push(Piece { atom, quant });
    }

    Some(pieces)
}

/// Tries to match `pieces[pi..]` against `text[ti..]`, requiring the
/// match to consume `text` exactly to its end. Recursion depth is bounded
/// by the number of atoms in the pattern (SDC target patterns are short
/// identifiers, never attacker-controlled input), so plain recursive
/// backtracking is used rather than an explicit stack.
fn match_from(pieces: &[Piece], pi: usize, text: &[u8], ti: usize) -> bool {
    if pi == pieces.len() {
        return ti == text.len();
    }

    let piece = &pieces[pi];
    match piece.quant {
        Quant::One => {
            ti < text.len()
                && atom_matches(&piece.atom, text[ti])
                && match_from(pieces, pi + 1, text, ti + 1)
        }
        Quant::Quest => {
            if ti < text.len()
                && atom_matches(&piece.atom, text[ti])
                && match_from(pieces, pi + 1, text, ti + 1)
            {
                true
            } else {
                match_from(pieces, pi + 1, text, ti)
            }
        }
        Quant::Star { greedy } => match_repeat(pieces, pi, text, ti, greedy),
        Quant::Plus { greedy } => {
            ti < text.len()
                && atom_matches(&piece.atom, text[ti])
                && match_repeat(pieces, pi, text, ti + 1, greedy)
        }
    }
}

/// Finds the longest run of `text[ti..]` matching `pieces[pi].atom`, then
/// tries consuming `0..=run` of it (in greedy or non-greedy order) before
/// matching the rest of the pattern against what remains.
fn match_repeat(pieces: &[Piece], pi: usize, text: &[u8], ti: usize, greedy: bool) -> bool {
    let atom = &pieces[pi].atom;
    let mut run = 0;
    while ti + run < text.len() && atom_matches(atom, text[ti + run]) {
        run += 1;
    }

    if greedy {
        (0..=run).rev().any(|k| match_from(pieces, pi + 1, text, ti + k))
    } else {
        (0..=run).any(|k| match_from(pieces, pi + 1, text, ti + k))
    }
}

/// Returns `true` if `pattern` matches `candidate` over the entire string.
pub fn matches(pattern: &str, candidate: &str) -> bool {
    if is_bare_wildcard(pattern) {
        return true;
    }
    match parse(pattern) {
        Some(pieces) => match_from(&pieces, 0, candidate.as_bytes(), 0),
        None => false,
    }
}

/// Returns `true` if `pattern` is the bare wildcard `*`, which SDC uses to
/// mean "every netlist clock" in contexts like `set_input_delay -clock *`.
pub fn is_bare_wildcard(pattern: &str) -> bool {
    pattern == "*"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_match() {
        assert!(matches("clk", "clk"));
        assert!(!matches("clk", "clk2"));
    }

    #[test]
    fn anchored_full_string() {
        // "clk" must match the whole candidate, not a substring of it.
        assert!(!matches("clk", "sys_clk_buf"));
    }

    #[test]
    fn empty_pattern_matches_empty_only() {
        assert!(matches("", ""));
        assert!(!matches("", "x"));
    }

    #[test]
    fn bare_wildcard_matches_everything() {
        assert!(matches("*", ""));
        assert!(matches("*", "anything"));
    }

    #[test]
    fn bare_wildcard_detection() {
        assert!(is_bare_wildcard("*"));
        assert!(!is_bare_wildcard("*clk"));
        assert!(!is_bare_wildcard(""));
    }

    #[test]
    fn dot_matches_any_single_char() {
        assert!(matches(".lk", "clk"));
        assert!(!matches(".lk", "llk2"));
    }

    #[test]
    fn star_quantifier_repeats_preceding_atom() {
        assert!(matches("cl.*", "clk"));
        assert!(matches("cl.*", "clock"));
        assert!(matches("cl.*", "cl"));
        assert!(!matches("cl.*", "sys_clk"));
    }

    #[test]
    fn plus_quantifier_requires_at_least_one() {
        assert!(matches("ab+c", "abc"));
        assert!(matches("ab+c", "abbbbc"));
        assert!(!matches("ab+c", "ac"));
    }

    #[test]
    fn quest_quantifier_zero_or_one() {
        assert!(matches("colou?r", "color"));
        assert!(matches("colou?r", "colour"));
        assert!(!matches("colou?r", "colouur"));
    }

    #[test]
    fn non_greedy_quantifiers_still_require_full_match() {
        assert!(matches("a*?b", "aaab"));
        assert!(matches("a+?b", "aaab"));
        assert!(!matches("a+?b", "b"));
    }

    #[test]
    fn character_class() {
        assert!(matches("[a-z]+", "reg"));
        assert!(!matches("[a-z]+", "REG"));
        assert!(!matches("[a-z]+", ""));
    }

    #[test]
    fn negated_character_class() {
        assert!(matches("[^0-9]+", "reg"));
        assert!(!matches("[^0-9]+", "reg3"));
    }

    #[test]
    fn digit_escape() {
        assert!(matches("reg\\d", "reg3"));
        assert!(!matches("reg\\d", "regA"));
    }

    #[test]
    fn space_and_nonspace_escapes() {
        assert!(matches("a\\sb", "a b"));
        assert!(!matches("a\\sb", "axb"));
        assert!(matches("a\\Sb", "axb"));
        assert!(!matches("a\\Sb", "a b"));
    }

    #[test]
    fn hex_escape() {
        assert!(matches("\\x41", "A"));
        assert!(!matches("\\x41", "B"));
    }

    #[test]
    fn malformed_pattern_never_matches() {
        assert!(!matches("[a-z", "a"));
        assert!(!matches("\\x4", "A"));
    }
}

//! The table-driven scan loop shared by the regex and lexer facades.
//!
//! One scan is linear in the input: from the caller's offset the machine
//! records the most recent accepting state, updates capture slots on
//! ref-flagged states, consumes one scalar, and follows the row's
//! triples (or its default transition) until no transition remains. The
//! longest recorded accept wins unless non-greedy scanning stops at the
//! first one. Anchors are verified against the surrounding text only at
//! acceptance time.

use crate::captures::Captures;
use crate::dfa::table::DfaTable;
use crate::encoding::EncodedStr;
use crate::flags::{MatchFlags, RunFlags};
use crate::matches::Match;
use crate::pattern::MAX_REFS;

/// Runs the machine once, anchored at `at`. Returns the longest (or,
/// non-greedy, the first) accepted extent whose anchors hold.
pub(crate) fn match_at<H>(
    table: &DfaTable,
    flags: RunFlags,
    haystack: &H,
    at: usize,
    caps: &mut Captures,
) -> Option<Match>
where
    H: EncodedStr + ?Sized,
{
    caps.reset();
    let sentinel = table.num_states();
    if sentinel == 0 {
        return None;
    }
    let debug = flags.contains(RunFlags::DEBUG);

    let mut state = 0u32;
    let mut pos = at;
    let mut last_accept: Option<(u32, usize, MatchFlags)> = None;

    loop {
        let accept = table.accept(state);
        if accept > 0 {
            let mflags = table.flags(state);
            last_accept = Some((accept, pos, mflags));
            if flags.contains(RunFlags::NONGREEDY) || mflags.contains(MatchFlags::NONGREEDY) {
                if debug {
                    log::trace!("state {state} accepted {accept}, end of recognition");
                }
                break;
            }
        }

        let refs = table.refs(state);
        if refs != 0 && !flags.contains(RunFlags::NOREF) {
            for i in 1..MAX_REFS {
                if refs & (1 << i) != 0 {
                    caps.update(i, pos);
                }
            }
        }

        let Some((cp, width)) = haystack.decode_at(pos) else {
            break;
        };
        let next = table.lookup(state, cp);
        if next == sentinel {
            break;
        }
        if debug {
            log::trace!("state {state}, codepoint {cp}, next state {next}");
        }
        state = next;
        pos += width;
    }

    let (id, end, mflags) = last_accept?;
    if !check_anchors(haystack, at, end, mflags, flags) {
        return None;
    }
    caps.set_whole(at, end);
    Some(Match {
        id,
        start: at,
        end,
    })
}

/// Scans forward from `at` for the first offset where a match succeeds.
/// A match is only attempted where the start state can consume the
/// current scalar, so dead positions cost one table lookup.
pub(crate) fn find_at<H>(
    table: &DfaTable,
    flags: RunFlags,
    haystack: &H,
    at: usize,
    caps: &mut Captures,
) -> Option<Match>
where
    H: EncodedStr + ?Sized,
{
    if table.num_states() == 0 {
        return None;
    }
    let mut pos = at;
    while let Some((cp, width)) = haystack.decode_at(pos) {
        if table.can_step(0, cp) {
            if let Some(m) = match_at(table, flags, haystack, pos, caps) {
                return Some(m);
            }
        }
        pos += width;
    }
    None
}

/// The offset one scalar past `at`, used to step over empty matches.
pub(crate) fn step_one<H>(haystack: &H, at: usize) -> usize
where
    H: EncodedStr + ?Sized,
{
    match haystack.decode_at(at) {
        Some((_, width)) => at + width,
        None => haystack.len_units(),
    }
}

/// Verifies the anchors recorded on the accepting state against the
/// text surrounding `[start, end)`.
fn check_anchors<H>(
    haystack: &H,
    start: usize,
    end: usize,
    mflags: MatchFlags,
    flags: RunFlags,
) -> bool
where
    H: EncodedStr + ?Sized,
{
    if flags.contains(RunFlags::NOANCHORS) {
        return true;
    }
    let anchors = mflags.anchors();
    if anchors.is_empty() {
        return true;
    }

    if anchors.contains(MatchFlags::BOL) {
        if let Some(prev) = haystack.decode_before(start) {
            if prev != '\n' as u32 && prev != '\r' as u32 {
                return false;
            }
        }
    }
    if anchors.contains(MatchFlags::EOL) {
        if let Some((next, _)) = haystack.decode_at(end) {
            if next != '\n' as u32 && next != '\r' as u32 {
                return false;
            }
        }
    }
    if anchors.contains(MatchFlags::BOW) {
        if let Some(prev) = haystack.decode_before(start) {
            if H::is_word(prev) {
                return false;
            }
        }
    }
    if anchors.contains(MatchFlags::EOW) {
        if let Some((next, _)) = haystack.decode_at(end) {
            if H::is_word(next) {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dfa::minimize::minimize;
    use crate::dfa::Dfa;
    use crate::flags::CompileFlags;
    use crate::nfa::Nfa;
    use crate::pattern::Pattern;

    fn table_for(pat: &str, compile: CompileFlags) -> DfaTable {
        let mut ptn = Pattern::parse(pat, compile).unwrap();
        ptn.set_accept(1);
        let mut nfa = Nfa::new();
        nfa.add_pattern(&ptn);
        let mut dfa = Dfa::from_nfa(&nfa);
        minimize(&mut dfa);
        DfaTable::from_dfa(&dfa)
    }

    fn m(table: &DfaTable, hay: &str, at: usize) -> Option<Match> {
        match_at(table, RunFlags::empty(), hay, at, &mut Captures::new())
    }

    #[test]
    fn longest_match_wins() {
        let table = table_for("a+", CompileFlags::empty());
        let found = m(&table, "aaab", 0).unwrap();
        assert_eq!(found.range(), 0..3);
    }

    #[test]
    fn nongreedy_stops_at_first_accept() {
        let table = table_for("a+", CompileFlags::NONGREEDY);
        let found = m(&table, "aaab", 0).unwrap();
        assert_eq!(found.range(), 0..1);

        // The same machine, forced non-greedy at run time.
        let greedy = table_for("a+", CompileFlags::empty());
        let found = match_at(
            &greedy,
            RunFlags::NONGREEDY,
            "aaab",
            0,
            &mut Captures::new(),
        )
        .unwrap();
        assert_eq!(found.range(), 0..1);
    }

    #[test]
    fn match_is_anchored_at_offset() {
        let table = table_for("b+", CompileFlags::empty());
        assert!(m(&table, "abbb", 0).is_none());
        assert_eq!(m(&table, "abbb", 1).unwrap().range(), 1..4);
    }

    #[test]
    fn find_skips_dead_positions() {
        let table = table_for("[0-9]+", CompileFlags::empty());
        let found = find_at(
            &table,
            RunFlags::empty(),
            "abc 123 x",
            0,
            &mut Captures::new(),
        )
        .unwrap();
        assert_eq!(found.range(), 4..7);
    }

    #[test]
    fn captures_record_group_extents() {
        let table = table_for("a(b|c)+d", CompileFlags::empty());
        let mut caps = Captures::new();
        let found = match_at(&table, RunFlags::empty(), "abccbd", 0, &mut caps).unwrap();
        assert_eq!(found.range(), 0..6);
        // The slot's start pins at the first boundary traversal and the
        // end follows the last one.
        let group = caps.get(1).unwrap();
        assert_eq!(group.range(), 1..5);
        assert_eq!(caps.get(0).unwrap().range(), 0..6);
        assert_eq!(caps.get(2), None);
    }

    #[test]
    fn noref_skips_capture_updates() {
        let table = table_for("a(b)c", CompileFlags::empty());
        let mut caps = Captures::new();
        match_at(&table, RunFlags::NOREF, "abc", 0, &mut caps).unwrap();
        assert_eq!(caps.get(1), None);
    }

    #[test]
    fn bol_anchor_checks_preceding_text() {
        let table = table_for("^ab", CompileFlags::empty());
        assert_eq!(m(&table, "ab", 0).unwrap().range(), 0..2);
        assert!(m(&table, "xab", 1).is_none());
        assert_eq!(m(&table, "x\nab", 2).unwrap().range(), 2..4);
        // NOANCHORS suppresses the check.
        let found = match_at(
            &table,
            RunFlags::NOANCHORS,
            "xab",
            1,
            &mut Captures::new(),
        )
        .unwrap();
        assert_eq!(found.range(), 1..3);
    }

    #[test]
    fn eol_anchor_checks_following_text() {
        let table = table_for("ab$", CompileFlags::empty());
        assert!(m(&table, "abz", 0).is_none());
        assert!(m(&table, "ab", 0).is_some());
        assert!(m(&table, "ab\nz", 0).is_some());
    }

    #[test]
    fn word_anchors_check_neighbors() {
        let table = table_for(r"\<the\>", CompileFlags::empty());
        assert!(m(&table, "the", 0).is_some());
        assert!(m(&table, "them", 0).is_none());
        assert!(m(&table, "xthe", 1).is_none());
        assert!(m(&table, " the ", 1).is_some());
    }

    #[test]
    fn insensitive_is_baked_into_the_table() {
        let table = table_for("abc", CompileFlags::INSENSITIVE);
        assert!(m(&table, "aBC", 0).is_some());
        assert!(m(&table, "abd", 0).is_none());
    }

    #[test]
    fn scans_bytes_and_wide_input() {
        let table = table_for("é+", CompileFlags::empty());
        let bytes = "xéé".as_bytes();
        let found = find_at(&table, RunFlags::empty(), bytes, 0, &mut Captures::new()).unwrap();
        assert_eq!(found.range(), 1..5);

        let wide = widestring::u32str!("xéé");
        let found = find_at(&table, RunFlags::empty(), wide, 0, &mut Captures::new()).unwrap();
        assert_eq!(found.range(), 1..3);
    }

    #[test]
    fn malformed_utf8_is_scanned_literally() {
        // 0xe9 is the Latin-1 byte for 'é'; as broken UTF-8 it still
        // matches a class containing codepoint 0xe9 byte-wise.
        let table = table_for("\u{e9}", CompileFlags::empty());
        let hay: &[u8] = b"x\xe9y";
        let found = find_at(&table, RunFlags::empty(), hay, 0, &mut Captures::new()).unwrap();
        assert_eq!(found.range(), 1..2);
    }
}

/*!
A table-driven lexer and regular expression toolkit.

`lextab` turns POSIX-like regular expressions — alternation,
concatenation, closures, character classes, shorthands, anchors,
capturing groups — into compact table-driven recognizers, either one
pattern at a time ([`regex::Regex`]) or many patterns fused into a
single machine that reports the winning match id at each position
([`lexer::Lexer`]).

The pipeline is classical: a character-class algebra over Unicode
scalar ranges ([`ccl`]), a recursive-descent parser into a pattern AST
([`pattern`]), Thompson construction into an ε-NFA, subset construction
over a partitioned alphabet, Hopcroft-style minimization, and a packed
integer transition table ([`DfaTable`]) scanned by a longest-match
executor. Matching is strictly DFA-based and linear in the input; there
is no backtracking.

## Matching

```
use lextab::regex::Regex;

let re = Regex::builder(r"a(b|c)+d").build()?;
let m = re.find("xx abccbd yy").unwrap();
assert_eq!(m.range(), 3..9);

let re = Regex::builder(r"\s*,\s*").build()?;
let fields: Vec<&str> = re.split("a , b,c ,d").collect();
assert_eq!(fields, ["a", "b", "c", "d"]);
# Ok::<(), lextab::BuildError>(())
```

## Tokenizing

```
use lextab::lexer::Lexer;

let lexer = Lexer::builder()
    .define("[0-9]+", 1)?
    .define("[a-zA-Z_][a-zA-Z_0-9]*", 2)?
    .define("[ \t]+", 3)?
    .build()?;

let first = lexer.next("if x42 = 7", 0).unwrap();
assert_eq!((first.id(), first.start(), first.end()), (2, 0, 2));
# Ok::<(), lextab::BuildError>(())
```

## Input encodings

Scanning is generic over the haystack type: `str` scans UTF-8, `[u8]`
scans UTF-8 and consumes malformed bytes literally,
[`encoding::RawBytes`] scans unsigned byte units, and
[`widestring::U32Str`] scans UTF-32 units. Offsets are always in the
haystack's own units.

## Sharing

Compiled objects are immutable and hold no scratch: a `&Regex` or
`&Lexer` can serve concurrent scans, each with its own
[`Captures`] buffer via the `*_with` entry points.
*/

pub mod ccl;
pub mod encoding;
pub mod lexer;
pub mod pattern;
pub mod regex;

mod captures;
mod dfa;
mod error;
mod executor;
mod flags;
mod matches;
mod nfa;

pub use captures::{Captures, Span};
pub use dfa::table::DfaTable;
pub use error::BuildError;
pub use flags::{CompileFlags, MatchFlags, RunFlags};
pub use matches::Match;

#[cfg(test)]
mod tests {
    use crate::flags::{CompileFlags, RunFlags};
    use crate::lexer::Lexer;
    use crate::regex::Regex;

    #[test]
    fn capture_tracks_group_boundaries() {
        let re = Regex::compile("a(b|c)+d").unwrap();
        let (m, caps) = re.captures("abccbd").unwrap();
        assert_eq!(m.range(), 0..6);
        // The slot start pins on the first boundary traversal, the end
        // follows the last one.
        assert_eq!(caps.get(1).unwrap().range(), 1..5);
    }

    #[test]
    fn tokenizer_emits_ids_in_definition_order() {
        let lexer = Lexer::builder()
            .define("[0-9]+", 1)
            .unwrap()
            .define("[a-zA-Z_][a-zA-Z_0-9]*", 2)
            .unwrap()
            .define("[ \t]+", 3)
            .unwrap()
            .build()
            .unwrap();
        let first = lexer.next("if x42 = 7", 0).unwrap();
        assert_eq!((first.id(), first.start(), first.end()), (2, 0, 2));

        let ids: Vec<u32> = lexer.tokens("if x42 = 7").map(|m| m.id()).collect();
        assert_eq!(ids, [2, 3, 2, 3, 3, 1]);
    }

    #[test]
    fn word_anchored_replace() {
        let re = Regex::compile(r"\<the\>").unwrap();
        assert_eq!(re.replace("the theater the", "X"), "X theater X");
    }

    #[test]
    fn template_expands_captures() {
        let re = Regex::compile(r"([a-z]+) ([a-z]+)").unwrap();
        assert_eq!(re.replace("hello world", "$2 $1"), "world hello");
    }

    #[test]
    fn split_on_delimiters() {
        let re = Regex::compile(r"\s*,\s*").unwrap();
        let fields: Vec<&str> = re.split("a , b,c ,d").collect();
        assert_eq!(fields, ["a", "b", "c", "d"]);
    }

    #[test]
    fn nongreedy_tag_scan() {
        let re = Regex::compile("<.*?>").unwrap();
        let tags: Vec<_> = re.find_iter("<a><b>").map(|m| m.range()).collect();
        assert_eq!(tags, [0..3, 3..6]);

        // The same behavior through the run-time flag.
        let re = Regex::builder("<.*>")
            .run_flags(RunFlags::NONGREEDY)
            .build()
            .unwrap();
        let tags: Vec<_> = re.find_iter("<a><b>").map(|m| m.range()).collect();
        assert_eq!(tags, [0..3, 3..6]);
    }

    #[test]
    fn keyword_table_is_three_rows() {
        let re = Regex::compile("@[a-z0-9]+").unwrap();
        let table = re.table();
        assert_eq!(table.num_states(), 3);
        assert_eq!(table.row(0), &[8, 0, 0, 0, 3, 64, 64, 2]);
        assert_eq!(table.row(1), &[11, 1, 0, 0, 3, 48, 57, 1, 97, 122, 1]);
        assert_eq!(table.row(2), &[11, 0, 0, 0, 3, 48, 57, 1, 97, 122, 1]);
    }

    #[test]
    fn dfa_agrees_with_a_naive_nfa_oracle() {
        // A small regression oracle: compare table-driven matching
        // against direct NFA simulation over a fixed input soup.
        use crate::nfa::Nfa;
        use crate::pattern::Pattern;
        use std::collections::BTreeSet;

        let patterns = ["a(b|c)*d", "[ab]+c?", "x|y|xy+", "(0|1)(0|1)*"];
        let inputs = [
            "", "a", "ad", "abc", "abcd", "acccd", "aab", "abac", "x", "xyy", "yx", "01",
            "0110", "2", "ab2c",
        ];
        for pat in patterns {
            let mut ptn = Pattern::parse(pat, CompileFlags::empty()).unwrap();
            ptn.set_accept(1);
            let mut nfa = Nfa::new();
            nfa.add_pattern(&ptn);

            let re = Regex::compile(pat).unwrap();
            for input in inputs {
                // NFA oracle: longest accepting prefix via direct
                // closure simulation.
                let mut set = BTreeSet::from([0]);
                let (mut accept, _) = nfa.epsilon_closure(&mut set);
                let mut longest = if accept > 0 { Some(0) } else { None };
                for (i, ch) in input.chars().enumerate() {
                    set = nfa.move_set(&set, ch as u32, ch as u32);
                    if set.is_empty() {
                        break;
                    }
                    (accept, _) = nfa.epsilon_closure(&mut set);
                    if accept > 0 {
                        longest = Some(i + 1);
                    }
                }
                let expected = longest.map(|chars| {
                    input.chars().take(chars).map(char::len_utf8).sum::<usize>()
                });
                let got = re.match_at(input, 0).map(|m| m.end());
                assert_eq!(got, expected, "pattern {pat:?} on {input:?}");
            }
        }
    }

    #[test]
    fn insensitive_static_and_uchar_modes_compose() {
        use crate::encoding::RawBytes;

        let re = Regex::builder("a.b")
            .compile_flags(CompileFlags::STATIC | CompileFlags::INSENSITIVE)
            .build()
            .unwrap();
        assert!(re.is_match("xA.B"));
        assert!(!re.is_match("axb"));

        // Raw byte units: 0xe9 matches a class containing that scalar.
        let re = Regex::compile("\u{e9}+").unwrap();
        let hay = RawBytes(b"\xe9\xe9z");
        assert_eq!(re.find(&hay).unwrap().range(), 0..2);
    }

    #[test]
    fn linear_scan_has_no_blowup() {
        // A pattern that is exponential for backtrackers compiles to a
        // small DFA and scans long inputs without issue.
        let re = Regex::compile("(a|aa)*b").unwrap();
        let hay = "a".repeat(4096);
        assert!(re.match_at(hay.as_str(), 0).is_none());
        let hay = format!("{hay}b");
        assert_eq!(re.match_at(hay.as_str(), 0).unwrap().end(), 4097);
    }
}

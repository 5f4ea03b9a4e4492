//! The multi-pattern lexer: several patterns combined into one DFA,
//! reporting the winning match id at each position.
//!
//! Patterns accumulate in a [`LexerBuilder`]; building performs the
//! whole preparation (combined NFA, subset construction, minimization,
//! table packing) and hands out an immutable [`Lexer`]. When two
//! patterns can match the same lexeme, the one defined with the lower
//! match id wins.
//!
//! ```
//! use lextab::lexer::Lexer;
//!
//! let lexer = Lexer::builder()
//!     .define("[0-9]+", 1)?
//!     .define("[a-zA-Z_][a-zA-Z_0-9]*", 2)?
//!     .define("[ \t]+", 3)?
//!     .build()?;
//!
//! let kinds: Vec<u32> = lexer.tokens("if x42").map(|t| t.id()).collect();
//! assert_eq!(kinds, [2, 3, 2]);
//! # Ok::<(), lextab::BuildError>(())
//! ```

use crate::captures::Captures;
use crate::dfa::minimize::minimize;
use crate::dfa::table::DfaTable;
use crate::dfa::Dfa;
use crate::encoding::EncodedStr;
use crate::error::{BuildError, BuildErrorKind};
use crate::executor;
use crate::flags::{CompileFlags, MatchFlags, RunFlags};
use crate::matches::Match;
use crate::nfa::Nfa;
use crate::pattern::Pattern;

/// Collects pattern definitions and prepares the combined machine.
#[derive(Debug, Clone, Default)]
pub struct LexerBuilder {
    ptns: Vec<Pattern>,
    compile_flags: CompileFlags,
    run_flags: RunFlags,
}

impl LexerBuilder {
    pub fn new() -> LexerBuilder {
        LexerBuilder::default()
    }

    /// Compile-time modifiers merged into every following `define`.
    pub fn compile_flags(mut self, flags: CompileFlags) -> LexerBuilder {
        self.compile_flags = flags;
        self
    }

    /// Scan-time modifiers applied to every scan of the built lexer.
    pub fn run_flags(mut self, flags: RunFlags) -> LexerBuilder {
        self.run_flags = flags;
        self
    }

    /// Parses `pat` and appends it under `match_id` (a positive id; the
    /// lower the id, the higher the pattern's precedence).
    pub fn define(self, pat: &str, match_id: u32) -> Result<LexerBuilder, BuildError> {
        self.define_with(pat, match_id, CompileFlags::empty())
    }

    /// Like [`define`](LexerBuilder::define) with additional per-pattern
    /// compile flags.
    pub fn define_with(
        mut self,
        pat: &str,
        match_id: u32,
        flags: CompileFlags,
    ) -> Result<LexerBuilder, BuildError> {
        if match_id == 0 {
            return Err(BuildError::new(BuildErrorKind::ZeroMatchId));
        }
        let mut ptn = Pattern::parse(pat, self.compile_flags | flags)?;
        ptn.set_accept(match_id);
        self.ptns.push(ptn);
        Ok(self)
    }

    /// Appends an already-built pattern AST under `match_id`.
    pub fn define_pattern(
        mut self,
        mut ptn: Pattern,
        match_id: u32,
    ) -> Result<LexerBuilder, BuildError> {
        if match_id == 0 {
            return Err(BuildError::new(BuildErrorKind::ZeroMatchId));
        }
        ptn.set_accept(match_id);
        self.ptns.push(ptn);
        Ok(self)
    }

    /// Prepares the combined machine: one NFA with a start spine over
    /// all patterns, subset-constructed, minimized and packed.
    pub fn build(self) -> Result<Lexer, BuildError> {
        if self.ptns.is_empty() {
            return Err(BuildError::new(BuildErrorKind::NoPatterns));
        }
        let mut nfa = Nfa::new();
        for ptn in &self.ptns {
            nfa.add_pattern(ptn);
        }
        let mut dfa = Dfa::from_nfa(&nfa);
        minimize(&mut dfa);
        let table = DfaTable::from_dfa(&dfa);
        log::debug!(
            "prepared lexer: {} patterns, {} DFA states",
            self.ptns.len(),
            table.num_states()
        );
        Ok(Lexer {
            ptns: self.ptns,
            table,
            run_flags: self.run_flags,
        })
    }
}

/// A prepared multi-pattern lexer. Immutable; holds no scan scratch.
#[derive(Debug, Clone)]
pub struct Lexer {
    ptns: Vec<Pattern>,
    table: DfaTable,
    run_flags: RunFlags,
}

impl Lexer {
    pub fn builder() -> LexerBuilder {
        LexerBuilder::new()
    }

    /// Wraps a pre-compiled transition table, typically reloaded through
    /// [`DfaTable::from_rows`]. The resulting lexer scans exactly like
    /// the one the table was compiled from, but carries no pattern ASTs.
    pub fn from_table(table: DfaTable, run_flags: RunFlags) -> Lexer {
        Lexer {
            ptns: Vec::new(),
            table,
            run_flags,
        }
    }

    /// The packed transition table of the combined machine.
    pub fn table(&self) -> &DfaTable {
        &self.table
    }

    /// The defined patterns, in definition order.
    pub fn patterns(&self) -> &[Pattern] {
        &self.ptns
    }

    /// Runs the machine once, anchored at `at`; the returned match
    /// carries the winning pattern's id.
    pub fn lex<H>(&self, haystack: &H, at: usize) -> Option<Match>
    where
        H: EncodedStr + ?Sized,
    {
        self.lex_with(haystack, at, &mut Captures::new())
    }

    /// Like [`lex`](Lexer::lex), filling the caller's capture buffer.
    pub fn lex_with<H>(&self, haystack: &H, at: usize, caps: &mut Captures) -> Option<Match>
    where
        H: EncodedStr + ?Sized,
    {
        executor::match_at(&self.table, self.run_flags, haystack, at, caps)
    }

    /// Advances from `at` to the next position producing any match,
    /// skipping unmatchable positions with the dead-position pre-check.
    pub fn next<H>(&self, haystack: &H, at: usize) -> Option<Match>
    where
        H: EncodedStr + ?Sized,
    {
        executor::find_at(&self.table, self.run_flags, haystack, at, &mut Captures::new())
    }

    /// Iterates [`next`](Lexer::next) to the end of input, yielding one
    /// match per recognized token.
    pub fn tokens<'l, 'h, H>(&'l self, haystack: &'h H) -> Tokens<'l, 'h, H>
    where
        H: EncodedStr + ?Sized,
    {
        Tokens {
            lexer: self,
            haystack,
            at: 0,
            done: false,
        }
    }

    /// An incremental per-codepoint stepper over this lexer's machine.
    pub fn scanner(&self) -> Scanner<'_> {
        Scanner {
            table: &self.table,
            run_flags: self.run_flags,
            state: 0,
            handle: 0,
        }
    }

    /// Writes the combined DFA as a Graphviz digraph.
    pub fn write_dot(&self, out: &mut dyn core::fmt::Write) -> core::fmt::Result {
        self.table.write_dot(out)
    }
}

/// Iterator over the token stream of a haystack.
pub struct Tokens<'l, 'h, H: ?Sized> {
    lexer: &'l Lexer,
    haystack: &'h H,
    at: usize,
    done: bool,
}

impl<'l, 'h, H> Iterator for Tokens<'l, 'h, H>
where
    H: EncodedStr + ?Sized,
{
    type Item = Match;

    fn next(&mut self) -> Option<Match> {
        if self.done {
            return None;
        }
        match self.lexer.next(self.haystack, self.at) {
            Some(m) => {
                self.at = if m.is_empty() {
                    executor::step_one(self.haystack, m.end())
                } else {
                    m.end()
                };
                Some(m)
            }
            None => {
                self.done = true;
                None
            }
        }
    }
}

/// A push-style scanner: feed scalars one at a time and read off the
/// last accepted match id. For embedding the machine into drivers that
/// own the input loop.
#[derive(Debug, Clone)]
pub struct Scanner<'l> {
    table: &'l DfaTable,
    run_flags: RunFlags,
    state: u32,
    handle: u32,
}

impl Scanner<'_> {
    /// Feeds one scalar. Returns `true` while the machine remains in a
    /// live state and scanning should continue; `false` once it cannot
    /// make progress (or a non-greedy accept ends recognition).
    pub fn step(&mut self, cp: u32) -> bool {
        let sentinel = self.table.num_states();
        if self.state >= sentinel {
            return false;
        }
        let accept = self.table.accept(self.state);
        if accept > 0 {
            self.handle = accept;
            if self.run_flags.contains(RunFlags::NONGREEDY)
                || self.table.flags(self.state).contains(MatchFlags::NONGREEDY)
            {
                return false;
            }
        }
        self.state = self.table.lookup(self.state, cp);
        self.state < sentinel
    }

    /// The id of the last accepting state passed through, if any.
    pub fn token(&self) -> Option<u32> {
        (self.handle > 0).then_some(self.handle)
    }

    /// Whether the machine currently sits in an accepting state.
    pub fn accepts(&self) -> bool {
        self.state < self.table.num_states() && self.table.accept(self.state) > 0
    }

    /// Rewinds to the start state for the next token.
    pub fn reset(&mut self) {
        self.state = 0;
        self.handle = 0;
    }
}

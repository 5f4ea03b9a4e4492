//! A compiled single-pattern regular expression.
//!
//! A [`Regex`] owns its pattern AST (for diagnostics and regeneration of
//! the source form) and the packed transition table the executor runs
//! on. It is immutable after construction and holds no scan scratch, so
//! a shared reference can serve concurrent searches; capture output goes
//! into caller-owned [`Captures`] buffers (the `*_with` entry points) or
//! into per-call scratch allocated by the convenience wrappers.
//!
//! ```
//! use lextab::regex::Regex;
//!
//! let re = Regex::builder(r"[0-9]+").build()?;
//! assert!(re.is_match("abc 42"));
//! assert_eq!(re.find("abc 42 7").map(|m| m.range()), Some(4..6));
//! # Ok::<(), lextab::BuildError>(())
//! ```

use bon::bon;

use crate::captures::Captures;
use crate::dfa::minimize::minimize;
use crate::dfa::table::DfaTable;
use crate::dfa::Dfa;
use crate::encoding::EncodedStr;
use crate::error::BuildError;
use crate::executor;
use crate::flags::{CompileFlags, RunFlags};
use crate::matches::Match;
use crate::nfa::Nfa;
use crate::pattern::{Pattern, MAX_REFS};

/// A prepared regular expression backed by a minimized DFA table.
#[derive(Debug, Clone)]
pub struct Regex {
    ptn: Pattern,
    table: DfaTable,
    run_flags: RunFlags,
}

#[bon]
impl Regex {
    /// Compiles `pattern` into a table-driven matcher.
    ///
    /// ```
    /// use lextab::{regex::Regex, CompileFlags, RunFlags};
    ///
    /// let re = Regex::builder("send")
    ///     .compile_flags(CompileFlags::INSENSITIVE)
    ///     .run_flags(RunFlags::empty())
    ///     .build()?;
    /// assert!(re.is_match("SEND HELP"));
    /// # Ok::<(), lextab::BuildError>(())
    /// ```
    #[builder]
    pub fn new(
        #[builder(start_fn)] pattern: &str,
        /// Parse/compile-time modifiers.
        #[builder(default)]
        compile_flags: CompileFlags,
        /// Scan-time modifiers applied to every search.
        #[builder(default)]
        run_flags: RunFlags,
    ) -> Result<Regex, BuildError> {
        let mut ptn = Pattern::parse(pattern, compile_flags)?;
        ptn.set_accept(1);

        let mut nfa = Nfa::new();
        nfa.add_pattern(&ptn);
        let mut dfa = Dfa::from_nfa(&nfa);
        minimize(&mut dfa);
        let table = DfaTable::from_dfa(&dfa);

        Ok(Regex {
            ptn,
            table,
            run_flags,
        })
    }
}

impl Regex {
    /// Compiles `pattern` with default flags.
    pub fn compile(pattern: &str) -> Result<Regex, BuildError> {
        Regex::builder(pattern).build()
    }

    /// The packed transition table backing this regex.
    pub fn table(&self) -> &DfaTable {
        &self.table
    }

    /// The pattern AST.
    pub fn pattern(&self) -> &Pattern {
        &self.ptn
    }

    /// Regenerates a regex string equivalent to the compiled pattern.
    pub fn to_regex(&self) -> String {
        self.ptn.to_regex()
    }

    /// Whether a match exists anywhere in `haystack`.
    pub fn is_match<H>(&self, haystack: &H) -> bool
    where
        H: EncodedStr + ?Sized,
    {
        self.find(haystack).is_some()
    }

    /// Tries to match at exactly `at`, reporting the longest accepted
    /// extent from there.
    pub fn match_at<H>(&self, haystack: &H, at: usize) -> Option<Match>
    where
        H: EncodedStr + ?Sized,
    {
        self.match_at_with(haystack, at, &mut Captures::new())
    }

    /// Like [`match_at`](Regex::match_at), filling the caller's capture
    /// buffer.
    pub fn match_at_with<H>(&self, haystack: &H, at: usize, caps: &mut Captures) -> Option<Match>
    where
        H: EncodedStr + ?Sized,
    {
        executor::match_at(&self.table, self.run_flags, haystack, at, caps)
    }

    /// The first match in `haystack`.
    pub fn find<H>(&self, haystack: &H) -> Option<Match>
    where
        H: EncodedStr + ?Sized,
    {
        self.find_at(haystack, 0)
    }

    /// The first match at or after `at`.
    pub fn find_at<H>(&self, haystack: &H, at: usize) -> Option<Match>
    where
        H: EncodedStr + ?Sized,
    {
        self.find_at_with(haystack, at, &mut Captures::new())
    }

    /// Like [`find_at`](Regex::find_at), filling the caller's capture
    /// buffer.
    pub fn find_at_with<H>(&self, haystack: &H, at: usize, caps: &mut Captures) -> Option<Match>
    where
        H: EncodedStr + ?Sized,
    {
        executor::find_at(&self.table, self.run_flags, haystack, at, caps)
    }

    /// The first match together with its capture slots.
    pub fn captures<H>(&self, haystack: &H) -> Option<(Match, Captures)>
    where
        H: EncodedStr + ?Sized,
    {
        let mut caps = Captures::new();
        let m = self.find_at_with(haystack, 0, &mut caps)?;
        Some((m, caps))
    }

    /// Iterates over all non-overlapping matches.
    pub fn find_iter<'r, 'h, H>(&'r self, haystack: &'h H) -> FindIter<'r, 'h, H>
    where
        H: EncodedStr + ?Sized,
    {
        FindIter {
            re: self,
            haystack,
            at: 0,
            caps: Captures::new(),
            done: false,
        }
    }

    /// Splits `haystack` at every match, yielding the non-matching
    /// substrings. Empty segments between adjacent matches are skipped.
    ///
    /// ```
    /// use lextab::regex::Regex;
    ///
    /// let re = Regex::builder(r"\s*,\s*").build()?;
    /// let fields: Vec<&str> = re.split("a , b,c ,d").collect();
    /// assert_eq!(fields, ["a", "b", "c", "d"]);
    /// # Ok::<(), lextab::BuildError>(())
    /// ```
    pub fn split<'r, 'h>(&'r self, haystack: &'h str) -> Split<'r, 'h> {
        Split {
            re: self,
            haystack,
            at: 0,
            done: false,
        }
    }

    /// Replaces every match with the expansion of `template`:
    /// `$N` inserts capture `N` (`$0` is the whole match), `$$` a
    /// literal dollar, unknown `$x` sequences pass through, and
    /// references to untouched slots expand to nothing. Under the
    /// `NOREF` run flag the template is inserted verbatim.
    ///
    /// ```
    /// use lextab::regex::Regex;
    ///
    /// let re = Regex::builder(r"\<([a-z]+)=([0-9]+)").build()?;
    /// assert_eq!(re.replace("x=1 y=2", "$2:$1"), "1:x 2:y");
    /// # Ok::<(), lextab::BuildError>(())
    /// ```
    pub fn replace(&self, haystack: &str, template: &str) -> String {
        let mut out = String::new();
        let mut caps = Captures::new();
        let mut at = 0;
        while let Some(m) = self.find_at_with(haystack, at, &mut caps) {
            out.push_str(&haystack[at..m.start()]);
            if self.run_flags.contains(RunFlags::NOREF) {
                out.push_str(template);
            } else {
                expand_template(&mut out, template, haystack, &caps);
            }
            at = m.end();
            if m.is_empty() {
                // Carry the scalar the empty match sat on, and move on.
                let next = executor::step_one(haystack, at);
                out.push_str(&haystack[at..next]);
                at = next;
            }
            if at >= haystack.len() {
                break;
            }
        }
        out.push_str(&haystack[at..]);
        out
    }
}

/// Expands `$N`/`$$` template references from the capture slots.
fn expand_template(out: &mut String, template: &str, haystack: &str, caps: &Captures) {
    let mut rest = template;
    while let Some(dollar) = rest.find('$') {
        out.push_str(&rest[..dollar]);
        rest = &rest[dollar + 1..];
        let mut chars = rest.chars();
        match chars.next() {
            Some('$') => {
                out.push('$');
                rest = &rest[1..];
            }
            Some(c) if c.is_ascii_digit() => {
                let digits: usize = rest
                    .char_indices()
                    .take_while(|(_, c)| c.is_ascii_digit())
                    .map(|(i, c)| i + c.len_utf8())
                    .last()
                    .unwrap_or(0);
                let n: usize = rest[..digits].parse().unwrap_or(MAX_REFS);
                if n < MAX_REFS {
                    if let Some(span) = caps.get(n) {
                        out.push_str(&haystack[span.range()]);
                    }
                }
                rest = &rest[digits..];
            }
            Some(c) => {
                // Unrecognized sequence passes through unchanged.
                out.push('$');
                out.push(c);
                rest = &rest[c.len_utf8()..];
            }
            None => {
                out.push('$');
                break;
            }
        }
    }
    out.push_str(rest);
}

/// Iterator over all non-overlapping matches, resuming at each match
/// end and stepping over empty matches.
pub struct FindIter<'r, 'h, H: ?Sized> {
    re: &'r Regex,
    haystack: &'h H,
    at: usize,
    caps: Captures,
    done: bool,
}

impl<'r, 'h, H> Iterator for FindIter<'r, 'h, H>
where
    H: EncodedStr + ?Sized,
{
    type Item = Match;

    fn next(&mut self) -> Option<Match> {
        if self.done {
            return None;
        }
        match self
            .re
            .find_at_with(self.haystack, self.at, &mut self.caps)
        {
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

/// Iterator over the substrings between matches.
pub struct Split<'r, 'h> {
    re: &'r Regex,
    haystack: &'h str,
    at: usize,
    done: bool,
}

impl<'r, 'h> Iterator for Split<'r, 'h> {
    type Item = &'h str;

    fn next(&mut self) -> Option<&'h str> {
        let mut caps = Captures::new();
        while !self.done {
            match self.re.find_at_with(self.haystack, self.at, &mut caps) {
                Some(m) => {
                    let segment = &self.haystack[self.at..m.start()];
                    self.at = if m.is_empty() {
                        executor::step_one(self.haystack, m.end())
                    } else {
                        m.end()
                    };
                    if !segment.is_empty() {
                        return Some(segment);
                    }
                }
                None => {
                    self.done = true;
                    let tail = &self.haystack[self.at..];
                    if !tail.is_empty() {
                        return Some(tail);
                    }
                }
            }
        }
        None
    }
}

//! Recursive-descent parser for the regular-expression surface syntax.
//!
//! Grammar, one token of lookahead:
//!
//! ```text
//! alter     = sequence ( '|' sequence )*
//! sequence  = factor+
//! factor    = char ( '*' | '+' | '?' )? '?'?        -- trailing '?' = non-greedy
//! char      = '(' alter ')' | '.' | '[' '^'? body ']' | shorthand | single
//! ```
//!
//! `^` and `\<` are recognized only at the very start of the pattern,
//! `$` and `\>` only when they are the entire remaining input; they become
//! flags on the root node, not characters.

use crate::ccl::{self, Ccl};
use crate::error::{BuildError, BuildErrorKind};
use crate::flags::{CompileFlags, MatchFlags};
use crate::pattern::Pattern;

pub(crate) fn parse(pat: &str, flags: CompileFlags) -> Result<Pattern, BuildError> {
    if pat.is_empty() {
        return Err(BuildError::new(BuildErrorKind::EmptyPattern));
    }

    // A literal string constant bypasses the parser entirely.
    if flags.contains(CompileFlags::STATIC) {
        let mut ptn = Pattern::literal(pat, flags);
        if flags.contains(CompileFlags::NONGREEDY) {
            ptn.flags |= MatchFlags::NONGREEDY;
        }
        return Ok(ptn);
    }

    let mut parser = Parser {
        input: pat,
        pos: 0,
        flags,
        nongreedy: false,
    };

    let mut aflags = MatchFlags::empty();
    if !flags.contains(CompileFlags::NOANCHORS) {
        if parser.eat('^') {
            aflags |= MatchFlags::BOL;
        } else if parser.eat_str("\\<") {
            aflags |= MatchFlags::BOW;
        }
    }

    let mut ptn = parser.parse_alter()?;

    if !flags.contains(CompileFlags::NOANCHORS) {
        if parser.rest() == "$" {
            aflags |= MatchFlags::EOL;
        } else if parser.rest() == "\\>" {
            aflags |= MatchFlags::EOW;
        }
    }

    if flags.contains(CompileFlags::NONGREEDY) || parser.nongreedy {
        aflags |= MatchFlags::NONGREEDY;
    }

    ptn.flags |= aflags;
    Ok(ptn)
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    flags: CompileFlags,
    /// Set when a `*?`/`+?`/`??` suffix was seen anywhere; the table
    /// runtime supports non-greediness only pattern-wide.
    nongreedy: bool,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn eat(&mut self, ch: char) -> bool {
        if self.peek() == Some(ch) {
            self.pos += ch.len_utf8();
            true
        } else {
            false
        }
    }

    fn eat_str(&mut self, s: &str) -> bool {
        if self.rest().starts_with(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    fn noerrors(&self) -> bool {
        self.flags.contains(CompileFlags::NOERRORS)
    }

    fn parse_alter(&mut self) -> Result<Pattern, BuildError> {
        let mut ptn = self.parse_sequence()?;
        while self.eat('|') {
            let seq = self.parse_sequence()?;
            ptn = ptn.alt(seq);
        }
        Ok(ptn)
    }

    fn at_sequence_end(&self) -> bool {
        match self.peek() {
            None | Some('|') | Some(')') => true,
            _ => {
                !self.flags.contains(CompileFlags::NOANCHORS)
                    && (self.rest() == "$" || self.rest() == "\\>")
            }
        }
    }

    fn parse_sequence(&mut self) -> Result<Pattern, BuildError> {
        let mut ptn = self.parse_factor()?;
        while !self.at_sequence_end() {
            let next = self.parse_factor()?;
            ptn = ptn.then(next);
        }
        Ok(ptn)
    }

    fn parse_factor(&mut self) -> Result<Pattern, BuildError> {
        let mut ptn = self.parse_char()?;
        let closed = match self.peek() {
            Some('*') => {
                self.bump();
                ptn = ptn.kleene();
                true
            }
            Some('+') => {
                self.bump();
                ptn = ptn.plus();
                true
            }
            Some('?') => {
                self.bump();
                ptn = ptn.opt();
                true
            }
            _ => false,
        };
        if closed && self.eat('?') {
            self.nongreedy = true;
        }
        Ok(ptn)
    }

    fn parse_char(&mut self) -> Result<Pattern, BuildError> {
        match self.peek() {
            Some('(') => {
                let opened_at = self.pos;
                self.bump();
                let inner = self.parse_alter()?;
                if !self.eat(')') && !self.noerrors() {
                    return Err(BuildError::unbalanced_group(opened_at));
                }
                if self.flags.contains(CompileFlags::NOREF) {
                    Ok(Pattern::group(inner))
                } else {
                    Ok(Pattern::capture(inner))
                }
            }
            Some('.') => {
                self.bump();
                let mut ccl = Ccl::new();
                ccl.add_range(ccl.universe_min(), ccl.universe_max());
                Ok(Pattern::char_class(ccl))
            }
            Some('[') => {
                let opened_at = self.pos;
                if let Some(body_len) = self.class_body_len() {
                    self.bump();
                    let mut body = &self.input[self.pos..self.pos + body_len];
                    self.pos += body_len + 1;
                    let negate = body.starts_with('^');
                    if negate {
                        body = &body[1..];
                    }
                    let mut ccl = Ccl::new();
                    ccl.parse(body, false);
                    if negate {
                        ccl.negate();
                    }
                    if self.flags.contains(CompileFlags::INSENSITIVE) {
                        ccl.fold_case();
                    }
                    Ok(Pattern::char_class(ccl))
                } else if self.noerrors() {
                    // Keep the '[' as an ordinary character.
                    self.single_char()
                } else {
                    Err(BuildError::unterminated_class(opened_at))
                }
            }
            Some(_) => {
                let mut ccl = Ccl::new();
                if let Some(consumed) = ccl.parse_shorthand(self.rest()) {
                    self.pos += consumed;
                    if self.flags.contains(CompileFlags::INSENSITIVE) {
                        ccl.fold_case();
                    }
                    return Ok(Pattern::char_class(ccl));
                }
                self.single_char()
            }
            None => {
                // An empty arm like `a|` or a dangling operator.
                if self.noerrors() {
                    Ok(Pattern::group(Pattern::char_class(Ccl::new())))
                } else {
                    Err(BuildError::new(BuildErrorKind::EmptyPattern))
                }
            }
        }
    }

    /// Length of the class body between `[` and the next unescaped `]`,
    /// measured from just behind the opening bracket.
    fn class_body_len(&self) -> Option<usize> {
        debug_assert_eq!(self.peek(), Some('['));
        let body = &self.rest()[1..];
        let mut chars = body.char_indices();
        while let Some((i, ch)) = chars.next() {
            match ch {
                ']' => return Some(i),
                '\\' => {
                    chars.next();
                }
                _ => {}
            }
        }
        None
    }

    fn single_char(&mut self) -> Result<Pattern, BuildError> {
        let Some((cp, len)) = ccl::parse_char(self.rest(), true) else {
            return Err(BuildError::new(BuildErrorKind::EmptyPattern));
        };
        self.pos += len;
        let mut ccl = Ccl::new();
        ccl.add(cp);
        if self.flags.contains(CompileFlags::INSENSITIVE) {
            ccl.fold_case();
        }
        Ok(Pattern::char_class(ccl))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::PatternKind;

    fn roundtrip(pat: &str) -> String {
        Pattern::parse(pat, CompileFlags::empty())
            .unwrap()
            .to_regex()
    }

    #[test]
    fn literal_sequence() {
        let ptn = Pattern::parse("abc", CompileFlags::empty()).unwrap();
        assert!(matches!(ptn.kind, PatternKind::Char(_)));
        assert_eq!(ptn.to_regex(), "abc");
    }

    #[test]
    fn operators_and_groups() {
        assert_eq!(roundtrip("a(b|c)+d"), "a(b|c)+d");
        assert_eq!(roundtrip("x[0-9]*y?"), "x[0-9]*y?");
        assert_eq!(roundtrip("(ab)|(cd)"), "(ab)|(cd)");
    }

    #[test]
    fn to_regex_reparses_equivalent() {
        for pat in ["a(b|c)+d", "[^a-z]+", "a.c", r"\d+x", "a|b|c"] {
            let first = roundtrip(pat);
            let second = Pattern::parse(&first, CompileFlags::empty())
                .unwrap()
                .to_regex();
            assert_eq!(first, second, "pattern {pat:?}");
        }
    }

    #[test]
    fn anchors_become_flags() {
        let ptn = Pattern::parse("^ab$", CompileFlags::empty()).unwrap();
        assert_eq!(ptn.flags(), MatchFlags::BOL | MatchFlags::EOL);
        assert_eq!(ptn.to_regex(), "ab");

        let ptn = Pattern::parse(r"\<word\>", CompileFlags::empty()).unwrap();
        assert_eq!(ptn.flags(), MatchFlags::BOW | MatchFlags::EOW);

        let ptn = Pattern::parse("^a$", CompileFlags::NOANCHORS).unwrap();
        assert_eq!(ptn.flags(), MatchFlags::empty());
        assert_eq!(ptn.to_regex(), "\\^a\\$");
    }

    #[test]
    fn dollar_in_the_middle_is_literal() {
        let ptn = Pattern::parse("a$b", CompileFlags::empty()).unwrap();
        assert_eq!(ptn.flags(), MatchFlags::empty());
        assert_eq!(ptn.to_regex(), "a\\$b");
    }

    #[test]
    fn nongreedy_suffix_sets_flag() {
        let ptn = Pattern::parse("<.*?>", CompileFlags::empty()).unwrap();
        assert!(ptn.flags().contains(MatchFlags::NONGREEDY));
        let ptn = Pattern::parse("a+?", CompileFlags::empty()).unwrap();
        assert!(ptn.flags().contains(MatchFlags::NONGREEDY));
    }

    #[test]
    fn negated_class() {
        let ptn = Pattern::parse("[^0-9]", CompileFlags::empty()).unwrap();
        match &ptn.kind {
            PatternKind::Char(ccl) => {
                assert!(!ccl.test('5' as u32));
                assert!(ccl.test('x' as u32));
            }
            other => panic!("unexpected node {other:?}"),
        }
    }

    #[test]
    fn escaped_bracket_in_class() {
        let ptn = Pattern::parse(r"[a\]b]", CompileFlags::empty()).unwrap();
        match &ptn.kind {
            PatternKind::Char(ccl) => {
                assert!(ccl.test(']' as u32));
                assert!(ccl.test('a' as u32));
                assert!(ccl.test('b' as u32));
            }
            other => panic!("unexpected node {other:?}"),
        }
    }

    #[test]
    fn unbalanced_errors_and_recovery() {
        let err = Pattern::parse("(ab", CompileFlags::empty()).unwrap_err();
        assert_eq!(err.offset(), Some(0));
        let err = Pattern::parse("a[bc", CompileFlags::empty()).unwrap_err();
        assert_eq!(err.offset(), Some(1));

        // Best-effort recovery keeps parsing.
        let ptn = Pattern::parse("(ab", CompileFlags::NOERRORS).unwrap();
        assert_eq!(ptn.to_regex(), "(ab)");
        let ptn = Pattern::parse("a[bc", CompileFlags::NOERRORS).unwrap();
        assert_eq!(ptn.to_regex(), "a\\[bc");
    }

    #[test]
    fn static_literal() {
        let ptn = Pattern::parse("a+b", CompileFlags::STATIC).unwrap();
        assert_eq!(ptn.to_regex(), "a\\+b");
        assert!(Pattern::parse("", CompileFlags::STATIC).is_err());
    }

    #[test]
    fn noref_groups_do_not_capture() {
        let ptn = Pattern::parse("(a)", CompileFlags::NOREF).unwrap();
        assert!(matches!(ptn.kind, PatternKind::Sub(_)));
        let ptn = Pattern::parse("(a)", CompileFlags::empty()).unwrap();
        assert!(matches!(ptn.kind, PatternKind::RefSub(_)));
    }

    #[test]
    fn unknown_escape_is_literal() {
        let ptn = Pattern::parse(r"\q", CompileFlags::empty()).unwrap();
        match &ptn.kind {
            PatternKind::Char(ccl) => assert!(ccl.test('q' as u32)),
            other => panic!("unexpected node {other:?}"),
        }
    }
}

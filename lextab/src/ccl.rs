//! Character classes as canonical sets of codepoint ranges.
//!
//! A [`Ccl`] lives inside a configurable *universe* `[min, max]` and keeps
//! its ranges sorted, non-overlapping and non-adjacent at all times; every
//! public mutation restores that canonical form. Two classes are
//! *compatible* (and can be combined with the set operations) iff they
//! share the same universe.
//!
//! ```
//! use lextab::ccl::Ccl;
//!
//! let mut digits = Ccl::new();
//! digits.parse("0-9", false);
//! assert!(digits.test('7' as u32));
//! assert_eq!(digits.count(), 10);
//!
//! let mut not_digits = digits.clone();
//! not_digits.negate();
//! assert!(digits.intersect(&not_digits).is_none());
//! ```

use core::cmp::Ordering;
use core::fmt;

use itertools::Itertools;

/// Default lower bound of the class universe.
pub const UNIVERSE_MIN: u32 = 0;
/// Default upper bound of the class universe (the last Unicode scalar).
pub const UNIVERSE_MAX: u32 = char::MAX as u32;

/// A closed codepoint interval `[begin, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CclRange {
    pub begin: u32,
    pub end: u32,
}

/// A character class: an ordered set of disjoint codepoint ranges within
/// a universe `[min, max]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ccl {
    min: u32,
    max: u32,
    ranges: Vec<CclRange>,
}

impl Default for Ccl {
    fn default() -> Ccl {
        Ccl::new()
    }
}

impl Ccl {
    /// Creates an empty class over the default universe.
    pub fn new() -> Ccl {
        Ccl::with_universe(UNIVERSE_MIN, UNIVERSE_MAX)
    }

    /// Creates an empty class over `[min, max]`. Inverted bounds are
    /// swapped.
    pub fn with_universe(min: u32, max: u32) -> Ccl {
        let (min, max) = if min > max { (max, min) } else { (min, max) };
        Ccl {
            min,
            max,
            ranges: Vec::new(),
        }
    }

    /// Creates a class over the default universe from a class-definition
    /// string such as `"a-z0-9_"`.
    pub fn from_def(def: &str) -> Ccl {
        let mut ccl = Ccl::new();
        ccl.parse(def, false);
        ccl
    }

    /// Lower bound of the universe.
    pub fn universe_min(&self) -> u32 {
        self.min
    }

    /// Upper bound of the universe.
    pub fn universe_max(&self) -> u32 {
        self.max
    }

    /// Number of codepoints in the universe.
    fn universe_count(&self) -> u64 {
        (self.max - self.min) as u64 + 1
    }

    /// Whether `self` and `other` share the same universe.
    pub fn is_compatible(&self, other: &Ccl) -> bool {
        self.min == other.min && self.max == other.max
    }

    /// Number of ranges the class holds.
    pub fn size(&self) -> usize {
        self.ranges.len()
    }

    /// Total number of codepoints the class contains.
    pub fn count(&self) -> u64 {
        self.ranges
            .iter()
            .map(|r| (r.end - r.begin) as u64 + 1)
            .sum()
    }

    /// Whether the class contains no codepoint at all.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// The ranges in canonical order.
    pub fn ranges(&self) -> &[CclRange] {
        &self.ranges
    }

    /// Returns the `offset`th range.
    pub fn get(&self, offset: usize) -> Option<(u32, u32)> {
        self.ranges.get(offset).map(|r| (r.begin, r.end))
    }

    /// Returns the `offset`th codepoint, counting across ranges.
    pub fn get_char(&self, offset: usize) -> Option<u32> {
        let mut offset = offset as u64;
        for r in &self.ranges {
            let len = (r.end - r.begin) as u64 + 1;
            if offset < len {
                return Some(r.begin + offset as u32);
            }
            offset -= len;
        }
        None
    }

    /// Iterates over every codepoint in the class.
    pub fn codepoints(&self) -> impl Iterator<Item = u32> + '_ {
        self.ranges.iter().flat_map(|r| r.begin..=r.end)
    }

    /// Removes all ranges; the universe stays.
    pub fn clear(&mut self) {
        self.ranges.clear();
    }

    /// Restores the canonical form: sort by `begin`, then merge every
    /// overlapping or adjacent pair.
    fn normalize(&mut self) {
        if self.ranges.len() < 2 {
            return;
        }
        let mut ranges = core::mem::take(&mut self.ranges);
        ranges.sort_by_key(|r| (r.begin, r.end));
        self.ranges = ranges
            .into_iter()
            .coalesce(|l, r| {
                if (r.begin as u64) <= l.end as u64 + 1 {
                    Ok(CclRange {
                        begin: l.begin,
                        end: l.end.max(r.end),
                    })
                } else {
                    Err((l, r))
                }
            })
            .collect();
    }

    /// Inserts a range without normalizing; the internal building block
    /// used by the batch operations.
    fn add_range_raw(&mut self, begin: u32, end: u32) {
        let (mut begin, mut end) = if begin > end { (end, begin) } else { (begin, end) };
        if begin > self.max || end < self.min {
            return;
        }
        begin = begin.max(self.min);
        end = end.min(self.max);
        if self.test_range(begin, end) {
            return;
        }
        self.ranges.push(CclRange { begin, end });
    }

    /// Integrates `[begin, end] ∩ universe` into the class. Swapped
    /// endpoints are reordered; adding an already-covered range is a
    /// no-op.
    pub fn add_range(&mut self, begin: u32, end: u32) {
        self.add_range_raw(begin, end);
        self.normalize();
    }

    /// Integrates a single codepoint.
    pub fn add(&mut self, ch: u32) {
        self.add_range(ch, ch);
    }

    /// Removes `[begin, end]` from the class, splitting ranges as needed.
    pub fn del_range(&mut self, begin: u32, end: u32) {
        let (begin, end) = if begin > end { (end, begin) } else { (begin, end) };
        let mut kept: Vec<CclRange> = Vec::with_capacity(self.ranges.len());
        for r in self.ranges.drain(..) {
            if end < r.begin || begin > r.end {
                kept.push(r);
                continue;
            }
            if r.begin < begin {
                kept.push(CclRange {
                    begin: r.begin,
                    end: begin - 1,
                });
            }
            if r.end > end {
                kept.push(CclRange {
                    begin: end + 1,
                    end: r.end,
                });
            }
        }
        self.ranges = kept;
        self.normalize();
    }

    /// Removes a single codepoint.
    pub fn del(&mut self, ch: u32) {
        self.del_range(ch, ch);
    }

    /// Replaces the class with its complement within the universe.
    pub fn negate(&mut self) {
        let mut negated: Vec<CclRange> = Vec::with_capacity(self.ranges.len() + 1);
        let mut cursor = self.min as u64;
        for r in &self.ranges {
            if cursor < r.begin as u64 {
                negated.push(CclRange {
                    begin: cursor as u32,
                    end: r.begin - 1,
                });
            }
            cursor = r.end as u64 + 1;
        }
        if cursor <= self.max as u64 {
            negated.push(CclRange {
                begin: cursor as u32,
                end: self.max,
            });
        }
        self.ranges = negated;
    }

    /// Returns the union of two compatible classes, or `None` when the
    /// universes differ.
    pub fn union(&self, other: &Ccl) -> Option<Ccl> {
        if !self.is_compatible(other) {
            return None;
        }
        let mut un = self.clone();
        for r in &other.ranges {
            un.add_range_raw(r.begin, r.end);
        }
        un.normalize();
        Some(un)
    }

    /// Returns `self` without the codepoints of `other`, or `None` when
    /// the universes differ. The result may be empty.
    pub fn diff(&self, other: &Ccl) -> Option<Ccl> {
        if !self.is_compatible(other) {
            return None;
        }
        let mut diff = self.clone();
        for r in &other.ranges {
            diff.del_range(r.begin, r.end);
        }
        Some(diff)
    }

    /// Returns the codepoints shared by both classes. `None` when the
    /// universes differ *or when the intersection is empty* — the shape
    /// the subset constructor consumes.
    pub fn intersect(&self, other: &Ccl) -> Option<Ccl> {
        if !self.is_compatible(other) {
            return None;
        }
        let mut within = Ccl::with_universe(self.min, self.max);
        for r in &self.ranges {
            for s in &other.ranges {
                if s.begin <= r.end && s.end >= r.begin {
                    within.add_range_raw(r.begin.max(s.begin), r.end.min(s.end));
                }
            }
        }
        if within.is_empty() {
            return None;
        }
        within.normalize();
        Some(within)
    }

    /// Whether the whole range `[begin, end]` is inside the class.
    pub fn test_range(&self, begin: u32, end: u32) -> bool {
        self.ranges
            .iter()
            .any(|r| begin >= r.begin && end <= r.end)
    }

    /// Whether the class contains `ch`.
    pub fn test(&self, ch: u32) -> bool {
        self.test_range(ch, ch)
    }

    /// Membership test that also tries the opposite-case codepoint.
    pub fn test_insensitive(&self, ch: u32) -> bool {
        if self.test(ch) {
            return true;
        }
        match opposite_case(ch, self.max < 0x100) {
            Some(folded) => self.test(folded),
            None => false,
        }
    }

    /// Total order used for deduplication and canonical sorting: by
    /// universe, then by range count, then range-wise. `Equal` iff the
    /// classes are equal as codepoint sets.
    pub fn compare(&self, other: &Ccl) -> Ordering {
        (self.min, self.max)
            .cmp(&(other.min, other.max))
            .then_with(|| self.ranges.len().cmp(&other.ranges.len()))
            .then_with(|| self.ranges.cmp(&other.ranges))
    }

    /// For every codepoint in the class, also adds its opposite-case
    /// codepoint. Byte universes fold ASCII only; otherwise the
    /// single-char Unicode case mapping is used.
    pub fn fold_case(&mut self) {
        let ascii_only = self.max < 0x100;
        let folded: Vec<u32> = self
            .codepoints()
            .filter_map(|cp| opposite_case(cp, ascii_only))
            .collect();
        for cp in folded {
            self.add_range_raw(cp, cp);
        }
        self.normalize();
    }

    /// Parses a class-definition string such as `"$A-Z#0-9"` into the
    /// class, interpreting escape sequences and the `\d \D \w \W \s \S`
    /// shorthands. With `extend` set the definition extends the current
    /// content instead of replacing it.
    pub fn parse(&mut self, def: &str, extend: bool) {
        if !extend {
            self.clear();
        }
        let mut rest = def;
        while !rest.is_empty() {
            if let Some(consumed) = self.parse_shorthand(rest) {
                rest = &rest[consumed..];
                continue;
            }
            let Some((begin, len)) = parse_char(rest, true) else {
                break;
            };
            rest = &rest[len..];
            let mut end = begin;
            // A trailing dash with nothing behind it stays a literal
            // member and is picked up by the next round.
            if let Some(after_dash) = rest.strip_prefix('-') {
                if let Some((e, len)) = parse_char(after_dash, true) {
                    end = e;
                    rest = &after_dash[len..];
                }
            }
            self.add_range_raw(begin, end);
        }
        self.normalize();
    }

    /// Tries to consume one of the shorthands `\d \D \w \W \s \S` from
    /// the start of `input`, adding the (possibly negated) class.
    /// Returns the number of bytes consumed, or `None` if `input` does
    /// not start with a shorthand.
    pub fn parse_shorthand(&mut self, input: &str) -> Option<usize> {
        let mut chars = input.chars();
        if chars.next() != Some('\\') {
            return None;
        }
        let (def, negate) = match chars.next()? {
            'd' => ("0-9", false),
            'D' => ("0-9", true),
            'w' => ("a-zA-Z_0-9", false),
            'W' => ("a-zA-Z_0-9", true),
            's' => (" \x0c\n\r\t\x0b", false),
            'S' => (" \x0c\n\r\t\x0b", true),
            _ => return None,
        };
        let mut sh = Ccl::with_universe(self.min, self.max);
        sh.parse(def, false);
        if negate {
            sh.negate();
        }
        for r in sh.ranges {
            self.add_range_raw(r.begin, r.end);
        }
        self.normalize();
        Some(2)
    }

    /// Serializes the class back into a definition string accepted by
    /// [`Ccl::parse`]. With `escape` set, non-ASCII codepoints are
    /// rendered as hex escapes; otherwise they are emitted verbatim.
    pub fn to_str(&self, escape: bool) -> String {
        let mut out = String::new();
        for r in &self.ranges {
            escape_codepoint(&mut out, r.begin, escape);
            if r.begin != r.end {
                out.push('-');
                escape_codepoint(&mut out, r.end, escape);
            }
        }
        out
    }
}

impl PartialOrd for Ccl {
    fn partial_cmp(&self, other: &Ccl) -> Option<Ordering> {
        Some(self.compare(other))
    }
}

impl Ord for Ccl {
    fn cmp(&self, other: &Ccl) -> Ordering {
        self.compare(other)
    }
}

impl fmt::Display for Ccl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_str(true))
    }
}

/// The opposite-case codepoint of `cp`, if it has one.
fn opposite_case(cp: u32, ascii_only: bool) -> Option<u32> {
    if ascii_only {
        let b = u8::try_from(cp).ok()?;
        return match b {
            b'a'..=b'z' | b'A'..=b'Z' => Some((b ^ 0x20) as u32),
            _ => None,
        };
    }
    let ch = char::from_u32(cp)?;
    let folded = if ch.is_uppercase() {
        let mut lower = ch.to_lowercase();
        match (lower.next(), lower.next()) {
            (Some(l), None) => l,
            _ => return None,
        }
    } else {
        let mut upper = ch.to_uppercase();
        match (upper.next(), upper.next()) {
            (Some(u), None) => u,
            _ => return None,
        }
    };
    (folded != ch).then_some(folded as u32)
}

/// Reads one character from the start of `input`, interpreting escape
/// sequences when `escapes` is set, and returns the codepoint together
/// with the number of bytes consumed. Unknown escapes yield the escaped
/// character itself.
pub(crate) fn parse_char(input: &str, escapes: bool) -> Option<(u32, usize)> {
    let mut chars = input.char_indices();
    let (_, first) = chars.next()?;
    if !(escapes && first == '\\') {
        return Some((first as u32, first.len_utf8()));
    }
    let Some((_, esc)) = chars.next() else {
        // A trailing backslash stands for itself.
        return Some(('\\' as u32, 1));
    };
    let consumed = 1 + esc.len_utf8();
    let simple = match esc {
        'n' => Some('\n' as u32),
        't' => Some('\t' as u32),
        'r' => Some('\r' as u32),
        'b' => Some(0x08),
        'f' => Some(0x0c),
        'v' => Some(0x0b),
        'a' => Some(0x07),
        _ => None,
    };
    if let Some(cp) = simple {
        return Some((cp, consumed));
    }
    match esc {
        '0'..='7' => {
            let digits = take_digits(&input[1..], 3, 8);
            let value = u32::from_str_radix(digits, 8).unwrap_or(0);
            Some((value, 1 + digits.len()))
        }
        'x' => hex_escape(input, consumed, 2),
        'u' => hex_escape(input, consumed, 4),
        'U' => hex_escape(input, consumed, 8),
        _ => Some((esc as u32, consumed)),
    }
}

/// Reads up to `max` hex digits behind an `\x`/`\u`/`\U` introducer at
/// `prefix_len` bytes into `input`. With no digits at all, the
/// introducer letter is taken literally.
fn hex_escape(input: &str, prefix_len: usize, max: usize) -> Option<(u32, usize)> {
    let digits = take_digits(&input[prefix_len..], max, 16);
    if digits.is_empty() {
        let letter = input[prefix_len - 1..].chars().next()?;
        return Some((letter as u32, prefix_len));
    }
    let value = u32::from_str_radix(digits, 16).unwrap_or(0);
    Some((value, prefix_len + digits.len()))
}

fn take_digits(input: &str, max: usize, radix: u32) -> &str {
    let end = input
        .char_indices()
        .take(max)
        .take_while(|(_, c)| c.is_digit(radix))
        .last()
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    &input[..end]
}

fn escape_codepoint(out: &mut String, cp: u32, escape: bool) {
    match cp {
        0 => out.push_str("\\0"),
        0x07 => out.push_str("\\a"),
        0x08 => out.push_str("\\b"),
        0x09 => out.push_str("\\t"),
        0x0a => out.push_str("\\n"),
        0x0b => out.push_str("\\v"),
        0x0c => out.push_str("\\f"),
        0x0d => out.push_str("\\r"),
        _ if cp < 0x20 || cp == 0x7f => {
            out.push_str(&format!("\\x{cp:02x}"));
        }
        _ if cp == '\\' as u32 || cp == '-' as u32 || cp == ']' as u32 => {
            out.push('\\');
            out.push(cp as u8 as char);
        }
        _ if cp <= 0x7e => out.push(cp as u8 as char),
        _ if !escape => match char::from_u32(cp) {
            Some(c) => out.push(c),
            None => out.push_str(&format!("\\U{cp:08x}")),
        },
        _ if cp <= 0xff => out.push_str(&format!("\\x{cp:02x}")),
        _ if cp <= 0xffff => out.push_str(&format!("\\u{cp:04x}")),
        _ => out.push_str(&format!("\\U{cp:08x}")),
    }
}

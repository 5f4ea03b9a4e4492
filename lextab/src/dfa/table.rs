//! The packed transition table, the sole artifact the executor reads.
//!
//! A DFA with `S` states serializes into `S` integer rows:
//!
//! ```text
//! row[0]  total length of the row
//! row[1]  accept id (0 = non-accepting)
//! row[2]  match flags (BOL/EOL/BOW/EOW/NONGREEDY)
//! row[3]  ref mask (bit i set = state bounds capture group i)
//! row[4]  default-target state, or S when there is none
//! row[5…] triples (from, to, target), disjoint, sorted by `from`
//! ```
//!
//! A target equal to `S` means "no transition"; the executor treats it
//! as the end of the match.

use core::fmt;

use crate::dfa::Dfa;
use crate::error::{BuildError, BuildErrorKind};
use crate::flags::MatchFlags;

/// A compiled, immutable transition table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DfaTable {
    rows: Vec<Vec<u32>>,
}

impl DfaTable {
    pub(crate) fn from_dfa(dfa: &Dfa) -> DfaTable {
        let num_states = dfa.states.len() as u32;
        let mut rows = Vec::with_capacity(dfa.states.len());
        for st in &dfa.states {
            let mut triples: Vec<(u32, u32, u32)> = Vec::new();
            for (i, tr) in st.trans.iter().enumerate() {
                if st.def_trans == Some(i) {
                    continue;
                }
                for &range in tr.ccl.ranges() {
                    triples.push((range.begin, range.end, tr.to as u32));
                }
            }
            triples.sort_by_key(|&(from, _, _)| from);

            let mut row = Vec::with_capacity(5 + triples.len() * 3);
            row.push(5 + triples.len() as u32 * 3);
            row.push(st.accept);
            row.push(st.flags.bits());
            row.push(st.refs);
            row.push(match st.def_trans {
                Some(i) => st.trans[i].to as u32,
                None => num_states,
            });
            for (from, to, target) in triples {
                row.push(from);
                row.push(to);
                row.push(target);
            }
            rows.push(row);
        }
        DfaTable { rows }
    }

    /// Loads a pre-compiled table from raw rows, validating the packed
    /// layout: the length column, triple alignment, ordered disjoint
    /// intervals and in-range targets. The table is the toolkit's sole
    /// persisted artifact, so machines compiled elsewhere can be
    /// re-animated this way (see [`Lexer::from_table`]).
    ///
    /// [`Lexer::from_table`]: crate::lexer::Lexer::from_table
    pub fn from_rows(rows: Vec<Vec<u32>>) -> Result<DfaTable, BuildError> {
        let invalid = |state, reason| {
            Err(BuildError::new(BuildErrorKind::InvalidTable {
                state,
                reason,
            }))
        };
        let num_states = rows.len() as u32;
        for (state, row) in rows.iter().enumerate() {
            if row.len() < 5 {
                return invalid(state, "row shorter than its five header columns");
            }
            if row[0] as usize != row.len() {
                return invalid(state, "length column disagrees with the row length");
            }
            if (row.len() - 5) % 3 != 0 {
                return invalid(state, "transition columns are not triples");
            }
            if row[4] > num_states {
                return invalid(state, "default target out of range");
            }
            let mut prev_to: Option<u32> = None;
            for t in row[5..].chunks_exact(3) {
                if t[0] > t[1] {
                    return invalid(state, "interval with from > to");
                }
                if prev_to.is_some_and(|p| t[0] <= p) {
                    return invalid(state, "intervals unsorted or overlapping");
                }
                if t[2] > num_states {
                    return invalid(state, "transition target out of range");
                }
                prev_to = Some(t[1]);
            }
        }
        Ok(DfaTable { rows })
    }

    /// The raw rows, in the persisted layout.
    pub fn rows(&self) -> &[Vec<u32>] {
        &self.rows
    }

    /// Number of states; also the "no transition" sentinel target.
    pub fn num_states(&self) -> u32 {
        self.rows.len() as u32
    }

    /// The raw row of `state`.
    pub fn row(&self, state: u32) -> &[u32] {
        &self.rows[state as usize]
    }

    /// Accept id of `state` (0 = non-accepting).
    pub fn accept(&self, state: u32) -> u32 {
        self.rows[state as usize][1]
    }

    /// Match flags recorded on `state`.
    pub fn flags(&self, state: u32) -> MatchFlags {
        MatchFlags::from_bits_truncate(self.rows[state as usize][2])
    }

    /// Capture-group mask of `state`.
    pub fn refs(&self, state: u32) -> u32 {
        self.rows[state as usize][3]
    }

    /// The `(from, to, target)` triples of `state`.
    pub fn triples(&self, state: u32) -> impl Iterator<Item = (u32, u32, u32)> + '_ {
        self.rows[state as usize][5..]
            .chunks_exact(3)
            .map(|t| (t[0], t[1], t[2]))
    }

    /// Looks up the successor of `state` on codepoint `cp`: the first
    /// triple interval containing `cp`, else the default, which is the
    /// sentinel [`num_states`](DfaTable::num_states) when absent.
    pub fn lookup(&self, state: u32, cp: u32) -> u32 {
        let row = &self.rows[state as usize];
        for t in row[5..].chunks_exact(3) {
            if t[0] <= cp && cp <= t[1] {
                return t[2];
            }
        }
        row[4]
    }

    /// Whether `state` can consume `cp` at all — the dead-position
    /// pre-check used by find loops.
    pub fn can_step(&self, state: u32, cp: u32) -> bool {
        self.lookup(state, cp) < self.num_states()
    }

    /// Writes the machine as a Graphviz digraph. Accepting states are
    /// double-circled, the default transition is drawn bold.
    pub fn write_dot(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        writeln!(out, "digraph {{")?;
        writeln!(out, "  rankdir=LR;")?;
        writeln!(out, "  node [shape = circle];")?;
        for state in 0..self.num_states() {
            write!(out, "  n{state} [")?;
            if self.accept(state) > 0 {
                write!(out, "shape=doublecircle,")?;
            }
            write!(
                out,
                "label = \" n{state}\\nmatch_flags = {}\\nref_flags = {}\\n",
                self.flags(state).bits(),
                self.refs(state)
            )?;
            if self.accept(state) > 0 {
                write!(out, "id = {}\\n", self.accept(state))?;
            }
            writeln!(out, "\"];")?;

            let def = self.row(state)[4];
            if def != self.num_states() {
                writeln!(out, "  n{state} -> n{def} [style=bold];")?;
            }
            for (from, to, target) in self.triples(state) {
                write!(out, "  n{state} -> n{target} [label = <")?;
                write_edge(out, from, to)?;
                writeln!(out, ">];")?;
            }
        }
        writeln!(out, "}}")
    }
}

fn write_edge(out: &mut dyn fmt::Write, from: u32, to: u32) -> fmt::Result {
    let printable = |cp: u32| char::from_u32(cp).is_some_and(|c| !c.is_control());
    if printable(from) {
        write!(out, "&#x{from:x};")?;
    } else {
        write!(out, "0x{from:x}")?;
    }
    if to != from {
        if printable(to) {
            write!(out, " - &#x{to:x};")?;
        } else {
            write!(out, " - 0x{to:x}")?;
        }
    }
    Ok(())
}

impl fmt::Display for DfaTable {
    /// The interpretation dump of the table, one line per state:
    ///
    /// ```text
    /// 00: col= 8 acc= 0 flg= 0 ref= 0 def= 3 tra=064(@);064(@):02
    /// ```
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, row) in self.rows.iter().enumerate() {
            write!(
                f,
                "{i:02}: col={:2} acc={:2} flg={:2} ref={:2} def={:2}",
                row[0], row[1], row[2], row[3], row[4]
            )?;
            for t in row[5..].chunks_exact(3) {
                let pr = |cp: u32| match char::from_u32(cp) {
                    Some(c) if !c.is_control() && !c.is_whitespace() => format!("({c})"),
                    _ => String::new(),
                };
                write!(
                    f,
                    " tra={:03}{};{:03}{}:{:02}",
                    t[0],
                    pr(t[0]),
                    t[1],
                    pr(t[1]),
                    t[2]
                )?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

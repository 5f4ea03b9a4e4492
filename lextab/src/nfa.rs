//! Thompson-style ε-NFAs built from pattern ASTs.
//!
//! States live in an arena indexed by [`StateId`] with a recycling free
//! list, so the automaton is a plain value with no ownership cycles. A
//! labeled state has exactly one outgoing edge (`next`); an ε-state has
//! up to two (`next` and `next2`). The designated start is state 0, and
//! additional patterns hang off a `next2` spine of ε-states, one branch
//! per pattern.

use std::collections::BTreeSet;

use crate::ccl::Ccl;
use crate::flags::MatchFlags;
use crate::pattern::{Pattern, PatternKind, MAX_REFS};

/// Index of a state within its automaton.
pub type StateId = usize;

#[derive(Debug, Clone, Default)]
pub(crate) struct NfaState {
    /// The labeling class of the outgoing edge; `None` makes this an
    /// ε-state.
    pub(crate) ccl: Option<Ccl>,
    pub(crate) next: Option<StateId>,
    pub(crate) next2: Option<StateId>,
    pub(crate) accept: u32,
    pub(crate) flags: MatchFlags,
    /// Bitmask over capture-group indices this state bounds.
    pub(crate) refs: u32,
}

/// A nondeterministic finite automaton over character classes.
#[derive(Debug, Clone, Default)]
pub(crate) struct Nfa {
    states: Vec<NfaState>,
    free: Vec<StateId>,
}

impl Nfa {
    pub(crate) fn new() -> Nfa {
        Nfa::default()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub(crate) fn state(&self, id: StateId) -> &NfaState {
        &self.states[id]
    }

    fn alloc(&mut self) -> StateId {
        match self.free.pop() {
            Some(id) => {
                self.states[id] = NfaState::default();
                id
            }
            None => {
                self.states.push(NfaState::default());
                self.states.len() - 1
            }
        }
    }

    /// Compiles `ptn` into this machine, appending it behind the already
    /// present patterns via the `next2` spine. The pattern's accept id
    /// and flags land on its accepting state.
    pub(crate) fn add_pattern(&mut self, ptn: &Pattern) {
        // The last ε-state of the start spine, if any.
        let mut spine_tail = None;
        if !self.states.is_empty() {
            let mut tail = 0;
            while let Some(next) = self.states[tail].next2 {
                tail = next;
            }
            spine_tail = Some(tail);
        }

        let first = self.alloc();
        let mut ref_count = 0;
        let (start, end) = self.build_chain(ptn, &mut ref_count);

        self.states[first].next = Some(start);
        if let Some(tail) = spine_tail {
            self.states[tail].next2 = Some(first);
        }

        self.states[end].accept = ptn.accept;
        self.states[end].flags = ptn.flags;
    }

    /// Builds a `next`-linked chain of nodes, fusing each element's end
    /// into the following element's start when the end carries no capture
    /// refs; the fused-away state id is recycled.
    fn build_chain(&mut self, ptn: &Pattern, ref_count: &mut usize) -> (StateId, StateId) {
        let mut node = Some(ptn);
        let mut chain: Option<(StateId, StateId)> = None;
        while let Some(cur) = node {
            let (n_start, n_end) = self.build_node(cur, ref_count);
            chain = Some(match chain {
                None => (n_start, n_end),
                Some((start, end)) => {
                    if self.states[end].refs == 0 {
                        self.states[end] = self.states[n_start].clone();
                        self.free.push(n_start);
                    } else {
                        self.states[end].next = Some(n_start);
                    }
                    (start, n_end)
                }
            });
            node = cur.next.as_deref();
        }
        chain.expect("a pattern chain has at least one node")
    }

    fn build_node(&mut self, ptn: &Pattern, ref_count: &mut usize) -> (StateId, StateId) {
        match &ptn.kind {
            PatternKind::Char(ccl) => {
                let start = self.alloc();
                let end = self.alloc();
                self.states[start].ccl = Some(ccl.clone());
                self.states[start].next = Some(end);
                (start, end)
            }
            PatternKind::RefSub(inner) => {
                *ref_count += 1;
                // Past the last slot the group degrades to non-capturing.
                let ref_idx = if *ref_count < MAX_REFS { *ref_count } else { 0 };
                let (start, end) = self.build_chain(inner, ref_count);
                if ref_idx > 0 {
                    self.states[start].refs |= 1 << ref_idx;
                    self.states[end].refs |= 1 << ref_idx;
                }
                (start, end)
            }
            PatternKind::Sub(inner) => self.build_chain(inner, ref_count),
            PatternKind::Alt(left, right) => {
                let start = self.alloc();
                let end = self.alloc();
                let (l_start, l_end) = self.build_chain(left, ref_count);
                self.states[start].next = Some(l_start);
                self.states[l_end].next = Some(end);
                let (r_start, r_end) = self.build_chain(right, ref_count);
                self.states[start].next2 = Some(r_start);
                self.states[r_end].next = Some(end);
                (start, end)
            }
            PatternKind::Kle(inner) | PatternKind::Pos(inner) | PatternKind::Opt(inner) => {
                let start = self.alloc();
                let end = self.alloc();
                let (m_start, m_end) = self.build_chain(inner, ref_count);
                self.states[start].next = Some(m_start);
                self.states[m_end].next = Some(end);
                match ptn.kind {
                    PatternKind::Kle(_) => {
                        self.states[start].next2 = Some(end);
                        self.states[m_end].next2 = Some(m_start);
                    }
                    PatternKind::Pos(_) => {
                        self.states[m_end].next2 = Some(m_start);
                    }
                    PatternKind::Opt(_) => {
                        self.states[start].next2 = Some(end);
                    }
                    _ => unreachable!(),
                }
                (start, end)
            }
        }
    }

    /// Extends `closure` to its ε-closure and returns the best accept
    /// information found within it: the lowest positive accept id (the
    /// earliest-defined pattern wins) with its flags.
    pub(crate) fn epsilon_closure(&self, closure: &mut BTreeSet<StateId>) -> (u32, MatchFlags) {
        let mut stack: Vec<StateId> = closure.iter().copied().collect();
        let mut accept = 0;
        let mut flags = MatchFlags::empty();
        while let Some(top) = stack.pop() {
            let st = &self.states[top];
            if st.accept > 0 && (accept == 0 || st.accept < accept) {
                accept = st.accept;
                flags = st.flags;
            }
            if st.ccl.is_none() {
                for next in [st.next, st.next2].into_iter().flatten() {
                    if closure.insert(next) {
                        stack.push(next);
                    }
                }
            } else {
                // A labeled state has exactly one outgoing edge.
                debug_assert!(st.next2.is_none());
            }
        }
        (accept, flags)
    }

    /// The set of states reachable from `set` over a labeled edge whose
    /// class contains the whole range `[from, to]`.
    pub(crate) fn move_set(
        &self,
        set: &BTreeSet<StateId>,
        from: u32,
        to: u32,
    ) -> BTreeSet<StateId> {
        let mut hits = BTreeSet::new();
        for &id in set {
            let st = &self.states[id];
            if let Some(ccl) = &st.ccl {
                if ccl.test_range(from, to) {
                    hits.insert(st.next.expect("labeled states have a target"));
                }
            }
        }
        hits
    }

    /// OR of the ref masks over a state set.
    pub(crate) fn collect_refs(&self, set: &BTreeSet<StateId>) -> u32 {
        set.iter().fold(0, |refs, &id| refs | self.states[id].refs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::CompileFlags;

    fn compile(pat: &str) -> Nfa {
        let mut ptn = Pattern::parse(pat, CompileFlags::empty()).unwrap();
        ptn.set_accept(1);
        let mut nfa = Nfa::new();
        nfa.add_pattern(&ptn);
        nfa
    }

    fn start_closure(nfa: &Nfa) -> BTreeSet<StateId> {
        let mut set = BTreeSet::from([0]);
        nfa.epsilon_closure(&mut set);
        set
    }

    #[test]
    fn char_machine_accepts_after_one_move() {
        let nfa = compile("a");
        let set = start_closure(&nfa);
        let mut moved = nfa.move_set(&set, 'a' as u32, 'a' as u32);
        let (accept, _) = nfa.epsilon_closure(&mut moved);
        assert_eq!(accept, 1);
        assert!(nfa.move_set(&set, 'b' as u32, 'b' as u32).is_empty());
    }

    #[test]
    fn kleene_closure_loops() {
        let nfa = compile("a*");
        let set = start_closure(&nfa);
        // Nullable: the start closure already accepts.
        let mut probe = set.clone();
        let (accept, _) = nfa.epsilon_closure(&mut probe);
        assert_eq!(accept, 1);
        // And looping keeps accepting.
        let mut moved = nfa.move_set(&set, 'a' as u32, 'a' as u32);
        let (accept, _) = nfa.epsilon_closure(&mut moved);
        assert_eq!(accept, 1);
        assert!(!nfa.move_set(&moved, 'a' as u32, 'a' as u32).is_empty());
    }

    #[test]
    fn lowest_accept_wins_in_closure() {
        let mut first = Pattern::parse("a", CompileFlags::empty()).unwrap();
        first.set_accept(2);
        let mut second = Pattern::parse("a", CompileFlags::empty()).unwrap();
        second.set_accept(1);
        let mut nfa = Nfa::new();
        nfa.add_pattern(&first);
        nfa.add_pattern(&second);

        let set = start_closure(&nfa);
        let mut moved = nfa.move_set(&set, 'a' as u32, 'a' as u32);
        let (accept, _) = nfa.epsilon_closure(&mut moved);
        assert_eq!(accept, 1);
    }

    #[test]
    fn capture_marks_bound_the_group() {
        let nfa = compile("a(b)c");
        let set = start_closure(&nfa);
        assert_eq!(nfa.collect_refs(&set), 0);
        let mut after_a = nfa.move_set(&set, 'a' as u32, 'a' as u32);
        nfa.epsilon_closure(&mut after_a);
        assert_eq!(nfa.collect_refs(&after_a), 1 << 1);
        let mut after_b = nfa.move_set(&after_a, 'b' as u32, 'b' as u32);
        nfa.epsilon_closure(&mut after_b);
        assert_eq!(nfa.collect_refs(&after_b), 1 << 1);
        let mut after_c = nfa.move_set(&after_b, 'c' as u32, 'c' as u32);
        let (accept, _) = nfa.epsilon_closure(&mut after_c);
        assert_eq!(accept, 1);
        assert_eq!(nfa.collect_refs(&after_c), 0);
    }

    #[test]
    fn excess_groups_degrade_to_noncapturing() {
        let pat = "(a)".repeat(40);
        let nfa = compile(&pat);
        let mut refs = 0;
        let mut set = start_closure(&nfa);
        for _ in 0..40 {
            set = nfa.move_set(&set, 'a' as u32, 'a' as u32);
            nfa.epsilon_closure(&mut set);
            refs |= nfa.collect_refs(&set);
        }
        // Slots 1..=31 were assigned, later groups dropped silently.
        assert_eq!(refs, !0u32 & !1);
    }

    #[test]
    fn sequence_fusion_recycles_states() {
        // Five chained characters fuse four intermediate pairs.
        let plain = compile("abcde");
        let grouped = compile("a(b)(c)(d)e");
        assert!(plain.states.len() < grouped.states.len());
    }

    #[test]
    fn anchor_flags_reach_the_accept_state() {
        let mut ptn = Pattern::parse("^a$", CompileFlags::empty()).unwrap();
        ptn.set_accept(3);
        let mut nfa = Nfa::new();
        nfa.add_pattern(&ptn);
        let set = start_closure(&nfa);
        let mut moved = nfa.move_set(&set, 'a' as u32, 'a' as u32);
        let (accept, flags) = nfa.epsilon_closure(&mut moved);
        assert_eq!(accept, 3);
        assert_eq!(flags, MatchFlags::BOL | MatchFlags::EOL);
    }
}

//! DFA minimization by partition refinement.
//!
//! States are first grouped by accept id (all non-accepting states
//! together), so distinct match ids never merge. Each pass compares
//! every group member against the group's first state: equal iff the
//! transition lists pair up with equal classes and targets in the same
//! current group. Split-off members collect into a new group; passes
//! repeat until nothing moves. Each final group collapses into one state
//! whose ref mask is the union over its members.

use crate::dfa::Dfa;

pub(crate) fn minimize(dfa: &mut Dfa) {
    if dfa.states.is_empty() {
        return;
    }

    // Group by accept id; state 0 seeds group 0 and stays its first
    // member, so the minimized start state is 0 again.
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut group_of: Vec<usize> = vec![0; dfa.states.len()];
    for id in 0..dfa.states.len() {
        match groups
            .iter()
            .position(|g| dfa.states[g[0]].accept == dfa.states[id].accept)
        {
            Some(g) => {
                groups[g].push(id);
                group_of[id] = g;
            }
            None => {
                group_of[id] = groups.len();
                groups.push(vec![id]);
            }
        }
    }

    let mut changed = true;
    while changed {
        changed = false;
        for g in 0..groups.len() {
            let first = groups[g][0];
            let mut split: Vec<usize> = Vec::new();
            groups[g].retain(|&member| {
                if member == first || equal_states(dfa, &group_of, first, member) {
                    true
                } else {
                    split.push(member);
                    false
                }
            });
            if !split.is_empty() {
                let new_group = groups.len();
                for &member in &split {
                    group_of[member] = new_group;
                }
                groups.push(split);
                changed = true;
            }
        }
    }

    // Collapse each group into its first member, remapping targets to
    // group indices and union-ing the ref masks.
    let mut min_states = Vec::with_capacity(groups.len());
    for group in &groups {
        let mut state = dfa.states[group[0]].clone();
        for &member in &group[1..] {
            state.refs |= dfa.states[member].refs;
        }
        for tr in &mut state.trans {
            tr.to = group_of[tr.to];
        }
        min_states.push(state);
    }
    dfa.states = min_states;

    dfa.recompute_defaults();
    log::debug!("minimization left {} DFA states", dfa.states.len());
}

/// Two states are equivalent iff their transitions pair up with equal
/// character classes and targets in the same current group.
fn equal_states(dfa: &Dfa, group_of: &[usize], first: usize, second: usize) -> bool {
    let a = &dfa.states[first];
    let b = &dfa.states[second];
    if a.trans.len() != b.trans.len() {
        return false;
    }
    a.trans.iter().zip(b.trans.iter()).all(|(ta, tb)| {
        ta.ccl.compare(&tb.ccl).is_eq() && group_of[ta.to] == group_of[tb.to]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dfa::tests::build_dfa;

    #[test]
    fn merges_equivalent_tails() {
        // `ab|cb` — after `a` and after `c` the continuations are
        // identical and must merge.
        let mut dfa = build_dfa(&[("ab|cb", 1)]);
        let before = dfa.states.len();
        minimize(&mut dfa);
        assert!(dfa.states.len() < before);

        // Language is preserved.
        let run = |input: &str| -> bool {
            let mut state = 0;
            for ch in input.chars() {
                let st = &dfa.states[state];
                match st.trans.iter().find(|t| t.ccl.test(ch as u32)) {
                    Some(tr) => state = tr.to,
                    None => return false,
                }
            }
            dfa.states[state].accept != 0
        };
        assert!(run("ab"));
        assert!(run("cb"));
        assert!(!run("a"));
        assert!(!run("bb"));
    }

    #[test]
    fn start_state_stays_zero() {
        let mut dfa = build_dfa(&[("x(y|z)*", 1)]);
        minimize(&mut dfa);
        assert!(dfa.states[0].accept == 0);
        assert!(dfa.states[0].trans.iter().any(|t| t.ccl.test('x' as u32)));
    }

    #[test]
    fn distinct_accept_ids_never_merge() {
        let mut dfa = build_dfa(&[("a", 1), ("b", 2)]);
        minimize(&mut dfa);
        let accepts: Vec<u32> = dfa
            .states
            .iter()
            .map(|s| s.accept)
            .filter(|&a| a > 0)
            .collect();
        assert!(accepts.contains(&1));
        assert!(accepts.contains(&2));
    }

    #[test]
    fn refs_are_unioned_across_merged_states() {
        let mut dfa = build_dfa(&[("(a)x|(b)x", 1)]);
        let refs_before: u32 = dfa.states.iter().fold(0, |acc, s| acc | s.refs);
        minimize(&mut dfa);
        let refs_after: u32 = dfa.states.iter().fold(0, |acc, s| acc | s.refs);
        assert_eq!(refs_before, refs_after);
        assert_eq!(refs_after, (1 << 1) | (1 << 2));
    }

    #[test]
    fn keyword_prefix_machine_minimal() {
        // `@[a-z0-9]+` minimizes to exactly three states: start, the
        // accepting loop, and the state right after `@`.
        let mut dfa = build_dfa(&[("@[a-z0-9]+", 1)]);
        minimize(&mut dfa);
        assert_eq!(dfa.states.len(), 3);
    }
}

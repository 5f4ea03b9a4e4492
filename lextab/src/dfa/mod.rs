//! Deterministic automata built from NFAs by subset construction.
//!
//! Every DFA state corresponds to an ε-closure of NFA states. The
//! alphabet at each state is first refined into pairwise-disjoint
//! character classes, so each class moves to exactly one successor; a
//! state whose outgoing classes jointly cover the whole universe factors
//! its largest class out as a *default transition*.

pub(crate) mod minimize;
pub(crate) mod table;

use std::collections::{BTreeSet, HashMap};

use itertools::Itertools;

use crate::ccl::Ccl;
use crate::flags::MatchFlags;
use crate::nfa::{Nfa, StateId};

#[derive(Debug, Clone)]
pub(crate) struct DfaTransition {
    pub(crate) ccl: Ccl,
    pub(crate) to: usize,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct DfaState {
    /// Outgoing transitions with pairwise-disjoint classes, sorted by
    /// the class comparator. The default transition, when present, stays
    /// in this list and is referenced by index.
    pub(crate) trans: Vec<DfaTransition>,
    pub(crate) def_trans: Option<usize>,
    pub(crate) accept: u32,
    pub(crate) flags: MatchFlags,
    pub(crate) refs: u32,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Dfa {
    pub(crate) states: Vec<DfaState>,
}

impl Dfa {
    /// Runs the subset construction over `nfa`. State 0 of the result is
    /// the ε-closure of NFA state 0.
    pub(crate) fn from_nfa(nfa: &Nfa) -> Dfa {
        let mut dfa = Dfa::default();
        if nfa.is_empty() {
            return dfa;
        }

        let mut sets: Vec<BTreeSet<StateId>> = Vec::new();
        let mut set_index: HashMap<Vec<StateId>, usize> = HashMap::new();

        let mut seed = BTreeSet::from([0]);
        nfa.epsilon_closure(&mut seed);
        set_index.insert(seed.iter().copied().collect(), 0);
        dfa.states.push(DfaState {
            refs: nfa.collect_refs(&seed),
            ..DfaState::default()
        });
        sets.push(seed);

        let mut undone = 0;
        while undone < dfa.states.len() {
            let current = undone;
            undone += 1;
            let current_set = sets[current].clone();

            // Adopt the best accept information of the member states:
            // the lowest positive id wins.
            let mut accept = 0;
            let mut flags = MatchFlags::empty();
            for &id in &current_set {
                let st = nfa.state(id);
                if st.accept > 0 && (accept == 0 || st.accept <= accept) {
                    accept = st.accept;
                    flags = st.flags;
                }
            }
            dfa.states[current].accept = accept;
            dfa.states[current].flags = flags;

            // The alphabet partition at this state.
            let labels: Vec<Ccl> = current_set
                .iter()
                .filter_map(|&id| nfa.state(id).ccl.clone())
                .collect();
            let classes = partition_classes(labels);

            for class in classes {
                for &range in class.ranges() {
                    let mut target_set = nfa.move_set(&current_set, range.begin, range.end);
                    if target_set.is_empty() {
                        continue;
                    }
                    nfa.epsilon_closure(&mut target_set);

                    let key: Vec<StateId> = target_set.iter().copied().collect();
                    let target = match set_index.get(&key) {
                        Some(&existing) => existing,
                        None => {
                            let id = dfa.states.len();
                            dfa.states.push(DfaState {
                                refs: nfa.collect_refs(&target_set),
                                ..DfaState::default()
                            });
                            sets.push(target_set);
                            set_index.insert(key, id);
                            id
                        }
                    };

                    // Merge with an existing transition to the same state.
                    let state = &mut dfa.states[current];
                    match state.trans.iter_mut().find(|t| t.to == target) {
                        Some(tr) => tr.ccl.add_range(range.begin, range.end),
                        None => {
                            let mut ccl = Ccl::new();
                            ccl.add_range(range.begin, range.end);
                            state.trans.push(DfaTransition { ccl, to: target });
                        }
                    }
                }
            }
        }

        dfa.recompute_defaults();
        log::debug!(
            "subset construction produced {} DFA states",
            dfa.states.len()
        );
        dfa
    }

    /// Sorts every state's transitions and selects default transitions:
    /// when the classes of a state jointly cover the whole universe, the
    /// transition with the most codepoints becomes the default.
    pub(crate) fn recompute_defaults(&mut self) {
        for st in &mut self.states {
            st.def_trans = None;
            if st.trans.is_empty() {
                continue;
            }
            st.trans.sort_by(|l, r| l.ccl.compare(&r.ccl));

            let covered: u64 = st.trans.iter().map(|t| t.ccl.count()).sum();
            let universe = (st.trans[0].ccl.universe_max() - st.trans[0].ccl.universe_min())
                as u64
                + 1;
            if covered >= universe {
                st.def_trans = st.trans.iter().position_max_by_key(|t| t.ccl.count());
            }
        }
    }
}

/// Refines a list of (possibly overlapping) classes into a disjoint
/// partition covering the same codepoints: overlapping pairs are split
/// into intersection and differences until stable.
fn partition_classes(mut classes: Vec<Ccl>) -> Vec<Ccl> {
    'refine: loop {
        for i in 0..classes.len() {
            for j in 0..classes.len() {
                if i == j {
                    continue;
                }
                let Some(inter) = classes[i].intersect(&classes[j]) else {
                    continue;
                };
                let left = classes[i].diff(&inter).expect("same universe");
                let right = classes[j].diff(&inter).expect("same universe");
                // Remove the higher index first so the lower stays valid.
                classes.swap_remove(i.max(j));
                classes.swap_remove(i.min(j));
                classes.push(inter);
                if !left.is_empty() {
                    classes.push(left);
                }
                if !right.is_empty() {
                    classes.push(right);
                }
                continue 'refine;
            }
        }
        break;
    }
    classes.sort_by(Ccl::compare);
    classes.dedup();
    classes
}

use super::*;
use itertools::Itertools;

/// PosEdge - two adjacent non-negative nodes are either both in an optimal module or both
/// outside of it; merge them. The root always stays the representative.
///
/// returns true if rule got applied at least once, false if not at all
pub fn apply_pos_edge(state: &mut ReductionState) -> bool {
    let mut applied = false;
    for u in state.graph().vertices_sorted() {
        let mut current = u;
        loop {
            let graph = state.graph();
            if !graph.has_vertex(current) || graph.profit(current) < 0.0 {
                break;
            }
            let partner = graph
                .neighbors_sorted(current)
                .into_iter()
                .find(|&v| graph.profit(v) >= 0.0);
            let v = match partner {
                Some(v) => v,
                None => break,
            };
            let (keep, drop) = if state.is_root(v) {
                (v, current)
            } else {
                (current, v)
            };
            if !state.merge(Rules::PosEdge, keep, drop) {
                break;
            }
            applied = true;
            current = keep;
        }
    }
    applied
}

/// RootedPosDeg01 - with a fixed root, a non-negative leaf can only be part of a module that
/// also contains its neighbour, so it is folded into the neighbour; isolated nodes other than
/// the root can never be reached and are removed.
///
/// returns true if rule got applied at least once, false if not at all
pub fn apply_rooted_pos_deg01(state: &mut ReductionState) -> bool {
    if !state.is_rooted() {
        return false;
    }

    let mut applied = false;
    let mut worklist = state.graph().vertices_sorted();
    worklist.reverse();

    while let Some(u) = worklist.pop() {
        let graph = state.graph();
        if !graph.has_vertex(u) || state.is_root(u) {
            continue;
        }
        match graph.degree(u) {
            0 => {
                applied |= state.remove_node(Rules::RootedPosDeg01, u);
            }
            1 if graph.profit(u) >= 0.0 => {
                let neighbor = graph.neighbors(u).next();
                if let Some(v) = neighbor {
                    if state.merge(Rules::RootedPosDeg01, v, u) {
                        applied = true;
                        worklist.push(v);
                    }
                }
            }
            _ => {}
        }
    }
    applied
}

/// PosDeg01 - without a root, a non-negative leaf is either the whole optimal module, or it
/// joins its neighbour. The leaf alone is stored as a fallback module and then folded into the
/// neighbour. Isolated non-negative nodes are stored as fallback and removed.
///
/// returns true if rule got applied at least once, false if not at all
pub fn apply_pos_deg01(state: &mut ReductionState) -> bool {
    if state.is_rooted() {
        return false;
    }

    let mut applied = false;
    let mut worklist = state.graph().vertices_sorted();
    worklist.reverse();

    while let Some(u) = worklist.pop() {
        let graph = state.graph();
        if !graph.has_vertex(u) || graph.profit(u) < 0.0 {
            continue;
        }
        match graph.degree(u) {
            0 => {
                state.add_fallback(u);
                applied |= state.remove_node(Rules::PosDeg01, u);
            }
            1 => {
                let neighbor = graph.neighbors(u).next();
                if let Some(v) = neighbor {
                    state.add_fallback(u);
                    if state.merge(Rules::PosDeg01, v, u) {
                        applied = true;
                        worklist.push(v);
                    }
                }
            }
            _ => {}
        }
    }
    applied
}

/// PosDiamond - with a fixed root, non-negative degree-2 nodes attached to the same pair of
/// neighbours are either all in an optimal module or all outside of it; merge them.
///
/// returns true if rule got applied at least once, false if not at all
pub fn apply_pos_diamond(state: &mut ReductionState) -> bool {
    if !state.is_rooted() {
        return false;
    }

    let mut groups: FxHashMap<Vec<Node>, Vec<Node>> = FxHashMap::default();
    for u in state.graph().vertices_sorted() {
        let graph = state.graph();
        if state.is_root(u) || graph.profit(u) < 0.0 || graph.degree(u) != 2 {
            continue;
        }
        groups.entry(graph.neighbors_sorted(u)).or_default().push(u);
    }

    let mut applied = false;
    for (_, group) in groups.into_iter().sorted() {
        if let Some((&keep, rest)) = group.split_first() {
            for &drop in rest {
                applied |= state.merge(Rules::PosDiamond, keep, drop);
            }
        }
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_of(profits: &[Weight], edges: &[Edge], root: Option<Node>) -> ReductionState {
        ReductionState::new(
            WeightedGraph::from_profits_and_edges(profits, edges).unwrap(),
            root,
        )
        .unwrap()
    }

    #[test]
    fn pos_edge_merges_cluster() {
        // 0(1) - 1(0) - 2(2) - 3(-5)
        let mut state = state_of(&[1.0, 0.0, 2.0, -5.0], &[(0, 1), (1, 2), (2, 3)], None);
        assert!(apply_pos_edge(&mut state));
        assert_eq!(state.graph().vertices_sorted(), vec![0, 3]);
        assert_eq!(state.graph().profit(0), 3.0);
        assert_eq!(state.record().expand(&[0]), vec![0, 1, 2]);
        assert!(!apply_pos_edge(&mut state));
    }

    #[test]
    fn pos_edge_keeps_root() {
        let mut state = state_of(&[1.0, 2.0], &[(0, 1)], Some(1));
        assert!(apply_pos_edge(&mut state));
        assert_eq!(state.graph().vertices_sorted(), vec![1]);
        assert_eq!(state.graph().profit(1), 3.0);
    }

    #[test]
    fn rooted_pos_deg01() {
        // root 0(-1) - 1(-1) - 2(4); 3 isolated
        let mut state = state_of(&[-1.0, -1.0, 4.0, 7.0], &[(0, 1), (1, 2)], Some(0));
        assert!(apply_rooted_pos_deg01(&mut state));
        // 2 folds into 1, which becomes a non-negative leaf and folds into the root
        assert_eq!(state.graph().vertices_sorted(), vec![0]);
        assert_eq!(state.graph().profit(0), 2.0);
        assert_eq!(state.record().expand(&[0]), vec![0, 1, 2]);

        let mut unrooted = state_of(&[1.0, -1.0], &[(0, 1)], None);
        assert!(!apply_rooted_pos_deg01(&mut unrooted));
    }

    #[test]
    fn pos_deg01_records_fallbacks() {
        // 0(5) - 1(-7) - 2(1)
        let mut state = state_of(&[5.0, -7.0, 1.0], &[(0, 1), (1, 2)], None);
        assert!(apply_pos_deg01(&mut state));
        assert_eq!(state.graph().vertices_sorted(), vec![1]);
        assert_eq!(state.graph().profit(1), -1.0);
        let best = state.record().best_fallback().unwrap();
        assert_eq!(best.nodes, vec![0]);
        assert_eq!(best.weight, 5.0);
        assert_eq!(state.record().finalize(&[], 0.0), (vec![0], 5.0));

        let mut rooted = state_of(&[1.0, -1.0], &[(0, 1)], Some(1));
        assert!(!apply_pos_deg01(&mut rooted));
    }

    #[test]
    fn pos_diamond() {
        // root 0 and 1 connected via 2 (1), 3 (2) and 4 (-1)
        let mut state = state_of(
            &[-1.0, -1.0, 1.0, 2.0, -1.0],
            &[(0, 2), (2, 1), (0, 3), (3, 1), (0, 4), (4, 1)],
            Some(0),
        );
        assert!(apply_pos_diamond(&mut state));
        assert_eq!(state.graph().vertices_sorted(), vec![0, 1, 2, 4]);
        assert_eq!(state.graph().profit(2), 3.0);
        assert_eq!(state.record().expand(&[2]), vec![2, 3]);

        let mut unrooted = state_of(&[-1.0, -1.0, 1.0, 2.0], &[(0, 2), (2, 1), (0, 3), (3, 1)], None);
        assert!(!apply_pos_diamond(&mut unrooted));
    }
}

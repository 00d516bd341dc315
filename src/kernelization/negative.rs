use super::*;
use itertools::Itertools;

fn is_negative_candidate(state: &ReductionState, u: Node) -> bool {
    state.graph().has_vertex(u) && !state.is_root(u) && state.graph().profit(u) < 0.0
}

/// NegDeg01 - a negative node with at most one neighbour never helps to connect anything
///
/// returns true if rule got applied at least once, false if not at all
pub fn apply_neg_deg01(state: &mut ReductionState) -> bool {
    let mut applied = false;
    let mut worklist = state.graph().vertices_sorted();
    worklist.reverse();

    while let Some(u) = worklist.pop() {
        if !is_negative_candidate(state, u) || state.graph().degree(u) > 1 {
            continue;
        }
        let neighbor = state.graph().neighbors(u).next();
        state.remove_node(Rules::NegDeg01, u);
        applied = true;
        worklist.extend(neighbor);
    }
    applied
}

/// NegEdge - if u and v share a non-negative neighbour w, the edge {u, v} can be replaced
/// by the detour u - w - v at no loss
///
/// returns true if rule got applied at least once, false if not at all
pub fn apply_neg_edge(state: &mut ReductionState) -> bool {
    let mut applied = false;
    for (u, v) in state.graph().edges_sorted() {
        let graph = state.graph();
        let (small, large) = if graph.degree(u) <= graph.degree(v) {
            (u, v)
        } else {
            (v, u)
        };
        let has_detour = graph
            .neighbors(small)
            .any(|w| w != large && graph.profit(w) >= 0.0 && graph.has_edge(w, large));
        if has_detour {
            applied |= state.remove_edge(Rules::NegEdge, u, v);
        }
    }
    applied
}

fn is_chain_node(state: &ReductionState, u: Node) -> bool {
    is_negative_candidate(state, u) && state.graph().degree(u) == 2
}

/// Follows the chain of negative degree-2 nodes starting with the step `from -> next`.
/// Returns the first node that is not a chain node (or `None` if the walk returned to
/// `start`, i.e. the chain is a cycle) and pushes all chain nodes passed on the way.
fn walk_chain(
    state: &ReductionState,
    start: Node,
    mut from: Node,
    mut next: Node,
    chain: &mut Vec<Node>,
) -> Option<Node> {
    loop {
        if next == start {
            return None;
        }
        if !is_chain_node(state, next) {
            return Some(next);
        }
        chain.push(next);
        let following = state.graph().neighbors(next).find(|&w| w != from)?;
        from = next;
        next = following;
    }
}

/// NegCircuit - a maximal chain of negative degree-2 nodes is useless if it forms a cycle by
/// itself, if both ends attach to the same node or if its two end nodes are adjacent anyway
///
/// returns true if rule got applied at least once, false if not at all
pub fn apply_neg_circuit(state: &mut ReductionState) -> bool {
    let mut applied = false;
    for u in state.graph().vertices_sorted() {
        if !is_chain_node(state, u) {
            continue;
        }

        let (a, b) = match state.graph().neighbors_sorted(u)[..] {
            [a, b] => (a, b),
            _ => continue,
        };

        let mut chain = vec![u];
        let removable = match walk_chain(state, u, u, a, &mut chain) {
            None => true,
            Some(end_a) => {
                let end_b = walk_chain(state, u, u, b, &mut chain);
                match end_b {
                    Some(end_b) => end_a == end_b || state.graph().has_edge(end_a, end_b),
                    None => true,
                }
            }
        };

        if removable {
            for x in chain {
                applied |= state.remove_node(Rules::NegCircuit, x);
            }
        }
    }
    applied
}

/// Removes all but the best node of every group of interchangeable negative nodes. Nodes are
/// interchangeable if they have the same neighbourhood, which is what `key` returns.
fn keep_best_of_twins<F>(state: &mut ReductionState, rule: Rules, key: F) -> bool
where
    F: Fn(&WeightedGraph, Node) -> Option<Vec<Node>>,
{
    let mut groups: FxHashMap<Vec<Node>, Vec<Node>> = FxHashMap::default();
    for u in state.graph().vertices_sorted() {
        if !is_negative_candidate(state, u) {
            continue;
        }
        if let Some(k) = key(state.graph(), u) {
            groups.entry(k).or_default().push(u);
        }
    }

    let mut applied = false;
    for (_, group) in groups.into_iter().sorted() {
        if group.len() < 2 {
            continue;
        }
        let graph = state.graph();
        // max_by returns the last maximum; walking the sorted group backwards favours small ids
        let best = group
            .iter()
            .copied()
            .rev()
            .max_by(|&x, &y| graph.profit(x).total_cmp(&graph.profit(y)))
            .unwrap_or(group[0]);
        for u in group {
            if u != best {
                applied |= state.remove_node(rule, u);
            }
        }
    }
    applied
}

/// NegDiamond - of several negative degree-2 nodes connecting the same pair only the most
/// profitable one is needed
///
/// returns true if rule got applied at least once, false if not at all
pub fn apply_neg_diamond(state: &mut ReductionState) -> bool {
    keep_best_of_twins(state, Rules::NegDiamond, |graph, u| {
        (graph.degree(u) == 2).then(|| graph.neighbors_sorted(u))
    })
}

/// NegMirroredHubs - like NegDiamond for negative hubs of degree at least three
///
/// returns true if rule got applied at least once, false if not at all
pub fn apply_neg_mirrored_hubs(state: &mut ReductionState) -> bool {
    keep_best_of_twins(state, Rules::NegMirroredHubs, |graph, u| {
        (graph.degree(u) >= 3).then(|| graph.neighbors_sorted(u))
    })
}

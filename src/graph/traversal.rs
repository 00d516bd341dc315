use super::*;
use fxhash::FxHashSet;
use std::collections::VecDeque;

pub struct TraversalState<'a, G> {
    graph: &'a G,
    visited: FxHashSet<Node>,
}

impl<'a, G: AdjacencyList> TraversalState<'a, G> {
    pub fn new(graph: &'a G) -> TraversalState<'a, G> {
        Self {
            graph,
            visited: FxHashSet::default(),
        }
    }

    /// Executes breadth-first-search starting at node `start` and calls
    /// callback for every node visited in order. Only nodes accepted by `allowed`
    /// are entered; `start` is always visited.
    pub fn bfs_within<A: Fn(Node) -> bool, T: FnMut(Node)>(
        &mut self,
        start: Node,
        allowed: A,
        mut callback: T,
    ) {
        if !self.visited.insert(start) {
            return;
        }
        let mut queue: VecDeque<Node> = VecDeque::from(vec![start]);
        while let Some(u) = queue.pop_front() {
            callback(u);
            for v in self.graph.neighbors(u) {
                if allowed(v) && self.visited.insert(v) {
                    queue.push_back(v);
                }
            }
        }
    }

    /// Executes depth-first-search starting at node `start` and calls
    /// callback for every node visited in order
    pub fn dfs<T: FnMut(Node)>(&mut self, start: Node, mut callback: T) {
        if !self.visited.insert(start) {
            return;
        }
        let mut stack: Vec<Node> = vec![start];
        while let Some(u) = stack.pop() {
            callback(u);
            for v in self.graph.neighbors(u) {
                if self.visited.insert(v) {
                    stack.push(v);
                }
            }
        }
    }

    pub fn did_visit(&self, u: Node) -> bool {
        self.visited.contains(&u)
    }

    pub fn number_visited(&self) -> usize {
        self.visited.len()
    }
}

pub enum TravAlgo {
    Bfs(Node),
    Dfs(Node),
}

pub trait Traversal: AdjacencyList + Sized {
    /// Runs the requested algorithm and invokes the callback for every visited node
    fn traverse<T: FnMut(Node)>(&self, algo: TravAlgo, callback: T) {
        let mut state = TraversalState::new(self);
        match algo {
            TravAlgo::Bfs(start) => state.bfs_within(start, |_| true, callback),
            TravAlgo::Dfs(start) => state.dfs(start, callback),
        }
    }

    /// Runs the requested algorithm and returns the order in which nodes were visited
    fn traversal_order(&self, algo: TravAlgo) -> Vec<Node> {
        let mut order = Vec::with_capacity(self.len());
        self.traverse(algo, |u| order.push(u));
        order
    }

    /// Returns all nodes reachable from `start` using only nodes accepted by `allowed`
    /// (`start` itself is always part of the result).
    fn reachable_within<A: Fn(Node) -> bool>(&self, start: Node, allowed: A) -> Vec<Node> {
        let mut state = TraversalState::new(self);
        let mut result = Vec::new();
        state.bfs_within(start, allowed, |u| result.push(u));
        result
    }
}

impl<G: AdjacencyList> Traversal for G {}

#[cfg(test)]
pub mod tests {
    use super::*;

    #[test]
    fn bfs_order() {
        //  / 2 --- \
        // 1         4 - 3
        //  \ 0 - 5 /
        let graph = WeightedGraph::from_profits_and_edges(
            &[0.0; 6],
            &[(1, 2), (1, 0), (4, 3), (0, 5), (2, 4), (5, 4)],
        )
        .unwrap();

        let order = graph.traversal_order(TravAlgo::Bfs(1));
        assert_eq!(order.len(), 6);
        assert_eq!(order[0], 1);
        assert!((order[1] == 0 && order[2] == 2) || (order[2] == 0 && order[1] == 2));
        assert!((order[3] == 4 && order[4] == 5) || (order[4] == 4 && order[3] == 5));
        assert_eq!(order[5], 3);
    }

    #[test]
    fn dfs_order() {
        // 1 - 0 - 5 - 4 - 3
        let graph =
            WeightedGraph::from_profits_and_edges(&[0.0; 6], &[(1, 0), (4, 3), (0, 5), (5, 4)])
                .unwrap();
        assert_eq!(graph.traversal_order(TravAlgo::Dfs(1)), [1, 0, 5, 4, 3]);
        assert_eq!(graph.traversal_order(TravAlgo::Dfs(2)), [2]);
    }

    #[test]
    fn restricted_reachability() {
        // 0 - 1 - 2 - 3
        let graph =
            WeightedGraph::from_profits_and_edges(&[0.0; 4], &[(0, 1), (1, 2), (2, 3)]).unwrap();
        let mut reach = graph.reachable_within(0, |v| v != 2);
        reach.sort_unstable();
        assert_eq!(reach, vec![0, 1]);
        assert_eq!(graph.reachable_within(3, |_| false), vec![3]);
    }
}

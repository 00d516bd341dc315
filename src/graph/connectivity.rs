use super::*;
use crate::error::MwcsError;
use fxhash::FxHashSet;

pub trait Connectivity: AdjacencyList + AdjacencyTest + Traversal + Sized {
    /// Returns the connected components of the graph. Each component is sorted and the
    /// components are ordered by their smallest node.
    fn connected_components(&self) -> Vec<Vec<Node>> {
        let mut state = TraversalState::new(self);
        let mut components = Vec::new();
        for u in self.vertices_sorted() {
            if state.did_visit(u) {
                continue;
            }
            let mut component = Vec::new();
            state.bfs_within(u, |_| true, |v| component.push(v));
            component.sort_unstable();
            components.push(component);
        }
        components
    }

    /// Returns the sorted connected component containing `u`
    fn component_of(&self, u: Node) -> Result<Vec<Node>> {
        if !self.has_vertex(u) {
            return Err(MwcsError::InvalidReference(u));
        }
        let mut component = self.reachable_within(u, |_| true);
        component.sort_unstable();
        Ok(component)
    }

    /// Returns true iff `nodes` induces a connected subgraph. The empty set is considered
    /// connected. Fails if a node does not exist.
    ///
    /// # Example
    /// ```
    /// use mwcs::graph::*;
    /// let graph = WeightedGraph::from_profits_and_edges(&[1.0; 3], &[(0, 1), (1, 2)]).unwrap();
    /// assert!(graph.is_connected_set(&[0, 1]).unwrap());
    /// assert!(!graph.is_connected_set(&[0, 2]).unwrap());
    /// ```
    fn is_connected_set(&self, nodes: &[Node]) -> Result<bool> {
        if let Some(&u) = nodes.iter().find(|&&u| !self.has_vertex(u)) {
            return Err(MwcsError::InvalidReference(u));
        }
        let members: FxHashSet<Node> = nodes.iter().copied().collect();
        let start = match nodes.first() {
            Some(&u) => u,
            None => return Ok(true),
        };
        let reached = self.reachable_within(start, |v| members.contains(&v));
        Ok(reached.len() == members.len())
    }

    /// Splits `nodes` into the connected components of the subgraph they induce
    fn components_within(&self, nodes: &[Node]) -> Vec<Vec<Node>> {
        let members: FxHashSet<Node> = nodes.iter().copied().collect();
        let mut state = TraversalState::new(self);
        let mut components = Vec::new();
        let mut sorted = nodes.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        for u in sorted {
            if state.did_visit(u) {
                continue;
            }
            let mut component = Vec::new();
            state.bfs_within(u, |v| members.contains(&v), |v| component.push(v));
            component.sort_unstable();
            components.push(component);
        }
        components
    }
}

impl<T: AdjacencyList + AdjacencyTest + Traversal + Sized> Connectivity for T {}

#[cfg(test)]
pub mod tests {
    use super::*;

    #[test]
    pub fn cc() {
        let graph = WeightedGraph::from_profits_and_edges(
            &[0.0; 9],
            &[(0, 3), (6, 3), (6, 7), (4, 1), (1, 8)],
        )
        .unwrap();
        let ccs = graph.connected_components();

        assert_eq!(ccs.len(), 4);
        assert_eq!(ccs[0], [0, 3, 6, 7]);
        assert_eq!(ccs[1], [1, 4, 8]);
        assert_eq!(ccs[2], [2]);
        assert_eq!(ccs[3], [5]);

        assert_eq!(graph.component_of(7).unwrap(), [0, 3, 6, 7]);
        assert!(graph.component_of(9).is_err());
    }

    #[test]
    pub fn cc_empty() {
        let graph = WeightedGraph::new();
        assert!(graph.connected_components().is_empty());
        assert!(graph.is_connected_set(&[]).unwrap());
    }

    #[test]
    pub fn connected_sets() {
        let graph = WeightedGraph::from_profits_and_edges(
            &[0.0; 5],
            &[(0, 1), (1, 2), (2, 3), (3, 4)],
        )
        .unwrap();
        assert!(graph.is_connected_set(&[2]).unwrap());
        assert!(graph.is_connected_set(&[3, 1, 2]).unwrap());
        assert!(!graph.is_connected_set(&[0, 1, 3]).unwrap());
        assert!(matches!(
            graph.is_connected_set(&[0, 5]),
            Err(MwcsError::InvalidReference(5))
        ));

        let parts = graph.components_within(&[4, 0, 1, 3]);
        assert_eq!(parts, vec![vec![0, 1], vec![3, 4]]);
    }
}

pub mod connectivity;
pub mod io;
pub mod network_flow;
pub mod node_mapper;
pub mod traversal;
pub mod weighted_graph;

pub use connectivity::*;
pub use network_flow::*;
pub use node_mapper::*;
pub use traversal::*;
pub use weighted_graph::WeightedGraph;

use crate::error::Result;

pub type Node = u32;
pub type Edge = (Node, Node);
pub type Weight = f64;

/// Normalises an undirected edge such that the smaller endpoint comes first.
pub fn normalized(u: Node, v: Node) -> Edge {
    if u <= v {
        (u, v)
    } else {
        (v, u)
    }
}

/// Provides getters pertaining to the size of a graph
pub trait GraphOrder {
    /// Returns the number of nodes of the graph
    fn number_of_nodes(&self) -> Node;

    /// Returns the number of undirected edges of the graph
    fn number_of_edges(&self) -> usize;

    /// Return the number of nodes as usize
    fn len(&self) -> usize {
        self.number_of_nodes() as usize
    }

    /// Returns true if the graph has no nodes
    fn is_empty(&self) -> bool {
        self.number_of_nodes() == 0
    }

    /// Returns an iterator over V in arbitrary order
    fn vertices(&self) -> impl Iterator<Item = Node> + '_;

    /// Returns V in increasing order. Use this whenever the visiting order has to be reproducible.
    fn vertices_sorted(&self) -> Vec<Node> {
        let mut nodes: Vec<Node> = self.vertices().collect();
        nodes.sort_unstable();
        nodes
    }
}

/// Provides basic read-only functionality associated with an adjacency list
pub trait AdjacencyList: GraphOrder {
    /// Returns an iterator over the neighbours of a given vertex.
    /// ** Panics if u is not a vertex **
    fn neighbors(&self, u: Node) -> impl Iterator<Item = Node> + '_;

    /// Returns the number of edges incident to *u*
    /// ** Panics if u is not a vertex **
    fn degree(&self, u: Node) -> Node;

    /// Returns the neighbours of *u* in increasing order
    fn neighbors_sorted(&self, u: Node) -> Vec<Node> {
        let mut nb: Vec<Node> = self.neighbors(u).collect();
        nb.sort_unstable();
        nb
    }

    /// Returns all edges (u, v) with u < v in lexicographic order
    fn edges_sorted(&self) -> Vec<Edge> {
        let mut edges: Vec<Edge> = self
            .vertices()
            .flat_map(|u| self.neighbors(u).filter(move |&v| u < v).map(move |v| (u, v)))
            .collect();
        edges.sort_unstable();
        edges
    }
}

pub trait AdjacencyTest {
    /// Returns *true* exactly if the graph contains the vertex *u*
    fn has_vertex(&self, u: Node) -> bool;

    /// Returns *true* exactly if the graph contains the undirected edge {u, v}
    fn has_edge(&self, u: Node, v: Node) -> bool;
}

/// Read access to node profits
pub trait NodeWeights {
    /// Returns the profit of *u*
    /// ** Panics if u is not a vertex **
    fn profit(&self, u: Node) -> Weight;

    /// Sums the profits of the given nodes
    fn weight_of<'a, I: IntoIterator<Item = &'a Node>>(&self, nodes: I) -> Weight {
        nodes.into_iter().map(|&u| self.profit(u)).sum()
    }
}

pub trait GraphEdgeEditing {
    /// Adds the undirected edge {u, v}; a parallel edge is collapsed into the existing one.
    /// Fails if one endpoint does not exist or u == v.
    fn add_edge(&mut self, u: Node, v: Node) -> Result<()>;

    /// Adds the edge {u, v} if both endpoints exist, it is not a loop and it is not yet present.
    /// Returns true iff the edge was added.
    fn try_add_edge(&mut self, u: Node, v: Node) -> bool;

    /// Removes the edge {u, v}. Fails if it does not exist.
    fn remove_edge(&mut self, u: Node, v: Node) -> Result<()>;

    /// Removes the edge {u, v} if present and returns true iff it was.
    fn try_remove_edge(&mut self, u: Node, v: Node) -> bool;
}

pub trait GraphVertexEditing {
    /// Adds the node *u* with the given profit. Fails if it already exists.
    fn add_node(&mut self, u: Node, profit: Weight) -> Result<()>;

    /// Removes *u* and all incident edges and returns the former neighbours.
    /// Fails if *u* does not exist.
    fn remove_node(&mut self, u: Node) -> Result<Vec<Node>>;

    /// Overwrites the profit of *u*.
    fn set_profit(&mut self, u: Node, profit: Weight) -> Result<()>;
}

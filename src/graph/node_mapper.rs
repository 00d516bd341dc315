use super::*;
use fxhash::FxHashMap;
use itertools::Itertools;
use std::fmt;

pub trait Setter: Sized {
    /// Creates a mapper with room for n mappings.
    fn with_capacity(n: Node) -> Self;

    /// Stores a mapping old <-> new
    /// ** Panics if old or new is already mapped **
    fn map_node_to(&mut self, old: Node, new: Node);

    /// Constructs a mapper from a sequence of tuples (old, new).
    ///
    /// # Example
    ///
    /// ```
    /// use mwcs::graph::{NodeMapper, Setter, Getter};
    /// let mapper = NodeMapper::from_sequence(&[(0,2), (2, 1)]);
    /// assert_eq!(mapper.new_id_of(0), Some(2));
    /// assert_eq!(mapper.new_id_of(1), None);
    /// assert_eq!(mapper.new_id_of(2), Some(1));
    /// ```
    fn from_sequence(seq: &[(Node, Node)]) -> Self {
        let mut res = Self::with_capacity(seq.len() as Node);
        for &(old, new) in seq {
            res.map_node_to(old, new);
        }
        res
    }

    /// Assigns the dense ids `0..nodes.len()` to `nodes` in the given order.
    ///
    /// # Example
    ///
    /// ```
    /// use mwcs::graph::{NodeMapper, Setter, Getter};
    /// let mapper = NodeMapper::densify(&[7, 3, 9]);
    /// assert_eq!(mapper.new_id_of(3), Some(1));
    /// assert_eq!(mapper.old_id_of(2), Some(9));
    /// ```
    fn densify(nodes: &[Node]) -> Self {
        let mut res = Self::with_capacity(nodes.len() as Node);
        for (new, &old) in nodes.iter().enumerate() {
            res.map_node_to(old, new as Node);
        }
        res
    }
}

pub trait Getter {
    /// If the mapping (old, new) exists, returns Some(new), otherwise None
    fn new_id_of(&self, old: Node) -> Option<Node>;

    /// If the mapping (old, new) exists, returns Some(old), otherwise None
    fn old_id_of(&self, new: Node) -> Option<Node>;

    /// Returns the number of explicitly stored mappings
    fn len(&self) -> Node;

    /// Returns true if no mapping is stored
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Applies [`Getter::old_id_of`] to each iterator item and drops items without mapping.
    fn get_old_ids(&self, new_ids: impl Iterator<Item = Node>) -> Vec<Node> {
        new_ids.filter_map(|new| self.old_id_of(new)).collect_vec()
    }

    /// Applies [`Getter::new_id_of`] to each iterator item and drops items without mapping.
    fn get_new_ids(&self, old_ids: impl Iterator<Item = Node>) -> Vec<Node> {
        old_ids.filter_map(|old| self.new_id_of(old)).collect_vec()
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
#[derive(Clone, Default)]
pub struct NodeMapper {
    new_to_old: FxHashMap<Node, Node>,
    old_to_new: FxHashMap<Node, Node>,
}

impl Setter for NodeMapper {
    fn with_capacity(n: Node) -> Self {
        Self {
            new_to_old: FxHashMap::with_capacity_and_hasher(n as usize, Default::default()),
            old_to_new: FxHashMap::with_capacity_and_hasher(n as usize, Default::default()),
        }
    }

    fn map_node_to(&mut self, old: Node, new: Node) {
        let success =
            self.old_to_new.insert(old, new).is_none() & self.new_to_old.insert(new, old).is_none();
        assert!(success);
    }
}

impl Getter for NodeMapper {
    fn new_id_of(&self, old: Node) -> Option<Node> {
        self.old_to_new.get(&old).copied()
    }

    fn old_id_of(&self, new: Node) -> Option<Node> {
        self.new_to_old.get(&new).copied()
    }

    fn len(&self) -> Node {
        self.old_to_new.len() as Node
    }
}

impl fmt::Debug for NodeMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}]",
            self.old_to_new
                .iter()
                .sorted()
                .map(|(&o, &n)| format!("{}<->{}", o, n))
                .join(", ")
        )
    }
}

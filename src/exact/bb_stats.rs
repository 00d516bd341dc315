/// Counters of one branch-and-cut run
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BBStats {
    pub nodes: usize,
    pub lp_solves: usize,
    pub cuts_added: usize,
    pub pruned: usize,
    pub max_depth: usize,
    entered_at: Vec<usize>,
}

impl BBStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a search node at depth `depth`
    pub fn entered_at(&mut self, depth: usize) {
        self.nodes += 1;
        self.max_depth = self.max_depth.max(depth);
        if self.entered_at.len() <= depth {
            self.entered_at.resize(depth + 1, 0);
        }
        self.entered_at[depth] += 1;
    }

    /// Number of search nodes entered per depth
    pub fn nodes_per_depth(&self) -> &[usize] {
        &self.entered_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn histogram() {
        let mut stats = BBStats::new();
        stats.entered_at(0);
        stats.entered_at(2);
        stats.entered_at(2);
        assert_eq!(stats.nodes, 3);
        assert_eq!(stats.max_depth, 2);
        assert_eq!(stats.nodes_per_depth(), &[1, 0, 2]);
    }
}

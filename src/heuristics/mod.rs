pub mod scoring;
pub mod tree_heuristic;

pub use scoring::BumModel;
pub use tree_heuristic::{EdgeHeuristic, NegHubAnalysis, TreeHeuristic, TreeHeuristicSolver};

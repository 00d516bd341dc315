pub mod algorithm;
pub mod error;
pub mod exact;
pub mod graph;
pub mod heuristics;
pub mod kernelization;
pub mod log;
pub mod options;
pub mod report;

#[cfg(test)]
pub(crate) mod testing;

//! Structured text report of a solve in the DIMACS challenge dialect.
//!
//! The output target is chosen once at startup as a [`Sink`] and handed to a [`Report`]; the
//! sink is flushed when the report is finished and again when it is dropped.

use crate::error::{MwcsError, Result};
use crate::exact::{BoundEvent, SolveStatus};
use crate::graph::*;
use fxhash::{FxHashMap, FxHashSet};
use itertools::Itertools;
use std::fs::File;
use std::io::{stdout, BufWriter, Stdout, Write};

/// Standard output or a buffered file
pub enum Sink {
    Stdout(Stdout),
    File(BufWriter<File>),
}

impl Sink {
    /// Opens `target` for writing; `-` selects standard output
    pub fn open(target: &str) -> Result<Self> {
        if target == "-" {
            return Ok(Sink::Stdout(stdout()));
        }
        File::create(target)
            .map(|file| Sink::File(BufWriter::new(file)))
            .map_err(|_| MwcsError::Config(format!("Could not open file '{}' for writing", target)))
    }

    pub fn is_stdout(&self) -> bool {
        matches!(self, Sink::Stdout(_))
    }
}

impl Write for Sink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            Sink::Stdout(out) => out.write(buf),
            Sink::File(out) => out.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Sink::Stdout(out) => out.flush(),
            Sink::File(out) => out.flush(),
        }
    }
}

impl Drop for Sink {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

/// Splits a module of the edge-subdivided graph into the original vertices and the original
/// edges it selects. An edge counts as selected if its edge node and both endpoints are part of
/// the module; edges that were never subdivided count if both endpoints are selected.
pub fn pcst_solution(
    original: &WeightedGraph,
    edge_nodes: &FxHashMap<Node, Edge>,
    module: &[Node],
) -> (Vec<Node>, Vec<Edge>) {
    let vertices = module
        .iter()
        .copied()
        .filter(|u| original.has_vertex(*u))
        .sorted()
        .dedup()
        .collect_vec();
    let selected: FxHashSet<Node> = vertices.iter().copied().collect();

    let mut edges = module
        .iter()
        .filter_map(|e| edge_nodes.get(e))
        .copied()
        .filter(|(u, v)| selected.contains(u) && selected.contains(v))
        .collect_vec();
    edges.extend(
        original
            .edges_sorted()
            .into_iter()
            .filter(|&(u, v)| original.edge_weight(u, v).is_none())
            .filter(|(u, v)| selected.contains(u) && selected.contains(v)),
    );
    edges.sort_unstable();
    edges.dedup();

    (vertices, edges)
}

pub struct Report<W: Write> {
    out: W,
    solutions: usize,
}

impl<W: Write> Report<W> {
    pub fn new(out: W) -> Self {
        Self { out, solutions: 0 }
    }

    pub fn comment_section(
        &mut self,
        name: &str,
        problem: &str,
        program: &str,
        version: &str,
    ) -> Result<()> {
        writeln!(self.out, "SECTION Comment")?;
        writeln!(self.out, "Name \"{}\"", name)?;
        writeln!(self.out, "Problem \"{}\"", problem)?;
        writeln!(self.out, "Program \"{}\"", program)?;
        writeln!(self.out, "Version \"{}\"", version)?;
        writeln!(self.out, "End")?;
        writeln!(self.out)?;
        Ok(())
    }

    /// Writes one `Solution <index> <weight> <bound>` line
    pub fn solution(&mut self, weight: Weight, bound: Weight) -> Result<()> {
        writeln!(
            self.out,
            "Solution {} {:.9} {:.9}",
            self.solutions, weight, bound
        )?;
        self.solutions += 1;
        Ok(())
    }

    /// Writes the `SECTION Solutions` block for all events of `trace`
    pub fn solutions_section(&mut self, trace: &[BoundEvent]) -> Result<()> {
        writeln!(self.out, "SECTION Solutions")?;
        for event in trace {
            self.solution(event.weight, event.bound)?;
        }
        writeln!(self.out, "End")?;
        writeln!(self.out)?;
        Ok(())
    }

    /// Writes the run summary. A status other than [`SolveStatus::Optimal`] means the dual bound
    /// may not be tight.
    pub fn run_section(
        &mut self,
        threads: usize,
        seconds: f64,
        primal: f64,
        dual: f64,
        status: SolveStatus,
    ) -> Result<()> {
        writeln!(self.out, "SECTION Run")?;
        writeln!(self.out, "Threads {}", threads)?;
        writeln!(self.out, "Time {:.9}", seconds)?;
        writeln!(self.out, "Dual {:.9}", dual)?;
        writeln!(self.out, "Primal {:.9}", primal)?;
        writeln!(self.out, "Status {:?}", status)?;
        writeln!(self.out, "End")?;
        writeln!(self.out)?;
        Ok(())
    }

    /// Writes the selected vertices and edges using the node labels of `graph`
    pub fn final_solution_section(
        &mut self,
        graph: &WeightedGraph,
        vertices: &[Node],
        edges: &[Edge],
    ) -> Result<()> {
        writeln!(self.out, "SECTION Finalsolution")?;
        writeln!(self.out, "Vertices {}", vertices.len())?;
        for &u in vertices {
            writeln!(self.out, "V {}", graph.display_label(u))?;
        }
        writeln!(self.out, "Edges {}", edges.len())?;
        for &(u, v) in edges {
            writeln!(
                self.out,
                "E {} {}",
                graph.display_label(u),
                graph.display_label(v)
            )?;
        }
        writeln!(self.out, "End")?;
        Ok(())
    }

    /// Flushes and returns the underlying writer
    pub fn finish(mut self) -> Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections() {
        let mut report = Report::new(Vec::new());
        report.comment_section("tiny", "PCST", "heinz-pcst", "1.0").unwrap();
        report
            .solutions_section(&[
                BoundEvent {
                    weight: 1.0,
                    bound: 4.5,
                },
                BoundEvent {
                    weight: 2.0,
                    bound: 2.0,
                },
            ])
            .unwrap();
        report
            .run_section(1, 0.5, 3.0, 2.5, SolveStatus::TimeLimit)
            .unwrap();
        let out = String::from_utf8(report.finish().unwrap()).unwrap();

        assert!(out.starts_with("SECTION Comment\nName \"tiny\"\nProblem \"PCST\"\n"));
        assert!(out.contains(
            "SECTION Solutions\nSolution 0 1.000000000 4.500000000\nSolution 1 2.000000000 2.000000000\nEnd\n"
        ));
        assert!(out.contains("Threads 1\nTime 0.500000000\nDual 2.500000000\nPrimal 3.000000000\nStatus TimeLimit\nEnd\n"));
    }

    #[test]
    fn final_solution() {
        // 0 - 1 - 2 with weighted edges plus the unweighted edge {0, 2}
        let mut graph = WeightedGraph::new();
        for label in ["1", "2", "3"] {
            graph.add_labeled_node(label, 1.0).unwrap();
        }
        graph.add_weighted_edge(0, 1, -1.0).unwrap();
        graph.add_weighted_edge(1, 2, -1.0).unwrap();
        graph.add_edge(0, 2).unwrap();

        let (subdivided, edge_nodes) = graph.subdivide_weighted_edges();
        let e01 = *edge_nodes.iter().find(|(_, &e)| e == (0, 1)).unwrap().0;
        let e12 = *edge_nodes.iter().find(|(_, &e)| e == (1, 2)).unwrap().0;
        assert!(subdivided.has_vertex(e01));

        let (vertices, edges) = pcst_solution(&graph, &edge_nodes, &[0, e01, 1, e12]);
        assert_eq!(vertices, vec![0, 1]);
        assert_eq!(edges, vec![(0, 1)]);

        let (vertices, edges) = pcst_solution(&graph, &edge_nodes, &[0, 2, 1, e12]);
        assert_eq!(vertices, vec![0, 1, 2]);
        assert_eq!(edges, vec![(0, 2), (1, 2)]);

        let mut report = Report::new(Vec::new());
        report.final_solution_section(&graph, &vertices, &edges).unwrap();
        let out = String::from_utf8(report.finish().unwrap()).unwrap();
        assert_eq!(
            out,
            "SECTION Finalsolution\nVertices 3\nV 1\nV 2\nV 3\nEdges 2\nE 1 3\nE 2 3\nEnd\n"
        );
    }

    #[test]
    fn unwritable_sink() {
        let err = Sink::open("/nonexistent-dir/out.txt").err().unwrap();
        assert_eq!(
            err.to_string(),
            "invalid configuration: Could not open file '/nonexistent-dir/out.txt' for writing"
        );
        assert!(Sink::open("-").unwrap().is_stdout());
    }
}

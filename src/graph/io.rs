use super::*;
use crate::error::{MwcsError, Result};
use log::warn;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

pub use module::ModuleWrite;
pub use node_edge::NodeEdgeRead;
pub use stp::{StpInstance, StpRead};

fn open_reader(path: impl AsRef<Path>) -> Result<BufReader<File>> {
    Ok(BufReader::new(File::open(path)?))
}

fn parse_weight(token: Option<&str>, line: usize, what: &str) -> Result<Weight> {
    let token = token.ok_or_else(|| MwcsError::parse(line, format!("missing {}", what)))?;
    token
        .parse::<Weight>()
        .map_err(|_| MwcsError::parse(line, format!("cannot parse {} '{}'", what, token)))
}

pub mod stp {
    use super::*;

    /// A prize-collecting Steiner tree instance. Node `k` of the file is node `k - 1` of the
    /// graph and carries the label `k`; edge costs are stored as negative edge weights.
    #[derive(Clone, Debug)]
    pub struct StpInstance {
        pub graph: WeightedGraph,
        pub name: String,
        /// Sum of all terminal prizes
        pub total_prize: Weight,
    }

    impl StpInstance {
        /// PCST objective (prizes missed plus edge costs) of a module of MWCS weight `weight`
        pub fn pcst_cost(&self, weight: Weight) -> Weight {
            self.total_prize - weight
        }
    }

    pub trait StpRead: Sized {
        /// Reads the SteinLib dialect used by the DIMACS PCST challenge
        fn try_read_stp<T: BufRead>(reader: T) -> Result<Self>;

        fn try_read_stp_file(path: impl AsRef<Path>) -> Result<Self> {
            Self::try_read_stp(open_reader(path)?)
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum Section {
        None,
        Comment,
        Graph,
        Terminals,
        Other,
    }

    fn parse_node(token: Option<&str>, n: Option<Node>, line: usize) -> Result<Node> {
        let n = n.ok_or_else(|| MwcsError::parse(line, "node referenced before 'Nodes'"))?;
        let token = token.ok_or_else(|| MwcsError::parse(line, "missing node"))?;
        match token.parse::<Node>() {
            Ok(u) if u >= 1 && u <= n => Ok(u - 1),
            _ => Err(MwcsError::parse(line, format!("invalid node '{}'", token))),
        }
    }

    impl StpRead for StpInstance {
        fn try_read_stp<T: BufRead>(reader: T) -> Result<Self> {
            let mut graph = WeightedGraph::new();
            let mut name = String::new();
            let mut total_prize = 0.0;
            let mut n: Option<Node> = None;
            let mut section = Section::None;

            for (i, line) in reader.lines().enumerate() {
                let line_no = i + 1;
                let line = line?;
                let mut tokens = line.split_whitespace();
                let key = match tokens.next() {
                    Some(key) => key,
                    None => continue,
                };

                if key.eq_ignore_ascii_case("EOF") {
                    break;
                }
                if key.eq_ignore_ascii_case("END") {
                    section = Section::None;
                    continue;
                }
                if key.eq_ignore_ascii_case("SECTION") {
                    section = match tokens.next().map(|s| s.to_ascii_lowercase()).as_deref() {
                        Some("comment") => Section::Comment,
                        Some("graph") => Section::Graph,
                        Some("terminals") => Section::Terminals,
                        _ => Section::Other,
                    };
                    continue;
                }

                match section {
                    Section::Comment if key.eq_ignore_ascii_case("Name") => {
                        let rest = line.trim_start()[key.len()..].trim();
                        name = rest.trim_matches('"').to_string();
                    }
                    Section::Graph => match key.to_ascii_lowercase().as_str() {
                        "nodes" => {
                            if n.is_some() {
                                return Err(MwcsError::parse(line_no, "duplicate 'Nodes'"));
                            }
                            let count = tokens
                                .next()
                                .and_then(|t| t.parse::<Node>().ok())
                                .ok_or_else(|| MwcsError::parse(line_no, "invalid node count"))?;
                            for k in 1..=count {
                                graph.add_labeled_node(&k.to_string(), 0.0)?;
                            }
                            n = Some(count);
                        }
                        "e" => {
                            let u = parse_node(tokens.next(), n, line_no)?;
                            let v = parse_node(tokens.next(), n, line_no)?;
                            let cost = parse_weight(tokens.next(), line_no, "edge cost")?;
                            if u == v {
                                return Err(MwcsError::parse(
                                    line_no,
                                    format!("self-loop at node {}", u + 1),
                                ));
                            }
                            graph.add_weighted_edge(u, v, -cost)?;
                        }
                        "edges" | "arcs" => {}
                        _ => {
                            return Err(MwcsError::parse(
                                line_no,
                                format!("unexpected entry '{}' in graph section", key),
                            ))
                        }
                    },
                    Section::Terminals => match key.to_ascii_lowercase().as_str() {
                        "tp" => {
                            let u = parse_node(tokens.next(), n, line_no)?;
                            let prize = parse_weight(tokens.next(), line_no, "prize")?;
                            graph.set_profit(u, prize)?;
                            total_prize += prize;
                        }
                        "terminals" | "t" | "root" => {}
                        _ => {
                            return Err(MwcsError::parse(
                                line_no,
                                format!("unexpected entry '{}' in terminal section", key),
                            ))
                        }
                    },
                    _ => {}
                }
            }

            if n.is_none() {
                return Err(MwcsError::parse(0, "no graph section found"));
            }

            Ok(StpInstance {
                graph,
                name,
                total_prize,
            })
        }
    }
}

pub mod node_edge {
    use super::*;

    fn content_lines<T: BufRead>(reader: T) -> impl Iterator<Item = (usize, std::io::Result<String>)> {
        reader
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line))
            .filter(|(_, line)| match line {
                Ok(line) => {
                    let line = line.trim();
                    !line.is_empty() && !line.starts_with('#')
                }
                Err(_) => true,
            })
    }

    pub trait NodeEdgeRead: Sized {
        /// Reads a node file (`label weight` per line) and an edge file (`label label` with an
        /// optional weight per line). Lines starting with `#` are ignored.
        fn try_read_node_edge<N: BufRead, E: BufRead>(nodes: N, edges: E) -> Result<Self>;

        fn try_read_node_edge_files(
            node_path: impl AsRef<Path>,
            edge_path: impl AsRef<Path>,
        ) -> Result<Self> {
            Self::try_read_node_edge(open_reader(node_path)?, open_reader(edge_path)?)
        }
    }

    impl NodeEdgeRead for WeightedGraph {
        fn try_read_node_edge<N: BufRead, E: BufRead>(nodes: N, edges: E) -> Result<Self> {
            let mut graph = WeightedGraph::new();

            for (line_no, line) in content_lines(nodes) {
                let line = line?;
                let mut tokens = line.split_whitespace();
                let label = tokens
                    .next()
                    .ok_or_else(|| MwcsError::parse(line_no, "missing label"))?;
                let weight = parse_weight(tokens.next(), line_no, "node weight")?;
                graph.add_labeled_node(label, weight).map_err(|_| {
                    MwcsError::parse(line_no, format!("node '{}' is defined more than once", label))
                })?;
            }

            for (line_no, line) in content_lines(edges) {
                let line = line?;
                let mut tokens = line.split_whitespace();
                let mut endpoint = || -> Result<Node> {
                    let label = tokens
                        .next()
                        .ok_or_else(|| MwcsError::parse(line_no, "missing endpoint"))?;
                    graph
                        .node_by_label(label)
                        .ok_or_else(|| MwcsError::parse(line_no, format!("unknown node '{}'", label)))
                };
                let u = endpoint()?;
                let v = endpoint()?;
                let weight = match tokens.next() {
                    Some(token) => Some(parse_weight(Some(token), line_no, "edge weight")?),
                    None => None,
                };

                if u == v {
                    warn!("Ignoring self-loop in line {}", line_no);
                    continue;
                }
                match weight {
                    Some(w) => graph.add_weighted_edge(u, v, w)?,
                    None => {
                        graph.try_add_edge(u, v);
                    }
                }
            }

            Ok(graph)
        }
    }
}

pub mod module {
    use super::*;
    use fxhash::FxHashSet;

    pub trait ModuleWrite {
        /// Writes the nodes of `module` as `label<TAB>profit` followed by the induced edges as
        /// `label<TAB>label`
        fn try_write_module<T: Write>(&self, module: &[Node], writer: T) -> Result<()>;

        /// Writes the Heinz node table: a `#label<TAB>score` header and a line per node with its
        /// profit if it belongs to `module` and `NaN` otherwise
        fn try_write_heinz_table<T: Write>(&self, module: &[Node], writer: T) -> Result<()>;
    }

    impl ModuleWrite for WeightedGraph {
        fn try_write_module<T: Write>(&self, module: &[Node], mut writer: T) -> Result<()> {
            let mut nodes = module.to_vec();
            nodes.sort_unstable();
            nodes.dedup();
            let members: FxHashSet<Node> = nodes.iter().copied().collect();

            for &u in &nodes {
                writeln!(writer, "{}\t{}", self.display_label(u), self.profit(u))?;
            }
            for &u in &nodes {
                for v in self.neighbors_sorted(u) {
                    if u < v && members.contains(&v) {
                        writeln!(writer, "{}\t{}", self.display_label(u), self.display_label(v))?;
                    }
                }
            }
            Ok(())
        }

        fn try_write_heinz_table<T: Write>(&self, module: &[Node], mut writer: T) -> Result<()> {
            let members: FxHashSet<Node> = module.iter().copied().collect();
            writeln!(writer, "#label\tscore")?;
            for u in self.vertices_sorted() {
                if members.contains(&u) {
                    writeln!(writer, "{}\t{}", self.display_label(u), self.profit(u))?;
                } else {
                    writeln!(writer, "{}\tNaN", self.display_label(u))?;
                }
            }
            Ok(())
        }
    }
}

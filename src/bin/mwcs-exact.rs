#![deny(warnings)]

use log::*;
use mwcs::exact::{enumerate_modules, solve_exact, BackOffFunction, SolutionCertificate};
use mwcs::graph::io::{ModuleWrite, NodeEdgeRead};
use mwcs::graph::*;
use mwcs::options::{Options, OptionsBuilder, DEFAULT_MEMORY_LIMIT};
use mwcs::report::Sink;
use std::fmt::Display;
use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use structopt::StructOpt;

#[cfg(feature = "jemallocator")]
#[cfg(not(target_env = "msvc"))]
use jemallocator::Jemalloc;

#[cfg(feature = "jemallocator")]
#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "mwcs-exact",
    about = "Computes a maximum-weight connected subgraph of a node-weighted graph."
)]
struct Opt {
    /// Node file with `label weight` lines
    #[structopt(short, long, parse(from_os_str))]
    nodes: PathBuf,

    /// Edge file with `label label` lines
    #[structopt(short, long, parse(from_os_str))]
    edges: PathBuf,

    /// Label of the root node; unrooted if not given
    #[structopt(short, long)]
    root: Option<String>,

    /// Time limit in seconds
    #[structopt(short, long)]
    time: Option<u64>,

    /// Number of threads
    #[structopt(short = "T", long, default_value = "1")]
    threads: usize,

    /// Number of node-disjoint modules to report (unrooted only)
    #[structopt(short = "k", long, default_value = "1")]
    modules: usize,

    /// Back-off function of the separation: 0 constant, 1 linear, 2 quadratic, 3 exponential
    #[structopt(short, long, default_value = "1")]
    backoff: usize,

    /// Output file; `-` for stdout
    #[structopt(short, long, default_value = "-")]
    output: String,

    /// Verbose mode (-v, -vv, -vvv, etc.)
    #[structopt(short, long, parse(from_occurrences))]
    verbose: usize,

    /// Disables preprocessing
    #[structopt(short = "p", long)]
    no_preprocessing: bool,
}

fn fail(message: impl Display) -> ! {
    eprintln!("{}", message);
    std::process::exit(1)
}

fn main() {
    let opt = Opt::from_args();
    mwcs::log::build_logger_for_verbosity(LevelFilter::Warn, opt.verbose);

    if opt.threads == 0 {
        fail(format!("Invalid thread count '{}'", opt.threads));
    }
    if opt.time == Some(0) {
        fail("Invalid timelimit '0'");
    }
    let backoff = BackOffFunction::from_index(opt.backoff)
        .unwrap_or_else(|| fail(format!("Invalid back-off function '{}'", opt.backoff)));

    let mut sink = Sink::open(&opt.output)
        .unwrap_or_else(|_| fail(format!("Could not open file '{}' for writing", opt.output)));

    let graph = WeightedGraph::try_read_node_edge_files(&opt.nodes, &opt.edges)
        .unwrap_or_else(|e| fail(e));
    info!(
        "Input graph with n={}, m={}",
        graph.number_of_nodes(),
        graph.number_of_edges()
    );

    let root = opt.root.as_ref().map(|label| {
        graph
            .node_by_label(label)
            .unwrap_or_else(|| fail(format!("Root '{}' is not a node of the graph", label)))
    });

    let mut builder = OptionsBuilder::default();
    builder
        .threads(opt.threads)
        .memory_limit(DEFAULT_MEMORY_LIMIT)
        .backoff(backoff)
        .preprocess(!opt.no_preprocessing);
    if let Some(time) = opt.time {
        builder.time_limit(Duration::from_secs(time));
    }
    if let Some(root) = root {
        builder.root(root);
    }
    let options = builder.finish().unwrap_or_else(|e| fail(e));

    let start = Instant::now();
    let certificates = solve(&graph, &options, opt.modules).unwrap_or_else(|e| fail(e));
    info!("Solved in {:?}", start.elapsed());

    if let Err(e) = write_modules(&graph, &certificates, &mut sink) {
        fail(e);
    }
}

fn solve(
    graph: &WeightedGraph,
    options: &Options,
    modules: usize,
) -> mwcs::error::Result<Vec<SolutionCertificate>> {
    if options.root.is_some() || modules <= 1 {
        return Ok(vec![solve_exact(graph, options)?]);
    }
    enumerate_modules(graph, options, modules)
}

fn write_modules(
    graph: &WeightedGraph,
    certificates: &[SolutionCertificate],
    sink: &mut Sink,
) -> mwcs::error::Result<()> {
    for (i, certificate) in certificates.iter().enumerate() {
        if !certificate.is_optimal() {
            warn!(
                "Module {} stopped with status {:?}; the bound may not be tight",
                i, certificate.status
            );
        }
        writeln!(
            sink,
            "# Module {}: weight {:.9} bound {:.9} status {:?}",
            i, certificate.weight, certificate.upper_bound, certificate.status
        )?;
        graph.try_write_module(&certificate.module, &mut *sink)?;
    }
    sink.flush()?;
    Ok(())
}

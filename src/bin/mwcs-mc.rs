#![deny(warnings)]

use fxhash::FxHashMap;
use log::*;
use mwcs::algorithm::IterativeAlgorithm;
use mwcs::error::MwcsError;
use mwcs::graph::io::{ModuleWrite, NodeEdgeRead};
use mwcs::graph::*;
use mwcs::heuristics::{BumModel, EdgeHeuristic, NegHubAnalysis, TreeHeuristicSolver};
use mwcs::kernelization::{reduce_graph, ReductionRecord};
use mwcs::report::Sink;
use std::fmt::Display;
use std::io::{stdout, Write};
use std::path::PathBuf;
use std::time::Instant;
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
    name = "mwcs-mc",
    about = "Monte Carlo tree heuristic for the maximum-weight connected subgraph problem."
)]
struct Opt {
    /// Node file with `label weight` lines
    #[structopt(short, parse(from_os_str))]
    n: PathBuf,

    /// Edge list file
    #[structopt(short, parse(from_os_str))]
    e: PathBuf,

    /// Verbosity level: 0 no output, 1 only necessary output, 2 more verbose output, 3 debug
    /// output
    #[structopt(short = "v", long = "verbosity", default_value = "2")]
    verbosity: usize,

    /// Label of the root node (optional)
    #[structopt(short = "r")]
    root: Option<String>,

    /// Number of Monte Carlo iterations
    #[structopt(short = "m", default_value = "100")]
    iterations: usize,

    /// Edge heuristic: 0 uniform, 1 random, 2 profit, 3 profit-random
    #[structopt(short = "h", default_value = "3")]
    heuristic: usize,

    /// Disable preprocessing
    #[structopt(short = "p")]
    no_preprocessing: bool,

    /// Disable negative hubs sampling
    #[structopt(short = "z")]
    no_analysis: bool,

    /// BUM mixture parameter
    #[structopt(long)]
    lambda: Option<f64>,

    /// BUM shape parameter
    #[structopt(short = "a")]
    a: Option<f64>,

    /// False discovery rate
    #[structopt(long = "FDR")]
    fdr: Option<f64>,

    /// Output file for the node table; `-` prints the table instead of the module
    #[structopt(short = "o")]
    output: Option<String>,

    /// Seed of the edge cost randomisation
    #[structopt(short = "s", long, default_value = "0")]
    seed: u64,
}

fn fail(message: impl Display) -> ! {
    eprintln!("{}", message);
    std::process::exit(1)
}

fn fail_with(error: MwcsError) -> ! {
    match error {
        MwcsError::Config(message) => fail(message),
        e => fail(e),
    }
}

fn main() {
    let opt = Opt::from_args();
    mwcs::log::build_logger_for_level(mwcs::log::level_from_cli_verbosity(opt.verbosity));

    let bum = match (opt.lambda, opt.a, opt.fdr) {
        (Some(lambda), Some(a), Some(fdr)) => {
            Some(BumModel::new(lambda, a, fdr).unwrap_or_else(|e| fail_with(e)))
        }
        _ => None,
    };
    let heuristic = EdgeHeuristic::from_index(opt.heuristic)
        .unwrap_or_else(|| fail(format!("Invalid heuristic '{}'", opt.heuristic)));

    let table_sink = match opt.output.as_deref() {
        Some(target) => Some(
            Sink::open(target)
                .unwrap_or_else(|_| fail(format!("Could not open file '{}' for writing", target))),
        ),
        None => None,
    };

    let mut graph =
        WeightedGraph::try_read_node_edge_files(&opt.n, &opt.e).unwrap_or_else(|e| fail_with(e));
    if let Some(bum) = &bum {
        bum.score_graph(&mut graph).unwrap_or_else(|e| fail_with(e));
    }
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

    // edge costs become nodes of their own
    let (search_graph, edge_nodes) = if graph.number_of_weighted_edges() > 0 {
        graph.subdivide_edge_costs().unwrap_or_else(|e| fail_with(e))
    } else {
        (graph.clone(), FxHashMap::default())
    };

    let start = Instant::now();
    let (reduced, record) = if opt.no_preprocessing {
        (search_graph.clone(), ReductionRecord::default())
    } else {
        reduce_graph(search_graph.clone(), root, None).unwrap_or_else(|e| fail_with(e))
    };
    info!(
        "Preprocessed graph with n={}, m={}",
        reduced.number_of_nodes(),
        reduced.number_of_edges()
    );

    let mut solver = TreeHeuristicSolver::new(&reduced, root, heuristic, opt.iterations, opt.seed)
        .unwrap_or_else(|e| fail_with(e));
    if !opt.no_analysis {
        let analysis = NegHubAnalysis::analyze(&reduced);
        println!(
            "// Number of beneficial negative hubs: {}",
            analysis.number_of_beneficial_hubs()
        );
        solver = solver.with_analysis(analysis);
    }

    while !solver.is_completed() {
        eprint!("\rIteration {}: ", solver.iteration());
        solver.execute_step();
        eprint!("{}", solver.best_known_solution_weight().unwrap_or(f64::NAN));
    }
    eprintln!();

    let module = solver
        .best_known_solution()
        .map(|m| m.to_vec())
        .unwrap_or_default();
    let weight = solver
        .best_known_solution_weight()
        .unwrap_or_else(|| reduced.weight_of(&module));
    let (module, weight) = record.finalize(&module, weight);
    let (module, weight) = if edge_nodes.is_empty() {
        (module, weight)
    } else {
        search_graph.project_subdivided_module(&edge_nodes, &module)
    };

    if let Err(e) = write_output(&graph, &module, table_sink) {
        fail_with(e);
    }

    eprintln!("Score: {}", weight);
    eprintln!("Time: {}s", start.elapsed().as_secs_f64());
}

fn write_output(
    graph: &WeightedGraph,
    module: &[Node],
    table_sink: Option<Sink>,
) -> mwcs::error::Result<()> {
    match table_sink {
        Some(mut sink) if sink.is_stdout() => {
            graph.try_write_heinz_table(module, &mut sink)?;
            sink.flush()?;
        }
        Some(mut sink) => {
            graph.try_write_heinz_table(module, &mut sink)?;
            sink.flush()?;
            graph.try_write_module(module, stdout().lock())?;
        }
        None => graph.try_write_module(module, stdout().lock())?,
    }
    Ok(())
}

#![deny(warnings)]

use log::*;
use mwcs::exact::{solve_exact, BackOffFunction, BoundEvent};
use mwcs::graph::io::{StpInstance, StpRead};
use mwcs::graph::*;
use mwcs::options::{OptionsBuilder, DEFAULT_MEMORY_LIMIT};
use mwcs::report::{pcst_solution, Report, Sink};
use std::fmt::Display;
use std::time::{Duration, Instant};
use structopt::clap::ErrorKind;
use structopt::StructOpt;

#[cfg(feature = "jemallocator")]
#[cfg(not(target_env = "msvc"))]
use jemallocator::Jemalloc;

#[cfg(feature = "jemallocator")]
#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

const PROBLEM: &str = "PCST";
const METHOD: &str = "heinz-pcst";

#[derive(Debug, StructOpt)]
#[structopt(
    name = "heinz-pcst",
    about = "Solves a prize-collecting Steiner tree instance exactly via its maximum-weight connected subgraph formulation."
)]
struct Opt {
    /// Input file in the STP format of the DIMACS challenge
    filename: String,

    /// Time limit in seconds
    time: String,

    /// Number of threads
    threads: String,

    /// Output file; `-` for stdout
    outputfile: String,
}

fn fail(message: impl Display) -> ! {
    eprintln!("{}", message);
    std::process::exit(1)
}

fn parse_positive(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok().filter(|&x| x > 0)
}

fn main() {
    let opt = match Opt::from_iter_safe(std::env::args_os()) {
        Ok(opt) => opt,
        Err(e) if matches!(e.kind, ErrorKind::HelpDisplayed | ErrorKind::VersionDisplayed) => {
            e.exit()
        }
        Err(_) => fail("Usage: heinz-pcst filename time threads outputfile"),
    };

    mwcs::log::build_logger_for_verbosity(LevelFilter::Warn, 0);

    let time_limit = parse_positive(&opt.time)
        .unwrap_or_else(|| fail(format!("Invalid timelimit '{}'", opt.time)));
    let threads = parse_positive(&opt.threads)
        .unwrap_or_else(|| fail(format!("Invalid thread count '{}'", opt.threads)));

    let sink = Sink::open(&opt.outputfile)
        .unwrap_or_else(|_| fail(format!("Could not open file '{}' for writing", opt.outputfile)));

    let instance = StpInstance::try_read_stp_file(&opt.filename)
        .unwrap_or_else(|e| fail(format!("Could not read '{}': {}", opt.filename, e)));
    info!(
        "Read instance '{}' with n={}, m={}",
        instance.name,
        instance.graph.number_of_nodes(),
        instance.graph.number_of_edges()
    );

    let options = OptionsBuilder::default()
        .time_limit(Duration::from_secs(time_limit))
        .threads(threads as usize)
        .memory_limit(DEFAULT_MEMORY_LIMIT)
        .backoff(BackOffFunction::Linear)
        .max_cuts_per_round(10usize)
        .finish()
        .unwrap_or_else(|e| fail(e));

    if let Err(e) = run(&instance, &options, sink) {
        fail(e);
    }
}

fn run(
    instance: &StpInstance,
    options: &mwcs::options::Options,
    sink: Sink,
) -> mwcs::error::Result<()> {
    let start = Instant::now();
    let mut report = Report::new(sink);
    report.comment_section(&instance.name, PROBLEM, METHOD, env!("CARGO_PKG_VERSION"))?;

    let (graph, edge_nodes) = instance.graph.subdivide_weighted_edges();
    info!(
        "Subdivided graph with n={}, m={}",
        graph.number_of_nodes(),
        graph.number_of_edges()
    );

    let certificate = solve_exact(&graph, options)?;
    if !certificate.is_optimal() {
        warn!(
            "Stopped with status {:?}; the dual bound may not be tight",
            certificate.status
        );
    }

    let trace: Vec<BoundEvent> = certificate
        .trace
        .iter()
        .map(|e| BoundEvent {
            weight: instance.pcst_cost(e.weight),
            bound: instance.pcst_cost(e.bound),
        })
        .collect();
    report.solutions_section(&trace)?;

    report.run_section(
        options.threads,
        start.elapsed().as_secs_f64(),
        instance.pcst_cost(certificate.weight),
        instance.pcst_cost(certificate.upper_bound).max(-1e20),
        certificate.status,
    )?;

    let (vertices, edges) = pcst_solution(&instance.graph, &edge_nodes, &certificate.module);
    report.final_solution_section(&instance.graph, &vertices, &edges)?;
    report.finish()?;

    info!("Done");
    Ok(())
}

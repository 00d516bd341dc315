use mwcs::exact::*;
use mwcs::graph::io::{ModuleWrite, NodeEdgeRead, StpInstance, StpRead};
use mwcs::graph::*;
use mwcs::heuristics::{BumModel, EdgeHeuristic, TreeHeuristic};
use mwcs::options::{Options, OptionsBuilder};
use mwcs::report::{pcst_solution, Report};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use std::time::Duration;

const NODES: &str = "# label weight
A 5
B -2
C 3
D -10
";

const EDGES: &str = "A B
B C
C D
";

fn example() -> WeightedGraph {
    WeightedGraph::try_read_node_edge(NODES.as_bytes(), EDGES.as_bytes()).unwrap()
}

fn random_graph(rng: &mut Pcg64, n: usize, p: f64) -> WeightedGraph {
    let profits: Vec<Weight> = (0..n).map(|_| rng.gen_range(-6..=6) as Weight).collect();
    let mut graph = WeightedGraph::from_profits_and_edges(&profits, &[]).unwrap();
    for u in 0..n as Node {
        for v in (u + 1)..n as Node {
            if rng.gen_bool(p) {
                graph.add_edge(u, v).unwrap();
            }
        }
    }
    graph
}

fn labels(graph: &WeightedGraph, module: &[Node]) -> Vec<String> {
    module.iter().map(|&u| graph.display_label(u)).collect()
}

#[test]
fn example_unrooted() {
    let graph = example();
    let certificate = solve_exact(&graph, &Options::default()).unwrap();
    assert_eq!(labels(&graph, &certificate.module), vec!["A", "B", "C"]);
    assert_eq!(certificate.weight, 6.0);
    assert_eq!(certificate.upper_bound, 6.0);
    assert!(certificate.is_optimal());
}

#[test]
fn example_rooted_at_d() {
    let graph = example();
    let d = graph.node_by_label("D").unwrap();
    for preprocess in [true, false] {
        let options = OptionsBuilder::default()
            .root(d)
            .preprocess(preprocess)
            .build()
            .unwrap();
        let certificate = solve_exact(&graph, &options).unwrap();
        assert_eq!(labels(&graph, &certificate.module), vec!["A", "B", "C", "D"]);
        assert_eq!(certificate.weight, -4.0);
        assert!(certificate.is_optimal());
    }
}

#[test]
fn example_module_listing() {
    let graph = example();
    let certificate = solve_exact(&graph, &Options::default()).unwrap();
    let mut out = Vec::new();
    graph.try_write_module(&certificate.module, &mut out).unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "A\t5\nB\t-2\nC\t3\nA\tB\nB\tC\n"
    );
}

#[test]
fn weighted_edge_file() {
    let nodes = "A 5\nB 5\nC 1\n";
    let edges = "A B -20\nB C -0.5\n";
    let graph = WeightedGraph::try_read_node_edge(nodes.as_bytes(), edges.as_bytes()).unwrap();

    let certificate = solve_exact(&graph, &Options::default()).unwrap();
    assert_eq!(labels(&graph, &certificate.module), vec!["B", "C"]);
    assert!((certificate.weight - 5.5).abs() < 1e-9);
    assert!(certificate.is_optimal());

    let mut out = Vec::new();
    graph.try_write_module(&certificate.module, &mut out).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "B\t5\nC\t1\nB\tC\n");

    let positive = WeightedGraph::try_read_node_edge(nodes.as_bytes(), "A B 2\n".as_bytes()).unwrap();
    assert!(solve_exact(&positive, &Options::default()).is_err());
}

#[test]
fn unrooted_equals_best_rooted() {
    let mut rng = Pcg64::seed_from_u64(12);
    for _ in 0..20 {
        let n = rng.gen_range(2..10);
        let graph = random_graph(&mut rng, n, 0.35);
        let unrooted = solve_exact(&graph, &Options::default()).unwrap();

        let best_rooted = graph
            .vertices_sorted()
            .into_iter()
            .map(|r| {
                solve_exact(&graph, &Options::default().with_root(Some(r)))
                    .unwrap()
                    .weight
            })
            .fold(0.0, Weight::max);

        assert!((unrooted.weight - best_rooted).abs() < 1e-6);
        assert!(graph.is_connected_set(&unrooted.module).unwrap());
    }
}

#[test]
fn traces_are_monotone() {
    let mut rng = Pcg64::seed_from_u64(77);
    for i in 0..20 {
        let graph = random_graph(&mut rng, 9, 0.3);
        let options = OptionsBuilder::default()
            .preprocess(i % 2 == 0)
            .root(0)
            .build()
            .unwrap();
        let certificate = solve_exact(&graph, &options).unwrap();
        assert!(!certificate.trace.is_empty());
        for pair in certificate.trace.windows(2) {
            assert!(pair[0].weight <= pair[1].weight + 1e-9);
            assert!(pair[0].bound >= pair[1].bound - 1e-9);
        }
        assert!(certificate.module.contains(&0));
    }
}

#[test]
fn zero_time_limit() {
    let options = OptionsBuilder::default()
        .preprocess(false)
        .time_limit(Duration::from_secs(0))
        .build()
        .unwrap();
    let certificate = solve_exact(&example(), &options).unwrap();
    assert_eq!(certificate.status, SolveStatus::TimeLimit);
    assert!(certificate.upper_bound >= certificate.weight);
}

#[test]
fn tiny_memory_limit() {
    // the greedy start cannot cross the negative node, so the root alone is the incumbent
    let graph = WeightedGraph::from_profits_and_edges(&[0.0, -1.0, 10.0], &[(0, 1), (1, 2)]).unwrap();
    let options = OptionsBuilder::default()
        .preprocess(false)
        .memory_limit(1usize)
        .root(0)
        .build()
        .unwrap();
    let certificate = solve_exact(&graph, &options).unwrap();
    assert_eq!(certificate.status, SolveStatus::MemoryLimit);
    assert_eq!(certificate.module, vec![0]);
    assert_eq!(certificate.upper_bound, 10.0);
}

#[test]
fn disjoint_modules() {
    let graph = WeightedGraph::from_profits_and_edges(
        &[2.0, -9.0, 4.0, -9.0, 1.0],
        &[(0, 1), (1, 2), (2, 3), (3, 4)],
    )
    .unwrap();
    let modules = enumerate_modules(&graph, &Options::default(), 10).unwrap();
    let weights: Vec<Weight> = modules.iter().map(|c| c.weight).collect();
    assert_eq!(weights, vec![4.0, 2.0, 1.0]);
    assert_eq!(modules[0].module, vec![2]);
}

#[test]
fn heuristic_is_reproducible_and_feasible() {
    let mut rng = Pcg64::seed_from_u64(5);
    let graph = random_graph(&mut rng, 12, 0.3);
    let options = OptionsBuilder::default().seed(42u64).build().unwrap();

    let first = TreeHeuristic::new(&options, EdgeHeuristic::ProfitRandom, 30)
        .solve_unrooted(&graph)
        .unwrap();
    let second = TreeHeuristic::new(&options, EdgeHeuristic::ProfitRandom, 30)
        .solve_unrooted(&graph)
        .unwrap();
    assert_eq!(first.module, second.module);
    assert_eq!(first.weight, second.weight);

    let exact = solve_exact(&graph, &Options::default()).unwrap();
    assert!(first.weight <= exact.weight + 1e-6);
    assert!(graph.is_connected_set(&first.module).unwrap());
    assert!((graph.weight_of(&first.module) - first.weight).abs() < 1e-6);
}

#[test]
fn bum_scored_pipeline() {
    let nodes = "A 1e-8\nB 0.9\nC 1e-6\n";
    let edges = "A B\nB C\n";
    let mut graph = WeightedGraph::try_read_node_edge(nodes.as_bytes(), edges.as_bytes()).unwrap();
    BumModel::new(0.5, 0.25, 0.1)
        .unwrap()
        .score_graph(&mut graph)
        .unwrap();

    let certificate = solve_exact(&graph, &Options::default()).unwrap();
    assert!(certificate.weight > 0.0);
    assert!(certificate.module.contains(&graph.node_by_label("A").unwrap()));
}

const STP: &str = "33D32945 STP File, STP Format Version 1.0

SECTION Comment
Name \"tiny\"
END

SECTION Graph
Nodes 4
Edges 3
E 1 2 1.5
E 2 3 2
E 3 4 1
END

SECTION Terminals
Terminals 2
TP 1 5
TP 3 4
END

EOF
";

#[test]
fn pcst_pipeline() {
    let instance = StpInstance::try_read_stp(STP.as_bytes()).unwrap();
    let (graph, edge_nodes) = instance.graph.subdivide_weighted_edges();
    let certificate = solve_exact(&graph, &Options::default()).unwrap();

    // prizes 5 + 4 minus edge costs 1.5 + 2
    assert!((certificate.weight - 5.5).abs() < 1e-9);
    assert!((instance.pcst_cost(certificate.weight) - 3.5).abs() < 1e-9);

    let (vertices, edges) = pcst_solution(&instance.graph, &edge_nodes, &certificate.module);
    assert_eq!(vertices, vec![0, 1, 2]);
    assert_eq!(edges, vec![(0, 1), (1, 2)]);

    let mut report = Report::new(Vec::new());
    report.comment_section(&instance.name, "PCST", "heinz-pcst", "0.1.0").unwrap();
    report
        .run_section(
            1,
            0.0,
            instance.pcst_cost(certificate.weight),
            instance.pcst_cost(certificate.upper_bound),
            certificate.status,
        )
        .unwrap();
    report
        .final_solution_section(&instance.graph, &vertices, &edges)
        .unwrap();
    let out = String::from_utf8(report.finish().unwrap()).unwrap();

    assert!(out.contains("Name \"tiny\""));
    assert!(out.contains("Primal 3.500000000\n"));
    assert!(out.contains("Status Optimal\n"));
    assert!(out.ends_with("Vertices 3\nV 1\nV 2\nV 3\nEdges 2\nE 1 2\nE 2 3\nEnd\n"));
}

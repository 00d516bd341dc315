use super::backoff::{BackOff, SeparationSchedule};
use super::bb_stats::BBStats;
use super::engine::*;
use super::separation::{ConnectivitySeparator, SeparationStats};
use super::*;
use crate::error::MwcsError;
use crate::options::Options;
use itertools::Itertools;
use log::{debug, warn};
use std::time::Instant;

/// Cutting-plane solver for the rooted problem. One binary variable per node of the root's
/// component; connectivity is enforced by node-separator cuts that `E` requests through the
/// callback. Fractional separation is paced by `S`.
pub struct CutSolverRooted<E: MipEngine = SimplexBranchAndCut, S: SeparationSchedule = BackOff> {
    options: Options,
    engine: E,
    schedule: S,
    solution: Option<SolutionCertificate>,
    separation_stats: SeparationStats,
}

impl CutSolverRooted {
    pub fn new(options: &Options) -> Self {
        Self::with_parts(
            options,
            SimplexBranchAndCut::new(),
            BackOff::new(options.backoff),
        )
    }
}

impl<E: MipEngine, S: SeparationSchedule> CutSolverRooted<E, S> {
    pub fn with_parts(options: &Options, engine: E, schedule: S) -> Self {
        Self {
            options: options.clone(),
            engine,
            schedule,
            solution: None,
            separation_stats: SeparationStats::default(),
        }
    }

    pub fn engine_stats(&self) -> &BBStats {
        self.engine.stats()
    }

    pub fn separation_stats(&self) -> &SeparationStats {
        &self.separation_stats
    }
}

/// Relabels the component of `root` to the ids `0..n` (sorted by original id)
fn dense_component(graph: &WeightedGraph, root: Node) -> Result<(WeightedGraph, NodeMapper)> {
    let component = graph.component_of(root)?;
    let mapper = NodeMapper::densify(&component);

    let profits = component.iter().map(|&u| graph.profit(u)).collect_vec();
    let edges = component
        .iter()
        .flat_map(|&u| {
            graph
                .neighbors(u)
                .filter(move |&v| u < v)
                .map(move |v| (u, v))
        })
        .filter_map(|(u, v)| Some((mapper.new_id_of(u)?, mapper.new_id_of(v)?)))
        .collect_vec();

    Ok((WeightedGraph::from_profits_and_edges(&profits, &edges)?, mapper))
}

/// Grows a connected module from the root by repeatedly adding the most profitable adjacent
/// node with non-negative profit.
fn greedy_module(graph: &WeightedGraph, root: Node) -> Vec<bool> {
    let mut selected = vec![false; graph.len()];
    selected[root as usize] = true;
    let mut frontier = graph.neighbors_sorted(root);

    loop {
        let best = frontier
            .iter()
            .copied()
            .filter(|&v| !selected[v as usize] && graph.profit(v) >= 0.0)
            .max_by(|&a, &b| {
                graph
                    .profit(a)
                    .partial_cmp(&graph.profit(b))
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(b.cmp(&a))
            });

        match best {
            Some(v) => {
                selected[v as usize] = true;
                frontier.extend(graph.neighbors(v).filter(|&w| !selected[w as usize]));
            }
            None => return selected,
        }
    }
}

fn build_model(graph: &WeightedGraph, root: Node, degree_constraints: bool) -> Model {
    let n = graph.len();
    let mut model = Model::binary((0..n as Node).map(|u| graph.profit(u)).collect());
    model.fix(root as VarIndex, 1.0);

    if degree_constraints {
        for v in (0..n as Node).filter(|&v| v != root) {
            let coefficients = std::iter::once((v as VarIndex, 1.0))
                .chain(graph.neighbors_sorted(v).into_iter().map(|w| (w as VarIndex, -1.0)))
                .collect();
            model.add_constraint(LinearCut::new(coefficients, 0.0));
        }
    }
    model
}

/// Glue between the engine and the separator
struct ConnectivityCallback<'a, 'g, S: SeparationSchedule> {
    separator: ConnectivitySeparator<'g>,
    schedule: &'a mut S,
    separate_fractional: bool,
    trace: Vec<BoundEvent>,
}

impl<'a, 'g, S: SeparationSchedule> ConnectivityCallback<'a, 'g, S> {
    fn record(&mut self, weight: Weight, bound: Weight) {
        let event = match self.trace.last() {
            Some(last) => BoundEvent {
                weight: weight.max(last.weight),
                bound: bound.min(last.bound),
            },
            None => BoundEvent { weight, bound },
        };
        if self.trace.last() != Some(&event) {
            self.trace.push(event);
        }
    }
}

impl<'a, 'g, S: SeparationSchedule> CutCallback for ConnectivityCallback<'a, 'g, S> {
    fn separate(&mut self, x: &[f64], integral: bool) -> Vec<LinearCut> {
        if integral {
            self.separator.separate_integral(x)
        } else if self.separate_fractional && self.schedule.make_attempt() {
            self.separator.separate_fractional(x)
        } else {
            Vec::new()
        }
    }

    fn on_incumbent(&mut self, value: f64, bound: f64) {
        debug!("Incumbent {} (bound {})", value, bound);
        self.record(value, bound);
    }
}

impl<E: MipEngine, S: SeparationSchedule> SolutionAccess for CutSolverRooted<E, S> {
    fn solution(&self) -> Option<&SolutionCertificate> {
        self.solution.as_ref()
    }
}

impl<E: MipEngine, S: SeparationSchedule> RootedSolver for CutSolverRooted<E, S> {
    fn solve_rooted(&mut self, graph: &WeightedGraph, root: Node) -> Result<SolutionCertificate> {
        if !graph.has_vertex(root) {
            return Err(MwcsError::InvalidReference(root));
        }
        let deadline = self.options.deadline_from(Instant::now());

        let (dense, mapper) = dense_component(graph, root)?;
        let dense_root = mapper
            .new_id_of(root)
            .ok_or(MwcsError::InvalidReference(root))?;
        debug!(
            "Rooted solve at {} on component with {} nodes and {} edges",
            root,
            dense.number_of_nodes(),
            dense.number_of_edges()
        );

        let strategy = self.options.cut_strategy;
        self.engine
            .load(build_model(&dense, dense_root, strategy.degree_constraints));
        self.engine.set_limits(Limits {
            deadline,
            memory_limit: self.options.memory_limit,
            threads: self.options.threads,
        });

        let start_module = if strategy.primal_heuristic {
            greedy_module(&dense, dense_root)
        } else {
            (0..dense.len()).map(|u| u == dense_root as usize).collect()
        };
        let x: Vec<f64> = start_module
            .iter()
            .map(|&s| if s { 1.0 } else { 0.0 })
            .collect();
        let value = (0..dense.len() as Node)
            .filter(|&u| start_module[u as usize])
            .map(|u| dense.profit(u))
            .sum();
        self.engine.set_incumbent(x, value);

        self.schedule.reset();
        let mut callback = ConnectivityCallback {
            separator: ConnectivitySeparator::new(
                &dense,
                dense_root,
                self.options.max_cuts_per_round,
            ),
            schedule: &mut self.schedule,
            separate_fractional: strategy.separate_fractional,
            trace: Vec::new(),
        };
        let initial_bound: Weight = (0..dense.len() as Node)
            .filter(|&u| u != dense_root)
            .map(|u| dense.profit(u).max(0.0))
            .sum::<Weight>()
            + dense.profit(dense_root);
        callback.record(value, initial_bound.max(value));

        let status = match self.engine.solve(&mut callback)? {
            EngineStatus::Optimal => SolveStatus::Optimal,
            EngineStatus::TimeLimit => SolveStatus::TimeLimit,
            EngineStatus::MemoryLimit => SolveStatus::MemoryLimit,
            EngineStatus::Infeasible => {
                return Err(MwcsError::Engine(format!(
                    "no connected module contains root {}",
                    root
                )))
            }
        };
        if status != SolveStatus::Optimal {
            warn!("Rooted solve at {} stopped early: {:?}", root, status);
        }

        let (x, _) = self
            .engine
            .incumbent()
            .ok_or_else(|| MwcsError::Engine("engine lost the incumbent".into()))?;
        let module = mapper.get_old_ids(
            (0..dense.len() as Node).filter(|&u| x[u as usize] > 0.5),
        );
        let module = module.into_iter().sorted().collect_vec();
        let weight = graph.weight_of(&module);

        let upper_bound = match status {
            SolveStatus::Optimal => weight,
            _ => self.engine.best_bound().max(weight),
        };
        callback.record(weight, upper_bound);

        self.separation_stats = callback.separator.stats().clone();
        let stats = self.engine.stats();
        debug!(
            "Rooted solve at {} done: weight {} bound {} nodes {} LPs {} cuts {} ({:?})",
            root,
            weight,
            upper_bound,
            stats.nodes,
            stats.lp_solves,
            stats.cuts_added,
            self.separation_stats
        );

        let certificate = SolutionCertificate {
            module,
            weight,
            upper_bound,
            status,
            trace: callback.trace,
        };
        self.solution = Some(certificate.clone());
        Ok(certificate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exact::backoff::AlwaysSeparate;
    use crate::graph::weighted_graph::tests::path_graph;
    use crate::options::{CutStrategy, OptionsBuilder};
    use crate::testing::*;
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg64;
    use std::time::Duration;

    #[test]
    fn path_rooted() {
        let mut solver = CutSolverRooted::new(&Options::default());
        let certificate = solver.solve_rooted(&path_graph(), 3).unwrap();
        assert_eq!(certificate.module, vec![0, 1, 2, 3]);
        assert_eq!(certificate.weight, -4.0);
        assert!(certificate.is_optimal());
        assert_eq!(solver.solution_weight(), Some(-4.0));
        assert_eq!(solver.solution_weight_upper_bound(), Some(-4.0));
        assert_eq!(solver.solution_module(), Some(&[0, 1, 2, 3][..]));

        let certificate = solver.solve_rooted(&path_graph(), 0).unwrap();
        assert_eq!(certificate.module, vec![0, 1, 2]);
        assert_eq!(certificate.weight, 6.0);
    }

    #[test]
    fn stays_in_root_component() {
        let graph =
            WeightedGraph::from_profits_and_edges(&[1.0, 2.0, 10.0, 10.0], &[(0, 1), (2, 3)])
                .unwrap();
        let certificate = CutSolverRooted::new(&Options::default())
            .solve_rooted(&graph, 1)
            .unwrap();
        assert_eq!(certificate.module, vec![0, 1]);
        assert_eq!(certificate.weight, 3.0);
    }

    #[test]
    fn invalid_root() {
        let mut solver = CutSolverRooted::new(&Options::default());
        assert!(matches!(
            solver.solve_rooted(&path_graph(), 9),
            Err(MwcsError::InvalidReference(9))
        ));
        assert!(solver.solution().is_none());
    }

    #[test]
    fn greedy_is_connected() {
        let graph = path_graph();
        assert_eq!(greedy_module(&graph, 0), vec![true, false, false, false]);
        assert_eq!(greedy_module(&graph, 2), vec![false, false, true, false]);
    }

    #[test]
    fn time_limit_keeps_incumbent() {
        let mut rng = Pcg64::seed_from_u64(3);
        let graph = random_graph(&mut rng, 12, 0.3);
        let options = OptionsBuilder::default()
            .time_limit(Duration::from_secs(0))
            .build()
            .unwrap();
        let certificate = CutSolverRooted::new(&options).solve_rooted(&graph, 0).unwrap();
        assert!(certificate.module.contains(&0));
        assert!(graph.is_connected_set(&certificate.module).unwrap());
        assert!(certificate.upper_bound >= certificate.weight);
        if certificate.status != SolveStatus::Optimal {
            assert_eq!(certificate.status, SolveStatus::TimeLimit);
        }
    }

    #[test]
    fn memory_limit() {
        let mut rng = Pcg64::seed_from_u64(5);
        let graph = random_graph(&mut rng, 12, 0.4);
        let options = OptionsBuilder::default().memory_limit(1usize).build().unwrap();
        let certificate = CutSolverRooted::new(&options).solve_rooted(&graph, 0).unwrap();
        assert!(certificate.module.contains(&0));
        assert!(graph.is_connected_set(&certificate.module).unwrap());
        assert!(certificate.upper_bound >= certificate.weight);
    }

    #[test]
    fn relaxation_exceeding_memory_limit() {
        // the model itself is small, the dense tableau of a 400 node path is megabytes
        let profits: Vec<Weight> = (0..400)
            .map(|i| if i % 2 == 0 { 2.0 } else { -1.0 })
            .collect();
        let edges: Vec<Edge> = (0..399).map(|i| (i, i + 1)).collect();
        let graph = WeightedGraph::from_profits_and_edges(&profits, &edges).unwrap();
        let options = OptionsBuilder::default()
            .memory_limit(200_000usize)
            .build()
            .unwrap();
        let mut solver = CutSolverRooted::new(&options);
        let certificate = solver.solve_rooted(&graph, 0).unwrap();
        assert_eq!(certificate.status, SolveStatus::MemoryLimit);
        assert_eq!(solver.engine_stats().lp_solves, 0);
        assert!(certificate.module.contains(&0));
        assert!(graph.is_connected_set(&certificate.module).unwrap());
        assert!(certificate.upper_bound >= certificate.weight);
    }

    #[test]
    fn strategies_agree_with_brute_force() {
        let strategies = [
            CutStrategy::default(),
            CutStrategy {
                separate_fractional: false,
                degree_constraints: false,
                primal_heuristic: false,
            },
            CutStrategy {
                separate_fractional: true,
                degree_constraints: false,
                primal_heuristic: true,
            },
        ];

        let mut rng = Pcg64::seed_from_u64(99);
        for i in 0..90 {
            let n = rng.gen_range(1..11);
            let graph = random_graph(&mut rng, n, 0.3);
            let root = rng.gen_range(0..n) as Node;
            let options = OptionsBuilder::default()
                .cut_strategy(strategies[i % strategies.len()])
                .build()
                .unwrap();

            let mut solver = CutSolverRooted::with_parts(
                &options,
                SimplexBranchAndCut::new(),
                AlwaysSeparate,
            );
            let certificate = solver.solve_rooted(&graph, root).unwrap();
            let (_, expected) = brute_force(&graph, Some(root));
            assert!((certificate.weight - expected).abs() < 1e-6);
            assert!(certificate.module.contains(&root));
            assert!(graph.is_connected_set(&certificate.module).unwrap());
            assert!(certificate
                .trace
                .windows(2)
                .all(|w| w[0].weight <= w[1].weight && w[0].bound >= w[1].bound));
        }
    }
}

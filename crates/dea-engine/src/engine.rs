use dea_solver::{Solution, Solver};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::error::{DeaError, SolverUndetermined};
use crate::program::{ReturnsToScale, formulate};
use crate::solver::LpSolver;
use crate::unit::{PeerSet, Unit, UnitId};

/// Slack allowed around the (0, 1] score range for solver round-off
const SCORE_TOLERANCE: f64 = 1e-6;

/// Outcome of one (unit, mode) solve
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Score {
    /// Efficiency ratio in (0, 1]; exactly 1 means on the frontier
    Determined(f64),
    Undetermined(SolverUndetermined),
}

impl Score {
    pub fn value(&self) -> Option<f64> {
        match self {
            Score::Determined(v) => Some(*v),
            Score::Undetermined(_) => None,
        }
    }

    fn from_solution(solution: &Solution) -> Self {
        match solution.optimum() {
            None => Score::Undetermined(SolverUndetermined::Status(solution.status)),
            // Round-off around the frontier snaps to exactly 1
            Some(v) if v.is_finite() && v >= 1.0 - SCORE_TOLERANCE && v <= 1.0 + SCORE_TOLERANCE => {
                Score::Determined(1.0)
            }
            Some(v) if v.is_finite() && v > SCORE_TOLERANCE && v < 1.0 => Score::Determined(v),
            Some(v) => Score::Undetermined(SolverUndetermined::OutOfRange(v)),
        }
    }
}

/// Score of one unit under one mode, with the peers binding at its optimum
#[derive(Debug, Clone, PartialEq)]
pub struct UnitScore {
    pub unit: UnitId,
    pub mode: ReturnsToScale,
    pub score: Score,
    pub reference_peers: Vec<UnitId>,
}

/// One ranked row of the result table
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub name: String,
    pub code: u64,
    pub output: f64,
    pub input: f64,
    pub crs: f64,
    pub vrs: f64,
    /// `crs / vrs`
    pub scale: f64,
    /// Frontier units binding in this unit's CRS optimum
    pub crs_peers: Vec<String>,
}

/// A unit left out of the ranking because a score could not be determined
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct ExcludedUnit {
    pub name: String,
    pub code: u64,
    pub crs: Score,
    pub vrs: Score,
}

/// Units sorted by descending CRS score; ties keep peer-set order
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultTable {
    pub rows: Vec<ResultRow>,
    pub excluded: Vec<ExcludedUnit>,
}

impl ResultTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ResultRow> {
        self.rows.iter().find(|r| r.name == name)
    }

    /// Rows on the CRS frontier
    pub fn efficient(&self) -> impl Iterator<Item = &ResultRow> {
        self.rows.iter().filter(|r| r.crs == 1.0)
    }
}

/// Drives formulation and solving over a whole peer set.
///
/// Stateless between calls; every (unit, mode) program is formulated fresh,
/// solved once and dropped.
pub struct Engine<S = Solver> {
    solver: S,
    parallel: bool,
}

impl Default for Engine<Solver> {
    fn default() -> Self {
        Self::new(Solver::new())
    }
}

impl<S: LpSolver> Engine<S> {
    pub fn new(solver: S) -> Self {
        Self {
            solver,
            parallel: cfg!(feature = "parallel"),
        }
    }

    /// Spread solves over the rayon pool. Ignored without the `parallel` feature.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel && cfg!(feature = "parallel");
        self
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    /// Formulate and solve a single program
    pub fn score_unit(&self, peers: &PeerSet, unit: UnitId, mode: ReturnsToScale) -> Result<UnitScore, DeaError> {
        let program = formulate(peers.as_slice(), unit, mode)?;
        let solution = self.solver.solve(&program.problem);
        let score = Score::from_solution(&solution);
        debug!(unit = %peers[unit].name, %mode, ?score, iterations = solution.iterations, "scored unit");

        Ok(UnitScore {
            unit,
            mode,
            score,
            reference_peers: program.reference_peers(&solution),
        })
    }

    /// Validate raw units and score them. Validation failures abort before any solve.
    pub fn compute_scores_from(&self, units: Vec<Unit>) -> Result<ResultTable, DeaError> {
        let peers = PeerSet::new(units)?;
        self.compute_scores(&peers)
    }

    /// Score every unit under CRS and VRS and assemble the ranked table.
    ///
    /// A unit whose CRS or VRS program is not solved to optimality is left out
    /// of `rows`, reported in `excluded`, and logged at warn level.
    pub fn compute_scores(&self, peers: &PeerSet) -> Result<ResultTable, DeaError> {
        info!(units = peers.len(), parallel = self.parallel, "computing efficiency scores");

        let jobs: Vec<(UnitId, ReturnsToScale)> = ReturnsToScale::ALL
            .into_iter()
            .flat_map(move |mode| peers.ids().map(move |id| (id, mode)))
            .collect();
        let scored = self.solve_all(peers, &jobs)?;
        let (crs, vrs) = scored.split_at(peers.len());

        let mut table = ResultTable::default();
        for ((id, unit), (c, v)) in peers.iter().zip(crs.iter().zip(vrs)) {
            match (c.score.value(), v.score.value()) {
                (Some(crs_score), Some(vrs_score)) => table.rows.push(ResultRow {
                    name: unit.name.clone(),
                    code: unit.code,
                    output: unit.output,
                    input: unit.input,
                    crs: crs_score,
                    vrs: vrs_score,
                    scale: crs_score / vrs_score,
                    crs_peers: c.reference_peers.iter().map(|p| peers[*p].name.clone()).collect(),
                }),
                _ => {
                    warn!(unit = %unit.name, id = id.0, crs = ?c.score, vrs = ?v.score, "excluding unit without a determined score");
                    table.excluded.push(ExcludedUnit {
                        name: unit.name.clone(),
                        code: unit.code,
                        crs: c.score,
                        vrs: v.score,
                    });
                }
            }
        }

        // Stable: equal CRS scores keep peer-set order
        table.rows.sort_by(|a, b| b.crs.total_cmp(&a.crs));

        info!(
            ranked = table.rows.len(),
            excluded = table.excluded.len(),
            efficient = table.efficient().count(),
            "efficiency scores ready"
        );
        Ok(table)
    }

    fn solve_all(&self, peers: &PeerSet, jobs: &[(UnitId, ReturnsToScale)]) -> Result<Vec<UnitScore>, DeaError> {
        #[cfg(feature = "parallel")]
        {
            if self.parallel {
                return jobs
                    .par_iter()
                    .map(|&(id, mode)| self.score_unit(peers, id, mode))
                    .collect();
            }
        }
        jobs.iter().map(|&(id, mode)| self.score_unit(peers, id, mode)).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use dea_solver::{ConstraintOp, LpProblem, SolutionStatus};

    use super::*;

    fn abc() -> Vec<Unit> {
        vec![
            Unit::new("A", 1, 5.0, 10.0),
            Unit::new("B", 2, 8.0, 10.0),
            Unit::new("C", 3, 4.0, 20.0),
        ]
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    /// Adds `v <= 0` to the target unit's programs, contradicting `v * x = 1`
    struct ForceInfeasible {
        target: &'static str,
        inner: Solver,
    }

    impl LpSolver for ForceInfeasible {
        fn solve(&self, problem: &LpProblem) -> Solution {
            let normalize = format!("normalize:{}", self.target);
            if !problem.constraints.iter().any(|c| c.name == normalize) {
                return self.inner.solve(problem);
            }
            let mut forced = problem.clone();
            let mut coefficients = vec![0.0; forced.num_variables()];
            coefficients[1] = 1.0;
            forced.add_constraint("injected", coefficients, ConstraintOp::Le, 0.0);
            self.inner.solve(&forced)
        }
    }

    struct CountingSolver {
        calls: AtomicUsize,
    }

    impl LpSolver for CountingSolver {
        fn solve(&self, problem: &LpProblem) -> Solution {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Solver::new().solve(problem)
        }
    }

    #[test]
    fn test_abc_scenario() {
        let table = Engine::default().compute_scores_from(abc()).unwrap();

        let names: Vec<&str> = table.rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["B", "A", "C"]);

        let a = table.get("A").unwrap();
        let b = table.get("B").unwrap();
        let c = table.get("C").unwrap();
        assert!(close(b.crs, 1.0), "B crs = {}", b.crs);
        assert!(close(a.crs, 0.625), "A crs = {}", a.crs);
        assert!(close(c.crs, 0.25), "C crs = {}", c.crs);
        assert!(c.crs < b.crs);

        // A uses the smallest input, so it is weakly efficient under VRS
        assert!(close(a.vrs, 1.0), "A vrs = {}", a.vrs);
        assert!(close(c.vrs, 0.5), "C vrs = {}", c.vrs);
        assert_eq!(a.crs_peers, vec!["B".to_string()]);
        assert_eq!(a.code, 1);
        assert_eq!(a.output, 5.0);
        assert_eq!(a.input, 10.0);
        assert!(table.excluded.is_empty());
    }

    #[test]
    fn test_constant_ratio_all_efficient() {
        let units = vec![
            Unit::new("A", 1, 2.0, 4.0),
            Unit::new("B", 2, 3.0, 6.0),
            Unit::new("C", 3, 5.0, 10.0),
            Unit::new("D", 4, 1.0, 2.0),
        ];
        let table = Engine::default().compute_scores_from(units).unwrap();

        assert_eq!(table.len(), 4);
        for row in &table.rows {
            assert!(close(row.crs, 1.0), "{} crs = {}", row.name, row.crs);
            assert!(close(row.vrs, 1.0), "{} vrs = {}", row.name, row.vrs);
        }
        // all tied, so peer-set order survives the sort
        let names: Vec<&str> = table.rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C", "D"]);
        assert_eq!(table.efficient().count(), 4);
    }

    #[test]
    fn test_single_unit_is_efficient() {
        let table = Engine::default()
            .compute_scores_from(vec![Unit::new("Solo", 42, 6.1, 3500.0)])
            .unwrap();

        assert_eq!(table.len(), 1);
        let row = &table.rows[0];
        assert!(close(row.crs, 1.0), "crs = {}", row.crs);
        assert!(close(row.vrs, 1.0), "vrs = {}", row.vrs);
        assert!(close(row.scale, 1.0), "scale = {}", row.scale);
    }

    #[test]
    fn test_scores_bounded_and_scale_exact() {
        let units = vec![
            Unit::new("A", 1, 5.8, 4200.0),
            Unit::new("B", 2, 6.4, 5100.0),
            Unit::new("C", 3, 4.9, 3900.0),
            Unit::new("D", 4, 7.1, 8800.0),
            Unit::new("E", 5, 5.2, 6100.0),
        ];
        let table = Engine::default().compute_scores_from(units).unwrap();

        assert_eq!(table.len(), 5);
        for row in &table.rows {
            assert!(row.crs > 0.0 && row.crs <= 1.0, "{} crs = {}", row.name, row.crs);
            assert!(row.vrs > 0.0 && row.vrs <= 1.0, "{} vrs = {}", row.name, row.vrs);
            assert!(row.vrs >= row.crs - 1e-9, "{}: vrs {} < crs {}", row.name, row.vrs, row.crs);
            assert_eq!(row.scale, row.crs / row.vrs);
        }
        for pair in table.rows.windows(2) {
            assert!(pair[0].crs >= pair[1].crs);
        }
    }

    #[test]
    fn test_zero_input_fails_before_solving() {
        let solver = CountingSolver {
            calls: AtomicUsize::new(0),
        };
        let engine = Engine::new(&solver);
        let mut units = abc();
        units.push(Unit::new("Z", 9, 3.0, 0.0));

        let err = engine.compute_scores_from(units).unwrap_err();

        assert!(matches!(err, DeaError::MalformedInput { ref unit, .. } if unit == "Z"), "{:?}", err);
        assert_eq!(solver.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_empty_peer_set_fails() {
        assert_eq!(
            Engine::default().compute_scores_from(Vec::new()).unwrap_err(),
            DeaError::EmptyPeerSet
        );
    }

    #[test]
    fn test_forced_infeasible_unit_is_excluded() {
        let engine = Engine::new(ForceInfeasible {
            target: "C",
            inner: Solver::new(),
        });
        let table = engine.compute_scores_from(abc()).unwrap();

        let names: Vec<&str> = table.rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["B", "A"]);
        assert_eq!(table.excluded.len(), 1);
        let excluded = &table.excluded[0];
        assert_eq!(excluded.name, "C");
        assert_eq!(
            excluded.crs,
            Score::Undetermined(SolverUndetermined::Status(SolutionStatus::Infeasible))
        );
    }

    #[test]
    fn test_idempotent_and_parallel_matches_sequential() {
        let peers = PeerSet::new(abc()).unwrap();
        let sequential = Engine::default().with_parallel(false);
        let parallel = Engine::default().with_parallel(true);

        let first = sequential.compute_scores(&peers).unwrap();
        let second = sequential.compute_scores(&peers).unwrap();
        let third = parallel.compute_scores(&peers).unwrap();

        assert_eq!(first, second);
        assert_eq!(first, third);
    }

    #[test]
    fn test_solver_counts_two_programs_per_unit() {
        let solver = CountingSolver {
            calls: AtomicUsize::new(0),
        };
        let engine = Engine::new(&solver);
        engine.compute_scores_from(abc()).unwrap();
        assert_eq!(solver.calls.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn test_zero_output_unit_is_excluded() {
        let units = vec![Unit::new("A", 1, 5.0, 10.0), Unit::new("Idle", 2, 0.0, 10.0)];
        let table = Engine::default().compute_scores_from(units).unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(table.excluded[0].name, "Idle");
        assert!(matches!(
            table.excluded[0].crs,
            Score::Undetermined(SolverUndetermined::OutOfRange(_))
        ));
    }
}

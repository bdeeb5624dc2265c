use tracing::debug;

use crate::problem::{ConstraintOp, LpProblem, VariableBound};
use crate::solution::{Solution, SolutionStatus};

/// Consecutive degenerate pivots tolerated before switching to Bland's rule
const DEGENERATE_STREAK_LIMIT: usize = 32;

/// Simplex solver for linear programming problems
#[derive(Debug, Clone)]
pub struct Solver {
    /// Maximum pivots (both phases combined) before giving up
    max_iterations: usize,
    /// Tolerance for floating point comparisons
    tolerance: f64,
}

impl Default for Solver {
    fn default() -> Self {
        Self {
            max_iterations: 10000,
            tolerance: 1e-9,
        }
    }
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Residual allowed on artificials and binding checks
    fn feasibility_tolerance(&self) -> f64 {
        self.tolerance * 1e3
    }

    /// Solve the LP problem using the two-phase simplex method
    pub fn solve(&self, problem: &LpProblem) -> Solution {
        if let Err(e) = problem.validate() {
            debug!(error = %e, "rejected malformed problem");
            return Solution::error(0);
        }

        let mut tableau = self.build_tableau(problem);
        let mut iterations = 0;

        // Phase 1: Find initial basic feasible solution
        if tableau.n_artificial > 0 {
            match self.phase1(&mut tableau, &mut iterations) {
                Phase1Result::Feasible => {}
                Phase1Result::Infeasible => return self.finish(Solution::infeasible(iterations)),
                Phase1Result::IterationLimit => return self.finish(Solution::error(iterations)),
            }
        }

        // Phase 2: Optimize, never letting an artificial re-enter
        let exclude_from = tableau.n_struct + tableau.n_slack;
        match self.run(&mut tableau, exclude_from, &mut iterations) {
            SimplexResult::Optimal => {}
            SimplexResult::Unbounded => return self.finish(Solution::unbounded(iterations)),
            SimplexResult::IterationLimit => return self.finish(Solution::error(iterations)),
        }

        let solution = self.extract_solution(&tableau, problem, iterations);
        self.finish(solution)
    }

    fn finish(&self, solution: Solution) -> Solution {
        debug!(
            status = %solution.status,
            iterations = solution.iterations,
            objective = solution.objective_value,
            "simplex finished"
        );
        solution
    }

    fn build_tableau(&self, problem: &LpProblem) -> Tableau {
        let n_vars = problem.num_variables();
        let n_constraints = problem.num_constraints();

        // Free variables get a second column for their negative part
        let mut negative_part = vec![None; n_vars];
        let mut n_struct = n_vars;
        for (j, bound) in problem.bounds.iter().enumerate() {
            if *bound == VariableBound::Free {
                negative_part[j] = Some(n_struct);
                n_struct += 1;
            }
        }

        // Normalize every row to a non-negative RHS before counting auxiliaries
        let rows: Vec<(f64, ConstraintOp, f64)> = problem
            .constraints
            .iter()
            .map(|c| if c.rhs < 0.0 { (-1.0, c.op.flipped(), -c.rhs) } else { (1.0, c.op, c.rhs) })
            .collect();

        let mut n_slack = 0;
        let mut n_artificial = 0;
        for (_, op, _) in &rows {
            match op {
                ConstraintOp::Le => n_slack += 1,
                ConstraintOp::Ge => {
                    n_slack += 1; // surplus
                    n_artificial += 1;
                }
                ConstraintOp::Eq => n_artificial += 1,
            }
        }

        let total_cols = n_struct + n_slack + n_artificial + 1; // +1 for RHS
        let mut tableau = Tableau {
            data: vec![vec![0.0; total_cols]; n_constraints + 1],
            basic_vars: vec![0; n_constraints],
            n_struct,
            n_slack,
            n_artificial,
            negative_part,
        };

        let mut slack_idx = n_struct;
        let mut artificial_idx = n_struct + n_slack;

        for (i, (c, &(sign, op, rhs))) in problem.constraints.iter().zip(&rows).enumerate() {
            for (j, &coef) in c.coefficients.iter().enumerate() {
                tableau.data[i][j] = sign * coef;
                if let Some(neg) = tableau.negative_part[j] {
                    tableau.data[i][neg] = -sign * coef;
                }
            }
            tableau.data[i][total_cols - 1] = rhs;

            match op {
                ConstraintOp::Le => {
                    tableau.data[i][slack_idx] = 1.0;
                    tableau.basic_vars[i] = slack_idx;
                    slack_idx += 1;
                }
                ConstraintOp::Ge => {
                    tableau.data[i][slack_idx] = -1.0; // surplus
                    slack_idx += 1;
                    tableau.data[i][artificial_idx] = 1.0;
                    tableau.basic_vars[i] = artificial_idx;
                    artificial_idx += 1;
                }
                ConstraintOp::Eq => {
                    tableau.data[i][artificial_idx] = 1.0;
                    tableau.basic_vars[i] = artificial_idx;
                    artificial_idx += 1;
                }
            }
        }

        // Objective row (last row) holds the reduced profits of a maximization
        let obj_row = n_constraints;
        for (j, &coef) in problem.objective.coefficients.iter().enumerate() {
            let profit = if problem.objective.minimize { -coef } else { coef };
            tableau.data[obj_row][j] = profit;
            if let Some(neg) = tableau.negative_part[j] {
                tableau.data[obj_row][neg] = -profit;
            }
        }

        tableau
    }

    fn phase1(&self, tableau: &mut Tableau, iterations: &mut usize) -> Phase1Result {
        let n_constraints = tableau.data.len() - 1;
        let n_cols = tableau.data[0].len();
        let art_start = tableau.n_struct + tableau.n_slack;

        let orig_obj = tableau.data[n_constraints].clone();

        // Maximize -sum(artificials)
        tableau.data[n_constraints].fill(0.0);
        for j in art_start..(art_start + tableau.n_artificial) {
            tableau.data[n_constraints][j] = -1.0;
        }
        for i in 0..n_constraints {
            if tableau.basic_vars[i] >= art_start {
                for j in 0..n_cols {
                    tableau.data[n_constraints][j] += tableau.data[i][j];
                }
            }
        }

        match self.run(tableau, n_cols - 1, iterations) {
            SimplexResult::Optimal => {}
            // The phase 1 objective is bounded by zero
            SimplexResult::Unbounded => return Phase1Result::Infeasible,
            SimplexResult::IterationLimit => return Phase1Result::IterationLimit,
        }

        let rhs_col = n_cols - 1;
        for i in 0..n_constraints {
            if tableau.basic_vars[i] >= art_start && tableau.data[i][rhs_col].abs() > self.feasibility_tolerance() {
                return Phase1Result::Infeasible;
            }
        }

        // Artificials still basic sit at zero; pivot them out where the row allows
        for i in 0..n_constraints {
            if tableau.basic_vars[i] < art_start {
                continue;
            }
            let replacement = (0..art_start).find(|&j| tableau.data[i][j].abs() > self.feasibility_tolerance());
            if let Some(j) = replacement {
                self.pivot(tableau, i, j);
            }
        }

        // Restore original objective and price out the basis
        tableau.data[n_constraints] = orig_obj;
        for i in 0..n_constraints {
            let basic = tableau.basic_vars[i];
            let ratio = tableau.data[n_constraints][basic];
            if ratio.abs() > self.tolerance {
                for j in 0..n_cols {
                    tableau.data[n_constraints][j] -= ratio * tableau.data[i][j];
                }
            }
        }

        Phase1Result::Feasible
    }

    /// Pivot until no column in `0..exclude_from` improves the objective row
    fn run(&self, tableau: &mut Tableau, exclude_from: usize, iterations: &mut usize) -> SimplexResult {
        let rhs_col = tableau.data[0].len() - 1;
        let mut degenerate_streak = 0;
        let mut bland = false;

        loop {
            let Some(pivot_col) = self.find_pivot_column(tableau, exclude_from, bland) else {
                return SimplexResult::Optimal;
            };
            if *iterations >= self.max_iterations {
                return SimplexResult::IterationLimit;
            }
            let Some(pivot_row) = self.find_pivot_row(tableau, pivot_col, bland) else {
                return SimplexResult::Unbounded;
            };

            if tableau.data[pivot_row][rhs_col] <= self.tolerance {
                degenerate_streak += 1;
                if degenerate_streak > DEGENERATE_STREAK_LIMIT {
                    bland = true;
                }
            } else {
                degenerate_streak = 0;
            }

            self.pivot(tableau, pivot_row, pivot_col);
            *iterations += 1;
        }
    }

    fn find_pivot_column(&self, tableau: &Tableau, exclude_from: usize, bland: bool) -> Option<usize> {
        let obj_row = tableau.data.len() - 1;
        let candidates = (0..exclude_from).filter(|&j| tableau.data[obj_row][j] > self.tolerance);

        if bland {
            return candidates.min();
        }

        // Most positive reduced profit
        let mut best: Option<usize> = None;
        for j in candidates {
            if best.is_none_or(|b| tableau.data[obj_row][j] > tableau.data[obj_row][b]) {
                best = Some(j);
            }
        }
        best
    }

    fn find_pivot_row(&self, tableau: &Tableau, col: usize, bland: bool) -> Option<usize> {
        let n_constraints = tableau.data.len() - 1;
        let rhs_col = tableau.data[0].len() - 1;

        let mut min_ratio = f64::INFINITY;
        let mut min_row: Option<usize> = None;

        for i in 0..n_constraints {
            let val = tableau.data[i][col];
            if val <= self.tolerance {
                continue;
            }
            let ratio = tableau.data[i][rhs_col].max(0.0) / val;
            let better = match min_row {
                None => true,
                Some(r) if (ratio - min_ratio).abs() <= self.tolerance => {
                    // Ties: Bland picks the smallest basic index, otherwise the largest pivot
                    if bland {
                        tableau.basic_vars[i] < tableau.basic_vars[r]
                    } else {
                        val > tableau.data[r][col]
                    }
                }
                Some(_) => ratio < min_ratio,
            };
            if better {
                min_ratio = ratio;
                min_row = Some(i);
            }
        }

        min_row
    }

    fn pivot(&self, tableau: &mut Tableau, row: usize, col: usize) {
        let n_rows = tableau.data.len();
        let n_cols = tableau.data[0].len();

        tableau.basic_vars[row] = col;

        let pivot_val = tableau.data[row][col];
        for j in 0..n_cols {
            tableau.data[row][j] /= pivot_val;
        }

        let pivot_row = tableau.data[row].clone();
        for i in 0..n_rows {
            if i == row {
                continue;
            }
            let factor = tableau.data[i][col];
            if factor == 0.0 {
                continue;
            }
            for j in 0..n_cols {
                tableau.data[i][j] -= factor * pivot_row[j];
            }
        }
    }

    fn extract_solution(&self, tableau: &Tableau, problem: &LpProblem, iterations: usize) -> Solution {
        let n_vars = problem.num_variables();
        let rhs_col = tableau.data[0].len() - 1;

        let mut structural = vec![0.0; tableau.n_struct];
        for (i, &basic) in tableau.basic_vars.iter().enumerate() {
            if basic < tableau.n_struct {
                structural[basic] = tableau.data[i][rhs_col];
            }
        }

        let values: Vec<f64> = (0..n_vars)
            .map(|j| match tableau.negative_part[j] {
                Some(neg) => structural[j] - structural[neg],
                None => structural[j],
            })
            .collect();

        let objective_value: f64 = problem
            .objective
            .coefficients
            .iter()
            .zip(&values)
            .map(|(c, x)| c * x)
            .sum();

        let tol = self.feasibility_tolerance();
        let binding_constraints = problem
            .constraints
            .iter()
            .enumerate()
            .filter(|(i, c)| (problem.lhs(*i, &values) - c.rhs).abs() <= tol * (1.0 + c.rhs.abs()))
            .map(|(_, c)| c.name.clone())
            .collect();

        Solution {
            status: SolutionStatus::Optimal,
            values,
            objective_value,
            binding_constraints,
            iterations,
        }
    }
}

struct Tableau {
    data: Vec<Vec<f64>>,
    basic_vars: Vec<usize>,
    /// Structural columns: original variables plus negative parts of free ones
    n_struct: usize,
    n_slack: usize,
    n_artificial: usize,
    /// Column holding the negative part of each free variable
    negative_part: Vec<Option<usize>>,
}

enum SimplexResult {
    Optimal,
    Unbounded,
    IterationLimit,
}

enum Phase1Result {
    Feasible,
    Infeasible,
    IterationLimit,
}

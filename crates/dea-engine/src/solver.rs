use dea_solver::{LpProblem, Solution, Solver};

/// Any LP backend able to solve a formulated program.
///
/// Implementations must be shareable across worker threads; each call is an
/// independent request with no state carried between programs.
pub trait LpSolver: Send + Sync {
    fn solve(&self, problem: &LpProblem) -> Solution;
}

impl LpSolver for Solver {
    fn solve(&self, problem: &LpProblem) -> Solution {
        Solver::solve(self, problem)
    }
}

impl<T: LpSolver + ?Sized> LpSolver for &T {
    fn solve(&self, problem: &LpProblem) -> Solution {
        (**self).solve(problem)
    }
}

impl<T: LpSolver + ?Sized> LpSolver for Box<T> {
    fn solve(&self, problem: &LpProblem) -> Solution {
        (**self).solve(problem)
    }
}

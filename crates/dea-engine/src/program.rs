//! Multiplier-form DEA programs, one per (evaluated unit, returns-to-scale) pair.
//!
//! For the evaluated unit `o` the program is
//!
//! ```text
//! maximize    u * y_o (+ w)
//! subject to  v * x_o = 1
//!             u * y_j (+ w) <= v * x_j   for every peer j, o included
//!             u, v >= 0, w free
//! ```
//!
//! where the `w` terms only appear under variable returns to scale.

use std::collections::HashSet;
use std::fmt;

use dea_solver::{ConstraintOp, LpProblem, Solution, VariableBound};

use crate::error::DeaError;
use crate::unit::{Unit, UnitId};

pub const OUTPUT_WEIGHT: &str = "u";
pub const INPUT_WEIGHT: &str = "v";
pub const INTERCEPT: &str = "w";

/// Technology assumption of the production frontier
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnsToScale {
    /// CRS: the frontier passes through the origin
    Constant,
    /// VRS: the frontier may have a non-zero intercept
    Variable,
}

impl ReturnsToScale {
    pub const ALL: [ReturnsToScale; 2] = [ReturnsToScale::Constant, ReturnsToScale::Variable];
}

impl fmt::Display for ReturnsToScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReturnsToScale::Constant => f.write_str("CRS"),
            ReturnsToScale::Variable => f.write_str("VRS"),
        }
    }
}

/// A formulated program, tied to one evaluated unit and one mode.
/// Borrows the peers it was built from; solved once and dropped.
#[derive(Debug, Clone)]
pub struct EfficiencyProgram<'a> {
    pub unit: UnitId,
    pub mode: ReturnsToScale,
    pub problem: LpProblem,
    peers: &'a [Unit],
}

impl<'a> EfficiencyProgram<'a> {
    /// Column of the free intercept, present only under VRS
    pub fn intercept(&self) -> Option<usize> {
        match self.mode {
            ReturnsToScale::Constant => None,
            ReturnsToScale::Variable => Some(2),
        }
    }

    pub fn output_weight(&self) -> usize {
        0
    }

    pub fn input_weight(&self) -> usize {
        1
    }

    /// Index of the constraint contributed by peer `j`
    fn peer_row(j: usize) -> usize {
        j + 1
    }

    /// Peers whose constraints hold with equality in an optimal solution:
    /// the units spanning the frontier facet the evaluated unit is projected on.
    pub fn reference_peers(&self, solution: &Solution) -> Vec<UnitId> {
        if !solution.status.is_optimal() {
            return Vec::new();
        }
        let binding: HashSet<&str> = solution.binding_constraints.iter().map(String::as_str).collect();
        (0..self.peers.len())
            .filter(|&j| binding.contains(self.problem.constraints[Self::peer_row(j)].name.as_str()))
            .map(UnitId)
            .collect()
    }
}

/// Build the program evaluating `peers[unit]` against every unit in `peers`.
///
/// Performs no solving. Fails when the unit is not in the slice or when its
/// input cannot serve as the normalizing constant.
pub fn formulate(peers: &[Unit], unit: UnitId, mode: ReturnsToScale) -> Result<EfficiencyProgram<'_>, DeaError> {
    let evaluated = peers.get(unit.0).ok_or(DeaError::UnknownUnit {
        index: unit.0,
        len: peers.len(),
    })?;
    if !evaluated.input.is_finite() || evaluated.input <= 0.0 {
        return Err(DeaError::malformed(
            &evaluated.name,
            format!("input {} cannot normalize the input weight", evaluated.input),
        ));
    }

    let mut variables = vec![OUTPUT_WEIGHT.to_string(), INPUT_WEIGHT.to_string()];
    if mode == ReturnsToScale::Variable {
        variables.push(INTERCEPT.to_string());
    }
    let n = variables.len();
    let mut problem = LpProblem::new(variables);

    // Row layout: [u, v] under CRS, [u, v, w] under VRS
    let row = |output: f64, input: f64, intercept: f64| {
        let mut coefficients = vec![output, input];
        if n == 3 {
            coefficients.push(intercept);
        }
        coefficients
    };

    if mode == ReturnsToScale::Variable {
        problem.set_bound(2, VariableBound::Free);
    }
    problem.set_objective(row(evaluated.output, 0.0, 1.0), false);

    problem.add_constraint(
        format!("normalize:{}", evaluated.name),
        row(0.0, evaluated.input, 0.0),
        ConstraintOp::Eq,
        1.0,
    );

    for (j, peer) in peers.iter().enumerate() {
        problem.add_constraint(
            format!("peer:{}:{}", j, peer.name),
            row(peer.output, -peer.input, 1.0),
            ConstraintOp::Le,
            0.0,
        );
    }

    Ok(EfficiencyProgram {
        unit,
        mode,
        problem,
        peers,
    })
}

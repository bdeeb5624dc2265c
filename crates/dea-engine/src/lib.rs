//! Data Envelopment Analysis for single-input, single-output units.
//!
//! Each unit is scored by a linear program under constant (CRS) and variable
//! (VRS) returns to scale; the two scores and their ratio (scale efficiency)
//! are joined into a ranked [`ResultTable`].

pub mod engine;
pub mod error;
pub mod program;
pub mod solver;
pub mod unit;

pub use engine::{Engine, ExcludedUnit, ResultRow, ResultTable, Score, UnitScore};
pub use error::{DeaError, SolverUndetermined};
pub use program::{EfficiencyProgram, ReturnsToScale, formulate};
pub use solver::LpSolver;
pub use unit::{PeerSet, Unit, UnitId};

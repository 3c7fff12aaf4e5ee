//! Solver interface.
//!
//! This module provides:
//! - The `SolverBackend` contract every numerical backend satisfies
//! - Solve status and settings shared by backends
//! - Clarabel solver integration

pub mod clarabel;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::program::StuffedProgram;

pub use self::clarabel::ClarabelBackend;

/// Solution status reported by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveStatus {
    /// Optimal solution found.
    Optimal,
    /// Solution found but only to reduced accuracy.
    OptimalInaccurate,
    /// Problem is infeasible.
    Infeasible,
    /// Problem is unbounded.
    Unbounded,
    /// Maximum iterations reached.
    MaxIterations,
    /// Time limit reached.
    TimeLimit,
    /// Numerical difficulties.
    NumericalError,
    /// Unknown status.
    Unknown,
}

impl SolveStatus {
    /// Whether the primal vector accompanying this status may be used.
    pub fn is_usable(self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::OptimalInaccurate)
    }

    /// Status string as reported in errors.
    pub fn as_str(self) -> &'static str {
        match self {
            SolveStatus::Optimal => "optimal",
            SolveStatus::OptimalInaccurate => "optimal_inaccurate",
            SolveStatus::Infeasible => "infeasible",
            SolveStatus::Unbounded => "unbounded",
            SolveStatus::MaxIterations => "max_iterations",
            SolveStatus::TimeLimit => "time_limit",
            SolveStatus::NumericalError => "numerical_error",
            SolveStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Solver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Print solver output.
    pub verbose: bool,
    /// Maximum iterations.
    pub max_iter: u32,
    /// Time limit in seconds; `None` means unlimited.
    pub time_limit: Option<f64>,
    /// Absolute tolerance.
    pub tol_gap_abs: f64,
    /// Relative tolerance.
    pub tol_gap_rel: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            verbose: false,
            max_iter: 200,
            time_limit: None,
            tol_gap_abs: 1e-8,
            tol_gap_rel: 1e-8,
        }
    }
}

impl Settings {
    /// Set the iteration cap.
    #[must_use]
    pub fn with_max_iter(mut self, max_iter: u32) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set a wall-clock limit in seconds.
    #[must_use]
    pub fn with_time_limit(mut self, seconds: f64) -> Self {
        self.time_limit = Some(seconds);
        self
    }

    /// Enable solver console output.
    #[must_use]
    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }
}

/// Raw result of a backend solve.
#[derive(Debug, Clone)]
pub struct RawSolution {
    /// Solution status.
    pub status: SolveStatus,
    /// Primal vector, present iff the status is usable.
    pub x: Option<Vec<f64>>,
    /// Number of iterations.
    pub iterations: u32,
    /// Solve time in seconds.
    pub solve_time: f64,
}

impl RawSolution {
    /// A solution carrying only a non-usable status.
    pub fn failed(status: SolveStatus) -> Self {
        RawSolution {
            status,
            x: None,
            iterations: 0,
            solve_time: 0.0,
        }
    }
}

/// A numerical backend for standard-form conic programs.
///
/// Given `minimize q'x` subject to `Ax + s = b, s in K`, a backend returns a
/// status and, when that status is usable, a primal vector.
pub trait SolverBackend {
    /// Short backend name for diagnostics.
    fn name(&self) -> &str;

    /// Solve the program.
    fn solve(&self, program: &StuffedProgram) -> Result<RawSolution>;
}

impl<B: SolverBackend + ?Sized> SolverBackend for &B {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn solve(&self, program: &StuffedProgram) -> Result<RawSolution> {
        (**self).solve(program)
    }
}

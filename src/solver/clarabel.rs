//! Clarabel solver integration.
//!
//! This module provides the `SolverBackend` adapter for the Clarabel conic
//! solver.

use clarabel::algebra::CscMatrix as ClarabelCsc;
use clarabel::solver::{
    DefaultSettingsBuilder, DefaultSolver, IPSolver, SolverStatus, SupportedConeT,
};
use tracing::debug;

use super::{RawSolution, Settings, SolveStatus, SolverBackend};
use crate::error::{PortfolioError, Result};
use crate::program::{ConeDims, StuffedProgram};
use crate::sparse::to_clarabel_csc;

impl From<SolverStatus> for SolveStatus {
    fn from(status: SolverStatus) -> Self {
        match status {
            SolverStatus::Solved => SolveStatus::Optimal,
            SolverStatus::AlmostSolved => SolveStatus::OptimalInaccurate,
            SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
                SolveStatus::Infeasible
            }
            SolverStatus::DualInfeasible | SolverStatus::AlmostDualInfeasible => {
                SolveStatus::Unbounded
            }
            SolverStatus::MaxIterations => SolveStatus::MaxIterations,
            SolverStatus::MaxTime => SolveStatus::TimeLimit,
            SolverStatus::NumericalError | SolverStatus::InsufficientProgress => {
                SolveStatus::NumericalError
            }
            _ => SolveStatus::Unknown,
        }
    }
}

/// Backend running the Clarabel interior-point solver.
#[derive(Debug, Clone, Default)]
pub struct ClarabelBackend {
    settings: Settings,
}

impl ClarabelBackend {
    /// Create a backend with the given settings.
    pub fn new(settings: Settings) -> Self {
        ClarabelBackend { settings }
    }

    /// The settings used for every solve.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}

impl SolverBackend for ClarabelBackend {
    fn name(&self) -> &str {
        "clarabel"
    }

    fn solve(&self, program: &StuffedProgram) -> Result<RawSolution> {
        let n = program.num_vars();
        // Linear objective: P is the empty n x n matrix.
        let p = ClarabelCsc::new(n, n, vec![0; n + 1], Vec::new(), Vec::new());
        let a = to_clarabel_csc(&program.a);
        let cones = to_clarabel_cones(&program.cone_dims);

        // Presolve drops rows with |b| >= 1e20 without shrinking the cones.
        let clarabel_settings = DefaultSettingsBuilder::default()
            .presolve_enable(false)
            .verbose(self.settings.verbose)
            .max_iter(self.settings.max_iter)
            .time_limit(self.settings.time_limit.unwrap_or(f64::INFINITY))
            .tol_gap_abs(self.settings.tol_gap_abs)
            .tol_gap_rel(self.settings.tol_gap_rel)
            .build()
            .map_err(|e| PortfolioError::Solver(e.to_string()))?;

        debug!(
            vars = n,
            rows = program.num_rows(),
            zero = program.cone_dims.zero,
            nonneg = program.cone_dims.nonneg,
            soc = program.cone_dims.soc.len(),
            "Running clarabel"
        );

        let mut solver = DefaultSolver::new(&p, &program.q, &a, &program.b, &cones, clarabel_settings);
        solver.solve();

        let status: SolveStatus = solver.solution.status.into();
        let solve_time = solver.solution.solve_time;
        let iterations = solver.info.iterations;

        let x = status.is_usable().then(|| solver.solution.x.clone());
        if let Some(x) = &x {
            debug!(objective = program.objective_at(x), iterations, "Clarabel converged");
        }
        Ok(RawSolution {
            status,
            x,
            iterations,
            solve_time,
        })
    }
}

/// Convert cone dimensions to Clarabel cones.
fn to_clarabel_cones(dims: &ConeDims) -> Vec<SupportedConeT<f64>> {
    let mut cones = Vec::new();

    if dims.zero > 0 {
        cones.push(SupportedConeT::ZeroConeT(dims.zero));
    }

    if dims.nonneg > 0 {
        cones.push(SupportedConeT::NonnegativeConeT(dims.nonneg));
    }

    for &soc_dim in &dims.soc {
        cones.push(SupportedConeT::SecondOrderConeT(soc_dim));
    }

    cones
}

//! Portfolio optimizer.
//!
//! Maximizes expected return subject to budget, bounds and the optional
//! carbon, CVaR, turnover and sector constraints:
//! ```ignore
//! let params = OptimizationParams::new().with_max_carbon(120.0).with_max_cvar(0.02);
//! let result = PortfolioOptimizer::new(Settings::default()).optimize(&returns, &carbon, &params)?;
//! println!("{:?}", result.allocation);
//! ```

pub mod formulation;
pub mod params;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::data::{Allocation, AssetValues, ReturnMatrix};
use crate::error::{PortfolioError, Result};
use crate::solver::{ClarabelBackend, Settings, SolveStatus, SolverBackend};

pub use formulation::{formulate, PortfolioProgram};
pub use params::{ExpectedReturns, OptimizationParams, DEFAULT_BOUNDS, UNBOUNDED_LIMIT};

/// Optimizer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Tolerance for the post-solve constraint check.
    pub feasibility_tol: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        OptimizerConfig {
            feasibility_tol: 1e-6,
        }
    }
}

/// An allocation plus solve diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizedPortfolio {
    /// The optimal weights.
    pub allocation: Allocation,
    /// Achieved objective, i.e. expected return `mu'w`.
    pub expected_return: f64,
    /// Backend status (always usable here).
    pub status: SolveStatus,
    /// Number of solver iterations.
    pub iterations: u32,
    /// Solve time in seconds.
    pub solve_time: f64,
}

/// Formulates portfolio programs and solves them with a backend.
#[derive(Debug, Clone, Default)]
pub struct PortfolioOptimizer<B = ClarabelBackend> {
    backend: B,
    config: OptimizerConfig,
}

impl PortfolioOptimizer<ClarabelBackend> {
    /// Optimizer backed by Clarabel with the given solver settings.
    pub fn new(settings: Settings) -> Self {
        Self::with_backend(ClarabelBackend::new(settings))
    }
}

impl<B: SolverBackend> PortfolioOptimizer<B> {
    /// Optimizer using a custom backend.
    pub fn with_backend(backend: B) -> Self {
        PortfolioOptimizer {
            backend,
            config: OptimizerConfig::default(),
        }
    }

    /// Replace the configuration.
    #[must_use]
    pub fn with_config(mut self, config: OptimizerConfig) -> Self {
        self.config = config;
        self
    }

    /// The backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Find the return-maximizing allocation under the active constraints.
    ///
    /// # Errors
    ///
    /// Input problems are reported before the backend is called. A backend
    /// status other than optimal or optimal-inaccurate yields
    /// `PortfolioError::Optimization` carrying that status.
    pub fn optimize(
        &self,
        returns: &ReturnMatrix,
        carbon_intensity: &AssetValues,
        params: &OptimizationParams,
    ) -> Result<OptimizedPortfolio> {
        let formulated = formulate(returns, carbon_intensity, params)?;
        let program = &formulated.program;
        let stuffed = program.stuff();

        let raw = self.backend.solve(&stuffed)?;
        debug!(
            backend = self.backend.name(),
            status = %raw.status,
            iterations = raw.iterations,
            solve_time = raw.solve_time,
            "Solve finished"
        );

        if !raw.status.is_usable() {
            warn!(backend = self.backend.name(), status = %raw.status, "No usable solution");
            return Err(PortfolioError::Optimization {
                status: raw.status.to_string(),
            });
        }

        let x = raw.x.ok_or_else(|| {
            PortfolioError::Solver(format!(
                "{} reported {} without a solution vector",
                self.backend.name(),
                raw.status
            ))
        })?;
        if x.len() != program.num_vars() {
            return Err(PortfolioError::Solver(format!(
                "solution has {} entries, program has {} variables",
                x.len(),
                program.num_vars()
            )));
        }

        let violated = program.violated(&x, self.config.feasibility_tol);
        if !violated.is_empty() {
            warn!(
                status = %raw.status,
                tol = self.config.feasibility_tol,
                constraints = ?violated,
                "Solution violates constraints beyond tolerance"
            );
        }

        let weights = formulated.weights.values(&x).to_vec();
        let allocation = Allocation::new(formulated.assets, weights)?;

        Ok(OptimizedPortfolio {
            allocation,
            expected_return: program.objective_value(&x),
            status: raw.status,
            iterations: raw.iterations,
            solve_time: raw.solve_time,
        })
    }
}

/// Optimize with the default Clarabel backend and return only the allocation.
pub fn optimize_portfolio(
    returns: &ReturnMatrix,
    carbon_intensity: &AssetValues,
    params: &OptimizationParams,
) -> Result<Allocation> {
    PortfolioOptimizer::<ClarabelBackend>::default()
        .optimize(returns, carbon_intensity, params)
        .map(|result| result.allocation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::StuffedProgram;
    use crate::solver::RawSolution;
    use std::cell::Cell;

    struct ScriptedBackend {
        status: SolveStatus,
        calls: Cell<usize>,
    }

    impl ScriptedBackend {
        fn new(status: SolveStatus) -> Self {
            ScriptedBackend {
                status,
                calls: Cell::new(0),
            }
        }
    }

    impl SolverBackend for ScriptedBackend {
        fn name(&self) -> &str {
            "scripted"
        }

        fn solve(&self, program: &StuffedProgram) -> Result<RawSolution> {
            self.calls.set(self.calls.get() + 1);
            if !self.status.is_usable() {
                return Ok(RawSolution::failed(self.status));
            }
            // Everything in the first asset.
            let mut x = vec![0.0; program.num_vars()];
            x[0] = 1.0;
            Ok(RawSolution {
                status: self.status,
                x: Some(x),
                iterations: 1,
                solve_time: 0.0,
            })
        }
    }

    fn market() -> (ReturnMatrix, AssetValues) {
        let returns =
            ReturnMatrix::from_rows(["A", "B"], &[vec![0.01, 0.02], vec![0.03, -0.01]]).unwrap();
        let carbon = [("A".to_string(), 10.0), ("B".to_string(), 20.0)]
            .into_iter()
            .collect();
        (returns, carbon)
    }

    #[test]
    fn test_unusable_status_is_an_error() {
        let (returns, carbon) = market();
        for status in [
            SolveStatus::Infeasible,
            SolveStatus::Unbounded,
            SolveStatus::NumericalError,
            SolveStatus::TimeLimit,
        ] {
            let optimizer = PortfolioOptimizer::with_backend(ScriptedBackend::new(status));
            let err = optimizer
                .optimize(&returns, &carbon, &OptimizationParams::default())
                .unwrap_err();
            match err {
                PortfolioError::Optimization { status: s } => assert_eq!(s, status.to_string()),
                other => panic!("unexpected error {:?}", other),
            }
        }
    }

    #[test]
    fn test_inaccurate_status_is_usable() {
        let (returns, carbon) = market();
        let optimizer =
            PortfolioOptimizer::with_backend(ScriptedBackend::new(SolveStatus::OptimalInaccurate));
        let result = optimizer
            .optimize(&returns, &carbon, &OptimizationParams::default())
            .unwrap();
        assert_eq!(result.status, SolveStatus::OptimalInaccurate);
        assert_eq!(result.allocation.weight("A"), Some(1.0));
        assert!((result.expected_return - 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_validation_happens_before_solve() {
        let (returns, _) = market();
        let backend = ScriptedBackend::new(SolveStatus::Optimal);
        let optimizer = PortfolioOptimizer::with_backend(&backend);

        let mut carbon = AssetValues::new();
        carbon.insert("A".into(), 10.0);
        let err = optimizer
            .optimize(&returns, &carbon, &OptimizationParams::default())
            .unwrap_err();
        assert!(matches!(err, PortfolioError::MissingCarbonIntensity { asset } if asset == "B"));
        assert_eq!(backend.calls.get(), 0);
    }

    #[test]
    fn test_default_config() {
        let config = OptimizerConfig::default();
        assert_eq!(config.feasibility_tol, 1e-6);
    }
}

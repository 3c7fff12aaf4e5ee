//! # sustainable-portfolio
//!
//! Single-period portfolio allocation that maximizes expected return under
//! sustainability and risk constraints, plus the metrics used to evaluate the
//! result.
//!
//! ## Quick Start
//!
//! ```ignore
//! use sustainable_portfolio::prelude::*;
//!
//! let returns = ReturnMatrix::from_rows(["AAA", "BBB"], &rows)?;
//! let params = OptimizationParams::new()
//!     .with_max_carbon(120.0)
//!     .with_max_cvar(0.02);
//!
//! let allocation = optimize_portfolio(&returns, &carbon, &params)?;
//! let realized = returns.portfolio_returns(&allocation)?;
//! let summary = PerformanceSummary::evaluate(&realized, &MetricsConfig::default())?;
//! ```
//!
//! ## Constraints
//!
//! - **Budget**: weights sum to one (always)
//! - **Bounds**: per-asset `[lower, upper]`, long-only `[0, 1]` by default
//! - **Carbon**: weighted average carbon intensity below a cap
//! - **CVaR**: historical Conditional Value at Risk below a cap, linearized
//!   with one threshold and one shortfall variable per scenario
//! - **Turnover**: L1 distance to a previous allocation below a limit
//! - **Sectors**: aggregate weight per sector below its limit
//!
//! ## Architecture
//!
//! - **Formulation** (`optimizer`) builds a `ConeProgram` from market data
//! - **Stuffing** (`program`) converts it to `minimize q'x, Ax + s = b, s in K`
//! - **Backends** (`solver`) solve the stuffed program; Clarabel by default
//! - **Metrics** (`metrics`) are independent of the optimizer

pub mod data;
pub mod error;
pub mod metrics;
pub mod optimizer;
pub mod program;
pub mod solver;
pub mod sparse;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use sustainable_portfolio::prelude::*;
/// ```
pub mod prelude {
    // Data
    pub use crate::data::{Allocation, AssetValues, ReturnMatrix, ReturnSeries};

    // Metrics
    pub use crate::metrics::{
        annualized_return, annualized_volatility, conditional_value_at_risk, max_drawdown,
        value_at_risk, weighted_carbon_intensity, Drawdown, MetricsConfig, PerformanceSummary,
        ReturnSample, DEFAULT_CVAR_ALPHA, DEFAULT_PERIODS_PER_YEAR,
    };

    // Optimizer
    pub use crate::optimizer::{
        optimize_portfolio, ExpectedReturns, OptimizationParams, OptimizedPortfolio,
        OptimizerConfig, PortfolioOptimizer, DEFAULT_BOUNDS, UNBOUNDED_LIMIT,
    };

    // Solver
    pub use crate::solver::{ClarabelBackend, RawSolution, Settings, SolveStatus, SolverBackend};

    // Errors
    pub use crate::error::{PortfolioError, Result};
}

// Re-export main types at crate root
pub use data::{Allocation, AssetValues, ReturnMatrix, ReturnSeries};
pub use error::{PortfolioError, Result};
pub use optimizer::{optimize_portfolio, OptimizationParams, PortfolioOptimizer};

//! Optimization parameters.
//!
//! Every optional constraint is inactive unless its parameter is set. The
//! fallbacks are explicit:
//! - expected returns default to `ExpectedReturns::HistoricalMean`
//! - bounds default to `DEFAULT_BOUNDS` (long-only) per asset
//! - previous weights default to zero exposure for every asset

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::data::AssetValues;
use crate::metrics::DEFAULT_CVAR_ALPHA;

/// Bounds applied to assets without an explicit entry.
pub const DEFAULT_BOUNDS: (f64, f64) = (0.0, 1.0);

/// Limits at or beyond this magnitude are treated as absent.
pub const UNBOUNDED_LIMIT: f64 = 1e20;

/// Whether an upper limit actually restricts anything.
pub(crate) fn is_active_limit(limit: f64) -> bool {
    limit < UNBOUNDED_LIMIT
}

/// Source of the expected return vector used in the objective.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpectedReturns {
    /// Column-wise mean of the return matrix.
    #[default]
    HistoricalMean,
    /// Caller-supplied estimates; must cover every asset.
    Supplied(AssetValues),
}

/// Constraint parameters for one optimization call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizationParams {
    /// Expected returns for the objective.
    pub expected_returns: ExpectedReturns,
    /// Cap on the weighted average carbon intensity.
    pub max_carbon: Option<f64>,
    /// Cap on the historical CVaR of the portfolio loss.
    pub max_cvar: Option<f64>,
    /// Confidence level of the CVaR constraint.
    pub cvar_alpha: f64,
    /// Per-asset `(lower, upper)` bounds; values at or beyond
    /// `UNBOUNDED_LIMIT` in magnitude leave that side open.
    pub bounds: BTreeMap<String, (f64, f64)>,
    /// Cap on the L1 distance to `previous_weights`.
    pub turnover_limit: Option<f64>,
    /// Prior allocation for the turnover constraint; missing assets count as 0.
    pub previous_weights: Option<AssetValues>,
    /// Asset -> sector label.
    pub sector_map: Option<BTreeMap<String, String>>,
    /// Sector -> maximum aggregate weight.
    pub sector_limits: Option<BTreeMap<String, f64>>,
}

impl Default for OptimizationParams {
    fn default() -> Self {
        OptimizationParams {
            expected_returns: ExpectedReturns::HistoricalMean,
            max_carbon: None,
            max_cvar: None,
            cvar_alpha: DEFAULT_CVAR_ALPHA,
            bounds: BTreeMap::new(),
            turnover_limit: None,
            previous_weights: None,
            sector_map: None,
            sector_limits: None,
        }
    }
}

impl OptimizationParams {
    /// Parameters with no optional constraint active.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use caller-supplied expected returns.
    #[must_use]
    pub fn with_expected_returns(mut self, expected: AssetValues) -> Self {
        self.expected_returns = ExpectedReturns::Supplied(expected);
        self
    }

    /// Cap the weighted average carbon intensity.
    #[must_use]
    pub fn with_max_carbon(mut self, cap: f64) -> Self {
        self.max_carbon = Some(cap);
        self
    }

    /// Cap the portfolio CVaR at the configured confidence level.
    #[must_use]
    pub fn with_max_cvar(mut self, cap: f64) -> Self {
        self.max_cvar = Some(cap);
        self
    }

    /// Set the CVaR confidence level.
    #[must_use]
    pub fn with_cvar_alpha(mut self, alpha: f64) -> Self {
        self.cvar_alpha = alpha;
        self
    }

    /// Bound a single asset's weight.
    #[must_use]
    pub fn with_bound(mut self, asset: impl Into<String>, lower: f64, upper: f64) -> Self {
        self.bounds.insert(asset.into(), (lower, upper));
        self
    }

    /// Cap turnover relative to the previous weights.
    #[must_use]
    pub fn with_turnover_limit(mut self, limit: f64) -> Self {
        self.turnover_limit = Some(limit);
        self
    }

    /// Set the prior allocation used by the turnover constraint.
    #[must_use]
    pub fn with_previous_weights(mut self, previous: AssetValues) -> Self {
        self.previous_weights = Some(previous);
        self
    }

    /// Set both the sector map and the per-sector limits.
    #[must_use]
    pub fn with_sectors(
        mut self,
        sector_map: BTreeMap<String, String>,
        sector_limits: BTreeMap<String, f64>,
    ) -> Self {
        self.sector_map = Some(sector_map);
        self.sector_limits = Some(sector_limits);
        self
    }

    /// Bounds for an asset, falling back to `DEFAULT_BOUNDS`.
    pub fn bounds_for(&self, asset: &str) -> (f64, f64) {
        self.bounds.get(asset).copied().unwrap_or(DEFAULT_BOUNDS)
    }

    /// Previous weight for an asset, falling back to zero exposure.
    pub fn previous_weight_for(&self, asset: &str) -> f64 {
        self.previous_weights
            .as_ref()
            .and_then(|p| p.get(asset).copied())
            .unwrap_or(0.0)
    }
}

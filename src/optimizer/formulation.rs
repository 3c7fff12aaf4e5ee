//! Portfolio program formulation.
//!
//! Turns market data and `OptimizationParams` into a `ConeProgram`:
//!
//! ```text
//! maximize    mu'w
//! subject to  sum(w) = 1
//!             lower <= w <= upper
//!             c'w <= max_carbon                                   (carbon)
//!             u >= 0,  u_t >= -r_t'w - zeta                       (cvar)
//!             zeta + 1/((1 - alpha) T) * sum(u) <= max_cvar
//!             s >= 0,  s >= w - p,  s >= p - w,  sum(s) <= limit  (turnover)
//!             sum_{i in sector} w_i <= limit_sector               (sectors)
//! ```
//!
//! All input validation happens here, before any solver is involved.

use nalgebra::DVector;
use tracing::debug;

use super::params::{is_active_limit, ExpectedReturns, OptimizationParams};
use crate::data::{AssetValues, ReturnMatrix};
use crate::error::{PortfolioError, Result};
use crate::program::{ConeConstraint, ConeProgram, LinExpr, VarBlock};

/// A formulated portfolio program together with what is needed to read the
/// solution back.
#[derive(Debug, Clone)]
pub struct PortfolioProgram {
    /// The conic program.
    pub program: ConeProgram,
    /// Columns holding the asset weights.
    pub weights: VarBlock,
    /// Asset labels in weight order.
    pub assets: Vec<String>,
    /// Expected return vector used in the objective.
    pub expected_returns: DVector<f64>,
}

/// Validate the inputs and build the program.
pub fn formulate(
    returns: &ReturnMatrix,
    carbon_intensity: &AssetValues,
    params: &OptimizationParams,
) -> Result<PortfolioProgram> {
    if returns.is_empty() {
        return Err(PortfolioError::EmptyReturns);
    }
    if returns.values().iter().any(|r| !r.is_finite()) {
        return Err(PortfolioError::InvalidInput(
            "return matrix must contain only finite values".into(),
        ));
    }

    let assets = returns.assets().to_vec();
    let carbon = carbon_vector(&assets, carbon_intensity)?;
    let mu = expected_return_vector(returns, &params.expected_returns)?;
    validate_params(params)?;

    let mut program = ConeProgram::new();
    let w = program.add_variable("weights", assets.len());

    program.maximize(w.dot(mu.as_slice()));
    program.subject_to("budget", ConeConstraint::equals(w.sum(), 1.0));
    add_bounds(&mut program, w, &assets, params)?;

    if let Some(cap) = params.max_carbon.filter(|&c| is_active_limit(c)) {
        program.subject_to("carbon", ConeConstraint::leq(w.dot(&carbon), cap));
    }

    if let Some(cap) = params.max_cvar.filter(|&c| is_active_limit(c)) {
        add_cvar(&mut program, w, returns, params.cvar_alpha, cap);
    }

    if let Some(limit) = params.turnover_limit.filter(|&l| is_active_limit(l)) {
        let previous: Vec<f64> = assets
            .iter()
            .map(|a| params.previous_weight_for(a))
            .collect();
        add_turnover(&mut program, w, &previous, limit);
    }

    add_sectors(&mut program, w, &assets, params);

    debug!(
        assets = assets.len(),
        scenarios = returns.n_periods(),
        vars = program.num_vars(),
        constraints = program.constraints().len(),
        carbon = params.max_carbon.is_some(),
        cvar = params.max_cvar.is_some(),
        turnover = params.turnover_limit.is_some(),
        sectors = params.sector_limits.is_some(),
        "Formulated portfolio program"
    );

    Ok(PortfolioProgram {
        program,
        weights: w,
        assets,
        expected_returns: mu,
    })
}

fn carbon_vector(assets: &[String], carbon: &AssetValues) -> Result<Vec<f64>> {
    assets
        .iter()
        .map(|asset| {
            let c = carbon
                .get(asset)
                .copied()
                .ok_or_else(|| PortfolioError::MissingCarbonIntensity {
                    asset: asset.clone(),
                })?;
            if !c.is_finite() || c < 0.0 {
                return Err(PortfolioError::InvalidInput(format!(
                    "carbon intensity of '{}' must be a non-negative number, got {}",
                    asset, c
                )));
            }
            Ok(c)
        })
        .collect()
}

fn expected_return_vector(
    returns: &ReturnMatrix,
    expected: &ExpectedReturns,
) -> Result<DVector<f64>> {
    match expected {
        ExpectedReturns::HistoricalMean => Ok(returns.column_means()),
        ExpectedReturns::Supplied(values) => {
            let mu = returns
                .assets()
                .iter()
                .map(|asset| {
                    values
                        .get(asset)
                        .copied()
                        .filter(|v| v.is_finite())
                        .ok_or_else(|| PortfolioError::MissingExpectedReturn {
                            asset: asset.clone(),
                        })
                })
                .collect::<Result<Vec<f64>>>()?;
            Ok(DVector::from_vec(mu))
        }
    }
}

fn validate_params(params: &OptimizationParams) -> Result<()> {
    match (&params.sector_map, &params.sector_limits) {
        (None, Some(_)) => return Err(PortfolioError::MissingSectorMap),
        (Some(_), None) => return Err(PortfolioError::MissingSectorLimits),
        _ => {}
    }

    if !(params.cvar_alpha > 0.0 && params.cvar_alpha < 1.0) {
        return Err(PortfolioError::InvalidInput(format!(
            "cvar_alpha must lie in (0, 1), got {}",
            params.cvar_alpha
        )));
    }

    let caps = [
        ("max_carbon", params.max_carbon),
        ("max_cvar", params.max_cvar),
        ("turnover_limit", params.turnover_limit),
    ];
    for (name, cap) in caps {
        if let Some(v) = cap {
            if !v.is_finite() {
                return Err(PortfolioError::InvalidInput(format!(
                    "{} must be finite, got {}",
                    name, v
                )));
            }
        }
    }

    if let Some(limits) = &params.sector_limits {
        if let Some((sector, v)) = limits.iter().find(|(_, v)| !v.is_finite()) {
            return Err(PortfolioError::InvalidInput(format!(
                "limit for sector '{}' must be finite, got {}",
                sector, v
            )));
        }
    }

    if let Some(previous) = &params.previous_weights {
        if let Some((asset, _)) = previous.iter().find(|(_, v)| !v.is_finite()) {
            return Err(PortfolioError::InvalidInput(format!(
                "previous weight of '{}' must be finite",
                asset
            )));
        }
    }

    Ok(())
}

fn add_bounds(
    program: &mut ConeProgram,
    w: VarBlock,
    assets: &[String],
    params: &OptimizationParams,
) -> Result<()> {
    for (i, asset) in assets.iter().enumerate() {
        let (lower, upper) = params.bounds_for(asset);
        if lower.is_nan() || upper.is_nan() || lower > upper {
            return Err(PortfolioError::InvalidInput(format!(
                "invalid bounds for '{}': ({}, {})",
                asset, lower, upper
            )));
        }
        if is_active_limit(-lower) {
            program.subject_to("lower_bound", ConeConstraint::geq(w.at(i), lower));
        }
        if is_active_limit(upper) {
            program.subject_to("upper_bound", ConeConstraint::leq(w.at(i), upper));
        }
    }
    Ok(())
}

/// Scenario-based CVaR epigraph: one free threshold and one non-negative
/// shortfall per historical period.
fn add_cvar(program: &mut ConeProgram, w: VarBlock, returns: &ReturnMatrix, alpha: f64, cap: f64) {
    let n_scenarios = returns.n_periods();
    let zeta = program.add_variable("cvar_threshold", 1);
    let u = program.add_nonneg_variable("cvar_shortfall", n_scenarios);

    let values = returns.values();
    for t in 0..n_scenarios {
        let scenario: Vec<f64> = values.row(t).iter().copied().collect();
        let loss = -w.dot(&scenario);
        // u_t >= loss_t - zeta
        program.subject_to(
            "cvar_shortfall",
            ConeConstraint::geq(u.at(t), loss - zeta.at(0)),
        );
    }

    let scale = 1.0 / ((1.0 - alpha) * n_scenarios as f64);
    let cvar = zeta.at(0) + scale * u.sum();
    program.subject_to("cvar_cap", ConeConstraint::leq(cvar, cap));
}

/// L1 turnover through absolute-value auxiliaries.
fn add_turnover(program: &mut ConeProgram, w: VarBlock, previous: &[f64], limit: f64) {
    let s = program.add_nonneg_variable("turnover_abs", w.len);
    let rows = previous.iter().enumerate().flat_map(|(i, &p)| {
        let change = w.at(i) - p;
        [
            ConeConstraint::geq(s.at(i), change.clone()),
            ConeConstraint::geq(s.at(i), -change),
        ]
    });
    program.subject_to_all("turnover_abs", rows);
    program.subject_to("turnover_cap", ConeConstraint::leq(s.sum(), limit));
}

fn add_sectors(
    program: &mut ConeProgram,
    w: VarBlock,
    assets: &[String],
    params: &OptimizationParams,
) {
    let (Some(sector_map), Some(limits)) = (&params.sector_map, &params.sector_limits) else {
        return;
    };
    for (sector, &limit) in limits {
        if !is_active_limit(limit) {
            debug!(sector = %sector, limit, "Sector limit is unbounded; skipped");
            continue;
        }
        let members: Vec<usize> = assets
            .iter()
            .enumerate()
            .filter(|(_, a)| sector_map.get(*a) == Some(sector))
            .map(|(i, _)| i)
            .collect();
        if members.is_empty() {
            debug!(sector = %sector, "Sector has no assets in the universe; skipped");
            continue;
        }
        let exposure: LinExpr = members.iter().map(|&i| w.at(i)).sum();
        program.subject_to(
            format!("sector:{}", sector),
            ConeConstraint::leq(exposure, limit),
        );
    }
}

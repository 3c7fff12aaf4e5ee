//! Sustainable Portfolio Example
//!
//! Rebalances an equally weighted book of four assets:
//!
//! maximize    mu' w                         (expected return)
//! subject to  sum(w) = 1                    (fully invested)
//!             0 <= w <= 1                   (long-only)
//!             c' w <= 150                   (carbon intensity)
//!             CVaR_95(-R w) <= 20%          (tail risk)
//!             ||w - w_prev||_1 <= 0.3       (turnover)
//!
//! Run with `RUST_LOG=debug` to see the formulation and solver logs.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use sustainable_portfolio::prelude::*;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Sustainable Portfolio ===\n");

    let assets = ["AAA", "BBB", "CCC", "DDD"];
    let periods = 252;

    // One year of synthetic daily returns
    let mut rng = StdRng::seed_from_u64(42);
    let normal = Normal::new(0.0005, 0.01).map_err(|e| PortfolioError::InvalidInput(e.to_string()))?;
    let values = DMatrix::from_fn(periods, assets.len(), |_, _| normal.sample(&mut rng));
    let start = NaiveDate::from_ymd_opt(2024, 1, 1)
        .ok_or_else(|| PortfolioError::InvalidInput("bad start date".into()))?;
    let dates = start.iter_days().take(periods).collect();
    let returns = ReturnMatrix::new(assets, values)?.with_dates(dates)?;

    let carbon: AssetValues = assets
        .iter()
        .zip([100.0, 150.0, 90.0, 200.0])
        .map(|(a, c)| (a.to_string(), c))
        .collect();
    let previous: AssetValues = assets.iter().map(|a| (a.to_string(), 0.25)).collect();

    println!("Assets: {}", assets.join(", "));
    println!("Carbon intensity: [100, 150, 90, 200]");
    println!("Previous weights: 25% each\n");

    let params = OptimizationParams::new()
        .with_max_carbon(150.0)
        .with_max_cvar(0.2)
        .with_turnover_limit(0.3)
        .with_previous_weights(previous.clone());

    let result = PortfolioOptimizer::new(Settings::default()).optimize(&returns, &carbon, &params)?;

    println!("Optimal Portfolio ({}):", result.status);
    for (asset, w) in result.allocation.iter() {
        println!("  {}: {:.2}%", asset, w * 100.0);
    }

    let realized = returns.portfolio_returns(&result.allocation)?;
    let summary = PerformanceSummary::evaluate(&realized, &MetricsConfig::default())?;

    println!("\nPortfolio Statistics:");
    println!("  Expected daily return: {:.4}%", result.expected_return * 100.0);
    println!("  Annualized return:     {:.2}%", summary.annualized_return * 100.0);
    if let Some(vol) = summary.annualized_volatility {
        println!("  Annualized volatility: {:.2}%", vol * 100.0);
    }
    println!("  CVaR (95%):            {:.2}%", summary.cvar * 100.0);
    println!("  Max drawdown:          {:.2}%", summary.drawdown.max_drawdown * 100.0);
    if let (Some(peak), Some(trough)) = (summary.drawdown.peak_date, summary.drawdown.trough_date) {
        println!("    from {} to {}", peak, trough);
    }
    println!(
        "  Carbon intensity:      {:.1}",
        weighted_carbon_intensity(&result.allocation, &carbon)?
    );
    println!("  Turnover:              {:.3}", result.allocation.turnover(&previous));
    println!(
        "  Solver:                {} iterations, {:.3}s",
        result.iterations, result.solve_time
    );

    // Same book with an energy sector capped at 40%
    let sector_map: BTreeMap<String, String> = [("AAA", "energy"), ("DDD", "energy")]
        .into_iter()
        .map(|(a, s)| (a.to_string(), s.to_string()))
        .collect();
    let sector_limits = [("energy".to_string(), 0.4)].into_iter().collect();
    let capped = optimize_portfolio(
        &returns,
        &carbon,
        &params.with_sectors(sector_map, sector_limits),
    )?;

    println!("\nWith energy capped at 40%:");
    for (asset, w) in capped.iter() {
        println!("  {}: {:.2}%", asset, w * 100.0);
    }

    Ok(())
}

//! Performance and risk metrics for realized returns.
//!
//! All functions are pure. Return and volatility accept any `ReturnSample`
//! (a series, a whole matrix, or a slice); for a matrix the statistic is taken
//! over every cell.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::data::{Allocation, AssetValues, ReturnMatrix, ReturnSeries};
use crate::error::{PortfolioError, Result};

/// Trading days per year.
pub const DEFAULT_PERIODS_PER_YEAR: u32 = 252;

/// Confidence level used for CVaR unless configured otherwise.
pub const DEFAULT_CVAR_ALPHA: f64 = 0.95;

/// Anything that can be viewed as a flat sample of periodic returns.
pub trait ReturnSample {
    /// All observations; order is irrelevant to the statistics here.
    fn observations(&self) -> &[f64];
}

impl ReturnSample for ReturnSeries {
    fn observations(&self) -> &[f64] {
        self.values()
    }
}

impl ReturnSample for ReturnMatrix {
    fn observations(&self) -> &[f64] {
        self.values().as_slice()
    }
}

impl ReturnSample for [f64] {
    fn observations(&self) -> &[f64] {
        self
    }
}

impl ReturnSample for Vec<f64> {
    fn observations(&self) -> &[f64] {
        self
    }
}

fn mean(xs: &[f64]) -> f64 {
    xs.iter().sum::<f64>() / xs.len() as f64
}

fn non_empty<S: ReturnSample + ?Sized>(returns: &S) -> Result<&[f64]> {
    let xs = returns.observations();
    if xs.is_empty() {
        return Err(PortfolioError::EmptySeries);
    }
    Ok(xs)
}

/// Compound the mean periodic return to an annual figure:
/// `(1 + mean)^periods_per_year - 1`.
pub fn annualized_return<S: ReturnSample + ?Sized>(
    returns: &S,
    periods_per_year: u32,
) -> Result<f64> {
    let xs = non_empty(returns)?;
    Ok((1.0 + mean(xs)).powf(f64::from(periods_per_year)) - 1.0)
}

/// Sample standard deviation (n - 1 denominator) scaled by `sqrt(periods_per_year)`.
pub fn annualized_volatility<S: ReturnSample + ?Sized>(
    returns: &S,
    periods_per_year: u32,
) -> Result<f64> {
    let xs = non_empty(returns)?;
    if xs.len() < 2 {
        return Err(PortfolioError::InsufficientData(
            "volatility needs at least two observations".into(),
        ));
    }
    let m = mean(xs);
    let var = xs.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (xs.len() - 1) as f64;
    Ok(var.sqrt() * f64::from(periods_per_year).sqrt())
}

fn check_alpha(alpha: f64) -> Result<()> {
    if (0.0..=1.0).contains(&alpha) {
        Ok(())
    } else {
        Err(PortfolioError::InvalidInput(format!(
            "confidence level must lie in [0, 1], got {}",
            alpha
        )))
    }
}

/// Quantile of a sorted sample, interpolating linearly between order statistics.
fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let h = (sorted.len() - 1) as f64 * q;
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
}

fn sorted_losses<S: ReturnSample + ?Sized>(returns: &S) -> Result<Vec<f64>> {
    let xs = non_empty(returns)?;
    if xs.iter().any(|x| !x.is_finite()) {
        return Err(PortfolioError::InvalidInput(
            "returns must be finite numbers".into(),
        ));
    }
    let mut losses: Vec<f64> = xs.iter().map(|r| -r).collect();
    losses.sort_by(f64::total_cmp);
    Ok(losses)
}

/// Historical Value at Risk: the `alpha`-quantile of losses (negated returns).
pub fn value_at_risk<S: ReturnSample + ?Sized>(returns: &S, alpha: f64) -> Result<f64> {
    check_alpha(alpha)?;
    let losses = sorted_losses(returns)?;
    Ok(quantile_sorted(&losses, alpha))
}

/// Conditional Value at Risk: mean of the losses at or above the VaR threshold.
///
/// If no loss reaches the threshold, the threshold itself is returned.
pub fn conditional_value_at_risk<S: ReturnSample + ?Sized>(returns: &S, alpha: f64) -> Result<f64> {
    check_alpha(alpha)?;
    let losses = sorted_losses(returns)?;
    let var = quantile_sorted(&losses, alpha);
    let tail: Vec<f64> = losses.iter().copied().filter(|&l| l >= var).collect();
    if tail.is_empty() {
        return Ok(var);
    }
    Ok(mean(&tail))
}

/// Worst peak-to-trough decline of a return series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Drawdown {
    /// Magnitude of the worst drawdown (positive).
    pub max_drawdown: f64,
    /// Index of the running peak preceding the trough.
    pub peak: usize,
    /// Index of the trough.
    pub trough: usize,
    /// Date of the peak, when the series is dated.
    pub peak_date: Option<NaiveDate>,
    /// Date of the trough, when the series is dated.
    pub trough_date: Option<NaiveDate>,
}

/// Maximum drawdown of the compounded wealth curve.
///
/// The reported peak is the highest wealth at or before the trough, not the
/// global maximum of the series. Ties resolve to the earliest period.
pub fn max_drawdown(returns: &ReturnSeries) -> Result<Drawdown> {
    let xs = non_empty(returns)?;

    let mut cumulative = Vec::with_capacity(xs.len());
    let mut wealth = 1.0;
    for r in xs {
        wealth *= 1.0 + r;
        cumulative.push(wealth);
    }

    let mut running_peak = f64::NEG_INFINITY;
    let mut trough = 0;
    let mut worst = f64::INFINITY;
    for (i, &c) in cumulative.iter().enumerate() {
        running_peak = running_peak.max(c);
        let dd = (c - running_peak) / running_peak;
        if dd < worst {
            worst = dd;
            trough = i;
        }
    }

    // Peak search restricted to the prefix ending at the trough.
    let mut peak = 0;
    for (i, &c) in cumulative.iter().enumerate().take(trough + 1) {
        if c > cumulative[peak] {
            peak = i;
        }
    }

    Ok(Drawdown {
        max_drawdown: worst.abs(),
        peak,
        trough,
        peak_date: returns.date(peak),
        trough_date: returns.date(trough),
    })
}

/// Weighted average carbon intensity `sum_i w_i * c_i` of an allocation.
pub fn weighted_carbon_intensity(allocation: &Allocation, carbon: &AssetValues) -> Result<f64> {
    allocation
        .iter()
        .map(|(asset, w)| {
            carbon
                .get(asset)
                .map(|c| w * c)
                .ok_or_else(|| PortfolioError::MissingCarbonIntensity {
                    asset: asset.to_string(),
                })
        })
        .sum()
}

/// Parameters for `PerformanceSummary`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Periods per year used to annualize.
    pub periods_per_year: u32,
    /// CVaR confidence level.
    pub cvar_alpha: f64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        MetricsConfig {
            periods_per_year: DEFAULT_PERIODS_PER_YEAR,
            cvar_alpha: DEFAULT_CVAR_ALPHA,
        }
    }
}

impl MetricsConfig {
    /// Set the annualization factor (e.g. 12 for monthly data).
    #[must_use]
    pub fn with_periods_per_year(mut self, periods_per_year: u32) -> Self {
        self.periods_per_year = periods_per_year;
        self
    }

    /// Set the CVaR confidence level.
    #[must_use]
    pub fn with_cvar_alpha(mut self, alpha: f64) -> Self {
        self.cvar_alpha = alpha;
        self
    }
}

/// The standard set of metrics for a realized return series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub annualized_return: f64,
    /// `None` for a single observation.
    pub annualized_volatility: Option<f64>,
    pub cvar: f64,
    pub drawdown: Drawdown,
}

impl PerformanceSummary {
    /// Compute all metrics for `returns`.
    ///
    /// Fails on an empty series or an invalid confidence level. A single
    /// observation yields every metric except volatility.
    pub fn evaluate(returns: &ReturnSeries, config: &MetricsConfig) -> Result<Self> {
        let annualized_volatility = if returns.len() < 2 {
            None
        } else {
            Some(annualized_volatility(returns, config.periods_per_year)?)
        };
        Ok(PerformanceSummary {
            annualized_return: annualized_return(returns, config.periods_per_year)?,
            annualized_volatility,
            cvar: conditional_value_at_risk(returns, config.cvar_alpha)?,
            drawdown: max_drawdown(returns)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-12;

    #[test]
    fn test_quantile_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!((quantile_sorted(&sorted, 0.5) - 3.0).abs() < TOL);
        assert!((quantile_sorted(&sorted, 0.95) - 4.8).abs() < TOL);
        assert!((quantile_sorted(&sorted, 0.0) - 1.0).abs() < TOL);
        assert!((quantile_sorted(&[7.0], 0.95) - 7.0).abs() < TOL);
    }

    #[test]
    fn test_cvar_tail_mean() {
        // losses sorted: -0.03, -0.01, 0.0, 0.02, 0.04; VaR(0.5) = 0.0
        let returns = vec![0.01, -0.02, 0.0, 0.03, -0.04];
        let var = value_at_risk(&returns, 0.5).unwrap();
        assert!(var.abs() < TOL);
        let cvar = conditional_value_at_risk(&returns, 0.5).unwrap();
        assert!((cvar - 0.02).abs() < TOL, "Expected 0.02, got {}", cvar);
    }

    #[test]
    fn test_alpha_out_of_range() {
        let returns = vec![0.01, 0.02];
        assert!(conditional_value_at_risk(&returns, 1.5).is_err());
        assert!(conditional_value_at_risk(&returns, -0.1).is_err());
        assert!(value_at_risk(&returns, f64::NAN).is_err());
    }

    #[test]
    fn test_alpha_endpoints() {
        // losses sorted: -0.03, -0.01, 0.02, 0.05
        let returns = vec![0.01, -0.05, 0.03, -0.02];
        let worst = conditional_value_at_risk(&returns, 1.0).unwrap();
        assert!((worst - 0.05).abs() < TOL, "Expected 0.05, got {}", worst);
        assert!((value_at_risk(&returns, 1.0).unwrap() - 0.05).abs() < TOL);
        let all = conditional_value_at_risk(&returns, 0.0).unwrap();
        assert!((all - 0.0075).abs() < TOL, "Expected 0.0075, got {}", all);
        assert!((value_at_risk(&returns, 0.0).unwrap() + 0.03).abs() < TOL);
    }

    #[test]
    fn test_non_finite_rejected() {
        let returns = vec![0.01, f64::NAN];
        assert!(matches!(
            conditional_value_at_risk(&returns, 0.95),
            Err(PortfolioError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_volatility_needs_two_points() {
        assert!(matches!(
            annualized_volatility(&vec![0.01], 252),
            Err(PortfolioError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_drawdown_simple() {
        // wealth: 1.1, 0.99, 1.089
        let series = ReturnSeries::new(vec![0.1, -0.1, 0.1]);
        let dd = max_drawdown(&series).unwrap();
        assert_eq!(dd.peak, 0);
        assert_eq!(dd.trough, 1);
        assert!((dd.max_drawdown - 0.1).abs() < 1e-12);
        assert_eq!(dd.peak_date, None);
    }

    #[test]
    fn test_weighted_carbon() {
        let alloc = Allocation::new(vec!["A".into(), "B".into()], vec![0.25, 0.75]).unwrap();
        let carbon: AssetValues = [("A".to_string(), 100.0), ("B".to_string(), 200.0)]
            .into_iter()
            .collect();
        let ci = weighted_carbon_intensity(&alloc, &carbon).unwrap();
        assert!((ci - 175.0).abs() < 1e-9);

        let partial: AssetValues = [("A".to_string(), 100.0)].into_iter().collect();
        assert!(matches!(
            weighted_carbon_intensity(&alloc, &partial),
            Err(PortfolioError::MissingCarbonIntensity { .. })
        ));
    }

    #[test]
    fn test_default_config() {
        let config = MetricsConfig::default();
        assert_eq!(config.periods_per_year, 252);
        assert_eq!(config.cvar_alpha, 0.95);
        let monthly = config.with_periods_per_year(12);
        assert_eq!(monthly.periods_per_year, 12);
    }
}

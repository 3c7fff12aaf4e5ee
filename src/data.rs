//! Market data and allocation types.
//!
//! - `ReturnMatrix`: periods x assets of decimal periodic returns
//! - `ReturnSeries`: a single return series, e.g. a portfolio's realized returns
//! - `AssetValues`: asset-keyed scalars (carbon intensities, weights, ...)
//! - `Allocation`: the labeled optimizer output

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::{PortfolioError, Result};

/// Mapping from asset identifier to a scalar.
pub type AssetValues = BTreeMap<String, f64>;

/// Historical returns: one row per period, one column per asset.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnMatrix {
    assets: Vec<String>,
    dates: Option<Vec<NaiveDate>>,
    values: DMatrix<f64>,
}

impl ReturnMatrix {
    /// Create a return matrix from asset labels and a periods x assets matrix.
    ///
    /// A matrix with no rows is accepted here; consumers that need data
    /// reject it.
    pub fn new<S: Into<String>>(
        assets: impl IntoIterator<Item = S>,
        values: DMatrix<f64>,
    ) -> Result<Self> {
        let assets: Vec<String> = assets.into_iter().map(Into::into).collect();
        if assets.len() != values.ncols() {
            return Err(PortfolioError::ShapeMismatch {
                expected: format!("{} columns", assets.len()),
                got: format!("{} columns", values.ncols()),
            });
        }
        let mut seen = HashSet::new();
        if let Some(dup) = assets.iter().find(|a| !seen.insert(a.as_str())) {
            return Err(PortfolioError::InvalidInput(format!(
                "duplicate asset label '{}'",
                dup
            )));
        }
        Ok(ReturnMatrix {
            assets,
            dates: None,
            values,
        })
    }

    /// Create a return matrix from row-major period vectors.
    pub fn from_rows<S: Into<String>>(
        assets: impl IntoIterator<Item = S>,
        rows: &[Vec<f64>],
    ) -> Result<Self> {
        let assets: Vec<String> = assets.into_iter().map(Into::into).collect();
        let ncols = assets.len();
        if let Some(bad) = rows.iter().find(|r| r.len() != ncols) {
            return Err(PortfolioError::ShapeMismatch {
                expected: format!("rows of length {}", ncols),
                got: format!("row of length {}", bad.len()),
            });
        }
        let values = DMatrix::from_fn(rows.len(), ncols, |i, j| rows[i][j]);
        Self::new(assets, values)
    }

    /// Attach one date per period.
    pub fn with_dates(mut self, dates: Vec<NaiveDate>) -> Result<Self> {
        if dates.len() != self.values.nrows() {
            return Err(PortfolioError::ShapeMismatch {
                expected: format!("{} dates", self.values.nrows()),
                got: format!("{} dates", dates.len()),
            });
        }
        self.dates = Some(dates);
        Ok(self)
    }

    /// Asset labels in column order.
    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    /// Period dates, if attached.
    pub fn dates(&self) -> Option<&[NaiveDate]> {
        self.dates.as_deref()
    }

    /// The raw periods x assets matrix.
    pub fn values(&self) -> &DMatrix<f64> {
        &self.values
    }

    /// Number of periods (scenarios).
    pub fn n_periods(&self) -> usize {
        self.values.nrows()
    }

    /// Number of assets.
    pub fn n_assets(&self) -> usize {
        self.values.ncols()
    }

    /// True when there are no periods or no assets.
    pub fn is_empty(&self) -> bool {
        self.values.nrows() == 0 || self.values.ncols() == 0
    }

    /// Column index of an asset.
    pub fn asset_index(&self, asset: &str) -> Option<usize> {
        self.assets.iter().position(|a| a == asset)
    }

    /// Column-wise mean return per asset.
    pub fn column_means(&self) -> DVector<f64> {
        let n = self.values.nrows().max(1) as f64;
        DVector::from_iterator(
            self.values.ncols(),
            self.values.column_iter().map(|c| c.sum() / n),
        )
    }

    /// One asset's return series.
    pub fn column(&self, asset: &str) -> Option<ReturnSeries> {
        let j = self.asset_index(asset)?;
        Some(ReturnSeries {
            values: self.values.column(j).iter().copied().collect(),
            dates: self.dates.clone(),
        })
    }

    /// Project the matrix through an allocation: `r_t = sum_i w_i * R[t, i]`.
    ///
    /// Assets of the matrix absent from the allocation get zero weight.
    pub fn portfolio_returns(&self, allocation: &Allocation) -> Result<ReturnSeries> {
        let mut w = DVector::zeros(self.n_assets());
        for (asset, weight) in allocation.iter() {
            let j = self.asset_index(asset).ok_or_else(|| PortfolioError::ShapeMismatch {
                expected: "allocation over the matrix assets".into(),
                got: format!("unknown asset '{}'", asset),
            })?;
            w[j] = weight;
        }
        let projected = &self.values * w;
        Ok(ReturnSeries {
            values: projected.iter().copied().collect(),
            dates: self.dates.clone(),
        })
    }
}

/// A single series of periodic returns.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReturnSeries {
    values: Vec<f64>,
    dates: Option<Vec<NaiveDate>>,
}

impl ReturnSeries {
    /// Create an undated series.
    pub fn new(values: Vec<f64>) -> Self {
        ReturnSeries {
            values,
            dates: None,
        }
    }

    /// Attach one date per period.
    pub fn with_dates(mut self, dates: Vec<NaiveDate>) -> Result<Self> {
        if dates.len() != self.values.len() {
            return Err(PortfolioError::ShapeMismatch {
                expected: format!("{} dates", self.values.len()),
                got: format!("{} dates", dates.len()),
            });
        }
        self.dates = Some(dates);
        Ok(self)
    }

    /// The observations.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Date of period `i`, if dates are attached.
    pub fn date(&self, i: usize) -> Option<NaiveDate> {
        self.dates.as_ref().and_then(|d| d.get(i).copied())
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when there are no observations.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<Vec<f64>> for ReturnSeries {
    fn from(values: Vec<f64>) -> Self {
        ReturnSeries::new(values)
    }
}

/// Portfolio weights keyed by asset, in the universe's column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    assets: Vec<String>,
    weights: DVector<f64>,
}

impl Allocation {
    /// Create an allocation from parallel asset and weight lists.
    pub fn new(assets: Vec<String>, weights: Vec<f64>) -> Result<Self> {
        if assets.len() != weights.len() {
            return Err(PortfolioError::ShapeMismatch {
                expected: format!("{} weights", assets.len()),
                got: format!("{} weights", weights.len()),
            });
        }
        Ok(Allocation {
            assets,
            weights: DVector::from_vec(weights),
        })
    }

    /// Asset labels in order.
    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    /// Weight vector in asset order.
    pub fn weights(&self) -> &DVector<f64> {
        &self.weights
    }

    /// Weight of a single asset.
    pub fn weight(&self, asset: &str) -> Option<f64> {
        self.assets
            .iter()
            .position(|a| a == asset)
            .map(|i| self.weights[i])
    }

    /// `(asset, weight)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.assets
            .iter()
            .map(String::as_str)
            .zip(self.weights.iter().copied())
    }

    /// Number of assets.
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// True for an allocation over no assets.
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Sum of weights.
    pub fn total(&self) -> f64 {
        self.weights.sum()
    }

    /// L1 distance to another set of weights; assets missing there count as 0.
    pub fn turnover(&self, previous: &AssetValues) -> f64 {
        self.iter()
            .map(|(asset, w)| (w - previous.get(asset).copied().unwrap_or(0.0)).abs())
            .sum()
    }

    /// Convert to an asset-keyed map, e.g. to reuse as previous weights.
    pub fn to_asset_values(&self) -> AssetValues {
        self.iter().map(|(a, w)| (a.to_string(), w)).collect()
    }
}

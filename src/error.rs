//! Error types for sustainable-portfolio.

use thiserror::Error;

/// Error type for optimization and metric computations.
#[derive(Debug, Error)]
pub enum PortfolioError {
    /// The return matrix has no periods or no assets.
    #[error("Return matrix must not be empty")]
    EmptyReturns,

    /// An asset of the universe has no carbon intensity.
    #[error("Carbon intensity must be provided for all assets (missing: {asset})")]
    MissingCarbonIntensity { asset: String },

    /// Supplied expected returns do not cover an asset of the universe.
    #[error("Expected return must be provided for all assets (missing: {asset})")]
    MissingExpectedReturn { asset: String },

    /// Sector limits were supplied without a sector map.
    #[error("A sector map must be provided when sector limits are used")]
    MissingSectorMap,

    /// A sector map was supplied without sector limits.
    #[error("Sector limits must be provided when a sector map is used")]
    MissingSectorLimits,

    /// A return series with no observations was given to a metric.
    #[error("Returns series cannot be empty")]
    EmptySeries,

    /// Not enough observations for the requested statistic.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Shape mismatch between labels and values.
    #[error("Shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: String, got: String },

    /// Invalid parameter value.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The backend finished without a usable solution.
    #[error("Optimisation failed: {status}")]
    Optimization { status: String },

    /// The backend could not be configured or run.
    #[error("Solver error: {0}")]
    Solver(String),
}

/// Result type for sustainable-portfolio operations.
pub type Result<T> = std::result::Result<T, PortfolioError>;

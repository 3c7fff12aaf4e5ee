//! End-to-end optimizer tests against the Clarabel backend.
//!
//! The market is a seeded synthetic universe of four assets over 252 daily
//! periods with carbon intensities [100, 150, 90, 200].

use std::cell::Cell;
use std::collections::BTreeMap;

use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use sustainable_portfolio::prelude::*;
use sustainable_portfolio::program::StuffedProgram;

/// Tolerance for constraint satisfaction and weight comparisons
const TOL: f64 = 1e-5;

const ASSETS: [&str; 4] = ["AAA", "BBB", "CCC", "DDD"];

fn synthetic_returns(periods: usize, seed: u64) -> ReturnMatrix {
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0005, 0.01).expect("valid normal");
    let values = DMatrix::from_fn(periods, ASSETS.len(), |_, _| normal.sample(&mut rng));
    ReturnMatrix::new(ASSETS, values).expect("valid matrix")
}

fn carbon() -> AssetValues {
    ASSETS
        .iter()
        .zip([100.0, 150.0, 90.0, 200.0])
        .map(|(a, c)| (a.to_string(), c))
        .collect()
}

fn asset_values(values: [f64; 4]) -> AssetValues {
    ASSETS
        .iter()
        .zip(values)
        .map(|(a, v)| (a.to_string(), v))
        .collect()
}

/// Expected returns with a clear ranking: BBB > CCC > AAA > DDD.
fn ranked_expected_returns() -> AssetValues {
    asset_values([0.01, 0.03, 0.02, 0.005])
}

fn equal_weights() -> AssetValues {
    asset_values([0.25; 4])
}

fn solve(returns: &ReturnMatrix, params: &OptimizationParams) -> OptimizedPortfolio {
    PortfolioOptimizer::new(Settings::default())
        .optimize(returns, &carbon(), params)
        .expect("optimization should succeed")
}

fn assert_budget_and_bounds(allocation: &Allocation, params: &OptimizationParams) {
    let total = allocation.total();
    assert!((total - 1.0).abs() < TOL, "weights sum to {}", total);
    for (asset, w) in allocation.iter() {
        let (lo, hi) = params.bounds_for(asset);
        assert!(
            w >= lo - TOL && w <= hi + TOL,
            "{} = {} outside [{}, {}]",
            asset,
            w,
            lo,
            hi
        );
    }
}

fn assert_weight(allocation: &Allocation, asset: &str, expected: f64) {
    let w = allocation.weight(asset).expect("asset present");
    assert!(
        (w - expected).abs() < TOL,
        "{}: expected {}, got {}",
        asset,
        expected,
        w
    );
}

fn sectors(map: &[(&str, &str)], limits: &[(&str, f64)]) -> (BTreeMap<String, String>, BTreeMap<String, f64>) {
    (
        map.iter()
            .map(|(a, s)| (a.to_string(), s.to_string()))
            .collect(),
        limits.iter().map(|(s, l)| (s.to_string(), *l)).collect(),
    )
}

/// Backend that counts calls and never produces a solution.
struct CountingBackend {
    calls: Cell<usize>,
}

impl SolverBackend for CountingBackend {
    fn name(&self) -> &str {
        "counting"
    }

    fn solve(&self, _program: &StuffedProgram) -> Result<RawSolution> {
        self.calls.set(self.calls.get() + 1);
        Ok(RawSolution::failed(SolveStatus::Unknown))
    }
}

// ========== Budget and bounds ==========

#[test]
fn test_weights_sum_to_one_and_respect_bounds() {
    let returns = synthetic_returns(252, 42);
    let params = OptimizationParams::new()
        .with_bound("AAA", 0.1, 0.4)
        .with_bound("BBB", 0.0, 0.5)
        .with_max_carbon(140.0)
        .with_max_cvar(0.02);

    let result = solve(&returns, &params);

    assert!(result.status.is_usable());
    assert_budget_and_bounds(&result.allocation, &params);
    assert_eq!(result.allocation.assets(), &ASSETS.map(String::from));
}

#[test]
fn test_unconstrained_picks_best_asset() {
    let returns = synthetic_returns(252, 42);
    let params = OptimizationParams::new().with_expected_returns(ranked_expected_returns());

    let result = solve(&returns, &params);

    assert_weight(&result.allocation, "BBB", 1.0);
    assert!((result.expected_return - 0.03).abs() < TOL);
}

#[test]
fn test_upper_bound_spills_to_next_best() {
    let returns = synthetic_returns(252, 42);
    let params = OptimizationParams::new()
        .with_expected_returns(ranked_expected_returns())
        .with_bound("BBB", 0.0, 0.6);

    let result = solve(&returns, &params);

    assert_weight(&result.allocation, "BBB", 0.6);
    assert_weight(&result.allocation, "CCC", 0.4);
    assert_budget_and_bounds(&result.allocation, &params);
}

#[test]
fn test_historical_mean_is_default_objective() {
    let returns = synthetic_returns(252, 7);
    let means = returns.column_means();
    let best = means.imax();

    let result = solve(&returns, &OptimizationParams::default());

    assert_weight(&result.allocation, ASSETS[best], 1.0);
    assert!((result.expected_return - means[best]).abs() < TOL);
}

// ========== Carbon ==========

#[test]
fn test_carbon_cap_is_respected() {
    let returns = synthetic_returns(252, 42);
    let params = OptimizationParams::new().with_max_carbon(120.0);

    let result = solve(&returns, &params);

    let intensity = weighted_carbon_intensity(&result.allocation, &carbon()).unwrap();
    assert!(intensity <= 120.0 + TOL, "carbon intensity {}", intensity);
    assert_budget_and_bounds(&result.allocation, &params);
}

#[test]
fn test_carbon_cap_excludes_dirtiest_asset() {
    // A cap of 95 only admits mixes dominated by CCC (90); the best one is
    // half AAA (100) and half CCC, leaving DDD (200) out despite its return.
    let returns = synthetic_returns(252, 42);
    let params = OptimizationParams::new()
        .with_expected_returns(asset_values([0.01, 0.02, 0.005, 0.05]))
        .with_max_carbon(95.0);

    let result = solve(&returns, &params);

    assert_weight(&result.allocation, "DDD", 0.0);
    assert_weight(&result.allocation, "AAA", 0.5);
    assert_weight(&result.allocation, "CCC", 0.5);
}

#[test]
fn test_carbon_cap_trades_off_return() {
    // DDD has the best return but intensity 200; with a cap of 120 the best
    // mix is 20% DDD and 80% AAA.
    let returns = synthetic_returns(252, 42);
    let params = OptimizationParams::new()
        .with_expected_returns(asset_values([0.01, 0.02, 0.005, 0.05]))
        .with_max_carbon(120.0);

    let result = solve(&returns, &params);

    assert_weight(&result.allocation, "DDD", 0.2);
    assert_weight(&result.allocation, "AAA", 0.8);
    assert!((result.expected_return - 0.018).abs() < TOL);
}

// ========== CVaR ==========

#[test]
fn test_cvar_cap_bounds_realized_cvar() {
    let returns = synthetic_returns(252, 42);
    let cap = 0.018;
    let params = OptimizationParams::new().with_max_cvar(cap);

    let result = solve(&returns, &params);

    let realized = returns.portfolio_returns(&result.allocation).unwrap();
    let cvar = conditional_value_at_risk(&realized, params.cvar_alpha).unwrap();
    assert!(cvar <= cap + TOL, "realized CVaR {} above cap {}", cvar, cap);
    assert_budget_and_bounds(&result.allocation, &params);
}

#[test]
fn test_cvar_cap_too_tight_is_infeasible() {
    // Every long-only portfolio of these assets has positive tail loss.
    let returns = synthetic_returns(252, 42);
    let params = OptimizationParams::new().with_max_cvar(-0.05);

    let err = PortfolioOptimizer::new(Settings::default())
        .optimize(&returns, &carbon(), &params)
        .unwrap_err();

    match err {
        PortfolioError::Optimization { status } => assert_eq!(status, "infeasible"),
        other => panic!("expected optimization failure, got {:?}", other),
    }
}

// ========== Turnover ==========

#[test]
fn test_turnover_limit_is_respected() {
    let returns = synthetic_returns(252, 42);
    let previous = equal_weights();
    let params = OptimizationParams::new()
        .with_expected_returns(ranked_expected_returns())
        .with_turnover_limit(0.3)
        .with_previous_weights(previous.clone());

    let result = solve(&returns, &params);

    let turnover = result.allocation.turnover(&previous);
    assert!(turnover <= 0.3 + TOL, "turnover {}", turnover);
    // Moving 0.15 from the worst asset into the best one.
    assert_weight(&result.allocation, "BBB", 0.4);
    assert_weight(&result.allocation, "DDD", 0.1);
}

#[test]
fn test_turnover_without_history_measures_exposure() {
    // Missing previous weights mean zero exposure, so turnover equals the
    // total absolute weight, which is exactly 1 for a long-only portfolio.
    let returns = synthetic_returns(252, 42);
    let params = OptimizationParams::new()
        .with_expected_returns(ranked_expected_returns())
        .with_turnover_limit(1.0);

    let result = solve(&returns, &params);
    assert_weight(&result.allocation, "BBB", 1.0);

    let params = params.with_turnover_limit(0.5);
    let err = PortfolioOptimizer::new(Settings::default())
        .optimize(&returns, &carbon(), &params)
        .unwrap_err();
    assert!(
        matches!(&err, PortfolioError::Optimization { status } if status == "infeasible"),
        "unexpected error {:?}",
        err
    );
}

#[test]
fn test_partial_previous_weights_fill_with_zero() {
    let returns = synthetic_returns(252, 42);
    let mut previous = AssetValues::new();
    previous.insert("CCC".into(), 1.0);
    let params = OptimizationParams::new()
        .with_expected_returns(ranked_expected_returns())
        .with_turnover_limit(0.4)
        .with_previous_weights(previous.clone());

    let result = solve(&returns, &params);

    assert!(result.allocation.turnover(&previous) <= 0.4 + TOL);
    assert_weight(&result.allocation, "BBB", 0.2);
    assert_weight(&result.allocation, "CCC", 0.8);
}

#[test]
fn test_zero_turnover_is_a_fixed_point() {
    let returns = synthetic_returns(252, 42);
    let params = OptimizationParams::new()
        .with_expected_returns(ranked_expected_returns())
        .with_turnover_limit(0.0)
        .with_previous_weights(equal_weights());

    let result = solve(&returns, &params);

    for asset in ASSETS {
        let w = result.allocation.weight(asset).unwrap();
        assert!((w - 0.25).abs() < 1e-4, "{}: expected 0.25, got {}", asset, w);
    }
}

#[test]
fn test_slack_turnover_keeps_previous_optimum() {
    let returns = synthetic_returns(252, 42);
    let first = solve(
        &returns,
        &OptimizationParams::new()
            .with_max_carbon(120.0)
            .with_max_cvar(0.02),
    );

    let previous = first.allocation.to_asset_values();
    let params = OptimizationParams::new()
        .with_max_carbon(120.0)
        .with_max_cvar(0.02)
        .with_turnover_limit(0.05)
        .with_previous_weights(previous.clone());
    let second = solve(&returns, &params);

    assert!(second.allocation.turnover(&previous) <= 0.05 + TOL);
    assert!(
        (second.expected_return - first.expected_return).abs() < TOL,
        "Expected {}, got {}",
        first.expected_return,
        second.expected_return
    );
}

#[test]
fn test_own_output_is_a_zero_turnover_fixed_point() {
    let constraint_sets = [
        OptimizationParams::new().with_max_carbon(120.0),
        OptimizationParams::new().with_max_cvar(0.02),
        OptimizationParams::new()
            .with_max_carbon(130.0)
            .with_max_cvar(0.018)
            .with_bound("CCC", 0.0, 0.5),
    ];

    for seed in [42, 7] {
        let returns = synthetic_returns(252, seed);
        for params in &constraint_sets {
            let first = solve(&returns, params);
            let second = solve(
                &returns,
                &params
                    .clone()
                    .with_turnover_limit(0.0)
                    .with_previous_weights(first.allocation.to_asset_values()),
            );
            for (asset, w) in first.allocation.iter() {
                assert_weight(&second.allocation, asset, w);
            }
        }
    }
}

// ========== Sectors ==========

#[test]
fn test_sector_limits_cap_exposure() {
    let returns = synthetic_returns(252, 42);
    let (map, limits) = sectors(
        &[("AAA", "energy"), ("BBB", "energy"), ("CCC", "utilities")],
        &[("energy", 0.3)],
    );
    let params = OptimizationParams::new()
        .with_expected_returns(ranked_expected_returns())
        .with_sectors(map, limits);

    let result = solve(&returns, &params);

    let energy = result.allocation.weight("AAA").unwrap() + result.allocation.weight("BBB").unwrap();
    assert!(energy <= 0.3 + TOL, "energy exposure {}", energy);
    // Utilities has no limit and DDD has no sector.
    assert_weight(&result.allocation, "BBB", 0.3);
    assert_weight(&result.allocation, "CCC", 0.7);
}

#[test]
fn test_sector_inputs_must_come_together() {
    let returns = synthetic_returns(20, 42);
    let backend = CountingBackend {
        calls: Cell::new(0),
    };
    let optimizer = PortfolioOptimizer::with_backend(&backend);
    let (map, limits) = sectors(&[("AAA", "energy")], &[("energy", 0.3)]);

    let mut params = OptimizationParams::new();
    params.sector_limits = Some(limits);
    let err = optimizer.optimize(&returns, &carbon(), &params).unwrap_err();
    assert!(matches!(err, PortfolioError::MissingSectorMap));

    let mut params = OptimizationParams::new();
    params.sector_map = Some(map);
    let err = optimizer.optimize(&returns, &carbon(), &params).unwrap_err();
    assert!(matches!(err, PortfolioError::MissingSectorLimits));

    assert_eq!(backend.calls.get(), 0, "solver must not be called");
}

#[test]
fn test_unbounded_limits_behave_as_absent() {
    let returns = synthetic_returns(252, 42);
    let baseline = solve(&returns, &OptimizationParams::default());
    let (map, limits) = sectors(&[("AAA", "energy"), ("BBB", "energy")], &[("energy", 1e30)]);

    let cases = [
        OptimizationParams::new().with_max_carbon(1e21),
        OptimizationParams::new().with_turnover_limit(1e21),
        OptimizationParams::new().with_sectors(map, limits),
        OptimizationParams::new().with_bound("AAA", 0.0, 1e21),
    ];

    for params in &cases {
        let result = solve(&returns, params);
        assert!(
            (result.expected_return - baseline.expected_return).abs() < TOL,
            "Expected {}, got {}",
            baseline.expected_return,
            result.expected_return
        );
    }
}

#[test]
fn test_infinite_sector_limit_rejected_before_solve() {
    let returns = synthetic_returns(20, 42);
    let backend = CountingBackend {
        calls: Cell::new(0),
    };
    let (map, limits) = sectors(&[("AAA", "energy")], &[("energy", f64::INFINITY)]);
    let params = OptimizationParams::new().with_sectors(map, limits);

    let err = PortfolioOptimizer::with_backend(&backend)
        .optimize(&returns, &carbon(), &params)
        .unwrap_err();

    assert!(matches!(err, PortfolioError::InvalidInput(_)), "unexpected error {:?}", err);
    assert_eq!(backend.calls.get(), 0);
}

// ========== Input validation ==========

#[test]
fn test_empty_matrix_rejected_before_solve() {
    let returns = ReturnMatrix::new(ASSETS, DMatrix::zeros(0, 4)).unwrap();
    let backend = CountingBackend {
        calls: Cell::new(0),
    };

    let err = PortfolioOptimizer::with_backend(&backend)
        .optimize(&returns, &carbon(), &OptimizationParams::default())
        .unwrap_err();

    assert!(matches!(err, PortfolioError::EmptyReturns));
    assert_eq!(backend.calls.get(), 0);
}

#[test]
fn test_missing_carbon_rejected_before_solve() {
    let returns = synthetic_returns(20, 42);
    let mut partial = carbon();
    partial.remove("DDD");
    let backend = CountingBackend {
        calls: Cell::new(0),
    };

    let err = PortfolioOptimizer::with_backend(&backend)
        .optimize(&returns, &partial, &OptimizationParams::default())
        .unwrap_err();

    assert!(matches!(err, PortfolioError::MissingCarbonIntensity { ref asset } if asset == "DDD"));
    assert_eq!(backend.calls.get(), 0);
}

#[test]
fn test_unusable_status_reports_backend_string() {
    let returns = synthetic_returns(20, 42);
    let backend = CountingBackend {
        calls: Cell::new(0),
    };

    let err = PortfolioOptimizer::with_backend(&backend)
        .optimize(&returns, &carbon(), &OptimizationParams::default())
        .unwrap_err();

    assert_eq!(err.to_string(), "Optimisation failed: unknown");
    assert_eq!(backend.calls.get(), 1);
}

// ========== Monotonicity ==========

#[test]
fn test_tightening_never_improves_objective() {
    let returns = synthetic_returns(252, 42);
    let (map, _) = sectors(&[("AAA", "energy"), ("BBB", "energy")], &[]);
    let with_energy_limit = |limit: f64| {
        let limits = [("energy".to_string(), limit)].into_iter().collect();
        OptimizationParams::new().with_sectors(map.clone(), limits)
    };

    let cases: Vec<(&str, OptimizationParams, OptimizationParams)> = vec![
        (
            "carbon",
            OptimizationParams::new().with_max_carbon(150.0),
            OptimizationParams::new().with_max_carbon(110.0),
        ),
        (
            "cvar",
            OptimizationParams::new().with_max_cvar(0.03),
            OptimizationParams::new().with_max_cvar(0.015),
        ),
        (
            "turnover",
            OptimizationParams::new()
                .with_turnover_limit(0.6)
                .with_previous_weights(equal_weights()),
            OptimizationParams::new()
                .with_turnover_limit(0.2)
                .with_previous_weights(equal_weights()),
        ),
        ("sector", with_energy_limit(0.8), with_energy_limit(0.3)),
    ];

    let unconstrained = solve(&returns, &OptimizationParams::default()).expected_return;

    for (name, relaxed, tight) in cases {
        let loose = solve(&returns, &relaxed).expected_return;
        let strict = solve(&returns, &tight).expected_return;
        assert!(
            strict <= loose + TOL,
            "{}: tight {} exceeds relaxed {}",
            name,
            strict,
            loose
        );
        assert!(
            loose <= unconstrained + TOL,
            "{}: relaxed {} exceeds unconstrained {}",
            name,
            loose,
            unconstrained
        );
    }
}

// ========== Configuration ==========

#[test]
fn test_params_from_json() {
    let json = r#"{
        "max_carbon": 120.0,
        "max_cvar": 0.02,
        "bounds": { "AAA": [0.1, 0.4] },
        "sector_map": { "AAA": "energy" },
        "sector_limits": { "energy": 0.5 }
    }"#;
    let params: OptimizationParams = serde_json::from_str(json).expect("valid params");

    assert_eq!(params.max_carbon, Some(120.0));
    assert_eq!(params.cvar_alpha, DEFAULT_CVAR_ALPHA);
    assert_eq!(params.bounds_for("AAA"), (0.1, 0.4));
    assert_eq!(params.bounds_for("BBB"), DEFAULT_BOUNDS);
    assert_eq!(params.expected_returns, ExpectedReturns::HistoricalMean);

    let returns = synthetic_returns(252, 42);
    let result = solve(&returns, &params);
    assert_budget_and_bounds(&result.allocation, &params);
}

#[test]
fn test_supplied_expected_returns_from_json() {
    let json = r#"{ "expected_returns": { "supplied": { "AAA": 0.01, "BBB": 0.02, "CCC": 0.0, "DDD": 0.0 } } }"#;
    let params: OptimizationParams = serde_json::from_str(json).expect("valid params");
    assert!(matches!(params.expected_returns, ExpectedReturns::Supplied(ref m) if m.len() == 4));
}

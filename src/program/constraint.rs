//! Cone constraints over affine expressions.
//!
//! Constraints map to cones in the solver:
//! - Zero: a'x + c = 0 (zero cone / equality)
//! - NonNeg: a'x + c >= 0 (nonnegative orthant)
//! - Soc: ||x|| <= t (second-order cone)

use super::lin_expr::LinExpr;

/// A constraint in a conic program.
#[derive(Debug, Clone, PartialEq)]
pub enum ConeConstraint {
    /// Equality constraint: expr == 0.
    Zero(LinExpr),

    /// Inequality constraint: expr >= 0.
    NonNeg(LinExpr),

    /// Second-order cone constraint: ||x||_2 <= t.
    Soc {
        /// The scalar upper bound.
        t: LinExpr,
        /// The vector argument.
        x: Vec<LinExpr>,
    },
}

impl ConeConstraint {
    /// Create an equality constraint: lhs == rhs.
    pub fn equals(lhs: LinExpr, rhs: impl Into<LinExpr>) -> Self {
        ConeConstraint::Zero(lhs - rhs.into())
    }

    /// Create an inequality constraint: lhs <= rhs.
    pub fn leq(lhs: LinExpr, rhs: impl Into<LinExpr>) -> Self {
        ConeConstraint::NonNeg(rhs.into() - lhs)
    }

    /// Create an inequality constraint: lhs >= rhs.
    pub fn geq(lhs: LinExpr, rhs: impl Into<LinExpr>) -> Self {
        ConeConstraint::NonNeg(lhs - rhs.into())
    }

    /// Create a SOC constraint: ||x||_2 <= t.
    pub fn soc(t: LinExpr, x: Vec<LinExpr>) -> Self {
        ConeConstraint::Soc { t, x }
    }

    /// Number of rows this constraint occupies in the stuffed matrix.
    pub fn rows(&self) -> usize {
        match self {
            ConeConstraint::Zero(_) | ConeConstraint::NonNeg(_) => 1,
            ConeConstraint::Soc { x, .. } => 1 + x.len(),
        }
    }

    /// Check whether a point satisfies the constraint within `tol`.
    pub fn is_satisfied(&self, x: &[f64], tol: f64) -> bool {
        match self {
            ConeConstraint::Zero(e) => e.eval(x).abs() <= tol,
            ConeConstraint::NonNeg(e) => e.eval(x) >= -tol,
            ConeConstraint::Soc { t, x: args } => {
                let norm = args.iter().map(|a| a.eval(x).powi(2)).sum::<f64>().sqrt();
                norm <= t.eval(x) + tol
            }
        }
    }
}

/// A constraint tagged with a human-readable name.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedConstraint {
    /// Name used in diagnostics (e.g. "budget", "carbon").
    pub name: String,
    /// The cone constraint.
    pub cone: ConeConstraint,
}

//! Scalar affine expressions over the flat decision vector.
//!
//! Every row of a conic program is written as `sum_j a_j * x_j + c`, where
//! `x` is the concatenation of all variable blocks. Vector-valued quantities
//! are simply `Vec<LinExpr>`.

use std::collections::BTreeMap;
use std::ops::{Add, Mul, Neg, Sub};

/// A contiguous block of columns in the decision vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarBlock {
    /// First column of the block.
    pub start: usize,
    /// Number of scalar variables in the block.
    pub len: usize,
}

impl VarBlock {
    /// Column index of the `i`-th element.
    ///
    /// # Panics
    ///
    /// Panics if `i` is outside the block.
    pub fn col(&self, i: usize) -> usize {
        assert!(i < self.len, "index {} out of range for block of {}", i, self.len);
        self.start + i
    }

    /// The `i`-th element as an expression.
    pub fn at(&self, i: usize) -> LinExpr {
        LinExpr::variable(self.col(i))
    }

    /// All elements as expressions, in order.
    pub fn elements(&self) -> impl Iterator<Item = LinExpr> + '_ {
        (0..self.len).map(move |i| self.at(i))
    }

    /// Sum of all elements.
    pub fn sum(&self) -> LinExpr {
        self.dot(&vec![1.0; self.len])
    }

    /// Inner product with a coefficient vector of the same length.
    pub fn dot(&self, coeffs: &[f64]) -> LinExpr {
        let mut expr = LinExpr::zero();
        for (i, &c) in coeffs.iter().enumerate().take(self.len) {
            expr.add_term(self.start + i, c);
        }
        expr
    }

    /// Slice this block's values out of a full primal vector.
    pub fn values<'a>(&self, x: &'a [f64]) -> &'a [f64] {
        &x[self.start..self.start + self.len]
    }
}

/// A scalar affine expression: `sum_j coeffs[j] * x_j + constant`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinExpr {
    /// Column index -> coefficient. Zero coefficients are not stored.
    pub coeffs: BTreeMap<usize, f64>,
    /// Constant offset.
    pub constant: f64,
}

impl LinExpr {
    /// The zero expression.
    pub fn zero() -> Self {
        Self::default()
    }

    /// A constant expression.
    pub fn scalar(value: f64) -> Self {
        LinExpr {
            coeffs: BTreeMap::new(),
            constant: value,
        }
    }

    /// A single decision variable with unit coefficient.
    pub fn variable(col: usize) -> Self {
        let mut expr = Self::zero();
        expr.add_term(col, 1.0);
        expr
    }

    /// Accumulate `coeff * x_col` into this expression.
    pub fn add_term(&mut self, col: usize, coeff: f64) {
        if coeff == 0.0 {
            return;
        }
        let entry = self.coeffs.entry(col).or_insert(0.0);
        *entry += coeff;
        if *entry == 0.0 {
            self.coeffs.remove(&col);
        }
    }

    /// Check if this is a constant (no variables).
    pub fn is_constant(&self) -> bool {
        self.coeffs.is_empty()
    }

    /// Columns referenced by this expression, ascending.
    pub fn columns(&self) -> impl Iterator<Item = usize> + '_ {
        self.coeffs.keys().copied()
    }

    /// Evaluate at a point.
    pub fn eval(&self, x: &[f64]) -> f64 {
        self.coeffs
            .iter()
            .map(|(&col, &c)| c * x.get(col).copied().unwrap_or(0.0))
            .sum::<f64>()
            + self.constant
    }

    /// Scale by a scalar.
    pub fn scale(&self, scalar: f64) -> LinExpr {
        let mut out = LinExpr::scalar(self.constant * scalar);
        for (&col, &c) in &self.coeffs {
            out.add_term(col, c * scalar);
        }
        out
    }
}

impl From<f64> for LinExpr {
    fn from(value: f64) -> Self {
        LinExpr::scalar(value)
    }
}

impl Add for LinExpr {
    type Output = LinExpr;

    fn add(mut self, rhs: LinExpr) -> LinExpr {
        for (col, c) in rhs.coeffs {
            self.add_term(col, c);
        }
        self.constant += rhs.constant;
        self
    }
}

impl Add<f64> for LinExpr {
    type Output = LinExpr;

    fn add(mut self, rhs: f64) -> LinExpr {
        self.constant += rhs;
        self
    }
}

impl Neg for LinExpr {
    type Output = LinExpr;

    fn neg(self) -> LinExpr {
        self.scale(-1.0)
    }
}

impl Sub for LinExpr {
    type Output = LinExpr;

    fn sub(self, rhs: LinExpr) -> LinExpr {
        self + (-rhs)
    }
}

impl Sub<f64> for LinExpr {
    type Output = LinExpr;

    fn sub(self, rhs: f64) -> LinExpr {
        self + (-rhs)
    }
}

impl Mul<f64> for LinExpr {
    type Output = LinExpr;

    fn mul(self, rhs: f64) -> LinExpr {
        self.scale(rhs)
    }
}

impl Mul<LinExpr> for f64 {
    type Output = LinExpr;

    fn mul(self, rhs: LinExpr) -> LinExpr {
        rhs.scale(self)
    }
}

impl std::iter::Sum for LinExpr {
    fn sum<I: Iterator<Item = LinExpr>>(iter: I) -> LinExpr {
        iter.fold(LinExpr::zero(), |acc, e| acc + e)
    }
}

//! Matrix stuffing: converts named cone constraints to solver format.
//!
//! This module builds the linear cost `q`, the constraint matrix `A`, the
//! right-hand side `b` and the cone layout in the form
//!
//! ```text
//! minimize    q'x
//! subject to  Ax + s = b,  s in K
//! ```
//!
//! where `K` is a product of a zero cone, a nonnegative orthant and zero or
//! more second-order cones, in that order.

use nalgebra_sparse::CscMatrix;

use super::constraint::{ConeConstraint, NamedConstraint};
use super::lin_expr::LinExpr;
use crate::sparse::csc_from_triplets;

/// Cone dimensions of a stuffed program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConeDims {
    /// Number of zero cone (equality) rows.
    pub zero: usize,
    /// Number of nonnegative cone rows.
    pub nonneg: usize,
    /// Second-order cone dimensions (each entry is the cone dimension).
    pub soc: Vec<usize>,
}

impl ConeDims {
    /// Total number of constraint rows.
    pub fn total(&self) -> usize {
        self.zero + self.nonneg + self.soc.iter().sum::<usize>()
    }
}

/// A conic program in standard form, ready for a solver backend.
#[derive(Debug, Clone)]
pub struct StuffedProgram {
    /// Linear cost vector q (n).
    pub q: Vec<f64>,
    /// Constraint matrix A (m x n).
    pub a: CscMatrix<f64>,
    /// Constraint vector b (m).
    pub b: Vec<f64>,
    /// Cone dimensions.
    pub cone_dims: ConeDims,
    /// Constant offset in the objective.
    pub objective_offset: f64,
}

impl StuffedProgram {
    /// Number of decision variables.
    pub fn num_vars(&self) -> usize {
        self.q.len()
    }

    /// Number of constraint rows.
    pub fn num_rows(&self) -> usize {
        self.b.len()
    }

    /// Objective value q'x + offset at a point.
    pub fn objective_at(&self, x: &[f64]) -> f64 {
        self.q.iter().zip(x).map(|(qi, xi)| qi * xi).sum::<f64>() + self.objective_offset
    }
}

/// Build the stuffed program from a minimization objective and constraints.
pub fn stuff_program(
    objective: &LinExpr,
    constraints: &[NamedConstraint],
    num_vars: usize,
) -> StuffedProgram {
    let mut q = vec![0.0; num_vars];
    for (&col, &c) in &objective.coeffs {
        if col < num_vars {
            q[col] += c;
        }
    }

    let (a, b, cone_dims) = stuff_constraints(constraints, num_vars);

    StuffedProgram {
        q,
        a,
        b,
        cone_dims,
        objective_offset: objective.constant,
    }
}

/// Stuff constraints into A, b, and cone dims.
fn stuff_constraints(
    constraints: &[NamedConstraint],
    num_vars: usize,
) -> (CscMatrix<f64>, Vec<f64>, ConeDims) {
    let mut zeros: Vec<&LinExpr> = Vec::new();
    let mut nonnegs: Vec<&LinExpr> = Vec::new();
    let mut socs: Vec<(&LinExpr, &[LinExpr])> = Vec::new();

    for c in constraints {
        match &c.cone {
            ConeConstraint::Zero(a) => zeros.push(a),
            ConeConstraint::NonNeg(a) => nonnegs.push(a),
            ConeConstraint::Soc { t, x } => socs.push((t, x.as_slice())),
        }
    }

    let cone_dims = ConeDims {
        zero: zeros.len(),
        nonneg: nonnegs.len(),
        soc: socs.iter().map(|(_, x)| 1 + x.len()).collect(),
    };

    let mut rows = RowBuffer::with_rows(cone_dims.total());

    // Zero cone: expr = a'x + c = 0  =>  a'x = -c
    for expr in zeros {
        rows.push(expr, false);
    }

    // Nonnegative cone: s = b - a'x >= 0 must equal expr = a'x + c,
    // so the row is -a with b = c.
    for expr in nonnegs {
        rows.push(expr, true);
    }

    // SOC: s = [t; x] in K_soc, each component negated as above.
    for (t, x) in socs {
        rows.push(t, true);
        for xi in x {
            rows.push(xi, true);
        }
    }

    let total_rows = rows.b.len();
    let a = csc_from_triplets(total_rows, num_vars, rows.a_rows, rows.a_cols, rows.a_vals);

    (a, rows.b, cone_dims)
}

/// Accumulates triplets and right-hand side entries row by row.
struct RowBuffer {
    a_rows: Vec<usize>,
    a_cols: Vec<usize>,
    a_vals: Vec<f64>,
    b: Vec<f64>,
}

impl RowBuffer {
    fn with_rows(n: usize) -> Self {
        RowBuffer {
            a_rows: Vec::new(),
            a_cols: Vec::new(),
            a_vals: Vec::new(),
            b: Vec::with_capacity(n),
        }
    }

    /// Append one row. With `negate`, the row is `-a` and `b = c`
    /// (cone slack equals the expression); otherwise `a` and `b = -c`.
    fn push(&mut self, expr: &LinExpr, negate: bool) {
        let row = self.b.len();
        let sign = if negate { -1.0 } else { 1.0 };
        for (&col, &val) in &expr.coeffs {
            self.a_rows.push(row);
            self.a_cols.push(col);
            self.a_vals.push(val * sign);
        }
        self.b.push(if negate { expr.constant } else { -expr.constant });
    }
}

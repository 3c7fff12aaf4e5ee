//! Conic program definition.
//!
//! A `ConeProgram` owns the decision vector layout (named variable blocks),
//! a linear objective and a list of named cone constraints:
//! ```ignore
//! let mut program = ConeProgram::new();
//! let w = program.add_variable("weights", 3);
//! program.maximize(w.dot(&mu));
//! program.subject_to("budget", ConeConstraint::equals(w.sum(), 1.0));
//! let stuffed = program.stuff();
//! ```

use super::constraint::{ConeConstraint, NamedConstraint};
use super::lin_expr::{LinExpr, VarBlock};
use super::stuffing::{stuff_program, StuffedProgram};

/// Objective type for conic programs.
#[derive(Debug, Clone, PartialEq)]
pub enum Objective {
    /// Minimize the expression.
    Minimize(LinExpr),
    /// Maximize the expression (internally converted to minimization).
    Maximize(LinExpr),
}

impl Objective {
    /// Get the expression being optimized.
    pub fn expr(&self) -> &LinExpr {
        match self {
            Objective::Minimize(e) | Objective::Maximize(e) => e,
        }
    }

    /// Check if this is a minimization.
    pub fn is_minimize(&self) -> bool {
        matches!(self, Objective::Minimize(_))
    }

    /// The expression handed to the solver, which always minimizes.
    fn as_minimization(&self) -> LinExpr {
        match self {
            Objective::Minimize(e) => e.clone(),
            Objective::Maximize(e) => -e.clone(),
        }
    }
}

impl Default for Objective {
    fn default() -> Self {
        Objective::Minimize(LinExpr::zero())
    }
}

/// A conic program with a linear objective.
#[derive(Debug, Clone, Default)]
pub struct ConeProgram {
    variables: Vec<(String, VarBlock)>,
    num_vars: usize,
    objective: Objective,
    constraints: Vec<NamedConstraint>,
}

impl ConeProgram {
    /// Create an empty program.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a block of `len` free scalar variables to the decision vector.
    pub fn add_variable(&mut self, name: impl Into<String>, len: usize) -> VarBlock {
        let block = VarBlock {
            start: self.num_vars,
            len,
        };
        self.num_vars += len;
        self.variables.push((name.into(), block));
        block
    }

    /// Append a block of `len` variables constrained to be non-negative.
    pub fn add_nonneg_variable(&mut self, name: impl Into<String>, len: usize) -> VarBlock {
        let name = name.into();
        let block = self.add_variable(name.clone(), len);
        let label = format!("{}_nonneg", name);
        for v in block.elements() {
            self.subject_to(label.clone(), ConeConstraint::NonNeg(v));
        }
        block
    }

    /// Set a minimization objective.
    pub fn minimize(&mut self, expr: LinExpr) {
        self.objective = Objective::Minimize(expr);
    }

    /// Set a maximization objective.
    pub fn maximize(&mut self, expr: LinExpr) {
        self.objective = Objective::Maximize(expr);
    }

    /// Add a single named constraint.
    pub fn subject_to(&mut self, name: impl Into<String>, cone: ConeConstraint) {
        self.constraints.push(NamedConstraint {
            name: name.into(),
            cone,
        });
    }

    /// Add several constraints under one name.
    pub fn subject_to_all(
        &mut self,
        name: impl Into<String>,
        cones: impl IntoIterator<Item = ConeConstraint>,
    ) {
        let name = name.into();
        for cone in cones {
            self.subject_to(name.clone(), cone);
        }
    }

    /// Total number of scalar decision variables.
    pub fn num_vars(&self) -> usize {
        self.num_vars
    }

    /// Variable blocks in declaration order.
    pub fn variables(&self) -> &[(String, VarBlock)] {
        &self.variables
    }

    /// Look up a variable block by name.
    pub fn variable(&self, name: &str) -> Option<VarBlock> {
        self.variables
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, block)| *block)
    }

    /// The objective.
    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    /// All constraints in insertion order.
    pub fn constraints(&self) -> &[NamedConstraint] {
        &self.constraints
    }

    /// Number of constraints registered under `name`.
    pub fn count_constraints(&self, name: &str) -> usize {
        self.constraints.iter().filter(|c| c.name == name).count()
    }

    /// Objective value at a point, in the caller's sense (not negated).
    pub fn objective_value(&self, x: &[f64]) -> f64 {
        self.objective.expr().eval(x)
    }

    /// Names of the constraints violated by more than `tol` at `x`.
    pub fn violated(&self, x: &[f64], tol: f64) -> Vec<&str> {
        self.constraints
            .iter()
            .filter(|c| !c.cone.is_satisfied(x, tol))
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Convert to standard conic form.
    pub fn stuff(&self) -> StuffedProgram {
        stuff_program(
            &self.objective.as_minimization(),
            &self.constraints,
            self.num_vars,
        )
    }
}

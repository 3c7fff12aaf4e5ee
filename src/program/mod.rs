//! Standard-form conic programs.
//!
//! This module provides:
//! - Scalar affine expressions over a flat decision vector
//! - Named zero, nonnegative and second-order cone constraints
//! - Matrix stuffing into `(q, A, b, K)` for a solver backend

pub mod constraint;
pub mod lin_expr;
pub mod problem;
pub mod stuffing;

pub use constraint::{ConeConstraint, NamedConstraint};
pub use lin_expr::{LinExpr, VarBlock};
pub use problem::{ConeProgram, Objective};
pub use stuffing::{stuff_program, ConeDims, StuffedProgram};

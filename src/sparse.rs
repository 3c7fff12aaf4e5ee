//! Sparse matrix utilities.
//!
//! Helpers for assembling the constraint matrix with nalgebra-sparse and
//! handing it to Clarabel.

use clarabel::algebra::CscMatrix as ClarabelCsc;
use nalgebra_sparse::{CooMatrix, CscMatrix};

/// Create a CSC matrix from triplets (row, col, value).
///
/// Duplicates are summed together. Out-of-range entries are dropped.
pub fn csc_from_triplets(
    nrows: usize,
    ncols: usize,
    rows: Vec<usize>,
    cols: Vec<usize>,
    vals: Vec<f64>,
) -> CscMatrix<f64> {
    if rows.is_empty() {
        return CscMatrix::zeros(nrows, ncols);
    }

    let mut coo = CooMatrix::new(nrows, ncols);
    for ((row, col), val) in rows.into_iter().zip(cols).zip(vals) {
        if row < nrows && col < ncols {
            coo.push(row, col, val);
        }
    }

    CscMatrix::from(&coo)
}

/// Convert nalgebra CSC to Clarabel CSC.
pub fn to_clarabel_csc(m: &CscMatrix<f64>) -> ClarabelCsc<f64> {
    ClarabelCsc::new(
        m.nrows(),
        m.ncols(),
        m.col_offsets().to_vec(),
        m.row_indices().to_vec(),
        m.values().to_vec(),
    )
}

/// Multiply a CSC matrix by a dense vector.
#[cfg(test)]
pub(crate) fn csc_mul_vec(m: &CscMatrix<f64>, x: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; m.nrows()];
    for (row, col, val) in m.triplet_iter() {
        if let Some(xc) = x.get(col) {
            out[row] += val * xc;
        }
    }
    out
}

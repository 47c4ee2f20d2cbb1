//! Result validation utilities
//!
//! Used by the debug verification mode of the backends and by the tests.

use crate::CMatrix;
use crate::config::RENORM_THRESHOLD;
use crate::error::SvdError;
use crate::svd::{SvdResult, VConvention};
use crate::utils::linalg::{dagger, diag, matmul};
use num_complex::Complex64;

/// `|a - b| <= max_diff`, or equal up to a few ulps relative to their size
pub fn almost_equal(a: f64, b: f64, max_diff: f64) -> bool {
    let diff = (a - b).abs();
    diff <= max_diff || diff <= a.abs().max(b.abs()) * f64::EPSILON * 4.0
}

fn almost_equal_complex(a: Complex64, b: Complex64, max_diff: f64) -> bool {
    almost_equal(a.re, b.re, max_diff) && almost_equal(a.im, b.im, max_diff)
}

/// Rebuild `A` from a decomposition, honouring its `V` convention
pub fn reconstruct(result: &SvdResult) -> CMatrix {
    let vh = match result.convention {
        VConvention::Columns => dagger(&result.v),
        VConvention::Adjoint => result.v.clone(),
    };
    let sigma = diag(&result.s, result.u.dim(1), vh.dim(0));
    matmul(&matmul(&result.u, &sigma), &vh)
}

/// Compare `U·diag(S)·Vᴴ` (or `U·diag(S)·V`) with `original` element-wise
///
/// Fails with [`SvdError::ValidationMismatch`] at the first entry that differs
/// by more than [`RENORM_THRESHOLD`].
pub fn validate_svd_result(original: &CMatrix, result: &SvdResult) -> Result<(), SvdError> {
    let (m, n) = *original.shape();
    let product = reconstruct(result);
    if *product.shape() != (m, n) {
        return Err(SvdError::ShapeMismatch(format!(
            "reconstruction is {:?}, input is {:?}",
            product.shape(),
            (m, n)
        )));
    }

    for i in 0..m {
        for j in 0..n {
            if !almost_equal_complex(original[[i, j]], product[[i, j]], RENORM_THRESHOLD) {
                return Err(SvdError::ValidationMismatch {
                    row: i,
                    col: j,
                    expected: original[[i, j]],
                    actual: product[[i, j]],
                });
            }
        }
    }
    Ok(())
}

/// Check that the columns of `q` are orthonormal (`Qᴴ·Q = I`)
pub fn is_unitary(q: &CMatrix, tolerance: f64) -> bool {
    let (rows, k) = *q.shape();
    for i in 0..k {
        for j in 0..k {
            let mut sum = Complex64::new(0.0, 0.0);
            for row in 0..rows {
                sum += q[[row, i]].conj() * q[[row, j]];
            }
            let expected = if i == j { 1.0 } else { 0.0 };
            if (sum - expected).norm() > tolerance {
                return false;
            }
        }
    }
    true
}

/// Non-negative and non-increasing
pub fn is_descending(s: &[f64]) -> bool {
    s.iter().all(|&x| x >= 0.0) && s.windows(2).all(|w| w[0] >= w[1])
}

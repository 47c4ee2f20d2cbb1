//! Complex matrix primitives on `mdarray` tensors
//!
//! Products go through the pure-Rust Faer kernel of `mdarray-linalg`.

use crate::CMatrix;
use mdarray_linalg::prelude::{MatMul, MatMulBuilder};
use mdarray_linalg_faer::Faer;
use num_complex::Complex64;
use num_traits::{One, Zero};

/// `CMatrix::from_fn` that never runs `f` on a zero-extent shape
///
/// `mdarray`'s `from_fn` is not safe to call with an empty extent, so empty
/// shapes are built with `from_elem` instead.
pub fn tabulate<F: FnMut(&[usize]) -> Complex64>(shape: [usize; 2], f: F) -> CMatrix {
    if shape[0] == 0 || shape[1] == 0 {
        return CMatrix::from_elem(shape, Complex64::zero());
    }
    CMatrix::from_fn(shape, f)
}

/// Matrix product `a · b`
///
/// # Panics
/// Panics if `a.cols != b.rows`
pub fn matmul(a: &CMatrix, b: &CMatrix) -> CMatrix {
    let (m, k) = *a.shape();
    let (k2, n) = *b.shape();
    assert_eq!(
        k, k2,
        "Matrix dimension mismatch: A.cols ({}) != B.rows ({})",
        k, k2
    );

    // Faer rejects empty operands
    if m == 0 || n == 0 || k == 0 {
        return CMatrix::from_elem([m, n], Complex64::zero());
    }
    Faer.matmul(a, b).eval()
}

/// Conjugate transpose
pub fn dagger(a: &CMatrix) -> CMatrix {
    let (m, n) = *a.shape();
    tabulate([n, m], |idx| a[[idx[1], idx[0]]].conj())
}

/// `m × n` matrix with `s` on the main diagonal
///
/// Entries of `s` beyond `min(m, n)` are ignored; missing ones are zero.
pub fn diag(s: &[f64], m: usize, n: usize) -> CMatrix {
    tabulate([m, n], |idx| {
        if idx[0] == idx[1] && idx[0] < s.len() {
            Complex64::new(s[idx[0]], 0.0)
        } else {
            Complex64::zero()
        }
    })
}

pub fn identity(n: usize) -> CMatrix {
    tabulate([n, n], |idx| {
        if idx[0] == idx[1] {
            Complex64::one()
        } else {
            Complex64::zero()
        }
    })
}

/// Multiply every entry by `factor`
pub fn scale_in_place(a: &mut CMatrix, factor: f64) {
    let (m, n) = *a.shape();
    for i in 0..m {
        for j in 0..n {
            a[[i, j]] = a[[i, j]] * factor;
        }
    }
}

/// Copy of the first `k` columns (`k` is clamped to the column count)
pub fn leading_columns(a: &CMatrix, k: usize) -> CMatrix {
    let (m, n) = *a.shape();
    tabulate([m, k.min(n)], |idx| a[[idx[0], idx[1]]])
}

/// Copy of the first `k` rows (`k` is clamped to the row count)
pub fn leading_rows(a: &CMatrix, k: usize) -> CMatrix {
    let (m, n) = *a.shape();
    tabulate([k.min(m), n], |idx| a[[idx[0], idx[1]]])
}

/// Largest squared Euclidean norm over the columns of `a`
pub fn max_column_norm_sqr(a: &CMatrix) -> f64 {
    let (m, n) = *a.shape();
    (0..n)
        .map(|j| (0..m).map(|i| a[[i, j]].norm_sqr()).sum::<f64>())
        .fold(0.0, f64::max)
}

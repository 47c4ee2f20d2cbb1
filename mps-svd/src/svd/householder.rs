//! Householder bidiagonalization of complex matrices
//!
//! Reduces an `m × n` matrix (`m >= n`) to real upper-bidiagonal form by
//! alternating left (column) and right (row) reflections. Each reflection is
//! followed by a phase transformation so that the bidiagonal entries come out
//! real and non-negative. The reflector vectors are left in the input matrix
//! and replayed on `U` and `V` once the bidiagonal problem is solved.

use crate::CMatrix;
use crate::config::ZERO_THRESHOLD;
use num_complex::Complex64;
use num_traits::{One, Zero};

/// Real bidiagonal form produced by [`bidiagonalize`]
#[derive(Debug, Clone)]
pub struct Bidiagonal {
    /// Main diagonal, `d[k]` for `k in 0..n`
    pub diag: Vec<f64>,
    /// Superdiagonal, `e[k]` couples `d[k-1]` and `d[k]`; `e[0]` is always zero
    pub super_diag: Vec<f64>,
}

/// `v / |v|`, or one when `|v|` vanishes
#[inline]
fn phase(v: Complex64, magnitude: f64) -> Complex64 {
    if magnitude <= ZERO_THRESHOLD {
        Complex64::one()
    } else {
        v / magnitude
    }
}

/// Reduce `a` to bidiagonal form in place
///
/// A reflection whose norm² is at most `norm_floor` is skipped and its
/// bidiagonal entry set to zero. If such a norm² still exceeds
/// `underflow_limit`, the column or row carried information that the floor
/// would destroy, and `None` is returned so the caller can rescale and retry.
pub fn bidiagonalize(a: &mut CMatrix, norm_floor: f64, underflow_limit: f64) -> Option<Bidiagonal> {
    let (m, n) = *a.shape();
    debug_assert!(m >= n, "bidiagonalize expects rows >= columns");

    let mut diag = vec![0.0; n];
    let mut super_diag = vec![0.0; n];

    for k in 0..n {
        let k1 = k + 1;

        // Column k, rows k..m
        let z: f64 = (k..m).map(|i| a[[i, k]].norm_sqr()).sum();
        if z > norm_floor {
            let z = z.sqrt();
            diag[k] = z;
            let w = a[[k, k]].norm();
            a[[k, k]] = phase(a[[k, k]], w) * (z + w);

            if k1 < n {
                let denom = z * (z + w);
                for j in k1..n {
                    let mut q = Complex64::zero();
                    for i in k..m {
                        q += a[[i, k]].conj() * a[[i, j]];
                    }
                    let q = q / denom;
                    for i in k..m {
                        a[[i, j]] = a[[i, j]] - q * a[[i, k]];
                    }
                }

                // Phase transformation
                let q = -a[[k, k]].conj() / a[[k, k]].norm();
                for j in k1..n {
                    a[[k, j]] = q * a[[k, j]];
                }
            }
        } else if z > underflow_limit {
            return None;
        }

        if k1 == n {
            break;
        }

        // Row k, columns k1..n
        let z: f64 = (k1..n).map(|j| a[[k, j]].norm_sqr()).sum();
        if z > norm_floor {
            let z = z.sqrt();
            super_diag[k1] = z;
            let w = a[[k, k1]].norm();
            a[[k, k1]] = phase(a[[k, k1]], w) * (z + w);

            let denom = z * (z + w);
            for i in k1..m {
                let mut q = Complex64::zero();
                for j in k1..n {
                    q += a[[k, j]].conj() * a[[i, j]];
                }
                let q = q / denom;
                for j in k1..n {
                    a[[i, j]] = a[[i, j]] - q * a[[k, j]];
                }
            }

            // Phase transformation
            let q = -a[[k, k1]].conj() / a[[k, k1]].norm();
            for i in k1..m {
                a[[i, k1]] = a[[i, k1]] * q;
            }
        } else if z > underflow_limit {
            return None;
        }
    }

    Some(Bidiagonal { diag, super_diag })
}

/// Apply the stored left reflections to `u` (`m × m`)
pub fn accumulate_left(a: &CMatrix, diag: &[f64], u: &mut CMatrix) {
    let (m, n) = *a.shape();

    for k in (0..n).rev() {
        if diag[k] <= ZERO_THRESHOLD {
            continue;
        }
        let r = a[[k, k]].norm();
        let q = -a[[k, k]] / r;
        for j in 0..m {
            u[[k, j]] = q * u[[k, j]];
        }

        let denom = r * diag[k];
        for j in 0..m {
            let mut q = Complex64::zero();
            for i in k..m {
                q += a[[i, k]].conj() * u[[i, j]];
            }
            let q = q / denom;
            for i in k..m {
                u[[i, j]] = u[[i, j]] - q * a[[i, k]];
            }
        }
    }
}

/// Apply the stored right reflections to `v` (`n × n`)
pub fn accumulate_right(a: &CMatrix, super_diag: &[f64], v: &mut CMatrix) {
    let n = a.dim(1);

    for k in (0..n.saturating_sub(1)).rev() {
        let k1 = k + 1;
        if super_diag[k1] <= ZERO_THRESHOLD {
            continue;
        }
        let r = a[[k, k1]].norm();
        let q = -a[[k, k1]].conj() / r;
        for j in 0..n {
            v[[k1, j]] = q * v[[k1, j]];
        }

        let denom = r * super_diag[k1];
        for j in 0..n {
            let mut q = Complex64::zero();
            for i in k1..n {
                q += a[[k, i]] * v[[i, j]];
            }
            let q = q / denom;
            for i in k1..n {
                v[[i, j]] = v[[i, j]] - q * a[[k, i]].conj();
            }
        }
    }
}

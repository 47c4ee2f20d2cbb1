//! Reference complex SVD (Businger-Golub)
//!
//! Householder bidiagonalization followed by implicit-shift QR on the real
//! bidiagonal matrix, a selection sort of the singular values, and the
//! back-transformation of the accumulated rotations. Non-convergence is
//! reported as [`CsvdStatus::Failure`] rather than an error.
//!
//! Reference: P. A. Businger and G. H. Golub, Comm. ACM 12, 564 (1969).

use super::householder::{self, Bidiagonal};
use super::{CsvdStatus, SvdResult, VConvention};
use crate::CMatrix;
use crate::config::{SIGN_TOLERANCE, SvdPolicy, TINY_FACTOR, ZERO_THRESHOLD};
use crate::precision::{is_negligible, scaled_rotation_sum};
use crate::utils::linalg::{dagger, identity, max_column_norm_sqr};
use num_complex::Complex64;

/// Why the bidiagonal QR iteration gave up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QrBreakdown {
    /// A rotation with vanishing norm that the extended-precision check
    /// could not explain away
    VanishingRotation,
    /// Too many sweeps on one singular value
    SweepLimit,
}

/// How Householder norms at or below the floor are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FloorRule {
    /// Report `Failure` when a floored norm is significant for the input scale
    Fail,
    /// Treat every floored norm as an exact zero
    Flush,
}

/// Decompose `a` as `U · diag(S) · Vᴴ`
///
/// Takes ownership of `a`; clone it first if it is needed afterwards.
/// On success `U` is `m × m`, `V` is `n × n` and `S` holds `min(m, n)`
/// non-negative values in non-increasing order. A zero matrix yields
/// `S = 0`, `U = I` and `V = I`.
pub fn csvd(a: CMatrix, policy: &SvdPolicy) -> CsvdStatus {
    csvd_with_floor_rule(a, policy, FloorRule::Fail)
}

/// [`csvd`] with an explicit rule for floored Householder norms
///
/// With [`FloorRule::Flush`] inputs too small to rescale above the floor
/// decompose to a degenerate result (`S = 0` for the floored directions)
/// instead of failing.
pub(crate) fn csvd_with_floor_rule(a: CMatrix, policy: &SvdPolicy, rule: FloorRule) -> CsvdStatus {
    let (rows, cols) = *a.shape();

    // Work on the conjugate transpose when there are more columns than rows
    let transposed = rows < cols;
    let mut a = if transposed { dagger(&a) } else { a };
    let (m, n) = *a.shape();

    if n == 0 {
        return CsvdStatus::Success(SvdResult::new(
            identity(rows),
            Vec::new(),
            identity(cols),
            VConvention::Columns,
        ));
    }

    let eta = policy.convergence_eta;
    let underflow_limit = match rule {
        FloorRule::Fail => max_column_norm_sqr(&a) * eta * eta,
        FloorRule::Flush => f64::INFINITY,
    };
    let Some(Bidiagonal { diag, super_diag }) =
        householder::bidiagonalize(&mut a, policy.norm_floor, underflow_limit)
    else {
        log::debug!("csvd: Householder norm fell below the floor for a {m}x{n} input");
        return CsvdStatus::Failure;
    };

    let mut s = diag.clone();
    let mut t = super_diag.clone();
    let eps = s.iter().zip(&t).map(|(d, e)| d + e).fold(0.0, f64::max) * eta;

    let mut u = identity(m);
    let mut v = identity(n);

    if let Err(breakdown) = diagonalize(&mut s, &mut t, &mut u, &mut v, eps, policy.max_qr_sweeps) {
        log::debug!("csvd: QR iteration failed ({breakdown:?}) for a {m}x{n} input");
        return CsvdStatus::Failure;
    }
    if s.iter().any(|x| !x.is_finite()) {
        log::debug!("csvd: non-finite singular value for a {m}x{n} input");
        return CsvdStatus::Failure;
    }

    sort_descending(&mut s, &mut u, &mut v);

    householder::accumulate_left(&a, &diag, &mut u);
    householder::accumulate_right(&a, &super_diag, &mut v);

    if transposed {
        std::mem::swap(&mut u, &mut v);
    }

    CsvdStatus::Success(SvdResult::new(u, s, v, VConvention::Columns))
}

/// Plane rotation of columns `p` and `q`, restricted to the leading `rows` rows
///
/// During the QR phase `U` and `V` are real, so only real parts are kept.
fn rotate_columns(mat: &mut CMatrix, rows: usize, p: usize, q: usize, cs: f64, sn: f64) {
    for j in 0..rows {
        let x = mat[[j, p]].re;
        let y = mat[[j, q]].re;
        mat[[j, p]] = Complex64::new(x * cs + y * sn, 0.0);
        mat[[j, q]] = Complex64::new(y * cs - x * sn, 0.0);
    }
}

/// Implicit-shift QR on the bidiagonal `(s, t)`, accumulating into `u` and `v`
fn diagonalize(
    s: &mut [f64],
    t: &mut [f64],
    u: &mut CMatrix,
    v: &mut CMatrix,
    eps: f64,
    max_sweeps: usize,
) -> Result<(), QrBreakdown> {
    let n = s.len();

    for k in (0..n).rev() {
        let mut sweeps = 0;
        let w = loop {
            // Find l such that t[l] is negligible, or s[l-1] is and t[l] must be
            // chased out by cancellation.
            let mut l = k;
            let cancel = loop {
                if l == 0 || t[l].abs() <= eps {
                    break false;
                }
                if s[l - 1].abs() <= eps {
                    break true;
                }
                l -= 1;
            };

            if cancel {
                let l1 = l - 1;
                let (mut cs, mut sn) = (0.0, 1.0);
                for i in l..=k {
                    let f = sn * t[i];
                    t[i] *= cs;
                    if f.abs() <= eps {
                        break;
                    }
                    let h = s[i];
                    let w = f.hypot(h);
                    s[i] = w;
                    cs = h / w;
                    sn = -f / w;
                    rotate_columns(u, n, l1, i, cs, sn);
                }
            }

            let w = s[k];
            if l == k {
                break w;
            }

            sweeps += 1;
            if sweeps > max_sweeps {
                return Err(QrBreakdown::SweepLimit);
            }

            // Shift from the trailing 2x2 block
            let mut x = s[l];
            let mut y = s[k - 1];
            let mut g = t[k - 1];
            let mut h = t[k];
            let mut f = ((y - w) * (y + w) + (g - h) * (g + h)) / (2.0 * h * y);
            g = f.hypot(1.0);
            if f < -SIGN_TOLERANCE {
                g = -g;
            }
            f = ((x - w) * (x + w) + (y / (f + g) - h) * h) / x;

            // Chase the bulge
            let (mut cs, mut sn) = (1.0, 1.0);
            for i in (l + 1)..=k {
                g = t[i];
                y = s[i];
                h = sn * g;
                g *= cs;

                let w = h.hypot(f);
                if w <= ZERO_THRESHOLD {
                    return Err(QrBreakdown::VanishingRotation);
                }
                t[i - 1] = w;
                cs = f / w;
                sn = h / w;

                f = x * cs + g * sn;
                let rescued = if f.abs() <= ZERO_THRESHOLD {
                    Some(scaled_rotation_sum(x, cs, g, sn, TINY_FACTOR))
                } else {
                    None
                };

                g = g * cs - x * sn;
                h = y * sn;
                y *= cs;
                rotate_columns(v, n, i - 1, i, cs, sn);

                let tiny_w = h.abs() < SIGN_TOLERANCE
                    && f.abs() < SIGN_TOLERANCE
                    && rescued.is_some_and(|r| !is_negligible(&r, ZERO_THRESHOLD));

                let w = h.hypot(f);
                if w <= ZERO_THRESHOLD && !tiny_w {
                    return Err(QrBreakdown::VanishingRotation);
                }
                s[i - 1] = w;
                if tiny_w {
                    log::trace!("csvd: degenerate rotation at {i}, f rescued as {rescued:?}");
                    cs = 1.0;
                    sn = 0.0;
                } else {
                    cs = f / w;
                    sn = h / w;
                }

                f = cs * g + sn * y;
                x = cs * y - sn * g;
                rotate_columns(u, n, i - 1, i, cs, sn);
            }
            t[l] = 0.0;
            t[k] = f;
            s[k] = x;
        };

        if w < 0.0 {
            s[k] = -w;
            for j in 0..n {
                v[[j, k]] = -v[[j, k]];
            }
        }
    }

    Ok(())
}

/// Selection sort of `s` into non-increasing order, permuting the paired
/// columns of `u` and `v`
fn sort_descending(s: &mut [f64], u: &mut CMatrix, v: &mut CMatrix) {
    let n = s.len();
    for k in 0..n {
        let mut g = -1.0;
        let mut j = k;
        for (i, &value) in s.iter().enumerate().skip(k) {
            if g < value {
                g = value;
                j = i;
            }
        }

        if j != k {
            s[j] = s[k];
            s[k] = g;
            swap_columns(u, j, k);
            swap_columns(v, j, k);
        }
    }
}

fn swap_columns(mat: &mut CMatrix, p: usize, q: usize) {
    for i in 0..mat.dim(0) {
        let tmp = mat[[i, p]];
        mat[[i, p]] = mat[[i, q]];
        mat[[i, q]] = tmp;
    }
}

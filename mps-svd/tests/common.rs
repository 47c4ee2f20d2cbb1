//! Common test utilities

#![allow(dead_code)]

use mps_svd::CMatrix;
use mps_svd::utils::{dagger, diag, matmul};
use num_complex::Complex64;

/// Simple deterministic pseudo-random number generator (LCG)
///
/// Uses the common parameters: a = 1664525, c = 1013904223 (from Numerical Recipes)
pub struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Generate next f64 in range [0, 1)
    pub fn next_f64(&mut self) -> f64 {
        self.state = self.state.wrapping_mul(1664525).wrapping_add(1013904223);
        // Map to [0, 1) using upper 48 bits
        ((self.state >> 16) as f64) / ((1u64 << 48) as f64)
    }

    /// Complex number with both parts uniform in [-1, 1)
    pub fn next_complex(&mut self) -> Complex64 {
        Complex64::new(2.0 * self.next_f64() - 1.0, 2.0 * self.next_f64() - 1.0)
    }
}

pub fn random_matrix(rng: &mut SimpleRng, m: usize, n: usize) -> CMatrix {
    let mut a = CMatrix::from_elem([m, n], Complex64::new(0.0, 0.0));
    for i in 0..m {
        for j in 0..n {
            a[[i, j]] = rng.next_complex();
        }
    }
    a
}

/// Random unitary from modified Gram-Schmidt on a random square matrix
pub fn random_unitary(rng: &mut SimpleRng, n: usize) -> CMatrix {
    let mut q = random_matrix(rng, n, n);
    for j in 0..n {
        for k in 0..j {
            let mut proj = Complex64::new(0.0, 0.0);
            for i in 0..n {
                proj += q[[i, k]].conj() * q[[i, j]];
            }
            for i in 0..n {
                q[[i, j]] = q[[i, j]] - proj * q[[i, k]];
            }
        }
        let norm = (0..n).map(|i| q[[i, j]].norm_sqr()).sum::<f64>().sqrt();
        for i in 0..n {
            q[[i, j]] = q[[i, j]] / norm;
        }
    }
    q
}

/// `m × n` matrix `W · diag(s) · Xᴴ` with random unitaries `W`, `X`
pub fn matrix_with_spectrum(rng: &mut SimpleRng, m: usize, n: usize, s: &[f64]) -> CMatrix {
    let w = random_unitary(rng, m);
    let x = random_unitary(rng, n);
    matmul(&matmul(&w, &diag(s, m, n)), &dagger(&x))
}

pub fn max_abs_diff(a: &CMatrix, b: &CMatrix) -> f64 {
    let (m, n) = *a.shape();
    assert_eq!((m, n), *b.shape());
    let mut diff: f64 = 0.0;
    for i in 0..m {
        for j in 0..n {
            diff = diff.max((a[[i, j]] - b[[i, j]]).norm());
        }
    }
    diff
}

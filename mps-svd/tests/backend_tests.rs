//! Reference and vendor backends through the shared entry point

mod common;

use approx::assert_abs_diff_eq;
use common::{SimpleRng, matrix_with_spectrum, max_abs_diff, random_matrix};
use mps_svd::backend::lapack::{lapack_svd, use_divide_and_conquer};
use mps_svd::utils::{dagger, diag, is_descending, is_unitary, matmul, reconstruct};
use mps_svd::{ReferenceBackend, SvdPolicy, VConvention, VendorBackend, decompose};

#[test]
fn test_vendor_returns_adjoint() {
    let mut rng = SimpleRng::new(21);
    let a = random_matrix(&mut rng, 6, 4);
    let result = lapack_svd(a.clone()).unwrap();
    assert_eq!(result.convention, VConvention::Adjoint);
    assert_eq!(*result.v.shape(), (4, 4));

    // A = U · Σ · v, no extra conjugation
    let sigma = diag(&result.s, 6, 4);
    let product = matmul(&matmul(&result.u, &sigma), &result.v);
    assert!(max_abs_diff(&a, &product) < 1e-12);
    assert!(is_unitary(&result.u, 1e-12));
    assert!(is_unitary(&dagger(&result.v), 1e-12));
}

#[test]
fn test_divide_and_conquer_path() {
    let mut rng = SimpleRng::new(64);
    let a = random_matrix(&mut rng, 64, 70);
    assert!(use_divide_and_conquer(64, 70));
    let result = lapack_svd(a.clone()).unwrap();
    assert_eq!(result.s.len(), 64);
    assert!(is_descending(&result.s));
    assert!(max_abs_diff(&a, &reconstruct(&result)) < 1e-10);
}

#[test]
fn test_backends_agree_on_spectrum() {
    let mut rng = SimpleRng::new(17);
    let expected = [4.0, 3.0, 0.75, 0.1, 1e-4];
    let a = matrix_with_spectrum(&mut rng, 5, 8, &expected);
    let reference = decompose(&ReferenceBackend, a.clone(), &SvdPolicy::default()).unwrap();
    let vendor = decompose(&VendorBackend, a, &SvdPolicy::default().with_validation(true)).unwrap();
    assert_eq!(reference.convention, VConvention::Columns);
    assert_eq!(vendor.convention, VConvention::Adjoint);
    for ((r, v), e) in reference.s.iter().zip(&vendor.s).zip(&expected) {
        assert_abs_diff_eq!(*r, *e, epsilon = 1e-8);
        assert_abs_diff_eq!(*v, *e, epsilon = 1e-12);
    }

    // Same right factor once both are oriented as Vᴴ, up to column phases
    let vh_ref = reference.v_adjoint();
    let vh_vendor = vendor.v_adjoint();
    for k in 0..expected.len() {
        let overlap: f64 = (0..8)
            .map(|j| vh_ref[[k, j]] * vh_vendor[[k, j]].conj())
            .sum::<mps_svd::Complex64>()
            .norm();
        assert_abs_diff_eq!(overlap, 1.0, epsilon = 1e-5);
    }
}

#[test]
fn test_into_convention_round_trip() {
    let mut rng = SimpleRng::new(2);
    let a = random_matrix(&mut rng, 3, 3);
    let vendor = lapack_svd(a.clone()).unwrap();
    let as_columns = vendor.into_convention(VConvention::Columns);
    assert_eq!(as_columns.convention, VConvention::Columns);
    assert!(max_abs_diff(&a, &reconstruct(&as_columns)) < 1e-12);
}

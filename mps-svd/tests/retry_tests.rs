//! Rescale-and-retry behaviour on badly scaled inputs

mod common;

use approx::assert_relative_eq;
use common::{SimpleRng, max_abs_diff, random_matrix};
use mps_svd::utils::{reconstruct, scale_in_place};
use mps_svd::{CsvdStatus, SvdError, SvdPolicy, csvd, csvd_with_retry};

#[test]
fn test_tiny_matrix_fails_without_retry() {
    let mut rng = SimpleRng::new(5);
    let mut a = random_matrix(&mut rng, 4, 4);
    scale_in_place(&mut a, 1e-20);
    assert!(matches!(csvd(a, &SvdPolicy::default()), CsvdStatus::Failure));
}

#[test]
fn test_retry_recovers_tiny_matrix() {
    let mut rng = SimpleRng::new(5);
    let a = random_matrix(&mut rng, 4, 4);
    let mut tiny = a.clone();
    scale_in_place(&mut tiny, 1e-20);

    let reference = csvd_with_retry(a, &SvdPolicy::default()).unwrap();
    let rescued = csvd_with_retry(tiny.clone(), &SvdPolicy::default()).unwrap();

    for (small, big) in rescued.s.iter().zip(&reference.s) {
        assert_relative_eq!(small * 1e20, *big, max_relative = 1e-8);
    }

    // U, V come from the scaled run; S carries the compensation
    let mut rebuilt = reconstruct(&rescued);
    scale_in_place(&mut rebuilt, 1e20);
    let mut expected = tiny;
    scale_in_place(&mut expected, 1e20);
    assert!(max_abs_diff(&expected, &rebuilt) < 1e-8);
}

#[test]
fn test_retry_budget_is_bounded() {
    let mut rng = SimpleRng::new(8);
    let a = random_matrix(&mut rng, 3, 3);

    // Without QR sweeps every rescaled attempt breaks down as well
    let policy = SvdPolicy {
        max_retries: 2,
        max_qr_sweeps: 0,
        ..SvdPolicy::default()
    };
    match csvd_with_retry(a, &policy) {
        Err(SvdError::RetryExhausted { attempts }) => assert_eq!(attempts, 2),
        other => panic!("expected RetryExhausted, got {other:?}"),
    }
}

#[test]
fn test_unreachable_scale_flushes_instead_of_failing() {
    let mut rng = SimpleRng::new(8);
    let mut a = random_matrix(&mut rng, 3, 3);
    scale_in_place(&mut a, 1e-20);

    // One retry at factor 100 cannot lift a 1e-20 matrix above the floor
    let policy = SvdPolicy {
        max_retries: 1,
        ..SvdPolicy::default()
    };
    let result = csvd_with_retry(a, &policy).unwrap();
    assert_eq!(result.s.len(), 3);
    assert!(result.s.iter().all(|&x| x.is_finite() && x < 1e-15));
}

#[test]
fn test_no_retries_configured() {
    let mut rng = SimpleRng::new(9);
    let a = random_matrix(&mut rng, 3, 2);
    let policy = SvdPolicy {
        max_retries: 0,
        ..SvdPolicy::default()
    };
    let result = csvd_with_retry(a.clone(), &policy).unwrap();
    assert!(max_abs_diff(&a, &reconstruct(&result)) < 1e-8);
}

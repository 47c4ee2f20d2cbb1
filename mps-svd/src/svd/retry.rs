//! Rescale-and-retry driver around [`csvd`]
//!
//! The reference algorithm's floor and convergence tests are absolute, so a
//! matrix whose entries are all tiny can fail even though its singular
//! structure is perfectly ordinary. Multiplying by a constant moves it into a
//! well-conditioned range; the singular values are divided by the accumulated
//! factor afterwards.
//!
//! Inputs so small that the whole retry budget cannot lift them above the
//! norm floor are numerical noise. They skip the retries and decompose with
//! floored norms flushed to zero, giving `S = 0` in those directions.

use super::csvd::{FloorRule, csvd_with_floor_rule};
use super::{CsvdStatus, SvdResult, csvd};
use crate::CMatrix;
use crate::config::SvdPolicy;
use crate::error::SvdError;
use crate::utils::linalg::{max_column_norm_sqr, scale_in_place};

/// True if `max_retries` rescalings cannot lift the largest column above the
/// norm floor
fn below_retry_reach(a: &CMatrix, policy: &SvdPolicy) -> bool {
    let norm_sqr = max_column_norm_sqr(a);
    let exponent = (2 * policy.max_retries).min(i32::MAX as usize) as i32;
    norm_sqr > 0.0 && norm_sqr * policy.mul_factor.powi(exponent) <= policy.norm_floor
}

/// Run [`csvd`], retrying on failure with the input scaled by
/// `policy.mul_factor` per attempt
///
/// At most `policy.max_retries` rescaled attempts follow the first one.
/// Exhausting them is fatal and reported as [`SvdError::RetryExhausted`].
/// Inputs out of reach of every rescaling are decomposed once with floored
/// norms treated as zero.
pub fn csvd_with_retry(a: CMatrix, policy: &SvdPolicy) -> Result<SvdResult, SvdError> {
    if below_retry_reach(&a, policy) {
        log::debug!("csvd input below the norm floor after all retries; flushing to zero");
        return match csvd_with_floor_rule(a, policy, FloorRule::Flush) {
            CsvdStatus::Success(result) => Ok(result),
            CsvdStatus::Failure => Err(SvdError::RetryExhausted { attempts: 0 }),
        };
    }

    let mut scaled = a.clone();
    if let CsvdStatus::Success(result) = csvd(a, policy) {
        return Ok(result);
    }

    for attempt in 1..=policy.max_retries {
        scale_in_place(&mut scaled, policy.mul_factor);
        log::debug!(
            "csvd retry #{attempt}: input scaled by {}^{attempt}",
            policy.mul_factor
        );

        if let CsvdStatus::Success(mut result) = csvd(scaled.clone(), policy) {
            let compensation = policy.mul_factor.powi(attempt as i32);
            for value in result.s.iter_mut() {
                *value /= compensation;
            }
            return Ok(result);
        }
    }

    log::warn!(
        "csvd failed after {} rescaled retries (factor {})",
        policy.max_retries,
        policy.mul_factor
    );
    Err(SvdError::RetryExhausted {
        attempts: policy.max_retries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use num_complex::Complex64;

    fn tiny_matrix(scale: f64) -> CMatrix {
        CMatrix::from_fn([3, 3], |idx| {
            let (i, j) = (idx[0] as f64, idx[1] as f64);
            Complex64::new(scale * (1.0 + i + 2.0 * j), scale * (i - j))
        })
    }

    #[test]
    fn test_no_retry_needed() {
        let a = tiny_matrix(1.0);
        let direct = csvd(a.clone(), &SvdPolicy::default()).into_result().unwrap();
        let wrapped = csvd_with_retry(a, &SvdPolicy::default()).unwrap();
        assert_eq!(direct.s, wrapped.s);
    }

    #[test]
    fn test_retry_compensates_scale() {
        let reference = csvd_with_retry(tiny_matrix(1.0), &SvdPolicy::default()).unwrap();
        let rescued = csvd_with_retry(tiny_matrix(1e-20), &SvdPolicy::default()).unwrap();
        for (small, big) in rescued.s.iter().zip(&reference.s) {
            assert_relative_eq!(small * 1e20, *big, max_relative = 1e-9, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_retry_exhaustion_is_an_error() {
        // No QR sweeps allowed: every attempt breaks down
        let policy = SvdPolicy {
            max_retries: 1,
            max_qr_sweeps: 0,
            ..SvdPolicy::default()
        };
        match csvd_with_retry(tiny_matrix(1.0), &policy) {
            Err(SvdError::RetryExhausted { attempts }) => assert_eq!(attempts, 1),
            other => panic!("expected retry exhaustion, got {:?}", other),
        }
    }

    #[test]
    fn test_noise_below_retry_reach_flushes_to_zero() {
        let mut a = CMatrix::from_elem([4, 4], Complex64::new(0.0, 0.0));
        a[[2, 1]] = Complex64::new(1e-60, 0.0);
        assert!(below_retry_reach(&a, &SvdPolicy::default()));
        assert!(!csvd(a.clone(), &SvdPolicy::default()).is_success());

        let result = csvd_with_retry(a, &SvdPolicy::default()).unwrap();
        assert_eq!(result.s, vec![0.0; 4]);
        assert_eq!(*result.u.shape(), (4, 4));
    }

    #[test]
    fn test_retry_reach_depends_on_budget() {
        let a = tiny_matrix(1e-21);
        assert!(!below_retry_reach(&a, &SvdPolicy::default()));
        let short = SvdPolicy {
            max_retries: 1,
            ..SvdPolicy::default()
        };
        assert!(below_retry_reach(&a, &short));
        assert!(!below_retry_reach(&CMatrix::from_elem([2, 2], Complex64::new(0.0, 0.0)), &short));
    }
}

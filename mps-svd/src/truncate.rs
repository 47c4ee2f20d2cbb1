//! Bond-dimension truncation and Schmidt-coefficient renormalization

use crate::config::{RENORM_THRESHOLD, ZERO_THRESHOLD};
use crate::svd::{SvdResult, VConvention};
use crate::utils::linalg::{leading_columns, leading_rows};

/// Number of singular values whose square exceeds `threshold`
pub fn num_of_sv(s: &[f64], threshold: f64) -> usize {
    s.iter().filter(|&&x| x * x > threshold).count()
}

/// Truncate a decomposition in place and return the discarded probability mass
///
/// 1. Count the significant singular values (`s² > 1e-50`) and cap the count
///    at `max_bond_dimension`. A non-empty spectrum with no significant value
///    keeps one column (`S = [0]`) so the factors stay well-formed.
/// 2. Walk from the cap towards index 1, dropping values while their
///    accumulated squares stay strictly below `truncation_threshold`.
///    `S[0]` is always kept.
/// 3. Shrink `U` to the retained columns, `S` to the retained values and `V`
///    along its shared dimension (rows for [`VConvention::Adjoint`], columns
///    otherwise).
/// 4. Renormalize the retained values to unit squared norm if they drifted by
///    more than `1e-9`.
///
/// The returned mass is the sum of squares of every significant value that
/// was removed, taken before renormalization.
pub fn reduce_zeros(
    result: &mut SvdResult,
    max_bond_dimension: usize,
    truncation_threshold: f64,
) -> f64 {
    let sv_num = num_of_sv(&result.s, ZERO_THRESHOLD).max(result.s.len().min(1));
    let capped = sv_num.min(max_bond_dimension);

    let mut new_sv_num = capped;
    let mut sum_squares = 0.0;
    for i in (1..capped).rev() {
        let sq = result.s[i] * result.s[i];
        if sum_squares + sq < truncation_threshold {
            sum_squares += sq;
            new_sv_num = i;
        } else {
            break;
        }
    }

    let discarded_value: f64 = result.s[new_sv_num..sv_num].iter().map(|x| x * x).sum();

    result.u = leading_columns(&result.u, new_sv_num);
    result.s.truncate(new_sv_num);
    result.v = match result.convention {
        VConvention::Adjoint => leading_rows(&result.v, new_sv_num),
        VConvention::Columns => leading_columns(&result.v, new_sv_num),
    };

    let new_sum_squares: f64 = result.s.iter().map(|x| x * x).sum();
    if (1.0 - new_sum_squares).abs() > RENORM_THRESHOLD && new_sum_squares > 0.0 {
        let norm = new_sum_squares.sqrt();
        for value in result.s.iter_mut() {
            *value /= norm;
        }
    }

    discarded_value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::linalg::identity;
    use approx::assert_abs_diff_eq;

    fn spectrum(s: &[f64], convention: VConvention) -> SvdResult {
        let n = s.len();
        SvdResult::new(identity(n), s.to_vec(), identity(n), convention)
    }

    #[test]
    fn test_num_of_sv() {
        assert_eq!(num_of_sv(&[1.0, 1e-20, 1e-30, 0.0], ZERO_THRESHOLD), 2);
        assert_eq!(num_of_sv(&[], ZERO_THRESHOLD), 0);
    }

    #[test]
    fn test_bond_dimension_cap() {
        let mut result = spectrum(&[3.0, 2.0, 1.0, 0.0], VConvention::Columns);
        let discarded = reduce_zeros(&mut result, 2, 0.0);
        assert_abs_diff_eq!(discarded, 1.0, epsilon = 1e-14);
        assert_eq!(result.s.len(), 2);
        assert_abs_diff_eq!(result.s[0], 3.0 / 13f64.sqrt(), epsilon = 1e-14);
        assert_abs_diff_eq!(result.s[1], 2.0 / 13f64.sqrt(), epsilon = 1e-14);
        assert_eq!(*result.u.shape(), (4, 2));
        assert_eq!(*result.v.shape(), (4, 2));
    }

    #[test]
    fn test_adjoint_convention_trims_rows() {
        let mut result = spectrum(&[0.8, 0.6, 0.0], VConvention::Adjoint);
        let discarded = reduce_zeros(&mut result, 5, 0.0);
        assert_eq!(discarded, 0.0);
        assert_eq!(*result.v.shape(), (2, 3));
        assert_eq!(*result.u.shape(), (3, 2));
        // Already normalized, left untouched
        assert_eq!(result.s, vec![0.8, 0.6]);
    }

    #[test]
    fn test_threshold_drops_tail_below_mass() {
        // squares: 0.9, 0.06, 0.03, 0.01
        let s: Vec<f64> = [0.9f64, 0.06, 0.03, 0.01].iter().map(|p| p.sqrt()).collect();
        let mut result = spectrum(&s, VConvention::Columns);
        let discarded = reduce_zeros(&mut result, 4, 0.05);
        // 0.01 + 0.03 < 0.05, adding 0.06 would exceed it
        assert_eq!(result.s.len(), 2);
        assert_abs_diff_eq!(discarded, 0.04, epsilon = 1e-12);
        let norm: f64 = result.s.iter().map(|x| x * x).sum();
        assert_abs_diff_eq!(norm, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_first_value_always_kept() {
        let s: Vec<f64> = [0.5f64, 0.3, 0.2].iter().map(|p| p.sqrt()).collect();
        let mut result = spectrum(&s, VConvention::Columns);
        let discarded = reduce_zeros(&mut result, 3, 0.9);
        assert_eq!(result.s.len(), 1);
        assert_abs_diff_eq!(discarded, 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(result.s[0], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_all_zero_spectrum_keeps_one_column() {
        for convention in [VConvention::Columns, VConvention::Adjoint] {
            let mut result = spectrum(&[0.0, 0.0], convention);
            let discarded = reduce_zeros(&mut result, 4, 0.0);
            assert_eq!(discarded, 0.0);
            assert_eq!(result.s, vec![0.0]);
            assert_eq!(*result.u.shape(), (2, 1));
            let expected = match convention {
                VConvention::Columns => (2, 1),
                VConvention::Adjoint => (1, 2),
            };
            assert_eq!(*result.v.shape(), expected);
        }
    }

    #[test]
    fn test_spectrum_below_floor_keeps_one_column() {
        let mut result = spectrum(&[1e-30, 1e-40], VConvention::Columns);
        let discarded = reduce_zeros(&mut result, 4, 0.0);
        assert_eq!(discarded, 0.0);
        assert_eq!(result.s.len(), 1);
        // Renormalized to unit weight
        assert_abs_diff_eq!(result.s[0], 1.0, epsilon = 1e-12);
    }
}

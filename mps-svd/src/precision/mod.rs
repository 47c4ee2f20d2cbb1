//! Extended-precision helpers for the reference SVD
//!
//! The QR sweep occasionally produces `f = x·cs + g·sn` that cancels to a
//! value indistinguishable from zero in `f64`. Recomputing the sum with every
//! operand scaled up and the products kept exactly (double-double arithmetic)
//! tells a genuinely vanishing rotation apart from a merely tiny one.

use twofloat::TwoFloat;

/// `(x·k)(cs·k) + (g·k)(sn·k)` with exact products and a double-double sum
#[inline]
pub fn scaled_rotation_sum(x: f64, cs: f64, g: f64, sn: f64, factor: f64) -> TwoFloat {
    let lhs = TwoFloat::new_mul(x * factor, cs * factor);
    let rhs = TwoFloat::new_mul(g * factor, sn * factor);
    lhs + rhs
}

/// True if `value` is within `threshold` of zero
#[inline]
pub fn is_negligible(value: &TwoFloat, threshold: f64) -> bool {
    value.abs() <= threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaled_sum_of_plain_values() {
        let sum = scaled_rotation_sum(1.0, 0.5, 2.0, 0.25, 1.0);
        assert_eq!(sum.hi(), 1.0);
        assert!(!is_negligible(&sum, 1e-50));
    }

    #[test]
    fn test_exact_cancellation_is_negligible() {
        let sum = scaled_rotation_sum(3.0, 0.25, -1.5, 0.5, 1e30);
        assert!(is_negligible(&sum, 1e-50));
    }

    #[test]
    fn test_rescue_recovers_sum_below_threshold() {
        // Plain f64 puts the sum under the zero threshold; scaled up by 1e30
        // per operand it is clearly non-zero
        let (x, cs, g, sn): (f64, f64, f64, f64) = (1e-40, 1e-40, 2e-40, 1e-40);
        assert!((x * cs + g * sn).abs() <= 1e-50);

        let sum = scaled_rotation_sum(x, cs, g, sn, 1e30);
        assert!(!is_negligible(&sum, 1e-50));
        assert!(((sum.hi() - 3e-20) / 3e-20).abs() < 1e-15);
    }

    #[test]
    fn test_rescue_keeps_true_zeros_negligible() {
        // Still below the threshold after scaling
        let sum = scaled_rotation_sum(1e-58, 1e-58, 2e-58, 1e-58, 1e30);
        assert!(sum.hi() > 0.0);
        assert!(is_negligible(&sum, 1e-50));
    }
}

//! GPU tensor-SVD backend and value-based truncation
//!
//! The device path (`cutensornet` feature) fuses singular-value cutoffs into
//! the decomposition and reports what it dropped. The same cutoff rule is
//! available on the host through [`apply_value_cutoff`], so all backends
//! produce comparable truncation records.

#[cfg(feature = "cutensornet")]
mod device;

#[cfg(feature = "cutensornet")]
pub use device::GpuBackend;

use crate::config::SvdPolicy;
use crate::svd::{SvdResult, VConvention};
use crate::utils::linalg::{leading_columns, leading_rows};

/// Singular-value cutoffs; a value of zero disables the corresponding rule
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SvdCutoff {
    /// Drop values at or below this magnitude
    pub abs: f64,
    /// Drop values at or below `rel * s[0]`
    pub rel: f64,
}

impl SvdCutoff {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn from_policy(policy: &SvdPolicy) -> Self {
        Self {
            abs: policy.abs_cutoff,
            rel: policy.rel_cutoff,
        }
    }

    pub fn is_active(&self) -> bool {
        self.abs > 0.0 || self.rel > 0.0
    }

    /// Number of leading values of the non-increasing spectrum `s` that survive
    ///
    /// At least one value is kept from a non-empty spectrum.
    pub fn retained_extent(&self, s: &[f64]) -> usize {
        if !self.is_active() || s.is_empty() {
            return s.len();
        }
        let threshold = self.abs.max(self.rel * s[0]);
        s.iter().take_while(|&&x| x > threshold).count().max(1)
    }
}

/// What a value cutoff removed from a decomposition
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TruncationInfo {
    /// Number of singular values before truncation
    pub full_extent: usize,
    /// Number of singular values kept
    pub reduced_extent: usize,
    /// Discarded squared weight relative to the full squared norm
    pub discarded_weight: f64,
}

impl TruncationInfo {
    /// Record for keeping the first `reduced_extent` values of `s`
    pub fn from_spectrum(s: &[f64], reduced_extent: usize) -> Self {
        let reduced_extent = reduced_extent.min(s.len());
        let total: f64 = s.iter().map(|x| x * x).sum();
        let dropped: f64 = s[reduced_extent..].iter().map(|x| x * x).sum();
        Self {
            full_extent: s.len(),
            reduced_extent,
            discarded_weight: if total > 0.0 { dropped / total } else { 0.0 },
        }
    }

    pub fn is_truncated(&self) -> bool {
        self.reduced_extent < self.full_extent
    }

    /// Absolute squared mass that was discarded, given the values that were kept
    ///
    /// Inverts `w = dropped / (kept + dropped)`. With nothing kept the dropped
    /// mass cannot be recovered from the relative weight and is reported as zero.
    pub fn discarded_mass(&self, kept: &[f64]) -> f64 {
        let kept_mass: f64 = kept.iter().map(|x| x * x).sum();
        if self.discarded_weight <= 0.0 || self.discarded_weight >= 1.0 || kept_mass == 0.0 {
            return 0.0;
        }
        self.discarded_weight * kept_mass / (1.0 - self.discarded_weight)
    }
}

/// Apply `cutoff` to a host result, shrinking `U`, `S` and `V` in place
pub fn apply_value_cutoff(result: &mut SvdResult, cutoff: &SvdCutoff) -> TruncationInfo {
    let keep = cutoff.retained_extent(&result.s);
    let info = TruncationInfo::from_spectrum(&result.s, keep);
    if !info.is_truncated() {
        return info;
    }

    result.u = leading_columns(&result.u, keep);
    result.s.truncate(keep);
    result.v = match result.convention {
        VConvention::Adjoint => leading_rows(&result.v, keep),
        VConvention::Columns => leading_columns(&result.v, keep),
    };
    log::debug!(
        "value cutoff kept {keep} of {} singular values (discarded weight {:e})",
        info.full_extent,
        info.discarded_weight
    );
    info
}

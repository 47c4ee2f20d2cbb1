//! SVD result types and the reference decomposition

pub mod csvd;
pub mod householder;
pub mod retry;

pub use csvd::csvd;
pub use retry::csvd_with_retry;

use crate::CMatrix;
use crate::backend::gpu::TruncationInfo;
use crate::utils::linalg::dagger;

/// Orientation of the right factor stored in [`SvdResult::v`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VConvention {
    /// `v` holds `V`: `A = U · diag(S) · Vᴴ` (reference and GPU backends)
    Columns,
    /// `v` holds `Vᴴ`: `A = U · diag(S) · v` (LAPACK backend)
    Adjoint,
}

/// Result of a complex SVD
#[derive(Debug, Clone)]
pub struct SvdResult {
    /// Left singular vectors (m × m, or m × k after truncation)
    pub u: CMatrix,
    /// Singular values, non-increasing
    pub s: Vec<f64>,
    /// Right factor, oriented according to `convention`
    pub v: CMatrix,
    pub convention: VConvention,
    /// Truncation already applied by the backend, if any
    pub truncation: Option<TruncationInfo>,
}

impl SvdResult {
    pub fn new(u: CMatrix, s: Vec<f64>, v: CMatrix, convention: VConvention) -> Self {
        Self {
            u,
            s,
            v,
            convention,
            truncation: None,
        }
    }

    /// Number of singular values held
    pub fn rank(&self) -> usize {
        self.s.len()
    }

    /// The right factor as `Vᴴ`, whatever the stored convention
    pub fn v_adjoint(&self) -> CMatrix {
        match self.convention {
            VConvention::Columns => dagger(&self.v),
            VConvention::Adjoint => self.v.clone(),
        }
    }

    /// Re-orient the right factor to `target`
    pub fn into_convention(mut self, target: VConvention) -> Self {
        if self.convention != target {
            self.v = dagger(&self.v);
            self.convention = target;
        }
        self
    }
}

/// Outcome of one run of the reference algorithm
///
/// Non-convergence is a value, not an error, so callers can retry cheaply.
#[must_use]
#[derive(Debug, Clone)]
pub enum CsvdStatus {
    Success(SvdResult),
    Failure,
}

impl CsvdStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, CsvdStatus::Success(_))
    }

    pub fn into_result(self) -> Option<SvdResult> {
        match self {
            CsvdStatus::Success(result) => Some(result),
            CsvdStatus::Failure => None,
        }
    }
}

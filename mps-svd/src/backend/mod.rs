//! Decomposition backends
//!
//! Three implementations share one interface:
//! - [`ReferenceBackend`]: the Businger-Golub SVD behind the retry driver
//! - [`VendorBackend`]: LAPACK `zgesvd`/`zgesdd` through [`lapack`]
//! - `GpuBackend`: cuTensorNet tensor SVD (`cutensornet` feature)
//!
//! The backend is chosen once, when a [`crate::BondCompressor`] is built.
//! Callers must honour [`SvdBackend::convention`]: the vendor backend hands
//! back `Vᴴ`, the other two hand back `V`.

pub mod gpu;
pub mod lapack;

use crate::CMatrix;
use crate::config::SvdPolicy;
use crate::error::SvdError;
use crate::svd::{SvdResult, VConvention, csvd_with_retry};
use crate::utils::validation::validate_svd_result;
use gpu::{SvdCutoff, apply_value_cutoff};

/// Shared decomposition interface
pub trait SvdBackend: Send + Sync {
    /// Decompose `a`, consuming it
    fn decompose(&self, a: CMatrix, policy: &SvdPolicy) -> Result<SvdResult, SvdError>;

    /// Orientation of the right factor in results of this backend
    fn convention(&self) -> VConvention;

    /// Returns backend name for debugging
    fn name(&self) -> &'static str;
}

/// Reference algorithm with rescale-and-retry
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceBackend;

impl SvdBackend for ReferenceBackend {
    fn decompose(&self, a: CMatrix, policy: &SvdPolicy) -> Result<SvdResult, SvdError> {
        csvd_with_retry(a, policy)
    }

    fn convention(&self) -> VConvention {
        VConvention::Columns
    }

    fn name(&self) -> &'static str {
        "reference (Householder + implicit QR)"
    }
}

/// Vendor LAPACK backend; results hold `Vᴴ`
#[derive(Debug, Clone, Copy, Default)]
pub struct VendorBackend;

impl SvdBackend for VendorBackend {
    fn decompose(&self, a: CMatrix, _policy: &SvdPolicy) -> Result<SvdResult, SvdError> {
        lapack::lapack_svd(a)
    }

    fn convention(&self) -> VConvention {
        VConvention::Adjoint
    }

    fn name(&self) -> &'static str {
        "vendor LAPACK"
    }
}

/// Which backend a process runs with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Reference,
    Vendor,
    Gpu,
}

impl BackendKind {
    /// GPU builds always decompose on the GPU; otherwise the flag decides
    pub fn select(use_vendor_backend: bool) -> Self {
        if cfg!(feature = "cutensornet") {
            BackendKind::Gpu
        } else if use_vendor_backend {
            BackendKind::Vendor
        } else {
            BackendKind::Reference
        }
    }
}

/// Instantiate a backend of the given kind
pub fn backend_for(kind: BackendKind) -> Result<Box<dyn SvdBackend>, SvdError> {
    match kind {
        BackendKind::Reference => Ok(Box::new(ReferenceBackend)),
        BackendKind::Vendor => Ok(Box::new(VendorBackend)),
        #[cfg(feature = "cutensornet")]
        BackendKind::Gpu => Ok(Box::new(gpu::GpuBackend::new()?)),
        #[cfg(not(feature = "cutensornet"))]
        BackendKind::Gpu => Err(SvdError::InvalidConfig(
            "GPU backend requested but the crate was built without the `cutensornet` feature"
                .to_string(),
        )),
    }
}

/// Pick and build the process backend from the caller's flag
pub fn select_backend(use_vendor_backend: bool) -> Result<Box<dyn SvdBackend>, SvdError> {
    let kind = BackendKind::select(use_vendor_backend);
    let backend = backend_for(kind)?;
    log::debug!("SVD backend: {} ({kind:?})", backend.name());
    Ok(backend)
}

/// Shared entry point: decompose, optionally validate, apply value cutoffs
///
/// With `policy.validate` set, a copy of `a` is kept and the result is
/// reconstructed and compared against it. Results already truncated by the
/// backend are not compared. Value cutoffs configured in the policy are
/// applied on the host unless the backend did so itself.
pub fn decompose(
    backend: &dyn SvdBackend,
    a: CMatrix,
    policy: &SvdPolicy,
) -> Result<SvdResult, SvdError> {
    let original = policy.validate.then(|| a.clone());
    let mut result = backend.decompose(a, policy)?;

    if let Some(original) = original {
        match result.truncation {
            Some(info) if info.is_truncated() => {
                log::debug!("skipping validation of a truncated {} result", backend.name());
            }
            _ => validate_svd_result(&original, &result)?,
        }
    }

    let cutoff = SvdCutoff::from_policy(policy);
    if cutoff.is_active() && result.truncation.is_none() {
        let info = apply_value_cutoff(&mut result, &cutoff);
        result.truncation = Some(info);
    }

    Ok(result)
}

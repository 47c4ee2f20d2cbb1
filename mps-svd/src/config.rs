//! Numerical policy and compression configuration
//!
//! The constants below are empirically tuned; [`SvdPolicy`] carries them as
//! plain values so tests and callers can vary them without touching the
//! algorithm. The process-wide policy is read once from the environment.

use crate::error::SvdError;
use once_cell::sync::Lazy;
use std::env;

/// Factor applied to the input on every retry of the reference algorithm
pub const MUL_FACTOR: f64 = 1e2;
/// Maximum number of rescaled retries after the first attempt
pub const NUM_SVD_TRIES: usize = 15;
/// Relative tolerance for negligible bidiagonal entries
pub const CONVERGENCE_ETA: f64 = 1e-10;
/// Householder norms² at or below this are treated as zero
pub const NORM_FLOOR: f64 = 1.5e-34;
/// Threshold for comparing floating-point values against zero
pub const ZERO_THRESHOLD: f64 = 1e-50;
/// Tolerance for renormalization and for result validation
pub const RENORM_THRESHOLD: f64 = 1e-9;
/// Scale used by the extended-precision rescue of degenerate rotations
pub const TINY_FACTOR: f64 = 1e30;
/// Tolerance on the sign of the QR shift parameter and on the rotation terms
/// that qualify for the extended-precision rescue
pub const SIGN_TOLERANCE: f64 = 1e-13;
/// Implicit-QR sweeps allowed per singular value
pub const MAX_QR_SWEEPS: usize = 100;
/// Both dimensions at least this large select divide-and-conquer (`zgesdd`)
pub const DIVIDE_AND_CONQUER_MIN_DIM: usize = 64;

/// Numerical policy shared by all backends
#[derive(Debug, Clone, PartialEq)]
pub struct SvdPolicy {
    /// Rescale factor between retries
    pub mul_factor: f64,
    /// Rescaled retries before giving up
    pub max_retries: usize,
    /// `eps = max(|d_k| + |e_k|) * convergence_eta`
    pub convergence_eta: f64,
    pub norm_floor: f64,
    pub max_qr_sweeps: usize,
    /// Reconstruct and compare every decomposition against its input
    pub validate: bool,
    /// Absolute singular-value cutoff (fused into the GPU decomposition,
    /// applied on the host for the other backends); zero disables it
    pub abs_cutoff: f64,
    /// Cutoff relative to the largest singular value; zero disables it
    pub rel_cutoff: f64,
}

impl Default for SvdPolicy {
    fn default() -> Self {
        Self {
            mul_factor: MUL_FACTOR,
            max_retries: NUM_SVD_TRIES,
            convergence_eta: CONVERGENCE_ETA,
            norm_floor: NORM_FLOOR,
            max_qr_sweeps: MAX_QR_SWEEPS,
            validate: false,
            abs_cutoff: 0.0,
            rel_cutoff: 0.0,
        }
    }
}

impl SvdPolicy {
    /// Default policy with `MPS_SVD_*` environment overrides applied
    ///
    /// Recognized variables: `MPS_SVD_MAX_RETRIES`, `MPS_SVD_MUL_FACTOR`,
    /// `MPS_SVD_VALIDATE`, `MPS_SVD_ABS_CUTOFF`, `MPS_SVD_REL_CUTOFF`.
    /// Values that do not parse are ignored.
    pub fn from_env() -> Self {
        let mut policy = Self::default();

        if let Some(retries) = parse_env("MPS_SVD_MAX_RETRIES") {
            policy.max_retries = retries;
        }
        if let Some(factor) = parse_env::<f64>("MPS_SVD_MUL_FACTOR") {
            if factor > 1.0 && factor.is_finite() {
                policy.mul_factor = factor;
            } else {
                log::warn!("ignoring MPS_SVD_MUL_FACTOR={factor}: must be a finite value > 1");
            }
        }
        if let Ok(flag) = env::var("MPS_SVD_VALIDATE") {
            match parse_bool(&flag) {
                Some(validate) => policy.validate = validate,
                None => log::warn!("ignoring MPS_SVD_VALIDATE={flag}: expected a boolean"),
            }
        }
        if let Some(cutoff) = parse_env("MPS_SVD_ABS_CUTOFF") {
            policy.abs_cutoff = cutoff;
        }
        if let Some(cutoff) = parse_env("MPS_SVD_REL_CUTOFF") {
            policy.rel_cutoff = cutoff;
        }

        policy
    }

    /// Builder-style toggle for result validation
    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }
}

static GLOBAL_POLICY: Lazy<SvdPolicy> = Lazy::new(SvdPolicy::from_env);

/// Process-wide policy, read from the environment on first use
pub fn global_policy() -> &'static SvdPolicy {
    &GLOBAL_POLICY
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("ignoring {name}={raw}: could not parse value");
            None
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Per-simulation compression settings supplied by the MPS caller
#[derive(Debug, Clone, PartialEq)]
pub struct CompressionConfig {
    /// Upper bound on the retained bond dimension
    pub max_bond_dimension: usize,
    /// Probability mass that may be discarded from the tail of the spectrum
    pub truncation_threshold: f64,
    /// Decompose through the vendor LAPACK backend instead of the reference one
    pub use_vendor_backend: bool,
}

impl CompressionConfig {
    pub fn new(max_bond_dimension: usize, truncation_threshold: f64) -> Self {
        Self {
            max_bond_dimension,
            truncation_threshold,
            use_vendor_backend: false,
        }
    }

    pub fn with_vendor_backend(mut self, use_vendor_backend: bool) -> Self {
        self.use_vendor_backend = use_vendor_backend;
        self
    }

    pub fn validate(&self) -> Result<(), SvdError> {
        if self.max_bond_dimension == 0 {
            return Err(SvdError::InvalidConfig(
                "max_bond_dimension must be positive".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.truncation_threshold) {
            return Err(SvdError::InvalidConfig(format!(
                "truncation_threshold must lie in [0, 1), got {}",
                self.truncation_threshold
            )));
        }
        Ok(())
    }
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self::new(usize::MAX, 0.0)
    }
}

//! Error types for the decomposition pipeline

/// Errors that abort a compression step
///
/// Non-convergence of a single reference-algorithm attempt is not an error;
/// it is reported through [`crate::svd::CsvdStatus`] so the retry driver can
/// react to it. Everything here is fatal for the calling step.
#[derive(Debug, thiserror::Error)]
pub enum SvdError {
    #[error("SVD failed to converge after {attempts} rescaled retries")]
    RetryExhausted { attempts: usize },

    #[error("{routine} failed with info = {info}")]
    VendorFailure { routine: &'static str, info: i32 },

    #[error("wrong SVD calculation at ({row}, {col}): A = {expected}, USV* = {actual}")]
    ValidationMismatch {
        row: usize,
        col: usize,
        expected: num_complex::Complex64,
        actual: num_complex::Complex64,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("GPU tensor SVD failed: {0}")]
    Gpu(String),
}

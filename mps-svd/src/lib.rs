//! # mps-svd: complex SVD for matrix-product-state bond compression
//!
//! Dense complex singular value decomposition used when two neighbouring
//! MPS sites are merged and split again. The crate provides
//!
//! - a reference Householder/implicit-QR SVD that reports non-convergence as
//!   a status value, wrapped by a rescale-and-retry driver,
//! - a vendor LAPACK backend (pure Rust `faer` by default, injectable
//!   `zgesvd`/`zgesdd` pointers otherwise),
//! - an optional GPU tensor-network backend (`cutensornet` feature),
//! - bond-dimension truncation with Schmidt-coefficient renormalization.

pub mod backend;
pub mod compress;
pub mod config;
pub mod error;
pub mod precision;
pub mod reshape;
pub mod svd;
pub mod truncate;
pub mod utils;

pub use backend::{
    BackendKind, ReferenceBackend, SvdBackend, VendorBackend, decompose, select_backend,
};
pub use backend::gpu::{SvdCutoff, TruncationInfo};
pub use compress::{BondCompressor, BondSplit, split_bond};
pub use config::{CompressionConfig, SvdPolicy, global_policy};
pub use error::SvdError;
pub use svd::{CsvdStatus, SvdResult, VConvention, csvd, csvd_with_retry};
pub use truncate::{num_of_sv, reduce_zeros};

// Re-export mdarray types
pub use mdarray::{DTensor, Tensor};
pub use num_complex::Complex64;

/// Dense complex matrix (row-major)
pub type CMatrix = DTensor<Complex64, 2>;

//! Two-site bond compression
//!
//! Merges the four blocks of a two-site tensor, decomposes the packed matrix,
//! truncates the bond and splits the factors back into per-site blocks.

use crate::CMatrix;
use crate::backend::{SvdBackend, decompose, select_backend};
use crate::config::{CompressionConfig, SvdPolicy, global_policy};
use crate::error::SvdError;
use crate::reshape::{reshape_before_svd, reshape_u_after_svd, reshape_v_after_svd, reshape_vh_after_svd};
use crate::svd::VConvention;
use crate::truncate::reduce_zeros;

/// Factors of a compressed bond
#[derive(Debug, Clone)]
pub struct BondSplit {
    /// Left-site blocks, the row halves of `U`
    pub u_blocks: [CMatrix; 2],
    /// Renormalized Schmidt coefficients
    pub lambda: Vec<f64>,
    /// Right-site blocks, the column halves of `Vᴴ`
    pub v_blocks: [CMatrix; 2],
    /// Squared weight removed by truncation
    pub discarded_value: f64,
}

impl BondSplit {
    pub fn bond_dimension(&self) -> usize {
        self.lambda.len()
    }
}

/// Decomposes and truncates bonds with one backend for its whole lifetime
pub struct BondCompressor {
    backend: Box<dyn SvdBackend>,
    config: CompressionConfig,
    policy: SvdPolicy,
}

impl BondCompressor {
    /// Validate `config` and pick the backend it asks for
    pub fn new(config: CompressionConfig) -> Result<Self, SvdError> {
        config.validate()?;
        let backend = select_backend(config.use_vendor_backend)?;
        Ok(Self {
            backend,
            config,
            policy: global_policy().clone(),
        })
    }

    /// Replace the environment-derived numerical policy
    pub fn with_policy(mut self, policy: SvdPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn config(&self) -> &CompressionConfig {
        &self.config
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Compress the bond between the blocks `[A0, A1, A2, A3]`
    pub fn split(&self, blocks: &[CMatrix; 4]) -> Result<BondSplit, SvdError> {
        let packed = reshape_before_svd(blocks)?;
        let mut result = decompose(self.backend.as_ref(), packed, &self.policy)?;

        // Backends report cutoffs as a relative weight; the bond tracks mass
        let cutoff_mass = result
            .truncation
            .map_or(0.0, |info| info.discarded_mass(&result.s));
        let discarded_value = cutoff_mass
            + reduce_zeros(
                &mut result,
                self.config.max_bond_dimension,
                self.config.truncation_threshold,
            );

        let u_blocks = reshape_u_after_svd(&result.u)?;
        let v_blocks = match result.convention {
            VConvention::Columns => reshape_v_after_svd(&result.v)?,
            VConvention::Adjoint => reshape_vh_after_svd(&result.v)?,
        };

        Ok(BondSplit {
            u_blocks,
            lambda: result.s,
            v_blocks,
            discarded_value,
        })
    }
}

/// One-shot convenience around [`BondCompressor`]
pub fn split_bond(blocks: &[CMatrix; 4], config: &CompressionConfig) -> Result<BondSplit, SvdError> {
    BondCompressor::new(config.clone())?.split(blocks)
}

//! Derivative generation: one source image in, one encoded buffer per size out.
//!
//! These functions combine calculations with backend execution. They take
//! the planned derivatives, compute resize parameters, and fan the resizes
//! out over a dedicated rayon pool sized to the number of derivatives.
//!
//! ## Ordering and failure
//!
//! Results come back in plan order no matter which resize finishes first:
//! `par_iter().map().collect()` on a slice is index-stable. A failing resize
//! does not stop its siblings, but any failure discards the whole batch; the
//! error reported is the first failing plan entry in plan order.

use super::backend::{BackendError, ImageBackend, SourceImage};
use super::calculations::calculate_long_edge_dimensions;
use super::params::{Quality, ResizeParams};
use crate::key;
use crate::types::{DecodedKey, DerivativeResult, DerivativeSpec};
use rayon::prelude::*;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("Source is not a decodable image: {0}")]
    ImageDecode(#[source] BackendError),
    #[error("Resize to {size}px failed: {source}")]
    Resize {
        size: u32,
        #[source]
        source: BackendError,
    },
    #[error("Failed to build resize pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// A derivative to produce: its size and where it will be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivativePlan {
    pub spec: DerivativeSpec,
    pub output_key: String,
}

/// Pair every size with its output key, in the order given.
pub fn plan_derivatives(decoded: &DecodedKey, specs: &[DerivativeSpec]) -> Vec<DerivativePlan> {
    specs
        .iter()
        .zip(key::plan_output_keys(decoded, specs))
        .map(|(spec, output_key)| DerivativePlan {
            spec: *spec,
            output_key,
        })
        .collect()
}

/// Resize parameters for one plan entry against a decoded source.
pub fn plan_resize(source: &SourceImage, spec: DerivativeSpec, quality: Quality) -> ResizeParams {
    let dims = source.dimensions();
    let (width, height) = calculate_long_edge_dimensions((dims.width, dims.height), spec.size);
    ResizeParams {
        target: spec.size,
        width,
        height,
        quality,
    }
}

/// Runs the resize fan-out for a fixed set of derivatives.
#[derive(Debug)]
pub struct DerivativeGenerator<B> {
    backend: B,
    quality: Quality,
    pool: rayon::ThreadPool,
}

impl<B: ImageBackend> DerivativeGenerator<B> {
    /// `fan_out` is the number of derivatives generated per source; the pool
    /// gets one thread per derivative.
    pub fn new(backend: B, quality: Quality, fan_out: usize) -> Result<Self, GenerateError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(fan_out.max(1))
            .thread_name(|i| format!("resize-{i}"))
            .build()?;
        Ok(Self {
            backend,
            quality,
            pool,
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Decode the source bytes.
    pub fn decode(&self, bytes: &[u8]) -> Result<SourceImage, GenerateError> {
        self.backend.decode(bytes).map_err(GenerateError::ImageDecode)
    }

    /// Resize an already-decoded source into every planned derivative.
    pub fn generate_from(
        &self,
        source: &SourceImage,
        plans: &[DerivativePlan],
    ) -> Result<Vec<DerivativeResult>, GenerateError> {
        let outcomes: Vec<Result<DerivativeResult, GenerateError>> = self.pool.install(|| {
            plans
                .par_iter()
                .map(|plan| {
                    let params = plan_resize(source, plan.spec, self.quality);
                    tracing::debug!(
                        key = %plan.output_key,
                        width = params.width,
                        height = params.height,
                        "resizing"
                    );
                    self.backend
                        .resize(source, &params)
                        .map(|content| DerivativeResult {
                            output_key: plan.output_key.clone(),
                            content,
                        })
                        .map_err(|source| GenerateError::Resize {
                            size: plan.spec.size,
                            source,
                        })
                })
                .collect()
        });

        outcomes.into_iter().collect()
    }

    /// Decode `bytes` and produce every planned derivative, all or nothing.
    pub fn generate(
        &self,
        bytes: &[u8],
        plans: &[DerivativePlan],
    ) -> Result<Vec<DerivativeResult>, GenerateError> {
        let source = self.decode(bytes)?;
        self.generate_from(&source, plans)
    }
}

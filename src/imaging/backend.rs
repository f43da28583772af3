//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two operations every backend must
//! support: decode a source buffer, and resize + re-encode a decoded image.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend): pure Rust, everything
//! statically linked into the binary.

use super::params::ResizeParams;
use image::{DynamicImage, ImageFormat};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),
    #[error("Encode failed: {0}")]
    Encode(String),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Pixel size of a decoded source, from [`SourceImage::dimensions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// A decoded raster plus the format it was decoded from.
///
/// Derivatives are re-encoded in `format`.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub image: DynamicImage,
    pub format: ImageFormat,
}

impl SourceImage {
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.image.width(),
            height: self.image.height(),
        }
    }
}

/// Trait for image processing backends.
///
/// `Sync` so a single backend can be shared by every resize task of a fan-out.
pub trait ImageBackend: Sync {
    /// Decode source bytes into a raster.
    fn decode(&self, bytes: &[u8]) -> Result<SourceImage, BackendError>;

    /// Resize a decoded source and encode it in the source format.
    fn resize(&self, source: &SourceImage, params: &ResizeParams) -> Result<Vec<u8>, BackendError>;
}

//! Pure Rust image processing backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Sniff format | `image::guess_format` (magic bytes, not the key's extension) |
//! | Decode (JPEG, PNG) | `image::load_from_memory_with_format` |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` at the configured quality |
//! | Encode → PNG | `image::codecs::png::PngEncoder` (lossless, quality ignored) |
//!
//! Encoding is deterministic: the same source and parameters always produce
//! byte-identical output, which keeps redelivered events idempotent.

use super::backend::{BackendError, ImageBackend, SourceImage};
use super::params::ResizeParams;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};

/// Formats whose decoders and encoders are compiled in.
const SUPPORTED_FORMATS: &[ImageFormat] = &[ImageFormat::Jpeg, ImageFormat::Png];

/// Pure Rust backend using the `image` crate.
///
/// See the [module docs](self) for the crate-to-operation mapping.
#[derive(Debug)]
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn encode(img: &DynamicImage, format: ImageFormat, quality: u8) -> Result<Vec<u8>, BackendError> {
    let mut buf = Vec::new();
    match format {
        ImageFormat::Jpeg => {
            // JPEG has no alpha channel
            let rgb = match img {
                DynamicImage::ImageRgb8(_) | DynamicImage::ImageLuma8(_) => img.clone(),
                other => DynamicImage::ImageRgb8(other.to_rgb8()),
            };
            rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality))
                .map_err(|e| BackendError::Encode(format!("JPEG encode failed: {}", e)))?;
        }
        ImageFormat::Png => {
            img.write_with_encoder(PngEncoder::new(&mut buf))
                .map_err(|e| BackendError::Encode(format!("PNG encode failed: {}", e)))?;
        }
        other => {
            return Err(BackendError::UnsupportedFormat(format!("{:?}", other)));
        }
    }
    Ok(buf)
}

impl ImageBackend for RustBackend {
    fn decode(&self, bytes: &[u8]) -> Result<SourceImage, BackendError> {
        let format = image::guess_format(bytes)
            .map_err(|e| BackendError::Decode(format!("Unrecognized image data: {}", e)))?;
        if !SUPPORTED_FORMATS.contains(&format) {
            return Err(BackendError::UnsupportedFormat(format!("{:?}", format)));
        }
        let image = image::load_from_memory_with_format(bytes, format)
            .map_err(|e| BackendError::Decode(format!("Failed to decode {:?}: {}", format, e)))?;
        Ok(SourceImage { image, format })
    }

    fn resize(&self, source: &SourceImage, params: &ResizeParams) -> Result<Vec<u8>, BackendError> {
        if params.width == 0 || params.height == 0 {
            return Err(BackendError::ProcessingFailed(format!(
                "Invalid target dimensions {}x{}",
                params.width, params.height
            )));
        }
        let resized = source
            .image
            .resize_exact(params.width, params.height, FilterType::Lanczos3);
        encode(&resized, source.format, params.quality.value() as u8)
    }
}

//! Shared test utilities.
//!
//! Synthetic source images encoded in memory, so tests need no fixture files.
//!
//! ```rust,ignore
//! use crate::test_helpers::*;
//!
//! let bytes = synthetic_jpeg(640, 480);
//! let source = RustBackend::new().decode(&bytes).unwrap();
//! assert_eq!(source.dimensions().width, 640);
//! ```

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};

/// A diagonal gradient, so resampling has real detail to work on.
fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            ((x + y) % 256) as u8,
        ])
    })
}

/// Baseline JPEG of the given size.
pub fn synthetic_jpeg(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(gradient(width, height))
        .write_with_encoder(JpegEncoder::new_with_quality(&mut buf, 90))
        .unwrap();
    buf
}

/// PNG with an alpha channel of the given size.
pub fn synthetic_png(width: u32, height: u32) -> Vec<u8> {
    let rgb = gradient(width, height);
    let rgba = RgbaImage::from_fn(width, height, |x, y| {
        let Rgb([r, g, b]) = *rgb.get_pixel(x, y);
        Rgba([r, g, b, if x % 2 == 0 { 255 } else { 128 }])
    });
    let mut buf = Vec::new();
    DynamicImage::ImageRgba8(rgba)
        .write_with_encoder(PngEncoder::new(&mut buf))
        .unwrap();
    buf
}


//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They sit between
//! [`operations`](super::operations), which decides which derivatives to
//! build, and the [`backend`](super::backend), which does the pixel work, so a
//! mock backend can stand in during tests.
//!
//! - [`Quality`]: lossy encoding quality (1-100, default 90). Clamped on construction.
//! - [`ResizeParams`]: target size plus the exact output dimensions and quality.

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Parameters for one derivative resize.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeParams {
    /// Requested longer-edge size.
    pub target: u32,
    pub width: u32,
    pub height: u32,
    pub quality: Quality,
}

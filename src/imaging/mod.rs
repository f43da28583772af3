//! Image processing: pure Rust, statically linked.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::guess_format` + `load_from_memory_with_format` |
//! | **Resize** | Lanczos3, longer edge scaled to the target size |
//! | **Encode** | same format as the source (JPEG at configured quality, PNG) |
//! | **Fan-out** | dedicated rayon pool, one thread per derivative |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: [`DerivativeGenerator`], combining calculations + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend, SourceImage};
pub use calculations::calculate_long_edge_dimensions;
pub use operations::{
    DerivativeGenerator, DerivativePlan, GenerateError, plan_derivatives, plan_resize,
};
pub use params::{Quality, ResizeParams};
pub use rust_backend::RustBackend;

//! Image processing: pure Rust decode, lossy WebP encode.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `ImageDecoder::dimensions` + `orientation` (header only) |
//! | **Load** | `image` decoders, `avif-parse` + `rav1d` for AVIF, libheif for HEIC (`heic` feature) |
//! | **Resize** | Lanczos3 |
//! | **Encode** | `webp` (libwebp, lossy) |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for tier dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

mod avif;
pub mod backend;
mod calculations;
#[cfg(feature = "heic")]
mod heic;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend, Probe, SourceImage, SourceKind};
pub use calculations::{TierPlan, plan_tiers, scale_to_width};
pub use operations::{QualityPolicy, create_tier, plan_source, write_atomic};
pub use params::{Background, EncodeParams, Quality};
pub use rust_backend::{RustBackend, supported_input_extensions};

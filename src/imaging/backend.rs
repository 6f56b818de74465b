//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the three operations the generator
//! needs: identify (cheap header probe), load (full decode, normalized to an
//! upright opaque raster) and encode (resample + lossy WebP).
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend).

use super::params::{Background, EncodeParams};
use image::RgbImage;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
}

/// Pixel dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn as_tuple(self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// How a source was stored, which drives the default encode quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Lossy camera-style sources (JPEG, opaque TIFF/WebP/AVIF).
    Photographic,
    /// Lossless palette or alpha sources (PNG, anything with transparency).
    Graphic,
}

/// Result of a header-only probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Probe {
    /// Dimensions after the orientation transform, i.e. as displayed.
    pub dimensions: Dimensions,
    /// EXIF orientation tag (1 = upright, 1–8).
    pub orientation: u8,
    pub kind: SourceKind,
}

/// A decoded source, already upright and flattened to three channels.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub pixels: RgbImage,
    pub kind: SourceKind,
}

impl SourceImage {
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.pixels.width(),
            height: self.pixels.height(),
        }
    }
}

/// Trait for image processing backends.
///
/// `Sync` so one backend can be shared across the rayon pool.
pub trait ImageBackend: Sync {
    /// Read dimensions, orientation and kind without decoding pixels.
    fn identify(&self, path: &Path) -> Result<Probe, BackendError>;

    /// Decode, apply the orientation transform once, and flatten any alpha
    /// onto `background`.
    fn load(&self, path: &Path, background: Background) -> Result<SourceImage, BackendError>;

    /// Resample (when dimensions differ) and encode to lossy WebP bytes.
    fn encode(&self, image: &SourceImage, params: &EncodeParams) -> Result<Vec<u8>, BackendError>;
}

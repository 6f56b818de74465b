//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They sit between
//! the [`operations`](super::operations) module (which decides which tiers to
//! write) and the [`backend`](super::backend) (which does the pixel work), so
//! a mock backend can stand in for the real one in tests.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy WebP quality (1–100). Clamped on construction.
//! - [`Background`]: Opaque color that alpha and palette sources are flattened onto.
//! - [`EncodeParams`]: Target dimensions and quality for one tier.

use serde::{Deserialize, Serialize};

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

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
        Self(85)
    }
}

/// Opaque RGB background used when flattening transparency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Background(pub [u8; 3]);

impl Background {
    pub fn white() -> Self {
        Self([255, 255, 255])
    }
}

impl Default for Background {
    fn default() -> Self {
        Self::white()
    }
}

/// Parameters for encoding one tier.
///
/// When `width`/`height` equal the source dimensions the backend encodes the
/// pixels verbatim, without resampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeParams {
    pub width: u32,
    pub height: u32,
    pub quality: Quality,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_default_is_photographic() {
        assert_eq!(Quality::default().value(), 85);
    }

    #[test]
    fn background_default_is_white() {
        assert_eq!(Background::default(), Background([255, 255, 255]));
    }
}

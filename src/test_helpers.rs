//! Shared test utilities for the srcset-ladder test suite.
//!
//! Fixture writers for real encoded sources (so the [`RustBackend`] can be
//! exercised end to end) and for derivative trees on storage (so the
//! resolver and scanner can be tested without encoding anything).
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = tempfile::TempDir::new().unwrap();
//! let source = tmp.path().join("beach.jpg");
//! write_jpeg_with_orientation(&source, 30, 40, 6);
//!
//! let root = tmp.path().join("out");
//! touch_tiers(&root, "cat", &[SizeTier::Thumb, SizeTier::Small]);
//! ```
//!
//! [`RustBackend`]: crate::imaging::RustBackend

use std::path::Path;

use image::{ImageEncoder, Rgb, RgbImage, Rgba, RgbaImage};

use crate::tier::{SizeTier, TierLadder, asset_path};

/// Small ladder so fixtures stay tiny: 30/64/102/192/256.
pub fn small_ladder() -> TierLadder {
    TierLadder::with_widths([30, 64, 102, 192, 256]).unwrap()
}

// =========================================================================
// Source fixtures
// =========================================================================

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    })
}

fn encode_jpeg(img: &RgbImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut bytes, 95)
        .write_image(
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgb8,
        )
        .unwrap();
    bytes
}

/// Splice an APP1 segment right after SOI holding a big-endian TIFF block
/// with a single IFD0 entry: orientation (tag 0x0112) = `orientation`.
fn with_exif_orientation(jpeg: Vec<u8>, orientation: u16) -> Vec<u8> {
    assert_eq!(&jpeg[..2], &[0xFF, 0xD8], "encoder must emit SOI first");

    let mut tiff = Vec::new();
    tiff.extend_from_slice(b"MM\x00\x2A\x00\x00\x00\x08");
    tiff.extend_from_slice(&1u16.to_be_bytes()); // entry count
    tiff.extend_from_slice(&0x0112u16.to_be_bytes()); // Orientation
    tiff.extend_from_slice(&3u16.to_be_bytes()); // SHORT
    tiff.extend_from_slice(&1u32.to_be_bytes());
    tiff.extend_from_slice(&orientation.to_be_bytes());
    tiff.extend_from_slice(&[0, 0]);
    tiff.extend_from_slice(&0u32.to_be_bytes()); // no next IFD

    let mut app1 = b"Exif\x00\x00".to_vec();
    app1.extend_from_slice(&tiff);
    let segment_len = (app1.len() + 2) as u16;

    let mut out = vec![0xFF, 0xD8, 0xFF, 0xE1];
    out.extend_from_slice(&segment_len.to_be_bytes());
    out.extend_from_slice(&app1);
    out.extend_from_slice(&jpeg[2..]);
    out
}

/// Write a valid baseline JPEG with a gradient.
pub fn write_jpeg(path: &Path, width: u32, height: u32) {
    std::fs::write(path, encode_jpeg(&gradient(width, height))).unwrap();
}

/// Write a JPEG whose stored pixels are `width`×`height` and whose EXIF
/// orientation tag is `orientation` (1–8).
pub fn write_jpeg_with_orientation(path: &Path, width: u32, height: u32, orientation: u16) {
    let jpeg = encode_jpeg(&gradient(width, height));
    std::fs::write(path, with_exif_orientation(jpeg, orientation)).unwrap();
}

/// Side of the red marker block in [`write_marked_jpeg`]. A whole 16×16
/// MCU, so chroma subsampling cannot bleed gray into the corner pixel.
pub const MARKER: u32 = 16;

/// Write a mid-gray JPEG with a red `MARKER`×`MARKER` block in the
/// top-left corner of the *stored* pixels, tagged with `orientation`.
pub fn write_marked_jpeg(path: &Path, width: u32, height: u32, orientation: u16) {
    let img = RgbImage::from_fn(width, height, |x, y| {
        if x < MARKER && y < MARKER {
            Rgb([255, 0, 0])
        } else {
            Rgb([128, 128, 128])
        }
    });
    std::fs::write(path, with_exif_orientation(encode_jpeg(&img), orientation)).unwrap();
}

/// True when the pixel is clearly the red marker, not gray.
pub fn is_marker(px: [u8; 3]) -> bool {
    px[0] > 180 && px[1] < 80 && px[2] < 80
}

/// Write an RGBA PNG: opaque red square in the middle, fully transparent
/// border of `width / 4`.
pub fn write_png_with_alpha(path: &Path, width: u32, height: u32) {
    let border = width / 4;
    let img = RgbaImage::from_fn(width, height, |x, y| {
        let inside = x >= border && x < width - border && y >= border && y < height - border;
        if inside {
            Rgba([255, 0, 0, 255])
        } else {
            Rgba([0, 0, 0, 0])
        }
    });
    img.save_with_format(path, image::ImageFormat::Png).unwrap();
}

// =========================================================================
// Storage fixtures
// =========================================================================

/// Create placeholder derivative files for `base` in the given tiers.
pub fn touch_tiers(root: &Path, base: &str, tiers: &[SizeTier]) {
    for &tier in tiers {
        let path = asset_path(root, tier, base);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"placeholder").unwrap();
    }
}

/// Tiers that currently exist on storage for `base`, smallest first.
pub fn tiers_on_disk(root: &Path, base: &str) -> Vec<SizeTier> {
    SizeTier::ALL
        .into_iter()
        .filter(|&tier| asset_path(root, tier, base).is_file())
        .collect()
}

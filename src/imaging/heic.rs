//! HEIC (HEVC-coded HEIF) decoding through the system libheif.
//!
//! Only compiled with the `heic` feature. libheif applies the container's
//! rotation and mirror properties during decode, and reports the handle
//! size after those transforms, so HEIC sources come out already upright.

use super::backend::{BackendError, Dimensions};
use image::{DynamicImage, RgbImage};
use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};
use std::path::Path;

pub(crate) const EXTENSIONS: &[&str] = &["heic", "heif"];

pub(crate) fn is_heic(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| EXTENSIONS.iter().any(|ext| e.eq_ignore_ascii_case(ext)))
}

fn heif_error(path: &Path, err: libheif_rs::HeifError) -> BackendError {
    BackendError::Decode(format!("{}: {err}", path.display()))
}

fn path_str(path: &Path) -> Result<&str, BackendError> {
    path.to_str()
        .ok_or_else(|| BackendError::Decode(format!("non UTF-8 path {}", path.display())))
}

/// Upright dimensions of the primary image, without decoding.
pub(crate) fn identify(path: &Path) -> Result<Dimensions, BackendError> {
    let ctx = HeifContext::read_from_file(path_str(path)?).map_err(|e| heif_error(path, e))?;
    let handle = ctx.primary_image_handle().map_err(|e| heif_error(path, e))?;
    Ok(Dimensions {
        width: handle.width(),
        height: handle.height(),
    })
}

/// Decode the primary image to upright 8-bit RGB.
pub(crate) fn decode(path: &Path) -> Result<DynamicImage, BackendError> {
    let ctx = HeifContext::read_from_file(path_str(path)?).map_err(|e| heif_error(path, e))?;
    let handle = ctx.primary_image_handle().map_err(|e| heif_error(path, e))?;
    let image = LibHeif::new()
        .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgb), None)
        .map_err(|e| heif_error(path, e))?;

    let planes = image.planes();
    let plane = planes
        .interleaved
        .ok_or_else(|| BackendError::Decode(format!("{}: no RGB plane", path.display())))?;
    let (width, height) = (plane.width, plane.height);
    let row = width as usize * 3;

    // rows may be padded past width * 3
    let mut rgb = Vec::with_capacity(row * height as usize);
    for line in plane.data.chunks(plane.stride).take(height as usize) {
        let pixels = line
            .get(..row)
            .ok_or_else(|| BackendError::Decode(format!("{}: short RGB row", path.display())))?;
        rgb.extend_from_slice(pixels);
    }
    RgbImage::from_raw(width, height, rgb)
        .map(DynamicImage::ImageRgb8)
        .ok_or_else(|| BackendError::Decode("decoded HEIC buffer has the wrong size".into()))
}

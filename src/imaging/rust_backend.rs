//! Pure Rust decode, libwebp encode.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP) | `image` crate (pure Rust decoders) |
//! | Decode (AVIF) | `avif-parse` (container) + `rav1d` (AV1 decode), see [`avif`](super::avif) |
//! | Decode (HEIC) | `libheif-rs`, only with the `heic` feature |
//! | Orientation | `ImageDecoder::orientation` + `DynamicImage::apply_orientation` |
//! | Alpha flattening | per-pixel blend onto the configured [`Background`] |
//! | Resize | `image::imageops::resize` with `Lanczos3` filter |
//! | Encode → WebP | `webp::Encoder::encode_simple` (lossy) |
//!
//! The `image` crate's own WebP encoder only writes lossless files, which
//! defeats the point of a size ladder, so encoding goes through `webp`.

use super::avif;
#[cfg(feature = "heic")]
use super::heic;
use super::backend::{BackendError, Dimensions, ImageBackend, Probe, SourceImage, SourceKind};
use super::params::{Background, EncodeParams};
use image::imageops::FilterType;
use image::metadata::Orientation;
use image::{
    ColorType, DynamicImage, ImageDecoder, ImageError, ImageFormat, ImageReader, Rgb, RgbImage,
};
use std::path::Path;
use std::sync::LazyLock;

/// Extensions whose decoders are compiled in.
const DECODER_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    let mut exts: Vec<&'static str> = DECODER_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect();
    // decoded by the rav1d path, not the image crate
    exts.push("avif");
    #[cfg(feature = "heic")]
    exts.extend_from_slice(heic::EXTENSIONS);
    exts
});

/// Lowercase extensions of every source format the backend can decode.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// Production backend built on the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
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

fn decode_error(path: &Path, err: ImageError) -> BackendError {
    BackendError::Decode(format!("{}: {err}", path.display()))
}

/// Open a decoder, sniffing the format from the content first and the
/// extension second.
fn open_decoder(
    path: &Path,
) -> Result<(impl ImageDecoder, Option<ImageFormat>), BackendError> {
    let reader = ImageReader::open(path)?.with_guessed_format()?;
    let format = reader.format();
    let decoder = reader.into_decoder().map_err(|e| decode_error(path, e))?;
    Ok((decoder, format))
}

fn source_kind(format: Option<ImageFormat>, color: ColorType) -> SourceKind {
    if format == Some(ImageFormat::Png) || color.has_alpha() {
        SourceKind::Graphic
    } else {
        SourceKind::Photographic
    }
}

/// Unreadable or malformed orientation metadata counts as upright.
fn read_orientation(decoder: &mut impl ImageDecoder) -> Orientation {
    decoder.orientation().unwrap_or(Orientation::NoTransforms)
}

fn exif_tag(orientation: Orientation) -> u8 {
    match orientation {
        Orientation::NoTransforms => 1,
        Orientation::FlipHorizontal => 2,
        Orientation::Rotate180 => 3,
        Orientation::FlipVertical => 4,
        Orientation::Rotate90FlipH => 5,
        Orientation::Rotate90 => 6,
        Orientation::Rotate270FlipH => 7,
        Orientation::Rotate270 => 8,
    }
}

/// Dimensions after the orientation transform: tags 5–8 swap the axes.
fn upright(width: u32, height: u32, tag: u8) -> Dimensions {
    if (5..=8).contains(&tag) {
        Dimensions {
            width: height,
            height: width,
        }
    } else {
        Dimensions { width, height }
    }
}

/// Composite onto an opaque background: `out = a·c + (1 − a)·bg`.
fn flatten(img: DynamicImage, background: Background) -> RgbImage {
    if !img.color().has_alpha() {
        return img.into_rgb8();
    }
    let rgba = img.into_rgba8();
    let Background(bg) = background;
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let px = rgba.get_pixel(x, y).0;
        let alpha = px[3] as u32;
        let blend = |channel: usize| {
            ((px[channel] as u32 * alpha + bg[channel] as u32 * (255 - alpha) + 127) / 255) as u8
        };
        Rgb([blend(0), blend(1), blend(2)])
    })
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Probe, BackendError> {
        #[cfg(feature = "heic")]
        if heic::is_heic(path) {
            return Ok(Probe {
                dimensions: heic::identify(path)?,
                orientation: 1,
                kind: SourceKind::Photographic,
            });
        }
        if avif::is_avif(path) {
            return Ok(Probe {
                dimensions: avif::identify(path)?,
                orientation: 1,
                kind: SourceKind::Photographic,
            });
        }

        let (mut decoder, format) = open_decoder(path)?;
        let (width, height) = decoder.dimensions();
        let kind = source_kind(format, decoder.color_type());
        let tag = exif_tag(read_orientation(&mut decoder));
        Ok(Probe {
            dimensions: upright(width, height, tag),
            orientation: tag,
            kind,
        })
    }

    fn load(&self, path: &Path, background: Background) -> Result<SourceImage, BackendError> {
        #[cfg(feature = "heic")]
        if heic::is_heic(path) {
            return Ok(SourceImage {
                pixels: heic::decode(path)?.into_rgb8(),
                kind: SourceKind::Photographic,
            });
        }
        if avif::is_avif(path) {
            return Ok(SourceImage {
                pixels: flatten(avif::decode(path)?, background),
                kind: SourceKind::Photographic,
            });
        }

        let (mut decoder, format) = open_decoder(path)?;
        let kind = source_kind(format, decoder.color_type());
        let orientation = read_orientation(&mut decoder);
        let mut img = DynamicImage::from_decoder(decoder).map_err(|e| decode_error(path, e))?;
        img.apply_orientation(orientation);
        Ok(SourceImage {
            pixels: flatten(img, background),
            kind,
        })
    }

    fn encode(&self, image: &SourceImage, params: &EncodeParams) -> Result<Vec<u8>, BackendError> {
        let resized;
        let pixels = if image.dimensions().as_tuple() == (params.width, params.height) {
            &image.pixels
        } else {
            resized = image::imageops::resize(
                &image.pixels,
                params.width,
                params.height,
                FilterType::Lanczos3,
            );
            &resized
        };

        let encoded = webp::Encoder::from_rgb(pixels.as_raw(), pixels.width(), pixels.height())
            .encode_simple(false, params.quality.value() as f32)
            .map_err(|e| {
                BackendError::Encode(format!(
                    "WebP {}x{} failed: {e:?}",
                    params.width, params.height
                ))
            })?;
        Ok(encoded.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::params::Quality;
    use crate::test_helpers::*;

    fn encode_params(width: u32, height: u32) -> EncodeParams {
        EncodeParams {
            width,
            height,
            quality: Quality::new(85),
        }
    }

    #[test]
    fn supported_extensions_match_decodable_formats() {
        let exts = supported_input_extensions();
        for expected in &["jpg", "jpeg", "png", "tif", "tiff", "webp", "avif"] {
            assert!(
                exts.contains(expected),
                "expected {expected} in supported extensions"
            );
        }
    }

    #[test]
    fn heic_is_discoverable_only_with_its_decoder() {
        let exts = supported_input_extensions();
        assert_eq!(exts.contains(&"heic"), cfg!(feature = "heic"));
        assert_eq!(exts.contains(&"heif"), cfg!(feature = "heic"));
    }

    #[test]
    fn identify_synthetic_jpeg() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("test.jpg");
        write_jpeg(&path, 200, 150);

        let probe = RustBackend::new().identify(&path).unwrap();
        assert_eq!(probe.dimensions.as_tuple(), (200, 150));
        assert_eq!(probe.orientation, 1);
        assert_eq!(probe.kind, SourceKind::Photographic);
    }

    #[test]
    fn identify_reports_upright_dimensions() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("rotated.jpg");
        write_jpeg_with_orientation(&path, 30, 40, 6);

        let probe = RustBackend::new().identify(&path).unwrap();
        assert_eq!(probe.orientation, 6);
        assert_eq!(probe.dimensions.as_tuple(), (40, 30));
    }

    #[test]
    fn identify_png_with_alpha_is_graphic() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("icon.png");
        write_png_with_alpha(&path, 20, 20);

        let probe = RustBackend::new().identify(&path).unwrap();
        assert_eq!(probe.kind, SourceKind::Graphic);
    }

    #[test]
    fn identify_nonexistent_file_is_io_error() {
        let result = RustBackend::new().identify(Path::new("/nonexistent/image.jpg"));
        assert!(matches!(result, Err(BackendError::Io(_))));
    }

    #[test]
    fn identify_garbage_is_decode_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("broken.jpg");
        std::fs::write(&path, b"not an image at all").unwrap();

        let result = RustBackend::new().identify(&path);
        assert!(matches!(result, Err(BackendError::Decode(_))));
    }

    #[test]
    fn load_applies_orientation_once() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("rotated.jpg");
        write_jpeg_with_orientation(&path, 30, 40, 6);

        let image = RustBackend::new()
            .load(&path, Background::white())
            .unwrap();
        assert_eq!(image.dimensions().as_tuple(), (40, 30));
    }

    #[test]
    fn load_moves_stored_corner_per_orientation() {
        // stored 64x32 with the marker at stored (0, 0); where it must land
        let cases: [(u16, (u32, u32), (u32, u32)); 8] = [
            (1, (64, 32), (0, 0)),
            (2, (64, 32), (63, 0)),
            (3, (64, 32), (63, 31)),
            (4, (64, 32), (0, 31)),
            (5, (32, 64), (0, 0)),
            (6, (32, 64), (31, 0)),
            (7, (32, 64), (31, 63)),
            (8, (32, 64), (0, 63)),
        ];
        let tmp = tempfile::TempDir::new().unwrap();
        let backend = RustBackend::new();

        for (tag, dims, corner) in cases {
            let path = tmp.path().join(format!("marked-{tag}.jpg"));
            write_marked_jpeg(&path, 64, 32, tag);
            let image = backend.load(&path, Background::white()).unwrap();
            let pixels = &image.pixels;

            assert_eq!(image.dimensions().as_tuple(), dims, "tag {tag}");
            assert!(
                is_marker(pixels.get_pixel(corner.0, corner.1).0),
                "tag {tag}: marker not at {corner:?}"
            );
            let marked_corners = [
                (0, 0),
                (dims.0 - 1, 0),
                (0, dims.1 - 1),
                (dims.0 - 1, dims.1 - 1),
            ]
            .into_iter()
            .filter(|&(x, y)| is_marker(pixels.get_pixel(x, y).0))
            .count();
            assert_eq!(marked_corners, 1, "tag {tag}");
        }
    }

    #[test]
    fn load_flattens_alpha_onto_background() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("icon.png");
        write_png_with_alpha(&path, 20, 20);

        let image = RustBackend::new()
            .load(&path, Background::white())
            .unwrap();
        assert_eq!(image.kind, SourceKind::Graphic);
        // transparent corner becomes the background, opaque center keeps its color
        assert_eq!(image.pixels.get_pixel(0, 0).0, [255, 255, 255]);
        assert_eq!(image.pixels.get_pixel(10, 10).0, [255, 0, 0]);

        let black = RustBackend::new()
            .load(&path, Background([0, 0, 0]))
            .unwrap();
        assert_eq!(black.pixels.get_pixel(0, 0).0, [0, 0, 0]);
    }

    #[test]
    fn flatten_blends_partial_alpha() {
        let img = DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
            1,
            1,
            image::Rgba([0, 0, 0, 128]),
        ));
        let flat = flatten(img, Background::white());
        // 255 * 127 / 255 = 127
        assert_eq!(flat.get_pixel(0, 0).0, [127, 127, 127]);
    }

    #[test]
    fn encode_resizes_to_requested_dimensions() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("test.jpg");
        write_jpeg(&path, 200, 150);

        let backend = RustBackend::new();
        let image = backend.load(&path, Background::white()).unwrap();
        let bytes = backend.encode(&image, &encode_params(64, 48)).unwrap();

        assert_eq!(&bytes[..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WEBP");
        let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::WebP).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 48));
        assert!(!decoded.color().has_alpha());
    }

    #[test]
    fn encode_native_size_keeps_dimensions() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("small.jpg");
        write_jpeg(&path, 20, 10);

        let backend = RustBackend::new();
        let image = backend.load(&path, Background::white()).unwrap();
        let bytes = backend.encode(&image, &encode_params(20, 10)).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (20, 10));
    }

    #[test]
    fn lower_quality_produces_smaller_files() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("test.jpg");
        write_jpeg(&path, 256, 256);

        let backend = RustBackend::new();
        let image = backend.load(&path, Background::white()).unwrap();
        let low = backend
            .encode(
                &image,
                &EncodeParams {
                    quality: Quality::new(10),
                    ..encode_params(256, 256)
                },
            )
            .unwrap();
        let high = backend
            .encode(
                &image,
                &EncodeParams {
                    quality: Quality::new(95),
                    ..encode_params(256, 256)
                },
            )
            .unwrap();
        assert!(low.len() < high.len());
    }

    #[test]
    fn upright_swaps_axes_for_transposing_tags() {
        assert_eq!(upright(30, 40, 1).as_tuple(), (30, 40));
        assert_eq!(upright(30, 40, 3).as_tuple(), (30, 40));
        for tag in 5..=8 {
            assert_eq!(upright(30, 40, tag).as_tuple(), (40, 30));
        }
    }
}

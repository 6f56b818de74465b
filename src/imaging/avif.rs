//! AVIF (HEIF-family) still image decoding.
//!
//! The `image` crate can only *encode* AVIF without the C `dav1d` library, so
//! sources are decoded here: `avif-parse` pulls the primary AV1 item out of
//! the HEIF container and `rav1d` (the Rust port of dav1d) decodes it. The
//! YUV planes are converted to 8-bit RGB with BT.601 coefficients.
//!
//! Container-level rotation (`irot`/`imir`) is not read; AVIF sources are
//! treated as already upright.

use super::backend::{BackendError, Dimensions};
use image::{DynamicImage, RgbImage};
use rav1d::include::dav1d::headers::{
    DAV1D_PIXEL_LAYOUT_I400, DAV1D_PIXEL_LAYOUT_I420, DAV1D_PIXEL_LAYOUT_I422,
    DAV1D_PIXEL_LAYOUT_I444,
};
use rav1d::include::dav1d::picture::Dav1dPicture;
use std::path::Path;
use std::ptr::NonNull;

pub(crate) fn is_avif(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("avif"))
}

fn parse_container(path: &Path) -> Result<avif_parse::AvifData, BackendError> {
    let file_data = std::fs::read(path)?;
    avif_parse::read_avif(&mut std::io::Cursor::new(&file_data)).map_err(|e| {
        BackendError::Decode(format!("invalid AVIF container {}: {e:?}", path.display()))
    })
}

/// Read dimensions from the container metadata (no AV1 decode).
pub(crate) fn identify(path: &Path) -> Result<Dimensions, BackendError> {
    let avif = parse_container(path)?;
    let meta = avif.primary_item_metadata().map_err(|e| {
        BackendError::Decode(format!("unreadable AVIF metadata {}: {e:?}", path.display()))
    })?;
    Ok(Dimensions {
        width: meta.max_frame_width.get(),
        height: meta.max_frame_height.get(),
    })
}

/// Decode the primary image item to RGB.
pub(crate) fn decode(path: &Path) -> Result<DynamicImage, BackendError> {
    use rav1d::include::dav1d::data::Dav1dData;
    use rav1d::include::dav1d::dav1d::Dav1dSettings;
    use rav1d::src::lib as dav1d;

    let avif = parse_container(path)?;
    let av1_bytes: &[u8] = &avif.primary_item;

    let mut settings = std::mem::MaybeUninit::<Dav1dSettings>::uninit();
    let settings_ptr = NonNull::new(settings.as_mut_ptr())
        .ok_or_else(|| BackendError::Decode("rav1d settings allocation failed".into()))?;
    unsafe { dav1d::dav1d_default_settings(settings_ptr) };
    let mut settings = unsafe { settings.assume_init() };
    settings.n_threads = 1;
    settings.max_frame_delay = 1;

    let mut ctx = None;
    let rc = unsafe { dav1d::dav1d_open(NonNull::new(&mut ctx), NonNull::new(&mut settings)) };
    if rc.0 != 0 {
        return Err(BackendError::Decode(format!("rav1d open failed ({})", rc.0)));
    }

    // Everything between open and close runs in one closure so the context
    // is closed on every exit path.
    let decoded = (|| {
        let mut data = Dav1dData::default();
        let buf = unsafe { dav1d::dav1d_data_create(NonNull::new(&mut data), av1_bytes.len()) };
        if buf.is_null() {
            return Err(BackendError::Decode("rav1d data_create failed".into()));
        }
        unsafe { std::ptr::copy_nonoverlapping(av1_bytes.as_ptr(), buf, av1_bytes.len()) };

        let rc = unsafe { dav1d::dav1d_send_data(ctx, NonNull::new(&mut data)) };
        if rc.0 != 0 {
            unsafe { dav1d::dav1d_data_unref(NonNull::new(&mut data)) };
            return Err(BackendError::Decode(format!(
                "rav1d send_data failed ({})",
                rc.0
            )));
        }

        let mut pic: Dav1dPicture = unsafe { std::mem::zeroed() };
        let rc = unsafe { dav1d::dav1d_get_picture(ctx, NonNull::new(&mut pic)) };
        if rc.0 != 0 {
            return Err(BackendError::Decode(format!(
                "rav1d get_picture failed ({})",
                rc.0
            )));
        }

        let rgb = picture_to_rgb(&pic);
        unsafe { dav1d::dav1d_picture_unref(NonNull::new(&mut pic)) };
        rgb
    })();

    unsafe { dav1d::dav1d_close(NonNull::new(&mut ctx)) };

    let (width, height, rgb) = decoded?;
    RgbImage::from_raw(width, height, rgb)
        .map(DynamicImage::ImageRgb8)
        .ok_or_else(|| BackendError::Decode("decoded AVIF buffer has the wrong size".into()))
}

/// One decoded plane: base pointer plus row stride in bytes.
#[derive(Clone, Copy)]
struct Plane {
    ptr: *const u8,
    stride: isize,
}

impl Plane {
    /// Sample at (x, y), widening 10/12-bit storage (u16) to f32.
    #[inline]
    fn sample(self, x: u32, y: u32, bpc: u32) -> f32 {
        if bpc <= 8 {
            (unsafe { *self.ptr.offset(y as isize * self.stride + x as isize) }) as f32
        } else {
            let offset = y as isize * self.stride + x as isize * 2;
            (unsafe { *(self.ptr.offset(offset) as *const u16) }) as f32
        }
    }
}

fn plane(pic: &Dav1dPicture, index: usize, stride: isize) -> Result<Plane, BackendError> {
    let ptr = pic.data[index]
        .ok_or_else(|| BackendError::Decode(format!("AVIF plane {index} is missing")))?;
    Ok(Plane {
        ptr: ptr.as_ptr() as *const u8,
        stride,
    })
}

fn picture_to_rgb(pic: &Dav1dPicture) -> Result<(u32, u32, Vec<u8>), BackendError> {
    let width = pic.p.w as u32;
    let height = pic.p.h as u32;
    let bpc = pic.p.bpc as u32;
    let luma = plane(pic, 0, pic.stride[0])?;

    let max_val = ((1u32 << bpc) - 1) as f32;
    let center = (1u32 << (bpc - 1)) as f32;
    let scale = 255.0 / max_val;
    let to_u8 = |v: f32| (v * scale).clamp(0.0, 255.0) as u8;

    let mut rgb = Vec::with_capacity((width * height * 3) as usize);

    if pic.p.layout == DAV1D_PIXEL_LAYOUT_I400 {
        for y in 0..height {
            for x in 0..width {
                let v = to_u8(luma.sample(x, y, bpc));
                rgb.extend_from_slice(&[v, v, v]);
            }
        }
        return Ok((width, height, rgb));
    }

    // Chroma subsampling: horizontal, vertical
    let (ss_x, ss_y) = match pic.p.layout {
        DAV1D_PIXEL_LAYOUT_I420 => (true, true),
        DAV1D_PIXEL_LAYOUT_I422 => (true, false),
        DAV1D_PIXEL_LAYOUT_I444 => (false, false),
        other => {
            return Err(BackendError::Decode(format!(
                "unsupported AVIF pixel layout: {other}"
            )));
        }
    };
    let cb_plane = plane(pic, 1, pic.stride[1])?;
    let cr_plane = plane(pic, 2, pic.stride[1])?;

    for y in 0..height {
        let cy = if ss_y { y / 2 } else { y };
        for x in 0..width {
            let cx = if ss_x { x / 2 } else { x };
            let luma_v = luma.sample(x, y, bpc);
            let cb = cb_plane.sample(cx, cy, bpc) - center;
            let cr = cr_plane.sample(cx, cy, bpc) - center;

            rgb.push(to_u8(luma_v + 1.402 * cr));
            rgb.push(to_u8(luma_v - 0.344136 * cb - 0.714136 * cr));
            rgb.push(to_u8(luma_v + 1.772 * cb));
        }
    }

    Ok((width, height, rgb))
}

//! `<picture>` rendering for resolved descriptors.
//!
//! Produces the fragment a markup-patching client splices into a document:
//!
//! ```html
//! <picture>
//!   <source srcset="responsive_images/thumb/cat.webp 300w, ..." sizes="..." type="image/webp">
//!   <img src="images/cat.jpg" alt="A cat" loading="lazy" decoding="async">
//! </picture>
//! ```
//!
//! The `<img>` keeps pointing at the original source file so clients that
//! support neither `srcset` nor WebP still get an image. Rendering goes
//! through Maud, so every attribute value is escaped.

use crate::resolve::{SourceSetDescriptor, resolve_named};
use crate::tier::TierLadder;
use maud::{Markup, html};
use std::path::Path;

/// Default `sizes` attribute: full width on phones, half on tablets, a third
/// on desktops.
pub const DEFAULT_SIZES: &str = "(max-width: 640px) 100vw, (max-width: 1024px) 50vw, 33vw";

/// Default URL prefix prepended to every candidate path.
pub const DEFAULT_URL_PREFIX: &str = "responsive_images/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PictureOptions {
    pub sizes: String,
    pub url_prefix: String,
    /// Emit `loading="lazy"` and `decoding="async"` on the fallback `<img>`.
    pub lazy: bool,
}

impl Default for PictureOptions {
    fn default() -> Self {
        Self {
            sizes: DEFAULT_SIZES.to_string(),
            url_prefix: DEFAULT_URL_PREFIX.to_string(),
            lazy: true,
        }
    }
}

fn picture(
    descriptor: &SourceSetDescriptor,
    fallback_src: &str,
    alt: &str,
    options: &PictureOptions,
) -> Markup {
    let srcset = descriptor.to_srcset(&options.url_prefix);
    html! {
        picture {
            source srcset=(srcset) sizes=(options.sizes) type="image/webp";
            @if options.lazy {
                img src=(fallback_src) alt=(alt) loading="lazy" decoding="async";
            } @else {
                img src=(fallback_src) alt=(alt);
            }
        }
    }
}

/// Render a `<picture>` element for an already resolved descriptor.
pub fn render_picture(
    descriptor: &SourceSetDescriptor,
    fallback_src: &str,
    alt: &str,
    options: &PictureOptions,
) -> String {
    picture(descriptor, fallback_src, alt, options).into_string()
}

/// Resolve `name` (base name or source path) against storage and render it.
///
/// `None` when no derivative exists; the caller should leave its original
/// `<img>` untouched.
pub fn render_picture_for(
    name: &str,
    output_root: &Path,
    ladder: &TierLadder,
    fallback_src: &str,
    alt: &str,
    options: &PictureOptions,
) -> Option<String> {
    let descriptor = resolve_named(name, output_root, ladder)?;
    Some(render_picture(&descriptor, fallback_src, alt, options))
}

//! # srcset-ladder
//!
//! Responsive image derivatives for content sites. Every source photo becomes
//! a fixed ladder of WebP files, and every `<img>` that references it can be
//! upgraded to a `<picture>` whose `srcset` is complete even when some tiers
//! were never generated.
//!
//! # Architecture: Two Independent Halves
//!
//! ```text
//! Generate   photos/beach.jpg  →  responsive_images/{tier}/beach.webp
//! Resolve    "beach"           →  srcset with one candidate per tier
//! ```
//!
//! The two halves share nothing but the storage layout. The generator writes
//! files; the resolver probes for them. There is no manifest to drift out of
//! sync: a file existing at `{tier}/{base}.webp` is the record.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`tier`] | The five named tiers, their widths, and derivative paths |
//! | [`imaging`] | Decode, orient, flatten, resize, and WebP-encode behind a backend trait |
//! | [`generate`] | Per-image tier generation and the parallel batch driver |
//! | [`resolve`] | Availability probing and fallback substitution into a srcset descriptor |
//! | [`markup`] | `<picture>` rendering for a resolved descriptor using Maud |
//! | [`scan`] | Source discovery and the inventory of derivatives on storage |
//! | [`config`] | `config.toml` loading layered over stock defaults |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Never Upscale, Never Rewrite
//!
//! A tier wider than its source is skipped rather than enlarged. The two
//! exceptions are `thumb` and `full`, which always exist so the resolver has
//! a smallest and a largest candidate to fall back on. Derivatives that are
//! already on storage are never re-encoded, which makes re-running the
//! generator over a growing photo set cheap.
//!
//! ## Declared Width Is the Slot Width
//!
//! When a tier is missing the resolver serves a neighbor, but the `w`
//! descriptor stays the missing tier's own width. Browsers then pick the same
//! slot they would have picked with a complete ladder and get the closest
//! file that exists.
//!
//! ## Upright and Opaque
//!
//! EXIF orientation is baked into the pixels and alpha is composited onto a
//! background color, so every derivative renders identically whether or not
//! the client honors metadata or transparency.

pub mod config;
pub mod generate;
pub mod imaging;
pub mod markup;
pub mod output;
pub mod resolve;
pub mod scan;
pub mod tier;

#[cfg(test)]
pub(crate) mod test_helpers;

//! The size tier ladder shared by the generator and the resolver.
//!
//! Five named tiers, ordered by ascending declared width:
//!
//! | Tier | Declared width |
//! |------|----------------|
//! | `thumb` | 300 |
//! | `small` | 640 |
//! | `medium` | 1024 |
//! | `large` | 1920 |
//! | `full` | 2560 |
//!
//! The widths must match existing derivative sets exactly, so the canonical
//! table is not user-configurable. [`TierLadder::with_widths`] exists for
//! embedding the pipeline at a different scale (tests use it to keep
//! fixtures small).
//!
//! ## Storage layout
//!
//! ```text
//! {output_root}/
//! ├── thumb/beach.webp
//! ├── small/beach.webp
//! ├── medium/beach.webp
//! ├── large/beach.webp
//! └── full/beach.webp
//! ```
//!
//! There is no manifest: a file existing at `{tier}/{base}.webp` *is* the
//! record that the tier was generated.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// File extension of every derivative.
pub const DERIVATIVE_EXTENSION: &str = "webp";

/// One named size variant.
///
/// Variant order is ascending width, so the derived `Ord` is the canonical
/// tier order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SizeTier {
    Thumb,
    Small,
    Medium,
    Large,
    Full,
}

impl SizeTier {
    /// All tiers, smallest first.
    pub const ALL: [SizeTier; 5] = [
        SizeTier::Thumb,
        SizeTier::Small,
        SizeTier::Medium,
        SizeTier::Large,
        SizeTier::Full,
    ];

    /// Directory name under the output root.
    pub fn name(self) -> &'static str {
        match self {
            SizeTier::Thumb => "thumb",
            SizeTier::Small => "small",
            SizeTier::Medium => "medium",
            SizeTier::Large => "large",
            SizeTier::Full => "full",
        }
    }

    /// Width from the canonical tier table.
    pub fn canonical_width(self) -> u32 {
        match self {
            SizeTier::Thumb => 300,
            SizeTier::Small => 640,
            SizeTier::Medium => 1024,
            SizeTier::Large => 1920,
            SizeTier::Full => 2560,
        }
    }

    /// Position in [`SizeTier::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for SizeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown size tier '{0}' (expected thumb, small, medium, large or full)")]
pub struct UnknownTier(pub String);

impl FromStr for SizeTier {
    type Err = UnknownTier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SizeTier::ALL
            .into_iter()
            .find(|tier| tier.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownTier(s.to_string()))
    }
}

/// A tier paired with the width it targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Tier {
    pub kind: SizeTier,
    pub width: u32,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LadderError {
    #[error("tier widths must be non-zero")]
    ZeroWidth,
    #[error("tier widths must be strictly ascending, got {0:?}")]
    NotAscending([u32; 5]),
}

/// The ordered, immutable tier configuration.
///
/// One value is built at startup and handed to both the generator and the
/// resolver; nothing else holds tier widths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierLadder {
    tiers: [Tier; 5],
}

impl TierLadder {
    /// The canonical 300/640/1024/1920/2560 ladder.
    pub fn canonical() -> Self {
        Self {
            tiers: SizeTier::ALL.map(|kind| Tier {
                kind,
                width: kind.canonical_width(),
            }),
        }
    }

    /// A ladder with custom target widths, smallest tier first.
    pub fn with_widths(widths: [u32; 5]) -> Result<Self, LadderError> {
        if widths.contains(&0) {
            return Err(LadderError::ZeroWidth);
        }
        if widths.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(LadderError::NotAscending(widths));
        }
        let mut tiers = Self::canonical().tiers;
        for (tier, width) in tiers.iter_mut().zip(widths) {
            tier.width = width;
        }
        Ok(Self { tiers })
    }

    /// Tiers in ascending order.
    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    pub fn width(&self, kind: SizeTier) -> u32 {
        self.tiers[kind.index()].width
    }
}

impl Default for TierLadder {
    fn default() -> Self {
        Self::canonical()
    }
}

/// Storage path of a derivative relative to the output root, always
/// `/`-separated so it can go straight into markup.
pub fn asset_relative_path(tier: SizeTier, base_name: &str) -> String {
    format!("{}/{}.{}", tier.name(), base_name, DERIVATIVE_EXTENSION)
}

/// Filesystem path of a derivative.
pub fn asset_path(output_root: &Path, tier: SizeTier, base_name: &str) -> PathBuf {
    output_root
        .join(tier.name())
        .join(format!("{}.{}", base_name, DERIVATIVE_EXTENSION))
}

/// Extension-stripped file name of a source image.
///
/// Returns `None` for paths without a UTF-8 file stem.
pub fn base_name(path: &Path) -> Option<&str> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
}

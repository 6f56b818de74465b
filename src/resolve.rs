//! Descriptor Resolver.
//!
//! Given an image's base name, looks at which tiers physically exist under
//! the output root and builds a complete, width-annotated candidate list:
//! exactly one entry per ladder tier, every entry pointing at a file that
//! exists.
//!
//! The resolver never creates or deletes assets and keeps no state; storage
//! is probed fresh on every call, so it works against partial or hand-grown
//! derivative sets as well as freshly generated ones.
//!
//! ## Substitution
//!
//! A missing tier is served by, in order of preference:
//!
//! 1. the nearest smaller tier that exists;
//! 2. `full`, if present;
//! 3. the smallest tier that exists.
//!
//! The declared width always stays the slot's own width. It is a hint for
//! slot selection, not a statement about the served file's pixels.
//!
//! ```text
//! on storage: thumb, small          resolved for "cat":
//!                                   thumb/cat.webp 300w
//!                                   small/cat.webp 640w
//!                                   small/cat.webp 1024w
//!                                   small/cat.webp 1920w
//!                                   small/cat.webp 2560w
//! ```

use crate::imaging::supported_input_extensions;
use crate::tier::{SizeTier, TierLadder, asset_path, asset_relative_path, base_name};
use serde::{Serialize, Serializer};
use std::fmt;
use std::path::Path;

/// Which tiers exist on storage for one base name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AvailabilitySet {
    present: [bool; SizeTier::ALL.len()],
}

impl AvailabilitySet {
    /// Check storage now. Nothing is cached between calls.
    pub fn probe(output_root: &Path, base_name: &str, ladder: &TierLadder) -> Self {
        let mut set = Self::default();
        for tier in ladder.tiers() {
            set.present[tier.kind.index()] =
                asset_path(output_root, tier.kind, base_name).is_file();
        }
        set
    }

    pub fn from_present(tiers: &[SizeTier]) -> Self {
        let mut set = Self::default();
        for tier in tiers {
            set.present[tier.index()] = true;
        }
        set
    }

    pub fn contains(&self, tier: SizeTier) -> bool {
        self.present[tier.index()]
    }

    pub fn is_empty(&self) -> bool {
        !self.present.contains(&true)
    }

    /// Present tiers, smallest first.
    pub fn tiers(&self) -> impl Iterator<Item = SizeTier> + '_ {
        SizeTier::ALL.into_iter().filter(|&t| self.contains(t))
    }

    pub fn smallest(&self) -> Option<SizeTier> {
        self.tiers().next()
    }
}

impl Serialize for AvailabilitySet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.tiers())
    }
}

/// The tier whose asset serves `tier`'s slot, or `None` if nothing exists.
pub fn substitute_for(tier: SizeTier, availability: &AvailabilitySet) -> Option<SizeTier> {
    if availability.contains(tier) {
        return Some(tier);
    }
    SizeTier::ALL[..tier.index()]
        .iter()
        .rev()
        .copied()
        .find(|&smaller| availability.contains(smaller))
        .or_else(|| {
            availability
                .contains(SizeTier::Full)
                .then_some(SizeTier::Full)
        })
        .or_else(|| availability.smallest())
}

/// One `"{path} {width}w"` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceCandidate {
    /// Slot this entry declares.
    pub tier: SizeTier,
    /// Tier whose file is actually referenced.
    pub served: SizeTier,
    /// Path relative to the output root, `/`-separated.
    pub path: String,
    /// Declared width: always the slot tier's width.
    pub width: u32,
}

impl SourceCandidate {
    pub fn is_substitute(&self) -> bool {
        self.tier != self.served
    }
}

/// Resolved candidate list for one image, ascending by tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceSetDescriptor {
    pub base_name: String,
    pub candidates: Vec<SourceCandidate>,
}

impl SourceSetDescriptor {
    /// Render as a `srcset` value with each path prefixed by `url_prefix`
    /// (e.g. `responsive_images/`). A missing trailing `/` is added.
    pub fn to_srcset(&self, url_prefix: &str) -> String {
        let prefix = match url_prefix {
            "" => String::new(),
            p if p.ends_with('/') => p.to_string(),
            p => format!("{p}/"),
        };
        self.candidates
            .iter()
            .map(|c| format!("{}{} {}w", prefix, c.path, c.width))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn substitutions(&self) -> usize {
        self.candidates.iter().filter(|c| c.is_substitute()).count()
    }
}

impl fmt::Display for SourceSetDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_srcset(""))
    }
}

/// Build the descriptor from a known availability. `None` when nothing exists.
pub fn resolve_from_availability(
    base_name: &str,
    availability: &AvailabilitySet,
    ladder: &TierLadder,
) -> Option<SourceSetDescriptor> {
    let candidates = ladder
        .tiers()
        .iter()
        .map(|slot| {
            substitute_for(slot.kind, availability).map(|served| SourceCandidate {
                tier: slot.kind,
                served,
                path: asset_relative_path(served, base_name),
                width: slot.width,
            })
        })
        .collect::<Option<Vec<_>>>()?;

    Some(SourceSetDescriptor {
        base_name: base_name.to_string(),
        candidates,
    })
}

/// Probe storage and build the descriptor for `base_name`.
///
/// `None` means no derivatives exist yet: leave the original reference alone.
pub fn resolve_source_set(
    base_name: &str,
    output_root: &Path,
    ladder: &TierLadder,
) -> Option<SourceSetDescriptor> {
    let availability = AvailabilitySet::probe(output_root, base_name, ladder);
    resolve_from_availability(base_name, &availability, ladder)
}

/// Resolve a user-supplied name: either a base name or a source file path.
///
/// The literal name always wins, so a base name with dots (`beach.v2`) is
/// never cut down to a shorter one. Only when nothing exists for it and it
/// ends in a decodable source extension (`photos/cat.jpg`) is the stem tried.
pub fn resolve_named(
    name: &str,
    output_root: &Path,
    ladder: &TierLadder,
) -> Option<SourceSetDescriptor> {
    resolve_source_set(name, output_root, ladder).or_else(|| {
        let path = Path::new(name);
        let is_source_path = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .is_some_and(|ext| supported_input_extensions().contains(&ext.as_str()));
        let stem = base_name(path).filter(|_| is_source_path)?;
        resolve_source_set(stem, output_root, ladder)
    })
}

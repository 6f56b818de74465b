//! Pure calculation functions for tier dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

use crate::tier::{SizeTier, TierLadder};

/// One tier the generator should materialize for a given source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierPlan {
    pub tier: SizeTier,
    /// Output width.
    pub width: u32,
    /// Output height.
    pub height: u32,
    /// `false` when the tier stores the source at native resolution.
    pub resample: bool,
}

/// Scale `(width, height)` so the width becomes `target_width`.
///
/// Height is rounded to the nearest pixel and never drops below 1.
///
/// # Examples
/// ```
/// # use srcset_ladder::imaging::scale_to_width;
/// assert_eq!(scale_to_width((4000, 3000), 300), (300, 225));
/// assert_eq!(scale_to_width((3000, 2000), 1024), (1024, 683));
/// ```
pub fn scale_to_width(native: (u32, u32), target_width: u32) -> (u32, u32) {
    let (w, h) = native;
    let height = (h as f64 * target_width as f64 / w as f64).round() as u32;
    (target_width, height.max(1))
}

/// Decide which tiers exist for a source of the given upright dimensions.
///
/// Walking the ladder smallest first:
/// - a tier whose target is below the native width is resampled to it;
/// - a middle tier whose target is at or above the native width is skipped
///   (never upscale);
/// - the smallest and the largest tier are always kept, storing the native
///   resolution when the source is not wider than their target.
///
/// A source with zero width or height yields no plans.
pub fn plan_tiers(native: (u32, u32), ladder: &TierLadder) -> Vec<TierPlan> {
    let (native_w, native_h) = native;
    if native_w == 0 || native_h == 0 {
        return Vec::new();
    }

    let tiers = ladder.tiers();
    let last = tiers.len() - 1;

    tiers
        .iter()
        .enumerate()
        .filter_map(|(i, tier)| {
            if native_w > tier.width {
                let (width, height) = scale_to_width(native, tier.width);
                Some(TierPlan {
                    tier: tier.kind,
                    width,
                    height,
                    resample: true,
                })
            } else if i == 0 || i == last {
                Some(TierPlan {
                    tier: tier.kind,
                    width: native_w,
                    height: native_h,
                    resample: false,
                })
            } else {
                None
            }
        })
        .collect()
}

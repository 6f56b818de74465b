//! Derivative Generator.
//!
//! Takes one source image and materializes its tier ladder under the output
//! root. Runs per image in three steps:
//!
//! 1. **Probe**: read upright dimensions (orientation applied to the header
//!    values), orientation tag and [`SourceKind`](crate::imaging::SourceKind)
//!    without decoding pixels.
//! 2. **Plan**: [`plan_tiers`](crate::imaging::plan_tiers) decides which tiers
//!    exist for that width. Planned tiers whose file is already on storage are
//!    reported as [`TierStatus::Existing`] and never rewritten.
//! 3. **Encode**: only if something is left to write, the source is decoded
//!    once (orientation applied, alpha flattened) and each pending tier is
//!    resampled, encoded and written atomically.
//!
//! A failed tier is recorded as [`TierStatus::Failed`] and the remaining tiers
//! still run. A source that cannot be decoded fails as a whole with
//! [`GenerateError::Decode`].
//!
//! ## Batches
//!
//! [`generate_batch`] runs one task per source on the rayon pool. Failures
//! are collected into the [`BatchReport`]; they never stop sibling images.
//! Progress is streamed as [`GenerateEvent`]s over an optional channel so the
//! CLI can print while work continues.

use crate::imaging::{
    BackendError, Background, ImageBackend, Probe, QualityPolicy, create_tier, plan_source,
};
use crate::tier::{SizeTier, TierLadder, asset_path, base_name};
use rayon::prelude::*;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("Cannot decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: BackendError,
    },
    #[error("Cannot write {tier} tier of {path}: {source}")]
    Encode {
        path: PathBuf,
        tier: SizeTier,
        #[source]
        source: BackendError,
    },
    #[error("Source has no usable base name: {0}")]
    InvalidName(PathBuf),
    #[error("{path} maps to base name '{base}', already taken by {first}")]
    DuplicateName {
        path: PathBuf,
        base: String,
        first: PathBuf,
    },
}

/// Encode settings shared by every image in a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerateOptions {
    pub quality: QualityPolicy,
    pub background: Background,
}

/// One derivative written during this call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivativeAsset {
    pub base_name: String,
    pub tier: SizeTier,
    pub width: u32,
    pub height: u32,
    pub path: PathBuf,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TierStatus {
    /// Encoded and written by this call.
    Encoded(DerivativeAsset),
    /// Already on storage; left untouched.
    Existing(PathBuf),
    /// Source is not wider than the tier target.
    Skipped,
    /// Encode or write failed; the reason is the rendered error.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierOutcome {
    pub tier: SizeTier,
    pub status: TierStatus,
}

/// Result of generating one source: one outcome per ladder tier, ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub source: PathBuf,
    pub base_name: String,
    pub probe: Probe,
    pub tiers: Vec<TierOutcome>,
}

impl GeneratedImage {
    /// Derivatives written by this call.
    pub fn assets(&self) -> impl Iterator<Item = &DerivativeAsset> {
        self.tiers.iter().filter_map(|outcome| match &outcome.status {
            TierStatus::Encoded(asset) => Some(asset),
            _ => None,
        })
    }

    pub fn has_failures(&self) -> bool {
        self.tiers
            .iter()
            .any(|outcome| matches!(outcome.status, TierStatus::Failed(_)))
    }

    pub fn status(&self, tier: SizeTier) -> Option<&TierStatus> {
        self.tiers
            .iter()
            .find(|outcome| outcome.tier == tier)
            .map(|outcome| &outcome.status)
    }
}

/// Materialize the tier ladder for one source.
pub fn generate(
    backend: &impl ImageBackend,
    source: &Path,
    output_root: &Path,
    ladder: &TierLadder,
    options: &GenerateOptions,
) -> Result<GeneratedImage, GenerateError> {
    let base = base_name(source)
        .ok_or_else(|| GenerateError::InvalidName(source.to_path_buf()))?
        .to_string();
    let decode_error = |source_err: BackendError| GenerateError::Decode {
        path: source.to_path_buf(),
        source: source_err,
    };

    let (probe, plans) = plan_source(backend, source, ladder).map_err(decode_error)?;
    if plans.is_empty() {
        return Err(decode_error(BackendError::Decode(
            "image has no pixels".to_string(),
        )));
    }

    let mut tiers: Vec<TierOutcome> = ladder
        .tiers()
        .iter()
        .map(|t| TierOutcome {
            tier: t.kind,
            status: TierStatus::Skipped,
        })
        .collect();

    let mut pending = Vec::new();
    for plan in plans {
        let dest = asset_path(output_root, plan.tier, &base);
        if dest.is_file() {
            tiers[plan.tier.index()].status = TierStatus::Existing(dest);
        } else {
            pending.push((plan, dest));
        }
    }

    if !pending.is_empty() {
        let image = backend
            .load(source, options.background)
            .map_err(decode_error)?;
        let quality = options.quality.for_kind(image.kind);

        for (plan, dest) in pending {
            let status = match create_tier(backend, &image, &plan, quality, &dest) {
                Ok(size_bytes) => TierStatus::Encoded(DerivativeAsset {
                    base_name: base.clone(),
                    tier: plan.tier,
                    width: plan.width,
                    height: plan.height,
                    path: dest,
                    size_bytes,
                }),
                Err(err) => TierStatus::Failed(
                    GenerateError::Encode {
                        path: source.to_path_buf(),
                        tier: plan.tier,
                        source: err,
                    }
                    .to_string(),
                ),
            };
            tiers[plan.tier.index()].status = status;
        }
    }

    Ok(GeneratedImage {
        source: source.to_path_buf(),
        base_name: base,
        probe,
        tiers,
    })
}

// ============================================================================
// Batch processing
// ============================================================================

/// Progress events emitted by [`generate_batch`].
#[derive(Debug, Clone)]
pub enum GenerateEvent {
    BatchStarted {
        image_count: usize,
    },
    ImageGenerated {
        /// 1-based position in the input list.
        index: usize,
        image: GeneratedImage,
    },
    ImageFailed {
        index: usize,
        source_path: PathBuf,
        error: String,
    },
}

/// Tier counters across a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TierStats {
    pub encoded: u32,
    pub existing: u32,
    pub skipped: u32,
    pub failed: u32,
}

impl TierStats {
    pub fn record(&mut self, status: &TierStatus) {
        match status {
            TierStatus::Encoded(_) => self.encoded += 1,
            TierStatus::Existing(_) => self.existing += 1,
            TierStatus::Skipped => self.skipped += 1,
            TierStatus::Failed(_) => self.failed += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.encoded + self.existing + self.skipped + self.failed
    }
}

impl fmt::Display for TierStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} encoded, {} existing, {} skipped",
            self.encoded, self.existing, self.skipped
        )?;
        if self.failed > 0 {
            write!(f, ", {} failed", self.failed)?;
        }
        write!(f, " ({} tiers)", self.total())
    }
}

#[derive(Debug)]
pub struct BatchFailure {
    pub source: PathBuf,
    pub error: GenerateError,
}

/// Outcome of a whole batch, in input order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub images: Vec<GeneratedImage>,
    pub failures: Vec<BatchFailure>,
    pub stats: TierStats,
}

impl BatchReport {
    /// True when any image failed outright or any tier failed to write.
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty() || self.stats.failed > 0
    }
}

/// Generate every source on the rayon pool.
///
/// Sources sharing a base name would overwrite each other's derivatives, so
/// only the first one in input order is generated; later ones fail with
/// [`GenerateError::DuplicateName`].
pub fn generate_batch(
    backend: &impl ImageBackend,
    sources: &[PathBuf],
    output_root: &Path,
    ladder: &TierLadder,
    options: &GenerateOptions,
    events: Option<Sender<GenerateEvent>>,
) -> BatchReport {
    let emit = |event: GenerateEvent| {
        if let Some(tx) = &events {
            // receiver gone means nobody is printing; keep working
            let _ = tx.send(event);
        }
    };
    emit(GenerateEvent::BatchStarted {
        image_count: sources.len(),
    });

    let mut outcomes: Vec<(usize, &PathBuf, Result<GeneratedImage, GenerateError>)> = Vec::new();
    let mut jobs = Vec::new();
    let mut claimed: HashMap<&str, &PathBuf> = HashMap::new();
    for (i, source) in sources.iter().enumerate() {
        let index = i + 1;
        match base_name(source) {
            Some(base) => match claimed.get(base) {
                Some(first) => {
                    let error = GenerateError::DuplicateName {
                        path: source.clone(),
                        base: base.to_string(),
                        first: (*first).clone(),
                    };
                    emit(GenerateEvent::ImageFailed {
                        index,
                        source_path: source.clone(),
                        error: error.to_string(),
                    });
                    outcomes.push((index, source, Err(error)));
                }
                None => {
                    claimed.insert(base, source);
                    jobs.push((index, source));
                }
            },
            // let generate() report the bad name
            None => jobs.push((index, source)),
        }
    }

    let generated: Vec<_> = jobs
        .par_iter()
        .map(|&(index, source)| {
            let result = generate(backend, source, output_root, ladder, options);
            match &result {
                Ok(image) => emit(GenerateEvent::ImageGenerated {
                    index,
                    image: image.clone(),
                }),
                Err(e) => emit(GenerateEvent::ImageFailed {
                    index,
                    source_path: source.clone(),
                    error: e.to_string(),
                }),
            }
            (index, source, result)
        })
        .collect();

    outcomes.extend(generated);
    outcomes.sort_by_key(|(index, _, _)| *index);

    let mut report = BatchReport::default();
    for (_, source, result) in outcomes {
        match result {
            Ok(image) => {
                for outcome in &image.tiers {
                    report.stats.record(&outcome.status);
                }
                report.images.push(image);
            }
            Err(error) => report.failures.push(BatchFailure {
                source: source.clone(),
                error,
            }),
        }
    }
    report
}

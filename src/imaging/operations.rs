//! High-level image operations.
//!
//! These functions combine calculations with backend execution and the
//! filesystem. The generator decides *which* tiers to touch; this module
//! knows how to probe a source, encode one tier and land it on storage.

use super::backend::{BackendError, ImageBackend, Probe, SourceImage, SourceKind};
use super::calculations::{TierPlan, plan_tiers};
use super::params::{EncodeParams, Quality};
use crate::tier::TierLadder;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Encode quality per source kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityPolicy {
    pub photographic: Quality,
    pub graphic: Quality,
}

impl QualityPolicy {
    pub fn for_kind(&self, kind: SourceKind) -> Quality {
        match kind {
            SourceKind::Photographic => self.photographic,
            SourceKind::Graphic => self.graphic,
        }
    }
}

impl Default for QualityPolicy {
    fn default() -> Self {
        Self {
            photographic: Quality::new(85),
            graphic: Quality::new(90),
        }
    }
}

/// Probe a source and plan its tiers without decoding pixels.
pub fn plan_source(
    backend: &impl ImageBackend,
    source: &Path,
    ladder: &TierLadder,
) -> Result<(Probe, Vec<TierPlan>)> {
    let probe = backend.identify(source)?;
    let plans = plan_tiers(probe.dimensions.as_tuple(), ladder);
    Ok((probe, plans))
}

/// Encode one tier and write it to `dest`. Returns the encoded size in bytes.
pub fn create_tier(
    backend: &impl ImageBackend,
    image: &SourceImage,
    plan: &TierPlan,
    quality: Quality,
    dest: &Path,
) -> Result<u64> {
    let bytes = backend.encode(
        image,
        &EncodeParams {
            width: plan.width,
            height: plan.height,
            quality,
        },
    )?;
    write_atomic(dest, &bytes)?;
    Ok(bytes.len() as u64)
}

/// Sibling path a derivative is staged at before the rename.
pub fn staging_path(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(".tmp");
    dest.with_file_name(name)
}

/// Write `bytes` to a sibling temp file and rename it over `dest`.
///
/// Readers never observe a half-written derivative: the destination either
/// does not exist or is complete. Parent directories are created as needed.
pub fn write_atomic(dest: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let staging = staging_path(dest);
    let written = std::fs::write(&staging, bytes).and_then(|_| std::fs::rename(&staging, dest));
    if written.is_err() {
        let _ = std::fs::remove_file(&staging);
    }
    written
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::imaging::params::Background;
    use crate::tier::SizeTier;

    #[test]
    fn plan_source_only_identifies() {
        let backend = MockBackend::new().with_source("/beach.jpg", 4000, 3000);

        let (probe, plans) =
            plan_source(&backend, Path::new("/beach.jpg"), &TierLadder::canonical()).unwrap();

        assert_eq!(probe.dimensions.as_tuple(), (4000, 3000));
        assert_eq!(plans.len(), 5);
        assert_eq!(
            backend.get_operations(),
            vec![RecordedOp::Identify("/beach.jpg".to_string())]
        );
    }

    #[test]
    fn plan_source_propagates_decode_errors() {
        let backend = MockBackend::new();
        let result = plan_source(&backend, Path::new("/missing.jpg"), &TierLadder::canonical());
        assert!(matches!(result, Err(BackendError::Decode(_))));
    }

    #[test]
    fn create_tier_writes_encoded_bytes() {
        let tmp = tempfile::TempDir::new().unwrap();
        let backend = MockBackend::new().with_source("/a.jpg", 800, 600);
        let image = backend.load(Path::new("/a.jpg"), Background::white()).unwrap();
        let plan = TierPlan {
            tier: SizeTier::Thumb,
            width: 300,
            height: 225,
            resample: true,
        };
        let dest = tmp.path().join("thumb/a.webp");

        let size = create_tier(&backend, &image, &plan, Quality::new(85), &dest).unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"webp:300x225");
        assert_eq!(size, 12);
        assert!(!staging_path(&dest).exists());
        assert!(backend.get_operations().contains(&RecordedOp::Encode {
            width: 300,
            height: 225,
            quality: 85
        }));
    }

    #[test]
    fn create_tier_failure_leaves_no_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let backend = MockBackend::new()
            .with_source("/a.jpg", 800, 600)
            .failing_at(300);
        let image = backend.load(Path::new("/a.jpg"), Background::white()).unwrap();
        let plan = TierPlan {
            tier: SizeTier::Thumb,
            width: 300,
            height: 225,
            resample: true,
        };
        let dest = tmp.path().join("thumb/a.webp");

        let result = create_tier(&backend, &image, &plan, Quality::new(85), &dest);

        assert!(matches!(result, Err(BackendError::Encode(_))));
        assert!(!dest.exists());
    }

    #[test]
    fn write_atomic_creates_parents_and_replaces() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dest = tmp.path().join("deep/nested/x.webp");

        write_atomic(&dest, b"one").unwrap();
        write_atomic(&dest, b"two").unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"two");
        let leftovers: Vec<_> = std::fs::read_dir(dest.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![OsString::from("x.webp")]);
    }

    #[test]
    fn staging_path_is_a_sibling() {
        assert_eq!(
            staging_path(Path::new("/out/full/cat.webp")),
            Path::new("/out/full/cat.webp.tmp")
        );
    }

    #[test]
    fn quality_policy_defaults() {
        let policy = QualityPolicy::default();
        assert_eq!(policy.for_kind(SourceKind::Photographic).value(), 85);
        assert_eq!(policy.for_kind(SourceKind::Graphic).value(), 90);
    }
}

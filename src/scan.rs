//! Filesystem discovery: source images to generate, derivatives on storage.
//!
//! ## Sources
//!
//! [`discover_sources`] walks a directory (optionally recursively) and
//! returns every file whose extension the imaging backend can decode:
//!
//! ```text
//! photos/
//! ├── beach.jpg                  ✓
//! ├── icon.PNG                   ✓ (extensions are case-insensitive)
//! ├── notes.txt                  ✗ not an image
//! ├── .drafts/                   ✗ hidden directories are skipped
//! ├── responsive_images/         ✗ the output root is never scanned
//! └── 2024/
//!     └── harbor.avif            ✓ only with --recursive
//! ```
//!
//! ## Inventory
//!
//! [`inventory`] lists every base name with at least one derivative under the
//! output root, together with the tiers that exist for it.

use crate::imaging::supported_input_extensions;
use crate::resolve::AvailabilitySet;
use crate::tier::{DERIVATIVE_EXTENSION, TierLadder};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cannot walk directory: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// True when the extension belongs to a decodable source format.
pub fn is_supported_source(path: &Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .is_some_and(|ext| supported_input_extensions().contains(&ext.as_str()))
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.')
}

/// Find source images under `dir`, sorted and deduplicated.
///
/// `output_root` is pruned from the walk when it lives inside `dir`, so
/// generated WebP files are never mistaken for sources.
pub fn discover_sources(
    dir: &Path,
    recursive: bool,
    output_root: &Path,
) -> Result<Vec<PathBuf>, ScanError> {
    if !dir.is_dir() {
        return Err(ScanError::NotADirectory(dir.to_path_buf()));
    }
    let skip = output_root.canonicalize().ok();
    let is_output_root = |entry: &DirEntry| {
        entry.file_type().is_dir()
            && skip
                .as_deref()
                .is_some_and(|root| entry.path().canonicalize().ok().as_deref() == Some(root))
    };

    let walker = WalkDir::new(dir)
        .follow_links(true)
        .max_depth(if recursive { usize::MAX } else { 1 })
        .into_iter()
        .filter_entry(|e| !is_hidden(e) && !is_output_root(e));

    let mut sources = Vec::new();
    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_file() && is_supported_source(entry.path()) {
            sources.push(entry.into_path());
        }
    }
    sources.sort();
    sources.dedup();
    Ok(sources)
}

/// One image known to storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryEntry {
    pub base_name: String,
    pub tiers: AvailabilitySet,
}

/// Every base name with at least one derivative, sorted by name.
///
/// A missing output root is an empty inventory, not an error.
pub fn inventory(output_root: &Path, ladder: &TierLadder) -> Result<Vec<InventoryEntry>, ScanError> {
    let mut names = BTreeSet::new();
    for tier in ladder.tiers() {
        let tier_dir = output_root.join(tier.kind.name());
        if !tier_dir.is_dir() {
            continue;
        }
        for entry in fs::read_dir(&tier_dir)? {
            let path = entry?.path();
            let is_derivative = path.is_file()
                && path
                    .extension()
                    .is_some_and(|e| e == DERIVATIVE_EXTENSION);
            if let Some(stem) = path.file_stem().filter(|_| is_derivative) {
                names.insert(stem.to_string_lossy().into_owned());
            }
        }
    }

    Ok(names
        .into_iter()
        .map(|base_name| InventoryEntry {
            tiers: AvailabilitySet::probe(output_root, &base_name, ladder),
            base_name,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::touch_tiers;
    use crate::tier::SizeTier;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    fn setup_sources() -> TempDir {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(&root.join("beach.jpg"));
        touch(&root.join("icon.PNG"));
        touch(&root.join("notes.txt"));
        touch(&root.join("2024/harbor.avif"));
        touch(&root.join(".drafts/secret.jpg"));
        touch(&root.join("responsive_images/thumb/beach.webp"));
        tmp
    }

    fn names(paths: &[PathBuf], root: &Path) -> Vec<String> {
        paths
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn flat_discovery_ignores_subdirectories() {
        let tmp = setup_sources();
        let found = discover_sources(
            tmp.path(),
            false,
            &tmp.path().join("responsive_images"),
        )
        .unwrap();
        assert_eq!(names(&found, tmp.path()), vec!["beach.jpg", "icon.PNG"]);
    }

    #[test]
    fn recursive_discovery_skips_hidden_and_output() {
        let tmp = setup_sources();
        let found = discover_sources(
            tmp.path(),
            true,
            &tmp.path().join("responsive_images"),
        )
        .unwrap();
        assert_eq!(
            names(&found, tmp.path()),
            vec!["2024/harbor.avif", "beach.jpg", "icon.PNG"]
        );
    }

    #[test]
    fn output_elsewhere_is_not_pruned_by_name() {
        let tmp = setup_sources();
        let found =
            discover_sources(tmp.path(), true, Path::new("/nonexistent/output")).unwrap();
        assert!(
            names(&found, tmp.path()).contains(&"responsive_images/thumb/beach.webp".to_string())
        );
    }

    #[test]
    fn missing_directory_is_an_error() {
        let result = discover_sources(Path::new("/nonexistent/photos"), false, Path::new("out"));
        assert!(matches!(result, Err(ScanError::NotADirectory(_))));
    }

    #[test]
    fn supported_source_check_is_case_insensitive() {
        assert!(is_supported_source(Path::new("a.JPEG")));
        assert!(is_supported_source(Path::new("a.tif")));
        assert!(!is_supported_source(Path::new("a.gif")));
        assert!(!is_supported_source(Path::new("README")));
        assert_eq!(
            is_supported_source(Path::new("IMG_0001.HEIC")),
            cfg!(feature = "heic")
        );
    }

    #[test]
    fn inventory_lists_every_base_name() {
        let tmp = TempDir::new().unwrap();
        touch_tiers(tmp.path(), "cat", &[SizeTier::Thumb, SizeTier::Small]);
        touch_tiers(tmp.path(), "beach", &[SizeTier::Full]);
        touch(&tmp.path().join("thumb/README.txt"));
        // the resolver only probes the lowercase extension
        touch(&tmp.path().join("thumb/Dog.WEBP"));

        let entries = inventory(tmp.path(), &TierLadder::canonical()).unwrap();

        let listed: Vec<(&str, Vec<SizeTier>)> = entries
            .iter()
            .map(|e| (e.base_name.as_str(), e.tiers.tiers().collect()))
            .collect();
        assert_eq!(
            listed,
            vec![
                ("beach", vec![SizeTier::Full]),
                ("cat", vec![SizeTier::Thumb, SizeTier::Small]),
            ]
        );
    }

    #[test]
    fn inventory_of_missing_root_is_empty() {
        let entries = inventory(Path::new("/nonexistent/out"), &TierLadder::canonical()).unwrap();
        assert!(entries.is_empty());
    }
}

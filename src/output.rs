//! CLI output formatting.
//!
//! Every `format_*` function is pure and returns display lines, so output can
//! be asserted in tests without capturing stdout. The `print_*` wrappers are
//! what the binary calls.
//!
//! # Output Format
//!
//! ## Generate
//!
//! ```text
//! Generating 2 images
//! 001 beach (4000x3000, EXIF orientation 6)
//!     Source: photos/beach.jpg
//!     thumb: 300x225 encoded (14.2 KB)
//!     small: 640x480 encoded (48.9 KB)
//!     medium: existing
//!     large: 1920x1440 encoded (402.1 KB)
//!     full: 2560x1920 encoded (655.0 KB)
//! 002 notes.jpg
//!     Error: Cannot decode photos/notes.jpg: ...
//!
//! Tiers: 4 encoded, 1 existing, 0 skipped (5 tiers)
//! Images: 1 generated, 1 failed
//! ```
//!
//! ## Srcset
//!
//! ```text
//! cat
//!     300w thumb/cat.webp
//!     640w small/cat.webp
//!     1024w small/cat.webp (substitute for medium)
//! ```
//!
//! ## Status
//!
//! ```text
//! thumb small medium large full
//!   ✓     ✓     ·      ·    ·    cat
//! ```

use crate::generate::{BatchReport, GenerateEvent, GeneratedImage, TierStatus};
use crate::resolve::SourceSetDescriptor;
use crate::scan::InventoryEntry;
use crate::tier::SizeTier;
use std::path::Path;

/// `001 name`: positional index and identity.
fn image_line(index: usize, name: &str) -> String {
    format!("{:03} {}", index, name)
}

fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Human-readable byte count: `812 B`, `14.2 KB`, `1.3 MB`.
pub fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    let b = bytes as f64;
    if b >= MB {
        format!("{:.1} MB", b / MB)
    } else if b >= KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{} B", bytes)
    }
}

fn tier_status_line(tier: SizeTier, status: &TierStatus) -> String {
    let detail = match status {
        TierStatus::Encoded(asset) => format!(
            "{}x{} encoded ({})",
            asset.width,
            asset.height,
            format_bytes(asset.size_bytes)
        ),
        TierStatus::Existing(_) => "existing".to_string(),
        TierStatus::Skipped => "skipped".to_string(),
        TierStatus::Failed(reason) => format!("failed: {}", reason),
    };
    format!("{}{}: {}", indent(1), tier, detail)
}

fn format_generated_image(index: usize, image: &GeneratedImage) -> Vec<String> {
    let (width, height) = image.probe.dimensions.as_tuple();
    let header = if image.probe.orientation > 1 {
        format!(
            "{} ({}x{}, EXIF orientation {})",
            image_line(index, &image.base_name),
            width,
            height,
            image.probe.orientation
        )
    } else {
        format!("{} ({}x{})", image_line(index, &image.base_name), width, height)
    };

    let mut lines = vec![
        header,
        format!("{}Source: {}", indent(1), image.source.display()),
    ];
    lines.extend(
        image
            .tiers
            .iter()
            .map(|outcome| tier_status_line(outcome.tier, &outcome.status)),
    );
    lines
}

/// Format a single generation progress event as display lines.
pub fn format_generate_event(event: &GenerateEvent) -> Vec<String> {
    match event {
        GenerateEvent::BatchStarted { image_count } => {
            let noun = if *image_count == 1 { "image" } else { "images" };
            vec![format!("Generating {} {}", image_count, noun)]
        }
        GenerateEvent::ImageGenerated { index, image } => format_generated_image(*index, image),
        GenerateEvent::ImageFailed {
            index,
            source_path,
            error,
        } => {
            let name = source_path
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_else(|| source_path.display().to_string());
            vec![
                image_line(*index, &name),
                format!("{}Error: {}", indent(1), error),
            ]
        }
    }
}

/// Closing summary for a batch.
pub fn format_batch_summary(report: &BatchReport) -> Vec<String> {
    let mut lines = vec![
        String::new(),
        format!("Tiers: {}", report.stats),
        format!(
            "Images: {} generated, {} failed",
            report.images.len(),
            report.failures.len()
        ),
    ];
    for failure in &report.failures {
        lines.push(format!("{}{}", indent(1), failure.error));
    }
    lines
}

/// Resolved candidate list, one entry per line.
pub fn format_descriptor(descriptor: &SourceSetDescriptor) -> Vec<String> {
    let mut lines = vec![descriptor.base_name.clone()];
    for candidate in &descriptor.candidates {
        let mut line = format!("{}{}w {}", indent(1), candidate.width, candidate.path);
        if candidate.is_substitute() {
            line.push_str(&format!(" (substitute for {})", candidate.tier));
        }
        lines.push(line);
    }
    lines
}

/// Tier presence table for every image on storage.
pub fn format_inventory(entries: &[InventoryEntry], output_root: &Path) -> Vec<String> {
    if entries.is_empty() {
        return vec![format!("No derivatives under {}", output_root.display())];
    }

    let header: Vec<&str> = SizeTier::ALL.iter().map(|t| t.name()).collect();
    let mut lines = vec![header.join(" ")];
    for entry in entries {
        let cells: Vec<String> = SizeTier::ALL
            .iter()
            .map(|&tier| {
                let mark = if entry.tiers.contains(tier) { "✓" } else { "·" };
                format!("{:^width$}", mark, width = tier.name().len())
            })
            .collect();
        lines.push(format!("{}  {}", cells.join(" "), entry.base_name));
    }
    lines.push(String::new());
    lines.push(format!(
        "{} images under {}",
        entries.len(),
        output_root.display()
    ));
    lines
}

pub fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{}", line);
    }
}

/// Print the closing summary for a batch to stdout.
pub fn print_batch_summary(report: &BatchReport) {
    print_lines(&format_batch_summary(report));
}

pub fn print_descriptor(descriptor: &SourceSetDescriptor) {
    print_lines(&format_descriptor(descriptor));
}

pub fn print_inventory(entries: &[InventoryEntry], output_root: &Path) {
    print_lines(&format_inventory(entries, output_root));
}

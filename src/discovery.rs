//! Image discovery and format sniffing.
//!
//! Enumerates a directory once at run start, reads each file, and
//! sniffs the format from content rather than trusting extensions.
//! Unreadable or unsupported files never reach the pipeline; they are
//! logged and counted as skipped.

use std::path::Path;

use tracing::{debug, warn};

use crate::models::{ImageFormat, ImageUnit};

/// Outcome of a discovery pass over a directory.
#[derive(Debug)]
pub struct Discovered {
    /// Supported images, sorted by path for a stable processing order.
    pub images: Vec<ImageUnit>,
    /// Files excluded before processing (unreadable or unsupported).
    pub skipped: usize,
}

/// Enumerate the images in `dir` (non-recursive).
pub fn discover_images(dir: &Path) -> anyhow::Result<Discovered> {
    let mut entries: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    entries.sort();

    let mut images = Vec::new();
    let mut skipped = 0usize;

    for path in entries {
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Skipping unreadable file {}: {}", path.display(), e);
                skipped += 1;
                continue;
            }
        };

        let format = infer::get(&bytes)
            .map(|kind| kind.mime_type())
            .and_then(ImageFormat::from_mime);
        let Some(format) = format else {
            debug!("Skipping non-image file {}", path.display());
            skipped += 1;
            continue;
        };

        let id = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        images.push(ImageUnit {
            id,
            path,
            bytes,
            format,
        });
    }

    Ok(Discovered { images, skipped })
}

#[cfg(test)]
mod tests {
    use super::*;

    // Minimal but sniffable file headers.
    const PNG_MAGIC: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00];
    const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00];

    #[test]
    fn discovers_supported_images_and_skips_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("passport.png"), PNG_MAGIC).unwrap();
        std::fs::write(dir.path().join("license.jpg"), JPEG_MAGIC).unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"not an image").unwrap();

        let discovered = discover_images(dir.path()).unwrap();
        assert_eq!(discovered.images.len(), 2);
        assert_eq!(discovered.skipped, 1);

        // Sorted by path, id is the filename stem, format is sniffed.
        assert_eq!(discovered.images[0].id, "license");
        assert_eq!(discovered.images[0].format, ImageFormat::Jpeg);
        assert_eq!(discovered.images[1].id, "passport");
        assert_eq!(discovered.images[1].format, ImageFormat::Png);
    }

    #[test]
    fn extension_does_not_override_content() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("mislabeled.png"), JPEG_MAGIC).unwrap();

        let discovered = discover_images(dir.path()).unwrap();
        assert_eq!(discovered.images.len(), 1);
        assert_eq!(discovered.images[0].format, ImageFormat::Jpeg);
    }

    #[test]
    fn empty_directory_discovers_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let discovered = discover_images(dir.path()).unwrap();
        assert!(discovered.images.is_empty());
        assert_eq!(discovered.skipped, 0);
    }
}

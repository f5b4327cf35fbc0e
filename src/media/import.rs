/// Import boundary: files in, photo entities out
///
/// Every imported photo gets a fresh id and default adjustments. Metadata is
/// best-effort: the format comes from the MIME type of the file name and the
/// dimensions from a header probe, both left at their defaults on failure.

use chrono::{DateTime, Utc};
use image::ImageFormat;
use std::path::{Path, PathBuf};
use tokio::task;
use tracing::{info, warn};
use walkdir::WalkDir;

use super::loader::probe_dimensions;
use crate::state::data::{PhotoEntity, PhotoSource};

/// Extensions picked up by a folder import
pub const IMAGE_EXTENSIONS: [&str; 8] = ["jpg", "jpeg", "png", "tif", "tiff", "webp", "bmp", "gif"];

/// One image handed to the import boundary
#[derive(Debug, Clone)]
pub struct ImportSource {
    pub name: String,
    pub source: PhotoSource,
    pub byte_size: u64,
    pub modified: Option<DateTime<Utc>>,
}

impl ImportSource {
    /// Describe a file on disk
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let meta = std::fs::metadata(path)?;
        let name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        Ok(Self {
            name,
            source: PhotoSource::File(path.to_path_buf()),
            byte_size: meta.len(),
            modified: meta.modified().ok().map(DateTime::<Utc>::from),
        })
    }
}

/// Uppercased MIME subtype for a file name, e.g. "photo.jpg" -> "JPEG"
pub fn format_tag(name: &str) -> String {
    ImageFormat::from_path(name)
        .ok()
        .and_then(|format| format.to_mime_type().split('/').nth(1))
        .filter(|subtype| !subtype.is_empty())
        .map(|subtype| subtype.to_uppercase())
        .unwrap_or_else(|| "UNKNOWN".to_string())
}

/// Build the entity for one import source
pub fn build_entity(import: ImportSource) -> PhotoEntity {
    let mut photo = PhotoEntity::new(import.name, import.source);
    photo.metadata.format = format_tag(&photo.name);
    photo.metadata.byte_size = import.byte_size;
    photo.metadata.created_at = import.modified;

    if let Some((width, height)) = probe_dimensions(&photo.source) {
        photo.metadata.width = width;
        photo.metadata.height = height;
    }

    photo
}

/// Recursively collect every supported image under `folder`, sorted by path
pub fn collect_image_files(folder: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(folder)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .map(|ext| ext.to_string_lossy().to_lowercase())
                .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
        })
        .collect();

    files.sort();
    files
}

/// Import files in the given order. Unreadable files are skipped.
pub async fn import_paths(paths: Vec<PathBuf>) -> Vec<PhotoEntity> {
    let requested = paths.len();

    let photos = task::spawn_blocking(move || {
        paths
            .iter()
            .filter_map(|path| match ImportSource::from_path(path) {
                Ok(source) => Some(build_entity(source)),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable file");
                    None
                }
            })
            .collect::<Vec<_>>()
    })
    .await
    .unwrap_or_else(|e| {
        warn!(error = %e, "import task failed");
        Vec::new()
    });

    info!(imported = photos.len(), requested, "import complete");
    photos
}

/// Import every supported image found under `folder`
pub async fn import_folder(folder: PathBuf) -> Vec<PhotoEntity> {
    info!(folder = %folder.display(), "scanning folder");
    let files = task::spawn_blocking(move || collect_image_files(&folder))
        .await
        .unwrap_or_default();
    import_paths(files).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::loader::tests::png_bytes;
    use crate::state::edit::AdjustmentSet;
    use std::sync::Arc;

    #[test]
    fn test_format_tag_from_mime_subtype() {
        assert_eq!(format_tag("holiday.jpg"), "JPEG");
        assert_eq!(format_tag("holiday.JPEG"), "JPEG");
        assert_eq!(format_tag("scan.png"), "PNG");
        assert_eq!(format_tag("scan.tif"), "TIFF");
        assert_eq!(format_tag("notes.txt"), "UNKNOWN");
        assert_eq!(format_tag("no_extension"), "UNKNOWN");
    }

    #[test]
    fn test_build_entity_populates_metadata() {
        let bytes = png_bytes(16, 9, [1, 2, 3, 255]);
        let import = ImportSource {
            name: "frame.png".to_string(),
            byte_size: bytes.len() as u64,
            source: PhotoSource::Memory(Arc::from(bytes)),
            modified: DateTime::from_timestamp(1_600_000_000, 0),
        };

        let photo = build_entity(import);

        assert_eq!(photo.name, "frame.png");
        assert_eq!(photo.metadata.format, "PNG");
        assert_eq!((photo.metadata.width, photo.metadata.height), (16, 9));
        assert!(photo.metadata.byte_size > 0);
        assert_eq!(photo.adjustments, AdjustmentSet::default());
        assert!(!photo.is_selected);
    }

    #[test]
    fn test_undecodable_import_keeps_zero_dimensions() {
        let import = ImportSource {
            name: "broken.jpg".to_string(),
            byte_size: 3,
            source: PhotoSource::Memory(Arc::from(vec![0u8, 1, 2])),
            modified: None,
        };

        let photo = build_entity(import);

        assert_eq!((photo.metadata.width, photo.metadata.height), (0, 0));
        assert_eq!(photo.metadata.format, "JPEG");
    }

    #[test]
    fn test_collect_image_files_filters_and_recurses() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("day2");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join("b.jpg"), b"x").unwrap();
        std::fs::write(dir.path().join("a.PNG"), b"x").unwrap();
        std::fs::write(dir.path().join("readme.txt"), b"x").unwrap();
        std::fs::write(nested.join("c.tiff"), b"x").unwrap();

        let files = collect_image_files(dir.path());

        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, ["a.PNG", "b.jpg", "c.tiff"]);
    }

    #[tokio::test]
    async fn test_import_paths_preserves_order_and_skips_missing() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.png");
        let second = dir.path().join("second.png");
        std::fs::write(&first, png_bytes(4, 4, [0, 0, 0, 255])).unwrap();
        std::fs::write(&second, png_bytes(2, 3, [0, 0, 0, 255])).unwrap();

        let photos = import_paths(vec![
            second.clone(),
            dir.path().join("missing.png"),
            first.clone(),
        ])
        .await;

        let names: Vec<&str> = photos.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["second.png", "first.png"]);
        assert_eq!((photos[0].metadata.width, photos[0].metadata.height), (2, 3));
        assert!(photos[0].metadata.created_at.is_some());
        assert_ne!(photos[0].id, photos[1].id);
    }
}

/// Export of edited photos
/// Re-decodes the source at full resolution, applies the reduced export chain
/// and writes the encoded result next to the other exports.
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Cursor;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task;
use tracing::{info, warn};

use super::filters::export_chain;
use super::raster::apply_chain;
use crate::config::ExportConfig;
use crate::error::{BatchExportError, ExportError};
use crate::media::loader::decode_blocking;
use crate::state::data::PhotoEntity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Jpeg,
    Png,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Jpeg => "jpeg",
            ExportFormat::Png => "png",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ExportFormat::Jpeg => "JPEG",
            ExportFormat::Png => "PNG",
        }
    }
}

/// Where and how to write exports
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    pub format: ExportFormat,
    /// 1-100, JPEG only
    pub quality: u8,
    pub output_dir: PathBuf,
    /// Pause between batch items
    pub batch_delay: Duration,
}

impl ExportOptions {
    pub fn from_config(config: &ExportConfig, output_dir: PathBuf) -> Self {
        Self {
            format: config.format,
            quality: config.jpeg_quality,
            output_dir,
            batch_delay: Duration::from_millis(config.batch_delay_ms),
        }
    }
}

/// `<base>_edited.<ext>`, where the base is the name up to its first dot
pub fn export_file_name(name: &str, format: ExportFormat) -> String {
    let base = name.split('.').next().filter(|base| !base.is_empty()).unwrap_or("photo");
    format!("{}_edited.{}", base, format.extension())
}

/// Full-resolution source with the export chain applied
pub fn render_export(photo: &PhotoEntity) -> Result<RgbaImage, ExportError> {
    let mut pixels = decode_blocking(&photo.source)?;
    apply_chain(&mut pixels, &export_chain(&photo.adjustments));
    Ok(pixels)
}

/// Encode pixels; quality is ignored for lossless formats
pub fn encode(pixels: &RgbaImage, format: ExportFormat, quality: u8) -> Result<Vec<u8>, ExportError> {
    let mut bytes = Vec::new();
    let result = match format {
        ExportFormat::Jpeg => {
            // JPEG carries no alpha channel
            let rgb = DynamicImage::ImageRgba8(pixels.clone()).to_rgb8();
            let encoder = JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100));
            rgb.write_with_encoder(encoder)
        }
        ExportFormat::Png => pixels.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png),
    };

    result.map_err(|source| ExportError::Encode {
        format: format.label(),
        source,
    })?;
    Ok(bytes)
}

/// Blocking export of one photo; returns the written path
pub fn export_photo(photo: &PhotoEntity, options: &ExportOptions) -> Result<PathBuf, ExportError> {
    let pixels = render_export(photo)?;
    let bytes = encode(&pixels, options.format, options.quality)?;

    fs::create_dir_all(&options.output_dir)?;
    let path = options
        .output_dir
        .join(export_file_name(&photo.name, options.format));
    fs::write(&path, bytes)?;

    info!(photo = %photo.name, path = %path.display(), "exported photo");
    Ok(path)
}

/// Export one photo on the blocking pool
pub async fn export_one(photo: PhotoEntity, options: ExportOptions) -> Result<PathBuf, ExportError> {
    task::spawn_blocking(move || export_photo(&photo, &options))
        .await
        .map_err(|e| ExportError::Join(e.to_string()))?
}

/// Export photos one after another, pausing between items.
///
/// Stops at the first failure; the error names the failing item.
pub async fn export_batch(
    photos: Vec<PhotoEntity>,
    options: ExportOptions,
) -> Result<Vec<PathBuf>, BatchExportError> {
    let mut written = Vec::with_capacity(photos.len());

    for (index, photo) in photos.into_iter().enumerate() {
        if index > 0 && !options.batch_delay.is_zero() {
            tokio::time::sleep(options.batch_delay).await;
        }

        let name = photo.name.clone();
        match export_one(photo, options.clone()).await {
            Ok(path) => written.push(path),
            Err(source) => {
                warn!(index, photo = %name, error = %source, "batch export aborted");
                return Err(BatchExportError {
                    index,
                    name,
                    source,
                });
            }
        }
    }

    info!(count = written.len(), "batch export complete");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeError;
    use crate::media::loader::tests::png_bytes;
    use crate::state::data::PhotoSource;
    use std::path::Path;
    use std::sync::Arc;

    fn memory_photo(name: &str, color: [u8; 4]) -> PhotoEntity {
        PhotoEntity::new(
            name.to_string(),
            PhotoSource::Memory(Arc::from(png_bytes(6, 4, color))),
        )
    }

    fn options(dir: &Path, format: ExportFormat) -> ExportOptions {
        ExportOptions {
            format,
            quality: 90,
            output_dir: dir.to_path_buf(),
            batch_delay: Duration::from_millis(1),
        }
    }

    #[test]
    fn test_export_file_name() {
        assert_eq!(export_file_name("beach.jpg", ExportFormat::Jpeg), "beach_edited.jpeg");
        assert_eq!(export_file_name("scan.final.png", ExportFormat::Png), "scan_edited.png");
        assert_eq!(export_file_name("", ExportFormat::Png), "photo_edited.png");
        assert_eq!(export_file_name(".hidden", ExportFormat::Jpeg), "photo_edited.jpeg");
    }

    #[test]
    fn test_render_export_uses_reduced_chain() {
        let mut photo = memory_photo("a.png", [100, 100, 100, 255]);
        photo.adjustments.exposure = 5.0;
        // Ignored by the export chain
        photo.adjustments.highlights = 100.0;

        let pixels = render_export(&photo).unwrap();

        assert_eq!(pixels.dimensions(), (6, 4));
        assert_eq!(pixels.get_pixel(0, 0).0, [105, 105, 105, 255]);
    }

    #[test]
    fn test_export_png_writes_decodable_file() {
        let dir = tempfile::tempdir().unwrap();
        let photo = memory_photo("frame.png", [10, 20, 30, 255]);

        let path = export_photo(&photo, &options(dir.path(), ExportFormat::Png)).unwrap();

        assert_eq!(path.file_name().unwrap(), "frame_edited.png");
        let decoded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(decoded.get_pixel(2, 2).0, [10, 20, 30, 255]);
    }

    #[test]
    fn test_encode_jpeg_drops_alpha() {
        let pixels = RgbaImage::from_pixel(8, 8, image::Rgba([200, 10, 10, 128]));
        let bytes = encode(&pixels, ExportFormat::Jpeg, 80).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
    }

    #[tokio::test]
    async fn test_batch_exports_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let photos = vec![
            memory_photo("one.png", [0, 0, 0, 255]),
            memory_photo("two.png", [255, 255, 255, 255]),
        ];

        let written = export_batch(photos, options(dir.path(), ExportFormat::Jpeg))
            .await
            .unwrap();

        let names: Vec<_> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, ["one_edited.jpeg", "two_edited.jpeg"]);
    }

    #[tokio::test]
    async fn test_batch_aborts_on_first_failure() {
        let dir = tempfile::tempdir().unwrap();
        let broken = PhotoEntity::new(
            "broken.jpg".to_string(),
            PhotoSource::File(dir.path().join("missing.jpg")),
        );
        let photos = vec![
            memory_photo("ok.png", [1, 1, 1, 255]),
            broken,
            memory_photo("never.png", [2, 2, 2, 255]),
        ];

        let err = export_batch(photos, options(dir.path(), ExportFormat::Png))
            .await
            .unwrap_err();

        assert_eq!(err.index, 1);
        assert_eq!(err.name, "broken.jpg");
        assert!(matches!(err.source, ExportError::Decode(DecodeError::NotFound(_))));
        assert!(dir.path().join("ok_edited.png").exists());
        assert!(!dir.path().join("never_edited.png").exists());
    }
}

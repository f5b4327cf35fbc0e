/// Source image loader
///
/// Decodes a photo's source (file or in-memory bytes) into an 8-bit RGBA
/// raster. Decoding is CPU-bound, so the async entry point runs it on
/// tokio's blocking pool.

use image::{ImageReader, RgbaImage};
use std::io::Cursor;
use std::sync::Arc;
use tokio::task;
use tracing::debug;

use crate::error::DecodeError;
use crate::state::data::PhotoSource;

/// Decode a source into RGBA pixels without blocking the caller's executor
pub async fn load_source(source: PhotoSource) -> Result<Arc<RgbaImage>, DecodeError> {
    task::spawn_blocking(move || decode_blocking(&source).map(Arc::new))
        .await
        .map_err(|e| DecodeError::Join(e.to_string()))?
}

/// Blocking implementation of source decoding
pub fn decode_blocking(source: &PhotoSource) -> Result<RgbaImage, DecodeError> {
    let decoded = match source {
        PhotoSource::File(path) => {
            if !path.exists() {
                return Err(DecodeError::NotFound(path.clone()));
            }
            ImageReader::open(path)
                .map_err(|e| DecodeError::Io {
                    path: path.clone(),
                    source: e,
                })?
                .with_guessed_format()
                .map_err(|e| DecodeError::Io {
                    path: path.clone(),
                    source: e,
                })?
                .decode()?
        }
        PhotoSource::Memory(bytes) => image::load_from_memory(bytes)?,
    };

    let rgba = decoded.to_rgba8();
    debug!(width = rgba.width(), height = rgba.height(), "decoded source");
    Ok(rgba)
}

/// Read only the header to learn the pixel dimensions
pub fn probe_dimensions(source: &PhotoSource) -> Option<(u32, u32)> {
    match source {
        PhotoSource::File(path) => ImageReader::open(path)
            .ok()?
            .with_guessed_format()
            .ok()?
            .into_dimensions()
            .ok(),
        PhotoSource::Memory(bytes) => ImageReader::new(Cursor::new(bytes.as_ref()))
            .with_guessed_format()
            .ok()?
            .into_dimensions()
            .ok(),
    }
}

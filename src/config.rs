/// Editor configuration.
///
/// Loaded from `config.toml` in the platform config directory:
/// - Linux: ~/.config/photo-editor/config.toml
/// - macOS: ~/Library/Application Support/photo-editor/config.toml
/// - Windows: %APPDATA%\photo-editor\config.toml
///
/// A missing file yields the defaults below.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::render::cache::DEFAULT_SOURCE_CACHE_SIZE;
use crate::render::export::ExportFormat;
use crate::render::histogram::HISTOGRAM_SAMPLE_SIZE;

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub general: GeneralConfig,
    pub histogram: HistogramConfig,
    pub export: ExportConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Save the session to the SQLite catalog
    pub persist_catalog: bool,
    /// Overrides the default catalog location
    pub catalog_path: Option<PathBuf>,
    /// Changes are written to the catalog at most this often
    pub save_interval_ms: u64,
    /// Decoded photos kept in memory for quick switching
    pub source_cache_size: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            persist_catalog: true,
            catalog_path: None,
            save_interval_ms: 500,
            source_cache_size: DEFAULT_SOURCE_CACHE_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistogramConfig {
    /// Edge length of the square the source is sampled down to
    pub sample_size: u32,
}

impl Default for HistogramConfig {
    fn default() -> Self {
        Self {
            sample_size: HISTOGRAM_SAMPLE_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub format: ExportFormat,
    /// JPEG quality (1-100); ignored for PNG
    pub jpeg_quality: u8,
    /// Pause between items of a batch export
    pub batch_delay_ms: u64,
    /// Destination folder; asked for interactively when unset
    pub output_dir: Option<PathBuf>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            format: ExportFormat::Jpeg,
            jpeg_quality: 90,
            batch_delay_ms: 100,
            output_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is unset
    pub level: String,
    /// "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl EditorConfig {
    /// Load from the default location, falling back to defaults if absent.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: EditorConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        path.push("photo-editor");
        path.push("config.toml");
        path
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.general.source_cache_size == 0 {
            return Err(ConfigError::Validation(
                "general.source_cache_size must be greater than 0".to_string(),
            ));
        }
        if self.histogram.sample_size == 0 {
            return Err(ConfigError::Validation(
                "histogram.sample_size must be greater than 0".to_string(),
            ));
        }
        if !(1..=100).contains(&self.export.jpeg_quality) {
            return Err(ConfigError::Validation(format!(
                "export.jpeg_quality must be within 1..=100, got {}",
                self.export.jpeg_quality
            )));
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(ConfigError::Validation(format!(
                "logging.format must be \"pretty\" or \"json\", got {:?}",
                self.logging.format
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EditorConfig::default();
        assert_eq!(config.histogram.sample_size, 64);
        assert_eq!(config.export.jpeg_quality, 90);
        assert_eq!(config.export.batch_delay_ms, 100);
        assert_eq!(config.export.format, ExportFormat::Jpeg);
        assert!(config.general.persist_catalog);
        assert_eq!(config.general.save_interval_ms, 500);
        assert_eq!(config.general.source_cache_size, 3);
    }

    #[test]
    fn test_rejects_empty_source_cache() {
        let result = EditorConfig::from_toml("[general]\nsource_cache_size = 0\n");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EditorConfig::from_toml(
            r#"
            [export]
            format = "png"
            batch_delay_ms = 250
            "#,
        )
        .unwrap();

        assert_eq!(config.export.format, ExportFormat::Png);
        assert_eq!(config.export.batch_delay_ms, 250);
        assert_eq!(config.export.jpeg_quality, 90);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_rejects_zero_sample_size() {
        let result = EditorConfig::from_toml("[histogram]\nsample_size = 0\n");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_rejects_out_of_range_quality() {
        let result = EditorConfig::from_toml("[export]\njpeg_quality = 0\n");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[logging]\nformat = \"json\"\n").unwrap();

        let config = EditorConfig::load_from(&path).unwrap();
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_toml_round_trip() {
        let config = EditorConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        assert!(text.contains("[export]"));
        assert_eq!(EditorConfig::from_toml(&text).unwrap(), config);
    }
}

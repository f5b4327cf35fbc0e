/// Shared data structures for the application state
///
/// These structs represent the data model that flows between
/// the store, the catalog and the render layer.

use chrono::{DateTime, Utc};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

use super::edit::AdjustmentSet;

/// Opaque photo identifier, stable for the lifetime of the entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PhotoId(Uuid);

impl PhotoId {
    /// A fresh random id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(text: &str) -> Option<Self> {
        Uuid::parse_str(text).ok().map(Self)
    }
}

impl Default for PhotoId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PhotoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Where the encoded image bytes come from
#[derive(Debug, Clone, PartialEq)]
pub enum PhotoSource {
    /// A file on disk
    File(PathBuf),
    /// Encoded bytes already in memory (shared, never copied)
    Memory(Arc<[u8]>),
}

/// Decoded metadata; zeros / "UNKNOWN" until the image has been probed
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoMetadata {
    pub width: u32,
    pub height: u32,
    /// Encoded size in bytes
    pub byte_size: u64,
    /// Uppercased MIME subtype, e.g. "JPEG"
    pub format: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl Default for PhotoMetadata {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            byte_size: 0,
            format: "UNKNOWN".to_string(),
            created_at: None,
        }
    }
}

/// Represents a single photo in the session
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoEntity {
    pub id: PhotoId,
    /// Display name (usually the filename, e.g. "DSC_0001.jpg")
    pub name: String,
    pub source: PhotoSource,
    pub metadata: PhotoMetadata,
    /// Owned adjustments; only changed through `Store::dispatch`
    pub adjustments: AdjustmentSet,
    /// Multi-select flag for batch operations (independent of "current")
    pub is_selected: bool,
}

impl PhotoEntity {
    /// A freshly imported photo with default adjustments
    pub fn new(name: impl Into<String>, source: PhotoSource) -> Self {
        Self {
            id: PhotoId::new(),
            name: name.into(),
            source,
            metadata: PhotoMetadata::default(),
            adjustments: AdjustmentSet::default(),
            is_selected: false,
        }
    }
}

/// A named, ordered set of photo ids. Membership only, no ownership.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    pub id: String,
    pub name: String,
    pub photo_ids: Vec<PhotoId>,
}

/// A named snapshot of adjustments. Applying it replaces a photo's whole set.
#[derive(Debug, Clone, PartialEq)]
pub struct Preset {
    pub id: String,
    pub name: String,
    pub adjustments: AdjustmentSet,
}

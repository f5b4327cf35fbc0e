/// Decoded sources kept for re-rendering
/// Holds a few photos at most, evicting the least recently used, each with the
/// last texture a render fitted to the viewport.
use image::RgbaImage;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

use super::viewport::FittedTexture;
use crate::state::data::PhotoId;

pub const DEFAULT_SOURCE_CACHE_SIZE: usize = 3;

#[derive(Debug, Clone)]
pub struct CachedSource {
    pub source: Arc<RgbaImage>,
    pub texture: Option<FittedTexture>,
}

#[derive(Debug)]
pub struct SourceCache {
    capacity: usize,
    /// Least recently used first
    entries: VecDeque<(PhotoId, CachedSource)>,
}

impl SourceCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, id: PhotoId) -> bool {
        self.entries.iter().any(|(key, _)| *key == id)
    }

    /// Look up a source and mark it most recently used
    pub fn get(&mut self, id: PhotoId) -> Option<&CachedSource> {
        let index = self.entries.iter().position(|(key, _)| *key == id)?;
        let entry = self.entries.remove(index)?;
        self.entries.push_back(entry);
        self.entries.back().map(|(_, cached)| cached)
    }

    /// Add or replace a source; any texture fitted from an older decode is dropped
    pub fn insert(&mut self, id: PhotoId, source: Arc<RgbaImage>) {
        self.entries.retain(|(key, _)| *key != id);
        self.entries.push_back((
            id,
            CachedSource {
                source,
                texture: None,
            },
        ));

        while self.entries.len() > self.capacity {
            if let Some((evicted, _)) = self.entries.pop_front() {
                debug!(%evicted, "evicted decoded source");
            }
        }
    }

    /// Keep the texture a render fitted for `id`; ignored once `id` was evicted
    pub fn store_texture(&mut self, id: PhotoId, texture: FittedTexture) {
        if let Some((_, cached)) = self.entries.iter_mut().find(|(key, _)| *key == id) {
            cached.texture = Some(texture);
        }
    }

    pub fn retain(&mut self, mut keep: impl FnMut(PhotoId) -> bool) {
        self.entries.retain(|(id, _)| keep(*id));
    }
}

impl Default for SourceCache {
    fn default() -> Self {
        Self::new(DEFAULT_SOURCE_CACHE_SIZE)
    }
}

/// The central state container
///
/// All mutation goes through `Store::dispatch` with one of the closed set of
/// `Action`s. Each dispatch builds a new `StoreState` and swaps the shared
/// snapshot; readers holding an older `Arc` keep seeing the old state.

use std::sync::Arc;
use tracing::debug;

use super::data::{Collection, PhotoEntity, PhotoId, Preset};
use super::edit::AdjustmentPatch;

/// Every state transition the editor supports
#[derive(Debug, Clone)]
pub enum Action {
    /// Append photos in input order; the current photo is unchanged
    AddPhotos(Vec<PhotoEntity>),
    /// Make a photo current and the only selected one
    SelectPhoto(PhotoId),
    /// Merge the supplied fields into a photo's adjustments
    UpdateAdjustments { id: PhotoId, patch: AdjustmentPatch },
    RemovePhoto(PhotoId),
    AddCollection(Collection),
    AddPreset(Preset),
    /// Replace a photo's whole adjustment set with the preset's
    ApplyPreset { id: PhotoId, preset: Preset },
    SelectAllPhotos,
    /// Clear every selection flag and the current photo
    DeselectAllPhotos,
    DeleteSelectedPhotos,
}

/// An immutable snapshot of the editor state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreState {
    pub photos: Vec<PhotoEntity>,
    /// Always references an element of `photos` when set
    pub current_photo_id: Option<PhotoId>,
    pub collections: Vec<Collection>,
    pub presets: Vec<Preset>,
}

impl StoreState {
    pub fn photo(&self, id: PhotoId) -> Option<&PhotoEntity> {
        self.photos.iter().find(|photo| photo.id == id)
    }

    pub fn current_photo(&self) -> Option<&PhotoEntity> {
        self.current_photo_id.and_then(|id| self.photo(id))
    }

    pub fn selected_photos(&self) -> impl Iterator<Item = &PhotoEntity> {
        self.photos.iter().filter(|photo| photo.is_selected)
    }

    /// Duplicate ids resolve to the most recently added collection
    pub fn collection(&self, id: &str) -> Option<&Collection> {
        self.collections.iter().rev().find(|c| c.id == id)
    }

    /// Members of a collection that still exist; dangling ids are skipped
    pub fn photos_in_collection<'a>(
        &'a self,
        id: &str,
    ) -> impl Iterator<Item = &'a PhotoEntity> + 'a {
        self.collection(id)
            .into_iter()
            .flat_map(|c| c.photo_ids.iter())
            .filter_map(move |photo_id| self.photo(*photo_id))
    }

    pub fn preset(&self, id: &str) -> Option<&Preset> {
        self.presets.iter().rev().find(|p| p.id == id)
    }
}

/// Apply one action to a state, producing the next state.
///
/// Unknown ids never fail: the affected part of the action is a no-op.
pub fn reduce(state: &StoreState, action: Action) -> StoreState {
    let mut next = state.clone();

    match action {
        Action::AddPhotos(photos) => {
            next.photos.extend(photos);
        }
        Action::SelectPhoto(id) => {
            if state.photo(id).is_none() {
                debug!(%id, "SelectPhoto ignored: unknown photo");
                return next;
            }
            next.current_photo_id = Some(id);
            for photo in &mut next.photos {
                photo.is_selected = photo.id == id;
            }
        }
        Action::UpdateAdjustments { id, patch } => {
            match next.photos.iter_mut().find(|photo| photo.id == id) {
                Some(photo) => photo.adjustments.merge(&patch),
                None => debug!(%id, "UpdateAdjustments ignored: unknown photo"),
            }
        }
        Action::RemovePhoto(id) => {
            next.photos.retain(|photo| photo.id != id);
            if next.current_photo_id == Some(id) {
                next.current_photo_id = None;
            }
        }
        Action::AddCollection(collection) => {
            next.collections.push(collection);
        }
        Action::AddPreset(preset) => {
            next.presets.push(preset);
        }
        Action::ApplyPreset { id, preset } => {
            match next.photos.iter_mut().find(|photo| photo.id == id) {
                Some(photo) => photo.adjustments = preset.adjustments,
                None => debug!(%id, "ApplyPreset ignored: unknown photo"),
            }
        }
        Action::SelectAllPhotos => {
            for photo in &mut next.photos {
                photo.is_selected = true;
            }
        }
        Action::DeselectAllPhotos => {
            for photo in &mut next.photos {
                photo.is_selected = false;
            }
            next.current_photo_id = None;
        }
        Action::DeleteSelectedPhotos => {
            next.photos.retain(|photo| !photo.is_selected);
            if let Some(current) = next.current_photo_id {
                if next.photo(current).is_none() {
                    next.current_photo_id = None;
                }
            }
        }
    }

    next
}

/// Holds the latest snapshot and applies actions to it
#[derive(Debug, Clone, Default)]
pub struct Store {
    state: Arc<StoreState>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a restored snapshot (e.g. loaded from the catalog)
    pub fn with_state(state: StoreState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    /// The latest snapshot
    pub fn state(&self) -> Arc<StoreState> {
        Arc::clone(&self.state)
    }

    /// Apply one action atomically and return the new snapshot
    pub fn dispatch(&mut self, action: Action) -> Arc<StoreState> {
        self.state = Arc::new(reduce(&self.state, action));
        Arc::clone(&self.state)
    }
}

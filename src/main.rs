use iced::widget::{
    button, column, container, horizontal_rule, row, scrollable, slider, text, text_input, Column,
};
use iced::{time, window, Alignment, Element, Length, Size, Subscription, Task, Theme};
use iced_aw::Wrap;
use image::RgbaImage;
use rfd::FileDialog;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

mod config;
mod error;
mod logging;
mod media;
mod render;
mod state;
mod ui;

use config::EditorConfig;
use render::cache::SourceCache;
use render::export::{self, ExportOptions};
use render::filters::build_chain;
use render::histogram::{self, HistogramPlot};
use render::viewport::{self, RenderGeneration, RenderRequest, Rendered, Viewport};
use state::data::{Collection, PhotoEntity, PhotoId, Preset};
use state::edit::{Adjustment, AdjustmentPatch, AdjustmentSet};
use state::library::{Library, PendingSave};
use state::{Action, Store, StoreState};
use ui::canvas::{PointerInput, ShownFrame};
use ui::histogram::HistogramView;

const WINDOW_SIZE: Size = Size::new(1400.0, 900.0);
const LEFT_PANEL_WIDTH: f32 = 220.0;
const RIGHT_PANEL_WIDTH: f32 = 300.0;
const TOOLBAR_HEIGHT: f32 = 48.0;
const FILMSTRIP_HEIGHT: f32 = 120.0;

/// Main application state
struct PhotoEditor {
    config: EditorConfig,
    /// Single source of truth for photos, collections and presets
    store: Store,
    /// The catalog database, when persistence is enabled
    library: Option<Library>,
    /// Catalog writes not yet flushed
    pending_save: PendingSave,
    /// Recently decoded sources, shared with background renders
    sources: SourceCache,
    viewport: Viewport,
    /// Surface size of the viewport in pixels
    viewport_size: (u32, u32),
    generation: RenderGeneration,
    frame: Option<ShownFrame>,
    histogram: Option<HistogramView>,
    /// Adjustments held by "Copy Settings"
    clipboard: Option<AdjustmentSet>,
    /// Filmstrip restricted to one collection
    active_collection: Option<String>,
    preset_name: String,
    collection_name: String,
    /// Status message to display to the user
    status: String,
}

/// Application messages (events)
#[derive(Debug, Clone)]
enum Message {
    ImportFiles,
    ImportFolder,
    ImportComplete(Vec<PhotoEntity>),
    SourceLoaded(PhotoId, Result<Arc<RgbaImage>, String>),
    Rendered(Option<Rendered>),
    HistogramReady(PhotoId, HistogramPlot),
    FlushCatalog,
    CloseRequested(window::Id),

    SelectPhoto(PhotoId),
    ShowCollection(Option<String>),
    SelectAll,
    DeselectAll,
    DeleteSelected,
    RemoveCurrent,

    AdjustmentChanged(Adjustment, f32),
    ResetAdjustments,
    CopySettings,
    PasteSettings,
    PresetNameChanged(String),
    SavePreset,
    ApplyPreset(String),
    CollectionNameChanged(String),
    CreateCollection,

    Pointer(PointerInput),
    ZoomIn,
    ZoomOut,
    Fit,
    ToggleBeforeAfter,
    WindowResized(Size),

    ExportCurrent,
    ExportSelected,
    ExportFinished(Result<Vec<PathBuf>, String>),
}

impl PhotoEditor {
    fn new(config: EditorConfig) -> (Self, Task<Message>) {
        let (library, store) = open_catalog(&config);
        let photo_count = store.state().photos.len();
        info!(photos = photo_count, "photo editor initialized");

        let sources = SourceCache::new(config.general.source_cache_size);
        let mut editor = PhotoEditor {
            config,
            store,
            library,
            pending_save: PendingSave::default(),
            sources,
            viewport: Viewport::default(),
            viewport_size: viewport_size_for(WINDOW_SIZE),
            generation: RenderGeneration::default(),
            frame: None,
            histogram: None,
            clipboard: None,
            active_collection: None,
            preset_name: String::new(),
            collection_name: String::new(),
            status: format!("Ready. {} photos in catalog.", photo_count),
        };

        let task = editor.refresh(true);
        (editor, task)
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::ImportFiles => {
                let files = FileDialog::new()
                    .set_title("Import Photos")
                    .add_filter("Images", &media::import::IMAGE_EXTENSIONS)
                    .pick_files();

                match files {
                    Some(paths) => {
                        self.status = format!("Importing {} files...", paths.len());
                        Task::perform(media::import::import_paths(paths), Message::ImportComplete)
                    }
                    None => Task::none(),
                }
            }
            Message::ImportFolder => {
                let folder = FileDialog::new()
                    .set_title("Select Folder with Photos")
                    .pick_folder();

                match folder {
                    Some(folder) => {
                        self.status = format!("Importing from {}...", folder.display());
                        Task::perform(media::import::import_folder(folder), Message::ImportComplete)
                    }
                    None => Task::none(),
                }
            }
            Message::ImportComplete(photos) => {
                self.status = format!("Import complete. Added {} photos.", photos.len());
                let first = photos.first().map(|photo| photo.id);
                let add = self.dispatch(Action::AddPhotos(photos));

                // Open the first import when nothing is being edited
                match first {
                    Some(id) if self.store.state().current_photo_id.is_none() => {
                        Task::batch([add, self.dispatch(Action::SelectPhoto(id))])
                    }
                    _ => add,
                }
            }
            Message::SourceLoaded(id, result) => {
                let is_current = self.store.state().current_photo_id == Some(id);
                match result {
                    Ok(source) => {
                        if !is_current {
                            debug!(%id, "decoded source is no longer current");
                            return Task::none();
                        }
                        self.sources.insert(id, Arc::clone(&source));
                        let sample_size = self.config.histogram.sample_size;
                        Task::batch([
                            self.request_render(),
                            Task::perform(
                                histogram::analyze_in_background(source, sample_size),
                                move |plot| Message::HistogramReady(id, plot),
                            ),
                        ])
                    }
                    Err(e) => {
                        warn!(%id, error = %e, "could not decode photo");
                        if is_current {
                            self.frame = None;
                            self.histogram = Some(HistogramView::from(&HistogramPlot::Placeholder));
                        }
                        Task::none()
                    }
                }
            }
            Message::Rendered(Some(rendered)) => {
                if let Some(texture) = rendered.texture {
                    self.sources.store_texture(rendered.photo, texture);
                }
                if self.generation.is_current(rendered.ticket) {
                    self.frame = Some(ShownFrame::from(rendered.frame));
                } else {
                    debug!("discarding stale render");
                }
                Task::none()
            }
            Message::Rendered(None) => Task::none(),
            Message::HistogramReady(id, plot) => {
                if self.store.state().current_photo_id == Some(id) {
                    self.histogram = Some(HistogramView::from(&plot));
                }
                Task::none()
            }
            Message::FlushCatalog => {
                self.flush_catalog();
                Task::none()
            }
            Message::CloseRequested(id) => {
                self.flush_catalog();
                window::close(id)
            }

            Message::SelectPhoto(id) => self.dispatch(Action::SelectPhoto(id)),
            Message::ShowCollection(collection) => {
                self.active_collection = collection;
                Task::none()
            }
            Message::SelectAll => self.dispatch(Action::SelectAllPhotos),
            Message::DeselectAll => self.dispatch(Action::DeselectAllPhotos),
            Message::DeleteSelected => self.dispatch(Action::DeleteSelectedPhotos),
            Message::RemoveCurrent => match self.store.state().current_photo_id {
                Some(id) => self.dispatch(Action::RemovePhoto(id)),
                None => Task::none(),
            },

            Message::AdjustmentChanged(field, value) => {
                match self.store.state().current_photo_id {
                    // Sliders already clamp to the field's range
                    Some(id) => self.dispatch(Action::UpdateAdjustments {
                        id,
                        patch: field.patch(value),
                    }),
                    None => Task::none(),
                }
            }
            Message::ResetAdjustments => self.update_current(AdjustmentSet::default()),
            Message::CopySettings => {
                if let Some(photo) = self.store.state().current_photo() {
                    self.clipboard = Some(photo.adjustments.clone());
                    self.status = format!("Copied settings from {}.", photo.name);
                }
                Task::none()
            }
            Message::PasteSettings => match self.clipboard.clone() {
                Some(settings) => self.update_current(settings),
                None => Task::none(),
            },
            Message::PresetNameChanged(name) => {
                self.preset_name = name;
                Task::none()
            }
            Message::SavePreset => {
                let state = self.store.state();
                let (Some(photo), false) = (state.current_photo(), self.preset_name.trim().is_empty())
                else {
                    return Task::none();
                };
                let preset = Preset {
                    id: uuid::Uuid::new_v4().to_string(),
                    name: self.preset_name.trim().to_string(),
                    adjustments: photo.adjustments.clone(),
                };
                self.status = format!("Saved preset \"{}\".", preset.name);
                self.preset_name.clear();
                self.dispatch(Action::AddPreset(preset))
            }
            Message::ApplyPreset(preset_id) => {
                let state = self.store.state();
                match (state.current_photo_id, state.preset(&preset_id)) {
                    (Some(id), Some(preset)) => self.dispatch(Action::ApplyPreset {
                        id,
                        preset: preset.clone(),
                    }),
                    _ => Task::none(),
                }
            }
            Message::CollectionNameChanged(name) => {
                self.collection_name = name;
                Task::none()
            }
            Message::CreateCollection => {
                let name = self.collection_name.trim().to_string();
                if name.is_empty() {
                    return Task::none();
                }
                let photo_ids: Vec<PhotoId> =
                    self.store.state().selected_photos().map(|photo| photo.id).collect();
                self.status = format!("Created collection \"{}\" with {} photos.", name, photo_ids.len());
                self.collection_name.clear();
                self.dispatch(Action::AddCollection(Collection {
                    id: uuid::Uuid::new_v4().to_string(),
                    name,
                    photo_ids,
                }))
            }

            Message::Pointer(input) => {
                let changed = match input {
                    PointerInput::Down(position) => {
                        self.viewport.pointer_down(position);
                        false
                    }
                    PointerInput::Moved(position) => self.viewport.pointer_move(position),
                    PointerInput::Up => {
                        self.viewport.pointer_up();
                        false
                    }
                    PointerInput::Wheel(delta_y) => {
                        self.viewport.wheel(delta_y);
                        true
                    }
                };
                if changed {
                    self.request_render()
                } else {
                    Task::none()
                }
            }
            Message::ZoomIn => {
                self.viewport.zoom_in();
                self.request_render()
            }
            Message::ZoomOut => {
                self.viewport.zoom_out();
                self.request_render()
            }
            Message::Fit => {
                self.viewport.fit();
                self.request_render()
            }
            Message::ToggleBeforeAfter => {
                self.viewport.toggle_before_after();
                self.request_render()
            }
            Message::WindowResized(size) => {
                let viewport_size = viewport_size_for(size);
                if viewport_size == self.viewport_size {
                    return Task::none();
                }
                self.viewport_size = viewport_size;
                self.request_render()
            }

            Message::ExportCurrent => {
                let Some(photo) = self.store.state().current_photo().cloned() else {
                    return Task::none();
                };
                let Some(options) = self.export_options() else {
                    return Task::none();
                };
                self.status = format!("Exporting {}...", photo.name);
                Task::perform(export::export_one(photo, options), |result| {
                    Message::ExportFinished(result.map(|path| vec![path]).map_err(|e| e.to_string()))
                })
            }
            Message::ExportSelected => {
                let photos = export_targets(&self.store.state());
                if photos.is_empty() {
                    self.status = "No photos to export.".to_string();
                    return Task::none();
                }
                let Some(options) = self.export_options() else {
                    return Task::none();
                };
                self.status = format!("Exporting {} photos...", photos.len());
                Task::perform(export::export_batch(photos, options), |result| {
                    Message::ExportFinished(result.map_err(|e| e.to_string()))
                })
            }
            Message::ExportFinished(Ok(paths)) => {
                self.status = format!("Exported {} photos.", paths.len());
                Task::none()
            }
            Message::ExportFinished(Err(e)) => {
                self.status = format!("Export failed: {}", e);
                Task::none()
            }
        }
    }

    /// Apply an action, queue it for the catalog and re-render if the view changed
    fn dispatch(&mut self, action: Action) -> Task<Message> {
        if self.library.is_some() {
            self.pending_save.record(&action);
        }
        let before = self.store.state();
        let after = self.store.dispatch(action);

        // Drop decoded sources of removed photos
        self.sources.retain(|id| after.photo(id).is_some());
        if let Some(active) = &self.active_collection {
            if after.collection(active).is_none() {
                self.active_collection = None;
            }
        }

        let photo_changed = before.current_photo_id != after.current_photo_id;
        let adjustments_changed = before.current_photo().map(|p| &p.adjustments)
            != after.current_photo().map(|p| &p.adjustments);

        if photo_changed || adjustments_changed {
            self.refresh(photo_changed)
        } else {
            Task::none()
        }
    }

    /// Write pending catalog changes
    fn flush_catalog(&mut self) {
        let Some(library) = &mut self.library else {
            return;
        };
        if self.pending_save.is_empty() {
            return;
        }
        if let Err(e) = self.pending_save.flush(library, &self.store.state()) {
            warn!(error = %e, "failed to save catalog");
        }
    }

    /// Patch every field of the current photo
    fn update_current(&mut self, settings: AdjustmentSet) -> Task<Message> {
        match self.store.state().current_photo_id {
            Some(id) => self.dispatch(Action::UpdateAdjustments {
                id,
                patch: AdjustmentPatch::from(settings),
            }),
            None => Task::none(),
        }
    }

    /// Bring the viewport (and on photo change, the histogram) up to date
    fn refresh(&mut self, photo_changed: bool) -> Task<Message> {
        let state = self.store.state();
        let Some(photo) = state.current_photo() else {
            // Nothing to show; outstanding renders become stale
            self.generation.next();
            self.frame = None;
            self.histogram = None;
            return Task::none();
        };
        let id = photo.id;

        match self.sources.get(id).map(|cached| Arc::clone(&cached.source)) {
            Some(source) => {
                let render = self.request_render();
                if !photo_changed {
                    return render;
                }
                let sample_size = self.config.histogram.sample_size;
                Task::batch([
                    render,
                    Task::perform(
                        histogram::analyze_in_background(source, sample_size),
                        move |plot| Message::HistogramReady(id, plot),
                    ),
                ])
            }
            None => {
                // Supersede whatever was in flight for the previous photo
                self.generation.next();
                if photo_changed {
                    self.histogram = None;
                }
                Task::perform(media::loader::load_source(photo.source.clone()), move |result| {
                    Message::SourceLoaded(id, result.map_err(|e| e.to_string()))
                })
            }
        }
    }

    /// Start a background paint of the current photo with a fresh ticket
    fn request_render(&mut self) -> Task<Message> {
        let state = self.store.state();
        let Some(photo) = state.current_photo() else {
            return Task::none();
        };
        let Some(cached) = self.sources.get(photo.id).cloned() else {
            return Task::none();
        };

        let request = RenderRequest {
            ticket: self.generation.next(),
            photo: photo.id,
            source: cached.source,
            texture: cached.texture,
            chain: build_chain(&photo.adjustments),
            viewport: self.viewport.clone(),
            canvas: self.viewport_size,
        };
        Task::perform(viewport::render(request), Message::Rendered)
    }

    /// Export settings from config; asks for a folder when none is configured
    fn export_options(&self) -> Option<ExportOptions> {
        let output_dir = match &self.config.export.output_dir {
            Some(dir) => dir.clone(),
            None => FileDialog::new().set_title("Export To").pick_folder()?,
        };
        Some(ExportOptions::from_config(&self.config.export, output_dir))
    }

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        let state = self.store.state();

        let content = column![
            self.view_toolbar(),
            row![
                container(ui::canvas::view(self.frame.as_ref(), self.viewport.drag.is_dragging))
                    .width(Length::Fill)
                    .height(Length::Fill),
            ]
            .height(Length::Fill),
            self.view_filmstrip(&state),
        ];

        row![
            self.view_library_panel(&state),
            content.width(Length::Fill),
            self.view_develop_panel(&state),
        ]
        .height(Length::Fill)
        .into()
    }

    fn view_toolbar(&self) -> Element<Message> {
        let before_after = if self.viewport.before_after {
            "Before/After: On"
        } else {
            "Before/After: Off"
        };

        container(
            row![
                button("-").on_press(Message::ZoomOut),
                text(format!("{}%", self.viewport.zoom_percent())).width(60),
                button("+").on_press(Message::ZoomIn),
                button("Fit").on_press(Message::Fit),
                button(before_after).on_press(Message::ToggleBeforeAfter),
            ]
            .spacing(8)
            .align_y(Alignment::Center),
        )
        .height(TOOLBAR_HEIGHT)
        .padding(8)
        .into()
    }

    fn view_filmstrip<'a>(&'a self, state: &StoreState) -> Element<'a, Message> {
        let photos: Vec<&PhotoEntity> = match &self.active_collection {
            Some(collection) => state.photos_in_collection(collection).collect(),
            None => state.photos.iter().collect(),
        };

        let current = state.current_photo_id;
        let tiles: Vec<Element<Message>> = photos
            .into_iter()
            .map(|photo| {
                let marker = if Some(photo.id) == current {
                    "> "
                } else if photo.is_selected {
                    "* "
                } else {
                    ""
                };
                let edited = if photo.adjustments.is_unedited() { "" } else { " (edited)" };
                button(text(format!("{}{}{}", marker, photo.name, edited)).size(12))
                    .on_press(Message::SelectPhoto(photo.id))
                    .width(160)
                    .into()
            })
            .collect();

        container(scrollable(Wrap::with_elements(tiles).spacing(6.0).line_spacing(6.0)))
            .height(FILMSTRIP_HEIGHT)
            .width(Length::Fill)
            .padding(8)
            .into()
    }

    fn view_library_panel<'a>(&'a self, state: &StoreState) -> Element<'a, Message> {
        let mut collections = Column::new()
            .spacing(4)
            .push(button("All Photos").on_press(Message::ShowCollection(None)));
        for collection in &state.collections {
            collections = collections.push(
                button(text(format!("{} ({})", collection.name, collection.photo_ids.len())))
                    .on_press(Message::ShowCollection(Some(collection.id.clone()))),
            );
        }

        let panel = column![
            text("Library").size(20),
            button("Import Files").on_press(Message::ImportFiles),
            button("Import Folder").on_press(Message::ImportFolder),
            horizontal_rule(1),
            button("Select All").on_press(Message::SelectAll),
            button("Deselect All").on_press(Message::DeselectAll),
            button("Delete Selected").on_press(Message::DeleteSelected),
            button("Remove Current").on_press(Message::RemoveCurrent),
            horizontal_rule(1),
            text("Collections").size(16),
            text_input("New collection from selection", &self.collection_name)
                .on_input(Message::CollectionNameChanged)
                .on_submit(Message::CreateCollection),
            button("Create Collection").on_press(Message::CreateCollection),
            collections,
        ]
        .spacing(8)
        .padding(12);

        container(scrollable(panel))
            .width(LEFT_PANEL_WIDTH)
            .height(Length::Fill)
            .into()
    }

    fn view_develop_panel<'a>(&'a self, state: &StoreState) -> Element<'a, Message> {
        let mut panel = Column::new()
            .spacing(8)
            .padding(12)
            .push(text("Develop").size(20))
            .push(ui::histogram::view(self.histogram.as_ref()));

        match state.current_photo() {
            Some(photo) => {
                let meta = &photo.metadata;
                panel = panel
                    .push(text(photo.name.clone()).size(14))
                    .push(
                        text(format!("{} × {} • {}", meta.width, meta.height, meta.format))
                            .size(12),
                    );

                for field in Adjustment::ALL {
                    let value = field.get(&photo.adjustments);
                    panel = panel.push(
                        column![
                            row![
                                text(field.label()).size(12).width(Length::Fill),
                                text(format!("{:.1}", value)).size(12),
                            ],
                            slider(field.range(), value, move |v| {
                                Message::AdjustmentChanged(field, v)
                            })
                            .step(field.step()),
                        ]
                        .spacing(2),
                    );
                }

                let mut settings = row![
                    button("Reset").on_press(Message::ResetAdjustments),
                    button("Copy").on_press(Message::CopySettings),
                ]
                .spacing(6);
                settings = settings.push(
                    button("Paste").on_press_maybe(self.clipboard.as_ref().map(|_| Message::PasteSettings)),
                );
                panel = panel.push(settings);

                panel = panel
                    .push(horizontal_rule(1))
                    .push(text("Presets").size(16))
                    .push(
                        text_input("Preset name", &self.preset_name)
                            .on_input(Message::PresetNameChanged)
                            .on_submit(Message::SavePreset),
                    )
                    .push(button("Save Preset").on_press(Message::SavePreset));
                for preset in &state.presets {
                    panel = panel.push(
                        button(text(preset.name.clone()))
                            .on_press(Message::ApplyPreset(preset.id.clone())),
                    );
                }
            }
            None => {
                panel = panel.push(text("Select a photo to edit.").size(14));
            }
        }

        panel = panel
            .push(horizontal_rule(1))
            .push(
                row![
                    button("Export").on_press(Message::ExportCurrent),
                    button("Export Selected").on_press(Message::ExportSelected),
                ]
                .spacing(6),
            )
            .push(text(&self.status).size(12));

        container(scrollable(panel))
            .width(RIGHT_PANEL_WIDTH)
            .height(Length::Fill)
            .into()
    }

    fn subscription(&self) -> Subscription<Message> {
        let mut subscriptions = vec![
            window::resize_events().map(|(_id, size)| Message::WindowResized(size)),
            window::close_requests().map(Message::CloseRequested),
        ];
        if !self.pending_save.is_empty() {
            let interval = Duration::from_millis(self.config.general.save_interval_ms.max(1));
            subscriptions.push(time::every(interval).map(|_| Message::FlushCatalog));
        }
        Subscription::batch(subscriptions)
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

/// Viewport surface size for a window size
fn viewport_size_for(window: Size) -> (u32, u32) {
    let width = (window.width - LEFT_PANEL_WIDTH - RIGHT_PANEL_WIDTH).max(1.0);
    let height = (window.height - TOOLBAR_HEIGHT - FILMSTRIP_HEIGHT).max(1.0);
    (width as u32, height as u32)
}

/// Photos a batch export covers: the selection, or every photo when none is selected
fn export_targets(state: &StoreState) -> Vec<PhotoEntity> {
    let selected: Vec<PhotoEntity> = state.selected_photos().cloned().collect();
    if selected.is_empty() {
        state.photos.clone()
    } else {
        selected
    }
}

/// Open the catalog and restore the last session; runs without one on failure
fn open_catalog(config: &EditorConfig) -> (Option<Library>, Store) {
    if !config.general.persist_catalog {
        return (None, Store::new());
    }

    let opened = match &config.general.catalog_path {
        Some(path) => Library::open(path),
        None => Library::new(),
    };
    let library = match opened {
        Ok(library) => library,
        Err(e) => {
            warn!(error = %e, "catalog unavailable, continuing without persistence");
            return (None, Store::new());
        }
    };

    match library.load_state() {
        Ok(state) => (Some(library), Store::with_state(state)),
        Err(e) => {
            warn!(error = %e, "failed to restore session");
            (Some(library), Store::new())
        }
    }
}

fn main() -> iced::Result {
    let config = match EditorConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration, using defaults: {}", e);
            EditorConfig::default()
        }
    };
    logging::init(&config.logging);

    iced::application("Photo Editor", PhotoEditor::update, PhotoEditor::view)
        .subscription(PhotoEditor::subscription)
        .theme(PhotoEditor::theme)
        .window_size(WINDOW_SIZE)
        .centered()
        // Pending catalog writes are flushed before the window closes
        .exit_on_close_request(false)
        .run_with(move || PhotoEditor::new(config))
}

//! Editing session: the editor state plus a backend.
//!
//! The session owns the image list and implements the load, save and
//! navigation protocol. Every backend call is awaited before the next step
//! starts, so a save always completes before the following load begins.
//! User-facing outcomes are collected as [`Notice`]s.

use std::fmt;
use std::str::FromStr;

use boxlab_api::{ApiError, Backend, ImageId, ImageInfo, Prediction, ProjectId, STATUS_COMPLETED};

use crate::annotation::{Annotation, AnnotationId, LabelClass};
use crate::config::AppConfig;
use crate::editor::{Direction, EditorSettings, EditorState, KeyOutcome, LoadedImage};
use crate::error::SessionError;
use crate::interaction::{self, PointerEvent, Transition};
use crate::keybindings::{KeyBindings, KeyEvent};
use crate::label_assist::{
    AssistConfig, AssistMode, LabelAssist, ModelCatalogue, PredictionCall, merge_predictions,
};
use crate::render::{self, Frame};


// ============================================================================
// Image filter
// ============================================================================

/// Which images of the project are part of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFilter {
    #[default]
    All,
    /// Images with status `completed`.
    Annotated,
    /// Everything else.
    Unannotated,
}

impl ImageFilter {
    pub fn matches(&self, image: &ImageInfo) -> bool {
        match self {
            ImageFilter::All => true,
            ImageFilter::Annotated => image.is_completed(),
            ImageFilter::Unannotated => !image.is_completed(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ImageFilter::All => "all",
            ImageFilter::Annotated => "annotated",
            ImageFilter::Unannotated => "unannotated",
        }
    }
}

impl fmt::Display for ImageFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ImageFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(ImageFilter::All),
            "annotated" => Ok(ImageFilter::Annotated),
            "unannotated" => Ok(ImageFilter::Unannotated),
            other => Err(format!("unknown filter '{}' (expected all, annotated or unannotated)", other)),
        }
    }
}

// ============================================================================
// Notices
// ============================================================================

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// A one-line message for the user (a toast in a graphical front end).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

// ============================================================================
// Session
// ============================================================================

/// One user's editing session over a project's images.
pub struct Session<B: Backend> {
    backend: B,
    project_id: ProjectId,
    filter: ImageFilter,
    images: Vec<ImageInfo>,
    index: usize,
    auto_save: bool,
    keybindings: KeyBindings,
    notices: Vec<Notice>,
    pub state: EditorState,
    pub assist: LabelAssist,
    pub catalogue: ModelCatalogue,
}

impl<B: Backend> Session<B> {
    pub fn new(backend: B, project_id: ProjectId, settings: EditorSettings) -> Self {
        Self {
            backend,
            project_id,
            filter: ImageFilter::All,
            images: Vec::new(),
            index: 0,
            auto_save: false,
            keybindings: KeyBindings::default(),
            notices: Vec::new(),
            state: EditorState::new(settings),
            assist: LabelAssist::default(),
            catalogue: ModelCatalogue::default(),
        }
    }

    /// Build a session from the config file's settings.
    pub fn from_config(backend: B, config: &AppConfig) -> Self {
        let mut session = Self::new(backend, config.backend.project_id, config.editor.clone());
        session.auto_save = config.preferences.auto_save;
        session.keybindings = config.keybindings.clone();
        session
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn project_id(&self) -> ProjectId {
        self.project_id
    }

    pub fn filter(&self) -> ImageFilter {
        self.filter
    }

    /// The filtered image list, in batch order.
    pub fn images(&self) -> &[ImageInfo] {
        &self.images
    }

    pub fn current_index(&self) -> usize {
        self.index
    }

    /// The image record being edited, if any.
    pub fn current_image(&self) -> Option<&ImageInfo> {
        self.state.image.as_ref()?;
        self.images.get(self.index)
    }

    pub fn auto_save(&self) -> bool {
        self.auto_save
    }

    pub fn set_auto_save(&mut self, enabled: bool) {
        self.auto_save = enabled;
        if enabled {
            self.notify(NoticeLevel::Success, "Auto-save enabled! 💾");
        } else {
            self.notify(NoticeLevel::Info, "Auto-save disabled");
        }
    }

    /// Drain pending notices, oldest first.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            NoticeLevel::Error => log::error!("{}", message),
            _ => log::info!("{}", message),
        }
        self.notices.push(Notice { level, message });
    }

    // ------------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------------

    /// Fetch classes, the image list and the model catalogue, then load the
    /// initial image.
    ///
    /// `initial` picks an image by id; when it is absent or filtered out the
    /// first image is used.
    pub async fn open(&mut self, filter: ImageFilter, initial: Option<ImageId>) -> Result<(), SessionError> {
        self.filter = filter;

        let classes = match self.backend.classes(self.project_id).await {
            Ok(classes) => classes,
            Err(e) => {
                log::error!("Failed to load classes: {}", e);
                self.notify(NoticeLevel::Error, "Failed to load classes");
                return Err(e.into());
            }
        };
        self.state
            .set_classes(classes.into_iter().map(LabelClass::from).collect());

        let list = match self.backend.images(self.project_id).await {
            Ok(list) => list,
            Err(e) => {
                self.notify(NoticeLevel::Error, "Failed to load images");
                return Err(e.into());
            }
        };
        self.images = list
            .into_images()
            .into_iter()
            .filter(|image| filter.matches(image))
            .collect();
        log::info!(
            "📂 Project {}: {} {} images",
            self.project_id,
            self.images.len(),
            filter
        );

        self.refresh_models().await;

        if self.images.is_empty() {
            let err = SessionError::EmptyImageSet {
                filter: filter.to_string(),
            };
            self.notify(NoticeLevel::Error, err.to_string());
            self.state.clear_image();
            return Err(err);
        }

        let index = initial
            .and_then(|id| self.images.iter().position(|image| image.id == id))
            .unwrap_or(0);
        self.load_image(index).await;
        Ok(())
    }

    /// Reload the model catalogue. Missing models are not an error.
    pub async fn refresh_models(&mut self) {
        let project = match self.backend.project(self.project_id).await {
            Ok(project) => Some(project),
            Err(e) => {
                log::debug!("No trained models available: {}", e);
                None
            }
        };
        let external = self
            .backend
            .external_models(self.project_id)
            .await
            .unwrap_or_else(|e| {
                log::debug!("No external models available: {}", e);
                Vec::new()
            });
        self.catalogue = ModelCatalogue::new(project, external);
    }

    /// Load the image at `index` of the filtered list.
    ///
    /// On failure the editor is left empty and an error notice is raised.
    /// On success persistent label assist runs if it is enabled. Returns
    /// whether the image was loaded.
    pub async fn load_image(&mut self, index: usize) -> bool {
        let Some(info) = self.images.get(index).cloned() else {
            return false;
        };
        self.index = index;

        match self.fetch_image(&info).await {
            Ok((image, annotations)) => {
                let count = annotations.len();
                self.state.load(image, annotations);
                log::info!(
                    "🖼️ Loaded image {} '{}' ({}/{}) with {} annotations",
                    info.id,
                    info.filename,
                    index + 1,
                    self.images.len(),
                    count
                );
            }
            Err(e) => {
                log::error!("Failed to load image {}: {}", info.id, e);
                self.notify(NoticeLevel::Error, "Failed to load image");
                self.state.clear_image();
                return false;
            }
        }

        if self.assist.is_persistent() {
            self.run_auto_assist().await;
        }
        true
    }

    async fn fetch_image(&self, info: &ImageInfo) -> Result<(LoadedImage, Vec<Annotation>), SessionError> {
        let stored = self.backend.annotations(info.id).await?;
        let bytes = self.backend.image_bytes(info.id).await?;

        let image = if bytes.is_empty() {
            let (Some(width), Some(height)) = (info.width, info.height) else {
                return Err(SessionError::UnknownSize { image_id: info.id });
            };
            LoadedImage::placeholder(info.id, info.filename.clone(), width, height)
        } else {
            let decoded = image::load_from_memory(&bytes).map_err(|e| SessionError::decode(info.id, e))?;
            LoadedImage::decoded(info.id, info.filename.clone(), decoded)
        };

        let annotations = stored
            .iter()
            .enumerate()
            .map(|(i, s)| Annotation::from_stored(i as AnnotationId + 1, s))
            .collect();
        Ok((image, annotations))
    }

    // ------------------------------------------------------------------------
    // Saving and navigation
    // ------------------------------------------------------------------------

    /// Persist the current annotations and mark the image completed.
    pub async fn save(&mut self) -> Result<(), SessionError> {
        let Some(image_id) = self.state.image.as_ref().map(|image| image.id) else {
            return Err(SessionError::NoCurrentImage);
        };
        let request = self.state.store.to_save_request();

        if let Err(e) = self.backend.save_annotations(image_id, &request).await {
            self.notify(NoticeLevel::Error, "Failed to save annotations");
            return Err(e.into());
        }

        log::info!("💾 Saved {} annotations for image {}", request.annotations.len(), image_id);
        if let Some(info) = self.images.get_mut(self.index) {
            info.status = STATUS_COMPLETED.to_string();
        }
        if !self.auto_save {
            self.notify(NoticeLevel::Success, "Annotations saved!");
        }
        Ok(())
    }

    /// Explicit save. Without auto-save, continue to the next image.
    pub async fn save_and_continue(&mut self) -> Result<(), SessionError> {
        self.save().await?;
        if !self.auto_save && self.index + 1 < self.images.len() {
            self.navigate(Direction::Next).await;
        }
        Ok(())
    }

    /// Move to the neighbouring image.
    ///
    /// With auto-save the current image is saved first and a failed save
    /// cancels the move. Returns whether a new image was loaded.
    pub async fn navigate(&mut self, direction: Direction) -> bool {
        let target = match direction {
            Direction::Previous if self.index > 0 => self.index - 1,
            Direction::Next if self.index + 1 < self.images.len() => self.index + 1,
            _ => return false,
        };

        if self.auto_save && self.state.image.is_some() && self.save().await.is_err() {
            log::warn!("Navigation cancelled: save failed");
            return false;
        }
        self.load_image(target).await
    }

    pub async fn next_image(&mut self) -> bool {
        self.navigate(Direction::Next).await
    }

    pub async fn previous_image(&mut self) -> bool {
        self.navigate(Direction::Previous).await
    }

    // ------------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------------

    /// Handle a key press, running navigation or saving when asked to.
    pub async fn handle_key(&mut self, event: &KeyEvent) -> KeyOutcome {
        let Some(action) = self.keybindings.action_for(event) else {
            return KeyOutcome::Ignored;
        };
        let outcome = self.state.apply_action(action);
        match outcome {
            KeyOutcome::Navigate(direction) => {
                self.navigate(direction).await;
            }
            KeyOutcome::Save => {
                if let Err(e) = self.save_and_continue().await {
                    log::warn!("Save from keyboard failed: {}", e);
                }
            }
            KeyOutcome::Handled | KeyOutcome::Ignored => {}
        }
        outcome
    }

    pub fn handle_pointer(&mut self, event: PointerEvent) -> Transition {
        interaction::handle_pointer(&mut self.state, event)
    }

    pub fn cursor_hint(&self, x: f64, y: f64) -> &'static str {
        interaction::cursor_hint(&self.state, x, y)
    }

    pub fn render(&self) -> Frame {
        render::render(&self.state)
    }

    // ------------------------------------------------------------------------
    // Label assist
    // ------------------------------------------------------------------------

    /// The assist button.
    pub fn toggle_assist(&mut self) -> AssistMode {
        let was_persistent = self.assist.is_persistent();
        let mode = self.assist.toggle();
        if was_persistent {
            self.assist.config.persist_across_images = false;
            self.notify(NoticeLevel::Info, "Label Assist disabled");
        }
        mode
    }

    /// The panel's run button: either a single run, or enable persistent
    /// mode and run on the current image right away.
    pub async fn run_label_assist(&mut self, config: AssistConfig) -> Result<usize, SessionError> {
        let persistent = config.persist_across_images;
        self.assist.config = config;

        if persistent {
            self.assist.enable_persistent();
            self.notify(NoticeLevel::Success, "Continuous Label Assist enabled! 🚀");
            Ok(self.run_auto_assist().await.unwrap_or(0))
        } else {
            let result = self.run_single_assist().await;
            self.assist.close_panel();
            result
        }
    }

    /// One visible label-assist run on the current image.
    pub async fn run_single_assist(&mut self) -> Result<usize, SessionError> {
        let Some(image_id) = self.state.image.as_ref().map(|image| image.id) else {
            return Err(SessionError::NoCurrentImage);
        };
        self.notify(NoticeLevel::Info, "Running Label Assist...");

        let call = self.assist.config.request(image_id);
        match self.predict(call).await {
            Ok(predictions) => {
                let added = merge_predictions(&mut self.state, &predictions, self.assist.config.clear_existing);
                self.notify(NoticeLevel::Success, format!("Added {} predictions", added));
                Ok(added)
            }
            Err(e) => {
                log::error!("Label assist on image {} failed: {}", image_id, e);
                let message = self.assist.config.failure_message();
                self.notify(NoticeLevel::Error, message);
                Err(e.into())
            }
        }
    }

    /// Automatic run after an image load. Failures are logged, not shown,
    /// and switch persistent mode off.
    pub async fn run_auto_assist(&mut self) -> Option<usize> {
        let image_id = self.state.image.as_ref()?.id;
        log::debug!("🤖 Auto label assist with {}", self.assist.config.model.display_name());

        let call = self.assist.config.request(image_id);
        match self.predict(call).await {
            Ok(predictions) => {
                let added = merge_predictions(&mut self.state, &predictions, self.assist.config.clear_existing);
                log::info!("Auto-labeled image {}: {} predictions", image_id, added);
                Some(added)
            }
            Err(e) => {
                log::warn!("Auto label assist failed, disabling: {}", e);
                self.assist.disable_silently();
                None
            }
        }
    }

    async fn predict(&self, call: PredictionCall) -> Result<Vec<Prediction>, ApiError> {
        match call {
            PredictionCall::Predict(request) => self.backend.predict(self.project_id, &request).await,
            PredictionCall::External(request) => {
                self.backend.predict_external(self.project_id, &request).await
            }
        }
    }
}

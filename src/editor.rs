//! Editor state for the loaded image.
//!
//! [`EditorState`] is the single explicit owner of everything the canvas
//! needs: the annotation store, its history, selection, the interaction
//! mode, the view transform and the project classes. Other components
//! (interaction, render, label assist) take it as a parameter.

use boxlab_api::ImageId;
use serde::{Deserialize, Serialize};

use crate::annotation::{Annotation, AnnotationId, AnnotationPatch, AnnotationStore, ClassId, LabelClass};
use crate::constants::{self, canvas, zoom};
use crate::geometry::{CanvasSize, Point};
use crate::interaction::Interaction;
use crate::keybindings::EditorAction;
use crate::undo::{History, UndoConfig};
use crate::zoom_math::{Transform, fit_canvas};

// ============================================================================
// Settings
// ============================================================================

/// Editor tunables, loaded from the `editor` section of the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    /// Boxes must be strictly larger than this in both dimensions (normalized).
    pub min_box_size: f64,
    /// Handle grab tolerance (normalized).
    pub handle_radius: f64,
    /// Snapshots kept per image, base included. Unlimited when unset.
    pub max_history: Option<usize>,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            min_box_size: constants::MIN_BOX_SIZE,
            handle_radius: constants::HANDLE_HIT_RADIUS,
            max_history: None,
            min_zoom: zoom::MIN,
            max_zoom: zoom::MAX,
        }
    }
}

// ============================================================================
// Loaded Image
// ============================================================================

/// The decoded image currently on the canvas.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub id: ImageId,
    pub filename: String,
    /// Natural width in pixels.
    pub width: u32,
    /// Natural height in pixels.
    pub height: u32,
    /// Decoded pixels; `None` when only the image record's size is known.
    pub pixels: Option<image::RgbaImage>,
}

impl LoadedImage {
    /// Wrap a decoded image.
    pub fn decoded(id: ImageId, filename: impl Into<String>, decoded: image::DynamicImage) -> Self {
        let pixels = decoded.to_rgba8();
        Self {
            id,
            filename: filename.into(),
            width: pixels.width(),
            height: pixels.height(),
            pixels: Some(pixels),
        }
    }

    /// An image known only by its recorded dimensions.
    pub fn placeholder(id: ImageId, filename: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            id,
            filename: filename.into(),
            width,
            height,
            pixels: None,
        }
    }
}

// ============================================================================
// Key handling results
// ============================================================================

/// Navigation direction through the image list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Previous,
    Next,
}

/// What a key press did, from the session's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Handled locally; redraw.
    Handled,
    /// The session must run the navigation protocol.
    Navigate(Direction),
    /// The session must run an explicit save.
    Save,
    /// Nothing to do.
    Ignored,
}

// ============================================================================
// Editor State
// ============================================================================

/// All mutable state of the canvas editor.
#[derive(Debug, Clone)]
pub struct EditorState {
    pub store: AnnotationStore,
    pub history: History,
    pub selected: Option<AnnotationId>,
    pub interaction: Interaction,
    pub transform: Transform,
    /// Fitted canvas size in pixels (before zoom).
    pub canvas: CanvasSize,
    /// Size of the element the canvas is fitted into.
    pub container: CanvasSize,
    pub classes: Vec<LabelClass>,
    /// Class given to newly drawn boxes.
    pub current_class: Option<ClassId>,
    pub settings: EditorSettings,
    pub image: Option<LoadedImage>,
}

impl Default for EditorState {
    fn default() -> Self {
        Self::new(EditorSettings::default())
    }
}

impl EditorState {
    pub fn new(settings: EditorSettings) -> Self {
        let (width, height) = canvas::DEFAULT_CONTAINER;
        let container = CanvasSize::new(width, height);
        let canvas = CanvasSize::new(width - canvas::CONTAINER_MARGIN, height - canvas::CONTAINER_MARGIN);
        Self {
            store: AnnotationStore::new(),
            history: History::with_config(UndoConfig {
                max_history: settings.max_history,
            }),
            selected: None,
            interaction: Interaction::Idle,
            transform: Transform::identity(),
            canvas,
            container,
            classes: Vec::new(),
            current_class: None,
            settings,
            image: None,
        }
    }

    /// Install the project classes. The first class becomes current unless
    /// the current one is still present.
    pub fn set_classes(&mut self, classes: Vec<LabelClass>) {
        self.classes = classes;
        let still_valid = self
            .current_class
            .is_some_and(|id| self.classes.iter().any(|c| c.id == id));
        if !still_valid {
            self.current_class = self.classes.first().map(|c| c.id);
        }
    }

    /// Look up a class by id.
    pub fn class(&self, id: ClassId) -> Option<&LabelClass> {
        self.classes.iter().find(|c| c.id == id)
    }

    // ------------------------------------------------------------------------
    // Image lifecycle
    // ------------------------------------------------------------------------

    /// Show a freshly loaded image with its stored annotations.
    ///
    /// The store is replaced, history resets to a single base snapshot and
    /// the canvas is refitted.
    pub fn load(&mut self, image: LoadedImage, annotations: Vec<Annotation>) {
        self.store.replace_all(annotations);
        self.history.reset(self.store.snapshot());
        self.selected = None;
        self.interaction = Interaction::Idle;
        self.image = Some(image);
        self.refit();
    }

    /// Drop the current image and all annotations.
    pub fn clear_image(&mut self) {
        self.image = None;
        self.store.clear();
        self.history.reset(Vec::new());
        self.selected = None;
        self.interaction = Interaction::Idle;
    }

    /// The container was resized: refit the canvas and reset zoom/pan.
    pub fn resize(&mut self, container_width: f64, container_height: f64) {
        self.container = CanvasSize::new(container_width, container_height);
        self.refit();
    }

    fn refit(&mut self) {
        if let Some(image) = &self.image {
            let (w, h) = (f64::from(image.width), f64::from(image.height));
            if let Some(size) = fit_canvas(w, h, self.container.width, self.container.height, canvas::CONTAINER_MARGIN) {
                self.canvas = size;
            } else if w > 0.0 && h > 0.0 {
                self.canvas = CanvasSize::new(w, h);
            }
        }
        self.transform = Transform::identity();
    }

    // ------------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------------

    /// Mutate the store, then record a history snapshot.
    pub fn apply_mutation<R>(&mut self, mutate: impl FnOnce(&mut AnnotationStore) -> R) -> R {
        let result = mutate(&mut self.store);
        self.history.push(self.store.snapshot());
        result
    }

    /// Record the current store as a history step (end of a drag).
    pub fn commit_history(&mut self) {
        self.history.push(self.store.snapshot());
    }

    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(snapshot) => {
                self.restore(snapshot);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(snapshot) => {
                self.restore(snapshot);
                true
            }
            None => false,
        }
    }

    fn restore(&mut self, snapshot: Vec<Annotation>) {
        self.store.replace_all(snapshot);
        if self.selected.is_some_and(|id| self.store.get(id).is_none()) {
            self.selected = None;
        }
        self.interaction = Interaction::Idle;
    }

    /// Select an annotation (sidebar click). Returns false for unknown ids.
    pub fn select(&mut self, id: AnnotationId) -> bool {
        if self.store.get(id).is_some() {
            self.selected = Some(id);
            true
        } else {
            false
        }
    }

    pub fn deselect(&mut self) {
        self.selected = None;
    }

    /// The selected annotation, if it still exists.
    pub fn selected_annotation(&self) -> Option<&Annotation> {
        self.selected.and_then(|id| self.store.get(id))
    }

    /// Delete an annotation by id.
    pub fn delete(&mut self, id: AnnotationId) -> bool {
        if self.store.get(id).is_none() {
            return false;
        }
        self.apply_mutation(|store| store.remove(id));
        if self.selected == Some(id) {
            self.selected = None;
        }
        log::debug!("🗑️ Deleted annotation {}", id);
        true
    }

    pub fn delete_selected(&mut self) -> bool {
        match self.selected {
            Some(id) => self.delete(id),
            None => false,
        }
    }

    /// Reassign an annotation to another project class.
    pub fn change_class(&mut self, id: AnnotationId, class_id: ClassId) -> bool {
        if self.class(class_id).is_none() || self.store.get(id).is_none() {
            return false;
        }
        self.apply_mutation(|store| store.update(id, AnnotationPatch::class(class_id)))
    }

    /// Make a class current by id.
    pub fn select_class(&mut self, class_id: ClassId) -> bool {
        if self.class(class_id).is_some() {
            self.current_class = Some(class_id);
            true
        } else {
            false
        }
    }

    /// Hotkey class selection: make the Nth class current and reassign the
    /// selected annotation to it.
    pub fn select_class_by_index(&mut self, index: usize) -> bool {
        let Some(class_id) = self.classes.get(index).map(|c| c.id) else {
            return false;
        };
        self.current_class = Some(class_id);
        if let Some(id) = self.selected {
            self.change_class(id, class_id);
        }
        true
    }

    // ------------------------------------------------------------------------
    // View
    // ------------------------------------------------------------------------

    pub fn zoom_in(&mut self) {
        self.transform = self.transform.zoom_in(zoom::BUTTON_FACTOR, self.settings.max_zoom);
    }

    pub fn zoom_out(&mut self) {
        self.transform = self.transform.zoom_out(zoom::BUTTON_FACTOR, self.settings.min_zoom);
    }

    pub fn reset_zoom(&mut self) {
        self.transform = Transform::identity();
    }

    pub fn wheel(&mut self, delta_y: f64) {
        self.transform = self
            .transform
            .wheel(delta_y, self.settings.min_zoom, self.settings.max_zoom);
    }

    /// Convert a pointer position (screen pixels relative to the canvas
    /// element) to normalized image space.
    pub fn pointer_to_normalized(&self, x: f64, y: f64) -> Point {
        let p = self.transform.invert(x, y);
        self.canvas.normalize(p.x, p.y)
    }

    // ------------------------------------------------------------------------
    // Keyboard
    // ------------------------------------------------------------------------

    /// Apply a resolved key action. Navigation and saving need the backend,
    /// so they are handed back to the caller.
    pub fn apply_action(&mut self, action: EditorAction) -> KeyOutcome {
        let handled = |done: bool| {
            if done {
                KeyOutcome::Handled
            } else {
                KeyOutcome::Ignored
            }
        };
        match action {
            EditorAction::DeleteSelected => handled(self.delete_selected()),
            EditorAction::Deselect => {
                let had = self.selected.take().is_some();
                handled(had)
            }
            EditorAction::SelectClass(index) => handled(self.select_class_by_index(index)),
            EditorAction::Undo => handled(self.undo()),
            EditorAction::Redo => handled(self.redo()),
            EditorAction::PreviousImage => KeyOutcome::Navigate(Direction::Previous),
            EditorAction::NextImage => KeyOutcome::Navigate(Direction::Next),
            EditorAction::Save => KeyOutcome::Save,
        }
    }
}

//! Annotation data model and the per-image annotation store.
//!
//! This module provides:
//! - [`Annotation`], one box on the current image
//! - [`LabelClass`], a project class (read-only from the editor)
//! - [`AnnotationStore`], the ordered in-memory list for the loaded image

use boxlab_api::{ClassInfo, Prediction, SaveAnnotationsRequest, SavedBox, StoredAnnotation};
use serde::{Deserialize, Serialize};

use crate::constants::MANUAL_CONFIDENCE;
use crate::geometry::{BoxGeometry, Point};

pub use boxlab_api::ClassId;

/// In-memory annotation identifier, unique within the loaded image only.
pub type AnnotationId = u64;

// ============================================================================
// Classes
// ============================================================================

/// A project class. Loaded once per project; the editor never edits it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelClass {
    pub id: ClassId,
    pub name: String,
    /// CSS-style color string, parsed at render time.
    pub color: String,
}

impl LabelClass {
    pub fn new(id: ClassId, name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            color: color.into(),
        }
    }
}

impl From<ClassInfo> for LabelClass {
    fn from(info: ClassInfo) -> Self {
        Self {
            id: info.id,
            name: info.name,
            color: info.color,
        }
    }
}

// ============================================================================
// Annotation
// ============================================================================

/// A single box on the current image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: AnnotationId,
    pub class_id: ClassId,
    #[serde(flatten)]
    pub geometry: BoxGeometry,
    /// 1.0 for hand-drawn boxes, the model's score for predictions.
    pub confidence: f64,
    /// Informational only; predicted boxes are saved like any other.
    pub is_predicted: bool,
}

impl Annotation {
    /// A hand-drawn box.
    pub fn manual(id: AnnotationId, class_id: ClassId, geometry: BoxGeometry) -> Self {
        Self {
            id,
            class_id,
            geometry,
            confidence: MANUAL_CONFIDENCE,
            is_predicted: false,
        }
    }

    /// A box produced by label assist.
    pub fn predicted(id: AnnotationId, prediction: &Prediction) -> Self {
        Self {
            id,
            class_id: prediction.class_id,
            geometry: BoxGeometry::new(
                prediction.x_center,
                prediction.y_center,
                prediction.width,
                prediction.height,
            ),
            confidence: prediction.confidence,
            is_predicted: true,
        }
    }

    /// A box loaded from the backend. Backend ids are replaced by `id`.
    pub fn from_stored(id: AnnotationId, stored: &StoredAnnotation) -> Self {
        Self {
            id,
            class_id: stored.class_id,
            geometry: BoxGeometry::new(stored.x_center, stored.y_center, stored.width, stored.height),
            confidence: stored.confidence.unwrap_or(MANUAL_CONFIDENCE),
            is_predicted: stored.is_predicted.unwrap_or(false),
        }
    }

    /// The persisted form (no id, no confidence).
    pub fn to_saved(&self) -> SavedBox {
        SavedBox {
            class_id: self.class_id,
            x_center: self.geometry.x_center,
            y_center: self.geometry.y_center,
            width: self.geometry.width,
            height: self.geometry.height,
        }
    }
}

/// Partial update for [`AnnotationStore::update`]. `None` leaves a field as is.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AnnotationPatch {
    pub class_id: Option<ClassId>,
    pub geometry: Option<BoxGeometry>,
    pub confidence: Option<f64>,
    pub is_predicted: Option<bool>,
}

impl AnnotationPatch {
    pub fn class(class_id: ClassId) -> Self {
        Self {
            class_id: Some(class_id),
            ..Default::default()
        }
    }

    pub fn geometry(geometry: BoxGeometry) -> Self {
        Self {
            geometry: Some(geometry),
            ..Default::default()
        }
    }

    fn apply(&self, annotation: &mut Annotation) {
        if let Some(class_id) = self.class_id {
            annotation.class_id = class_id;
        }
        if let Some(geometry) = self.geometry {
            annotation.geometry = geometry;
        }
        if let Some(confidence) = self.confidence {
            annotation.confidence = confidence;
        }
        if let Some(is_predicted) = self.is_predicted {
            annotation.is_predicted = is_predicted;
        }
    }
}

// ============================================================================
// Annotation Store
// ============================================================================

/// Ordered annotations for the loaded image.
///
/// Insertion order is z-order: later annotations are drawn on top and win
/// hit tests. The store has no persistence and no history of its own.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationStore {
    annotations: Vec<Annotation>,
    /// Counter for generating unique annotation IDs.
    next_id: AnnotationId,
}

impl Default for AnnotationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self {
            annotations: Vec::new(),
            next_id: 1,
        }
    }

    /// Reserve a fresh id.
    pub fn allocate_id(&mut self) -> AnnotationId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Append an annotation on top of the others.
    pub fn add(&mut self, annotation: Annotation) {
        if annotation.id >= self.next_id {
            self.next_id = annotation.id + 1;
        }
        self.annotations.push(annotation);
    }

    /// Update fields of an annotation. Returns false if the id is unknown.
    pub fn update(&mut self, id: AnnotationId, patch: AnnotationPatch) -> bool {
        match self.get_mut(id) {
            Some(annotation) => {
                patch.apply(annotation);
                true
            }
            None => false,
        }
    }

    /// Remove an annotation by ID.
    pub fn remove(&mut self, id: AnnotationId) -> Option<Annotation> {
        let index = self.annotations.iter().position(|a| a.id == id)?;
        Some(self.annotations.remove(index))
    }

    /// Clear all annotations. Ids keep counting up.
    pub fn clear(&mut self) {
        self.annotations.clear();
    }

    /// Replace the whole list (image load, undo, redo).
    pub fn replace_all(&mut self, annotations: Vec<Annotation>) {
        let max_id = annotations.iter().map(|a| a.id).max().unwrap_or(0);
        self.next_id = self.next_id.max(max_id + 1);
        self.annotations = annotations;
    }

    /// Get an annotation by ID.
    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.id == id)
    }

    fn get_mut(&mut self, id: AnnotationId) -> Option<&mut Annotation> {
        self.annotations.iter_mut().find(|a| a.id == id)
    }

    /// All annotations in z-order (bottom first).
    pub fn list(&self) -> &[Annotation] {
        &self.annotations
    }

    /// Deep copy of the list, used for history snapshots.
    pub fn snapshot(&self) -> Vec<Annotation> {
        self.annotations.clone()
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// Find the topmost annotation containing `point`.
    pub fn hit_test(&self, point: Point) -> Option<AnnotationId> {
        self.annotations
            .iter()
            .rev()
            .find(|a| a.geometry.contains(point))
            .map(|a| a.id)
    }

    /// Build the save body for the backend.
    pub fn to_save_request(&self) -> SaveAnnotationsRequest {
        SaveAnnotationsRequest::completed(self.annotations.iter().map(Annotation::to_saved).collect())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(boxes: &[(ClassId, BoxGeometry)]) -> AnnotationStore {
        let mut store = AnnotationStore::new();
        for (class_id, geometry) in boxes {
            let id = store.allocate_id();
            store.add(Annotation::manual(id, *class_id, *geometry));
        }
        store
    }

    #[test]
    fn test_add_get_remove() {
        let mut store = store_with(&[
            (1, BoxGeometry::new(0.2, 0.2, 0.1, 0.1)),
            (2, BoxGeometry::new(0.7, 0.7, 0.1, 0.1)),
        ]);
        assert_eq!(store.len(), 2);
        let first = store.list()[0].id;
        assert_eq!(store.get(first).map(|a| a.class_id), Some(1));

        let removed = store.remove(first).expect("annotation exists");
        assert_eq!(removed.class_id, 1);
        assert_eq!(store.len(), 1);
        assert!(store.get(first).is_none());
        assert!(store.remove(first).is_none());
    }

    #[test]
    fn test_update_patch() {
        let mut store = store_with(&[(1, BoxGeometry::new(0.2, 0.2, 0.1, 0.1))]);
        let id = store.list()[0].id;
        assert!(store.update(id, AnnotationPatch::class(5)));
        let ann = store.get(id).expect("exists");
        assert_eq!(ann.class_id, 5);
        assert_eq!(ann.geometry, BoxGeometry::new(0.2, 0.2, 0.1, 0.1));
        assert!(!store.update(999, AnnotationPatch::class(5)));
    }

    #[test]
    fn test_hit_test_prefers_most_recent() {
        let store = store_with(&[
            (1, BoxGeometry::new(0.5, 0.5, 0.4, 0.4)),
            (2, BoxGeometry::new(0.55, 0.55, 0.3, 0.3)),
        ]);
        let top = store.list()[1].id;
        assert_eq!(store.hit_test(Point::new(0.5, 0.5)), Some(top));
        // Only the bottom box covers this point.
        let bottom = store.list()[0].id;
        assert_eq!(store.hit_test(Point::new(0.32, 0.32)), Some(bottom));
        assert_eq!(store.hit_test(Point::new(0.95, 0.05)), None);
    }

    #[test]
    fn test_replace_all_reseeds_ids() {
        let mut store = AnnotationStore::new();
        store.replace_all(vec![Annotation::manual(41, 1, BoxGeometry::new(0.5, 0.5, 0.1, 0.1))]);
        assert_eq!(store.allocate_id(), 42);
    }

    #[test]
    fn test_ids_stay_unique_after_clear() {
        let mut store = store_with(&[(1, BoxGeometry::new(0.5, 0.5, 0.1, 0.1))]);
        let old = store.list()[0].id;
        store.clear();
        assert!(store.is_empty());
        assert_ne!(store.allocate_id(), old);
    }

    #[test]
    fn test_save_request_drops_ids() {
        let store = store_with(&[(3, BoxGeometry::new(0.25, 0.5, 0.1, 0.2))]);
        let request = store.to_save_request();
        assert_eq!(request.status, "completed");
        assert_eq!(
            request.annotations,
            vec![SavedBox {
                class_id: 3,
                x_center: 0.25,
                y_center: 0.5,
                width: 0.1,
                height: 0.2,
            }]
        );
    }

    #[test]
    fn test_from_stored_defaults() {
        let stored = StoredAnnotation {
            id: Some(900),
            class_id: 2,
            class_name: Some("car".to_string()),
            x_center: 0.1,
            y_center: 0.2,
            width: 0.3,
            height: 0.4,
            confidence: None,
            is_predicted: None,
        };
        let ann = Annotation::from_stored(7, &stored);
        assert_eq!(ann.id, 7);
        assert_eq!(ann.confidence, 1.0);
        assert!(!ann.is_predicted);
    }

    #[test]
    fn test_annotation_json_is_flat() {
        let ann = Annotation::manual(1, 2, BoxGeometry::new(0.5, 0.5, 0.2, 0.2));
        let value = serde_json::to_value(&ann).expect("serialize");
        assert_eq!(value["x_center"], 0.5);
        assert_eq!(value["class_id"], 2);
        assert_eq!(value["is_predicted"], false);
    }
}

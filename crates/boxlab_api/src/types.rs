//! Wire types for the backend's JSON endpoints.
//!
//! Box geometry is always normalized center + extent relative to the
//! source image's own pixel dimensions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Project identifier.
pub type ProjectId = i64;
/// Image identifier.
pub type ImageId = i64;
/// Project class identifier.
pub type ClassId = i64;

/// Image status value the backend uses for finished images.
pub const STATUS_COMPLETED: &str = "completed";

/// A project class as returned by `GET /api/projects/{id}/classes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassInfo {
    pub id: ClassId,
    pub name: String,
    /// CSS-style color, usually `#RRGGBB`.
    #[serde(default = "default_class_color")]
    pub color: String,
}

fn default_class_color() -> String {
    "#FF0000".to_string()
}

/// One uploaded image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub id: ImageId,
    pub filename: String,
    /// Natural size as recorded at upload. May be null for older rows.
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub uploaded_at: Option<String>,
}

impl ImageInfo {
    /// Whether the image has been saved as completed.
    pub fn is_completed(&self) -> bool {
        self.status == STATUS_COMPLETED
    }
}

/// A group of images uploaded together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    #[serde(default)]
    pub batch_id: Option<String>,
    #[serde(default)]
    pub count: usize,
    pub images: Vec<ImageInfo>,
}

/// Response of `GET /api/projects/{id}/images`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageList {
    pub batches: Vec<Batch>,
}

impl ImageList {
    /// All images across batches, in batch order.
    pub fn into_images(self) -> Vec<ImageInfo> {
        self.batches.into_iter().flat_map(|b| b.images).collect()
    }
}

/// An annotation as stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAnnotation {
    #[serde(default)]
    pub id: Option<i64>,
    pub class_id: ClassId,
    #[serde(default)]
    pub class_name: Option<String>,
    pub x_center: f64,
    pub y_center: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub is_predicted: Option<bool>,
}

/// Response of `GET /api/images/{id}/annotations`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationsResponse {
    pub annotations: Vec<StoredAnnotation>,
}

/// A persisted box. Ids are not part of the persisted schema.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SavedBox {
    pub class_id: ClassId,
    pub x_center: f64,
    pub y_center: f64,
    pub width: f64,
    pub height: f64,
}

/// Body of `POST /api/images/{id}/annotations`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveAnnotationsRequest {
    pub annotations: Vec<SavedBox>,
    pub status: String,
}

impl SaveAnnotationsRequest {
    /// Build a request that marks the image completed.
    pub fn completed(annotations: Vec<SavedBox>) -> Self {
        Self {
            annotations,
            status: STATUS_COMPLETED.to_string(),
        }
    }
}

/// A class known to an external model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelClass {
    pub id: u32,
    pub name: String,
}

/// A model file found in an external model directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalModel {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub classes: Vec<ModelClass>,
}

/// A directory of external model files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalModelDir {
    pub model_dir: String,
    pub models: Vec<ExternalModel>,
}

/// Response of `GET /api/projects/{id}/external-models`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalModelsResponse {
    pub models: Vec<ExternalModelDir>,
}

/// A training job summary from the project details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingJob {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub model_size: Option<String>,
    pub status: String,
    #[serde(default)]
    pub model_path: Option<String>,
}

impl TrainingJob {
    /// Only completed jobs that produced a model file can be used for prediction.
    pub fn is_usable(&self) -> bool {
        self.status == STATUS_COMPLETED && self.model_path.is_some()
    }
}

/// A user-uploaded model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomModel {
    pub id: i64,
    pub name: String,
    pub file_path: String,
}

/// Response of `GET /api/projects/{id}`; only the fields the editor needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDetails {
    pub id: ProjectId,
    pub name: String,
    #[serde(default)]
    pub training_jobs: Vec<TrainingJob>,
    #[serde(default)]
    pub custom_models: Vec<CustomModel>,
}

/// Body of `POST /api/projects/{id}/predict`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictRequest {
    pub image_id: ImageId,
    pub confidence: f64,
    /// `None` asks the backend for the latest trained model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_path: Option<String>,
}

/// Body of `POST /api/projects/{id}/use-external-model`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalModelRequest {
    pub model_path: String,
    pub image_id: ImageId,
    pub confidence: f64,
    /// Model class id to project class id. JSON object keys are strings.
    pub class_mapping: BTreeMap<u32, ClassId>,
}

/// One detected box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub class_id: ClassId,
    pub x_center: f64,
    pub y_center: f64,
    pub width: f64,
    pub height: f64,
    pub confidence: f64,
}

/// Response of both prediction endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub predictions: Vec<Prediction>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_list_flattens_batches_in_order() {
        let json = r#"{
            "batches": [
                {"batch_id": "b1", "count": 2, "images": [
                    {"id": 1, "filename": "a.jpg", "width": 640, "height": 480, "status": "completed", "uploaded_at": "2024-01-01T00:00:00"},
                    {"id": 2, "filename": "b.jpg", "width": 640, "height": 480, "status": "pending", "uploaded_at": null}
                ]},
                {"batch_id": null, "count": 1, "images": [
                    {"id": 3, "filename": "c.jpg", "width": 100, "height": 100, "status": "pending"}
                ]}
            ]
        }"#;
        let list: ImageList = serde_json::from_str(json).expect("parse image list");
        let images = list.into_images();
        assert_eq!(images.iter().map(|i| i.id).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(images[0].is_completed());
        assert!(!images[1].is_completed());
        assert_eq!(images[2].width, Some(100));
    }

    #[test]
    fn test_image_with_null_size_still_parses() {
        let json = r#"{"batches": [{"batch_id": "b", "count": 2, "images": [
            {"id": 1, "filename": "a.jpg", "width": null, "height": null, "status": "pending"},
            {"id": 2, "filename": "b.jpg", "status": "pending"}
        ]}]}"#;
        let list: ImageList = serde_json::from_str(json).expect("parse image list");
        let images = list.into_images();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].width, None);
        assert_eq!(images[1].height, None);
    }

    #[test]
    fn test_stored_annotation_optional_fields() {
        let json = r#"{"class_id": 4, "x_center": 0.5, "y_center": 0.5, "width": 0.1, "height": 0.2}"#;
        let ann: StoredAnnotation = serde_json::from_str(json).expect("parse annotation");
        assert_eq!(ann.class_id, 4);
        assert_eq!(ann.confidence, None);
        assert_eq!(ann.is_predicted, None);
    }

    #[test]
    fn test_save_request_shape() {
        let request = SaveAnnotationsRequest::completed(vec![SavedBox {
            class_id: 2,
            x_center: 0.25,
            y_center: 0.75,
            width: 0.5,
            height: 0.125,
        }]);
        let value = serde_json::to_value(&request).expect("serialize");
        assert_eq!(value["status"], "completed");
        assert_eq!(value["annotations"][0]["class_id"], 2);
        assert!(value["annotations"][0].get("id").is_none());
    }

    #[test]
    fn test_predict_request_omits_missing_model_path() {
        let request = PredictRequest {
            image_id: 7,
            confidence: 0.5,
            model_path: None,
        };
        let value = serde_json::to_value(&request).expect("serialize");
        assert!(value.get("model_path").is_none());
        assert_eq!(value["image_id"], 7);
    }

    #[test]
    fn test_class_mapping_keys_serialize_as_strings() {
        let mut class_mapping = BTreeMap::new();
        class_mapping.insert(0, 11);
        class_mapping.insert(3, 14);
        let request = ExternalModelRequest {
            model_path: "models/best.pt".to_string(),
            image_id: 1,
            confidence: 0.25,
            class_mapping,
        };
        let json = serde_json::to_string(&request).expect("serialize");
        assert!(json.contains(r#""class_mapping":{"0":11,"3":14}"#));
    }

    #[test]
    fn test_training_job_usability() {
        let job = TrainingJob {
            id: 1,
            name: "run".to_string(),
            model_size: Some("n".to_string()),
            status: "completed".to_string(),
            model_path: None,
        };
        assert!(!job.is_usable());
        let job = TrainingJob {
            model_path: Some("runs/best.pt".to_string()),
            ..job
        };
        assert!(job.is_usable());
    }

    #[test]
    fn test_class_color_default() {
        let class: ClassInfo = serde_json::from_str(r#"{"id": 1, "name": "car"}"#).expect("parse");
        assert_eq!(class.color, "#FF0000");
    }
}

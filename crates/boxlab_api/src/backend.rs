//! The backend seam used by editor sessions.

use async_trait::async_trait;

use crate::error::ApiError;
use crate::types::{
    ClassInfo, ExternalModelDir, ExternalModelRequest, ImageId, ImageList, PredictRequest,
    Prediction, ProjectDetails, ProjectId, SaveAnnotationsRequest, StoredAnnotation,
};

/// Everything the editor needs from the annotation backend.
///
/// Calls are independent: there is no cancellation and no ordering
/// guarantee beyond what the caller enforces by awaiting.
#[async_trait]
pub trait Backend: Send + Sync {
    /// `GET /api/projects/{id}/classes`
    async fn classes(&self, project_id: ProjectId) -> Result<Vec<ClassInfo>, ApiError>;

    /// `GET /api/projects/{id}/images`
    async fn images(&self, project_id: ProjectId) -> Result<ImageList, ApiError>;

    /// `GET /api/projects/{id}`
    async fn project(&self, project_id: ProjectId) -> Result<ProjectDetails, ApiError>;

    /// `GET /api/images/{id}`, the raw encoded image.
    async fn image_bytes(&self, image_id: ImageId) -> Result<Vec<u8>, ApiError>;

    /// `GET /api/images/{id}/annotations`
    async fn annotations(&self, image_id: ImageId) -> Result<Vec<StoredAnnotation>, ApiError>;

    /// `POST /api/images/{id}/annotations`
    async fn save_annotations(
        &self,
        image_id: ImageId,
        request: &SaveAnnotationsRequest,
    ) -> Result<(), ApiError>;

    /// `GET /api/projects/{id}/external-models`
    async fn external_models(&self, project_id: ProjectId)
        -> Result<Vec<ExternalModelDir>, ApiError>;

    /// `POST /api/projects/{id}/predict`
    async fn predict(
        &self,
        project_id: ProjectId,
        request: &PredictRequest,
    ) -> Result<Vec<Prediction>, ApiError>;

    /// `POST /api/projects/{id}/use-external-model`
    async fn predict_external(
        &self,
        project_id: ProjectId,
        request: &ExternalModelRequest,
    ) -> Result<Vec<Prediction>, ApiError>;
}

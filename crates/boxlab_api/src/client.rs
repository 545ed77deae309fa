//! HTTP implementation of [`Backend`] using [`reqwest`].

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::backend::Backend;
use crate::error::ApiError;
use crate::types::{
    AnnotationsResponse, ClassInfo, ExternalModelDir, ExternalModelRequest, ExternalModelsResponse,
    ImageId, ImageList, PredictRequest, Prediction, PredictionResponse, ProjectDetails, ProjectId,
    SaveAnnotationsRequest, StoredAnnotation,
};

/// HTTP client for one backend instance.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    /// Create a client for a backend.
    ///
    /// * `base_url` - e.g. `http://localhost:5000`. A trailing slash is ignored.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Result<Self, ApiError> {
        let base_url = base_url.into();
        let trimmed = base_url.trim_end_matches('/');
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(ApiError::InvalidBaseUrl(base_url));
        }
        Ok(Self {
            client,
            base_url: trimmed.to_string(),
        })
    }

    /// The normalized base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        log::debug!("GET {}", path);
        let response = self.client.get(self.url(path)).send().await?;
        Self::parse_response(response).await
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: serde::Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        log::debug!("POST {}", path);
        let response = self.client.post(self.url(path)).json(body).send().await?;
        Self::parse_response(response).await
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let response = Self::ensure_success(response).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn classes(&self, project_id: ProjectId) -> Result<Vec<ClassInfo>, ApiError> {
        self.get_json(&format!("/api/projects/{project_id}/classes")).await
    }

    async fn images(&self, project_id: ProjectId) -> Result<ImageList, ApiError> {
        self.get_json(&format!("/api/projects/{project_id}/images")).await
    }

    async fn project(&self, project_id: ProjectId) -> Result<ProjectDetails, ApiError> {
        self.get_json(&format!("/api/projects/{project_id}")).await
    }

    async fn image_bytes(&self, image_id: ImageId) -> Result<Vec<u8>, ApiError> {
        let path = format!("/api/images/{image_id}");
        log::debug!("GET {}", path);
        let response = self.client.get(self.url(&path)).send().await?;
        let response = Self::ensure_success(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn annotations(&self, image_id: ImageId) -> Result<Vec<StoredAnnotation>, ApiError> {
        let response: AnnotationsResponse = self
            .get_json(&format!("/api/images/{image_id}/annotations"))
            .await?;
        Ok(response.annotations)
    }

    async fn save_annotations(
        &self,
        image_id: ImageId,
        request: &SaveAnnotationsRequest,
    ) -> Result<(), ApiError> {
        let path = format!("/api/images/{image_id}/annotations");
        log::debug!("POST {} ({} boxes)", path, request.annotations.len());
        let response = self.client.post(self.url(&path)).json(request).send().await?;
        // No content contract beyond success/failure.
        Self::ensure_success(response).await?;
        Ok(())
    }

    async fn external_models(
        &self,
        project_id: ProjectId,
    ) -> Result<Vec<ExternalModelDir>, ApiError> {
        let response: ExternalModelsResponse = self
            .get_json(&format!("/api/projects/{project_id}/external-models"))
            .await?;
        Ok(response.models)
    }

    async fn predict(
        &self,
        project_id: ProjectId,
        request: &PredictRequest,
    ) -> Result<Vec<Prediction>, ApiError> {
        let response: PredictionResponse = self
            .post_json(&format!("/api/projects/{project_id}/predict"), request)
            .await?;
        Ok(response.predictions)
    }

    async fn predict_external(
        &self,
        project_id: ProjectId,
        request: &ExternalModelRequest,
    ) -> Result<Vec<Prediction>, ApiError> {
        let response: PredictionResponse = self
            .post_json(&format!("/api/projects/{project_id}/use-external-model"), request)
            .await?;
        Ok(response.predictions)
    }
}

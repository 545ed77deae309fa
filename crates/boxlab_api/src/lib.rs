//! Typed REST client for the boxlab annotation backend.
//!
//! The editor never talks HTTP directly. It goes through the [`Backend`]
//! trait so that sessions can be driven against a live server
//! ([`HttpBackend`]) or an in-memory double in tests.

mod backend;
mod client;
mod error;
mod types;

pub use backend::Backend;
pub use client::HttpBackend;
pub use error::ApiError;
pub use types::{
    AnnotationsResponse, Batch, ClassId, ClassInfo, CustomModel, ExternalModel, ExternalModelDir,
    ExternalModelRequest, ExternalModelsResponse, ImageId, ImageInfo, ImageList, ModelClass,
    PredictRequest, Prediction, PredictionResponse, ProjectDetails, ProjectId, SaveAnnotationsRequest,
    SavedBox, StoredAnnotation, TrainingJob, STATUS_COMPLETED,
};

//! Error types for editor sessions.

use boxlab_api::{ApiError, ImageId};
use thiserror::Error;

/// Errors that can occur while driving an editing session.
#[derive(Error, Debug)]
pub enum SessionError {
    /// A backend call failed
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The image filter left nothing to annotate
    #[error("No {filter} images to annotate")]
    EmptyImageSet {
        /// Filter name as shown to the user
        filter: String,
    },

    /// An operation needs a loaded image
    #[error("No image is loaded")]
    NoCurrentImage,

    /// No image bytes and no recorded size to lay the canvas out with
    #[error("Image {image_id} has no content and no recorded size")]
    UnknownSize { image_id: ImageId },

    /// The backend returned bytes that are not a supported image
    #[error("Failed to decode image {image_id}: {source}")]
    Decode {
        image_id: ImageId,
        #[source]
        source: image::ImageError,
    },
}

impl SessionError {
    /// Create a decode error for an image.
    pub fn decode(image_id: ImageId, source: image::ImageError) -> Self {
        Self::Decode { image_id, source }
    }
}

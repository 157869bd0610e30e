//! Image generator trait.

use crate::error::Result;
use crate::image::types::{GenerationRequest, ImageResult};
use async_trait::async_trait;
use std::path::Path;

/// Trait for services that turn a prompt into downloadable images.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Requests images for `request`. Never retried.
    ///
    /// Fails with [`Error::NoImagesInResponse`](crate::Error::NoImagesInResponse)
    /// rather than returning an empty list.
    async fn generate_image(&self, request: &GenerationRequest) -> Result<Vec<ImageResult>>;

    /// Downloads one image to `destination`.
    ///
    /// Returns false on any failure; the error is logged, not propagated.
    async fn download_image(&self, image: &ImageResult, destination: &Path) -> bool;

    /// Returns the name of this generator for display.
    fn name(&self) -> &str;
}

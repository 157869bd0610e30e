//! Alibaba Cloud Bailian (DashScope) multimodal image generation.

use crate::config::{Config, DEFAULT_MODEL};
use crate::error::{sanitize_error_message, Error, Result};
use crate::image::provider::ImageGenerator;
use crate::image::types::{
    GenerationRequest, ImageResult, ImageSource, WireError, WireRequest, WireResponse,
};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;

/// Multimodal-generation endpoint.
pub const DEFAULT_ENDPOINT: &str =
    "https://dashscope.aliyuncs.com/api/v1/services/aigc/multimodal-generation/generation";

const GENERATE_TIMEOUT: Duration = Duration::from_secs(60);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Characters of an image URL shown in logs.
const URL_LOG_CHARS: usize = 80;

/// Builder for DashScopeClient.
#[derive(Debug, Clone)]
pub struct DashScopeClientBuilder {
    api_key: String,
    model: String,
    endpoint: String,
    generate_timeout: Duration,
    download_timeout: Duration,
}

impl DashScopeClientBuilder {
    /// Creates a builder with the API key and model from `config`.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.api_key()).model(config.model())
    }

    /// Creates a new builder with default settings.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            generate_timeout: GENERATE_TIMEOUT,
            download_timeout: DOWNLOAD_TIMEOUT,
        }
    }

    /// Sets the model name (default: `qwen-image-max`).
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Overrides the generation endpoint URL.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Sets the timeout for the generation call (default: 60s).
    pub fn generate_timeout(mut self, timeout: Duration) -> Self {
        self.generate_timeout = timeout;
        self
    }

    /// Sets the connect and per-read timeout for image downloads (default: 30s).
    pub fn download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = timeout;
        self
    }

    /// Builds the client.
    pub fn build(self) -> Result<DashScopeClient> {
        let client = reqwest::Client::builder().build().map_err(Error::Network)?;
        // Downloads are bounded per read, not in total.
        let download_client = reqwest::Client::builder()
            .connect_timeout(self.download_timeout)
            .read_timeout(self.download_timeout)
            .build()
            .map_err(Error::Network)?;

        Ok(DashScopeClient {
            client,
            download_client,
            api_key: self.api_key,
            model: self.model,
            endpoint: self.endpoint,
            generate_timeout: self.generate_timeout,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Downloaded {
    bytes: u64,
    declared_len: Option<u64>,
}

impl Downloaded {
    fn length_mismatch(&self) -> bool {
        matches!(self.declared_len, Some(declared) if declared > 0 && declared != self.bytes)
    }
}

/// DashScope image generation client.
pub struct DashScopeClient {
    client: reqwest::Client,
    download_client: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
    generate_timeout: Duration,
}

impl DashScopeClient {
    /// Creates a new `DashScopeClientBuilder`.
    pub fn builder(api_key: impl Into<String>) -> DashScopeClientBuilder {
        DashScopeClientBuilder::new(api_key)
    }

    fn request_error(&self, err: reqwest::Error) -> Error {
        let err = Error::from_reqwest(err, self.generate_timeout);
        match &err {
            Error::RequestTimeout(_) => tracing::error!("API request timed out, try again later"),
            Error::Network(source) => tracing::error!(error = ?source, "network request failed"),
            _ => {}
        }
        err
    }

    fn parse_error(&self, status: StatusCode, text: &str) -> Error {
        tracing::error!(status = status.as_u16(), "API request failed");
        tracing::error!(body = %sanitize_error_message(text), "error details");

        let parsed = serde_json::from_str::<WireError>(text).ok();
        let code = parsed.as_ref().and_then(|e| e.code.clone());
        let message = match parsed.and_then(|e| e.message) {
            Some(message) => {
                tracing::error!(message = %message, "API error message");
                message
            }
            None if text.trim().is_empty() => status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string(),
            None => sanitize_error_message(text),
        };

        Error::ApiRequestFailed {
            status: status.as_u16(),
            code,
            message,
        }
    }

    fn extract_images(&self, response: &WireResponse) -> Option<Vec<ImageResult>> {
        let images = response
            .output
            .as_ref()
            .and_then(ImageSource::from_output)
            .map(ImageSource::into_images);

        if let Some(request_id) = &response.request_id {
            tracing::info!(request_id = %request_id, "DashScope request id");
        }
        if let Some(usage) = &response.usage {
            let found = images.as_ref().map_or(0, Vec::len);
            tracing::info!(
                width = ?usage.width,
                height = ?usage.height,
                image_count = usage.image_count.unwrap_or(found as u32),
                "usage"
            );
        }

        images
    }

    async fn fetch_image(&self, image: &ImageResult, destination: &Path) -> Result<Downloaded> {
        let url = image
            .url()
            .ok_or_else(|| Error::DownloadFailed("image result has no URL".into()))?;
        let shown: String = url.chars().take(URL_LOG_CHARS).collect();
        tracing::info!("downloading image: {shown}...");

        let response = self
            .download_client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::DownloadFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::DownloadFailed(format!("HTTP {status} from {shown}")));
        }

        let declared_len = response.content_length();
        if let Err(e) = write_body(response, destination, declared_len).await {
            // Best effort; the write error is what gets reported.
            let _ = tokio::fs::remove_file(destination).await;
            return Err(e);
        }

        let bytes = tokio::fs::metadata(destination).await?.len();
        Ok(Downloaded {
            bytes,
            declared_len,
        })
    }
}

async fn write_body(
    mut response: reqwest::Response,
    destination: &Path,
    declared_len: Option<u64>,
) -> Result<()> {
    let mut file = tokio::fs::File::create(destination).await?;
    let mut written: u64 = 0;

    loop {
        let chunk = match response.chunk().await {
            Ok(Some(chunk)) => chunk,
            Ok(None) => break,
            // Connection closed before the declared length: keep what arrived.
            Err(e) if !e.is_timeout() && written > 0 && declared_len.is_some() => {
                tracing::warn!(error = %e, written, "image body ended early");
                break;
            }
            Err(e) => return Err(Error::DownloadFailed(e.to_string())),
        };
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;

        if let Some(total) = declared_len.filter(|total| *total > 0) {
            let percent = written as f64 / total as f64 * 100.0;
            tracing::debug!("download progress: {percent:.1}%");
        }
    }

    file.flush().await?;
    Ok(())
}

#[async_trait]
impl ImageGenerator for DashScopeClient {
    async fn generate_image(&self, request: &GenerationRequest) -> Result<Vec<ImageResult>> {
        let body = WireRequest::from_generation_request(request, &self.model);
        tracing::debug!(body = %serde_json::to_string_pretty(&body)?, "request body");

        tracing::info!("calling DashScope to generate images...");
        tracing::info!(model = %self.model, size = %request.size, "generation parameters");

        let start = Instant::now();
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .timeout(self.generate_timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| self.request_error(e))?;
        tracing::info!(
            "API request took {:.2}s",
            start.elapsed().as_secs_f64()
        );

        if status != StatusCode::OK {
            return Err(self.parse_error(status, &text));
        }

        let value: serde_json::Value = serde_json::from_str(&text)?;
        tracing::debug!(response = %value, "API response");

        let parsed = serde_json::from_value::<WireResponse>(value).unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to parse API response");
            WireResponse::default()
        });

        match self.extract_images(&parsed) {
            Some(images) => {
                tracing::info!(count = images.len(), "received images");
                Ok(images)
            }
            None => {
                tracing::error!(
                    response = %sanitize_error_message(&text),
                    "no image data in API response"
                );
                Err(Error::NoImagesInResponse)
            }
        }
    }

    async fn download_image(&self, image: &ImageResult, destination: &Path) -> bool {
        match self.fetch_image(image, destination).await {
            Ok(downloaded) => {
                if downloaded.length_mismatch() {
                    tracing::warn!(
                        expected = ?downloaded.declared_len,
                        actual = downloaded.bytes,
                        "downloaded file size does not match Content-Length"
                    );
                }
                tracing::info!(
                    path = %destination.display(),
                    bytes = downloaded.bytes,
                    "image saved"
                );
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to download image");
                false
            }
        }
    }

    fn name(&self) -> &str {
        "Bailian (DashScope)"
    }
}

//! Image loading abstraction.
//!
//! The core pipeline depends only on the capability of turning an identifier
//! (normally a URL) into a decoded pixel image. This module defines that
//! capability as the [`ImageLoader`] trait, with a `reqwest`-backed
//! implementation for network fetches and a caching decorator in
//! [`cache`]. The trait seam enables dependency injection and mock loaders
//! in tests.

mod cache;

pub use cache::CachedImageLoader;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use image::DynamicImage;
use thiserror::Error;

/// Default timeout for image downloads.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Errors that can occur while loading a single image.
///
/// These are local to one identifier: the fetch pipeline reports them on its
/// failure channel and keeps running.
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    /// The resource does not exist.
    #[error("image not found: {0}")]
    NotFound(String),

    /// The response's declared content type does not indicate an image.
    #[error("response for {identifier} is not an image (content type {content_type:?})")]
    NotAnImage {
        identifier: String,
        content_type: String,
    },

    /// The payload could not be decoded as an image.
    #[error("failed to decode {identifier}: {reason}")]
    Decode { identifier: String, reason: String },

    /// The transport failed (connection, timeout, non-success status).
    #[error("transport error for {identifier}: {reason}")]
    Transport { identifier: String, reason: String },
}

/// Capability of loading a decoded image by identifier.
///
/// Implementations must be thread-safe; the fetch worker pool calls
/// `load_image` concurrently from many tasks. The backing implementation may
/// be a network fetch, a cache-backed fetch, or anything else honoring the
/// same contract.
pub trait ImageLoader: Send + Sync {
    /// Loads and decodes the image identified by `identifier`.
    fn load_image(
        &self,
        identifier: &str,
    ) -> impl Future<Output = Result<DynamicImage, LoadError>> + Send;
}

impl<T: ImageLoader> ImageLoader for Arc<T> {
    async fn load_image(&self, identifier: &str) -> Result<DynamicImage, LoadError> {
        (**self).load_image(identifier).await
    }
}

/// HTTP image loader backed by `reqwest`.
///
/// Validates that the response's `Content-Type` header declares an image
/// before attempting to decode the body.
pub struct HttpImageLoader {
    client: reqwest::Client,
}

impl HttpImageLoader {
    /// Creates a new loader with the default timeout.
    pub fn new() -> Result<Self, LoadError> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a new loader with a custom request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, LoadError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LoadError::Transport {
                identifier: String::new(),
                reason: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client })
    }
}

impl ImageLoader for HttpImageLoader {
    async fn load_image(&self, identifier: &str) -> Result<DynamicImage, LoadError> {
        let response = self
            .client
            .get(identifier)
            .send()
            .await
            .map_err(|e| LoadError::Transport {
                identifier: identifier.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(LoadError::NotFound(identifier.to_string()));
        }
        if !status.is_success() {
            return Err(LoadError::Transport {
                identifier: identifier.to_string(),
                reason: format!("HTTP {}", status),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !content_type.contains("image/") {
            return Err(LoadError::NotAnImage {
                identifier: identifier.to_string(),
                content_type,
            });
        }

        let body = response.bytes().await.map_err(|e| LoadError::Transport {
            identifier: identifier.to_string(),
            reason: format!("failed to read response body: {}", e),
        })?;

        image::load_from_memory(&body).map_err(|e| LoadError::Decode {
            identifier: identifier.to_string(),
            reason: e.to_string(),
        })
    }
}

//! Remote gallery listing source.
//!
//! Tile candidates come from a paginated gallery API. A listing page is a
//! JSON envelope holding posted items (each with an image URL) and a
//! continuation cursor for the next page. The wire format is an external
//! contract: the client parses it permissively - unknown fields are
//! ignored, items without a usable URL are skipped - and only an absent
//! envelope is treated as malformed.
//!
//! Item URLs are rewritten to their small-thumbnail form (`.ext` ->
//! `s.ext`) before they are handed to the fetch pipeline, so workers
//! download kilobyte thumbnails instead of full-size photos.

mod pager;

pub use pager::SourcePager;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Default base URL for the gallery listing API.
const DEFAULT_BASE_URL: &str = "https://www.reddit.com/r";

/// User agent sent with listing requests; the API rejects anonymous clients.
const USER_AGENT: &str = concat!("photomosaic/", env!("CARGO_PKG_VERSION"));

/// Default timeout for listing requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Errors from the listing source. Fatal to the current fetch run.
#[derive(Debug, Clone, Error)]
pub enum GalleryError {
    /// The listing request itself failed.
    #[error("gallery listing request failed: {0}")]
    Transport(String),

    /// The listing response could not be interpreted.
    #[error("gallery listing payload malformed: {0}")]
    Malformed(String),
}

/// Opaque identifier of a remote tile image, produced by the listing source
/// and consumed exactly once by a fetch job.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CandidateUrl(String);

impl CandidateUrl {
    /// Wraps a raw URL string.
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    /// The URL as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CandidateUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One page of gallery listing results.
#[derive(Debug, Clone)]
pub struct GalleryPage {
    /// Candidate image URLs found on this page.
    pub items: Vec<CandidateUrl>,
    /// Continuation cursor for the next page; `None` when the source is
    /// exhausted.
    pub after: Option<String>,
}

/// Capability of listing one gallery page for a topic.
///
/// Implementations must be thread-safe so they can be shared behind `Arc`,
/// but per the pager contract only one caller drives pagination at a time.
pub trait ListingSource: Send + Sync {
    /// Requests the page at `cursor` (or the first page when `None`) for
    /// the given topic.
    fn list_page(
        &self,
        topic: &str,
        cursor: Option<&str>,
    ) -> impl Future<Output = Result<GalleryPage, GalleryError>> + Send;
}

impl<T: ListingSource> ListingSource for Arc<T> {
    async fn list_page(
        &self,
        topic: &str,
        cursor: Option<&str>,
    ) -> Result<GalleryPage, GalleryError> {
        (**self).list_page(topic, cursor).await
    }
}

// =============================================================================
// Wire format
// =============================================================================

/// Top-level listing envelope. `data` is the only critical field.
#[derive(Debug, Deserialize)]
struct ListingEnvelope {
    data: Option<ListingData>,
}

#[derive(Debug, Default, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<ListingItem>,
    #[serde(default)]
    after: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ListingItem {
    #[serde(default)]
    data: Option<ItemData>,
}

#[derive(Debug, Default, Deserialize)]
struct ItemData {
    #[serde(default)]
    url: Option<String>,
}

// =============================================================================
// HTTP client
// =============================================================================

/// HTTP gallery listing client.
///
/// Issues one GET per page against `{base_url}/{topic}.json?after={cursor}`
/// and extracts item URLs and the continuation cursor from the JSON payload.
pub struct HttpGalleryClient {
    client: reqwest::Client,
    base_url: String,
    thumb_re: Regex,
}

impl HttpGalleryClient {
    /// Creates a client against the default gallery API.
    pub fn new() -> Result<Self, GalleryError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Creates a client against a custom base URL (primarily for tests and
    /// self-hosted mirrors).
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, GalleryError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| GalleryError::Transport(format!("failed to create HTTP client: {}", e)))?;

        let thumb_re = Regex::new(r"\.([a-z]{3})$")
            .map_err(|e| GalleryError::Malformed(format!("invalid thumbnail pattern: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            thumb_re,
        })
    }

    fn page_url(&self, topic: &str, cursor: Option<&str>) -> String {
        match cursor {
            Some(after) => format!("{}/{}.json?after={}", self.base_url, topic, after),
            None => format!("{}/{}.json", self.base_url, topic),
        }
    }

    /// Rewrites an image URL to its small-thumbnail variant.
    fn thumbnail_url(&self, url: &str) -> String {
        self.thumb_re.replace(url, "s.$1").into_owned()
    }

    fn parse_page(&self, body: &[u8]) -> Result<GalleryPage, GalleryError> {
        let envelope: ListingEnvelope = serde_json::from_slice(body)
            .map_err(|e| GalleryError::Malformed(e.to_string()))?;

        let data = envelope
            .data
            .ok_or_else(|| GalleryError::Malformed("listing envelope has no data".to_string()))?;

        let items = data
            .children
            .into_iter()
            .filter_map(|item| item.data.and_then(|d| d.url))
            .map(|url| CandidateUrl::new(self.thumbnail_url(&url)))
            .collect();

        // An empty cursor means the same as a missing one: no further pages.
        let after = data.after.filter(|a| !a.is_empty());

        Ok(GalleryPage { items, after })
    }
}

impl ListingSource for HttpGalleryClient {
    async fn list_page(
        &self,
        topic: &str,
        cursor: Option<&str>,
    ) -> Result<GalleryPage, GalleryError> {
        let url = self.page_url(topic, cursor);
        debug!(%url, "requesting gallery page");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| GalleryError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GalleryError::Transport(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| GalleryError::Transport(format!("failed to read listing body: {}", e)))?;

        self.parse_page(&body)
    }
}

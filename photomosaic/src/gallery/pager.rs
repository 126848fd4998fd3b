//! Stateful iterator over a paginated gallery listing.

use tracing::debug;

use super::{CandidateUrl, GalleryError, ListingSource};

/// Stateful pager over a remote gallery listing.
///
/// Tracks the continuation cursor across calls and flips to exhausted when
/// the source reports no further pages. The pager is single-owner by
/// construction: `next_page` takes `&mut self`, so only one task (the fetch
/// aggregator) can drive pagination.
pub struct SourcePager<S: ListingSource> {
    source: S,
    topic: String,
    cursor: Option<String>,
    exhausted: bool,
    pages_requested: u64,
}

impl<S: ListingSource> SourcePager<S> {
    /// Creates a pager positioned at the start of the listing.
    pub fn new(source: S, topic: impl Into<String>) -> Self {
        Self {
            source,
            topic: topic.into(),
            cursor: None,
            exhausted: false,
            pages_requested: 0,
        }
    }

    /// Requests the next page of candidate URLs.
    ///
    /// Returns an empty list once the source is exhausted. Listing failures
    /// surface as [`GalleryError`]; they are not retried here - retry
    /// policy, if any, belongs to the transport.
    pub async fn next_page(&mut self) -> Result<Vec<CandidateUrl>, GalleryError> {
        if self.exhausted {
            return Ok(Vec::new());
        }

        let page = self
            .source
            .list_page(&self.topic, self.cursor.as_deref())
            .await?;
        self.pages_requested += 1;

        self.cursor = page.after;
        if self.cursor.is_none() {
            self.exhausted = true;
        }

        debug!(
            topic = %self.topic,
            items = page.items.len(),
            exhausted = self.exhausted,
            "gallery page loaded"
        );
        Ok(page.items)
    }

    /// True once the source has reported its final page.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Number of listing requests issued so far.
    pub fn pages_requested(&self) -> u64 {
        self.pages_requested
    }
}

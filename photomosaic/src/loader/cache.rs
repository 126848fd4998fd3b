//! Caching decorator for image loaders.
//!
//! Wraps any [`ImageLoader`] with get-or-populate semantics backed by
//! `moka::future::Cache`. Moka uses lock-free data structures internally,
//! making it safe to call from many concurrent fetch workers without
//! blocking the Tokio runtime. Entries are weighed by decoded pixel size so
//! the cache stays memory-bounded regardless of entry count.
//!
//! Failed loads are not cached; only successful fallback results populate
//! the cache.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use image::DynamicImage;
use moka::future::Cache;
use tracing::debug;

use super::{ImageLoader, LoadError};

/// Default memory bound for cached decoded images (256 MB).
const DEFAULT_MAX_SIZE_BYTES: u64 = 256 * 1024 * 1024;

/// Memory-bounded caching layer over an inner [`ImageLoader`].
///
/// A hit returns the cached decoded image without touching the inner
/// loader. A miss delegates to the inner loader and, on success, populates
/// the cache before returning.
pub struct CachedImageLoader<L: ImageLoader> {
    inner: L,
    cache: Cache<String, Arc<DynamicImage>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<L: ImageLoader> CachedImageLoader<L> {
    /// Creates a caching loader with the default memory bound.
    pub fn new(inner: L) -> Self {
        Self::with_max_size(inner, DEFAULT_MAX_SIZE_BYTES)
    }

    /// Creates a caching loader bounded to `max_size_bytes` of decoded
    /// pixel data.
    pub fn with_max_size(inner: L, max_size_bytes: u64) -> Self {
        let cache = Cache::builder()
            // Weigh each entry by its decoded size, not its entry count.
            .weigher(|_key: &String, value: &Arc<DynamicImage>| -> u32 {
                value.as_bytes().len().min(u32::MAX as usize) as u32
            })
            .max_capacity(max_size_bytes)
            .build();

        Self {
            inner,
            cache,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Number of cache hits since construction.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Number of cache misses since construction.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

impl<L: ImageLoader> ImageLoader for CachedImageLoader<L> {
    async fn load_image(&self, identifier: &str) -> Result<DynamicImage, LoadError> {
        if let Some(cached) = self.cache.get(identifier).await {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(identifier, "image cache hit");
            return Ok((*cached).clone());
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let image = self.inner.load_image(identifier).await?;
        self.cache
            .insert(identifier.to_string(), Arc::new(image.clone()))
            .await;
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    use image::RgbaImage;

    /// Inner loader counting how often it is actually invoked.
    struct CountingLoader {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingLoader {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl ImageLoader for CountingLoader {
        async fn load_image(&self, identifier: &str) -> Result<DynamicImage, LoadError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(LoadError::NotFound(identifier.to_string()))
            } else {
                Ok(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
                    2,
                    2,
                    image::Rgba([9, 9, 9, 255]),
                )))
            }
        }
    }

    #[tokio::test]
    async fn test_second_load_served_from_cache() {
        let loader = CachedImageLoader::new(CountingLoader::new(false));

        let first = loader.load_image("http://example.com/x.png").await.unwrap();
        let second = loader.load_image("http://example.com/x.png").await.unwrap();

        assert_eq!(first.as_bytes(), second.as_bytes());
        assert_eq!(loader.inner.calls(), 1);
        assert_eq!(loader.hits(), 1);
        assert_eq!(loader.misses(), 1);
    }

    #[tokio::test]
    async fn test_distinct_identifiers_miss_independently() {
        let loader = CachedImageLoader::new(CountingLoader::new(false));

        loader.load_image("http://example.com/a.png").await.unwrap();
        loader.load_image("http://example.com/b.png").await.unwrap();

        assert_eq!(loader.inner.calls(), 2);
        assert_eq!(loader.misses(), 2);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let loader = CachedImageLoader::new(CountingLoader::new(true));

        assert!(loader.load_image("http://example.com/x.png").await.is_err());
        assert!(loader.load_image("http://example.com/x.png").await.is_err());

        // Both attempts reached the inner loader.
        assert_eq!(loader.inner.calls(), 2);
        assert_eq!(loader.hits(), 0);
    }
}

//! High-level mosaic generation facade.
//!
//! [`MosaicService`] wires the listing source, image loader, fetch
//! pipeline, tile index, and composer behind a single entry point. One
//! service can run any number of generations; each run builds its own
//! pager and worker pool.
//!
//! # Example
//!
//! ```ignore
//! use photomosaic::config::MosaicConfig;
//! use photomosaic::gallery::HttpGalleryClient;
//! use photomosaic::loader::{CachedImageLoader, HttpImageLoader};
//! use photomosaic::service::MosaicService;
//!
//! let service = MosaicService::new(
//!     HttpGalleryClient::new()?,
//!     CachedImageLoader::new(HttpImageLoader::new()?),
//!     MosaicConfig::default().with_topic("earthporn"),
//! );
//! let canvas = service.generate("https://example.com/input.png").await?;
//! ```

use std::sync::Arc;

use image::{DynamicImage, RgbaImage};
use tracing::info;

use crate::config::MosaicConfig;
use crate::error::MosaicError;
use crate::fetch::FetchPipeline;
use crate::gallery::{ListingSource, SourcePager};
use crate::loader::ImageLoader;
use crate::mosaic::MosaicComposer;
use crate::tile::TileIndex;

/// Facade coordinating a full mosaic generation.
pub struct MosaicService<S, L>
where
    S: ListingSource,
    L: ImageLoader + 'static,
{
    listing: Arc<S>,
    loader: Arc<L>,
    config: MosaicConfig,
}

impl<S, L> MosaicService<S, L>
where
    S: ListingSource,
    L: ImageLoader + 'static,
{
    /// Creates a service over the given collaborators.
    pub fn new(listing: S, loader: L, config: MosaicConfig) -> Self {
        Self {
            listing: Arc::new(listing),
            loader: Arc::new(loader),
            config,
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &MosaicConfig {
        &self.config
    }

    /// Generates a mosaic for the image at `input_identifier`.
    ///
    /// The input is loaded through the service's image loader, so a caching
    /// loader short-circuits repeated generations from the same input.
    pub async fn generate(&self, input_identifier: &str) -> Result<RgbaImage, MosaicError> {
        self.config.validate()?;
        let input = self.loader.load_image(input_identifier).await?;
        self.generate_from_image(&input).await
    }

    /// Generates a mosaic for an already-decoded input image.
    pub async fn generate_from_image(
        &self,
        input: &DynamicImage,
    ) -> Result<RgbaImage, MosaicError> {
        self.config.validate()?;

        info!(
            topic = %self.config.topic,
            requested = self.config.target_count,
            tile_size = self.config.tile_size,
            strategy = ?self.config.strategy,
            input_w = input.width(),
            input_h = input.height(),
            "generating mosaic"
        );

        let pager = SourcePager::new(Arc::clone(&self.listing), &self.config.topic);
        let pipeline = FetchPipeline::new(
            pager,
            Arc::clone(&self.loader),
            self.config.pipeline_config(),
        );
        let tiles = pipeline.run().await?;

        let index = TileIndex::new(tiles)?;
        let composer = MosaicComposer::new(self.config.tile_size, self.config.strategy)?;
        let canvas = composer.compose(input, &index)?;

        info!(
            out_w = canvas.width(),
            out_h = canvas.height(),
            tiles = index.len(),
            "mosaic complete"
        );
        Ok(canvas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gallery::{CandidateUrl, GalleryError, GalleryPage};
    use crate::loader::{tests::MockImageLoader, LoadError};
    use crate::tile::MatchStrategy;
    use image::RgbaImage;

    /// Endless single-color gallery for service-level tests.
    struct EndlessSource;

    impl ListingSource for EndlessSource {
        async fn list_page(
            &self,
            _topic: &str,
            cursor: Option<&str>,
        ) -> Result<GalleryPage, GalleryError> {
            let page: usize = cursor.map_or(0, |c| c.parse().unwrap());
            let items = (0..8)
                .map(|i| CandidateUrl::new(format!("http://example.com/{}/{}.jpg", page, i)))
                .collect();
            Ok(GalleryPage {
                items,
                after: Some((page + 1).to_string()),
            })
        }
    }

    fn small_config() -> MosaicConfig {
        MosaicConfig::default()
            .with_target_count(4)
            .with_tile_size(10)
            .with_worker_count(2)
    }

    #[tokio::test]
    async fn test_generate_from_image_produces_grid_sized_canvas() {
        let service = MosaicService::new(
            EndlessSource,
            MockImageLoader::with_solid_image(40, 40, [80, 90, 100, 255]),
            small_config(),
        );

        let input = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            35,
            27,
            image::Rgba([80, 90, 100, 255]),
        ));
        let canvas = service.generate_from_image(&input).await.unwrap();
        // 35x27 at tile size 10 -> 3x2 grid -> 30x20 canvas.
        assert_eq!(canvas.dimensions(), (30, 20));
    }

    #[tokio::test]
    async fn test_generate_loads_input_through_loader() {
        let service = MosaicService::new(
            EndlessSource,
            MockImageLoader::with_solid_image(40, 40, [10, 10, 10, 255]),
            small_config(),
        );

        let canvas = service.generate("http://example.com/input.png").await.unwrap();
        assert_eq!(canvas.dimensions(), (40, 40));
    }

    #[tokio::test]
    async fn test_unloadable_input_surfaces_as_input_error() {
        let service = MosaicService::new(
            EndlessSource,
            MockImageLoader {
                response: Err(LoadError::NotFound("http://example.com/input.png".into())),
            },
            small_config(),
        );

        let err = service
            .generate("http://example.com/input.png")
            .await
            .unwrap_err();
        assert!(matches!(err, MosaicError::InputImage(_)));
    }

    #[tokio::test]
    async fn test_invalid_config_rejected_before_any_work() {
        let service = MosaicService::new(
            EndlessSource,
            MockImageLoader::with_solid_image(40, 40, [10, 10, 10, 255]),
            small_config().with_tile_size(0),
        );

        let input = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            30,
            30,
            image::Rgba([1, 1, 1, 255]),
        ));
        let err = service.generate_from_image(&input).await.unwrap_err();
        assert!(matches!(err, MosaicError::Config(_)));
    }

    #[tokio::test]
    async fn test_variance_strategy_end_to_end() {
        let service = MosaicService::new(
            EndlessSource,
            MockImageLoader::with_solid_image(40, 40, [60, 60, 60, 255]),
            small_config().with_strategy(MatchStrategy::ImageVariance),
        );

        let input = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            20,
            20,
            image::Rgba([60, 60, 60, 255]),
        ));
        let canvas = service.generate_from_image(&input).await.unwrap();
        assert_eq!(canvas.dimensions(), (20, 20));
    }
}

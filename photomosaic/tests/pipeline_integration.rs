//! Integration tests for the fetch pipeline and mosaic service.
//!
//! Exercises the full pager -> worker pool -> aggregator -> index ->
//! composer path against scripted collaborators, with no network access.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use image::{DynamicImage, Rgba, RgbaImage};

use photomosaic::config::MosaicConfig;
use photomosaic::fetch::{FetchError, FetchPipeline, PipelineConfig};
use photomosaic::gallery::{
    CandidateUrl, GalleryError, GalleryPage, ListingSource, SourcePager,
};
use photomosaic::loader::{ImageLoader, LoadError};
use photomosaic::service::MosaicService;
use photomosaic::tile::MatchStrategy;

/// Scripted gallery: serves the given pages in order, then exhausts.
struct ScriptedGallery {
    pages: Vec<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedGallery {
    fn new(pages: Vec<Vec<String>>) -> Self {
        Self {
            pages,
            calls: AtomicUsize::new(0),
        }
    }
}

impl ListingSource for ScriptedGallery {
    async fn list_page(
        &self,
        _topic: &str,
        cursor: Option<&str>,
    ) -> Result<GalleryPage, GalleryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let index: usize = cursor.map_or(0, |c| c.parse().unwrap());
        let items = self.pages[index].iter().map(CandidateUrl::new).collect();
        let after = (index + 1 < self.pages.len()).then(|| (index + 1).to_string());
        Ok(GalleryPage { items, after })
    }
}

/// Gallery with unlimited pages of synthetic URLs.
struct EndlessGallery {
    page_size: usize,
    calls: AtomicUsize,
}

impl EndlessGallery {
    fn new(page_size: usize) -> Self {
        Self {
            page_size,
            calls: AtomicUsize::new(0),
        }
    }
}

impl ListingSource for EndlessGallery {
    async fn list_page(
        &self,
        _topic: &str,
        cursor: Option<&str>,
    ) -> Result<GalleryPage, GalleryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let page: usize = cursor.map_or(0, |c| c.parse().unwrap());
        let items = (0..self.page_size)
            .map(|i| CandidateUrl::new(format!("http://tiles.example/{}/{}.jpg", page, i)))
            .collect();
        Ok(GalleryPage {
            items,
            after: Some((page + 1).to_string()),
        })
    }
}

/// Loader producing solid-color images keyed by URL substring.
///
/// URLs containing "bad" fail to decode; "black"/"white" yield those
/// colors; anything else is mid-gray.
struct PaletteLoader {
    calls: AtomicUsize,
}

impl PaletteLoader {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    fn solid(pixel: [u8; 4]) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(48, 48, Rgba(pixel)))
    }
}

impl ImageLoader for PaletteLoader {
    async fn load_image(&self, identifier: &str) -> Result<DynamicImage, LoadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if identifier.contains("bad") {
            return Err(LoadError::Decode {
                identifier: identifier.to_string(),
                reason: "corrupt payload".into(),
            });
        }
        if identifier.contains("black") {
            return Ok(Self::solid([0, 0, 0, 255]));
        }
        if identifier.contains("white") {
            return Ok(Self::solid([255, 255, 255, 255]));
        }
        Ok(Self::solid([128, 128, 128, 255]))
    }
}

fn pipeline_config(target: usize) -> PipelineConfig {
    PipelineConfig::default()
        .with_target_count(target)
        .with_tile_size(8)
        .with_worker_count(4)
}

#[tokio::test(flavor = "multi_thread")]
async fn pipeline_collects_exact_target_across_pages_with_failures() {
    // Pages of 3 where 2 fail on average: the pipeline must keep paging
    // until exactly 5 tiles succeed.
    let pages = (0..12)
        .map(|p| {
            vec![
                format!("http://tiles.example/{}/good.jpg", p),
                format!("http://tiles.example/{}/bad-1.jpg", p),
                format!("http://tiles.example/{}/bad-2.jpg", p),
            ]
        })
        .collect();
    let gallery = Arc::new(ScriptedGallery::new(pages));
    let pager = SourcePager::new(Arc::clone(&gallery), "pics");

    let tiles = FetchPipeline::new(pager, Arc::new(PaletteLoader::new()), pipeline_config(5))
        .run()
        .await
        .expect("five good candidates exist");

    assert_eq!(tiles.len(), 5);
    for tile in &tiles {
        assert_eq!(tile.image().dimensions(), (8, 8));
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn pipeline_never_pages_past_a_satisfied_target() {
    let gallery = Arc::new(EndlessGallery::new(100));
    let pager = SourcePager::new(Arc::clone(&gallery), "pics");

    let tiles = FetchPipeline::new(pager, Arc::new(PaletteLoader::new()), pipeline_config(6))
        .run()
        .await
        .unwrap();

    assert_eq!(tiles.len(), 6);
    // 100 candidates per page and a target of 6: one listing request.
    assert_eq!(gallery.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn exhausted_gallery_accounts_for_every_dispatched_job() {
    let pages = vec![
        vec![
            "http://tiles.example/0/good.jpg".to_string(),
            "http://tiles.example/0/bad-1.jpg".to_string(),
        ],
        vec![
            "http://tiles.example/1/good.jpg".to_string(),
            "http://tiles.example/1/bad-2.jpg".to_string(),
        ],
    ];
    let gallery = Arc::new(ScriptedGallery::new(pages));
    let pager = SourcePager::new(Arc::clone(&gallery), "pics");

    let err = FetchPipeline::new(pager, Arc::new(PaletteLoader::new()), pipeline_config(10))
        .run()
        .await
        .unwrap_err();

    match err {
        FetchError::InsufficientTiles {
            requested,
            collected,
            failed,
        } => {
            assert_eq!(requested, 10);
            assert_eq!(collected, 2);
            assert_eq!(failed, 2);
            // Nothing dispatched is silently dropped from the report.
            assert_eq!(collected + failed, 4);
        }
        other => panic!("expected InsufficientTiles, got {:?}", other),
    }
}

#[tokio::test]
async fn listing_outage_fails_the_whole_run() {
    struct OutageGallery;
    impl ListingSource for OutageGallery {
        async fn list_page(
            &self,
            _topic: &str,
            _cursor: Option<&str>,
        ) -> Result<GalleryPage, GalleryError> {
            Err(GalleryError::Transport("upstream 503".into()))
        }
    }

    let pager = SourcePager::new(OutageGallery, "pics");
    let err = FetchPipeline::new(pager, Arc::new(PaletteLoader::new()), pipeline_config(3))
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::SourceUnavailable(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn service_builds_exact_grid_from_100px_input() {
    // The canonical scenario: 100x100 input at tile size 25 gives a 4x4
    // grid of 16 independently matched cells and a 100x100 canvas.
    let gallery = EndlessGallery::new(16);
    let config = MosaicConfig::default()
        .with_target_count(4)
        .with_tile_size(25)
        .with_worker_count(4);
    let service = MosaicService::new(gallery, PaletteLoader::new(), config);

    let input = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
        100,
        100,
        Rgba([128, 128, 128, 255]),
    ));
    let canvas = service.generate_from_image(&input).await.unwrap();
    assert_eq!(canvas.dimensions(), (100, 100));
}

#[tokio::test(flavor = "multi_thread")]
async fn service_matches_cells_to_nearest_tiles_end_to_end() {
    // Gallery offers one black and one white tile; a half-black,
    // half-white input must reproduce itself exactly.
    let pages = vec![vec![
        "http://tiles.example/black.jpg".to_string(),
        "http://tiles.example/white.jpg".to_string(),
    ]];
    let gallery = ScriptedGallery::new(pages);
    let config = MosaicConfig::default()
        .with_target_count(2)
        .with_tile_size(20)
        .with_worker_count(2);
    let service = MosaicService::new(gallery, PaletteLoader::new(), config);

    let mut source = RgbaImage::from_pixel(40, 20, Rgba([0, 0, 0, 255]));
    for x in 20..40 {
        for y in 0..20 {
            source.put_pixel(x, y, Rgba([255, 255, 255, 255]));
        }
    }
    let input = DynamicImage::ImageRgba8(source);

    let canvas = service.generate_from_image(&input).await.unwrap();
    assert_eq!(canvas.dimensions(), (40, 20));
    for (x, _y, pixel) in canvas.enumerate_pixels() {
        if x < 20 {
            assert_eq!(*pixel, Rgba([0, 0, 0, 255]), "left half must be black");
        } else {
            assert_eq!(*pixel, Rgba([255, 255, 255, 255]), "right half must be white");
        }
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn variance_strategy_runs_end_to_end() {
    let gallery = EndlessGallery::new(8);
    let config = MosaicConfig::default()
        .with_target_count(3)
        .with_tile_size(10)
        .with_worker_count(2)
        .with_strategy(MatchStrategy::ImageVariance);
    let service = MosaicService::new(gallery, PaletteLoader::new(), config);

    let input = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
        30,
        30,
        Rgba([128, 128, 128, 255]),
    ));
    let canvas = service.generate_from_image(&input).await.unwrap();
    assert_eq!(canvas.dimensions(), (30, 30));
}

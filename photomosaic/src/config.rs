//! Mosaic generation configuration.
//!
//! All knobs are explicit and owned: configuration is passed into the
//! service, pipeline, and composer at construction time. There is no
//! ambient tile-size or sample-count state anywhere in the crate.

use crate::error::MosaicError;
use crate::fetch::{PipelineConfig, DEFAULT_WORKER_COUNT};
use crate::tile::MatchStrategy;

/// Default gallery topic to pull tiles from.
const DEFAULT_TOPIC: &str = "pics";

/// Default number of tiles to collect.
const DEFAULT_TARGET_COUNT: usize = 100;

/// Default tile edge length in pixels.
const DEFAULT_TILE_SIZE: u32 = 25;

/// Top-level configuration for one mosaic generation.
#[derive(Debug, Clone)]
pub struct MosaicConfig {
    /// Gallery topic/tag the tiles are listed from.
    pub topic: String,

    /// Number of tiles to collect before the fetch pipeline stops.
    pub target_count: usize,

    /// Edge length of the square tiles, in pixels. Also the grid cell size.
    pub tile_size: u32,

    /// How grid cells are matched to tiles.
    pub strategy: MatchStrategy,

    /// Size of the fetch worker pool.
    pub worker_count: usize,
}

impl Default for MosaicConfig {
    fn default() -> Self {
        Self {
            topic: DEFAULT_TOPIC.to_string(),
            target_count: DEFAULT_TARGET_COUNT,
            tile_size: DEFAULT_TILE_SIZE,
            strategy: MatchStrategy::default(),
            worker_count: DEFAULT_WORKER_COUNT,
        }
    }
}

impl MosaicConfig {
    /// Sets the gallery topic.
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    /// Sets the target tile count.
    pub fn with_target_count(mut self, target_count: usize) -> Self {
        self.target_count = target_count;
        self
    }

    /// Sets the tile size in pixels.
    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.tile_size = tile_size;
        self
    }

    /// Sets the matching strategy.
    pub fn with_strategy(mut self, strategy: MatchStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets the fetch worker pool size.
    pub fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    /// Checks the configuration for values that cannot produce a mosaic.
    pub fn validate(&self) -> Result<(), MosaicError> {
        if self.topic.is_empty() {
            return Err(MosaicError::Config("gallery topic must not be empty".into()));
        }
        if self.target_count == 0 {
            return Err(MosaicError::Config(
                "target tile count must be positive".into(),
            ));
        }
        if self.tile_size == 0 {
            return Err(MosaicError::Config("tile size must be positive".into()));
        }
        if self.worker_count == 0 {
            return Err(MosaicError::Config("worker count must be positive".into()));
        }
        Ok(())
    }

    /// The fetch pipeline configuration implied by this config.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig::default()
            .with_target_count(self.target_count)
            .with_tile_size(self.tile_size)
            .with_worker_count(self.worker_count)
    }
}

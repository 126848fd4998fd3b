//! Tiles and nearest-tile matching.
//!
//! A [`Tile`] is a fixed-size decoded image plus its precomputed
//! [`ColorDescriptor`]. The [`TileIndex`] owns the collected tiles, is built
//! once, and is read-only afterward - safe for unsynchronized concurrent
//! reads by the composer's parallel cell tasks.
//!
//! Two interchangeable matching strategies are supported:
//!
//! - [`MatchStrategy::Color`]: rank tiles by [`color_distance`] between the
//!   query region's average color and each tile's descriptor. O(1) per
//!   comparison.
//! - [`MatchStrategy::ImageVariance`]: rank tiles by the variance of the
//!   per-pixel difference image between the query region and the tile.
//!   O(pixels) per comparison, more discriminating.

use image::{GenericImageView, Rgba, RgbaImage};
use thiserror::Error;

use crate::color::{average_color, color_distance, rgb_to_ycbcr, ColorDescriptor};

/// Errors from tile index construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IndexError {
    /// Matching against zero tiles is a configuration error; it is rejected
    /// at construction time, never at query time.
    #[error("tile index requires at least one tile")]
    EmptyIndex,
}

/// Strategy used to match a grid cell to a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchStrategy {
    /// Average-color distance in luma/chroma space.
    #[default]
    Color,
    /// Variance of the per-pixel difference image.
    ImageVariance,
}

/// A fixed-size tile image with its color descriptor.
///
/// Created once a fetch job succeeds, owned exclusively by the
/// [`TileIndex`], and never mutated afterward.
#[derive(Debug, Clone)]
pub struct Tile {
    image: RgbaImage,
    descriptor: ColorDescriptor,
}

impl Tile {
    /// Wraps a decoded tile image, computing its descriptor.
    pub fn new(image: RgbaImage) -> Self {
        let descriptor = average_color(&image);
        Self { image, descriptor }
    }

    /// The tile's pixel buffer.
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// The tile's precomputed average color.
    pub fn descriptor(&self) -> ColorDescriptor {
        self.descriptor
    }
}

/// Read-only collection of tiles answering nearest-tile queries.
#[derive(Debug)]
pub struct TileIndex {
    tiles: Vec<Tile>,
}

impl TileIndex {
    /// Builds an index from collected tiles.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::EmptyIndex`] when `tiles` is empty, so that an
    /// unusable index can never be queried.
    pub fn new(tiles: Vec<Tile>) -> Result<Self, IndexError> {
        if tiles.is_empty() {
            return Err(IndexError::EmptyIndex);
        }
        Ok(Self { tiles })
    }

    /// Number of tiles in the index.
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Always false; an index is non-empty by construction.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The tiles in collection order.
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Returns the tile whose descriptor is nearest to `query`.
    ///
    /// Linear scan over all tiles; ties are broken by the first tile
    /// encountered, which is deterministic for a fixed tile ordering.
    pub fn nearest_by_color(&self, query: ColorDescriptor) -> &Tile {
        let mut best = &self.tiles[0];
        let mut best_distance = color_distance(query, best.descriptor);

        for tile in &self.tiles[1..] {
            let distance = color_distance(query, tile.descriptor);
            if distance < best_distance {
                best = tile;
                best_distance = distance;
            }
        }
        best
    }

    /// Returns the tile minimizing the variance of the per-pixel difference
    /// image against `region`.
    ///
    /// Ties break to the first tile encountered.
    pub fn nearest_by_image<I>(&self, region: &I) -> &Tile
    where
        I: GenericImageView<Pixel = Rgba<u8>>,
    {
        let mut best = &self.tiles[0];
        let mut best_score = difference_variance(region, &best.image);

        for tile in &self.tiles[1..] {
            let score = difference_variance(region, &tile.image);
            if score < best_score {
                best = tile;
                best_score = score;
            }
        }
        best
    }

    /// Matches `region` using the selected strategy.
    pub fn nearest<I>(&self, strategy: MatchStrategy, region: &I) -> &Tile
    where
        I: GenericImageView<Pixel = Rgba<u8>>,
    {
        match strategy {
            MatchStrategy::Color => self.nearest_by_color(average_color(region)),
            MatchStrategy::ImageVariance => self.nearest_by_image(region),
        }
    }
}

/// Variance of the per-pixel difference between a region and a tile.
///
/// The difference image is computed channel-wise in luma/chroma space (plus
/// alpha); the score is the summed per-channel variance of that difference
/// image. Comparison covers the overlapping bounds when dimensions differ.
fn difference_variance<I>(region: &I, tile: &RgbaImage) -> f64
where
    I: GenericImageView<Pixel = Rgba<u8>>,
{
    let width = region.width().min(tile.width());
    let height = region.height().min(tile.height());
    debug_assert!(width > 0 && height > 0, "empty comparison region");

    let mut sums = [0u64; 4];
    let mut squares = [0u64; 4];

    for y in 0..height {
        for x in 0..width {
            let Rgba([ar, ag, ab, aa]) = region.get_pixel(x, y);
            let Rgba([br, bg, bb, ba]) = *tile.get_pixel(x, y);

            let (ay, acb, acr) = rgb_to_ycbcr(ar, ag, ab);
            let (by, bcb, bcr) = rgb_to_ycbcr(br, bg, bb);

            let diffs = [
                u64::from(ay.abs_diff(by)),
                u64::from(acb.abs_diff(bcb)),
                u64::from(acr.abs_diff(bcr)),
                u64::from(aa.abs_diff(ba)),
            ];
            for (c, d) in diffs.into_iter().enumerate() {
                sums[c] += d;
                squares[c] += d * d;
            }
        }
    }

    let n = f64::from(width) * f64::from(height);
    (0..4)
        .map(|c| {
            let mean = sums[c] as f64 / n;
            squares[c] as f64 / n - mean * mean
        })
        .sum()
}

//! Mosaic composition.
//!
//! The composer partitions the source image into a grid of tile-size cells,
//! matches each cell against the [`TileIndex`] with the selected strategy,
//! and writes the matched tiles into the output canvas. Any remainder that
//! does not fill a whole cell is cropped, never stretched.
//!
//! Matching is embarrassingly parallel: cells share only the read-only
//! source and index. Canvas writes are parallel over row bands - each band
//! is one cell row's worth of scanlines, so writers touch disjoint pixel
//! ranges and no locking is needed, only the join before the canvas is
//! returned.

use image::{imageops, DynamicImage, RgbaImage};
use rayon::prelude::*;
use thiserror::Error;
use tracing::debug;

use crate::tile::{MatchStrategy, Tile, TileIndex};

/// Errors from mosaic composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ComposeError {
    /// A zero tile size cannot partition anything.
    #[error("tile size must be positive")]
    InvalidTileSize,

    /// The input image does not contain even one whole cell.
    #[error("input image {width}x{height} is smaller than one {tile_size}px tile")]
    InputTooSmall {
        width: u32,
        height: u32,
        tile_size: u32,
    },
}

/// Composes a mosaic canvas from a source image and a tile index.
#[derive(Debug, Clone, Copy)]
pub struct MosaicComposer {
    tile_size: u32,
    strategy: MatchStrategy,
}

impl MosaicComposer {
    /// Creates a composer for the given tile size and matching strategy.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::InvalidTileSize`] when `tile_size` is zero.
    pub fn new(tile_size: u32, strategy: MatchStrategy) -> Result<Self, ComposeError> {
        if tile_size == 0 {
            return Err(ComposeError::InvalidTileSize);
        }
        Ok(Self {
            tile_size,
            strategy,
        })
    }

    /// Builds the mosaic for `input` out of tiles from `index`.
    ///
    /// The output canvas is exactly `(w / t) * t` by `(h / t) * t` pixels
    /// (integer division); every output pixel comes from the corresponding
    /// local pixel of exactly one matched tile.
    pub fn compose(
        &self,
        input: &DynamicImage,
        index: &TileIndex,
    ) -> Result<RgbaImage, ComposeError> {
        let source = input.to_rgba8();
        let t = self.tile_size;
        let num_tiles_x = source.width() / t;
        let num_tiles_y = source.height() / t;

        if num_tiles_x == 0 || num_tiles_y == 0 {
            return Err(ComposeError::InputTooSmall {
                width: source.width(),
                height: source.height(),
                tile_size: t,
            });
        }

        debug!(
            grid_w = num_tiles_x,
            grid_h = num_tiles_y,
            tile_size = t,
            strategy = ?self.strategy,
            "composing mosaic"
        );

        // Match every cell independently. The index and source are
        // read-only, so the cells need no synchronization at all.
        let matched: Vec<&Tile> = (0..(num_tiles_x * num_tiles_y) as usize)
            .into_par_iter()
            .map(|cell| {
                let i = cell as u32 % num_tiles_x;
                let j = cell as u32 / num_tiles_x;
                let region = imageops::crop_imm(&source, i * t, j * t, t, t);
                index.nearest(self.strategy, &*region)
            })
            .collect();

        // Blit matched tiles band by band. One band is one cell row of
        // scanlines, so the chunks are disjoint by construction.
        let out_w = num_tiles_x * t;
        let out_h = num_tiles_y * t;
        let mut canvas = RgbaImage::new(out_w, out_h);
        let band_len = t as usize * out_w as usize * 4;
        let row_len = t as usize * 4;

        canvas
            .par_chunks_exact_mut(band_len)
            .enumerate()
            .for_each(|(j, band)| {
                for i in 0..num_tiles_x as usize {
                    let tile_raw = matched[j * num_tiles_x as usize + i].image().as_raw();
                    for row in 0..t as usize {
                        let src = row * row_len;
                        let dst = row * (out_w as usize * 4) + i * row_len;
                        band[dst..dst + row_len].copy_from_slice(&tile_raw[src..src + row_len]);
                    }
                }
            });

        Ok(canvas)
    }
}

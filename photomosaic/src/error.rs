//! Top-level error type for mosaic generation.

use thiserror::Error;

use crate::fetch::FetchError;
use crate::loader::LoadError;
use crate::mosaic::ComposeError;
use crate::tile::IndexError;

/// Errors surfaced by the mosaic service.
///
/// Each variant names a distinct user-visible cause: bad configuration, an
/// unloadable input image, a failed tile fetch run, or a composition
/// problem. A generation either produces a complete mosaic or exactly one
/// of these - never a partial result.
#[derive(Debug, Error)]
pub enum MosaicError {
    /// The configuration cannot produce a mosaic.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The input image could not be loaded or decoded.
    #[error("failed to load input image: {0}")]
    InputImage(#[from] LoadError),

    /// The tile fetch pipeline failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// No tiles were available to build an index from.
    #[error(transparent)]
    Index(#[from] IndexError),

    /// Composition failed.
    #[error(transparent)]
    Compose(#[from] ComposeError),
}

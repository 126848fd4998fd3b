//! Photomosaic - rebuild any picture from gallery thumbnails
//!
//! This library turns an input image into a photomosaic: the image is
//! partitioned into a grid of fixed-size cells, each cell is matched against
//! a set of small tile images by color, and the matched tiles are composited
//! into a single output canvas.
//!
//! Tile images are pulled on demand from a paginated remote gallery by a
//! concurrent, quota-bounded fetch pipeline that stops the moment enough
//! usable tiles have been collected.
//!
//! # High-Level API
//!
//! For most use cases, the [`service`] module provides a simplified facade:
//!
//! ```ignore
//! use photomosaic::config::MosaicConfig;
//! use photomosaic::gallery::HttpGalleryClient;
//! use photomosaic::loader::HttpImageLoader;
//! use photomosaic::service::MosaicService;
//!
//! let config = MosaicConfig::default().with_topic("earthporn");
//! let service = MosaicService::new(
//!     HttpGalleryClient::new()?,
//!     HttpImageLoader::new()?,
//!     config,
//! );
//!
//! let canvas = service.generate("https://example.com/input.png").await?;
//! canvas.save("mosaic.png")?;
//! ```

pub mod color;
pub mod config;
pub mod error;
pub mod fetch;
pub mod gallery;
pub mod loader;
pub mod logging;
pub mod mosaic;
pub mod service;
pub mod tile;

/// Version of the photomosaic library and CLI.
///
/// This is synchronized across all components in the workspace.
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

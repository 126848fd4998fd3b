//! Photomosaic CLI - command-line interface
//!
//! Generates a photomosaic from an input image (URL or local file) using
//! tiles pulled from a remote gallery topic, and writes the result as PNG.

mod error;

use std::path::Path;

use clap::{Parser, ValueEnum};
use tracing::info;

use photomosaic::config::MosaicConfig;
use photomosaic::gallery::HttpGalleryClient;
use photomosaic::loader::{CachedImageLoader, HttpImageLoader};
use photomosaic::logging;
use photomosaic::service::MosaicService;
use photomosaic::tile::MatchStrategy;

use error::CliError;

/// Matching strategy selector for the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Strategy {
    /// Match each cell by average-color distance (fast).
    Color,
    /// Match each cell by per-pixel difference variance (slower, more
    /// discriminating).
    ImageVariance,
}

impl From<Strategy> for MatchStrategy {
    fn from(strategy: Strategy) -> Self {
        match strategy {
            Strategy::Color => MatchStrategy::Color,
            Strategy::ImageVariance => MatchStrategy::ImageVariance,
        }
    }
}

/// Generate a photomosaic from gallery thumbnails.
#[derive(Debug, Parser)]
#[command(name = "photomosaic", version = photomosaic::VERSION)]
struct Args {
    /// Input image: a URL or a local file path
    image: String,

    /// Gallery topic to pull tile images from
    #[arg(short, long, default_value = "pics")]
    topic: String,

    /// Number of tile images to collect
    #[arg(short = 'n', long, default_value_t = 100)]
    count: usize,

    /// Tile edge length in pixels
    #[arg(long, default_value_t = 25)]
    tile_size: u32,

    /// How grid cells are matched to tiles
    #[arg(long, value_enum, default_value_t = Strategy::Color)]
    strategy: Strategy,

    /// Number of concurrent download workers
    #[arg(long, default_value_t = 10)]
    workers: usize,

    /// Output PNG path
    #[arg(short, long, default_value = "mosaic.png")]
    output: String,
}

fn main() {
    let args = Args::parse();
    if let Err(e) = run(args) {
        e.exit();
    }
}

fn run(args: Args) -> Result<(), CliError> {
    let _guard = logging::init_logging(logging::default_log_dir(), logging::default_log_file())
        .map_err(|e| CliError::LoggingInit(e.to_string()))?;

    info!(version = photomosaic::VERSION, "photomosaic starting");

    let config = MosaicConfig::default()
        .with_topic(&args.topic)
        .with_target_count(args.count)
        .with_tile_size(args.tile_size)
        .with_strategy(args.strategy.into())
        .with_worker_count(args.workers);
    config.validate().map_err(CliError::Generate)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::Runtime(e.to_string()))?;

    let canvas = runtime.block_on(generate(&args, config))?;

    canvas.save(&args.output).map_err(|e| CliError::FileWrite {
        path: args.output.clone(),
        reason: e.to_string(),
    })?;

    println!(
        "Saved {}x{} mosaic to {}",
        canvas.width(),
        canvas.height(),
        args.output
    );
    Ok(())
}

async fn generate(args: &Args, config: MosaicConfig) -> Result<image::RgbaImage, CliError> {
    let gallery = HttpGalleryClient::new().map_err(|e| CliError::Config(e.to_string()))?;
    let loader = CachedImageLoader::new(
        HttpImageLoader::new().map_err(|e| CliError::Config(e.to_string()))?,
    );
    let service = MosaicService::new(gallery, loader, config);

    // A local path is read directly; anything else goes through the
    // service's HTTP loader.
    let input_path = Path::new(&args.image);
    if input_path.is_file() {
        let input = image::open(input_path).map_err(|e| CliError::Input {
            path: args.image.clone(),
            reason: e.to_string(),
        })?;
        Ok(service.generate_from_image(&input).await?)
    } else {
        Ok(service.generate(&args.image).await?)
    }
}

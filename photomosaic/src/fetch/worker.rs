//! Fixed-size pool of fetch workers.
//!
//! Each worker loops: claim one job from the shared queue, download and
//! decode the candidate, center-crop and resample it to the tile size, then
//! emit the tile on the success channel or the error on the failure
//! channel. A malformed response is a terminal failure for that job; the
//! worker never retries and never blocks on it.
//!
//! When the job queue is closed the workers drain whatever is still queued
//! and exit; the returned [`JoinSet`] is the pool-wide completion barrier
//! observed by the aggregator.

use std::sync::Arc;

use image::imageops::FilterType;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::debug;

use super::{FetchFailure, FetchJob};
use crate::loader::{ImageLoader, LoadError};
use crate::tile::Tile;

/// Default number of concurrent fetch workers.
pub const DEFAULT_WORKER_COUNT: usize = 10;

/// Resampling filter used when scaling candidates down to tile size.
const RESAMPLE_FILTER: FilterType = FilterType::CatmullRom;

/// Spawns `worker_count` workers consuming `jobs`.
///
/// The pool owns the only clones of the result senders: once every worker
/// has exited, both result channels close, which is how the aggregator
/// knows the drain is complete.
pub(super) fn spawn_workers<L>(
    worker_count: usize,
    tile_size: u32,
    loader: Arc<L>,
    jobs: mpsc::Receiver<FetchJob>,
    success_tx: mpsc::Sender<(FetchJob, Tile)>,
    failure_tx: mpsc::Sender<FetchFailure>,
) -> JoinSet<()>
where
    L: ImageLoader + 'static,
{
    let jobs = Arc::new(Mutex::new(jobs));
    let mut pool = JoinSet::new();

    for worker_id in 0..worker_count {
        let jobs = Arc::clone(&jobs);
        let loader = Arc::clone(&loader);
        let success_tx = success_tx.clone();
        let failure_tx = failure_tx.clone();

        pool.spawn(async move {
            run_worker(worker_id, tile_size, loader, jobs, success_tx, failure_tx).await;
        });
    }

    pool
}

async fn run_worker<L: ImageLoader>(
    worker_id: usize,
    tile_size: u32,
    loader: Arc<L>,
    jobs: Arc<Mutex<mpsc::Receiver<FetchJob>>>,
    success_tx: mpsc::Sender<(FetchJob, Tile)>,
    failure_tx: mpsc::Sender<FetchFailure>,
) {
    loop {
        // Claiming is serialized through the mutex: exactly one worker
        // receives each job.
        let claimed = jobs.lock().await.recv().await;
        let Some(job) = claimed else {
            break;
        };

        match fetch_tile(&*loader, &job, tile_size).await {
            Ok(tile) => {
                // A closed channel means the aggregator lost interest;
                // nothing is left to report.
                if success_tx.send((job, tile)).await.is_err() {
                    break;
                }
            }
            Err(error) => {
                if failure_tx.send(FetchFailure { job, error }).await.is_err() {
                    break;
                }
            }
        }
    }

    debug!(worker_id, "fetch worker exiting");
}

/// Downloads one candidate and converts it into a tile.
async fn fetch_tile<L: ImageLoader>(
    loader: &L,
    job: &FetchJob,
    tile_size: u32,
) -> Result<Tile, LoadError> {
    let image = loader.load_image(job.url.as_str()).await?;

    // Center-crop to the largest contained square, then resample down to
    // the configured tile size.
    let resized = image.resize_to_fill(tile_size, tile_size, RESAMPLE_FILTER);
    Ok(Tile::new(resized.to_rgba8()))
}

//! The fetch pipeline's coordinating loop.
//!
//! [`FetchPipeline`] owns the job queue and both result channels. It drives
//! the [`SourcePager`], feeds the worker pool, and stops the whole pipeline
//! the moment the target tile count is reached - even mid-page. Its
//! decision loop is logically single-threaded: every state transition
//! happens inside one task, inside one `select!` wait over three event
//! sources with no fixed priority among them.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::worker::{spawn_workers, DEFAULT_WORKER_COUNT};
use super::{FetchError, FetchJob};
use crate::gallery::{GalleryError, ListingSource, SourcePager};
use crate::loader::ImageLoader;
use crate::tile::Tile;

/// Default number of tiles to collect.
const DEFAULT_TARGET_COUNT: usize = 100;

/// Default edge length of a tile in pixels.
const DEFAULT_TILE_SIZE: u32 = 25;

/// Configuration for one fetch pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Number of tiles to collect before stopping.
    pub target_count: usize,
    /// Edge length of the square tiles, in pixels.
    pub tile_size: u32,
    /// Number of concurrent fetch workers.
    pub worker_count: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_count: DEFAULT_TARGET_COUNT,
            tile_size: DEFAULT_TILE_SIZE,
            worker_count: DEFAULT_WORKER_COUNT,
        }
    }
}

impl PipelineConfig {
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

    /// Sets the worker pool size.
    pub fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }
}

/// Phases of the pipeline's state machine, in lifecycle order.
///
/// `Paging` requests more candidates; `Dispatching` races job hand-off
/// against result arrival; `Draining` has closed the queue and waits for
/// outstanding jobs; `Done` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelinePhase {
    /// Requesting more candidates from the pager.
    Paging,
    /// Feeding jobs to idle workers.
    Dispatching,
    /// Queue closed; waiting for outstanding jobs.
    Draining,
    /// Target reached.
    Done,
    /// Unrecoverable pager error or source exhaustion.
    Failed,
}

/// The concurrent, quota-bounded tile fetch pipeline.
pub struct FetchPipeline<S, L>
where
    S: ListingSource,
    L: ImageLoader + 'static,
{
    pager: SourcePager<S>,
    loader: Arc<L>,
    config: PipelineConfig,
}

impl<S, L> FetchPipeline<S, L>
where
    S: ListingSource,
    L: ImageLoader + 'static,
{
    /// Creates a pipeline over the given pager and loader.
    pub fn new(pager: SourcePager<S>, loader: Arc<L>, config: PipelineConfig) -> Self {
        Self {
            pager,
            loader,
            config,
        }
    }

    /// Runs the pipeline to completion.
    ///
    /// On success the returned tiles are in success-arrival order (first
    /// finished, first collected), and their count equals the configured
    /// target exactly.
    ///
    /// # Errors
    ///
    /// - [`FetchError::SourceUnavailable`] when the listing source fails.
    /// - [`FetchError::InsufficientTiles`] when the source is exhausted
    ///   before the target is met; outstanding jobs are drained first so
    ///   the error accounts for every dispatched job.
    pub async fn run(mut self) -> Result<Vec<Tile>, FetchError> {
        let target = self.config.target_count;
        if target == 0 {
            return Ok(Vec::new());
        }

        let (jobs_tx, jobs_rx) = mpsc::channel::<FetchJob>(1);
        let (success_tx, mut success_rx) = mpsc::channel(self.config.worker_count);
        let (failure_tx, mut failure_rx) = mpsc::channel(self.config.worker_count);

        let mut pool = spawn_workers(
            self.config.worker_count,
            self.config.tile_size,
            Arc::clone(&self.loader),
            jobs_rx,
            success_tx,
            failure_tx,
        );

        info!(
            requested = target,
            workers = self.config.worker_count,
            tile_size = self.config.tile_size,
            "fetch pipeline starting"
        );

        let mut tiles: Vec<Tile> = Vec::with_capacity(target);
        let mut submitted: usize = 0;
        let mut failed: usize = 0;
        let mut pager_error: Option<GalleryError> = None;

        'paging: loop {
            debug!(phase = ?PipelinePhase::Paging, "requesting candidate page");
            let urls = match self.pager.next_page().await {
                Ok(urls) => urls,
                Err(e) => {
                    pager_error = Some(e);
                    break 'paging;
                }
            };

            if urls.is_empty() && self.pager.is_exhausted() {
                debug!(submitted, collected = tiles.len(), "listing source exhausted");
                break 'paging;
            }

            debug!(phase = ?PipelinePhase::Dispatching, candidates = urls.len(), "dispatching page");
            for url in urls {
                let mut pending = Some(FetchJob {
                    sequence: submitted,
                    url,
                });

                // Race the hand-off of this job against result arrival.
                // select! polls its ready branches in random order, so none
                // of the three events takes priority over the others.
                while pending.is_some() {
                    tokio::select! {
                        permit = jobs_tx.reserve() => {
                            let Ok(permit) = permit else {
                                // Queue receiver gone: the pool is dead.
                                break 'paging;
                            };
                            if let Some(job) = pending.take() {
                                permit.send(job);
                                submitted += 1;
                            }
                        }
                        Some(failure) = failure_rx.recv() => {
                            failed += 1;
                            warn!(
                                url = %failure.job.url,
                                error = %failure.error,
                                "tile fetch failed"
                            );
                        }
                        Some((job, tile)) = success_rx.recv() => {
                            tiles.push(tile);
                            debug!(
                                sequence = job.sequence,
                                collected = tiles.len(),
                                requested = target,
                                "tile collected"
                            );
                            if tiles.len() >= target {
                                // Target reached mid-page: the rest of this
                                // page is never submitted.
                                break 'paging;
                            }
                        }
                    }
                }
            }
        }

        // Close the queue; workers drain what is already queued and exit.
        debug!(phase = ?PipelinePhase::Draining, "closing job queue");
        drop(jobs_tx);

        let mut discarded: usize = 0;
        let mut success_open = true;
        let mut failure_open = true;
        while success_open || failure_open {
            tokio::select! {
                result = success_rx.recv(), if success_open => match result {
                    Some((_job, tile)) => {
                        // In-flight successes still count toward an
                        // unmet target; beyond it they are discarded.
                        if tiles.len() < target && pager_error.is_none() {
                            tiles.push(tile);
                        } else {
                            discarded += 1;
                        }
                    }
                    None => success_open = false,
                },
                result = failure_rx.recv(), if failure_open => match result {
                    Some(failure) => {
                        failed += 1;
                        warn!(
                            url = %failure.job.url,
                            error = %failure.error,
                            "tile fetch failed"
                        );
                    }
                    None => failure_open = false,
                },
            }
        }

        // Pool-wide completion barrier: no worker outlives the pipeline.
        while pool.join_next().await.is_some() {}

        if let Some(e) = pager_error {
            warn!(
                phase = ?PipelinePhase::Failed,
                collected = tiles.len(),
                failed,
                "fetch pipeline aborted: listing source unavailable"
            );
            return Err(FetchError::SourceUnavailable(e));
        }

        if tiles.len() < target {
            warn!(
                phase = ?PipelinePhase::Failed,
                requested = target,
                collected = tiles.len(),
                failed,
                submitted,
                "fetch pipeline exhausted the listing source"
            );
            return Err(FetchError::InsufficientTiles {
                requested: target,
                collected: tiles.len(),
                failed,
            });
        }

        info!(
            phase = ?PipelinePhase::Done,
            collected = tiles.len(),
            submitted,
            failed,
            discarded,
            "fetch pipeline complete"
        );
        Ok(tiles)
    }
}

//! Concurrent, quota-bounded tile fetch pipeline.
//!
//! The pipeline pages through a remote gallery listing, dispatches download
//! jobs to a fixed worker pool, and stops exactly when the target number of
//! usable tiles has been collected.
//!
//! # Architecture
//!
//! ```text
//! SourcePager ──(urls)──► FetchPipeline ──(jobs)──► worker pool (W tasks)
//!                              ▲                          │
//!                              │◄───(success: Tile)───────┤
//!                              │◄───(failure: error)──────┘
//!                              ▼
//!                      collected tile set
//! ```
//!
//! The aggregator is the single point of serialized decision-making: it
//! races job submission against result arrival in one `select!` wait with
//! no fixed priority, so completion is driven by whichever event becomes
//! ready first - no polling, no double-counting.

mod aggregator;
mod worker;

pub use aggregator::{FetchPipeline, PipelineConfig, PipelinePhase};
pub use worker::DEFAULT_WORKER_COUNT;

use thiserror::Error;

use crate::gallery::{CandidateUrl, GalleryError};
use crate::loader::LoadError;

/// One unit of fetch work, owned by the job queue until a worker claims it.
///
/// The sequence index records assignment order; it is bookkeeping only and
/// carries no correctness weight.
#[derive(Debug, Clone)]
pub struct FetchJob {
    /// Assignment order of this job.
    pub sequence: usize,
    /// The candidate to download.
    pub url: CandidateUrl,
}

/// A job that terminally failed, reported on the failure channel.
#[derive(Debug)]
pub struct FetchFailure {
    /// The failed job.
    pub job: FetchJob,
    /// Why it failed.
    pub error: LoadError,
}

/// Pipeline-level fetch errors. Both abort the whole run; no partial tile
/// set is ever returned.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The listing source failed or returned unparsable data.
    #[error("tile source unavailable: {0}")]
    SourceUnavailable(#[from] GalleryError),

    /// The listing source ran out of candidates before the target was met.
    #[error("tile source exhausted: collected {collected} of {requested} tiles ({failed} failed)")]
    InsufficientTiles {
        /// Tiles requested.
        requested: usize,
        /// Tiles successfully collected before exhaustion.
        collected: usize,
        /// Jobs that failed to produce a tile.
        failed: usize,
    },
}

//! Scheduling of independent sessions

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::ops::Range;
#[cfg(feature = "parallel")]
use tracing::warn;
use tracing::debug;

use crate::options::HostOptions;
use crate::session::{RenderedRaster, Session};
use rasterfn_core::Result;

/// How a batch of sessions is spread over threads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMode {
    /// One session after the other on the calling thread
    Sequential,
    /// Rayon's global pool
    #[default]
    Parallel,
    /// A dedicated pool of this many threads
    ParallelWith(usize),
}

/// Runs index-addressed jobs, returning results in index order
pub trait ParallelStrategy {
    fn par_map<T, F>(&self, range: Range<usize>, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send;
}

impl ParallelStrategy for ProcessingMode {
    fn par_map<T, F>(&self, range: Range<usize>, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        #[cfg(feature = "parallel")]
        match *self {
            ProcessingMode::Sequential => {}
            ProcessingMode::Parallel => return range.into_par_iter().map(f).collect(),
            ProcessingMode::ParallelWith(threads) => {
                match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
                    Ok(pool) => return pool.install(|| range.into_par_iter().map(f).collect()),
                    Err(e) => {
                        warn!(threads, error = %e, "thread pool unavailable, running sequentially")
                    }
                }
            }
        }
        range.map(f).collect()
    }
}

/// Open and render `count` independent sessions.
///
/// `open(i)` builds session `i` with its own plugin instance, so no instance
/// is ever shared between workers. Results come back in index order; a
/// session that fails to open yields its error in place.
pub fn render_sessions<F>(
    options: &HostOptions,
    count: usize,
    open: F,
) -> Vec<Result<RenderedRaster>>
where
    F: Fn(usize) -> Result<Session> + Sync + Send,
{
    debug!(count, mode = ?options.mode, tile_size = options.tile_size, "rendering sessions");
    let tile_size = options.tile_size;
    options
        .mode
        .par_map(0..count, |i| open(i).map(|session| session.render(tile_size)))
}

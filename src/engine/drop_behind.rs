//! # Drop-Behind
//!
//! Emulates uncached I/O on top of the page cache. After each read or write
//! the touched pages are flushed with `MS_SYNC` and handed back to the kernel
//! with `MADV_DONTNEED`.
//!
//! This is an approximation: between the copy and the eviction the pages are
//! briefly resident. Syncs are skipped since they already flushed the whole
//! window.

use std::ops::Range;

use super::error::{EngineError, Result};
use super::file::MappedFile;
use super::request::Direction;
use super::window::Advice;
use crate::config::RunConfig;

pub fn should_evict(run: &RunConfig, direction: Direction) -> bool {
    run.direct && direction != Direction::Sync
}

/// Flushes and evicts `range` of the current window when the run emulates
/// direct I/O. Both steps are attempted; the first failure is returned and
/// the window stays mapped either way.
pub fn maybe_evict(
    run: &RunConfig,
    file: &mut MappedFile,
    direction: Direction,
    range: Range<usize>,
) -> Result<()> {
    if !should_evict(run, direction) {
        return Ok(());
    }

    let Some(window) = file.window() else {
        return Ok(());
    };

    let flushed = window
        .flush(range.clone())
        .map_err(|source| EngineError::SyncFailed { source });
    let evicted = window
        .advise(range, Advice::DontNeed)
        .map_err(|source| EngineError::AdviceFailed {
            advice: Advice::DontNeed.name(),
            source,
        });

    let stats = file.stats_mut();
    stats.syncs += 1;
    stats.evictions += 1;

    flushed.and(evicted)
}

//! # Sliding-Window mmap Engine
//!
//! `MmapEngine` services read, write and sync requests by copying to and
//! from a bounded window of each file mapped into the process. When a request
//! falls outside the current window, the window is moved to start at that
//! request.
//!
//! ## Request Flow
//!
//! ```text
//!   init(RunConfig)          once per run: WindowConfig = budget / nr_files
//!        │
//!   prepare(file, request)   policy check, then Window Manager ensure_covered
//!        │                   -> Prepared { in-window range }
//!   execute(prepared)        Transfer Executor copy / flush
//!        │                   Drop-Behind flush + MADV_DONTNEED (direct runs)
//!        v
//!   Completion
//! ```
//!
//! `submit()` runs both steps back to back.
//!
//! ## Ownership
//!
//! The engine itself is read-only after `init()` and can be shared between
//! threads. Each `MappedFile` is owned by the one thread issuing its
//! requests, so no locking is needed. `Prepared` borrows its file mutably,
//! which keeps a re-map from invalidating a range that is still in use.
//!
//! ## Module Organization
//!
//! - `sizer`: window cap per file (`WindowConfig`)
//! - `window`: owned mapping handle (`Window`)
//! - `file`: per-file mapping state and re-mapping (`MappedFile`)
//! - `transfer`: copies, syncs and the access-mode policy (`Prepared`)
//! - `drop_behind`: flush and evict after each transfer in direct runs
//! - `request`: `IoRequest`, `Direction`, `Completion`
//! - `error`: `EngineError`

mod drop_behind;
mod error;
mod file;
mod request;
mod sizer;
mod transfer;
mod window;

use std::path::Path;

use tracing::debug;

pub use error::{EngineError, Result};
pub use file::{MappedFile, WindowStats};
pub use request::{Completion, Direction, IoRequest};
pub use sizer::WindowConfig;
pub use transfer::Prepared;
pub use window::{Advice, Protection, Window};

use crate::config::RunConfig;

#[derive(Debug, Clone)]
pub struct MmapEngine {
    run: RunConfig,
    windows: WindowConfig,
}

impl MmapEngine {
    /// Computes the run-wide window configuration. Fails only when the run
    /// has no files.
    pub fn init(run: RunConfig) -> Result<Self> {
        let windows = WindowConfig::new(run.budget, run.nr_files)?;

        debug!(
            nr_files = run.nr_files,
            budget = run.budget,
            window_cap = windows.cap(),
            alignment = windows.alignment(),
            "mmap engine initialized"
        );

        Ok(Self { run, windows })
    }

    pub fn run_config(&self) -> &RunConfig {
        &self.run
    }

    pub fn window_config(&self) -> &WindowConfig {
        &self.windows
    }

    /// Opens a file with the run's access mode. Nothing is mapped until the
    /// first request arrives.
    pub fn open_file<P: AsRef<Path>>(&self, path: P) -> Result<MappedFile> {
        MappedFile::open(path, self.run.access)
    }

    /// Releases the file's window, reporting an `munmap` failure instead of
    /// logging it on drop.
    pub fn close_file(&self, mut file: MappedFile) -> Result<()> {
        file.release()
    }

    /// Puts a window over the request and returns it ready to execute.
    ///
    /// Syncs never move the window: they flush whatever is mapped.
    pub fn prepare<'f, 'b>(
        &self,
        file: &'f mut MappedFile,
        request: IoRequest<'b>,
    ) -> Result<Prepared<'f, 'b>> {
        let direction = request.direction();
        transfer::check_policy(file.mode(), self.run.verify, direction)?;

        let range = match direction {
            Direction::Sync => 0..0,
            Direction::Read | Direction::Write => {
                file.ensure_covered(&self.windows, &self.run, request.offset(), request.len())?
            }
        };

        Ok(Prepared::new(file, request, range))
    }

    /// Performs the transfer and, in direct runs, the drop-behind eviction.
    pub fn execute(&self, mut prepared: Prepared<'_, '_>) -> Result<Completion> {
        let completion = prepared.transfer()?;
        let range = prepared.range();
        drop_behind::maybe_evict(&self.run, prepared.file_mut(), completion.direction, range)?;
        Ok(completion)
    }

    pub fn submit(&self, file: &mut MappedFile, request: IoRequest<'_>) -> Result<Completion> {
        let prepared = self.prepare(file, request)?;
        self.execute(prepared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{page_size, AccessMode, AccessPattern, MMAP_TOTAL_BUDGET};
    use std::fs::File;
    use tempfile::tempdir;

    fn scratch(dir: &Path, name: &str, len: u64) -> std::path::PathBuf {
        let path = dir.join(name);
        File::create(&path).unwrap().set_len(len).unwrap();
        path
    }

    #[test]
    fn init_rejects_zero_files() {
        let run = RunConfig::builder().nr_files(0).build();

        assert!(matches!(
            MmapEngine::init(run),
            Err(EngineError::InvalidFileCount(0))
        ));
    }

    #[test]
    fn init_splits_default_budget() {
        let engine = MmapEngine::init(RunConfig::builder().nr_files(4).build()).unwrap();

        assert_eq!(engine.window_config().cap(), MMAP_TOTAL_BUDGET / 4);
    }

    #[test]
    fn write_sync_read_roundtrip() {
        let page = page_size() as u64;
        let dir = tempdir().unwrap();
        let path = scratch(dir.path(), "rw", 4 * page);
        let engine = MmapEngine::init(
            RunConfig::builder()
                .access(AccessMode::ReadWrite)
                .budget(2 * page)
                .build(),
        )
        .unwrap();

        let mut file = engine.open_file(&path).unwrap();
        let data = [0x42u8; 64];
        engine.submit(&mut file, IoRequest::write(page, &data)).unwrap();
        let synced = engine.submit(&mut file, IoRequest::sync()).unwrap();

        let mut back = [0u8; 64];
        let done = engine.submit(&mut file, IoRequest::read(page, &mut back)).unwrap();

        assert_eq!(synced.bytes as u64, 2 * page);
        assert_eq!(done, Completion { direction: Direction::Read, bytes: 64 });
        assert_eq!(back, data);
    }

    #[test]
    fn sync_on_unmapped_file_is_a_noop() {
        let dir = tempdir().unwrap();
        let path = scratch(dir.path(), "s", page_size() as u64);
        let engine =
            MmapEngine::init(RunConfig::builder().access(AccessMode::ReadWrite).build()).unwrap();

        let mut file = engine.open_file(&path).unwrap();
        let done = engine.submit(&mut file, IoRequest::sync()).unwrap();

        assert_eq!(done.bytes, 0);
        assert!(!file.is_mapped());
        assert_eq!(file.stats(), WindowStats::default());
    }

    #[test]
    fn read_only_write_leaves_window_alone() {
        let page = page_size() as u64;
        let dir = tempdir().unwrap();
        let path = scratch(dir.path(), "ro", 4 * page);
        let engine = MmapEngine::init(RunConfig::builder().budget(page).build()).unwrap();

        let mut file = engine.open_file(&path).unwrap();
        let mut buf = [0u8; 16];
        engine.submit(&mut file, IoRequest::read(0, &mut buf)).unwrap();
        let before = file.stats();

        let err = engine
            .submit(&mut file, IoRequest::write(2 * page, &[1u8; 16]))
            .unwrap_err();

        assert!(matches!(err, EngineError::Policy { .. }));
        assert_eq!(file.window().unwrap().offset(), 0);
        assert_eq!(file.stats(), before);
    }

    #[test]
    fn prepared_exposes_in_window_range() {
        let page = page_size() as u64;
        let dir = tempdir().unwrap();
        let path = scratch(dir.path(), "p", 4 * page);
        let engine = MmapEngine::init(
            RunConfig::builder()
                .pattern(AccessPattern::Random)
                .budget(4 * page)
                .build(),
        )
        .unwrap();

        let mut file = engine.open_file(&path).unwrap();
        let mut buf = [0u8; 32];
        engine.submit(&mut file, IoRequest::read(0, &mut buf)).unwrap();

        let mut buf = [0u8; 32];
        let prepared = engine
            .prepare(&mut file, IoRequest::read(page + 8, &mut buf))
            .unwrap();
        assert_eq!(prepared.range(), page as usize + 8..page as usize + 40);
        assert_eq!(prepared.direction(), Direction::Read);
        engine.execute(prepared).unwrap();
    }

    #[test]
    fn close_file_releases_window() {
        let dir = tempdir().unwrap();
        let path = scratch(dir.path(), "c", page_size() as u64);
        let engine = MmapEngine::init(RunConfig::default()).unwrap();

        let mut file = engine.open_file(&path).unwrap();
        let mut buf = [0u8; 8];
        engine.submit(&mut file, IoRequest::read(0, &mut buf)).unwrap();

        assert!(engine.close_file(file).is_ok());
    }
}

//! # Window Manager
//!
//! `MappedFile` is the per-file mapping state: the open file, the region of
//! it the run may touch, and at most one live [`Window`].
//!
//! ## State Machine
//!
//! ```text
//!              first request                 out-of-window request
//!  Unmapped ───────────────────> Mapped(w) ─────────────────────────> Mapped(w')
//!      ^                             │        (munmap w, mmap w')
//!      └──────── release() ──────────┘
//! ```
//!
//! A request already inside the current window takes the fast path and does
//! not touch the VM. Otherwise the old window is released and a new one is
//! mapped starting exactly at the request offset:
//!
//! ```text
//! window_len = min(window_cap, io_size - request.offset)
//! ```
//!
//! ## Failure States
//!
//! - `munmap` fails: the old window is kept, the file stays `Mapped(w)`
//! - `mmap` fails: the file is `Unmapped`
//! - pattern hint fails under `AdvicePolicy::Fatal`: the fresh window is
//!   released and the file is `Unmapped`; if that release fails too, the
//!   window is kept and the file is `Mapped(w')` without the hint
//!
//! No path leaves a handle to a region that is no longer mapped.

use std::fs::{File, OpenOptions};
use std::ops::Range;
use std::os::unix::io::AsRawFd;
use std::path::Path;

use tracing::{debug, warn};

use super::error::{EngineError, Result};
use super::sizer::WindowConfig;
use super::window::{Advice, Protection, Window};
use crate::config::{AccessMode, AdvicePolicy, RunConfig};

/// VM call counters for one file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowStats {
    pub maps: u64,
    pub unmaps: u64,
    pub syncs: u64,
    pub evictions: u64,
    pub advice_calls: u64,
}

impl std::fmt::Display for WindowStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "maps:{},unmaps:{},syncs:{},evictions:{},advice:{}",
            self.maps, self.unmaps, self.syncs, self.evictions, self.advice_calls
        )
    }
}

#[derive(Debug)]
pub struct MappedFile {
    file: File,
    base_offset: u64,
    io_size: u64,
    mode: AccessMode,
    window: Option<Window>,
    stats: WindowStats,
}

impl MappedFile {
    /// Opens `path` for the run's access mode and uses the whole file as the
    /// io region.
    pub fn open<P: AsRef<Path>>(path: P, mode: AccessMode) -> Result<Self> {
        let path = path.as_ref();

        // MAP_SHARED needs a readable descriptor even for write-only mappings.
        let file = OpenOptions::new()
            .read(true)
            .write(!mode.is_read_only())
            .open(path)
            .map_err(|source| EngineError::Open {
                path: path.to_path_buf(),
                source,
            })?;

        let size = file
            .metadata()
            .map_err(|source| EngineError::FileSize { source })?
            .len();

        Self::with_region(file, 0, size, size, mode)
    }

    /// Wraps an already open file. The io region is
    /// `[base_offset, base_offset + io_size)`; the file is never extended.
    pub fn from_file(file: File, base_offset: u64, io_size: u64, mode: AccessMode) -> Result<Self> {
        let size = file
            .metadata()
            .map_err(|source| EngineError::FileSize { source })?
            .len();

        Self::with_region(file, base_offset, io_size, size, mode)
    }

    fn with_region(
        file: File,
        base_offset: u64,
        io_size: u64,
        file_size: u64,
        mode: AccessMode,
    ) -> Result<Self> {
        let required = base_offset.saturating_add(io_size);
        if required > file_size {
            return Err(EngineError::FileTooSmall {
                file_size,
                required,
            });
        }

        Ok(Self {
            file,
            base_offset,
            io_size,
            mode,
            window: None,
            stats: WindowStats::default(),
        })
    }

    pub fn base_offset(&self) -> u64 {
        self.base_offset
    }

    pub fn io_size(&self) -> u64 {
        self.io_size
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    pub fn window(&self) -> Option<&Window> {
        self.window.as_ref()
    }

    pub(crate) fn window_mut(&mut self) -> Option<&mut Window> {
        self.window.as_mut()
    }

    pub fn is_mapped(&self) -> bool {
        self.window.is_some()
    }

    pub fn stats(&self) -> WindowStats {
        self.stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut WindowStats {
        &mut self.stats
    }

    /// Makes sure the current window holds `[offset, offset + len)` and
    /// returns the matching byte range inside it.
    pub fn ensure_covered(
        &mut self,
        windows: &WindowConfig,
        run: &RunConfig,
        offset: u64,
        len: usize,
    ) -> Result<Range<usize>> {
        windows.check_block(len)?;

        let in_range = offset
            .checked_add(len as u64)
            .is_some_and(|end| end <= self.io_size);
        if !in_range {
            return Err(EngineError::OutOfRange {
                offset,
                len,
                io_size: self.io_size,
            });
        }

        if let Some(range) = self.window.as_ref().and_then(|w| w.locate(offset, len)) {
            return Ok(range);
        }

        self.release()?;

        let window_len = windows.cap().min(self.io_size - offset) as usize;
        let protection = Protection::for_access(self.mode, run.verify);
        let position = self.base_offset + offset;

        let window = Window::map(self.file.as_raw_fd(), position, offset, window_len, protection)
            .map_err(|source| EngineError::MapFailed {
                offset: position,
                len: window_len,
                source,
            })?;
        self.stats.maps += 1;

        debug!(
            offset,
            len = window_len,
            position,
            read = protection.read,
            write = protection.write,
            "mapped window"
        );

        let advice = Advice::for_pattern(run.pattern);
        self.stats.advice_calls += 1;
        if let Err(source) = window.advise_all(advice) {
            match run.advice_policy {
                AdvicePolicy::Fatal => {
                    if let Err(err) = self.discard(window) {
                        warn!(offset, error = %err, "keeping unhinted window after failed release");
                    }
                    return Err(EngineError::AdviceFailed {
                        advice: advice.name(),
                        source,
                    });
                }
                AdvicePolicy::BestEffort => {
                    warn!(offset, %advice, error = %source, "ignoring failed access hint");
                }
            }
        }

        let window = self.window.insert(window);
        window.locate(offset, len).ok_or(EngineError::OutOfRange {
            offset,
            len,
            io_size: self.io_size,
        })
    }

    /// Unmaps the current window, if any. On failure the window stays mapped
    /// and owned by this file.
    pub fn release(&mut self) -> Result<()> {
        match self.window.take() {
            Some(window) => self.discard(window),
            None => Ok(()),
        }
    }

    /// Unmaps `window`. Only a successful munmap is counted; on failure the
    /// window becomes the file's current window again.
    fn discard(&mut self, window: Window) -> Result<()> {
        let offset = window.offset();
        match window.unmap() {
            Ok(()) => {
                self.stats.unmaps += 1;
                debug!(offset, "released window");
                Ok(())
            }
            Err((window, source)) => {
                self.window = Some(window);
                Err(EngineError::UnmapFailed { offset, source })
            }
        }
    }
}

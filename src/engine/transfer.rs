//! # Transfer Executor
//!
//! Moves bytes between the caller's buffer and a window that already covers
//! the request. Reads and writes are plain copies; a sync flushes the whole
//! current window with `MS_SYNC`, whatever the request range.
//!
//! Writes only reach storage once synced, either by a later sync request or
//! by drop-behind.

use std::ops::Range;

use tracing::trace;

use super::error::{EngineError, Result};
use super::file::MappedFile;
use super::request::{Completion, Direction, IoRequest};
use super::window::Protection;
use crate::config::AccessMode;

/// Rejects requests the file's access mode cannot serve. Runs before any
/// window is touched.
pub fn check_policy(mode: AccessMode, verify: bool, direction: Direction) -> Result<()> {
    let allowed = match direction {
        Direction::Write | Direction::Sync => !mode.is_read_only(),
        Direction::Read => Protection::for_access(mode, verify).read,
    };

    if !allowed {
        return Err(EngineError::Policy { direction, mode });
    }
    Ok(())
}

/// A request whose window is in place. Holds the file mutably, so no re-map
/// can happen until the request has been executed or dropped.
#[derive(Debug)]
pub struct Prepared<'f, 'b> {
    file: &'f mut MappedFile,
    request: IoRequest<'b>,
    range: Range<usize>,
}

impl<'f, 'b> Prepared<'f, 'b> {
    pub(crate) fn new(file: &'f mut MappedFile, request: IoRequest<'b>, range: Range<usize>) -> Self {
        Self {
            file,
            request,
            range,
        }
    }

    pub fn direction(&self) -> Direction {
        self.request.direction()
    }

    /// In-window byte range of the request. Empty for syncs.
    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    pub(crate) fn file_mut(&mut self) -> &mut MappedFile {
        &mut *self.file
    }

    pub(crate) fn transfer(&mut self) -> Result<Completion> {
        let direction = self.request.direction();
        let offset = self.request.offset();
        let len = self.request.len();
        let range = self.range.clone();

        let bytes = match &mut self.request {
            IoRequest::Read { buf, .. } => {
                let window = self.file.window().ok_or(EngineError::NotMapped { offset })?;
                window.read_into(range, &mut buf[..]);
                len
            }
            IoRequest::Write { buf, .. } => {
                let window = self
                    .file
                    .window_mut()
                    .ok_or(EngineError::NotMapped { offset })?;
                window.write_from(range, &buf[..]);
                len
            }
            IoRequest::Sync => match self.file.window() {
                Some(window) => {
                    window
                        .flush_all()
                        .map_err(|source| EngineError::SyncFailed { source })?;
                    let flushed = window.len();
                    self.file.stats_mut().syncs += 1;
                    flushed
                }
                None => 0,
            },
        };

        trace!(%direction, offset, bytes, "transfer complete");

        Ok(Completion { direction, bytes })
    }
}

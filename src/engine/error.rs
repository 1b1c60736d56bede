use std::io;
use std::path::PathBuf;

use thiserror::Error;

use super::request::Direction;
use crate::config::AccessMode;

/// Errors raised while servicing requests. Every variant belongs to a single
/// file and request; none of them touches another file's window.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid file count {0}: a run needs at least one file")]
    InvalidFileCount(usize),

    #[error("block size {len} too large for mapped window of {cap} bytes")]
    BlockTooLarge { len: usize, cap: u64 },

    #[error("request at offset {offset} with length {len} exceeds io size {io_size}")]
    OutOfRange { offset: u64, len: usize, io_size: u64 },

    #[error("no window mapped for request at offset {offset}")]
    NotMapped { offset: u64 },

    #[error("mmap of {len} bytes at file offset {offset} failed: {source}")]
    MapFailed {
        offset: u64,
        len: usize,
        #[source]
        source: io::Error,
    },

    #[error("munmap of window at file offset {offset} failed: {source}")]
    UnmapFailed {
        offset: u64,
        #[source]
        source: io::Error,
    },

    #[error("madvise({advice}) failed: {source}")]
    AdviceFailed {
        advice: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("msync failed: {source}")]
    SyncFailed {
        #[source]
        source: io::Error,
    },

    #[error("{direction} request rejected on {mode} file")]
    Policy { direction: Direction, mode: AccessMode },

    #[error("failed to open '{}': {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to query file size: {source}")]
    FileSize {
        #[source]
        source: io::Error,
    },

    #[error("file holds {file_size} bytes but io region ends at {required}")]
    FileTooSmall { file_size: u64, required: u64 },
}

impl EngineError {
    /// Returns true for errors that mean the run itself is misconfigured.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            EngineError::InvalidFileCount(_) | EngineError::BlockTooLarge { .. }
        )
    }

    /// Returns the OS error code behind a VM or open failure, if any.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            EngineError::MapFailed { source, .. }
            | EngineError::UnmapFailed { source, .. }
            | EngineError::AdviceFailed { source, .. }
            | EngineError::SyncFailed { source }
            | EngineError::Open { source, .. }
            | EngineError::FileSize { source } => source.raw_os_error(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

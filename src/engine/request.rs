//! Requests and completions exchanged with the job scheduler.
//!
//! The engine never picks offsets. It services whatever `IoRequest` the
//! caller builds and answers with exactly one `Completion` or error.

/// Data direction of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
    Sync,
}

impl Direction {
    pub fn name(&self) -> &'static str {
        match self {
            Direction::Read => "read",
            Direction::Write => "write",
            Direction::Sync => "sync",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One I/O operation against a file. Offsets are relative to the file's
/// base offset. The buffer lives in ordinary process memory and is borrowed
/// for the duration of the request.
#[derive(Debug)]
pub enum IoRequest<'a> {
    Read { offset: u64, buf: &'a mut [u8] },
    Write { offset: u64, buf: &'a [u8] },
    Sync,
}

impl<'a> IoRequest<'a> {
    pub fn read(offset: u64, buf: &'a mut [u8]) -> Self {
        IoRequest::Read { offset, buf }
    }

    pub fn write(offset: u64, buf: &'a [u8]) -> Self {
        IoRequest::Write { offset, buf }
    }

    pub fn sync() -> Self {
        IoRequest::Sync
    }

    pub fn direction(&self) -> Direction {
        match self {
            IoRequest::Read { .. } => Direction::Read,
            IoRequest::Write { .. } => Direction::Write,
            IoRequest::Sync => Direction::Sync,
        }
    }

    /// Sync requests carry no range and report offset 0.
    pub fn offset(&self) -> u64 {
        match self {
            IoRequest::Read { offset, .. } | IoRequest::Write { offset, .. } => *offset,
            IoRequest::Sync => 0,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            IoRequest::Read { buf, .. } => buf.len(),
            IoRequest::Write { buf, .. } => buf.len(),
            IoRequest::Sync => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Outcome of a fully serviced request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub direction: Direction,
    /// Bytes copied, or bytes flushed for a sync.
    pub bytes: usize,
}

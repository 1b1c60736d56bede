//! # Window Sizer
//!
//! Splits the global mapped-bytes budget evenly across the files of a run.
//! The result is computed once at engine init and never changes, so every
//! file of the run sees the same cap.
//!
//! ```text
//! budget = 1 GiB, nr_files = 4
//!
//!   file 0  [ 256 MiB window cap ]
//!   file 1  [ 256 MiB window cap ]
//!   file 2  [ 256 MiB window cap ]
//!   file 3  [ 256 MiB window cap ]
//! ```
//!
//! The largest power of two not above the cap is derived as well and exposed
//! through [`WindowConfig::alignment`]. Window offsets are not rounded to it:
//! a new window always starts exactly at the request that triggered it.

use super::error::{EngineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowConfig {
    cap: u64,
    alignment: u64,
}

impl WindowConfig {
    pub fn new(budget: u64, nr_files: usize) -> Result<Self> {
        if nr_files == 0 {
            return Err(EngineError::InvalidFileCount(nr_files));
        }

        let cap = budget / nr_files as u64;
        let alignment = 1u64 << cap.checked_ilog2().unwrap_or(0);

        Ok(Self { cap, alignment })
    }

    /// Maximum window length for every file of the run.
    pub fn cap(&self) -> u64 {
        self.cap
    }

    /// Largest power of two not exceeding the cap (1 when the cap is 0).
    pub fn alignment(&self) -> u64 {
        self.alignment
    }

    pub fn check_block(&self, len: usize) -> Result<()> {
        if len as u64 > self.cap {
            return Err(EngineError::BlockTooLarge { len, cap: self.cap });
        }
        Ok(())
    }
}

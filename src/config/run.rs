//! # Run Configuration
//!
//! `RunConfig` describes one run of the engine: how many files share the
//! mapped-bytes budget, how files are accessed, and whether direct I/O is
//! emulated through drop-behind.
//!
//! ## Builder Pattern
//!
//! ```ignore
//! let run = RunConfig::builder()
//!     .nr_files(4)
//!     .access(AccessMode::ReadWrite)
//!     .pattern(AccessPattern::Random)
//!     .direct(true)
//!     .build();
//! ```
//!
//! ## Options
//!
//! | Option        | Default             | Description                                   |
//! |---------------|---------------------|-----------------------------------------------|
//! | nr_files      | 1                   | Files sharing the mapped-bytes budget         |
//! | budget        | `MMAP_TOTAL_BUDGET` | Total bytes mapped at once across all files   |
//! | access        | ReadOnly            | Protection of every mapping                   |
//! | verify        | false               | Write-only runs also map readable for verify  |
//! | pattern       | Sequential          | madvise hint applied to each new window       |
//! | direct        | false               | Flush and drop pages after each transfer      |
//! | advice_policy | Fatal               | Whether a failed madvise fails the request    |

use super::constants::MMAP_TOTAL_BUDGET;

/// How the run accesses its files. Decides mapping protection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl AccessMode {
    pub fn is_read_only(&self) -> bool {
        matches!(self, AccessMode::ReadOnly)
    }

    pub fn name(&self) -> &'static str {
        match self {
            AccessMode::ReadOnly => "read-only",
            AccessMode::WriteOnly => "write-only",
            AccessMode::ReadWrite => "read-write",
        }
    }
}

impl std::fmt::Display for AccessMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Offset pattern of the workload driving the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPattern {
    Sequential,
    Random,
}

/// What to do when an madvise hint on a fresh window fails.
///
/// A hint has no correctness impact, so `BestEffort` logs the failure and
/// keeps the window. `Fatal` releases the window and fails the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvicePolicy {
    Fatal,
    BestEffort,
}

/// Immutable description of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub nr_files: usize,
    pub budget: u64,
    pub access: AccessMode,
    pub verify: bool,
    pub pattern: AccessPattern,
    pub direct: bool,
    pub advice_policy: AdvicePolicy,
}

impl RunConfig {
    pub fn builder() -> RunConfigBuilder {
        RunConfigBuilder::new()
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfigBuilder::new().build()
    }
}

/// Builder for [`RunConfig`].
#[derive(Debug, Clone)]
pub struct RunConfigBuilder {
    nr_files: usize,
    budget: u64,
    access: AccessMode,
    verify: bool,
    pattern: AccessPattern,
    direct: bool,
    advice_policy: AdvicePolicy,
}

impl Default for RunConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RunConfigBuilder {
    pub fn new() -> Self {
        Self {
            nr_files: 1,
            budget: MMAP_TOTAL_BUDGET,
            access: AccessMode::ReadOnly,
            verify: false,
            pattern: AccessPattern::Sequential,
            direct: false,
            advice_policy: AdvicePolicy::Fatal,
        }
    }

    /// Sets the number of files sharing the budget. Zero is rejected later by
    /// [`crate::MmapEngine::init`].
    pub fn nr_files(mut self, nr_files: usize) -> Self {
        self.nr_files = nr_files;
        self
    }

    /// Overrides the total mapped-bytes budget. Defaults to 1 GiB.
    pub fn budget(mut self, bytes: u64) -> Self {
        self.budget = bytes;
        self
    }

    pub fn access(mut self, access: AccessMode) -> Self {
        self.access = access;
        self
    }

    /// Enables read-back verification. Only changes protection for
    /// write-only runs, which then also map readable.
    pub fn verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    pub fn pattern(mut self, pattern: AccessPattern) -> Self {
        self.pattern = pattern;
        self
    }

    /// Emulates uncached I/O: every read and write is flushed and its pages
    /// dropped from the page cache right after the copy.
    pub fn direct(mut self, direct: bool) -> Self {
        self.direct = direct;
        self
    }

    pub fn advice_policy(mut self, policy: AdvicePolicy) -> Self {
        self.advice_policy = policy;
        self
    }

    pub fn build(self) -> RunConfig {
        RunConfig {
            nr_files: self.nr_files,
            budget: self.budget,
            access: self.access,
            verify: self.verify,
            pattern: self.pattern,
            direct: self.direct,
            advice_policy: self.advice_policy,
        }
    }
}

//! # mmapio - Sliding-Window Memory-Mapped I/O Engine
//!
//! mmapio services read, write and sync requests against files by copying to
//! and from a memory-mapped window of each file. Only a bounded part of every
//! file is mapped at once; the window moves when a request falls outside it.
//!
//! - **Bounded address space**: at most `budget` bytes mapped across all files
//! - **No per-block syscalls**: requests inside the window are plain copies
//! - **Direct I/O emulation**: optional flush + `MADV_DONTNEED` after each copy
//!
//! ## Quick Start
//!
//! ```ignore
//! use mmapio::{AccessMode, IoRequest, MmapEngine, RunConfig};
//!
//! let engine = MmapEngine::init(
//!     RunConfig::builder()
//!         .nr_files(1)
//!         .access(AccessMode::ReadWrite)
//!         .build(),
//! )?;
//!
//! let mut file = engine.open_file("./data.bin")?;
//! engine.submit(&mut file, IoRequest::write(0, &[0xAB; 4096]))?;
//! engine.submit(&mut file, IoRequest::sync())?;
//!
//! let mut buf = [0u8; 4096];
//! engine.submit(&mut file, IoRequest::read(0, &mut buf))?;
//! engine.close_file(file)?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │   Job scheduler (offsets, timing)    │   not part of this crate
//! ├─────────────────────────────────────┤
//! │        MmapEngine (prepare/execute)  │
//! ├──────────────────┬──────────────────┤
//! │  Window Manager  │ Transfer + Drop- │
//! │   (MappedFile)   │  Behind          │
//! ├──────────────────┴──────────────────┤
//! │    Window (mmap/munmap/msync/madvise)│
//! └─────────────────────────────────────┘
//! ```
//!
//! ## Module Overview
//!
//! - [`config`]: budget constants and `RunConfig`
//! - [`engine`]: window sizing, re-mapping, transfers and drop-behind
//!
//! ## Platform Support
//!
//! Unix only: the engine calls `mmap`, `munmap`, `msync` and `madvise`
//! through `libc`.

pub mod config;
pub mod engine;

pub use config::{AccessMode, AccessPattern, AdvicePolicy, RunConfig, RunConfigBuilder};
pub use engine::{
    Completion, Direction, EngineError, IoRequest, MappedFile, MmapEngine, Prepared, Result,
    WindowConfig, WindowStats,
};

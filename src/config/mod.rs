//! # mmapio Configuration Module
//!
//! Two kinds of configuration live here:
//!
//! - [`constants`]: compile-time values such as the global mapped-bytes budget
//! - [`RunConfig`]: the immutable description of one run, assembled through
//!   [`RunConfigBuilder`] and handed to [`crate::MmapEngine::init`]
//!
//! `RunConfig` is read-only once built. Every value that depends on it (most
//! importantly the per-file window cap) is derived once at engine init and
//! passed explicitly into each window operation.

pub mod constants;
mod run;

pub use constants::*;
pub use run::{AccessMode, AccessPattern, AdvicePolicy, RunConfig, RunConfigBuilder};

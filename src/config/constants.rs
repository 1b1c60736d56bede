//! # mmapio Configuration Constants
//!
//! This module centralizes the numeric constants of the engine. Constants that
//! depend on each other are co-located so a change to one is checked against
//! the others at compile time.
//!
//! ## Dependency Graph
//!
//! ```text
//! MMAP_TOTAL_BUDGET (1 GiB)
//!       │
//!       └─> window cap per file = MMAP_TOTAL_BUDGET / nr_files
//!             The cap bounds both the window length and the largest
//!             request a run may issue.
//!
//! FALLBACK_PAGE_SIZE (4 KiB)
//!       │
//!       └─> used only when sysconf(_SC_PAGESIZE) reports nothing usable
//! ```

use std::sync::OnceLock;

// ============================================================================
// WINDOW BUDGET
// ============================================================================

/// Total number of bytes that may be mapped at once across every file of a run.
pub const MMAP_TOTAL_BUDGET: u64 = 1024 * 1024 * 1024;

const _: () = assert!(
    MMAP_TOTAL_BUDGET.is_power_of_two(),
    "MMAP_TOTAL_BUDGET should stay a power of two so even splits keep page alignment"
);

// ============================================================================
// VIRTUAL MEMORY
// ============================================================================

/// Page size assumed when the OS query fails.
pub const FALLBACK_PAGE_SIZE: usize = 4096;

static PAGE_SIZE: OnceLock<usize> = OnceLock::new();

/// Returns the VM page size of the host, queried once per process.
pub fn page_size() -> usize {
    *PAGE_SIZE.get_or_init(|| {
        // SAFETY: sysconf has no memory-safety preconditions.
        let raw = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if raw > 0 {
            raw as usize
        } else {
            FALLBACK_PAGE_SIZE
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_is_power_of_two() {
        assert!(page_size().is_power_of_two());
        assert!(page_size() >= 512);
    }

    #[test]
    fn budget_is_one_gib() {
        assert_eq!(MMAP_TOTAL_BUDGET, 1_073_741_824);
    }
}

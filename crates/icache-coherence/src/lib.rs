//! Instruction-cache maintenance for freshly written code.
//!
//! Writing machine code into a mapping and then executing it is only
//! well-defined once the instruction fetch path is guaranteed to observe the
//! writes. The protocol has two halves, and callers publishing code must
//! perform both, in this order:
//!
//! 1. [`clear_cache`] over the written region, while it is still writable:
//!    pushes the new bytes out of the data cache and invalidates any stale
//!    instruction-cache lines covering them;
//! 2. [`pipeline_flush_mt`] after the region has been made executable:
//!    discards already-fetched speculative state on every thread that might
//!    jump to the new code.
//!
//! On x86-family processors the cache hierarchy is coherent with instruction
//! fetch and both operations are no-ops; they exist so the publishing code
//! is correct on architectures with split instruction caches (AArch64,
//! RISC-V, ...) without per-target knowledge at the call site.

use anyhow::Result;
use core::ffi::c_void;

cfg_if::cfg_if! {
    if #[cfg(target_os = "windows")] {
        mod win;
        use win as imp;
    } else {
        mod unix;
        use unix as imp;
    }
}

/// Make the instruction fetch path coherent with data writes to
/// `ptr..ptr+len`. Call while the region is still writable, before flipping
/// it executable.
pub fn clear_cache(ptr: *const c_void, len: usize) -> Result<()> {
    imp::clear_cache(ptr, len)
}

/// Flush the processor pipelines of every thread in this process, so no
/// core keeps executing stale speculation about the published region.
pub fn pipeline_flush_mt() -> Result<()> {
    imp::pipeline_flush_mt()
}

//! Windows implementation: the kernel exposes one call that performs the
//! full publication protocol for a region.

use anyhow::{bail, Result};
use core::ffi::c_void;
use windows_sys::Win32::System::Diagnostics::Debug::FlushInstructionCache;
use windows_sys::Win32::System::Threading::GetCurrentProcess;

pub fn clear_cache(ptr: *const c_void, len: usize) -> Result<()> {
    if unsafe { FlushInstructionCache(GetCurrentProcess(), ptr, len) } == 0 {
        bail!(
            "FlushInstructionCache failed: {}",
            std::io::Error::last_os_error()
        );
    }
    Ok(())
}

/// `FlushInstructionCache` already broadcasts to all processors.
pub fn pipeline_flush_mt() -> Result<()> {
    Ok(())
}

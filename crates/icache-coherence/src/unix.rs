//! Unix implementations, selected per architecture.

use anyhow::Result;
use core::ffi::c_void;

cfg_if::cfg_if! {
    if #[cfg(any(target_arch = "x86", target_arch = "x86_64"))] {

        /// x86 instruction caches snoop data writes; nothing to do.
        pub fn clear_cache(_ptr: *const c_void, _len: usize) -> Result<()> {
            Ok(())
        }

        /// The serializing instructions executed on the way out of a
        /// protection change are sufficient on x86.
        pub fn pipeline_flush_mt() -> Result<()> {
            Ok(())
        }

    } else if #[cfg(all(target_arch = "aarch64", target_vendor = "apple"))] {

        extern "C" {
            fn sys_icache_invalidate(start: *mut c_void, len: usize);
        }

        pub fn clear_cache(ptr: *const c_void, len: usize) -> Result<()> {
            unsafe { sys_icache_invalidate(ptr.cast_mut(), len) };
            Ok(())
        }

        /// `sys_icache_invalidate` already issues the barriers that other
        /// cores need; there is no process-wide flush to request.
        pub fn pipeline_flush_mt() -> Result<()> {
            Ok(())
        }

    } else if #[cfg(all(
        target_arch = "aarch64",
        any(target_os = "linux", target_os = "android")
    ))] {

        use anyhow::{bail, Context};
        use core::arch::asm;
        use std::sync::OnceLock;

        /// Clean the data cache and invalidate the instruction cache over
        /// the region, by cache line. This is the architectural publication
        /// sequence; line sizes come from `CTR_EL0`.
        pub fn clear_cache(ptr: *const c_void, len: usize) -> Result<()> {
            let ctr: u64;
            unsafe {
                asm!("mrs {ctr}, ctr_el0", ctr = out(reg) ctr, options(nomem, nostack, preserves_flags));
            }
            let dline = 4usize << ((ctr >> 16) & 0xf);
            let iline = 4usize << (ctr & 0xf);

            let start = ptr as usize;
            let end = start + len;
            unsafe {
                let mut addr = start & !(dline - 1);
                while addr < end {
                    asm!("dc cvau, {addr}", addr = in(reg) addr, options(nostack, preserves_flags));
                    addr += dline;
                }
                asm!("dsb ish", options(nostack, preserves_flags));
                let mut addr = start & !(iline - 1);
                while addr < end {
                    asm!("ic ivau, {addr}", addr = in(reg) addr, options(nostack, preserves_flags));
                    addr += iline;
                }
                asm!("dsb ish", "isb", options(nostack, preserves_flags));
            }
            Ok(())
        }

        /// Context-synchronize every thread in the process through the
        /// `membarrier` sync-core command, registering on first use.
        pub fn pipeline_flush_mt() -> Result<()> {
            // Not in libc's constant tables yet.
            const MEMBARRIER_CMD_PRIVATE_EXPEDITED_SYNC_CORE: libc::c_int = 1 << 5;
            const MEMBARRIER_CMD_REGISTER_PRIVATE_EXPEDITED_SYNC_CORE: libc::c_int = 1 << 6;

            fn membarrier(cmd: libc::c_int) -> std::io::Result<()> {
                let rc = unsafe { libc::syscall(libc::SYS_membarrier, cmd, 0, 0) };
                if rc < 0 {
                    Err(std::io::Error::last_os_error())
                } else {
                    Ok(())
                }
            }

            static REGISTERED: OnceLock<bool> = OnceLock::new();
            let registered = *REGISTERED.get_or_init(|| {
                membarrier(MEMBARRIER_CMD_REGISTER_PRIVATE_EXPEDITED_SYNC_CORE).is_ok()
            });
            if !registered {
                bail!("kernel does not support membarrier sync-core");
            }
            membarrier(MEMBARRIER_CMD_PRIVATE_EXPEDITED_SYNC_CORE)
                .context("membarrier sync-core failed")
        }

    } else {

        use anyhow::bail;

        pub fn clear_cache(_ptr: *const c_void, _len: usize) -> Result<()> {
            bail!("no instruction-cache maintenance for this architecture")
        }

        pub fn pipeline_flush_mt() -> Result<()> {
            bail!("no pipeline flush for this architecture")
        }

    }
}

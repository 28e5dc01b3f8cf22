//! Lifecycle management of the executable region behind a compiled batch.
//!
//! A region moves through three states:
//!
//! ```text
//! (start) ─allocate→ Allocated (RW) ─arm→ Armed (RX) ─release→ Released
//!          Allocated ─release→ Released
//! ```
//!
//! The entry pointer exists only while armed. Arming performs the required
//! instruction-cache maintenance around the protection flip: a no-op on
//! x86-family hosts, a real flush and pipeline barrier on architectures with
//! split instruction caches.

use crate::error::Error;
use crate::sys;
use std::ptr::NonNull;

/// An exclusively-owned region of code memory.
#[derive(Debug)]
pub struct CodeMemory {
    region: Option<sys::Mmap>,
    entry: Option<NonNull<u8>>,
}

// The entry pointer aliases the owned mapping; once armed the region is
// immutable and the code behind it is pure, so shared cross-thread access
// is sound.
unsafe impl Send for CodeMemory {}
unsafe impl Sync for CodeMemory {}

impl CodeMemory {
    /// Obtain a writable region covering at least `size` bytes, rounded up
    /// to the host page granularity (minimum one page), zero-filled.
    pub fn allocate(size: usize) -> Result<Self, Error> {
        let page = sys::page_size();
        let rounded = size
            .checked_add(page - 1)
            .map(|s| s / page * page)
            .map(|s| s.max(page))
            .ok_or_else(|| Error::AllocationFailed {
                size: usize::MAX,
                source: std::io::Error::from(std::io::ErrorKind::OutOfMemory),
            })?;
        let region = sys::Mmap::new(rounded).map_err(|source| Error::AllocationFailed {
            size: rounded,
            source,
        })?;
        log::debug!("allocated {rounded:#x} bytes of code memory");
        Ok(Self {
            region: Some(region),
            entry: None,
        })
    }

    /// The writable view, for the emission pass.
    ///
    /// # Panics
    ///
    /// Panics once the region is armed or released; emitted code is never
    /// patched after the fact.
    pub fn writable(&mut self) -> &mut [u8] {
        assert!(self.entry.is_none(), "region is already armed");
        self.region
            .as_mut()
            .expect("region is released")
            .as_mut_slice()
    }

    /// Page-rounded size of the backing region; zero once released.
    pub fn len(&self) -> usize {
        self.region.as_ref().map_or(0, |m| m.len())
    }

    /// Whether the backing region is gone.
    pub fn is_empty(&self) -> bool {
        self.region.is_none()
    }

    /// Flip the region to read+execute and publish the entry pointer.
    ///
    /// On failure the region is released first (there is nothing useful a
    /// caller can do with a half-armed mapping), then the error returned.
    pub fn arm(&mut self) -> Result<(), Error> {
        let region = self.region.as_mut().ok_or(Error::NotAllocated)?;

        // Order matters: flush writes out of the data cache while the
        // mapping is still writable, flip the protection, then force every
        // core to discard stale speculation before anything calls in.
        let (ptr, len) = (region.as_ptr(), region.len());
        let flush = lsejit_icache_coherence::clear_cache(ptr.cast(), len)
            .and_then(|()| {
                region.make_executable()?;
                Ok(())
            })
            .and_then(|()| lsejit_icache_coherence::pipeline_flush_mt());

        match flush {
            Ok(()) => {
                self.entry = NonNull::new(ptr.cast_mut());
                log::debug!("armed {len:#x} bytes of code memory at {ptr:p}");
                Ok(())
            }
            Err(e) => {
                let source = std::io::Error::other(format!("{e:#}"));
                if let Err(release) = self.release() {
                    log::warn!("failed to release after arm failure: {release}");
                }
                Err(Error::ProtectionFailed { size: len, source })
            }
        }
    }

    /// Entry pointer of the armed region; `None` in any other state.
    pub fn entry(&self) -> Option<NonNull<u8>> {
        self.entry
    }

    /// Unmap the backing region. Idempotent: releasing an already-released
    /// handle is a no-op.
    pub fn release(&mut self) -> Result<(), Error> {
        self.entry = None;
        match self.region.take() {
            Some(region) => region.unmap().map_err(Error::ReleaseFailed),
            None => Ok(()),
        }
    }
}

impl Drop for CodeMemory {
    fn drop(&mut self) {
        // Backstop for handles dropped without an explicit release; the
        // inner mapping logs if the OS refuses the unmap.
        self.entry = None;
        self.region = None;
    }
}

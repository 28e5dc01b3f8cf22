//! Raw page-granular mappings, one implementation per platform family.

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        mod unix;
        use unix as imp;
    } else if #[cfg(windows)] {
        mod windows;
        use windows as imp;
    } else {
        compile_error!("no virtual-memory backend for this platform");
    }
}

use std::io;

/// Host page granularity in bytes.
pub fn page_size() -> usize {
    imp::page_size()
}

/// An anonymous, private, zero-filled read+write mapping.
///
/// This is the thin ownership layer under `CodeMemory`: it knows how to map,
/// reprotect and unmap, and nothing about lifecycle states. `len` is always
/// a positive multiple of [`page_size`].
#[derive(Debug)]
pub struct Mmap {
    ptr: *mut u8,
    len: usize,
}

// The mapping is exclusively owned and carries no thread affinity.
unsafe impl Send for Mmap {}
unsafe impl Sync for Mmap {}

impl Mmap {
    /// Map `len` bytes read+write. `len` must already be page-rounded.
    pub fn new(len: usize) -> io::Result<Self> {
        debug_assert!(len > 0 && len % page_size() == 0);
        let ptr = imp::map_rw(len)?;
        Ok(Self { ptr, len })
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.ptr
    }

    pub fn len(&self) -> usize {
        self.len
    }

    /// View the whole mapping. Only meaningful while it is still writable.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr, self.len) }
    }

    /// Flip the protection to read+execute.
    pub fn make_executable(&mut self) -> io::Result<()> {
        unsafe { imp::protect_rx(self.ptr, self.len) }
    }

    /// Tear the mapping down, consuming it. [`Drop`] does the same but
    /// swallows the OS result; this form reports it.
    pub fn unmap(self) -> io::Result<()> {
        let result = unsafe { imp::unmap(self.ptr, self.len) };
        std::mem::forget(self);
        result
    }
}

impl Drop for Mmap {
    fn drop(&mut self) {
        if let Err(e) = unsafe { imp::unmap(self.ptr, self.len) } {
            log::warn!("failed to unmap {:#x} bytes: {e}", self.len);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_is_a_power_of_two() {
        let page = page_size();
        assert!(page.is_power_of_two());
    }

    #[test]
    fn mapping_is_zero_filled_and_writable() {
        let page = page_size();
        let mut m = Mmap::new(page).unwrap();
        assert_eq!(m.len(), page);
        assert!(m.as_mut_slice().iter().all(|&b| b == 0));
        m.as_mut_slice()[0] = 0xc3;
        assert_eq!(m.as_mut_slice()[0], 0xc3);
        m.unmap().unwrap();
    }
}

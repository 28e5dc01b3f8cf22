//! Unix mappings via `rustix::mm`.

use rustix::mm::{mmap_anonymous, mprotect, munmap, MapFlags, MprotectFlags, ProtFlags};
use std::io;
use std::ptr;

pub fn page_size() -> usize {
    rustix::param::page_size()
}

pub fn map_rw(len: usize) -> io::Result<*mut u8> {
    let ptr = unsafe {
        mmap_anonymous(
            ptr::null_mut(),
            len,
            ProtFlags::READ | ProtFlags::WRITE,
            MapFlags::PRIVATE,
        )?
    };
    Ok(ptr.cast())
}

pub unsafe fn protect_rx(ptr: *mut u8, len: usize) -> io::Result<()> {
    unsafe { mprotect(ptr.cast(), len, MprotectFlags::READ | MprotectFlags::EXEC)? };
    Ok(())
}

pub unsafe fn unmap(ptr: *mut u8, len: usize) -> io::Result<()> {
    unsafe { munmap(ptr.cast(), len)? };
    Ok(())
}

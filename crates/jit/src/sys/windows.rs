//! Windows mappings via `VirtualAlloc`/`VirtualProtect`/`VirtualFree`.

use std::io;
use std::mem;
use std::ptr;
use windows_sys::Win32::System::Memory::{
    VirtualAlloc, VirtualFree, VirtualProtect, MEM_COMMIT, MEM_RELEASE, MEM_RESERVE,
    PAGE_EXECUTE_READ, PAGE_READWRITE,
};
use windows_sys::Win32::System::SystemInformation::{GetSystemInfo, SYSTEM_INFO};

pub fn page_size() -> usize {
    unsafe {
        let mut info: SYSTEM_INFO = mem::zeroed();
        GetSystemInfo(&mut info);
        info.dwPageSize as usize
    }
}

pub fn map_rw(len: usize) -> io::Result<*mut u8> {
    let ptr = unsafe {
        VirtualAlloc(
            ptr::null_mut(),
            len,
            MEM_COMMIT | MEM_RESERVE,
            PAGE_READWRITE,
        )
    };
    if ptr.is_null() {
        return Err(io::Error::last_os_error());
    }
    Ok(ptr.cast())
}

pub unsafe fn protect_rx(ptr: *mut u8, len: usize) -> io::Result<()> {
    let mut old = 0;
    if unsafe { VirtualProtect(ptr.cast(), len, PAGE_EXECUTE_READ, &mut old) } == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

pub unsafe fn unmap(ptr: *mut u8, _len: usize) -> io::Result<()> {
    // VirtualFree with MEM_RELEASE requires a zero size.
    if unsafe { VirtualFree(ptr.cast(), 0, MEM_RELEASE) } == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

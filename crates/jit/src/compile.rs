//! Compilation entry points and the handle to an armed callable.

use crate::batch::{self, Range};
use crate::code_memory::CodeMemory;
use crate::emit::{self, CodeSink};
use crate::error::Error;
use crate::isa::{self, TargetIsa};
use crate::MAX_WIDTH;

/// The signature of an emitted callable.
///
/// The base pointer is the only argument the generated code reads; the range
/// table and count exist so a compiled batch and a scalar interpreter can be
/// called interchangeably. The convention is pinned to System V (the
/// templates hard-code its argument registers), which Rust can name on any
/// x86-64 host.
///
/// # Safety
///
/// The callee assumes `offset + width` elements are readable behind
/// `array_base` for every compiled range, and must only be called through a
/// handle that is still armed.
#[cfg(target_arch = "x86_64")]
pub type BatchFn =
    unsafe extern "sysv64" fn(array_base: *const f64, ranges: *const Range, n_ranges: i32) -> f64;

/// A batch compiled to native code, armed and ready to call.
///
/// The handle owns its code region exclusively; dropping it unmaps the
/// region. The emitted code is pure (it reads only through the array
/// argument, writes no memory and touches no callee-saved state), so a
/// single armed handle may be invoked from many threads at once.
#[derive(Debug)]
pub struct CompiledBatch {
    code: CodeMemory,
    ranges: Vec<Range>,
    min_input_len: usize,
}

/// Compile `ranges` with the host's native catalog.
///
/// One callable is produced per batch; ranges are visited strictly in the
/// order given. The callable returns the sum over the batch of
/// `fast_log(sum_j(fast_exp(a[offset + j])))`, with the width-1 bypass
/// returning the element itself.
pub fn compile(ranges: &[Range]) -> Result<CompiledBatch, Error> {
    compile_with_isa(isa::host().map_err(Error::Unsupported)?, ranges)
}

/// Compile `ranges` against an explicit catalog.
pub fn compile_with_isa(
    isa: &dyn TargetIsa,
    ranges: &[Range],
) -> Result<CompiledBatch, Error> {
    batch::validate(ranges)?;
    let size = emit::batch_code_size(isa, ranges);
    let mut code = CodeMemory::allocate(size)?;
    let mut sink = CodeSink::new(code.writable());
    emit::emit_batch(isa, ranges, &mut sink);
    assert_eq!(sink.offset(), size, "size pass and emission disagree");
    code.arm()?;
    log::debug!(
        "compiled batch of {} ranges: {size} bytes of {} code",
        ranges.len(),
        isa.name(),
    );
    Ok(CompiledBatch {
        code,
        ranges: ranges.to_vec(),
        min_input_len: ranges.iter().map(Range::end).max().unwrap_or(0),
    })
}

/// Compile the single-span form: `log_sum_exp(a[0..width])`, `width` up to
/// [`MAX_WIDTH`]. A width of zero is permitted and evaluates to `-inf`.
///
/// This is the earlier generation of the engine, kept alongside the batch
/// path: the running max is built by a daisy chain of pair maxes rather
/// than the balanced tree (see the TODO in [`emit::emit_chained`]).
pub fn compile_chained(width: usize) -> Result<CompiledBatch, Error> {
    compile_chained_with_isa(isa::host().map_err(Error::Unsupported)?, width)
}

/// [`compile_chained`] against an explicit catalog.
pub fn compile_chained_with_isa(
    isa: &dyn TargetIsa,
    width: usize,
) -> Result<CompiledBatch, Error> {
    if width > MAX_WIDTH {
        return Err(Error::WidthOutOfRange {
            index: 0,
            width: width as i32,
        });
    }
    let size = emit::chained_code_size(isa, width);
    let mut code = CodeMemory::allocate(size)?;
    let mut sink = CodeSink::new(code.writable());
    emit::emit_chained(isa, width, &mut sink);
    assert_eq!(sink.offset(), size, "size pass and emission disagree");
    code.arm()?;
    Ok(CompiledBatch {
        code,
        ranges: vec![Range::new(0, width as i32)],
        min_input_len: width,
    })
}

impl CompiledBatch {
    /// The ranges this callable was compiled from, in emission order.
    pub fn ranges(&self) -> &[Range] {
        &self.ranges
    }

    /// Smallest input length satisfying the callable's precondition.
    pub fn min_input_len(&self) -> usize {
        self.min_input_len
    }

    /// Size in bytes of the backing region (a positive multiple of the host
    /// page size).
    pub fn region_len(&self) -> usize {
        self.code.len()
    }

    /// Address of the entry point. The handle is armed for its whole
    /// lifetime, so this always exists.
    pub fn entry_addr(&self) -> usize {
        self.code
            .entry()
            .expect("compiled batch is always armed")
            .as_ptr() as usize
    }

    /// The raw entry pointer.
    ///
    /// # Safety
    ///
    /// Calling it is safe only while `self` is alive and the array argument
    /// satisfies the compiled ranges' bounds; see [`BatchFn`].
    #[cfg(target_arch = "x86_64")]
    pub fn entry(&self) -> BatchFn {
        let addr = self.entry_addr();
        unsafe { std::mem::transmute::<usize, BatchFn>(addr) }
    }

    /// Invoke the callable on `data`.
    ///
    /// # Panics
    ///
    /// Panics if `data` is shorter than [`Self::min_input_len`]; bounds are
    /// baked into the code at compile time, so a short slice would read out
    /// of bounds rather than fail cleanly.
    #[cfg(target_arch = "x86_64")]
    pub fn invoke(&self, data: &[f64]) -> f64 {
        assert!(
            data.len() >= self.min_input_len,
            "input of {} elements is shorter than the compiled extent {}",
            data.len(),
            self.min_input_len,
        );
        let entry = self.entry();
        unsafe {
            entry(
                data.as_ptr(),
                self.ranges.as_ptr(),
                self.ranges.len() as i32,
            )
        }
    }

    /// Unmap the code region, surfacing any OS failure. Dropping the handle
    /// does the same but only logs.
    pub fn release(mut self) -> Result<(), Error> {
        self.code.release()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::x64::X64;

    #[test]
    fn compile_rejects_out_of_range_widths() {
        let err = compile_with_isa(&X64, &[Range::new(0, 11)]).unwrap_err();
        assert!(matches!(err, Error::WidthOutOfRange { index: 0, width: 11 }));
        let err = compile_chained_with_isa(&X64, MAX_WIDTH + 1).unwrap_err();
        assert!(matches!(err, Error::WidthOutOfRange { .. }));
    }

    #[test]
    fn handle_reports_region_geometry() {
        let page = crate::sys::page_size();
        let batch = compile_with_isa(&X64, &[Range::new(2, 3)]).unwrap();
        assert_eq!(batch.region_len() % page, 0);
        assert_eq!(batch.entry_addr() % page, 0);
        assert_eq!(batch.min_input_len(), 5);
        batch.release().unwrap();
    }
}

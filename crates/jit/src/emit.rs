//! The two emission passes: exact sizing and template concatenation.
//!
//! Both passes walk the batch identically; the first only sums fragment
//! lengths, the second copies fragments into a [`CodeSink`] and splices the
//! pointer displacement into each `POINTER_ADJUST` hole. The byte counts
//! must agree exactly; the emitter asserts it, and the compile layer sizes
//! its allocation from the first pass.

use crate::batch::Range;
use crate::isa::TargetIsa;

/// A bounds-checked cursor over a caller-provided buffer.
///
/// The shape follows a memory code sink: templates are appended at the
/// cursor, and the single patchable literal is rewritten in place after its
/// template has been copied. Overrunning the buffer is a bug in the size
/// pass and panics rather than corrupting the mapping.
pub struct CodeSink<'a> {
    buf: &'a mut [u8],
    offset: usize,
}

impl<'a> CodeSink<'a> {
    /// Wrap a zero-initialized output buffer.
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, offset: 0 }
    }

    /// Number of bytes written so far.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Append a fragment at the cursor.
    pub fn put_data(&mut self, data: &[u8]) {
        self.buf[self.offset..self.offset + data.len()].copy_from_slice(data);
        self.offset += data.len();
    }

    /// Overwrite already-emitted bytes at an absolute offset.
    pub fn patch_data(&mut self, at: usize, data: &[u8]) {
        debug_assert!(at + data.len() <= self.offset);
        self.buf[at..at + data.len()].copy_from_slice(data);
    }
}

/// Exact byte count of the code [`emit_batch`] produces for `ranges`.
///
/// Per range: a pointer adjust, then either the width-1 bypass
/// (load + accumulate) or the full reduction (max tree, register move,
/// exp init, a load + exp step per element, log finish); bracketed by one
/// prologue and one epilogue. Widths must already be validated.
pub fn batch_code_size(isa: &dyn TargetIsa, ranges: &[Range]) -> usize {
    let mut size = isa.prologue().len();
    for r in ranges {
        let n = r.width as usize;
        size += isa.pointer_adjust().len();
        if n == 1 {
            size += isa.load_elem(0).len() + isa.accumulate().len();
        } else {
            size += isa.max_tree(n).len() + isa.move_max_to_acc().len();
            size += isa.fastexp_init().len();
            for i in 0..n {
                size += isa.load_elem(i).len() + isa.fastexp_step().len();
            }
            size += isa.fastlog().len();
        }
    }
    size + isa.epilogue().len()
}

/// Emit the callable for `ranges` into `sink`, in batch order.
///
/// The displacement spliced into each pointer adjust is
/// `(offset - previous_offset) * size_of::<f64>()`, signed; the first range
/// is relative to offset zero, the base pointer the ABI hands us.
pub fn emit_batch(isa: &dyn TargetIsa, ranges: &[Range], sink: &mut CodeSink<'_>) {
    let expected = batch_code_size(isa, ranges);
    let start = sink.offset();

    sink.put_data(isa.prologue());
    let mut prev_offset = 0i64;
    for r in ranges {
        let n = r.width as usize;
        let delta = i64::from(r.offset) - prev_offset;
        prev_offset = i64::from(r.offset);
        put_pointer_adjust(isa, sink, delta * core::mem::size_of::<f64>() as i64);

        if n == 1 {
            // log_sum_exp of a single element is that element; skip both
            // approximations entirely.
            sink.put_data(isa.load_elem(0));
            sink.put_data(isa.accumulate());
        } else {
            sink.put_data(isa.max_tree(n));
            sink.put_data(isa.move_max_to_acc());
            sink.put_data(isa.fastexp_init());
            for i in 0..n {
                sink.put_data(isa.load_elem(i));
                sink.put_data(isa.fastexp_step());
            }
            sink.put_data(isa.fastlog());
        }
    }
    sink.put_data(isa.epilogue());

    debug_assert_eq!(sink.offset() - start, expected);
    log::trace!(
        "emitted {} bytes of {} code for {} ranges",
        sink.offset() - start,
        isa.name(),
        ranges.len(),
    );
}

/// Exact byte count of the code [`emit_chained`] produces for one span.
pub fn chained_code_size(isa: &dyn TargetIsa, width: usize) -> usize {
    let mut size = isa.prologue().len() + isa.fmax_init().len();
    for i in 0..width {
        size += isa.load_elem(i).len() + isa.max_step().len();
    }
    size += isa.fastexp_init().len();
    for i in 0..width {
        size += isa.load_elem(i).len() + isa.fastexp_step().len();
    }
    size + isa.fastlog().len() + isa.epilogue().len()
}

/// Emit the earlier single-span generation: `log_sum_exp(a[0..width])` with
/// the running max built by daisy-chained pair maxes.
///
/// TODO: the chained first pass has dependency depth `width`; replace it
/// with the balanced `max_tree` fragments (depth `ceil(log2 width)`) the
/// batch path already uses.
///
/// TODO: neither generation bails out early when the running max is `-inf`;
/// an early return would skip the dead exp pass without changing any result
/// on valid inputs.
pub fn emit_chained(isa: &dyn TargetIsa, width: usize, sink: &mut CodeSink<'_>) {
    let expected = chained_code_size(isa, width);
    let start = sink.offset();

    sink.put_data(isa.prologue());
    sink.put_data(isa.fmax_init());
    for i in 0..width {
        sink.put_data(isa.load_elem(i));
        sink.put_data(isa.max_step());
    }
    sink.put_data(isa.fastexp_init());
    for i in 0..width {
        sink.put_data(isa.load_elem(i));
        sink.put_data(isa.fastexp_step());
    }
    sink.put_data(isa.fastlog());
    sink.put_data(isa.epilogue());

    debug_assert_eq!(sink.offset() - start, expected);
    log::trace!(
        "emitted {} bytes of chained {} code for width {width}",
        sink.offset() - start,
        isa.name(),
    );
}

fn put_pointer_adjust(isa: &dyn TargetIsa, sink: &mut CodeSink<'_>, delta_bytes: i64) {
    let template = isa.pointer_adjust();
    let hole = sink.offset() + template.literal_at;
    sink.put_data(template.bytes);
    sink.patch_data(hole, &delta_bytes.to_le_bytes());
}

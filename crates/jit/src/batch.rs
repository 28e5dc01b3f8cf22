//! Range descriptors, the unit of work a batch is made of.

use crate::error::Error;
use crate::MAX_WIDTH;

/// A contiguous sub-slice of the input array: `width` doubles starting at
/// array index `offset`.
///
/// The layout is fixed (two 32-bit signed integers, `offset` first) because a
/// pointer to the caller's range table is part of the emitted callable's
/// signature, even though the generated code never reads it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(C)]
pub struct Range {
    /// Index of the first element, relative to the array base pointer.
    pub offset: i32,
    /// Number of elements, in `1..=MAX_WIDTH`.
    pub width: i32,
}

impl Range {
    /// Construct a range descriptor.
    pub fn new(offset: i32, width: i32) -> Self {
        Self { offset, width }
    }

    /// One-past-the-end array index of this range.
    pub(crate) fn end(&self) -> usize {
        self.offset as usize + self.width as usize
    }
}

/// Check every width in the batch against `1..=MAX_WIDTH`. The first
/// offender is reported with its position. Offsets must be non-negative;
/// that is a caller precondition rather than a reported error.
pub(crate) fn validate(ranges: &[Range]) -> Result<(), Error> {
    for (index, r) in ranges.iter().enumerate() {
        assert!(r.offset >= 0, "range {index} has negative offset {}", r.offset);
        if r.width < 1 || r.width as usize > MAX_WIDTH {
            return Err(Error::WidthOutOfRange {
                index,
                width: r.width,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::mem::{align_of, offset_of, size_of};

    #[test]
    fn layout_matches_the_callable_signature() {
        assert_eq!(size_of::<Range>(), 8);
        assert_eq!(align_of::<Range>(), 4);
        assert_eq!(offset_of!(Range, offset), 0);
        assert_eq!(offset_of!(Range, width), 4);
    }

    #[test]
    fn validate_accepts_full_width_range() {
        validate(&[Range::new(0, MAX_WIDTH as i32)]).unwrap();
    }

    #[test]
    fn validate_rejects_bad_widths() {
        assert!(validate(&[Range::new(0, 0)]).is_err());
        assert!(validate(&[Range::new(0, MAX_WIDTH as i32 + 1)]).is_err());
        let err = validate(&[Range::new(0, 1), Range::new(4, 11)]).unwrap_err();
        assert!(err.to_string().contains("width 11"), "{err}");
    }

    #[test]
    #[should_panic(expected = "negative offset")]
    fn validate_panics_on_negative_offset() {
        let _ = validate(&[Range::new(-1, 1)]);
    }
}

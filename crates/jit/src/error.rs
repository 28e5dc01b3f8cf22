//! Errors surfaced by compilation and by the executable-memory lifecycle.

use std::io;
use thiserror::Error;

/// The closed set of failures the engine reports. Nothing is retried
/// internally; every variant is returned to the caller on first occurrence.
#[derive(Debug, Error)]
pub enum Error {
    /// The operating system refused to map a region of the requested size.
    /// Retrying with a smaller batch may succeed.
    #[error("failed to allocate {size:#x} bytes of code memory")]
    AllocationFailed {
        /// Page-rounded size of the attempted mapping.
        size: usize,
        #[source]
        source: io::Error,
    },

    /// The operating system refused to flip the region to read+execute.
    /// The region has already been released by the time this is returned.
    #[error("failed to make {size:#x} bytes of code memory executable")]
    ProtectionFailed {
        /// Size of the region whose protection change failed.
        size: usize,
        #[source]
        source: io::Error,
    },

    /// `arm` was called on a handle whose backing region is gone.
    #[error("no backing region to arm")]
    NotAllocated,

    /// The operating system reported a failure while unmapping the region.
    #[error("failed to unmap code memory")]
    ReleaseFailed(#[source] io::Error),

    /// A range in the batch has a width outside `1..=MAX_WIDTH`. This is a
    /// programmer error in the caller, not a transient condition.
    #[error("range {index} has width {width} outside the supported range")]
    WidthOutOfRange {
        /// Position of the offending range within the batch.
        index: usize,
        /// The rejected width.
        width: i32,
    },

    /// The host has no usable emission back-end (unsupported architecture,
    /// or the CPU lacks the instruction-set extensions the templates use).
    #[error("unsupported host: {0}")]
    Unsupported(&'static str),
}

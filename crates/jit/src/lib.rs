//! Runtime code generation for batched log-sum-exp reductions.
//!
//! Given a batch of `(offset, width)` ranges over a shared `f64` array, this
//! crate emits one native callable that computes
//!
//! ```text
//! sum over ranges of log(sum_i(exp(a[offset + i])))
//! ```
//!
//! with `exp` and `log` replaced by the bit-affine approximations in
//! [`approx`], fused directly into the instruction stream. Compilation is
//! template concatenation: the per-target catalogs in [`isa`] provide
//! pre-assembled, position-independent fragments, the emitter lays them out
//! in batch order into a fresh anonymous mapping, and [`CodeMemory`] flips
//! the mapping to read+execute ("arms" it) once emission is complete.
//!
//! ```no_run
//! use lsejit::{compile, Range};
//!
//! let batch = compile(&[Range::new(3, 1), Range::new(0, 2)])?;
//! let data = [0.5_f64.ln(), 0.5_f64.ln(), 0.0, 7.5];
//! # #[cfg(target_arch = "x86_64")]
//! let total = batch.invoke(&data); // 7.5 + fast-log-sum-exp of the pair
//! # Ok::<(), lsejit::Error>(())
//! ```
//!
//! Emitted callables are pure (they read only through the array argument)
//! and may be invoked concurrently from any number of threads; each handle,
//! however, must be compiled and armed by one thread at a time. There is no
//! configuration, no persisted state, and nothing is ever patched after
//! arming.

pub mod approx;
mod batch;
mod code_memory;
mod compile;
mod emit;
mod error;
pub mod isa;
mod sys;

pub use batch::Range;
pub use code_memory::CodeMemory;
#[cfg(target_arch = "x86_64")]
pub use compile::BatchFn;
pub use compile::{
    compile, compile_chained, compile_chained_with_isa, compile_with_isa, CompiledBatch,
};
pub use error::Error;
pub use sys::page_size;

/// Upper bound on the width of a single range. The catalogs carry a
/// reduction tree for every width up to and including this.
pub const MAX_WIDTH: usize = 10;

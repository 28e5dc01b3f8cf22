//! x86-64 template catalog (AVX + FMA, System V calling convention).
//!
//! Fragments use `xmm0`-`xmm7` and `rcx`/`rax` only, all caller-saved under
//! System V, and address the input array through `rdi`. Displacements stay
//! within one signed byte because slots are bounded by `MAX_WIDTH`.
//!
//! The approximation coefficients appear below as `movabs` immediates; the
//! `immediates_match_the_constants` test ties every one of them back to the
//! closed forms in [`crate::approx`].

use super::{AdjustTemplate, TargetIsa};
use crate::MAX_WIDTH;

/// The x86-64 catalog. A unit struct: every fragment is `'static`.
pub struct X64;

/// `vmovsd i*8(%rdi),%xmm3` for each supported slot.
const LOAD_A_XMM3: [&[u8]; MAX_WIDTH] = [
    &[0xc5, 0xfb, 0x10, 0x1f],       // vmovsd (%rdi),%xmm3
    &[0xc5, 0xfb, 0x10, 0x5f, 0x08], // vmovsd 0x8(%rdi),%xmm3
    &[0xc5, 0xfb, 0x10, 0x5f, 0x10], // vmovsd 0x10(%rdi),%xmm3
    &[0xc5, 0xfb, 0x10, 0x5f, 0x18], // vmovsd 0x18(%rdi),%xmm3
    &[0xc5, 0xfb, 0x10, 0x5f, 0x20], // vmovsd 0x20(%rdi),%xmm3
    &[0xc5, 0xfb, 0x10, 0x5f, 0x28], // vmovsd 0x28(%rdi),%xmm3
    &[0xc5, 0xfb, 0x10, 0x5f, 0x30], // vmovsd 0x30(%rdi),%xmm3
    &[0xc5, 0xfb, 0x10, 0x5f, 0x38], // vmovsd 0x38(%rdi),%xmm3
    &[0xc5, 0xfb, 0x10, 0x5f, 0x40], // vmovsd 0x40(%rdi),%xmm3
    &[0xc5, 0xfb, 0x10, 0x5f, 0x48], // vmovsd 0x48(%rdi),%xmm3
];

/// `vxorpd %xmm0,%xmm0,%xmm0`: zero the outer accumulator.
const PROLOGUE: &[u8] = &[0xc5, 0xf9, 0x57, 0xc0];

/// `retq`. The outer accumulator already lives in `xmm0`, the System V
/// float return register, so nothing needs moving.
const EPILOGUE: &[u8] = &[0xc3];

/// Load `-inf` into the running-max register.
const FMAX_INIT: &[u8] = &[
    0x48, 0xb9, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xf0, 0xff, // movabs $0xfff0000000000000,%rcx
    0xc4, 0xe1, 0xf9, 0x6e, 0xc9, // vmovq %rcx,%xmm1
];

/// `vmaxsd %xmm3,%xmm1,%xmm1`: one daisy-chain step of the running max.
const MAX_STEP: &[u8] = &[0xc5, 0xf3, 0x5f, 0xcb];

/// `vmovapd %xmm3,%xmm1`: publish the tree result as the running max.
const MOVE_MAX_TO_MAXACC: &[u8] = &[0xc5, 0xf9, 0x28, 0xcb];

/// Balanced max reductions, `MAX_TREE[n]` leaving `max(a[0..n])` in `xmm3`.
///
/// Leaves fold a pair straight from memory (`vmovsd` then `vmaxsd` with a
/// memory operand), inner levels reduce register-to-register. Dependency
/// depth is `ceil(log2 n)` for every entry; `xmm3`–`xmm7` are free at this
/// point in the schedule, which is exactly enough for the five leaf pairs of
/// `n = 10`.
const MAX_TREE: [&[u8]; MAX_WIDTH + 1] = [
    // n = 0: the max over nothing is -inf.
    &[
        0x48, 0xb9, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xf0, 0xff, // movabs $0xfff0000000000000,%rcx
        0xc4, 0xe1, 0xf9, 0x6e, 0xd9, // vmovq %rcx,%xmm3
    ],
    // n = 1
    &[
        0xc5, 0xfb, 0x10, 0x1f, // vmovsd (%rdi),%xmm3
    ],
    // n = 2
    &[
        0xc5, 0xfb, 0x10, 0x1f, // vmovsd (%rdi),%xmm3
        0xc5, 0xe3, 0x5f, 0x5f, 0x08, // vmaxsd 0x8(%rdi),%xmm3,%xmm3
    ],
    // n = 3
    &[
        0xc5, 0xfb, 0x10, 0x1f, // vmovsd (%rdi),%xmm3
        0xc5, 0xe3, 0x5f, 0x5f, 0x08, // vmaxsd 0x8(%rdi),%xmm3,%xmm3
        0xc5, 0xe3, 0x5f, 0x5f, 0x10, // vmaxsd 0x10(%rdi),%xmm3,%xmm3
    ],
    // n = 4
    &[
        0xc5, 0xfb, 0x10, 0x1f, // vmovsd (%rdi),%xmm3
        0xc5, 0xe3, 0x5f, 0x5f, 0x08, // vmaxsd 0x8(%rdi),%xmm3,%xmm3
        0xc5, 0xfb, 0x10, 0x67, 0x10, // vmovsd 0x10(%rdi),%xmm4
        0xc5, 0xdb, 0x5f, 0x67, 0x18, // vmaxsd 0x18(%rdi),%xmm4,%xmm4
        0xc5, 0xe3, 0x5f, 0xdc, // vmaxsd %xmm4,%xmm3,%xmm3
    ],
    // n = 5
    &[
        0xc5, 0xfb, 0x10, 0x1f, // vmovsd (%rdi),%xmm3
        0xc5, 0xe3, 0x5f, 0x5f, 0x08, // vmaxsd 0x8(%rdi),%xmm3,%xmm3
        0xc5, 0xfb, 0x10, 0x67, 0x10, // vmovsd 0x10(%rdi),%xmm4
        0xc5, 0xdb, 0x5f, 0x67, 0x18, // vmaxsd 0x18(%rdi),%xmm4,%xmm4
        0xc5, 0xdb, 0x5f, 0x67, 0x20, // vmaxsd 0x20(%rdi),%xmm4,%xmm4
        0xc5, 0xe3, 0x5f, 0xdc, // vmaxsd %xmm4,%xmm3,%xmm3
    ],
    // n = 6
    &[
        0xc5, 0xfb, 0x10, 0x1f, // vmovsd (%rdi),%xmm3
        0xc5, 0xe3, 0x5f, 0x5f, 0x08, // vmaxsd 0x8(%rdi),%xmm3,%xmm3
        0xc5, 0xfb, 0x10, 0x67, 0x10, // vmovsd 0x10(%rdi),%xmm4
        0xc5, 0xdb, 0x5f, 0x67, 0x18, // vmaxsd 0x18(%rdi),%xmm4,%xmm4
        0xc5, 0xfb, 0x10, 0x6f, 0x20, // vmovsd 0x20(%rdi),%xmm5
        0xc5, 0xd3, 0x5f, 0x6f, 0x28, // vmaxsd 0x28(%rdi),%xmm5,%xmm5
        0xc5, 0xdb, 0x5f, 0xe5, // vmaxsd %xmm5,%xmm4,%xmm4
        0xc5, 0xe3, 0x5f, 0xdc, // vmaxsd %xmm4,%xmm3,%xmm3
    ],
    // n = 7
    &[
        0xc5, 0xfb, 0x10, 0x1f, // vmovsd (%rdi),%xmm3
        0xc5, 0xe3, 0x5f, 0x5f, 0x08, // vmaxsd 0x8(%rdi),%xmm3,%xmm3
        0xc5, 0xfb, 0x10, 0x67, 0x10, // vmovsd 0x10(%rdi),%xmm4
        0xc5, 0xdb, 0x5f, 0x67, 0x18, // vmaxsd 0x18(%rdi),%xmm4,%xmm4
        0xc5, 0xfb, 0x10, 0x6f, 0x20, // vmovsd 0x20(%rdi),%xmm5
        0xc5, 0xd3, 0x5f, 0x6f, 0x28, // vmaxsd 0x28(%rdi),%xmm5,%xmm5
        0xc5, 0xfb, 0x10, 0x77, 0x30, // vmovsd 0x30(%rdi),%xmm6
        0xc5, 0xe3, 0x5f, 0xdc, // vmaxsd %xmm4,%xmm3,%xmm3
        0xc5, 0xd3, 0x5f, 0xee, // vmaxsd %xmm6,%xmm5,%xmm5
        0xc5, 0xe3, 0x5f, 0xdd, // vmaxsd %xmm5,%xmm3,%xmm3
    ],
    // n = 8
    &[
        0xc5, 0xfb, 0x10, 0x1f, // vmovsd (%rdi),%xmm3
        0xc5, 0xe3, 0x5f, 0x5f, 0x08, // vmaxsd 0x8(%rdi),%xmm3,%xmm3
        0xc5, 0xfb, 0x10, 0x67, 0x10, // vmovsd 0x10(%rdi),%xmm4
        0xc5, 0xdb, 0x5f, 0x67, 0x18, // vmaxsd 0x18(%rdi),%xmm4,%xmm4
        0xc5, 0xfb, 0x10, 0x6f, 0x20, // vmovsd 0x20(%rdi),%xmm5
        0xc5, 0xd3, 0x5f, 0x6f, 0x28, // vmaxsd 0x28(%rdi),%xmm5,%xmm5
        0xc5, 0xfb, 0x10, 0x77, 0x30, // vmovsd 0x30(%rdi),%xmm6
        0xc5, 0xcb, 0x5f, 0x77, 0x38, // vmaxsd 0x38(%rdi),%xmm6,%xmm6
        0xc5, 0xe3, 0x5f, 0xdc, // vmaxsd %xmm4,%xmm3,%xmm3
        0xc5, 0xd3, 0x5f, 0xee, // vmaxsd %xmm6,%xmm5,%xmm5
        0xc5, 0xe3, 0x5f, 0xdd, // vmaxsd %xmm5,%xmm3,%xmm3
    ],
    // n = 9
    &[
        0xc5, 0xfb, 0x10, 0x1f, // vmovsd (%rdi),%xmm3
        0xc5, 0xe3, 0x5f, 0x5f, 0x08, // vmaxsd 0x8(%rdi),%xmm3,%xmm3
        0xc5, 0xfb, 0x10, 0x67, 0x10, // vmovsd 0x10(%rdi),%xmm4
        0xc5, 0xdb, 0x5f, 0x67, 0x18, // vmaxsd 0x18(%rdi),%xmm4,%xmm4
        0xc5, 0xfb, 0x10, 0x6f, 0x20, // vmovsd 0x20(%rdi),%xmm5
        0xc5, 0xd3, 0x5f, 0x6f, 0x28, // vmaxsd 0x28(%rdi),%xmm5,%xmm5
        0xc5, 0xfb, 0x10, 0x77, 0x30, // vmovsd 0x30(%rdi),%xmm6
        0xc5, 0xcb, 0x5f, 0x77, 0x38, // vmaxsd 0x38(%rdi),%xmm6,%xmm6
        0xc5, 0xfb, 0x10, 0x7f, 0x40, // vmovsd 0x40(%rdi),%xmm7
        0xc5, 0xe3, 0x5f, 0xdc, // vmaxsd %xmm4,%xmm3,%xmm3
        0xc5, 0xd3, 0x5f, 0xee, // vmaxsd %xmm6,%xmm5,%xmm5
        0xc5, 0xe3, 0x5f, 0xdd, // vmaxsd %xmm5,%xmm3,%xmm3
        0xc5, 0xe3, 0x5f, 0xdf, // vmaxsd %xmm7,%xmm3,%xmm3
    ],
    // n = 10
    &[
        0xc5, 0xfb, 0x10, 0x1f, // vmovsd (%rdi),%xmm3
        0xc5, 0xe3, 0x5f, 0x5f, 0x08, // vmaxsd 0x8(%rdi),%xmm3,%xmm3
        0xc5, 0xfb, 0x10, 0x67, 0x10, // vmovsd 0x10(%rdi),%xmm4
        0xc5, 0xdb, 0x5f, 0x67, 0x18, // vmaxsd 0x18(%rdi),%xmm4,%xmm4
        0xc5, 0xfb, 0x10, 0x6f, 0x20, // vmovsd 0x20(%rdi),%xmm5
        0xc5, 0xd3, 0x5f, 0x6f, 0x28, // vmaxsd 0x28(%rdi),%xmm5,%xmm5
        0xc5, 0xfb, 0x10, 0x77, 0x30, // vmovsd 0x30(%rdi),%xmm6
        0xc5, 0xcb, 0x5f, 0x77, 0x38, // vmaxsd 0x38(%rdi),%xmm6,%xmm6
        0xc5, 0xfb, 0x10, 0x7f, 0x40, // vmovsd 0x40(%rdi),%xmm7
        0xc5, 0xc3, 0x5f, 0x7f, 0x48, // vmaxsd 0x48(%rdi),%xmm7,%xmm7
        0xc5, 0xe3, 0x5f, 0xdc, // vmaxsd %xmm4,%xmm3,%xmm3
        0xc5, 0xd3, 0x5f, 0xee, // vmaxsd %xmm6,%xmm5,%xmm5
        0xc5, 0xe3, 0x5f, 0xdd, // vmaxsd %xmm5,%xmm3,%xmm3
        0xc5, 0xe3, 0x5f, 0xdf, // vmaxsd %xmm7,%xmm3,%xmm3
    ],
];

/// Zero the exp accumulator and stage the three `fast_exp` coefficients:
/// `A` in `xmm4`, `B - C` in `xmm5`, the underflow threshold in `xmm6`.
const FASTEXP_INIT: &[u8] = &[
    0xc5, 0xe9, 0x57, 0xd2, // vxorpd %xmm2,%xmm2,%xmm2
    0x48, 0xb9, 0xfe, 0x82, 0x2b, 0x65, 0x47, 0x15, 0x37, 0x43, // movabs $0x43371547652b82fe,%rcx
    0xc4, 0xe1, 0xf9, 0x6e, 0xe1, // vmovq %rcx,%xmm4
    0x48, 0xb9, 0x00, 0x00, 0x80, 0x3f, 0x89, 0xf7, 0xcf, 0x43, // movabs $0x43cff7893f800000,%rcx
    0xc4, 0xe1, 0xf9, 0x6e, 0xe9, // vmovq %rcx,%xmm5
    0x48, 0xb9, 0x00, 0x00, 0x00, 0x00, 0x00, 0x10, 0x86, 0xc0, // movabs $0xc086100000000000,%rcx
    0xc4, 0xe1, 0xf9, 0x6e, 0xf1, // vmovq %rcx,%xmm6
];

/// One `fast_exp` accumulation. Expects the element in `xmm3` and the
/// running max in `xmm1`; the comparison mask doubles as the underflow
/// clamp by and-ing the reinterpreted result.
const FASTEXP_STEP: &[u8] = &[
    0xc5, 0xe3, 0x5c, 0xd9, // vsubsd %xmm1,%xmm3,%xmm3
    0xc5, 0xf9, 0x28, 0xfc, // vmovapd %xmm4,%xmm7
    0xc4, 0xe2, 0xe1, 0xa9, 0xfd, // vfmadd213sd %xmm5,%xmm3,%xmm7
    0xc5, 0xcb, 0xc2, 0xdb, 0x02, // vcmplesd %xmm3,%xmm6,%xmm3
    0xc4, 0xe1, 0xfb, 0x2c, 0xcf, // vcvttsd2si %xmm7,%rcx
    0xc4, 0xe1, 0xf9, 0x6e, 0xf9, // vmovq %rcx,%xmm7
    0xc5, 0xe1, 0x54, 0xdf, // vandpd %xmm7,%xmm3,%xmm3
    0xc5, 0xeb, 0x58, 0xd3, // vaddsd %xmm3,%xmm2,%xmm2
];

/// Finish one reduction: `outer_acc += fast_log(exp_acc) + running_max`.
///
/// Restages its own coefficients (`-inf`, `A^-1`, `-A^-1 (B - C)`) in
/// `xmm4`-`xmm6`, so `FASTEXP_INIT` must run again before the next range.
const FASTLOG: &[u8] = &[
    0xc5, 0xc1, 0x57, 0xff, // vxorpd %xmm7,%xmm7,%xmm7
    0x48, 0xb9, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xf0, 0xff, // movabs $0xfff0000000000000,%rcx
    0xc4, 0xe1, 0xf9, 0x6e, 0xe1, // vmovq %rcx,%xmm4
    0x48, 0xb9, 0xef, 0x39, 0xfa, 0xfe, 0x42, 0x2e, 0xa6, 0x3c, // movabs $0x3ca62e42fefa39ef,%rcx
    0xc4, 0xe1, 0xf9, 0x6e, 0xe9, // vmovq %rcx,%xmm5
    0x48, 0xb9, 0x20, 0x24, 0x35, 0x1e, 0x65, 0x28, 0x86, 0xc0, // movabs $0xc08628651e352420,%rcx
    0xc4, 0xe1, 0xf9, 0x6e, 0xf1, // vmovq %rcx,%xmm6
    0xc4, 0xe1, 0xf9, 0x7e, 0xd0, // vmovq %xmm2,%rax
    0xc4, 0xe1, 0xc3, 0x2a, 0xd8, // vcvtsi2sd %rax,%xmm7,%xmm3
    0xc4, 0xe2, 0xd1, 0xa9, 0xde, // vfmadd213sd %xmm6,%xmm5,%xmm3
    0xc5, 0xc3, 0xc2, 0xd2, 0x01, // vcmpltsd %xmm2,%xmm7,%xmm2
    0xc4, 0xe3, 0x59, 0x4b, 0xd3, 0x20, // vblendvpd %xmm2,%xmm3,%xmm4,%xmm2
    0xc5, 0xf3, 0x58, 0xd2, // vaddsd %xmm2,%xmm1,%xmm2
    0xc5, 0xfb, 0x58, 0xc2, // vaddsd %xmm2,%xmm0,%xmm0
];

/// `outer_acc += elem`: the width-1 bypass that skips both approximations.
const ACCUMULATE_XMM3_XMM0: &[u8] = &[0xc5, 0xfb, 0x58, 0xc3]; // vaddsd %xmm3,%xmm0,%xmm0

/// Advance `rdi` by a byte displacement spliced in at emission time.
const POINTER_ADJUST: &[u8] = &[
    0x48, 0xb9, // movabs $<disp64>,%rcx
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // <disp64>
    0x48, 0x01, 0xcf, // add %rcx,%rdi
];

/// Offset of the displacement literal within [`POINTER_ADJUST`].
const POINTER_ADJUST_LITERAL_AT: usize = 2;

impl TargetIsa for X64 {
    fn name(&self) -> &'static str {
        "x64"
    }

    fn prologue(&self) -> &'static [u8] {
        PROLOGUE
    }

    fn epilogue(&self) -> &'static [u8] {
        EPILOGUE
    }

    fn load_elem(&self, slot: usize) -> &'static [u8] {
        LOAD_A_XMM3[slot]
    }

    fn fmax_init(&self) -> &'static [u8] {
        FMAX_INIT
    }

    fn max_step(&self) -> &'static [u8] {
        MAX_STEP
    }

    fn max_tree(&self, width: usize) -> &'static [u8] {
        MAX_TREE[width]
    }

    fn move_max_to_acc(&self) -> &'static [u8] {
        MOVE_MAX_TO_MAXACC
    }

    fn fastexp_init(&self) -> &'static [u8] {
        FASTEXP_INIT
    }

    fn fastexp_step(&self) -> &'static [u8] {
        FASTEXP_STEP
    }

    fn fastlog(&self) -> &'static [u8] {
        FASTLOG
    }

    fn accumulate(&self) -> &'static [u8] {
        ACCUMULATE_XMM3_XMM0
    }

    fn pointer_adjust(&self) -> AdjustTemplate {
        AdjustTemplate {
            bytes: POINTER_ADJUST,
            literal_at: POINTER_ADJUST_LITERAL_AT,
        }
    }
}

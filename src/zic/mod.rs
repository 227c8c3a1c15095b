//! The Z80 intermediate code model (`spec.md` §4.1).
//!
//! A typed, constructible representation of every Z80 instruction the back
//! end emits, plus virtual-register variants used before register
//! allocation. Mirrors `parishoffman-smol`'s `back/asm.rs`: a flat tagged
//! `Instruction` enum matched exhaustively, `derive_more::Display` on the
//! leaf register/condition enums, and `used_vregs`/`used_registers`-style
//! walkers — but Z80 opcodes and VR selectors instead of RISC-V registers.

mod insn;
mod module;

pub use insn::*;
pub use module::*;

use derive_more::Display;

/// The eight Z80 8-bit registers reachable from ordinary load/ALU
/// instructions (the `IXH`/`IXL` halves are never surfaced at this level;
/// nothing in the selector or allocator needs them).
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub enum Reg8 {
    #[display("A")]
    A,
    #[display("B")]
    B,
    #[display("C")]
    C,
    #[display("D")]
    D,
    #[display("E")]
    E,
    #[display("H")]
    H,
    #[display("L")]
    L,
}

/// Register pairs usable as a 16-bit operand (`ld dd,nn`, `add HL,ss`, ...).
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub enum Reg16 {
    #[display("BC")]
    BC,
    #[display("DE")]
    DE,
    #[display("HL")]
    HL,
    #[display("SP")]
    SP,
    #[display("IX")]
    IX,
}

/// Register pairs pushable/poppable to the stack. `AF` can be pushed/popped
/// but is never a `ld`/`add` operand, hence the separate type.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub enum StackReg {
    #[display("BC")]
    BC,
    #[display("DE")]
    DE,
    #[display("HL")]
    HL,
    #[display("AF")]
    AF,
    #[display("IX")]
    IX,
}

/// Z80 condition codes used by `jp cc,nn`/`ret cc`.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub enum Cond {
    #[display("Z")]
    Z,
    #[display("NZ")]
    NZ,
    #[display("C")]
    C,
    #[display("NC")]
    NC,
    /// Sign flag set (minus): used for signed comparisons after a
    /// subtract-with-borrow chain (`spec.md` §9).
    #[display("M")]
    M,
    /// Sign flag clear (plus).
    #[display("P")]
    P,
}

/// Which byte of a virtual-register pair an 8-bit selector refers to, or
/// "the whole thing" for a single-byte (8-bit) value (`spec.md` §3).
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub enum VrPart {
    /// The value occupies exactly one VR, not a pair (an 8-bit IR value).
    Byte,
    /// The low (least-significant) byte of a VR pair.
    Lo,
    /// The high (most-significant) byte of a VR pair.
    Hi,
}

/// A selector for one byte of virtual-register storage: VR-pair number plus
/// which byte of it.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct VrSel {
    pub vr: u32,
    pub part: VrPart,
}

impl VrSel {
    pub fn byte(vr: u32) -> VrSel {
        VrSel { vr, part: VrPart::Byte }
    }

    pub fn lo(vr: u32) -> VrSel {
        VrSel { vr, part: VrPart::Lo }
    }

    pub fn hi(vr: u32) -> VrSel {
        VrSel { vr, part: VrPart::Hi }
    }
}

/// A selector for an entire 16-bit virtual-register pair.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct VrPairSel {
    pub vr: u32,
}

impl VrPairSel {
    pub fn new(vr: u32) -> VrPairSel {
        VrPairSel { vr }
    }

    pub fn lo(self) -> VrSel {
        VrSel::lo(self.vr)
    }

    pub fn hi(self) -> VrSel {
        VrSel::hi(self.vr)
    }
}

/// Given a value's byte index `i` (0 = least significant) within an N-byte
/// value, return the VR-pair offset and part it lives in, per the canonical
/// layout rule of `spec.md` §3. `base` is the value's first VR-pair number.
///
/// For a single-byte (N=1) value, pass `bytes == 1`; the returned selector
/// uses [`VrPart::Byte`] and ignores `i` (always 0).
pub fn vr_byte_selector(base: u32, bytes: u32, i: u32) -> VrSel {
    debug_assert!(i < bytes);
    if bytes == 1 {
        return VrSel::byte(base);
    }
    let pair_off = i / 2;
    let part = if i % 2 == 0 { VrPart::Lo } else { VrPart::Hi };
    VrSel {
        vr: base + pair_off,
        part,
    }
}

/// Number of consecutive VR pairs an N-byte value spans (1 for an 8-bit
/// value, `bytes/2` for anything wider).
pub fn vr_pairs_for_bytes(bytes: u32) -> u32 {
    if bytes <= 1 {
        1
    } else {
        bytes.div_ceil(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_selector_matches_layout_rule() {
        // 4-byte value based at VR10: bytes 0,1 -> VR10 lo/hi; bytes 2,3 -> VR11 lo/hi.
        assert_eq!(vr_byte_selector(10, 4, 0), VrSel::lo(10));
        assert_eq!(vr_byte_selector(10, 4, 1), VrSel::hi(10));
        assert_eq!(vr_byte_selector(10, 4, 2), VrSel::lo(11));
        assert_eq!(vr_byte_selector(10, 4, 3), VrSel::hi(11));
    }

    #[test]
    fn single_byte_value_uses_whole_byte_part() {
        assert_eq!(vr_byte_selector(3, 1, 0), VrSel::byte(3));
    }

    #[test]
    fn pair_count_rounds_up() {
        assert_eq!(vr_pairs_for_bytes(1), 1);
        assert_eq!(vr_pairs_for_bytes(2), 1);
        assert_eq!(vr_pairs_for_bytes(4), 2);
        assert_eq!(vr_pairs_for_bytes(8), 4);
    }
}

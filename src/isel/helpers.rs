//! Generic width-parametric lowering helpers (`spec.md` §4.4.1). Every
//! per-opcode lowering in `lower.rs` is built out of these instead of
//! hand-rolling byte loops case by case.

use crate::error::Result;
use crate::zic::{
    vr_byte_selector, vr_pairs_for_bytes, Cond, Imm16, Insn, Reg16, Reg8, Target, VAluOp,
    VBitwiseOp, VShiftOp, VrPairSel,
};

use super::context::Emit;

/// `vrr_const`: spill an immediate `value` into `dest` (`bytes` wide), one
/// pair at a time (`ld vrr,nn`), or a single `ld vr,n` for an 8-bit value.
pub fn vrr_const(e: &mut Emit, dest_base: u32, bytes: u32, value: i64) {
    if bytes == 1 {
        e.push(Insn::VLdVrN {
            dst: vr_byte_selector(dest_base, 1, 0),
            n: (value & 0xFF) as u8,
        });
        return;
    }
    for w in 0..vr_pairs_for_bytes(bytes) {
        let word = ((value >> (16 * w)) & 0xFFFF) as u16;
        e.push(Insn::VLdVrrNn {
            dst: VrPairSel::new(dest_base + w),
            nn: Imm16::Const(word as i32),
        });
    }
}

/// `vrr_copy`: byte-by-byte copy, A-mediated, of a `bytes`-wide value.
pub fn vrr_copy(e: &mut Emit, dest_base: u32, src_base: u32, bytes: u32) {
    for i in 0..bytes {
        e.push(Insn::VLdVrVr {
            dst: vr_byte_selector(dest_base, bytes, i),
            src: vr_byte_selector(src_base, bytes, i),
        });
    }
}

/// `vrr_copy_iseg`: copy the low `dbytes.min(sbytes)` bytes of `src` into the
/// matching low bytes of `dest` — truncation when `dbytes < sbytes`, a
/// partial widen when used as the first step of `vrr_extend`.
pub fn vrr_copy_iseg(e: &mut Emit, dest_base: u32, dbytes: u32, src_base: u32, sbytes: u32) {
    let n = dbytes.min(sbytes);
    for i in 0..n {
        e.push(Insn::VLdVrVr {
            dst: vr_byte_selector(dest_base, dbytes, i),
            src: vr_byte_selector(src_base, sbytes, i),
        });
    }
}

/// `vrr_extend`: widen `src` (`sbytes`) into `dest` (`dbytes`, `dbytes >
/// sbytes`). Unsigned: the extra high bytes are zeroed outright. Signed: the
/// extra bytes all take the same fill value, computed once via `spec.md` §8
/// S4's `xor A` / `bit 7,%src.msb` / `jp P` / `dec A` sequence rather than
/// re-testing the sign bit per byte.
pub fn vrr_extend(e: &mut Emit, dest_base: u32, dbytes: u32, src_base: u32, sbytes: u32, signed: bool) {
    vrr_copy_iseg(e, dest_base, dbytes, src_base, sbytes);
    if dbytes <= sbytes {
        return;
    }
    if !signed {
        for i in sbytes..dbytes {
            e.push(Insn::VLdVrN { dst: vr_byte_selector(dest_base, dbytes, i), n: 0 });
        }
        return;
    }
    e.push(Insn::XorR { src: Reg8::A });
    e.push(Insn::VBitBVr { bit: 7, vr: vr_byte_selector(src_base, sbytes, sbytes - 1) });
    let positive = e.fresh_label();
    e.push(Insn::JpCcNn { cc: Cond::P, target: Target::Local(positive) });
    e.push(Insn::DecR { r: Reg8::A });
    e.label_only(positive);
    for i in sbytes..dbytes {
        e.push(Insn::VSpillA { dst: vr_byte_selector(dest_base, dbytes, i) });
    }
}

/// The generic per-byte ALU loop shared by `add`/`sub` and by every helper
/// that needs `dest = lhs OP rhs` across an arbitrary width: byte 0 uses the
/// non-carry op, every further byte uses the carry-propagating form
/// (`spec.md` §4.4.2).
fn alu_loop(e: &mut Emit, dest_base: u32, lhs_base: u32, rhs_base: u32, bytes: u32, subtract: bool) {
    for i in 0..bytes {
        let op = match (i == 0, subtract) {
            (true, false) => VAluOp::Add,
            (false, false) => VAluOp::Adc,
            (true, true) => VAluOp::Sub,
            (false, true) => VAluOp::Sbc,
        };
        e.push(Insn::VAluVr {
            op,
            dst: vr_byte_selector(dest_base, bytes, i),
            lhs: vr_byte_selector(lhs_base, bytes, i),
            rhs: vr_byte_selector(rhs_base, bytes, i),
        });
    }
}

/// `vrr_add`: `dest = lhs + rhs`, byte loop with carry propagation.
pub fn vrr_add(e: &mut Emit, dest_base: u32, lhs_base: u32, rhs_base: u32, bytes: u32) {
    alu_loop(e, dest_base, lhs_base, rhs_base, bytes, false);
}

/// `dest = lhs - rhs`, byte loop with borrow propagation. Named alongside
/// `vrr_add` in spirit, even though `spec.md` §4.4.1 only spells the add form
/// out — `sub`'s contract in §4.4.2 is the same loop with `sbc` in place of
/// `adc`.
pub fn vrr_sub(e: &mut Emit, dest_base: u32, lhs_base: u32, rhs_base: u32, bytes: u32) {
    alu_loop(e, dest_base, lhs_base, rhs_base, bytes, true);
}

/// The generic per-byte bitwise loop shared by `and`/`or`/`xor`.
pub fn vrr_bitwise(e: &mut Emit, op: VBitwiseOp, dest_base: u32, lhs_base: u32, rhs_base: u32, bytes: u32) {
    for i in 0..bytes {
        e.push(Insn::VBitwiseVr {
            op,
            dst: vr_byte_selector(dest_base, bytes, i),
            lhs: vr_byte_selector(lhs_base, bytes, i),
            rhs: vr_byte_selector(rhs_base, bytes, i),
        });
    }
}

/// `bnot`: per-byte complement of `src` into `dest`.
pub fn vrr_bnot(e: &mut Emit, dest_base: u32, src_base: u32, bytes: u32) {
    for i in 0..bytes {
        e.push(Insn::VCplVr {
            dst: vr_byte_selector(dest_base, bytes, i),
            src: vr_byte_selector(src_base, bytes, i),
        });
    }
}

/// `neg_vrr`: two's complement of `src` into `dest` — complement every byte,
/// then add 1. The 16-bit case adds 1 via a single `inc` on a filled
/// register pair; every other width propagates the carry byte by byte,
/// stopping as soon as one byte's increment does not wrap to zero
/// (`spec.md` §4.4.1).
pub fn neg_vrr(e: &mut Emit, dest_base: u32, src_base: u32, bytes: u32) {
    vrr_bnot(e, dest_base, src_base, bytes);
    if bytes == 1 {
        e.push(Insn::VIncVr { vr: vr_byte_selector(dest_base, 1, 0) });
        return;
    }
    if bytes == 2 {
        let pair = VrPairSel::new(dest_base);
        e.push(Insn::VLdR16Vrr { reg: Reg16::HL, src: pair });
        e.push(Insn::IncSs { ss: Reg16::HL });
        e.push(Insn::VLdVrrR16 { dst: pair, reg: Reg16::HL });
        return;
    }
    let end = e.fresh_label();
    for i in 0..bytes {
        e.push(Insn::VIncVr { vr: vr_byte_selector(dest_base, bytes, i) });
        if i + 1 < bytes {
            e.push(Insn::JpCcNn { cc: Cond::NZ, target: Target::Local(end) });
        }
    }
    e.label_only(end);
}

/// `vrr_shl`: shift a `bytes`-wide value left by exactly one bit in place —
/// `sla` on the least-significant byte, `rl` (carry-in) on every byte above
/// it (`spec.md` §4.4.1).
pub fn vrr_shl(e: &mut Emit, base: u32, bytes: u32) {
    for i in 0..bytes {
        let op = if i == 0 { VShiftOp::Sla } else { VShiftOp::Rl };
        e.push(Insn::VShiftVr { op, vr: vr_byte_selector(base, bytes, i) });
    }
}

/// `vrr_shr`: shift a `bytes`-wide value right by exactly one bit in place —
/// `sra`/`srl` (per `arithmetic`) on the most-significant byte, `rr`
/// (carry-in) on every byte below it.
pub fn vrr_shr(e: &mut Emit, base: u32, bytes: u32, arithmetic: bool) {
    for i in (0..bytes).rev() {
        let op = if i == bytes - 1 {
            if arithmetic { VShiftOp::Sra } else { VShiftOp::Srl }
        } else {
            VShiftOp::Rr
        };
        e.push(Insn::VShiftVr { op, vr: vr_byte_selector(base, bytes, i) });
    }
}

/// `vrr_cmul`: multiply `src` by the compile-time constant `factor`,
/// shift-and-add, into `dest` (`bytes` wide). Used by `ptridx` to scale an
/// index by its element size (`spec.md` §4.4.2, §8 S3). Needs one
/// `bytes`-wide scratch temporary.
pub fn vrr_cmul(e: &mut Emit, dest_base: u32, factor: u32, src_base: u32, bytes: u32) -> Result<()> {
    vrr_const(e, dest_base, bytes, 0);
    if factor == 0 {
        return Ok(());
    }
    let t_base = e.ctx.varmap.get_new_vregno(vr_pairs_for_bytes(bytes))?;
    vrr_copy(e, t_base, src_base, bytes);
    let highest_bit = 31 - factor.leading_zeros();
    for bit in 0..=highest_bit {
        if (factor >> bit) & 1 == 1 {
            vrr_add(e, dest_base, dest_base, t_base, bytes);
        }
        if bit != highest_bit {
            vrr_shl(e, t_base, bytes);
        }
    }
    Ok(())
}

/// `read_vrr`: load `bytes` from the address held in `addr_base` (a pointer
/// VR pair) into `dest_base`, incrementing the address register between
/// bytes (`spec.md` §4.4.2 `read`).
pub fn read_vrr(e: &mut Emit, dest_base: u32, addr_base: u32, bytes: u32) {
    e.push(Insn::VLdR16Vrr { reg: Reg16::HL, src: VrPairSel::new(addr_base) });
    for i in 0..bytes {
        e.push(Insn::VLdVrIndHl { dst: vr_byte_selector(dest_base, bytes, i) });
        if i + 1 < bytes {
            e.push(Insn::IncSs { ss: Reg16::HL });
        }
    }
}

/// `write_vrr`: store `bytes` from `src_base` to the address held in
/// `addr_base`, incrementing the address register between bytes.
pub fn write_vrr(e: &mut Emit, addr_base: u32, src_base: u32, bytes: u32) {
    e.push(Insn::VLdR16Vrr { reg: Reg16::HL, src: VrPairSel::new(addr_base) });
    for i in 0..bytes {
        e.push(Insn::VLdIndHlVr { src: vr_byte_selector(src_base, bytes, i) });
        if i + 1 < bytes {
            e.push(Insn::IncSs { ss: Reg16::HL });
        }
    }
}

/// `vrr_lvarptr`: load the address of local variable `local_index` into
/// `dest_base`. `ralloc` resolves the pseudo-displacement once it has laid
/// out the frame (`spec.md` §4.1).
pub fn vrr_lvarptr(e: &mut Emit, dest_base: u32, local_index: u32) {
    e.push(Insn::VLvarptr {
        dst: VrPairSel::new(dest_base),
        var: crate::zic::FrameSlot { local_index },
    });
}

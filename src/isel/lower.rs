//! Per-IR-opcode lowering (`spec.md` §4.4.2).

use crate::argloc::{self, RegPiece, RetLoc};
use crate::common::Id;
use crate::error::{Error, Result};
use crate::ir;
use crate::varmap::HIDDEN_RETVAL_ARG;
use crate::zic::{
    vr_byte_selector, vr_pairs_for_bytes, Cond, Imm16, Insn, Reg16, Reg8, Target, VAluOp,
    VBitwiseOp, VrPairSel,
};

use super::context::{arg_reg8, Emit};
use super::helpers;
use super::mangle;

/// Resolve an operand to a VR base, materializing an immediate into a fresh
/// scratch VR range when the operand is not already a variable.
fn operand_base(e: &mut Emit, operand: &ir::Operand, bytes: u32) -> Result<u32> {
    match operand {
        ir::Operand::Var(name) => Ok(e.ctx.varmap.find(*name)?.first_vr),
        ir::Operand::Imm(value) => {
            let tmp = e.ctx.varmap.get_new_vregno(vr_pairs_for_bytes(bytes))?;
            helpers::vrr_const(e, tmp, bytes, *value);
            Ok(tmp)
        }
        ir::Operand::List(_) => Err(Error::invalid_argument(
            e.ctx.proc.name,
            "a list operand was used where a scalar value was expected",
        )),
    }
}

fn dest_base(e: &mut Emit, dest: Id) -> Result<u32> {
    Ok(e.ctx.varmap.find(dest)?.first_vr)
}

/// Append `dest = 0x0000`/`0x0001` then fall through to `end`, for the two
/// branches of a comparison lowering.
fn branch_result(e: &mut Emit, dest_base: u32, value: u32, end: Id) {
    helpers::vrr_const(e, dest_base, 2, value as i64);
    e.push(Insn::JpNn { target: Target::Local(end) });
}

/// `eq`/`neq`: byte-by-byte `sub`, branching on the first differing byte
/// (`spec.md` §4.4.2).
fn lower_eq_neq(e: &mut Emit, dest_base: u32, a_base: u32, b_base: u32, bytes: u32, is_neq: bool) {
    let differs = e.fresh_label();
    let end = e.fresh_label();
    for i in 0..bytes {
        e.push(Insn::VCmpVr {
            op: VAluOp::Sub,
            lhs: vr_byte_selector(a_base, bytes, i),
            rhs: vr_byte_selector(b_base, bytes, i),
        });
        e.push(Insn::JpCcNn { cc: Cond::NZ, target: Target::Local(differs) });
    }
    // no byte differed
    branch_result(e, dest_base, if is_neq { 0 } else { 1 }, end);
    e.label_only(differs);
    branch_result(e, dest_base, if is_neq { 1 } else { 0 }, end);
    e.label_only(end);
}

/// `lt/lteq/gt/gteq` and their unsigned counterparts: a `sub`+`sbc` chain
/// across all bytes, then a single conditional branch on the final flags.
fn lower_ordered_cmp(
    e: &mut Emit,
    dest_base: u32,
    a_base: u32,
    b_base: u32,
    bytes: u32,
    cc: Cond,
    taken_is_true: bool,
) {
    for i in 0..bytes {
        let op = if i == 0 { VAluOp::Sub } else { VAluOp::Sbc };
        e.push(Insn::VCmpVr {
            op,
            lhs: vr_byte_selector(a_base, bytes, i),
            rhs: vr_byte_selector(b_base, bytes, i),
        });
    }
    let taken = e.fresh_label();
    let end = e.fresh_label();
    e.push(Insn::JpCcNn { cc, target: Target::Local(taken) });
    branch_result(e, dest_base, if taken_is_true { 0 } else { 1 }, end);
    e.label_only(taken);
    branch_result(e, dest_base, if taken_is_true { 1 } else { 0 }, end);
    e.label_only(end);
}

/// `mul`: shift-and-add over `width` bits (`spec.md` §4.4.2).
fn lower_mul(e: &mut Emit, dest_base: u32, lhs_base: u32, rhs_base: u32, bytes: u32) -> Result<()> {
    let pairs = vr_pairs_for_bytes(bytes);
    let t = e.ctx.varmap.get_new_vregno(pairs)?;
    let u = e.ctx.varmap.get_new_vregno(pairs)?;
    let counter = e.ctx.varmap.get_new_vregno(1)?;

    helpers::vrr_copy(e, t, lhs_base, bytes);
    helpers::vrr_copy(e, u, rhs_base, bytes);
    helpers::vrr_const(e, dest_base, bytes, 0);
    helpers::vrr_const(e, counter, 1, (bytes * 8) as i64);

    let top = e.fresh_label();
    let skip_add = e.fresh_label();
    e.label_only(top);
    helpers::vrr_shr(e, u, bytes, false);
    e.push(Insn::JpCcNn { cc: Cond::NC, target: Target::Local(skip_add) });
    helpers::vrr_add(e, dest_base, dest_base, t, bytes);
    e.label_only(skip_add);
    helpers::vrr_shl(e, t, bytes);
    e.push(Insn::VDecVr { vr: vr_byte_selector(counter, 1, 0) });
    e.push(Insn::JpCcNn { cc: Cond::NZ, target: Target::Local(top) });
    Ok(())
}

enum ShiftKind {
    Shl,
    Shra,
    Shrl,
}

/// `shl`/`shra`/`shrl`: copy `lhs` into `dest`, then shift it by the count in
/// `rhs`'s low byte, one bit per loop iteration (`spec.md` §4.4.2).
fn lower_shift(
    e: &mut Emit,
    dest_base: u32,
    lhs_base: u32,
    rhs_base: u32,
    bytes: u32,
    kind: ShiftKind,
) -> Result<()> {
    let counter = e.ctx.varmap.get_new_vregno(1)?;
    helpers::vrr_copy(e, dest_base, lhs_base, bytes);
    e.push(Insn::VLdVrVr {
        dst: vr_byte_selector(counter, 1, 0),
        src: vr_byte_selector(rhs_base, bytes, 0),
    });

    let top = e.fresh_label();
    let end = e.fresh_label();
    e.label_only(top);
    e.push(Insn::VDecVr { vr: vr_byte_selector(counter, 1, 0) });
    e.push(Insn::JpCcNn { cc: Cond::M, target: Target::Local(end) });
    match kind {
        ShiftKind::Shl => helpers::vrr_shl(e, dest_base, bytes),
        ShiftKind::Shra => helpers::vrr_shr(e, dest_base, bytes, true),
        ShiftKind::Shrl => helpers::vrr_shr(e, dest_base, bytes, false),
    }
    e.push(Insn::JpNn { target: Target::Local(top) });
    e.label_only(end);
    Ok(())
}

/// `jnz`/`jz`: OR every byte of `cond` together, then branch on Z/NZ
/// (`spec.md` §4.4.2; the literal 2-byte form is `ld A,(high); or (low)`).
fn lower_zero_test(e: &mut Emit, cond_base: u32, bytes: u32, target: Id, want_nonzero: bool) {
    e.push(Insn::VFillA { src: vr_byte_selector(cond_base, bytes, bytes - 1) });
    for i in (0..bytes - 1).rev() {
        e.push(Insn::VOrAVr { src: vr_byte_selector(cond_base, bytes, i) });
    }
    let cc = if want_nonzero { Cond::NZ } else { Cond::Z };
    e.push(Insn::JpCcNn { cc, target: Target::Local(target) });
}

/// `call`: the full calling-convention dance (`spec.md` §4.4.2).
fn lower_call(
    e: &mut Emit,
    dest: Option<Id>,
    callee: Id,
    args: &ir::Operand,
) -> Result<()> {
    let callee_proc = e.ctx.module.proc(callee).ok_or_else(|| {
        eprintln!("error: call to undeclared procedure {callee}");
        Error::not_found("procedure", callee)
    })?;
    let arg_operands = args
        .as_list()
        .ok_or_else(|| Error::invalid_argument(e.ctx.proc.name, "call args must be a list operand"))?;
    if arg_operands.len() != callee_proc.args.len() {
        eprintln!(
            "error: call to {callee} expects {} argument(s), got {}",
            callee_proc.args.len(),
            arg_operands.len()
        );
        return Err(Error::invalid_argument(e.ctx.proc.name, format!("wrong argument count calling {callee}")));
    }
    let usr = callee_proc.has_attr(ir::ProcAttr::Usr);
    let ret_width_bits = match &callee_proc.ret {
        Some(ty) => Some(ty.size_bytes(e.ctx.module)? * 8),
        None => None,
    };
    let is64 = ret_width_bits == Some(64);

    let mut byte_widths = Vec::with_capacity(arg_operands.len() + 1);
    if is64 {
        byte_widths.push(2);
    }
    for (name, ty) in &callee_proc.args {
        let _ = name;
        byte_widths.push(ty.size_bytes(e.ctx.module)?);
    }

    let alloc = argloc::allocate(&byte_widths, callee)?;

    let mut bases = Vec::with_capacity(byte_widths.len());
    if is64 {
        let local_idx = e.ctx.fresh_local(8);
        let ptr_base = e.ctx.varmap.get_new_vregno(1)?;
        helpers::vrr_lvarptr(e, ptr_base, local_idx);
        bases.push(ptr_base);
    }
    for (operand, &bytes) in arg_operands.iter().zip(byte_widths[bases.len()..].iter()) {
        bases.push(operand_base(e, operand, bytes)?);
    }

    for idx in (0..byte_widths.len()).rev() {
        let placement = &alloc.args[idx];
        let bytes = byte_widths[idx];
        let base = bases[idx];
        if placement.stack_bytes > 0 {
            // Pushes land on the stack highest-byte-first: the *last* push
            // ends up at the lowest address, which is where the callee's
            // `IX+4+offset` read expects byte 0. The odd trailing byte (the
            // highest-indexed byte, when `bytes` is odd) has to be pushed
            // before the whole pairs so it lands above all of them, not
            // below.
            let pairs = bytes / 2;
            if bytes % 2 == 1 {
                e.push(Insn::VPushVrByte { src: vr_byte_selector(base, bytes, bytes - 1) });
            }
            for w in (0..pairs).rev() {
                e.push(Insn::VPushVrr { src: VrPairSel::new(base + w) });
            }
        } else {
            for piece in &placement.pieces {
                match piece {
                    RegPiece::Whole(pair) => {
                        e.push(Insn::VLdR16Vrr { reg: pair.to_reg16(), src: VrPairSel::new(base) });
                    }
                    _ => {
                        let reg = arg_reg8(piece).expect("8-bit register piece");
                        e.push(Insn::VLdRVr { reg, src: vr_byte_selector(base, bytes, 0) });
                    }
                }
            }
        }
    }

    e.push(Insn::CallNn { target: Target::Global(mangle::global(&callee)) });

    if let Some(dest) = dest {
        let dbase = dest_base(e, dest)?;
        match argloc::return_location(ret_width_bits.expect("call with a result returns a value"), usr) {
            RetLoc::A => e.push(Insn::VSpillA { dst: vr_byte_selector(dbase, 1, 0) }),
            RetLoc::Pair(reg) => e.push(Insn::VLdVrrR16 { dst: VrPairSel::new(dbase), reg }),
            RetLoc::HlDe => {
                e.push(Insn::VLdVrrR16 { dst: VrPairSel::new(dbase), reg: Reg16::HL });
                e.push(Insn::VLdVrrR16 { dst: VrPairSel::new(dbase + 1), reg: Reg16::DE });
            }
            RetLoc::HiddenPointer => {
                helpers::read_vrr(e, dbase, bases[0], 8);
            }
        }
    }

    for _ in 0..alloc.total_stack_bytes {
        e.push(Insn::IncSp);
    }
    Ok(())
}

fn lower_reccopy_chunk(e: &mut Emit, dst_addr_base: u32, src_addr_base: u32, count: u32) -> Result<()> {
    if count == 0 {
        return Ok(());
    }
    let counter = e.ctx.varmap.get_new_vregno(1)?;
    helpers::vrr_const(e, counter, 2, count as i64);

    e.push(Insn::VLdR16Vrr { reg: Reg16::HL, src: VrPairSel::new(dst_addr_base) });
    e.push(Insn::VLdR16Vrr { reg: Reg16::DE, src: VrPairSel::new(src_addr_base) });

    let top = e.fresh_label();
    e.label_only(top);
    e.push(Insn::LdAIndDe);
    e.push(Insn::LdIndHlR { src: Reg8::A });
    e.push(Insn::IncSs { ss: Reg16::DE });
    e.push(Insn::IncSs { ss: Reg16::HL });
    e.push(Insn::VDecVr { vr: crate::zic::VrSel::lo(counter) });
    e.push(Insn::JpCcNn { cc: Cond::NZ, target: Target::Local(top) });
    e.push(Insn::VDecVr { vr: crate::zic::VrSel::hi(counter) });
    e.push(Insn::JpCcNn { cc: Cond::P, target: Target::Local(top) });

    e.push(Insn::VLdVrrR16 { dst: VrPairSel::new(dst_addr_base), reg: Reg16::HL });
    e.push(Insn::VLdVrrR16 { dst: VrPairSel::new(src_addr_base), reg: Reg16::DE });
    Ok(())
}

/// `reccopy`: byte-copy loop in chunks of at most `0x7FFF` bytes so the
/// 16-bit countdown's high byte never exceeds the signed range `jp P` tests
/// (`spec.md` §4.4.2).
fn lower_reccopy(e: &mut Emit, dst_addr_base: u32, src_addr_base: u32, size: u32) -> Result<()> {
    let mut remaining = size;
    while remaining > 0 {
        let chunk = remaining.min(0x7FFF);
        lower_reccopy_chunk(e, dst_addr_base, src_addr_base, chunk)?;
        remaining -= chunk;
    }
    Ok(())
}

/// Lower one IR instruction into the accumulating procedure body. `label` is
/// the IR block entry's label, if any.
pub fn lower_instr(e: &mut Emit, instr: &ir::Instr) -> Result<()> {
    use ir::Instr::*;
    match instr {
        Add { dest, width, lhs, rhs } => {
            let bytes = width / 8;
            let d = dest_base(e, *dest)?;
            let a = operand_base(e, lhs, bytes)?;
            let b = operand_base(e, rhs, bytes)?;
            helpers::vrr_add(e, d, a, b, bytes);
        }
        Sub { dest, width, lhs, rhs } => {
            let bytes = width / 8;
            let d = dest_base(e, *dest)?;
            let a = operand_base(e, lhs, bytes)?;
            let b = operand_base(e, rhs, bytes)?;
            helpers::vrr_sub(e, d, a, b, bytes);
        }
        And { dest, width, lhs, rhs } => {
            let bytes = width / 8;
            let d = dest_base(e, *dest)?;
            let a = operand_base(e, lhs, bytes)?;
            let b = operand_base(e, rhs, bytes)?;
            helpers::vrr_bitwise(e, VBitwiseOp::And, d, a, b, bytes);
        }
        Or { dest, width, lhs, rhs } => {
            let bytes = width / 8;
            let d = dest_base(e, *dest)?;
            let a = operand_base(e, lhs, bytes)?;
            let b = operand_base(e, rhs, bytes)?;
            helpers::vrr_bitwise(e, VBitwiseOp::Or, d, a, b, bytes);
        }
        Xor { dest, width, lhs, rhs } => {
            let bytes = width / 8;
            let d = dest_base(e, *dest)?;
            let a = operand_base(e, lhs, bytes)?;
            let b = operand_base(e, rhs, bytes)?;
            helpers::vrr_bitwise(e, VBitwiseOp::Xor, d, a, b, bytes);
        }
        Bnot { dest, width, src } => {
            let bytes = width / 8;
            let d = dest_base(e, *dest)?;
            let s = operand_base(e, src, bytes)?;
            helpers::vrr_bnot(e, d, s, bytes);
        }
        Neg { dest, width, src } => {
            let bytes = width / 8;
            let d = dest_base(e, *dest)?;
            let s = operand_base(e, src, bytes)?;
            helpers::neg_vrr(e, d, s, bytes);
        }
        Mul { dest, width, lhs, rhs } => {
            let bytes = width / 8;
            let d = dest_base(e, *dest)?;
            let a = operand_base(e, lhs, bytes)?;
            let b = operand_base(e, rhs, bytes)?;
            lower_mul(e, d, a, b, bytes)?;
        }
        Shl { dest, width, lhs, rhs } => {
            let bytes = width / 8;
            let d = dest_base(e, *dest)?;
            let a = operand_base(e, lhs, bytes)?;
            let b = operand_base(e, rhs, bytes)?;
            lower_shift(e, d, a, b, bytes, ShiftKind::Shl)?;
        }
        Shra { dest, width, lhs, rhs } => {
            let bytes = width / 8;
            let d = dest_base(e, *dest)?;
            let a = operand_base(e, lhs, bytes)?;
            let b = operand_base(e, rhs, bytes)?;
            lower_shift(e, d, a, b, bytes, ShiftKind::Shra)?;
        }
        Shrl { dest, width, lhs, rhs } => {
            let bytes = width / 8;
            let d = dest_base(e, *dest)?;
            let a = operand_base(e, lhs, bytes)?;
            let b = operand_base(e, rhs, bytes)?;
            lower_shift(e, d, a, b, bytes, ShiftKind::Shrl)?;
        }
        Eq { dest, width, lhs, rhs } => {
            let bytes = width / 8;
            let d = dest_base(e, *dest)?;
            let a = operand_base(e, lhs, bytes)?;
            let b = operand_base(e, rhs, bytes)?;
            lower_eq_neq(e, d, a, b, bytes, false);
        }
        Neq { dest, width, lhs, rhs } => {
            let bytes = width / 8;
            let d = dest_base(e, *dest)?;
            let a = operand_base(e, lhs, bytes)?;
            let b = operand_base(e, rhs, bytes)?;
            lower_eq_neq(e, d, a, b, bytes, true);
        }
        Lt { dest, width, lhs, rhs } => {
            let bytes = width / 8;
            let d = dest_base(e, *dest)?;
            let a = operand_base(e, lhs, bytes)?;
            let b = operand_base(e, rhs, bytes)?;
            lower_ordered_cmp(e, d, a, b, bytes, Cond::M, true);
        }
        Lteq { dest, width, lhs, rhs } => {
            let bytes = width / 8;
            let d = dest_base(e, *dest)?;
            let a = operand_base(e, lhs, bytes)?;
            let b = operand_base(e, rhs, bytes)?;
            lower_ordered_cmp(e, d, a, b, bytes, Cond::M, false);
        }
        Gt { dest, width, lhs, rhs } => {
            let bytes = width / 8;
            let d = dest_base(e, *dest)?;
            let a = operand_base(e, lhs, bytes)?;
            let b = operand_base(e, rhs, bytes)?;
            lower_ordered_cmp(e, d, b, a, bytes, Cond::M, true);
        }
        Gteq { dest, width, lhs, rhs } => {
            let bytes = width / 8;
            let d = dest_base(e, *dest)?;
            let a = operand_base(e, lhs, bytes)?;
            let b = operand_base(e, rhs, bytes)?;
            lower_ordered_cmp(e, d, b, a, bytes, Cond::M, false);
        }
        Ltu { dest, width, lhs, rhs } => {
            let bytes = width / 8;
            let d = dest_base(e, *dest)?;
            let a = operand_base(e, lhs, bytes)?;
            let b = operand_base(e, rhs, bytes)?;
            lower_ordered_cmp(e, d, a, b, bytes, Cond::C, true);
        }
        Lteu { dest, width, lhs, rhs } => {
            let bytes = width / 8;
            let d = dest_base(e, *dest)?;
            let a = operand_base(e, lhs, bytes)?;
            let b = operand_base(e, rhs, bytes)?;
            lower_ordered_cmp(e, d, a, b, bytes, Cond::C, false);
        }
        Gtu { dest, width, lhs, rhs } => {
            let bytes = width / 8;
            let d = dest_base(e, *dest)?;
            let a = operand_base(e, lhs, bytes)?;
            let b = operand_base(e, rhs, bytes)?;
            lower_ordered_cmp(e, d, b, a, bytes, Cond::C, true);
        }
        Gteu { dest, width, lhs, rhs } => {
            let bytes = width / 8;
            let d = dest_base(e, *dest)?;
            let a = operand_base(e, lhs, bytes)?;
            let b = operand_base(e, rhs, bytes)?;
            lower_ordered_cmp(e, d, b, a, bytes, Cond::C, false);
        }
        Trunc { dest, dest_width, src, src_width } => {
            let d = dest_base(e, *dest)?;
            let s = operand_base(e, src, src_width / 8)?;
            helpers::vrr_copy_iseg(e, d, dest_width / 8, s, src_width / 8);
        }
        Sgnext { dest, dest_width, src, src_width } => {
            let d = dest_base(e, *dest)?;
            let s = operand_base(e, src, src_width / 8)?;
            helpers::vrr_extend(e, d, dest_width / 8, s, src_width / 8, true);
        }
        Zrext { dest, dest_width, src, src_width } => {
            let d = dest_base(e, *dest)?;
            let s = operand_base(e, src, src_width / 8)?;
            helpers::vrr_extend(e, d, dest_width / 8, s, src_width / 8, false);
        }
        Imm { dest, width, value } => {
            let d = dest_base(e, *dest)?;
            helpers::vrr_const(e, d, width / 8, *value);
        }
        Jmp { target } => {
            let label = e.ctx.mangle_label(target.as_str());
            e.push(Insn::JpNn { target: Target::Local(label) });
        }
        Jnz { width, cond, target } => {
            let bytes = width / 8;
            let c = operand_base(e, cond, bytes)?;
            let label = e.ctx.mangle_label(target.as_str());
            lower_zero_test(e, c, bytes, label, true);
        }
        Jz { width, cond, target } => {
            let bytes = width / 8;
            let c = operand_base(e, cond, bytes)?;
            let label = e.ctx.mangle_label(target.as_str());
            lower_zero_test(e, c, bytes, label, false);
        }
        Ret => {
            e.push(Insn::Ret);
        }
        Retv { width, value } => {
            let bytes = width / 8;
            let v = operand_base(e, value, bytes)?;
            let usr = e.ctx.usr;
            match argloc::return_location(*width, usr) {
                RetLoc::A => e.push(Insn::VLdRVr { reg: Reg8::A, src: vr_byte_selector(v, 1, 0) }),
                RetLoc::Pair(reg) => e.push(Insn::VLdR16Vrr { reg, src: VrPairSel::new(v) }),
                RetLoc::HlDe => {
                    e.push(Insn::VLdR16Vrr { reg: Reg16::HL, src: VrPairSel::new(v) });
                    e.push(Insn::VLdR16Vrr { reg: Reg16::DE, src: VrPairSel::new(v + 1) });
                }
                RetLoc::HiddenPointer => {
                    let retval = e.ctx.varmap.find(Id::from(HIDDEN_RETVAL_ARG.to_string()))?;
                    helpers::write_vrr(e, retval.first_vr, v, bytes);
                }
            }
            e.push(Insn::Ret);
        }
        Call { dest, callee, args, .. } => {
            lower_call(e, *dest, *callee, args)?;
        }
        Lvarptr { dest, var } => {
            let d = dest_base(e, *dest)?;
            let idx = e.ctx.local_index(*var)?;
            helpers::vrr_lvarptr(e, d, idx);
        }
        Varptr { dest, global } => {
            let d = dest_base(e, *dest)?;
            let mangled = mangle::global(global.as_str());
            e.push(Insn::VLdVrrNn {
                dst: VrPairSel::new(d),
                nn: Imm16::Symbol(Target::Global(mangled)),
            });
        }
        Read { dest, width, addr } => {
            let bytes = width / 8;
            let a = operand_base(e, addr, 2)?;
            let d = dest_base(e, *dest)?;
            helpers::read_vrr(e, d, a, bytes);
        }
        Write { width, addr, src } => {
            let bytes = width / 8;
            let a = operand_base(e, addr, 2)?;
            let s = operand_base(e, src, bytes)?;
            helpers::write_vrr(e, a, s, bytes);
        }
        Recmbr { dest, base, record, member } => {
            let d = dest_base(e, *dest)?;
            let b = operand_base(e, base, 2)?;
            let rec = e
                .ctx
                .module
                .record(*record)
                .ok_or_else(|| Error::not_found("record", *record))?;
            let offset = rec.member_offset(*member, e.ctx.module)?;
            let lo = (offset & 0xFF) as u8;
            let hi = ((offset >> 8) & 0xFF) as u8;
            e.push(Insn::VAluImmVr {
                op: VAluOp::Add,
                dst: vr_byte_selector(d, 2, 0),
                lhs: vr_byte_selector(b, 2, 0),
                imm: lo,
            });
            e.push(Insn::VAluImmVr {
                op: VAluOp::Adc,
                dst: vr_byte_selector(d, 2, 1),
                lhs: vr_byte_selector(b, 2, 1),
                imm: hi,
            });
        }
        Ptridx { dest, base, index, elem_size } => {
            let d = dest_base(e, *dest)?;
            let b = operand_base(e, base, 2)?;
            let i = operand_base(e, index, 2)?;
            let off = e.ctx.varmap.get_new_vregno(1)?;
            helpers::vrr_cmul(e, off, *elem_size, i, 2)?;
            helpers::vrr_add(e, d, b, off, 2);
        }
        Reccopy { dst, src, size } => {
            let d = operand_base(e, dst, 2)?;
            let s = operand_base(e, src, 2)?;
            lower_reccopy(e, d, s, *size)?;
        }
        Nop => {
            e.push(Insn::Nop);
        }
    }
    Ok(())
}

//! Virtual-instruction lowering: one `Insn` (possibly VR-referencing) in,
//! zero or more real instructions out (`spec.md` §4.5, "Fill/spill
//! lowering"). Every virtual form is mediated through `A` or `HL`/`BC`
//! exactly as documented on its `Insn` variant in `zic::insn`.

use crate::error::Result;
use crate::zic::{Imm16, Insn, Reg16, Reg8, StackReg, VAluOp, VBitwiseOp, VShiftOp, VrPairSel, VrSel};

use super::frame::Frame;

fn reg16_halves(reg: Reg16) -> (Reg8, Reg8) {
    match reg {
        Reg16::HL => (Reg8::L, Reg8::H),
        Reg16::DE => (Reg8::E, Reg8::D),
        Reg16::BC => (Reg8::C, Reg8::B),
        Reg16::SP | Reg16::IX => unreachable!("virtual instructions only address HL/DE/BC"),
    }
}

fn alu_ind(op: VAluOp, d: i8) -> Insn {
    match op {
        VAluOp::Add => Insn::AddAIndIxD { d },
        VAluOp::Adc => Insn::AdcAIndIxD { d },
        VAluOp::Sub => Insn::SubIndIxD { d },
        VAluOp::Sbc => Insn::SbcAIndIxD { d },
    }
}

fn alu_imm(op: VAluOp, n: u8) -> Insn {
    match op {
        VAluOp::Add => Insn::AddAN { n },
        VAluOp::Adc => Insn::AdcAN { n },
        VAluOp::Sub => Insn::SubN { n },
        VAluOp::Sbc => Insn::SbcAN { n },
    }
}

fn bitwise_ind(op: VBitwiseOp, d: i8) -> Insn {
    match op {
        VBitwiseOp::And => Insn::AndIndIxD { d },
        VBitwiseOp::Or => Insn::OrIndIxD { d },
        VBitwiseOp::Xor => Insn::XorIndIxD { d },
    }
}

fn shift_reg(op: VShiftOp, r: Reg8) -> Insn {
    match op {
        VShiftOp::Sla => Insn::Sla { r },
        VShiftOp::Sra => Insn::Sra { r },
        VShiftOp::Srl => Insn::Srl { r },
        VShiftOp::Rl => Insn::Rl { r },
        VShiftOp::Rr => Insn::Rr { r },
    }
}

fn fill_a(frame: &Frame, src: VrSel, out: &mut Vec<Insn>) -> Result<()> {
    let d = frame.vr_displacement(src)?;
    out.push(Insn::LdRIndIxD { dst: Reg8::A, d });
    Ok(())
}

fn spill_a(frame: &Frame, dst: VrSel, out: &mut Vec<Insn>) -> Result<()> {
    let d = frame.vr_displacement(dst)?;
    out.push(Insn::LdIndIxDR { d, src: Reg8::A });
    Ok(())
}

fn fill_reg(frame: &Frame, reg: Reg8, src: VrSel, out: &mut Vec<Insn>) -> Result<()> {
    let d = frame.vr_displacement(src)?;
    out.push(Insn::LdRIndIxD { dst: reg, d });
    Ok(())
}

fn spill_reg(frame: &Frame, reg: Reg8, dst: VrSel, out: &mut Vec<Insn>) -> Result<()> {
    let d = frame.vr_displacement(dst)?;
    out.push(Insn::LdIndIxDR { d, src: reg });
    Ok(())
}

fn fill_pair(frame: &Frame, pair: VrPairSel, lo_reg: Reg8, hi_reg: Reg8, out: &mut Vec<Insn>) -> Result<()> {
    fill_reg(frame, lo_reg, pair.lo(), out)?;
    fill_reg(frame, hi_reg, pair.hi(), out)
}

fn spill_pair(frame: &Frame, pair: VrPairSel, lo_reg: Reg8, hi_reg: Reg8, out: &mut Vec<Insn>) -> Result<()> {
    spill_reg(frame, lo_reg, pair.lo(), out)?;
    spill_reg(frame, hi_reg, pair.hi(), out)
}

/// Lower one instruction into the real instruction(s) that implement it. A
/// non-virtual instruction is returned unchanged, as the sole element.
pub fn lower_insn(frame: &Frame, insn: Insn) -> Result<Vec<Insn>> {
    if !insn.is_virtual() {
        return Ok(vec![insn]);
    }

    let mut out = Vec::new();
    match insn {
        Insn::VLdVrN { dst, n } => {
            let d = frame.vr_displacement(dst)?;
            out.push(Insn::LdIndIxDN { d, n });
        }
        Insn::VLdVrVr { dst, src } => {
            fill_a(frame, src, &mut out)?;
            spill_a(frame, dst, &mut out)?;
        }
        Insn::VLdVrIndHl { dst } => {
            out.push(Insn::LdRIndHl { dst: Reg8::A });
            spill_a(frame, dst, &mut out)?;
        }
        Insn::VLdIndHlVr { src } => {
            fill_a(frame, src, &mut out)?;
            out.push(Insn::LdIndHlR { src: Reg8::A });
        }
        Insn::VLdVrrNn { dst, nn } => {
            out.push(Insn::LdDdNn { dd: Reg16::HL, nn });
            spill_pair(frame, dst, Reg8::L, Reg8::H, &mut out)?;
        }
        Insn::VLdVrrVrr { dst, src } => {
            fill_reg(frame, Reg8::L, src.lo(), &mut out)?;
            fill_reg(frame, Reg8::H, src.hi(), &mut out)?;
            spill_reg(frame, Reg8::L, dst.lo(), &mut out)?;
            spill_reg(frame, Reg8::H, dst.hi(), &mut out)?;
        }
        Insn::VLdR16Vrr { reg, src } => {
            let (lo_reg, hi_reg) = reg16_halves(reg);
            fill_pair(frame, src, lo_reg, hi_reg, &mut out)?;
        }
        Insn::VLdRVr { reg, src } => {
            fill_reg(frame, reg, src, &mut out)?;
        }
        Insn::VSpillRVr { reg, dst } => {
            spill_reg(frame, reg, dst, &mut out)?;
        }
        Insn::VLdVrrR16 { dst, reg } => {
            let (lo_reg, hi_reg) = reg16_halves(reg);
            spill_pair(frame, dst, lo_reg, hi_reg, &mut out)?;
        }
        Insn::VAddVrrVrr { dst, src } => {
            fill_pair(frame, dst, Reg8::L, Reg8::H, &mut out)?;
            fill_pair(frame, src, Reg8::C, Reg8::B, &mut out)?;
            out.push(Insn::AddHlSs { ss: Reg16::BC });
            spill_pair(frame, dst, Reg8::L, Reg8::H, &mut out)?;
        }
        Insn::VSubVrrVrr { dst, src } => {
            fill_pair(frame, dst, Reg8::L, Reg8::H, &mut out)?;
            fill_pair(frame, src, Reg8::C, Reg8::B, &mut out)?;
            out.push(Insn::AndA);
            out.push(Insn::SbcHlSs { ss: Reg16::BC });
            spill_pair(frame, dst, Reg8::L, Reg8::H, &mut out)?;
        }
        Insn::VAluVr { op, dst, lhs, rhs } => {
            fill_a(frame, lhs, &mut out)?;
            let d = frame.vr_displacement(rhs)?;
            out.push(alu_ind(op, d));
            spill_a(frame, dst, &mut out)?;
        }
        Insn::VAluImmVr { op, dst, lhs, imm } => {
            fill_a(frame, lhs, &mut out)?;
            out.push(alu_imm(op, imm));
            spill_a(frame, dst, &mut out)?;
        }
        Insn::VCmpVr { op, lhs, rhs } => {
            fill_a(frame, lhs, &mut out)?;
            let d = frame.vr_displacement(rhs)?;
            out.push(alu_ind(op, d));
        }
        Insn::VFillA { src } => {
            fill_a(frame, src, &mut out)?;
        }
        Insn::VOrAVr { src } => {
            let d = frame.vr_displacement(src)?;
            out.push(Insn::OrIndIxD { d });
        }
        Insn::VBitwiseVr { op, dst, lhs, rhs } => {
            fill_a(frame, lhs, &mut out)?;
            let d = frame.vr_displacement(rhs)?;
            out.push(bitwise_ind(op, d));
            spill_a(frame, dst, &mut out)?;
        }
        Insn::VCplVr { dst, src } => {
            fill_a(frame, src, &mut out)?;
            out.push(Insn::Cpl);
            spill_a(frame, dst, &mut out)?;
        }
        Insn::VIncVr { vr } => {
            fill_a(frame, vr, &mut out)?;
            out.push(Insn::IncR { r: Reg8::A });
            spill_a(frame, vr, &mut out)?;
        }
        Insn::VDecVr { vr } => {
            fill_a(frame, vr, &mut out)?;
            out.push(Insn::DecR { r: Reg8::A });
            spill_a(frame, vr, &mut out)?;
        }
        Insn::VShiftVr { op, vr } => {
            fill_a(frame, vr, &mut out)?;
            out.push(shift_reg(op, Reg8::A));
            spill_a(frame, vr, &mut out)?;
        }
        Insn::VBitBVr { bit, vr } => {
            let d = frame.vr_displacement(vr)?;
            out.push(Insn::BitBIndIxD { bit, d });
        }
        Insn::VPushVrr { src } => {
            fill_pair(frame, src, Reg8::L, Reg8::H, &mut out)?;
            out.push(Insn::Push { rr: StackReg::HL });
        }
        Insn::VPushVrByte { src } => {
            fill_reg(frame, Reg8::L, src, &mut out)?;
            out.push(Insn::Push { rr: StackReg::HL });
        }
        Insn::VSpillA { dst } => {
            spill_a(frame, dst, &mut out)?;
        }
        Insn::VLvarptr { dst, var } => {
            let d = frame.local_displacement(var)?;
            out.push(Insn::Push { rr: StackReg::IX });
            out.push(Insn::Pop { rr: StackReg::HL });
            out.push(Insn::LdDdNn { dd: Reg16::BC, nn: Imm16::Const(d as i32) });
            out.push(Insn::AddHlSs { ss: Reg16::BC });
            spill_pair(frame, dst, Reg8::L, Reg8::H, &mut out)?;
        }
        _ => unreachable!("is_virtual() already filtered to these variants"),
    }
    Ok(out)
}

/// The procedure-entry prologue: carve `frame_size` bytes below `IX` without
/// a 16-bit subtract, re-pointing `IX` at the newly carved frame's top
/// (`spec.md` §4.5, "Prologue").
pub fn prologue(frame_size: u32) -> Vec<Insn> {
    let n = frame_size as i32;
    vec![
        Insn::Push { rr: StackReg::IX },
        Insn::LdIxNn { nn: -n },
        Insn::AddIxSp,
        Insn::LdSpIx,
        Insn::LdIxNn { nn: n },
        Insn::AddIxSp,
    ]
}

/// The instructions substituted for every `Insn::Ret` (`spec.md` §4.5,
/// "Epilogue").
pub fn epilogue() -> Vec<Insn> {
    vec![Insn::LdSpIx, Insn::Pop { rr: StackReg::IX }, Insn::Ret]
}

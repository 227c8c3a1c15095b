//! The per-procedure selection context (`spec.md` §3, "Procedure selection
//! context").

use crate::argloc::{self, RegPiece};
use crate::common::Id;
use crate::error::Result;
use crate::ir;
use crate::varmap::{scan_procedure, VarMap};
use crate::zic::{self, vr_byte_selector, vr_pairs_for_bytes, Insn, Reg8, VrPairSel};

use super::mangle;

/// The physical 8-bit register holding one half of an argument register
/// pair, or `None` for a whole-pair placement (`spec.md` §4.3).
pub(super) fn arg_reg8(piece: &RegPiece) -> Option<Reg8> {
    use argloc::ArgPair::*;
    match piece {
        RegPiece::Lo(Hl) => Some(Reg8::L),
        RegPiece::Hi(Hl) => Some(Reg8::H),
        RegPiece::Lo(De) => Some(Reg8::E),
        RegPiece::Hi(De) => Some(Reg8::D),
        RegPiece::Lo(Bc) => Some(Reg8::C),
        RegPiece::Hi(Bc) => Some(Reg8::B),
        RegPiece::Whole(_) => None,
    }
}

/// The instructions that receive a procedure's arguments from their ABI
/// locations into their VR positions, in argument order, the hidden
/// `%.retval` pointer received first when the procedure returns 64 bits
/// (`spec.md` §4.5, "Argument copy-in"). Runs the identical [`argloc::allocate`]
/// algorithm a caller's `call` lowering runs, over the identical width list,
/// so the two placements agree (`spec.md` §8, property 8).
fn copy_in_instrs(module: &ir::Module, proc: &ir::Proc) -> Result<Vec<Insn>> {
    let hidden64 = matches!(&proc.ret, Some(ir::Type::Int(64)));
    let mut byte_widths = Vec::with_capacity(proc.args.len() + 1);
    if hidden64 {
        byte_widths.push(2);
    }
    for (_, ty) in &proc.args {
        byte_widths.push(ty.size_bytes(module)?);
    }

    let alloc = argloc::allocate(&byte_widths, proc.name)?;
    let stack_offsets = alloc.stack_offsets();

    let mut out = Vec::new();
    let mut vr_base = 0u32;
    for (idx, &bytes) in byte_widths.iter().enumerate() {
        let placement = &alloc.args[idx];
        let base = vr_base;
        if placement.stack_bytes > 0 {
            let stack_off = stack_offsets[idx].expect("a stack placement always has a stack offset");
            for i in 0..bytes {
                let d = 4i64 + stack_off as i64 + i as i64;
                let d = i8::try_from(d).map_err(|_| {
                    crate::error::Error::unsupported(proc.name, format!("argument displacement {d} out of range"))
                })?;
                out.push(Insn::LdRIndIxD { dst: Reg8::A, d });
                out.push(Insn::VSpillA { dst: vr_byte_selector(base, bytes, i) });
            }
        } else {
            for piece in &placement.pieces {
                match piece {
                    RegPiece::Whole(pair) => out.push(Insn::VLdVrrR16 {
                        dst: VrPairSel::new(base),
                        reg: pair.to_reg16(),
                    }),
                    _ => {
                        let reg = arg_reg8(piece).expect("8-bit register piece");
                        out.push(Insn::VSpillRVr { reg, dst: vr_byte_selector(base, bytes, 0) });
                    }
                }
            }
        }
        vr_base += vr_pairs_for_bytes(bytes);
    }
    Ok(out)
}

/// Owns everything one procedure's selection needs, and is discarded once
/// the procedure's Z80-IC output has been appended to the module
/// (`spec.md` §3, "Lifecycles").
pub struct SelCtx<'m> {
    pub module: &'m ir::Module,
    pub proc: &'m ir::Proc,
    pub varmap: VarMap,
    next_label: u32,
    /// Selects the `@usr` return-register convention (`spec.md` §6).
    pub usr: bool,
    pub out: zic::Procedure,
}

impl<'m> SelCtx<'m> {
    pub fn new(module: &'m ir::Module, proc: &'m ir::Proc) -> Result<SelCtx<'m>> {
        let varmap = scan_procedure(proc, module)?;
        let mangled = mangle::global(&proc.name);
        let mut out = zic::Procedure::new(mangled);
        for (name, ty) in &proc.locals {
            let size = ty.size_bytes(module)?;
            out.locals.push(zic::LocalVar {
                name: mangle::local(&proc.name, name),
                size_bytes: size,
            });
            out.local_var_size += size;
        }
        for insn in copy_in_instrs(module, proc)? {
            out.push(None, insn);
        }
        Ok(SelCtx {
            module,
            proc,
            varmap,
            next_label: 0,
            usr: proc.has_attr(ir::ProcAttr::Usr),
            out,
        })
    }

    /// A fresh, procedure-unique internal label, already mangled.
    pub fn fresh_label(&mut self) -> Id {
        let n = self.next_label;
        self.next_label += 1;
        mangle::label(&self.proc.name, &format!("sel{n}"))
    }

    /// Mangle an IR-defined label in this procedure.
    pub fn mangle_label(&self, ir_label: &str) -> Id {
        mangle::label(&self.proc.name, ir_label)
    }

    /// Allocate a compiler-generated local not declared by the IR (the
    /// 8-byte return buffer a 64-bit-returning `call` needs, `spec.md` §4.3
    /// "Hidden-argument rule"). Returns its index, usable wherever an
    /// IR-declared local's index would be (`vrr_lvarptr`).
    pub fn fresh_local(&mut self, size_bytes: u32) -> u32 {
        let idx = self.out.locals.len() as u32;
        let name = mangle::label(&self.proc.name, &format!("hret{idx}"));
        self.out.locals.push(zic::LocalVar { name, size_bytes });
        self.out.local_var_size += size_bytes;
        idx
    }

    /// The index of local variable `name` in `self.out.locals`, for
    /// building a [`crate::zic::FrameSlot`].
    pub fn local_index(&self, name: Id) -> Result<u32> {
        let mangled = mangle::local(&self.proc.name, &name);
        self.out
            .locals
            .iter()
            .position(|l| l.name == mangled)
            .map(|i| i as u32)
            .ok_or_else(|| crate::error::Error::not_found("local variable", name))
    }

    /// Append an instruction with no label.
    pub fn push(&mut self, insn: Insn) {
        self.out.push(None, insn);
    }

    /// Append an instruction, attaching `label` to it. Used only for the
    /// first instruction of a lowering step that received a label from its
    /// IR block entry.
    pub fn push_labelled(&mut self, label: Id, insn: Insn) {
        self.out.push(Some(label), insn);
    }

    pub fn push_label_only(&mut self, label: Id) {
        self.out.push_label_only(label);
    }
}

/// Attaches one IR block entry's label (if any) to the first instruction a
/// lowering step emits, and nothing after (`spec.md` §4.1, "Labels and
/// fallthrough"). Every per-opcode lowering in `lower.rs` and every helper in
/// `helpers.rs` takes `&mut Emit` instead of `&mut SelCtx` directly, so the
/// rule cannot be forgotten case by case.
pub struct Emit<'a, 'm> {
    pub ctx: &'a mut SelCtx<'m>,
    pending: Option<Id>,
}

impl<'a, 'm> Emit<'a, 'm> {
    pub fn new(ctx: &'a mut SelCtx<'m>, label: Option<Id>) -> Emit<'a, 'm> {
        Emit { ctx, pending: label }
    }

    /// Append an instruction, consuming the pending label if this is the
    /// first push since construction.
    pub fn push(&mut self, insn: Insn) {
        match self.pending.take() {
            Some(label) => self.ctx.push_labelled(label, insn),
            None => self.ctx.push(insn),
        }
    }

    /// Append a label-only entry for an internal (non-IR) label, e.g. a loop
    /// head a helper introduces on its own. Never carries the step's pending
    /// IR label — every helper emits a real instruction before it ever needs
    /// an internal label, so `pending` is already consumed by that point.
    pub fn label_only(&mut self, label: Id) {
        debug_assert!(
            self.pending.is_none(),
            "an internal label was emitted before the step produced its first instruction"
        );
        self.ctx.push_label_only(label);
    }

    /// Consume `self`, attaching the pending label to a bare label-only entry
    /// if the step emitted no instruction at all (the zero-emission edge
    /// case of `spec.md` §9).
    pub fn finish(mut self) {
        if let Some(label) = self.pending.take() {
            self.ctx.push_label_only(label);
        }
    }

    pub fn fresh_label(&mut self) -> Id {
        self.ctx.fresh_label()
    }
}

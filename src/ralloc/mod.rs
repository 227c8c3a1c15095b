//! Register allocation: VR-referencing Z80-IC → fully real Z80-IC
//! (`spec.md` §4.5). A naive fill/spill allocator — every VR lives in the
//! frame for its entire lifetime, never in a register across instructions —
//! so this pass is purely mechanical once `isel` has committed to VR
//! placement and argument copy-in.

mod frame;
mod lower;

#[cfg(test)]
mod tests;

use crate::error::Result;
use crate::zic::{BlockEntry, Decl, Insn, Module, Procedure};

use frame::Frame;

fn allocate_body(frame: &Frame, body: Vec<BlockEntry>) -> Result<Vec<BlockEntry>> {
    let mut out = Vec::with_capacity(body.len());
    for entry in body {
        let Some(insn) = entry.insn else {
            out.push(entry);
            continue;
        };
        let real = if matches!(insn, Insn::Ret) {
            lower::epilogue()
        } else {
            lower::lower_insn(frame, insn)?
        };
        let mut label = entry.label;
        for insn in real {
            out.push(BlockEntry { label: label.take(), insn: Some(insn) });
        }
        if let Some(label) = label {
            // The instruction it was attached to lowered to zero real
            // instructions (never happens today, but keeps the label alive
            // if it ever does).
            out.push(BlockEntry::label_only(label));
        }
    }
    Ok(out)
}

/// Allocate one procedure: resolve every VR and local displacement, prepend
/// the prologue, and replace every `ret` with the epilogue sequence.
pub fn allocate_proc(proc: Procedure) -> Result<Procedure> {
    let frame = Frame::new(proc.name, proc.used_vr_count, &proc.locals);
    let mut body = allocate_body(&frame, proc.body)?;

    // A label on `body`'s first entry is an internal jump target the IR
    // placed there (e.g. a loop head reached by a later backward jump), not
    // the procedure's entry point — the procedure is only ever entered via
    // its mangled global name, so the prologue stays unlabelled and goes in
    // front of `body` untouched.
    let mut prologue: Vec<BlockEntry> = lower::prologue(frame.frame_size())
        .into_iter()
        .map(BlockEntry::insn)
        .collect();
    prologue.append(&mut body);

    Ok(Procedure {
        name: proc.name,
        body: prologue,
        locals: proc.locals,
        local_var_size: proc.local_var_size,
        used_vr_count: 0,
    })
}

/// Allocate every procedure in a module; `Extern`/`Variable` declarations
/// pass through unchanged.
pub fn allocate_module(module: Module) -> Result<Module> {
    let mut out = Module::new();
    for decl in module.decls {
        match decl {
            Decl::Procedure(proc) => out.push(Decl::Procedure(allocate_proc(proc)?)),
            other => out.push(other),
        }
    }
    Ok(out)
}

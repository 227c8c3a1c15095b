//! Instruction selection: IR module → Z80-IC module (`spec.md` §4).
//!
//! Translates one `ir::Proc` at a time into a `zic::Procedure` built out of
//! virtual-register instructions, leaving every fill/spill and frame
//! displacement decision to `ralloc`.

mod context;
mod helpers;
mod lower;
mod mangle;

#[cfg(test)]
mod tests;

use crate::error::Result;
use crate::ir;
use crate::zic;

use context::{Emit, SelCtx};

fn data_item(item: &ir::DataItem) -> zic::DataItem {
    match item {
        ir::DataItem::Byte(n) => zic::DataItem::Byte(*n),
        ir::DataItem::Word(n) => zic::DataItem::Word(*n),
        ir::DataItem::DWord(n) => zic::DataItem::DWord(*n),
        ir::DataItem::QWord(n) => zic::DataItem::QWord(*n),
        ir::DataItem::Ptr { symbol, offset } => zic::DataItem::Symbol {
            symbol: mangle::global(symbol.as_str()),
            offset: *offset,
        },
    }
}

fn select_proc(module: &ir::Module, proc: &ir::Proc) -> Result<zic::Procedure> {
    let mut ctx = SelCtx::new(module, proc)?;
    for entry in &proc.body {
        let label = entry.label.map(|l| ctx.mangle_label(l.as_str()));
        let mut emit = Emit::new(&mut ctx, label);
        if let Some(instr) = &entry.instr {
            lower::lower_instr(&mut emit, instr)?;
        }
        emit.finish();
    }
    ctx.out.used_vr_count = ctx.varmap.used_vr_count();
    Ok(ctx.out)
}

/// Translate a whole IR module. Declarations are emitted in their original
/// order; `Record`/`Typedef` carry no run-time representation and produce no
/// Z80-IC declaration of their own.
pub fn select_module(module: &ir::Module) -> Result<zic::Module> {
    let mut out = zic::Module::new();
    for decl in &module.decls {
        match decl {
            ir::Decl::Proc(proc) if proc.has_attr(ir::ProcAttr::Extern) => {
                out.push(zic::Decl::Extern(mangle::global(proc.name.as_str())));
            }
            ir::Decl::Proc(proc) => {
                out.push(zic::Decl::Procedure(select_proc(module, proc)?));
            }
            ir::Decl::Extern(name) => {
                out.push(zic::Decl::Extern(mangle::global(name.as_str())));
            }
            ir::Decl::Variable { name, init, .. } => {
                out.push(zic::Decl::Variable {
                    name: mangle::global(name.as_str()),
                    init: init.iter().map(data_item).collect(),
                });
            }
            ir::Decl::Record(_) | ir::Decl::Typedef { .. } => {}
        }
    }
    Ok(out)
}

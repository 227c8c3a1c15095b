//! The whole middle/back end, glued together: `isel` then `ralloc`, over
//! every procedure in IR declaration order (`spec.md` §5, determinism).

use crate::error::Result;
use crate::{ir, isel, ralloc, zic};

/// Translate one IR module all the way to a Z80-IC module ready for the
/// (out-of-scope) emitter.
pub fn compile_module(module: &ir::Module) -> Result<zic::Module> {
    let selected = isel::select_module(module)?;
    ralloc::allocate_module(selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Id;

    fn id(s: &str) -> Id {
        Id::from(s.to_string())
    }

    #[test]
    fn add16_compiles_end_to_end_to_real_instructions() {
        let module = ir::Module {
            decls: vec![ir::Decl::Proc(ir::Proc {
                name: id("add16"),
                attrs: Default::default(),
                args: vec![(id("a"), ir::Type::Int(16)), (id("b"), ir::Type::Int(16))],
                locals: vec![],
                ret: Some(ir::Type::Int(16)),
                body: vec![
                    ir::BlockEntry::unlabelled(ir::Instr::Add {
                        dest: id("r"),
                        width: 16,
                        lhs: ir::Operand::Var(id("a")),
                        rhs: ir::Operand::Var(id("b")),
                    }),
                    ir::BlockEntry::unlabelled(ir::Instr::Retv { width: 16, value: ir::Operand::Var(id("r")) }),
                ],
            })],
        };

        let out = compile_module(&module).unwrap();
        let zic::Decl::Procedure(proc) = &out.decls[0] else { panic!("expected a procedure") };
        assert_eq!(proc.used_vr_count, 0, "ralloc clears the VR count once everything is a frame displacement");

        let rendered: Vec<String> = proc.body.iter().filter_map(|e| e.insn.as_ref()).map(|i| i.to_string()).collect();
        assert_eq!(
            rendered,
            vec![
                "push IX",
                "ld IX,-6",
                "add IX,SP",
                "ld SP,IX",
                "ld IX,6",
                "add IX,SP",
                "ld (IX-2),L",
                "ld (IX-3),H",
                "ld (IX-4),E",
                "ld (IX-5),D",
                "ld A,(IX-2)",
                "add A,(IX-4)",
                "ld (IX-6),A",
                "ld A,(IX-3)",
                "adc A,(IX-5)",
                "ld (IX-7),A",
                "ld L,(IX-6)",
                "ld H,(IX-7)",
                "ld SP,IX",
                "pop IX",
                "ret",
            ]
        );
    }
}

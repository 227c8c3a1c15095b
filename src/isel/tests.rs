use crate::common::Id;
use crate::ir;
use crate::zic::{Decl, Insn, Reg16, VAluOp, VrPairSel, VrSel};

use super::select_module;

fn id(s: &str) -> Id {
    Id::from(s.to_string())
}

fn one_proc_module(proc: ir::Proc) -> ir::Module {
    ir::Module { decls: vec![ir::Decl::Proc(proc)] }
}

/// `spec.md` §8 S1: `@add16(%a:i16, %b:i16) -> i16 { %r = add.16 %a, %b;
/// retv.16 %r; }`. Argument copy-in follows the general HL-then-DE-then-BC
/// register order (`spec.md` §4.3) for two whole-pair 16-bit arguments.
#[test]
fn add16_copy_in_and_body_match_the_literal_scenario() {
    let module = one_proc_module(ir::Proc {
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
    });

    let out = select_module(&module).unwrap();
    let Decl::Procedure(proc) = &out.decls[0] else { panic!("expected a procedure") };
    assert_eq!(proc.used_vr_count, 3);

    let insns: Vec<&Insn> = proc.body.iter().filter_map(|e| e.insn.as_ref()).collect();
    assert!(matches!(insns[0], Insn::VLdVrrR16 { dst, reg: Reg16::HL } if *dst == VrPairSel::new(0)));
    assert!(matches!(insns[1], Insn::VLdVrrR16 { dst, reg: Reg16::DE } if *dst == VrPairSel::new(1)));
    assert!(matches!(
        insns[2],
        Insn::VAluVr { op: VAluOp::Add, dst, lhs, rhs }
            if *dst == VrSel::lo(2) && *lhs == VrSel::lo(0) && *rhs == VrSel::lo(1)
    ));
    assert!(matches!(
        insns[3],
        Insn::VAluVr { op: VAluOp::Adc, dst, lhs, rhs }
            if *dst == VrSel::hi(2) && *lhs == VrSel::hi(0) && *rhs == VrSel::hi(1)
    ));
    assert!(matches!(insns[4], Insn::VLdR16Vrr { reg: Reg16::HL, src } if *src == VrPairSel::new(2)));
    assert!(matches!(insns[5], Insn::Ret));
    assert_eq!(insns.len(), 6);
}

/// An 8-bit argument following a 16-bit one shares HL's spare half once the
/// whole-pair argument before it has already consumed the pair
/// (`spec.md` §4.3).
#[test]
fn mixed_width_args_copy_in_via_registers() {
    let module = one_proc_module(ir::Proc {
        name: id("f"),
        attrs: Default::default(),
        args: vec![(id("x"), ir::Type::Int(8)), (id("y"), ir::Type::Int(8))],
        locals: vec![],
        ret: None,
        body: vec![ir::BlockEntry::unlabelled(ir::Instr::Ret)],
    });

    let out = select_module(&module).unwrap();
    let Decl::Procedure(proc) = &out.decls[0] else { panic!("expected a procedure") };
    let insns: Vec<&Insn> = proc.body.iter().filter_map(|e| e.insn.as_ref()).collect();
    // Two 8-bit args share HL's low/high byte.
    assert!(matches!(insns[0], Insn::VSpillRVr { reg: crate::zic::Reg8::L, .. }));
    assert!(matches!(insns[1], Insn::VSpillRVr { reg: crate::zic::Reg8::H, .. }));
}

/// A 64-bit-returning procedure receives the hidden return pointer as
/// argument zero, ahead of its declared arguments (`spec.md` §4.3, "Hidden
/// argument rule").
#[test]
fn hidden_retval_pointer_is_copied_in_first() {
    let module = one_proc_module(ir::Proc {
        name: id("wide"),
        attrs: Default::default(),
        args: vec![(id("a"), ir::Type::Int(16))],
        locals: vec![],
        ret: Some(ir::Type::Int(64)),
        body: vec![
            ir::BlockEntry::unlabelled(ir::Instr::Imm { dest: id("r"), width: 64, value: 0 }),
            ir::BlockEntry::unlabelled(ir::Instr::Retv { width: 64, value: ir::Operand::Var(id("r")) }),
        ],
    });

    let out = select_module(&module).unwrap();
    let Decl::Procedure(proc) = &out.decls[0] else { panic!("expected a procedure") };
    let insns: Vec<&Insn> = proc.body.iter().filter_map(|e| e.insn.as_ref()).collect();
    // VR0 is the hidden pointer (HL), VR1 is %a (DE).
    assert!(matches!(insns[0], Insn::VLdVrrR16 { dst, reg: Reg16::HL } if *dst == VrPairSel::new(0)));
    assert!(matches!(insns[1], Insn::VLdVrrR16 { dst, reg: Reg16::DE } if *dst == VrPairSel::new(1)));
}

/// `spec.md` §8 S4-style reasoning: sign extension computes the fill byte
/// once via `xor A` / `bit 7,msb` / `jp P` / `dec A`, not per destination
/// byte.
#[test]
fn signed_widen_computes_fill_byte_once() {
    let module = one_proc_module(ir::Proc {
        name: id("g"),
        attrs: Default::default(),
        args: vec![(id("a"), ir::Type::Int(8))],
        locals: vec![],
        ret: Some(ir::Type::Int(16)),
        body: vec![
            ir::BlockEntry::unlabelled(ir::Instr::Sgnext {
                dest: id("r"),
                dest_width: 16,
                src: ir::Operand::Var(id("a")),
                src_width: 8,
            }),
            ir::BlockEntry::unlabelled(ir::Instr::Retv { width: 16, value: ir::Operand::Var(id("r")) }),
        ],
    });

    let out = select_module(&module).unwrap();
    let Decl::Procedure(proc) = &out.decls[0] else { panic!("expected a procedure") };
    let insns: Vec<&Insn> = proc.body.iter().filter_map(|e| e.insn.as_ref()).collect();
    let xor_count = insns.iter().filter(|i| matches!(i, Insn::XorR { .. })).count();
    assert_eq!(xor_count, 1, "the sign test runs once, not once per destination byte");
}

/// `eq`/`neq` branch on the first byte that differs rather than comparing
/// every byte unconditionally (`spec.md` §4.4.2).
#[test]
fn eq_short_circuits_on_first_differing_byte() {
    let module = one_proc_module(ir::Proc {
        name: id("h"),
        attrs: Default::default(),
        args: vec![(id("a"), ir::Type::Int(16)), (id("b"), ir::Type::Int(16))],
        locals: vec![],
        ret: Some(ir::Type::Int(16)),
        body: vec![
            ir::BlockEntry::unlabelled(ir::Instr::Eq {
                dest: id("r"),
                width: 16,
                lhs: ir::Operand::Var(id("a")),
                rhs: ir::Operand::Var(id("b")),
            }),
            ir::BlockEntry::unlabelled(ir::Instr::Retv { width: 16, value: ir::Operand::Var(id("r")) }),
        ],
    });

    let out = select_module(&module).unwrap();
    let Decl::Procedure(proc) = &out.decls[0] else { panic!("expected a procedure") };
    let insns: Vec<&Insn> = proc.body.iter().filter_map(|e| e.insn.as_ref()).collect();
    let cmp_count = insns.iter().filter(|i| matches!(i, Insn::VCmpVr { .. })).count();
    assert_eq!(cmp_count, 2, "one VCmpVr per operand byte, each followed by a conditional branch out");
    let branch_count = insns
        .iter()
        .filter(|i| matches!(i, Insn::JpCcNn { cc: crate::zic::Cond::NZ, .. }))
        .count();
    assert!(branch_count >= 2);
}

/// `call` to an extern/declared procedure places a `calln` target at the
/// mangled global name and cleans up any stack-passed bytes afterward.
#[test]
fn call_cleans_up_stack_arguments() {
    let callee = ir::Proc {
        name: id("sink"),
        attrs: [ir::ProcAttr::Extern].into_iter().collect(),
        args: vec![(id("p"), ir::Type::Int(32))],
        locals: vec![],
        ret: None,
        body: vec![],
    };
    let caller = ir::Proc {
        name: id("caller"),
        attrs: Default::default(),
        args: vec![],
        locals: vec![],
        ret: None,
        body: vec![
            ir::BlockEntry::unlabelled(ir::Instr::Imm { dest: id("x"), width: 32, value: 7 }),
            ir::BlockEntry::unlabelled(ir::Instr::Call {
                dest: None,
                width: 0,
                callee: id("sink"),
                args: ir::Operand::List(vec![ir::Operand::Var(id("x"))]),
            }),
            ir::BlockEntry::unlabelled(ir::Instr::Ret),
        ],
    };
    let module = ir::Module { decls: vec![ir::Decl::Proc(callee), ir::Decl::Proc(caller)] };

    let out = select_module(&module).unwrap();
    // `sink` is `@extern`, so it lowers to a bare `Decl::Extern`, not a body.
    assert!(matches!(out.decls[0], Decl::Extern(_)));
    let Decl::Procedure(proc) = &out.decls[1] else { panic!("expected a procedure") };
    let insns: Vec<&Insn> = proc.body.iter().filter_map(|e| e.insn.as_ref()).collect();
    assert!(insns.iter().any(|i| matches!(i, Insn::CallNn { .. })));
    // A 4-byte argument goes entirely to the stack (wider than one pair);
    // the caller cleans it up with `inc SP` per byte afterward.
    let inc_sp_count = insns.iter().filter(|i| matches!(i, Insn::IncSp)).count();
    assert_eq!(inc_sp_count, 4);
}

/// A record argument with an odd byte width (three `i8` members, unpadded)
/// still round-trips byte 0 first: the pushed order must put the argument's
/// lowest-indexed byte at the lowest stack address, matching the callee's
/// `IX+4+offset+i` read order (`spec.md` §8 property 8).
#[test]
fn odd_byte_record_argument_pushes_in_read_order() {
    let triple = ir::RecordDecl {
        name: id("triple"),
        kind: ir::RecordKind::Struct,
        members: vec![
            (id("a"), ir::Type::Int(8)),
            (id("b"), ir::Type::Int(8)),
            (id("c"), ir::Type::Int(8)),
        ],
    };
    let callee = ir::Proc {
        name: id("sink3"),
        attrs: [ir::ProcAttr::Extern].into_iter().collect(),
        args: vec![(id("t"), ir::Type::Record(id("triple")))],
        locals: vec![],
        ret: None,
        body: vec![],
    };
    let caller = ir::Proc {
        name: id("caller3"),
        attrs: Default::default(),
        args: vec![(id("t"), ir::Type::Record(id("triple")))],
        locals: vec![],
        ret: None,
        body: vec![
            ir::BlockEntry::unlabelled(ir::Instr::Call {
                dest: None,
                width: 0,
                callee: id("sink3"),
                args: ir::Operand::List(vec![ir::Operand::Var(id("t"))]),
            }),
            ir::BlockEntry::unlabelled(ir::Instr::Ret),
        ],
    };
    let module = ir::Module {
        decls: vec![ir::Decl::Record(triple), ir::Decl::Proc(callee), ir::Decl::Proc(caller)],
    };

    let out = select_module(&module).unwrap();
    let Decl::Procedure(proc) = &out.decls[2] else { panic!("expected a procedure") };
    let insns: Vec<&Insn> = proc.body.iter().filter_map(|e| e.insn.as_ref()).collect();

    // The trailing odd byte (index 2, `triple.c`) is pushed before the whole
    // pair (indices 0,1): it has to land above the pair on the stack, which
    // only happens if it is pushed first.
    let byte_push = insns.iter().position(|i| matches!(i, Insn::VPushVrByte { .. })).unwrap();
    let pair_push = insns.iter().position(|i| matches!(i, Insn::VPushVrr { .. })).unwrap();
    assert!(byte_push < pair_push, "the odd trailing byte must be pushed before the whole pair");

    // 3 bytes round up to 4 stack bytes; the caller cleans up all 4.
    let inc_sp_count = insns.iter().filter(|i| matches!(i, Insn::IncSp)).count();
    assert_eq!(inc_sp_count, 4);
}

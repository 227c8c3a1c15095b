use crate::common::Id;
use crate::zic::{Insn, Procedure, Reg16, Reg8, VAluOp, VrPairSel, VrSel};

use super::{allocate_proc, frame::Frame, lower};

fn id(s: &str) -> Id {
    Id::from(s.to_string())
}

fn rendered(body: &[crate::zic::BlockEntry]) -> Vec<String> {
    body.iter()
        .filter_map(|e| e.insn.as_ref())
        .map(|i| i.to_string())
        .collect()
}

#[test]
fn prologue_is_the_six_instruction_sequence() {
    let rendered: Vec<String> = lower::prologue(6).iter().map(|i| i.to_string()).collect();
    assert_eq!(
        rendered,
        vec!["push IX", "ld IX,-6", "add IX,SP", "ld SP,IX", "ld IX,6", "add IX,SP"]
    );
}

#[test]
fn epilogue_is_the_three_instruction_sequence() {
    let rendered: Vec<String> = lower::epilogue().iter().map(|i| i.to_string()).collect();
    assert_eq!(rendered, vec!["ld SP,IX", "pop IX", "ret"]);
}

#[test]
fn pair_copy_fills_and_spills_both_halves() {
    // `spec.md` §8 S6: copying VR5 into VR3, six VRs live.
    let frame = Frame::new(id("f"), 6, &[]);
    let insn = Insn::VLdVrrVrr { dst: VrPairSel::new(3), src: VrPairSel::new(5) };
    let real: Vec<String> = lower::lower_insn(&frame, insn).unwrap().iter().map(|i| i.to_string()).collect();
    assert_eq!(real, vec!["ld L,(IX-12)", "ld H,(IX-13)", "ld (IX-8),L", "ld (IX-9),H"]);
}

#[test]
fn displacement_out_of_range_is_unsupported() {
    let frame = Frame::new(id("f"), 100, &[]);
    let err = frame.vr_displacement(VrSel::lo(90)).unwrap_err();
    assert!(err.to_string().contains("displacement"));
}

/// `spec.md` §8 S1: `@add16(%a, %b)`, VR0/VR1 arguments, VR2 the add
/// result, `used_vrs = 3`, `frame_size = 6`.
#[test]
fn add16_scenario_matches_the_literal_prologue_frame_size_and_body() {
    let mut proc = Procedure::new(id("_add16"));
    // %r = add.16 %a, %b  (VR2 = VR0 + VR1, byte loop with carry)
    proc.push(
        None,
        Insn::VAluVr { op: VAluOp::Add, dst: VrSel::lo(2), lhs: VrSel::lo(0), rhs: VrSel::lo(1) },
    );
    proc.push(
        None,
        Insn::VAluVr { op: VAluOp::Adc, dst: VrSel::hi(2), lhs: VrSel::hi(0), rhs: VrSel::hi(1) },
    );
    // retv.16 %r
    proc.push(None, Insn::VLdR16Vrr { reg: Reg16::HL, src: VrPairSel::new(2) });
    proc.push(None, Insn::Ret);
    proc.used_vr_count = 3;

    let allocated = allocate_proc(proc).unwrap();
    assert_eq!(allocated.used_vr_count, 0);

    let expected = vec![
        "push IX",
        "ld IX,-6",
        "add IX,SP",
        "ld SP,IX",
        "ld IX,6",
        "add IX,SP",
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
    ];
    assert_eq!(rendered(&allocated.body), expected);
}

#[test]
fn reg8_halves_follow_the_hl_de_bc_argument_pairs() {
    // Sanity check on `reg16_halves`'s pairing, exercised indirectly through
    // `VLdVrrR16`/`VLdR16Vrr` lowering for each argument pair.
    let frame = Frame::new(id("f"), 2, &[]);
    for (reg, lo, hi) in [(Reg16::HL, Reg8::L, Reg8::H), (Reg16::DE, Reg8::E, Reg8::D), (Reg16::BC, Reg8::C, Reg8::B)] {
        let insn = Insn::VLdVrrR16 { dst: VrPairSel::new(0), reg };
        let real = lower::lower_insn(&frame, insn).unwrap();
        assert_eq!(real.len(), 2);
        assert!(real[0].to_string().contains(&lo.to_string()));
        assert!(real[1].to_string().contains(&hi.to_string()));
    }
}

//! Instructions: the real Z80 opcodes `ralloc` emits, and the
//! virtual-register variants `isel` emits in their place before allocation.

use std::fmt;

use super::{Cond, Reg16, Reg8, StackReg, VrPairSel, VrSel};
use crate::common::Id;

/// A jump/call target.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Target {
    /// A procedure-local label, already mangled (`l_proc_label`).
    Local(Id),
    /// A global symbol: a mangled procedure name or a global variable.
    Global(Id),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Local(id) => write!(f, "{id}"),
            Target::Global(id) => write!(f, "{id}"),
        }
    }
}

/// A 16-bit immediate operand: either a literal or a symbolic address.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Imm16 {
    Const(i32),
    Symbol(Target),
}

impl fmt::Display for Imm16 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Imm16::Const(n) => write!(f, "{n}"),
            Imm16::Symbol(t) => write!(f, "{t}"),
        }
    }
}

/// A symbolic local-variable frame offset: `$mangled_name`, resolved by
/// `ralloc` once it has laid out the procedure's local-variable table
/// (`spec.md` §4.1, `vrr_lvarptr`).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct FrameSlot {
    pub local_index: u32,
}

/// One Z80 instruction: either a real instruction ready for the emitter, or
/// a virtual instruction referencing VRs that `ralloc` must still lower.
///
/// Kept as one flat tagged enum (no physical/virtual sub-hierarchy) so every
/// consumer is an exhaustive `match`, matching the teacher's
/// `back::asm::Instruction` shape.
#[derive(Clone, Debug)]
pub enum Insn {
    // ---- 8-bit loads (real) ----
    LdRR { dst: Reg8, src: Reg8 },
    LdRN { dst: Reg8, n: u8 },
    LdRIndHl { dst: Reg8 },
    LdIndHlR { src: Reg8 },
    /// `ld A,(DE)`: the one indirect-via-DE form the Z80 offers (`reccopy`'s
    /// byte-copy loop reads the source through DE while HL writes the
    /// destination).
    LdAIndDe,
    LdRIndIxD { dst: Reg8, d: i8 },
    LdIndIxDR { d: i8, src: Reg8 },
    LdIndIxDN { d: i8, n: u8 },

    // ---- 16-bit loads (real) ----
    LdDdNn { dd: Reg16, nn: Imm16 },

    // ---- ALU on the accumulator (real) ----
    AddAR { src: Reg8 },
    AddAN { n: u8 },
    AdcAR { src: Reg8 },
    AdcAN { n: u8 },
    SubR { src: Reg8 },
    SubN { n: u8 },
    SbcAR { src: Reg8 },
    SbcAN { n: u8 },
    AndR { src: Reg8 },
    AndN { n: u8 },
    OrR { src: Reg8 },
    OrN { n: u8 },
    XorR { src: Reg8 },
    XorN { n: u8 },
    Cpl,
    AndA,

    // ---- 8-bit ALU directly against a frame slot (no accumulator fill) ----
    AddAIndIxD { d: i8 },
    AdcAIndIxD { d: i8 },
    SubIndIxD { d: i8 },
    SbcAIndIxD { d: i8 },
    AndIndIxD { d: i8 },
    OrIndIxD { d: i8 },
    XorIndIxD { d: i8 },

    // ---- 16-bit arithmetic via HL (real) ----
    AddHlSs { ss: Reg16 },
    SbcHlSs { ss: Reg16 },
    IncSs { ss: Reg16 },

    // ---- register-only inc/dec, used once the register already holds the
    // value to bump (real) ----
    IncR { r: Reg8 },
    DecR { r: Reg8 },

    // ---- shifts/rotates/bit test (real, operate on the named register) ----
    Sla { r: Reg8 },
    Sra { r: Reg8 },
    Srl { r: Reg8 },
    Rl { r: Reg8 },
    Rr { r: Reg8 },
    BitBR { bit: u8, r: Reg8 },
    BitBIndIxD { bit: u8, d: i8 },

    // ---- control flow (real) ----
    JpNn { target: Target },
    JpCcNn { cc: Cond, target: Target },
    CallNn { target: Target },
    Ret,
    RetCc { cc: Cond },

    // ---- stack (real) ----
    Push { rr: StackReg },
    Pop { rr: StackReg },

    // ---- frame manipulation (real) ----
    LdIxNn { nn: i32 },
    AddIxSp,
    LdSpIx,
    IncSp,

    Nop,
    /// A free-form comment, carried through to help debug output; never
    /// affects semantics.
    Comment(String),

    // ================= virtual (VR-referencing) instructions =================
    /// `ld_vr_n`: spill an immediate byte directly into a VR.
    VLdVrN { dst: VrSel, n: u8 },
    /// Byte move mediated by A: fill `src`, spill to `dst`.
    VLdVrVr { dst: VrSel, src: VrSel },
    /// `ld_vr_ihl`: `ld A,(HL)` then spill A into `dst` (HL already holds
    /// the address via a preceding instruction).
    VLdVrIndHl { dst: VrSel },
    /// `ld_ihl_vr`: fill A from `src`, then `ld (HL),A`.
    VLdIndHlVr { src: VrSel },
    /// `ld_vrr_nn`: `ld HL,nn` then spill HL into the VR pair `dst`.
    VLdVrrNn { dst: VrPairSel, nn: Imm16 },
    /// `ld_vrr_vrr`: pair copy mediated by HL (fill low/high, spill
    /// low/high), exactly the sequence in `spec.md` §8 S6.
    VLdVrrVrr { dst: VrPairSel, src: VrPairSel },
    /// `ld_r16_vrr`: fill a named 16-bit register from a VR pair.
    VLdR16Vrr { reg: Reg16, src: VrPairSel },
    /// Fill a named 8-bit register from a single VR byte: one return-value
    /// byte, or one register-piece argument (`spec.md` §4.3/§4.4.2 `call`).
    VLdRVr { reg: Reg8, src: VrSel },
    /// Spill a named 8-bit register into a single VR byte: the inverse of
    /// [`Insn::VLdRVr`], used by a procedure's argument copy-in to receive a
    /// register-piece argument (`spec.md` §4.5, "Argument copy-in").
    VSpillRVr { reg: Reg8, dst: VrSel },
    /// `ld_vrr_r16`: spill a named 16-bit register into a VR pair.
    VLdVrrR16 { dst: VrPairSel, reg: Reg16 },
    /// `add_vrr_vrr`: `dst += src` via HL/BC (fill HL<-dst, fill BC<-src,
    /// `add HL,BC`, spill HL->dst).
    VAddVrrVrr { dst: VrPairSel, src: VrPairSel },
    /// `sub_vrr_vrr`: `dst -= src` via HL/BC with `and A` to clear carry
    /// first, then `sbc HL,BC`.
    VSubVrrVrr { dst: VrPairSel, src: VrPairSel },

    /// Per-byte ALU, A-mediated and 3-address: fill A from `lhs`, `OP
    /// A,(IX+d_rhs)`, spill A to `dst` (`dst` and `lhs` coincide for the
    /// in-place pair-level ops; they differ for general `dest = lhs op
    /// rhs}` IR instructions). `op` selects add/adc/sub/sbc.
    VAluVr { op: VAluOp, dst: VrSel, lhs: VrSel, rhs: VrSel },
    /// Same as `VAluVr`, but against an immediate byte instead of a second
    /// VR (`recmbr`'s constant member offset, `spec.md` §8 S5).
    VAluImmVr { op: VAluOp, dst: VrSel, lhs: VrSel, imm: u8 },
    /// Comparison byte: fill A from `lhs`, `sub`/`sbc A,(IX+d_rhs)`, keep
    /// only the flags (no spill). `op` is `Sub` for the first byte of a
    /// chain, `Sbc` for every byte after (`spec.md` §4.4.2 `eq`/`lt`/...).
    VCmpVr { op: VAluOp, lhs: VrSel, rhs: VrSel },
    /// Fill A from a VR byte, no op. The first step of `jnz`/`jz`'s
    /// zero-across-all-bytes test.
    VFillA { src: VrSel },
    /// `or (IX+d_src)` against the A already loaded by `VFillA`/a previous
    /// `VOrAVr`, keeping the running OR in A (no spill).
    VOrAVr { src: VrSel },
    /// Per-byte bitwise op, A-mediated and 3-address, matching the spec's
    /// `and/or/xor_vr` wording (a single `(IX+d)` operand — `rhs` — against
    /// an A already filled from `lhs`).
    VBitwiseVr { op: VBitwiseOp, dst: VrSel, lhs: VrSel, rhs: VrSel },
    /// `bnot`/unary complement, A-mediated: fill A from `src`, `cpl`, spill
    /// to `dst` (`dst` and `src` coincide for in-place use).
    VCplVr { dst: VrSel, src: VrSel },
    /// Fill, `inc a`, spill. Used by `neg_vrr`'s carry-propagating `+1` and
    /// by the 8-bit loop counters in `mul`/`shl`/`shra`/`shrl`.
    VIncVr { vr: VrSel },
    /// Fill, `dec a`, spill.
    VDecVr { vr: VrSel },

    /// Shift/rotate a VR byte, A-mediated (fill, shift op, spill).
    VShiftVr { op: VShiftOp, vr: VrSel },
    /// `bit b, %vr`: lowers directly to `BIT b,(IX+d)` (`spec.md` §8 S4);
    /// no fill/spill, since the Z80 bit-test group addresses `(IX+d)`
    /// directly and leaves the tested byte unchanged.
    VBitBVr { bit: u8, vr: VrSel },

    /// Push a VR pair onto the stack: fill HL from `src`, `push HL`.
    VPushVrr { src: VrPairSel },
    /// Push a single VR byte, padded to a 16-bit stack slot: fill L from
    /// `src`, `push HL` (H is whatever HL's high byte already was — the
    /// padding byte is explicitly undefined, `spec.md` §4.3).
    VPushVrByte { src: VrSel },

    /// Store A directly into a VR byte, no preceding fill: used after a
    /// sequence of real, register-only instructions has already left the
    /// value to store in A (`vrr_extend`'s sign-fill, `spec.md` §8 S4-style
    /// reasoning generalized to arbitrary widths).
    VSpillA { dst: VrSel },

    /// `vrr_lvarptr`: load the address of local variable `var` into VR pair
    /// `dst`. Resolved by `ralloc` once local offsets are known (Open
    /// Question 2 in DESIGN.md): `push ix; pop <pair>; ld bc,d; add
    /// <pair>,bc`.
    VLvarptr { dst: VrPairSel, var: FrameSlot },
}

/// Which accumulator-mediated arithmetic op `VAluVr` performs.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VAluOp {
    Add,
    Adc,
    Sub,
    Sbc,
}

/// Which accumulator-mediated bitwise op `VBitwiseVr` performs.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VBitwiseOp {
    And,
    Or,
    Xor,
}

/// Which shift/rotate `VShiftVr` performs.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VShiftOp {
    Sla,
    Sra,
    Srl,
    Rl,
    Rr,
}

impl Insn {
    /// `true` if this is a virtual (VR-referencing) instruction that
    /// `ralloc` must lower before the procedure can be emitted.
    pub fn is_virtual(&self) -> bool {
        use Insn::*;
        matches!(
            self,
            VLdVrN { .. }
                | VLdVrVr { .. }
                | VLdVrIndHl { .. }
                | VLdIndHlVr { .. }
                | VLdVrrNn { .. }
                | VLdVrrVrr { .. }
                | VLdR16Vrr { .. }
                | VLdRVr { .. }
                | VSpillRVr { .. }
                | VLdVrrR16 { .. }
                | VAddVrrVrr { .. }
                | VSubVrrVrr { .. }
                | VAluVr { .. }
                | VAluImmVr { .. }
                | VCmpVr { .. }
                | VFillA { .. }
                | VOrAVr { .. }
                | VBitwiseVr { .. }
                | VCplVr { .. }
                | VIncVr { .. }
                | VDecVr { .. }
                | VShiftVr { .. }
                | VBitBVr { .. }
                | VPushVrr { .. }
                | VPushVrByte { .. }
                | VSpillA { .. }
                | VLvarptr { .. }
        )
    }
}

impl fmt::Display for Insn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Insn::*;
        match self {
            LdRR { dst, src } => write!(f, "ld {dst},{src}"),
            LdRN { dst, n } => write!(f, "ld {dst},{n}"),
            LdRIndHl { dst } => write!(f, "ld {dst},(HL)"),
            LdIndHlR { src } => write!(f, "ld (HL),{src}"),
            LdAIndDe => write!(f, "ld A,(DE)"),
            LdRIndIxD { dst, d } => write!(f, "ld {dst},(IX{d:+})"),
            LdIndIxDR { d, src } => write!(f, "ld (IX{d:+}),{src}"),
            LdIndIxDN { d, n } => write!(f, "ld (IX{d:+}),{n}"),
            LdDdNn { dd, nn } => write!(f, "ld {dd},{nn}"),
            AddAR { src } => write!(f, "add A,{src}"),
            AddAN { n } => write!(f, "add A,{n}"),
            AdcAR { src } => write!(f, "adc A,{src}"),
            AdcAN { n } => write!(f, "adc A,{n}"),
            SubR { src } => write!(f, "sub {src}"),
            SubN { n } => write!(f, "sub {n}"),
            SbcAR { src } => write!(f, "sbc A,{src}"),
            SbcAN { n } => write!(f, "sbc A,{n}"),
            AndR { src } => write!(f, "and {src}"),
            AndN { n } => write!(f, "and {n}"),
            OrR { src } => write!(f, "or {src}"),
            OrN { n } => write!(f, "or {n}"),
            XorR { src } => write!(f, "xor {src}"),
            XorN { n } => write!(f, "xor {n}"),
            Cpl => write!(f, "cpl"),
            AndA => write!(f, "and A"),
            AddAIndIxD { d } => write!(f, "add A,(IX{d:+})"),
            AdcAIndIxD { d } => write!(f, "adc A,(IX{d:+})"),
            SubIndIxD { d } => write!(f, "sub (IX{d:+})"),
            SbcAIndIxD { d } => write!(f, "sbc A,(IX{d:+})"),
            AndIndIxD { d } => write!(f, "and (IX{d:+})"),
            OrIndIxD { d } => write!(f, "or (IX{d:+})"),
            XorIndIxD { d } => write!(f, "xor (IX{d:+})"),
            AddHlSs { ss } => write!(f, "add HL,{ss}"),
            SbcHlSs { ss } => write!(f, "sbc HL,{ss}"),
            IncSs { ss } => write!(f, "inc {ss}"),
            IncR { r } => write!(f, "inc {r}"),
            DecR { r } => write!(f, "dec {r}"),
            Sla { r } => write!(f, "sla {r}"),
            Sra { r } => write!(f, "sra {r}"),
            Srl { r } => write!(f, "srl {r}"),
            Rl { r } => write!(f, "rl {r}"),
            Rr { r } => write!(f, "rr {r}"),
            BitBR { bit, r } => write!(f, "bit {bit},{r}"),
            BitBIndIxD { bit, d } => write!(f, "bit {bit},(IX{d:+})"),
            JpNn { target } => write!(f, "jp {target}"),
            JpCcNn { cc, target } => write!(f, "jp {cc},{target}"),
            CallNn { target } => write!(f, "call {target}"),
            Ret => write!(f, "ret"),
            RetCc { cc } => write!(f, "ret {cc}"),
            Push { rr } => write!(f, "push {rr}"),
            Pop { rr } => write!(f, "pop {rr}"),
            LdIxNn { nn } => write!(f, "ld IX,{nn}"),
            AddIxSp => write!(f, "add IX,SP"),
            LdSpIx => write!(f, "ld SP,IX"),
            IncSp => write!(f, "inc SP"),
            Nop => write!(f, "nop"),
            Comment(s) => write!(f, "; {s}"),
            VLdVrN { dst, n } => write!(f, "ld.v vr{dst:?},{n}"),
            VLdVrVr { dst, src } => write!(f, "ld.v vr{dst:?},vr{src:?}"),
            VLdVrIndHl { dst } => write!(f, "ld.v vr{dst:?},(HL)"),
            VLdIndHlVr { src } => write!(f, "ld.v (HL),vr{src:?}"),
            VLdVrrNn { dst, nn } => write!(f, "ld.v vrr{},{nn}", dst.vr),
            VLdVrrVrr { dst, src } => write!(f, "ld.v vrr{},vrr{}", dst.vr, src.vr),
            VLdR16Vrr { reg, src } => write!(f, "ld.v {reg},vrr{}", src.vr),
            VLdRVr { reg, src } => write!(f, "ld.v {reg},vr{src:?}"),
            VSpillRVr { reg, dst } => write!(f, "st.v vr{dst:?},{reg}"),
            VLdVrrR16 { dst, reg } => write!(f, "ld.v vrr{},{reg}", dst.vr),
            VAddVrrVrr { dst, src } => write!(f, "add.v vrr{},vrr{}", dst.vr, src.vr),
            VSubVrrVrr { dst, src } => write!(f, "sub.v vrr{},vrr{}", dst.vr, src.vr),
            VAluVr { op, dst, lhs, rhs } => write!(f, "{op:?}.v vr{dst:?},vr{lhs:?},vr{rhs:?}"),
            VAluImmVr { op, dst, lhs, imm } => write!(f, "{op:?}.v vr{dst:?},vr{lhs:?},{imm}"),
            VCmpVr { op, lhs, rhs } => write!(f, "{op:?}.vcmp vr{lhs:?},vr{rhs:?}"),
            VFillA { src } => write!(f, "ld.v A,vr{src:?}"),
            VOrAVr { src } => write!(f, "or.v vr{src:?}"),
            VBitwiseVr { op, dst, lhs, rhs } => write!(f, "{op:?}.v vr{dst:?},vr{lhs:?},vr{rhs:?}"),
            VCplVr { dst, src } => write!(f, "cpl.v vr{dst:?},vr{src:?}"),
            VIncVr { vr } => write!(f, "inc.v vr{vr:?}"),
            VDecVr { vr } => write!(f, "dec.v vr{vr:?}"),
            VShiftVr { op, vr } => write!(f, "{op:?}.v vr{vr:?}"),
            VBitBVr { bit, vr } => write!(f, "bit.v {bit},vr{vr:?}"),
            VPushVrr { src } => write!(f, "push.v vrr{}", src.vr),
            VPushVrByte { src } => write!(f, "push.v vr{src:?}"),
            VSpillA { dst } => write!(f, "st.v vr{dst:?},A"),
            VLvarptr { dst, var } => write!(f, "lvarptr.v vrr{},local{}", dst.vr, var.local_index),
        }
    }
}

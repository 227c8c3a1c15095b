//! The variable map (`spec.md` §4.2): IR variable name → VR range, and the
//! monotonic VR allocator for a single procedure's selection.

use crate::common::{Id, Map};
use crate::error::{Error, Result};
use crate::ir;
use crate::zic::vr_pairs_for_bytes;

/// Where one IR variable lives: its first VR-pair number, and how many
/// consecutive VR pairs it spans (1 for an 8-bit value).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Entry {
    pub first_vr: u32,
    pub vr_pairs: u32,
}

/// Per-procedure name → VR-range map, plus the next-free-VR cursor. Owned by
/// exactly one procedure's selection context (`spec.md` §3 "Lifecycles").
#[derive(Debug, Default)]
pub struct VarMap {
    entries: Map<Id, Entry>,
    next_vr: u32,
}

impl VarMap {
    pub fn new() -> VarMap {
        VarMap::default()
    }

    /// The next VR number that will be handed out.
    pub fn next_vr(&self) -> u32 {
        self.next_vr
    }

    /// Total distinct VR numbers allocated so far (for `used_vr_count`).
    pub fn used_vr_count(&self) -> u32 {
        self.next_vr
    }

    /// Allocate `vr_pairs` consecutive VR pairs and associate `name` with
    /// the first one. Inserting the same name twice is a programming error
    /// (the front end guarantees SSA-like fresh definitions), matching
    /// `spec.md` §4.2.
    pub fn insert(&mut self, name: Id, vr_pairs: u32) -> Result<Entry> {
        if self.entries.contains_key(&name) {
            panic!("varmap: duplicate insert of {name:?}");
        }
        self.next_vr
            .checked_add(vr_pairs)
            .ok_or_else(|| Error::out_of_memory(format!("allocating VRs for {name}")))?;
        let first_vr = self.next_vr;
        self.next_vr += vr_pairs;
        let entry = Entry { first_vr, vr_pairs };
        self.entries.insert(name, entry);
        Ok(entry)
    }

    pub fn find(&self, name: Id) -> Result<Entry> {
        self.entries
            .get(&name)
            .copied()
            .ok_or_else(|| Error::not_found("variable", name))
    }

    /// Allocate a fresh VR range not tied to any IR name: `isel`'s
    /// generic-helper temporaries (`t`, `u` in `vrr_cmul`/`mul`, loop
    /// counters) use this directly (`spec.md` §4.4.1, "get_new_vregno").
    pub fn get_new_vregno(&mut self, vr_pairs: u32) -> Result<u32> {
        self.next_vr
            .checked_add(vr_pairs)
            .ok_or_else(|| Error::out_of_memory("allocating a selector temporary"))?;
        let first = self.next_vr;
        self.next_vr += vr_pairs;
        Ok(first)
    }
}

/// The reserved name for the hidden return-pointer argument of a 64-bit
/// returning procedure (`spec.md` §4.3, "Hidden-argument rule").
pub const HIDDEN_RETVAL_ARG: &str = "%.retval";

/// Build the varmap for one procedure: the hidden return pointer (if the
/// procedure returns 64 bits) and its arguments first, in order, then a scan
/// of the body recording every instruction's fresh destination
/// (`spec.md` §4.2, "Pre-selection scan").
pub fn scan_procedure(proc: &ir::Proc, module: &ir::Module) -> Result<VarMap> {
    let mut vm = VarMap::new();

    if matches!(&proc.ret, Some(ir::Type::Int(64))) {
        vm.insert(Id::from(HIDDEN_RETVAL_ARG.to_string()), 1)?;
    }

    for (name, ty) in &proc.args {
        let bytes = ty.size_bytes(module)?;
        vm.insert(*name, vr_pairs_for_bytes(bytes))?;
    }

    for entry in &proc.body {
        let Some(instr) = &entry.instr else { continue };
        let Some(dest) = instr.dest() else { continue };
        if vm.find(dest).is_ok() {
            continue;
        }
        let width_bits = dest_width_bits(instr, module)?;
        vm.insert(dest, vr_pairs_for_bytes(width_bits / 8))?;
    }

    Ok(vm)
}

/// Destination width in bits for one instruction, per the three rules of
/// `spec.md` §4.2: comparisons are always 2 bytes, `call` uses the callee's
/// return width, everything else uses the instruction's own `width` field.
fn dest_width_bits(instr: &ir::Instr, module: &ir::Module) -> Result<u32> {
    if instr.is_comparison() {
        return Ok(16);
    }
    if let ir::Instr::Call { callee, .. } = instr {
        let callee_proc = module
            .proc(*callee)
            .ok_or_else(|| Error::not_found("procedure", *callee))?;
        let ret = callee_proc
            .ret
            .as_ref()
            .ok_or_else(|| Error::invalid_argument(*callee, "called with a result but returns void"))?;
        return ret.size_bytes(module).map(|b| b * 8);
    }
    Ok(match instr {
        ir::Instr::Add { width, .. }
        | ir::Instr::Sub { width, .. }
        | ir::Instr::And { width, .. }
        | ir::Instr::Or { width, .. }
        | ir::Instr::Xor { width, .. }
        | ir::Instr::Bnot { width, .. }
        | ir::Instr::Neg { width, .. }
        | ir::Instr::Mul { width, .. }
        | ir::Instr::Shl { width, .. }
        | ir::Instr::Shra { width, .. }
        | ir::Instr::Shrl { width, .. }
        | ir::Instr::Imm { width, .. } => *width,
        ir::Instr::Trunc { dest_width, .. }
        | ir::Instr::Sgnext { dest_width, .. }
        | ir::Instr::Zrext { dest_width, .. } => *dest_width,
        ir::Instr::Lvarptr { .. } | ir::Instr::Varptr { .. } | ir::Instr::Ptridx { .. } | ir::Instr::Recmbr { .. } => 16,
        ir::Instr::Read { width, .. } => *width,
        _ => unreachable!("instruction with no destination reached dest_width_bits"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> Id {
        Id::from(s.to_string())
    }

    #[test]
    fn insert_allocates_consecutive_pairs_and_advances_cursor() {
        let mut vm = VarMap::new();
        let a = vm.insert(id("a"), 1).unwrap();
        let b = vm.insert(id("b"), 2).unwrap();
        assert_eq!(a, Entry { first_vr: 0, vr_pairs: 1 });
        assert_eq!(b, Entry { first_vr: 1, vr_pairs: 2 });
        assert_eq!(vm.next_vr(), 3);
    }

    #[test]
    fn find_missing_is_not_found() {
        let vm = VarMap::new();
        assert!(vm.find(id("x")).is_err());
    }

    #[test]
    #[should_panic]
    fn duplicate_insert_panics() {
        let mut vm = VarMap::new();
        vm.insert(id("a"), 1).unwrap();
        let _ = vm.insert(id("a"), 1);
    }

    #[test]
    fn get_new_vregno_shares_the_same_cursor() {
        let mut vm = VarMap::new();
        vm.insert(id("a"), 1).unwrap();
        let t = vm.get_new_vregno(1).unwrap();
        assert_eq!(t, 1);
        assert_eq!(vm.next_vr(), 2);
    }

    #[test]
    fn scan_assigns_args_before_body_temporaries() {
        let module = ir::Module {
            decls: vec![ir::Decl::Proc(ir::Proc {
                name: id("add16"),
                attrs: Default::default(),
                args: vec![(id("a"), ir::Type::Int(16)), (id("b"), ir::Type::Int(16))],
                locals: vec![],
                ret: Some(ir::Type::Int(16)),
                body: vec![ir::BlockEntry::unlabelled(ir::Instr::Add {
                    dest: id("r"),
                    width: 16,
                    lhs: ir::Operand::Var(id("a")),
                    rhs: ir::Operand::Var(id("b")),
                })],
            })],
        };
        let ir::Decl::Proc(proc) = &module.decls[0] else { unreachable!() };
        let vm = scan_procedure(proc, &module).unwrap();
        assert_eq!(vm.find(id("a")).unwrap(), Entry { first_vr: 0, vr_pairs: 1 });
        assert_eq!(vm.find(id("b")).unwrap(), Entry { first_vr: 1, vr_pairs: 1 });
        assert_eq!(vm.find(id("r")).unwrap(), Entry { first_vr: 2, vr_pairs: 1 });
        assert_eq!(vm.used_vr_count(), 3);
    }

    #[test]
    fn scan_reserves_hidden_retval_first_for_64_bit_return() {
        let module = ir::Module {
            decls: vec![ir::Decl::Proc(ir::Proc {
                name: id("ret64"),
                attrs: Default::default(),
                args: vec![],
                locals: vec![],
                ret: Some(ir::Type::Int(64)),
                body: vec![],
            })],
        };
        let ir::Decl::Proc(proc) = &module.decls[0] else { unreachable!() };
        let vm = scan_procedure(proc, &module).unwrap();
        assert_eq!(
            vm.find(Id::from(HIDDEN_RETVAL_ARG.to_string())).unwrap(),
            Entry { first_vr: 0, vr_pairs: 1 }
        );
    }
}

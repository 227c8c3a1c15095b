//! The input intermediate representation.
//!
//! This is the front end's output: a language-agnostic, already-typechecked
//! IR that `isel` consumes and never mutates. The front end (lexer, parser,
//! AST, semantic checker) that produces it lives outside this crate — this
//! module only needs to describe its shape faithfully enough for selection
//! to pattern-match over it.

use crate::common::{Id, Map};

/// A full IR module: an ordered list of declarations. Order is preserved
/// end-to-end (selection and allocation never reorder declarations), which
/// is what makes the pipeline's output deterministic.
#[derive(Debug)]
pub struct Module {
    pub decls: Vec<Decl>,
}

impl Module {
    /// Look up a procedure declaration by name, for callee-width lookups
    /// during `call` selection.
    pub fn proc(&self, name: Id) -> Option<&Proc> {
        self.decls.iter().find_map(|d| match d {
            Decl::Proc(p) if p.name == name => Some(p),
            _ => None,
        })
    }

    /// Look up a record declaration by name, for `recmbr` offset computation.
    pub fn record(&self, name: Id) -> Option<&RecordDecl> {
        self.decls.iter().find_map(|d| match d {
            Decl::Record(r) if r.name == name => Some(r),
            _ => None,
        })
    }
}

/// A module-level declaration.
#[derive(Debug)]
pub enum Decl {
    /// A defined procedure, with body.
    Proc(Proc),
    /// A declaration without a definition in this module (an imported
    /// procedure or variable), `@extern`.
    Extern(Id),
    /// A typed global variable with its initial data.
    Variable {
        name: Id,
        ty: Type,
        init: Vec<DataItem>,
    },
    /// A named record (struct or union) type.
    Record(RecordDecl),
    /// A type alias. Selection resolves these away before lowering a
    /// procedure; they carry no run-time representation of their own.
    Typedef { name: Id, ty: Type },
}

/// A record (struct/union) type declaration.
#[derive(Debug)]
pub struct RecordDecl {
    pub name: Id,
    pub kind: RecordKind,
    /// Members in declaration order; struct member `i`'s offset is the sum
    /// of the byte sizes of members `0..i`. Union members all start at
    /// offset 0.
    pub members: Vec<(Id, Type)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Struct,
    Union,
}

/// An initializer entry for a global `Variable`'s data block.
#[derive(Debug, Clone)]
pub enum DataItem {
    Byte(u8),
    Word(u16),
    DWord(u32),
    QWord(u64),
    /// A pointer-typed entry: the address of `symbol` plus a byte offset.
    Ptr { symbol: Id, offset: i64 },
}

/// Type expressions. All widths are multiples of 8 bits (`spec.md` §3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    /// An integer of `bits` bits (a multiple of 8: 8/16/32/64/...).
    Int(u32),
    /// A pointer (always 16 bits on the Z80).
    Ptr(Box<Type>),
    /// A fixed-size array of `len` elements of the given element type.
    Array(Box<Type>, u32),
    /// A reference to a named record declared elsewhere in the module.
    Record(Id),
}

impl Type {
    /// Byte width of a value of this type. Needs the module to resolve
    /// `Record` references and nested `Array`/`Record` sizes.
    pub fn size_bytes(&self, module: &Module) -> crate::error::Result<u32> {
        Ok(match self {
            Type::Int(bits) => bits / 8,
            Type::Ptr(_) => 2,
            Type::Array(elem, len) => elem.size_bytes(module)? * len,
            Type::Record(name) => {
                let rec = module
                    .record(*name)
                    .ok_or_else(|| crate::error::Error::not_found("record", *name))?;
                rec.size_bytes(module)?
            }
        })
    }
}

impl RecordDecl {
    /// Total byte size: the sum of member sizes for a struct, the size of
    /// the largest member for a union.
    pub fn size_bytes(&self, module: &Module) -> crate::error::Result<u32> {
        match self.kind {
            RecordKind::Struct => {
                let mut total = 0;
                for (_, ty) in &self.members {
                    total += ty.size_bytes(module)?;
                }
                Ok(total)
            }
            RecordKind::Union => {
                let mut max = 0;
                for (_, ty) in &self.members {
                    max = max.max(ty.size_bytes(module)?);
                }
                Ok(max)
            }
        }
    }

    /// Byte offset of `member` from the start of the record. `Ok(None)` is
    /// never returned; an absent member is `NotFound`.
    pub fn member_offset(&self, member: Id, module: &Module) -> crate::error::Result<u32> {
        if self.kind == RecordKind::Union {
            if self.members.iter().any(|(n, _)| *n == member) {
                return Ok(0);
            }
            return Err(crate::error::Error::not_found("record member", member));
        }
        let mut offset = 0;
        for (name, ty) in &self.members {
            if *name == member {
                return Ok(offset);
            }
            offset += ty.size_bytes(module)?;
        }
        Err(crate::error::Error::not_found("record member", member))
    }
}

/// Attributes carried on a procedure declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProcAttr {
    /// Selects the BC return-register convention instead of HL for 16-bit
    /// returns (`spec.md` §4.3, §6).
    Usr,
    /// Declared but defined elsewhere; never reaches `isel` as a body to
    /// translate, but may appear as a `call` target.
    Extern,
}

/// A procedure declaration.
#[derive(Debug)]
pub struct Proc {
    pub name: Id,
    pub attrs: crate::common::Set<ProcAttr>,
    /// Ordered argument list (name, type); order is the ABI argument order.
    pub args: Vec<(Id, Type)>,
    /// Ordered local-variable list (name, type).
    pub locals: Vec<(Id, Type)>,
    /// Return type, or `None` for a `void` procedure (selected bodies of
    /// such procedures end in `ret`, never `retv`).
    pub ret: Option<Type>,
    pub body: Block,
}

impl Proc {
    pub fn has_attr(&self, attr: ProcAttr) -> bool {
        self.attrs.contains(&attr)
    }
}

/// An ordered labelled block: each entry optionally carries a label and/or
/// an instruction, matching `spec.md` §6 exactly.
pub type Block = Vec<BlockEntry>;

#[derive(Debug)]
pub struct BlockEntry {
    pub label: Option<Id>,
    pub instr: Option<Instr>,
}

impl BlockEntry {
    pub fn labelled(label: Id, instr: Instr) -> Self {
        BlockEntry {
            label: Some(label),
            instr: Some(instr),
        }
    }

    pub fn unlabelled(instr: Instr) -> Self {
        BlockEntry {
            label: None,
            instr: Some(instr),
        }
    }

    pub fn label_only(label: Id) -> Self {
        BlockEntry {
            label: Some(label),
            instr: None,
        }
    }
}

/// An IR operand: a variable reference, an immediate constant, or (for call
/// argument lists) a list of operands.
#[derive(Debug, Clone)]
pub enum Operand {
    Var(Id),
    Imm(i64),
    List(Vec<Operand>),
}

impl Operand {
    pub fn as_var(&self) -> Option<Id> {
        match self {
            Operand::Var(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Operand]> {
        match self {
            Operand::List(items) => Some(items),
            _ => None,
        }
    }
}

/// The full set of IR instruction opcodes (`spec.md` §4.4.2).
///
/// `width` fields are always in bits and are a multiple of 8; `bytes =
/// width / 8` is computed by the consumer, not stored redundantly.
#[derive(Debug)]
pub enum Instr {
    Add { dest: Id, width: u32, lhs: Operand, rhs: Operand },
    Sub { dest: Id, width: u32, lhs: Operand, rhs: Operand },
    And { dest: Id, width: u32, lhs: Operand, rhs: Operand },
    Or { dest: Id, width: u32, lhs: Operand, rhs: Operand },
    Xor { dest: Id, width: u32, lhs: Operand, rhs: Operand },
    Bnot { dest: Id, width: u32, src: Operand },
    Neg { dest: Id, width: u32, src: Operand },
    Mul { dest: Id, width: u32, lhs: Operand, rhs: Operand },
    Shl { dest: Id, width: u32, lhs: Operand, rhs: Operand },
    Shra { dest: Id, width: u32, lhs: Operand, rhs: Operand },
    Shrl { dest: Id, width: u32, lhs: Operand, rhs: Operand },

    /// Truth-valued comparisons. `width` is the *operand* width; the result
    /// is always 2 bytes (`spec.md` §4.2(a)).
    Eq { dest: Id, width: u32, lhs: Operand, rhs: Operand },
    Neq { dest: Id, width: u32, lhs: Operand, rhs: Operand },
    Lt { dest: Id, width: u32, lhs: Operand, rhs: Operand },
    Lteq { dest: Id, width: u32, lhs: Operand, rhs: Operand },
    Gt { dest: Id, width: u32, lhs: Operand, rhs: Operand },
    Gteq { dest: Id, width: u32, lhs: Operand, rhs: Operand },
    Ltu { dest: Id, width: u32, lhs: Operand, rhs: Operand },
    Lteu { dest: Id, width: u32, lhs: Operand, rhs: Operand },
    Gtu { dest: Id, width: u32, lhs: Operand, rhs: Operand },
    Gteu { dest: Id, width: u32, lhs: Operand, rhs: Operand },

    Trunc { dest: Id, dest_width: u32, src: Operand, src_width: u32 },
    Sgnext { dest: Id, dest_width: u32, src: Operand, src_width: u32 },
    Zrext { dest: Id, dest_width: u32, src: Operand, src_width: u32 },

    Imm { dest: Id, width: u32, value: i64 },

    Jmp { target: Id },
    Jnz { width: u32, cond: Operand, target: Id },
    Jz { width: u32, cond: Operand, target: Id },

    /// `void` return: no value.
    Ret,
    /// Value-carrying return.
    Retv { width: u32, value: Operand },

    /// A call. `dest` is `None` when the result is discarded. `args` is
    /// conceptually a `List` operand; selection asserts it is one.
    Call { dest: Option<Id>, width: u32, callee: Id, args: Operand },

    Lvarptr { dest: Id, var: Id },
    Varptr { dest: Id, global: Id },

    Read { dest: Id, width: u32, addr: Operand },
    Write { width: u32, addr: Operand, src: Operand },

    Recmbr { dest: Id, base: Operand, record: Id, member: Id },
    Ptridx { dest: Id, base: Operand, index: Operand, elem_size: u32 },
    Reccopy { dst: Operand, src: Operand, size: u32 },

    Nop,
}

impl Instr {
    /// The variable this instruction defines, if any. Used by the varmap
    /// pre-selection scan (`spec.md` §4.2).
    pub fn dest(&self) -> Option<Id> {
        use Instr::*;
        match self {
            Add { dest, .. }
            | Sub { dest, .. }
            | And { dest, .. }
            | Or { dest, .. }
            | Xor { dest, .. }
            | Bnot { dest, .. }
            | Neg { dest, .. }
            | Mul { dest, .. }
            | Shl { dest, .. }
            | Shra { dest, .. }
            | Shrl { dest, .. }
            | Eq { dest, .. }
            | Neq { dest, .. }
            | Lt { dest, .. }
            | Lteq { dest, .. }
            | Gt { dest, .. }
            | Gteq { dest, .. }
            | Ltu { dest, .. }
            | Lteu { dest, .. }
            | Gtu { dest, .. }
            | Gteu { dest, .. }
            | Imm { dest, .. }
            | Lvarptr { dest, .. }
            | Varptr { dest, .. }
            | Read { dest, .. }
            | Recmbr { dest, .. }
            | Ptridx { dest, .. } => Some(*dest),
            Trunc { dest, .. } | Sgnext { dest, .. } | Zrext { dest, .. } => Some(*dest),
            Call { dest, .. } => *dest,
            Jmp { .. }
            | Jnz { .. }
            | Jz { .. }
            | Ret
            | Retv { .. }
            | Write { .. }
            | Reccopy { .. }
            | Nop => None,
        }
    }

    /// `true` for the truth-valued comparison opcodes, which always define a
    /// 2-byte destination regardless of operand width (`spec.md` §4.2(a)).
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Instr::Eq { .. }
                | Instr::Neq { .. }
                | Instr::Lt { .. }
                | Instr::Ltu { .. }
                | Instr::Lteq { .. }
                | Instr::Lteu { .. }
                | Instr::Gt { .. }
                | Instr::Gtu { .. }
                | Instr::Gteq { .. }
                | Instr::Gteu { .. }
        )
    }
}

/// A map of record declarations by name, handed to helpers that need to
/// resolve `recmbr` offsets without threading the whole module through.
pub type RecordTable = Map<Id, RecordDecl>;

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> Id {
        Id::from(s.to_string())
    }

    #[test]
    fn struct_member_offsets_are_cumulative() {
        let module = Module {
            decls: vec![Decl::Record(RecordDecl {
                name: id("S"),
                kind: RecordKind::Struct,
                members: vec![(id("a"), Type::Int(32)), (id("b"), Type::Int(16))],
            })],
        };
        let rec = module.record(id("S")).unwrap();
        assert_eq!(rec.member_offset(id("a"), &module).unwrap(), 0);
        assert_eq!(rec.member_offset(id("b"), &module).unwrap(), 4);
        assert_eq!(rec.size_bytes(&module).unwrap(), 6);
    }

    #[test]
    fn union_members_all_start_at_zero() {
        let module = Module {
            decls: vec![Decl::Record(RecordDecl {
                name: id("U"),
                kind: RecordKind::Union,
                members: vec![(id("a"), Type::Int(8)), (id("b"), Type::Int(32))],
            })],
        };
        let rec = module.record(id("U")).unwrap();
        assert_eq!(rec.member_offset(id("a"), &module).unwrap(), 0);
        assert_eq!(rec.member_offset(id("b"), &module).unwrap(), 0);
        assert_eq!(rec.size_bytes(&module).unwrap(), 4);
    }
}

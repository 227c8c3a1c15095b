//! The argument-location allocator (`spec.md` §4.3).
//!
//! Caller and callee run the identical algorithm over the identical
//! argument-width list, so their placements agree without any side
//! channel — this is what makes the calling convention symmetric
//! (`spec.md` §8, property 8).

use crate::common::Id;
use crate::error::{Error, Result};
use crate::zic::Reg16;

/// The three register pairs the convention hands out, in allocation order.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ArgPair {
    Hl,
    De,
    Bc,
}

impl ArgPair {
    pub fn to_reg16(self) -> Reg16 {
        match self {
            ArgPair::Hl => Reg16::HL,
            ArgPair::De => Reg16::DE,
            ArgPair::Bc => Reg16::BC,
        }
    }

    fn next(self) -> Option<ArgPair> {
        match self {
            ArgPair::Hl => Some(ArgPair::De),
            ArgPair::De => Some(ArgPair::Bc),
            ArgPair::Bc => None,
        }
    }
}

/// One register piece of an argument's placement.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RegPiece {
    /// The whole 16-bit pair (a 16-bit argument).
    Whole(ArgPair),
    /// The low byte of the pair (one of two 8-bit arguments sharing it).
    Lo(ArgPair),
    /// The high byte of the pair.
    Hi(ArgPair),
}

/// Where one argument lives: zero or more register pieces, plus a stack
/// byte count (`spec.md` §3, "Argloc entry"). An argument is placed
/// entirely in registers or entirely on the stack — the convention never
/// splits one argument's bytes across both (only 8-bit/16-bit arguments are
/// register-eligible at all; wider ones always go to the stack).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ArgPlacement {
    pub pieces: Vec<RegPiece>,
    pub stack_bytes: u32,
}

/// The result of allocating one call's (or one procedure entry's) full
/// argument list.
#[derive(Clone, Debug)]
pub struct Allocation {
    pub args: Vec<ArgPlacement>,
    pub total_stack_bytes: u32,
}

/// Byte offset, from `IX+4` (just past the saved frame pointer and return
/// address), of each stack-resident argument's first byte. Register-placed
/// arguments get `None`.
impl Allocation {
    pub fn stack_offsets(&self) -> Vec<Option<u32>> {
        let mut offset = 0u32;
        self.args
            .iter()
            .map(|a| {
                if a.stack_bytes == 0 {
                    None
                } else {
                    let this = offset;
                    offset += a.stack_bytes;
                    Some(this)
                }
            })
            .collect()
    }
}

/// Allocate argument locations for `byte_widths` (each entry the argument's
/// size in bytes, in declaration/call order). `proc` names the procedure
/// being translated, for diagnostics.
///
/// Register pieces are handed out pair-by-pair, in the fixed order HL, DE,
/// BC (`spec.md` §4.3): a 16-bit argument consumes a whole free pair; two
/// consecutive 8-bit arguments share one pair's low and high byte. A 16-bit
/// argument that arrives when the current pair has only one free byte does
/// not split across pairs — it abandons that pair's spare half (which then
/// goes unused) and starts the next pair fresh. Once all three pairs are
/// spoken for, every remaining argument (including 8/16-bit ones) is placed
/// on the stack, each rounded up to a whole 16-bit slot.
pub fn allocate(byte_widths: &[u32], proc: Id) -> Result<Allocation> {
    let mut pair = Some(ArgPair::Hl);
    let mut half_used = false;
    let mut args = Vec::with_capacity(byte_widths.len());
    let mut total_stack_bytes = 0u32;

    for &bytes in byte_widths {
        let placement = match (bytes, pair) {
            (2, Some(p)) if !half_used => {
                pair = p.next();
                ArgPlacement {
                    pieces: vec![RegPiece::Whole(p)],
                    stack_bytes: 0,
                }
            }
            (2, Some(p)) => {
                // Current pair has a dangling spare half; it cannot host a
                // 16-bit argument, so move on to the next pair.
                match p.next() {
                    Some(next_pair) => {
                        pair = next_pair.next();
                        half_used = false;
                        ArgPlacement {
                            pieces: vec![RegPiece::Whole(next_pair)],
                            stack_bytes: 0,
                        }
                    }
                    None => {
                        pair = None;
                        stack_placement(2, &mut total_stack_bytes)
                    }
                }
            }
            (1, Some(p)) if !half_used => {
                half_used = true;
                ArgPlacement {
                    pieces: vec![RegPiece::Lo(p)],
                    stack_bytes: 0,
                }
            }
            (1, Some(p)) => {
                half_used = false;
                pair = p.next();
                ArgPlacement {
                    pieces: vec![RegPiece::Hi(p)],
                    stack_bytes: 0,
                }
            }
            (_, _) => stack_placement(bytes, &mut total_stack_bytes),
        };
        args.push(placement);
    }

    // Second pass: diagnose argument lists the convention cannot place.
    // Stack arguments are read/written at IX+4+offset; the frame
    // displacement window is a signed 8-bit quantity.
    if 4 + total_stack_bytes > 127 {
        return Err(Error::unsupported(
            proc,
            format!("argument list needs {total_stack_bytes} stack bytes, exceeding the IX+d window"),
        ));
    }

    Ok(Allocation {
        args,
        total_stack_bytes,
    })
}

fn stack_placement(bytes: u32, total: &mut u32) -> ArgPlacement {
    let rounded = bytes + (bytes % 2);
    *total += rounded;
    ArgPlacement {
        pieces: vec![],
        stack_bytes: rounded,
    }
}

/// Where a procedure's return value lives, by its return width
/// (`spec.md` §4.3).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetLoc {
    /// 8-bit: in A.
    A,
    /// 16-bit: in HL, or BC for an `@usr` procedure.
    Pair(Reg16),
    /// 32-bit: low word in HL, high word in DE.
    HlDe,
    /// 64-bit: via the hidden `%.retval` pointer argument.
    HiddenPointer,
}

pub fn return_location(width_bits: u32, usr: bool) -> RetLoc {
    match width_bits {
        8 => RetLoc::A,
        16 if usr => RetLoc::Pair(Reg16::BC),
        16 => RetLoc::Pair(Reg16::HL),
        32 => RetLoc::HlDe,
        64 => RetLoc::HiddenPointer,
        _ => unreachable!("return width must be 8/16/32/64 bits"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> Id {
        Id::from(s.to_string())
    }

    #[test]
    fn two_16_bit_args_take_hl_then_de() {
        let alloc = allocate(&[2, 2], id("f")).unwrap();
        assert_eq!(alloc.args[0].pieces, vec![RegPiece::Whole(ArgPair::Hl)]);
        assert_eq!(alloc.args[1].pieces, vec![RegPiece::Whole(ArgPair::De)]);
        assert_eq!(alloc.total_stack_bytes, 0);
    }

    #[test]
    fn two_8_bit_args_share_one_pair() {
        let alloc = allocate(&[1, 1], id("f")).unwrap();
        assert_eq!(alloc.args[0].pieces, vec![RegPiece::Lo(ArgPair::Hl)]);
        assert_eq!(alloc.args[1].pieces, vec![RegPiece::Hi(ArgPair::Hl)]);
    }

    #[test]
    fn fourth_16_bit_arg_spills_to_stack() {
        let alloc = allocate(&[2, 2, 2, 2], id("f")).unwrap();
        assert_eq!(alloc.args[3].pieces, vec![]);
        assert_eq!(alloc.args[3].stack_bytes, 2);
        assert_eq!(alloc.total_stack_bytes, 2);
    }

    #[test]
    fn odd_trailing_stack_byte_rounds_up() {
        let alloc = allocate(&[2, 2, 2, 1], id("f")).unwrap();
        assert_eq!(alloc.args[3].stack_bytes, 2);
    }

    #[test]
    fn dangling_half_pair_is_abandoned_by_16_bit_arg() {
        // One 8-bit arg takes HL.lo, leaving HL.hi spare; a following
        // 16-bit arg cannot use just HL.hi, so it takes DE whole.
        let alloc = allocate(&[1, 2], id("f")).unwrap();
        assert_eq!(alloc.args[0].pieces, vec![RegPiece::Lo(ArgPair::Hl)]);
        assert_eq!(alloc.args[1].pieces, vec![RegPiece::Whole(ArgPair::De)]);
    }

    #[test]
    fn wide_argument_always_goes_to_stack() {
        let alloc = allocate(&[4], id("f")).unwrap();
        assert_eq!(alloc.args[0].pieces, vec![]);
        assert_eq!(alloc.args[0].stack_bytes, 4);
    }

    #[test]
    fn return_locations_match_convention() {
        assert_eq!(return_location(8, false), RetLoc::A);
        assert_eq!(return_location(16, false), RetLoc::Pair(Reg16::HL));
        assert_eq!(return_location(16, true), RetLoc::Pair(Reg16::BC));
        assert_eq!(return_location(32, false), RetLoc::HlDe);
        assert_eq!(return_location(64, false), RetLoc::HiddenPointer);
    }

    #[test]
    fn stack_offsets_accumulate_in_argument_order() {
        let alloc = allocate(&[2, 2, 2, 4, 1], id("f")).unwrap();
        let offsets = alloc.stack_offsets();
        assert_eq!(offsets[3], Some(0));
        assert_eq!(offsets[4], Some(4));
    }
}

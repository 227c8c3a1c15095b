//! Frame layout: the one-time arithmetic that turns a procedure's
//! `used_vr_count` and local-variable table into concrete `IX+d`
//! displacements (`spec.md` §4.5).
//!
//! Every VR pair occupies 2 bytes below `IX`, numbered outward from `IX-2`;
//! local variables continue past the last VR byte, in declaration order.
//! `frame_size` is computed exactly as `2*used_vrs + local_var_size`
//! (`spec.md` §4.5, §8 property 3) — because the VR region starts at `-2`
//! rather than `-1`, the deepest byte actually addressed (a VR's high byte,
//! or the last local) sits one byte past `-frame_size` when `used_vrs > 0`.
//! We follow the stated formula literally rather than pad it out.

use crate::common::Id;
use crate::error::{Error, Result};
use crate::zic::{FrameSlot, LocalVar, VrPart, VrSel};

/// A procedure's resolved frame: VR and local-variable displacements, and
/// the total size to carve in the prologue.
pub struct Frame {
    used_vr_count: u32,
    local_base: Vec<i64>,
    frame_size: u32,
    proc: Id,
}

impl Frame {
    /// Lay out the frame for a procedure with `used_vr_count` live VRs and
    /// `locals` in declaration order (the same order `isel::SelCtx::local_index`
    /// assigned them).
    pub fn new(proc: Id, used_vr_count: u32, locals: &[LocalVar]) -> Frame {
        let vr_region = 2 * used_vr_count;

        // Locals start right after the last VR byte: `-(vr_region+1)` is a
        // VR's high byte when `used_vr_count > 0`, so locals begin one byte
        // further out; with no VRs used they start at `-1`.
        let mut local_base = Vec::with_capacity(locals.len());
        let mut cursor = if used_vr_count > 0 { vr_region as i64 + 2 } else { 1 };
        for local in locals {
            local_base.push(-cursor);
            cursor += local.size_bytes as i64;
        }
        let local_var_size: u32 = locals.iter().map(|l| l.size_bytes).sum();

        Frame {
            used_vr_count,
            local_base,
            frame_size: vr_region + local_var_size,
            proc,
        }
    }

    /// Total bytes the prologue carves below `IX` (`ld IX,-frame_size`).
    pub fn frame_size(&self) -> u32 {
        self.frame_size
    }

    fn checked_displacement(&self, d: i64) -> Result<i8> {
        i8::try_from(d).map_err(|_| {
            Error::unsupported(self.proc, format!("frame displacement {d} outside the IX+d window"))
        })
    }

    /// The `IX+d` displacement of one VR byte.
    pub fn vr_displacement(&self, sel: VrSel) -> Result<i8> {
        debug_assert!(sel.vr < self.used_vr_count);
        let vr = sel.vr as i64;
        let d = match sel.part {
            VrPart::Lo | VrPart::Byte => -2 * (1 + vr),
            VrPart::Hi => -2 * (1 + vr) - 1,
        };
        self.checked_displacement(d)
    }

    /// The `IX+d` displacement of local variable `slot`'s first byte.
    pub fn local_displacement(&self, slot: FrameSlot) -> Result<i8> {
        let base = *self
            .local_base
            .get(slot.local_index as usize)
            .ok_or_else(|| Error::invalid_argument(self.proc, format!("local index {} out of range", slot.local_index)))?;
        self.checked_displacement(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> Id {
        Id::from(s.to_string())
    }

    #[test]
    fn first_two_vrs_match_the_worked_example() {
        let frame = Frame::new(id("f"), 1, &[]);
        assert_eq!(frame.vr_displacement(VrSel::lo(0)).unwrap(), -2);
        assert_eq!(frame.vr_displacement(VrSel::hi(0)).unwrap(), -3);
    }

    #[test]
    fn vr5_matches_the_literal_scenario() {
        let frame = Frame::new(id("f"), 6, &[]);
        assert_eq!(frame.vr_displacement(VrSel::lo(5)).unwrap(), -12);
        assert_eq!(frame.vr_displacement(VrSel::hi(5)).unwrap(), -13);
    }

    #[test]
    fn locals_continue_past_the_vr_region() {
        let locals = vec![
            LocalVar { name: id("a"), size_bytes: 2 },
            LocalVar { name: id("b"), size_bytes: 1 },
        ];
        let frame = Frame::new(id("f"), 1, &locals);
        assert_eq!(frame.local_displacement(FrameSlot { local_index: 0 }).unwrap(), -4);
        assert_eq!(frame.local_displacement(FrameSlot { local_index: 1 }).unwrap(), -6);
        assert_eq!(frame.frame_size(), 2 + 3);
    }

    #[test]
    fn frame_size_matches_the_literal_three_vr_scenario() {
        let frame = Frame::new(id("f"), 3, &[]);
        assert_eq!(frame.frame_size(), 6);
    }

    #[test]
    fn no_vrs_used_locals_start_at_minus_one() {
        let locals = vec![LocalVar { name: id("a"), size_bytes: 4 }];
        let frame = Frame::new(id("f"), 0, &locals);
        assert_eq!(frame.local_displacement(FrameSlot { local_index: 0 }).unwrap(), -1);
        assert_eq!(frame.frame_size(), 4);
    }
}

//! Frame layout computation for x64 functions.
//!
//! The layout is pre-computed before code generation:
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │  Caller stack args / shadow space   │  [rbp+16] (argument homes)
//! ├─────────────────────────────────────┤
//! │  Return address                     │  [rbp+8]
//! ├─────────────────────────────────────┤
//! │  Saved RBP                          │  ← RBP
//! ├─────────────────────────────────────┤
//! │  Pushed callee-saved GPRs           │
//! ├─────────────────────────────────────┤
//! │  Saved callee-saved XMMs            │
//! ├─────────────────────────────────────┤
//! │  Value slots (stack mirror/spills)  │
//! ├─────────────────────────────────────┤
//! │  Outgoing args + shadow space       │  ← RSP at call sites
//! └─────────────────────────────────────┘
//! ```

use x64_encoder::{Gpr, Xmm};

use crate::abi::SHADOW_SPACE;

/// Align a size to 16 bytes.
fn align_to_16(size: u32) -> u32 {
    (size + 15) & !15
}

/// Frame layout for one function.
#[derive(Debug, Clone)]
pub struct FrameLayout {
    /// Callee-saved GPRs pushed in the prologue, in push order.
    pub saved_gprs: Vec<Gpr>,
    /// Callee-saved XMMs saved into the frame, in save order.
    pub saved_xmms: Vec<Xmm>,
    /// Number of 8-byte value slots (stack mirror or spill slots).
    pub slot_count: usize,
    /// Bytes subtracted from rsp after the pushes.
    pub frame_size: u32,
    /// Whether the function makes calls (reserves outgoing space).
    pub has_calls: bool,
}

impl FrameLayout {
    /// Compute the layout.
    ///
    /// `max_outgoing_args` is the largest argument count among the
    /// function's call sites; it sizes the outgoing-argument area
    /// together with the shadow space.
    pub fn compute(
        saved_gprs: Vec<Gpr>,
        saved_xmms: Vec<Xmm>,
        slot_count: usize,
        has_calls: bool,
        max_outgoing_args: usize,
    ) -> Self {
        let outgoing = if has_calls {
            SHADOW_SPACE + 8 * max_outgoing_args.saturating_sub(4) as u32
        } else {
            0
        };

        let raw = 16 * saved_xmms.len() as u32 + 8 * slot_count as u32 + outgoing;
        let mut frame_size = align_to_16(raw);
        // Call sites need rsp on a 16-byte boundary: entry leaves rsp
        // 8 off, push rbp restores it, and each further push flips it.
        if saved_gprs.len() % 2 == 1 {
            frame_size += 8;
        }

        FrameLayout {
            saved_gprs,
            saved_xmms,
            slot_count,
            frame_size,
            has_calls,
        }
    }

    /// Frame offset (from rbp) of the save area of the j-th saved XMM.
    pub fn xmm_save_offset(&self, index: usize) -> i32 {
        -((8 * self.saved_gprs.len() as i32) + 16 * (index as i32 + 1))
    }

    /// Frame offset (from rbp) of a value slot.
    pub fn slot_offset(&self, slot: usize) -> i32 {
        -((8 * self.saved_gprs.len() as i32)
            + (16 * self.saved_xmms.len() as i32)
            + 8 * (slot as i32 + 1))
    }

    /// Frame offset (from rbp) the epilogue resets rsp to before
    /// popping the saved GPRs.
    pub fn restore_point(&self) -> i32 {
        -(8 * self.saved_gprs.len() as i32)
    }
}

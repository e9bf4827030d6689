//! Win64 calling-convention tables.
//!
//! Argument slots are positional: slot `i` of a call maps to the i-th
//! integer register or the i-th float register depending on the
//! parameter type; slots four and up live on the stack above a 32-byte
//! shadow area. The allocatable pools are the callee-saved sets, so
//! allocated values survive calls without caller-side saving.

use x64_encoder::{Gpr, Xmm};

/// Shadow space the caller reserves below its stack arguments.
pub const SHADOW_SPACE: u32 = 32;

/// Allocatable integer registers (all callee-saved under Win64).
///
/// Seven registers; index into this table with the allocator's
/// hardware-register number.
pub const INT_REGISTER_POOL: [Gpr; 7] = [
    Gpr::RBX,
    Gpr::RSI,
    Gpr::RDI,
    Gpr::R12,
    Gpr::R13,
    Gpr::R14,
    Gpr::R15,
];

/// Allocatable float registers (all callee-saved under Win64).
pub const FLOAT_REGISTER_POOL: [Xmm; 7] = [
    Xmm::XMM6,
    Xmm::XMM7,
    Xmm::XMM8,
    Xmm::XMM9,
    Xmm::XMM10,
    Xmm::XMM11,
    Xmm::XMM12,
];

/// Integer argument register for a parameter slot, if any.
pub fn int_arg_register(index: usize) -> Option<Gpr> {
    match index {
        0 => Some(Gpr::RCX),
        1 => Some(Gpr::RDX),
        2 => Some(Gpr::R8),
        3 => Some(Gpr::R9),
        _ => None,
    }
}

/// Float argument register for a parameter slot, if any.
pub fn float_arg_register(index: usize) -> Option<Xmm> {
    match index {
        0 => Some(Xmm::XMM0),
        1 => Some(Xmm::XMM1),
        2 => Some(Xmm::XMM2),
        3 => Some(Xmm::XMM3),
        _ => None,
    }
}

/// Frame offset (from rbp) of the home slot of argument `index`.
///
/// The first four homes are the Win64 shadow space at `[rbp+16]`
/// through `[rbp+40]`; later arguments are the caller's stack
/// arguments, which continue at the same stride.
pub fn argument_home_offset(index: usize) -> i32 {
    16 + 8 * index as i32
}

/// Offset (from rsp at the call site) of outgoing stack argument
/// `index` (>= 4).
pub fn outgoing_argument_offset(index: usize) -> i32 {
    SHADOW_SPACE as i32 + 8 * (index as i32 - 4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argument_registers() {
        assert_eq!(int_arg_register(0), Some(Gpr::RCX));
        assert_eq!(int_arg_register(3), Some(Gpr::R9));
        assert_eq!(int_arg_register(4), None);
        assert_eq!(float_arg_register(0), Some(Xmm::XMM0));
        assert_eq!(float_arg_register(4), None);
    }

    #[test]
    fn test_argument_homes() {
        assert_eq!(argument_home_offset(0), 16);
        assert_eq!(argument_home_offset(3), 40);
        // The fifth argument continues past the shadow space.
        assert_eq!(argument_home_offset(4), 48);
    }

    #[test]
    fn test_outgoing_offsets() {
        assert_eq!(outgoing_argument_offset(4), 32);
        assert_eq!(outgoing_argument_offset(6), 48);
    }

    #[test]
    fn test_pools_have_default_width() {
        assert_eq!(INT_REGISTER_POOL.len(), 7);
        assert_eq!(FLOAT_REGISTER_POOL.len(), 7);
    }
}

//! x64 instruction encoder.
//!
//! This crate provides functions to encode the x64 instructions needed
//! by the code generator into their binary representation, plus a
//! disassembler for exactly that subset. Encoders append to a byte
//! buffer; instructions with patchable immediates return the buffer
//! offset of the immediate so the caller can record a patch site.

#![no_std]

extern crate alloc;

mod disasm;
mod encode;
mod regs;

pub use disasm::{disassemble_code, disassemble_function};
pub use encode::*;
pub use regs::{Gpr, Xmm};

//! Test utilities for the bytecode JIT.
//!
//! Provides the canonical test programs and a harness that runs a
//! program through both the JIT and the reference interpreter and
//! asserts they agree.

pub mod programs;

pub use jit_fn_test::JitFnTest;

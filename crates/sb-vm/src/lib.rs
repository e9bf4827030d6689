//! Host-facing virtual machine.
//!
//! A VM instance owns one binder, one JIT compiler (with its code-page
//! memory), and the loaded functions. Lifecycle: create, load
//! assemblies, `compile` once, retrieve and call the entry point, drop
//! (which releases all code pages).

mod error;
mod vm;

pub use error::VmError;
pub use sb_target_x64::JitSettings;
pub use vm::{EntryPoint, VirtualMachine};

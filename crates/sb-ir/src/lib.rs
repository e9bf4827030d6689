//! Stack-bytecode model.
//!
//! This crate defines the core types of the bytecode compiler:
//! - Types (Int, Float, Void)
//! - Signatures (function signatures and their textual keys)
//! - Instructions (the stack-based opcodes)
//! - Functions (bytecode functions and definitions)
//! - Assemblies (ordered lists of functions loaded together)
//! - The binder (signature registry)
//! - The verifier (type-stack abstract interpretation)
//! - Basic-block and control-flow-graph analysis

#![no_std]

extern crate alloc;

pub mod analysis;
mod assembly;
mod binder;
mod function;
mod inst;
mod signature;
mod types;
mod verifier;

pub use assembly::Assembly;
pub use binder::{Binder, BinderError};
pub use function::{Function, FunctionDefinition, FunctionTarget};
pub use inst::{Comparison, Instruction};
pub use signature::FunctionSignature;
pub use types::{PrimitiveType, VMType};
pub use verifier::{verify, VerificationError};

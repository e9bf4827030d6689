//! Builders for stack-bytecode programs.

#![no_std]

extern crate alloc;

mod function_builder;

pub use function_builder::{AssemblyBuilder, FunctionBuilder};

//! Reference interpreter for the stack bytecode.
//!
//! Evaluates verified assemblies with the same semantics the generated
//! x64 code has (32-bit wrapping integer arithmetic, `lhs OP rhs`
//! comparisons with the right-hand side on top of the stack). Used as
//! the oracle for round-trip emit/execute tests.

#![no_std]

extern crate alloc;

mod error;
mod interpreter;
mod logging;

pub use error::InterpreterError;
pub use interpreter::{Interpreter, Value};
pub use logging::LogLevel;

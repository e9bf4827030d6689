//! Error types for the interpreter.

use alloc::string::String;

/// Errors that can occur during interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterpreterError {
    /// The requested entry function does not exist in the assembly.
    UndefinedFunction { signature: String },
    /// A call site resolved to a function outside the assembly; the
    /// interpreter cannot dispatch host trampolines.
    ExternalCall { signature: String },
    /// Integer division by zero (native code would fault here).
    DivideByZero { function: String, index: usize },
    /// Instruction budget exhausted.
    InstructionLimitExceeded { limit: u64, executed: u64 },
}

impl core::fmt::Display for InterpreterError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            InterpreterError::UndefinedFunction { signature } => {
                write!(f, "The function '{}' is not defined.", signature)
            }
            InterpreterError::ExternalCall { signature } => {
                write!(
                    f,
                    "Cannot interpret the external function '{}'.",
                    signature
                )
            }
            InterpreterError::DivideByZero { function, index } => {
                write!(
                    f,
                    "Division by zero in function '{}' at instruction {}.",
                    function, index
                )
            }
            InterpreterError::InstructionLimitExceeded { limit, executed } => {
                write!(
                    f,
                    "Instruction limit exceeded: executed {} instructions (limit: {})",
                    executed, limit
                )
            }
        }
    }
}

//! Execution tracing for the interpreter.

use alloc::{format, string::String, vec::Vec};

use sb_ir::Instruction;

/// Tracing verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// No tracing.
    None,
    /// Trace calls and returns.
    Calls,
    /// Trace every executed instruction.
    Instructions,
}

/// Collected trace entries.
#[derive(Debug, Default)]
pub(crate) struct ExecutionTrace {
    entries: Vec<String>,
}

impl ExecutionTrace {
    pub(crate) fn call(&mut self, depth: usize, signature: &str) {
        self.entries
            .push(format!("{:indent$}call {}", "", signature, indent = depth * 2));
    }

    pub(crate) fn ret(&mut self, depth: usize, signature: &str) {
        self.entries
            .push(format!("{:indent$}ret  {}", "", signature, indent = depth * 2));
    }

    pub(crate) fn instruction(&mut self, depth: usize, index: usize, instruction: &Instruction) {
        self.entries.push(format!(
            "{:indent$}{:4}: {:?}",
            "",
            index,
            instruction,
            indent = depth * 2
        ));
    }

    pub(crate) fn entries(&self) -> &[String] {
        &self.entries
    }
}

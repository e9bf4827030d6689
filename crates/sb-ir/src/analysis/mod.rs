//! Basic-block and control-flow analysis over bytecode functions.

mod blocks;
mod cfg;

pub use blocks::{build_basic_blocks, BasicBlock};
pub use cfg::{ControlFlowEdge, ControlFlowGraph};

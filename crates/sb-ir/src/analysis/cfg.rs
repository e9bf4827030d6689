//! Control-flow graph construction.

use alloc::{
    collections::{BTreeMap, BTreeSet},
    vec,
    vec::Vec,
};

use crate::inst::Instruction;

use super::blocks::BasicBlock;

/// A directed edge between two blocks, identified by block index.
///
/// Edge equality is on `(from, to)`; the graph never holds parallel
/// edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ControlFlowEdge {
    pub from: usize,
    pub to: usize,
}

/// Control-flow graph over the basic blocks of one function.
#[derive(Debug, Clone)]
pub struct ControlFlowGraph {
    /// Map from block index to its successor block indices.
    successors: Vec<BTreeSet<usize>>,
    /// Map from block index to its predecessor block indices.
    predecessors: Vec<BTreeSet<usize>>,
    /// Map from `start_offset` to block index.
    block_by_offset: BTreeMap<usize, usize>,
}

impl ControlFlowGraph {
    /// Build the CFG for a partitioned function.
    ///
    /// For each block ending in an unconditional branch an edge is added
    /// to the target block; a conditional branch adds the target edge
    /// plus the fall-through edge; `Ret` adds nothing; any other final
    /// instruction falls through to the next block.
    pub fn from_blocks(blocks: &[BasicBlock]) -> Self {
        let block_by_offset: BTreeMap<usize, usize> = blocks
            .iter()
            .enumerate()
            .map(|(index, block)| (block.start_offset, index))
            .collect();

        let mut successors = vec![BTreeSet::new(); blocks.len()];
        let mut predecessors = vec![BTreeSet::new(); blocks.len()];

        let mut add_edge = |from: usize, to: usize| {
            successors[from].insert(to);
            predecessors[to].insert(from);
        };

        for (index, block) in blocks.iter().enumerate() {
            let last = block.last_instruction();
            match last {
                Instruction::Ret => {}
                Instruction::Branch(target) => {
                    if let Some(&to) = block_by_offset.get(&(*target as usize)) {
                        add_edge(index, to);
                    }
                }
                other => {
                    if let Some(target) = other.branch_target() {
                        if let Some(&to) = block_by_offset.get(&(target as usize)) {
                            add_edge(index, to);
                        }
                    }
                    // Fall through to the block starting right after this one.
                    if let Some(&to) = block_by_offset.get(&block.end_offset()) {
                        add_edge(index, to);
                    }
                }
            }
        }

        Self {
            successors,
            predecessors,
            block_by_offset,
        }
    }

    /// Get the successors of a block.
    pub fn successors(&self, block: usize) -> &BTreeSet<usize> {
        &self.successors[block]
    }

    /// Get the predecessors of a block.
    pub fn predecessors(&self, block: usize) -> &BTreeSet<usize> {
        &self.predecessors[block]
    }

    /// Look up the block whose `start_offset` is the given instruction
    /// index.
    pub fn block_at_offset(&self, offset: usize) -> Option<usize> {
        self.block_by_offset.get(&offset).copied()
    }

    /// Get the number of blocks.
    pub fn num_blocks(&self) -> usize {
        self.successors.len()
    }

    /// Enumerate every edge in `(from, to)` order.
    pub fn edges(&self) -> Vec<ControlFlowEdge> {
        let mut edges = Vec::new();
        for (from, tos) in self.successors.iter().enumerate() {
            for &to in tos {
                edges.push(ControlFlowEdge { from, to });
            }
        }
        edges
    }

    /// Check if a block is reachable from the entry block.
    pub fn is_reachable(&self, block: usize) -> bool {
        if block >= self.successors.len() {
            return false;
        }
        if block == 0 {
            return true;
        }

        let mut visited = BTreeSet::new();
        let mut worklist = vec![0];
        visited.insert(0);

        while let Some(current) = worklist.pop() {
            if current == block {
                return true;
            }
            for &succ in self.successors(current) {
                if visited.insert(succ) {
                    worklist.push(succ);
                }
            }
        }

        false
    }
}

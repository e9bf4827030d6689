//! Basic-block partitioning.

use alloc::{collections::BTreeSet, vec::Vec};

use crate::{function::Function, inst::Instruction};

/// A maximal straight-line run of instructions.
///
/// A block contains a control transfer (branch or `Ret`) only as its
/// last instruction. `start_offset` is the index of the first contained
/// instruction within the source function.
#[derive(Debug, Clone, PartialEq)]
pub struct BasicBlock {
    /// Index of the first contained instruction in the source function.
    pub start_offset: usize,
    /// The contained instructions, in function order.
    pub instructions: Vec<Instruction>,
}

impl BasicBlock {
    /// The last instruction of the block.
    ///
    /// Blocks are never empty: consecutive leaders always delimit a
    /// non-empty half-open range.
    pub fn last_instruction(&self) -> &Instruction {
        self.instructions
            .last()
            .expect("basic blocks are never empty")
    }

    /// Index one past the last contained instruction.
    pub fn end_offset(&self) -> usize {
        self.start_offset + self.instructions.len()
    }
}

/// Partition a function's instructions into basic blocks.
///
/// Leaders are: instruction 0; every branch target; every instruction
/// immediately following a branch or `Ret`. Consecutive leaders delimit
/// half-open blocks; block order follows leader order.
pub fn build_basic_blocks(function: &Function) -> Vec<BasicBlock> {
    let instructions = function.instructions();
    if instructions.is_empty() {
        return Vec::new();
    }

    let mut leaders: BTreeSet<usize> = BTreeSet::new();
    leaders.insert(0);

    for (index, instruction) in instructions.iter().enumerate() {
        if let Some(target) = instruction.branch_target() {
            leaders.insert(target as usize);
        }
        if instruction.is_terminator() && index + 1 < instructions.len() {
            leaders.insert(index + 1);
        }
    }

    let leader_list: Vec<usize> = leaders.into_iter().collect();
    let mut blocks = Vec::with_capacity(leader_list.len());

    for (i, &start) in leader_list.iter().enumerate() {
        let end = leader_list
            .get(i + 1)
            .copied()
            .unwrap_or(instructions.len());
        blocks.push(BasicBlock {
            start_offset: start,
            instructions: instructions[start..end].to_vec(),
        });
    }

    blocks
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;
    use crate::{FunctionDefinition, FunctionSignature, VMType};

    fn function(instructions: Vec<Instruction>) -> Function {
        let definition =
            FunctionDefinition::managed(FunctionSignature::new("test", vec![]), VMType::INT);
        Function::new(definition, instructions, vec![VMType::INT])
    }

    #[test]
    fn test_single_block() {
        let func = function(vec![
            Instruction::LoadInt(2),
            Instruction::LoadInt(4),
            Instruction::AddInt,
            Instruction::Ret,
        ]);
        let blocks = build_basic_blocks(&func);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].start_offset, 0);
        assert_eq!(blocks[0].instructions.len(), 4);
    }

    #[test]
    fn test_diamond() {
        // 0: LoadInt 4
        // 1: LoadInt 2
        // 2: BranchEqual 6
        // 3: LoadInt 5
        // 4: StoreLocal 0
        // 5: Branch 8
        // 6: LoadInt 15
        // 7: StoreLocal 0
        // 8: LoadLocal 0
        // 9: Ret
        let func = function(vec![
            Instruction::LoadInt(4),
            Instruction::LoadInt(2),
            Instruction::BranchEqual(6),
            Instruction::LoadInt(5),
            Instruction::StoreLocal(0),
            Instruction::Branch(8),
            Instruction::LoadInt(15),
            Instruction::StoreLocal(0),
            Instruction::LoadLocal(0),
            Instruction::Ret,
        ]);
        let blocks = build_basic_blocks(&func);
        let starts: Vec<usize> = blocks.iter().map(|b| b.start_offset).collect();
        assert_eq!(starts, vec![0, 3, 6, 8]);

        // Coverage: the blocks partition the instruction sequence in order.
        let mut recombined = Vec::new();
        for block in &blocks {
            assert_eq!(block.start_offset, recombined.len());
            recombined.extend(block.instructions.iter().cloned());
        }
        assert_eq!(recombined, func.instructions().to_vec());
    }

    #[test]
    fn test_terminators_only_at_block_end() {
        let func = function(vec![
            Instruction::LoadInt(1),
            Instruction::LoadInt(2),
            Instruction::BranchLessThan(0),
            Instruction::Ret,
        ]);
        for block in build_basic_blocks(&func) {
            for instruction in &block.instructions[..block.instructions.len() - 1] {
                assert!(!instruction.is_terminator());
            }
        }
    }
}

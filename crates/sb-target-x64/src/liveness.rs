//! Liveness analysis for register allocation.
//!
//! Computes a live interval per virtual register by walking backward
//! from every use site to the definitions that reach it, following the
//! control-flow graph's predecessor edges across blocks and loops.

use std::collections::{BTreeMap, BTreeSet};

use sb_ir::analysis::{BasicBlock, ControlFlowGraph};

use crate::lower::{LoweredFunction, VirtualRegister};

/// Live interval of a virtual register.
///
/// `start` and `end` are global instruction indices into the source
/// function (block `start_offset` plus in-block offset), inclusive on
/// both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveInterval {
    pub register: VirtualRegister,
    pub start: usize,
    pub end: usize,
}

/// Compute the live interval of every virtual register that has at
/// least one use. Write-only registers need no allocation and get no
/// interval.
pub fn compute_live_intervals(
    lowered: &LoweredFunction,
    blocks: &[BasicBlock],
    cfg: &ControlFlowGraph,
) -> Vec<LiveInterval> {
    // Use sites per register, as (block index, in-block offset).
    let mut use_sites: BTreeMap<VirtualRegister, Vec<(usize, usize)>> = BTreeMap::new();
    for (block_index, block) in blocks.iter().enumerate() {
        for offset in 0..block.instructions.len() {
            let global = block.start_offset + offset;
            for register in &lowered.instructions[global].uses {
                use_sites
                    .entry(*register)
                    .or_default()
                    .push((block_index, offset));
            }
        }
    }

    let mut intervals = Vec::new();

    for (register, sites) in use_sites {
        let mut alive: BTreeSet<usize> = BTreeSet::new();

        for &(use_block, use_offset) in &sites {
            // Backward walk from the use site. Each entry walks one
            // block from the given offset down to its top, then fans
            // out into unvisited predecessors.
            let mut visited: BTreeSet<usize> = BTreeSet::new();
            let mut worklist = vec![(use_block, use_offset)];

            while let Some((block_index, from_offset)) = worklist.pop() {
                let block = &blocks[block_index];
                let mut reached_definition = false;

                for offset in (0..=from_offset).rev() {
                    let global = block.start_offset + offset;
                    alive.insert(global);

                    let instruction = &lowered.instructions[global];
                    if instruction.def == Some(register)
                        && !instruction.uses.contains(&register)
                    {
                        reached_definition = true;
                        break;
                    }
                }

                if !reached_definition {
                    for &pred in cfg.predecessors(block_index) {
                        if visited.insert(pred) {
                            let last = blocks[pred].instructions.len() - 1;
                            worklist.push((pred, last));
                        }
                    }
                }
            }
        }

        let start = *alive.iter().next().expect("use sites imply alive positions");
        let end = *alive.iter().next_back().expect("use sites imply alive positions");
        intervals.push(LiveInterval {
            register,
            start,
            end,
        });
    }

    intervals
}

#[cfg(test)]
mod tests {
    use sb_ir::analysis::build_basic_blocks;
    use sb_ir::{
        Binder, Function, FunctionDefinition, FunctionSignature, Instruction, VMType,
    };

    use super::*;
    use crate::lower::{lower_function, RegisterKind};

    fn analyze(
        locals: Vec<VMType>,
        instructions: Vec<Instruction>,
    ) -> (LoweredFunction, Vec<LiveInterval>) {
        let definition =
            FunctionDefinition::managed(FunctionSignature::new("test", vec![]), VMType::INT);
        let func = Function::new(definition, instructions, locals);
        let blocks = build_basic_blocks(&func);
        let cfg = ControlFlowGraph::from_blocks(&blocks);
        let lowered = lower_function(&func, &Binder::new());
        let intervals = compute_live_intervals(&lowered, &blocks, &cfg);
        (lowered, intervals)
    }

    fn interval_of(intervals: &[LiveInterval], register: VirtualRegister) -> LiveInterval {
        *intervals
            .iter()
            .find(|i| i.register == register)
            .expect("interval should exist")
    }

    #[test]
    fn test_straight_line() {
        let (_, intervals) = analyze(
            vec![],
            vec![
                Instruction::LoadInt(2),
                Instruction::LoadInt(4),
                Instruction::AddInt,
                Instruction::Ret,
            ],
        );

        let r0 = VirtualRegister::new(RegisterKind::Integer, 0);
        let r1 = VirtualRegister::new(RegisterKind::Integer, 1);

        // r0 is defined at 0, used by the add at 2 and the ret at 3.
        let i0 = interval_of(&intervals, r0);
        assert_eq!((i0.start, i0.end), (0, 3));

        let i1 = interval_of(&intervals, r1);
        assert_eq!((i1.start, i1.end), (1, 2));
    }

    #[test]
    fn test_interval_bounds_cover_uses() {
        let (lowered, intervals) = analyze(
            vec![VMType::INT],
            vec![
                Instruction::LoadInt(5),
                Instruction::StoreLocal(0),
                Instruction::LoadInt(1),
                Instruction::Pop,
                Instruction::LoadLocal(0),
                Instruction::Ret,
            ],
        );

        for interval in &intervals {
            assert!(interval.start <= interval.end);
            for (global, instruction) in lowered.instructions.iter().enumerate() {
                if instruction.uses.contains(&interval.register) {
                    assert!(interval.start <= global && global <= interval.end);
                }
            }
        }
    }

    #[test]
    fn test_local_live_across_branch() {
        // Local 0 is written in both arms and read at the join.
        let (lowered, intervals) = analyze(
            vec![VMType::INT],
            vec![
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
            ],
        );

        let local0 = lowered.local_registers[0];
        let interval = interval_of(&intervals, local0);
        // Covers both stores (4 and 7) and the load at 8.
        assert!(interval.start <= 4);
        assert!(interval.end >= 8);
    }

    #[test]
    fn test_loop_keeps_local_alive() {
        // 0: LoadInt 10; 1: StoreLocal 0
        // 2: LoadLocal 0; 3: LoadInt 1; 4: SubInt; 5: StoreLocal 0
        // 6: LoadLocal 0; 7: LoadInt 0; 8: BranchGreaterThan 2
        // 9: LoadLocal 0; 10: Ret
        let (lowered, intervals) = analyze(
            vec![VMType::INT],
            vec![
                Instruction::LoadInt(10),
                Instruction::StoreLocal(0),
                Instruction::LoadLocal(0),
                Instruction::LoadInt(1),
                Instruction::SubInt,
                Instruction::StoreLocal(0),
                Instruction::LoadLocal(0),
                Instruction::LoadInt(0),
                Instruction::BranchGreaterThan(2),
                Instruction::LoadLocal(0),
                Instruction::Ret,
            ],
        );

        let local0 = lowered.local_registers[0];
        let interval = interval_of(&intervals, local0);
        // Alive from the initial store through the loop to the final load.
        assert!(interval.start <= 1);
        assert!(interval.end >= 9);
    }

    #[test]
    fn test_write_only_register_has_no_interval() {
        let (lowered, intervals) = analyze(
            vec![],
            vec![
                Instruction::LoadInt(1),
                Instruction::Pop,
                Instruction::LoadInt(0),
                Instruction::Ret,
            ],
        );

        // Both loads write stack register 0 and it is used (by Pop and
        // Ret), so exactly one integer interval exists.
        assert_eq!(intervals.len(), 1);
        assert_eq!(
            intervals[0].register,
            VirtualRegister::new(RegisterKind::Integer, 0)
        );
        assert!(lowered.instructions[1].uses.contains(&intervals[0].register));
    }
}

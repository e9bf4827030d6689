//! Allocator spill counts under constrained register pools.

use sb_ir::analysis::{build_basic_blocks, ControlFlowGraph};
use sb_ir::{verify, Binder};
use sb_target_x64::liveness::compute_live_intervals;
use sb_target_x64::lower::lower_function;
use sb_target_x64::regalloc::allocate_registers;
use sb_test_util::programs;

#[test]
fn test_nested_add_spills_one_with_two_registers() {
    // Three values are live at once in `2 + (4 + 6)`; with two
    // registers exactly one interval must spill.
    let assembly = programs::nested_add(true);
    let mut functions = assembly.into_functions();
    let binder = Binder::new();
    let function = &mut functions[0];
    verify(function, &binder).unwrap();

    let blocks = build_basic_blocks(function);
    let cfg = ControlFlowGraph::from_blocks(&blocks);
    let lowered = lower_function(function, &binder);
    let intervals = compute_live_intervals(&lowered, &blocks, &cfg);

    let allocation = allocate_registers(&intervals, 2);
    assert_eq!(allocation.num_spilled(), 1);
    assert_eq!(allocation.num_allocated(), intervals.len() - 1);
}

#[test]
fn test_zero_registers_spills_all() {
    let assembly = programs::nested_add(true);
    let mut functions = assembly.into_functions();
    let binder = Binder::new();
    let function = &mut functions[0];
    verify(function, &binder).unwrap();

    let blocks = build_basic_blocks(function);
    let cfg = ControlFlowGraph::from_blocks(&blocks);
    let lowered = lower_function(function, &binder);
    let intervals = compute_live_intervals(&lowered, &blocks, &cfg);

    let allocation = allocate_registers(&intervals, 0);
    assert_eq!(allocation.num_allocated(), 0);
    assert_eq!(allocation.num_spilled(), intervals.len());
}

#[test]
fn test_seven_registers_fit_every_program() {
    for (assembly, _) in programs::all_programs(true) {
        let mut binder = Binder::new();
        let mut functions = assembly.into_functions();
        for function in &functions {
            binder.define(function.definition().clone()).unwrap();
        }
        for function in &mut functions {
            verify(function, &binder).unwrap();
            let blocks = build_basic_blocks(function);
            let cfg = ControlFlowGraph::from_blocks(&blocks);
            let lowered = lower_function(function, &binder);
            let intervals = compute_live_intervals(&lowered, &blocks, &cfg);
            let allocation = allocate_registers(&intervals, 7);
            // None of the canonical programs exceeds seven simultaneous
            // live values of one kind.
            assert_eq!(allocation.num_spilled(), 0, "{}", function.signature().key());
        }
    }
}

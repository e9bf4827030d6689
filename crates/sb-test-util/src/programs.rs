//! Canonical test programs.
//!
//! Each builder returns a complete assembly whose `main() Int` computes
//! a known value, exercising a specific part of the pipeline.

use sb_builder::{AssemblyBuilder, FunctionBuilder};
use sb_ir::{Assembly, VMType};

/// `2 + 4` => 6.
pub fn simple_add(optimize: bool) -> Assembly {
    let mut main = FunctionBuilder::new("main")
        .returns(VMType::INT)
        .optimize(optimize);
    main.load_int(2).load_int(4).add_int().ret();
    AssemblyBuilder::new("simple_add").function(main.build()).build()
}

/// `2 + (4 + 6)` => 12; needs three live stack slots.
pub fn nested_add(optimize: bool) -> Assembly {
    let mut main = FunctionBuilder::new("main")
        .returns(VMType::INT)
        .optimize(optimize);
    main.load_int(2)
        .load_int(4)
        .load_int(6)
        .add_int()
        .add_int()
        .ret();
    AssemblyBuilder::new("nested_add").function(main.build()).build()
}

/// Diamond control flow; `4 == 2` is false, so the fall-through arm
/// stores 5 => 5.
pub fn branch_diamond(optimize: bool) -> Assembly {
    let mut main = FunctionBuilder::new("main")
        .returns(VMType::INT)
        .optimize(optimize);
    let result = main.local(VMType::INT);
    main.load_int(4)
        .load_int(2)
        .branch_equal(6)
        .load_int(5)
        .store_local(result)
        .branch(8)
        .load_int(15)
        .store_local(result)
        .load_local(result)
        .ret();
    AssemblyBuilder::new("branch_diamond").function(main.build()).build()
}

/// Loop counting down from 100, accumulating 1 each iteration => 100.
pub fn countdown_loop(optimize: bool) -> Assembly {
    let mut main = FunctionBuilder::new("main")
        .returns(VMType::INT)
        .optimize(optimize);
    let counter = main.local(VMType::INT);
    let accumulator = main.local(VMType::INT);
    main.load_int(100)
        .store_local(counter) // 1
        .load_local(counter) // 2: loop head
        .load_int(0)
        .branch_equal(14) // 4: exit when counter == 0
        .load_local(accumulator)
        .load_int(1)
        .add_int()
        .store_local(accumulator) // 8
        .load_local(counter)
        .load_int(1)
        .sub_int()
        .store_local(counter) // 12
        .branch(2) // 13: back to the loop head
        .load_local(accumulator) // 14
        .ret();
    AssemblyBuilder::new("countdown_loop").function(main.build()).build()
}

/// Straight-line `1 + 2 + ... + 100` via repeated AddInt => 5050.
pub fn straight_sum(optimize: bool) -> Assembly {
    let mut main = FunctionBuilder::new("main")
        .returns(VMType::INT)
        .optimize(optimize);
    main.load_int(1);
    for value in 2..=100 {
        main.load_int(value).add_int();
    }
    main.ret();
    AssemblyBuilder::new("straight_sum").function(main.build()).build()
}

/// Recursive Fibonacci; `main() = fib(11)` => 89.
pub fn fibonacci(optimize: bool) -> Assembly {
    let mut fib = FunctionBuilder::new("fib")
        .returns(VMType::INT)
        .optimize(optimize);
    let n = fib.param(VMType::INT);
    fib.load_argument(n)
        .load_int(2)
        .branch_greater_or_equal(5) // 2: n >= 2 -> recurse
        .load_argument(n)
        .ret() // 4
        .load_argument(n) // 5
        .load_int(1)
        .sub_int()
        .call("fib", vec![VMType::INT]) // 8: fib(n - 1)
        .load_argument(n)
        .load_int(2)
        .sub_int()
        .call("fib", vec![VMType::INT]) // 12: fib(n - 2)
        .add_int()
        .ret();

    let mut main = FunctionBuilder::new("main")
        .returns(VMType::INT)
        .optimize(optimize);
    main.load_int(11).call("fib", vec![VMType::INT]).ret();

    AssemblyBuilder::new("fibonacci")
        .function(fib.build())
        .function(main.build())
        .build()
}

/// Float arithmetic behind an Int main: `(1.5 + 2.25) * 2.0` compared
/// against 7.5 selects the return value => 1.
pub fn float_compare(optimize: bool) -> Assembly {
    let mut main = FunctionBuilder::new("main")
        .returns(VMType::INT)
        .optimize(optimize);
    main.load_float(1.5) // 0
        .load_float(2.25) // 1
        .add_float() // 2
        .load_float(2.0) // 3
        .mul_float() // 4
        .load_float(7.5) // 5
        .branch_equal(9) // 6
        .load_int(0) // 7
        .ret() // 8
        .load_int(1) // 9
        .ret(); // 10
    AssemblyBuilder::new("float_compare").function(main.build()).build()
}

/// All six canonical programs with their expected results.
pub fn all_programs(optimize: bool) -> Vec<(Assembly, i32)> {
    vec![
        (simple_add(optimize), 6),
        (nested_add(optimize), 12),
        (branch_diamond(optimize), 5),
        (countdown_loop(optimize), 100),
        (straight_sum(optimize), 5050),
        (fibonacci(optimize), 89),
        (float_compare(optimize), 1),
    ]
}

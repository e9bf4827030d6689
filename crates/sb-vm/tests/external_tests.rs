//! External-function binding: managed code calling host trampolines.

#![cfg(target_arch = "x86_64")]

use sb_builder::{AssemblyBuilder, FunctionBuilder};
use sb_ir::{FunctionSignature, VMType};
use sb_vm::VirtualMachine;

extern "win64" fn host_add(a: i32, b: i32) -> i32 {
    a.wrapping_add(b)
}

extern "win64" fn host_halve(x: f32) -> f32 {
    x / 2.0
}

extern "win64" fn host_pick(a: i32, b: i32, c: i32, d: i32, e: i32, f: i32) -> i32 {
    let _ = (a, b, c, d);
    e.wrapping_mul(10).wrapping_add(f)
}

#[test]
fn test_call_external_int() {
    let mut vm = VirtualMachine::new();
    vm.define_external(
        FunctionSignature::new("host_add", vec![VMType::INT, VMType::INT]),
        VMType::INT,
        host_add as usize,
    )
    .unwrap();

    let mut main = FunctionBuilder::new("main").returns(VMType::INT);
    main.load_int(40)
        .load_int(2)
        .call("host_add", vec![VMType::INT, VMType::INT])
        .ret();
    vm.load_assembly(AssemblyBuilder::new("test").function(main.build()).build())
        .unwrap();

    assert_eq!(vm.execute().unwrap(), 42);
}

#[test]
fn test_call_external_float() {
    let mut vm = VirtualMachine::new();
    vm.define_external(
        FunctionSignature::new("host_halve", vec![VMType::FLOAT]),
        VMType::FLOAT,
        host_halve as usize,
    )
    .unwrap();

    // 5.0 / 2.0 == 2.5, compared against 2.5 selects 1.
    let mut main = FunctionBuilder::new("main").returns(VMType::INT);
    main.load_float(5.0)
        .call("host_halve", vec![VMType::FLOAT])
        .load_float(2.5)
        .branch_equal(6) // 3
        .load_int(0)
        .ret() // 5
        .load_int(1) // 6
        .ret();
    vm.load_assembly(AssemblyBuilder::new("test").function(main.build()).build())
        .unwrap();

    assert_eq!(vm.execute().unwrap(), 1);
}

#[test]
fn test_call_external_with_stack_arguments() {
    // Six arguments exercise the outgoing stack-argument path.
    let mut vm = VirtualMachine::new();
    let params = vec![VMType::INT; 6];
    vm.define_external(
        FunctionSignature::new("host_pick", params.clone()),
        VMType::INT,
        host_pick as usize,
    )
    .unwrap();

    let mut main = FunctionBuilder::new("main").returns(VMType::INT);
    main.load_int(1)
        .load_int(2)
        .load_int(3)
        .load_int(4)
        .load_int(5)
        .load_int(6)
        .call("host_pick", params)
        .ret();
    vm.load_assembly(AssemblyBuilder::new("test").function(main.build()).build())
        .unwrap();

    assert_eq!(vm.execute().unwrap(), 56);
}

#[test]
fn test_managed_function_with_many_arguments() {
    // Managed callee with six parameters: incoming stack arguments are
    // read from their home slots.
    let mut vm = VirtualMachine::new();

    let mut sum6 = FunctionBuilder::new("sum6").returns(VMType::INT);
    let mut args = Vec::new();
    for _ in 0..6 {
        args.push(sum6.param(VMType::INT));
    }
    sum6.load_argument(args[0]);
    for &arg in &args[1..] {
        sum6.load_argument(arg).add_int();
    }
    sum6.ret();

    let mut main = FunctionBuilder::new("main").returns(VMType::INT);
    for value in 1..=6 {
        main.load_int(value);
    }
    main.call("sum6", vec![VMType::INT; 6]).ret();

    vm.load_assembly(
        AssemblyBuilder::new("test")
            .function(sum6.build())
            .function(main.build())
            .build(),
    )
    .unwrap();

    assert_eq!(vm.execute().unwrap(), 21);
}

//! Error-contract tests: verifier, binder, and entry-point messages.

use sb_builder::{AssemblyBuilder, FunctionBuilder};
use sb_ir::VMType;
use sb_vm::{VirtualMachine, VmError};

fn load_and_compile(vm: &mut VirtualMachine, assembly: sb_ir::Assembly) -> VmError {
    vm.load_assembly(assembly).unwrap();
    vm.compile().unwrap_err()
}

#[test]
fn test_empty_function_message() {
    let mut vm = VirtualMachine::new();
    let main = FunctionBuilder::new("main").returns(VMType::INT);
    let assembly = AssemblyBuilder::new("test").function(main.build()).build();
    let err = load_and_compile(&mut vm, assembly);
    assert!(matches!(err, VmError::Verification(_)));
    assert_eq!(format!("{}", err), "0: Empty functions are not allowed.");
}

#[test]
fn test_missing_return_message() {
    let mut vm = VirtualMachine::new();
    let mut main = FunctionBuilder::new("main").returns(VMType::INT);
    main.load_int(1).pop();
    let assembly = AssemblyBuilder::new("test").function(main.build()).build();
    let err = load_and_compile(&mut vm, assembly);
    assert_eq!(
        format!("{}", err),
        "1: Functions must end with a return instruction."
    );
}

#[test]
fn test_void_parameter_message() {
    let mut vm = VirtualMachine::new();
    let mut main = FunctionBuilder::new("main").returns(VMType::INT);
    main.load_int(0).ret();

    let mut broken = FunctionBuilder::new("broken").returns(VMType::VOID);
    broken.param(VMType::VOID);
    broken.ret();

    let assembly = AssemblyBuilder::new("test")
        .function(main.build())
        .function(broken.build())
        .build();
    let err = load_and_compile(&mut vm, assembly);
    assert_eq!(
        format!("{}", err),
        "0: 'Void' is not a valid parameter type."
    );
}

#[test]
fn test_duplicate_signature_message() {
    let mut vm = VirtualMachine::new();
    let mut first = FunctionBuilder::new("twice").returns(VMType::INT);
    first.load_int(1).ret();
    let mut second = FunctionBuilder::new("twice").returns(VMType::INT);
    second.load_int(2).ret();

    let err = vm
        .load_assembly(
            AssemblyBuilder::new("test")
                .function(first.build())
                .function(second.build())
                .build(),
        )
        .unwrap_err();
    assert_eq!(
        format!("{}", err),
        "The function 'twice()' is already defined."
    );
}

#[test]
fn test_no_entry_point_message() {
    let mut vm = VirtualMachine::new();
    let mut helper = FunctionBuilder::new("helper").returns(VMType::INT);
    helper.load_int(1).ret();
    let assembly = AssemblyBuilder::new("test").function(helper.build()).build();
    let err = load_and_compile(&mut vm, assembly);
    assert_eq!(format!("{}", err), "There is no entry point defined.");
}

#[test]
fn test_wrong_entry_signature_message() {
    let mut vm = VirtualMachine::new();
    let mut main = FunctionBuilder::new("main").returns(VMType::VOID);
    main.ret();
    let assembly = AssemblyBuilder::new("test").function(main.build()).build();
    let err = load_and_compile(&mut vm, assembly);
    assert_eq!(
        format!("{}", err),
        "Expected the main function to have the signature: 'main() Int'."
    );
}

#[test]
fn test_failed_function_is_not_registered() {
    // The duplicate is rejected; the original definition stays loaded
    // and compiles.
    let mut vm = VirtualMachine::new();
    let mut main = FunctionBuilder::new("main").returns(VMType::INT);
    main.load_int(3).ret();
    vm.load_assembly(AssemblyBuilder::new("test").function(main.build()).build())
        .unwrap();

    let mut duplicate = FunctionBuilder::new("main").returns(VMType::INT);
    duplicate.load_int(4).ret();
    assert!(vm
        .load_assembly(
            AssemblyBuilder::new("test")
                .function(duplicate.build())
                .build()
        )
        .is_err());

    assert_eq!(vm.functions().len(), 1);
    #[cfg(target_arch = "x86_64")]
    assert_eq!(vm.execute().unwrap(), 3);
}

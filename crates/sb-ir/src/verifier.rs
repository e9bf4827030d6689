//! Bytecode verifier.
//!
//! The verifier abstract-interprets each function over a stack of types,
//! checking every opcode's operand counts and types. It is linear: stack
//! states are not merged at join points. On success it records the
//! maximum operand-stack depth on the function.

use alloc::{format, string::String, vec::Vec};

use crate::{
    binder::Binder,
    function::Function,
    inst::Instruction,
    types::VMType,
};

/// A verification failure, naming the offending instruction.
#[derive(Debug, Clone)]
pub struct VerificationError {
    /// Signature key of the function that failed.
    pub function: String,
    /// The offending instruction, if the function is non-empty.
    pub instruction: Option<Instruction>,
    /// Index of the offending instruction.
    pub index: usize,
    /// What went wrong.
    pub message: String,
}

impl VerificationError {
    fn new(function: &Function, index: usize, message: String) -> Self {
        Self {
            function: function.signature().key(),
            instruction: function.instructions().get(index).cloned(),
            index,
            message,
        }
    }
}

impl core::fmt::Display for VerificationError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.index, self.message)
    }
}

fn pop_operand(
    function: &Function,
    index: usize,
    stack: &mut Vec<VMType>,
) -> Result<VMType, VerificationError> {
    stack.pop().ok_or_else(|| {
        VerificationError::new(
            function,
            index,
            String::from("The operand stack is empty."),
        )
    })
}

fn pop_typed(
    function: &Function,
    index: usize,
    stack: &mut Vec<VMType>,
    expected: VMType,
) -> Result<(), VerificationError> {
    let actual = pop_operand(function, index, stack)?;
    if actual != expected {
        return Err(VerificationError::new(
            function,
            index,
            format!("Expected type {} but got type {}.", expected, actual),
        ));
    }
    Ok(())
}

/// Verify a function against the binder, recording its maximum
/// operand-stack depth on success.
pub fn verify(function: &mut Function, binder: &Binder) -> Result<(), VerificationError> {
    if function.instructions().is_empty() {
        return Err(VerificationError::new(
            function,
            0,
            String::from("Empty functions are not allowed."),
        ));
    }

    for param in function.signature().parameters() {
        if param.is_void() {
            return Err(VerificationError::new(
                function,
                0,
                String::from("'Void' is not a valid parameter type."),
            ));
        }
    }

    for local in function.locals() {
        if local.is_void() {
            return Err(VerificationError::new(
                function,
                0,
                String::from("'Void' is not a valid local type."),
            ));
        }
    }

    let last_index = function.instructions().len() - 1;
    if !matches!(function.instructions()[last_index], Instruction::Ret) {
        return Err(VerificationError::new(
            function,
            last_index,
            String::from("Functions must end with a return instruction."),
        ));
    }

    let instruction_count = function.instructions().len();
    let mut stack: Vec<VMType> = Vec::new();
    let mut max_depth = 0usize;

    for index in 0..instruction_count {
        max_depth = max_depth.max(stack.len());
        let instruction = function.instructions()[index].clone();

        if let Some(target) = instruction.branch_target() {
            if target as usize >= instruction_count {
                return Err(VerificationError::new(
                    function,
                    index,
                    format!("Branch target {} is out of range.", target),
                ));
            }
        }

        match &instruction {
            Instruction::Pop => {
                pop_operand(function, index, &mut stack)?;
            }
            Instruction::LoadInt(_) => stack.push(VMType::INT),
            Instruction::LoadFloat(_) => stack.push(VMType::FLOAT),
            Instruction::AddInt
            | Instruction::SubInt
            | Instruction::MulInt
            | Instruction::DivInt => {
                pop_typed(function, index, &mut stack, VMType::INT)?;
                pop_typed(function, index, &mut stack, VMType::INT)?;
                stack.push(VMType::INT);
            }
            Instruction::AddFloat
            | Instruction::SubFloat
            | Instruction::MulFloat
            | Instruction::DivFloat => {
                pop_typed(function, index, &mut stack, VMType::FLOAT)?;
                pop_typed(function, index, &mut stack, VMType::FLOAT)?;
                stack.push(VMType::FLOAT);
            }
            Instruction::Call(signature) => {
                let key = signature.key();
                let definition = binder.resolve(&key).ok_or_else(|| {
                    VerificationError::new(
                        function,
                        index,
                        format!("The function '{}' is not defined.", key),
                    )
                })?;
                let return_type = definition.return_type();

                for param in signature.parameters().iter().rev() {
                    pop_typed(function, index, &mut stack, *param)?;
                }

                if !return_type.is_void() {
                    stack.push(return_type);
                }
            }
            Instruction::Ret => {
                let return_type = function.return_type();
                if return_type.is_void() {
                    if !stack.is_empty() {
                        return Err(VerificationError::new(
                            function,
                            index,
                            String::from(
                                "The operand stack must be empty when returning from a Void function.",
                            ),
                        ));
                    }
                } else {
                    if stack.len() != 1 {
                        return Err(VerificationError::new(
                            function,
                            index,
                            format!(
                                "Expected exactly 1 operand on the stack but got {}.",
                                stack.len()
                            ),
                        ));
                    }
                    pop_typed(function, index, &mut stack, return_type)?;
                }
            }
            Instruction::LoadArgument(arg) => {
                let parameters = function.signature().parameters();
                let param = parameters.get(*arg as usize).copied().ok_or_else(|| {
                    VerificationError::new(
                        function,
                        index,
                        format!("The argument index {} is out of range.", arg),
                    )
                })?;
                stack.push(param);
            }
            Instruction::LoadLocal(local) => {
                let ty = function.locals().get(*local as usize).copied().ok_or_else(|| {
                    VerificationError::new(
                        function,
                        index,
                        format!("The local index {} is out of range.", local),
                    )
                })?;
                stack.push(ty);
            }
            Instruction::StoreLocal(local) => {
                let ty = function.locals().get(*local as usize).copied().ok_or_else(|| {
                    VerificationError::new(
                        function,
                        index,
                        format!("The local index {} is out of range.", local),
                    )
                })?;
                pop_typed(function, index, &mut stack, ty)?;
            }
            Instruction::Branch(_) => {}
            Instruction::BranchEqual(_)
            | Instruction::BranchNotEqual(_)
            | Instruction::BranchGreaterThan(_)
            | Instruction::BranchGreaterOrEqual(_)
            | Instruction::BranchLessThan(_)
            | Instruction::BranchLessOrEqual(_) => {
                let rhs = pop_operand(function, index, &mut stack)?;
                let lhs = pop_operand(function, index, &mut stack)?;
                if lhs != rhs {
                    return Err(VerificationError::new(
                        function,
                        index,
                        format!(
                            "Cannot compare type {} against type {}.",
                            lhs, rhs
                        ),
                    ));
                }
            }
        }

        max_depth = max_depth.max(stack.len());
    }

    function.operand_stack_size = max_depth;
    Ok(())
}

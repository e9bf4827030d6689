//! Lowering of the stack-based bytecode into virtual-register form.
//!
//! The operand stack is simulated at compile time: every push allocates
//! the virtual register whose number is the current stack depth, and
//! every pop returns the register that position holds. The result is a
//! parallel array of instructions annotated with the virtual registers
//! they use (in pop order, top of stack first) and define.

use sb_ir::{Binder, Function, Instruction, VMType};

/// Register class of a virtual register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RegisterKind {
    Integer,
    Float,
}

impl RegisterKind {
    /// The register class a value of the given type lives in.
    ///
    /// Void values never materialize, so they have no kind.
    pub fn of_type(ty: VMType) -> RegisterKind {
        if ty.is_float() {
            RegisterKind::Float
        } else {
            RegisterKind::Integer
        }
    }
}

/// A symbolic pre-allocation register.
///
/// Registers of different kinds are distinct even when they share a
/// number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VirtualRegister {
    pub kind: RegisterKind,
    pub number: u32,
}

impl VirtualRegister {
    pub fn new(kind: RegisterKind, number: u32) -> Self {
        Self { kind, number }
    }
}

/// A bytecode instruction annotated with its virtual-register operands.
#[derive(Debug, Clone)]
pub struct VirtualInstruction {
    /// The original bytecode instruction.
    pub instruction: Instruction,
    /// Registers read, in pop order (top of stack first).
    pub uses: Vec<VirtualRegister>,
    /// Register written, if any.
    pub def: Option<VirtualRegister>,
}

/// Output of lowering one function.
#[derive(Debug, Clone)]
pub struct LoweredFunction {
    /// Virtual instructions, parallel to the function's instructions.
    pub instructions: Vec<VirtualInstruction>,
    /// The dedicated register of each local variable, in declaration
    /// order. Local `i` is numbered `stack_registers + i`.
    pub local_registers: Vec<VirtualRegister>,
    /// High-water mark of the simulated operand stack.
    pub stack_registers: u32,
}

/// Lower a verified function into virtual-register form.
///
/// The function must have passed verification; the simulation assumes
/// the stack discipline the verifier enforces.
pub fn lower_function(function: &Function, binder: &Binder) -> LoweredFunction {
    let mut stack: Vec<VirtualRegister> = Vec::new();
    let mut stack_registers: u32 = 0;
    let mut instructions = Vec::with_capacity(function.instructions().len());

    let mut push = |stack: &mut Vec<VirtualRegister>, kind: RegisterKind| {
        let register = VirtualRegister::new(kind, stack.len() as u32);
        stack.push(register);
        stack_registers = stack_registers.max(stack.len() as u32);
        register
    };

    for instruction in function.instructions() {
        let mut uses = Vec::new();
        let mut def = None;

        match instruction {
            Instruction::Pop => {
                uses.push(stack.pop().expect("verified: stack not empty"));
            }
            Instruction::LoadInt(_) => {
                def = Some(push(&mut stack, RegisterKind::Integer));
            }
            Instruction::LoadFloat(_) => {
                def = Some(push(&mut stack, RegisterKind::Float));
            }
            Instruction::AddInt
            | Instruction::SubInt
            | Instruction::MulInt
            | Instruction::DivInt => {
                uses.push(stack.pop().expect("verified: stack not empty"));
                uses.push(stack.pop().expect("verified: stack not empty"));
                def = Some(push(&mut stack, RegisterKind::Integer));
            }
            Instruction::AddFloat
            | Instruction::SubFloat
            | Instruction::MulFloat
            | Instruction::DivFloat => {
                uses.push(stack.pop().expect("verified: stack not empty"));
                uses.push(stack.pop().expect("verified: stack not empty"));
                def = Some(push(&mut stack, RegisterKind::Float));
            }
            Instruction::Call(signature) => {
                for _ in signature.parameters() {
                    uses.push(stack.pop().expect("verified: stack not empty"));
                }
                let definition = binder
                    .resolve(&signature.key())
                    .expect("verified: callee is defined");
                let return_type = definition.return_type();
                if !return_type.is_void() {
                    def = Some(push(&mut stack, RegisterKind::of_type(return_type)));
                }
            }
            Instruction::Ret => {
                if !function.return_type().is_void() {
                    uses.push(stack.pop().expect("verified: stack not empty"));
                }
            }
            Instruction::LoadArgument(index) => {
                let ty = function.signature().parameters()[*index as usize];
                def = Some(push(&mut stack, RegisterKind::of_type(ty)));
            }
            Instruction::LoadLocal(index) => {
                let ty = function.locals()[*index as usize];
                // The use of the local register is patched in below.
                def = Some(push(&mut stack, RegisterKind::of_type(ty)));
            }
            Instruction::StoreLocal(_) => {
                // The def of the local register is patched in below.
                uses.push(stack.pop().expect("verified: stack not empty"));
            }
            Instruction::Branch(_) => {}
            Instruction::BranchEqual(_)
            | Instruction::BranchNotEqual(_)
            | Instruction::BranchGreaterThan(_)
            | Instruction::BranchGreaterOrEqual(_)
            | Instruction::BranchLessThan(_)
            | Instruction::BranchLessOrEqual(_) => {
                uses.push(stack.pop().expect("verified: stack not empty"));
                uses.push(stack.pop().expect("verified: stack not empty"));
            }
        }

        instructions.push(VirtualInstruction {
            instruction: instruction.clone(),
            uses,
            def,
        });
    }

    // Each local gets a dedicated register above the stack registers;
    // rewrite local accesses against it.
    let local_registers: Vec<VirtualRegister> = function
        .locals()
        .iter()
        .enumerate()
        .map(|(index, ty)| {
            VirtualRegister::new(RegisterKind::of_type(*ty), stack_registers + index as u32)
        })
        .collect();

    for virtual_instruction in &mut instructions {
        match &virtual_instruction.instruction {
            Instruction::LoadLocal(index) => {
                virtual_instruction.uses = vec![local_registers[*index as usize]];
            }
            Instruction::StoreLocal(index) => {
                virtual_instruction.def = Some(local_registers[*index as usize]);
            }
            _ => {}
        }
    }

    LoweredFunction {
        instructions,
        local_registers,
        stack_registers,
    }
}

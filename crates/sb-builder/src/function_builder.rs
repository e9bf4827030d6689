//! Function and assembly builders.

use alloc::{string::String, vec::Vec};

use sb_ir::{
    Assembly, Function, FunctionDefinition, FunctionSignature, Instruction, VMType,
};

/// Builder for constructing bytecode functions.
///
/// One method per opcode, plus declarations for parameters, locals and
/// the return type. Branch targets are instruction indices.
#[derive(Debug)]
pub struct FunctionBuilder {
    name: String,
    parameters: Vec<VMType>,
    return_type: VMType,
    locals: Vec<VMType>,
    instructions: Vec<Instruction>,
    optimize: bool,
}

impl FunctionBuilder {
    /// Start building a function with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
            return_type: VMType::VOID,
            locals: Vec::new(),
            instructions: Vec::new(),
            optimize: false,
        }
    }

    /// Declare a parameter, returning its argument index.
    pub fn param(&mut self, ty: VMType) -> u32 {
        self.parameters.push(ty);
        (self.parameters.len() - 1) as u32
    }

    /// Set the return type.
    pub fn returns(mut self, ty: VMType) -> Self {
        self.return_type = ty;
        self
    }

    /// Declare a local variable, returning its index.
    pub fn local(&mut self, ty: VMType) -> u32 {
        self.locals.push(ty);
        (self.locals.len() - 1) as u32
    }

    /// Enable the optimizing (register-allocating) emission mode.
    pub fn optimize(mut self, optimize: bool) -> Self {
        self.optimize = optimize;
        self
    }

    /// The index the next pushed instruction will get.
    pub fn next_index(&self) -> u32 {
        self.instructions.len() as u32
    }

    pub fn pop(&mut self) -> &mut Self {
        self.push(Instruction::Pop)
    }

    pub fn load_int(&mut self, value: i32) -> &mut Self {
        self.push(Instruction::LoadInt(value))
    }

    pub fn load_float(&mut self, value: f32) -> &mut Self {
        self.push(Instruction::LoadFloat(value))
    }

    pub fn add_int(&mut self) -> &mut Self {
        self.push(Instruction::AddInt)
    }

    pub fn sub_int(&mut self) -> &mut Self {
        self.push(Instruction::SubInt)
    }

    pub fn mul_int(&mut self) -> &mut Self {
        self.push(Instruction::MulInt)
    }

    pub fn div_int(&mut self) -> &mut Self {
        self.push(Instruction::DivInt)
    }

    pub fn add_float(&mut self) -> &mut Self {
        self.push(Instruction::AddFloat)
    }

    pub fn sub_float(&mut self) -> &mut Self {
        self.push(Instruction::SubFloat)
    }

    pub fn mul_float(&mut self) -> &mut Self {
        self.push(Instruction::MulFloat)
    }

    pub fn div_float(&mut self) -> &mut Self {
        self.push(Instruction::DivFloat)
    }

    pub fn call(&mut self, name: impl Into<String>, parameters: Vec<VMType>) -> &mut Self {
        self.push(Instruction::Call(FunctionSignature::new(name, parameters)))
    }

    pub fn ret(&mut self) -> &mut Self {
        self.push(Instruction::Ret)
    }

    pub fn load_argument(&mut self, index: u32) -> &mut Self {
        self.push(Instruction::LoadArgument(index))
    }

    pub fn load_local(&mut self, index: u32) -> &mut Self {
        self.push(Instruction::LoadLocal(index))
    }

    pub fn store_local(&mut self, index: u32) -> &mut Self {
        self.push(Instruction::StoreLocal(index))
    }

    pub fn branch(&mut self, target: u32) -> &mut Self {
        self.push(Instruction::Branch(target))
    }

    pub fn branch_equal(&mut self, target: u32) -> &mut Self {
        self.push(Instruction::BranchEqual(target))
    }

    pub fn branch_not_equal(&mut self, target: u32) -> &mut Self {
        self.push(Instruction::BranchNotEqual(target))
    }

    pub fn branch_greater_than(&mut self, target: u32) -> &mut Self {
        self.push(Instruction::BranchGreaterThan(target))
    }

    pub fn branch_greater_or_equal(&mut self, target: u32) -> &mut Self {
        self.push(Instruction::BranchGreaterOrEqual(target))
    }

    pub fn branch_less_than(&mut self, target: u32) -> &mut Self {
        self.push(Instruction::BranchLessThan(target))
    }

    pub fn branch_less_or_equal(&mut self, target: u32) -> &mut Self {
        self.push(Instruction::BranchLessOrEqual(target))
    }

    fn push(&mut self, instruction: Instruction) -> &mut Self {
        self.instructions.push(instruction);
        self
    }

    /// Finish building and return the function.
    pub fn build(self) -> Function {
        let definition = FunctionDefinition::managed(
            FunctionSignature::new(self.name, self.parameters),
            self.return_type,
        );
        let mut function = Function::new(definition, self.instructions, self.locals);
        function.optimize = self.optimize;
        function
    }
}

/// Builder aggregating functions into an assembly.
#[derive(Debug)]
pub struct AssemblyBuilder {
    name: String,
    functions: Vec<Function>,
}

impl AssemblyBuilder {
    /// Start building an assembly with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            functions: Vec::new(),
        }
    }

    /// Add a finished function.
    pub fn function(mut self, function: Function) -> Self {
        self.functions.push(function);
        self
    }

    /// Finish building and return the assembly.
    pub fn build(self) -> Assembly {
        Assembly::new(self.name, self.functions)
    }
}

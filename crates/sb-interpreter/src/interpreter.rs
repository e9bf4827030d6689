//! The bytecode interpreter.

use alloc::{collections::BTreeMap, string::String, vec::Vec};

use sb_ir::{Assembly, Comparison, Function, Instruction, VMType};

use crate::error::InterpreterError;
use crate::logging::{ExecutionTrace, LogLevel};

/// A runtime value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Int(i32),
    Float(f32),
}

impl Value {
    /// Zero value of the given type.
    fn zero(ty: VMType) -> Value {
        if ty.is_float() {
            Value::Float(0.0)
        } else {
            Value::Int(0)
        }
    }
}

/// Default instruction budget before a run is aborted.
const DEFAULT_INSTRUCTION_LIMIT: u64 = 100_000_000;

/// Interpreter over one assembly.
pub struct Interpreter<'a> {
    functions: BTreeMap<String, &'a Function>,
    instruction_limit: u64,
    executed: u64,
    log_level: LogLevel,
    trace: ExecutionTrace,
}

impl<'a> Interpreter<'a> {
    /// Create an interpreter for the given assembly.
    pub fn new(assembly: &'a Assembly) -> Self {
        let functions = assembly
            .functions()
            .iter()
            .map(|function| (function.signature().key(), function))
            .collect();
        Self {
            functions,
            instruction_limit: DEFAULT_INSTRUCTION_LIMIT,
            executed: 0,
            log_level: LogLevel::None,
            trace: ExecutionTrace::default(),
        }
    }

    /// Override the instruction budget.
    pub fn with_instruction_limit(mut self, limit: u64) -> Self {
        self.instruction_limit = limit;
        self
    }

    /// Enable tracing.
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    /// Collected trace entries.
    pub fn trace(&self) -> &[String] {
        self.trace.entries()
    }

    /// Run the function with the given signature key with no
    /// arguments. Returns the return value, or `None` for Void.
    pub fn run(&mut self, key: &str) -> Result<Option<Value>, InterpreterError> {
        let function =
            self.functions
                .get(key)
                .copied()
                .ok_or_else(|| InterpreterError::UndefinedFunction {
                    signature: String::from(key),
                })?;
        self.call_function(function, Vec::new(), 0)
    }

    fn call_function(
        &mut self,
        function: &'a Function,
        arguments: Vec<Value>,
        depth: usize,
    ) -> Result<Option<Value>, InterpreterError> {
        if self.log_level != LogLevel::None {
            self.trace.call(depth, &function.signature().key());
        }

        let mut locals: Vec<Value> = function
            .locals()
            .iter()
            .map(|ty| Value::zero(*ty))
            .collect();
        let mut stack: Vec<Value> = Vec::new();
        let mut pc = 0usize;

        let result = loop {
            self.executed += 1;
            if self.executed > self.instruction_limit {
                return Err(InterpreterError::InstructionLimitExceeded {
                    limit: self.instruction_limit,
                    executed: self.executed,
                });
            }

            let instruction = &function.instructions()[pc];
            if self.log_level == LogLevel::Instructions {
                self.trace.instruction(depth, pc, instruction);
            }
            pc += 1;

            match instruction {
                Instruction::Pop => {
                    stack.pop();
                }
                Instruction::LoadInt(value) => stack.push(Value::Int(*value)),
                Instruction::LoadFloat(value) => stack.push(Value::Float(*value)),
                Instruction::AddInt
                | Instruction::SubInt
                | Instruction::MulInt
                | Instruction::DivInt => {
                    let (lhs, rhs) = pop_int_pair(&mut stack);
                    let value = match instruction {
                        Instruction::AddInt => lhs.wrapping_add(rhs),
                        Instruction::SubInt => lhs.wrapping_sub(rhs),
                        Instruction::MulInt => lhs.wrapping_mul(rhs),
                        _ => {
                            if rhs == 0 {
                                return Err(InterpreterError::DivideByZero {
                                    function: function.signature().key(),
                                    index: pc - 1,
                                });
                            }
                            lhs.wrapping_div(rhs)
                        }
                    };
                    stack.push(Value::Int(value));
                }
                Instruction::AddFloat
                | Instruction::SubFloat
                | Instruction::MulFloat
                | Instruction::DivFloat => {
                    let (lhs, rhs) = pop_float_pair(&mut stack);
                    let value = match instruction {
                        Instruction::AddFloat => lhs + rhs,
                        Instruction::SubFloat => lhs - rhs,
                        Instruction::MulFloat => lhs * rhs,
                        _ => lhs / rhs,
                    };
                    stack.push(Value::Float(value));
                }
                Instruction::Call(signature) => {
                    let key = signature.key();
                    let callee = self.functions.get(&key).copied().ok_or_else(|| {
                        InterpreterError::ExternalCall {
                            signature: key.clone(),
                        }
                    })?;

                    // Arguments were pushed left to right.
                    let count = signature.parameters().len();
                    let mut call_arguments = Vec::with_capacity(count);
                    for _ in 0..count {
                        call_arguments.push(stack.pop().expect("verified: stack not empty"));
                    }
                    call_arguments.reverse();

                    if let Some(value) = self.call_function(callee, call_arguments, depth + 1)? {
                        stack.push(value);
                    }
                }
                Instruction::Ret => {
                    break if function.return_type().is_void() {
                        None
                    } else {
                        Some(stack.pop().expect("verified: stack not empty"))
                    };
                }
                Instruction::LoadArgument(index) => {
                    stack.push(arguments[*index as usize]);
                }
                Instruction::LoadLocal(index) => {
                    stack.push(locals[*index as usize]);
                }
                Instruction::StoreLocal(index) => {
                    locals[*index as usize] = stack.pop().expect("verified: stack not empty");
                }
                Instruction::Branch(target) => {
                    pc = *target as usize;
                }
                Instruction::BranchEqual(target)
                | Instruction::BranchNotEqual(target)
                | Instruction::BranchGreaterThan(target)
                | Instruction::BranchGreaterOrEqual(target)
                | Instruction::BranchLessThan(target)
                | Instruction::BranchLessOrEqual(target) => {
                    let comparison = instruction
                        .comparison()
                        .expect("conditional branches compare");
                    let rhs = stack.pop().expect("verified: stack not empty");
                    let lhs = stack.pop().expect("verified: stack not empty");
                    if compare(lhs, rhs, comparison) {
                        pc = *target as usize;
                    }
                }
            }
        };

        if self.log_level != LogLevel::None {
            self.trace.ret(depth, &function.signature().key());
        }
        Ok(result)
    }
}

fn pop_int_pair(stack: &mut Vec<Value>) -> (i32, i32) {
    let Some(Value::Int(rhs)) = stack.pop() else {
        panic!("verified: Int on stack");
    };
    let Some(Value::Int(lhs)) = stack.pop() else {
        panic!("verified: Int on stack");
    };
    (lhs, rhs)
}

fn pop_float_pair(stack: &mut Vec<Value>) -> (f32, f32) {
    let Some(Value::Float(rhs)) = stack.pop() else {
        panic!("verified: Float on stack");
    };
    let Some(Value::Float(lhs)) = stack.pop() else {
        panic!("verified: Float on stack");
    };
    (lhs, rhs)
}

fn compare(lhs: Value, rhs: Value, comparison: Comparison) -> bool {
    match (lhs, rhs) {
        (Value::Int(lhs), Value::Int(rhs)) => match comparison {
            Comparison::Equal => lhs == rhs,
            Comparison::NotEqual => lhs != rhs,
            Comparison::GreaterThan => lhs > rhs,
            Comparison::GreaterOrEqual => lhs >= rhs,
            Comparison::LessThan => lhs < rhs,
            Comparison::LessOrEqual => lhs <= rhs,
        },
        (Value::Float(lhs), Value::Float(rhs)) => match comparison {
            Comparison::Equal => lhs == rhs,
            Comparison::NotEqual => lhs != rhs,
            Comparison::GreaterThan => lhs > rhs,
            Comparison::GreaterOrEqual => lhs >= rhs,
            Comparison::LessThan => lhs < rhs,
            Comparison::LessOrEqual => lhs <= rhs,
        },
        _ => panic!("verified: comparison operands share a type"),
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use sb_builder::{AssemblyBuilder, FunctionBuilder};

    use super::*;

    fn run_main(assembly: &Assembly) -> Option<Value> {
        Interpreter::new(assembly).run("main()").unwrap()
    }

    #[test]
    fn test_add() {
        let mut main = FunctionBuilder::new("main").returns(VMType::INT);
        main.load_int(2).load_int(4).add_int().ret();
        let assembly = AssemblyBuilder::new("test").function(main.build()).build();
        assert_eq!(run_main(&assembly), Some(Value::Int(6)));
    }

    #[test]
    fn test_sub_operand_order() {
        let mut main = FunctionBuilder::new("main").returns(VMType::INT);
        main.load_int(10).load_int(3).sub_int().ret();
        let assembly = AssemblyBuilder::new("test").function(main.build()).build();
        assert_eq!(run_main(&assembly), Some(Value::Int(7)));
    }

    #[test]
    fn test_branch_taken() {
        let mut main = FunctionBuilder::new("main").returns(VMType::INT);
        let result = main.local(VMType::INT);
        main.load_int(4)
            .load_int(4)
            .branch_equal(6)
            .load_int(5)
            .store_local(result)
            .branch(8)
            .load_int(15)
            .store_local(result)
            .load_local(result)
            .ret();
        let assembly = AssemblyBuilder::new("test").function(main.build()).build();
        assert_eq!(run_main(&assembly), Some(Value::Int(15)));
    }

    #[test]
    fn test_call() {
        let mut double = FunctionBuilder::new("double").returns(VMType::INT);
        let x = double.param(VMType::INT);
        double.load_argument(x).load_argument(x).add_int().ret();

        let mut main = FunctionBuilder::new("main").returns(VMType::INT);
        main.load_int(21).call("double", vec![VMType::INT]).ret();

        let assembly = AssemblyBuilder::new("test")
            .function(double.build())
            .function(main.build())
            .build();
        assert_eq!(run_main(&assembly), Some(Value::Int(42)));
    }

    #[test]
    fn test_float_arithmetic() {
        let mut main = FunctionBuilder::new("main").returns(VMType::FLOAT);
        main.load_float(1.5).load_float(2.25).add_float().ret();
        let assembly = AssemblyBuilder::new("test").function(main.build()).build();
        assert_eq!(run_main(&assembly), Some(Value::Float(3.75)));
    }

    #[test]
    fn test_divide_by_zero() {
        let mut main = FunctionBuilder::new("main").returns(VMType::INT);
        main.load_int(1).load_int(0).div_int().ret();
        let assembly = AssemblyBuilder::new("test").function(main.build()).build();
        let err = Interpreter::new(&assembly).run("main()").unwrap_err();
        assert!(matches!(err, InterpreterError::DivideByZero { .. }));
    }

    #[test]
    fn test_instruction_limit() {
        let mut main = FunctionBuilder::new("main").returns(VMType::INT);
        main.branch(0).load_int(0).ret();
        let assembly = AssemblyBuilder::new("test").function(main.build()).build();
        let err = Interpreter::new(&assembly)
            .with_instruction_limit(1000)
            .run("main()")
            .unwrap_err();
        assert!(matches!(
            err,
            InterpreterError::InstructionLimitExceeded { .. }
        ));
    }

    #[test]
    fn test_external_call_is_refused() {
        // "host(Int)" is bound on the JIT side only; the interpreter
        // cannot dispatch it.
        let mut main = FunctionBuilder::new("main").returns(VMType::INT);
        main.load_int(1).call("host", vec![VMType::INT]).ret();
        let assembly = AssemblyBuilder::new("test").function(main.build()).build();
        let err = Interpreter::new(&assembly).run("main()").unwrap_err();
        assert_eq!(
            err,
            InterpreterError::ExternalCall {
                signature: alloc::string::String::from("host(Int)")
            }
        );
    }

    #[test]
    fn test_missing_entry_function() {
        let mut other = FunctionBuilder::new("other").returns(VMType::INT);
        other.load_int(0).ret();
        let assembly = AssemblyBuilder::new("test").function(other.build()).build();
        let err = Interpreter::new(&assembly).run("main()").unwrap_err();
        assert!(matches!(err, InterpreterError::UndefinedFunction { .. }));
    }

    #[test]
    fn test_trace_logging() {
        let mut main = FunctionBuilder::new("main").returns(VMType::INT);
        main.load_int(0).ret();
        let assembly = AssemblyBuilder::new("test").function(main.build()).build();

        let mut interpreter = Interpreter::new(&assembly).with_log_level(LogLevel::Instructions);
        interpreter.run("main()").unwrap();
        assert!(interpreter.trace().len() >= 3);
    }
}

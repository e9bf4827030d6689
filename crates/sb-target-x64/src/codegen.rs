//! Code generation.
//!
//! Translates virtual instructions into x64 machine code. Values are
//! computed through scratch registers (rax/rcx/rdx and xmm0/xmm1) and
//! stored to their home location: a frame slot per virtual register in
//! stack-mirror mode, or the allocated hardware register (frame slot
//! when spilled) in optimized mode. Branches and calls whose targets
//! are unknown at emission time are recorded for later patching.

use sb_ir::{Binder, Comparison, Function, Instruction};
use x64_encoder::{self as enc, Condition, Gpr, Xmm};

use crate::abi;
use crate::frame::FrameLayout;
use crate::lower::{LoweredFunction, RegisterKind, VirtualRegister};
use crate::regalloc::RegisterAllocation;
use crate::JitError;

/// How a call site's patched operand addresses its callee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallAddressing {
    /// 32-bit displacement relative to the end of the call instruction.
    Relative,
    /// 64-bit absolute address (indirect call through a register).
    Absolute,
}

/// A native branch whose displacement awaits the target's address.
#[derive(Debug, Clone)]
pub struct UnresolvedBranchTarget {
    /// Offset of the 32-bit displacement within the generated code.
    pub patch_offset: usize,
    /// Target bytecode instruction index within the same function.
    pub target: usize,
}

/// A native call whose operand awaits the callee's address.
#[derive(Debug, Clone)]
pub struct UnresolvedFunctionCall {
    /// Offset of the operand within the generated code.
    pub patch_offset: usize,
    /// Signature key of the callee.
    pub callee: String,
    pub addressing: CallAddressing,
}

/// Patch records produced while emitting one function.
#[derive(Debug, Default)]
pub struct FunctionFixups {
    pub branches: Vec<UnresolvedBranchTarget>,
    pub calls: Vec<UnresolvedFunctionCall>,
}

enum IntLocation {
    Register(Gpr),
    Frame(i32),
}

enum FloatLocation {
    Register(Xmm),
    Frame(i32),
}

struct CodeGenerator<'a> {
    function: &'a Function,
    binder: &'a Binder,
    lowered: &'a LoweredFunction,
    allocation: &'a RegisterAllocation,
    frame: FrameLayout,
    code: Vec<u8>,
    mapping: Vec<usize>,
    fixups: FunctionFixups,
}

/// Emit machine code for a verified, lowered function.
///
/// On success the function's `generated_code` and `instruction_mapping`
/// are populated and the unresolved branch/call records are returned.
pub fn generate_function(
    function: &mut Function,
    binder: &Binder,
    lowered: &LoweredFunction,
    allocation: &RegisterAllocation,
) -> Result<FunctionFixups, JitError> {
    let frame = compute_frame(function, lowered, allocation);

    let mut generator = CodeGenerator {
        function,
        binder,
        lowered,
        allocation,
        frame,
        code: Vec::new(),
        mapping: Vec::new(),
        fixups: FunctionFixups::default(),
    };

    generator.emit_prologue();
    for index in 0..lowered.instructions.len() {
        generator.mapping.push(generator.code.len());
        generator.emit_instruction(index)?;
    }

    let CodeGenerator { code, mapping, fixups, .. } = generator;
    function.generated_code = code;
    function.instruction_mapping = mapping;
    Ok(fixups)
}

fn compute_frame(
    function: &Function,
    lowered: &LoweredFunction,
    allocation: &RegisterAllocation,
) -> FrameLayout {
    let mut has_calls = false;
    let mut max_outgoing_args = 0usize;
    for instruction in function.instructions() {
        if let Instruction::Call(signature) = instruction {
            has_calls = true;
            max_outgoing_args = max_outgoing_args.max(signature.parameters().len());
        }
    }

    if function.optimize {
        let mut int_pool_indices: Vec<u8> = Vec::new();
        let mut float_pool_indices: Vec<u8> = Vec::new();
        for (register, &hardware) in allocation.assignments() {
            match register.kind {
                RegisterKind::Integer => {
                    if !int_pool_indices.contains(&hardware) {
                        int_pool_indices.push(hardware);
                    }
                }
                RegisterKind::Float => {
                    if !float_pool_indices.contains(&hardware) {
                        float_pool_indices.push(hardware);
                    }
                }
            }
        }
        int_pool_indices.sort_unstable();
        float_pool_indices.sort_unstable();

        let saved_gprs = int_pool_indices
            .into_iter()
            .map(|index| abi::INT_REGISTER_POOL[index as usize])
            .collect();
        let saved_xmms = float_pool_indices
            .into_iter()
            .map(|index| abi::FLOAT_REGISTER_POOL[index as usize])
            .collect();

        FrameLayout::compute(
            saved_gprs,
            saved_xmms,
            allocation.num_spilled(),
            has_calls,
            max_outgoing_args,
        )
    } else {
        // Stack-mirror mode: one slot per operand-stack position plus
        // one per local; the slot index is the virtual-register number.
        let slot_count = lowered.stack_registers as usize + function.locals().len();
        FrameLayout::compute(Vec::new(), Vec::new(), slot_count, has_calls, max_outgoing_args)
    }
}

impl<'a> CodeGenerator<'a> {
    fn int_location(&self, register: VirtualRegister) -> Option<IntLocation> {
        if !self.function.optimize {
            return Some(IntLocation::Frame(
                self.frame.slot_offset(register.number as usize),
            ));
        }
        if let Some(hardware) = self.allocation.hardware_register(register) {
            return Some(IntLocation::Register(
                abi::INT_REGISTER_POOL[hardware as usize],
            ));
        }
        self.allocation
            .spill_slot(register)
            .map(|slot| IntLocation::Frame(self.frame.slot_offset(slot as usize)))
    }

    fn float_location(&self, register: VirtualRegister) -> Option<FloatLocation> {
        if !self.function.optimize {
            return Some(FloatLocation::Frame(
                self.frame.slot_offset(register.number as usize),
            ));
        }
        if let Some(hardware) = self.allocation.hardware_register(register) {
            return Some(FloatLocation::Register(
                abi::FLOAT_REGISTER_POOL[hardware as usize],
            ));
        }
        self.allocation
            .spill_slot(register)
            .map(|slot| FloatLocation::Frame(self.frame.slot_offset(slot as usize)))
    }

    fn load_int(&mut self, register: VirtualRegister, destination: Gpr) {
        match self
            .int_location(register)
            .expect("used registers have a location")
        {
            IntLocation::Register(source) => enc::mov_reg_reg(&mut self.code, destination, source),
            IntLocation::Frame(offset) => enc::mov_reg_frame(&mut self.code, destination, offset),
        }
    }

    /// Store a scratch register to a def's home. A def that is never
    /// used has no home and the value is simply dropped.
    fn store_int(&mut self, register: VirtualRegister, source: Gpr) {
        match self.int_location(register) {
            Some(IntLocation::Register(destination)) => {
                enc::mov_reg_reg(&mut self.code, destination, source)
            }
            Some(IntLocation::Frame(offset)) => {
                enc::mov_frame_reg(&mut self.code, offset, source)
            }
            None => {}
        }
    }

    fn load_float(&mut self, register: VirtualRegister, destination: Xmm) {
        match self
            .float_location(register)
            .expect("used registers have a location")
        {
            FloatLocation::Register(source) => {
                enc::movaps_xmm_xmm(&mut self.code, destination, source)
            }
            FloatLocation::Frame(offset) => {
                enc::movss_xmm_frame(&mut self.code, destination, offset)
            }
        }
    }

    fn store_float(&mut self, register: VirtualRegister, source: Xmm) {
        match self.float_location(register) {
            Some(FloatLocation::Register(destination)) => {
                enc::movaps_xmm_xmm(&mut self.code, destination, source)
            }
            Some(FloatLocation::Frame(offset)) => {
                enc::movss_frame_xmm(&mut self.code, offset, source)
            }
            None => {}
        }
    }

    fn emit_prologue(&mut self) {
        enc::push_reg(&mut self.code, Gpr::RBP);
        enc::mov_reg_reg(&mut self.code, Gpr::RBP, Gpr::RSP);

        for index in 0..self.frame.saved_gprs.len() {
            enc::push_reg(&mut self.code, self.frame.saved_gprs[index]);
        }
        if self.frame.frame_size > 0 {
            enc::sub_rsp_imm32(&mut self.code, self.frame.frame_size as i32);
        }
        for index in 0..self.frame.saved_xmms.len() {
            let offset = self.frame.xmm_save_offset(index);
            enc::movups_frame_xmm(&mut self.code, offset, self.frame.saved_xmms[index]);
        }

        // Store incoming register arguments to their home slots; stack
        // arguments already live there.
        let parameters = self.function.signature().parameters().to_vec();
        for (index, parameter) in parameters.iter().enumerate().take(4) {
            let home = abi::argument_home_offset(index);
            if parameter.is_float() {
                let register = abi::float_arg_register(index)
                    .expect("first four arguments have registers");
                enc::movss_frame_xmm(&mut self.code, home, register);
            } else {
                let register = abi::int_arg_register(index)
                    .expect("first four arguments have registers");
                enc::mov_frame_reg(&mut self.code, home, register);
            }
        }
    }

    fn emit_epilogue(&mut self) {
        for index in 0..self.frame.saved_xmms.len() {
            let offset = self.frame.xmm_save_offset(index);
            enc::movups_xmm_frame(&mut self.code, self.frame.saved_xmms[index], offset);
        }
        enc::lea_rsp_frame(&mut self.code, self.frame.restore_point());
        for index in (0..self.frame.saved_gprs.len()).rev() {
            enc::pop_reg(&mut self.code, self.frame.saved_gprs[index]);
        }
        enc::pop_reg(&mut self.code, Gpr::RBP);
        enc::ret(&mut self.code);
    }

    fn emit_instruction(&mut self, index: usize) -> Result<(), JitError> {
        let virtual_instruction = &self.lowered.instructions[index];
        let uses = virtual_instruction.uses.clone();
        let def = virtual_instruction.def;
        let instruction = virtual_instruction.instruction.clone();

        match instruction {
            // The popped value just ceases to exist; its slot or
            // register is reused by the next push.
            Instruction::Pop => {}
            Instruction::LoadInt(value) => {
                enc::mov_reg_imm32(&mut self.code, Gpr::RAX, value);
                self.store_int(def.expect("LoadInt defines"), Gpr::RAX);
            }
            Instruction::LoadFloat(value) => {
                enc::mov_reg_imm32(&mut self.code, Gpr::RAX, value.to_bits() as i32);
                enc::movd_xmm_reg(&mut self.code, Xmm::XMM0, Gpr::RAX);
                self.store_float(def.expect("LoadFloat defines"), Xmm::XMM0);
            }
            Instruction::AddInt | Instruction::SubInt | Instruction::MulInt => {
                self.load_int(uses[1], Gpr::RAX);
                self.load_int(uses[0], Gpr::RCX);
                match instruction {
                    Instruction::AddInt => enc::add_reg_reg(&mut self.code, Gpr::RAX, Gpr::RCX),
                    Instruction::SubInt => enc::sub_reg_reg(&mut self.code, Gpr::RAX, Gpr::RCX),
                    _ => enc::imul_reg_reg(&mut self.code, Gpr::RAX, Gpr::RCX),
                }
                self.store_int(def.expect("arithmetic defines"), Gpr::RAX);
            }
            Instruction::DivInt => {
                self.load_int(uses[1], Gpr::RAX);
                self.load_int(uses[0], Gpr::RCX);
                enc::cdq(&mut self.code);
                enc::idiv_reg(&mut self.code, Gpr::RCX);
                self.store_int(def.expect("arithmetic defines"), Gpr::RAX);
            }
            Instruction::AddFloat
            | Instruction::SubFloat
            | Instruction::MulFloat
            | Instruction::DivFloat => {
                self.load_float(uses[1], Xmm::XMM0);
                self.load_float(uses[0], Xmm::XMM1);
                match instruction {
                    Instruction::AddFloat => {
                        enc::addss_xmm_xmm(&mut self.code, Xmm::XMM0, Xmm::XMM1)
                    }
                    Instruction::SubFloat => {
                        enc::subss_xmm_xmm(&mut self.code, Xmm::XMM0, Xmm::XMM1)
                    }
                    Instruction::MulFloat => {
                        enc::mulss_xmm_xmm(&mut self.code, Xmm::XMM0, Xmm::XMM1)
                    }
                    _ => enc::divss_xmm_xmm(&mut self.code, Xmm::XMM0, Xmm::XMM1),
                }
                self.store_float(def.expect("arithmetic defines"), Xmm::XMM0);
            }
            Instruction::Call(signature) => {
                self.emit_call(&signature, &uses, def)?;
            }
            Instruction::Ret => {
                let return_type = self.function.return_type();
                if !return_type.is_void() {
                    if return_type.is_float() {
                        self.load_float(uses[0], Xmm::XMM0);
                    } else {
                        self.load_int(uses[0], Gpr::RAX);
                    }
                }
                self.emit_epilogue();
            }
            Instruction::LoadArgument(argument) => {
                let home = abi::argument_home_offset(argument as usize);
                let parameter = self.function.signature().parameters()[argument as usize];
                if parameter.is_float() {
                    enc::movss_xmm_frame(&mut self.code, Xmm::XMM0, home);
                    self.store_float(def.expect("LoadArgument defines"), Xmm::XMM0);
                } else {
                    enc::mov_reg_frame(&mut self.code, Gpr::RAX, home);
                    self.store_int(def.expect("LoadArgument defines"), Gpr::RAX);
                }
            }
            Instruction::LoadLocal(_) | Instruction::StoreLocal(_) => {
                // Both are a move between a stack register and the
                // local's dedicated register.
                let source = uses[0];
                let destination = def.expect("local moves define");
                match source.kind {
                    RegisterKind::Integer => {
                        self.load_int(source, Gpr::RAX);
                        self.store_int(destination, Gpr::RAX);
                    }
                    RegisterKind::Float => {
                        self.load_float(source, Xmm::XMM0);
                        self.store_float(destination, Xmm::XMM0);
                    }
                }
            }
            Instruction::Branch(target) => {
                let patch_offset = enc::jmp_rel32(&mut self.code);
                self.fixups.branches.push(UnresolvedBranchTarget {
                    patch_offset,
                    target: target as usize,
                });
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
                let condition = match uses[0].kind {
                    RegisterKind::Integer => {
                        self.load_int(uses[1], Gpr::RAX);
                        self.load_int(uses[0], Gpr::RCX);
                        enc::cmp_reg_reg(&mut self.code, Gpr::RAX, Gpr::RCX);
                        int_condition(comparison)
                    }
                    RegisterKind::Float => {
                        self.load_float(uses[1], Xmm::XMM0);
                        self.load_float(uses[0], Xmm::XMM1);
                        enc::ucomiss_xmm_xmm(&mut self.code, Xmm::XMM0, Xmm::XMM1);
                        float_condition(comparison)
                    }
                };
                let patch_offset = enc::jcc_rel32(&mut self.code, condition);
                self.fixups.branches.push(UnresolvedBranchTarget {
                    patch_offset,
                    target: target as usize,
                });
            }
        }
        Ok(())
    }

    fn emit_call(
        &mut self,
        signature: &sb_ir::FunctionSignature,
        uses: &[VirtualRegister],
        def: Option<VirtualRegister>,
    ) -> Result<(), JitError> {
        let key = signature.key();
        let definition = self
            .binder
            .resolve(&key)
            .ok_or_else(|| JitError::UnknownFunction {
                signature: key.clone(),
            })?;
        let is_managed = definition.is_managed();
        let return_type = definition.return_type();

        let parameters = signature.parameters().to_vec();
        let count = parameters.len();

        // Stack arguments first (they go through the scratch registers
        // the register arguments are loaded into afterwards).
        for (index, parameter) in parameters.iter().enumerate().skip(4) {
            let register = uses[count - 1 - index];
            let offset = abi::outgoing_argument_offset(index);
            if parameter.is_float() {
                self.load_float(register, Xmm::XMM0);
                enc::movss_outgoing_xmm(&mut self.code, offset, Xmm::XMM0);
            } else {
                self.load_int(register, Gpr::RAX);
                enc::mov_outgoing_reg(&mut self.code, offset, Gpr::RAX);
            }
        }

        for (index, parameter) in parameters.iter().enumerate().take(4) {
            let register = uses[count - 1 - index];
            if parameter.is_float() {
                let destination =
                    abi::float_arg_register(index).expect("first four arguments have registers");
                self.load_float(register, destination);
            } else {
                let destination =
                    abi::int_arg_register(index).expect("first four arguments have registers");
                self.load_int(register, destination);
            }
        }

        if is_managed {
            let patch_offset = enc::call_rel32(&mut self.code);
            self.fixups.calls.push(UnresolvedFunctionCall {
                patch_offset,
                callee: key,
                addressing: CallAddressing::Relative,
            });
        } else {
            let patch_offset = enc::mov_reg_imm64(&mut self.code, Gpr::RAX, 0);
            self.fixups.calls.push(UnresolvedFunctionCall {
                patch_offset,
                callee: key,
                addressing: CallAddressing::Absolute,
            });
            enc::call_reg(&mut self.code, Gpr::RAX);
        }

        if !return_type.is_void() {
            let destination = def.expect("non-void calls define");
            if return_type.is_float() {
                self.store_float(destination, Xmm::XMM0);
            } else {
                self.store_int(destination, Gpr::RAX);
            }
        }
        Ok(())
    }
}

fn int_condition(comparison: Comparison) -> Condition {
    match comparison {
        Comparison::Equal => Condition::Equal,
        Comparison::NotEqual => Condition::NotEqual,
        Comparison::GreaterThan => Condition::GreaterThan,
        Comparison::GreaterOrEqual => Condition::GreaterOrEqual,
        Comparison::LessThan => Condition::LessThan,
        Comparison::LessOrEqual => Condition::LessOrEqual,
    }
}

/// `ucomiss` sets the carry/zero flags like an unsigned compare.
fn float_condition(comparison: Comparison) -> Condition {
    match comparison {
        Comparison::Equal => Condition::Equal,
        Comparison::NotEqual => Condition::NotEqual,
        Comparison::GreaterThan => Condition::Above,
        Comparison::GreaterOrEqual => Condition::AboveOrEqual,
        Comparison::LessThan => Condition::Below,
        Comparison::LessOrEqual => Condition::BelowOrEqual,
    }
}

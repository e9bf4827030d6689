//! x64 (Win64 ABI) JIT backend.
//!
//! This crate provides the compilation back half for the stack
//! bytecode:
//! - Virtual-register lowering
//! - Liveness analysis
//! - Linear-scan register allocation
//! - Frame layout and Win64 ABI tables
//! - Code generation with branch and call patching
//! - The code-page memory manager

pub mod abi;
pub mod codegen;
pub mod frame;
pub mod liveness;
pub mod lower;
pub mod memory;
pub mod regalloc;

use sb_ir::analysis::{build_basic_blocks, ControlFlowGraph};
use sb_ir::{Binder, Function};

use codegen::{generate_function, CallAddressing, FunctionFixups};
use liveness::compute_live_intervals;
use lower::{lower_function, RegisterKind};
use memory::{CodeMemory, MemoryError};
use regalloc::{allocate_registers, RegisterAllocation};

pub use codegen::{UnresolvedBranchTarget, UnresolvedFunctionCall};
pub use liveness::LiveInterval;
pub use lower::{LoweredFunction, VirtualInstruction, VirtualRegister};

/// Register-allocation knobs.
///
/// Zero registers forces every interval of that kind to spill.
#[derive(Debug, Clone, Copy)]
pub struct JitSettings {
    pub num_int_registers: usize,
    pub num_float_registers: usize,
}

impl Default for JitSettings {
    fn default() -> Self {
        Self {
            num_int_registers: 7,
            num_float_registers: 7,
        }
    }
}

/// Errors raised by the backend.
#[derive(Debug)]
pub enum JitError {
    /// The code-page manager failed.
    Memory(MemoryError),
    /// A call site names a signature the binder does not know.
    UnknownFunction { signature: String },
    /// A callee has no native address at patch time.
    UnresolvedCall { signature: String },
    /// A patched displacement does not fit in 32 bits.
    DisplacementOverflow { function: String },
}

impl std::fmt::Display for JitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JitError::Memory(err) => write!(f, "{}", err),
            JitError::UnknownFunction { signature } => {
                write!(f, "The function '{}' is not defined.", signature)
            }
            JitError::UnresolvedCall { signature } => {
                write!(f, "The function '{}' has no entry point.", signature)
            }
            JitError::DisplacementOverflow { function } => {
                write!(f, "Branch displacement overflow in function '{}'.", function)
            }
        }
    }
}

impl From<MemoryError> for JitError {
    fn from(err: MemoryError) -> Self {
        JitError::Memory(err)
    }
}

/// The JIT compiler: runs the pipeline per function, then places,
/// patches, and protects the emitted code for a whole assembly.
pub struct JitCompiler {
    settings: JitSettings,
    memory: CodeMemory,
    fixups: Vec<(String, FunctionFixups)>,
}

impl JitCompiler {
    /// Create a compiler with default settings.
    pub fn new() -> Self {
        Self::with_settings(JitSettings::default())
    }

    /// Create a compiler with the given settings.
    pub fn with_settings(settings: JitSettings) -> Self {
        Self {
            settings,
            memory: CodeMemory::new(),
            fixups: Vec::new(),
        }
    }

    /// Get the active settings.
    pub fn settings(&self) -> &JitSettings {
        &self.settings
    }

    /// Run the pipeline for one verified function: basic blocks, CFG,
    /// lowering, liveness, register allocation, code generation. The
    /// emitted code stays in the function until [`finalize`] places it.
    ///
    /// [`finalize`]: JitCompiler::finalize
    pub fn compile_function(
        &mut self,
        function: &mut Function,
        binder: &Binder,
    ) -> Result<(), JitError> {
        let blocks = build_basic_blocks(function);
        let cfg = ControlFlowGraph::from_blocks(&blocks);
        let lowered = lower_function(function, binder);
        let intervals = compute_live_intervals(&lowered, &blocks, &cfg);

        let int_intervals: Vec<LiveInterval> = intervals
            .iter()
            .copied()
            .filter(|interval| interval.register.kind == RegisterKind::Integer)
            .collect();
        let float_intervals: Vec<LiveInterval> = intervals
            .iter()
            .copied()
            .filter(|interval| interval.register.kind == RegisterKind::Float)
            .collect();

        // The pools bound how many registers a scan may hand out.
        let num_int = self
            .settings
            .num_int_registers
            .min(abi::INT_REGISTER_POOL.len());
        let num_float = self
            .settings
            .num_float_registers
            .min(abi::FLOAT_REGISTER_POOL.len());
        let allocation = RegisterAllocation::merge(
            allocate_registers(&int_intervals, num_int),
            allocate_registers(&float_intervals, num_float),
        );

        let fixups = generate_function(function, binder, &lowered, &allocation)?;

        #[cfg(feature = "debug-codegen")]
        {
            eprintln!("=== {} ===", function.signature().key());
            eprintln!(
                "{}",
                x64_encoder::disassemble_function(
                    &function.generated_code,
                    &function.instruction_mapping
                )
            );
        }

        self.fixups.push((function.signature().key(), fixups));
        Ok(())
    }

    /// Place all compiled functions into code pages, resolve branch and
    /// call patch sites, and flip the pages to executable.
    pub fn finalize(
        &mut self,
        functions: &mut [Function],
        binder: &mut Binder,
    ) -> Result<(), JitError> {
        // Place the emitted bytes and record every entry point.
        for function in functions.iter_mut() {
            let size = function.generated_code.len();
            let pointer = self.memory.allocate(size)?;
            unsafe {
                std::ptr::copy_nonoverlapping(function.generated_code.as_ptr(), pointer, size);
            }
            let entry_point = pointer as usize;
            function.entry_point = Some(entry_point);

            let key = function.signature().key();
            binder
                .set_entry_point(&key, entry_point)
                .map_err(|_| JitError::UnknownFunction { signature: key })?;
        }

        // Resolve the recorded patch sites in the placed code.
        for (key, fixups) in &self.fixups {
            let function = functions
                .iter()
                .find(|function| function.signature().key() == *key)
                .ok_or_else(|| JitError::UnknownFunction {
                    signature: key.clone(),
                })?;
            let entry_point = function
                .entry_point
                .ok_or_else(|| JitError::UnresolvedCall {
                    signature: key.clone(),
                })?;

            for branch in &fixups.branches {
                let target = entry_point + function.instruction_mapping[branch.target];
                let site = entry_point + branch.patch_offset;
                patch_relative(site, target, key)?;
            }

            for call in &fixups.calls {
                let callee = binder
                    .resolve(&call.callee)
                    .and_then(|definition| definition.address())
                    .ok_or_else(|| JitError::UnresolvedCall {
                        signature: call.callee.clone(),
                    })?;
                let site = entry_point + call.patch_offset;
                match call.addressing {
                    CallAddressing::Relative => patch_relative(site, callee, key)?,
                    CallAddressing::Absolute => unsafe {
                        std::ptr::copy_nonoverlapping(
                            (callee as u64).to_le_bytes().as_ptr(),
                            site as *mut u8,
                            8,
                        );
                    },
                }
            }
        }

        self.memory.make_executable()?;
        Ok(())
    }
}

impl Default for JitCompiler {
    fn default() -> Self {
        Self::new()
    }
}

/// Write the rel32 displacement from a 4-byte patch site to a target.
fn patch_relative(site: usize, target: usize, function: &str) -> Result<(), JitError> {
    let displacement = target as i64 - (site as i64 + 4);
    let displacement: i32 =
        displacement
            .try_into()
            .map_err(|_| JitError::DisplacementOverflow {
                function: String::from(function),
            })?;
    unsafe {
        std::ptr::copy_nonoverlapping(
            displacement.to_le_bytes().as_ptr(),
            site as *mut u8,
            4,
        );
    }
    Ok(())
}

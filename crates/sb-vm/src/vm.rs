//! The virtual machine.

use sb_ir::{verify, Assembly, Binder, Function, FunctionSignature, VMType};
use sb_target_x64::{JitCompiler, JitSettings};

use crate::error::VmError;

/// Signature of the compiled `main() Int` entry point.
pub type EntryPoint = extern "win64" fn() -> i32;

/// Key of the required entry function.
const ENTRY_KEY: &str = "main()";

/// A virtual machine instance.
///
/// Owns the binder, the JIT compiler (and through it all executable
/// memory), and the loaded functions. The pipeline is single-threaded
/// and synchronous; `compile` runs to completion on the calling thread.
pub struct VirtualMachine {
    binder: Binder,
    compiler: JitCompiler,
    functions: Vec<Function>,
    compiled: bool,
}

impl VirtualMachine {
    /// Create a VM with default settings.
    pub fn new() -> Self {
        Self::with_settings(JitSettings::default())
    }

    /// Create a VM with the given register-allocation settings.
    pub fn with_settings(settings: JitSettings) -> Self {
        Self {
            binder: Binder::new(),
            compiler: JitCompiler::with_settings(settings),
            functions: Vec::new(),
            compiled: false,
        }
    }

    /// Access the binder.
    pub fn binder(&self) -> &Binder {
        &self.binder
    }

    /// Register a host-side callable under the given signature.
    ///
    /// The trampoline must use the `win64` calling convention and match
    /// the declared signature.
    pub fn define_external(
        &mut self,
        signature: FunctionSignature,
        return_type: VMType,
        trampoline: usize,
    ) -> Result<(), VmError> {
        self.binder
            .define_external(signature, return_type, trampoline)?;
        Ok(())
    }

    /// Register an assembly's definitions and take ownership of its
    /// functions.
    ///
    /// On a duplicate signature the offending function is not
    /// registered and the error surfaces here; previously loaded
    /// functions remain loaded.
    pub fn load_assembly(&mut self, assembly: Assembly) -> Result<(), VmError> {
        for function in assembly.into_functions() {
            self.binder.define(function.definition().clone())?;
            self.functions.push(function);
        }
        Ok(())
    }

    /// Verify every loaded function, run the full pipeline, and make
    /// the emitted pages executable.
    pub fn compile(&mut self) -> Result<(), VmError> {
        self.check_entry_point()?;

        for function in &mut self.functions {
            verify(function, &self.binder)?;
        }
        for function in &mut self.functions {
            self.compiler.compile_function(function, &self.binder)?;
        }
        self.compiler
            .finalize(&mut self.functions, &mut self.binder)?;
        self.compiled = true;
        Ok(())
    }

    fn check_entry_point(&self) -> Result<(), VmError> {
        let definition = self
            .binder
            .resolve(ENTRY_KEY)
            .ok_or(VmError::NoEntryPoint)?;
        if definition.return_type() != VMType::INT {
            return Err(VmError::InvalidEntryPoint);
        }
        Ok(())
    }

    /// Get the compiled `main() Int` entry point.
    pub fn entry_point(&self) -> Result<EntryPoint, VmError> {
        if !self.compiled {
            return Err(VmError::NotCompiled);
        }
        self.check_entry_point()?;
        let address = self
            .entry_point_address(ENTRY_KEY)
            .ok_or(VmError::NoEntryPoint)?;
        // The address points at verified, compiled code of the correct
        // signature, placed in read/execute memory owned by this VM.
        Ok(unsafe { std::mem::transmute::<usize, EntryPoint>(address) })
    }

    /// Native address of any compiled function, by signature key.
    pub fn entry_point_address(&self, key: &str) -> Option<usize> {
        self.functions
            .iter()
            .find(|function| function.signature().key() == key)
            .and_then(|function| function.entry_point)
    }

    /// Compile (if needed) and invoke the entry point.
    pub fn execute(&mut self) -> Result<i32, VmError> {
        if !self.compiled {
            self.compile()?;
        }
        let entry = self.entry_point()?;
        Ok(entry())
    }

    /// The loaded functions, in load order.
    pub fn functions(&self) -> &[Function] {
        &self.functions
    }
}

impl Default for VirtualMachine {
    fn default() -> Self {
        Self::new()
    }
}

//! VM-level errors.

use sb_ir::{BinderError, VerificationError};
use sb_target_x64::JitError;

/// Errors surfaced at the host API boundary.
#[derive(Debug)]
pub enum VmError {
    /// Registering or resolving a definition failed.
    Binder(BinderError),
    /// A loaded function failed verification.
    Verification(VerificationError),
    /// The backend failed (code generation, patching, OS memory).
    Jit(JitError),
    /// No `main()` function is defined.
    NoEntryPoint,
    /// `main()` exists but does not return Int.
    InvalidEntryPoint,
    /// The entry point was requested before `compile`.
    NotCompiled,
}

impl std::fmt::Display for VmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VmError::Binder(err) => write!(f, "{}", err),
            VmError::Verification(err) => write!(f, "{}", err),
            VmError::Jit(err) => write!(f, "{}", err),
            VmError::NoEntryPoint => write!(f, "There is no entry point defined."),
            VmError::InvalidEntryPoint => write!(
                f,
                "Expected the main function to have the signature: 'main() Int'."
            ),
            VmError::NotCompiled => write!(f, "The virtual machine has not been compiled."),
        }
    }
}

impl std::error::Error for VmError {}

impl From<BinderError> for VmError {
    fn from(err: BinderError) -> Self {
        VmError::Binder(err)
    }
}

impl From<VerificationError> for VmError {
    fn from(err: VerificationError) -> Self {
        VmError::Verification(err)
    }
}

impl From<JitError> for VmError {
    fn from(err: JitError) -> Self {
        VmError::Jit(err)
    }
}

//! The binder: a signature-keyed registry of function definitions.

use alloc::{collections::BTreeMap, string::String};

use crate::{function::FunctionDefinition, signature::FunctionSignature, types::VMType};

/// Errors raised while registering or resolving definitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BinderError {
    /// A definition with the same signature key already exists.
    AlreadyDefined { signature: String },
    /// No definition exists for the given signature key.
    NotDefined { signature: String },
}

impl core::fmt::Display for BinderError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            BinderError::AlreadyDefined { signature } => {
                write!(f, "The function '{}' is already defined.", signature)
            }
            BinderError::NotDefined { signature } => {
                write!(f, "The function '{}' is not defined.", signature)
            }
        }
    }
}

/// Registry of all function definitions known to a VM instance.
///
/// Definitions are keyed by the textual signature `name(T0 T1 ...)`.
/// There is one binder per VM; components that need signature lookup
/// take it by reference.
#[derive(Debug, Default)]
pub struct Binder {
    definitions: BTreeMap<String, FunctionDefinition>,
}

impl Binder {
    /// Create an empty binder.
    pub fn new() -> Self {
        Self {
            definitions: BTreeMap::new(),
        }
    }

    /// Register a definition. Fails if the signature is already taken.
    pub fn define(&mut self, definition: FunctionDefinition) -> Result<(), BinderError> {
        let key = definition.signature().key();
        if self.definitions.contains_key(&key) {
            return Err(BinderError::AlreadyDefined { signature: key });
        }
        self.definitions.insert(key, definition);
        Ok(())
    }

    /// Register a host-side callable under the given signature.
    pub fn define_external(
        &mut self,
        signature: FunctionSignature,
        return_type: VMType,
        trampoline: usize,
    ) -> Result<(), BinderError> {
        self.define(FunctionDefinition::external(
            signature,
            return_type,
            trampoline,
        ))
    }

    /// Look up a definition by signature key.
    pub fn resolve(&self, key: &str) -> Option<&FunctionDefinition> {
        self.definitions.get(key)
    }

    /// Look up a definition by signature.
    pub fn resolve_signature(&self, signature: &FunctionSignature) -> Option<&FunctionDefinition> {
        self.resolve(&signature.key())
    }

    /// Record the compiled entry point of a managed definition.
    pub fn set_entry_point(&mut self, key: &str, entry_point: usize) -> Result<(), BinderError> {
        let definition =
            self.definitions
                .get_mut(key)
                .ok_or_else(|| BinderError::NotDefined {
                    signature: String::from(key),
                })?;
        definition.set_entry_point(entry_point);
        Ok(())
    }

    /// Iterate over all registered definitions.
    pub fn definitions(&self) -> impl Iterator<Item = &FunctionDefinition> {
        self.definitions.values()
    }
}

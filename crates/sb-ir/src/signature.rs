//! Function signatures.

use alloc::{string::String, vec::Vec};

use crate::types::VMType;

/// A function signature: a name plus the parameter types.
///
/// The textual form `name(T0 T1 ...)` is used as the lookup key in the
/// binder. The return type is deliberately not part of the signature;
/// two functions differing only in return type collide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSignature {
    name: String,
    parameters: Vec<VMType>,
}

impl FunctionSignature {
    /// Create a new signature.
    pub fn new(name: impl Into<String>, parameters: Vec<VMType>) -> Self {
        Self {
            name: name.into(),
            parameters,
        }
    }

    /// Get the function name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the parameter types.
    pub fn parameters(&self) -> &[VMType] {
        &self.parameters
    }

    /// Build the binder key: `name(T0 T1 ...)`.
    pub fn key(&self) -> String {
        use core::fmt::Write;

        let mut key = String::new();
        key.push_str(&self.name);
        key.push('(');
        for (i, param) in self.parameters.iter().enumerate() {
            if i > 0 {
                key.push(' ');
            }
            let _ = write!(key, "{}", param);
        }
        key.push(')');
        key
    }
}

impl core::fmt::Display for FunctionSignature {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.key())
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    #[test]
    fn test_key_no_parameters() {
        let sig = FunctionSignature::new("main", vec![]);
        assert_eq!(sig.key(), "main()");
    }

    #[test]
    fn test_key_with_parameters() {
        let sig = FunctionSignature::new("add", vec![VMType::INT, VMType::INT]);
        assert_eq!(sig.key(), "add(Int Int)");

        let sig = FunctionSignature::new("mix", vec![VMType::INT, VMType::FLOAT]);
        assert_eq!(sig.key(), "mix(Int Float)");
    }

    #[test]
    fn test_display_matches_key() {
        let sig = FunctionSignature::new("fib", vec![VMType::INT]);
        assert_eq!(alloc::format!("{}", sig), sig.key());
    }
}

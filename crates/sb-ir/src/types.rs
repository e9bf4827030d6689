//! Type system for the bytecode.

/// A primitive type known to the virtual machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    /// 32-bit signed integer
    Int,
    /// 32-bit floating point
    Float,
    /// No value (only valid as a return type)
    Void,
}

impl PrimitiveType {
    /// Get the name of this type as it appears in signature keys.
    pub fn name(&self) -> &'static str {
        match self {
            PrimitiveType::Int => "Int",
            PrimitiveType::Float => "Float",
            PrimitiveType::Void => "Void",
        }
    }
}

/// A handle to an interned type.
///
/// Two handles are equal iff they name the same type. The type universe
/// is closed (the three primitives), so the handle is a plain copyable
/// value rather than an index into a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VMType(PrimitiveType);

impl VMType {
    /// The interned Int type.
    pub const INT: VMType = VMType(PrimitiveType::Int);
    /// The interned Float type.
    pub const FLOAT: VMType = VMType(PrimitiveType::Float);
    /// The interned Void type.
    pub const VOID: VMType = VMType(PrimitiveType::Void);

    /// Intern a primitive type.
    pub fn primitive(primitive: PrimitiveType) -> Self {
        VMType(primitive)
    }

    /// Get the underlying primitive.
    pub fn as_primitive(&self) -> PrimitiveType {
        self.0
    }

    /// Get the name of this type as it appears in signature keys.
    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    /// Check if this is the Int type.
    pub fn is_integer(&self) -> bool {
        self.0 == PrimitiveType::Int
    }

    /// Check if this is the Float type.
    pub fn is_float(&self) -> bool {
        self.0 == PrimitiveType::Float
    }

    /// Check if this is the Void type.
    pub fn is_void(&self) -> bool {
        self.0 == PrimitiveType::Void
    }
}

impl core::fmt::Display for VMType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names() {
        assert_eq!(VMType::INT.name(), "Int");
        assert_eq!(VMType::FLOAT.name(), "Float");
        assert_eq!(VMType::VOID.name(), "Void");
    }

    #[test]
    fn test_type_kinds() {
        assert!(VMType::INT.is_integer());
        assert!(!VMType::INT.is_float());
        assert!(VMType::FLOAT.is_float());
        assert!(!VMType::FLOAT.is_integer());
        assert!(VMType::VOID.is_void());
    }

    #[test]
    fn test_handle_identity() {
        let a = VMType::primitive(PrimitiveType::Int);
        let b = VMType::primitive(PrimitiveType::Int);
        assert_eq!(a, b);
        assert_ne!(a, VMType::FLOAT);
    }
}

//! x64 registers.

/// An x64 general-purpose register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Gpr(u8);

impl Gpr {
    /// Create a new GPR from register number (0-15).
    ///
    /// # Panics
    ///
    /// Panics if the register number is >= 16.
    pub fn new(num: u8) -> Self {
        assert!(num < 16, "Register number must be < 16");
        Self(num)
    }

    /// Get the register number (0-15).
    pub fn num(&self) -> u8 {
        self.0
    }

    /// Low three encoding bits (the ModRM/opcode field).
    pub(crate) fn low3(&self) -> u8 {
        self.0 & 7
    }

    /// Whether encoding this register needs a REX extension bit.
    pub(crate) fn is_extended(&self) -> bool {
        self.0 >= 8
    }
}

impl Gpr {
    // Return value / scratch
    pub const RAX: Gpr = Gpr(0);
    // First integer argument (Win64) / scratch
    pub const RCX: Gpr = Gpr(1);
    // Second integer argument (Win64) / scratch, clobbered by CDQ/IDIV
    pub const RDX: Gpr = Gpr(2);
    // Callee-saved
    pub const RBX: Gpr = Gpr(3);
    // Stack pointer
    pub const RSP: Gpr = Gpr(4);
    // Frame pointer
    pub const RBP: Gpr = Gpr(5);
    // Callee-saved
    pub const RSI: Gpr = Gpr(6);
    // Callee-saved
    pub const RDI: Gpr = Gpr(7);
    // Third integer argument (Win64)
    pub const R8: Gpr = Gpr(8);
    // Fourth integer argument (Win64)
    pub const R9: Gpr = Gpr(9);
    // Volatile
    pub const R10: Gpr = Gpr(10);
    // Volatile
    pub const R11: Gpr = Gpr(11);
    // Callee-saved
    pub const R12: Gpr = Gpr(12);
    // Callee-saved
    pub const R13: Gpr = Gpr(13);
    // Callee-saved
    pub const R14: Gpr = Gpr(14);
    // Callee-saved
    pub const R15: Gpr = Gpr(15);

    /// The conventional register name.
    pub fn name(&self) -> &'static str {
        const NAMES: [&str; 16] = [
            "rax", "rcx", "rdx", "rbx", "rsp", "rbp", "rsi", "rdi", "r8", "r9", "r10", "r11",
            "r12", "r13", "r14", "r15",
        ];
        NAMES[self.0 as usize]
    }
}

/// An x64 SSE register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Xmm(u8);

impl Xmm {
    /// Create a new XMM register from register number (0-15).
    ///
    /// # Panics
    ///
    /// Panics if the register number is >= 16.
    pub fn new(num: u8) -> Self {
        assert!(num < 16, "Register number must be < 16");
        Self(num)
    }

    /// Get the register number (0-15).
    pub fn num(&self) -> u8 {
        self.0
    }

    pub(crate) fn low3(&self) -> u8 {
        self.0 & 7
    }

    pub(crate) fn is_extended(&self) -> bool {
        self.0 >= 8
    }
}

impl Xmm {
    // First float argument / return value (Win64) / scratch
    pub const XMM0: Xmm = Xmm(0);
    // Second float argument (Win64) / scratch
    pub const XMM1: Xmm = Xmm(1);
    // Third float argument (Win64)
    pub const XMM2: Xmm = Xmm(2);
    // Fourth float argument (Win64)
    pub const XMM3: Xmm = Xmm(3);
    pub const XMM4: Xmm = Xmm(4);
    pub const XMM5: Xmm = Xmm(5);
    // XMM6-XMM15 are callee-saved under Win64
    pub const XMM6: Xmm = Xmm(6);
    pub const XMM7: Xmm = Xmm(7);
    pub const XMM8: Xmm = Xmm(8);
    pub const XMM9: Xmm = Xmm(9);
    pub const XMM10: Xmm = Xmm(10);
    pub const XMM11: Xmm = Xmm(11);
    pub const XMM12: Xmm = Xmm(12);
    pub const XMM13: Xmm = Xmm(13);
    pub const XMM14: Xmm = Xmm(14);
    pub const XMM15: Xmm = Xmm(15);
}

impl core::fmt::Display for Gpr {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

impl core::fmt::Display for Xmm {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "xmm{}", self.0)
    }
}

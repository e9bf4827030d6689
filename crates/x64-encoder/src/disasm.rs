//! Disassembler for the emitted x64 subset.
//!
//! Decodes exactly the instructions the encoder produces; anything else
//! is reported as a raw byte. Intended as a debugging aid for inspecting
//! generated code, optionally grouped by source bytecode instruction via
//! the code generator's instruction mapping.

use alloc::{format, string::String};

const NAMES64: [&str; 16] = [
    "rax", "rcx", "rdx", "rbx", "rsp", "rbp", "rsi", "rdi", "r8", "r9", "r10", "r11", "r12",
    "r13", "r14", "r15",
];
const NAMES32: [&str; 16] = [
    "eax", "ecx", "edx", "ebx", "esp", "ebp", "esi", "edi", "r8d", "r9d", "r10d", "r11d", "r12d",
    "r13d", "r14d", "r15d",
];

fn gpr64(num: u8) -> &'static str {
    NAMES64[num as usize & 15]
}

fn gpr32(num: u8) -> &'static str {
    NAMES32[num as usize & 15]
}

fn xmm(num: u8) -> String {
    format!("xmm{}", num & 15)
}

fn cc_name(code: u8) -> &'static str {
    match code {
        0x2 => "b",
        0x3 => "ae",
        0x4 => "e",
        0x5 => "ne",
        0x6 => "be",
        0x7 => "a",
        0xC => "l",
        0xD => "ge",
        0xE => "le",
        0xF => "g",
        _ => "?",
    }
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn u8(&mut self) -> Option<u8> {
        let byte = *self.bytes.get(self.pos)?;
        self.pos += 1;
        Some(byte)
    }

    fn i32(&mut self) -> Option<i32> {
        let slice = self.bytes.get(self.pos..self.pos + 4)?;
        self.pos += 4;
        Some(i32::from_le_bytes([slice[0], slice[1], slice[2], slice[3]]))
    }

    fn u64(&mut self) -> Option<u64> {
        let slice = self.bytes.get(self.pos..self.pos + 8)?;
        self.pos += 8;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(slice);
        Some(u64::from_le_bytes(buf))
    }
}

struct ModRm {
    mode: u8,
    reg: u8,
    rm: u8,
}

fn modrm(cursor: &mut Cursor<'_>, rex_r: bool, rex_b: bool) -> Option<ModRm> {
    let byte = cursor.u8()?;
    Some(ModRm {
        mode: byte >> 6,
        reg: ((byte >> 3) & 7) | (u8::from(rex_r) << 3),
        rm: (byte & 7) | (u8::from(rex_b) << 3),
    })
}

/// Memory operand string for the encoder's addressing forms:
/// `[rbp+disp32]` (mod=10, rm=101) and `[rsp+disp32]` (mod=10, rm=100
/// with a plain SIB byte).
fn mem_operand(cursor: &mut Cursor<'_>, modrm: &ModRm) -> Option<String> {
    let base = if modrm.rm & 7 == 0b100 {
        cursor.u8()?; // SIB, always 0x24 in emitted code
        "rsp"
    } else {
        "rbp"
    };
    let disp = cursor.i32()?;
    if disp < 0 {
        Some(format!("[{} - {:#x}]", base, -(disp as i64)))
    } else {
        Some(format!("[{} + {:#x}]", base, disp))
    }
}

/// Decode one instruction, returning its text.
fn decode_one(cursor: &mut Cursor<'_>) -> Option<String> {
    let mut f3 = false;
    let mut op66 = false;
    let mut rex: u8 = 0;

    let mut opcode = cursor.u8()?;
    loop {
        match opcode {
            0xF3 => f3 = true,
            0x66 => op66 = true,
            0x40..=0x4F => rex = opcode,
            _ => break,
        }
        opcode = cursor.u8()?;
    }

    let rex_w = rex & 8 != 0;
    let rex_r = rex & 4 != 0;
    let rex_b = rex & 1 != 0;

    let text = match opcode {
        0x50..=0x57 => format!("push {}", gpr64((opcode - 0x50) | (u8::from(rex_b) << 3))),
        0x58..=0x5F => format!("pop {}", gpr64((opcode - 0x58) | (u8::from(rex_b) << 3))),
        0xB8..=0xBF => {
            let reg = (opcode - 0xB8) | (u8::from(rex_b) << 3);
            if rex_w {
                format!("mov {}, {:#x}", gpr64(reg), cursor.u64()?)
            } else {
                format!("mov {}, {}", gpr32(reg), cursor.i32()?)
            }
        }
        0x89 => {
            let m = modrm(cursor, rex_r, rex_b)?;
            if m.mode == 0b11 {
                format!("mov {}, {}", gpr64(m.rm), gpr64(m.reg))
            } else {
                format!("mov {}, {}", mem_operand(cursor, &m)?, gpr64(m.reg))
            }
        }
        0x8B => {
            let m = modrm(cursor, rex_r, rex_b)?;
            format!("mov {}, {}", gpr64(m.reg), mem_operand(cursor, &m)?)
        }
        0x8D => {
            let m = modrm(cursor, rex_r, rex_b)?;
            format!("lea {}, {}", gpr64(m.reg), mem_operand(cursor, &m)?)
        }
        0x01 => {
            let m = modrm(cursor, rex_r, rex_b)?;
            format!("add {}, {}", gpr32(m.rm), gpr32(m.reg))
        }
        0x29 => {
            let m = modrm(cursor, rex_r, rex_b)?;
            format!("sub {}, {}", gpr32(m.rm), gpr32(m.reg))
        }
        0x39 => {
            let m = modrm(cursor, rex_r, rex_b)?;
            format!("cmp {}, {}", gpr32(m.rm), gpr32(m.reg))
        }
        0x81 => {
            let m = modrm(cursor, rex_r, rex_b)?;
            let imm = cursor.i32()?;
            let mnemonic = match m.reg & 7 {
                0 => "add",
                5 => "sub",
                _ => "?",
            };
            format!("{} {}, {:#x}", mnemonic, gpr64(m.rm), imm)
        }
        0x99 => String::from("cdq"),
        0xF7 => {
            let m = modrm(cursor, rex_r, rex_b)?;
            format!("idiv {}", gpr32(m.rm))
        }
        0xC3 => String::from("ret"),
        0xE8 => {
            let disp = cursor.i32()?;
            format!("call {:+}", disp)
        }
        0xE9 => {
            let disp = cursor.i32()?;
            format!("jmp {:+}", disp)
        }
        0xFF => {
            let m = modrm(cursor, rex_r, rex_b)?;
            format!("call {}", gpr64(m.rm))
        }
        0x0F => {
            let second = cursor.u8()?;
            match second {
                0x80..=0x8F => {
                    let disp = cursor.i32()?;
                    format!("j{} {:+}", cc_name(second - 0x80), disp)
                }
                0xAF => {
                    let m = modrm(cursor, rex_r, rex_b)?;
                    format!("imul {}, {}", gpr32(m.reg), gpr32(m.rm))
                }
                0x10 | 0x11 => {
                    let mnemonic = if f3 { "movss" } else { "movups" };
                    let m = modrm(cursor, rex_r, rex_b)?;
                    let mem = mem_operand(cursor, &m)?;
                    if second == 0x10 {
                        format!("{} {}, {}", mnemonic, xmm(m.reg), mem)
                    } else {
                        format!("{} {}, {}", mnemonic, mem, xmm(m.reg))
                    }
                }
                0x28 => {
                    let m = modrm(cursor, rex_r, rex_b)?;
                    format!("movaps {}, {}", xmm(m.reg), xmm(m.rm))
                }
                0x2E => {
                    let m = modrm(cursor, rex_r, rex_b)?;
                    format!("ucomiss {}, {}", xmm(m.reg), xmm(m.rm))
                }
                0x58 | 0x59 | 0x5C | 0x5E => {
                    let mnemonic = match second {
                        0x58 => "addss",
                        0x59 => "mulss",
                        0x5C => "subss",
                        _ => "divss",
                    };
                    let m = modrm(cursor, rex_r, rex_b)?;
                    format!("{} {}, {}", mnemonic, xmm(m.reg), xmm(m.rm))
                }
                0x6E if op66 => {
                    let m = modrm(cursor, rex_r, rex_b)?;
                    format!("movd {}, {}", xmm(m.reg), gpr32(m.rm))
                }
                _ => format!(".byte 0x0f, {:#04x}", second),
            }
        }
        _ => format!(".byte {:#04x}", opcode),
    };

    Some(text)
}

/// Disassemble a byte buffer, one instruction per line with its offset.
pub fn disassemble_code(bytes: &[u8]) -> String {
    let mut cursor = Cursor { bytes, pos: 0 };
    let mut out = String::new();

    while cursor.pos < bytes.len() {
        let start = cursor.pos;
        match decode_one(&mut cursor) {
            Some(text) => {
                out.push_str(&format!("{:#06x}: {}\n", start, text));
            }
            None => {
                out.push_str(&format!("{:#06x}: <truncated>\n", start));
                break;
            }
        }
    }

    out
}

/// Disassemble a compiled function, grouping native instructions under
/// the bytecode instruction that produced them.
///
/// `instruction_mapping[k]` is the byte offset of the first native
/// instruction emitted for bytecode instruction `k`.
pub fn disassemble_function(bytes: &[u8], instruction_mapping: &[usize]) -> String {
    let mut out = String::new();
    let mut cursor = Cursor { bytes, pos: 0 };
    let mut next_mapped = 0usize;

    while cursor.pos < bytes.len() {
        let start = cursor.pos;
        while next_mapped < instruction_mapping.len() && instruction_mapping[next_mapped] == start
        {
            out.push_str(&format!("bytecode {}:\n", next_mapped));
            next_mapped += 1;
        }
        match decode_one(&mut cursor) {
            Some(text) => out.push_str(&format!("  {:#06x}: {}\n", start, text)),
            None => {
                out.push_str(&format!("  {:#06x}: <truncated>\n", start));
                break;
            }
        }
    }

    out
}

//! Decoding of the scalar unit's instruction words.
//!
//! All instructions are encoded in 32 bits, in the usual MIPS layouts:
//!
//! - Immediate
//!     - 6-bit op.
//!     - 5-bit base/source register.
//!     - 5-bit target register.
//!     - 16-bit immediate value.
//!
//! - Jump
//!     - 6-bit op.
//!     - 26-bit target address.
//!
//! - Register
//!     - 6-bit op.
//!     - 5-bit source register.
//!     - 5-bit target register.
//!     - 5-bit destination register.
//!     - 5-bit shift value.
//!     - 6-bit function field.
//!
//! On top of those the unit adds a vector class, marked by the top seven
//! bits, which reuses the register layout for `(vd, vs, vt)` sub-registers
//! plus a 4-bit lane selector, and vector load/store words that carry a
//! 5-bit sub-opcode where the destination register normally sits and a
//! 7-bit signed byte offset.

use super::cop::VectorOp;
use rusp_asm::Reg;
use rusp_util::Bit;

use std::fmt;

#[derive(Clone, Copy)]
pub struct Opcode(pub(super) u32);

impl Opcode {
    pub fn new(word: u32) -> Self {
        Opcode(word)
    }

    /// Primary operation.
    pub fn op(self) -> u32 {
        self.0.bit_range(26, 31)
    }

    /// Sub operation / function.
    pub fn special(self) -> u32 {
        self.0.bit_range(0, 5)
    }

    /// Coprocessor sub operation.
    pub fn cop_op(self) -> u32 {
        self.rs().0.into()
    }

    /// Immediate value.
    pub fn imm(self) -> u32 {
        self.0.bit_range(0, 15)
    }

    /// Sign-extended immediate value.
    pub fn signed_imm(self) -> u32 {
        let value = self.0.bit_range(0, 15) as i16;
        value as u32
    }

    /// Target address used for jump instructions.
    pub fn target(self) -> u32 {
        self.0.bit_range(0, 25)
    }

    pub fn shift(self) -> u32 {
        self.0.bit_range(6, 10)
    }

    /// Destination register.
    pub fn rd(self) -> Reg {
        Reg::from(self.0.bit_range(11, 15))
    }

    /// Target register.
    pub fn rt(self) -> Reg {
        Reg::from(self.0.bit_range(16, 20))
    }

    /// Source register.
    pub fn rs(self) -> Reg {
        Reg::from(self.0.bit_range(21, 25))
    }

    /// Control register selector for MFC0/MTC0.
    pub fn cop0_reg(self) -> u8 {
        (self.0.bit_range(11, 15) & 0xf) as u8
    }

    /// Lane selector carried by coprocessor moves and vector load/stores.
    pub fn element(self) -> u8 {
        self.0.bit_range(7, 10) as u8
    }

    /// Whether the word belongs to the vector compute class.
    pub fn is_vector(self) -> bool {
        self.0 >> 25 == 0x25
    }

    /// Decode the vector compute fields. Only meaningful when
    /// [`Self::is_vector`] holds.
    pub fn vector_op(self) -> VectorOp {
        VectorOp {
            funct: self.0.bit_range(0, 5) as u8,
            vd: self.0.bit_range(6, 10) as u8,
            vs: self.0.bit_range(11, 15) as u8,
            vt: self.0.bit_range(16, 20) as u8,
            e: self.0.bit_range(21, 24) as u8,
        }
    }

    /// Sub-opcode of a vector load/store, from the destination field.
    pub fn vec_op(self) -> u8 {
        self.0.bit_range(11, 15) as u8
    }

    /// Byte offset of a vector load/store, sign-extended from 7 bits.
    pub fn vec_offset(self) -> i32 {
        self.0.bit_range(0, 6).sign_extend(6) as i32
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_vector() {
            let vu = self.vector_op();
            return write!(
                f,
                "vu[{:02x}] v{} v{} v{}[{}]",
                vu.funct, vu.vd, vu.vs, vu.vt, vu.e
            );
        }
        match self.op() {
            0x0 => match self.special() {
                0x0 if self.0 == 0 => write!(f, "nop"),
                0x0 => write!(f, "sll {} {} {}", self.rd(), self.rt(), self.shift()),
                0x2 => write!(f, "srl {} {} {}", self.rd(), self.rt(), self.shift()),
                0x3 => write!(f, "sra {} {} {}", self.rd(), self.rt(), self.shift()),
                0x4 => write!(f, "sllv {} {} {}", self.rd(), self.rt(), self.rs()),
                0x6 => write!(f, "srlv {} {} {}", self.rd(), self.rt(), self.rs()),
                0x7 => write!(f, "srav {} {} {}", self.rd(), self.rt(), self.rs()),
                0x8 => write!(f, "jr {}", self.rs()),
                0x9 => write!(f, "jalr {} {}", self.rd(), self.rs()),
                0xd => write!(f, "break"),
                0x20 => write!(f, "add {} {} {}", self.rd(), self.rs(), self.rt()),
                0x21 => write!(f, "addu {} {} {}", self.rd(), self.rs(), self.rt()),
                0x22 => write!(f, "sub {} {} {}", self.rd(), self.rs(), self.rt()),
                0x23 => write!(f, "subu {} {} {}", self.rd(), self.rs(), self.rt()),
                0x24 => write!(f, "and {} {} {}", self.rd(), self.rs(), self.rt()),
                0x25 => write!(f, "or {} {} {}", self.rd(), self.rs(), self.rt()),
                0x26 => write!(f, "xor {} {} {}", self.rd(), self.rs(), self.rt()),
                0x27 => write!(f, "nor {} {} {}", self.rd(), self.rs(), self.rt()),
                0x2a => write!(f, "slt {} {} {}", self.rd(), self.rs(), self.rt()),
                0x2b => write!(f, "sltu {} {} {}", self.rd(), self.rs(), self.rt()),
                _ => write!(f, "reserved"),
            },
            0x1 => {
                let op = match self.rt().0 {
                    0x00 => "bltz",
                    0x01 => "bgez",
                    0x10 => "bltzal",
                    0x11 => "bgezal",
                    _ => return write!(f, "reserved"),
                };
                write!(f, "{} {} {}", op, self.rs(), self.signed_imm() as i32)
            }
            0x2 => write!(f, "j {:03x}", (self.target() << 2) & 0xffc),
            0x3 => write!(f, "jal {:03x}", (self.target() << 2) & 0xffc),
            0x4 => write!(f, "beq {} {} {}", self.rs(), self.rt(), self.signed_imm() as i32),
            0x5 => write!(f, "bne {} {} {}", self.rs(), self.rt(), self.signed_imm() as i32),
            0x6 => write!(f, "blez {} {}", self.rs(), self.signed_imm() as i32),
            0x7 => write!(f, "bgtz {} {}", self.rs(), self.signed_imm() as i32),
            0x8 => write!(f, "addi {} {} {}", self.rt(), self.rs(), self.signed_imm() as i32),
            0x9 => write!(f, "addiu {} {} {}", self.rt(), self.rs(), self.signed_imm() as i32),
            0xa => write!(f, "slti {} {} {}", self.rt(), self.rs(), self.signed_imm() as i32),
            0xb => write!(f, "sltiu {} {} {}", self.rt(), self.rs(), self.imm()),
            0xc => write!(f, "andi {} {} {:#x}", self.rt(), self.rs(), self.imm()),
            0xd => write!(f, "ori {} {} {:#x}", self.rt(), self.rs(), self.imm()),
            0xe => write!(f, "xori {} {} {:#x}", self.rt(), self.rs(), self.imm()),
            0xf => write!(f, "lui {} {:#x}", self.rt(), self.imm()),
            0x10 => match self.cop_op() {
                0x0 => write!(f, "mfc0 {} {}", self.rt(), self.cop0_reg()),
                0x4 => write!(f, "mtc0 {} {}", self.rt(), self.cop0_reg()),
                _ => write!(f, "reserved"),
            },
            0x12 => match self.cop_op() {
                0x0 => write!(f, "mfc2 {} v{}[{}]", self.rt(), self.rd().0, self.element()),
                0x2 => write!(f, "cfc2 {} {}", self.rt(), self.rd().0),
                0x4 => write!(f, "mtc2 {} v{}[{}]", self.rt(), self.rd().0, self.element()),
                0x6 => write!(f, "ctc2 {} {}", self.rt(), self.rd().0),
                _ => write!(f, "reserved"),
            },
            0x20 => write!(f, "lb {} {}({})", self.rt(), self.signed_imm() as i32, self.rs()),
            0x21 => write!(f, "lh {} {}({})", self.rt(), self.signed_imm() as i32, self.rs()),
            0x23 => write!(f, "lw {} {}({})", self.rt(), self.signed_imm() as i32, self.rs()),
            0x24 => write!(f, "lbu {} {}({})", self.rt(), self.signed_imm() as i32, self.rs()),
            0x25 => write!(f, "lhu {} {}({})", self.rt(), self.signed_imm() as i32, self.rs()),
            0x28 => write!(f, "sb {} {}({})", self.rt(), self.signed_imm() as i32, self.rs()),
            0x29 => write!(f, "sh {} {}({})", self.rt(), self.signed_imm() as i32, self.rs()),
            0x2b => write!(f, "sw {} {}({})", self.rt(), self.signed_imm() as i32, self.rs()),
            0x32 => write!(
                f,
                "lwc2[{:02x}] v{}[{}] {}({})",
                self.vec_op(), self.rt().0, self.element(), self.vec_offset(), self.rs(),
            ),
            0x3a => write!(
                f,
                "swc2[{:02x}] v{}[{}] {}({})",
                self.vec_op(), self.rt().0, self.element(), self.vec_offset(), self.rs(),
            ),
            _ => write!(f, "reserved"),
        }
    }
}

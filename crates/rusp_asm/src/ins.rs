use crate::Error;

use std::fmt;

/// A scalar register index in `0..32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reg(pub u8);

impl From<u32> for Reg {
    fn from(val: u32) -> Self {
        Reg(val as u8)
    }
}

impl From<u8> for Reg {
    fn from(val: u8) -> Self {
        Reg(val)
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        const NAMES: [&str; 32] = [
            "zero", "at", "v0", "v1", "a0", "a1", "a2", "a3", "t0", "t1", "t2", "t3", "t4", "t5",
            "t6", "t7", "s0", "s1", "s2", "s3", "s4", "s5", "s6", "s7", "t8", "t9", "k0", "k1",
            "gp", "sp", "fp", "ra",
        ];
        f.write_str(NAMES[self.0 as usize & 31])
    }
}

impl Reg {
    pub const ZERO: Reg = Reg(0);
    pub const AT: Reg = Reg(1);
    pub const V0: Reg = Reg(2);
    pub const V1: Reg = Reg(3);
    pub const A0: Reg = Reg(4);
    pub const A1: Reg = Reg(5);
    pub const A2: Reg = Reg(6);
    pub const A3: Reg = Reg(7);
    pub const T0: Reg = Reg(8);
    pub const T1: Reg = Reg(9);
    pub const T2: Reg = Reg(10);
    pub const T3: Reg = Reg(11);
    pub const T4: Reg = Reg(12);
    pub const T5: Reg = Reg(13);
    pub const T6: Reg = Reg(14);
    pub const T7: Reg = Reg(15);
    pub const S0: Reg = Reg(16);
    pub const S1: Reg = Reg(17);
    pub const SP: Reg = Reg(29);
    pub const RA: Reg = Reg(31);
}

/// One scalar-unit instruction.
///
/// Branch variants take the signed word offset from the delay slot, jump
/// variants the absolute byte address of the target. Loads and stores are
/// written `(target, offset, base)`, matching the usual `lw $t, off($b)`
/// notation. The vector load/store variants are
/// `(sub-opcode, vt, element, byte offset, base)`.
#[derive(Debug, Clone, Copy)]
pub enum Ins {
    Sll(Reg, Reg, u32),
    Srl(Reg, Reg, u32),
    Sra(Reg, Reg, u32),
    Sllv(Reg, Reg, Reg),
    Srlv(Reg, Reg, Reg),
    Srav(Reg, Reg, Reg),
    Jr(Reg),
    Jalr(Reg, Reg),
    Break,
    Add(Reg, Reg, Reg),
    Addu(Reg, Reg, Reg),
    Sub(Reg, Reg, Reg),
    Subu(Reg, Reg, Reg),
    And(Reg, Reg, Reg),
    Or(Reg, Reg, Reg),
    Xor(Reg, Reg, Reg),
    Nor(Reg, Reg, Reg),
    Slt(Reg, Reg, Reg),
    Sltu(Reg, Reg, Reg),
    Bltz(Reg, i32),
    Bgez(Reg, i32),
    Bltzal(Reg, i32),
    Bgezal(Reg, i32),
    J(u32),
    Jal(u32),
    Beq(Reg, Reg, i32),
    Bne(Reg, Reg, i32),
    Blez(Reg, i32),
    Bgtz(Reg, i32),
    Addi(Reg, Reg, i16),
    Addiu(Reg, Reg, i16),
    Slti(Reg, Reg, i16),
    Sltiu(Reg, Reg, i16),
    Andi(Reg, Reg, u16),
    Ori(Reg, Reg, u16),
    Xori(Reg, Reg, u16),
    Lui(Reg, u16),
    Mfc0(Reg, u8),
    Mtc0(Reg, u8),
    Mfc2(Reg, u8, u8),
    Cfc2(Reg, u8),
    Mtc2(Reg, u8, u8),
    Ctc2(Reg, u8),
    Lb(Reg, i16, Reg),
    Lh(Reg, i16, Reg),
    Lw(Reg, i16, Reg),
    Lbu(Reg, i16, Reg),
    Lhu(Reg, i16, Reg),
    Sb(Reg, i16, Reg),
    Sh(Reg, i16, Reg),
    Sw(Reg, i16, Reg),
    Lwc2(u8, u8, u8, i32, Reg),
    Swc2(u8, u8, u8, i32, Reg),
    /// A vector-class compute instruction: `(function, vd, vs, vt, element)`.
    Vec(u8, u8, u8, u8, u8),
    Nop,
    /// A raw instruction word, for encodings with no variant of their own.
    Word(u32),
}

fn special(funct: u32, rd: Reg, rs: Reg, rt: Reg, sa: u32) -> u32 {
    (u32::from(rs.0) << 21) | (u32::from(rt.0) << 16) | (u32::from(rd.0) << 11) | (sa << 6) | funct
}

fn imm_type(op: u32, rs: Reg, rt: Reg, imm: u16) -> u32 {
    (op << 26) | (u32::from(rs.0) << 21) | (u32::from(rt.0) << 16) | u32::from(imm)
}

fn branch(op: u32, rs: Reg, rt: Reg, offset: i32) -> Result<u32, Error> {
    let imm = i16::try_from(offset).map_err(|_| Error::BranchOffset(offset))?;
    Ok(imm_type(op, rs, rt, imm as u16))
}

fn jump(op: u32, target: u32) -> Result<u32, Error> {
    if target % 4 != 0 {
        return Err(Error::UnalignedTarget(target));
    }
    Ok((op << 26) | ((target >> 2) & 0x03ff_ffff))
}

fn cop(op: u32, sub: u32, rt: Reg, rd: u8, e: u8) -> Result<u32, Error> {
    field(rd.into(), 5)?;
    field(e.into(), 4)?;
    Ok((op << 26)
        | (sub << 21)
        | (u32::from(rt.0) << 16)
        | (u32::from(rd) << 11)
        | (u32::from(e) << 7))
}

fn vec_mem(op: u32, sub: u8, vt: u8, e: u8, offset: i32, base: Reg) -> Result<u32, Error> {
    field(sub.into(), 5)?;
    field(vt.into(), 5)?;
    field(e.into(), 4)?;
    if !(-64..64).contains(&offset) {
        return Err(Error::BranchOffset(offset));
    }
    Ok((op << 26)
        | (u32::from(base.0) << 21)
        | (u32::from(vt) << 16)
        | (u32::from(sub) << 11)
        | (u32::from(e) << 7)
        | (offset as u32 & 0x7f))
}

fn field(val: u32, bits: u32) -> Result<u32, Error> {
    if val >> bits != 0 {
        Err(Error::Field(val, bits))
    } else {
        Ok(val)
    }
}

impl Ins {
    pub fn encode(self) -> Result<u32, Error> {
        use Ins::*;

        let zero = Reg::ZERO;
        let word = match self {
            Sll(rd, rt, sa) => special(0x00, rd, zero, rt, field(sa, 5)?),
            Srl(rd, rt, sa) => special(0x02, rd, zero, rt, field(sa, 5)?),
            Sra(rd, rt, sa) => special(0x03, rd, zero, rt, field(sa, 5)?),
            Sllv(rd, rt, rs) => special(0x04, rd, rs, rt, 0),
            Srlv(rd, rt, rs) => special(0x06, rd, rs, rt, 0),
            Srav(rd, rt, rs) => special(0x07, rd, rs, rt, 0),
            Jr(rs) => special(0x08, zero, rs, zero, 0),
            Jalr(rd, rs) => special(0x09, rd, rs, zero, 0),
            Break => special(0x0d, zero, zero, zero, 0),
            Add(rd, rs, rt) => special(0x20, rd, rs, rt, 0),
            Addu(rd, rs, rt) => special(0x21, rd, rs, rt, 0),
            Sub(rd, rs, rt) => special(0x22, rd, rs, rt, 0),
            Subu(rd, rs, rt) => special(0x23, rd, rs, rt, 0),
            And(rd, rs, rt) => special(0x24, rd, rs, rt, 0),
            Or(rd, rs, rt) => special(0x25, rd, rs, rt, 0),
            Xor(rd, rs, rt) => special(0x26, rd, rs, rt, 0),
            Nor(rd, rs, rt) => special(0x27, rd, rs, rt, 0),
            Slt(rd, rs, rt) => special(0x2a, rd, rs, rt, 0),
            Sltu(rd, rs, rt) => special(0x2b, rd, rs, rt, 0),
            Bltz(rs, off) => branch(0x01, rs, Reg(0x00), off)?,
            Bgez(rs, off) => branch(0x01, rs, Reg(0x01), off)?,
            Bltzal(rs, off) => branch(0x01, rs, Reg(0x10), off)?,
            Bgezal(rs, off) => branch(0x01, rs, Reg(0x11), off)?,
            J(target) => jump(0x02, target)?,
            Jal(target) => jump(0x03, target)?,
            Beq(rs, rt, off) => branch(0x04, rs, rt, off)?,
            Bne(rs, rt, off) => branch(0x05, rs, rt, off)?,
            Blez(rs, off) => branch(0x06, rs, zero, off)?,
            Bgtz(rs, off) => branch(0x07, rs, zero, off)?,
            Addi(rt, rs, imm) => imm_type(0x08, rs, rt, imm as u16),
            Addiu(rt, rs, imm) => imm_type(0x09, rs, rt, imm as u16),
            Slti(rt, rs, imm) => imm_type(0x0a, rs, rt, imm as u16),
            Sltiu(rt, rs, imm) => imm_type(0x0b, rs, rt, imm as u16),
            Andi(rt, rs, imm) => imm_type(0x0c, rs, rt, imm),
            Ori(rt, rs, imm) => imm_type(0x0d, rs, rt, imm),
            Xori(rt, rs, imm) => imm_type(0x0e, rs, rt, imm),
            Lui(rt, imm) => imm_type(0x0f, zero, rt, imm),
            Mfc0(rt, rd) => cop(0x10, 0x00, rt, rd, 0)?,
            Mtc0(rt, rd) => cop(0x10, 0x04, rt, rd, 0)?,
            Mfc2(rt, rd, e) => cop(0x12, 0x00, rt, rd, e)?,
            Cfc2(rt, rd) => cop(0x12, 0x02, rt, rd, 0)?,
            Mtc2(rt, rd, e) => cop(0x12, 0x04, rt, rd, e)?,
            Ctc2(rt, rd) => cop(0x12, 0x06, rt, rd, 0)?,
            Lb(rt, off, base) => imm_type(0x20, base, rt, off as u16),
            Lh(rt, off, base) => imm_type(0x21, base, rt, off as u16),
            Lw(rt, off, base) => imm_type(0x23, base, rt, off as u16),
            Lbu(rt, off, base) => imm_type(0x24, base, rt, off as u16),
            Lhu(rt, off, base) => imm_type(0x25, base, rt, off as u16),
            Sb(rt, off, base) => imm_type(0x28, base, rt, off as u16),
            Sh(rt, off, base) => imm_type(0x29, base, rt, off as u16),
            Sw(rt, off, base) => imm_type(0x2b, base, rt, off as u16),
            Lwc2(sub, vt, e, off, base) => vec_mem(0x32, sub, vt, e, off, base)?,
            Swc2(sub, vt, e, off, base) => vec_mem(0x3a, sub, vt, e, off, base)?,
            Vec(funct, vd, vs, vt, e) => {
                (0x25 << 25)
                    | (field(e.into(), 4)? << 21)
                    | (field(vt.into(), 5)? << 16)
                    | (field(vs.into(), 5)? << 11)
                    | (field(vd.into(), 5)? << 6)
                    | field(funct.into(), 6)?
            }
            Nop => 0,
            Word(raw) => raw,
        };
        Ok(word)
    }
}

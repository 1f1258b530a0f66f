//! Instruction-word encoding for the signal processor's scalar unit.
//!
//! Instead of parsing assembly text, programs are written as slices of typed
//! [`Ins`] variants and encoded to the 32-bit words the core fetches. Mainly
//! used to build microcode for tests and debugging.

mod ins;

pub use ins::{Ins, Reg};

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("branch offset {0} does not fit in a 16-bit field")]
    BranchOffset(i32),

    #[error("jump target {0:#x} is not word aligned")]
    UnalignedTarget(u32),

    #[error("value {0} does not fit in a {1}-bit field")]
    Field(u32, u32),
}

/// Encode a program to the instruction words the core executes, in order.
pub fn assemble(program: &[Ins]) -> Result<Vec<u32>, Error> {
    program.iter().map(|ins| ins.encode()).collect()
}

#[test]
fn test_fields() {
    // addi $t0, $zero, 5 => op 0x8, rs 0, rt 8, imm 5.
    let word = Ins::Addi(Reg::T0, Reg::ZERO, 5).encode().unwrap();
    assert_eq!(word, (0x8 << 26) | (8 << 16) | 5);

    // sw $ra, -4($sp).
    let word = Ins::Sw(Reg::RA, -4, Reg::SP).encode().unwrap();
    assert_eq!(word, (0x2b << 26) | (29 << 21) | (31 << 16) | 0xfffc);
}

#[test]
fn test_rejects_out_of_range() {
    assert_eq!(Ins::J(0x2).encode(), Err(Error::UnalignedTarget(0x2)));
    assert_eq!(
        Ins::Beq(Reg::ZERO, Reg::ZERO, 40_000).encode(),
        Err(Error::BranchOffset(40_000)),
    );
    assert_eq!(Ins::Lwc2(32, 0, 0, 0, Reg::ZERO).encode(), Err(Error::Field(32, 5)));
}

#[test]
fn test_program_order() {
    let words = assemble(&[Ins::Nop, Ins::Break]).unwrap();
    assert_eq!(words, vec![0, 0x0000_000d]);
}

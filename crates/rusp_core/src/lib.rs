//! Instruction-level emulation of the scalar half of a fixed-function signal
//! coprocessor: a small MIPS-like unit with two 4 KiB on-chip memories, a
//! branch-delay pipeline and a set of host-visible control registers.
//!
//! The host writes microcode into the local store, points the device-mapped
//! program counter at it and calls [`Cpu::run_task`]. The loop runs
//! synchronously until the status register's halt bit is raised, either by a
//! BREAK instruction, by a control register write, or externally by the host.
//!
//! Vector arithmetic and control register semantics are not part of this
//! crate; they are reached through the [`cpu::VectorUnit`] and [`cpu::Host`]
//! traits.

#[macro_use]
extern crate log;

#[cfg(test)]
mod test;

pub mod cpu;
pub mod mem;
pub mod sp;

pub use cpu::{Cpu, Host, Opcode, VectorMemOp, VectorOp, VectorUnit};
pub use mem::{Bank, LocalStore, StoreError};
pub use sp::SpRegs;

//! Seams towards the unit's external collaborators.
//!
//! The core routes whole instruction classes out through these traits: the
//! vector half of the processor (compute table, scalar moves and the
//! load/store sub-opcode tables) and the host side (control register
//! handlers, the reserved-instruction hook and the interrupt-check
//! callback). Their semantics live with the implementor; the core only
//! guarantees the decode and dispatch described on each method.

use crate::mem::Bank;
use crate::sp::SpRegs;

/// A decoded vector-class compute instruction. `funct` selects one of 64
/// operations, `vd`/`vs`/`vt` the sub-registers and `e` the lane selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorOp {
    pub funct: u8,
    pub vd: u8,
    pub vs: u8,
    pub vt: u8,
    pub e: u8,
}

/// A decoded vector load or store. `op` is the 5-bit sub-opcode selecting
/// the transfer shape, `offset` the byte offset already sign-extended from
/// its 7-bit field, and `base` the value of the base scalar register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorMemOp {
    pub op: u8,
    pub vt: u8,
    pub e: u8,
    pub offset: i32,
    pub base: u32,
}

/// The vector half of the processor.
pub trait VectorUnit {
    /// Execute one compute instruction.
    fn exec(&mut self, op: VectorOp);

    /// MFC2: read a lane of vector register `vs`.
    fn reg_load(&mut self, vs: u8, e: u8) -> u32;

    /// CFC2: read a vector control register.
    fn ctrl_load(&mut self, reg: u8) -> u32;

    /// MTC2: write a lane of vector register `vs`.
    fn reg_store(&mut self, vs: u8, e: u8, val: u32);

    /// CTC2: write a vector control register.
    fn ctrl_store(&mut self, reg: u8, val: u32);

    /// LWC2: transfer from data memory into a vector register.
    fn mem_load(&mut self, dmem: &mut Bank, op: VectorMemOp);

    /// SWC2: transfer from a vector register into data memory.
    fn mem_store(&mut self, dmem: &mut Bank, op: VectorMemOp);
}

/// The host side of the unit.
pub trait Host {
    /// MFC0: read control register `reg` in `0..16`. The handler may mutate
    /// the host-visible block, e.g. to report DMA state.
    fn cop0_read(&mut self, sp: &mut SpRegs, reg: u8) -> u32;

    /// MTC0: write control register `reg`. The handler may halt the task by
    /// raising status bits.
    fn cop0_write(&mut self, sp: &mut SpRegs, reg: u8, val: u32);

    /// Called with the raw word of any unrecognized instruction. Execution
    /// continues afterwards no matter what this does.
    fn reserved(&mut self, inst: u32);

    /// Ask the host to service its interrupt lines now.
    fn check_interrupts(&mut self);
}

// Inert collaborators, mainly for tests that only exercise the scalar unit.
impl VectorUnit for () {
    fn exec(&mut self, _: VectorOp) {}

    fn reg_load(&mut self, _: u8, _: u8) -> u32 {
        0
    }

    fn ctrl_load(&mut self, _: u8) -> u32 {
        0
    }

    fn reg_store(&mut self, _: u8, _: u8, _: u32) {}

    fn ctrl_store(&mut self, _: u8, _: u32) {}

    fn mem_load(&mut self, _: &mut Bank, _: VectorMemOp) {}

    fn mem_store(&mut self, _: &mut Bank, _: VectorMemOp) {}
}

impl Host for () {
    fn cop0_read(&mut self, _: &mut SpRegs, _: u8) -> u32 {
        0
    }

    fn cop0_write(&mut self, _: &mut SpRegs, _: u8, _: u32) {}

    fn reserved(&mut self, inst: u32) {
        warn!("reserved instruction {inst:08x}");
    }

    fn check_interrupts(&mut self) {}
}

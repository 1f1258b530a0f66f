//! The host-visible register block: status, interrupt, semaphore and the
//! device-mapped program counter. The host owns these as memory-mapped
//! registers and may read or write them between task invocations; the core
//! only touches them from inside [`crate::Cpu::run_task`].

use rusp_util::Bit;

/// Device-mapped base address of the program counter register. The host
/// always sees the PC as `PC_BASE + offset`.
pub const PC_BASE: u32 = 0x0400_1000;

/// Status bit: the unit is halted and the task loop must not run.
pub const HALT: u32 = 1 << 0;
/// Status bit: the last task ended by executing BREAK.
pub const BROKE: u32 = 1 << 1;
/// Status bit: BREAK should also raise an interrupt towards the host.
pub const INTR_BREAK: u32 = 1 << 6;

/// Bit raised in the interrupt register when the unit requests host
/// attention.
pub const INTR_TASK_DONE: u32 = 1 << 0;

pub struct SpRegs {
    pub status: u32,
    pub interrupt: u32,
    pub semaphore: u32,
    pub pc: u32,
}

impl SpRegs {
    pub fn new() -> Self {
        Self {
            status: 0,
            interrupt: 0,
            semaphore: 0,
            pc: PC_BASE,
        }
    }

    pub fn halted(&self) -> bool {
        self.status.bit(0)
    }

    pub fn broke(&self) -> bool {
        self.status.bit(1)
    }
}

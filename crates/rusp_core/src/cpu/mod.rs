//! Emulation of the coprocessor's scalar unit: the fetch/decode/execute
//! loop, the scalar register file and the branch-delay scheduler.
//!
//! The unit pipelines one instruction ahead, so a taken branch or jump does
//! not redirect fetch immediately: the instruction right after it (the delay
//! slot) always executes first. This is emulated with a small state machine
//! instead of touching the program counter directly: a control transfer
//! parks its target in [`Cpu::pending_pc`] and the end-of-iteration
//! scheduler commits it exactly one instruction later. A branch sitting in a
//! delay slot reschedules the machine, replacing the parked target, which is
//! what the hardware does for back-to-back branches.
//!
//! There are no exceptions and no faults: addresses wrap inside the 4 KiB
//! banks, arithmetic wraps, and unknown encodings are handed to the host's
//! reserved-instruction hook and skipped.

mod opcode;

pub mod cop;

use crate::mem::LocalStore;
use crate::sp::{self, SpRegs};
use rusp_asm::Reg;

pub use cop::{Host, VectorMemOp, VectorOp, VectorUnit};
pub use opcode::Opcode;

/// Valid program counter offsets, word aligned inside the instruction bank.
const PC_MASK: u32 = 0xffc;

/// Control register reads with no change in value tolerated before the task
/// is considered stuck.
const POLL_BUDGET: u32 = 32767;

/// Budget reported back to the host after a poll timeout.
const TIMED_OUT_POLL_BUDGET: u32 = 16384;

/// Clip a device-mapped or arbitrary address into a valid fetch offset.
fn fit_imem(pc: u32) -> u32 {
    pc & 0xfff & 0xffc
}

/// Phase of the branch-delay scheduler.
///
/// A taken control transfer moves to `DelaySlot`; the scheduler advances it
/// to `Commit` while fetch slips past the delay slot, and the parked target
/// becomes the fetch address on the iteration after that.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Fetch,
    DelaySlot,
    Commit,
}

pub struct Cpu {
    /// # Scalar registers
    ///
    /// 32 signed 32-bit registers. `regs[0]` always holds zero; every write
    /// path goes through [`Cpu::set_reg`], which re-pins it after the write.
    /// Some handlers deliberately write it and rely on the pin, so the
    /// re-zeroing is part of the architecture, not cleanup.
    regs: [i32; 32],
    /// Offset of the instruction currently executing, in `[0, 0xFFC]`.
    pc: u32,
    stage: Stage,
    /// Device-mapped target of a taken branch, awaiting its delay slot.
    pending_pc: u32,
    /// Per control register: reads since the returned value last changed.
    polls: [u32; 16],
    last_polled: [u32; 16],
    /// Number of control registers that blew through the poll budget.
    stale_signals: u32,
    poll_budget: u32,
    /// Host-visible register block. Public since the host owns it and may
    /// touch it between invocations.
    pub sp: SpRegs,
    /// Instruction and data memory. The host fills these before a task.
    pub store: LocalStore,
}

impl Cpu {
    pub fn new() -> Self {
        Cpu {
            regs: [0x0; 32],
            pc: 0x0,
            stage: Stage::Fetch,
            pending_pc: 0x0,
            polls: [0x0; 16],
            last_polled: [0x0; 16],
            stale_signals: 0,
            poll_budget: POLL_BUDGET,
            sp: SpRegs::new(),
            store: LocalStore::new(),
        }
    }

    pub fn read_reg(&self, idx: Reg) -> i32 {
        self.regs[idx.0 as usize]
    }

    fn set_reg(&mut self, idx: Reg, val: i32) {
        self.regs[idx.0 as usize] = val;
        self.regs[0] = 0;
    }

    /// The poll budget currently in effect. Lowered after a stale-signal
    /// timeout so the host can tell a task timed out.
    pub fn poll_budget(&self) -> u32 {
        self.poll_budget
    }

    /// Run microcode until the status register's halt bit is raised.
    ///
    /// Fetch starts wherever the host-visible PC points. The loop executes
    /// exactly one instruction per iteration and writes the device-mapped PC
    /// back every iteration and once more on exit, so the host always
    /// observes `0x0400_1000 + offset`.
    pub fn run_task(&mut self, host: &mut impl Host, vu: &mut impl VectorUnit) {
        self.regs = [0x0; 32];
        self.stage = Stage::Fetch;
        self.pending_pc = 0x0;
        self.polls = [0x0; 16];
        self.last_polled = [0x0; 16];
        self.stale_signals = 0;

        self.pc = fit_imem(self.sp.pc);
        trace!("task entered at {:#05x}", self.pc);

        while !self.sp.halted() {
            let op = Opcode::new(self.store.imem.load_word(self.pc));

            self.exec(host, vu, op);

            if self.stage == Stage::Commit {
                self.stage = Stage::Fetch;
                self.pc = self.pending_pc & PC_MASK;
                self.sp.pc = self.pending_pc;
            } else {
                if self.stage == Stage::DelaySlot {
                    self.stage = Stage::Commit;
                }
                self.pc = (self.pc + 4) & PC_MASK;
                self.sp.pc = sp::PC_BASE + self.pc;
            }
        }

        self.sp.pc = sp::PC_BASE | fit_imem(self.pc);

        if self.sp.broke() {
            // Normal exit, from executing BREAK.
            trace!("task broke at {:#05x}", self.pc);
            return;
        } else if self.sp.interrupt & sp::INTR_TASK_DONE != 0 {
            // Interrupt raised by a control register write to stop the task.
            host.check_interrupts();
        } else if self.stale_signals != 0 {
            // Too many unchanged control register reads: timed out.
            debug!("task timed out after {} stale signals", self.stale_signals);
            self.poll_budget = TIMED_OUT_POLL_BUDGET;
        } else if self.sp.semaphore != 0 {
            // Semaphore lock held; the host resolves it and retries.
        } else {
            // Unknown cause, the host halted the unit through the device
            // map. Leave the status bits alone.
            return;
        }

        // Clear the halt bit so the next invocation restarts with the
        // correct signals.
        self.sp.status &= !sp::HALT;
    }

    /// Schedule a jump to an absolute offset, taken after the delay slot.
    fn jump(&mut self, target: u32) {
        self.pending_pc = sp::PC_BASE + (target & PC_MASK);
        self.stage = Stage::DelaySlot;
    }

    /// Schedule a branch relative to the delay slot address.
    fn branch(&mut self, op: Opcode) {
        let offset = op.signed_imm() << 2;
        self.jump(self.pc.wrapping_add(4).wrapping_add(offset));
    }

    /// Return address of a link-producing control transfer: the instruction
    /// after the delay slot, clipped to the valid PC window.
    fn link(&self) -> i32 {
        ((self.pc + 8) & PC_MASK) as i32
    }

    /// Address of a scalar memory access, wrapped into the data bank.
    fn mem_addr(&self, op: Opcode) -> u32 {
        (self.read_reg(op.rs()) as u32).wrapping_add(op.signed_imm()) & 0xfff
    }

    /// Count a control register read towards the stale-signal timeout. A
    /// read returning a changed value resets that register's counter; a
    /// saturated counter halts the task.
    fn track_poll(&mut self, reg: u8, val: u32) {
        let reg = usize::from(reg);

        if self.last_polled[reg] != val {
            self.last_polled[reg] = val;
            self.polls[reg] = 0;
            return;
        }

        self.polls[reg] += 1;
        if self.polls[reg] >= self.poll_budget {
            debug!("control register {reg} polled {} times with no change", self.polls[reg]);
            self.stale_signals += 1;
            self.sp.status |= sp::HALT;
        }
    }

    /// Execute one instruction.
    fn exec(&mut self, host: &mut impl Host, vu: &mut impl VectorUnit, op: Opcode) {
        if op.is_vector() {
            vu.exec(op.vector_op());
            return;
        }
        match op.op() {
            0x00 => match op.special() {
                0x00 => self.op_sll(op),
                0x02 => self.op_srl(op),
                0x03 => self.op_sra(op),
                0x04 => self.op_sllv(op),
                0x06 => self.op_srlv(op),
                0x07 => self.op_srav(op),
                0x08 => self.op_jr(op),
                0x09 => self.op_jalr(op),
                0x0d => self.op_break(host),
                0x20 | 0x21 => self.op_add(op),
                0x22 | 0x23 => self.op_sub(op),
                0x24 => self.op_and(op),
                0x25 => self.op_or(op),
                0x26 => self.op_xor(op),
                0x27 => self.op_nor(op),
                0x2a => self.op_slt(op),
                0x2b => self.op_sltu(op),
                _ => host.reserved(op.0),
            },
            0x01 => self.op_bcondz(host, op),
            0x02 => self.op_j(op),
            0x03 => self.op_jal(op),
            0x04 => self.op_beq(op),
            0x05 => self.op_bne(op),
            0x06 => self.op_blez(op),
            0x07 => self.op_bgtz(op),
            0x08 | 0x09 => self.op_addi(op),
            0x0a => self.op_slti(op),
            0x0b => self.op_sltiu(op),
            0x0c => self.op_andi(op),
            0x0d => self.op_ori(op),
            0x0e => self.op_xori(op),
            0x0f => self.op_lui(op),
            0x10 => self.op_cop0(host, op),
            0x12 => self.op_cop2(host, vu, op),
            0x20 => self.op_lb(op),
            0x21 => self.op_lh(op),
            0x23 => self.op_lw(op),
            0x24 => self.op_lbu(op),
            0x25 => self.op_lhu(op),
            0x28 => self.op_sb(op),
            0x29 => self.op_sh(op),
            0x2b => self.op_sw(op),
            0x32 => self.op_lwc2(vu, op),
            0x3a => self.op_swc2(vu, op),
            _ => host.reserved(op.0),
        }
    }
}

/// Instruction handlers.
impl Cpu {
    /// SLL - Shift left logical.
    fn op_sll(&mut self, op: Opcode) {
        let val = self.read_reg(op.rt()) << op.shift();
        self.set_reg(op.rd(), val);
    }

    /// SRL - Shift right logical.
    fn op_srl(&mut self, op: Opcode) {
        let val = (self.read_reg(op.rt()) as u32) >> op.shift();
        self.set_reg(op.rd(), val as i32);
    }

    /// SRA - Shift right arithmetic.
    fn op_sra(&mut self, op: Opcode) {
        let val = self.read_reg(op.rt()) >> op.shift();
        self.set_reg(op.rd(), val);
    }

    /// SLLV - Shift left logical variable.
    fn op_sllv(&mut self, op: Opcode) {
        let sa = self.read_reg(op.rs()) as u32 & 31;
        let val = self.read_reg(op.rt()) << sa;
        self.set_reg(op.rd(), val);
    }

    /// SRLV - Shift right logical variable.
    fn op_srlv(&mut self, op: Opcode) {
        let sa = self.read_reg(op.rs()) as u32 & 31;
        let val = (self.read_reg(op.rt()) as u32) >> sa;
        self.set_reg(op.rd(), val as i32);
    }

    /// SRAV - Shift right arithmetic variable.
    fn op_srav(&mut self, op: Opcode) {
        let sa = self.read_reg(op.rs()) as u32 & 31;
        let val = self.read_reg(op.rt()) >> sa;
        self.set_reg(op.rd(), val);
    }

    /// JR - Jump register.
    fn op_jr(&mut self, op: Opcode) {
        self.jump(self.read_reg(op.rs()) as u32);
    }

    /// JALR - Jump and link register.
    ///
    /// The link is written before the target register is read, so
    /// `jalr $t0, $t0` jumps to the link address. That matches the order
    /// the hardware resolves the two.
    fn op_jalr(&mut self, op: Opcode) {
        let link = self.link();
        self.set_reg(op.rd(), link);
        self.jump(self.read_reg(op.rs()) as u32);
    }

    /// BREAK - End the task and tell the host.
    fn op_break(&mut self, host: &mut impl Host) {
        self.sp.status |= sp::BROKE | sp::HALT;
        if self.sp.status & sp::INTR_BREAK != 0 {
            self.sp.interrupt |= sp::INTR_TASK_DONE;
            host.check_interrupts();
        }
    }

    /// ADD / ADDU - Add. The unit traps nothing, so both forms wrap.
    fn op_add(&mut self, op: Opcode) {
        let val = self.read_reg(op.rs()).wrapping_add(self.read_reg(op.rt()));
        self.set_reg(op.rd(), val);
    }

    /// SUB / SUBU - Subtract, wrapping.
    fn op_sub(&mut self, op: Opcode) {
        let val = self.read_reg(op.rs()).wrapping_sub(self.read_reg(op.rt()));
        self.set_reg(op.rd(), val);
    }

    /// AND - Bitwise and.
    fn op_and(&mut self, op: Opcode) {
        let val = self.read_reg(op.rs()) & self.read_reg(op.rt());
        self.set_reg(op.rd(), val);
    }

    /// OR - Bitwise or.
    fn op_or(&mut self, op: Opcode) {
        let val = self.read_reg(op.rs()) | self.read_reg(op.rt());
        self.set_reg(op.rd(), val);
    }

    /// XOR - Bitwise exclusive or.
    fn op_xor(&mut self, op: Opcode) {
        let val = self.read_reg(op.rs()) ^ self.read_reg(op.rt());
        self.set_reg(op.rd(), val);
    }

    /// NOR - Bitwise not or.
    fn op_nor(&mut self, op: Opcode) {
        let val = !(self.read_reg(op.rs()) | self.read_reg(op.rt()));
        self.set_reg(op.rd(), val);
    }

    /// SLT - Set if less than, signed.
    fn op_slt(&mut self, op: Opcode) {
        let val = self.read_reg(op.rs()) < self.read_reg(op.rt());
        self.set_reg(op.rd(), val as i32);
    }

    /// SLTU - Set if less than, unsigned.
    fn op_sltu(&mut self, op: Opcode) {
        let val = (self.read_reg(op.rs()) as u32) < (self.read_reg(op.rt()) as u32);
        self.set_reg(op.rd(), val as i32);
    }

    /// # BLTZ / BGEZ / BLTZAL / BGEZAL
    ///
    /// Conditional branches against zero, selected by the target register
    /// field. The link forms write the return address whether or not the
    /// branch is taken, and they write it before the condition register is
    /// read, so `bltzal $ra` tests the fresh link value. Same resolution
    /// order as [`Self::op_jalr`].
    fn op_bcondz(&mut self, host: &mut impl Host, op: Opcode) {
        match op.rt().0 {
            0x00 => {
                if self.read_reg(op.rs()) < 0 {
                    self.branch(op);
                }
            }
            0x01 => {
                if self.read_reg(op.rs()) >= 0 {
                    self.branch(op);
                }
            }
            0x10 => {
                self.set_reg(Reg::RA, self.link());
                if self.read_reg(op.rs()) < 0 {
                    self.branch(op);
                }
            }
            0x11 => {
                self.set_reg(Reg::RA, self.link());
                if self.read_reg(op.rs()) >= 0 {
                    self.branch(op);
                }
            }
            _ => host.reserved(op.0),
        }
    }

    /// J - Jump.
    fn op_j(&mut self, op: Opcode) {
        self.jump(op.target() << 2);
    }

    /// JAL - Jump and link.
    fn op_jal(&mut self, op: Opcode) {
        self.set_reg(Reg::RA, self.link());
        self.op_j(op);
    }

    /// BEQ - Branch if equal.
    fn op_beq(&mut self, op: Opcode) {
        if self.read_reg(op.rs()) == self.read_reg(op.rt()) {
            self.branch(op);
        }
    }

    /// BNE - Branch if not equal.
    fn op_bne(&mut self, op: Opcode) {
        if self.read_reg(op.rs()) != self.read_reg(op.rt()) {
            self.branch(op);
        }
    }

    /// BLEZ - Branch if less than or equal to zero.
    fn op_blez(&mut self, op: Opcode) {
        if self.read_reg(op.rs()) <= 0 {
            self.branch(op);
        }
    }

    /// BGTZ - Branch if greater than zero.
    fn op_bgtz(&mut self, op: Opcode) {
        if self.read_reg(op.rs()) > 0 {
            self.branch(op);
        }
    }

    /// ADDI / ADDIU - Add immediate. Wrapping, like ADD.
    fn op_addi(&mut self, op: Opcode) {
        let val = self.read_reg(op.rs()).wrapping_add(op.signed_imm() as i32);
        self.set_reg(op.rt(), val);
    }

    /// SLTI - Set if less than immediate, signed.
    fn op_slti(&mut self, op: Opcode) {
        let val = self.read_reg(op.rs()) < op.signed_imm() as i32;
        self.set_reg(op.rt(), val as i32);
    }

    /// # SLTIU - Set if less than immediate, unsigned
    ///
    /// Compares against the zero-extended immediate, not the sign-extended
    /// one. Microcode in the wild depends on this, so it stays.
    fn op_sltiu(&mut self, op: Opcode) {
        let val = (self.read_reg(op.rs()) as u32) < op.imm();
        self.set_reg(op.rt(), val as i32);
    }

    /// ANDI - Bitwise and immediate.
    fn op_andi(&mut self, op: Opcode) {
        let val = self.read_reg(op.rs()) as u32 & op.imm();
        self.set_reg(op.rt(), val as i32);
    }

    /// ORI - Bitwise or immediate.
    fn op_ori(&mut self, op: Opcode) {
        let val = self.read_reg(op.rs()) as u32 | op.imm();
        self.set_reg(op.rt(), val as i32);
    }

    /// XORI - Bitwise exclusive or immediate.
    fn op_xori(&mut self, op: Opcode) {
        let val = self.read_reg(op.rs()) as u32 ^ op.imm();
        self.set_reg(op.rt(), val as i32);
    }

    /// LUI - Load upper immediate.
    fn op_lui(&mut self, op: Opcode) {
        self.set_reg(op.rt(), (op.imm() << 16) as i32);
    }

    /// MFC0 / MTC0 - Control register moves, routed to the host's handler
    /// tables. Reads feed the stale-signal tracker.
    fn op_cop0(&mut self, host: &mut impl Host, op: Opcode) {
        match op.cop_op() {
            0x0 => {
                let reg = op.cop0_reg();
                let val = host.cop0_read(&mut self.sp, reg);
                self.track_poll(reg, val);
                self.set_reg(op.rt(), val as i32);
            }
            0x4 => {
                let val = self.read_reg(op.rt()) as u32;
                host.cop0_write(&mut self.sp, op.cop0_reg(), val);
            }
            _ => host.reserved(op.0),
        }
    }

    /// MFC2 / CFC2 / MTC2 / CTC2 - Scalar moves to and from the vector
    /// unit's registers.
    fn op_cop2(&mut self, host: &mut impl Host, vu: &mut impl VectorUnit, op: Opcode) {
        match op.cop_op() {
            0x0 => {
                let val = vu.reg_load(op.rd().0, op.element());
                self.set_reg(op.rt(), val as i32);
            }
            0x2 => {
                let val = vu.ctrl_load(op.rd().0);
                self.set_reg(op.rt(), val as i32);
            }
            0x4 => {
                let val = self.read_reg(op.rt()) as u32;
                vu.reg_store(op.rd().0, op.element(), val);
            }
            0x6 => {
                let val = self.read_reg(op.rt()) as u32;
                vu.ctrl_store(op.rd().0, val);
            }
            _ => host.reserved(op.0),
        }
    }

    /// LB - Load byte, sign-extended.
    fn op_lb(&mut self, op: Opcode) {
        let val = self.store.dmem.load_byte(self.mem_addr(op)) as i8;
        self.set_reg(op.rt(), i32::from(val));
    }

    /// LH - Load halfword, sign-extended.
    fn op_lh(&mut self, op: Opcode) {
        let val = self.store.dmem.load_half(self.mem_addr(op)) as i16;
        self.set_reg(op.rt(), i32::from(val));
    }

    /// LW - Load word, aligned or not.
    fn op_lw(&mut self, op: Opcode) {
        let val = self.store.dmem.load_word(self.mem_addr(op));
        self.set_reg(op.rt(), val as i32);
    }

    /// LBU - Load byte, zero-extended.
    fn op_lbu(&mut self, op: Opcode) {
        let val = self.store.dmem.load_byte(self.mem_addr(op));
        self.set_reg(op.rt(), i32::from(val));
    }

    /// LHU - Load halfword, zero-extended.
    fn op_lhu(&mut self, op: Opcode) {
        let val = self.store.dmem.load_half(self.mem_addr(op));
        self.set_reg(op.rt(), i32::from(val));
    }

    /// SB - Store byte.
    fn op_sb(&mut self, op: Opcode) {
        let val = self.read_reg(op.rt()) as u8;
        self.store.dmem.store_byte(self.mem_addr(op), val);
    }

    /// SH - Store halfword.
    fn op_sh(&mut self, op: Opcode) {
        let val = self.read_reg(op.rt()) as u16;
        self.store.dmem.store_half(self.mem_addr(op), val);
    }

    /// SW - Store word, aligned or not.
    fn op_sw(&mut self, op: Opcode) {
        let val = self.read_reg(op.rt()) as u32;
        self.store.dmem.store_word(self.mem_addr(op), val);
    }

    /// LWC2 - Vector load, routed to the vector unit's sub-opcode table.
    fn op_lwc2(&mut self, vu: &mut impl VectorUnit, op: Opcode) {
        let mem_op = self.vec_mem_op(op);
        vu.mem_load(&mut self.store.dmem, mem_op);
    }

    /// SWC2 - Vector store, routed likewise.
    fn op_swc2(&mut self, vu: &mut impl VectorUnit, op: Opcode) {
        let mem_op = self.vec_mem_op(op);
        vu.mem_store(&mut self.store.dmem, mem_op);
    }

    fn vec_mem_op(&self, op: Opcode) -> VectorMemOp {
        VectorMemOp {
            op: op.vec_op(),
            vt: op.rt().0,
            e: op.element(),
            offset: op.vec_offset(),
            base: self.read_reg(op.rs()) as u32,
        }
    }
}

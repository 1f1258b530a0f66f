mod cpu;

use crate::cpu::{Host, VectorMemOp, VectorOp, VectorUnit};
use crate::sp::SpRegs;
use crate::Cpu;

use rusp_asm::Ins;

/// Encode a program and place it in the instruction bank at `offset`.
pub fn load_code(cpu: &mut Cpu, offset: usize, code: &[Ins]) {
    let words = match rusp_asm::assemble(code) {
        Ok(words) => words,
        Err(error) => panic!("{error}"),
    };
    let bytes: Vec<u8> = words.iter().flat_map(|word| word.to_be_bytes()).collect();
    cpu.store.imem.copy_from(offset, &bytes).unwrap();
}

pub fn run_code_with(code: &[Ins], host: &mut impl Host, vu: &mut impl VectorUnit) -> Cpu {
    let mut cpu = Cpu::new();
    load_code(&mut cpu, 0, code);
    cpu.run_task(host, vu);
    cpu
}

pub fn run_code(code: &[Ins]) -> Cpu {
    run_code_with(code, &mut (), &mut ())
}

/// Host with a plain register file, recording traffic from the core. An
/// `on_write` hook stands in for the side effects real control registers
/// have, like halting the unit.
#[derive(Default)]
pub struct TestHost {
    pub regs: [u32; 16],
    pub writes: Vec<(u8, u32)>,
    pub interrupt_checks: u32,
    pub on_write: Option<fn(&mut SpRegs, u8, u32)>,
}

impl Host for TestHost {
    fn cop0_read(&mut self, _: &mut SpRegs, reg: u8) -> u32 {
        self.regs[reg as usize]
    }

    fn cop0_write(&mut self, sp: &mut SpRegs, reg: u8, val: u32) {
        self.writes.push((reg, val));
        self.regs[reg as usize] = val;
        if let Some(hook) = self.on_write {
            hook(sp, reg, val);
        }
    }

    fn reserved(&mut self, _: u32) {}

    fn check_interrupts(&mut self) {
        self.interrupt_checks += 1;
    }
}

/// Vector unit that records what the scalar core routes to it. Register and
/// control moves hit small backing arrays so values can round-trip.
#[derive(Default)]
pub struct TestVu {
    pub ops: Vec<VectorOp>,
    pub loads: Vec<VectorMemOp>,
    pub stores: Vec<VectorMemOp>,
    pub regs: [u32; 32],
    pub ctrl: [u32; 4],
}

impl VectorUnit for TestVu {
    fn exec(&mut self, op: VectorOp) {
        self.ops.push(op);
    }

    fn reg_load(&mut self, vs: u8, _: u8) -> u32 {
        self.regs[vs as usize & 31]
    }

    fn ctrl_load(&mut self, reg: u8) -> u32 {
        self.ctrl[reg as usize & 3]
    }

    fn reg_store(&mut self, vs: u8, _: u8, val: u32) {
        self.regs[vs as usize & 31] = val;
    }

    fn ctrl_store(&mut self, reg: u8, val: u32) {
        self.ctrl[reg as usize & 3] = val;
    }

    fn mem_load(&mut self, _: &mut crate::mem::Bank, op: VectorMemOp) {
        self.loads.push(op);
    }

    fn mem_store(&mut self, _: &mut crate::mem::Bank, op: VectorMemOp) {
        self.stores.push(op);
    }
}

use super::{load_code, run_code, run_code_with, TestHost, TestVu};
use crate::cpu::{VectorMemOp, VectorOp};
use crate::sp::{self, SpRegs};
use crate::Cpu;

use rusp_asm::{Ins, Reg};

#[test]
fn zero_reg() {
    let cpu = run_code(&[
        Ins::Addi(Reg::ZERO, Reg::ZERO, 1),
        Ins::Break,
    ]);
    assert_eq!(cpu.read_reg(Reg::ZERO), 0);
}

#[test]
fn branch_delay() {
    let cpu = run_code(&[
        Ins::Addi(Reg::V0, Reg::ZERO, 0),
        Ins::J(0x10),
        Ins::Addi(Reg::V0, Reg::V0, 1),
        Ins::Addi(Reg::V0, Reg::V0, 100),
        Ins::Break,
    ]);
    assert_eq!(cpu.read_reg(Reg::V0), 1);
}

/// A branch in a delay slot reschedules the machine: the second target wins
/// and its commit is pushed out by one more instruction, so the instruction
/// after both branches still executes.
#[test]
fn branch_in_delay_slot() {
    let r1 = Reg(1);
    let r2 = Reg(2);
    let r3 = Reg(3);
    let cpu = run_code(&[
        Ins::Beq(Reg::ZERO, Reg::ZERO, 2), // to 3
        Ins::Beq(Reg::ZERO, Reg::ZERO, 4), // to 6
        Ins::Addi(r3, Reg::ZERO, 1),
        Ins::Addi(r1, Reg::ZERO, 1),
        Ins::Beq(Reg::ZERO, Reg::ZERO, 2), // to 7
        Ins::Nop,
        Ins::Addi(r2, Reg::ZERO, 1),
        Ins::Nop,
        Ins::Break,
    ]);
    assert_eq!(cpu.read_reg(r1), 0);
    assert_eq!(cpu.read_reg(r2), 1);
    assert_eq!(cpu.read_reg(r3), 1);
}

#[test]
fn simple_loop() {
    let cpu = run_code(&[
        Ins::Addi(Reg::V0, Reg::ZERO, 1),
        Ins::Sll(Reg::V0, Reg::V0, 1),
        Ins::Slti(Reg::V1, Reg::V0, 1024),
        Ins::Bne(Reg::V1, Reg::ZERO, -3),
        Ins::Nop,
        Ins::Break,
    ]);
    assert_eq!(cpu.read_reg(Reg::V0), 1024);
}

#[test]
fn sign_extension() {
    // The word 0x8080 lands big-endian, so the interesting bytes sit at
    // data addresses 2 and 3.
    let cpu = run_code(&[
        Ins::Ori(Reg::T3, Reg::ZERO, 0x8080),
        Ins::Sw(Reg::T3, 0, Reg::ZERO),
        Ins::Lh(Reg(1), 2, Reg::ZERO),
        Ins::Lhu(Reg(2), 2, Reg::ZERO),
        Ins::Lb(Reg(3), 2, Reg::ZERO),
        Ins::Lbu(Reg(4), 2, Reg::ZERO),
        Ins::Break,
    ]);
    assert_eq!(cpu.read_reg(Reg(1)), 0xffff_8080_u32 as i32);
    assert_eq!(cpu.read_reg(Reg(2)), 0x0000_8080);
    assert_eq!(cpu.read_reg(Reg(3)), 0xffff_ff80_u32 as i32);
    assert_eq!(cpu.read_reg(Reg(4)), 0x0000_0080);
}

#[test]
fn sll() {
    let cpu = run_code(&[
        Ins::Addi(Reg::V0, Reg::ZERO, 8),
        Ins::Sll(Reg::V0, Reg::V0, 2),
        Ins::Break,
    ]);
    assert_eq!(cpu.read_reg(Reg::V0), 8 << 2);
}

#[test]
fn srl() {
    let cpu = run_code(&[
        Ins::Addi(Reg::V0, Reg::ZERO, -8),
        Ins::Srl(Reg::V0, Reg::V0, 2),
        Ins::Break,
    ]);
    assert_eq!(cpu.read_reg(Reg::V0), ((u32::MAX - 7) >> 2) as i32);
}

#[test]
fn sra() {
    let cpu = run_code(&[
        Ins::Addi(Reg::V0, Reg::ZERO, -8),
        Ins::Sra(Reg::V0, Reg::V0, 2),
        Ins::Break,
    ]);
    assert_eq!(cpu.read_reg(Reg::V0), -8 >> 2);
}

#[test]
fn sllv() {
    let cpu = run_code(&[
        Ins::Addi(Reg::V0, Reg::ZERO, 8),
        Ins::Addi(Reg::V1, Reg::ZERO, 2),
        Ins::Sllv(Reg::V0, Reg::V0, Reg::V1),
        Ins::Break,
    ]);
    assert_eq!(cpu.read_reg(Reg::V0), 8 << 2);
}

#[test]
fn srlv() {
    let cpu = run_code(&[
        Ins::Addi(Reg::V0, Reg::ZERO, 8),
        // Only the low five bits of the shift amount count.
        Ins::Addi(Reg::V1, Reg::ZERO, 32 + 2),
        Ins::Srlv(Reg::V0, Reg::V0, Reg::V1),
        Ins::Break,
    ]);
    assert_eq!(cpu.read_reg(Reg::V0), 8 >> 2);
}

#[test]
fn jalr() {
    let cpu = run_code(&[
        Ins::Addi(Reg::V0, Reg::ZERO, 24),
        Ins::Addi(Reg::A0, Reg::ZERO, 0),
        Ins::Addi(Reg::A1, Reg::ZERO, 0),
        Ins::Jalr(Reg::RA, Reg::V0),
        Ins::Addi(Reg::A0, Reg::ZERO, 3),
        Ins::Addi(Reg::A1, Reg::ZERO, 4),
        Ins::Break,
    ]);
    assert_eq!(cpu.read_reg(Reg::RA), 20);
    assert_eq!(cpu.read_reg(Reg::A0), 3);
    assert_ne!(cpu.read_reg(Reg::A1), 4);
}

/// The link is written before the target register is read.
#[test]
fn jalr_same_reg() {
    let cpu = run_code(&[
        Ins::Addi(Reg::T0, Reg::ZERO, 0),
        Ins::Jalr(Reg::T0, Reg::T0),
        Ins::Nop,
        Ins::Break,
    ]);
    assert_eq!(cpu.read_reg(Reg::T0), 12);
    assert!(cpu.sp.broke());
}

/// The link forms of the conditional branches write the return address even
/// when the branch is not taken.
#[test]
fn bltzal_not_taken() {
    let cpu = run_code(&[
        Ins::Addi(Reg::T0, Reg::ZERO, 1),
        Ins::Bltzal(Reg::T0, 1),
        Ins::Nop,
        Ins::Break,
    ]);
    assert_eq!(cpu.read_reg(Reg::RA), 12);
    assert_eq!(cpu.read_reg(Reg::T0), 1);
}

/// The link lands before the condition register is read, so a link branch
/// conditioned on the link register itself sees the fresh return address.
#[test]
fn bltzal_on_link_reg() {
    let cpu = run_code(&[
        Ins::Addi(Reg::RA, Reg::ZERO, -1),
        Ins::Bltzal(Reg::RA, 2),
        Ins::Nop,
        Ins::Addi(Reg::T0, Reg::ZERO, 1),
        Ins::Break,
    ]);
    // Not taken: the stale negative value was already overwritten.
    assert_eq!(cpu.read_reg(Reg::T0), 1);
    assert_eq!(cpu.read_reg(Reg::RA), 12);
}

#[test]
fn bgezal() {
    let cpu = run_code(&[
        Ins::Addi(Reg::T0, Reg::ZERO, -1),
        Ins::Bgezal(Reg::T0, 2),
        Ins::Nop,
        Ins::Addi(Reg::T1, Reg::ZERO, 1),
        Ins::Break,
    ]);
    // Not taken, but linked.
    assert_eq!(cpu.read_reg(Reg::T1), 1);
    assert_eq!(cpu.read_reg(Reg::RA), 12);
}

#[test]
fn addi_wraps() {
    let cpu = run_code(&[
        Ins::Addi(Reg::V0, Reg::ZERO, 0),
        Ins::Addi(Reg::V0, Reg::V0, -1),
        Ins::Lui(Reg::V1, 0x7fff),
        Ins::Ori(Reg::V1, Reg::V1, 0xffff),
        // Overflow halts nothing, the value just wraps.
        Ins::Addi(Reg::V1, Reg::V1, 1),
        Ins::Break,
    ]);
    assert_eq!(cpu.read_reg(Reg::V0), -1);
    assert_eq!(cpu.read_reg(Reg::V1), i32::MIN);
}

/// SLTIU compares against the zero-extended immediate, so a register value
/// above 16 bits is never below it.
#[test]
fn sltiu_zero_extends() {
    let cpu = run_code(&[
        Ins::Lui(Reg::T0, 1),
        Ins::Sltiu(Reg::T1, Reg::T0, -1),
        Ins::Sltiu(Reg::T2, Reg::ZERO, -1),
        Ins::Break,
    ]);
    assert_eq!(cpu.read_reg(Reg::T1), 0);
    assert_eq!(cpu.read_reg(Reg::T2), 1);
}

#[test]
fn slt_sltu() {
    let cpu = run_code(&[
        Ins::Addi(Reg::T0, Reg::ZERO, -1),
        Ins::Addi(Reg::T1, Reg::ZERO, 1),
        Ins::Slt(Reg::T2, Reg::T0, Reg::T1),
        Ins::Sltu(Reg::T3, Reg::T0, Reg::T1),
        Ins::Break,
    ]);
    assert_eq!(cpu.read_reg(Reg::T2), 1);
    assert_eq!(cpu.read_reg(Reg::T3), 0);
}

#[test]
fn logic_ops() {
    let cpu = run_code(&[
        Ins::Ori(Reg::T0, Reg::ZERO, 0xff00),
        Ins::Ori(Reg::T1, Reg::ZERO, 0x0ff0),
        Ins::And(Reg(1), Reg::T0, Reg::T1),
        Ins::Or(Reg(2), Reg::T0, Reg::T1),
        Ins::Xor(Reg(3), Reg::T0, Reg::T1),
        Ins::Nor(Reg(4), Reg::T0, Reg::T1),
        Ins::Break,
    ]);
    assert_eq!(cpu.read_reg(Reg(1)), 0x0f00);
    assert_eq!(cpu.read_reg(Reg(2)), 0xfff0);
    assert_eq!(cpu.read_reg(Reg(3)), 0xf0f0);
    assert_eq!(cpu.read_reg(Reg(4)), !0xfff0);
}

#[test]
fn break_sets_status() {
    let cpu = run_code(&[
        Ins::Addi(Reg::AT, Reg::ZERO, 3),
        Ins::Addi(Reg::V0, Reg::ZERO, 5),
        Ins::Add(Reg::V1, Reg::AT, Reg::V0),
        Ins::Break,
    ]);
    assert_eq!(cpu.read_reg(Reg::V1), 8);
    assert!(cpu.sp.broke());
    assert!(cpu.sp.halted());
    assert_eq!(cpu.sp.pc, sp::PC_BASE + 0x10);
}

#[test]
fn break_raises_interrupt() {
    let mut host = TestHost::default();
    let mut cpu = Cpu::new();
    cpu.sp.status |= sp::INTR_BREAK;
    load_code(&mut cpu, 0, &[Ins::Break]);
    cpu.run_task(&mut host, &mut ());
    assert_ne!(cpu.sp.interrupt & sp::INTR_TASK_DONE, 0);
    assert_eq!(host.interrupt_checks, 1);
    assert!(cpu.sp.broke());
    assert!(cpu.sp.halted());
}

/// A halt raised through a control register write with no other signal keeps
/// the status untouched, including the halt bit itself.
#[test]
fn halted_by_host() {
    fn halt(sp: &mut SpRegs, _: u8, _: u32) {
        sp.status |= sp::HALT;
    }
    let mut host = TestHost { on_write: Some(halt), ..TestHost::default() };
    let cpu = run_code_with(
        &[
            Ins::Addi(Reg::T0, Reg::ZERO, 7),
            Ins::Mtc0(Reg::T0, 4),
            Ins::Addi(Reg::T1, Reg::ZERO, 1),
            Ins::Break,
        ],
        &mut host,
        &mut (),
    );
    assert_eq!(host.writes, vec![(4, 7)]);
    // The instruction after the halting write never ran.
    assert_eq!(cpu.read_reg(Reg::T1), 0);
    assert!(cpu.sp.halted());
    assert!(!cpu.sp.broke());
}

/// With the semaphore held, a host halt is treated as a yield: the halt bit
/// is cleared so the task can be resumed once the lock is resolved.
#[test]
fn semaphore_yield() {
    fn halt(sp: &mut SpRegs, _: u8, _: u32) {
        sp.status |= sp::HALT;
    }
    let mut host = TestHost { on_write: Some(halt), ..TestHost::default() };
    let mut cpu = Cpu::new();
    cpu.sp.semaphore = 1;
    load_code(&mut cpu, 0, &[Ins::Mtc0(Reg::ZERO, 4), Ins::Break]);
    cpu.run_task(&mut host, &mut ());
    assert!(!cpu.sp.halted());
    assert_eq!(cpu.sp.semaphore, 1);
}

/// A halt paired with a raised interrupt asks the host to service its lines
/// and rearms the unit.
#[test]
fn interrupt_exit() {
    fn raise(sp: &mut SpRegs, _: u8, _: u32) {
        sp.interrupt |= sp::INTR_TASK_DONE;
        sp.status |= sp::HALT;
    }
    let mut host = TestHost { on_write: Some(raise), ..TestHost::default() };
    let cpu = run_code_with(&[Ins::Mtc0(Reg::ZERO, 4), Ins::Break], &mut host, &mut ());
    assert_eq!(host.interrupt_checks, 1);
    assert!(!cpu.sp.halted());
    assert!(!cpu.sp.broke());
}

/// Invoking a halted unit does nothing and leaves the halt bit raised.
#[test]
fn prehalted_return() {
    let mut cpu = Cpu::new();
    cpu.sp.status |= sp::HALT;
    load_code(&mut cpu, 0, &[Ins::Addi(Reg::T0, Reg::ZERO, 1), Ins::Break]);
    cpu.run_task(&mut (), &mut ());
    assert!(cpu.sp.halted());
    assert_eq!(cpu.read_reg(Reg::T0), 0);
    assert_eq!(cpu.sp.pc, sp::PC_BASE);
}

#[test]
fn misaligned_word_round_trip() {
    let cpu = run_code(&[
        Ins::Lui(Reg::T0, 0x89ab),
        Ins::Ori(Reg::T0, Reg::T0, 0xcdef),
        Ins::Addi(Reg::T1, Reg::ZERO, 3),
        Ins::Sw(Reg::T0, 0, Reg::T1),
        Ins::Lw(Reg::T2, 0, Reg::T1),
        Ins::Break,
    ]);
    assert_eq!(cpu.read_reg(Reg::T2), 0x89ab_cdef_u32 as i32);
    // The big-endian stream starts at data address 3.
    assert_eq!(cpu.store.dmem.load_byte(3), 0x89);
    assert_eq!(cpu.store.dmem.load_byte(4), 0xab);
    assert_eq!(cpu.store.dmem.load_byte(5), 0xcd);
    assert_eq!(cpu.store.dmem.load_byte(6), 0xef);
}

/// Fetch wraps at the top of the instruction bank instead of faulting.
#[test]
fn fetch_wraps_around() {
    let mut cpu = Cpu::new();
    load_code(&mut cpu, 0, &[
        Ins::Bne(Reg::V0, Reg::ZERO, 3),
        Ins::Nop,
        Ins::J(0xff8),
        Ins::Nop,
        Ins::Break,
    ]);
    load_code(&mut cpu, 0xff8, &[Ins::Addi(Reg::V0, Reg::ZERO, 1), Ins::Nop]);
    cpu.run_task(&mut (), &mut ());
    assert_eq!(cpu.read_reg(Reg::V0), 1);
    assert!(cpu.sp.broke());
}

/// A jump target past the top of the instruction bank folds into the valid
/// window under the PC mask.
#[test]
fn jr_target_masked() {
    let cpu = run_code(&[
        Ins::Ori(Reg::T0, Reg::ZERO, 0x1010),
        Ins::Jr(Reg::T0),
        Ins::Nop,
        Ins::Addi(Reg::V0, Reg::ZERO, 5),
        Ins::Addi(Reg::V0, Reg::ZERO, 1), // lands here, at 0x010
        Ins::Break,
    ]);
    assert_eq!(cpu.read_reg(Reg::V0), 1);
    assert!(cpu.sp.broke());
}

/// Same for a relative branch whose resolved target crosses `0xFFC`.
#[test]
fn branch_target_masked() {
    let mut cpu = Cpu::new();
    load_code(&mut cpu, 0, &[
        Ins::J(0xff0),
        Ins::Nop,
        Ins::Break,
    ]);
    // Branch at 0xff0 resolves to 0x1004, which folds to 0x004.
    load_code(&mut cpu, 0xff0, &[
        Ins::Beq(Reg::ZERO, Reg::ZERO, 4),
        Ins::Addi(Reg::V0, Reg::ZERO, 1),
    ]);
    cpu.run_task(&mut (), &mut ());
    assert_eq!(cpu.read_reg(Reg::V0), 1);
    assert!(cpu.sp.broke());
}

#[test]
fn mfc0_mtc0_routing() {
    let mut host = TestHost::default();
    host.regs[11] = 0x1234;
    let cpu = run_code_with(
        &[
            Ins::Mfc0(Reg::T0, 11),
            Ins::Mtc0(Reg::T0, 5),
            Ins::Break,
        ],
        &mut host,
        &mut (),
    );
    assert_eq!(cpu.read_reg(Reg::T0), 0x1234);
    assert_eq!(host.writes, vec![(5, 0x1234)]);
}

/// Spinning on a control register that never changes halts the task after
/// the poll budget runs out, and the timeout lowers the budget for the
/// next invocation.
#[test]
fn stale_poll_times_out() {
    let cpu = run_code(&[
        Ins::Mfc0(Reg::T0, 4),
        Ins::Beq(Reg::ZERO, Reg::ZERO, -2),
        Ins::Nop,
        Ins::Break,
    ]);
    assert!(!cpu.sp.halted());
    assert!(!cpu.sp.broke());
    assert_eq!(cpu.poll_budget(), 16384);
}

#[test]
fn cop2_moves() {
    let mut vu = TestVu::default();
    vu.regs[5] = 0xdead;
    let cpu = run_code_with(
        &[
            Ins::Mfc2(Reg::T0, 5, 2),
            Ins::Mtc2(Reg::T0, 6, 0),
            Ins::Addi(Reg::T1, Reg::ZERO, 9),
            Ins::Ctc2(Reg::T1, 1),
            Ins::Cfc2(Reg::T2, 1),
            Ins::Break,
        ],
        &mut (),
        &mut vu,
    );
    assert_eq!(cpu.read_reg(Reg::T0), 0xdead);
    assert_eq!(vu.regs[6], 0xdead);
    assert_eq!(cpu.read_reg(Reg::T2), 9);
}

#[test]
fn vector_load_store_dispatch() {
    let mut vu = TestVu::default();
    run_code_with(
        &[
            Ins::Addi(Reg::T0, Reg::ZERO, 0x100),
            Ins::Lwc2(4, 3, 2, -8, Reg::T0),
            Ins::Swc2(7, 1, 0, 63, Reg::T0),
            Ins::Break,
        ],
        &mut (),
        &mut vu,
    );
    assert_eq!(vu.loads, vec![VectorMemOp { op: 4, vt: 3, e: 2, offset: -8, base: 0x100 }]);
    assert_eq!(vu.stores, vec![VectorMemOp { op: 7, vt: 1, e: 0, offset: 63, base: 0x100 }]);
}

#[test]
fn vector_compute_dispatch() {
    let mut vu = TestVu::default();
    run_code_with(&[Ins::Vec(0x13, 1, 2, 3, 9), Ins::Break], &mut (), &mut vu);
    assert_eq!(vu.ops, vec![VectorOp { funct: 0x13, vd: 1, vs: 2, vt: 3, e: 9 }]);
}

/// Unrecognized words are reported to the host and skipped.
#[test]
fn reserved_skipped() {
    let cpu = run_code(&[
        Ins::Word(0xfc00_0000),
        Ins::Addi(Reg::T0, Reg::ZERO, 1),
        Ins::Break,
    ]);
    assert_eq!(cpu.read_reg(Reg::T0), 1);
    assert!(cpu.sp.broke());
}

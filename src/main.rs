//! Standalone runner for the scalar core. Loads raw big-endian microcode
//! and data images into the local store, runs a single task with inert
//! collaborators and dumps the machine state.

use rusp_asm::Reg;
use rusp_core::Cpu;

use std::process::ExitCode;
use std::{env, fs};

fn load_bank(bank: &mut rusp_core::Bank, path: &str) -> Result<(), String> {
    let bytes = fs::read(path).map_err(|err| format!("{path}: {err}"))?;
    bank.copy_from(0, &bytes).map_err(|err| format!("{path}: {err}"))
}

fn run() -> Result<(), String> {
    let mut args = env::args().skip(1);
    let Some(imem) = args.next() else {
        return Err("usage: rusp <imem.bin> [dmem.bin]".to_string());
    };

    let mut cpu = Cpu::new();
    load_bank(&mut cpu.store.imem, &imem)?;
    if let Some(dmem) = args.next() {
        load_bank(&mut cpu.store.dmem, &dmem)?;
    }

    cpu.run_task(&mut (), &mut ());
    log::info!("task halted with status {:#x}", cpu.sp.status);

    for i in 0..32 {
        let reg = Reg(i);
        println!("{:>4} = {:#010x}", reg.to_string(), cpu.read_reg(reg));
    }
    println!("  pc = {:#010x}", cpu.sp.pc);
    println!("stat = {:#010x}", cpu.sp.status);

    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    if let Err(err) = run() {
        eprintln!("{err}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

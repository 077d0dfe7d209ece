//! Simulating and execution for CHIP-8 programs.
//!
//! This module is focused on executing assembled programs (i.e., [`ObjectFile`]s or raw program images).
//!
//! This module consists of:
//! - [`Simulator`]: The struct that simulates assembled code.
//! - [`mem`]: The module handling memory and the register file.
//! - [`device`]: The module handling the keypad, the framebuffer, and the timers.
//! - [`debug`]: The module handling types of breakpoints for the simulator.
//! - [`frame`]: The module handling the call stack.
//! - [`observer`]: The module tracking memory accesses.
//!
//! # Usage
//!
//! To simulate some code, you need to instantiate a Simulator and load a program into it:
//!
//! ```
//! use chip8_ensemble::asm::assemble_src;
//! use chip8_ensemble::sim::Simulator;
//! use chip8_ensemble::ast::reg_consts::V0;
//!
//! let obj_file = assemble_src("
//!     mov reg[0], 1
//!     add reg[0], 2
//!     add reg[0], 3
//! ").unwrap();
//!
//! let mut sim = Simulator::new(Default::default());
//! sim.load_obj_file(&obj_file).unwrap();
//!
//! // Running step by step:
//! sim.step_in().unwrap();
//! assert_eq!(sim.reg_file[V0], 1);
//! sim.step_in().unwrap();
//! assert_eq!(sim.reg_file[V0], 3);
//! sim.step_in().unwrap();
//! assert_eq!(sim.reg_file[V0], 6);
//! assert_eq!(sim.pc, 0x206);
//! ```
//!
//! A CHIP-8 machine never halts, so execution is driven by the caller.
//! Beyond [`Simulator::step_in`], there are also:
//! - [`Simulator::step_over`], [`Simulator::step_out`]: step through whole subroutines
//! - [`Simulator::run_while`], [`Simulator::run_with_limit`]: more advanced programmatic execution
//!
//! ## Flags
//!
//! The simulator can be configured with [`SimFlags`]. For example,
//! to make `BRND` deterministic:
//!
//! ```
//! # use chip8_ensemble::sim::{Simulator, SimFlags};
//! let mut sim = Simulator::new(SimFlags { seed: Some(2110), ..Default::default() });
//! ```
//!
//! ## Querying State
//!
//! The machine state is held in public fields of [`Simulator`]:
//! `pc`, `i`, `reg_file`, `mem`, `stack`, `keypad`, `display`, `timers` and `current_opcode`.
//!
//! - Direct access to the memory (via the `mem` field) is not tracked.
//! - [`Simulator::read_mem`] and [`Simulator::write_mem`] record the access in the `observer` field,
//!   as does every memory access made by an instruction.
//! - The `observer` field also records which registers changed and whether the screen was redrawn
//!   during the last execution call.
//!
//! ```
//! use chip8_ensemble::sim::Simulator;
//!
//! let mut sim = Simulator::new(Default::default());
//! sim.mem[0x300] = 0x12;
//! assert_eq!(sim.read_mem(0x300), Ok(0x12));
//! assert!(sim.observer.get_mem_accesses(0x300).read());
//!
//! assert!(sim.write_mem(0x1000, 0).is_err());
//! ```
//!
//! ## Input
//!
//! Keys can be pressed directly on the `keypad` field,
//! or from another thread through a [`KeySender`] (see [`Simulator::key_sender`]).
//!
//! ## Debugging with breakpoints
//!
//! Breakpoints are accessible through the `breakpoints` field on [`Simulator`].
//!
//! To add a `breakpoint`, simply insert a [`Breakpoint`] and
//! it will break if its condition is met during all execution functions (except [`Simulator::step_in`]).
//!
//! ```
//! use chip8_ensemble::asm::assemble_src;
//! use chip8_ensemble::sim::Simulator;
//! use chip8_ensemble::sim::debug::Breakpoint;
//!
//! let obj_file = assemble_src("
//!     start:
//!     add reg[0], 1
//!     add reg[0], 1
//!     jmp start
//! ").unwrap();
//!
//! let mut sim = Simulator::new(Default::default());
//! sim.load_obj_file(&obj_file).unwrap();
//! sim.breakpoints.insert(Breakpoint::PC(0x204));
//!
//! sim.run_with_limit(100).unwrap();
//! assert!(sim.hit_breakpoint());
//! assert_eq!(sim.pc, 0x204);
//! ```
//!
//! [`Breakpoint`]: self::debug::Breakpoint
pub mod mem;
pub mod debug;
pub mod frame;
pub mod device;
pub mod observer;

use std::collections::HashSet;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::asm::ObjectFile;
use crate::ast::reg_consts::{V0, VF};
use crate::ast::sim::{Op, Opcode};
use crate::ast::Reg;
use crate::isa::{MEM_SIZE, PROGRAM_START};

use self::debug::Breakpoint;
use self::device::{Clock, Framebuffer, KeyChannel, KeySender, Keypad, SystemClock, Timers, KEY_COUNT};
use self::frame::FrameStack;
use self::mem::{Mem, RegFile};
use self::observer::{AccessObserver, AccessSet};

/// The largest program that fits in memory.
const MAX_PROGRAM_LEN: usize = MEM_SIZE - PROGRAM_START as usize;

/// Errors that can occur during simulation.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum SimErr {
    /// The word at the PC does not match any instruction.
    IllegalOpcode(u16),
    /// A return was executed with an empty call stack.
    StackUnderflow,
    /// An instruction accessed memory past the end of memory.
    MemOutOfBounds(usize),
    /// The PC does not point to an instruction (it is odd, before the program start, or past the end of memory).
    PcOutOfBounds(u16),
    /// A key instruction tested a key that does not exist.
    InvalidKey(u8),
    /// The program does not fit in memory.
    ProgramTooLarge(usize),
}
impl std::fmt::Display for SimErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimErr::IllegalOpcode(w)   => write!(f, "simulator executed illegal opcode 0x{w:04X}"),
            SimErr::StackUnderflow     => f.write_str("returned from subroutine with an empty call stack"),
            SimErr::MemOutOfBounds(a)  => write!(f, "memory access out of bounds at 0x{a:X}"),
            SimErr::PcOutOfBounds(pc)  => write!(f, "PC 0x{pc:04X} is out of bounds"),
            SimErr::InvalidKey(k)      => write!(f, "key {k} does not exist"),
            SimErr::ProgramTooLarge(n) => write!(f, "program of {n} bytes does not fit in memory"),
        }
    }
}
impl std::error::Error for SimErr {}
impl crate::err::Error for SimErr {
    fn help(&self) -> Option<std::borrow::Cow<str>> {
        match self {
            SimErr::IllegalOpcode(_)   => Some("the PC may have jumped into data".into()),
            SimErr::StackUnderflow     => Some("every RET should match an earlier CALL".into()),
            SimErr::MemOutOfBounds(_)  => Some(format!("memory addresses range from 0x000 to 0x{:03X}", MEM_SIZE - 1).into()),
            SimErr::PcOutOfBounds(_)   => Some(format!("programs run from 0x{PROGRAM_START:03X} and instructions are 2-byte aligned").into()),
            SimErr::InvalidKey(_)      => Some(format!("keys range from 0 to {}", KEY_COUNT - 1).into()),
            SimErr::ProgramTooLarge(_) => Some(format!("programs can be at most {MAX_PROGRAM_LEN} bytes").into()),
        }
    }
}

/// Reason for why execution paused if it wasn't due to an error.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
enum PauseCondition {
    /// Program hit a breakpoint.
    Breakpoint,
    /// Program hit a tripwire condition.
    Tripwire,
    /// Program hit an error and did not pause successfully.
    #[default]
    Unsuccessful
}

/// Configuration flags for [`Simulator`].
///
/// These can be modified after the `Simulator` is created with [`Simulator::new`]
/// and are preserved between resets.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct SimFlags {
    /// The seed for the random number generator used by `BRND`.
    ///
    /// If this is `None`, the generator is seeded from entropy.
    /// The generator is reseeded on every reset, so a seeded simulator
    /// produces the same numbers every time a program is run.
    ///
    /// By default, this flag is `None`.
    pub seed: Option<u64>,

    /// Whether to emit a `tracing` event (at `TRACE` level) for every executed instruction.
    ///
    /// By default, this flag is `false`.
    pub trace: bool,
}

#[allow(clippy::derivable_impls)]
impl Default for SimFlags {
    fn default() -> Self {
        Self {
            seed: None,
            trace: false
        }
    }
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

/// Executes assembled code.
#[derive(Debug)]
pub struct Simulator {
    // ------------------ SIMULATION STATE ------------------
    // Calling [`Simulator::reset`] resets these values.

    /// The simulator's memory.
    pub mem: Mem,

    /// The simulator's register file.
    pub reg_file: RegFile,

    /// The address pointer (`I`).
    pub i: u16,

    /// The program counter.
    pub pc: u16,

    /// The call stack.
    pub stack: FrameStack,

    /// The input array.
    pub keypad: Keypad,

    /// The screen.
    pub display: Framebuffer,

    /// The delay and sound timers.
    ///
    /// Note that reset re-enables the timers.
    pub timers: Timers,

    /// The last instruction word which was fetched.
    pub current_opcode: u16,

    /// The number of instructions successfully run since the last reset.
    ///
    /// This can be set to 0 to reset the counter.
    pub instructions_run: u64,

    /// Tracks memory accesses.
    pub observer: AccessObserver,

    rng: StdRng,

    /// Indicates the reason why the last execution (via [`Simulator::run_while`] and adjacent)
    /// had paused.
    pause_condition: PauseCondition,

    // ------------------ CONFIG/DEBUG STATE ------------------
    // Calling [`Simulator::reset`] does not reset these values.

    /// The loaded program, which is reloaded on every reset.
    program: Vec<u8>,

    /// Key events sent from other threads.
    keys: KeyChannel,

    /// Configuration settings for the simulator.
    ///
    /// See [`SimFlags`] for more details on what configuration
    /// settings are available.
    pub flags: SimFlags,

    /// Breakpoints for the simulator.
    pub breakpoints: HashSet<Breakpoint>,
}
impl Simulator where Simulator: Send + Sync {}

impl Simulator {
    /// Creates a new simulator with the provided flags and no program loaded.
    pub fn new(flags: SimFlags) -> Self {
        Self::with_clock(flags, Arc::new(SystemClock))
    }

    /// Creates a new simulator whose timers are driven by the given clock.
    pub fn with_clock(flags: SimFlags, clock: Arc<dyn Clock>) -> Self {
        Self {
            mem: Mem::new(),
            reg_file: RegFile::new(),
            i: 0,
            pc: PROGRAM_START,
            stack: FrameStack::new(),
            keypad: Keypad::new(),
            display: Framebuffer::new(),
            timers: Timers::new(clock),
            current_opcode: 0,
            instructions_run: 0,
            observer: AccessObserver::new(),
            rng: make_rng(flags.seed),
            pause_condition: Default::default(),

            program: vec![],
            keys: KeyChannel::new(),
            flags,
            breakpoints: Default::default(),
        }
    }

    /// Resets the simulator.
    ///
    /// This resets the state of the `Simulator` back to before any execution calls,
    /// while preserving configuration and debug state.
    ///
    /// Memory, registers, the call stack, the keypad and the screen are zeroed,
    /// the program is reloaded at the program start (0x200), and the timers are re-enabled
    /// (with the delay timer set to its cap).
    ///
    /// Note that this function preserves:
    /// - Flags
    /// - Breakpoints
    /// - The loaded program
    /// - Any [`KeySender`]s
    pub fn reset(&mut self) {
        self.mem.clear();
        self.reg_file = RegFile::new();
        self.i = 0;
        self.pc = PROGRAM_START;
        self.stack.clear();
        self.keypad.clear();
        self.display.clear();
        self.timers.reset();
        self.current_opcode = 0;
        self.instructions_run = 0;
        self.observer.clear();
        self.rng = make_rng(self.flags.seed);
        self.pause_condition = Default::default();

        let start = usize::from(PROGRAM_START);
        self.mem.as_slice_mut()[start..start + self.program.len()]
            .copy_from_slice(&self.program);
    }

    /// Loads a program image into this simulator and resets it.
    ///
    /// The image is loaded at the program start (0x200).
    pub fn load_program(&mut self, program: &[u8]) -> Result<(), SimErr> {
        if program.len() > MAX_PROGRAM_LEN {
            return Err(SimErr::ProgramTooLarge(program.len()));
        }

        self.program = program.to_vec();
        self.reset();
        tracing::debug!(len = program.len(), "loaded program");
        Ok(())
    }

    /// Loads an object file into this simulator and resets it.
    pub fn load_obj_file(&mut self, obj: &ObjectFile) -> Result<(), SimErr> {
        self.load_program(obj.as_bytes())
    }

    /// The currently loaded program.
    pub fn program(&self) -> &[u8] {
        &self.program
    }

    /// Creates a handle which can send key events to this simulator from another thread.
    ///
    /// Events are applied to the keypad at the start of each step.
    ///
    /// ```
    /// use chip8_ensemble::asm::assemble_src;
    /// use chip8_ensemble::sim::Simulator;
    ///
    /// let mut sim = Simulator::new(Default::default());
    /// sim.load_obj_file(&assemble_src("jkp reg[0]").unwrap()).unwrap();
    ///
    /// let keys = sim.key_sender();
    /// std::thread::spawn(move || keys.press(0)).join().unwrap();
    ///
    /// sim.step_in().unwrap();
    /// assert_eq!(sim.pc, 0x204);
    /// ```
    pub fn key_sender(&self) -> KeySender {
        self.keys.sender()
    }

    /// Fallibly reads the byte at the provided address, recording the read in the observer.
    ///
    /// If you would like to query the memory's state without recording it, use the `mem` field.
    pub fn read_mem(&mut self, addr: u16) -> Result<u8, SimErr> {
        let data = self.mem.get(usize::from(addr))?;
        self.observer.update_mem_accesses(addr, AccessSet::READ);
        Ok(data)
    }

    /// Fallibly writes the byte at the provided address, recording the write in the observer.
    ///
    /// If you would like to edit the memory's state without recording it, use the `mem` field.
    pub fn write_mem(&mut self, addr: u16, data: u8) -> Result<(), SimErr> {
        self.write_block(addr, &[data])
    }

    fn read_block(&mut self, addr: u16, len: usize) -> Result<&[u8], SimErr> {
        let block = self.mem.slice(usize::from(addr), len)?;
        for a in (addr..).take(len) {
            self.observer.update_mem_accesses(a, AccessSet::READ);
        }
        Ok(block)
    }

    fn write_block(&mut self, addr: u16, data: &[u8]) -> Result<(), SimErr> {
        let block = self.mem.slice_mut(usize::from(addr), data.len())?;
        for (a, (cell, &new)) in (addr..).zip(block.iter_mut().zip(data)) {
            let old = std::mem::replace(cell, new);
            self.observer.update_mem_accesses(a, AccessSet::write(old, new));
        }
        Ok(())
    }

    /// Indicates whether the last execution of the simulator hit a breakpoint.
    pub fn hit_breakpoint(&self) -> bool {
        matches!(self.pause_condition, PauseCondition::Breakpoint)
    }

    /// Runs until the tripwire condition returns false (or a breakpoint matches).
    pub fn run_while(&mut self, mut tripwire: impl FnMut(&mut Simulator) -> bool) -> Result<(), SimErr> {
        self.observer.clear();
        std::mem::take(&mut self.pause_condition);

        // event loop
        // run until:
        // 1. the tripwire condition returns false
        // 2. any of the breakpoints are hit
        let result = loop {
            // Tripwire turned off:
            if !tripwire(self) {
                break Ok(PauseCondition::Tripwire);
            }
            // Run a step:
            if let Err(e) = self.step() {
                break Err(e);
            }
            // After executing, check that any breakpoints were hit.
            if self.breakpoints.iter().any(|bp| bp.check(self)) {
                break Ok(PauseCondition::Breakpoint);
            }
        };

        self.pause_condition = result?;
        Ok(())
    }

    /// Execute the program with a limit on how many steps to execute.
    ///
    /// This blocks until the number of steps to execute has been hit
    /// (or a breakpoint matches).
    pub fn run_with_limit(&mut self, max_steps: u64) -> Result<(), SimErr> {
        let i = self.instructions_run;
        self.run_while(|sim| sim.instructions_run.wrapping_sub(i) < max_steps)
    }

    /// Fetches the instruction at the PC, advancing the PC.
    ///
    /// If the instruction cannot be fetched, the simulator is left unchanged.
    fn fetch(&mut self) -> Result<Opcode, SimErr> {
        let pc = self.pc;
        if pc % 2 != 0 || pc < PROGRAM_START {
            return Err(SimErr::PcOutOfBounds(pc));
        }
        let word = self.mem.read_word(pc)
            .ok_or(SimErr::PcOutOfBounds(pc))?;
        let instr = Opcode::decode(word)
            .ok_or(SimErr::IllegalOpcode(word))?;

        self.current_opcode = word;
        self.pc = pc + 2;
        Ok(instr)
    }

    /// Skips the next instruction.
    fn skip_if(&mut self, cond: bool) {
        if cond {
            self.pc = self.pc.wrapping_add(2);
        }
    }

    /// Reads the key number held in a register.
    fn key_in(&self, reg: Reg) -> Result<u8, SimErr> {
        match self.reg_file[reg] {
            k if usize::from(k) < KEY_COUNT => Ok(k),
            k => Err(SimErr::InvalidKey(k)),
        }
    }

    /// Executes a fetched instruction.
    ///
    /// Every check that can fail happens before any state is modified.
    fn execute(&mut self, instr: Opcode) -> Result<(), SimErr> {
        let (x, y) = (instr.x(), instr.y());
        let (vx, vy) = (self.reg_file[x], self.reg_file[y]);

        match instr.op() {
            Op::Cls => {
                self.display.clear();
                self.observer.touch_display();
            },
            Op::Ret => {
                let frame = self.stack.pop_frame()
                    .ok_or(SimErr::StackUnderflow)?;
                self.pc = frame.return_addr;
            },
            Op::Sys => tracing::warn!("ignoring {instr}: machine code routines are not supported"),
            Op::Jmp => self.pc = instr.nnn(),
            Op::Call => {
                let caller = self.pc.wrapping_sub(2);
                self.stack.push_frame(caller, instr.nnn(), self.pc);
                self.pc = instr.nnn();
            },
            Op::SkipEqImm => self.skip_if(vx == instr.nn()),
            Op::SkipNeImm => self.skip_if(vx != instr.nn()),
            Op::SkipEqReg => self.skip_if(vx == vy),
            Op::LoadImm => self.reg_file[x] = instr.nn(),
            Op::AddImm => self.reg_file[x] = vx.wrapping_add(instr.nn()),
            Op::Move => self.reg_file[x] = vy,
            Op::Or  => self.reg_file[x] = vx | vy,
            Op::And => self.reg_file[x] = vx & vy,
            Op::Xor => self.reg_file[x] = vx ^ vy,
            Op::AddReg => {
                let (sum, carry) = vx.overflowing_add(vy);
                self.reg_file[VF] = u8::from(carry);
                self.reg_file[x] = sum;
            },
            Op::Sub => {
                self.reg_file[VF] = u8::from(vy <= vx);
                self.reg_file[x] = vx.wrapping_sub(vy);
            },
            Op::ShiftRight => {
                self.reg_file[VF] = vx & 1;
                self.reg_file[x] = vx >> 1;
            },
            Op::SubRev => {
                self.reg_file[VF] = u8::from(vx <= vy);
                self.reg_file[x] = vy.wrapping_sub(vx);
            },
            Op::ShiftLeft => {
                // VF is 0 or 0x80 here, not 0 or 1.
                self.reg_file[VF] = vx & 0x80;
                self.reg_file[x] = vx << 1;
            },
            Op::SkipNeReg => self.skip_if(vx != vy),
            Op::LoadAddr => self.i = instr.nnn(),
            Op::JumpOffset => self.pc = instr.nnn() + u16::from(self.reg_file[V0]),
            Op::Random => {
                let r: u8 = self.rng.gen_range(0..254);
                self.reg_file[x] = instr.nn() & r;
            },
            Op::Draw => {
                let rows = self.read_block(self.i, usize::from(instr.n()))?.to_vec();
                let collision = self.display.draw_sprite(vx, vy, &rows);
                self.observer.touch_display();
                self.reg_file[VF] = u8::from(collision);
            },
            Op::SkipKey => {
                let key = self.key_in(x)?;
                if self.keypad.is_pressed(key) {
                    self.keypad.release(key);
                    self.skip_if(true);
                }
            },
            Op::SkipNotKey => {
                let key = self.key_in(x)?;
                match self.keypad.is_pressed(key) {
                    true  => { self.keypad.release(key); },
                    false => self.skip_if(true),
                }
            },
            Op::ReadDelay => self.reg_file[x] = self.timers.delay,
            Op::WaitKey => tracing::warn!("ignoring {instr}: waiting for a key press is not supported"),
            Op::SetDelay => self.timers.delay = vx,
            Op::SetSound => self.timers.sound = vx,
            Op::AddAddr => {
                let i = self.i.wrapping_add(u16::from(vx));
                self.reg_file[VF] = u8::from(i > 0xFFF);
                self.i = i;
            },
            Op::FontAddr => self.i = 5 * u16::from(vx),
            Op::Bcd => self.write_block(self.i, &[vx / 100, vx / 10 % 10, vx % 10])?,
            Op::StoreRegs => {
                let regs = *self.reg_file.as_array();
                let n = usize::from(x);
                self.write_block(self.i, &regs[..=n])?;
                self.i = self.i.wrapping_add(n as u16 + 1);
            },
            Op::LoadRegs => {
                let mut regs = *self.reg_file.as_array();
                let n = usize::from(x);
                regs[..=n].copy_from_slice(self.read_block(self.i, n + 1)?);
                *self.reg_file.as_array_mut() = regs;
            },
        }

        Ok(())
    }

    /// Simulate one step, executing one instruction and then ticking the timers.
    ///
    /// If an error occurs, the PC is left at the instruction which caused it
    /// and the machine state is unchanged.
    fn step(&mut self) -> Result<(), SimErr> {
        self.keys.drain_into(&mut self.keypad);

        let (pc, opcode) = (self.pc, self.current_opcode);
        let instr = self.fetch()?;
        if self.flags.trace {
            tracing::trace!(pc, word = instr.word(), "{instr}");
        }

        let regs = self.reg_file;
        if let Err(e) = self.execute(instr) {
            self.pc = pc;
            self.current_opcode = opcode;
            return Err(e);
        }
        self.observer.update_regs(&regs, &self.reg_file);

        self.instructions_run = self.instructions_run.wrapping_add(1);
        self.timers.tick();
        Ok(())
    }

    /// Simulate one step, executing one instruction.
    pub fn step_in(&mut self) -> Result<(), SimErr> {
        self.observer.clear();
        self.step()
    }

    /// Simulate one step, executing one instruction and running through entire subroutines as a single step.
    pub fn step_over(&mut self) -> Result<(), SimErr> {
        let curr_frame = self.stack.len();
        let mut first = Some(()); // is Some if this is the first instruction executed in this call

        // this function should do at least one step before checking its condition
        // condition: run until we have landed back in the same frame
        self.run_while(|sim| first.take().is_some() || curr_frame < sim.stack.len())
    }

    /// Run through the simulator's execution until the subroutine is exited.
    pub fn step_out(&mut self) -> Result<(), SimErr> {
        let curr_frame = self.stack.len();
        let mut first = Some(()); // is Some if this is the first instruction executed in this call

        // this function should do at least one step before checking its condition
        // condition: run until we've landed in a smaller frame
        if curr_frame != 0 {
            self.run_while(|sim| first.take().is_some() || curr_frame <= sim.stack.len())?;
        }
        Ok(())
    }
}
impl Default for Simulator {
    fn default() -> Self {
        Self::new(Default::default())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::asm::assemble_src;
    use crate::ast::reg_consts::{V0, V1, V2, V3, VA, VF};
    use crate::isa::MEM_SIZE;

    use super::debug::{Breakpoint, Cmp, Comparator};
    use super::device::{ManualClock, Pixel, TIMER_CAP};
    use super::frame::Frame;
    use super::{SimErr, SimFlags, Simulator};

    fn load(src: &str) -> Simulator {
        let obj = assemble_src(src).unwrap();
        let mut sim = Simulator::new(SimFlags { seed: Some(2110), ..Default::default() });
        sim.load_obj_file(&obj).unwrap();
        sim
    }

    fn steps(sim: &mut Simulator, n: usize) {
        for _ in 0..n {
            sim.step_in().unwrap();
        }
    }

    #[test]
    fn test_add_carry() {
        let mut sim = load("
            mov reg[0], 0xFF
            mov reg[1], 0x01
            add reg[0], reg[1]
            add reg[0], reg[1]
        ");
        steps(&mut sim, 3);
        assert_eq!(sim.reg_file[V0], 0x00);
        assert_eq!(sim.reg_file[VF], 1);

        steps(&mut sim, 1);
        assert_eq!(sim.reg_file[V0], 0x01);
        assert_eq!(sim.reg_file[VF], 0);
    }

    #[test]
    fn test_sub_borrow() {
        let mut sim = load("
            mov reg[0], 0x01
            mov reg[1], 0x02
            sub reg[0], reg[1]
            mov reg[2], 5
            mov reg[3], 7
            subn reg[2], reg[3]
            sub reg[3], reg[3]
        ");
        steps(&mut sim, 3);
        assert_eq!(sim.reg_file[V0], 0xFF);
        assert_eq!(sim.reg_file[VF], 0);

        steps(&mut sim, 3);
        assert_eq!(sim.reg_file[V2], 2);
        assert_eq!(sim.reg_file[VF], 1);

        // equal operands do not borrow
        steps(&mut sim, 1);
        assert_eq!(sim.reg_file[V3], 0);
        assert_eq!(sim.reg_file[VF], 1);
    }

    #[test]
    fn test_immediates_keep_flag() {
        let mut sim = load("
            mov reg[15], 7
            mov reg[0], 0xFF
            add reg[0], 2
        ");
        steps(&mut sim, 3);
        assert_eq!(sim.reg_file[V0], 1);
        assert_eq!(sim.reg_file[VF], 7);
    }

    #[test]
    fn test_shifts() {
        let mut sim = load("
            mov reg[0], 0x81
            shl reg[0]
            mov reg[1], 0x03
            shr reg[1]
            shl reg[1]
        ");
        steps(&mut sim, 2);
        assert_eq!(sim.reg_file[V0], 0x02);
        assert_eq!(sim.reg_file[VF], 0x80);

        steps(&mut sim, 2);
        assert_eq!(sim.reg_file[V1], 0x01);
        assert_eq!(sim.reg_file[VF], 1);

        steps(&mut sim, 1);
        assert_eq!(sim.reg_file[V1], 0x02);
        assert_eq!(sim.reg_file[VF], 0);
    }

    #[test]
    fn test_sprite_collision() {
        let mut sim = load("
            mov I, 0x300
            mov reg[0], 4
            mov reg[1], 2
            drw reg[0], reg[1], 1
            drw reg[0], reg[1], 1
            drw reg[0], reg[1], 1
        ");
        sim.mem[0x300] = 0b1111_0000;
        steps(&mut sim, 4);
        assert_eq!(sim.reg_file[VF], 0);
        assert_eq!(sim.display.get(4, 2), Some(Pixel::Set));
        assert_eq!(sim.display.get(8, 2), Some(Pixel::Empty));

        steps(&mut sim, 1);
        assert_eq!(sim.reg_file[VF], 1);
        assert!((4..8).all(|x| sim.display.get(x, 2) == Some(Pixel::Collision)));
        assert_eq!(sim.i, 0x300);

        // Collision pixels are cleared before the next draw.
        steps(&mut sim, 1);
        assert_eq!(sim.reg_file[VF], 0);
        assert!((4..8).all(|x| sim.display.get(x, 2) == Some(Pixel::Set)));

        assert!(sim.observer.get_mem_accesses(0x300).read());
        assert!(sim.observer.display_touched());
        assert!(sim.observer.reg_changed(VF));
    }

    #[test]
    fn test_timer_decay() {
        let clock = ManualClock::new();
        let mut sim = Simulator::with_clock(Default::default(), Arc::new(clock.clone()));
        sim.load_obj_file(&assemble_src("spin: jmp spin").unwrap()).unwrap();
        assert_eq!(sim.timers.delay, TIMER_CAP);

        for _ in 0..70 {
            clock.advance(Duration::from_millis(17));
            sim.step_in().unwrap();
            assert!(sim.timers.delay <= TIMER_CAP);
        }
        assert_eq!(sim.timers.delay, 0);
        assert_eq!(sim.timers.sound, 0);
    }

    #[test]
    fn test_timer_registers() {
        let clock = ManualClock::new();
        let mut sim = Simulator::with_clock(Default::default(), Arc::new(clock.clone()));
        sim.load_obj_file(&assemble_src("
            mov reg[0], 5
            mov delay, reg[0]
            mov snd_delay, reg[0]
            mov reg[1], delay
        ").unwrap()).unwrap();

        steps(&mut sim, 4);
        assert_eq!(sim.timers.delay, 5);
        assert_eq!(sim.timers.sound, 5);
        assert_eq!(sim.reg_file[V1], 5);
    }

    #[test]
    fn test_store_load_asymmetry() {
        let mut sim = load("
            mov reg[0], 1
            mov reg[1], 2
            mov reg[2], 3
            mov I, 0x300
            fx55 reg[2]
        ");
        steps(&mut sim, 5);
        assert_eq!(sim.mem.slice(0x300, 4).unwrap(), &[1, 2, 3, 0]);
        assert_eq!(sim.i, 0x303);

        let mut sim = load("
            mov reg[2], 0x42
            mov I, 0x300
            fx65 reg[1]
        ");
        sim.mem.load(0x300, &[9, 8, 7]).unwrap();
        steps(&mut sim, 3);
        assert_eq!((sim.reg_file[V0], sim.reg_file[V1], sim.reg_file[V2]), (9, 8, 0x42));
        assert_eq!(sim.i, 0x300);
    }

    #[test]
    fn test_bcd() {
        let mut sim = load("
            mov reg[0], 234
            mov I, 0x300
            fx33 reg[0]
        ");
        sim.mem[0x302] = 4;
        steps(&mut sim, 3);
        assert_eq!(sim.mem.slice(0x300, 3).unwrap(), &[2, 3, 4]);
        assert_eq!(sim.i, 0x300);

        let first = sim.observer.get_mem_accesses(0x300);
        assert!(first.written() && first.modified());
        let last = sim.observer.get_mem_accesses(0x302);
        assert!(last.written() && !last.modified());
    }

    #[test]
    fn test_address_ops() {
        let mut sim = load("
            mov reg[0], 4
            mov reg[2], 0xA
            fx29 reg[2]
            mov I, 0xFFF
            add I, reg[0]
            add I, reg[0]
            rjmp 0x300
        ");
        steps(&mut sim, 3);
        assert_eq!(sim.i, 50);

        steps(&mut sim, 2);
        assert_eq!(sim.i, 0x1003);
        assert_eq!(sim.reg_file[VF], 1);

        sim.i = 0x10;
        steps(&mut sim, 1);
        assert_eq!(sim.i, 0x14);
        assert_eq!(sim.reg_file[VF], 0);

        steps(&mut sim, 1);
        assert_eq!(sim.pc, 0x304);
    }

    #[test]
    fn test_skips() {
        let mut sim = load("
            seq reg[0], 0
            cls
            sneq reg[0], 0
            mov reg[1], 1
            seq reg[0], reg[1]
            sneq reg[0], reg[1]
        ");
        steps(&mut sim, 1);
        assert_eq!(sim.pc, 0x204);
        steps(&mut sim, 1);
        assert_eq!(sim.pc, 0x206);
        steps(&mut sim, 1);
        assert_eq!(sim.pc, 0x208);
        steps(&mut sim, 1);
        assert_eq!(sim.pc, 0x20A);
        steps(&mut sim, 1);
        assert_eq!(sim.pc, 0x20E);
    }

    #[test]
    fn test_unsupported_are_noops() {
        let mut sim = load("
            syscall 0x123
            wk reg[0]
        ");
        steps(&mut sim, 2);
        assert_eq!(sim.pc, 0x204);
        assert_eq!(sim.reg_file[V0], 0);
        assert_eq!(sim.instructions_run, 2);
    }

    #[test]
    fn test_random() {
        let src = "
            brnd reg[0], 0xFF
            brnd reg[1], 0xFF
            brnd reg[2], 0
        ";
        let mut a = load(src);
        let mut b = load(src);
        steps(&mut a, 3);
        steps(&mut b, 3);
        assert_eq!(a.reg_file, b.reg_file);
        assert!(a.reg_file[V0] < 254 && a.reg_file[V1] < 254);
        assert_eq!(a.reg_file[V2], 0);

        // Resetting reseeds the generator.
        let before = a.reg_file;
        a.reset();
        steps(&mut a, 3);
        assert_eq!(a.reg_file, before);
    }

    #[test]
    fn test_call_stack() {
        let mut sim = load("
                call routine
                ret
            routine:
                ret
        ");
        steps(&mut sim, 1);
        assert_eq!(sim.pc, 0x204);
        assert_eq!(sim.stack.frames(), &[Frame { caller_addr: 0x200, callee_addr: 0x204, return_addr: 0x202 }]);

        steps(&mut sim, 1);
        assert_eq!(sim.pc, 0x202);
        assert!(sim.stack.is_empty());

        assert_eq!(sim.step_in(), Err(SimErr::StackUnderflow));
        assert_eq!(sim.pc, 0x202);
        assert_eq!(sim.current_opcode, 0x00EE);
        assert_eq!(sim.instructions_run, 2);
    }

    #[test]
    fn test_fetch_errors() {
        let mut sim = load("jmp 0x100");
        steps(&mut sim, 1);
        assert_eq!(sim.step_in(), Err(SimErr::PcOutOfBounds(0x100)));
        assert_eq!(sim.pc, 0x100);

        let mut sim = load("jmp 0x201");
        steps(&mut sim, 1);
        assert_eq!(sim.step_in(), Err(SimErr::PcOutOfBounds(0x201)));

        // Runs off the end of memory.
        let mut sim = load("jmp 0xFFE");
        steps(&mut sim, 2);
        assert_eq!(sim.step_in(), Err(SimErr::PcOutOfBounds(0x1000)));

        let mut sim = Simulator::new(Default::default());
        sim.load_program(&[0x8A, 0xB8]).unwrap();
        assert_eq!(sim.step_in(), Err(SimErr::IllegalOpcode(0x8AB8)));
        assert_eq!((sim.pc, sim.current_opcode, sim.instructions_run), (0x200, 0, 0));
    }

    #[test]
    fn test_noncanonical_words() {
        let mut sim = Simulator::new(Default::default());
        sim.load_program(&[
            0x6A, 0x05, // mov reg[0xA], 5
            0x8A, 0xB6, // shr reg[0xA], with a stray Y field
            0x51, 0x21, // seq reg[1], reg[2], with a stray low nibble
            0x00, 0xE0, // skipped
            0x01, 0xE0, // cls, with a stray X field
        ]).unwrap();
        sim.display.draw_sprite(0, 0, &[0x80]);

        sim.step_in().unwrap();
        sim.step_in().unwrap();
        assert_eq!((sim.reg_file[VA], sim.reg_file[VF]), (2, 1));

        sim.step_in().unwrap();
        assert_eq!(sim.pc, 0x208);

        sim.step_in().unwrap();
        assert_eq!(sim.pc, 0x20A);
        assert!(sim.observer.display_touched());
        assert_eq!(sim.display.get(0, 0), Some(Pixel::Empty));
    }

    #[test]
    fn test_mem_out_of_bounds() {
        let mut sim = load("
            mov I, 0xFFE
            mov reg[0], 0x11
            fx55 reg[3]
        ");
        steps(&mut sim, 2);
        assert_eq!(sim.step_in(), Err(SimErr::MemOutOfBounds(MEM_SIZE)));
        assert_eq!(sim.pc, 0x204);
        assert_eq!(sim.i, 0xFFE);
        assert_eq!(sim.mem[0xFFE], 0);

        let mut sim = load("
            mov I, 0xFFE
            drw reg[0], reg[0], 3
        ");
        steps(&mut sim, 1);
        assert_eq!(sim.step_in(), Err(SimErr::MemOutOfBounds(MEM_SIZE)));
    }

    #[test]
    fn test_keys() {
        let mut sim = load("
            jkp reg[0]
            cls
            jkp reg[0]
            cls
            mov reg[1], 16
            jkp reg[1]
            jknp reg[0]
            cls
        ");
        sim.keypad.press(0);
        steps(&mut sim, 1);
        assert_eq!(sim.pc, 0x204);
        assert!(!sim.keypad.is_pressed(0));

        let keys = sim.key_sender();
        keys.press(0);
        steps(&mut sim, 1);
        assert_eq!(sim.pc, 0x208);
        assert!(!sim.keypad.is_pressed(0), "key should be consumed");

        steps(&mut sim, 1);
        assert_eq!(sim.step_in(), Err(SimErr::InvalidKey(16)));
        assert_eq!(sim.pc, 0x20A);

        // jknp does not skip when the key is pressed, but still consumes it
        sim.reset();
        sim.pc = 0x20C;
        keys.press(0);
        steps(&mut sim, 1);
        assert_eq!(sim.pc, 0x20E);
        assert!(!sim.keypad.is_pressed(0));

        sim.pc = 0x20C;
        steps(&mut sim, 1);
        assert_eq!(sim.pc, 0x210);
    }

    #[test]
    fn test_reset() {
        let mut sim = load("
            mov reg[0], 9
            mov I, 0x300
            call routine
            routine:
            drw reg[0], reg[0], 2
        ");
        sim.breakpoints.insert(Breakpoint::PC(0x300));
        sim.flags.trace = true;
        steps(&mut sim, 4);
        sim.keypad.press(5);
        sim.timers.sound = 10;

        sim.reset();
        assert_eq!((sim.pc, sim.i, sim.current_opcode, sim.instructions_run), (0x200, 0, 0, 0));
        assert_eq!(sim.reg_file[V0], 0);
        assert!(sim.stack.is_empty());
        assert!(!sim.keypad.is_pressed(5));
        assert!(sim.display.grid().iter().flatten().all(|&p| p == Pixel::Empty));
        assert_eq!((sim.timers.delay, sim.timers.sound, sim.timers.enabled), (TIMER_CAP, 0, true));
        assert_eq!(&sim.mem.as_slice()[0x200..0x208], sim.program());
        assert!(sim.mem.as_slice()[0x208..].iter().all(|&b| b == 0));

        assert!(sim.flags.trace);
        assert_eq!(sim.breakpoints.len(), 1);
    }

    #[test]
    fn test_program_too_large() {
        let mut sim = Simulator::new(Default::default());
        assert!(sim.load_program(&vec![0; MEM_SIZE - 0x200]).is_ok());
        assert_eq!(sim.load_program(&vec![0; MEM_SIZE - 0x1FF]), Err(SimErr::ProgramTooLarge(MEM_SIZE - 0x1FF)));
        assert_eq!(sim.program().len(), MEM_SIZE - 0x200);
    }

    #[test]
    fn test_breakpoints() {
        let mut sim = load("
                mov reg[0], 0
            top:
                add reg[0], 1
                add reg[0], 1
                add reg[0], 1
                jmp top
        ");

        sim.run_with_limit(3).unwrap();
        assert!(!sim.hit_breakpoint());
        assert_eq!(sim.instructions_run, 3);
        assert_eq!(sim.reg_file[V0], 2);

        sim.breakpoints.insert(Breakpoint::Reg { reg: V0, value: Comparator::Is(Cmp::Ge, 5) });
        sim.run_with_limit(100).unwrap();
        assert!(sim.hit_breakpoint());
        assert_eq!(sim.reg_file[V0], 5);
        assert_eq!(sim.pc, 0x206);

        sim.breakpoints.clear();
        sim.breakpoints.insert(Breakpoint::PC(0x202));
        sim.run_with_limit(100).unwrap();
        assert!(sim.hit_breakpoint());
        assert_eq!(sim.pc, 0x202);
    }

    #[test]
    fn test_step_over_out() {
        let mut sim = load("
                call routine
                mov reg[1], 1
            end:
                jmp end
            routine:
                mov reg[0], 1
                ret
        ");
        sim.step_over().unwrap();
        assert_eq!(sim.pc, 0x202);
        assert_eq!(sim.reg_file[V0], 1);
        assert_eq!(sim.instructions_run, 3);

        sim.reset();
        steps(&mut sim, 1);
        assert_eq!(sim.pc, 0x206);
        sim.step_out().unwrap();
        assert_eq!(sim.pc, 0x202);
        assert!(sim.stack.is_empty());

        // Stepping out of the top level does nothing.
        sim.step_out().unwrap();
        assert_eq!(sim.pc, 0x202);
    }

    #[test]
    fn test_end_to_end() {
        let mut sim = load("
            start:
                mov reg[0], 10
                mov I, sprite
                call routine
                jmp start
            routine:
                cls
                ret
            sprite:
        ");
        steps(&mut sim, 3);
        assert_eq!(sim.pc, 0x208);
        assert_eq!(sim.stack.len(), 1);

        steps(&mut sim, 3);
        assert_eq!(sim.pc, 0x200);
        assert_eq!(sim.reg_file[V0], 10);
        assert_eq!(sim.i, 0x20C);
        assert!(sim.stack.is_empty());
    }
}

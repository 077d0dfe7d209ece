//! Breakpoints for the simulator.
//!
//! A [`Breakpoint`] is a condition on the machine state.
//! When one is inserted into [`Simulator::breakpoints`], every run function
//! (that is, everything except [`Simulator::step_in`]) pauses after the step which satisfies it.
//!
//! [`Simulator::breakpoints`]: super::Simulator::breakpoints
//! [`Simulator::step_in`]: super::Simulator::step_in
use std::cmp::Ordering;

use crate::ast::sim::{Op, Opcode};
use crate::ast::Reg;

use super::Simulator;

/// A condition which pauses execution.
#[derive(PartialEq, Eq, Hash, Clone, Copy)]
pub enum Breakpoint {
    /// Break when the PC reaches the given address.
    PC(u16),
    /// Break when the instruction at the PC is the given operation.
    Op(Op),
    /// Break when a register's value passes the comparator.
    Reg {
        /// Register to check.
        reg: Reg,
        /// Predicate to break against.
        value: Comparator
    },
    /// Break when the address pointer (`I`) passes the comparator.
    I(Comparator),
    /// Break when a byte of memory passes the comparator.
    Mem {
        /// Address to check.
        addr: u16,
        /// Predicate to break against.
        value: Comparator
    },
    /// Break when the delay timer passes the comparator.
    Delay(Comparator),
    /// Break while the given key is held.
    Key(u8),
}
impl Breakpoint where Breakpoint: Send + Sync {}

impl Breakpoint {
    /// Checks if a break should occur.
    pub fn check(&self, sim: &Simulator) -> bool {
        match *self {
            Breakpoint::PC(pc) => sim.pc == pc,
            Breakpoint::Op(op) => sim.mem.read_word(sim.pc)
                .and_then(Opcode::decode)
                .is_some_and(|instr| instr.op() == op),
            Breakpoint::Reg { reg, value } => value.check(u16::from(sim.reg_file[reg])),
            Breakpoint::I(value) => value.check(sim.i),
            Breakpoint::Mem { addr, value } => sim.mem.get(usize::from(addr))
                .is_ok_and(|byte| value.check(u16::from(byte))),
            Breakpoint::Delay(value) => value.check(u16::from(sim.timers.delay)),
            Breakpoint::Key(key) => sim.keypad.is_pressed(key),
        }
    }
}
impl std::fmt::Display for Breakpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Breakpoint::PC(pc) => write!(f, "PC == 0x{pc:03X}"),
            Breakpoint::Op(op) => write!(f, "op {op:?}"),
            Breakpoint::Reg { reg, value } => write!(f, "{reg} {value}"),
            Breakpoint::I(value) => write!(f, "I {value}"),
            Breakpoint::Mem { addr, value } => write!(f, "mem[0x{addr:03X}] {value}"),
            Breakpoint::Delay(value) => write!(f, "DELAY {value}"),
            Breakpoint::Key(key) => write!(f, "key {key:X} held"),
        }
    }
}
impl std::fmt::Debug for Breakpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Breakpoint({self})")
    }
}

/// A relation between the checked value and a reference value.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub enum Cmp {
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `>=`
    Ge,
    /// `>`
    Gt,
}
impl Cmp {
    fn holds(self, ord: Ordering) -> bool {
        match self {
            Cmp::Lt => ord.is_lt(),
            Cmp::Le => ord.is_le(),
            Cmp::Eq => ord.is_eq(),
            Cmp::Ne => ord.is_ne(),
            Cmp::Ge => ord.is_ge(),
            Cmp::Gt => ord.is_gt(),
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Cmp::Lt => "<",
            Cmp::Le => "<=",
            Cmp::Eq => "==",
            Cmp::Ne => "!=",
            Cmp::Ge => ">=",
            Cmp::Gt => ">",
        }
    }
}

/// A predicate on a value of the machine state.
///
/// ```
/// use chip8_ensemble::sim::debug::{Cmp, Comparator};
///
/// let at_least_3 = Comparator::Is(Cmp::Ge, 3);
/// assert!(at_least_3.check(3));
/// assert!(!at_least_3.check(2));
/// assert!(Comparator::Always.check(0));
/// ```
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub enum Comparator {
    /// Never passes.
    Never,
    /// Passes if the value relates to the reference value by the relation.
    Is(Cmp, u16),
    /// Always passes.
    Always,
}
impl Comparator {
    /// Checks if the operand passes the comparator.
    pub fn check(&self, operand: u16) -> bool {
        match *self {
            Comparator::Never => false,
            Comparator::Is(cmp, r) => cmp.holds(operand.cmp(&r)),
            Comparator::Always => true,
        }
    }
}
impl std::fmt::Display for Comparator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Comparator::Never => f.write_str("never"),
            Comparator::Is(cmp, r) => write!(f, "{} {r}", cmp.symbol()),
            Comparator::Always => f.write_str("always"),
        }
    }
}

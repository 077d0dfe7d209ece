//! Decoded instruction words.
//!
//! An instruction word is decoded once into an [`Opcode`], which pairs the word
//! with its entry in the shared [`OPCODE_TABLE`]. The simulator matches exhaustively over [`Op`],
//! and the disassembler prints an `Opcode` using its mnemonic and [`OperandFormat`].
//!
//! [`OPCODE_TABLE`]: crate::isa::OPCODE_TABLE

use std::fmt::Write as _;

use crate::isa::{self, OpcodeEntry};

use super::asm::OperandFormat;
use super::Reg;

/// The operation an instruction word performs.
///
/// Each variant corresponds to exactly one entry of [`crate::isa::OPCODE_TABLE`].
/// In the descriptions below, `X` and `Y` are the register fields,
/// `NNN` is the 12-bit field, `NN` is the 8-bit field, and `N` is the 4-bit field.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Op {
    /// `0NNN`: call a machine code routine (unsupported, ignored).
    Sys,
    /// `00E0`: clear the screen.
    Cls,
    /// `00EE`: return from a subroutine.
    Ret,
    /// `1NNN`: jump to `NNN`.
    Jmp,
    /// `2NNN`: call the subroutine at `NNN`.
    Call,
    /// `3XNN`: skip if `VX == NN`.
    SkipEqImm,
    /// `4XNN`: skip if `VX != NN`.
    SkipNeImm,
    /// `5XY0`: skip if `VX == VY`.
    SkipEqReg,
    /// `6XNN`: `VX = NN`.
    LoadImm,
    /// `7XNN`: `VX += NN` (no carry).
    AddImm,
    /// `8XY0`: `VX = VY`.
    Move,
    /// `8XY1`: `VX |= VY`.
    Or,
    /// `8XY2`: `VX &= VY`.
    And,
    /// `8XY3`: `VX ^= VY`.
    Xor,
    /// `8XY4`: `VX += VY`, with carry in `VF`.
    AddReg,
    /// `8XY5`: `VX -= VY`, with "no borrow" in `VF`.
    Sub,
    /// `8X06`: `VX >>= 1`, with the shifted out bit in `VF`.
    ShiftRight,
    /// `8XY7`: `VX = VY - VX`, with "no borrow" in `VF`.
    SubRev,
    /// `8X0E`: `VX <<= 1`, with `VX & 0x80` in `VF`.
    ShiftLeft,
    /// `9XY0`: skip if `VX != VY`.
    SkipNeReg,
    /// `ANNN`: `I = NNN`.
    LoadAddr,
    /// `BNNN`: jump to `NNN + V0`.
    JumpOffset,
    /// `CXNN`: `VX = NN & random`.
    Random,
    /// `DXYN`: draw an `N` row sprite from `I` at `(VX, VY)`.
    Draw,
    /// `EX9E`: skip if key `VX` is pressed.
    SkipKey,
    /// `EXA1`: skip if key `VX` is not pressed.
    SkipNotKey,
    /// `FX07`: `VX = delay timer`.
    ReadDelay,
    /// `FX0A`: wait for a key press (unsupported, ignored).
    WaitKey,
    /// `FX15`: `delay timer = VX`.
    SetDelay,
    /// `FX18`: `sound timer = VX`.
    SetSound,
    /// `FX1E`: `I += VX`.
    AddAddr,
    /// `FX29`: `I = 5 * VX` (font glyph address).
    FontAddr,
    /// `FX33`: store the decimal digits of `VX` at `I`.
    Bcd,
    /// `FX55`: store `V0..=VX` at `I`, then advance `I`.
    StoreRegs,
    /// `FX65`: load `V0..=VX` from `I`.
    LoadRegs,
}

/// A decoded instruction word.
///
/// # Example
/// ```
/// use chip8_ensemble::ast::sim::{Op, Opcode};
/// use chip8_ensemble::ast::reg_consts::{V0, V1};
///
/// let instr = Opcode::decode(0xD015).unwrap();
/// assert_eq!(instr.op(), Op::Draw);
/// assert_eq!((instr.x(), instr.y(), instr.n()), (V0, V1, 5));
/// assert_eq!(instr.to_string(), "DRW reg[0x0], reg[0x1], 5");
///
/// assert!(Opcode::decode(0x8AB8).is_none());
/// ```
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Opcode {
    entry: &'static OpcodeEntry,
    word: u16
}
impl Opcode {
    /// Decodes an instruction word, returning `None` if the word
    /// does not match any entry of the opcode table.
    pub fn decode(word: u16) -> Option<Self> {
        isa::find(word).map(|entry| Opcode { entry, word })
    }

    /// The operation of this instruction.
    pub fn op(&self) -> Op {
        self.entry.op
    }
    /// The table entry of this instruction.
    pub fn entry(&self) -> &'static OpcodeEntry {
        self.entry
    }
    /// The raw instruction word.
    pub fn word(&self) -> u16 {
        self.word
    }

    /// Register X (bits 8-11).
    pub fn x(&self) -> Reg {
        Reg(((self.word >> 8) & 0xF) as u8)
    }
    /// Register Y (bits 4-7).
    pub fn y(&self) -> Reg {
        Reg(((self.word >> 4) & 0xF) as u8)
    }
    /// The 4-bit immediate (bits 0-3).
    pub fn n(&self) -> u8 {
        (self.word & 0xF) as u8
    }
    /// The 8-bit immediate (bits 0-7).
    pub fn nn(&self) -> u8 {
        (self.word & 0xFF) as u8
    }
    /// The 12-bit address (bits 0-11).
    pub fn nnn(&self) -> u16 {
        self.word & 0xFFF
    }
}
impl std::fmt::Display for Opcode {
    /// Writes the instruction as assembly source code
    /// which assembles back into the same instruction word.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let OpcodeEntry { mnemonic, format, special, .. } = self.entry;
        mnemonic.fmt(f)?;

        // Special register operands always have a table entry for the special register,
        // but keep the output reasonable if that ever changes.
        let spc = special.map_or(String::from("?"), |s| s.to_string());
        match format {
            OperandFormat::Cmd          => Ok(()),
            OperandFormat::CmdVal       => write!(f, " 0x{:03X}", self.nnn()),
            OperandFormat::CmdReg       => write!(f, " {}", self.x()),
            OperandFormat::CmdRegVal    => write!(f, " {}, {}", self.x(), self.nn()),
            OperandFormat::CmdRegReg    => write!(f, " {}, {}", self.x(), self.y()),
            OperandFormat::CmdRegRegVal => write!(f, " {}, {}, {}", self.x(), self.y(), self.n()),
            OperandFormat::CmdRegSpc    => write!(f, " {}, {spc}", self.x()),
            OperandFormat::CmdSpcReg    => write!(f, " {spc}, {}", self.x()),
            OperandFormat::CmdSpcVal    => {
                f.write_char(' ')?;
                f.write_str(&spc)?;
                write!(f, ", 0x{:03X}", self.nnn())
            },
        }
    }
}

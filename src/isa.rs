//! The shared opcode table.
//!
//! Every instruction the toolchain knows about is described by exactly one [`OpcodeEntry`]
//! in [`OPCODE_TABLE`]. The segmenter uses the table to decide how many operands a mnemonic takes,
//! the encoder uses it to find the base word of an instruction,
//! and the decoder uses it to identify an instruction word.
//!
//! An entry is keyed by its mnemonic, its [`OperandFormat`], and (for instructions
//! with a special register operand) the [`SpecialReg`] it addresses.
//! The same mnemonic can appear in several entries (e.g., `MOV`), but the key is always unique.

use crate::ast::asm::OperandFormat;
use crate::ast::sim::Op;
use crate::ast::SpecialReg;
use crate::parse::lex::Ident;

/// The address where programs are loaded and where execution starts.
pub const PROGRAM_START: u16 = 0x200;
/// The size of memory, in bytes.
pub const MEM_SIZE: usize = 4096;

/// A single instruction description.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct OpcodeEntry {
    /// The operation this entry decodes to.
    pub op: Op,
    /// The mnemonic used to write this instruction.
    pub mnemonic: Ident,
    /// The shape of the instruction's operands.
    pub format: OperandFormat,
    /// The special register operand (if the format has one).
    pub special: Option<SpecialReg>,
    /// The instruction word with every operand field set to zero.
    pub base: u16,
}
impl OpcodeEntry {
    /// The bits of an instruction word which select this entry when decoding.
    ///
    /// Words are dispatched on their top nibble. The `0`, `E`, and `F` families then
    /// select on the low byte and the `8` family on the low nibble.
    /// Every other bit is left to the operands, even bits the canonical
    /// encoding of the instruction keeps at zero (such as the Y field of `8XY6`).
    ///
    /// ```
    /// use chip8_ensemble::isa;
    ///
    /// assert_eq!(isa::find(0x5120).map(|e| e.dispatch_mask()), Some(0xF000));
    /// assert_eq!(isa::find(0x8AB6).map(|e| e.dispatch_mask()), Some(0xF00F));
    /// assert_eq!(isa::find(0x00E0).map(|e| e.dispatch_mask()), Some(0xF0FF));
    /// ```
    pub fn dispatch_mask(&self) -> u16 {
        match (self.base >> 12, self.format) {
            (0x0, OperandFormat::Cmd) => 0xF0FF,
            (0x8, _) => 0xF00F,
            (0xE | 0xF, _) => 0xF0FF,
            _ => 0xF000,
        }
    }
}

macro_rules! entry {
    ($op:ident, $mn:ident, $fmt:ident, $base:literal) => {
        OpcodeEntry { op: Op::$op, mnemonic: Ident::$mn, format: OperandFormat::$fmt, special: None, base: $base }
    };
    ($op:ident, $mn:ident, $fmt:ident, $spc:ident, $base:literal) => {
        OpcodeEntry { op: Op::$op, mnemonic: Ident::$mn, format: OperandFormat::$fmt, special: Some(SpecialReg::$spc), base: $base }
    };
}

/// The opcode table.
///
/// Decoding picks the first entry that matches a word, so
/// `CLS` and `RET` are listed before the catch-all `SYSCALL`.
pub static OPCODE_TABLE: [OpcodeEntry; 35] = [
    entry!(Cls,          Cls,     Cmd,          0x00E0),
    entry!(Ret,          Ret,     Cmd,          0x00EE),
    entry!(Sys,          Syscall, CmdVal,       0x0000),
    entry!(Jmp,          Jmp,     CmdVal,       0x1000),
    entry!(Call,         Call,    CmdVal,       0x2000),
    entry!(SkipEqImm,    Seq,     CmdRegVal,    0x3000),
    entry!(SkipNeImm,    Sneq,    CmdRegVal,    0x4000),
    entry!(SkipEqReg,    Seq,     CmdRegReg,    0x5000),
    entry!(LoadImm,      Mov,     CmdRegVal,    0x6000),
    entry!(AddImm,       Add,     CmdRegVal,    0x7000),
    entry!(Move,         Mov,     CmdRegReg,    0x8000),
    entry!(Or,           Or,      CmdRegReg,    0x8001),
    entry!(And,          And,     CmdRegReg,    0x8002),
    entry!(Xor,          Xor,     CmdRegReg,    0x8003),
    entry!(AddReg,       Add,     CmdRegReg,    0x8004),
    entry!(Sub,          Sub,     CmdRegReg,    0x8005),
    entry!(ShiftRight,   Shr,     CmdReg,       0x8006),
    entry!(SubRev,       Subn,    CmdRegReg,    0x8007),
    entry!(ShiftLeft,    Shl,     CmdReg,       0x800E),
    entry!(SkipNeReg,    Sneq,    CmdRegReg,    0x9000),
    entry!(LoadAddr,     Mov,     CmdSpcVal,    Adp,   0xA000),
    entry!(JumpOffset,   Rjmp,    CmdVal,       0xB000),
    entry!(Random,       Brnd,    CmdRegVal,    0xC000),
    entry!(Draw,         Drw,     CmdRegRegVal, 0xD000),
    entry!(SkipKey,      Jkp,     CmdReg,       0xE09E),
    entry!(SkipNotKey,   Jknp,    CmdReg,       0xE0A1),
    entry!(ReadDelay,    Mov,     CmdRegSpc,    Delay, 0xF007),
    entry!(WaitKey,      Wk,      CmdReg,       0xF00A),
    entry!(SetDelay,     Mov,     CmdSpcReg,    Delay, 0xF015),
    entry!(SetSound,     Mov,     CmdSpcReg,    Sound, 0xF018),
    entry!(AddAddr,      Add,     CmdSpcReg,    Adp,   0xF01E),
    entry!(FontAddr,     Fx29,    CmdReg,       0xF029),
    entry!(Bcd,          Fx33,    CmdReg,       0xF033),
    entry!(StoreRegs,    Fx55,    CmdReg,       0xF055),
    entry!(LoadRegs,     Fx65,    CmdReg,       0xF065),
];

/// Finds the entry for the given mnemonic, operand format, and special register.
///
/// ```
/// use chip8_ensemble::ast::asm::OperandFormat;
/// use chip8_ensemble::ast::SpecialReg;
/// use chip8_ensemble::isa;
/// use chip8_ensemble::parse::lex::Ident;
///
/// let entry = isa::lookup(&Ident::Mov, OperandFormat::CmdSpcReg, Some(SpecialReg::Sound)).unwrap();
/// assert_eq!(entry.base, 0xF018);
///
/// assert!(isa::lookup(&Ident::Jmp, OperandFormat::CmdReg, None).is_none());
/// ```
pub fn lookup(mnemonic: &Ident, format: OperandFormat, special: Option<SpecialReg>) -> Option<&'static OpcodeEntry> {
    OPCODE_TABLE.iter()
        .find(|e| &e.mnemonic == mnemonic && e.format == format && e.special == special)
}

/// Finds the entry an instruction word decodes to.
///
/// A word matches an entry if the word agrees with the entry's base
/// on every bit of the entry's [dispatch mask](OpcodeEntry::dispatch_mask).
pub fn find(word: u16) -> Option<&'static OpcodeEntry> {
    OPCODE_TABLE.iter()
        .find(|e| word & e.dispatch_mask() == e.base)
}

/// Iterates over every entry with the given mnemonic.
pub fn entries_for(mnemonic: &Ident) -> impl Iterator<Item=&'static OpcodeEntry> + '_ {
    OPCODE_TABLE.iter()
        .filter(move |e| &e.mnemonic == mnemonic)
}

/// The number of operands the mnemonic takes,
/// or `None` if the identifier is not a mnemonic.
///
/// Every entry sharing a mnemonic takes the same number of operands.
pub fn arity(mnemonic: &Ident) -> Option<usize> {
    entries_for(mnemonic)
        .next()
        .map(|e| e.format.operands().len())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use crate::ast::asm::OperandFormat;
    use crate::ast::SpecialReg;
    use crate::parse::lex::Ident;

    use super::*;

    #[test]
    fn test_keys_unique() {
        let mut keys = HashSet::new();
        for e in OPCODE_TABLE.iter() {
            assert!(keys.insert((e.mnemonic.clone(), e.format, e.special)), "duplicate key for {:04X}", e.base);
        }
    }

    #[test]
    fn test_special_matches_format() {
        for e in OPCODE_TABLE.iter() {
            let has_spc = matches!(e.format, OperandFormat::CmdRegSpc | OperandFormat::CmdSpcReg | OperandFormat::CmdSpcVal);
            assert_eq!(has_spc, e.special.is_some(), "{:04X}", e.base);
        }
    }

    #[test]
    fn test_base_within_mask() {
        for e in OPCODE_TABLE.iter() {
            assert_eq!(e.base & e.format.mask(), e.base, "{:04X} has bits in operand fields", e.base);
            assert_eq!(e.base & e.dispatch_mask(), e.base, "{:04X} has bits outside its selector", e.base);
            assert_eq!(e.dispatch_mask() & !e.format.mask(), 0, "{:04X} selects on an operand field", e.base);
        }
    }

    #[test]
    fn test_uniform_arity() {
        for e in OPCODE_TABLE.iter() {
            assert!(
                entries_for(&e.mnemonic).all(|o| o.format.operands().len() == e.format.operands().len()),
                "{} has entries with different operand counts", e.mnemonic
            );
        }
        assert_eq!(arity(&Ident::Cls), Some(0));
        assert_eq!(arity(&Ident::Mov), Some(2));
        assert_eq!(arity(&Ident::Drw), Some(3));
        assert_eq!(arity(&Ident::Reg), None);
    }

    #[test]
    fn test_lookup() {
        assert_eq!(lookup(&Ident::Mov, OperandFormat::CmdRegVal, None).map(|e| e.base), Some(0x6000));
        assert_eq!(lookup(&Ident::Mov, OperandFormat::CmdRegReg, None).map(|e| e.base), Some(0x8000));
        assert_eq!(lookup(&Ident::Mov, OperandFormat::CmdSpcVal, Some(SpecialReg::Adp)).map(|e| e.base), Some(0xA000));
        assert_eq!(lookup(&Ident::Mov, OperandFormat::CmdRegSpc, Some(SpecialReg::Delay)).map(|e| e.base), Some(0xF007));
        assert_eq!(lookup(&Ident::Add, OperandFormat::CmdSpcReg, Some(SpecialReg::Adp)).map(|e| e.base), Some(0xF01E));
        // wrong special register
        assert!(lookup(&Ident::Mov, OperandFormat::CmdSpcVal, Some(SpecialReg::Delay)).is_none());
        assert!(lookup(&Ident::Mov, OperandFormat::CmdRegSpc, Some(SpecialReg::Sound)).is_none());
    }

    #[test]
    fn test_find_order() {
        assert_eq!(find(0x00E0).map(|e| e.op), Some(Op::Cls));
        assert_eq!(find(0x00EE).map(|e| e.op), Some(Op::Ret));
        assert_eq!(find(0x00E1).map(|e| e.op), Some(Op::Sys));
        assert_eq!(find(0x8006).map(|e| e.op), Some(Op::ShiftRight));
        assert_eq!(find(0x8016).map(|e| e.op), Some(Op::ShiftRight));
        assert_eq!(find(0x01E0).map(|e| e.op), Some(Op::Cls));
        assert_eq!(find(0x0FEE).map(|e| e.op), Some(Op::Ret));
        assert_eq!(find(0x5121).map(|e| e.op), Some(Op::SkipEqReg));
        assert_eq!(find(0x9AB7).map(|e| e.op), Some(Op::SkipNeReg));
        assert_eq!(find(0x8128), None);
    }
}

//! Assembly source code statements.
//!
//! The instruction segmenter ([`crate::parse::parse_ast`]) groups the resolved token stream
//! into [`Stmt`]s, each of which is either a label definition or an [`Instruction`].
//! Every instruction is tagged with an [`OperandFormat`], which describes the shape of its operands.

use logos::Span;

use crate::parse::lex::{Ident, Token};

use super::Label;

/// The syntactic kind of a single operand.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum OperandKind {
    /// A register operand, written `reg [ N ]` (4 tokens).
    Reg,
    /// A numeric literal or a label reference (1 token).
    Val,
    /// A special register keyword, such as `I` or `delay` (1 token).
    Spc,
}
impl OperandKind {
    /// The number of tokens this operand occupies.
    pub fn width(self) -> usize {
        match self {
            OperandKind::Reg => 4,
            OperandKind::Val => 1,
            OperandKind::Spc => 1,
        }
    }
}

/// The shape of an instruction's operands.
///
/// Each format fixes the operand sequence of the instruction (see [`OperandFormat::operands`])
/// and which bit fields of the instruction word the operands are packed into:
/// - register X in bits 8-11
/// - register Y in bits 4-7
/// - a 12-bit address in bits 0-11, an 8-bit immediate in bits 0-7, or a 4-bit immediate in bits 0-3
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum OperandFormat {
    /// No operands (`CLS`).
    Cmd,
    /// A 12-bit value (`JMP 0x300`).
    CmdVal,
    /// A register (`SHR reg[1]`).
    CmdReg,
    /// A register and an 8-bit value (`MOV reg[3], 0x2A`).
    CmdRegVal,
    /// Two registers (`ADD reg[1], reg[2]`).
    CmdRegReg,
    /// Two registers and a 4-bit value (`DRW reg[0], reg[1], 5`).
    CmdRegRegVal,
    /// A register and a special register (`MOV reg[1], delay`).
    CmdRegSpc,
    /// A special register and a register (`MOV delay, reg[1]`).
    CmdSpcReg,
    /// A special register and a 12-bit value (`MOV I, 0x300`).
    CmdSpcVal,
}
impl OperandFormat {
    /// The operands of this format, in source order.
    pub fn operands(self) -> &'static [OperandKind] {
        use OperandKind::{Reg, Spc, Val};

        match self {
            OperandFormat::Cmd          => &[],
            OperandFormat::CmdVal       => &[Val],
            OperandFormat::CmdReg       => &[Reg],
            OperandFormat::CmdRegVal    => &[Reg, Val],
            OperandFormat::CmdRegReg    => &[Reg, Reg],
            OperandFormat::CmdRegRegVal => &[Reg, Reg, Val],
            OperandFormat::CmdRegSpc    => &[Reg, Spc],
            OperandFormat::CmdSpcReg    => &[Spc, Reg],
            OperandFormat::CmdSpcVal    => &[Spc, Val],
        }
    }

    /// The number of bits of the value operand (if this format has one).
    pub fn value_bits(self) -> Option<u32> {
        match self {
            OperandFormat::CmdVal       => Some(12),
            OperandFormat::CmdSpcVal    => Some(12),
            OperandFormat::CmdRegVal    => Some(8),
            OperandFormat::CmdRegRegVal => Some(4),
            _ => None
        }
    }

    /// The bits of an instruction word which are not operand fields of this format.
    ///
    /// The assembler leaves these bits as they are in the opcode's base word.
    /// Decoding only checks the selector bits (see [`crate::isa::OpcodeEntry::dispatch_mask`]).
    pub fn mask(self) -> u16 {
        match self {
            OperandFormat::Cmd          => 0xFFFF,
            OperandFormat::CmdVal       => 0xF000,
            OperandFormat::CmdReg       => 0xF0FF,
            OperandFormat::CmdRegVal    => 0xF000,
            OperandFormat::CmdRegReg    => 0xF00F,
            OperandFormat::CmdRegRegVal => 0xF000,
            OperandFormat::CmdRegSpc    => 0xF0FF,
            OperandFormat::CmdSpcReg    => 0xF0FF,
            OperandFormat::CmdSpcVal    => 0xF000,
        }
    }

    /// The total number of tokens an instruction of this format occupies
    /// (including the mnemonic and the commas between operands).
    pub fn token_len(self) -> usize {
        let ops = self.operands();
        1 + ops.iter().map(|k| k.width()).sum::<usize>() + ops.len().saturating_sub(1)
    }

    /// Iterates over the operands of this format, alongside the index
    /// of the token holding each operand's value.
    ///
    /// For registers, this is the index token inside the brackets.
    ///
    /// ```
    /// use chip8_ensemble::ast::asm::{OperandFormat, OperandKind};
    ///
    /// // MOV reg [ 3 ] , 0x2a
    /// let positions: Vec<_> = OperandFormat::CmdRegVal.operand_positions().collect();
    /// assert_eq!(positions, [(OperandKind::Reg, 3), (OperandKind::Val, 6)]);
    /// ```
    pub fn operand_positions(self) -> impl Iterator<Item=(OperandKind, usize)> {
        self.operands()
            .iter()
            .scan(1, |cursor, &kind| {
                let pos = match kind {
                    OperandKind::Reg => *cursor + 2,
                    OperandKind::Val | OperandKind::Spc => *cursor,
                };
                *cursor += kind.width() + 1;
                Some((kind, pos))
            })
    }
}

/// An instruction, as segmented from assembly source code.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Instruction {
    /// The instruction's mnemonic.
    pub mnemonic: Ident,
    /// The shape of the instruction's operands.
    pub format: OperandFormat,
    /// All of the tokens of the instruction (starting with the mnemonic), with their spans.
    pub tokens: Vec<(Token, Span)>,
    /// The address of the instruction in memory.
    pub offset: u16,
}
impl Instruction {
    /// The span of the instruction in assembly source code.
    pub fn span(&self) -> Span {
        match (self.tokens.first(), self.tokens.last()) {
            (Some((_, first)), Some((_, last))) => first.start..last.end,
            _ => 0..0
        }
    }
}

/// A segmented statement of assembly source code.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Stmt {
    /// A label definition, which points to the next instruction's address.
    LabelDef {
        /// The label.
        label: Label,
        /// The address the label points to.
        offset: u16,
    },
    /// An instruction.
    Instr(Instruction),
}

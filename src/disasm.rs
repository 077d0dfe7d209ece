//! Disassembling program images.
//!
//! Every instruction word is decoded with [`Opcode::decode`] (using the same opcode table as the assembler),
//! so the text of a decoded instruction can be fed back into the assembler.
//! This gives the same word back unless the word set bits its instruction ignores (e.g., the Y field of `8XY6`).
//!
//! - [`disassemble`] lists a whole program, starting at the program start.
//! - [`window`] lists a few instructions around an address (e.g., the program counter of a running simulator).

use crate::ast::sim::Opcode;
use crate::isa::{MEM_SIZE, PROGRAM_START};

/// The number of consecutive zero words which ends a program.
const ZERO_RUN: usize = 5;

/// A single disassembled word.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct DisasmLine {
    /// The address of the word.
    pub addr: u16,
    /// The raw word.
    pub word: u16,
    /// The decoded instruction, or `None` if the word is not an instruction.
    pub instr: Option<Opcode>,
}
impl DisasmLine {
    /// Decodes the word at the given address.
    pub fn new(addr: u16, word: u16) -> Self {
        DisasmLine { addr, word, instr: Opcode::decode(word) }
    }
}
impl std::fmt::Display for DisasmLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:04X}  ", self.addr)?;
        match &self.instr {
            Some(instr) => instr.fmt(f),
            None => write!(f, "??? (0x{:04X})", self.word),
        }
    }
}

/// Reads the big-endian word at `addr`, if it fits in the slice.
fn read_word(mem: &[u8], addr: usize) -> Option<u16> {
    match mem.get(addr..addr + 2)? {
        &[hi, lo] => Some(u16::from_be_bytes([hi, lo])),
        _ => None,
    }
}

/// Disassembles a memory image.
///
/// `mem` is indexed by address (e.g., the simulator's memory, or a full 4 KiB dump).
/// Disassembly starts at the program start and ends at the end of memory
/// or after a run of five zero words, which are not included.
///
/// # Example
/// ```
/// use chip8_ensemble::disasm::disassemble;
///
/// let mut mem = vec![0; 4096];
/// mem[0x200..0x204].copy_from_slice(&[0x63, 0x2A, 0x8A, 0xB8]);
///
/// let lines: Vec<_> = disassemble(&mem).iter().map(|l| l.to_string()).collect();
/// assert_eq!(lines, ["0x0200  MOV reg[0x3], 42", "0x0202  ??? (0x8AB8)"]);
/// ```
pub fn disassemble(mem: &[u8]) -> Vec<DisasmLine> {
    let end = mem.len().min(MEM_SIZE);
    let mut lines = vec![];
    let mut zeros = 0;

    let mut addr = usize::from(PROGRAM_START);
    while let Some(word) = read_word(&mem[..end], addr) {
        zeros = match word {
            0 => zeros + 1,
            _ => 0,
        };
        lines.push(DisasmLine::new(addr as u16, word));
        if zeros == ZERO_RUN { break; }
        addr += 2;
    }

    lines.truncate(lines.len() - zeros);
    tracing::debug!(lines = lines.len(), "disassembled image");
    lines
}

/// Disassembles a program image which is loaded at the program start
/// (e.g., the bytes of an [`ObjectFile`]).
///
/// Unlike [`disassemble`], every word of the image is listed.
///
/// [`ObjectFile`]: crate::asm::ObjectFile
pub fn disassemble_image(image: &[u8]) -> Vec<DisasmLine> {
    image.chunks_exact(2)
        .zip((PROGRAM_START..).step_by(2))
        .map(|(c, addr)| DisasmLine::new(addr, u16::from_be_bytes([c[0], c[1]])))
        .collect()
}

/// Disassembles `count` words of memory starting at `addr`.
///
/// Words past the end of memory are not listed.
///
/// # Example
/// ```
/// use chip8_ensemble::disasm::window;
///
/// let mut mem = vec![0; 4096];
/// mem[0x200..0x204].copy_from_slice(&[0x00, 0xE0, 0x00, 0xEE]);
///
/// let lines = window(&mem, 0x202, 3);
/// assert_eq!(lines.len(), 3);
/// assert_eq!(lines[0].to_string(), "0x0202  RET");
/// assert_eq!(lines[1].to_string(), "0x0204  SYSCALL 0x000");
/// ```
pub fn window(mem: &[u8], addr: u16, count: usize) -> Vec<DisasmLine> {
    (0..count)
        .map(|i| usize::from(addr) + 2 * i)
        .map_while(|a| Some(DisasmLine::new(a as u16, read_word(mem, a)?)))
        .collect()
}

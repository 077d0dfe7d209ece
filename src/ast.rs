//! Values shared between the assembler, the disassembler, and the simulator.
//!
//! This module holds registers, special registers, bounded immediates, and labels.
//! Its submodules hold the two representations of an instruction:
//! - [`asm::Stmt`] and [`asm::Instruction`] (data structures holding segmented assembly source code),
//! - and [`sim::Opcode`] (a data structure holding a decoded 16-bit instruction word).

pub mod asm;
pub mod sim;

/// A general purpose register. Must be between 0 and 15.
///
/// Registers are usually taken from [`reg_consts`].
/// A register number can be checked with [`Reg::try_from`], which rejects anything past 15.
///
/// Register 15 (`VF`) doubles as the carry, borrow, and collision flag.
///
/// ## Examples
///
/// ```text
/// MOV reg[3], 0x2A
///     ~~~~~~
/// ADD reg[1], reg[2]
///     ~~~~~~  ~~~~~~
/// DRW reg[0], reg[1], 5
///     ~~~~~~  ~~~~~~
/// ```
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct Reg(pub(crate) u8);

/// Register constants!
pub mod reg_consts {
    use super::Reg;

    /// Register V0 (also used as the base of `RJMP`).
    pub const V0: Reg = Reg(0);
    #[allow(missing_docs)]
    pub const V1: Reg = Reg(1);
    #[allow(missing_docs)]
    pub const V2: Reg = Reg(2);
    #[allow(missing_docs)]
    pub const V3: Reg = Reg(3);
    #[allow(missing_docs)]
    pub const V4: Reg = Reg(4);
    #[allow(missing_docs)]
    pub const V5: Reg = Reg(5);
    #[allow(missing_docs)]
    pub const V6: Reg = Reg(6);
    #[allow(missing_docs)]
    pub const V7: Reg = Reg(7);
    #[allow(missing_docs)]
    pub const V8: Reg = Reg(8);
    #[allow(missing_docs)]
    pub const V9: Reg = Reg(9);
    #[allow(missing_docs)]
    pub const VA: Reg = Reg(10);
    #[allow(missing_docs)]
    pub const VB: Reg = Reg(11);
    #[allow(missing_docs)]
    pub const VC: Reg = Reg(12);
    #[allow(missing_docs)]
    pub const VD: Reg = Reg(13);
    #[allow(missing_docs)]
    pub const VE: Reg = Reg(14);
    /// Register VF, the flag register.
    pub const VF: Reg = Reg(15);
}
impl Reg {
    /// Gets the register number of this [`Reg`]. This is always between 0 and 15.
    pub fn reg_no(self) -> u8 {
        self.0
    }
}
impl std::fmt::Display for Reg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "reg[0x{:X}]", self.0)
    }
}
impl From<Reg> for usize {
    // Used for indexing the reg file in [`crate::sim::mem::RegFile`].
    fn from(value: Reg) -> Self {
        usize::from(value.0)
    }
}
impl TryFrom<u8> for Reg {
    type Error = OffsetNewErr;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        let n = Nibble::new(u16::from(value))?;
        Ok(Reg(n.get() as u8))
    }
}

/// A special register.
///
/// Special registers are written like keywords in assembly source
/// and are not addressed by a register index.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum SpecialReg {
    /// The address pointer `I` (written `adp` or `i`).
    Adp,
    /// The delay timer (written `delay`).
    Delay,
    /// The sound timer (written `snd_delay`).
    Sound,
}
impl std::fmt::Display for SpecialReg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpecialReg::Adp   => f.write_str("I"),
            SpecialReg::Delay => f.write_str("DELAY"),
            SpecialReg::Sound => f.write_str("SND_DELAY"),
        }
    }
}

/// An unsigned immediate value which must fit within `N` bits.
///
/// Each immediate field of an instruction word has a fixed width:
/// - [`Nibble`]: the sprite height of `DRW` and register indices
/// - [`Byte`]: the immediate of `MOV reg[x], nn` and friends
/// - [`Addr`]: the 12-bit address of `JMP`, `CALL`, `MOV I, nnn`, etc.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct Offset<const N: u32>(u16);

/// A 4-bit immediate.
///
/// ## Examples
///
/// ```text
/// DRW reg[0], reg[1], 5
///                     ~
/// ```
pub type Nibble = Offset<4>;
/// An 8-bit immediate.
///
/// ## Examples
///
/// ```text
/// SEQ reg[2], 255
///             ~~~
/// BRND reg[4], 0x0F
///              ~~~~
/// ```
pub type Byte = Offset<8>;
/// A 12-bit address.
///
/// ## Examples
///
/// ```text
/// JMP 0x300
///     ~~~~~
/// MOV I, sprite
///        ~~~~~~
/// ```
pub type Addr = Offset<12>;

impl<const N: u32> std::fmt::Display for Offset<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Error raised when a value does not fit in its instruction field.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum OffsetNewErr {
    /// The value needs more than this many bits.
    CannotFitUnsigned(u32),
}

impl std::fmt::Display for OffsetNewErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OffsetNewErr::CannotFitUnsigned(n) => write!(f, "value does not fit in a {n}-bit field"),
        }
    }
}
impl std::error::Error for OffsetNewErr {}
impl crate::err::Error for OffsetNewErr {
    fn help(&self) -> Option<std::borrow::Cow<str>> {
        match self {
            OffsetNewErr::CannotFitUnsigned(n) => Some(format!("{n}-bit fields hold values from 0 to {}", (1u32 << n) - 1).into()),
        }
    }
}

impl<const N: u32> Offset<N> {
    /// Creates a new immediate value.
    /// This must fit within `N` bits, otherwise an error is raised.
    ///
    /// # Examples
    ///
    /// ```
    /// # use chip8_ensemble::ast::Offset;
    /// #
    /// let pos15 = Offset::<4>::new(15);
    /// let pos16 = Offset::<4>::new(16);
    /// let addr = Offset::<12>::new(0xFFF);
    /// assert!(pos15.is_ok());
    /// assert!(pos16.is_err());
    /// assert!(addr.is_ok());
    /// ```
    ///
    /// # Panics
    ///
    /// This will panic if `N` is larger than 16.
    ///
    /// ```should_panic
    /// # use chip8_ensemble::ast::Offset;
    /// #
    /// let oh_no = Offset::<17>::new(18);
    /// ```
    pub fn new(n: u16) -> Result<Self, OffsetNewErr> {
        assert!(N <= u16::BITS, "bit size {N} exceeds size of backing ({})", u16::BITS);
        match n == Self::truncate(n) {
            true  => Ok(Offset(n)),
            false => Err(OffsetNewErr::CannotFitUnsigned(N)),
        }
    }

    fn truncate(n: u16) -> u16 {
        match N {
            0 => 0,
            _ => (n << (u16::BITS - N)) >> (u16::BITS - N)
        }
    }

    /// Gets the value of the immediate.
    pub fn get(&self) -> u16 {
        self.0
    }
}

/// A label definition, with where its name appears in source.
///
/// # Examples
/// ```text
/// start:
/// ~~~~~
///     MOV reg[0], 10
///     CALL draw
///          ~~~~
///     JMP start
///         ~~~~~
/// draw:
/// ~~~~
///     CLS
///     RET
/// ```
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct Label {
    /// The label's name (lower-cased, like every identifier).
    pub name: String,
    start: usize
}
impl Label {
    /// Creates a label whose name starts at `span.start`.
    ///
    /// The span may also cover the trailing colon of the definition.
    pub fn new(name: String, span: std::ops::Range<usize>) -> Self {
        Label { name, start: span.start }
    }
    /// The span of the label's name in source.
    pub fn span(&self) -> std::ops::Range<usize> {
        self.start..self.start + self.name.len()
    }
}
impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.name.fmt(f)
    }
}

//! Assembling assembly source ASTs into object files.
//!
//! This module is used to convert source ASTs (`Vec<`[`Stmt`]`>`) into object files
//! that can be executed by the simulator.
//!
//! The assembler module notably consists of:
//! - [`assemble`] and [`assemble_debug`]: The main functions which assemble the statements into an object file.
//! - [`SymbolTable`]: a struct holding the symbol table, which stores the address of each label
//!     and rewrites label references into addresses ([`SymbolTable::resolve`])
//! - [`Instruction::encode`]: encoding a single instruction into a 16-bit word, using the opcode table
//! - [`ObjectFile`]: a struct holding the object file, which can be loaded into the simulator and executed
//!
//! [`Stmt`]: crate::ast::asm::Stmt

pub mod encoding;

use std::collections::HashMap;
use std::num::IntErrorKind;

use logos::Span;

use crate::ast::asm::{Instruction, OperandKind, Stmt};
use crate::ast::{Addr, Byte, Nibble, OffsetNewErr};
use crate::err::ErrSpan;
use crate::isa::{self, MEM_SIZE, PROGRAM_START};
use crate::parse::lex::{Ident, Token};
use crate::parse::{parse_ast, ParseErr, ParseErrKind};

/// Assembles a assembly source code AST into an object file.
///
/// The label table is only used during assembly and is not kept in the object file.
///
/// # Example
/// ```
/// use chip8_ensemble::parse::parse_ast;
/// use chip8_ensemble::asm::assemble;
///
/// let src = "
///     LABEL: CLS
///     JMP LABEL
/// ";
/// let ast = parse_ast(src).unwrap();
///
/// let obj_file = assemble(ast);
/// assert!(obj_file.is_ok());
///
/// // Symbol table doesn't exist in object file:
/// let obj_file = obj_file.unwrap();
/// assert!(obj_file.symbol_table().is_none());
/// assert_eq!(obj_file.as_bytes(), [0x00, 0xE0, 0x12, 0x00]);
/// ```
pub fn assemble(ast: Vec<Stmt>) -> Result<ObjectFile, AsmErr> {
    let sym = SymbolTable::new(&ast)?;
    ObjectFile::new(ast, sym, false)
}
/// Assembles a assembly source code AST into an object file,
/// keeping the label table ([`ObjectFile::symbol_table`]).
///
/// # Example
/// ```
/// use chip8_ensemble::parse::parse_ast;
/// use chip8_ensemble::asm::assemble_debug;
///
/// let src = "
///     LABEL: CLS
///     JMP LABEL
/// ";
/// let ast = parse_ast(src).unwrap();
///
/// let obj_file = assemble_debug(ast).unwrap();
/// let sym = obj_file.symbol_table().unwrap();
/// assert_eq!(sym.lookup_label("label"), Some(0x200));
/// assert_eq!(sym.rev_lookup_label(0x200), Some("label"));
/// ```
pub fn assemble_debug(ast: Vec<Stmt>) -> Result<ObjectFile, AsmErr> {
    let sym = SymbolTable::new(&ast)?;
    ObjectFile::new(ast, sym, true)
}
/// Parses and assembles assembly source code into an object file (keeping the label table).
///
/// # Example
/// ```
/// use chip8_ensemble::asm::assemble_src;
///
/// let obj_file = assemble_src("MOV reg[3], 0x2A").unwrap();
/// assert_eq!(obj_file.as_bytes(), [0x63, 0x2A]);
/// ```
pub fn assemble_src(src: &str) -> Result<ObjectFile, AsmErr> {
    let ast = parse_ast(src)?;
    assemble_debug(ast)
}

/// Encodes a list of instructions into a big-endian byte image.
///
/// All label references of the instructions must already be resolved
/// (see [`SymbolTable::resolve`]).
pub fn encode(instrs: &[Instruction]) -> Result<Vec<u8>, AsmErr> {
    let mut image = Vec::with_capacity(2 * instrs.len());
    for instr in instrs {
        if image.len() + 2 > MEM_SIZE - usize::from(PROGRAM_START) {
            return Err(AsmErr::new(AsmErrKind::ProgramTooLarge, instr.span()));
        }
        image.extend(instr.encode()?.to_be_bytes());
    }
    Ok(image)
}

/// Kinds of errors that can occur from assembling given assembly code.
///
/// See [`AsmErr`] for this error type with span information included.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum AsmErrKind {
    /// The source could not be parsed.
    Parse(ParseErrKind),
    /// There is no opcode table entry for the instruction's mnemonic and operands.
    NoOpcodeEntry(Ident),
    /// The tokens of an instruction do not match its operand format.
    MalformedInstr,
    /// Label did not have an assigned address.
    CouldNotFindLabel,
    /// A label reference was not rewritten into an address before encoding.
    UnresolvedLabel(String),
    /// A numeric literal could not be parsed.
    InvalidNumeric(String),
    /// A value does not fit in its field of the instruction word.
    OffsetNewErr(OffsetNewErr),
    /// The program does not fit between the program start and the end of memory.
    ProgramTooLarge,
}
impl std::fmt::Display for AsmErrKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(e)             => e.fmt(f),
            Self::NoOpcodeEntry(m)     => write!(f, "no opcode exists for this form of {m}"),
            Self::MalformedInstr       => f.write_str("instruction does not match its operand format"),
            Self::CouldNotFindLabel    => f.write_str("label could not be found"),
            Self::UnresolvedLabel(l)   => write!(f, "label `{l}` was not resolved to an address"),
            Self::InvalidNumeric(s)    => write!(f, "invalid numeric literal `{s}`"),
            Self::OffsetNewErr(e)      => e.fmt(f),
            Self::ProgramTooLarge      => f.write_str("program does not fit in memory"),
        }
    }
}

/// Error from assembling given assembly code.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct AsmErr {
    /// The value with a span.
    pub kind: AsmErrKind,
    /// The span in the source associated with this value.
    pub span: ErrSpan
}
impl AsmErr {
    /// Creates a new [`AsmErr`].
    pub fn new<E: Into<ErrSpan>>(kind: AsmErrKind, span: E) -> Self {
        AsmErr { kind, span: span.into() }
    }
}
impl From<ParseErr> for AsmErr {
    fn from(value: ParseErr) -> Self {
        AsmErr { kind: AsmErrKind::Parse(value.kind), span: value.span }
    }
}
impl std::fmt::Display for AsmErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.kind.fmt(f)
    }
}
impl std::error::Error for AsmErr {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            AsmErrKind::OffsetNewErr(e) => Some(e),
            _ => None
        }
    }
}
impl crate::err::Error for AsmErr {
    fn span(&self) -> Option<crate::err::ErrSpan> {
        Some(self.span.clone())
    }

    fn help(&self) -> Option<std::borrow::Cow<str>> {
        match &self.kind {
            AsmErrKind::Parse(_)           => None,
            AsmErrKind::NoOpcodeEntry(_)   => Some("the instruction was segmented into a form the opcode table does not know".into()),
            AsmErrKind::MalformedInstr     => Some("instructions should be created by the parser".into()),
            AsmErrKind::CouldNotFindLabel  => Some("try adding this label before an instruction".into()),
            AsmErrKind::UnresolvedLabel(_) => Some("label references must be resolved with the symbol table before encoding".into()),
            AsmErrKind::InvalidNumeric(_)  => Some("numbers are either decimal (e.g., 42) or hexadecimal with a 0x prefix (e.g., 0x2A)".into()),
            AsmErrKind::OffsetNewErr(e)    => e.help(),
            AsmErrKind::ProgramTooLarge    => Some(format!("programs can be at most {} bytes", MEM_SIZE - usize::from(PROGRAM_START)).into()),
        }
    }
}

/// Label names and the addresses they stand for.
///
/// The table is built by the first assembler pass ([`SymbolTable::new`]), which walks
/// the statements and records the offset of every label definition.
/// The second pass ([`SymbolTable::resolve`]) swaps every label reference for that offset.
///
/// Labels are case-insensitive and are stored lower-cased.
///
/// [`assemble`] throws the table away once the image is encoded, while
/// [`assemble_debug`] keeps it in the [`ObjectFile`], so that the object file formats
/// can write it out and tools can name addresses ([`SymbolTable::rev_lookup_label`]).
#[derive(PartialEq, Eq, Clone, Default)]
pub struct SymbolTable {
    labels: HashMap<String, u16>,
}

impl SymbolTable {
    /// Runs the first assembler pass over the statements.
    ///
    /// A label defined twice keeps its last address.
    /// This fails with [`AsmErrKind::ProgramTooLarge`] if an instruction lands outside of program memory.
    ///
    /// ## Example
    /// ```
    /// use chip8_ensemble::parse::parse_ast;
    /// use chip8_ensemble::asm::SymbolTable;
    ///
    /// let src = "
    ///     LOOP:
    ///         ADD reg[0], 1
    ///         JMP LOOP
    ///     done: RET
    /// ";
    /// let ast = parse_ast(src).unwrap();
    ///
    /// let sym = SymbolTable::new(&ast).unwrap();
    /// assert_eq!(sym.lookup_label("loop"), Some(0x200));
    /// assert_eq!(sym.lookup_label("DONE"), Some(0x204));
    /// assert_eq!(sym.lookup_label("elsewhere"), None);
    /// ```
    pub fn new(stmts: &[Stmt]) -> Result<Self, AsmErr> {
        let mut labels = HashMap::new();

        for stmt in stmts {
            match stmt {
                Stmt::LabelDef { label, offset } => {
                    if labels.insert(label.name.to_ascii_lowercase(), *offset).is_some() {
                        tracing::debug!(label = %label, addr = offset, "label redefined");
                    }
                },
                Stmt::Instr(instr) => {
                    let end = usize::from(instr.offset) + 2;
                    if instr.offset < PROGRAM_START || end > MEM_SIZE {
                        return Err(AsmErr::new(AsmErrKind::ProgramTooLarge, instr.span()));
                    }
                },
            }
        }

        Ok(SymbolTable { labels })
    }

    /// The address of a label.
    pub fn lookup_label(&self, label: &str) -> Option<u16> {
        self.labels.get(&label.to_ascii_lowercase()).copied()
    }

    /// A label at the given address.
    ///
    /// When several labels share the address, the alphabetically first one is returned.
    pub fn rev_lookup_label(&self, addr: u16) -> Option<&str> {
        self.labels.iter()
            .filter(|&(_, &a)| a == addr)
            .map(|(label, _)| &**label)
            .min()
    }

    /// Every label with its address, in no particular order.
    pub fn label_iter(&self) -> impl Iterator<Item=(&str, u16)> + '_ {
        self.labels.iter()
            .map(|(label, &addr)| (&**label, addr))
    }

    /// The number of labels.
    pub fn len(&self) -> usize {
        self.labels.len()
    }
    /// Whether there are no labels.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    fn insert(&mut self, label: &str, addr: u16) {
        self.labels.insert(label.to_ascii_lowercase(), addr);
    }

    /// Rewrites every label reference of an instruction into
    /// a decimal literal holding the label's address.
    ///
    /// # Example
    /// ```
    /// use chip8_ensemble::asm::SymbolTable;
    /// use chip8_ensemble::ast::asm::Stmt;
    /// use chip8_ensemble::parse::parse_ast;
    /// use chip8_ensemble::parse::lex::Token;
    ///
    /// let ast = parse_ast("JMP end\nend: RET").unwrap();
    /// let sym = SymbolTable::new(&ast).unwrap();
    ///
    /// let Some(Stmt::Instr(mut jmp)) = ast.into_iter().next() else { unreachable!() };
    /// sym.resolve(&mut jmp).unwrap();
    /// assert_eq!(jmp.tokens[1].0, Token::Decimal("514".to_string()));
    /// ```
    pub fn resolve(&self, instr: &mut Instruction) -> Result<(), AsmErr> {
        for (token, span) in &mut instr.tokens {
            if let Token::LabelRef(name) = token {
                let addr = self.lookup_label(name)
                    .ok_or_else(|| AsmErr::new(AsmErrKind::CouldNotFindLabel, span.clone()))?;
                *token = Token::Decimal(addr.to_string());
            }
        }
        Ok(())
    }
}
impl std::fmt::Debug for SymbolTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut labels: Vec<_> = self.label_iter().collect();
        labels.sort_by_key(|&(label, addr)| (addr, label));

        f.debug_map()
            .entries(labels.into_iter().map(|(label, addr)| (label, HexAddr(addr))))
            .finish()
    }
}

/// Parses a numeric literal into a value which fits within `bits` bits.
fn parse_value(token: &Token, span: &Span, bits: u32) -> Result<u16, AsmErr> {
    let (digits, radix) = match token {
        Token::Decimal(s) => (&**s, 10),
        Token::Hex(s) => match s.strip_prefix("0x") {
            Some(digits) => (digits, 16),
            None => return Err(AsmErr::new(AsmErrKind::InvalidNumeric(s.clone()), span.clone())),
        },
        Token::LabelRef(l) => return Err(AsmErr::new(AsmErrKind::UnresolvedLabel(l.clone()), span.clone())),
        _ => return Err(AsmErr::new(AsmErrKind::MalformedInstr, span.clone())),
    };

    let value = u16::from_str_radix(digits, radix).map_err(|e| {
        let kind = match e.kind() {
            IntErrorKind::PosOverflow => AsmErrKind::OffsetNewErr(OffsetNewErr::CannotFitUnsigned(bits)),
            _ => AsmErrKind::InvalidNumeric(token.to_string()),
        };
        AsmErr::new(kind, span.clone())
    })?;

    let fit = match bits {
        4  => Nibble::new(value).map(|o| o.get()),
        8  => Byte::new(value).map(|o| o.get()),
        12 => Addr::new(value).map(|o| o.get()),
        _  => Ok(value),
    };
    fit.map_err(|e| AsmErr::new(AsmErrKind::OffsetNewErr(e), span.clone()))
}

impl Instruction {
    /// Encodes this instruction into an instruction word.
    ///
    /// The base word is found in the opcode table by the instruction's
    /// mnemonic, operand format, and special register operand (if any).
    /// The first register operand is packed into bits 8-11,
    /// the second into bits 4-7, and the value operand into the low bits.
    ///
    /// All label references must already be resolved (see [`SymbolTable::resolve`]).
    ///
    /// # Example
    /// ```
    /// use chip8_ensemble::ast::asm::Stmt;
    /// use chip8_ensemble::parse::parse_ast;
    ///
    /// let Some(Stmt::Instr(drw)) = parse_ast("DRW reg[0], reg[1], 5").unwrap().pop() else { unreachable!() };
    /// assert_eq!(drw.encode().unwrap(), 0xD015);
    /// ```
    pub fn encode(&self) -> Result<u16, AsmErr> {
        let special = self.tokens.iter()
            .find_map(|(t, _)| match t {
                Token::Ident(id) => id.special_reg(),
                _ => None
            });
        let entry = isa::lookup(&self.mnemonic, self.format, special)
            .ok_or_else(|| AsmErr::new(AsmErrKind::NoOpcodeEntry(self.mnemonic.clone()), self.span()))?;

        let mut word = entry.base;
        let mut reg_shifts = [8, 4].into_iter();
        for (kind, pos) in self.format.operand_positions() {
            let (token, span) = self.tokens.get(pos)
                .ok_or_else(|| AsmErr::new(AsmErrKind::MalformedInstr, self.span()))?;

            match kind {
                OperandKind::Reg => {
                    let shift = reg_shifts.next()
                        .ok_or_else(|| AsmErr::new(AsmErrKind::MalformedInstr, self.span()))?;
                    word |= parse_value(token, span, 4)? << shift;
                },
                OperandKind::Val => {
                    let bits = self.format.value_bits()
                        .ok_or_else(|| AsmErr::new(AsmErrKind::MalformedInstr, self.span()))?;
                    word |= parse_value(token, span, bits)?;
                },
                OperandKind::Spc => {},
            }
        }

        Ok(word)
    }
}

/// An object file.
///
/// This is the final product after assembly source code is fully assembled.
/// This can be loaded in the simulator to run the assembled code.
///
/// The program image of the object file is always loaded at [`PROGRAM_START`].
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ObjectFile {
    /// The big-endian program image.
    ///
    /// Invariant: this fits between [`PROGRAM_START`] and the end of memory.
    image: Vec<u8>,

    /// Labels, if the object file was assembled with [`assemble_debug`].
    sym: Option<SymbolTable>
}
impl ObjectFile {
    /// Creates an empty object file.
    pub fn empty() -> Self {
        ObjectFile { image: vec![], sym: None }
    }

    /// Creates an object file holding a raw program image.
    ///
    /// This returns `None` if the image does not fit in memory.
    pub fn from_bytes(image: Vec<u8>) -> Option<Self> {
        (image.len() <= MEM_SIZE - usize::from(PROGRAM_START))
            .then_some(ObjectFile { image, sym: None })
    }

    /// Creates a new object file from an assembly AST and a symbol table.
    fn new(ast: Vec<Stmt>, sym: SymbolTable, debug: bool) -> Result<Self, AsmErr> {
        let mut instrs = Vec::with_capacity(ast.len());
        for stmt in ast {
            if let Stmt::Instr(mut instr) = stmt {
                sym.resolve(&mut instr)?;
                instrs.push(instr);
            }
        }

        let image = encode(&instrs)?;
        tracing::debug!(instrs = instrs.len(), bytes = image.len(), labels = sym.len(), "assembled object file");

        Ok(Self {
            image,
            sym: debug.then_some(sym),
        })
    }

    /// The program image.
    pub fn as_bytes(&self) -> &[u8] {
        &self.image
    }
    /// Takes the program image out of this object file.
    pub fn into_bytes(self) -> Vec<u8> {
        self.image
    }
    /// Gets an iterator over each instruction word of the image and its address.
    ///
    /// If the image has an odd length, the last byte is paired with a zero byte.
    pub fn words(&self) -> impl Iterator<Item=(u16, u16)> + '_ {
        self.image.chunks(2)
            .zip((PROGRAM_START..).step_by(2))
            .map(|(c, addr)| {
                let hi = c[0];
                let lo = c.get(1).copied().unwrap_or(0);
                (addr, u16::from_be_bytes([hi, lo]))
            })
    }
    /// The label table, if the object file keeps one.
    pub fn symbol_table(&self) -> Option<&SymbolTable> {
        self.sym.as_ref()
    }
}

/// Used for [`std::fmt::Debug`] purposes.
#[repr(transparent)]
struct HexAddr(u16);
impl std::fmt::Debug for HexAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:03X}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::asm::Stmt;
    use crate::ast::sim::Opcode;
    use crate::ast::OffsetNewErr;
    use crate::isa::OPCODE_TABLE;
    use crate::parse::lex::Ident;
    use crate::parse::{parse_ast, ParseErrKind};

    use super::encoding::{BinaryFormat, ObjFileFormat, TextFormat};
    use super::{assemble, assemble_src, AsmErr, AsmErrKind, ObjectFile};

    fn assert_asm_fail<T: std::fmt::Debug>(r: Result<T, AsmErr>, kind: AsmErrKind) {
        assert_eq!(r.unwrap_err().kind, kind);
    }
    fn bytes(src: &str) -> Vec<u8> {
        assemble_src(src).unwrap().into_bytes()
    }

    #[test]
    fn test_encode_basic() {
        assert_eq!(bytes("mov reg[3], 0x2A"), [0x63, 0x2A]);
        assert_eq!(bytes("add reg[1], reg[2]"), [0x81, 0x24]);
        assert_eq!(bytes("jmp 0x300"), [0x13, 0x00]);
        assert_eq!(bytes("drw reg[0], reg[1], 5"), [0xD0, 0x15]);
        assert_eq!(bytes("MOV I, 0xABC\nmov delay, reg[2]\nmov SND_DELAY, reg[3]"), [0xAA, 0xBC, 0xF2, 0x15, 0xF3, 0x18]);
        assert_eq!(bytes("mov reg[0xF], delay\nadd adp, reg[4]"), [0xFF, 0x07, 0xF4, 0x1E]);
        assert_eq!(bytes("brnd reg[4], 0x0F\nshl reg[2]\nsubn reg[1], reg[2]"), [0xC4, 0x0F, 0x82, 0x0E, 0x81, 0x27]);
    }

    #[test]
    fn test_every_entry_roundtrips() {
        for entry in OPCODE_TABLE.iter() {
            // Pick a word with every operand field filled.
            let word = entry.base | (0xFFFF & !entry.format.mask() & 0x0EE5);
            let instr = Opcode::decode(word).unwrap();
            let text = instr.to_string();
            assert_eq!(bytes(&text), word.to_be_bytes(), "{text:?} did not re-assemble into {word:04X}");
        }
    }

    #[test]
    fn test_forward_label() {
        let src = "
            jmp end
            cls
            cls
            end: ret
        ";
        let obj = assemble_src(src).unwrap();
        let sym = obj.symbol_table().unwrap();
        assert_eq!(sym.lookup_label("end"), Some(0x206));
        assert_eq!(sym.rev_lookup_label(0x206), Some("end"));
        assert_eq!(obj.as_bytes(), [0x12, 0x06, 0x00, 0xE0, 0x00, 0xE0, 0x00, 0xEE]);
    }

    #[test]
    fn test_label_redefinition() {
        let obj = assemble_src("a: cls\na: ret\njmp a").unwrap();
        assert_eq!(obj.symbol_table().unwrap().lookup_label("a"), Some(0x202));
        assert_eq!(&obj.as_bytes()[4..], [0x12, 0x02]);
    }

    #[test]
    fn test_value_errors() {
        assert_asm_fail(assemble_src("mov reg[16], 1"), AsmErrKind::OffsetNewErr(OffsetNewErr::CannotFitUnsigned(4)));
        assert_asm_fail(assemble_src("mov reg[1], 256"), AsmErrKind::OffsetNewErr(OffsetNewErr::CannotFitUnsigned(8)));
        assert_asm_fail(assemble_src("jmp 0x1000"), AsmErrKind::OffsetNewErr(OffsetNewErr::CannotFitUnsigned(12)));
        assert_asm_fail(assemble_src("drw reg[0], reg[1], 16"), AsmErrKind::OffsetNewErr(OffsetNewErr::CannotFitUnsigned(4)));
        assert_asm_fail(assemble_src("jmp 99999"), AsmErrKind::OffsetNewErr(OffsetNewErr::CannotFitUnsigned(12)));
        assert_asm_fail(assemble_src("jmp 12ab"), AsmErrKind::InvalidNumeric("12ab".to_string()));
        assert_asm_fail(assemble_src("jmp 9fx0"), AsmErrKind::InvalidNumeric("9fx0".to_string()));
        assert_asm_fail(assemble_src("jmp 0x"), AsmErrKind::InvalidNumeric("0x".to_string()));
    }

    #[test]
    fn test_error_spans() {
        let err = assemble_src("cls\nmov reg[1], 256").unwrap_err();
        assert_eq!(err.span.first(), Some(16..19));

        let err = assemble_src("cls\njmp nowhere").unwrap_err();
        assert_eq!(err.kind, AsmErrKind::Parse(ParseErrKind::UndefinedLabel("nowhere".to_string())));
        assert_eq!(err.span.first(), Some(8..15));
    }

    #[test]
    fn test_unresolved_label() {
        let Some(Stmt::Instr(jmp)) = parse_ast("jmp end\nend: ret").unwrap().into_iter().next() else {
            panic!("expected instruction");
        };
        assert_asm_fail(jmp.encode(), AsmErrKind::UnresolvedLabel("end".to_string()));
    }

    #[test]
    fn test_no_opcode_entry() {
        let Some(Stmt::Instr(mut mov)) = parse_ast("mov reg[1], delay").unwrap().pop() else {
            panic!("expected instruction");
        };
        mov.mnemonic = Ident::Add;
        assert_asm_fail(mov.encode(), AsmErrKind::NoOpcodeEntry(Ident::Add));
    }

    #[test]
    fn test_program_too_large() {
        let fits = "cls\n".repeat(1792);
        assert_eq!(assemble(parse_ast(&fits).unwrap()).unwrap().as_bytes().len(), 3584);

        let too_big = "cls\n".repeat(1793);
        assert_asm_fail(assemble(parse_ast(&too_big).unwrap()), AsmErrKind::ProgramTooLarge);
    }

    #[test]
    fn test_label_table() {
        let src = "Main: cls\nalias: main2: ret\njmp MAIN";
        let obj = assemble_src(src).unwrap();
        let sym = obj.symbol_table().unwrap();

        assert_eq!(sym.len(), 3);
        assert_eq!(sym.lookup_label("main"), Some(0x200));
        assert_eq!(sym.rev_lookup_label(0x202), Some("alias"));
        assert_eq!(sym.rev_lookup_label(0x204), None);
        assert_eq!(format!("{sym:?}"), r#"{"main": 0x200, "alias": 0x202, "main2": 0x202}"#);

        assert!(assemble(parse_ast(src).unwrap()).unwrap().symbol_table().is_none());
    }

    #[test]
    fn test_words() {
        let obj = assemble_src("cls\njmp 0x200").unwrap();
        let words: Vec<_> = obj.words().collect();
        assert_eq!(words, [(0x200, 0x00E0), (0x202, 0x1200)]);

        assert!(ObjectFile::from_bytes(vec![0; 3585]).is_none());
        assert_eq!(ObjectFile::from_bytes(vec![0x00, 0xE0]).unwrap().as_bytes(), [0x00, 0xE0]);
    }

    #[test]
    fn test_ser_deser() {
        let src = "
            start:
                mov reg[0], 10
                mov I, sprite
                call routine
                jmp start
            routine:
                cls
                ret
            sprite:
        ";
        let obj = assemble_src(src).unwrap();

        // Binary format
        let ser = BinaryFormat::serialize(&obj);
        let de = BinaryFormat::deserialize(&ser).expect("binary encoding should've been parseable");
        assert_eq!(de, obj, "binary encoding could not be roundtripped");

        // Text format keeps the image and labels
        let ser = TextFormat::serialize(&obj);
        let de = TextFormat::deserialize(&ser).expect("text encoding should've been parseable");
        assert_eq!(de.as_bytes(), obj.as_bytes(), "text encoding could not be roundtripped");
        let de_sym = de.symbol_table().unwrap();
        for (label, addr) in obj.symbol_table().unwrap().label_iter() {
            assert_eq!(de_sym.lookup_label(label), Some(addr));
        }

        // Objects without symbols
        let obj = assemble(parse_ast("cls\nret").unwrap()).unwrap();
        assert_eq!(BinaryFormat::deserialize(&BinaryFormat::serialize(&obj)), Some(obj.clone()));
        assert_eq!(TextFormat::deserialize(&TextFormat::serialize(&obj)), Some(obj));
    }
}

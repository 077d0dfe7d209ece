//! Tokenizing CHIP-8 assembly.
//!
//! This module holds the tokens that characterize the assembly language ([`Token`])
//! and the [`Lexer`], which hands them out one at a time.
//!
//! Lexing is case-insensitive. Every literal a token carries is lower-cased,
//! so `MOV`, `Mov`, and `mov` all produce the same token.

use logos::{Logos, Span};

/// A unit of information in CHIP-8 assembly source code.
///
/// The [`Token::LabelDef`] and [`Token::LabelRef`] variants are never produced by the lexer.
/// They are assigned by the label resolver (see [`crate::parse::Parser`]), which
/// reclassifies [`Ident::Unknown`] tokens in place.
#[derive(Debug, Logos, PartialEq, Eq, Hash, Clone)]
#[logos(skip r"[ \t\r\n]+", error = LexErr)]
pub enum Token {
    // Numeric literals are collected greedily over hex digits (and `x`),
    // so `12ab` is one (invalid) decimal token rather than a number and an identifier.
    // The encoder validates the digits.

    /// A hexadecimal literal (e.g., `0x2a`, `0xF00`).
    ///
    /// Any numeric literal containing an `x` is a hex literal.
    #[regex(r"[0-9][0-9a-fA-F]*[xX][0-9a-fA-FxX]*", |lx| lx.slice().to_ascii_lowercase())]
    Hex(String),

    /// A decimal literal (e.g., `10`, `255`).
    #[regex(r"[0-9][0-9a-fA-F]*", |lx| lx.slice().to_ascii_lowercase())]
    Decimal(String),

    /// An identifier.
    ///
    /// This can refer to either:
    /// - a keyword (e.g., `mov`, `reg`, `delay`)
    /// - a candidate label (e.g., `loop`, `sprite_data`)
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lx| lx.slice().parse::<Ident>().unwrap_or_else(|e| match e {}))]
    Ident(Ident),

    /// A label definition (an identifier followed by a colon).
    LabelDef(String),

    /// A reference to a label defined somewhere in the source.
    LabelRef(String),

    /// Left bracket, which opens a register index (`reg[`)
    #[token("[")]
    LBracket,

    /// Right bracket, which closes a register index
    #[token("]")]
    RBracket,

    /// A comma, which delineates operands of an instruction
    #[token(",")]
    Comma,

    /// A colon, which ends a label definition
    #[token(":")]
    Colon,

    /// A comment, which starts with `#` and spans the remaining part of the line.
    #[regex(r"#[^\r\n]*")]
    Comment,

    /// A character which does not begin any token.
    Illegal(String),

    /// End of input.
    Eof,
}
impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Hex(lit)      => f.write_str(lit),
            Token::Decimal(lit)  => f.write_str(lit),
            Token::Ident(id)     => id.fmt(f),
            Token::LabelDef(lit) => f.write_str(lit),
            Token::LabelRef(lit) => f.write_str(lit),
            Token::LBracket      => f.write_str("["),
            Token::RBracket      => f.write_str("]"),
            Token::Comma         => f.write_str(","),
            Token::Colon         => f.write_str(":"),
            Token::Comment       => f.write_str("#"),
            Token::Illegal(lit)  => f.write_str(lit),
            Token::Eof           => f.write_str("end of input"),
        }
    }
}

macro_rules! ident_enum {
    ($($kw:literal $(| $alias:literal)* => $Kw:ident),+ $(,)?) => {
        /// An identifier.
        ///
        /// This can refer to either:
        /// - a keyword (a mnemonic such as `MOV` or `DRW`, or an operand keyword such as `reg` or `delay`)
        /// - an unrecognized identifier, which may be a label (e.g., `loop`, `draw_sprite`)
        ///
        /// This token type is case insensitive.
        #[derive(Debug, PartialEq, Eq, Hash, Clone)]
        pub enum Ident {
            $(
                #[allow(missing_docs)]
                $Kw
            ),+,
            /// An identifier which is not a keyword.
            Unknown(String)
        }

        impl std::str::FromStr for Ident {
            type Err = std::convert::Infallible;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.to_ascii_lowercase();
                match &*s {
                    $($kw $(| $alias)* => Ok(Self::$Kw)),*,
                    _ => Ok(Self::Unknown(s))
                }
            }
        }

        impl std::fmt::Display for Ident {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$Kw => f.write_str(&$kw.to_ascii_uppercase())),*,
                    Self::Unknown(id) => f.write_str(id)
                }
            }
        }
    };
}
ident_enum! {
    "cls" => Cls, "syscall" => Syscall, "call" => Call, "ret" => Ret,
    "jmp" => Jmp, "rjmp" => Rjmp, "seq" => Seq, "sneq" => Sneq,
    "jkp" => Jkp, "jknp" => Jknp, "wk" => Wk,
    "mov" => Mov, "add" => Add, "sub" => Sub, "subn" => Subn,
    "or" => Or, "and" => And, "xor" => Xor, "shr" => Shr, "shl" => Shl,
    "brnd" => Brnd, "drw" => Drw,
    "fx29" => Fx29, "fx33" => Fx33, "fx55" => Fx55, "fx65" => Fx65,
    "reg" => Reg, "adp" | "i" => Adp, "delay" => Delay, "snd_delay" => SndDelay,
}
impl Ident {
    /// Whether this identifier names an instruction.
    pub fn is_mnemonic(&self) -> bool {
        !matches!(self, Ident::Reg | Ident::Adp | Ident::Delay | Ident::SndDelay | Ident::Unknown(_))
    }

    /// The special register this identifier names, if it names one.
    pub fn special_reg(&self) -> Option<crate::ast::SpecialReg> {
        use crate::ast::SpecialReg;

        match self {
            Ident::Adp      => Some(SpecialReg::Adp),
            Ident::Delay    => Some(SpecialReg::Delay),
            Ident::SndDelay => Some(SpecialReg::Sound),
            _ => None
        }
    }
}

/// Any errors raised in attempting to tokenize an input stream.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum LexErr {
    /// A symbol was used which is not allowed in assembly files
    #[default]
    InvalidSymbol
}
impl std::fmt::Display for LexErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LexErr::InvalidSymbol => f.write_str("unrecognized symbol"),
        }
    }
}
impl std::error::Error for LexErr {}
impl crate::err::Error for LexErr {
    fn help(&self) -> Option<std::borrow::Cow<str>> {
        match self {
            LexErr::InvalidSymbol => Some("this char does not occur in any token in CHIP-8 assembly".into()),
        }
    }
}

/// Reads tokens out of source code, one at a time.
///
/// Unlike iterating a [`logos::Lexer`] directly, reading from this lexer never fails:
/// unrecognized characters are handed out as [`Token::Illegal`]
/// and the end of the input is handed out as [`Token::Eof`] (on every read past the end).
/// Callers must check for these explicitly.
///
/// # Example
/// ```
/// use chip8_ensemble::parse::lex::{Ident, Lexer, Token};
///
/// let mut lexer = Lexer::new("JMP start");
/// assert_eq!(lexer.next_token(), (Token::Ident(Ident::Jmp), 0..3));
/// assert_eq!(lexer.next_token(), (Token::Ident(Ident::Unknown("start".to_string())), 4..9));
/// assert_eq!(lexer.next_token(), (Token::Eof, 9..9));
///
/// lexer.rewind();
/// assert_eq!(lexer.next_token(), (Token::Ident(Ident::Jmp), 0..3));
/// ```
pub struct Lexer<'s> {
    src: &'s str,
    inner: logos::Lexer<'s, Token>
}
impl<'s> Lexer<'s> {
    /// Creates a new lexer at the start of the given source.
    pub fn new(src: &'s str) -> Self {
        Self { src, inner: Token::lexer(src) }
    }

    /// Reads the next token and its span in the source.
    pub fn next_token(&mut self) -> (Token, Span) {
        match self.inner.next() {
            Some(Ok(token)) => (token, self.inner.span()),
            Some(Err(_)) => (Token::Illegal(self.inner.slice().to_ascii_lowercase()), self.inner.span()),
            None => (Token::Eof, self.src.len()..self.src.len()),
        }
    }

    /// Moves the lexer back to the start of the source.
    pub fn rewind(&mut self) {
        self.inner = Token::lexer(self.src);
    }
}

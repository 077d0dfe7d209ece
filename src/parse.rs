//! Parsing assembly source code into an AST.
//!
//! This module is used to convert strings (which represent assembly source code)
//! into abstract syntax trees (`Vec<`[`Stmt`]`>`).
//!
//! Parsing happens in two stages:
//! 1. The [`Parser`] reads every token from the [`Lexer`] and resolves labels:
//!    an identifier followed by a colon becomes a [`Token::LabelDef`],
//!    and every later (or earlier) use of a defined label becomes a [`Token::LabelRef`].
//! 2. The resolved token stream is segmented into [`Stmt`]s ([`Parser::segment`]).
//!    The operands of each instruction are read according to the opcode table
//!    and tagged with their [`OperandFormat`].
//!
//! [`parse_ast`] does both.
//!
//! [`OperandFormat`]: crate::ast::asm::OperandFormat

pub mod lex;

use std::borrow::Cow;
use std::collections::HashSet;

use logos::Span;

use crate::ast::asm::{Instruction, OperandKind, Stmt};
use crate::ast::{Label, SpecialReg};
use crate::err::ErrSpan;
use crate::isa::{self, PROGRAM_START};
use lex::{Ident, Lexer, Token};

/// Parses an assembly source code string into a `Vec` of statements.
///
/// # Example
/// ```
/// use chip8_ensemble::parse::parse_ast;
///
/// let src = "
///     start:
///         MOV reg[0], 10
///         JMP start
/// ";
/// let ast = parse_ast(src).unwrap();
/// assert_eq!(ast.len(), 3);
/// ```
pub fn parse_ast(s: &str) -> Result<Vec<Stmt>, ParseErr> {
    Parser::new(s)?.segment()
}

/// Kinds of errors that can occur from parsing assembly code.
///
/// See [`ParseErr`] for this error type with span information included.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum ParseErrKind {
    /// A character which does not begin any token.
    IllegalToken(String),
    /// A token that cannot appear at this position.
    UnexpectedToken(String),
    /// The input ended in the middle of an instruction.
    UnexpectedEof,
    /// An identifier was used as an operand, but no label of that name is defined.
    UndefinedLabel(String),
    /// The operands of an instruction do not fit any form of its mnemonic.
    InvalidOperands(Ident),
}
impl std::fmt::Display for ParseErrKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IllegalToken(s)    => write!(f, "unrecognized symbol `{s}`"),
            Self::UnexpectedToken(s) => write!(f, "unexpected token `{s}`"),
            Self::UnexpectedEof      => f.write_str("unexpected end of input"),
            Self::UndefinedLabel(s)  => write!(f, "label `{s}` is not defined"),
            Self::InvalidOperands(m) => write!(f, "invalid operands for {m}"),
        }
    }
}

/// Error from parsing given assembly code.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ParseErr {
    /// The value with a span.
    pub kind: ParseErrKind,
    /// The span in the source associated with this value.
    pub span: ErrSpan
}
impl ParseErr {
    /// Creates a new [`ParseErr`].
    pub fn new<E: Into<ErrSpan>>(kind: ParseErrKind, span: E) -> Self {
        ParseErr { kind, span: span.into() }
    }

    fn unexpected(token: &Token, span: Span) -> Self {
        let kind = match token {
            Token::Eof => ParseErrKind::UnexpectedEof,
            Token::Illegal(s) => ParseErrKind::IllegalToken(s.clone()),
            Token::Ident(Ident::Unknown(s)) => ParseErrKind::UndefinedLabel(s.clone()),
            t => ParseErrKind::UnexpectedToken(t.to_string()),
        };
        ParseErr::new(kind, span)
    }
}
impl std::fmt::Display for ParseErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.kind.fmt(f)
    }
}
impl std::error::Error for ParseErr {}
impl crate::err::Error for ParseErr {
    fn span(&self) -> Option<ErrSpan> {
        Some(self.span.clone())
    }

    fn help(&self) -> Option<Cow<str>> {
        match &self.kind {
            ParseErrKind::IllegalToken(_)    => Some("this char does not occur in any token in CHIP-8 assembly".into()),
            ParseErrKind::UnexpectedToken(_) => Some("each line should hold a label definition or an instruction".into()),
            ParseErrKind::UnexpectedEof      => Some("this instruction is missing operands".into()),
            ParseErrKind::UndefinedLabel(_)  => Some("try adding a label definition with this name followed by a colon".into()),
            ParseErrKind::InvalidOperands(m) => {
                let forms: Vec<_> = isa::entries_for(m)
                    .map(|e| format!("{:?}", e.format))
                    .collect();
                Some(format!("{m} accepts the operand formats: {}", forms.join(", ")).into())
            },
        }
    }
}

/// The label resolver.
///
/// This reads the entire token stream out of a [`Lexer`] before any instruction is segmented,
/// so that labels can be referenced before they are defined.
///
/// # Example
/// ```
/// use chip8_ensemble::parse::Parser;
/// use chip8_ensemble::parse::lex::Token;
///
/// let parser = Parser::new("JMP end\nend: RET").unwrap();
/// let tokens: Vec<_> = parser.tokens().iter().map(|(t, _)| t.clone()).collect();
/// assert_eq!(tokens[1], Token::LabelRef("end".to_string()));
/// assert_eq!(tokens[2], Token::LabelDef("end".to_string()));
/// ```
pub struct Parser<'s> {
    lexer: Lexer<'s>,
    tokens: Vec<(Token, Span)>,
    labels: HashSet<String>,
}
impl<'s> Parser<'s> {
    /// Creates a new parser, reading and resolving all of the tokens of the source.
    pub fn new(src: &'s str) -> Result<Self, ParseErr> {
        let mut parser = Parser { lexer: Lexer::new(src), tokens: vec![], labels: HashSet::new() };
        parser.read_tokens()?;
        Ok(parser)
    }

    /// Reads every token from the start of the source and classifies label identifiers.
    ///
    /// The first pass collects tokens until the end of input,
    /// marking any unknown identifier followed by a colon as a label definition.
    /// The second pass marks every remaining unknown identifier naming a defined label as a label reference.
    /// Unknown identifiers which do not name a label are left alone.
    ///
    /// If an illegal character is found, this stops and errors at that character.
    pub fn read_tokens(&mut self) -> Result<(), ParseErr> {
        self.lexer.rewind();
        self.tokens.clear();
        self.labels.clear();

        // Pass 1
        loop {
            let (token, span) = self.lexer.next_token();
            match token {
                Token::Eof => {
                    self.tokens.push((token, span));
                    break;
                },
                Token::Illegal(s) => {
                    self.tokens.push((Token::Illegal(s.clone()), span.clone()));
                    return Err(ParseErr::new(ParseErrKind::IllegalToken(s), span));
                },
                Token::Colon => {
                    if let Some((last, _)) = self.tokens.last_mut() {
                        if let Token::Ident(Ident::Unknown(name)) = last {
                            let name = std::mem::take(name);
                            self.labels.insert(name.clone());
                            *last = Token::LabelDef(name);
                        }
                    }
                    self.tokens.push((token, span));
                },
                _ => self.tokens.push((token, span)),
            }
        }

        // Pass 2
        let mut refs = 0;
        for (token, _) in &mut self.tokens {
            if let Token::Ident(Ident::Unknown(name)) = token {
                if self.labels.contains(name.as_str()) {
                    *token = Token::LabelRef(std::mem::take(name));
                    refs += 1;
                }
            }
        }

        tracing::debug!(tokens = self.tokens.len(), labels = self.labels.len(), refs, "resolved labels");
        Ok(())
    }

    /// The resolved tokens, ending with [`Token::Eof`].
    pub fn tokens(&self) -> &[(Token, Span)] {
        &self.tokens
    }

    /// Takes the resolved tokens out of this parser.
    pub fn into_tokens(self) -> Vec<(Token, Span)> {
        self.tokens
    }

    /// Iterates over the names of every defined label.
    pub fn labels(&self) -> impl Iterator<Item=&str> + '_ {
        self.labels.iter().map(|s| &**s)
    }

    /// Groups the resolved tokens into statements.
    ///
    /// Each instruction is assigned the address it is loaded at,
    /// starting at [`PROGRAM_START`] and increasing by 2 for every instruction.
    /// A label definition points to the address of the next instruction.
    pub fn segment(&self) -> Result<Vec<Stmt>, ParseErr> {
        let mut cursor = Cursor { tokens: &self.tokens, index: 0, offset: PROGRAM_START };
        let mut stmts = vec![];

        loop {
            let (token, span) = cursor.peek();
            match token {
                Token::Eof => break,
                Token::Comment => cursor.advance(),
                Token::LabelDef(name) => {
                    let label = Label::new(name.clone(), span);
                    stmts.push(Stmt::LabelDef { label, offset: cursor.offset });
                    cursor.advance();
                    if let (Token::Colon, _) = cursor.peek() {
                        cursor.advance();
                    }
                },
                Token::Ident(id) if id.is_mnemonic() => {
                    let instr = cursor.read_instr(id.clone())?;
                    stmts.push(Stmt::Instr(instr));
                },
                t => return Err(ParseErr::unexpected(t, span)),
            }
        }

        tracing::debug!(stmts = stmts.len(), end = cursor.offset, "segmented source");
        Ok(stmts)
    }
}

static EOF: Token = Token::Eof;

/// A position in the resolved token stream.
struct Cursor<'t> {
    tokens: &'t [(Token, Span)],
    index: usize,
    /// The address of the next instruction.
    offset: u16
}
impl<'t> Cursor<'t> {
    fn peek(&self) -> (&'t Token, Span) {
        match self.tokens.get(self.index) {
            Some((t, span)) => (t, span.clone()),
            None => {
                let end = self.tokens.last().map_or(0, |(_, s)| s.end);
                (&EOF, end..end)
            }
        }
    }
    fn advance(&mut self) {
        self.index = (self.index + 1).min(self.tokens.len());
    }
    fn next(&mut self) -> (&'t Token, Span) {
        let next = self.peek();
        self.advance();
        next
    }
    fn expect(&mut self, expected: &Token) -> Result<(), ParseErr> {
        match self.next() {
            (t, _) if t == expected => Ok(()),
            (t, span) => Err(ParseErr::unexpected(t, span)),
        }
    }

    /// Reads a single operand, returning its kind
    /// (and the special register it names, if it names one).
    fn read_operand(&mut self) -> Result<(OperandKind, Option<SpecialReg>), ParseErr> {
        match self.next() {
            (Token::Ident(Ident::Reg), _) => {
                self.expect(&Token::LBracket)?;
                match self.next() {
                    (Token::Hex(_) | Token::Decimal(_), _) => {},
                    (t, span) => return Err(ParseErr::unexpected(t, span)),
                }
                self.expect(&Token::RBracket)?;
                Ok((OperandKind::Reg, None))
            },
            (Token::Ident(id), _) if id.special_reg().is_some() => Ok((OperandKind::Spc, id.special_reg())),
            (Token::Hex(_) | Token::Decimal(_) | Token::LabelRef(_), _) => Ok((OperandKind::Val, None)),
            (t, span) => Err(ParseErr::unexpected(t, span)),
        }
    }

    /// Reads an instruction starting at its mnemonic.
    fn read_instr(&mut self, mnemonic: Ident) -> Result<Instruction, ParseErr> {
        let start = self.index;
        let (_, mn_span) = self.next();
        let Some(arity) = isa::arity(&mnemonic) else {
            return Err(ParseErr::new(ParseErrKind::UnexpectedToken(mnemonic.to_string()), mn_span));
        };

        let mut kinds = Vec::with_capacity(arity);
        let mut special = None;
        for i in 0..arity {
            if i != 0 {
                self.expect(&Token::Comma)?;
            }
            let (kind, spc) = self.read_operand()?;
            kinds.push(kind);
            special = special.or(spc);
        }

        let tokens = self.tokens[start..self.index].to_vec();
        let span = match (tokens.first(), tokens.last()) {
            (Some((_, first)), Some((_, last))) => first.start..last.end,
            _ => mn_span,
        };

        let format = isa::entries_for(&mnemonic)
            .find(|e| e.format.operands() == kinds && e.special == special)
            .map(|e| e.format)
            .ok_or_else(|| ParseErr::new(ParseErrKind::InvalidOperands(mnemonic.clone()), span))?;

        let offset = self.offset;
        self.offset = self.offset.wrapping_add(2);
        Ok(Instruction { mnemonic, format, tokens, offset })
    }
}

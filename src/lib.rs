//! A CHIP-8 style parser, assembler, disassembler, and simulator.
//!
//! Every stage of this crate shares a single opcode table ([`isa`]),
//! so the assembler, the disassembler, and the simulator always agree on what each instruction word means.
//!
//! # Usage
//!
//! To convert source code to an object file, it must be parsed and assembled:
//! ```
//! use chip8_ensemble::parse::parse_ast;
//! use chip8_ensemble::asm::{assemble, assemble_debug, ObjectFile};
//!
//! let code = "
//!     mov reg[0], 0
//!     loop:
//!         add reg[0], 1
//!         jmp loop
//! ";
//! let ast = parse_ast(code).unwrap();
//!
//! // Assemble AST into object file:
//! # {
//! # let ast = ast.clone();
//! let obj_file: ObjectFile = assemble(ast).unwrap();
//! # }
//! // OR:
//! let obj_file: ObjectFile = assemble_debug(ast).unwrap();
//! assert_eq!(obj_file.as_bytes(), &[0x60, 0x00, 0x70, 0x01, 0x12, 0x02]);
//! ```
//!
//! Once an object file has been created, it can be executed with the simulator:
//! ```
//! # use chip8_ensemble::asm::assemble_src;
//! # let obj_file = assemble_src("mov reg[0], 0\nloop:\nadd reg[0], 1\njmp loop").unwrap();
//! use chip8_ensemble::ast::reg_consts::V0;
//! use chip8_ensemble::sim::Simulator;
//!
//! let mut simulator = Simulator::new(Default::default());
//! simulator.load_obj_file(&obj_file).unwrap();
//! simulator.run_with_limit(7).unwrap(); // <-- Result can be handled accordingly
//! assert_eq!(simulator.reg_file[V0], 3);
//! ```
//!
//! Object files (and memory in general) can also be turned back into source:
//! ```
//! # use chip8_ensemble::asm::assemble_src;
//! use chip8_ensemble::disasm::disassemble_image;
//!
//! let obj_file = assemble_src("cls\nret").unwrap();
//! let lines: Vec<_> = disassemble_image(obj_file.as_bytes())
//!     .into_iter()
//!     .map(|l| l.to_string())
//!     .collect();
//! assert_eq!(lines, ["0x0200  CLS", "0x0202  RET"]);
//! ```
//!
//! If more granularity is needed for simulation, there are also step-in and step-out functions.
//! See the [`sim`] module for more details.
#![warn(missing_docs)]

pub mod parse;
pub mod ast;
pub mod isa;
pub mod asm;
pub mod disasm;
pub mod sim;
pub mod err;

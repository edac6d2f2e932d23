//! The Assembler module is in charge of taking a
//! bytecode assembly file and producing the compiled
//! subroutines and structures it describes.
//!
//! It does this with a line-at-a-time tokenizer, a table
//! of opcode templates, and a driver that routes each
//! top-level statement to the element registry or the
//! body assembler.

pub mod body;
pub mod bytecode;
pub mod diagnostics;
pub mod driver;
pub mod error;
pub mod lexer;
pub mod literal;
pub mod opcodes;
pub mod operators;
pub mod registry;

pub use self::body::JumpMode;
pub use self::driver::{Assembler, SaveTarget};
pub use self::error::{Error, Result};

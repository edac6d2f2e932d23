//! The instruction table: every mnemonic the assembler knows, and the
//! opcode template it stands for.
//!
//! Besides the named entries, any opcode can be reached through the generic
//! escape `gen<KIND><major>.<minor>`, e.g. `genlit0.5` is `pushlit` and
//! `gen11.200` is a special instruction nobody has named, taking an optional
//! integer argument.
use std::collections::HashMap;

use regex::Regex;

use super::bytecode::Instruction;
use super::error::{Error, Result};
use super::operators::{BINARY_OPS, TERNARY_OPS, UNARY_OPS};

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum Major {
    Push = 0,
    Binary = 1,
    Unary = 2,
    Ternary = 3,
    Jump = 4,
    Indirect = 5,
    Stack = 6,
    Pop = 7,
    Store = 8,
    Memref = 9,
    Dim = 10,
    Special = 11,
}

// Jump condition bits.
pub const J_IF_TRUE: u8 = 1;
pub const J_IF_FALSE: u8 = 2;
pub const J_IF_EMPTY: u8 = 4;
pub const J_ALWAYS: u8 = J_IF_TRUE | J_IF_FALSE | J_IF_EMPTY;
pub const J_SYMBOLIC: u8 = 8;
pub const J_POP_ALWAYS: u8 = 16;
pub const J_CATCH: u8 = 32;
pub const J_DEC_ZERO: u8 = 64;

// Indirect call restrictions, added to the operation.
pub const I_PROCEDURE: u8 = 4;
pub const I_FUNCTION: u8 = 8;

/// What follows a mnemonic.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ArgKind {
    None,
    /// 16-bit signed or unsigned integer.
    Integer,
    /// Name, interned in the name table.
    Symbol,
    /// Name of a local variable.
    Local,
    /// Literal, added to the literal pool.
    Literal,
    /// Jump target.
    Label,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Template {
    pub major: u8,
    pub minor: u8,
    pub arg: ArgKind,
    /// Argument may be omitted, defaulting to zero.
    pub optional: bool,
}

impl Template {
    pub const fn new(major: u8, minor: u8, arg: ArgKind, optional: bool) -> Self {
        Template { major, minor, arg, optional }
    }
}

const JUMPS: &[(&str, u8)] = &[
    ("j", J_ALWAYS),
    ("jt", J_IF_TRUE),
    ("jf", J_IF_FALSE),
    ("je", J_IF_EMPTY),
    ("jtf", J_IF_TRUE | J_IF_FALSE),
    ("jte", J_IF_TRUE | J_IF_EMPTY),
    ("jfe", J_IF_FALSE | J_IF_EMPTY),
    ("jp", J_ALWAYS | J_POP_ALWAYS),
    ("jtp", J_IF_TRUE | J_POP_ALWAYS),
    ("jfp", J_IF_FALSE | J_POP_ALWAYS),
    ("jep", J_IF_EMPTY | J_POP_ALWAYS),
    ("jtfp", J_IF_TRUE | J_IF_FALSE | J_POP_ALWAYS),
    ("jtep", J_IF_TRUE | J_IF_EMPTY | J_POP_ALWAYS),
    ("jfep", J_IF_FALSE | J_IF_EMPTY | J_POP_ALWAYS),
    ("catch", J_CATCH),
    ("jdz", J_DEC_ZERO),
];

const STACK: &[&str] = &["dup", "drop", "swap"];

/// Special instructions, in minor order.
const SPECIALS: &[(&str, ArgKind, bool)] = &[
    ("uncatch", ArgKind::None, false),
    ("return", ArgKind::Integer, true),
    ("with", ArgKind::None, false),
    ("endwith", ArgKind::None, false),
    ("firstindex", ArgKind::None, false),
    ("nextindex", ArgKind::None, false),
    ("endindex", ArgKind::None, false),
    ("evals", ArgKind::Integer, false),
    ("evalx", ArgKind::None, false),
    ("defsub", ArgKind::Symbol, false),
    ("defshipprop", ArgKind::Symbol, false),
    ("defplanetprop", ArgKind::Symbol, false),
    ("load", ArgKind::None, false),
    ("print", ArgKind::None, false),
    ("addhook", ArgKind::None, false),
    ("runhook", ArgKind::None, false),
    ("throw", ArgKind::None, false),
    ("terminate", ArgKind::None, false),
    ("suspend", ArgKind::None, false),
    ("newarray", ArgKind::Integer, false),
    ("makelist", ArgKind::Integer, false),
    ("newhash", ArgKind::None, false),
    ("instance", ArgKind::None, false),
    ("resizearray", ArgKind::Integer, false),
    ("bind", ArgKind::Integer, false),
    ("first", ArgKind::None, false),
    ("next", ArgKind::None, false),
];

pub const SPECIAL_DEFSUB: u8 = 9;

/// Scopes, in minor order, with the argument each one addresses by.
const SCOPES: &[(&str, ArgKind)] = &[
    ("var", ArgKind::Symbol),
    ("loc", ArgKind::Local),
    ("top", ArgKind::Integer),
    ("glob", ArgKind::Integer),
    ("gvar", ArgKind::Symbol),
    ("lit", ArgKind::Literal),
    ("int", ArgKind::Integer),
    ("bool", ArgKind::Integer),
];

pub const SCOPE_LITERAL: u8 = 5;

const DIMS: &[(&str, u8)] = &[("dimloc", 1), ("dimtop", 2), ("dimglob", 3)];

const INDIRECT_OPS: &[&str] = &["call", "load", "store", "pop"];

pub struct InstructionTable {
    by_name: HashMap<String, Template>,
    by_opcode: HashMap<(u8, u8), String>,
    generic: Regex,
}

impl InstructionTable {
    pub fn new() -> Self {
        let mut table = InstructionTable {
            by_name: HashMap::new(),
            by_opcode: HashMap::new(),
            generic: Regex::new(r"(?i)^gen(int|sym|loc|lit|label)?(\d+)\.(\d+)$")
                .expect("generic instruction pattern"),
        };

        for &(name, minor) in JUMPS {
            table.add(name, Template::new(Major::Jump as u8, minor, ArgKind::Label, false));
        }
        for (minor, name) in STACK.iter().enumerate() {
            table.add(name, Template::new(Major::Stack as u8, minor as u8, ArgKind::Integer, false));
        }
        for (minor, &(name, arg, optional)) in SPECIALS.iter().enumerate() {
            table.add(name, Template::new(Major::Special as u8, minor as u8, arg, optional));
        }
        for &(name, scope) in DIMS {
            table.add(name, Template::new(Major::Dim as u8, scope, ArgKind::Symbol, false));
        }

        table.add_operators("u", Major::Unary, UNARY_OPS);
        table.add_operators("b", Major::Binary, BINARY_OPS);
        table.add_operators("t", Major::Ternary, TERNARY_OPS);

        table.add_scopes("push", Major::Push);
        table.add_scopes("pop", Major::Pop);
        table.add_scopes("store", Major::Store);

        table.add_indirect("ind", Major::Indirect, ArgKind::Integer);
        table.add_indirect("mem", Major::Memref, ArgKind::Symbol);

        table
    }

    fn add(&mut self, name: &str, template: Template) {
        self.by_opcode
            .entry((template.major, template.minor))
            .or_insert_with(|| name.to_owned());
        self.by_name.insert(name.to_owned(), template);
    }

    fn add_operators(&mut self, prefix: &str, major: Major, names: &[&str]) {
        for (minor, name) in names.iter().enumerate() {
            let mnemonic = format!("{}{}", prefix, name.to_lowercase());
            self.add(&mnemonic, Template::new(major as u8, minor as u8, ArgKind::None, false));
        }
    }

    fn add_scopes(&mut self, prefix: &str, major: Major) {
        for (minor, &(scope, arg)) in SCOPES.iter().enumerate() {
            let mnemonic = format!("{}{}", prefix, scope);
            self.add(&mnemonic, Template::new(major as u8, minor as u8, arg, false));
        }
    }

    fn add_indirect(&mut self, suffix: &str, major: Major, arg: ArgKind) {
        for (op, name) in INDIRECT_OPS.iter().enumerate() {
            let op = op as u8;
            let base = format!("{}{}", name, suffix);
            self.add(&base, Template::new(major as u8, op, arg, false));
            self.add(&format!("{}sub", base), Template::new(major as u8, op + I_PROCEDURE, arg, false));
            self.add(&format!("{}func", base), Template::new(major as u8, op + I_FUNCTION, arg, false));
        }
    }

    /// Looks up a mnemonic, case-insensitively.
    pub fn lookup(&self, mnemonic: &str) -> Result<Template> {
        let key = mnemonic.to_lowercase();
        if let Some(template) = self.by_name.get(&key) {
            return Ok(*template);
        }
        if key.starts_with("gen") {
            return self.parse_generic(mnemonic);
        }
        Err(Error::new(format!("unknown instruction \"{}\"", mnemonic)))
    }

    fn parse_generic(&self, mnemonic: &str) -> Result<Template> {
        let malformed = || Error::new(format!("malformed generic instruction \"{}\"", mnemonic));
        let caps = self.generic.captures(mnemonic).ok_or_else(malformed)?;

        let (arg, optional) = match caps.get(1).map(|m| m.as_str().to_lowercase()) {
            None => (ArgKind::Integer, true),
            Some(kind) => match kind.as_str() {
                "int" => (ArgKind::Integer, false),
                "sym" => (ArgKind::Symbol, false),
                "loc" => (ArgKind::Local, false),
                "lit" => (ArgKind::Literal, false),
                _ => (ArgKind::Label, false),
            },
        };
        let major = caps[2].parse::<u8>().map_err(|_| malformed())?;
        let minor = caps[3].parse::<u8>().map_err(|_| malformed())?;
        Ok(Template::new(major, minor, arg, optional))
    }

    /// Renders an instruction back into assembler syntax.
    ///
    /// Symbolic jumps render their label as `L<n>`; label pseudo-instructions
    /// render as `L<n>:`. Instructions without a mnemonic use the generic
    /// escape.
    pub fn disassemble(&self, insn: &Instruction) -> String {
        let mut minor = insn.minor;
        let mut symbolic = false;
        if insn.major == Major::Jump as u8 && minor & J_SYMBOLIC != 0 {
            if minor == J_SYMBOLIC {
                return format!("L{}:", insn.arg);
            }
            minor &= !J_SYMBOLIC;
            symbolic = true;
        }

        let name = match self.by_opcode.get(&(insn.major, minor)) {
            Some(name) => name,
            None => return format!("gen{}.{} {}", insn.major, insn.minor, insn.arg),
        };
        let template = self.by_name[name];
        if symbolic {
            format!("{} L{}", name, insn.arg)
        } else if template.arg == ArgKind::None {
            if insn.arg == 0 {
                name.clone()
            } else {
                format!("{} #{}", name, insn.arg)
            }
        } else {
            format!("{} {}", name, insn.arg)
        }
    }
}

impl Default for InstructionTable {
    fn default() -> Self {
        Self::new()
    }
}

//! The object graph produced by the assembler.
//!
//! A [`BytecodeObject`] is the compiled form of one subroutine; a
//! [`StructureType`] is the compiled form of one structure declaration.
//! Literal values refer to other subroutines and structures by arena index,
//! so mutually recursive subroutines need no shared ownership.
use std::fmt;

use super::error::{Error, Result};
use super::opcodes::{Major, J_SYMBOLIC};

/// Index of a subroutine element inside its assembler.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct SubroutineId(pub(crate) usize);

/// Index of a structure element inside its assembler.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct StructureId(pub(crate) usize);

impl SubroutineId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl StructureId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One VM instruction.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Instruction {
    pub major: u8,
    pub minor: u8,
    pub arg: u16,
}

impl Instruction {
    pub fn new(major: u8, minor: u8, arg: u16) -> Self {
        Instruction { major, minor, arg }
    }

    pub fn is(&self, major: Major, minor: u8) -> bool {
        self.major == major as u8 && self.minor == minor
    }
}

/// A literal pool entry.
#[derive(Clone, PartialEq, Debug)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i32),
    Float(f64),
    String(String),
    Subroutine(SubroutineId),
    Structure(StructureId),
    /// Serializes as exactly this tag/value pair.
    Raw { tag: u16, value: u32 },
}

impl Value {
    /// Pool identity. Floats compare bit for bit, so `0.0` and `-0.0` stay
    /// distinct.
    fn same_literal(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            _ => self == other,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{:?}", v),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Subroutine(id) => write!(f, "<sub #{}>", id.0),
            Value::Structure(id) => write!(f, "<struct #{}>", id.0),
            Value::Raw { tag, value } => write!(f, "({}, {})", tag, value),
        }
    }
}

pub const FLAG_PROCEDURE: u16 = 1;
pub const FLAG_VARARGS: u16 = 2;

/// Compiled code of one subroutine.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BytecodeObject {
    code: Vec<Instruction>,
    local_names: Vec<String>,
    names: Vec<String>,
    literals: Vec<Value>,
    num_labels: u16,
    /// (address, source line) pairs.
    line_numbers: Vec<(u32, u32)>,
    min_args: usize,
    max_args: usize,
    is_varargs: bool,
    is_procedure: bool,
    name: String,
    file_name: String,
}

impl BytecodeObject {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an instruction and returns its address.
    pub fn add_instruction(&mut self, major: u8, minor: u8, arg: u16) -> usize {
        self.code.push(Instruction::new(major, minor, arg));
        self.code.len() - 1
    }

    pub fn set_argument(&mut self, address: usize, arg: u16) {
        if let Some(insn) = self.code.get_mut(address) {
            insn.arg = arg;
        }
    }

    pub fn code(&self) -> &[Instruction] {
        &self.code
    }

    pub fn num_instructions(&self) -> usize {
        self.code.len()
    }

    /// Interns a name and returns its index.
    pub fn add_name(&mut self, name: &str) -> usize {
        if let Some(idx) = self.names.iter().position(|n| n == name) {
            return idx;
        }
        self.names.push(name.to_owned());
        self.names.len() - 1
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn has_local_variable(&self, name: &str) -> bool {
        self.local_variable(name).is_some()
    }

    pub fn local_variable(&self, name: &str) -> Option<usize> {
        self.local_names.iter().position(|n| n == name)
    }

    /// Adds a local variable. Callers check for duplicates first.
    pub fn add_local_variable(&mut self, name: &str) -> usize {
        self.local_names.push(name.to_owned());
        self.local_names.len() - 1
    }

    pub fn local_names(&self) -> &[String] {
        &self.local_names
    }

    /// Returns the index of an equal literal, adding one if needed.
    pub fn add_literal(&mut self, value: Value) -> usize {
        match self.literals.iter().position(|v| v.same_literal(&value)) {
            Some(idx) => idx,
            None => self.add_new_literal(value),
        }
    }

    pub fn add_new_literal(&mut self, value: Value) -> usize {
        self.literals.push(value);
        self.literals.len() - 1
    }

    pub fn literals(&self) -> &[Value] {
        &self.literals
    }

    /// Allocates a label identifier for symbolic jumps.
    pub fn make_label(&mut self) -> Result<u16> {
        let label = self.num_labels;
        self.num_labels = self
            .num_labels
            .checked_add(1)
            .ok_or_else(|| Error::new("too many labels"))?;
        Ok(label)
    }

    /// Emits the pseudo-instruction that places `label` here.
    pub fn add_label(&mut self, label: u16) -> usize {
        self.add_instruction(Major::Jump as u8, J_SYMBOLIC, label)
    }

    pub fn num_labels(&self) -> u16 {
        self.num_labels
    }

    pub fn set_num_labels(&mut self, n: u16) {
        self.num_labels = n;
    }

    pub fn add_line_number(&mut self, line: u32, address: u32) {
        self.line_numbers.push((address, line));
    }

    pub fn line_numbers(&self) -> &[(u32, u32)] {
        &self.line_numbers
    }

    pub fn min_args(&self) -> usize {
        self.min_args
    }

    pub fn set_min_args(&mut self, n: usize) {
        self.min_args = n;
    }

    pub fn max_args(&self) -> usize {
        self.max_args
    }

    pub fn set_max_args(&mut self, n: usize) {
        self.max_args = n;
    }

    pub fn is_varargs(&self) -> bool {
        self.is_varargs
    }

    pub fn set_is_varargs(&mut self, flag: bool) {
        self.is_varargs = flag;
    }

    pub fn is_procedure(&self) -> bool {
        self.is_procedure
    }

    pub fn set_is_procedure(&mut self, flag: bool) {
        self.is_procedure = flag;
    }

    pub fn flags(&self) -> u16 {
        let mut flags = 0;
        if self.is_procedure {
            flags |= FLAG_PROCEDURE;
        }
        if self.is_varargs {
            flags |= FLAG_VARARGS;
        }
        flags
    }

    pub fn set_flags(&mut self, flags: u16) {
        self.is_procedure = flags & FLAG_PROCEDURE != 0;
        self.is_varargs = flags & FLAG_VARARGS != 0;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_owned();
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn set_file_name(&mut self, name: &str) {
        self.file_name = name.to_owned();
    }
}

/// A structure type: an ordered list of field names.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StructureType {
    name: String,
    fields: Vec<String>,
}

impl StructureType {
    pub fn new(name: &str) -> Self {
        StructureType { name: name.to_owned(), fields: Vec::new() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_field(&mut self, name: &str) -> usize {
        self.fields.push(name.to_owned());
        self.fields.len() - 1
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f == name)
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }
}

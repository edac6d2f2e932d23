//! Assembles the body of one subroutine, from the line after its header up
//! to and including its terminator.
//!
//! A body line is empty, a label definition (`NAME:`), a directive
//! (`.local`, `.lit`, ...) or one instruction with at most one argument.
//! Labels either become instruction addresses, patched once the whole body
//! has been read, or VM label identifiers, depending on the [`JumpMode`].
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::convert::TryFrom;
use std::io::BufRead;

use super::bytecode::{BytecodeObject, SubroutineId, Value};
use super::error::{Error, Result};
use super::lexer::{LineReader, Token, Tokenizer};
use super::literal::compile_literal;
use super::opcodes::{ArgKind, InstructionTable, Major, Template, J_SYMBOLIC, SCOPE_LITERAL, SPECIAL_DEFSUB};
use super::registry::Registry;

/// How jump targets are encoded.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum JumpMode {
    /// Jumps carry the address of their target instruction.
    Absolute,
    /// Jumps carry a label identifier; labels emit a pseudo-instruction.
    Symbolic,
}

impl Default for JumpMode {
    fn default() -> Self {
        JumpMode::Absolute
    }
}

#[derive(Copy, Clone, Debug)]
struct LabelState {
    /// Address or label identifier.
    value: u16,
    defined: bool,
}

/// A jump whose target was not known when it was emitted.
#[derive(Debug)]
struct Relocation {
    label: String,
    address: usize,
}

pub struct BodyAssembler<'a> {
    table: &'a InstructionTable,
    registry: &'a Registry,
    bco: &'a mut BytecodeObject,
    current: SubroutineId,
    mode: JumpMode,
    terminator: &'a str,
    labels: BTreeMap<String, LabelState>,
    relocations: Vec<Relocation>,
}

/// Converts a table index into an instruction argument.
fn index(idx: usize) -> Result<u16> {
    u16::try_from(idx).map_err(|_| Error::new(format!("index {} does not fit into an instruction", idx)))
}

/// Converts a signed or unsigned 16-bit value into an instruction argument.
fn int_arg(value: i32) -> Result<u16> {
    if value < i32::from(i16::MIN) || value > i32::from(u16::MAX) {
        return Err(Error::new(format!("value {} out of range", value)));
    }
    Ok(value as u16)
}

fn require_count(tok: &mut Tokenizer) -> Result<u32> {
    let value = tok.require_signed_integer()?;
    u32::try_from(value).map_err(|_| Error::new(format!("expected non-negative number, got {}", value)))
}

/// Parses an optional parameter list `(A, B, OPTIONAL C, REST())` into
/// local variables and argument bounds.
pub fn parse_parameters(tok: &mut Tokenizer, bco: &mut BytecodeObject) -> Result<()> {
    if !tok.check_punct('(')? || tok.check_punct(')')? {
        return Ok(());
    }

    let mut optional = false;
    let mut mandatory = 0;
    let mut total = 0;
    loop {
        if !optional && tok.check_identifier("OPTIONAL")? {
            optional = true;
        }
        let name = tok.require_identifier()?;
        if bco.has_local_variable(&name) {
            return Err(Error::new(format!("duplicate parameter \"{}\"", name)));
        }
        bco.add_local_variable(&name);

        if tok.check_punct('(')? {
            tok.require_punct(')')?;
            tok.require_punct(')')?;
            bco.set_is_varargs(true);
            break;
        }
        total += 1;
        if !optional {
            mandatory += 1;
        }
        if tok.check_punct(')')? {
            break;
        }
        tok.require_punct(',')?;
    }

    bco.set_min_args(mandatory);
    bco.set_max_args(total);
    Ok(())
}

impl<'a> BodyAssembler<'a> {
    pub fn new(
        table: &'a InstructionTable,
        registry: &'a Registry,
        bco: &'a mut BytecodeObject,
        current: SubroutineId,
        mode: JumpMode,
        terminator: &'a str,
    ) -> Self {
        BodyAssembler {
            table,
            registry,
            bco,
            current,
            mode,
            terminator,
            labels: BTreeMap::new(),
            relocations: Vec::new(),
        }
    }

    /// Reads and assembles lines until the terminator.
    pub fn run<R: BufRead>(mut self, reader: &mut LineReader<R>) -> Result<()> {
        loop {
            let line = match reader.read_line()? {
                Some(line) => line,
                None => {
                    return Err(Error::new(format!("missing {}", self.terminator)).at_line(reader.line_number()));
                }
            };
            trace!("{:>5}: {}", reader.line_number(), line);

            let done = self.line(&line).map_err(|e| e.at_line(reader.line_number()))?;
            if done {
                return self.resolve_labels().map_err(|e| e.at_line(reader.line_number()));
            }
        }
    }

    /// Assembles one line. Returns true at the terminator.
    fn line(&mut self, line: &str) -> Result<bool> {
        let mut tok = Tokenizer::new(line)?;
        let word = match tok.current() {
            Token::End => return Ok(false),
            Token::Identifier(w) => w.clone(),
            _ => return Err(Error::new(format!("expected instruction, got {}", tok.text()))),
        };
        tok.read_next()?;

        let done = if word == self.terminator {
            true
        } else if tok.check_punct(':')? {
            self.define_label(word)?;
            false
        } else if word.starts_with('.') {
            self.directive(&word, &mut tok)?;
            false
        } else {
            let template = self.table.lookup(&word)?;
            self.instruction(template, &mut tok)?;
            false
        };

        tok.require_end()?;
        Ok(done)
    }

    fn instruction(&mut self, t: Template, tok: &mut Tokenizer) -> Result<()> {
        if tok.check_punct('#')? {
            let arg = int_arg(tok.require_signed_integer()?)?;
            self.bco.add_instruction(t.major, t.minor, arg);
            return Ok(());
        }
        if t.optional && tok.at_end() {
            self.bco.add_instruction(t.major, t.minor, 0);
            return Ok(());
        }

        let arg = match t.arg {
            ArgKind::None => 0,
            ArgKind::Integer => int_arg(tok.require_signed_integer()?)?,
            ArgKind::Symbol => {
                let name = tok.read_name()?;
                index(self.bco.add_name(&name))?
            }
            ArgKind::Local => {
                let name = tok.read_name()?;
                match self.bco.local_variable(&name) {
                    Some(idx) => index(idx)?,
                    None => return Err(Error::new(format!("unknown local variable \"{}\"", name))),
                }
            }
            ArgKind::Literal => index(compile_literal(tok, self.bco, self.registry)?)?,
            ArgKind::Label => {
                let name = tok.require_identifier()?;
                return self.jump(t, name);
            }
        };
        self.bco.add_instruction(t.major, t.minor, arg);
        Ok(())
    }

    fn jump(&mut self, t: Template, label: String) -> Result<()> {
        match self.mode {
            JumpMode::Absolute => {
                let target = match self.labels.get(&label) {
                    Some(state) => state.value,
                    None => {
                        let address = self.bco.num_instructions();
                        self.relocations.push(Relocation { label, address });
                        0
                    }
                };
                self.bco.add_instruction(t.major, t.minor, target);
            }
            JumpMode::Symbolic => {
                let id = self.symbolic_label(label)?.value;
                let minor = if t.major == Major::Jump as u8 { t.minor | J_SYMBOLIC } else { t.minor };
                self.bco.add_instruction(t.major, minor, id);
            }
        }
        Ok(())
    }

    /// Returns the label state, allocating an identifier on first mention.
    fn symbolic_label(&mut self, label: String) -> Result<&mut LabelState> {
        match self.labels.entry(label) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let value = self.bco.make_label()?;
                Ok(entry.insert(LabelState { value, defined: false }))
            }
        }
    }

    fn define_label(&mut self, label: String) -> Result<()> {
        let duplicate = || Error::new(format!("duplicate label \"{}\"", label));
        match self.mode {
            JumpMode::Absolute => {
                if self.labels.contains_key(&label) {
                    return Err(duplicate());
                }
                let address = index(self.bco.num_instructions())?;
                self.labels.insert(label.clone(), LabelState { value: address, defined: true });
            }
            JumpMode::Symbolic => {
                let state = self.symbolic_label(label.clone())?;
                if state.defined {
                    return Err(duplicate());
                }
                state.defined = true;
                let id = state.value;
                self.bco.add_label(id);
            }
        }
        Ok(())
    }

    fn resolve_labels(&mut self) -> Result<()> {
        for reloc in &self.relocations {
            match self.labels.get(&reloc.label) {
                Some(state) if state.defined => self.bco.set_argument(reloc.address, state.value),
                _ => return Err(Error::new(format!("undefined label \"{}\"", reloc.label))),
            }
        }
        if let Some((label, _)) = self.labels.iter().find(|(_, state)| !state.defined) {
            return Err(Error::new(format!("undefined label \"{}\"", label)));
        }
        Ok(())
    }

    fn directive(&mut self, directive: &str, tok: &mut Tokenizer) -> Result<()> {
        match directive {
            ".LOCAL" => {
                let name = tok.read_name()?;
                if name.is_empty() || self.bco.has_local_variable(&name) {
                    return Err(Error::new(format!("duplicate local variable \"{}\"", name)));
                }
                self.bco.add_local_variable(&name);
            }
            ".LIT" => {
                compile_literal(tok, self.bco, self.registry)?;
            }
            ".SYM" => {
                let name = tok.read_name()?;
                self.bco.add_name(&name);
            }
            ".NAME" => {
                let name = tok.read_name()?;
                self.bco.set_name(&name);
            }
            ".FILE" => {
                let name = tok.read_name()?;
                self.bco.set_file_name(&name);
            }
            ".LINE" => {
                let line = require_count(tok)?;
                let address = if tok.check_punct(',')? {
                    require_count(tok)?
                } else {
                    self.bco.num_instructions() as u32
                };
                self.bco.add_line_number(line, address);
            }
            ".MIN_ARGS" => {
                let n = require_count(tok)?;
                self.bco.set_min_args(n as usize);
            }
            ".MAX_ARGS" => {
                let n = require_count(tok)?;
                self.bco.set_max_args(n as usize);
            }
            ".FLAGS" => {
                let flags = int_arg(tok.require_signed_integer()?)?;
                self.bco.set_flags(flags);
            }
            ".VARARGS" => self.bco.set_is_varargs(true),
            ".NUM_LABELS" => {
                let n = int_arg(tok.require_signed_integer()?)?;
                self.bco.set_num_labels(n);
            }
            ".DEFSUBS" => self.define_subroutines()?,
            _ => return Err(Error::new(format!("unknown directive \"{}\"", directive))),
        }
        Ok(())
    }

    /// Emits `pushlit SUB` / `defsub NAME` for every subroutine bound to a
    /// name.
    fn define_subroutines(&mut self) -> Result<()> {
        let ids: Vec<SubroutineId> = self.registry.bound_subroutines().collect();
        for id in ids {
            let name = if id == self.current {
                self.bco.name().to_owned()
            } else {
                let element = self.registry.subroutine(id);
                if element.defined {
                    element.code.name().to_owned()
                } else {
                    element.name.clone()
                }
            };

            let lit = index(self.bco.add_literal(Value::Subroutine(id)))?;
            self.bco.add_instruction(Major::Push as u8, SCOPE_LITERAL, lit);
            let sym = index(self.bco.add_name(&name))?;
            self.bco.add_instruction(Major::Special as u8, SPECIAL_DEFSUB, sym);
        }
        Ok(())
    }
}

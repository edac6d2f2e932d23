//! The driver reads top-level statements and hands bodies to the
//! [`BodyAssembler`].
//!
//! ```text
//! declare sub|function|struct NAME[, NAME...]
//! sub NAME[(PARAMS)] ... endsub
//! function NAME[(PARAMS)] ... endfunction
//! struct NAME ... endstruct
//! .jumps absolute|symbolic
//! ```
//!
//! Usage is `compile()`, then `finish()`, then `save_to()`. Any error aborts
//! the current call; the assembler is not meant to be reused afterwards.
use std::io::BufRead;

use log::Level;

use super::body::{parse_parameters, BodyAssembler, JumpMode};
use super::bytecode::{BytecodeObject, StructureId, StructureType, SubroutineId};
use super::diagnostics::{LogListener, Translator};
use super::error::{Error, Result};
use super::lexer::{LineReader, Token, Tokenizer};
use super::opcodes::InstructionTable;
use super::registry::{ElementId, Registry};

const LOG_CHANNEL: &str = "bcasm::assembler";

/// Receives the compiled elements, e.g. to serialize them.
pub trait SaveTarget {
    fn save_subroutine(&mut self, id: SubroutineId, code: &BytecodeObject) -> Result<()>;
    fn save_structure(&mut self, id: StructureId, ty: &StructureType) -> Result<()>;
}

pub struct Assembler<R> {
    reader: LineReader<R>,
    table: InstructionTable,
    registry: Registry,
    jump_mode: JumpMode,
}

impl<R: BufRead> Assembler<R> {
    pub fn new(reader: R) -> Self {
        Assembler {
            reader: LineReader::new(reader),
            table: InstructionTable::new(),
            registry: Registry::new(),
            jump_mode: JumpMode::default(),
        }
    }

    /// Selects how labels are encoded in subsequently compiled bodies.
    pub fn set_jump_mode(&mut self, mode: JumpMode) {
        self.jump_mode = mode;
    }

    pub fn jump_mode(&self) -> JumpMode {
        self.jump_mode
    }

    /// Compiles the whole input.
    pub fn compile(&mut self) -> Result<()> {
        while let Some(line) = self.reader.read_line()? {
            let line_number = self.reader.line_number();
            self.statement(&line).map_err(|e| e.at_line(line_number))?;
        }
        Ok(())
    }

    fn statement(&mut self, line: &str) -> Result<()> {
        let mut tok = Tokenizer::new(line)?;
        let word = match tok.current() {
            Token::End => return Ok(()),
            Token::Identifier(w) => w.clone(),
            _ => return Err(Error::new(format!("expected statement, got {}", tok.text()))),
        };
        tok.read_next()?;

        match word.as_str() {
            "DECLARE" => self.declaration(&mut tok),
            "SUB" => self.compile_subroutine(tok, true),
            "FUNCTION" => self.compile_subroutine(tok, false),
            "STRUCT" => self.compile_structure(tok),
            ".JUMPS" => {
                self.jump_mode = match tok.require_identifier()?.as_str() {
                    "ABSOLUTE" => JumpMode::Absolute,
                    "SYMBOLIC" => JumpMode::Symbolic,
                    other => return Err(Error::new(format!("unknown jump mode \"{}\"", other))),
                };
                debug!("jump mode is now {:?}", self.jump_mode);
                tok.require_end()
            }
            _ => Err(Error::new(format!("unknown statement \"{}\"", word))),
        }
    }

    fn declaration(&mut self, tok: &mut Tokenizer) -> Result<()> {
        let kind = tok.require_identifier()?;
        loop {
            let name = tok.read_name()?;
            match kind.as_str() {
                "SUB" | "FUNCTION" => {
                    self.registry.declare_subroutine(&name);
                }
                "STRUCT" => {
                    self.registry.declare_structure(&name);
                }
                _ => return Err(Error::new(format!("cannot declare \"{}\"", kind))),
            }
            if !tok.check_punct(',')? {
                break;
            }
        }
        tok.require_end()
    }

    fn compile_subroutine(&mut self, mut tok: Tokenizer, is_procedure: bool) -> Result<()> {
        let name = tok.read_name()?;
        let id = self.registry.define_subroutine(&name);

        let mut code = std::mem::take(&mut self.registry.subroutine_mut(id).code);
        code.set_name(&name);
        code.set_is_procedure(is_procedure);
        parse_parameters(&mut tok, &mut code)?;
        tok.require_end()?;

        let terminator = if is_procedure { "ENDSUB" } else { "ENDFUNCTION" };
        BodyAssembler::new(&self.table, &self.registry, &mut code, id, self.jump_mode, terminator)
            .run(&mut self.reader)?;

        debug!("compiled {} ({} instructions, {} literals)", name, code.num_instructions(), code.literals().len());
        self.registry.subroutine_mut(id).code = code;
        Ok(())
    }

    fn compile_structure(&mut self, mut tok: Tokenizer) -> Result<()> {
        let name = tok.read_name()?;
        tok.require_end()?;
        let id = self.registry.define_structure(&name);

        let mut ty = StructureType::new(&name);
        loop {
            let line = match self.reader.read_line()? {
                Some(line) => line,
                None => return Err(Error::new("missing ENDSTRUCT").at_line(self.reader.line_number())),
            };
            let done = structure_line(&line, &mut ty).map_err(|e| e.at_line(self.reader.line_number()))?;
            if done {
                break;
            }
        }

        debug!("compiled structure {} ({} fields)", name, ty.fields().len());
        self.registry.structure_mut(id).ty = ty;
        Ok(())
    }

    /// Reports every declared but undefined element.
    pub fn finish(&self, log: &mut dyn LogListener, tx: &dyn Translator) -> Result<()> {
        let undefined = self.registry.undefined();
        for name in &undefined {
            log.write(Level::Error, LOG_CHANNEL, &format!("{}: {}", tx.translate("undefined element"), name));
        }
        if undefined.is_empty() {
            Ok(())
        } else {
            Err(Error::new(tx.translate("file contains undefined elements").into_owned()))
        }
    }

    /// Hands every element to `target`, in the order they were first
    /// mentioned, and returns the last subroutine defined.
    pub fn save_to(&self, target: &mut dyn SaveTarget) -> Result<SubroutineId> {
        let handle = self.registry.last_subroutine().ok_or_else(|| Error::new("no code"))?;
        for &element in self.registry.order() {
            match element {
                ElementId::Subroutine(id) => target.save_subroutine(id, &self.registry.subroutine(id).code)?,
                ElementId::Structure(id) => target.save_structure(id, &self.registry.structure(id).ty)?,
            }
        }
        Ok(handle)
    }

    /// Resolves a name the way a literal would.
    pub fn lookup(&self, name: &str) -> Result<Option<ElementId>> {
        self.registry.lookup(name)
    }

    pub fn subroutine(&self, id: SubroutineId) -> &BytecodeObject {
        &self.registry.subroutine(id).code
    }

    pub fn structure(&self, id: StructureId) -> &StructureType {
        &self.registry.structure(id).ty
    }

    pub fn instruction_table(&self) -> &InstructionTable {
        &self.table
    }
}

/// Adds the fields listed on one line. Returns true at the terminator.
fn structure_line(line: &str, ty: &mut StructureType) -> Result<bool> {
    let mut tok = Tokenizer::new(line)?;
    if tok.at_end() {
        return Ok(false);
    }
    if tok.check_identifier("ENDSTRUCT")? {
        tok.require_end()?;
        return Ok(true);
    }
    loop {
        let field = tok.require_identifier()?;
        if ty.has_field(&field) {
            return Err(Error::new(format!("duplicate field \"{}\"", field)));
        }
        ty.add_field(&field);
        if !tok.check_punct(',')? {
            break;
        }
    }
    tok.require_end()?;
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::bytecode::{Instruction, Value};
    use crate::assembler::diagnostics::NullTranslator;
    use crate::assembler::opcodes::{Major, J_IF_TRUE, J_SYMBOLIC, SCOPE_LITERAL, SPECIAL_DEFSUB};

    #[derive(Default)]
    struct Collector {
        messages: Vec<(Level, String)>,
    }

    impl LogListener for Collector {
        fn write(&mut self, level: Level, _channel: &str, message: &str) {
            self.messages.push((level, message.to_owned()));
        }
    }

    #[derive(Default)]
    struct Saved {
        elements: Vec<String>,
    }

    impl SaveTarget for Saved {
        fn save_subroutine(&mut self, _id: SubroutineId, code: &BytecodeObject) -> Result<()> {
            self.elements.push(format!("sub {}", code.name()));
            Ok(())
        }

        fn save_structure(&mut self, _id: StructureId, ty: &StructureType) -> Result<()> {
            self.elements.push(format!("struct {}", ty.name()));
            Ok(())
        }
    }

    fn compile(input: &str) -> Result<Assembler<&[u8]>> {
        let mut asm = Assembler::new(input.as_bytes());
        asm.compile()?;
        Ok(asm)
    }

    fn sub(asm: &Assembler<&[u8]>, name: &str) -> SubroutineId {
        match asm.lookup(name) {
            Ok(Some(ElementId::Subroutine(id))) => id,
            other => panic!("{} is not a subroutine: {:?}", name, other),
        }
    }

    #[test]
    fn test_single_instruction() {
        let asm = compile("sub test\npushint 42\nendsub\n").unwrap();
        asm.finish(&mut Collector::default(), &NullTranslator).unwrap();
        let handle = asm.save_to(&mut Saved::default()).unwrap();

        let code = asm.subroutine(handle);
        assert_eq!(code.name(), "TEST");
        assert_eq!(code.code(), &[Instruction::new(Major::Push as u8, 6, 42)]);
        assert!(code.is_procedure());
        assert_eq!(asm.instruction_table().disassemble(&code.code()[0]), "pushint 42");
    }

    #[test]
    fn test_no_code() {
        let asm = compile("; nothing here\n\n").unwrap();
        asm.finish(&mut Collector::default(), &NullTranslator).unwrap();
        let mut saved = Saved::default();
        let err = asm.save_to(&mut saved).unwrap_err();
        assert_eq!(err.to_string(), "no code");
        assert!(saved.elements.is_empty());

        let asm = compile("struct s\nendstruct\n").unwrap();
        assert_eq!(asm.save_to(&mut saved).unwrap_err().to_string(), "no code");
        assert!(saved.elements.is_empty());
    }

    #[test]
    fn test_undefined_elements() {
        let asm = compile("declare sub a, b\ndeclare struct s\nsub a\nendsub\n").unwrap();
        let mut log = Collector::default();
        let err = asm.finish(&mut log, &NullTranslator).unwrap_err();
        assert_eq!(err.to_string(), "file contains undefined elements");
        assert_eq!(log.messages, vec![
            (Level::Error, "undefined element: B".to_owned()),
            (Level::Error, "undefined element: S".to_owned()),
        ]);
    }

    #[test]
    fn test_mutual_recursion() {
        let input = "
            declare sub a
            sub b
              pushlit a
            endsub
            sub a
              pushlit b
            endsub";
        let asm = compile(input).unwrap();
        asm.finish(&mut Collector::default(), &NullTranslator).unwrap();

        let a = sub(&asm, "A");
        let b = sub(&asm, "B");
        assert_eq!(asm.subroutine(a).literals(), &[Value::Subroutine(b)]);
        assert_eq!(asm.subroutine(b).literals(), &[Value::Subroutine(a)]);
        assert_eq!(asm.save_to(&mut Saved::default()), Ok(a));
    }

    #[test]
    fn test_shadowing() {
        let input = "
            sub a
              pushint 1
            endsub
            sub user
              pushlit a
            endsub
            sub a
              pushint 2
            endsub
            function user2
              pushlit a
            endfunction";
        let asm = compile(input).unwrap();
        let first = match asm.subroutine(sub(&asm, "USER")).literals() {
            [Value::Subroutine(id)] => *id,
            other => panic!("unexpected literals {:?}", other),
        };
        let second = sub(&asm, "A");
        assert_ne!(first, second);
        assert_eq!(asm.subroutine(first).code()[0].arg, 1);
        assert_eq!(asm.subroutine(second).code()[0].arg, 2);
        assert_eq!(asm.subroutine(sub(&asm, "USER2")).literals(), &[Value::Subroutine(second)]);
        assert!(!asm.subroutine(sub(&asm, "USER2")).is_procedure());

        let mut saved = Saved::default();
        let handle = asm.save_to(&mut saved).unwrap();
        assert_eq!(asm.subroutine(handle).name(), "USER2");
        assert_eq!(saved.elements, vec!["sub A", "sub USER", "sub A", "sub USER2"]);
    }

    #[test]
    fn test_structures() {
        let input = "
            declare struct point
            sub make
              pushlit point
            endsub
            struct point
              x, y
              z
            endstruct";
        let asm = compile(input).unwrap();
        asm.finish(&mut Collector::default(), &NullTranslator).unwrap();
        let point = match asm.lookup("POINT") {
            Ok(Some(ElementId::Structure(id))) => id,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(asm.structure(point).fields(), &["X".to_owned(), "Y".to_owned(), "Z".to_owned()]);
        assert_eq!(asm.subroutine(sub(&asm, "MAKE")).literals(), &[Value::Structure(point)]);

        let mut saved = Saved::default();
        asm.save_to(&mut saved).unwrap();
        assert_eq!(saved.elements, vec!["struct POINT", "sub MAKE"]);

        assert!(compile("struct p\nx, x\nendstruct").is_err());
        assert_eq!(compile("struct p\nx\n").err().map(|e| e.to_string()), Some("line 2: missing ENDSTRUCT".to_owned()));
    }

    #[test]
    fn test_defsubs() {
        let input = "
            sub a
              .name 'Alpha'
            endsub
            sub b
            endsub
            sub main
              .defsubs
            endsub";
        let asm = compile(input).unwrap();
        let main = sub(&asm, "MAIN");
        let code = asm.subroutine(main);

        let expected: Vec<(SubroutineId, &str)> = vec![(sub(&asm, "A"), "Alpha"), (sub(&asm, "B"), "B"), (main, "MAIN")];
        assert_eq!(code.num_instructions(), 2 * expected.len());
        for (pair, (id, name)) in code.code().chunks(2).zip(expected) {
            assert!(pair[0].is(Major::Push, SCOPE_LITERAL));
            assert_eq!(code.literals()[pair[0].arg as usize], Value::Subroutine(id));
            assert!(pair[1].is(Major::Special, SPECIAL_DEFSUB));
            assert_eq!(code.names()[pair[1].arg as usize], name);
        }
    }

    #[test]
    fn test_jump_modes() {
        let input = "
            sub a
              jt x
            x:
            endsub
            .jumps symbolic
            sub b
              jt x
            x:
            endsub
            .jumps absolute
            sub c
              jt x
            x:
            endsub";
        let asm = compile(input).unwrap();
        let jump = Major::Jump as u8;
        assert_eq!(asm.subroutine(sub(&asm, "A")).code(), &[Instruction::new(jump, J_IF_TRUE, 1)]);
        assert_eq!(asm.subroutine(sub(&asm, "B")).code(), &[
            Instruction::new(jump, J_IF_TRUE | J_SYMBOLIC, 0),
            Instruction::new(jump, J_SYMBOLIC, 0),
        ]);
        assert_eq!(asm.subroutine(sub(&asm, "C")).code(), &[Instruction::new(jump, J_IF_TRUE, 1)]);
        assert_eq!(asm.jump_mode(), JumpMode::Absolute);

        assert!(compile(".jumps sideways").is_err());

        let mut asm = Assembler::new("sub a\njt x\nx:\nendsub".as_bytes());
        asm.set_jump_mode(JumpMode::Symbolic);
        asm.compile().unwrap();
        assert_eq!(asm.subroutine(sub(&asm, "A")).num_labels(), 1);
    }

    #[test]
    fn test_headers() {
        let asm = compile("function f(a, optional b)\npushloc b\nendfunction\n").unwrap();
        let f = asm.subroutine(sub(&asm, "F"));
        assert_eq!((f.min_args(), f.max_args()), (1, 2));
        assert_eq!(f.code()[0].arg, 1);

        assert!(compile("sub f\nendfunction\n").is_err());
        assert!(compile("sub f extra\nendsub\n").is_err());
    }

    #[test]
    fn test_statement_errors() {
        let err = compile("\n\nmov a, b\n").err().unwrap();
        assert_eq!(err.to_string(), "line 3: unknown statement \"MOV\"");
        assert!(compile("declare thing x").is_err());
        assert!(compile("declare sub a b").is_err());
        assert!(compile("42").is_err());

        let err = compile("sub a\n  pushint 1\n  frob\nendsub\n").err().unwrap();
        assert_eq!(err.line(), Some(3));
    }
}

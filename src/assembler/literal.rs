//! Literal expressions, as accepted by `pushlit` and `.lit`.
//!
//! ```text
//! literal := ["!" | "NEW"] value
//! value   := TRUE | FALSE | NULL | string | element-name
//!          | "(" integer "," integer ")"
//!          | ["+" | "-"] (integer | float)
//! ```
//!
//! The result is an index into the subroutine's literal pool. Equal values
//! share one slot unless the literal is marked new.
use super::bytecode::{BytecodeObject, Value};
use super::error::{Error, Result};
use super::lexer::{Token, Tokenizer};
use super::registry::{ElementId, Registry};

pub fn compile_literal(tok: &mut Tokenizer, bco: &mut BytecodeObject, registry: &Registry) -> Result<usize> {
    let force_new = tok.check_punct('!')? || tok.check_identifier("NEW")?;
    let value = parse_value(tok, registry)?;
    Ok(if force_new {
        bco.add_new_literal(value)
    } else {
        bco.add_literal(value)
    })
}

fn parse_value(tok: &mut Tokenizer, registry: &Registry) -> Result<Value> {
    let value = match tok.current().clone() {
        Token::Identifier(word) => match word.as_str() {
            "TRUE" => Value::Boolean(true),
            "FALSE" => Value::Boolean(false),
            "NULL" => Value::Null,
            _ => match registry.lookup(&word)? {
                Some(ElementId::Subroutine(id)) => Value::Subroutine(id),
                Some(ElementId::Structure(id)) => Value::Structure(id),
                None => return Err(Error::new(format!("unknown element \"{}\"", word))),
            },
        },
        Token::String(s) => Value::String(s),
        Token::Punct('(') => {
            tok.read_next()?;
            return parse_raw(tok);
        }
        _ => return parse_number(tok),
    };
    tok.read_next()?;
    Ok(value)
}

fn parse_raw(tok: &mut Tokenizer) -> Result<Value> {
    let tag = tok.require_signed_integer()?;
    tok.require_punct(',')?;
    let value = tok.require_signed_integer()?;
    tok.require_punct(')')?;

    if tag < 0 || tag > i32::from(u16::MAX) {
        return Err(Error::new(format!("raw tag {} out of range", tag)));
    }
    Ok(Value::Raw { tag: tag as u16, value: value as u32 })
}

fn parse_number(tok: &mut Tokenizer) -> Result<Value> {
    if let Some(i) = tok.check_signed_integer()? {
        return Ok(Value::Integer(i));
    }
    let negative = tok.read_sign()?;
    let value = match tok.float_value() {
        Some(f) => Value::Float(if negative { -f } else { f }),
        None => return Err(Error::new(format!("expected literal, got {}", tok.text()))),
    };
    tok.read_next()?;
    Ok(value)
}

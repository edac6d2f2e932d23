//! This lexer tokenizes one line of assembly at a time.
//!
//! The assembler never needs to look further ahead than one token, so the
//! [`Tokenizer`] keeps only the current token and advances on request.
use std::io::{BufRead, Lines};

use super::error::{Error, Result};

#[derive(Clone, PartialEq, Debug)]
pub enum Token {
    /// End of line, or the start of a comment.
    End,
    Punct(char),
    /// A word that is neither an integer nor a float. Upper-cased.
    Identifier(String),
    Integer(i32),
    Float(f64),
    /// A quoted string, verbatim.
    String(String),
}

pub struct Tokenizer {
    chars: Vec<char>,
    pos: usize,
    current: Token,
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '.' || c == '$' || c == '_'
}

impl Tokenizer {
    /// Creates a tokenizer and reads the first token.
    pub fn new(line: &str) -> Result<Self> {
        let mut tok = Tokenizer {
            chars: line.chars().collect(),
            pos: 0,
            current: Token::End,
        };
        tok.read_next()?;
        Ok(tok)
    }

    pub fn current(&self) -> &Token {
        &self.current
    }

    pub fn at_end(&self) -> bool {
        self.current == Token::End
    }

    /// Text of the current token, as it would appear in a message.
    pub fn text(&self) -> String {
        match &self.current {
            Token::End => "end of line".to_owned(),
            Token::Punct(c) => c.to_string(),
            Token::Identifier(s) => s.clone(),
            Token::Integer(i) => i.to_string(),
            Token::Float(f) => f.to_string(),
            Token::String(s) => format!("\"{}\"", s),
        }
    }

    pub fn integer_value(&self) -> Option<i32> {
        match self.current {
            Token::Integer(i) => Some(i),
            _ => None,
        }
    }

    pub fn float_value(&self) -> Option<f64> {
        match self.current {
            Token::Float(f) => Some(f),
            _ => None,
        }
    }

    /// Advances to the next token.
    pub fn read_next(&mut self) -> Result<()> {
        while self.pos < self.chars.len() && self.chars[self.pos].is_whitespace() {
            self.pos += 1;
        }

        let c = match self.chars.get(self.pos) {
            None | Some(';') | Some('%') => {
                self.pos = self.chars.len();
                self.current = Token::End;
                return Ok(());
            }
            Some(&c) => c,
        };

        self.current = if c == '\'' || c == '"' {
            self.pos += 1;
            Token::String(self.read_string(c)?)
        } else if is_word_char(c) {
            let start = self.pos;
            while self.pos < self.chars.len() && is_word_char(self.chars[self.pos]) {
                self.pos += 1;
            }
            classify_word(self.chars[start..self.pos].iter().collect())
        } else {
            self.pos += 1;
            Token::Punct(c)
        };
        Ok(())
    }

    fn read_string(&mut self, quote: char) -> Result<String> {
        let mut sb = String::new();
        loop {
            let c = match self.chars.get(self.pos) {
                Some(&c) => c,
                None => return Err(Error::new("unterminated string")),
            };
            self.pos += 1;
            if c == quote {
                return Ok(sb);
            }
            if c == '\\' && quote == '"' {
                match self.chars.get(self.pos) {
                    Some('n') => sb.push('\n'),
                    Some('t') => sb.push('\t'),
                    Some(&other) => sb.push(other),
                    None => return Err(Error::new("unterminated string")),
                }
                self.pos += 1;
            } else {
                sb.push(c);
            }
        }
    }

    /// Fails unless the whole line has been consumed.
    pub fn require_end(&self) -> Result<()> {
        if self.at_end() {
            Ok(())
        } else {
            Err(Error::new(format!("garbage at end of line: {}", self.text())))
        }
    }

    /// Accepts punctuation `p` if it is the current token.
    pub fn check_punct(&mut self, p: char) -> Result<bool> {
        if self.current == Token::Punct(p) {
            self.read_next()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn require_punct(&mut self, p: char) -> Result<()> {
        if self.check_punct(p)? {
            Ok(())
        } else {
            Err(Error::new(format!("expected \"{}\", got {}", p, self.text())))
        }
    }

    /// Accepts the keyword `word` (upper-case) if it is the current token.
    pub fn check_identifier(&mut self, word: &str) -> Result<bool> {
        match &self.current {
            Token::Identifier(s) if s == word => {
                self.read_next()?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    pub fn require_identifier(&mut self) -> Result<String> {
        match &self.current {
            Token::Identifier(s) => {
                let s = s.clone();
                self.read_next()?;
                Ok(s)
            }
            _ => Err(Error::new(format!("expected identifier, got {}", self.text()))),
        }
    }

    /// Accepts a name if one is current: an identifier, a verbatim string,
    /// or `-` for an anonymous (empty) name.
    pub fn check_name(&mut self) -> Result<Option<String>> {
        let name = match &self.current {
            Token::Identifier(s) | Token::String(s) => s.clone(),
            Token::Punct('-') => String::new(),
            _ => return Ok(None),
        };
        self.read_next()?;
        Ok(Some(name))
    }

    pub fn read_name(&mut self) -> Result<String> {
        match self.check_name()? {
            Some(name) => Ok(name),
            None => Err(Error::new(format!("expected name, got {}", self.text()))),
        }
    }

    /// Consumes an optional sign. Returns true for negative.
    pub fn read_sign(&mut self) -> Result<bool> {
        if self.check_punct('-')? {
            Ok(true)
        } else {
            self.check_punct('+')?;
            Ok(false)
        }
    }

    /// Accepts an optionally signed integer. A sign that is not followed by
    /// an integer is left unread.
    pub fn check_signed_integer(&mut self) -> Result<Option<i32>> {
        let (pos, current) = (self.pos, self.current.clone());
        let negative = self.read_sign()?;
        match self.current {
            Token::Integer(i) => {
                self.read_next()?;
                Ok(Some(if negative { -i } else { i }))
            }
            _ => {
                self.pos = pos;
                self.current = current;
                Ok(None)
            }
        }
    }

    pub fn require_signed_integer(&mut self) -> Result<i32> {
        match self.check_signed_integer()? {
            Some(i) => Ok(i),
            None => Err(Error::new(format!("expected integer, got {}", self.text()))),
        }
    }
}

fn classify_word(word: String) -> Token {
    if word.chars().all(|c| c.is_ascii_digit()) {
        if let Ok(i) = word.parse::<i32>() {
            return Token::Integer(i);
        }
    }

    let numeric_start = word
        .chars()
        .next()
        .map_or(false, |c| c.is_ascii_digit() || c == '.');
    if numeric_start {
        if let Ok(f) = word.parse::<f64>() {
            return Token::Float(f);
        }
    }

    Token::Identifier(word.to_uppercase())
}

/// Feeds input lines to the assembler and remembers where it is.
pub struct LineReader<R> {
    lines: Lines<R>,
    line_number: usize,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(reader: R) -> Self {
        LineReader { lines: reader.lines(), line_number: 0 }
    }

    /// Returns the next line, or None at end of input.
    pub fn read_line(&mut self) -> Result<Option<String>> {
        match self.lines.next() {
            Some(line) => {
                self.line_number += 1;
                Ok(Some(line?))
            }
            None => Ok(None),
        }
    }

    /// 1-based number of the line most recently returned.
    pub fn line_number(&self) -> usize {
        self.line_number
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(line: &str) -> Result<Vec<Token>> {
        let mut tok = Tokenizer::new(line)?;
        let mut out = Vec::new();
        while !tok.at_end() {
            out.push(tok.current().clone());
            tok.read_next()?;
        }
        Ok(out)
    }

    #[test]
    fn test_words() {
        assert_eq!(tokens("pushint 42"), Ok(vec![
            Token::Identifier("PUSHINT".to_owned()),
            Token::Integer(42),
        ]));
        assert_eq!(tokens("1.5 .5 x.y $a_b"), Ok(vec![
            Token::Float(1.5),
            Token::Float(0.5),
            Token::Identifier("X.Y".to_owned()),
            Token::Identifier("$A_B".to_owned()),
        ]));
        assert_eq!(tokens("genint4.7 .local"), Ok(vec![
            Token::Identifier("GENINT4.7".to_owned()),
            Token::Identifier(".LOCAL".to_owned()),
        ]));
        // Too large for an integer, still a number.
        assert_eq!(tokens("9999999999"), Ok(vec![Token::Float(9999999999.0)]));
        // Not numbers, even though Rust would parse them as floats.
        assert_eq!(tokens("inf nan"), Ok(vec![
            Token::Identifier("INF".to_owned()),
            Token::Identifier("NAN".to_owned()),
        ]));

        let tok = Tokenizer::new("2.5").unwrap();
        assert_eq!(tok.float_value(), Some(2.5));
        assert_eq!(tok.integer_value(), None);
        assert_eq!(tok.text(), "2.5");
    }

    #[test]
    fn test_punctuation_and_comments() {
        assert_eq!(tokens("a: #-3, (x) ; comment"), Ok(vec![
            Token::Identifier("A".to_owned()),
            Token::Punct(':'),
            Token::Punct('#'),
            Token::Punct('-'),
            Token::Integer(3),
            Token::Punct(','),
            Token::Punct('('),
            Token::Identifier("X".to_owned()),
            Token::Punct(')'),
        ]));
        assert_eq!(tokens("   % only a comment"), Ok(vec![]));
        assert_eq!(tokens(""), Ok(vec![]));
    }

    #[test]
    fn test_strings() {
        assert_eq!(tokens(r#"'a\nb' "a\nb\t\"q\"\\x\z""#), Ok(vec![
            Token::String("a\\nb".to_owned()),
            Token::String("a\nb\t\"q\"\\xz".to_owned()),
        ]));
        assert_eq!(tokens("'Mixed Case; kept'"), Ok(vec![Token::String("Mixed Case; kept".to_owned())]));
        assert!(tokens("'open").is_err());
        assert!(tokens("\"open\\\"").is_err());
        assert!(tokens("\"trailing\\").is_err());
    }

    #[test]
    fn test_accept_helpers() {
        let mut tok = Tokenizer::new("foo , -7 +8 9").unwrap();
        assert_eq!(tok.check_punct(':'), Ok(false));
        assert_eq!(tok.check_identifier("BAR"), Ok(false));
        assert_eq!(tok.check_identifier("FOO"), Ok(true));
        assert!(tok.require_identifier().is_err());
        assert_eq!(tok.require_punct(','), Ok(()));
        assert_eq!(tok.require_signed_integer(), Ok(-7));
        assert_eq!(tok.require_signed_integer(), Ok(8));
        assert_eq!(tok.require_signed_integer(), Ok(9));
        assert!(tok.at_end());
        assert!(tok.require_punct(')').is_err());
        assert!(tok.require_signed_integer().is_err());
    }

    #[test]
    fn test_read_name() {
        let mut tok = Tokenizer::new("name 'Verbatim Name' - 12").unwrap();
        assert_eq!(tok.read_name(), Ok("NAME".to_owned()));
        assert_eq!(tok.read_name(), Ok("Verbatim Name".to_owned()));
        assert_eq!(tok.read_name(), Ok(String::new()));
        assert!(tok.read_name().is_err());
        assert_eq!(tok.integer_value(), Some(12));
    }

    #[test]
    fn test_conditional_accept() {
        let mut tok = Tokenizer::new("- 2.5 -x 'n' 4").unwrap();
        assert_eq!(tok.check_signed_integer(), Ok(None));
        assert_eq!(tok.current(), &Token::Punct('-'));
        assert_eq!(tok.check_name(), Ok(Some(String::new())));
        assert_eq!(tok.check_name(), Ok(None));
        assert_eq!(tok.float_value(), Some(2.5));
        tok.read_next().unwrap();
        // The sign stays unread when no integer follows it.
        assert_eq!(tok.check_signed_integer(), Ok(None));
        assert_eq!(tok.current(), &Token::Punct('-'));
        tok.read_next().unwrap();
        assert_eq!(tok.check_name(), Ok(Some("X".to_owned())));
        assert_eq!(tok.check_name(), Ok(Some("n".to_owned())));
        assert_eq!(tok.check_signed_integer(), Ok(Some(4)));
        assert!(tok.at_end());
        assert_eq!(tok.check_name(), Ok(None));
    }

    #[test]
    fn test_line_reader() {
        let mut reader = LineReader::new("one\n\nthree".as_bytes());
        assert_eq!(reader.read_line(), Ok(Some("one".to_owned())));
        assert_eq!(reader.line_number(), 1);
        assert_eq!(reader.read_line(), Ok(Some(String::new())));
        assert_eq!(reader.read_line(), Ok(Some("three".to_owned())));
        assert_eq!(reader.line_number(), 3);
        assert_eq!(reader.read_line(), Ok(None));
        assert_eq!(reader.line_number(), 3);
    }
}

//! The single error type raised by every stage of the assembler.
use thiserror::Error;

/// An assembler failure.
///
/// Carries a human-readable message and, once it has passed through the
/// driver, the 1-based number of the input line that caused it.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct Error {
    message: String,
    line: Option<usize>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Error { message: message.into(), line: None }
    }

    /// Attaches a line number unless one is already present.
    pub fn at_line(self, line: usize) -> Self {
        if self.line.is_some() {
            return self;
        }
        Error {
            message: format!("line {}: {}", line, self.message),
            line: Some(line),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn line(&self) -> Option<usize> {
        self.line
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::new(format!("I/O error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_at_line() {
        let err = Error::new("unknown instruction \"FOO\"").at_line(12);
        assert_eq!(err.to_string(), "line 12: unknown instruction \"FOO\"");
        assert_eq!(err.line(), Some(12));

        // The innermost location wins.
        let err = err.at_line(40);
        assert_eq!(err.line(), Some(12));
        assert_eq!(err.message(), "line 12: unknown instruction \"FOO\"");
    }

    #[test]
    fn test_without_line() {
        let err = Error::new("no code");
        assert_eq!(err.to_string(), "no code");
        assert_eq!(err.line(), None);
    }

    #[test]
    fn test_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::WriteZero, "disk full");
        let err = Error::from(io);
        assert_eq!(err.to_string(), "I/O error: disk full");
        assert_eq!(err.line(), None);
    }
}

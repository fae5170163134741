use crate::parser::Rule;
use pest::error::Error as PestError;
use std::fmt;

/// One diagnostic tied to a source line.
#[derive(Clone, Debug, PartialEq)]
pub struct AsmError {
    pub kind: ErrorKind,
    pub line: u32,
    pub message: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Parse,
    UnknownMnemonic,
    DuplicateSymbol,
    UndefinedSymbol,
    Macro,
    Literal,
    DisplacementOutOfRange,
    Format,
    Expression,
}

impl ErrorKind {
    fn describe(self) -> &'static str {
        match self {
            ErrorKind::Parse => "parse error",
            ErrorKind::UnknownMnemonic => "unknown mnemonic",
            ErrorKind::DuplicateSymbol => "duplicate symbol",
            ErrorKind::UndefinedSymbol => "undefined symbol",
            ErrorKind::Macro => "macro error",
            ErrorKind::Literal => "bad literal",
            ErrorKind::DisplacementOutOfRange => "displacement out of range",
            ErrorKind::Format => "illegal format",
            ErrorKind::Expression => "bad expression",
        }
    }
}

impl AsmError {
    pub fn new<M: Into<String>>(kind: ErrorKind, line: u32, message: M) -> AsmError {
        AsmError {
            kind,
            line,
            message: message.into(),
        }
    }

    pub fn duplicate_symbol(line: u32, name: &str) -> AsmError {
        AsmError::new(
            ErrorKind::DuplicateSymbol,
            line,
            format!("\"{}\" is already defined in this control section", name),
        )
    }

    pub fn undefined_symbol(line: u32, name: &str) -> AsmError {
        AsmError::new(
            ErrorKind::UndefinedSymbol,
            line,
            format!("\"{}\" is not defined in this control section", name),
        )
    }
}

impl fmt::Display for AsmError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "line {}: {}: {}",
            self.line,
            self.kind.describe(),
            self.message
        )
    }
}

impl std::error::Error for AsmError {}

/// Failure of a whole assembly: either the source did not even split into
/// lines, or one of the passes collected diagnostics.
#[derive(Debug)]
pub enum Error {
    Parse(Box<PestError<Rule>>),
    Asm(Vec<AsmError>),
}

impl From<Box<PestError<Rule>>> for Error {
    fn from(err: Box<PestError<Rule>>) -> Error {
        Error::Parse(err)
    }
}

impl From<Vec<AsmError>> for Error {
    fn from(errors: Vec<AsmError>) -> Error {
        Error::Asm(errors)
    }
}

impl From<AsmError> for Error {
    fn from(error: AsmError) -> Error {
        Error::Asm(vec![error])
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Parse(err) => write!(f, "{}", err),
            Error::Asm(errors) => {
                for (index, err) in errors.iter().enumerate() {
                    if index > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for Error {}

//! Assembly errors and their line-pinned diagnostics.
use std::fmt;

/// Every way assembly can fail. All of them are fatal.
#[derive(Debug, Clone, PartialEq)]
pub enum AsmError {
    Lex(String),
    MissingEquals(String),
    ExpectedOpcode(String),
    UnknownOpcode(String),
    MissingResultId(String),
    UnexpectedResultId(String),
    ExpectedToken(&'static str, String),
    UnknownOperandKind(String),
    UnknownEnumerant(String, String),
    UnknownExtInst(String),
    MissingTypeContext,
    UnsupportedLiteralWidth(u32),
    IntegerOutOfRange(i64),
    UnsupportedExtInstSet(String),
    InstructionTooLong(String, usize),
    IdOutOfRange(u32),
    IdsExhausted(String),
}

impl fmt::Display for AsmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lex(msg) => write!(f, "{}", msg),
            Self::MissingEquals(name) => write!(f, "expected `=` after result id `%{}`", name),
            Self::ExpectedOpcode(found) => write!(f, "expected an opcode, found {}", found),
            Self::UnknownOpcode(op) => write!(f, "unknown instruction `{}`", op),
            Self::MissingResultId(op) => write!(f, "`{}` requires a `%result =` assignment", op),
            Self::UnexpectedResultId(op) => write!(f, "`{}` does not produce a result id", op),
            Self::ExpectedToken(expected, found) => write!(f, "expected {}, found {}", expected, found),
            Self::UnknownOperandKind(kind) => write!(f, "unknown operand kind `{}`", kind),
            Self::UnknownEnumerant(kind, name) => write!(f, "`{}` is not a valid {}", name, kind),
            Self::UnknownExtInst(name) => write!(f, "unknown extended instruction `{}`", name),
            Self::MissingTypeContext => {
                write!(f, "numeric literal has no preceding integer or float result type")
            }
            Self::UnsupportedLiteralWidth(width) => {
                write!(f, "{}-bit numeric literals are not supported", width)
            }
            Self::IntegerOutOfRange(val) => write!(f, "integer literal {} does not fit in 32 bits", val),
            Self::UnsupportedExtInstSet(name) => {
                write!(f, "unsupported extended instruction set {:?}", name)
            }
            Self::InstructionTooLong(op, words) => {
                write!(f, "`{}` encodes to {} words, more than fits in a word count", op, words)
            }
            Self::IdOutOfRange(id) => write!(f, "result id `%{}` leaves no room for the id bound", id),
            Self::IdsExhausted(name) => write!(f, "no result id left for `%{}`", name),
        }
    }
}

/// An error pinned to the source line it was found on.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub line: usize,
    pub error: AsmError,
}

impl Diagnostic {
    pub fn new(line: usize, error: AsmError) -> Self {
        Diagnostic { line, error }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.line, self.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_format() {
        let diag = Diagnostic::new(3, AsmError::UnknownOpcode("OpFoo".to_owned()));
        assert_eq!(diag.to_string(), "3: unknown instruction `OpFoo`");
    }
}

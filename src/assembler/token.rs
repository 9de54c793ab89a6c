//! Tokens produced by the lexer.
use std::fmt;

// Tokens are tuples of their payload and the line they appear on.
#[derive(Clone, PartialEq, Debug)]
pub enum Token {
    Eof(usize),
    /// A position no pattern matched, with a diagnostic message.
    Error(String, usize),
    Ident(String, usize),
    Int(i64, usize),
    Float(f32, usize),
    Str(String, usize),
    /// `%name`, with the numeric value when the name is all digits.
    ResultId(String, Option<u32>, usize),
    Op(String, usize),
    Equals(usize),
    Pipe(usize),
}

impl Token {
    pub fn line(&self) -> usize {
        use Token::*;
        match self {
            Eof(line) | Equals(line) | Pipe(line) => *line,
            Error(_, line) | Ident(_, line) | Str(_, line) | Op(_, line) => *line,
            Int(_, line) => *line,
            Float(_, line) => *line,
            ResultId(_, _, line) => *line,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use Token::*;
        match self {
            Eof(_) => write!(f, "end of file"),
            Error(msg, _) => write!(f, "invalid token ({})", msg),
            Ident(s, _) => write!(f, "identifier `{}`", s),
            Int(v, _) => write!(f, "integer `{}`", v),
            Float(v, _) => write!(f, "float `{}`", v),
            Str(s, _) => write!(f, "string {:?}", s),
            ResultId(name, _, _) => write!(f, "result id `%{}`", name),
            Op(op, _) => write!(f, "opcode `{}`", op),
            Equals(_) => write!(f, "`=`"),
            Pipe(_) => write!(f, "`|`"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line() {
        assert_eq!(Token::Eof(7).line(), 7);
        assert_eq!(Token::ResultId("1".to_owned(), Some(1), 3).line(), 3);
        assert_eq!(Token::Float(1.5, 2).line(), 2);
    }

    #[test]
    fn test_display() {
        assert_eq!(Token::Op("OpName".to_owned(), 1).to_string(), "opcode `OpName`");
        assert_eq!(Token::ResultId("main".to_owned(), None, 1).to_string(), "result id `%main`");
        assert_eq!(Token::Eof(1).to_string(), "end of file");
    }
}

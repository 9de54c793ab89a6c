//! This lexer tokenizes assembly text on demand.
//!
//! Patterns are tried in a fixed order because their prefixes overlap:
//! hex integers, floats, decimal integers, strings, opcodes, punctuation,
//! result ids and finally bare identifiers. The lexer never fails; input
//! matching none of them comes back as a `Token::Error`.
use std::sync::LazyLock;

use regex::Regex;

use super::token::Token;

static HEX_INT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^0x[0-9a-fA-F]+").unwrap());
static FLOAT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^-?[0-9]+\.[0-9]*").unwrap());
static DEC_INT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^-?[0-9]+").unwrap());
static STRING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"^"(?s:[^"\\]|\\.)*""#).unwrap());
static OPCODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^Op\S+").unwrap());
static RESULT_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^%[A-Za-z0-9_]+").unwrap());
static IDENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]+").unwrap());

pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Lexer { src, pos: 0, line: 1 }
    }

    /// Returns the next token. Once the input is exhausted every call
    /// returns `Token::Eof`.
    pub fn next_token(&mut self) -> Token {
        self.skip_trivia();

        let line = self.line;
        let src = self.src;
        let rest = &src[self.pos..];
        if rest.is_empty() {
            return Token::Eof(line);
        }

        if let Some(m) = HEX_INT.find(rest) {
            let text = m.as_str();
            self.advance(text.len());
            return match i64::from_str_radix(&text[2..], 16) {
                Ok(val) => Token::Int(val, line),
                Err(_) => Token::Error(format!("integer literal `{}` is out of range", text), line),
            };
        }

        if let Some(m) = FLOAT.find(rest) {
            let text = m.as_str();
            self.advance(text.len());
            return match text.parse::<f32>() {
                Ok(val) => Token::Float(val, line),
                Err(_) => Token::Error(format!("invalid float literal `{}`", text), line),
            };
        }

        if let Some(m) = DEC_INT.find(rest) {
            let text = m.as_str();
            self.advance(text.len());
            return match text.parse::<i64>() {
                Ok(val) => Token::Int(val, line),
                Err(_) => Token::Error(format!("integer literal `{}` is out of range", text), line),
            };
        }

        if rest.starts_with('"') {
            return match STRING.find(rest) {
                Some(m) => {
                    let text = m.as_str();
                    self.advance(text.len());
                    Token::Str(unescape(&text[1..text.len() - 1]), line)
                }
                None => {
                    self.advance(rest.len());
                    Token::Error("unterminated string literal".to_owned(), line)
                }
            };
        }

        if let Some(m) = OPCODE.find(rest) {
            let text = m.as_str();
            self.advance(text.len());
            return Token::Op(text.to_owned(), line);
        }

        if rest.starts_with('=') {
            self.advance(1);
            return Token::Equals(line);
        }
        if rest.starts_with('|') {
            self.advance(1);
            return Token::Pipe(line);
        }

        if let Some(m) = RESULT_ID.find(rest) {
            let name = &m.as_str()[1..];
            self.advance(m.end());
            if name.bytes().all(|b| b.is_ascii_digit()) {
                return match name.parse::<u32>() {
                    Ok(val) => Token::ResultId(name.to_owned(), Some(val), line),
                    Err(_) => Token::Error(format!("result id `%{}` is out of range", name), line),
                };
            }
            return Token::ResultId(name.to_owned(), None, line);
        }

        if let Some(m) = IDENT.find(rest) {
            let text = m.as_str();
            self.advance(text.len());
            return Token::Ident(text.to_owned(), line);
        }

        // Step over the offending character so repeated calls make progress.
        let c = rest.chars().next().unwrap_or('\0');
        self.advance(c.len_utf8());
        Token::Error(format!("unexpected character `{}`", c), line)
    }

    /// Skips whitespace and `;` comments until a token (or the end) starts.
    fn skip_trivia(&mut self) {
        let src = self.src;
        loop {
            let rest = &src[self.pos..];
            let ws = rest.len() - rest.trim_start().len();
            if ws > 0 {
                self.advance(ws);
                continue;
            }
            if rest.starts_with(';') {
                let end = rest.find('\n').unwrap_or_else(|| rest.len());
                self.advance(end);
                continue;
            }
            break;
        }
    }

    fn advance(&mut self, len: usize) {
        let consumed = &self.src[self.pos..self.pos + len];
        self.line += consumed.matches('\n').count();
        self.pos += len;
    }
}

/// `\\` and `\"` become the escaped character, as does any other `\c`.
fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(src: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(src);
        let mut out = Vec::new();
        loop {
            let tok = lexer.next_token();
            let done = matches!(tok, Token::Eof(_) | Token::Error(_, _));
            out.push(tok);
            if done {
                return out;
            }
        }
    }

    #[test]
    fn test_numbers() {
        assert_eq!(tokenize("0x1F"), vec![Token::Int(31, 1), Token::Eof(1)]);
        assert_eq!(tokenize("42 -7"), vec![Token::Int(42, 1), Token::Int(-7, 1), Token::Eof(1)]);
        assert_eq!(tokenize("1.5"), vec![Token::Float(1.5, 1), Token::Eof(1)]);
        assert_eq!(tokenize("-2."), vec![Token::Float(-2.0, 1), Token::Eof(1)]);
        assert_eq!(tokenize("0.400000006"), vec![Token::Float(0.4, 1), Token::Eof(1)]);
    }

    #[test]
    fn test_lone_dot_is_rejected() {
        assert!(matches!(tokenize(".")[0], Token::Error(_, 1)));
        assert!(matches!(tokenize("-.")[0], Token::Error(_, 1)));
    }

    #[test]
    fn test_strings() {
        assert_eq!(tokenize(r#""abc""#), vec![Token::Str("abc".to_owned(), 1), Token::Eof(1)]);
        assert_eq!(
            tokenize(r#""a\"b\\c\d""#),
            vec![Token::Str("a\"b\\cd".to_owned(), 1), Token::Eof(1)]
        );
        assert_eq!(
            tokenize("\"unterminated"),
            vec![Token::Error("unterminated string literal".to_owned(), 1)]
        );
    }

    #[test]
    fn test_result_ids() {
        assert_eq!(
            tokenize("%main %12 %a_1"),
            vec![
                Token::ResultId("main".to_owned(), None, 1),
                Token::ResultId("12".to_owned(), Some(12), 1),
                Token::ResultId("a_1".to_owned(), None, 1),
                Token::Eof(1),
            ]
        );
    }

    #[test]
    fn test_statement() {
        assert_eq!(
            tokenize("%float = OpTypeFloat 32"),
            vec![
                Token::ResultId("float".to_owned(), None, 1),
                Token::Equals(1),
                Token::Op("OpTypeFloat".to_owned(), 1),
                Token::Int(32, 1),
                Token::Eof(1),
            ]
        );
        assert_eq!(
            tokenize("OpCopyMemory %1 %2 Volatile|Nontemporal"),
            vec![
                Token::Op("OpCopyMemory".to_owned(), 1),
                Token::ResultId("1".to_owned(), Some(1), 1),
                Token::ResultId("2".to_owned(), Some(2), 1),
                Token::Ident("Volatile".to_owned(), 1),
                Token::Pipe(1),
                Token::Ident("Nontemporal".to_owned(), 1),
                Token::Eof(1),
            ]
        );
    }

    #[test]
    fn test_comments_and_lines() {
        let src = "; header comment\n  ; another\n\nOpCapability Shader ; trailing\nOpReturn";
        assert_eq!(
            tokenize(src),
            vec![
                Token::Op("OpCapability".to_owned(), 4),
                Token::Ident("Shader".to_owned(), 4),
                Token::Op("OpReturn".to_owned(), 5),
                Token::Eof(5),
            ]
        );
    }

    #[test]
    fn test_unexpected_character() {
        assert_eq!(
            tokenize("OpNop\n  #"),
            vec![
                Token::Op("OpNop".to_owned(), 1),
                Token::Error("unexpected character `#`".to_owned(), 2),
            ]
        );
    }

    #[test]
    fn test_eof_repeats() {
        let mut lexer = Lexer::new("");
        assert_eq!(lexer.next_token(), Token::Eof(1));
        assert_eq!(lexer.next_token(), Token::Eof(1));
    }
}

//! The Parser pulls tokens from the Lexer and builds a `Module`, driven by
//! the operand schemas in the grammar.
use std::collections::VecDeque;
use std::convert::TryFrom;

use super::ast::*;
use super::error::{AsmError, Diagnostic};
use super::grammar::{EnumCategory, Grammar, OperandSchema, Quantifier};
use super::lexer::Lexer;
use super::token::Token;

/// The only extended instruction set whose mnemonics the grammar carries.
pub const SUPPORTED_EXT_INST_SET: &str = "GLSL.std.450";

const MAX_WORD_COUNT: usize = 0xFFFF;

type ParseResult<T> = Result<T, Diagnostic>;

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    grammar: &'a Grammar,
    lookahead: VecDeque<Token>,
    module: Module,
}

/// Per-instruction state threaded through operand extraction.
struct Context<'i> {
    opcode: &'i str,
    /// The `%name` before `=`, if any.
    result: Option<Symbol>,
    /// Most recent `IdResultType` operand, for typing literals.
    result_type: Option<Symbol>,
}

impl<'a> Parser<'a> {
    pub fn new(lexer: Lexer<'a>, grammar: &'a Grammar) -> Self {
        Parser { lexer, grammar, lookahead: VecDeque::with_capacity(2), module: Module::new() }
    }

    /// Run the parser, consuming itself. The first error aborts the parse.
    pub fn run(mut self) -> ParseResult<Module> {
        while let Some(inst) = self.instruction()? {
            self.module.add_instruction(inst);
        }
        debug!("parsed {} instructions", self.module.instructions.len());
        Ok(self.module)
    }

    /// Parses one `[%name =] OpCode operands...` statement.
    /// Returns `None` at end of input.
    fn instruction(&mut self) -> ParseResult<Option<Instruction<Symbol>>> {
        let mut result = None;
        if let Token::ResultId(name, explicit, line) = self.peek(0).clone() {
            self.consume();
            match self.consume() {
                Token::Equals(_) => result = Some(symbol(&name, explicit, line)?),
                Token::Error(msg, line) => return Err(Diagnostic::new(line, AsmError::Lex(msg))),
                _ => return Err(Diagnostic::new(line, AsmError::MissingEquals(name))),
            }
        }

        let (opcode, line) = match self.consume() {
            Token::Eof(_) if result.is_none() => return Ok(None),
            Token::Op(op, line) => (op, line),
            Token::Error(msg, line) => return Err(Diagnostic::new(line, AsmError::Lex(msg))),
            tok => return Err(Diagnostic::new(tok.line(), AsmError::ExpectedOpcode(tok.to_string()))),
        };

        let grammar = self.grammar;
        let schema = grammar
            .instruction(&opcode)
            .ok_or_else(|| Diagnostic::new(line, AsmError::UnknownOpcode(opcode.clone())))?;

        let mut ctx = Context { opcode: &opcode, result, result_type: None };
        let mut operands = Vec::with_capacity(schema.operands.len());
        for operand in &schema.operands {
            match operand.quantifier {
                None => operands.push(self.operand(operand, &mut ctx)?),
                Some(Quantifier::Optional) => {
                    if !self.next_is_new_instruction() {
                        operands.push(self.operand(operand, &mut ctx)?);
                    }
                }
                Some(Quantifier::Repeated) => {
                    while !self.next_is_new_instruction() {
                        operands.push(self.operand(operand, &mut ctx)?);
                    }
                }
            }
        }

        // Never claimed by an IdResult operand.
        if ctx.result.is_some() {
            return Err(Diagnostic::new(line, AsmError::UnexpectedResultId(opcode.clone())));
        }

        let inst = Instruction { name: opcode, opcode: schema.opcode, operands, line };
        check_instruction(&inst)?;
        Ok(Some(inst))
    }

    /// Extracts one operand described by `schema`.
    fn operand(&mut self, schema: &OperandSchema, ctx: &mut Context) -> ParseResult<Operand<Symbol>> {
        let kind = schema.kind.as_str();
        match kind {
            "IdResult" => {
                let line = self.peek(0).line();
                let symbol = ctx
                    .result
                    .take()
                    .ok_or_else(|| Diagnostic::new(line, AsmError::MissingResultId(ctx.opcode.to_owned())))?;
                Ok(id_operand(symbol))
            }
            "IdResultType" => {
                let symbol = self.result_id()?;
                ctx.result_type = Some(symbol.clone());
                Ok(id_operand(symbol))
            }
            "IdRef" | "IdScope" | "IdMemorySemantics" => Ok(id_operand(self.result_id()?)),
            "LiteralString" => match self.consume() {
                Token::Str(s, _) => Ok(Operand::new(s.clone(), OperandValue::String(s))),
                tok => Err(unexpected("a string literal", tok)),
            },
            "LiteralInteger" => match self.consume() {
                Token::Int(v, line) => Ok(Operand::new(v.to_string(), OperandValue::Integer(to_word(v, line)?))),
                tok => Err(unexpected("an integer literal", tok)),
            },
            "LiteralContextDependentNumber" => self.context_number(ctx),
            "LiteralExtInstInteger" => match self.consume() {
                Token::Ident(name, line) => match self.grammar.ext_inst(&name) {
                    Some(id) => Ok(Operand::new(name, OperandValue::ExtInst(id))),
                    None => Err(Diagnostic::new(line, AsmError::UnknownExtInst(name))),
                },
                tok => Err(unexpected("an extended instruction name", tok)),
            },
            _ => self.enumerant(kind, ctx),
        }
    }

    fn result_id(&mut self) -> ParseResult<Symbol> {
        match self.consume() {
            Token::ResultId(name, explicit, line) => symbol(&name, explicit, line),
            tok => Err(unexpected("a result id", tok)),
        }
    }

    /// A literal typed by the instruction's `IdResultType`.
    fn context_number(&mut self, ctx: &Context) -> ParseResult<Operand<Symbol>> {
        let line = self.peek(0).line();
        let ty = ctx
            .result_type
            .as_ref()
            .and_then(|symbol| self.module.numeric_type(&symbol.name))
            .copied()
            .ok_or_else(|| Diagnostic::new(line, AsmError::MissingTypeContext))?;
        if ty.width > 32 {
            return Err(Diagnostic::new(line, AsmError::UnsupportedLiteralWidth(ty.width)));
        }

        match (ty.kind, self.consume()) {
            (NumericKind::Int, Token::Int(v, line)) => {
                Ok(Operand::new(v.to_string(), OperandValue::Integer(to_word(v, line)?)))
            }
            (NumericKind::Float, Token::Float(v, _)) => Ok(Operand::new(v.to_string(), OperandValue::Float(v))),
            (NumericKind::Float, Token::Int(v, _)) => Ok(Operand::new(v.to_string(), OperandValue::Float(v as f32))),
            (NumericKind::Int, tok) => Err(unexpected("an integer literal", tok)),
            (NumericKind::Float, tok) => Err(unexpected("a numeric literal", tok)),
        }
    }

    /// An enumerant of operand kind `kind`. Bit enums may combine several
    /// names with `|`; the params of each name follow in the order written.
    fn enumerant(&mut self, kind: &str, ctx: &mut Context) -> ParseResult<Operand<Symbol>> {
        let grammar = self.grammar;
        let line = self.peek(0).line();
        let schema = grammar
            .operand_kind(kind)
            .ok_or_else(|| Diagnostic::new(line, AsmError::UnknownOperandKind(kind.to_owned())))?;

        let mut names = vec![self.enumerant_name()?];
        if schema.category == EnumCategory::BitEnum {
            while matches!(self.peek(0), Token::Pipe(_)) {
                self.consume();
                names.push(self.enumerant_name()?);
            }
        }

        let mut value = 0;
        let mut param_kinds = Vec::new();
        for (name, line) in &names {
            let enumerant = schema
                .values
                .get(name)
                .ok_or_else(|| Diagnostic::new(*line, AsmError::UnknownEnumerant(kind.to_owned(), name.clone())))?;
            value |= enumerant.value;
            param_kinds.extend(enumerant.params.iter());
        }

        let joined = names.iter().map(|(name, _)| name.as_str()).collect::<Vec<_>>().join("|");
        let value = match schema.category {
            EnumCategory::ValueEnum => OperandValue::ValueEnum(value),
            EnumCategory::BitEnum => OperandValue::BitEnum(value),
        };
        let mut operand = Operand::new(joined, value);
        for param in param_kinds {
            let param = OperandSchema { kind: param.clone(), quantifier: None };
            operand.params.push(self.operand(&param, ctx)?);
        }
        Ok(operand)
    }

    fn enumerant_name(&mut self) -> ParseResult<(String, usize)> {
        match self.consume() {
            Token::Ident(name, line) => Ok((name, line)),
            tok => Err(unexpected("an enumerant name", tok)),
        }
    }

    /// True when the upcoming tokens start a new statement: an opcode,
    /// end of input, or `%name =`.
    fn next_is_new_instruction(&mut self) -> bool {
        let assignment = match self.peek(0) {
            Token::Op(_, _) | Token::Eof(_) => return true,
            Token::ResultId(_, _, _) => true,
            _ => false,
        };
        assignment && matches!(self.peek(1), Token::Equals(_))
    }

    /// Looks `n` tokens ahead without consuming anything.
    fn peek(&mut self, n: usize) -> &Token {
        while self.lookahead.len() <= n {
            let tok = self.lexer.next_token();
            self.lookahead.push_back(tok);
        }
        &self.lookahead[n]
    }

    /// Pops the next token off the stream.
    fn consume(&mut self) -> Token {
        match self.lookahead.pop_front() {
            Some(tok) => tok,
            None => self.lexer.next_token(),
        }
    }
}

fn id_operand(symbol: Symbol) -> Operand<Symbol> {
    Operand::new(symbol.name.clone(), OperandValue::ResultId(symbol))
}

/// Integers are stored as the 32-bit two's-complement word they encode to.
/// `%4294967295` is refused: the bound must stay above every id.
fn symbol(name: &str, explicit: Option<u32>, line: usize) -> ParseResult<Symbol> {
    match explicit {
        Some(u32::MAX) => Err(Diagnostic::new(line, AsmError::IdOutOfRange(u32::MAX))),
        _ => Ok(Symbol::new(name, explicit)),
    }
}

fn to_word(v: i64, line: usize) -> ParseResult<u32> {
    u32::try_from(v)
        .or_else(|_| i32::try_from(v).map(|v| v as u32))
        .map_err(|_| Diagnostic::new(line, AsmError::IntegerOutOfRange(v)))
}

fn unexpected(expected: &'static str, tok: Token) -> Diagnostic {
    match tok {
        Token::Error(msg, line) => Diagnostic::new(line, AsmError::Lex(msg)),
        tok => Diagnostic::new(tok.line(), AsmError::ExpectedToken(expected, tok.to_string())),
    }
}

/// Checks that need the whole instruction.
fn check_instruction(inst: &Instruction<Symbol>) -> ParseResult<()> {
    if inst.name == "OpExtInstImport" {
        for operand in &inst.operands {
            if let OperandValue::String(set) = &operand.value {
                if set != SUPPORTED_EXT_INST_SET {
                    return Err(Diagnostic::new(inst.line, AsmError::UnsupportedExtInstSet(set.clone())));
                }
            }
        }
    }

    let words = inst.word_count();
    if words > MAX_WORD_COUNT {
        return Err(Diagnostic::new(inst.line, AsmError::InstructionTooLong(inst.name.clone(), words)));
    }
    Ok(())
}

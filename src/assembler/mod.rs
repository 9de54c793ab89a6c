//! The Assembler module is in charge of taking assembly
//! text and producing the binary module as 32-bit words.
//!
//! It does this by pulling tokens from a regex driven lexer into a
//! grammar driven recursive descent parser, resolving result ids in a
//! separate pass and then encoding the resolved program.

pub mod ast;
pub mod binary;
pub mod error;
pub mod grammar;
pub mod lexer;
pub mod parser;
pub mod token;

use self::ast::{Module, Program};
use self::binary::HeaderOptions;
use self::error::Diagnostic;
use self::grammar::Grammar;

/// Lexes and parses `text` into a module.
pub fn parse(text: &str, grammar: &Grammar) -> Result<Module, Diagnostic> {
    parser::Parser::new(lexer::Lexer::new(text), grammar).run()
}

/// Parses `text` and resolves its ids.
pub fn compile(text: &str, grammar: &Grammar) -> Result<Program, Diagnostic> {
    let module = parse(text, grammar)?;
    let program = module.resolve()?;
    info!("resolved {} instructions, id bound {}", program.instructions.len(), program.bound);
    Ok(program)
}

/// Assembles `text` into words, or a `"<line>: <message>"` diagnostic.
pub fn assemble(text: &str, grammar: &Grammar, options: &HeaderOptions) -> Result<Vec<u32>, String> {
    let program = compile(text, grammar).map_err(|e| e.to_string())?;
    Ok(binary::assemble(&program, options))
}

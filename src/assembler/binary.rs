//! Serializes a resolved `Program` into 32-bit words.
use super::ast::{Instruction, Operand, OperandValue, Program};

pub const MAGIC: u32 = 0x0723_0203;
pub const HEADER_WORDS: usize = 5;

/// The configurable header fields.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct HeaderOptions {
    pub version: u32,
    pub generator: u32,
}

impl Default for HeaderOptions {
    fn default() -> Self {
        HeaderOptions { version: 0x0001_0000, generator: 0 }
    }
}

impl HeaderOptions {
    /// Parses a `MAJOR.MINOR` version string into its header encoding.
    pub fn parse_version(text: &str) -> Result<u32, String> {
        let mut parts = text.splitn(2, '.');
        let major = parts.next().and_then(|s| s.parse::<u8>().ok());
        let minor = parts.next().and_then(|s| s.parse::<u8>().ok());
        match (major, minor) {
            (Some(major), Some(minor)) => Ok((major as u32) << 16 | (minor as u32) << 8),
            _ => Err(format!("invalid version `{}`, expected MAJOR.MINOR", text)),
        }
    }
}

/// Encodes the header followed by every instruction.
pub fn assemble(program: &Program, options: &HeaderOptions) -> Vec<u32> {
    let size = HEADER_WORDS + program.instructions.iter().map(Instruction::word_count).sum::<usize>();
    let mut words = Vec::with_capacity(size);
    words.extend_from_slice(&[MAGIC, options.version, options.generator, program.bound, 0]);
    for inst in &program.instructions {
        encode_instruction(inst, &mut words);
    }
    debug_assert_eq!(words.len(), size);
    words
}

pub fn encode_instruction(inst: &Instruction<u32>, out: &mut Vec<u32>) {
    out.push((inst.word_count() as u32) << 16 | inst.opcode as u32);
    for operand in &inst.operands {
        encode_operand(operand, out);
    }
}

fn encode_operand(operand: &Operand<u32>, out: &mut Vec<u32>) {
    match &operand.value {
        OperandValue::String(s) => encode_string(s, out),
        OperandValue::Float(v) => out.push(v.to_bits()),
        OperandValue::ResultId(v)
        | OperandValue::Integer(v)
        | OperandValue::ValueEnum(v)
        | OperandValue::BitEnum(v)
        | OperandValue::ExtInst(v) => out.push(*v),
    }
    for param in &operand.params {
        encode_operand(param, out);
    }
}

/// Packs bytes four to a word, lowest byte first, always ending with a
/// word that holds the terminating NUL.
fn encode_string(s: &str, out: &mut Vec<u32>) {
    let mut word = 0u32;
    for (i, b) in s.bytes().enumerate() {
        word |= (b as u32) << (8 * (i % 4));
        if i % 4 == 3 {
            out.push(word);
            word = 0;
        }
    }
    out.push(word);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string_words(s: &str) -> Vec<u32> {
        let mut out = Vec::new();
        encode_string(s, &mut out);
        out
    }

    #[test]
    fn test_encode_string() {
        assert_eq!(string_words(""), vec![0]);
        assert_eq!(string_words("abcd"), vec![0x6463_6261, 0x0000_0000]);
        assert_eq!(string_words("abcde"), vec![0x6463_6261, 0x0000_0065]);
        assert_eq!(string_words("abcdef"), vec![0x6463_6261, 0x0000_6665]);
        assert_eq!(string_words("abcdefg"), vec![0x6463_6261, 0x0067_6665]);
    }

    #[test]
    fn test_encode_instruction() {
        let mut mode = Operand::new("LocalSize".to_owned(), OperandValue::ValueEnum(17));
        for v in 2..=4 {
            mode.params.push(Operand::new(v.to_string(), OperandValue::Integer(v)));
        }
        let inst = Instruction {
            name: "OpExecutionMode".to_owned(),
            opcode: 16,
            operands: vec![Operand::new("main".to_owned(), OperandValue::ResultId(1)), mode],
            line: 1,
        };
        let mut out = Vec::new();
        encode_instruction(&inst, &mut out);
        assert_eq!(out, vec![6 << 16 | 16, 1, 17, 2, 3, 4]);
    }

    #[test]
    fn test_encode_float() {
        let mut out = Vec::new();
        encode_operand(&Operand::new("0.4".to_owned(), OperandValue::Float(0.4)), &mut out);
        assert_eq!(out, vec![0x3ecc_cccd]);
    }

    #[test]
    fn test_header() {
        let program = Program { instructions: Vec::new(), bound: 7 };
        let options = HeaderOptions { version: 0x0001_0300, generator: 42 };
        assert_eq!(assemble(&program, &options), vec![MAGIC, 0x0001_0300, 42, 7, 0]);
    }

    #[test]
    fn test_parse_version() {
        assert_eq!(HeaderOptions::parse_version("1.5"), Ok(0x0001_0500));
        assert_eq!(HeaderOptions::parse_version("1.0"), Ok(0x0001_0000));
        assert!(HeaderOptions::parse_version("1").is_err());
        assert!(HeaderOptions::parse_version("one.two").is_err());
    }
}

//! The instruction grammar: opcode schemas, enumerant tables and the
//! extended instruction mnemonics. It is plain data loaded from JSON and
//! never mutated once loaded.
use std::collections::HashMap;
use std::io::Read;

use serde::Deserialize;

static BUILTIN_GRAMMAR: &str = include_str!("grammar.json");

#[derive(Debug, Clone, Deserialize)]
pub struct Grammar {
    instructions: HashMap<String, InstructionSchema>,
    operand_kinds: HashMap<String, OperandKindSchema>,
    ext: HashMap<String, u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstructionSchema {
    pub opcode: u16,
    #[serde(default)]
    pub operands: Vec<OperandSchema>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OperandSchema {
    pub kind: String,
    #[serde(default)]
    pub quantifier: Option<Quantifier>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
pub enum Quantifier {
    #[serde(rename = "?")]
    Optional,
    #[serde(rename = "*")]
    Repeated,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OperandKindSchema {
    #[serde(rename = "type")]
    pub category: EnumCategory,
    pub values: HashMap<String, Enumerant>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
pub enum EnumCategory {
    ValueEnum,
    BitEnum,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Enumerant {
    pub value: u32,
    #[serde(default)]
    pub params: Vec<String>,
}

impl Grammar {
    /// The grammar bundled with the assembler.
    pub fn builtin() -> Result<Self, String> {
        Self::from_json(BUILTIN_GRAMMAR)
    }

    pub fn from_json(text: &str) -> Result<Self, String> {
        serde_json::from_str(text).map_err(|e| format!("invalid grammar: {}", e))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, String> {
        serde_json::from_reader(reader).map_err(|e| format!("invalid grammar: {}", e))
    }

    pub fn instruction(&self, mnemonic: &str) -> Option<&InstructionSchema> {
        self.instructions.get(mnemonic)
    }

    pub fn operand_kind(&self, name: &str) -> Option<&OperandKindSchema> {
        self.operand_kinds.get(name)
    }

    pub fn ext_inst(&self, mnemonic: &str) -> Option<u32> {
        self.ext.get(mnemonic).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_loads() {
        let grammar = Grammar::builtin().unwrap();

        let name = grammar.instruction("OpName").unwrap();
        assert_eq!(name.opcode, 5);
        assert_eq!(name.operands.len(), 2);

        let copy = grammar.instruction("OpCopyMemory").unwrap();
        assert_eq!(copy.operands[2].quantifier, Some(Quantifier::Optional));

        let access = grammar.operand_kind("MemoryAccess").unwrap();
        assert_eq!(access.category, EnumCategory::BitEnum);
        assert_eq!(access.values["MakePointerVisible"].params, vec!["IdScope".to_owned()]);

        assert_eq!(grammar.ext_inst("Sqrt"), Some(31));
        assert_eq!(grammar.ext_inst("NotAnInstruction"), None);
    }

    #[test]
    fn test_from_json() {
        let grammar = Grammar::from_json(
            r#"{
                "instructions": { "OpNop": { "opcode": 0 },
                                  "OpThing": { "opcode": 9, "operands": [ { "kind": "IdRef", "quantifier": "*" } ] } },
                "operand_kinds": { "Mode": { "type": "ValueEnum", "values": { "A": { "value": 1 } } } },
                "ext": {}
            }"#,
        )
        .unwrap();
        assert!(grammar.instruction("OpNop").unwrap().operands.is_empty());
        assert_eq!(grammar.instruction("OpThing").unwrap().operands[0].quantifier, Some(Quantifier::Repeated));
        assert!(grammar.operand_kind("Mode").unwrap().values["A"].params.is_empty());
    }

    #[test]
    fn test_from_json_rejects_bad_quantifier() {
        let result = Grammar::from_json(
            r#"{ "instructions": { "OpNop": { "opcode": 0, "operands": [ { "kind": "IdRef", "quantifier": "+" } ] } },
                 "operand_kinds": {}, "ext": {} }"#,
        );
        assert!(result.is_err());
    }
}

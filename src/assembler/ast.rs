//! The parsed module and its id resolution.
//!
//! Parsing produces instructions whose result ids are still `Symbol`s.
//! `Module::resolve` threads an `IdAllocator` over them and rewrites every
//! reference to a concrete number, yielding a `Program` the encoder can
//! serialize without further lookups.
//!
//! ```text
//! %float  = OpTypeFloat 32
//! %float1 = OpConstant %float 0.400000006   ; typed by %float
//! OpExecutionMode %main LocalSize 2 3 4     ; enumerant with three params
//! %3 = OpTypeVoid                           ; explicit id, reserves 1..=3
//! ```
use std::collections::HashMap;
use std::fmt;

use super::error::{AsmError, Diagnostic};

/// A result id as written in the source: its name and, for `%<digits>`,
/// the explicit number it pins.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Symbol {
    pub name: String,
    pub explicit: Option<u32>,
}

impl Symbol {
    pub fn new(name: &str, explicit: Option<u32>) -> Self {
        Symbol { name: name.to_owned(), explicit }
    }
}

/// Operand payloads. `I` is `Symbol` before resolution and `u32` after.
#[derive(Clone, PartialEq, Debug)]
pub enum OperandValue<I> {
    ResultId(I),
    String(String),
    Integer(u32),
    Float(f32),
    ValueEnum(u32),
    BitEnum(u32),
    ExtInst(u32),
}

#[derive(Clone, PartialEq, Debug)]
pub struct Operand<I> {
    /// Textual form, e.g. a bare id name or `Volatile|Nontemporal`.
    pub name: String,
    pub value: OperandValue<I>,
    /// Arguments declared by an enumerant, in declaration order.
    pub params: Vec<Operand<I>>,
}

impl<I> Operand<I> {
    pub fn new(name: String, value: OperandValue<I>) -> Self {
        Operand { name, value, params: Vec::new() }
    }

    /// Number of words this operand and its params occupy once encoded.
    pub fn length(&self) -> usize {
        match &self.value {
            // Always room for the terminating NUL.
            OperandValue::String(s) => s.len() / 4 + 1,
            _ => 1 + self.params.iter().map(Operand::length).sum::<usize>(),
        }
    }

    fn try_map_ids<J, E, F: FnMut(&I) -> Result<J, E>>(&self, f: &mut F) -> Result<Operand<J>, E> {
        let value = match &self.value {
            OperandValue::ResultId(id) => OperandValue::ResultId(f(id)?),
            OperandValue::String(s) => OperandValue::String(s.clone()),
            OperandValue::Integer(v) => OperandValue::Integer(*v),
            OperandValue::Float(v) => OperandValue::Float(*v),
            OperandValue::ValueEnum(v) => OperandValue::ValueEnum(*v),
            OperandValue::BitEnum(v) => OperandValue::BitEnum(*v),
            OperandValue::ExtInst(v) => OperandValue::ExtInst(*v),
        };
        Ok(Operand {
            name: self.name.clone(),
            value,
            params: self.params.iter().map(|p| p.try_map_ids(f)).collect::<Result<_, _>>()?,
        })
    }

    fn for_each_id<F: FnMut(&I)>(&self, f: &mut F) {
        if let OperandValue::ResultId(id) = &self.value {
            f(id);
        }
        for param in &self.params {
            param.for_each_id(f);
        }
    }
}

impl<I> fmt::Display for Operand<I> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.value {
            OperandValue::ResultId(_) => write!(f, "%{}", self.name)?,
            OperandValue::String(s) => write!(f, "{:?}", s)?,
            _ => write!(f, "{}", self.name)?,
        }
        for param in &self.params {
            write!(f, " {}", param)?;
        }
        Ok(())
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct Instruction<I> {
    pub name: String,
    pub opcode: u16,
    pub operands: Vec<Operand<I>>,
    pub line: usize,
}

impl<I> Instruction<I> {
    /// Total encoded length, including the leading opcode word.
    pub fn word_count(&self) -> usize {
        1 + self.operands.iter().map(Operand::length).sum::<usize>()
    }
}

impl<I> fmt::Display for Instruction<I> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)?;
        for operand in &self.operands {
            write!(f, " {}", operand)?;
        }
        Ok(())
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum NumericKind {
    Int,
    Float,
}

/// What an `OpTypeInt` or `OpTypeFloat` declared.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct NumericType {
    pub kind: NumericKind,
    pub width: u32,
    pub signed: bool,
}

/// Hands out numeric ids. Explicit ids must be reserved before any
/// symbolic name is assigned so that the two never collide.
#[derive(Clone, Debug)]
pub struct IdAllocator {
    ids: HashMap<String, u32>,
    next_id: u32,
}

impl Default for IdAllocator {
    fn default() -> Self {
        IdAllocator { ids: HashMap::new(), next_id: 1 }
    }
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps `next_id` strictly above `id`.
    pub fn reserve(&mut self, id: u32) {
        if id >= self.next_id {
            self.next_id = id.saturating_add(1);
        }
    }

    /// Returns the id bound to `name`, binding the next free one on first use.
    /// `None` once no id is left below `u32::MAX` for the bound.
    pub fn get_id(&mut self, name: &str) -> Option<u32> {
        if let Some(id) = self.ids.get(name) {
            return Some(*id);
        }
        let id = self.next_id;
        self.next_id = id.checked_add(1)?;
        self.ids.insert(name.to_owned(), id);
        Some(id)
    }

    pub fn resolve(&mut self, symbol: &Symbol) -> Option<u32> {
        match symbol.explicit {
            Some(id) => Some(id),
            None => self.get_id(&symbol.name),
        }
    }

    /// One past the largest id handed out or reserved so far.
    pub fn bound(&self) -> u32 {
        self.next_id
    }
}

/// The parsed, still symbolic module.
#[derive(Clone, Debug, Default)]
pub struct Module {
    pub instructions: Vec<Instruction<Symbol>>,
    types: HashMap<String, NumericType>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `inst`, recording it in the type table when it declares a
    /// scalar integer or float type.
    pub fn add_instruction(&mut self, inst: Instruction<Symbol>) {
        if let Some((name, ty)) = numeric_type_of(&inst) {
            debug!(
                "line {}: %{} is a {}-bit {} {:?}",
                inst.line,
                name,
                ty.width,
                if ty.signed { "signed" } else { "unsigned" },
                ty.kind
            );
            self.types.insert(name, ty);
        }
        self.instructions.push(inst);
    }

    pub fn numeric_type(&self, name: &str) -> Option<&NumericType> {
        self.types.get(name)
    }

    /// Returns an allocator with every explicit id in the module reserved,
    /// including ids nested in enumerant params.
    pub fn reserve_ids(&self) -> IdAllocator {
        let mut ids = IdAllocator::new();
        for inst in &self.instructions {
            for operand in &inst.operands {
                operand.for_each_id(&mut |symbol: &Symbol| {
                    if let Some(id) = symbol.explicit {
                        ids.reserve(id);
                    }
                });
            }
        }
        ids
    }

    pub fn resolve(&self) -> Result<Program, Diagnostic> {
        self.resolve_with(self.reserve_ids())
    }

    /// Binds every symbolic name in first-encounter order.
    pub fn resolve_with(&self, mut ids: IdAllocator) -> Result<Program, Diagnostic> {
        let mut instructions = Vec::with_capacity(self.instructions.len());
        for inst in &self.instructions {
            let mut operands = Vec::with_capacity(inst.operands.len());
            for operand in &inst.operands {
                operands.push(operand.try_map_ids(&mut |s: &Symbol| {
                    ids.resolve(s)
                        .ok_or_else(|| Diagnostic::new(inst.line, AsmError::IdsExhausted(s.name.clone())))
                })?);
            }
            instructions.push(Instruction { name: inst.name.clone(), opcode: inst.opcode, operands, line: inst.line });
        }
        Ok(Program { instructions, bound: ids.bound() })
    }
}

fn numeric_type_of(inst: &Instruction<Symbol>) -> Option<(String, NumericType)> {
    let kind = match inst.name.as_str() {
        "OpTypeInt" => NumericKind::Int,
        "OpTypeFloat" => NumericKind::Float,
        _ => return None,
    };
    let name = match inst.operands.first().map(|op| &op.value) {
        Some(OperandValue::ResultId(symbol)) => symbol.name.clone(),
        _ => return None,
    };
    let width = match inst.operands.get(1).map(|op| &op.value) {
        Some(OperandValue::Integer(width)) => *width,
        _ => return None,
    };
    let signed = match (kind, inst.operands.get(2).map(|op| &op.value)) {
        (NumericKind::Int, Some(OperandValue::Integer(signedness))) => *signedness != 0,
        _ => true,
    };
    Some((name, NumericType { kind, width, signed }))
}

/// A module with every id resolved, ready for encoding.
#[derive(Clone, Debug)]
pub struct Program {
    pub instructions: Vec<Instruction<u32>>,
    pub bound: u32,
}

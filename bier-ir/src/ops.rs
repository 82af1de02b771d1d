//! IR Operations
//!
//! Binary and unary operation kinds plus the numeric opcode table. Opcodes
//! are contiguous inside each family so an opcode is always the family base
//! plus the variant index; textual tools depend on that numbering.

use serde::Serialize;
use std::fmt;

/// Binary operations in IR
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BinOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    UDiv,
    SDiv,
    URem,
    SRem,

    // Comparison (return i1)
    Eq,
    Ne,
    Le,
    Lt,
    Ge,
    Gt,

    // store value, ptr
    Store,
}

impl BinOp {
    pub const ALL: [BinOp; 14] = [
        BinOp::Add,
        BinOp::Sub,
        BinOp::Mul,
        BinOp::UDiv,
        BinOp::SDiv,
        BinOp::URem,
        BinOp::SRem,
        BinOp::Eq,
        BinOp::Ne,
        BinOp::Le,
        BinOp::Lt,
        BinOp::Ge,
        BinOp::Gt,
        BinOp::Store,
    ];

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Ne | BinOp::Le | BinOp::Lt | BinOp::Ge | BinOp::Gt
        )
    }

    pub fn opcode(self) -> OpCode {
        OpCode::from_index(OpCode::BINARY_BASE + self as u8)
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode().name())
    }
}

/// Unary operations in IR
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum UnOp {
    Alloc,
    Load,
    Assign,
}

impl UnOp {
    pub const ALL: [UnOp; 3] = [UnOp::Alloc, UnOp::Load, UnOp::Assign];

    pub fn opcode(self) -> OpCode {
        OpCode::from_index(OpCode::UNARY_BASE + self as u8)
    }
}

impl fmt::Display for UnOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode().name())
    }
}

/// Stable numeric operation codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[repr(u8)]
pub enum OpCode {
    Add,
    Sub,
    Mul,
    UDiv,
    SDiv,
    URem,
    SRem,
    Eq,
    Ne,
    Le,
    Lt,
    Ge,
    Gt,
    Store,
    Alloc,
    Load,
    Assign,
    Const,
    Ret,
    RetVal,
    Gep,
    Call,
    Branch,
    CondBranch,
    Cast,
    AllocLayout,
}

const OP_LITERALS: [&str; OpCode::COUNT] = [
    "add",
    "sub",
    "mul",
    "udiv",
    "sdiv",
    "urem",
    "srem",
    "eq",
    "ne",
    "le",
    "lt",
    "ge",
    "gt",
    "store",
    "alloc",
    "load",
    "assign",
    "const",
    "ret",
    "retval",
    "gep",
    "call",
    "branch",
    "cond",
    "cast",
    "alloc_layout",
];

const OPCODES: [OpCode; OpCode::COUNT] = [
    OpCode::Add,
    OpCode::Sub,
    OpCode::Mul,
    OpCode::UDiv,
    OpCode::SDiv,
    OpCode::URem,
    OpCode::SRem,
    OpCode::Eq,
    OpCode::Ne,
    OpCode::Le,
    OpCode::Lt,
    OpCode::Ge,
    OpCode::Gt,
    OpCode::Store,
    OpCode::Alloc,
    OpCode::Load,
    OpCode::Assign,
    OpCode::Const,
    OpCode::Ret,
    OpCode::RetVal,
    OpCode::Gep,
    OpCode::Call,
    OpCode::Branch,
    OpCode::CondBranch,
    OpCode::Cast,
    OpCode::AllocLayout,
];

impl OpCode {
    pub const COUNT: usize = 26;
    pub const BINARY_BASE: u8 = OpCode::Add as u8;
    pub const UNARY_BASE: u8 = OpCode::Alloc as u8;

    fn from_index(index: u8) -> OpCode {
        OPCODES[index as usize]
    }

    pub fn from_u8(code: u8) -> Option<OpCode> {
        OPCODES.get(code as usize).copied()
    }

    /// Textual opcode name
    pub fn name(self) -> &'static str {
        OP_LITERALS[self as usize]
    }

    /// Reverse lookup of the textual opcode name
    pub fn from_literal(literal: &str) -> Option<OpCode> {
        OP_LITERALS
            .iter()
            .position(|&name| name == literal)
            .map(|index| OPCODES[index])
    }

    pub fn is_allocation(self) -> bool {
        matches!(self, OpCode::Alloc | OpCode::AllocLayout)
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

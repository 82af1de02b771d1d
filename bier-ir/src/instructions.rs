//! IR Instructions
//!
//! Defines all operations available in the IR. Operand and result fields are
//! plain value handles, so passes can substitute them in place.

use serde::Serialize;

use crate::ids::{BlockId, LayoutId, VarId};
use crate::ops::{BinOp, OpCode, UnOp};
use crate::types::TypeId;
use crate::values::{IntegerConst, Value};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Operation {
    /// Binary operation: result = op lhs, rhs
    /// `store` keeps the stored value in `lhs`, the pointer in `rhs`, and has no result
    Binary {
        op: BinOp,
        lhs: Value,
        rhs: Value,
        result: Option<VarId>,
    },

    /// Unary operation: result = op operand
    /// `alloc` takes the element count, `load` the pointer, `assign` the source
    Unary {
        op: UnOp,
        operand: Value,
        result: VarId,
    },

    /// Constant materialization: result = const value
    Const { value: IntegerConst, result: VarId },

    /// Function call, either direct or through a function pointer value
    Call {
        func_type: TypeId,
        callee: Value,
        args: Vec<Value>,
        result: Option<VarId>,
    },

    /// Type cast: result = cast from
    Cast { from: Value, result: VarId },

    /// Get element pointer into a layout
    Gep {
        ptr: Value,
        layout: LayoutId,
        index: usize,
        base_offset: Option<Value>,
        element_offset: Option<Value>,
        result: VarId,
    },

    /// Unconditional branch
    Branch { target: BlockId },

    /// Conditional branch on an i1 value
    CondBranch {
        condition: Value,
        on_true: BlockId,
        on_false: BlockId,
    },

    /// Allocate memory described by a layout, `count` times
    AllocLayout {
        layout: LayoutId,
        count: Value,
        result: VarId,
    },

    ReturnVoid,

    ReturnValue { value: Value },
}

impl Operation {
    pub fn opcode(&self) -> OpCode {
        match self {
            Operation::Binary { op, .. } => op.opcode(),
            Operation::Unary { op, .. } => op.opcode(),
            Operation::Const { .. } => OpCode::Const,
            Operation::Call { .. } => OpCode::Call,
            Operation::Cast { .. } => OpCode::Cast,
            Operation::Gep { .. } => OpCode::Gep,
            Operation::Branch { .. } => OpCode::Branch,
            Operation::CondBranch { .. } => OpCode::CondBranch,
            Operation::AllocLayout { .. } => OpCode::AllocLayout,
            Operation::ReturnVoid => OpCode::Ret,
            Operation::ReturnValue { .. } => OpCode::RetVal,
        }
    }

    /// Ordered operand list
    pub fn operands(&self) -> Vec<Value> {
        match self {
            Operation::Binary { lhs, rhs, .. } => vec![*lhs, *rhs],
            Operation::Unary { operand, .. } => vec![*operand],
            Operation::Const { value, .. } => vec![Value::Const(*value)],
            Operation::Call { callee, args, .. } => {
                let mut operands = Vec::with_capacity(args.len() + 1);
                operands.push(*callee);
                operands.extend_from_slice(args);
                operands
            }
            Operation::Cast { from, .. } => vec![*from],
            Operation::Gep {
                ptr,
                base_offset,
                element_offset,
                ..
            } => {
                let mut operands = vec![*ptr];
                operands.extend(base_offset.iter().copied());
                operands.extend(element_offset.iter().copied());
                operands
            }
            Operation::Branch { .. } | Operation::ReturnVoid => Vec::new(),
            Operation::CondBranch { condition, .. } => vec![*condition],
            Operation::AllocLayout { count, .. } => vec![*count],
            Operation::ReturnValue { value } => vec![*value],
        }
    }

    /// Mutable operand slots, in the same order as [`Operation::operands`]
    /// (a `const` operation has none)
    pub fn operands_mut(&mut self) -> Vec<&mut Value> {
        match self {
            Operation::Binary { lhs, rhs, .. } => vec![lhs, rhs],
            Operation::Unary { operand, .. } => vec![operand],
            // The materialized constant is not a substitutable slot
            Operation::Const { .. } => Vec::new(),
            Operation::Call { callee, args, .. } => {
                let mut operands = vec![callee];
                operands.extend(args.iter_mut());
                operands
            }
            Operation::Cast { from, .. } => vec![from],
            Operation::Gep {
                ptr,
                base_offset,
                element_offset,
                ..
            } => {
                let mut operands = vec![ptr];
                operands.extend(base_offset.as_mut());
                operands.extend(element_offset.as_mut());
                operands
            }
            Operation::Branch { .. } | Operation::ReturnVoid => Vec::new(),
            Operation::CondBranch { condition, .. } => vec![condition],
            Operation::AllocLayout { count, .. } => vec![count],
            Operation::ReturnValue { value } => vec![value],
        }
    }

    pub fn result(&self) -> Option<VarId> {
        match self {
            Operation::Binary { result, .. } | Operation::Call { result, .. } => *result,
            Operation::Unary { result, .. }
            | Operation::Const { result, .. }
            | Operation::Cast { result, .. }
            | Operation::Gep { result, .. }
            | Operation::AllocLayout { result, .. } => Some(*result),
            Operation::Branch { .. }
            | Operation::CondBranch { .. }
            | Operation::ReturnVoid
            | Operation::ReturnValue { .. } => None,
        }
    }

    pub fn result_mut(&mut self) -> Option<&mut VarId> {
        match self {
            Operation::Binary { result, .. } | Operation::Call { result, .. } => result.as_mut(),
            Operation::Unary { result, .. }
            | Operation::Const { result, .. }
            | Operation::Cast { result, .. }
            | Operation::Gep { result, .. }
            | Operation::AllocLayout { result, .. } => Some(result),
            Operation::Branch { .. }
            | Operation::CondBranch { .. }
            | Operation::ReturnVoid
            | Operation::ReturnValue { .. } => None,
        }
    }

    /// Blocks control can transfer to
    pub fn destinations(&self) -> Vec<BlockId> {
        match self {
            Operation::Branch { target } => vec![*target],
            Operation::CondBranch {
                on_true, on_false, ..
            } => vec![*on_true, *on_false],
            _ => Vec::new(),
        }
    }

    /// Whether this operation closes its block
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Operation::Branch { .. }
                | Operation::CondBranch { .. }
                | Operation::ReturnVoid
                | Operation::ReturnValue { .. }
        )
    }
}

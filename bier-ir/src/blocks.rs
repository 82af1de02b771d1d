//! Basic Blocks
//!
//! A block is an ordered list of operation handles. Operations themselves
//! live in the owning function's arena, so splicing a block never moves or
//! invalidates the operations of any other block.

use serde::Serialize;

use crate::ids::{BlockId, FunctionId, OpId};
use crate::values::{IntegerConst, Value};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BasicBlock {
    pub id: BlockId,
    pub function: FunctionId,
    pub label: String,
    operations: Vec<OpId>,
    constants: Vec<IntegerConst>,
    pub(crate) next: Option<BlockId>,
    terminated: bool,
}

impl BasicBlock {
    pub(crate) fn new(id: BlockId, function: FunctionId, label: &str) -> Self {
        Self {
            id,
            function,
            label: label.to_string(),
            operations: Vec::new(),
            constants: Vec::new(),
            next: None,
            terminated: false,
        }
    }

    /// Append an operation at the end of the block
    pub(crate) fn append(&mut self, op: OpId) {
        assert!(
            !self.terminated,
            "append to terminated block \"{}\"",
            self.label
        );
        self.operations.push(op);
    }

    /// Splice an operation in before position `pos`
    pub(crate) fn insert_at(&mut self, pos: usize, op: OpId) {
        self.operations.insert(pos, op);
    }

    pub(crate) fn delete_at(&mut self, pos: usize) -> OpId {
        self.operations.remove(pos)
    }

    /// Register a constant scoped to this block
    pub(crate) fn insert_const(&mut self, constant: IntegerConst) -> Value {
        self.constants.push(constant);
        Value::Const(constant)
    }

    pub(crate) fn terminate(&mut self) {
        self.terminated = true;
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub fn operations(&self) -> &[OpId] {
        &self.operations
    }

    pub fn constants(&self) -> &[IntegerConst] {
        &self.constants
    }

    /// Next block in the function's chain
    pub fn next(&self) -> Option<BlockId> {
        self.next
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block() -> BasicBlock {
        BasicBlock::new(BlockId::new(0), FunctionId::new(0), "entry")
    }

    #[test]
    fn test_splice() {
        let mut bb = block();
        bb.append(OpId::new(0));
        bb.append(OpId::new(2));
        bb.insert_at(1, OpId::new(1));
        assert_eq!(bb.operations(), &[OpId::new(0), OpId::new(1), OpId::new(2)]);

        assert_eq!(bb.delete_at(0), OpId::new(0));
        assert_eq!(bb.operations(), &[OpId::new(1), OpId::new(2)]);
    }

    #[test]
    fn test_terminate_is_idempotent() {
        let mut bb = block();
        bb.append(OpId::new(0));
        bb.terminate();
        bb.terminate();
        assert!(bb.is_terminated());
        // Splicing stays possible after termination
        bb.insert_at(0, OpId::new(1));
        assert_eq!(bb.len(), 2);
    }

    #[test]
    #[should_panic(expected = "append to terminated block")]
    fn test_append_after_terminator() {
        let mut bb = block();
        bb.terminate();
        bb.append(OpId::new(0));
    }
}

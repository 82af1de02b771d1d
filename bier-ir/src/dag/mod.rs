//! Dependency DAG
//!
//! A read-only analysis over one basic block. Every operation of the block
//! gets its position, the operations that produced its operands (looked up
//! earlier in the block, otherwise across the rest of the function) and its
//! data dependencies: the producers that precede it inside the block. A
//! writer later in the same block never produces an earlier read. Allocations are roots, never dependencies.
//! Program order is kept separately as a sequence link to the predecessor.

pub mod dot;
pub mod graph;

pub use dot::DagDotSerializer;
pub use graph::{DagNodeType, OpDagBuilder, VisualOpDag, VisualOpDagNode};

use std::collections::HashMap;

use crate::function::Function;
use crate::ids::{BlockId, OpId, VarId};

#[derive(Debug, Clone)]
pub struct DagContext {
    block: BlockId,
    order: Vec<OpId>,
    positions: HashMap<OpId, usize>,
    /// Per position: producer of each operand, in operand order
    sources: Vec<Vec<Option<OpId>>>,
    /// Per position: positions of the in-block producers it depends on
    dependencies: Vec<Vec<usize>>,
}

impl DagContext {
    pub fn build(function: &Function, block: BlockId) -> Self {
        // Producers outside this block; the last writer in chain order wins
        let mut definers: HashMap<VarId, OpId> = HashMap::new();
        for bb in function.blocks().filter(|bb| bb.id != block) {
            for (id, op) in function.block_operations(bb.id) {
                if let Some(result) = op.result() {
                    definers.insert(result, id);
                }
            }
        }

        let mut context = Self {
            block,
            order: Vec::new(),
            positions: HashMap::new(),
            sources: Vec::new(),
            dependencies: Vec::new(),
        };
        // Producers seen so far inside this block shadow the outside ones
        let mut local: HashMap<VarId, OpId> = HashMap::new();

        for (pos, (id, op)) in function.block_operations(block).enumerate() {
            let mut sources = Vec::new();
            let mut dependencies = Vec::new();
            for operand in op.operands() {
                let source = operand
                    .as_variable()
                    .and_then(|var| local.get(&var).or_else(|| definers.get(&var)).copied());
                if let Some(source) = source {
                    let is_root = function.operation(source).opcode().is_allocation();
                    if let Some(&source_pos) = context.positions.get(&source) {
                        if !is_root && !dependencies.contains(&source_pos) {
                            dependencies.push(source_pos);
                        }
                    }
                }
                sources.push(source);
            }
            if let Some(result) = op.result() {
                local.insert(result, id);
            }

            context.order.push(id);
            context.positions.insert(id, pos);
            context.sources.push(sources);
            context.dependencies.push(dependencies);
        }
        context
    }

    pub fn block(&self) -> BlockId {
        self.block
    }

    pub fn has(&self, op: OpId) -> bool {
        self.positions.contains_key(&op)
    }

    /// Position of an operation inside the block
    pub fn get(&self, op: OpId) -> Option<usize> {
        self.positions.get(&op).copied()
    }

    /// Positions of the operations `op` depends on; empty when there are none
    pub fn dependent(&self, op: OpId) -> &[usize] {
        self.get(op)
            .map(|pos| self.dependencies[pos].as_slice())
            .unwrap_or(&[])
    }

    /// Position of the operation right before `op` in program order
    pub fn seq_link(&self, op: OpId) -> Option<usize> {
        self.get(op).and_then(|pos| pos.checked_sub(1))
    }

    /// Producers of the operands of `op`, `None` for operands without one
    pub fn sources(&self, op: OpId) -> &[Option<OpId>] {
        self.get(op)
            .map(|pos| self.sources[pos].as_slice())
            .unwrap_or(&[])
    }

    pub fn op_at(&self, pos: usize) -> OpId {
        self.order[pos]
    }

    pub fn operations(&self) -> &[OpId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

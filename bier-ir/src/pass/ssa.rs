//! SSA Construction
//!
//! Promotes every mutable variable to a stack slot. A prologue block
//! allocates one slot per promoted variable; every read of such a variable
//! becomes a load right before its use and every write becomes a store right
//! after its definition. Afterwards no variable of the function is mutable.

use log::{debug, trace};
use std::collections::{HashMap, HashSet};

use super::OperationPass;
use crate::function::Function;
use crate::ids::{BlockId, VarId};
use crate::instructions::Operation;
use crate::ops::{BinOp, UnOp};
use crate::types::TypeRegistry;
use crate::values::{IntegerConst, Value};

#[derive(Debug, Default)]
pub struct SsaPass {
    /// promoted variable -> its stack slot
    promoted: HashMap<VarId, VarId>,
    /// slots allocated by the prologue
    allocated: HashSet<VarId>,
}

impl SsaPass {
    pub fn new() -> Self {
        Self::default()
    }

    fn make_load(
        &self,
        function: &mut Function,
        block: BlockId,
        pos: usize,
        var: VarId,
    ) -> VarId {
        let source = function.variable(var);
        let (name, ty) = (format!("{}_val", source.name()), source.ty());
        let loaded = function.allocate_variable(&name, ty, false);
        function.insert_operation(
            block,
            pos,
            Operation::Unary {
                op: UnOp::Load,
                operand: Value::Variable(self.promoted[&var]),
                result: loaded,
            },
        );
        loaded
    }

    fn make_store(
        &self,
        function: &mut Function,
        block: BlockId,
        pos: usize,
        var: VarId,
    ) -> VarId {
        let target = function.variable(var);
        let (name, ty) = (format!("{}_val", target.name()), target.ty());
        let stored = function.allocate_variable(&name, ty, false);
        function.insert_operation(
            block,
            pos,
            Operation::Binary {
                op: BinOp::Store,
                lhs: Value::Variable(stored),
                rhs: Value::Variable(self.promoted[&var]),
                result: None,
            },
        );
        stored
    }
}

impl OperationPass for SsaPass {
    fn on_function(&mut self, types: &mut TypeRegistry, function: &mut Function) {
        self.promoted.clear();
        self.allocated.clear();
        if !function.has_blocks() {
            return;
        }

        let mut values = Vec::new();
        let ids: Vec<VarId> = function.variables().map(|(id, _)| id).collect();
        for id in ids {
            let variable = function.variable_mut(id);
            if variable.is_mutable() {
                values.push(id);
            }
            variable.make_immutable();
        }

        let entry = function.first_block();
        let prologue = function.create_block_at_start("", &[]);
        for var in values {
            let one = IntegerConst {
                value: 1,
                ty: types.int64(),
            };
            let count = function.block_mut(prologue).insert_const(one);
            let (name, ty) = {
                let variable = function.variable(var);
                (format!("{}_ptr", variable.name()), variable.ty())
            };
            let ptr_type = types.ptr_to(ty);
            let slot = function.allocate_variable(&name, ptr_type, false);
            function.append_operation(
                prologue,
                Operation::Unary {
                    op: UnOp::Alloc,
                    operand: count,
                    result: slot,
                },
            );
            self.promoted.insert(var, slot);
            self.allocated.insert(slot);
        }
        if let Some(entry) = entry {
            function.append_operation(prologue, Operation::Branch { target: entry });
        }
        debug!(
            "promoting {} mutable variables of {}",
            self.promoted.len(),
            function.name()
        );
    }

    fn transform_operation(
        &mut self,
        _types: &mut TypeRegistry,
        function: &mut Function,
        block: BlockId,
        pos: usize,
    ) -> usize {
        let op_id = function.block(block).operations()[pos];
        let op = function.operation(op_id);
        if op.result().is_some_and(|result| self.allocated.contains(&result)) {
            return pos + 1;
        }

        let operands = promoted_operands(op, &self.promoted);
        let result = op.result().filter(|result| self.promoted.contains_key(result));

        let mut next = pos;
        let mut loads = Vec::with_capacity(operands.len());
        for (slot, var) in operands {
            loads.push((slot, self.make_load(function, block, next, var)));
            next += 1;
        }
        if !loads.is_empty() {
            let op = function.operation_mut(op_id);
            let mut slots = op.operands_mut();
            for (slot, loaded) in loads {
                trace!("substituting operand {slot} of {op_id} with {loaded}");
                *slots[slot] = Value::Variable(loaded);
            }
        }

        // Step over the rewritten operation itself
        next += 1;
        if let Some(var) = result {
            let stored = self.make_store(function, block, next, var);
            if let Some(slot) = function.operation_mut(op_id).result_mut() {
                *slot = stored;
            }
            next += 1;
        }
        next
    }
}

/// (operand slot, variable) for every operand that is a promoted variable
fn promoted_operands(op: &Operation, promoted: &HashMap<VarId, VarId>) -> Vec<(usize, VarId)> {
    op.operands()
        .into_iter()
        .enumerate()
        .filter_map(|(slot, value)| {
            value
                .as_variable()
                .filter(|var| promoted.contains_key(var))
                .map(|var| (slot, var))
        })
        .collect()
}

//! IR Functions
//!
//! A function owns its chain of basic blocks, its variables and the arena of
//! operations those blocks refer to. Its signature lives in the module.

use bier_common::{IrError, IrResult};
use log::{debug, trace};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::blocks::BasicBlock;
use crate::ids::{BlockId, FunctionId, OpId, SignatureId, VarId};
use crate::instructions::Operation;
use crate::types::{TypeId, TypeRegistry};
use crate::values::Variable;

/// Parameter of a function signature
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArgumentValue {
    pub ty: TypeId,
    name: Option<String>,
}

impl ArgumentValue {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// Name and type of a declared function; shared by defined and external functions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionSignature {
    pub id: SignatureId,
    name: String,
    func_type: TypeId,
    return_type: Option<TypeId>,
    arguments: Vec<ArgumentValue>,
}

impl FunctionSignature {
    pub(crate) fn new(
        id: SignatureId,
        name: &str,
        func_type: TypeId,
        types: &TypeRegistry,
    ) -> IrResult<Self> {
        let (return_type, args) = types
            .has(func_type)
            .then(|| types.function_parts(func_type))
            .flatten()
            .ok_or_else(|| {
                IrError::construction(format!(
                    "type of function {name} is not a function type of this module"
                ))
            })?;
        Ok(Self {
            id,
            name: name.to_string(),
            func_type,
            return_type,
            arguments: args
                .iter()
                .map(|&ty| ArgumentValue { ty, name: None })
                .collect(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn func_type(&self) -> TypeId {
        self.func_type
    }

    /// `None` for void functions
    pub fn return_type(&self) -> Option<TypeId> {
        self.return_type
    }

    pub fn arguments(&self) -> &[ArgumentValue] {
        &self.arguments
    }

    /// Name an argument. Each argument can be named once, and names are unique
    pub fn name_argument(&mut self, index: usize, name: &str) -> IrResult<()> {
        let len = self.arguments.len();
        if index >= len {
            return Err(IrError::out_of_bounds("arguments", index, len));
        }
        if name.is_empty() {
            return Err(IrError::construction("argument name cannot be empty"));
        }
        if self.arguments[index].name.is_some() {
            return Err(IrError::construction(format!(
                "argument {index} of {} is already named",
                self.name
            )));
        }
        if self.arguments.iter().any(|arg| arg.name() == Some(name)) {
            return Err(IrError::construction(format!(
                "argument {name} of {} is declared twice",
                self.name
            )));
        }
        self.arguments[index].name = Some(name.to_string());
        Ok(())
    }

    /// Declared name of an argument, `argN` if it was never named
    pub fn argument_name(&self, index: usize) -> String {
        match self.arguments.get(index).and_then(ArgumentValue::name) {
            Some(name) => name.to_string(),
            None => format!("arg{index}"),
        }
    }

    /// (name, type) of every argument, defaults applied
    pub(crate) fn argument_metadata(&self) -> Vec<(String, TypeId)> {
        (0..self.arguments.len())
            .map(|index| (self.argument_name(index), self.arguments[index].ty))
            .collect()
    }
}

/// Per-function name uniquification state
#[derive(Debug, Clone, Default, Serialize)]
struct VariableNames {
    counters: HashMap<String, u32>,
    anonymous: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Function {
    pub id: FunctionId,
    signature: SignatureId,
    name: String,
    func_type: TypeId,
    return_type: Option<TypeId>,
    blocks: Vec<BasicBlock>,
    first: Option<BlockId>,
    arguments: Vec<VarId>,
    variables: Vec<Option<Variable>>,
    by_name: BTreeMap<String, VarId>,
    #[serde(skip)]
    names: VariableNames,
    operations: Vec<Operation>,
}

impl Function {
    pub(crate) fn new(id: FunctionId, signature: &FunctionSignature) -> Self {
        Self {
            id,
            signature: signature.id,
            name: signature.name().to_string(),
            func_type: signature.func_type(),
            return_type: signature.return_type(),
            blocks: Vec::new(),
            first: None,
            arguments: Vec::new(),
            variables: Vec::new(),
            by_name: BTreeMap::new(),
            names: VariableNames::default(),
            operations: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> SignatureId {
        self.signature
    }

    pub fn func_type(&self) -> TypeId {
        self.func_type
    }

    pub fn return_type(&self) -> Option<TypeId> {
        self.return_type
    }

    // Blocks

    /// Add a block after `after` (the tail by default). The first block of a
    /// function materializes one immutable variable per argument.
    pub(crate) fn create_block(
        &mut self,
        label: &str,
        after: Option<BlockId>,
        arguments: &[(String, TypeId)],
    ) -> BlockId {
        let id = BlockId::new(self.blocks.len());
        self.blocks.push(BasicBlock::new(id, self.id, label));

        match (self.first, after.or_else(|| self.last_block())) {
            (None, _) => {
                self.first = Some(id);
                self.materialize_arguments(arguments);
            }
            (Some(_), Some(prev)) => {
                let next = self.block(prev).next;
                self.block_mut(id).next = next;
                self.block_mut(prev).next = Some(id);
            }
            (Some(_), None) => unreachable!("non-empty block chain without a tail"),
        }
        debug!("created block {id} \"{label}\" in {}", self.name);
        id
    }

    /// Put a new block ahead of the current head
    pub(crate) fn create_block_at_start(
        &mut self,
        label: &str,
        arguments: &[(String, TypeId)],
    ) -> BlockId {
        let Some(head) = self.first else {
            return self.create_block(label, None, arguments);
        };
        let id = BlockId::new(self.blocks.len());
        let mut block = BasicBlock::new(id, self.id, label);
        block.next = Some(head);
        self.blocks.push(block);
        self.first = Some(id);
        debug!("prepended block {id} \"{label}\" to {}", self.name);
        id
    }

    fn materialize_arguments(&mut self, arguments: &[(String, TypeId)]) {
        for (name, ty) in arguments {
            let id = VarId::new(self.variables.len());
            self.names.counters.entry(name.clone()).or_insert(0);
            self.variables.push(Some(Variable::argument(name.clone(), *ty)));
            self.by_name.insert(name.clone(), id);
            self.arguments.push(id);
        }
    }

    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.index()]
    }

    pub(crate) fn block_mut(&mut self, id: BlockId) -> &mut BasicBlock {
        &mut self.blocks[id.index()]
    }

    pub fn first_block(&self) -> Option<BlockId> {
        self.first
    }

    pub fn last_block(&self) -> Option<BlockId> {
        self.block_ids().last()
    }

    /// Block ids in chain order
    pub fn block_ids(&self) -> impl Iterator<Item = BlockId> + '_ {
        std::iter::successors(self.first, move |&id| self.block(id).next)
    }

    /// Blocks in chain order
    pub fn blocks(&self) -> impl Iterator<Item = &BasicBlock> + '_ {
        self.block_ids().map(move |id| self.block(id))
    }

    pub fn find_block(&self, label: &str) -> Option<BlockId> {
        self.blocks().find(|block| block.label == label).map(|block| block.id)
    }

    pub fn has_blocks(&self) -> bool {
        self.first.is_some()
    }

    // Variables

    /// Single entry point for variable creation.
    ///
    /// Immutable variables always get a fresh unique name: empty names become
    /// an anonymous counter, taken names get a numeric suffix. A mutable
    /// variable whose name already exists resolves to the existing variable.
    pub fn allocate_variable(&mut self, name: &str, ty: TypeId, is_mutable: bool) -> VarId {
        assert!(
            !is_mutable || !name.is_empty(),
            "mutable variable should have a name"
        );
        if is_mutable {
            if let Some(&existing) = self.by_name.get(name) {
                return existing;
            }
        }
        let name = self.unique_name(name);
        let id = VarId::new(self.variables.len());
        trace!("allocated variable {name} ({id}) in {}", self.name);
        self.variables.push(Some(Variable::new(name.clone(), ty, is_mutable)));
        self.by_name.insert(name, id);
        id
    }

    fn unique_name(&mut self, name: &str) -> String {
        if !name.is_empty() && !self.by_name.contains_key(name) {
            self.names.counters.entry(name.to_string()).or_insert(0);
            return name.to_string();
        }
        loop {
            let candidate = if name.is_empty() {
                let n = self.names.anonymous;
                self.names.anonymous += 1;
                n.to_string()
            } else {
                let counter = self.names.counters.entry(name.to_string()).or_insert(0);
                let candidate = format!("{name}{counter}");
                *counter += 1;
                candidate
            };
            if !self.by_name.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    pub fn variable(&self, id: VarId) -> &Variable {
        self.variables[id.index()]
            .as_ref()
            .unwrap_or_else(|| panic!("variable {id} of {} was removed", self.name))
    }

    pub(crate) fn variable_mut(&mut self, id: VarId) -> &mut Variable {
        let name = &self.name;
        self.variables[id.index()]
            .as_mut()
            .unwrap_or_else(|| panic!("variable {id} of {name} was removed"))
    }

    pub fn variable_by_name(&self, name: &str) -> Option<VarId> {
        self.by_name.get(name).copied()
    }

    /// Live variables in creation order
    pub fn variables(&self) -> impl Iterator<Item = (VarId, &Variable)> + '_ {
        self.variables
            .iter()
            .enumerate()
            .filter_map(|(index, var)| var.as_ref().map(|var| (VarId::new(index), var)))
    }

    /// Variable materialized for argument `index`, once the first block exists
    pub fn argument(&self, index: usize) -> Option<VarId> {
        self.arguments.get(index).copied()
    }

    pub fn arguments(&self) -> &[VarId] {
        &self.arguments
    }

    // Operations

    pub fn operation(&self, id: OpId) -> &Operation {
        &self.operations[id.index()]
    }

    pub(crate) fn operation_mut(&mut self, id: OpId) -> &mut Operation {
        &mut self.operations[id.index()]
    }

    /// Operations of a block, in program order
    pub fn block_operations(&self, block: BlockId) -> impl Iterator<Item = (OpId, &Operation)> + '_ {
        self.block(block)
            .operations()
            .iter()
            .map(move |&id| (id, self.operation(id)))
    }

    /// Append to a block; terminators close it
    pub(crate) fn append_operation(&mut self, block: BlockId, op: Operation) -> OpId {
        let terminates = op.is_terminator();
        let id = OpId::new(self.operations.len());
        self.block_mut(block).append(id);
        self.operations.push(op);
        if terminates {
            self.block_mut(block).terminate();
        }
        id
    }

    /// Splice an operation in before position `pos` of a block
    pub(crate) fn insert_operation(&mut self, block: BlockId, pos: usize, op: Operation) -> OpId {
        let id = OpId::new(self.operations.len());
        self.operations.push(op);
        self.block_mut(block).insert_at(pos, id);
        id
    }

    /// Unlink the operation at `pos` from a block. Its arena slot stays, so
    /// handles held elsewhere remain valid.
    pub fn remove_operation(&mut self, block: BlockId, pos: usize) -> OpId {
        self.block_mut(block).delete_at(pos)
    }

    /// Last operation in chain order that writes `var`
    pub fn defining_op(&self, var: VarId) -> Option<OpId> {
        self.blocks()
            .flat_map(|block| block.operations().iter().copied())
            .filter(|&id| self.operation(id).result() == Some(var))
            .last()
    }

    /// Drop variables that are neither an operand nor a result of any
    /// operation. Argument variables are kept. Returns how many were removed.
    pub fn normalize(&mut self) -> usize {
        let mut referenced = HashSet::new();
        for block in self.blocks() {
            for &op in block.operations() {
                let op = self.operation(op);
                referenced.extend(op.operands().iter().filter_map(|value| value.as_variable()));
                referenced.extend(op.result());
            }
        }

        let mut removed = 0;
        for index in 0..self.variables.len() {
            let id = VarId::new(index);
            let lost = matches!(
                &self.variables[index],
                Some(var) if !var.is_argument() && !referenced.contains(&id)
            );
            if lost {
                if let Some(var) = self.variables[index].take() {
                    trace!("dropping unreferenced variable {} in {}", var.name(), self.name);
                    self.by_name.remove(var.name());
                }
                removed += 1;
            }
        }
        if removed > 0 {
            debug!("normalize removed {removed} variables from {}", self.name);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::BinOp;
    use crate::values::Value;

    fn function(types: &mut TypeRegistry) -> Function {
        let args = [types.int32(), types.int8()];
        let func_type = types.make_function_type(None, &args);
        let mut signature = FunctionSignature::new(SignatureId::new(0), "f", func_type, types).unwrap();
        signature.name_argument(0, "a").unwrap();
        Function::new(FunctionId::new(0), &signature)
    }

    #[test]
    fn test_argument_naming() {
        let mut types = TypeRegistry::new();
        let args = [types.int32(), types.int32(), types.int8()];
        let func_type = types.make_function_type(None, &args);
        let mut signature = FunctionSignature::new(SignatureId::new(0), "g", func_type, &types).unwrap();

        signature.name_argument(1, "b").unwrap();
        assert!(signature.name_argument(1, "c").is_err());
        assert!(signature.name_argument(0, "b").is_err());
        assert!(signature.name_argument(3, "d").is_err());
        assert_eq!(signature.argument_name(0), "arg0");
        assert_eq!(signature.argument_name(1), "b");
    }

    #[test]
    fn test_signature_requires_function_type() {
        let types = TypeRegistry::new();
        assert!(FunctionSignature::new(SignatureId::new(0), "f", types.int32(), &types).is_err());
    }

    #[test]
    fn test_first_block_materializes_arguments() {
        let mut types = TypeRegistry::new();
        let mut func = function(&mut types);
        let args = vec![("a".to_string(), types.int32()), ("arg1".to_string(), types.int8())];

        assert!(func.argument(0).is_none());
        let entry = func.create_block("entry", None, &args);
        let second = func.create_block("next", None, &args);

        assert_eq!(func.arguments().len(), 2);
        let a = func.variable(func.argument(0).unwrap());
        assert_eq!(a.name(), "a");
        assert!(a.is_argument() && !a.is_mutable());
        assert_eq!(func.block_ids().collect::<Vec<_>>(), vec![entry, second]);
    }

    #[test]
    fn test_block_chain_insertion() {
        let mut types = TypeRegistry::new();
        let mut func = function(&mut types);
        let a = func.create_block("a", None, &[]);
        let c = func.create_block("c", None, &[]);
        let b = func.create_block("b", Some(a), &[]);
        let head = func.create_block_at_start("", &[]);

        assert_eq!(func.block_ids().collect::<Vec<_>>(), vec![head, a, b, c]);
        assert_eq!(func.first_block(), Some(head));
        assert_eq!(func.last_block(), Some(c));
        assert_eq!(func.find_block("b"), Some(b));
    }

    #[test]
    fn test_variable_names() {
        let mut types = TypeRegistry::new();
        let mut func = function(&mut types);
        let ty = types.int32();

        let t0 = func.allocate_variable("", ty, false);
        let t1 = func.allocate_variable("", ty, false);
        assert_eq!(func.variable(t0).name(), "0");
        assert_eq!(func.variable(t1).name(), "1");

        let x = func.allocate_variable("x", ty, false);
        let x0 = func.allocate_variable("x", ty, false);
        let x1 = func.allocate_variable("x", ty, false);
        assert_eq!(func.variable(x).name(), "x");
        assert_eq!(func.variable(x0).name(), "x0");
        assert_eq!(func.variable(x1).name(), "x1");

        let m = func.allocate_variable("m", ty, true);
        assert_eq!(func.allocate_variable("m", ty, true), m);
        assert!(func.variable(m).is_mutable());
    }

    #[test]
    fn test_generated_names_skip_taken_ones() {
        let mut types = TypeRegistry::new();
        let mut func = function(&mut types);
        let ty = types.int32();

        func.allocate_variable("y0", ty, false);
        func.allocate_variable("y", ty, false);
        let next = func.allocate_variable("y", ty, false);
        assert_eq!(func.variable(next).name(), "y1");
    }

    #[test]
    #[should_panic(expected = "mutable variable should have a name")]
    fn test_mutable_variable_needs_a_name() {
        let mut types = TypeRegistry::new();
        let mut func = function(&mut types);
        let ty = types.int8();
        func.allocate_variable("", ty, true);
    }

    #[test]
    fn test_terminator_closes_block() {
        let mut types = TypeRegistry::new();
        let mut func = function(&mut types);
        let entry = func.create_block("entry", None, &[]);
        func.append_operation(entry, Operation::ReturnVoid);
        assert!(func.block(entry).is_terminated());

        // Passes can still splice in front of the terminator
        let ty = types.int32();
        let x = func.allocate_variable("x", ty, false);
        let op = Operation::Binary {
            op: BinOp::Add,
            lhs: Value::Variable(x),
            rhs: Value::Variable(x),
            result: Some(x),
        };
        let id = func.insert_operation(entry, 0, op);
        assert_eq!(func.block(entry).operations()[0], id);
        assert_eq!(func.defining_op(x), Some(id));

        assert_eq!(func.remove_operation(entry, 0), id);
        assert_eq!(func.block(entry).len(), 1);
        assert_eq!(func.defining_op(x), None);
    }
}

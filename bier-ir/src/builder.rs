//! IR Builder
//!
//! The module builder is the only sanctioned way to populate a module. Every
//! construction is validated against the type system before anything is
//! emitted, so a failed call leaves the module untouched apart from names it
//! may have reserved. Errors are decorated with the current function, block
//! and source position.

use bier_common::{IrError, IrResult, SourcePos};
use log::{debug, trace};

use crate::ids::{BlockId, BlockRef, FunctionId, LayoutId, SignatureId, VarId};
use crate::instructions::Operation;
use crate::module::Module;
use crate::ops::{BinOp, UnOp};
use crate::types::TypeId;
use crate::values::{IntegerConst, Value};

/// Where an operation's result goes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dest {
    pub name: String,
    pub is_mutable: bool,
}

impl Dest {
    /// Anonymous immutable temporary
    pub fn temp() -> Self {
        Self::default()
    }

    /// Immutable variable; the name is uniquified if taken
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            is_mutable: false,
        }
    }

    /// Mutable variable, reused when the name already exists
    pub fn mutable(name: &str) -> Self {
        Self {
            name: name.to_string(),
            is_mutable: true,
        }
    }
}

/// What a call invokes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callee {
    Function(FunctionId),
    Signature(SignatureId),
    /// Any value of function type
    Pointer(Value),
}

pub struct ModuleBuilder<'m> {
    module: &'m mut Module,
    current: Option<BlockRef>,
    position: Option<SourcePos>,
}

impl<'m> ModuleBuilder<'m> {
    pub fn new(module: &'m mut Module) -> Self {
        Self {
            module,
            current: None,
            position: None,
        }
    }

    pub fn module(&self) -> &Module {
        self.module
    }

    pub fn module_mut(&mut self) -> &mut Module {
        self.module
    }

    /// Source position attached to subsequent errors
    pub fn set_position(&mut self, position: Option<SourcePos>) {
        self.position = position;
    }

    pub fn attach_to(&mut self, block: BlockRef) {
        self.current = Some(block);
    }

    pub fn current_block(&self) -> Option<BlockRef> {
        self.current
    }

    // Error helpers

    fn decorate(&self, mut err: IrError) -> IrError {
        if let Some(at) = self.current {
            let function = self.module.function(at.function);
            err = err
                .with_block(function.block(at.block).label.clone())
                .with_function(function.name());
        }
        if let Some(position) = self.position {
            err = err.at(position);
        }
        err
    }

    fn fail(&self, message: impl Into<String>) -> IrError {
        self.decorate(IrError::construction(message))
    }

    fn show(&self, ty: TypeId) -> String {
        self.module.types().display(ty).to_string()
    }

    /// Current block, which must still accept operations
    fn open_block(&self) -> IrResult<BlockRef> {
        let at = self
            .current
            .ok_or_else(|| self.fail("builder is not attached to a block"))?;
        if self.module.function(at.function).block(at.block).is_terminated() {
            return Err(self.fail("block is already terminated"));
        }
        Ok(at)
    }

    fn type_of(&self, at: BlockRef, value: Value) -> TypeId {
        self.module.type_of(at.function, value)
    }

    /// Type of a value seen from the current function
    pub fn value_type(&self, value: Value) -> IrResult<TypeId> {
        let at = self
            .current
            .ok_or_else(|| self.fail("builder is not attached to a block"))?;
        Ok(self.type_of(at, value))
    }

    fn result(&mut self, at: BlockRef, dest: &Dest, ty: TypeId) -> IrResult<VarId> {
        if dest.is_mutable {
            if dest.name.is_empty() {
                return Err(self.fail("mutable variable should have a name"));
            }
            let function = self.module.function(at.function);
            if let Some(existing) = function.variable_by_name(&dest.name) {
                let var = function.variable(existing);
                if !var.is_mutable() {
                    return Err(self.fail(format!("cannot assign to immutable %{}", dest.name)));
                }
                if var.ty() != ty {
                    return Err(self.fail(format!(
                        "cannot assign {} to ${} of type {}",
                        self.show(ty),
                        dest.name,
                        self.show(var.ty())
                    )));
                }
            }
        }
        Ok(self
            .module
            .function_mut(at.function)
            .allocate_variable(&dest.name, ty, dest.is_mutable))
    }

    fn emit(&mut self, at: BlockRef, op: Operation) {
        trace!("{}: emitting {} in {}", at.function, op.opcode(), at.block);
        self.module
            .function_mut(at.function)
            .append_operation(at.block, op);
    }

    // Functions and blocks

    pub fn create_function(
        &mut self,
        name: &str,
        return_type: Option<TypeId>,
        args: &[TypeId],
    ) -> IrResult<FunctionId> {
        if self.module.has_function(name) {
            return Err(self.fail(format!("function {name} already defined!")));
        }
        if let Some(foreign) = return_type
            .iter()
            .chain(args)
            .find(|&&ty| !self.module.types().has(ty))
        {
            return Err(self.fail(format!(
                "function {name} uses type {foreign:?} of another module"
            )));
        }
        let func_type = self
            .module
            .types_mut()
            .make_function_type(return_type, args);
        let id = self
            .module
            .add_function(name, func_type)
            .map_err(|err| self.decorate(err))?;
        debug!("created function {name}: {}", self.show(func_type));
        Ok(id)
    }

    pub fn name_argument(&mut self, function: FunctionId, index: usize, name: &str) -> IrResult<()> {
        let signature = self.module.function(function).signature();
        self.module
            .signature_mut(signature)
            .name_argument(index, name)
            .map_err(|err| self.decorate(err))
    }

    /// Variable bound to argument `index` of the current function
    pub fn argument(&self, index: usize) -> IrResult<Value> {
        let at = self
            .current
            .ok_or_else(|| self.fail("builder is not attached to a block"))?;
        let function = self.module.function(at.function);
        function
            .argument(index)
            .map(Value::Variable)
            .ok_or_else(|| self.fail(format!("{} has no argument {index}", function.name())))
    }

    /// Create a block at the tail of `function` and attach to it
    pub fn create_block(&mut self, function: FunctionId, label: &str) -> BlockRef {
        self.create_block_after(function, label, None)
    }

    pub fn create_block_after(
        &mut self,
        function: FunctionId,
        label: &str,
        after: Option<BlockId>,
    ) -> BlockRef {
        let block = self.module.create_block(function, label, after);
        self.current = Some(block);
        block
    }

    // Constants

    /// Integer constant registered with the current block
    pub fn int_const(&mut self, ty: TypeId, value: u64) -> IrResult<Value> {
        let at = self
            .current
            .ok_or_else(|| self.fail("builder is not attached to a block"))?;
        let constant =
            IntegerConst::new(self.module.types(), ty, value).map_err(|err| self.decorate(err))?;
        Ok(self
            .module
            .function_mut(at.function)
            .block_mut(at.block)
            .insert_const(constant))
    }

    /// Materialize a constant into a variable
    pub fn create_const(&mut self, ty: TypeId, value: u64, dest: Dest) -> IrResult<Value> {
        let at = self.open_block()?;
        let constant =
            IntegerConst::new(self.module.types(), ty, value).map_err(|err| self.decorate(err))?;
        let result = self.result(at, &dest, ty)?;
        self.emit(at, Operation::Const { value: constant, result });
        Ok(Value::Variable(result))
    }

    // Arithmetic and comparisons

    fn create_arithmetic(&mut self, op: BinOp, lhs: Value, rhs: Value, dest: Dest) -> IrResult<Value> {
        let at = self.open_block()?;
        let (left, right) = (self.type_of(at, lhs), self.type_of(at, rhs));
        if left != right {
            return Err(self.fail(format!(
                "types mismatch {} {}",
                self.show(left),
                self.show(right)
            )));
        }
        let result_type = if op.is_comparison() {
            self.module.types().int1()
        } else {
            left
        };
        let result = self.result(at, &dest, result_type)?;
        self.emit(
            at,
            Operation::Binary {
                op,
                lhs,
                rhs,
                result: Some(result),
            },
        );
        Ok(Value::Variable(result))
    }

    pub fn create_add(&mut self, lhs: Value, rhs: Value, dest: Dest) -> IrResult<Value> {
        self.create_arithmetic(BinOp::Add, lhs, rhs, dest)
    }

    pub fn create_sub(&mut self, lhs: Value, rhs: Value, dest: Dest) -> IrResult<Value> {
        self.create_arithmetic(BinOp::Sub, lhs, rhs, dest)
    }

    pub fn create_mul(&mut self, lhs: Value, rhs: Value, dest: Dest) -> IrResult<Value> {
        self.create_arithmetic(BinOp::Mul, lhs, rhs, dest)
    }

    pub fn create_udiv(&mut self, lhs: Value, rhs: Value, dest: Dest) -> IrResult<Value> {
        self.create_arithmetic(BinOp::UDiv, lhs, rhs, dest)
    }

    pub fn create_sdiv(&mut self, lhs: Value, rhs: Value, dest: Dest) -> IrResult<Value> {
        self.create_arithmetic(BinOp::SDiv, lhs, rhs, dest)
    }

    pub fn create_urem(&mut self, lhs: Value, rhs: Value, dest: Dest) -> IrResult<Value> {
        self.create_arithmetic(BinOp::URem, lhs, rhs, dest)
    }

    pub fn create_srem(&mut self, lhs: Value, rhs: Value, dest: Dest) -> IrResult<Value> {
        self.create_arithmetic(BinOp::SRem, lhs, rhs, dest)
    }

    pub fn create_eq(&mut self, lhs: Value, rhs: Value, dest: Dest) -> IrResult<Value> {
        self.create_arithmetic(BinOp::Eq, lhs, rhs, dest)
    }

    pub fn create_ne(&mut self, lhs: Value, rhs: Value, dest: Dest) -> IrResult<Value> {
        self.create_arithmetic(BinOp::Ne, lhs, rhs, dest)
    }

    pub fn create_sle(&mut self, lhs: Value, rhs: Value, dest: Dest) -> IrResult<Value> {
        self.create_arithmetic(BinOp::Le, lhs, rhs, dest)
    }

    pub fn create_slt(&mut self, lhs: Value, rhs: Value, dest: Dest) -> IrResult<Value> {
        self.create_arithmetic(BinOp::Lt, lhs, rhs, dest)
    }

    pub fn create_sge(&mut self, lhs: Value, rhs: Value, dest: Dest) -> IrResult<Value> {
        self.create_arithmetic(BinOp::Ge, lhs, rhs, dest)
    }

    pub fn create_sgt(&mut self, lhs: Value, rhs: Value, dest: Dest) -> IrResult<Value> {
        self.create_arithmetic(BinOp::Gt, lhs, rhs, dest)
    }

    // Memory

    pub fn create_store(&mut self, ptr: Value, value: Value) -> IrResult<()> {
        let at = self.open_block()?;
        let (ptr_type, value_type) = (self.type_of(at, ptr), self.type_of(at, value));
        let types = self.module.types();
        if !types.is_ptr(ptr_type) {
            return Err(self.fail(format!(
                "store to non-ptr type {} requested",
                self.show(ptr_type)
            )));
        }
        if !types.is_ptr_compatible_with(ptr_type, value_type) {
            return Err(self.fail(format!(
                "store to {} of {} is not possible",
                self.show(ptr_type),
                self.show(value_type)
            )));
        }
        self.emit(
            at,
            Operation::Binary {
                op: BinOp::Store,
                lhs: value,
                rhs: ptr,
                result: None,
            },
        );
        Ok(())
    }

    pub fn create_load(&mut self, ptr: Value, load_type: TypeId, dest: Dest) -> IrResult<Value> {
        let at = self.open_block()?;
        let ptr_type = self.type_of(at, ptr);
        let types = self.module.types();
        if !types.is_ptr(ptr_type) {
            return Err(self.fail(format!(
                "load from non-ptr type {} requested",
                self.show(ptr_type)
            )));
        }
        if !types.has(load_type) {
            return Err(self.fail(format!("cannot load foreign type {load_type:?}")));
        }
        if !types.is_ptr_compatible_with(ptr_type, load_type) {
            return Err(self.fail(format!(
                "load from {} to {} is not possible",
                self.show(ptr_type),
                self.show(load_type)
            )));
        }
        let result = self.result(at, &dest, load_type)?;
        self.emit(
            at,
            Operation::Unary {
                op: UnOp::Load,
                operand: ptr,
                result,
            },
        );
        Ok(Value::Variable(result))
    }

    /// Resolve an element count, defaulting to an i64 constant 1
    /// Count operand of an allocation. A missing count is the i64 constant one,
    /// which is not registered in the block until the allocation is emitted.
    fn alloc_count(&self, at: BlockRef, count: Option<Value>) -> IrResult<Value> {
        match count {
            Some(count) => {
                let ty = self.type_of(at, count);
                if !self.module.types().is_integer(ty) {
                    return Err(self.fail(format!(
                        "cannot allocate count of {} type",
                        self.show(ty)
                    )));
                }
                Ok(count)
            }
            None => {
                let types = self.module.types();
                IntegerConst::new(types, types.int64(), 1)
                    .map(Value::Const)
                    .map_err(|err| self.decorate(err))
            }
        }
    }

    fn emit_alloc(&mut self, at: BlockRef, implicit_count: Option<Value>, op: Operation) {
        if let Some(Value::Const(constant)) = implicit_count {
            self.module
                .function_mut(at.function)
                .block_mut(at.block)
                .insert_const(constant);
        }
        self.emit(at, op);
    }

    /// Allocate `count` values of `ty`; the result is a pointer to `ty`
    pub fn create_alloc(&mut self, ty: TypeId, count: Option<Value>, dest: Dest) -> IrResult<Value> {
        let at = self.open_block()?;
        if !self.module.types().has(ty) {
            return Err(self.fail(format!("cannot allocate foreign type {ty:?}")));
        }
        let operand = self.alloc_count(at, count)?;
        let ptr_type = self.module.types_mut().ptr_to(ty);
        let result = self.result(at, &dest, ptr_type)?;
        let implicit = count.is_none().then_some(operand);
        self.emit_alloc(
            at,
            implicit,
            Operation::Unary {
                op: UnOp::Alloc,
                operand,
                result,
            },
        );
        Ok(Value::Variable(result))
    }

    /// Allocate `count` copies of a layout; the result is the any pointer
    pub fn create_alloc_layout(
        &mut self,
        layout: LayoutId,
        count: Option<Value>,
        dest: Dest,
    ) -> IrResult<Value> {
        let at = self.open_block()?;
        let operand = self.alloc_count(at, count)?;
        let ptr_type = self.module.types().ptr();
        let result = self.result(at, &dest, ptr_type)?;
        let implicit = count.is_none().then_some(operand);
        self.emit_alloc(
            at,
            implicit,
            Operation::AllocLayout {
                layout,
                count: operand,
                result,
            },
        );
        Ok(Value::Variable(result))
    }

    /// Assign to an existing mutable variable
    pub fn create_assign(&mut self, from: Value, to: Value) -> IrResult<()> {
        let at = self.open_block()?;
        let target = match to {
            Value::Variable(var) if self.module.is_mutable(at.function, to) => var,
            _ => return Err(self.fail("cannot assign to immutable")),
        };
        let (from_type, to_type) = (self.type_of(at, from), self.type_of(at, to));
        if from_type != to_type {
            return Err(self.fail(format!(
                "cannot assign from type {} to {} without explicit cast",
                self.show(from_type),
                self.show(to_type)
            )));
        }
        self.emit(
            at,
            Operation::Unary {
                op: UnOp::Assign,
                operand: from,
                result: target,
            },
        );
        Ok(())
    }

    /// Assign into a new (or, for mutable names, existing) variable
    pub fn create_assign_new(&mut self, from: Value, dest: Dest) -> IrResult<Value> {
        let at = self.open_block()?;
        let ty = self.type_of(at, from);
        let result = self.result(at, &dest, ty)?;
        self.emit(
            at,
            Operation::Unary {
                op: UnOp::Assign,
                operand: from,
                result,
            },
        );
        Ok(Value::Variable(result))
    }

    // Calls, addresses and casts

    /// Call with exactly matching arguments; `None` for void callees
    pub fn create_call(&mut self, callee: Callee, args: &[Value], dest: Dest) -> IrResult<Option<Value>> {
        let at = self.open_block()?;
        let (func_type, callee_value, callee_name) = match callee {
            Callee::Function(func) => {
                let function = self.module.function(func);
                (function.func_type(), Value::Function(func), function.name().to_string())
            }
            Callee::Signature(sig) => {
                let signature = self.module.signature(sig);
                (signature.func_type(), Value::Signature(sig), signature.name().to_string())
            }
            Callee::Pointer(value) => (
                self.type_of(at, value),
                value,
                self.module.value_name(at.function, value),
            ),
        };

        let types = self.module.types();
        let (return_type, params) = types.function_parts(func_type).ok_or_else(|| {
            self.fail(format!(
                "cannot call {callee_name} of type {}",
                self.show(func_type)
            ))
        })?;
        if params.len() != args.len() {
            return Err(self.fail(format!(
                "call to {callee_name} expects {} arguments, got {}",
                params.len(),
                args.len()
            )));
        }
        for (index, (&param, &arg)) in params.iter().zip(args).enumerate() {
            let arg_type = self.type_of(at, arg);
            if arg_type != param {
                return Err(self.fail(format!(
                    "type for argument {index} of {callee_name} does not match: expected {}, got {}",
                    self.show(param),
                    self.show(arg_type)
                )));
            }
        }

        let result = match return_type {
            Some(ty) => Some(self.result(at, &dest, ty)?),
            None => None,
        };
        self.emit(
            at,
            Operation::Call {
                func_type,
                callee: callee_value,
                args: args.to_vec(),
                result,
            },
        );
        Ok(result.map(Value::Variable))
    }

    /// Address of entry `index` of `layout` relative to `ptr`
    pub fn create_gep(
        &mut self,
        ptr: Value,
        layout: LayoutId,
        index: usize,
        dest: Dest,
        base_offset: Option<Value>,
        element_offset: Option<Value>,
    ) -> IrResult<Value> {
        let at = self.open_block()?;
        let ptr_type = self.type_of(at, ptr);
        if !self.module.types().is_ptr(ptr_type) {
            return Err(self.fail(format!(
                "cannot compute address from type {}",
                self.show(ptr_type)
            )));
        }
        for offset in base_offset.iter().chain(element_offset.iter()) {
            let ty = self.type_of(at, *offset);
            if !self.module.types().is_integer(ty) {
                return Err(self.fail(format!(
                    "address offset of type {} is not an integer",
                    self.show(ty)
                )));
            }
        }
        let entry = self
            .module
            .layout(layout)
            .entry(index)
            .map_err(|err| self.decorate(err))?;
        let result_type = self.module.types_mut().ptr_to(entry);
        let result = self.result(at, &dest, result_type)?;
        self.emit(
            at,
            Operation::Gep {
                ptr,
                layout,
                index,
                base_offset,
                element_offset,
                result,
            },
        );
        Ok(Value::Variable(result))
    }

    /// Reinterpret a value as `target`; legality is left to the backend
    pub fn cast_to(&mut self, value: Value, target: TypeId, dest: Dest) -> IrResult<Value> {
        let at = self.open_block()?;
        if !self.module.types().has(target) {
            return Err(self.fail(format!("cannot cast to foreign type {target:?}")));
        }
        let result = self.result(at, &dest, target)?;
        self.emit(at, Operation::Cast { from: value, result });
        Ok(Value::Variable(result))
    }

    // Terminators

    fn check_target(&self, at: BlockRef, target: BlockRef) -> IrResult<()> {
        if target.function != at.function {
            return Err(self.fail(format!(
                "branch to block \"{}\" of function {} is not allowed",
                self.module.function(target.function).block(target.block).label,
                self.module.function(target.function).name()
            )));
        }
        Ok(())
    }

    pub fn create_branch(&mut self, target: BlockRef) -> IrResult<()> {
        let at = self.open_block()?;
        self.check_target(at, target)?;
        self.emit(at, Operation::Branch { target: target.block });
        Ok(())
    }

    pub fn create_cond_branch(
        &mut self,
        condition: Value,
        on_true: BlockRef,
        on_false: BlockRef,
    ) -> IrResult<()> {
        let at = self.open_block()?;
        if self.type_of(at, condition) != self.module.types().int1() {
            return Err(self.fail("condition should be of type bool"));
        }
        self.check_target(at, on_true)?;
        self.check_target(at, on_false)?;
        self.emit(
            at,
            Operation::CondBranch {
                condition,
                on_true: on_true.block,
                on_false: on_false.block,
            },
        );
        Ok(())
    }

    pub fn create_return_void(&mut self) -> IrResult<()> {
        let at = self.open_block()?;
        let function = self.module.function(at.function);
        if function.return_type().is_some() {
            return Err(self.fail(format!(
                "{} has return type, but void is returned",
                function.name()
            )));
        }
        self.emit(at, Operation::ReturnVoid);
        Ok(())
    }

    pub fn create_return_value(&mut self, value: Value) -> IrResult<()> {
        let at = self.open_block()?;
        let value_type = self.type_of(at, value);
        let function = self.module.function(at.function);
        match function.return_type() {
            None => {
                return Err(self.fail(format!(
                    "{} returns void, but a value is returned",
                    function.name()
                )))
            }
            Some(ty) if ty != value_type => {
                return Err(self.fail(format!(
                    "{} returns {}, but {} is returned",
                    function.name(),
                    self.show(ty),
                    self.show(value_type)
                )))
            }
            Some(_) => {}
        }
        self.emit(at, Operation::ReturnValue { value });
        Ok(())
    }
}

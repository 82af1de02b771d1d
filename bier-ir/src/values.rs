//! IR Value Representations
//!
//! Defines everything that can appear as an operand or a result: constants,
//! argument references, function-local variables, static data and callable
//! references. Values are plain handles; the objects they name live in the
//! owning function or module.

use bier_common::{IrError, IrResult};
use serde::Serialize;
use std::fmt;

use crate::ids::{FunctionId, LayoutId, SignatureId, StaticDataId, VarId};
use crate::types::{TypeId, TypeRegistry};

/// Integer constant: a bit pattern together with its integer type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct IntegerConst {
    pub value: u64,
    pub ty: TypeId,
}

impl IntegerConst {
    /// Validates that `ty` is an integer type wide enough for `value`
    pub fn new(types: &TypeRegistry, ty: TypeId, value: u64) -> IrResult<Self> {
        if !types.is_integer(ty) {
            return Err(IrError::construction(format!(
                "constant of non-integer type {}",
                types.display(ty)
            )));
        }
        if !types.fits(ty, value) {
            return Err(IrError::construction(format!(
                "constant {value} does not fit into {}",
                types.display(ty)
            )));
        }
        Ok(Self { value, ty })
    }
}

/// IR Value - represents operands and results of operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Value {
    /// Integer constant
    Const(IntegerConst),

    /// Variable of the function being built
    Variable(VarId),

    /// Module-level static data, always typed as the any pointer
    StaticData(StaticDataId),

    /// Reference to a defined function
    Function(FunctionId),

    /// Reference to a declared signature (external functions included)
    Signature(SignatureId),
}

impl Value {
    pub fn as_variable(&self) -> Option<VarId> {
        match self {
            Value::Variable(var) => Some(*var),
            _ => None,
        }
    }

    pub fn as_const(&self) -> Option<IntegerConst> {
        match self {
            Value::Const(constant) => Some(*constant),
            _ => None,
        }
    }

    pub fn is_const(&self) -> bool {
        matches!(self, Value::Const(_))
    }
}

impl From<VarId> for Value {
    fn from(var: VarId) -> Self {
        Value::Variable(var)
    }
}

impl From<IntegerConst> for Value {
    fn from(constant: IntegerConst) -> Self {
        Value::Const(constant)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Const(constant) => write!(f, "{}", constant.value),
            Value::Variable(var) => write!(f, "%{var}"),
            Value::StaticData(data) => write!(f, "@{data}"),
            Value::Function(func) => write!(f, "@{func}"),
            Value::Signature(sig) => write!(f, "@{sig}"),
        }
    }
}

/// Function-local variable
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Variable {
    name: String,
    ty: TypeId,
    is_mutable: bool,
    is_argument: bool,
}

impl Variable {
    pub(crate) fn new(name: String, ty: TypeId, is_mutable: bool) -> Self {
        Self {
            name,
            ty,
            is_mutable,
            is_argument: false,
        }
    }

    pub(crate) fn argument(name: String, ty: TypeId) -> Self {
        Self {
            name,
            ty,
            is_mutable: false,
            is_argument: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> TypeId {
        self.ty
    }

    pub fn is_mutable(&self) -> bool {
        self.is_mutable
    }

    pub fn is_argument(&self) -> bool {
        self.is_argument
    }

    pub(crate) fn make_immutable(&mut self) {
        self.is_mutable = false;
    }
}

/// Named global storage over a layout, one slot per layout entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StaticData {
    name: String,
    layout: LayoutId,
    ty: TypeId,
    values: Vec<Option<IntegerConst>>,
}

impl StaticData {
    pub(crate) fn new(name: &str, layout: LayoutId, entries: usize, ptr_type: TypeId) -> Self {
        Self {
            name: name.to_string(),
            layout,
            ty: ptr_type,
            values: vec![None; entries],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn layout(&self) -> LayoutId {
        self.layout
    }

    pub fn ty(&self) -> TypeId {
        self.ty
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of slot `index`, `None` while the slot is still zero-initialized
    pub fn entry(&self, index: usize) -> IrResult<Option<IntegerConst>> {
        self.values
            .get(index)
            .copied()
            .ok_or_else(|| IrError::out_of_bounds("static data", index, self.values.len()))
    }

    pub fn set_entry(&mut self, value: IntegerConst, index: usize) -> IrResult<()> {
        let len = self.values.len();
        let slot = self
            .values
            .get_mut(index)
            .ok_or_else(|| IrError::out_of_bounds("static data", index, len))?;
        *slot = Some(value);
        Ok(())
    }

    pub fn entries(&self) -> &[Option<IntegerConst>] {
        &self.values
    }
}

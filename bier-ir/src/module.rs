//! IR Module
//!
//! The module is the unit of construction: it owns the type registry, every
//! layout, signature, function and static data object. Everything else refers
//! to those objects through arena handles.

use bier_common::{IrError, IrResult, LookupKind};
use log::debug;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::function::{Function, FunctionSignature};
use crate::ids::{BlockId, BlockRef, FunctionId, LayoutId, SignatureId, StaticDataId};
use crate::layout::Layout;
use crate::types::{TypeId, TypeRegistry};
use crate::values::{StaticData, Value};

#[derive(Debug, Default, Serialize)]
pub struct Module {
    types: TypeRegistry,
    layouts: Vec<Layout>,
    named_layouts: BTreeMap<String, LayoutId>,
    anonymous_layouts: Vec<LayoutId>,
    signatures: Vec<FunctionSignature>,
    #[serde(skip)]
    signature_names: BTreeMap<String, SignatureId>,
    functions: Vec<Function>,
    #[serde(skip)]
    definitions: BTreeMap<SignatureId, FunctionId>,
    external: BTreeSet<SignatureId>,
    static_data: Vec<StaticData>,
    #[serde(skip)]
    static_names: BTreeMap<String, StaticDataId>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn types_mut(&mut self) -> &mut TypeRegistry {
        &mut self.types
    }

    fn declare(&mut self, name: &str, func_type: TypeId) -> IrResult<SignatureId> {
        if self.signature_names.contains_key(name) {
            return Err(IrError::construction(format!(
                "function {name} is already declared"
            )));
        }
        let id = SignatureId::new(self.signatures.len());
        let signature = FunctionSignature::new(id, name, func_type, &self.types)?;
        self.signatures.push(signature);
        self.signature_names.insert(name.to_string(), id);
        Ok(id)
    }

    /// Declare a function with a body to be built
    pub fn add_function(&mut self, name: &str, func_type: TypeId) -> IrResult<FunctionId> {
        let signature = self.declare(name, func_type)?;
        let id = FunctionId::new(self.functions.len());
        self.functions
            .push(Function::new(id, &self.signatures[signature.index()]));
        self.definitions.insert(signature, id);
        debug!("declared function {name} ({id})");
        Ok(id)
    }

    /// Declare a function that is never defined in this module
    pub fn add_external_function(&mut self, name: &str, func_type: TypeId) -> IrResult<SignatureId> {
        let signature = self.declare(name, func_type)?;
        self.external.insert(signature);
        debug!("declared external function {name}");
        Ok(signature)
    }

    pub fn add_named_layout(&mut self, name: &str, mut layout: Layout) -> IrResult<LayoutId> {
        if self.named_layouts.contains_key(name) {
            return Err(IrError::construction(format!(
                "layout {name} is already declared"
            )));
        }
        layout.set_name(name);
        let id = LayoutId::new(self.layouts.len());
        self.layouts.push(layout);
        self.named_layouts.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn add_anonymous_layout(&mut self, layout: Layout) -> LayoutId {
        let id = LayoutId::new(self.layouts.len());
        self.layouts.push(layout);
        self.anonymous_layouts.push(id);
        id
    }

    /// Allocate static data over a layout, one empty slot per layout entry
    pub fn add_static_data(&mut self, name: &str, layout: LayoutId) -> IrResult<StaticDataId> {
        if self.static_names.contains_key(name) {
            return Err(IrError::construction(format!(
                "static data {name} is already declared"
            )));
        }
        let entries = self.layout(layout).entries().len();
        let id = StaticDataId::new(self.static_data.len());
        self.static_data
            .push(StaticData::new(name, layout, entries, self.types.ptr()));
        self.static_names.insert(name.to_string(), id);
        Ok(id)
    }

    // Lookups

    pub fn get_function(&self, name: &str) -> IrResult<FunctionId> {
        self.signature_names
            .get(name)
            .and_then(|signature| self.definitions.get(signature))
            .copied()
            .ok_or_else(|| IrError::not_found(LookupKind::Function, name))
    }

    pub fn get_function_signature(&self, name: &str) -> IrResult<SignatureId> {
        self.signature_names
            .get(name)
            .copied()
            .ok_or_else(|| IrError::not_found(LookupKind::Signature, name))
    }

    pub fn get_named_layout(&self, name: &str) -> IrResult<LayoutId> {
        self.named_layouts
            .get(name)
            .copied()
            .ok_or_else(|| IrError::not_found(LookupKind::Layout, name))
    }

    pub fn get_static_data(&self, name: &str) -> IrResult<StaticDataId> {
        self.static_names
            .get(name)
            .copied()
            .ok_or_else(|| IrError::not_found(LookupKind::StaticData, name))
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.signature_names.contains_key(name)
    }

    pub fn is_external(&self, signature: SignatureId) -> bool {
        self.external.contains(&signature)
    }

    /// The body defined for a signature, `None` for external functions
    pub fn definition(&self, signature: SignatureId) -> Option<FunctionId> {
        self.definitions.get(&signature).copied()
    }

    // Accessors

    pub fn function(&self, id: FunctionId) -> &Function {
        &self.functions[id.index()]
    }

    pub fn function_mut(&mut self, id: FunctionId) -> &mut Function {
        &mut self.functions[id.index()]
    }

    pub fn signature(&self, id: SignatureId) -> &FunctionSignature {
        &self.signatures[id.index()]
    }

    pub fn signature_mut(&mut self, id: SignatureId) -> &mut FunctionSignature {
        &mut self.signatures[id.index()]
    }

    pub fn function_signature(&self, id: FunctionId) -> &FunctionSignature {
        self.signature(self.function(id).signature())
    }

    pub fn layout(&self, id: LayoutId) -> &Layout {
        &self.layouts[id.index()]
    }

    pub fn static_data(&self, id: StaticDataId) -> &StaticData {
        &self.static_data[id.index()]
    }

    pub fn static_data_mut(&mut self, id: StaticDataId) -> &mut StaticData {
        &mut self.static_data[id.index()]
    }

    /// Every declared signature, defined and external, in declaration order
    pub fn declared_functions(&self) -> impl Iterator<Item = &FunctionSignature> + '_ {
        self.signatures.iter()
    }

    /// Defined functions with their signatures, in declaration order
    pub fn defined_functions(&self) -> impl Iterator<Item = (&FunctionSignature, &Function)> + '_ {
        self.functions
            .iter()
            .map(move |function| (self.signature(function.signature()), function))
    }

    pub fn external_functions(&self) -> impl Iterator<Item = &FunctionSignature> + '_ {
        self.external.iter().map(move |&id| self.signature(id))
    }

    pub fn named_layouts(&self) -> impl Iterator<Item = (&str, LayoutId)> + '_ {
        self.named_layouts
            .iter()
            .map(|(name, &id)| (name.as_str(), id))
    }

    pub fn anonymous_layouts(&self) -> &[LayoutId] {
        &self.anonymous_layouts
    }

    pub fn statics(&self) -> impl Iterator<Item = (StaticDataId, &StaticData)> + '_ {
        self.static_data
            .iter()
            .enumerate()
            .map(|(index, data)| (StaticDataId::new(index), data))
    }

    // Blocks

    /// Add a block to a function, after `after` or at the tail
    pub fn create_block(&mut self, function: FunctionId, label: &str, after: Option<BlockId>) -> BlockRef {
        let arguments = self.function_signature(function).argument_metadata();
        let block = self.functions[function.index()].create_block(label, after, &arguments);
        BlockRef { function, block }
    }

    /// Add a block ahead of the function's current head
    pub fn create_block_at_start(&mut self, function: FunctionId, label: &str) -> BlockRef {
        let arguments = self.function_signature(function).argument_metadata();
        let block = self.functions[function.index()].create_block_at_start(label, &arguments);
        BlockRef { function, block }
    }

    // Values

    /// Type of a value seen from inside `function`
    pub fn type_of(&self, function: FunctionId, value: Value) -> TypeId {
        match value {
            Value::Const(constant) => constant.ty,
            Value::Variable(var) => self.function(function).variable(var).ty(),
            Value::StaticData(data) => self.static_data(data).ty(),
            Value::Function(func) => self.function(func).func_type(),
            Value::Signature(sig) => self.signature(sig).func_type(),
        }
    }

    pub fn value_name(&self, function: FunctionId, value: Value) -> String {
        match value {
            Value::Const(constant) => constant.value.to_string(),
            Value::Variable(var) => self.function(function).variable(var).name().to_string(),
            Value::StaticData(data) => self.static_data(data).name().to_string(),
            Value::Function(func) => self.function(func).name().to_string(),
            Value::Signature(sig) => self.signature(sig).name().to_string(),
        }
    }

    /// Only variables can be mutable
    pub fn is_mutable(&self, function: FunctionId, value: Value) -> bool {
        match value {
            Value::Variable(var) => self.function(function).variable(var).is_mutable(),
            _ => false,
        }
    }

    /// Registry and function bodies, borrowed apart for rewriting passes
    pub(crate) fn split_for_pass(&mut self) -> (&mut TypeRegistry, &mut [Function]) {
        (&mut self.types, &mut self.functions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::LayoutEntry;
    use crate::values::IntegerConst;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_same_name_fails() {
        let mut module = Module::new();
        let i32_ty = module.types().int32();
        let func_type = module.types_mut().make_function_type(Some(i32_ty), &[]);

        module.add_function("main", func_type).unwrap();
        let err = module.add_function("main", func_type).unwrap_err();
        assert_eq!(
            err.to_string(),
            "BIeR IR exception: function main is already declared"
        );
        assert!(module.add_external_function("main", func_type).is_err());
    }

    #[test]
    fn test_same_type_different_names() {
        let mut module = Module::new();
        let func_type = module.types_mut().make_function_type(None, &[]);
        let a = module.add_function("a", func_type).unwrap();
        let b = module.add_function("b", func_type).unwrap();
        assert_ne!(a, b);
        assert_eq!(module.get_function("b"), Ok(b));
    }

    #[test]
    fn test_foreign_function_type_fails() {
        let mut other = TypeRegistry::new();
        let foreign = other.make_function_type(None, &[]);
        let mut module = Module::new();
        assert!(module.add_function("f", foreign).is_err());
        let i8_ty = module.types().int8();
        assert!(module.add_function("g", i8_ty).is_err());
        assert!(!module.has_function("f"));
    }

    #[test]
    fn test_lookups() {
        let mut module = Module::new();
        let func_type = module.types_mut().make_function_type(None, &[]);
        let puts = module.add_external_function("puts", func_type).unwrap();

        assert!(module.get_function("missing").unwrap_err().is_not_found());
        assert_eq!(
            module.get_function("puts"),
            Err(IrError::not_found(LookupKind::Function, "puts"))
        );
        assert_eq!(module.get_function_signature("puts"), Ok(puts));
        assert!(module.is_external(puts));
        assert_eq!(module.definition(puts), None);
        assert!(module.get_named_layout("point").is_err());
        assert!(module.get_static_data("table").is_err());
    }

    #[test]
    fn test_function_iterators() {
        let mut module = Module::new();
        let func_type = module.types_mut().make_function_type(None, &[]);
        module.add_external_function("ext", func_type).unwrap();
        module.add_function("body", func_type).unwrap();

        let declared: Vec<_> = module.declared_functions().map(|s| s.name()).collect();
        assert_eq!(declared, vec!["ext", "body"]);
        let defined: Vec<_> = module.defined_functions().map(|(s, _)| s.name()).collect();
        assert_eq!(defined, vec!["body"]);
        let external: Vec<_> = module.external_functions().map(|s| s.name()).collect();
        assert_eq!(external, vec!["ext"]);
    }

    #[test]
    fn test_layouts_and_static_data() {
        let mut module = Module::new();
        let types = module.types();
        let layout = Layout::from_entries(&[
            LayoutEntry::new(types.int32()),
            LayoutEntry::array(types.int8(), 4),
        ]);
        let point = module.add_named_layout("point", layout.clone()).unwrap();
        let anon = module.add_anonymous_layout(layout.clone());
        assert!(module.add_named_layout("point", layout).is_err());

        assert_eq!(module.get_named_layout("point"), Ok(point));
        assert_eq!(module.layout(point).name(), Some("point"));
        assert_eq!(module.layout(anon).name(), None);
        assert_eq!(module.anonymous_layouts(), &[anon]);

        let table = module.add_static_data("table", point).unwrap();
        assert!(module.add_static_data("table", anon).is_err());
        let value = IntegerConst::new(module.types(), module.types().int32(), 5).unwrap();
        module.static_data_mut(table).set_entry(value, 0).unwrap();

        let data = module.static_data(table);
        assert_eq!(data.len(), 2);
        assert_eq!(data.ty(), module.types().ptr());
        assert_eq!(module.type_of(FunctionId::new(0), Value::StaticData(table)), module.types().ptr());
        assert_eq!(module.get_static_data("table"), Ok(table));
    }
}

//! Textual IR
//!
//! Renders a module in the line-oriented textual form read by the parser:
//! named layouts, static data, external signatures, then every defined
//! function with its labelled blocks and tab-indented operations.

use std::fmt::{self, Write};

use crate::function::FunctionSignature;
use crate::ids::FunctionId;
use crate::instructions::Operation;
use crate::layout::Layout;
use crate::module::Module;
use crate::values::Value;

pub struct TextSerializer<'a> {
    module: &'a Module,
}

impl<'a> TextSerializer<'a> {
    pub fn new(module: &'a Module) -> Self {
        Self { module }
    }

    pub fn module_to_string(&self) -> String {
        let mut out = String::new();
        // Writing into a String never fails
        let _ = self.write_module(&mut out);
        out
    }

    pub fn op_to_string(&self, function: FunctionId, op: &Operation) -> String {
        let mut out = String::new();
        let _ = self.write_op(function, op, &mut out);
        out
    }

    pub fn write_module(&self, out: &mut impl Write) -> fmt::Result {
        let module = self.module;
        for (name, id) in module.named_layouts() {
            write!(out, "\"{name}\" ")?;
            self.write_layout(module.layout(id), out)?;
            writeln!(out)?;
        }
        for (_, data) in module.statics() {
            write!(out, "global {}<", data.name())?;
            let layout = module.layout(data.layout());
            for (entry, value) in layout.entries().iter().zip(data.entries()) {
                let value = value.map_or(0, |constant| constant.value);
                write!(out, " {} {value}", module.types().display(entry.ty))?;
            }
            writeln!(out, " >")?;
        }
        for signature in module.external_functions() {
            self.write_signature(signature, out)?;
            writeln!(out)?;
        }
        for (signature, function) in module.defined_functions() {
            self.write_signature(signature, out)?;
            writeln!(out, " {{")?;
            for block in function.blocks() {
                if !block.label.is_empty() {
                    writeln!(out, "{}:", block.label)?;
                }
                for (_, op) in function.block_operations(block.id) {
                    write!(out, "\t")?;
                    self.write_op(function.id, op, out)?;
                    writeln!(out)?;
                }
            }
            writeln!(out, "}}")?;
        }
        Ok(())
    }

    pub fn write_signature(&self, signature: &FunctionSignature, out: &mut impl Write) -> fmt::Result {
        let types = self.module.types();
        write!(out, "func {} (", signature.name())?;
        for (index, arg) in signature.arguments().iter().enumerate() {
            write!(
                out,
                "{} %{},",
                types.display(arg.ty),
                signature.argument_name(index)
            )?;
        }
        match signature.return_type() {
            Some(ty) => write!(out, ") {}", types.display(ty)),
            None => write!(out, ") void"),
        }
    }

    pub fn write_op(&self, function: FunctionId, op: &Operation, out: &mut impl Write) -> fmt::Result {
        let module = self.module;
        if let Some(result) = op.result() {
            let var = module.function(function).variable(result);
            let sigil = if var.is_mutable() { '$' } else { '%' };
            write!(
                out,
                "{sigil}{} {} = ",
                var.name(),
                module.types().display(var.ty())
            )?;
        }
        write!(out, "{} ", op.opcode())?;
        if let Operation::AllocLayout { layout, .. } = op {
            let layout = module.layout(*layout);
            match layout.name() {
                Some(name) => write!(out, "@{name}")?,
                None => self.write_layout(layout, out)?,
            }
            write!(out, " ")?;
        }
        for operand in op.operands() {
            self.write_value(function, operand, out)?;
        }
        let body = module.function(function);
        for target in op.destinations() {
            write!(out, "{}, ", body.block(target).label)?;
        }
        Ok(())
    }

    pub fn write_value(&self, function: FunctionId, value: Value, out: &mut impl Write) -> fmt::Result {
        let module = self.module;
        write!(out, "{} ", module.types().display(module.type_of(function, value)))?;
        match value {
            Value::Const(constant) => write!(out, "{}", constant.value)?,
            _ => {
                let sigil = if module.is_mutable(function, value) { '$' } else { '%' };
                write!(out, "{sigil}{}", module.value_name(function, value))?;
            }
        }
        write!(out, ", ")
    }

    pub fn write_layout(&self, layout: &Layout, out: &mut impl Write) -> fmt::Result {
        write!(out, "[")?;
        for entry in layout.entries() {
            write!(
                out,
                "[{} x {}] ",
                self.module.types().display(entry.ty),
                entry.count
            )?;
        }
        write!(out, "]")
    }
}

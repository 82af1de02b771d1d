//! Built-in sample modules
//!
//! Small programs assembled through the module builder, used to exercise the
//! toolkit from the command line.

use bier_common::IrResult;
use bier_ir::{Callee, Dest, IntegerConst, Layout, LayoutEntry, Module, ModuleBuilder};

pub struct Sample {
    pub name: &'static str,
    pub description: &'static str,
    build: fn() -> IrResult<Module>,
}

impl Sample {
    pub fn build(&self) -> IrResult<Module> {
        (self.build)()
    }
}

pub const SAMPLES: &[Sample] = &[
    Sample {
        name: "sum",
        description: "straight-line arithmetic over two arguments",
        build: sum,
    },
    Sample {
        name: "loop",
        description: "counting loop over mutable variables",
        build: counting_loop,
    },
    Sample {
        name: "layout",
        description: "layout addressing, static data and an external call",
        build: layout,
    },
];

pub fn find(name: &str) -> Option<&'static Sample> {
    SAMPLES.iter().find(|sample| sample.name == name)
}

fn sum() -> IrResult<Module> {
    let mut module = Module::new();
    let mut builder = ModuleBuilder::new(&mut module);
    let i32_ty = builder.module().types().int32();

    let func = builder.create_function("sum", Some(i32_ty), &[i32_ty, i32_ty])?;
    builder.name_argument(func, 0, "a")?;
    builder.name_argument(func, 1, "b")?;
    builder.create_block(func, "entry");

    let (a, b) = (builder.argument(0)?, builder.argument(1)?);
    let total = builder.create_add(a, b, Dest::named("total"))?;
    let two = builder.int_const(i32_ty, 2)?;
    let scaled = builder.create_mul(total, two, Dest::named("scaled"))?;
    builder.create_return_value(scaled)?;
    Ok(module)
}

fn counting_loop() -> IrResult<Module> {
    let mut module = Module::new();
    let mut builder = ModuleBuilder::new(&mut module);
    let i32_ty = builder.module().types().int32();

    let func = builder.create_function("sum_below", Some(i32_ty), &[i32_ty])?;
    builder.name_argument(func, 0, "n")?;
    let entry = builder.create_block(func, "entry");
    let head = builder.create_block(func, "head");
    let body = builder.create_block(func, "body");
    let exit = builder.create_block(func, "exit");

    builder.attach_to(entry);
    let n = builder.argument(0)?;
    let zero = builder.int_const(i32_ty, 0)?;
    let acc = builder.create_assign_new(zero, Dest::mutable("acc"))?;
    let i = builder.create_assign_new(zero, Dest::mutable("i"))?;
    builder.create_branch(head)?;

    builder.attach_to(head);
    let more = builder.create_slt(i, n, Dest::named("more"))?;
    builder.create_cond_branch(more, body, exit)?;

    builder.attach_to(body);
    let step = builder.create_add(acc, i, Dest::temp())?;
    builder.create_assign(step, acc)?;
    let one = builder.int_const(i32_ty, 1)?;
    let next = builder.create_add(i, one, Dest::temp())?;
    builder.create_assign(next, i)?;
    builder.create_branch(head)?;

    builder.attach_to(exit);
    builder.create_return_value(acc)?;
    Ok(module)
}

fn layout() -> IrResult<Module> {
    let mut module = Module::new();
    let types = module.types();
    let (i8_ty, i32_ty) = (types.int8(), types.int32());

    let record = Layout::from_entries(&[LayoutEntry::new(i32_ty), LayoutEntry::array(i8_ty, 10)]);
    let record = module.add_named_layout("record", record)?;
    let defaults = module.add_static_data("defaults", record)?;
    let seed = IntegerConst::new(module.types(), i32_ty, 42)?;
    module.static_data_mut(defaults).set_entry(seed, 0)?;

    let print_type = module.types_mut().make_function_type(None, &[i8_ty]);
    let print = module.add_external_function("print_char", print_type)?;

    let mut builder = ModuleBuilder::new(&mut module);
    let func = builder.create_function("fill", None, &[i8_ty])?;
    builder.name_argument(func, 0, "c")?;
    builder.create_block(func, "entry");

    let c = builder.argument(0)?;
    let buffer = builder.create_alloc_layout(record, None, Dest::named("buffer"))?;
    let three = builder.int_const(i32_ty, 3)?;
    let slot = builder.create_gep(buffer, record, 1, Dest::named("slot"), None, Some(three))?;
    builder.create_store(slot, c)?;
    let loaded = builder.create_load(slot, i8_ty, Dest::named("loaded"))?;
    builder.create_call(Callee::Signature(print), &[loaded], Dest::temp())?;
    builder.create_return_void()?;
    Ok(module)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_samples_build() {
        for sample in SAMPLES {
            let module = sample.build().unwrap();
            assert_eq!(module.defined_functions().count(), 1, "{}", sample.name);
        }
    }

    #[test]
    fn test_find() {
        assert_eq!(find("loop").map(|sample| sample.name), Some("loop"));
        assert!(find("missing").is_none());
    }
}

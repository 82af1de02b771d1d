//! Tests for the per-block dependency DAG

use bier_ir::dag::{DagContext, DagDotSerializer, DagNodeType, OpDagBuilder};
use bier_ir::{BlockId, Dest, FunctionId, Module, ModuleBuilder};
use pretty_assertions::assert_eq;

/// entry: %p = alloc i32; %a = add %x, %y; %c = add %a, %a; store %c, %p; ret
fn diamond(module: &mut Module) -> (FunctionId, BlockId) {
    let mut builder = ModuleBuilder::new(module);
    let i32_ty = builder.module().types().int32();
    let func = builder.create_function("diamond", None, &[i32_ty, i32_ty]).unwrap();
    builder.name_argument(func, 0, "x").unwrap();
    builder.name_argument(func, 1, "y").unwrap();
    let entry = builder.create_block(func, "entry");

    let (x, y) = (builder.argument(0).unwrap(), builder.argument(1).unwrap());
    let p = builder.create_alloc(i32_ty, None, Dest::named("p")).unwrap();
    let a = builder.create_add(x, y, Dest::named("a")).unwrap();
    let c = builder.create_add(a, a, Dest::named("c")).unwrap();
    builder.create_store(p, c).unwrap();
    builder.create_return_void().unwrap();
    (func, entry.block)
}

#[test]
fn test_dependencies_are_complete() {
    let mut module = Module::new();
    let (func, entry) = diamond(&mut module);
    let context = DagContext::build(module.function(func), entry);
    assert_eq!(context.len(), 5);
    assert_eq!(context.block(), entry);

    let ops = context.operations().to_vec();
    assert_eq!(context.dependent(ops[0]), &[] as &[usize]);
    assert_eq!(context.dependent(ops[1]), &[] as &[usize]);
    // Both operands come from the same producer
    assert_eq!(context.dependent(ops[2]), &[1]);
    // The stored-to slot is an allocation and never a dependency
    assert_eq!(context.dependent(ops[3]), &[2]);
    assert_eq!(context.dependent(ops[4]), &[] as &[usize]);

    assert_eq!(context.sources(ops[3]), &[Some(ops[2]), Some(ops[0])]);
    assert_eq!(context.sources(ops[1]), &[None, None]);
}

#[test]
fn test_sequence_links() {
    let mut module = Module::new();
    let (func, entry) = diamond(&mut module);
    let context = DagContext::build(module.function(func), entry);

    let links: Vec<Option<usize>> = context
        .operations()
        .iter()
        .map(|&op| context.seq_link(op))
        .collect();
    assert_eq!(links, vec![None, Some(0), Some(1), Some(2), Some(3)]);
    for (pos, &op) in context.operations().iter().enumerate() {
        assert_eq!(context.get(op), Some(pos));
        assert!(context.has(op));
    }
}

#[test]
fn test_producers_in_other_blocks() {
    let mut module = Module::new();
    let mut builder = ModuleBuilder::new(&mut module);
    let i8_ty = builder.module().types().int8();
    let func = builder.create_function("split", Some(i8_ty), &[i8_ty]).unwrap();
    let first = builder.create_block(func, "first");
    let a = builder.argument(0).unwrap();
    let doubled = builder.create_add(a, a, Dest::named("d")).unwrap();
    let second = builder.create_block(func, "second");
    builder.attach_to(first);
    builder.create_branch(second).unwrap();
    builder.attach_to(second);
    let tripled = builder.create_add(doubled, a, Dest::temp()).unwrap();
    builder.create_return_value(tripled).unwrap();

    let body = module.function(func);
    let context = DagContext::build(body, second.block);
    let add = context.op_at(0);
    let (outer, _) = body.block_operations(first.block).next().unwrap();
    assert!(!context.has(outer));
    assert_eq!(context.sources(add), &[Some(outer), None]);
    assert!(context.dependent(add).is_empty());
    assert!(context.dependent(outer).is_empty());
}

/// A mutable read followed by a write to the same variable in one block
#[test]
fn test_later_writer_does_not_produce_earlier_read() {
    let mut module = Module::new();
    let mut builder = ModuleBuilder::new(&mut module);
    let i32_ty = builder.module().types().int32();
    let func = builder.create_function("rewrite", Some(i32_ty), &[i32_ty]).unwrap();
    let entry = builder.create_block(func, "entry");
    let body = builder.create_block(func, "body");

    builder.attach_to(entry);
    let arg = builder.argument(0).unwrap();
    let x = builder.create_assign_new(arg, Dest::mutable("x")).unwrap();
    builder.create_branch(body).unwrap();

    builder.attach_to(body);
    let sum = builder.create_add(x, arg, Dest::temp()).unwrap();
    builder.create_assign(sum, x).unwrap();
    builder.create_return_value(x).unwrap();

    let function = module.function(func);
    let (initial, _) = function.block_operations(entry.block).next().unwrap();
    let context = DagContext::build(function, body.block);
    let (add, assign, ret) = (context.op_at(0), context.op_at(1), context.op_at(2));

    // The read sees the write from the entry block, not the one after it
    assert_eq!(context.sources(add), &[Some(initial), None]);
    assert!(context.dependent(add).is_empty());
    assert_eq!(context.sources(assign), &[Some(add)]);
    assert_eq!(context.dependent(assign), &[0]);
    assert_eq!(context.sources(ret), &[Some(assign)]);
    assert_eq!(context.dependent(ret), &[1]);

    let graph = OpDagBuilder::new(&module).build(func, body.block);
    for (index, node) in graph.nodes().iter().enumerate() {
        for &dep in &node.dependencies {
            assert!(
                !graph.nodes()[dep].dependencies.contains(&index),
                "nodes {index} and {dep} depend on each other"
            );
        }
    }
    assert_eq!(
        graph.nodes().iter().filter(|n| n.node_type == DagNodeType::ExternalOperation).count(),
        1
    );
}

#[test]
fn test_visual_graph() {
    let mut module = Module::new();
    let (func, entry) = diamond(&mut module);
    let graph = OpDagBuilder::new(&module).build(func, entry);

    let count = |ty: DagNodeType| graph.nodes().iter().filter(|n| n.node_type == ty).count();
    assert_eq!(count(DagNodeType::Operation), 5);
    assert_eq!(count(DagNodeType::Arg), 2);
    assert_eq!(count(DagNodeType::Alloca), 1);
    assert_eq!(count(DagNodeType::Const), 1);
    assert_eq!(graph.len(), 9);

    // The terminator is the root
    let root = &graph.nodes()[0];
    assert_eq!(root.attributes, vec!["op".to_string(), "ret ".to_string()]);
    assert!(root.dependencies.is_empty());

    let store = &graph.nodes()[root.seq_link.unwrap()];
    assert_eq!(store.dependencies.len(), 2);
    assert_eq!(graph.nodes()[store.dependencies[1]].node_type, DagNodeType::Alloca);
    assert_eq!(graph.nodes()[store.dependencies[1]].attributes[1], "p");

    let c = &graph.nodes()[store.dependencies[0]];
    assert_eq!(c.node_type, DagNodeType::Operation);
    assert_eq!(c.dependencies[0], c.dependencies[1]);
}

#[test]
fn test_dot_output() {
    let mut module = Module::new();
    let (func, entry) = diamond(&mut module);
    let graph = OpDagBuilder::new(&module).build(func, entry);

    let mut dot = DagDotSerializer::new();
    dot.serialize(&graph, "entry");
    let text = dot.finish();

    assert!(text.starts_with("digraph {\nrankdir=\"BT\";\nsubgraph cluster_1 {\nlabel=\"entry\";\n"));
    assert!(text.ends_with("}\n}\n"));
    assert_eq!(text.matches("[color=blue,style=dashed];").count(), 4);
    assert_eq!(text.matches("shape=Mrecord").count(), graph.len());
    assert!(text.contains("node_1_0 [shape=record,shape=Mrecord,label=\"{{<seq>seq}|op|ret }\"];"));
}

//! Visual DAG
//!
//! Turns the dependency context of a block into a plain node/edge graph for
//! rendering. Operations of the block become operation nodes; their operands
//! become nodes typed by where the value comes from.

use std::collections::HashMap;

use super::DagContext;
use crate::ids::{BlockId, FunctionId, OpId};
use crate::module::Module;
use crate::serialize::TextSerializer;
use crate::values::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DagNodeType {
    Signature,
    Const,
    StaticData,
    Alloca,
    Arg,
    Mutable,
    Operation,
    ExternalOperation,
}

impl DagNodeType {
    pub fn label(self) -> &'static str {
        match self {
            DagNodeType::Signature => "signature",
            DagNodeType::Const => "const",
            DagNodeType::StaticData => "static data",
            DagNodeType::Alloca => "alloca",
            DagNodeType::Arg => "arg",
            DagNodeType::Mutable => "mutable",
            DagNodeType::Operation => "op",
            DagNodeType::ExternalOperation => "external op",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisualOpDagNode {
    pub node_type: DagNodeType,
    pub attributes: Vec<String>,
    /// Node indices, one per operand
    pub dependencies: Vec<usize>,
    /// Node index of the previous operation in program order
    pub seq_link: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisualOpDag {
    pub(crate) nodes: Vec<VisualOpDagNode>,
}

impl VisualOpDag {
    pub fn nodes(&self) -> &[VisualOpDagNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn add_node(&mut self, node_type: DagNodeType) -> usize {
        self.nodes.push(VisualOpDagNode {
            node_type,
            attributes: vec![node_type.label().to_string()],
            dependencies: Vec::new(),
            seq_link: None,
        });
        self.nodes.len() - 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum NodeKey {
    Op(OpId),
    Value(Value),
}

pub struct OpDagBuilder<'a> {
    module: &'a Module,
    serializer: TextSerializer<'a>,
}

impl<'a> OpDagBuilder<'a> {
    pub fn new(module: &'a Module) -> Self {
        Self {
            module,
            serializer: TextSerializer::new(module),
        }
    }

    /// Graph of one block, rooted at its last operation
    pub fn build(&self, function: FunctionId, block: BlockId) -> VisualOpDag {
        let body = self.module.function(function);
        let context = DagContext::build(body, block);
        let mut graph = VisualOpDag::default();
        let mut nodes: HashMap<NodeKey, usize> = HashMap::new();

        for pos in (0..context.len()).rev() {
            let op = context.op_at(pos);
            let node = self.node(function, &context, &mut graph, &mut nodes, NodeKey::Op(op));
            if let Some(prev) = context.seq_link(op) {
                let prev = NodeKey::Op(context.op_at(prev));
                let prev = self.node(function, &context, &mut graph, &mut nodes, prev);
                graph.nodes[node].seq_link = Some(prev);
            }

            let operands = body.operation(op).operands();
            for (operand, source) in operands.into_iter().zip(context.sources(op)) {
                let key = match source {
                    Some(source) if !self.is_alloca(function, *source) => NodeKey::Op(*source),
                    _ => NodeKey::Value(operand),
                };
                let dependency = self.node(function, &context, &mut graph, &mut nodes, key);
                graph.nodes[node].dependencies.push(dependency);
            }
        }
        graph
    }

    fn is_alloca(&self, function: FunctionId, op: OpId) -> bool {
        self.module
            .function(function)
            .operation(op)
            .opcode()
            .is_allocation()
    }

    fn node(
        &self,
        function: FunctionId,
        context: &DagContext,
        graph: &mut VisualOpDag,
        nodes: &mut HashMap<NodeKey, usize>,
        key: NodeKey,
    ) -> usize {
        if let Some(&index) = nodes.get(&key) {
            return index;
        }
        let index = match key {
            NodeKey::Op(op) if context.has(op) => {
                let index = graph.add_node(DagNodeType::Operation);
                let text = self
                    .serializer
                    .op_to_string(function, self.module.function(function).operation(op));
                graph.nodes[index].attributes.push(text);
                index
            }
            NodeKey::Op(_) => graph.add_node(DagNodeType::ExternalOperation),
            NodeKey::Value(value) => {
                let index = graph.add_node(self.value_type(function, value));
                let name = self.module.value_name(function, value);
                graph.nodes[index].attributes.push(name);
                index
            }
        };
        nodes.insert(key, index);
        index
    }

    fn value_type(&self, function: FunctionId, value: Value) -> DagNodeType {
        match value {
            Value::Const(_) => DagNodeType::Const,
            Value::StaticData(_) => DagNodeType::StaticData,
            Value::Function(_) | Value::Signature(_) => DagNodeType::Signature,
            Value::Variable(var) => {
                let body = self.module.function(function);
                if body.variable(var).is_argument() {
                    DagNodeType::Arg
                } else if body
                    .defining_op(var)
                    .is_some_and(|op| body.operation(op).opcode().is_allocation())
                {
                    DagNodeType::Alloca
                } else {
                    DagNodeType::Mutable
                }
            }
        }
    }
}

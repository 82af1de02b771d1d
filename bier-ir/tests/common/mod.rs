//! Reference interpreter for integration tests
//!
//! Runs a function over a flat cell memory. Mutable variables simply hold
//! their latest value, so the same interpreter executes a function both
//! before and after SSA construction.

#![allow(dead_code)]

use bier_ir::{BinOp, FunctionId, IrType, Module, Operation, UnOp, Value, VarId};
use std::collections::HashMap;

const STEP_LIMIT: usize = 100_000;

pub struct Interpreter<'m> {
    module: &'m Module,
    pub memory: Vec<u64>,
    pub loads: usize,
    pub stores: usize,
}

impl<'m> Interpreter<'m> {
    pub fn new(module: &'m Module) -> Self {
        Self {
            module,
            memory: Vec::new(),
            loads: 0,
            stores: 0,
        }
    }

    fn width_mask(&self, function: FunctionId, var: VarId) -> u64 {
        let ty = self.module.function(function).variable(var).ty();
        match self.module.types().get(ty) {
            IrType::Int(64) | IrType::AnyPtr | IrType::PtrTo(_) | IrType::Function { .. } => u64::MAX,
            IrType::Int(bits) => (1u64 << bits) - 1,
        }
    }

    fn signed(&self, function: FunctionId, value: Value, raw: u64) -> i64 {
        let ty = self.module.type_of(function, value);
        match self.module.types().bit_width(ty) {
            Some(bits) if bits < 64 => {
                let shift = 64 - bits;
                ((raw << shift) as i64) >> shift
            }
            _ => raw as i64,
        }
    }

    fn alloc(&mut self, cells: usize) -> u64 {
        let ptr = self.memory.len() as u64;
        self.memory.resize(self.memory.len() + cells.max(1), 0);
        ptr
    }

    pub fn run(&mut self, function: FunctionId, args: &[u64]) -> Option<u64> {
        let module = self.module;
        let body = module.function(function);
        let mut vars: HashMap<VarId, u64> = HashMap::new();
        for (index, &arg) in args.iter().enumerate() {
            vars.insert(body.argument(index).expect("argument variable"), arg);
        }
        let read = |vars: &HashMap<VarId, u64>, value: Value| -> u64 {
            match value {
                Value::Const(constant) => constant.value,
                Value::Variable(var) => vars.get(&var).copied().unwrap_or(0),
                other => panic!("cannot evaluate {other:?}"),
            }
        };

        let mut block = body.first_block().expect("function has a body");
        let mut steps = 0;
        'blocks: loop {
            for (_, op) in body.block_operations(block) {
                steps += 1;
                assert!(steps < STEP_LIMIT, "interpreter step limit exceeded");
                match op {
                    Operation::Binary { op: BinOp::Store, lhs, rhs, .. } => {
                        let ptr = read(&vars, *rhs) as usize;
                        self.memory[ptr] = read(&vars, *lhs);
                        self.stores += 1;
                    }
                    Operation::Binary { op, lhs, rhs, result } => {
                        let (a, b) = (read(&vars, *lhs), read(&vars, *rhs));
                        let (sa, sb) = (self.signed(function, *lhs, a), self.signed(function, *rhs, b));
                        let value = match op {
                            BinOp::Add => a.wrapping_add(b),
                            BinOp::Sub => a.wrapping_sub(b),
                            BinOp::Mul => a.wrapping_mul(b),
                            BinOp::UDiv => a / b,
                            BinOp::SDiv => (sa / sb) as u64,
                            BinOp::URem => a % b,
                            BinOp::SRem => (sa % sb) as u64,
                            BinOp::Eq => (a == b) as u64,
                            BinOp::Ne => (a != b) as u64,
                            BinOp::Le => (sa <= sb) as u64,
                            BinOp::Lt => (sa < sb) as u64,
                            BinOp::Ge => (sa >= sb) as u64,
                            BinOp::Gt => (sa > sb) as u64,
                            BinOp::Store => unreachable!(),
                        };
                        let result = result.expect("binary result");
                        vars.insert(result, value & self.width_mask(function, result));
                    }
                    Operation::Unary { op: UnOp::Alloc, operand, result } => {
                        let ptr = self.alloc(read(&vars, *operand) as usize);
                        vars.insert(*result, ptr);
                    }
                    Operation::Unary { op: UnOp::Load, operand, result } => {
                        let ptr = read(&vars, *operand) as usize;
                        vars.insert(*result, self.memory[ptr]);
                        self.loads += 1;
                    }
                    Operation::Unary { op: UnOp::Assign, operand, result } => {
                        let value = read(&vars, *operand);
                        vars.insert(*result, value);
                    }
                    Operation::Const { value, result } => {
                        vars.insert(*result, value.value);
                    }
                    Operation::Cast { from, result } => {
                        let value = read(&vars, *from) & self.width_mask(function, *result);
                        vars.insert(*result, value);
                    }
                    Operation::Gep { ptr, layout, index, base_offset, element_offset, result } => {
                        let layout = module.layout(*layout);
                        let base = base_offset.map_or(0, |v| read(&vars, v)) * layout.size() as u64;
                        let element = element_offset.map_or(0, |v| read(&vars, v));
                        let address = read(&vars, *ptr) + base + layout.offset(*index, 0) as u64 + element;
                        vars.insert(*result, address);
                    }
                    Operation::AllocLayout { layout, count, result } => {
                        let cells = module.layout(*layout).size() * read(&vars, *count) as usize;
                        let ptr = self.alloc(cells);
                        vars.insert(*result, ptr);
                    }
                    Operation::Call { callee, args, result, .. } => {
                        let Value::Function(callee) = callee else {
                            panic!("only direct calls can be interpreted");
                        };
                        let values: Vec<u64> = args.iter().map(|&arg| read(&vars, arg)).collect();
                        let returned = self.run(*callee, &values);
                        if let Some(result) = result {
                            vars.insert(*result, returned.expect("callee returns a value"));
                        }
                    }
                    Operation::Branch { target } => {
                        block = *target;
                        continue 'blocks;
                    }
                    Operation::CondBranch { condition, on_true, on_false } => {
                        block = if read(&vars, *condition) != 0 { *on_true } else { *on_false };
                        continue 'blocks;
                    }
                    Operation::ReturnVoid => return None,
                    Operation::ReturnValue { value } => return Some(read(&vars, *value)),
                }
            }
            block = body.block(block).next().expect("fell off the end of the function");
        }
    }
}

/// Run a function on a fresh memory
pub fn run(module: &Module, function: FunctionId, args: &[u64]) -> Option<u64> {
    Interpreter::new(module).run(function, args)
}

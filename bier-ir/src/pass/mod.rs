//! Module Transformation Passes
//!
//! An operation pass visits every defined function, then every operation of
//! every block in chain order. The per-operation hook returns the position to
//! continue from, so operations it splices in are never revisited. After a
//! function is rewritten its unreferenced variables are swept.

pub mod ssa;

pub use ssa::SsaPass;

use log::debug;

use crate::function::Function;
use crate::ids::BlockId;
use crate::module::Module;
use crate::types::TypeRegistry;

pub trait OperationPass {
    /// Called once per defined function before its operations are visited
    fn on_function(&mut self, _types: &mut TypeRegistry, _function: &mut Function) {}

    /// Rewrite the operation at `pos` of `block`, returning where to continue
    fn transform_operation(
        &mut self,
        _types: &mut TypeRegistry,
        _function: &mut Function,
        _block: BlockId,
        pos: usize,
    ) -> usize {
        pos + 1
    }

    /// Consume a module and hand back the transformed one
    fn apply(mut self, mut module: Module) -> Module
    where
        Self: Sized,
    {
        let (types, functions) = module.split_for_pass();
        for function in functions.iter_mut() {
            debug!("running pass over {}", function.name());
            self.on_function(types, function);

            let blocks: Vec<BlockId> = function.block_ids().collect();
            for block in blocks {
                let mut pos = 0;
                while pos < function.block(block).len() {
                    pos = self.transform_operation(types, function, block, pos);
                }
            }
            function.normalize();
        }
        module
    }
}

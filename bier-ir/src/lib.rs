//! BIeR - Typed Intermediate Representation
//!
//! A module holds typed functions built from basic blocks of operations over
//! a small value model. Modules are populated through the [`ModuleBuilder`],
//! rewritten by the [`SsaPass`] and inspected through the dependency DAG or
//! the serializers.
//!
//! ## Architecture
//!
//! - `types` - Interned type registry
//! - `layout` - Flattened memory layouts
//! - `values` - Constants, variables and static data
//! - `ops` - Operation kinds and the opcode table
//! - `instructions` - IR operations
//! - `blocks`, `function`, `module` - Containment hierarchy
//! - `builder` - Type-checked construction
//! - `pass` - Module rewriting, SSA construction
//! - `dag` - Dependency analysis and its visual form
//! - `serialize` - Textual and JSON output

pub mod builder;
pub mod dag;
pub mod pass;
pub mod serialize;

mod blocks;
mod function;
mod ids;
mod instructions;
mod layout;
mod module;
mod ops;
mod types;
mod values;

pub use self::blocks::BasicBlock;
pub use self::builder::{Callee, Dest, ModuleBuilder};
pub use self::function::{ArgumentValue, Function, FunctionSignature};
pub use self::ids::{BlockId, BlockRef, FunctionId, LayoutId, OpId, SignatureId, StaticDataId, VarId};
pub use self::instructions::Operation;
pub use self::layout::{Layout, LayoutEntry};
pub use self::module::Module;
pub use self::ops::{BinOp, OpCode, UnOp};
pub use self::pass::{OperationPass, SsaPass};
pub use self::types::{IrType, TypeDisplay, TypeId, TypeRegistry, INT_WIDTHS};
pub use self::values::{IntegerConst, StaticData, Value, Variable};

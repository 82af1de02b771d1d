//! Arena handles
//! 
//! Every cross-reference in the IR is one of these plain indices into the
//! arena that owns the referenced object. Module-level handles index the
//! module's arenas, function-local handles index the owning function's.

use serde::Serialize;
use std::fmt;

macro_rules! ir_id {
    ($(#[$attr:meta])* $name:ident, $prefix:literal) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
        pub struct $name(pub(crate) u32);

        impl $name {
            pub(crate) fn new(index: usize) -> Self {
                Self(index as u32)
            }

            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $prefix, self.0)
            }
        }
    };
}

ir_id!(
    /// A function defined in a module
    FunctionId, "f"
);
ir_id!(
    /// A declared function signature (defined or external)
    SignatureId, "sig"
);
ir_id!(LayoutId, "layout");
ir_id!(StaticDataId, "global");
ir_id!(
    /// A variable, local to its function
    VarId, "v"
);
ir_id!(
    /// An operation, local to its function
    OpId, "op"
);
ir_id!(
    /// A basic block, local to its function
    BlockId, "bb"
);

/// A block together with the function owning it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct BlockRef {
    pub function: FunctionId,
    pub block: BlockId,
}

//! BIeR - Common Types and Utilities
//! 
//! This crate contains the error taxonomy and source position types
//! shared by the IR core and the tools built on top of it.

pub mod error;
pub mod source_loc;

pub use error::{IrContext, IrError, IrResult, LookupKind};
pub use source_loc::SourcePos;

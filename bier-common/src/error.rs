//! Error handling for the BIeR IR toolkit
//!
//! Construction errors are raised by the module builder and IR constructors
//! whenever a precondition is violated. They carry as much context as is
//! known at the point of failure, and pick up more (owning function, block,
//! source position) as they travel up through the layers that drive
//! construction. Context is only ever added, never replaced.

use crate::source_loc::SourcePos;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub type IrResult<T> = Result<T, IrError>;

/// Main IR error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IrError {
    #[error("BIeR IR exception: {message}{context}")]
    Construction {
        message: String,
        context: IrContext,
    },

    #[error("unknown {kind} \"{name}\"")]
    NotFound { kind: LookupKind, name: String },

    #[error("index {index} is out of {what} bounds ({len})")]
    IndexOutOfBounds {
        what: &'static str,
        index: usize,
        len: usize,
    },
}

/// What a failed lookup was looking for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LookupKind {
    Function,
    Signature,
    Layout,
    StaticData,
}

impl fmt::Display for LookupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupKind::Function => write!(f, "function"),
            LookupKind::Signature => write!(f, "function signature"),
            LookupKind::Layout => write!(f, "layout"),
            LookupKind::StaticData => write!(f, "static data"),
        }
    }
}

/// Where in the IR an error happened
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IrContext {
    pub function: Option<String>,
    pub block: Option<String>,
    pub source: Option<SourcePos>,
}

impl IrContext {
    pub fn is_empty(&self) -> bool {
        self.function.is_none() && self.block.is_none() && self.source.is_none()
    }
}

impl fmt::Display for IrContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sep = " at ";
        if let Some(function) = &self.function {
            write!(f, "{sep}func {function}")?;
            sep = ", ";
        }
        if let Some(block) = &self.block {
            write!(f, "{sep}block {block}")?;
            sep = ", ";
        }
        if let Some(source) = &self.source {
            write!(f, "{sep}{source}")?;
        }
        Ok(())
    }
}

impl IrError {
    /// Create a construction error without any context yet
    pub fn construction(message: impl Into<String>) -> Self {
        IrError::Construction {
            message: message.into(),
            context: IrContext::default(),
        }
    }

    pub fn not_found(kind: LookupKind, name: impl Into<String>) -> Self {
        IrError::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn out_of_bounds(what: &'static str, index: usize, len: usize) -> Self {
        IrError::IndexOutOfBounds { what, index, len }
    }

    /// Annotate with the owning function, unless already annotated
    pub fn with_function(mut self, name: impl Into<String>) -> Self {
        if let IrError::Construction { context, .. } = &mut self {
            if context.function.is_none() {
                context.function = Some(name.into());
            }
        }
        self
    }

    /// Annotate with the owning block, unless already annotated
    pub fn with_block(mut self, label: impl Into<String>) -> Self {
        if let IrError::Construction { context, .. } = &mut self {
            if context.block.is_none() {
                context.block = Some(label.into());
            }
        }
        self
    }

    /// Annotate with a source position, unless already annotated
    pub fn at(mut self, pos: SourcePos) -> Self {
        if let IrError::Construction { context, .. } = &mut self {
            if context.source.is_none() {
                context.source = Some(pos);
            }
        }
        self
    }

    pub fn context(&self) -> Option<&IrContext> {
        match self {
            IrError::Construction { context, .. } => Some(context),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, IrError::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_bare_construction_error() {
        let err = IrError::construction("types mismatch i32 i8");
        assert_eq!(err.to_string(), "BIeR IR exception: types mismatch i32 i8");
        assert!(err.context().unwrap().is_empty());
    }

    #[test]
    fn test_context_accumulates() {
        let err = IrError::construction("store to i32 of i8 is not possible")
            .with_block("entry")
            .with_function("main")
            .at(SourcePos::new(3, 7));

        assert_eq!(
            err.to_string(),
            "BIeR IR exception: store to i32 of i8 is not possible at func main, block entry, 3:7"
        );
    }

    #[test]
    fn test_context_is_never_rewritten() {
        let err = IrError::construction("cannot assign to immutable")
            .with_function("inner")
            .with_function("outer")
            .at(SourcePos::new(1, 1))
            .at(SourcePos::new(9, 9));

        let context = err.context().unwrap();
        assert_eq!(context.function.as_deref(), Some("inner"));
        assert_eq!(context.source, Some(SourcePos::new(1, 1)));
    }

    #[test]
    fn test_not_found() {
        let err = IrError::not_found(LookupKind::Function, "missing");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "unknown function \"missing\"");
        // Lookup failures carry no construction context
        assert_eq!(err.clone().with_function("f"), err);
    }

    #[test]
    fn test_out_of_bounds() {
        let err = IrError::out_of_bounds("layout", 16, 16);
        assert_eq!(err.to_string(), "index 16 is out of layout bounds (16)");
    }
}

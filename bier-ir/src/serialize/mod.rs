//! Module serialization
//!
//! The textual form lives here; JSON comes for free from the `Serialize`
//! derives on the module model.

pub mod text;

pub use text::TextSerializer;

use crate::module::Module;

/// Pretty-printed JSON dump of a module
pub fn to_json(module: &Module) -> serde_json::Result<String> {
    serde_json::to_string_pretty(module)
}

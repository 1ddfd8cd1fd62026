//! The fixed set of universes and the prompts built from them

/// Universe keys, names and style descriptions
pub mod catalog;
/// Prompt template applied to each universe
pub mod prompt;

pub use catalog::{UNIVERSES, Universe};

//! Album composition from the generated images of a batch

/// Grid rendering and encoding
pub mod compositor;
/// Built-in caption font
pub mod glyphs;
/// Canvas geometry
pub mod layout;

pub use compositor::{Album, AlbumCompositor, AlbumFormat};

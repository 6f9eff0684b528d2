//! inidoc: documentation from `#:`-annotated `.ini` files and test module
//! docstrings.
//!
//! The [`parser`] turns annotated configuration into [`DocItem`]s, the
//! [`docs`] assemblers lay them out as reStructuredText, and [`render`]
//! substitutes templates and converts the result to HTML or plain text.

pub mod check;
pub mod docs;
pub mod error;
pub mod markup;
pub mod model;
pub mod parser;
pub mod render;
pub mod value;

pub use error::{Error, Origin, Result};
pub use model::{DocItem, DocKey};
pub use parser::ConfigDocParser;
pub use render::{render, Composer, Conversion, OutputFormat};

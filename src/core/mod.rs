pub mod document;
pub mod errors;

pub use document::{DocBuilder, LineKind, LogicalLine, SourceDocument};
pub use errors::{Error, Result};

//! The conversion command.
//!
//! There is a single user-facing operation: point the tool at a file, a
//! directory, or a list of files, and convert everything it finds. The
//! submodule holds the destination resolution, the copy-then-convert
//! plumbing and the per-file driver.

pub mod convert;

pub use convert::{run, ConvertOptions, DiffMode, OutputFormat, Summary};

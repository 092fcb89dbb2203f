//! File reading, writing and directory traversal.
//!
//! Source files keep their byte-level identity through a migration: the
//! declared encoding, an optional UTF-8 BOM and the line-ending flavor are
//! detected on read and restored on write, so the only differences in the
//! output are the lines the passes actually touched.

pub mod reader;
pub mod walker;
pub mod writer;

pub use reader::{read_source, Encoding, RawSource};
pub use walker::{collect_python_files, is_python_file};
pub use writer::write_source;

//! PyQt4 to PyQt5 source migrator.
//!
//! The engine works on logical lines of Python source, never a full AST:
//! the [`parse`] module segments and splits, the [`passes`] module rewrites
//! in a fixed order, and [`report`] turns the sentinel comments the passes
//! leave behind into a FIXME report. [`commands`] wires it to the
//! filesystem.

pub mod cli;
pub mod commands;
pub mod config;
pub mod core;
pub mod io;
pub mod parse;
pub mod passes;
pub mod report;
pub mod state;

pub use crate::core::{Error, Result};
pub use crate::passes::{migrate_source, Migration};
pub use crate::report::Annotation;

//! Annotation finalizing and user-facing progress output.
//!
//! Passes never talk to the terminal. They mark lines they could not
//! rewrite with a `FIXME$` sentinel comment; [`finalize_annotations`]
//! rewrites the sentinels to plain `FIXME` and collects them with their
//! physical line numbers. The [`Reporter`] then prints one block per file
//! and mirrors it into the optional log file.

use std::fs::{File, OpenOptions};
use std::io::Write as _;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;

use crate::core::SourceDocument;
use crate::passes::SENTINEL;

/// One `FIXME` left in a migrated file.
///
/// `line` is the 1-based physical line number of the comment in the
/// migrated output, not an index into the logical lines.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Annotation {
    pub line: usize,
    pub message: String,
}

/// Demote every sentinel comment to a plain `FIXME` and report where they
/// ended up.
pub fn finalize_annotations(doc: &mut SourceDocument) -> Vec<Annotation> {
    let mut annotations = Vec::new();
    let mut lineno = 1;
    for idx in 0..doc.len() {
        let line = doc.line(idx);
        let newlines = line.text.matches('\n').count();
        if line.is_comment() && line.text.contains(SENTINEL) {
            let text = line.text.replacen(SENTINEL, "FIXME", 1);
            let stripped = text.trim_start();
            let message = stripped
                .strip_prefix("# FIXME ")
                .unwrap_or(stripped)
                .trim_end()
                .to_owned();
            doc.set_text(idx, text);
            annotations.push(Annotation {
                line: lineno,
                message,
            });
        }
        lineno += newlines;
    }
    annotations
}

/// Progress writer shared across worker threads.
///
/// Every message goes to stdout; when a log path was given it is appended
/// there as well, without the terminal colors. Each file's report is
/// emitted as a single block so parallel conversions do not interleave.
pub struct Reporter {
    log: Option<Mutex<File>>,
    /// Suppress stdout, keeping only the log file. Used when the caller
    /// wants machine-readable output on stdout instead.
    quiet: bool,
}

impl Reporter {
    /// Open the reporter, creating or appending to `log_path` and stamping
    /// a session header into it.
    pub fn open(log_path: Option<&Path>, quiet: bool) -> Result<Self> {
        let log = match log_path {
            Some(path) => {
                let mut file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .with_context(|| format!("failed to open log file {}", path.display()))?;
                let date = chrono::Local::now().format("%A %d. %B %Y %H:%M");
                let args: Vec<String> = std::env::args().collect();
                writeln!(file, "**  {}  {}  **\nArgs: {}\n", path.display(), date, args.join(" "))
                    .with_context(|| format!("failed to write to log file {}", path.display()))?;
                Some(Mutex::new(file))
            }
            None => None,
        };
        Ok(Self { log, quiet })
    }

    pub fn note(&self, msg: &str) {
        self.emit(msg, msg);
    }

    pub fn unchanged(&self, source: &Path) {
        let plain = format!("Processing file: `{}`\n  No changes needed.\n", source.display());
        self.emit(&plain, &plain);
    }

    pub fn updated(&self, source: &Path, annotations: &[Annotation]) {
        let mut plain = format!("Processing file: `{}`\n", source.display());
        let mut pretty = plain.clone();
        if !annotations.is_empty() {
            let head = if annotations.len() == 1 {
                "  FIXME added:"
            } else {
                "  FIXMEs added:"
            };
            plain.push_str(head);
            plain.push('\n');
            pretty.push_str(&format!("{}\n", head.yellow()));
            for ann in annotations {
                let entry = format!("{:>6} {}", ann.line, ann.message);
                plain.push_str(&entry);
                plain.push('\n');
                pretty.push_str(&format!("{}\n", entry.yellow()));
            }
        }
        plain.push_str("  File updated.\n");
        pretty.push_str(&format!("{}\n", "  File updated.".green()));
        self.emit(&plain, &pretty);
    }

    pub fn error(&self, source: &Path, reason: &str) {
        let plain = format!(
            "Processing file: `{}`\n  Error: {}\n",
            source.display(),
            reason
        );
        let pretty = format!(
            "Processing file: `{}`\n{}\n",
            source.display(),
            format!("  Error: {reason}").red()
        );
        self.emit(&plain, &pretty);
    }

    fn emit(&self, plain: &str, pretty: &str) {
        if !self.quiet {
            println!("{pretty}");
        }
        if let Some(log) = &self.log {
            if let Ok(mut file) = log.lock() {
                if let Err(err) = writeln!(file, "{plain}") {
                    log::warn!("log write failed: {err}");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::segment;
    use pretty_assertions::assert_eq;

    fn doc(source: &str) -> SourceDocument {
        let lines: Vec<String> = source.split_inclusive('\n').map(str::to_owned).collect();
        segment(&lines).unwrap()
    }

    #[test]
    fn sentinel_becomes_plain_fixme() {
        let mut d = doc("# FIXME$ QtXml is no longer supported.\nx = QtXml.QDomDocument()\n");
        let anns = finalize_annotations(&mut d);
        assert!(d.text().starts_with("# FIXME QtXml"));
        assert_eq!(
            anns,
            vec![Annotation {
                line: 1,
                message: "QtXml is no longer supported.".to_owned(),
            }]
        );
    }

    #[test]
    fn line_numbers_are_physical() {
        let mut d = doc("x = foo(1,\n        2)\n\n    # FIXME$ Ambiguous syntax, can't refactor it.\n    y = 1\n");
        let anns = finalize_annotations(&mut d);
        assert_eq!(anns.len(), 1);
        assert_eq!(anns[0].line, 4);
    }

    #[test]
    fn untouched_document_reports_nothing() {
        let mut d = doc("# plain comment\nx = 1\n");
        let before = d.text();
        let anns = finalize_annotations(&mut d);
        assert!(anns.is_empty());
        assert_eq!(d.text(), before);
    }
}
